//! HTTP handlers for the resolution API.

use crate::api::models::{
    parse_entity_type, parse_scope, parse_seed_attributes, ErrorResponse, ResolutionParams,
};
use crate::backend::SearchBackend;
use crate::engine::{Input, ResolutionJob};
use crate::error::{ResolutionError, Result as ResolveResult};
use crate::model::{Model, ModelStore};
use actix_web::{http::StatusCode, web, HttpResponse, Result};
use serde_json::Value as Json;
use std::sync::Arc;

/// Shared handler state: where models come from and where queries go
pub struct AppState {
    pub store: Arc<dyn ModelStore>,
    pub backend: Arc<dyn SearchBackend>,
}

/// Health check endpoint
pub async fn health_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "Resolvent API"
    })))
}

/// Resolution endpoint with the entity type in the URL
pub async fn resolve_entity_type(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<ResolutionParams>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let entity_type = path.into_inner();
    Ok(respond(run_resolution(
        &state,
        Some(&entity_type),
        params.into_inner(),
        &body,
    )))
}

/// Resolution endpoint with the model or entity type in the request body
pub async fn resolve(
    state: web::Data<AppState>,
    params: web::Query<ResolutionParams>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    Ok(respond(run_resolution(&state, None, params.into_inner(), &body)))
}

fn respond(outcome: ResolveResult<String>) -> HttpResponse {
    match outcome {
        Ok(envelope) => HttpResponse::Ok()
            .content_type("application/json")
            .body(envelope),
        Err(e) => {
            log::error!("resolution request failed: {}", e);
            let (status, error_type) = match &e {
                ResolutionError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                ResolutionError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequestError"),
                ResolutionError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFoundError"),
                ResolutionError::Backend(_) => (StatusCode::BAD_GATEWAY, "BackendError"),
                ResolutionError::Cancelled => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CancelledError")
                }
            };
            HttpResponse::build(status).json(ErrorResponse {
                error: e.to_string(),
                error_type: error_type.to_string(),
            })
        }
    }
}

/// Parse the request, resolve the model, scope it, and run the job
fn run_resolution(
    state: &AppState,
    entity_type_from_url: Option<&str>,
    params: ResolutionParams,
    body: &[u8],
) -> ResolveResult<String> {
    if body.is_empty() {
        return Err(ResolutionError::bad_request("request body is missing"));
    }
    let body: Json = serde_json::from_slice(body)
        .map_err(|e| ResolutionError::bad_request(format!("request body is not valid JSON: {}", e)))?;

    let entity_type = parse_entity_type(entity_type_from_url, &body)?;
    let mut model = match (&entity_type, body.get("model")) {
        (Some(_), Some(_)) => {
            return Err(ResolutionError::bad_request(
                "provide 'entity_type' or 'model', but not both",
            ));
        }
        (Some(entity_type), None) => state.store.load(entity_type)?,
        (None, Some(model)) => Model::from_value(model)?,
        (None, None) => {
            return Err(ResolutionError::bad_request(
                "the 'model' field is missing from the request body while 'entity_type' is undefined",
            ));
        }
    };

    let seeds = parse_seed_attributes(&body, &model)?;
    let scope = parse_scope(&body, &model)?;
    if !scope.indices.is_empty() {
        model.retain_indices(&scope.indices)?;
    }
    if !scope.resolvers.is_empty() {
        model.retain_resolvers(&scope.resolvers)?;
    }

    let input = Input::new(model, seeds).with_scope(scope.attributes);
    let mut job = ResolutionJob::new(state.backend.clone(), input).with_config(params.into());
    job.run()
}

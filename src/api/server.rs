use crate::api::handlers::{health_check, resolve, resolve_entity_type, AppState};
use crate::backend::SearchBackend;
use crate::model::ModelStore;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use std::sync::Arc;

/// Configuration for the API server
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Start the API server
pub async fn start_server(
    config: ApiConfig,
    store: Arc<dyn ModelStore>,
    backend: Arc<dyn SearchBackend>,
) -> Result<()> {
    let state = web::Data::new(AppState { store, backend });

    log::info!("Starting Resolvent API server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .route("/health", web::get().to(health_check))
            .route("/resolution", web::post().to(resolve))
            .route("/resolution/{entity_type}", web::post().to(resolve_entity_type))
    })
    .bind(format!("{}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}

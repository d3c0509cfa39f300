use anyhow::{Context, Result};
use clap::Parser;
use resolvent::backend::ScriptedBackend;
use resolvent::model::{InMemoryModelStore, Model};
use resolvent::{start_server, ApiConfig};
use serde_json::Value as Json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "resolvent-api")]
#[command(about = "Resolvent entity resolution API server")]
struct Args {
    /// Host to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the server to
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Directory of entity model JSON files; the file stem names the
    /// entity type
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// JSON file of scripted backend responses, mapping each index name to
    /// an array of response documents replayed in order (for demos and
    /// integration testing; production embedders supply their own backend)
    #[arg(long)]
    fixtures: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let store = Arc::new(InMemoryModelStore::new());
    if let Some(models_dir) = &args.models_dir {
        load_models(&store, models_dir)?;
    }

    let backend = Arc::new(ScriptedBackend::new());
    if let Some(fixtures) = &args.fixtures {
        load_fixtures(&backend, fixtures)?;
    }

    log::info!(
        "Configuration: host={}, port={}, models={}",
        args.host,
        args.port,
        store.entity_types().len()
    );

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };
    start_server(config, store, backend).await?;

    Ok(())
}

fn load_models(store: &InMemoryModelStore, models_dir: &PathBuf) -> Result<()> {
    let entries = fs::read_dir(models_dir)
        .with_context(|| format!("cannot read models directory {}", models_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(entity_type) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot read model file {}", path.display()))?;
        let model = Model::parse(&text)
            .with_context(|| format!("invalid entity model in {}", path.display()))?;
        store.put(entity_type, model);
        log::info!("Loaded entity model '{}'", entity_type);
    }
    Ok(())
}

fn load_fixtures(backend: &ScriptedBackend, fixtures: &PathBuf) -> Result<()> {
    let text = fs::read_to_string(fixtures)
        .with_context(|| format!("cannot read fixtures file {}", fixtures.display()))?;
    let parsed: Json = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in fixtures file {}", fixtures.display()))?;
    let Some(indices) = parsed.as_object() else {
        anyhow::bail!("fixtures file must map index names to arrays of responses");
    };
    for (index, responses) in indices {
        let Some(responses) = responses.as_array() else {
            anyhow::bail!("fixtures for index '{}' must be an array of responses", index);
        };
        for response in responses {
            backend.enqueue_response(index.clone(), response.clone());
        }
    }
    Ok(())
}

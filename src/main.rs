//! ModelBench server

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use modelbench::api::{create_router, ApiState};
use modelbench::evaluation::{
    EvaluationDispatcher, ExternalEvaluator, InferenceRunner, ProcessEvaluator, RemoteEvaluator,
};
use modelbench::storage::get_data_dir;
use modelbench::storage::results::{FileBackend, ResultStore};
use modelbench::storage::settings::{load_settings, save_settings, AppSettings};
use modelbench::storage::uploads::UploadStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("modelbench=info,tower_http=info"));
    fmt().with_env_filter(filter).with_target(true).init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {}", e);
        return Err(e);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let data_dir = get_data_dir()?;
    if !data_dir.join("settings.json").exists() {
        // Leave an editable settings file behind on first start
        if let Err(e) = save_settings(&AppSettings::default()) {
            tracing::warn!("Failed to write default settings: {}", e);
        }
    }
    let settings = load_settings();

    let uploads = UploadStore::new(settings.uploads_root(&data_dir), settings.limits);
    uploads.init().await?;

    let external: Arc<dyn ExternalEvaluator> = match &settings.evaluator_url {
        Some(url) => Arc::new(RemoteEvaluator::new(url.clone(), settings.evaluation_timeout())?),
        None => Arc::new(ProcessEvaluator::new(
            settings.evaluator_command.clone(),
            settings.evaluation_timeout(),
        )),
    };
    tracing::info!("Custom models are evaluated by the {} evaluator", external.name());

    let dispatcher = EvaluationDispatcher::new(external);
    let inference = InferenceRunner::new(
        settings.inference_command.clone(),
        settings.inference_timeout(),
    );
    let results = ResultStore::init(FileBackend::new(data_dir.join("state")));

    let addr = format!("{}:{}", settings.bind_address, settings.port);
    let state = Arc::new(ApiState::new(settings, uploads, dispatcher, inference, results));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "ModelBench listening on http://{} (data in {})",
        listener.local_addr()?,
        data_dir.display()
    );
    axum::serve(listener, app).await?;
    Ok(())
}

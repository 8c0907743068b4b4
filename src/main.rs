//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run UI.
//! No business logic here.

use careline::adapters::ai::OpenAiClassifier;
use careline::adapters::catalog::FileCatalog;
use careline::adapters::persistence::{MemoryRepo, SqliteRepo};
use careline::adapters::ui::tui::TuiInputPort;
use careline::domain::LanguageCode;
use careline::ports::{ClassifierPort, ConsultationRepo, FacilityCatalog, InputPort};
use careline::shared::config::AppConfig;
use careline::usecases::{ConsultationService, FacilityService};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    careline::adapters::ui::init_ui();

    let cfg = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        AppConfig::default()
    });

    let default_language = cfg.default_language_or_default();
    LanguageCode::parse(&default_language)
        .map_err(|e| anyhow::anyhow!("CARELINE_DEFAULT_LANGUAGE: {}", e))?;

    // --- Consultation store: SQLite, in-memory when the data dir is unusable ---
    let data_path = PathBuf::from(cfg.data_dir_or_default());
    let repo: Arc<dyn ConsultationRepo> = match SqliteRepo::connect(&data_path).await {
        Ok(sqlite) => {
            info!(path = %sqlite.path().display(), "consultations stored in SQLite");
            Arc::new(sqlite)
        }
        Err(e) => {
            warn!(error = %e, "SQLite unavailable, consultations will not survive restart");
            Arc::new(MemoryRepo::new())
        }
    };

    // --- Optional classifier ---
    let classifier: Option<Arc<dyn ClassifierPort>> = if cfg.is_ai_configured() {
        info!(
            model = %cfg.ai_model_or_default(),
            url = %cfg.ai_api_url_or_default(),
            "classifier hints enabled with OpenAI adapter"
        );
        Some(Arc::new(OpenAiClassifier::new(
            cfg.ai_api_url_or_default(),
            cfg.ai_api_key().unwrap_or_default(),
            cfg.ai_model_or_default(),
        )))
    } else {
        warn!("CARELINE_AI_API_KEY not set, using keyword rules only");
        None
    };
    let classifier_timeout = Duration::from_millis(cfg.classifier_timeout_ms_or_default());
    info!(
        timeout_ms = classifier_timeout.as_millis() as u64,
        "classifier timeout"
    );

    // --- Facility catalog ---
    let catalog: Arc<dyn FacilityCatalog> = match cfg.facilities_path.as_deref() {
        Some(path) => Arc::new(
            FileCatalog::load(path)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?,
        ),
        None => {
            warn!("CARELINE_FACILITIES_PATH not set, facility search will return nothing");
            Arc::new(FileCatalog::empty())
        }
    };

    // --- Services ---
    let consultation_service = Arc::new(ConsultationService::new(
        repo,
        classifier,
        classifier_timeout,
    ));
    let facility_service = Arc::new(FacilityService::new(catalog));

    let input_port: Arc<dyn InputPort> = Arc::new(TuiInputPort::new(
        consultation_service,
        facility_service,
        cfg.owner_id_or_default(),
        default_language,
    ));

    // --- Run (main menu -> Consultation / Facilities / History) ---
    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

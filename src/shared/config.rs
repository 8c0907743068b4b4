//! Application configuration. Paths, language, classifier credentials.

use serde::Deserialize;

/// Upper bound for one classifier call when `CARELINE_CLASSIFIER_TIMEOUT_MS` is unset.
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Directory holding careline.db. Read from CARELINE_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Interview language when the user does not pick one. Read from CARELINE_DEFAULT_LANGUAGE.
    #[serde(default)]
    pub default_language: Option<String>,

    /// Local requester identity for the terminal front-end. Read from CARELINE_OWNER_ID.
    #[serde(default)]
    pub owner_id: Option<String>,

    /// JSON or CSV facility file. Read from CARELINE_FACILITIES_PATH.
    #[serde(default)]
    pub facilities_path: Option<String>,

    /// Classifier call timeout in ms (default 3000). Read from CARELINE_CLASSIFIER_TIMEOUT_MS.
    #[serde(default)]
    pub classifier_timeout_ms: Option<u64>,

    // ─────────────────────────────────────────────────────────────────────────
    // Classifier (OpenAI-compatible) Configuration
    // ─────────────────────────────────────────────────────────────────────────
    /// API key. Read from CARELINE_AI_API_KEY.
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// Chat completions URL. Defaults to OpenAI. Read from CARELINE_AI_API_URL.
    #[serde(default)]
    pub ai_api_url: Option<String>,

    /// Model name. Defaults to "gpt-4o-mini". Read from CARELINE_AI_MODEL.
    #[serde(default)]
    pub ai_model: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("CARELINE"));
        if let Ok(path) = std::env::var("CARELINE_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // Read directly; an unparsable value falls back to the default.
        if let Ok(s) = std::env::var("CARELINE_CLASSIFIER_TIMEOUT_MS") {
            cfg.classifier_timeout_ms = s.trim().parse::<u64>().ok();
        }
        Ok(cfg)
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir.clone().unwrap_or_else(|| "./data".to_string())
    }

    /// Defaults to "en".
    pub fn default_language_or_default(&self) -> String {
        self.default_language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "en".to_string())
    }

    /// Configured owner, else the login name, else "local".
    pub fn owner_id_or_default(&self) -> String {
        self.owner_id
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| "local".to_string())
    }

    pub fn classifier_timeout_ms_or_default(&self) -> u64 {
        self.classifier_timeout_ms
            .unwrap_or(DEFAULT_CLASSIFIER_TIMEOUT_MS)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Classifier Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the API key if configured. Reads from config or CARELINE_AI_API_KEY env.
    pub fn ai_api_key(&self) -> Option<String> {
        self.ai_api_key
            .clone()
            .or_else(|| std::env::var("CARELINE_AI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Returns the API URL. Defaults to OpenAI chat completions endpoint.
    pub fn ai_api_url_or_default(&self) -> String {
        self.ai_api_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string())
    }

    /// Returns the model name. Defaults to "gpt-4o-mini".
    pub fn ai_model_or_default(&self) -> String {
        self.ai_model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    /// Returns true if the classifier is configured (API key present).
    pub fn is_ai_configured(&self) -> bool {
        self.ai_api_key().is_some()
    }
}

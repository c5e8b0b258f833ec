use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_TEXT_MODEL: &str = "gpt2";
pub const DEFAULT_PRIMARY_IMAGE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";
pub const DEFAULT_FALLBACK_IMAGE_MODEL: &str = "CompVis/stable-diffusion-v1-4";

/// Service configuration, sourced from the environment with defaults for
/// everything but credentials.
#[derive(Clone, Debug)]
pub struct Config {
    pub huggingface_api_key: Option<String>,
    pub api_base: String,
    pub text_model: String,
    pub primary_image_model: String,
    pub fallback_image_model: String,

    pub qdrant_url: Option<String>,
    pub qdrant_api_key: Option<String>,
    pub qdrant_collection: String,

    pub storage_url: Option<String>,
    pub storage_api_key: Option<String>,
    pub storage_bucket: String,

    pub font_path: Option<PathBuf>,

    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            huggingface_api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            primary_image_model: DEFAULT_PRIMARY_IMAGE_MODEL.to_string(),
            fallback_image_model: DEFAULT_FALLBACK_IMAGE_MODEL.to_string(),
            qdrant_url: None,
            qdrant_api_key: None,
            qdrant_collection: "designs".to_string(),
            storage_url: None,
            storage_api_key: None,
            storage_bucket: "designs".to_string(),
            font_path: None,
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            huggingface_api_key: non_empty_env("HUGGINGFACE_API_KEY"),
            api_base: non_empty_env("MAQUETTE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            text_model: non_empty_env("HUGGINGFACE_TEXT_MODEL").unwrap_or(defaults.text_model),
            primary_image_model: non_empty_env("HUGGINGFACE_IMAGE_MODEL")
                .unwrap_or(defaults.primary_image_model),
            fallback_image_model: non_empty_env("HUGGINGFACE_FALLBACK_IMAGE_MODEL")
                .unwrap_or(defaults.fallback_image_model),
            qdrant_url: non_empty_env("QDRANT_API_URL").map(|v| v.trim_end_matches('/').to_string()),
            qdrant_api_key: non_empty_env("QDRANT_API_KEY"),
            qdrant_collection: non_empty_env("QDRANT_COLLECTION").unwrap_or(defaults.qdrant_collection),
            storage_url: non_empty_env("STORAGE_URL").map(|v| v.trim_end_matches('/').to_string()),
            storage_api_key: non_empty_env("STORAGE_API_KEY"),
            storage_bucket: non_empty_env("STORAGE_BUCKET").unwrap_or(defaults.storage_bucket),
            font_path: non_empty_env("MAQUETTE_FONT_PATH").map(PathBuf::from),
            request_timeout: env_secs("MAQUETTE_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
            max_retries: non_empty_env("MAQUETTE_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            retry_delay: env_secs("MAQUETTE_RETRY_DELAY_SECS").unwrap_or(defaults.retry_delay),
        }
    }

    /// Ordered image model candidates: primary first, then fallback.
    pub fn model_candidates(&self) -> Vec<String> {
        vec![
            self.primary_image_model.clone(),
            self.fallback_image_model.clone(),
        ]
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str) -> Option<Duration> {
    non_empty_env(key)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

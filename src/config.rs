use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docproc server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Cloud project identity reported by the health endpoint.
    pub project_id: String,
    /// VLM model identifier reported by the health endpoint.
    pub model_name: String,
    /// Base URL of the external extraction/grouping/query pipeline service.
    pub pipeline_url: String,
    /// Root directory of the artifact store.
    pub output_dir: PathBuf,
    /// Confidence threshold handed to the grouping collaborator.
    pub confidence_threshold: f64,
    /// Upper bound in seconds for each collaborator call.
    pub collaborator_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            project_id: load_env("VLM_PROJECT_ID")?,
            model_name: load_env("VLM_MODEL")?,
            pipeline_url: load_env("PIPELINE_URL")?,
            output_dir: load_env_optional("DOCPROC_OUTPUT_DIR")
                .map_or_else(|| PathBuf::from("/tmp/docproc_output"), PathBuf::from),
            confidence_threshold: load_env_optional("GROUPING_CONFIDENCE_THRESHOLD")
                .map(|value| {
                    value.parse().map_err(|_| {
                        ConfigError::InvalidValue("GROUPING_CONFIDENCE_THRESHOLD".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(0.80),
            collaborator_timeout_secs: load_env_optional("COLLABORATOR_TIMEOUT_SECS")
                .map(|value| {
                    value.parse().map_err(|_| {
                        ConfigError::InvalidValue("COLLABORATOR_TIMEOUT_SECS".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(300),
            server_port: load_env_optional("SERVER_PORT")
                .or_else(|| load_env_optional("PORT"))
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        project_id = %config.project_id,
        model = %config.model_name,
        pipeline_url = %config.pipeline_url,
        output_dir = %config.output_dir.display(),
        confidence_threshold = config.confidence_threshold,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

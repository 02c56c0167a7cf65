//! Configuration management for the SQL chat agent.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `DEFAULT_MODEL` - Optional. The default LLM model to use. Defaults to `openai/gpt-4o-mini`.
//! - `DATABASE_PATH` - Optional. Path to the SQLite database file. Defaults to `db.sqlite`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MAX_TOOL_ROUNDS` - Optional. Maximum tool-dispatch rounds per user turn. Defaults to `10`.
//! - `LLM_TIMEOUT_SECS` - Optional. Bounded wait for a single model call. Defaults to `120`.
//! - `TEMPERATURE` - Optional. Sampling temperature for model calls. Defaults to `0.1`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Default LLM model identifier (OpenRouter format)
    pub default_model: String,

    /// Path to the SQLite database the agent answers questions about
    pub database_path: PathBuf,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum tool-dispatch rounds within one user turn
    pub max_tool_rounds: usize,

    /// Bounded wait for a single LLM call, in seconds
    pub llm_timeout_secs: u64,

    /// Sampling temperature for model calls
    pub temperature: f32,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let default_model = std::env::var("DEFAULT_MODEL")
            .unwrap_or_else(|_| "openai/gpt-4o-mini".to_string());

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("db.sqlite"));

        let host = std::env::var("HOST")
            .unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let max_tool_rounds = std::env::var("MAX_TOOL_ROUNDS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_TOOL_ROUNDS".to_string(), format!("{}", e)))?;

        let llm_timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("LLM_TIMEOUT_SECS".to_string(), format!("{}", e)))?;

        let temperature = std::env::var("TEMPERATURE")
            .unwrap_or_else(|_| "0.1".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("TEMPERATURE".to_string(), format!("{}", e)))?;

        Ok(Self {
            api_key,
            default_model,
            database_path,
            host,
            port,
            max_tool_rounds,
            llm_timeout_secs,
            temperature,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String, database_path: PathBuf) -> Self {
        Self {
            api_key,
            default_model,
            database_path,
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_tool_rounds: 10,
            llm_timeout_secs: 120,
            temperature: 0.1,
        }
    }
}

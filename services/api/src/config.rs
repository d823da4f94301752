//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    /// The embeddings endpoint may live on a different OpenAI-compatible host
    /// than the chat models; falls back to `openai_base_url` when unset.
    pub embedding_base_url: Option<String>,
    pub case_model: String,
    pub eval_model: String,
    pub embedding_model: String,
    pub allowed_origin: String,
    pub novelty_threshold: f32,
    pub match_count: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Provider Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_base_url = std::env::var("OPENAI_BASE_URL").ok();
        let embedding_base_url = std::env::var("EMBEDDING_BASE_URL")
            .ok()
            .or_else(|| openai_base_url.clone());

        let case_model = std::env::var("CASE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let eval_model = std::env::var("EVAL_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let embedding_model = std::env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());

        // --- Web Settings ---
        let allowed_origin =
            std::env::var("ALLOWED_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Pipeline Tuning ---
        let novelty_threshold = match std::env::var("NOVELTY_THRESHOLD") {
            Ok(raw) => raw.parse::<f32>().map_err(|e| {
                ConfigError::InvalidValue("NOVELTY_THRESHOLD".to_string(), e.to_string())
            })?,
            Err(_) => practice_lab_core::generator::NOVELTY_THRESHOLD,
        };
        if !(0.0..=1.0).contains(&novelty_threshold) {
            return Err(ConfigError::InvalidValue(
                "NOVELTY_THRESHOLD".to_string(),
                format!("{} is not within 0.0..=1.0", novelty_threshold),
            ));
        }
        let match_count = match std::env::var("MATCH_COUNT") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidValue("MATCH_COUNT".to_string(), e.to_string()))?,
            Err(_) => practice_lab_core::generator::MATCH_COUNT,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            openai_base_url,
            embedding_base_url,
            case_model,
            eval_model,
            embedding_model,
            allowed_origin,
            novelty_threshold,
            match_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that
    // mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        "BIND_ADDRESS",
        "DATABASE_URL",
        "RUST_LOG",
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "EMBEDDING_BASE_URL",
        "CASE_MODEL",
        "EVAL_MODEL",
        "EMBEDDING_MODEL",
        "ALLOWED_ORIGIN",
        "NOVELTY_THRESHOLD",
        "MATCH_COUNT",
    ];

    fn with_clean_env<F: FnOnce()>(f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
        f();
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    fn set_required() {
        std::env::set_var("DATABASE_URL", "postgres://localhost/practice_lab");
        std::env::set_var("OPENAI_API_KEY", "test-key");
    }

    #[test]
    fn missing_database_url_is_reported() {
        with_clean_env(|| {
            std::env::set_var("OPENAI_API_KEY", "test-key");
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
        });
    }

    #[test]
    fn missing_api_key_is_reported() {
        with_clean_env(|| {
            std::env::set_var("DATABASE_URL", "postgres://localhost/practice_lab");
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingVar(var) if var == "OPENAI_API_KEY"));
        });
    }

    #[test]
    fn defaults_are_applied() {
        with_clean_env(|| {
            set_required();
            let config = Config::from_env().expect("config loads");
            assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
            assert_eq!(config.case_model, "gpt-4o-mini");
            assert_eq!(config.embedding_model, "text-embedding-3-small");
            assert_eq!(config.allowed_origin, "http://localhost:3000");
            assert_eq!(
                config.novelty_threshold,
                practice_lab_core::generator::NOVELTY_THRESHOLD
            );
            assert_eq!(
                config.match_count,
                practice_lab_core::generator::MATCH_COUNT
            );
            assert!(config.embedding_base_url.is_none());
        });
    }

    #[test]
    fn embedding_base_url_falls_back_to_openai_base_url() {
        with_clean_env(|| {
            set_required();
            std::env::set_var("OPENAI_BASE_URL", "http://llm.internal/v1");
            let config = Config::from_env().expect("config loads");
            assert_eq!(
                config.embedding_base_url.as_deref(),
                Some("http://llm.internal/v1")
            );

            std::env::set_var("EMBEDDING_BASE_URL", "http://embed.internal/v1");
            let config = Config::from_env().expect("config loads");
            assert_eq!(
                config.embedding_base_url.as_deref(),
                Some("http://embed.internal/v1")
            );
        });
    }

    #[test]
    fn out_of_range_novelty_threshold_is_rejected() {
        with_clean_env(|| {
            set_required();
            std::env::set_var("NOVELTY_THRESHOLD", "1.5");
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "NOVELTY_THRESHOLD"));
        });
    }

    #[test]
    fn unparseable_novelty_threshold_is_rejected() {
        with_clean_env(|| {
            set_required();
            std::env::set_var("NOVELTY_THRESHOLD", "very original");
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "NOVELTY_THRESHOLD"));
        });
    }

    #[test]
    fn invalid_bind_address_is_rejected() {
        with_clean_env(|| {
            set_required();
            std::env::set_var("BIND_ADDRESS", "not-an-address");
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BIND_ADDRESS"));
        });
    }
}

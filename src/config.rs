//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment (Cloud
//! Run secret bindings), so everything is read once at startup.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Base URL of the plant classifier API
    pub classifier_url: String,
    /// API key for the plant classifier
    pub classifier_api_key: String,
    /// JWT signing key for session token verification (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            classifier_url: env::var("CLASSIFIER_URL")
                .map_err(|_| ConfigError::Missing("CLASSIFIER_URL"))?,
            classifier_api_key: env::var("CLASSIFIER_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("CLASSIFIER_API_KEY"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            classifier_url: "http://localhost:9090".to_string(),
            classifier_api_key: "test_classifier_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("CLASSIFIER_URL", "https://classifier.example.com");
        env::set_var("CLASSIFIER_API_KEY", "test_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.classifier_url, "https://classifier.example.com");
        assert_eq!(config.classifier_api_key, "test_key");
        assert_eq!(config.port, 8080);
    }
}

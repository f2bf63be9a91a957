use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub gemini_api_key: String,

    #[serde(default = "default_gemini_api_base")]
    pub gemini_api_base: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_deepfake_model_path")]
    pub deepfake_model_path: String,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_max_paper_chars")]
    pub max_paper_chars: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "GEMINI_API_KEY must not be empty".into(),
            ));
        }

        if !self.gemini_api_base.starts_with("http://")
            && !self.gemini_api_base.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "Gemini API base URL must start with http:// or https://: {}",
                self.gemini_api_base
            )));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "Maximum upload size must be greater than 0".into(),
            ));
        }

        if self.max_paper_chars == 0 {
            return Err(ConfigError::Validation(
                "Maximum paper characters must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10000
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_deepfake_model_path() -> String {
    "models/deepfake-image.onnx".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_max_paper_chars() -> usize {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 10000,
            gemini_api_key: "test-key".to_string(),
            gemini_api_base: "http://localhost:8080".to_string(),
            gemini_model: "gemini-1.5-flash-latest".to_string(),
            deepfake_model_path: "/nonexistent/model.onnx".to_string(),
            request_timeout_seconds: 30,
            max_retries: 3,
            max_upload_bytes: 16 * 1024 * 1024,
            max_paper_chars: 30_000,
        }
    }

    #[test]
    fn test_config_validation_passes() {
        let config = test_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_api_key() {
        let mut config = test_config();
        config.gemini_api_key = "  ".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("GEMINI_API_KEY must not be empty"));
    }

    #[test]
    fn test_config_validation_invalid_api_base() {
        let mut config = test_config();
        config.gemini_api_base = "generativelanguage.googleapis.com".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must start with http:// or https://"));
    }

    #[test]
    fn test_config_validation_zero_upload_limit() {
        let mut config = test_config();
        config.max_upload_bytes = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Maximum upload size"));
    }

    #[test]
    fn test_helper_methods() {
        let config = test_config();

        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.server_address(), "127.0.0.1:10000");
    }
}

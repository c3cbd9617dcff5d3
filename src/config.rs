use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration.
///
/// Loaded once at startup and handed to the components that need it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// HMAC secret used to sign session tokens
    pub jwt_secret: String,
    /// API key for the text-generation service
    pub gemini_api_key: Option<String>,
    /// Base URL of the text-generation service
    pub gemini_base_url: String,
    /// Model name used for generation requests
    pub gemini_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("recipegen")
                .join("recipegen.db"),
            jwt_secret: String::new(),
            gemini_api_key: None,
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("RECIPEGEN_CONFIG").ok().map(PathBuf::from))
            .unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        if let Ok(port) = std::env::var("RECIPEGEN_PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Ok(db_path) = std::env::var("RECIPEGEN_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Ok(secret) = std::env::var("RECIPEGEN_JWT_SECRET") {
            config.jwt_secret = secret;
        }
        if let Ok(key) = std::env::var("RECIPEGEN_GEMINI_API_KEY") {
            config.gemini_api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RECIPEGEN_GEMINI_BASE_URL") {
            config.gemini_base_url = url;
        }
        if let Ok(model) = std::env::var("RECIPEGEN_GEMINI_MODEL") {
            config.gemini_model = model;
        }

        // An empty key is the same as no key
        if config.gemini_api_key.as_deref() == Some("") {
            config.gemini_api_key = None;
        }

        if config.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/recipegen/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recipegen")
            .join("config.yaml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
    #[error("Invalid port: {0}")]
    InvalidPort(String),
    #[error("jwt_secret must be set (RECIPEGEN_JWT_SECRET or config file)")]
    MissingSecret,
}

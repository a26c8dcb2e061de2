use crate::llm::gemini::GeminiConfig;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Gemini API key not configured (set GEMINI_API_KEY or pass --api-key)")]
    MissingApiKey,
}

/// Runtime settings supplied by the hosting environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    pub fn gemini(&self) -> Result<GeminiConfig, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(GeminiConfig {
            api_key: api_key.to_string(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
        })
    }
}

use std::env;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: Option<u16>,
    pub max_upload_bytes: usize,
    pub gemini: GeminiConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = non_empty_env("GEMINI_API_KEY").or_else(|| non_empty_env("API_KEY"));
        let api_base = non_empty_env("GEMINI_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = non_empty_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        GeminiConfig {
            api_key,
            api_base,
            model,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// `{api_base}/models/{model}:generateContent`; a model already prefixed
    /// with `models/` is used as is.
    pub fn endpoint(&self) -> String {
        let model = self.model.trim();
        if model.starts_with("models/") {
            format!("{}/{}:generateContent", self.api_base, model)
        } else {
            format!("{}/models/{}:generateContent", self.api_base, model)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            gemini: GeminiConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());
        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Config {
            port,
            max_upload_bytes,
            gemini: GeminiConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_for_bare_model() {
        let config = GeminiConfig::new().with_api_base("http://localhost:9000/v1beta/");
        assert_eq!(
            config.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_endpoint_for_prefixed_model() {
        let config = GeminiConfig::new().with_model("models/gemini-2.5-flash-image-preview");
        assert_eq!(
            config.endpoint(),
            format!(
                "{}/models/gemini-2.5-flash-image-preview:generateContent",
                DEFAULT_API_BASE
            )
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.port_or_default(), 8080);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.with_port(3000).port_or_default(), 3000);
    }
}

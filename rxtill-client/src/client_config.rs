use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `https://clinic.example.com/api`.
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Bearer token for authenticated calls. Optional so catalog-only
    /// use works without a session.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `RXTILL__API__BASE_URL=...`
            .add_source(config::Environment::with_prefix("RXTILL").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Programmatic construction for tests and embedding callers.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                timeout_seconds: default_timeout_seconds(),
            },
            auth: AuthConfig { bearer_token: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let cfg: ClientConfig = serde_json::from_str(
            r#"{"api": {"base_url": "http://localhost:8000"}, "auth": {}}"#,
        )
        .unwrap();
        assert_eq!(cfg.api.timeout_seconds, 30);
        assert_eq!(cfg.auth.bearer_token, None);
    }
}

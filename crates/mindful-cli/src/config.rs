use anyhow::Context;
use mindful_agent::ModelConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "mindful.toml";

#[derive(Debug, Default, Deserialize)]
pub struct MindfulConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_msg_len")]
    pub max_message_length: usize,
    /// Sessions untouched for this long are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_message_length: default_max_msg_len(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8501
}
fn default_max_msg_len() -> usize {
    4_000
}
fn default_session_idle_secs() -> u64 {
    3_600
}

impl MindfulConfig {
    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, `mindful.toml` is read if
    /// present and built-in defaults are used otherwise.
    pub async fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Ok(Self::default());
                }
                path
            }
        };

        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use mindful_agent::LlmProvider;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MindfulConfig::parse("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.server.max_message_length, 4_000);
        assert_eq!(config.server.session_idle_secs, 3_600);
        assert_eq!(config.model.provider, LlmProvider::Groq);
        assert_eq!(config.model.model_id, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_partial_sections() {
        let config = MindfulConfig::parse(
            r#"
[model]
provider = "openrouter"
model_id = "meta-llama/llama-3.3-70b-instruct"
api_key_env = "OPENROUTER_API_KEY"

[server]
port = 9000
"#,
        )
        .unwrap();
        assert_eq!(config.model.provider, LlmProvider::OpenRouter);
        assert_eq!(config.model.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(MindfulConfig::parse("[server]\nport = \"eighty\"").is_err());
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[server]\nhost = \"0.0.0.0\"\n").unwrap();

        let config = MindfulConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[tokio::test]
    async fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = MindfulConfig::load(Some(&dir.path().join("nope.toml")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}

use crate::preamble::WELLNESS_PREAMBLE;
use mindful_core::{MindfulError, MindfulResult};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Groq cloud inference, OpenAI-compatible API.
    #[default]
    Groq,
    OpenAi,
    OpenRouter,
}

impl LlmProvider {
    fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai",
            LlmProvider::OpenAi => "https://api.openai.com",
            LlmProvider::OpenRouter => "https://openrouter.ai/api",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Inline credential. When absent it is read from `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    pub api_base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Overrides the built-in wellness preamble.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_model_id() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model_id: default_model_id(),
            api_key: None,
            api_key_env: default_api_key_env(),
            api_base_url: None,
            temperature: default_temperature(),
            max_tokens: None,
            system_prompt: None,
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        match &self.api_base_url {
            Some(url) => url.trim_end_matches('/'),
            None => self.provider.default_base_url(),
        }
    }

    /// The instruction text sent ahead of every conversation.
    pub fn preamble(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(WELLNESS_PREAMBLE)
    }

    /// Fills `api_key` from the environment when it was not set inline.
    pub fn resolve_api_key(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var(&self.api_key_env).ok();
        }
    }

    /// Returns the credential, or a configuration error if it is missing or
    /// cannot be sent as a bearer token.
    pub fn credential(&self) -> MindfulResult<&str> {
        let key = match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(MindfulError::Config(format!(
                    "{} not found. Please set it and try again.",
                    self.api_key_env
                )))
            }
        };

        if HeaderValue::from_str(&format!("Bearer {key}")).is_err() {
            return Err(MindfulError::Config(format!(
                "{} contains characters that are not valid in an HTTP header",
                self.api_key_env
            )));
        }

        Ok(key)
    }
}

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::core::ChatMessage;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    OpenAI,
    Ollama,
}

impl std::fmt::Display for AIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AIProvider::OpenAI => write!(f, "openai"),
            AIProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for AIProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" => Ok(AIProvider::OpenAI),
            "ollama" => Ok(AIProvider::Ollama),
            _ => Err(anyhow!("Unknown AI provider: {}", s)),
        }
    }
}

/// Failures of the language model capability.
///
/// `Unavailable` means no model is configured at all; every other variant
/// is a failed call.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("language model unavailable: {0}")]
    Unavailable(String),

    #[error("language model did not answer within {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: AIProvider,
        status: u16,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIConfig {
    pub provider: AIProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for AIConfig {
    fn default() -> Self {
        AIConfig {
            provider: AIProvider::OpenAI,
            model: "gpt-3.5-turbo".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(500),
            temperature: Some(0.7),
            timeout_secs: 20,
        }
    }
}

impl AIConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything the model sees for one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    /// Footprint summary, present once a calculation exists.
    pub context: Option<String>,
    /// Recent transcript, oldest first, ending with the new user message.
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    /// System instruction with the context block appended.
    pub fn system_prompt(&self) -> String {
        match &self.context {
            Some(context) => format!("{}\n\n{}", self.system_instruction, context),
            None => self.system_instruction.clone(),
        }
    }

    fn wire_messages(&self) -> Vec<Value> {
        let mut request_messages = vec![serde_json::json!({
            "role": "system",
            "content": self.system_prompt()
        })];

        for msg in &self.messages {
            request_messages.push(serde_json::json!({
                "role": msg.role,
                "content": msg.content
            }));
        }

        request_messages
    }
}

/// An external text-generation capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> String;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

pub struct AIProviderClient {
    config: AIConfig,
    http_client: reqwest::Client,
}

impl AIProviderClient {
    pub fn new(config: AIConfig) -> Result<Self, ProviderError> {
        if config.provider == AIProvider::OpenAI
            && config.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(ProviderError::Unavailable("OpenAI API key not set".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(AIProviderClient {
            config,
            http_client,
        })
    }

    pub fn get_model(&self) -> &str {
        &self.config.model
    }

    pub fn get_provider(&self) -> AIProvider {
        self.config.provider
    }

    async fn chat_openai(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": request.wire_messages(),
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        });

        debug!(model = %self.config.model, messages = request.messages.len(), "sending OpenAI chat request");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ProviderError::Api {
                provider: AIProvider::OpenAI,
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response.json().await?;
        parse_openai_content(&response_json)
    }

    async fn chat_ollama(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": request.wire_messages(),
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_tokens
            }
        });

        debug!(model = %self.config.model, messages = request.messages.len(), "sending Ollama chat request");

        let response = self
            .http_client
            .post(format!("{}/api/chat", base_url.trim_end_matches('/')))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(ProviderError::Api {
                provider: AIProvider::Ollama,
                status: status.as_u16(),
                body,
            });
        }

        let response_json: Value = response.json().await?;
        parse_ollama_content(&response_json)
    }
}

#[async_trait]
impl LanguageModel for AIProviderClient {
    fn name(&self) -> String {
        format!("{}:{}", self.config.provider, self.config.model)
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self.config.provider {
            AIProvider::OpenAI => self.chat_openai(request).await,
            AIProvider::Ollama => self.chat_ollama(request).await,
        }
    }
}

fn non_empty(content: Option<&str>, what: &str) -> Result<String, ProviderError> {
    match content.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        Some(_) => Err(ProviderError::MalformedResponse(format!("empty {what} content"))),
        None => Err(ProviderError::MalformedResponse(format!("invalid {what} response format"))),
    }
}

pub fn parse_openai_content(response_json: &Value) -> Result<String, ProviderError> {
    non_empty(response_json["choices"][0]["message"]["content"].as_str(), "OpenAI")
}

pub fn parse_ollama_content(response_json: &Value) -> Result<String, ProviderError> {
    non_empty(response_json["message"]["content"].as_str(), "Ollama")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(context: Option<&str>) -> CompletionRequest {
        CompletionRequest {
            system_instruction: "Be brief.".to_string(),
            context: context.map(str::to_string),
            messages: vec![ChatMessage::assistant("Hi!"), ChatMessage::user("How am I doing?")],
        }
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("OpenAI".parse::<AIProvider>().unwrap(), AIProvider::OpenAI);
        assert_eq!("gpt".parse::<AIProvider>().unwrap(), AIProvider::OpenAI);
        assert_eq!("ollama".parse::<AIProvider>().unwrap(), AIProvider::Ollama);
        assert!("claude".parse::<AIProvider>().is_err());
        assert_eq!(AIProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_system_prompt_appends_context() {
        assert_eq!(request(None).system_prompt(), "Be brief.");
        assert_eq!(
            request(Some("Total: 2 t")).system_prompt(),
            "Be brief.\n\nTotal: 2 t"
        );
    }

    #[test]
    fn test_wire_messages_start_with_system() {
        let wire = request(Some("ctx")).wire_messages();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "assistant");
        assert_eq!(wire[2], json!({"role": "user", "content": "How am I doing?"}));
    }

    #[test]
    fn test_parse_openai_content() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": " Cycle more. "}}]});
        assert_eq!(parse_openai_content(&body).unwrap(), "Cycle more.");

        let missing = json!({"choices": []});
        assert!(matches!(
            parse_openai_content(&missing),
            Err(ProviderError::MalformedResponse(_))
        ));

        let blank = json!({"choices": [{"message": {"content": "   "}}]});
        assert!(matches!(
            parse_openai_content(&blank),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_ollama_content() {
        let body = json!({"message": {"role": "assistant", "content": "Eat local."}});
        assert_eq!(parse_ollama_content(&body).unwrap(), "Eat local.");
        assert!(parse_ollama_content(&json!({"error": "model not found"})).is_err());
    }

    #[test]
    fn test_openai_client_requires_key() {
        let config = AIConfig::default();
        assert!(matches!(
            AIProviderClient::new(config),
            Err(ProviderError::Unavailable(_))
        ));

        let config = AIConfig {
            api_key: Some(String::new()),
            ..AIConfig::default()
        };
        assert!(matches!(
            AIProviderClient::new(config),
            Err(ProviderError::Unavailable(_))
        ));
    }

    #[test]
    fn test_ollama_client_needs_no_key() {
        let config = AIConfig {
            provider: AIProvider::Ollama,
            model: "qwen2.5".to_string(),
            ..AIConfig::default()
        };
        let client = AIProviderClient::new(config).unwrap();
        assert_eq!(client.name(), "ollama:qwen2.5");
        assert_eq!(client.get_provider(), AIProvider::Ollama);
    }
}

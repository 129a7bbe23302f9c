use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::errors::OracleError;
use crate::oracle::ReasoningOracle;
use crate::prompt::OraclePrompt;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

const SYSTEM_PROMPT: &str =
    "You decide how an automated explorer should treat one UI element. Answer with a single JSON object.";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct OpenAiCompatibleOracle {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiCompatibleOracle {
    pub fn new(config: OpenAiConfig) -> Result<Self, OracleError> {
        if config.api_keys.is_empty() {
            return Err(OracleError::Config("missing API key for reasoning oracle".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }
}

#[async_trait]
impl ReasoningOracle for OpenAiCompatibleOracle {
    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let user_prompt = prompt.render();

        let mut last_error: Option<OracleError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let body = ChatCompletionRequest {
                model: self.config.model.clone(),
                temperature: self.config.temperature,
                response_format: ResponseFormat {
                    r#type: "json_object".to_string(),
                },
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: user_prompt.clone(),
                    },
                ],
            };
            let response = match self.client.post(&url).bearer_auth(key).json(&body).send().await {
                Ok(resp) => resp,
                Err(err) if err.is_timeout() => {
                    return Err(OracleError::Timeout(self.config.timeout));
                }
                Err(err) => {
                    last_error = Some(OracleError::transport(format!("request failed: {err}")));
                    continue;
                }
            };
            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = rate_limit_message(&text);
                    warn!(
                        target: "oracle",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        "oracle rate limited; switching API key"
                    );
                    last_error = Some(OracleError::Status {
                        status: status.as_u16(),
                        body: friendly,
                    });
                    continue;
                }
                return Err(OracleError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }
            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| OracleError::missing(format!("response invalid: {err}")))?;
            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_ref())
                .and_then(ChatCompletionContent::as_text)
                .ok_or_else(|| OracleError::missing("response missing content"));
        }
        Err(last_error.unwrap_or_else(|| OracleError::transport("request exhausted all API keys")))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        let text = match self {
            ChatCompletionContent::Text(value) => value.clone(),
            ChatCompletionContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| part.text.as_ref())
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("rate limit exceeded: {}", message.trim());
        }
    }
    "rate limit exceeded; retry later".to_string()
}

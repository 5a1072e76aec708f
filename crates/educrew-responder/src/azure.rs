//! Azure OpenAI chat-completions responder.
//!
//! ## Environment Variables
//! - `AZURE_OPENAI_API_KEY` - API key sent in the `api-key` header
//! - `AZURE_OPENAI_ENDPOINT` - Resource endpoint, e.g. `https://my-resource.openai.azure.com`
//! - `AZURE_OPENAI_DEPLOYMENT_NAME` - Deployment to call
//! - `AZURE_OPENAI_API_VERSION` - API version query parameter (default: `2024-02-01`)

use async_trait::async_trait;
use educrew_core::ConfigError;
use educrew_core::env::{EnvLookup, ProcessEnv, get_env_string};
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::ResponderError;
use crate::responder::{GenerationRequest, Responder};

const DEFAULT_API_VERSION: &str = "2024-02-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for an Azure OpenAI deployment.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
    pub api_key: String,
}

impl std::fmt::Debug for AzureOpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiConfig")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl AzureOpenAiConfig {
    /// Load the connection settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` when a required variable is
    /// missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            get_env_string(env, key).ok_or_else(|| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: "variable is required".to_string(),
            })
        };
        Ok(Self {
            endpoint: required("AZURE_OPENAI_ENDPOINT")?,
            deployment: required("AZURE_OPENAI_DEPLOYMENT_NAME")?,
            api_key: required("AZURE_OPENAI_API_KEY")?,
            api_version: get_env_string(env, "AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        })
    }

    /// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
    pub fn completions_url(&self) -> Result<Url, ConfigError> {
        let raw = format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint.trim_end_matches('/'),
            self.deployment
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| ConfigError::ValidationError(format!("Invalid endpoint '{}': {}", raw, e)))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Responder backed by an Azure OpenAI chat deployment.
#[derive(Clone)]
pub struct AzureOpenAiResponder {
    url: Url,
    api_key: String,
    http: Client,
}

impl std::fmt::Debug for AzureOpenAiResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiResponder")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl AzureOpenAiResponder {
    pub fn new(config: AzureOpenAiConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("educrew/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConfigError::ValidationError(format!("Failed to create HTTP client: {}", e))
            })?;
        Self::with_http_client(config, http)
    }

    pub fn with_http_client(config: AzureOpenAiConfig, http: Client) -> Result<Self, ConfigError> {
        Ok(Self {
            url: config.completions_url()?,
            api_key: config.api_key,
            http,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(AzureOpenAiConfig::from_env()?)
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Responder for AzureOpenAiResponder {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ResponderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });
        let body = ChatRequest {
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        debug!(url = %self.url, language = request.language.code(), "Calling Azure OpenAI");

        let response = self
            .http
            .post(self.url.clone())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ResponderError::Throttled {
                retry_after: parse_retry_after(&response),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ResponderError::failed(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResponderError::failed(format!("Malformed completion: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ResponderError::failed("Empty completion"))
    }

    fn name(&self) -> &str {
        "azure_openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::Language;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> AzureOpenAiConfig {
        AzureOpenAiConfig {
            endpoint: server.uri(),
            deployment: "kids-gpt".to_string(),
            api_version: "2024-02-01".to_string(),
            api_key: "secret".to_string(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("Give a hint about red", Language::En)
            .with_system_prompt("You are kind")
            .with_max_tokens(80)
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/kids-gpt/chat/completions"))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "secret"))
            .and(body_partial_json(json!({
                "max_tokens": 80,
                "messages": [
                    { "role": "system", "content": "You are kind" },
                    { "role": "user", "content": "Give a hint about red" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": " Look for apples! " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let responder = AzureOpenAiResponder::new(config_for(&server)).unwrap();
        let text = responder.generate(&request()).await.unwrap();
        assert_eq!(text, "Look for apples!");
    }

    #[tokio::test]
    async fn test_429_maps_to_throttled_with_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let responder = AzureOpenAiResponder::new(config_for(&server)).unwrap();
        let err = responder.generate(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ResponderError::Throttled {
                retry_after: Some(Duration::from_secs(7))
            }
        );
    }

    #[tokio::test]
    async fn test_server_error_and_empty_completion_are_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let responder = AzureOpenAiResponder::new(config_for(&server)).unwrap();
        let first = responder.generate(&request()).await.unwrap_err();
        assert!(matches!(first, ResponderError::Failed(ref msg) if msg.contains("500")));
        let second = responder.generate(&request()).await.unwrap_err();
        assert_eq!(second, ResponderError::failed("Empty completion"));
    }

    #[test]
    fn test_config_requires_credentials() {
        let err = AzureOpenAiConfig::from_lookup(&|k: &str| {
            (k == "AZURE_OPENAI_ENDPOINT").then(|| "https://x.openai.azure.com".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref key, .. } if key == "AZURE_OPENAI_DEPLOYMENT_NAME"));
    }

    #[test]
    fn test_completions_url() {
        let config = AzureOpenAiConfig {
            endpoint: "https://x.openai.azure.com/".to_string(),
            deployment: "d".to_string(),
            api_version: "v1".to_string(),
            api_key: "k".to_string(),
        };
        assert_eq!(
            config.completions_url().unwrap().as_str(),
            "https://x.openai.azure.com/openai/deployments/d/chat/completions?api-version=v1"
        );
    }
}

//! Azure OpenAI chat completions.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{check_status, DeckGenerator, GenerateError, DECK_INSTRUCTIONS};

pub const API_VERSION: &str = "2024-05-01-preview";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";

// === API Request/Response Types ===

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Generator backed by an Azure OpenAI deployment.
pub struct AzureOpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    system_message: String,
}

impl AzureOpenAiGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            deployment: deployment.into(),
            system_message: DECK_INSTRUCTIONS.to_string(),
        })
    }

    /// Replace the default deck instructions.
    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, API_VERSION
        )
    }
}

#[async_trait]
impl DeckGenerator for AzureOpenAiGenerator {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn generate(&self, message: &str) -> Result<String, GenerateError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens: 16384,
            temperature: 0.7,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        tracing::info!("Requesting completion from deployment {}", self.deployment);
        let resp = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let response: ChatResponse = check_status(resp).await?.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerateError::EmptyResponse)
    }
}

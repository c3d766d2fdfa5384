use crate::error::AssistantError;
use crate::llm::traits::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "llama3-8b-8192".to_string(),
            base_url: "https://api.groq.com".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<Value>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

#[derive(Debug, Deserialize)]
struct GroqMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl CompletionClient for GroqClient {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        params: &SamplingParams,
    ) -> Result<Completion, AssistantError> {
        let url = format!("{}/openai/v1/chat/completions", self.base_url);

        let wire_messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role,
                    "content": m.content,
                })
            })
            .collect();

        let request_body = GroqRequest {
            model: self.model.clone(),
            messages: wire_messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(AssistantError::Completion(format!(
                "Groq API error ({}): {}",
                status, response_text
            )));
        }

        let api_response: GroqResponse = serde_json::from_str(&response_text)
            .map_err(|e| AssistantError::Completion(format!("Failed to parse response: {e}")))?;

        let content = api_response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AssistantError::Completion("No response from AI".into()));
        }

        Ok(Completion {
            content,
            usage: api_response.usage,
        })
    }
}

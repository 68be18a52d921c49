//! Vision model client
//!
//! Sends a photo plus an instruction prompt to an OpenAI-compatible chat
//! completions endpoint and returns the raw text of the first choice.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::models::Photo;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";
const USER_AGENT: &str = concat!("curio-id/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 200;

const SEARCH_TERMS_PROMPT: &str = "Analyze this image of a collectible item. \
Extract 2-4 key search terms that would help find this exact product online, \
such as the product name, character, series or year. \
Return only the search terms separated by spaces, no other text.";

const STRUCTURED_RECORD_PROMPT: &str = "Analyze this image of a collectible item \
(such as a Hallmark Keepsake ornament) and return ONLY a JSON object with these fields: \
{\"title\": \"product name\", \
\"description\": \"short description of the item\", \
\"brand\": \"manufacturer or brand, or null\", \
\"series_name\": \"collection or series name, or null\", \
\"year_released\": year as a number or null, \
\"condition\": \"visible condition such as Mint, Excellent, Good or Fair, or null\", \
\"tags\": [\"relevant\", \"keywords\"]}. \
Use null for anything you cannot determine. Do not include any other text.";

/// Vision client errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision backend not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Vision response had no content")]
    EmptyContent,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Instruction sent along with the photo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptVariant {
    /// Space-separated search terms
    SearchTerms,
    /// JSON object with the vision record fields
    StructuredRecord,
}

impl PromptVariant {
    pub fn prompt(&self) -> &'static str {
        match self {
            PromptVariant::SearchTerms => SEARCH_TERMS_PROMPT,
            PromptVariant::StructuredRecord => STRUCTURED_RECORD_PROMPT,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            PromptVariant::SearchTerms => 50,
            PromptVariant::StructuredRecord => 500,
        }
    }
}

/// Anything that can describe a photo in text
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn describe(&self, photo: &Photo, variant: PromptVariant) -> Result<String, VisionError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize, Serialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible vision client
pub struct OpenAiVisionClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiVisionClient {
    pub fn new(api_key: String, model: Option<String>) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Point the client at another chat completions URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, photo: &Photo, variant: PromptVariant) -> serde_json::Value {
        json!({
            "model": self.model,
            "max_tokens": variant.max_tokens(),
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": variant.prompt() },
                    { "type": "image_url", "image_url": { "url": photo.to_data_url() } }
                ]
            }]
        })
    }
}

#[async_trait]
impl VisionBackend for OpenAiVisionClient {
    async fn describe(&self, photo: &Photo, variant: PromptVariant) -> Result<String, VisionError> {
        tracing::debug!(
            model = %self.model,
            variant = ?variant,
            mime_type = photo.mime_type(),
            bytes = photo.len(),
            "Querying vision model"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(photo, variant))
            .send()
            .await
            .map_err(|e| VisionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(VisionError::Api(status.as_u16(), body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| VisionError::Parse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(VisionError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model() {
        let client = OpenAiVisionClient::new("key".to_string(), None).unwrap();
        assert_eq!(client.model(), DEFAULT_VISION_MODEL);

        let client = OpenAiVisionClient::new("key".to_string(), Some("  ".to_string())).unwrap();
        assert_eq!(client.model(), DEFAULT_VISION_MODEL);

        let client =
            OpenAiVisionClient::new("key".to_string(), Some("gpt-4o-mini".to_string())).unwrap();
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_request_body_inlines_image() {
        let client = OpenAiVisionClient::new("key".to_string(), None).unwrap();
        let photo = Photo::new(b"abc".to_vec(), Some("image/png")).unwrap();
        let body = client.request_body(&photo, PromptVariant::SearchTerms);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 50);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_prompt_variants() {
        assert_eq!(PromptVariant::StructuredRecord.max_tokens(), 500);
        assert!(PromptVariant::StructuredRecord.prompt().contains("series_name"));
        assert!(PromptVariant::SearchTerms.prompt().contains("separated by spaces"));
    }

    #[test]
    fn test_completion_parsing() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"snowy owl ornament"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("snowy owl ornament")
        );

        let parsed: ChatCompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.choices.is_empty());
    }
}

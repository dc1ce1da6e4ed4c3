mod client;
pub(crate) mod types;

use crate::error::{AiClientError, Result};

use client::ClaudeClient;
use types::*;

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            AiClientError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Force a tool call against `schema` and return the raw tool input.
    /// Callers that must never fail on a malformed field parse the value
    /// leniently themselves.
    pub async fn extract_raw(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let request = self
            .structured_request(system_prompt.into(), schema)
            .message(WireMessage::user(user_prompt));

        self.send_structured(request).await
    }

    /// Like [`Claude::extract_raw`], but the user turn carries image URLs
    /// ahead of the text prompt (vision path). The API fetches the images.
    pub async fn extract_raw_from_images(
        &self,
        system_prompt: impl Into<String>,
        image_urls: &[String],
        user_prompt: impl Into<String>,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let sources = image_urls
            .iter()
            .map(|url| ImageSource::Url { url: url.clone() })
            .collect();
        let request = self
            .structured_request(system_prompt.into(), schema)
            .message(WireMessage::user_with_images(sources, user_prompt));

        self.send_structured(request).await
    }

    fn structured_request(&self, system: String, schema: serde_json::Value) -> ChatRequest {
        let tool_name = "structured_response";
        let mut request = ChatRequest::new(&self.model)
            .system(system)
            .max_tokens(4096)
            .temperature(0.0)
            .tool(ToolDefinitionWire {
                name: tool_name.to_string(),
                description: "Report the structured result for the input.".to_string(),
                input_schema: schema,
            });
        request.tool_choice = Some(serde_json::json!({
            "type": "tool",
            "name": tool_name,
        }));
        request
    }

    async fn send_structured(&self, request: ChatRequest) -> Result<serde_json::Value> {
        let response = self.client().chat(&request).await?;

        let input = response.tool_input().ok_or_else(|| {
            AiClientError::EmptyResponse("no structured output in Claude response".to_string())
        })?;

        Ok(input.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_new() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001");
        assert_eq!(ai.model(), "claude-haiku-4-5-20251001");
    }

    #[test]
    fn test_claude_with_base_url() {
        let ai = Claude::new("sk-ant-test", "claude-haiku-4-5-20251001")
            .with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
    }
}

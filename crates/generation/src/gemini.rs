//! Google Gemini REST implementation of `TextGenerator`.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{Generation, GenerationError, GenerationRequest, ModelTier, TextGenerator};

/// Gemini endpoint and sampling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the models collection
    pub base_url: String,
    pub pro_model: String,
    pub flash_model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub pro_max_output_tokens: u32,
    pub flash_max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            pro_model: "gemini-1.5-pro-latest".to_string(),
            flash_model: "gemini-1.5-flash-latest".to_string(),
            temperature: 0.3,
            top_k: 40,
            top_p: 0.95,
            pro_max_output_tokens: 2048,
            flash_max_output_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

/// Gemini generation client.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(api_key: impl Into<String>, config: GeminiConfig) -> Result<Self, GenerationError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(GenerationError::Config("Gemini API key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Config(e.to_string()))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Model name used for a tier.
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Pro => &self.config.pro_model,
            ModelTier::Flash => &self.config.flash_model,
        }
    }

    fn build_body(&self, request: &GenerationRequest) -> GeminiRequest {
        let mut parts = vec![GeminiPart {
            text: Some(request.prompt.clone()),
            inline_data: None,
        }];
        parts.extend(request.images.iter().map(|image| GeminiPart {
            text: None,
            inline_data: Some(GeminiInlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            }),
        }));

        let max_output_tokens = match request.tier {
            ModelTier::Pro => self.config.pro_max_output_tokens,
            ModelTier::Flash => self.config.flash_max_output_tokens,
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                max_output_tokens,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema: request.response_schema.clone(),
            },
        }
    }

    fn extract_text(response: GeminiResponse) -> Result<String, GenerationError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("no candidates".to_string()))?;

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(format!(
                "empty content (finish reason: {})",
                finish_reason
            )));
        }
        Ok(text)
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerationError> {
        let model = self.model_for(request.tier).to_string();
        let url = format!("{}/{}:generateContent", self.config.base_url, model);

        debug!(model = %model, images = request.images.len(), "Sending generation request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| {
                error!(model = %model, error = %e, "Gemini request failed");
                GenerationError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| e.error)
                .unwrap_or_default();
            error!(model = %model, status = %status, detail = %detail.message, "Gemini error");

            if status == StatusCode::TOO_MANY_REQUESTS || detail.status == "RESOURCE_EXHAUSTED" {
                return Err(GenerationError::QuotaExhausted);
            }
            let message = if detail.message.is_empty() {
                format!("HTTP {}", status)
            } else {
                detail.message
            };
            return Err(GenerationError::Unavailable(message));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let text = Self::extract_text(parsed)?;
        Ok(Generation { text, model })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InlineImage;
    use mockito::Matcher;

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(
            "test-key",
            GeminiConfig {
                base_url,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GeminiClient::new("", GeminiConfig::default()),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn test_body_shape() {
        let client = client("http://localhost".into());
        let request = GenerationRequest::new("describe", ModelTier::Flash)
            .with_image(InlineImage {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            })
            .with_schema(serde_json::json!({"type": "OBJECT"}));

        let body = serde_json::to_value(client.build_body(&request)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "describe");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn test_generate_returns_text_and_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Regex(r"^/models/gemini-1\.5-pro-latest:generateContent".into()))
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"RISCHIO: ALTO"}]},"finishReason":"STOP"}]}"#)
            .create_async()
            .await;

        let client = client(format!("{}/models", server.url()));
        let generation = client
            .generate(&GenerationRequest::new("analyse", ModelTier::Pro))
            .await
            .unwrap();

        assert_eq!(generation.text, "RISCHIO: ALTO");
        assert_eq!(generation.model, "gemini-1.5-pro-latest");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_resource_exhausted_is_quota() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Regex("generateContent".into()))
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let client = client(format!("{}/models", server.url()));
        let result = client
            .generate(&GenerationRequest::new("analyse", ModelTier::Pro))
            .await;
        assert!(matches!(result, Err(GenerationError::QuotaExhausted)));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Regex("generateContent".into()))
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = client(format!("{}/models", server.url()));
        let result = client
            .generate(&GenerationRequest::new("analyse", ModelTier::Flash))
            .await;
        assert!(matches!(result, Err(GenerationError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_blocked_content_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Regex("generateContent".into()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
            .create_async()
            .await;

        let client = client(format!("{}/models", server.url()));
        let result = client
            .generate(&GenerationRequest::new("analyse", ModelTier::Flash))
            .await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }
}

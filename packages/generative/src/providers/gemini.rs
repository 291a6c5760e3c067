//! Gemini provider implementation.
//!
//! Structured generation uses `response_mime_type: "application/json"` with
//! a `response_schema`; grounded generation attaches the `google_search`
//! tool instead. The API rejects requests combining both, which is why the
//! two live behind separate trait methods.

use haul_advisor_models::SourceRef;
use serde::Serialize;

use super::{GenerativeProvider, GroundedAnswer};
use crate::ProviderError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini `generateContent` API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Sends a `generateContent` request and returns the parsed JSON body.
    ///
    /// HTTP 429 maps to [`ProviderError::RateLimited`] here, at the
    /// transport adapter, so no caller ever matches on status codes or
    /// quota message text.
    async fn generate(&self, request: &GeminiRequest<'_>) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{BASE_URL}/{}:generateContent", self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }

        let body: serde_json::Value = resp.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .map_or_else(|| format!("HTTP {status}"), String::from);
            return Err(ProviderError::Provider { message });
        }

        Ok(body)
    }
}

/// Gemini API request body.
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig<'a> {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'a str,
    #[serde(rename = "responseSchema")]
    response_schema: &'a serde_json::Value,
}

fn user_content(prompt: &str) -> Vec<GeminiContent<'_>> {
    vec![GeminiContent {
        role: "user",
        parts: vec![GeminiPart { text: prompt }],
    }]
}

/// Concatenates the text parts of the first candidate.
fn extract_text(body: &serde_json::Value) -> Result<String, ProviderError> {
    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| ProviderError::Malformed {
            message: "response has no candidate content parts".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(ProviderError::Malformed {
            message: "candidate contains no text parts".to_string(),
        });
    }
    Ok(text)
}

/// Parses a structured-mode response body into the schema-constrained JSON.
fn parse_structured(body: &serde_json::Value) -> Result<serde_json::Value, ProviderError> {
    let text = extract_text(body)?;
    serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
        message: format!("structured output is not valid JSON: {e}"),
    })
}

/// Parses a grounded-mode response body into narrative + cited sources.
fn parse_grounded(body: &serde_json::Value) -> Result<GroundedAnswer, ProviderError> {
    let text = extract_text(body)?;

    let sources = body["candidates"][0]["groundingMetadata"]["groundingChunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = &chunk["web"];
                    let uri = web["uri"].as_str()?;
                    Some(SourceRef {
                        title: web["title"].as_str().unwrap_or(uri).to_string(),
                        uri: uri.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GroundedAnswer { text, sources })
}

#[async_trait::async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let request = GeminiRequest {
            contents: user_content(prompt),
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
            tools: None,
        };
        let body = self.generate(&request).await?;
        parse_structured(&body)
    }

    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedAnswer, ProviderError> {
        let request = GeminiRequest {
            contents: user_content(prompt),
            generation_config: None,
            tools: Some(vec![serde_json::json!({ "google_search": {} })]),
        };
        let body = self.generate(&request).await?;
        parse_grounded(&body)
    }
}

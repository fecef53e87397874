//! Generative-language API client for listing content.

use crate::error::{AutofillError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Header carrying the API key; request URLs stay key-free
const API_KEY_HEADER: &str = "x-goog-api-key";

const FORMAT_SUFFIX: &str =
    "\n\nReturn the result as JSON with strict format: { \"title\": \"...\", \"tags\": [\"tag1\", \"tag2\"] }";

/// Base64 image payload sent with the prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub mime_type: String,
    /// Base64 without the `data:` prefix
    pub data: String,
}

impl ImageData {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self { mime_type: mime_type.into(), data: STANDARD.encode(bytes) }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (meta, data) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        if data.is_empty() {
            return None;
        }
        Some(Self { mime_type: mime_type.to_string(), data: data.to_string() })
    }
}

/// Title and tags produced for a listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GeneratedContent {
    pub fn new(title: impl Into<String>, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { title: Some(title.into()), tags: tags.into_iter().map(Into::into).collect() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: ImageData },
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Client for `models/{model}:generateContent`.
///
/// The API key is supplied per call so a rotation can try several keys with one client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, base_url: base_url.into() })
    }

    /// One generation call with one key; 429 surfaces as [`AutofillError::RateLimited`]
    pub async fn generate(&self, api_key: &str, model: &str, prompt: &str, image: &ImageData) -> Result<GeneratedContent> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: format!("{}{}", prompt, FORMAT_SUFFIX) },
                    Part::InlineData { inline_data: image.clone() },
                ],
            }],
            generation_config: GenerationConfig { response_mime_type: "application/json".to_string() },
        };

        debug!("generateContent: model={}", model);

        let response = self.client.post(&url).header(API_KEY_HEADER, api_key).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AutofillError::RateLimited);
        }
        if !status.is_success() {
            return Err(AutofillError::Api { status: status.as_u16(), body });
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<GeneratedContent> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AutofillError::MalformedContent(format!("Failed to parse response: {}", e)))?;

    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .and_then(|p| p.text.as_deref())
        .ok_or_else(|| AutofillError::MalformedContent("response has no candidate text".to_string()))?;

    parse_content(text)
}

/// Parse the model's text as `{title, tags}`, tolerating markdown code fences around it
pub fn parse_content(text: &str) -> Result<GeneratedContent> {
    let clean = strip_code_fences(text);
    serde_json::from_str(&clean).map_err(|e| AutofillError::MalformedContent(format!("Failed to parse JSON: {}", e)))
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

use leadpipe_core::{Error, ExtractionModel, ModelFactory, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

/// Google Gemini text-completion client.
///
/// Built per request: the API key arrives with each job and is never stored
/// beyond the model's lifetime.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiModel {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait::async_trait]
impl ExtractionModel for GeminiModel {
    async fn complete(&self, prompt: &str, input: &str) -> Result<String> {
        // One content with two parts, instruction first: the model treats the
        // leading part as the task and the second as the material.
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart {
                        text: prompt.to_string(),
                    },
                    GeminiPart {
                        text: input.to_string(),
                    },
                ],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .timeout(COMPLETION_TIMEOUT)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("gemini request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                429 => Error::Extraction("gemini rate limit exceeded".to_string()),
                401 => Error::Extraction("gemini rejected the API key".to_string()),
                403 => Error::Extraction("gemini access forbidden".to_string()),
                _ => {
                    let detail = resp.text().await.unwrap_or_default();
                    Error::Extraction(format!("gemini HTTP {status}: {detail}"))
                }
            });
        }

        let parsed: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| Error::Extraction(format!("gemini response unreadable: {e}")))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| Error::Extraction("gemini returned no candidates".to_string()))
    }
}

/// Builds a [`GeminiModel`] per caller-supplied key, sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct GeminiFactory {
    client: reqwest::Client,
    model: String,
}

impl GeminiFactory {
    pub fn new(client: reqwest::Client, model: String) -> Self {
        Self { client, model }
    }
}

impl ModelFactory for GeminiFactory {
    fn for_api_key(&self, api_key: &str) -> Arc<dyn ExtractionModel> {
        Arc::new(GeminiModel::new(
            self.client.clone(),
            api_key.to_string(),
            self.model.clone(),
        ))
    }
}

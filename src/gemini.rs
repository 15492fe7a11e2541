//! Gemini REST client: text generation and embeddings.
//!
//! Carries the retry strategy used for all model traffic:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Responses are validated into typed structs here; a payload missing its
//! candidate text or embedding values is an error at this boundary, which
//! the summarizer and embedder then absorb into their sentinels.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

const USER_AGENT: &str = "repolore";

// ─── Typed API payloads ───

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn extract_text(resp: GenerateResponse) -> Result<String> {
    let text = resp
        .candidates
        .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .map(|parts| {
            parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::bad_response("Gemini generate", "no candidate text"));
    }
    Ok(text)
}

fn extract_embedding(resp: EmbedResponse, expected_dims: usize) -> Result<Vec<f32>> {
    let values = resp
        .embedding
        .map(|e| e.values)
        .ok_or_else(|| Error::bad_response("Gemini embed", "missing embedding values"))?;

    if values.len() != expected_dims {
        return Err(Error::bad_response(
            "Gemini embed",
            format!("expected {} dims, got {}", expected_dims, values.len()),
        ));
    }
    Ok(values)
}

/// Gemini API client for text generation and embeddings.
///
/// Cheap to clone; clones share the underlying HTTP pool.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    /// Generate text from prompt parts (concatenated in order by the model).
    pub async fn generate_text(&self, prompt_parts: &[String]) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: prompt_parts
                    .iter()
                    .map(|p| Part { text: p.clone() })
                    .collect(),
            }],
        };

        let resp = self.post_with_retry(&url, &body, "Gemini generate").await?;
        extract_text(resp.json().await.map_err(|e| {
            Error::bad_response("Gemini generate", e.to_string())
        })?)
    }

    /// Embed one text into a fixed-dimension vector.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent",
            self.config.api_base, self.config.embedding_model
        );
        let body = EmbedRequest {
            model: format!("models/{}", self.config.embedding_model),
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let resp = self.post_with_retry(&url, &body, "Gemini embed").await?;
        extract_embedding(
            resp.json().await.map_err(|e| {
                Error::bad_response("Gemini embed", e.to_string())
            })?,
            self.config.embedding_dims,
        )
    }

    async fn post_with_retry<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        context: &'static str,
    ) -> Result<reqwest::Response> {
        let api_key = self.config.resolve_api_key()?;
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(url)
                .query(&[("key", api_key.as_str())])
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(Error::Model(format!(
                            "{} error {}: {}",
                            context, status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(Error::Model(format!(
                        "{} error {}: {}",
                        context, status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Model(format!("{} failed after retries", context))))
    }
}

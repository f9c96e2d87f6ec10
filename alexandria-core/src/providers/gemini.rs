//! Gemini: the sole AI provider, used for book generation only. Prompt
//! construction lives here, keyed off the closed `PromptVariant` registry —
//! the orchestrator has already rejected anything not in that set before
//! this is reached.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use alexandria_contracts::error::{AlexandriaError, Result};
use alexandria_contracts::providers::{BookGenerator, GeneratedBook, Provider, PromptVariant, ServiceContext};
use alexandria_model::{Capability, ProviderType};

use crate::http_client::{FetchOptions, HttpClient};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedBookList {
    books: Vec<GeneratedBook>,
}

pub struct GeminiProvider {
    api_key: String,
    http: Arc<tokio::sync::Mutex<HttpClient>>,
}

impl GeminiProvider {
    pub fn new(api_key: String, http: Arc<tokio::sync::Mutex<HttpClient>>) -> Self {
        Self { api_key, http }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Ai
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::BookGeneration]
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl BookGenerator for GeminiProvider {
    async fn generate_books(&self, prompt: PromptVariant, count: u32, ctx: &ServiceContext) -> Result<Vec<GeneratedBook>> {
        let request = GenerateRequest {
            contents: vec![Content { parts: vec![Part { text: prompt_text(prompt, count) }] }],
            generation_config: GenerationConfig { response_mime_type: "application/json".to_string() },
        };

        let url = format!("{BASE_URL}?key={}", self.api_key);
        let mut client = self.http.lock().await;
        let mut opts = FetchOptions::get("gemini", "book-generation");
        opts.method = reqwest::Method::POST;
        opts.body = Some(serde_json::to_value(&request).map_err(|e| AlexandriaError::Internal(e.to_string()))?);
        opts.cache_ttl = None;
        opts.rate_limit_ms = 1000;

        let response: Option<GenerateResponse> = client.fetch(&url, opts, ctx).await?;

        let text = response
            .and_then(|r| r.candidates.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text);

        let Some(text) = text else { return Ok(Vec::new()) };

        let parsed: GeneratedBookList =
            serde_json::from_str(&text).map_err(|e| AlexandriaError::Internal(format!("malformed generation response: {e}")))?;

        Ok(parsed.books)
    }
}

/// Each variant nudges the same base instructions toward a different axis
/// (diversity of voice, overlooked significance, genre spread, era context,
/// or an annual retrospective); `Baseline` issues no extra steering text.
fn prompt_text(variant: PromptVariant, count: u32) -> String {
    let steering = match variant {
        PromptVariant::Baseline => "",
        PromptVariant::DiversityEmphasis => {
            " Favor authors from underrepresented regions and backgrounds."
        }
        PromptVariant::OverlookedSignificance => {
            " Favor historically significant works that are not already widely known."
        }
        PromptVariant::GenreRotation => " Spread selections across distinct genres; avoid clustering in one.",
        PromptVariant::EraContextualized => " Choose works notable relative to the literary context of their era.",
        PromptVariant::Annual => " Frame the selection as a retrospective best-of-year list.",
    };

    format!(
        "Suggest {count} historically or culturally significant published books.{steering} \
         Respond as JSON matching {{\"books\": [{{\"title\": string, \"author\": string, \
         \"publisher\": string | null, \"format\": string | null, \"year\": number | null, \
         \"significance\": string | null}}]}}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_variant_adds_no_steering_text() {
        let text = prompt_text(PromptVariant::Baseline, 5);
        assert!(!text.contains("underrepresented"));
    }

    #[test]
    fn diversity_variant_adds_steering_text() {
        let text = prompt_text(PromptVariant::DiversityEmphasis, 5);
        assert!(text.contains("underrepresented"));
    }
}

use std::time::Duration;

use base64::Engine as _;
use tracing::debug;

use crate::{
    backend::{GenerateRequest, ImageBackend},
    config::Config,
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Image generation through the Gemini `generateContent` endpoint.
///
/// Each call is one blocking HTTP request. Reference images are sent as inline base64 parts
/// ahead of the prompt text; the first inline image part of the first candidate is returned.
pub struct GeminiBackend {
    client: reqwest::blocking::Client,
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl GeminiBackend {
    /// Build a backend from resolved configuration. Fails when no API key is configured.
    pub fn from_config(cfg: &Config) -> FlipbookResult<Self> {
        let api_key = cfg.api_key.clone().ok_or_else(|| {
            FlipbookError::config("FLIPBOOK_API_KEY (or GEMINI_API_KEY) is not set")
        })?;
        Self::new(api_key, &cfg.api_base, &cfg.model, cfg.request_timeout)
    }

    /// Build a backend for an explicit endpoint and model.
    pub fn new(
        api_key: impl Into<String>,
        api_base: &str,
        model: &str,
        timeout: Duration,
    ) -> FlipbookResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlipbookError::backend(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    /// Full URL of the `generateContent` call for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

impl ImageBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GenerateRequest<'_>) -> FlipbookResult<Vec<u8>> {
        let body = build_request_body(request);
        let timeout = request.timeout.unwrap_or(self.timeout);
        debug!(model = %self.model, refs = request.reference_images.len(), ?timeout, "gemini request");

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    FlipbookError::backend(format!("request timed out after {timeout:?}"))
                } else {
                    FlipbookError::backend(format!("request failed: {e}"))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| FlipbookError::backend(format!("failed to read response body: {e}")))?;
        if !status.is_success() {
            return Err(FlipbookError::backend(format!(
                "HTTP {status}: {}",
                truncate(text.trim(), 400)
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| FlipbookError::backend(format!("malformed response: {e}")))?;
        extract_image(parsed)
    }
}

#[derive(serde::Serialize)]
struct RequestBody<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(serde::Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Inline { inline_data: RequestInline<'a> },
    Text { text: &'a str },
}

#[derive(serde::Serialize)]
struct RequestInline<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(serde::Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: [&'static str; 2],
}

fn build_request_body<'a>(request: &GenerateRequest<'a>) -> RequestBody<'a> {
    let mut parts: Vec<RequestPart<'a>> = request
        .reference_images
        .iter()
        .map(|img| RequestPart::Inline {
            inline_data: RequestInline {
                mime_type: &img.mime_type,
                data: base64::engine::general_purpose::STANDARD.encode(&img.bytes),
            },
        })
        .collect();
    parts.push(RequestPart::Text {
        text: request.prompt,
    });

    RequestBody {
        contents: [RequestContent { parts }],
        generation_config: GenerationConfig {
            response_modalities: ["TEXT", "IMAGE"],
        },
    }
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    #[serde(alias = "inline_data")]
    inline_data: Option<ResponseInline>,
}

#[derive(serde::Deserialize, Debug)]
struct ResponseInline {
    data: String,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn extract_image(resp: GenerateContentResponse) -> FlipbookResult<Vec<u8>> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(FlipbookError::backend(format!("prompt blocked: {reason}")));
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(FlipbookError::backend("response contained no candidates"));
    };

    let mut texts = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(inline) = part.inline_data {
            return base64::engine::general_purpose::STANDARD
                .decode(inline.data.as_bytes())
                .map_err(|e| FlipbookError::backend(format!("invalid base64 image data: {e}")));
        }
        if let Some(text) = part.text {
            texts.push(text);
        }
    }

    let mut msg = String::from("response contained no image");
    if let Some(reason) = candidate.finish_reason {
        msg.push_str(&format!(" (finish reason: {reason})"));
    }
    if !texts.is_empty() {
        msg.push_str(&format!(": {}", truncate(texts.join(" ").trim(), 200)));
    }
    Err(FlipbookError::backend(msg))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
#[path = "../../tests/unit/backend/gemini.rs"]
mod tests;

use std::env;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder used when the model's reply carries no `Summary:` block.
pub const NO_SUMMARY: &str = "No summary available";

/// Submits an encoded resume plus the screening prompt and returns the
/// model's raw text. The output template is a contract the far side
/// cannot be forced to honor, so callers parse it with
/// [`extract_review`], which degrades instead of failing.
pub trait ResumeAnalyzer {
    fn review(&self, pdf_base64: &str, keywords: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}

// --- Gemini provider ---

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ReplyCandidate>,
}

#[derive(Debug, Deserialize)]
struct ReplyCandidate {
    content: ReplyContent,
}

#[derive(Debug, Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

pub struct GeminiAnalyzer {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl GeminiAnalyzer {
    pub fn new() -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            Error::Config(
                "GEMINI_API_KEY environment variable not set. Set it with: \
                 export GEMINI_API_KEY=your-key-here"
                    .to_string(),
            )
        })?;
        Ok(Self {
            api_key,
            model_id: DEFAULT_MODEL.to_string(),
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl ResumeAnalyzer for GeminiAnalyzer {
    fn review(&self, pdf_base64: &str, keywords: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "application/pdf".to_string(),
                            data: pdf_base64.to_string(),
                        }),
                    },
                    Part {
                        text: Some(screening_prompt(keywords)),
                        inline_data: None,
                    },
                ],
            }],
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model_id, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| Error::Analysis(format!("failed to reach the AI service: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(Error::Analysis(format!(
                "AI request failed with status {}: {}",
                status, error_text
            )));
        }

        let reply: GenerateResponse = response
            .json()
            .map_err(|e| Error::Analysis(format!("failed to parse AI response: {}", e)))?;

        reply
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| Error::Analysis("no content in AI response".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

/// Prompt sent alongside the PDF. The last two lines are the template
/// `extract_review` looks for.
pub fn screening_prompt(keywords: &str) -> String {
    format!(
        "Analyze this resume and provide:\n\
         1. A summary of the candidate's skills and experience\n\
         2. Key strengths relevant to the position\n\
         3. Areas for improvement\n\
         4. A rating from 1 to 100 scored against these keywords: {}\n\n\
         Prefer precise ratings like 73, 82, or 88 over round numbers, and be \
         fair and objective.\n\n\
         Output MUST be in this EXACT format:\n\
         Rating: <number>\n\
         Summary: <detailed summary>\n\n\
         Keep it professional and concise.",
        keywords
    )
}

// --- Review extraction ---

static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Rating\s*:\s*(\d+)").expect("rating pattern"));
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)Summary\s*:\s*(.*)").expect("summary pattern"));

/// Pulls `(rating, summary)` out of the model's free-form reply.
/// Total over any input: a missing or unparseable rating reads as 0,
/// and a missing summary becomes [`NO_SUMMARY`]. Model output is
/// unreliable input; a formatting drift must never abort a submission.
pub fn extract_review(text: &str) -> (i64, String) {
    let rating = RATING_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .unwrap_or(0);

    let summary = SUMMARY_RE
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| NO_SUMMARY.to_string());

    (rating, summary)
}

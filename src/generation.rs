//! Generation backends for question answering, complaint classification,
//! and report drafting.
//!
//! [`Generator`] implements the core's [`AnalysisProvider`] and
//! [`DraftingProvider`] over one of:
//!
//! | Config Value | Backend |
//! |-------------|---------|
//! | `"disabled"` | always errors |
//! | `"gemini"` | `models/{model}:generateContent`, JSON response mode for classification, inline base64 attachments |
//! | `"openai"` | `/v1/chat/completions`; image attachments as data URLs, audio dropped with a warning |
//!
//! The prompts live here. Structured replies are returned raw; the core
//! parses them and substitutes its fallback record when they do not parse.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;

use nyaya_core::analysis::{
    AnalysisProvider, AnalysisRequest, Attachment, DraftingProvider, LegalAnalysis,
};
use nyaya_core::models::ContextPassage;

use crate::config::GenerationConfig;
use crate::http;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Returned by the answer prompt when the retrieved sections do not cover the query.
pub const NOT_IN_CONTEXT: &str =
    "The uploaded legal text does not appear to contain relevant sections for this query.";

// ============ Prompts ============

fn context_block(context: &[ContextPassage]) -> String {
    context
        .iter()
        .map(|p| format!("[{}]: {}", p.title, p.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn answer_prompt(query: &str, context: &[ContextPassage]) -> String {
    format!(
        r#"You are a legal assistant for the Bharatiya Nyaya Sanhita (BNS).

Complaint or question: "{query}"

Statute sections retrieved for this query:
{context}

Instructions:
1. Identify which of the sections above apply to the facts.
2. Explain why each applies.
3. Mention the punishment when the text states it.
4. If none of the sections answer the query, reply exactly: "{fallback}"

Answer in Markdown and bold every section number."#,
        query = query,
        context = context_block(context),
        fallback = NOT_IN_CONTEXT,
    )
}

fn analysis_prompt(request: &AnalysisRequest, context: &[ContextPassage]) -> String {
    let mut evidence = String::new();
    if request.audio.is_some() {
        evidence.push_str(
            "\nA voice recording of the complaint is attached. Transcribe it into \"transcription\" and treat it as part of the narrative.",
        );
    }
    if request.image.is_some() {
        evidence.push_str(
            "\nA photo is attached as evidence. Describe what it shows into \"visual_analysis\".",
        );
    }

    format!(
        r#"You are a police station intake officer applying the Bharatiya Nyaya Sanhita (BNS).

Complaint narrative:
"{narrative}"
{evidence}
Statute sections retrieved for this complaint:
{context}

Decide whether the complaint discloses a cognizable offence. Civil disputes (unpaid
money, deposits, contracts, boundary claims) and minor grievances are not cognizable.
If key facts are missing, say so instead of guessing.

If the narrative is not in English, set "detected_language" and put an English
rendering in "translated_narrative".

Reply with JSON only:
{{
  "classification": "Cognizable Offense" | "Non-Cognizable/Civil Dispute" | "Ambiguous/Need More Info",
  "bns_section": "most relevant section, e.g. BNS 303(2), or N/A",
  "confidence_score": 0-100,
  "reasoning": "short explanation grounded in the sections above",
  "missing_details": "facts the officer still needs, or None",
  "detected_language": "optional",
  "translated_narrative": "optional",
  "transcription": "optional",
  "visual_analysis": "optional"
}}"#,
        narrative = request.narrative,
        evidence = evidence,
        context = context_block(context),
    )
}

fn draft_prompt(narrative: &str, analysis: &LegalAnalysis) -> String {
    format!(
        r#"Draft a First Information Report (FIR) in formal police English.

Complainant's account:
"{narrative}"

Assessment: {classification}
Applicable section: {section}
Reasoning: {reasoning}

Use these headings: Police Station, Date and Time of Report, Complainant Details,
Nature of Offence, Sections Applied, Brief Facts, Action Taken. Leave details that
are not in the account as "[to be filled]". Plain text, no Markdown."#,
        narrative = narrative,
        classification = analysis.classification,
        section = analysis.bns_section,
        reasoning = analysis.reasoning,
    )
}

// ============ Gemini ============

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key: http::gemini_api_key()?,
            base_url: http::base_url(config.url.as_deref(), GEMINI_BASE_URL),
            model: required_model(config, "Gemini")?,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn generate(&self, parts: Vec<serde_json::Value>, json_mode: bool) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let mut generation_config = serde_json::json!({ "temperature": self.temperature });
        if json_mode {
            generation_config["responseMimeType"] = "application/json".into();
        }
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config,
        });
        let json = http::post_json(
            &self.client,
            &url,
            &[("x-goog-api-key", self.api_key.clone())],
            &body,
            self.max_retries,
            "Gemini",
        )
        .await?;
        parse_gemini_text(&json)
    }
}

fn gemini_inline(attachment: &Attachment) -> serde_json::Value {
    serde_json::json!({
        "inline_data": {
            "mime_type": attachment.mime_type,
            "data": base64::engine::general_purpose::STANDARD.encode(&attachment.data),
        }
    })
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_text(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: no candidate content"))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        bail!("Gemini returned an empty response");
    }
    Ok(text)
}

#[async_trait]
impl AnalysisProvider for GeminiGenerator {
    async fn answer(&self, query: &str, context: &[ContextPassage]) -> Result<String> {
        let parts = vec![serde_json::json!({ "text": answer_prompt(query, context) })];
        self.generate(parts, false).await
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        context: &[ContextPassage],
    ) -> Result<String> {
        let mut parts = vec![serde_json::json!({ "text": analysis_prompt(request, context) })];
        parts.extend(request.audio.iter().map(gemini_inline));
        parts.extend(request.image.iter().map(gemini_inline));
        self.generate(parts, true).await
    }
}

#[async_trait]
impl DraftingProvider for GeminiGenerator {
    async fn draft(&self, narrative: &str, analysis: &LegalAnalysis) -> Result<String> {
        let parts = vec![serde_json::json!({ "text": draft_prompt(narrative, analysis) })];
        self.generate(parts, false).await
    }
}

// ============ OpenAI ============

pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout_secs)?,
            api_key: http::openai_api_key()?,
            base_url: http::base_url(config.url.as_deref(), OPENAI_BASE_URL),
            model: required_model(config, "OpenAI")?,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    async fn complete(&self, content: serde_json::Value, json_mode: bool) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": content }],
        });
        if json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        let json = http::post_json(
            &self.client,
            &format!("{}/v1/chat/completions", self.base_url),
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_text(&json)
    }
}

fn parse_openai_text(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Chat content parts for a classification request.
fn openai_content(request: &AnalysisRequest, prompt: String) -> serde_json::Value {
    let mut parts = vec![serde_json::json!({ "type": "text", "text": prompt })];
    if let Some(audio) = &request.audio {
        tracing::warn!(mime_type = %audio.mime_type, "audio attachment not supported by the OpenAI backend, dropping");
    }
    if let Some(image) = &request.image {
        if image.mime_type.starts_with("image/") {
            let data = base64::engine::general_purpose::STANDARD.encode(&image.data);
            parts.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": format!("data:{};base64,{}", image.mime_type, data) },
            }));
        } else {
            tracing::warn!(mime_type = %image.mime_type, "attachment is not an image, dropping");
        }
    }
    serde_json::Value::Array(parts)
}

#[async_trait]
impl AnalysisProvider for OpenAiGenerator {
    async fn answer(&self, query: &str, context: &[ContextPassage]) -> Result<String> {
        self.complete(answer_prompt(query, context).into(), false)
            .await
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        context: &[ContextPassage],
    ) -> Result<String> {
        let content = openai_content(request, analysis_prompt(request, context));
        self.complete(content, true).await
    }
}

#[async_trait]
impl DraftingProvider for OpenAiGenerator {
    async fn draft(&self, narrative: &str, analysis: &LegalAnalysis) -> Result<String> {
        self.complete(draft_prompt(narrative, analysis).into(), false)
            .await
    }
}

// ============ Selection ============

/// The configured generation backend.
pub enum Generator {
    Disabled,
    Gemini(GeminiGenerator),
    OpenAi(OpenAiGenerator),
}

impl Generator {
    pub fn name(&self) -> &str {
        match self {
            Generator::Disabled => "disabled",
            Generator::Gemini(g) => &g.model,
            Generator::OpenAi(g) => &g.model,
        }
    }
}

#[async_trait]
impl AnalysisProvider for Generator {
    async fn answer(&self, query: &str, context: &[ContextPassage]) -> Result<String> {
        match self {
            Generator::Disabled => bail!("Generation provider is disabled"),
            Generator::Gemini(g) => g.answer(query, context).await,
            Generator::OpenAi(g) => g.answer(query, context).await,
        }
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        context: &[ContextPassage],
    ) -> Result<String> {
        match self {
            Generator::Disabled => bail!("Generation provider is disabled"),
            Generator::Gemini(g) => g.analyze(request, context).await,
            Generator::OpenAi(g) => g.analyze(request, context).await,
        }
    }
}

#[async_trait]
impl DraftingProvider for Generator {
    async fn draft(&self, narrative: &str, analysis: &LegalAnalysis) -> Result<String> {
        match self {
            Generator::Disabled => bail!("Generation provider is disabled"),
            Generator::Gemini(g) => g.draft(narrative, analysis).await,
            Generator::OpenAi(g) => g.draft(narrative, analysis).await,
        }
    }
}

fn required_model(config: &GenerationConfig, service: &str) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("generation.model required for {} provider", service))
}

pub fn create_generator(config: &GenerationConfig) -> Result<Generator> {
    match config.provider.as_str() {
        "disabled" => Ok(Generator::Disabled),
        "gemini" => Ok(Generator::Gemini(GeminiGenerator::new(config)?)),
        "openai" => Ok(Generator::OpenAi(OpenAiGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passages() -> Vec<ContextPassage> {
        vec![ContextPassage {
            title: "304. Snatching.".to_string(),
            content: "304. Snatching.\nWhoever suddenly seizes...".to_string(),
        }]
    }

    #[test]
    fn test_answer_prompt_embeds_context() {
        let prompt = answer_prompt("my chain was snatched", &passages());
        assert!(prompt.contains("\"my chain was snatched\""));
        assert!(prompt.contains("[304. Snatching.]: 304. Snatching.\nWhoever"));
        assert!(prompt.contains(NOT_IN_CONTEXT));
    }

    #[test]
    fn test_analysis_prompt_mentions_attachments_only_when_present() {
        let mut request = AnalysisRequest::text("my chain was snatched");
        let prompt = analysis_prompt(&request, &passages());
        assert!(!prompt.contains("voice recording"));
        assert!(prompt.contains("\"classification\": \"Cognizable Offense\""));

        request.audio = Some(Attachment {
            mime_type: "audio/webm".to_string(),
            data: vec![1, 2, 3],
        });
        let prompt = analysis_prompt(&request, &passages());
        assert!(prompt.contains("voice recording"));
        assert!(!prompt.contains("photo is attached"));
    }

    #[test]
    fn test_draft_prompt() {
        let prompt = draft_prompt("he took my bag", &LegalAnalysis::fallback());
        assert!(prompt.contains("Assessment: Ambiguous/Need More Info"));
        assert!(prompt.contains("Applicable section: N/A"));
    }

    #[test]
    fn test_gemini_inline_is_base64() {
        let part = gemini_inline(&Attachment {
            mime_type: "image/png".to_string(),
            data: b"hello".to_vec(),
        });
        assert_eq!(part["inline_data"]["data"], "aGVsbG8=");
        assert_eq!(part["inline_data"]["mime_type"], "image/png");
    }

    #[test]
    fn test_parse_gemini_text() {
        let json = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": " 1}" }] } }]
        });
        assert_eq!(parse_gemini_text(&json).unwrap(), "{\"a\": 1}");
        assert!(parse_gemini_text(&serde_json::json!({ "candidates": [] })).is_err());
        let blocked = serde_json::json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert!(parse_gemini_text(&blocked).is_err());
    }

    #[test]
    fn test_parse_openai_text() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "**Section 304**" } }]
        });
        assert_eq!(parse_openai_text(&json).unwrap(), "**Section 304**");
        assert!(parse_openai_text(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_openai_content_drops_audio_keeps_image() {
        let request = AnalysisRequest {
            narrative: "n".to_string(),
            audio: Some(Attachment {
                mime_type: "audio/webm".to_string(),
                data: vec![0],
            }),
            image: Some(Attachment {
                mime_type: "image/jpeg".to_string(),
                data: b"hi".to_vec(),
            }),
        };
        let content = openai_content(&request, "prompt".to_string());
        let parts = content.as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,aGk=");
    }

    #[tokio::test]
    async fn test_disabled_generator_errors() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(generator.name(), "disabled");
        assert!(generator.answer("q", &[]).await.is_err());
        assert!(generator
            .draft("n", &LegalAnalysis::fallback())
            .await
            .is_err());
    }
}

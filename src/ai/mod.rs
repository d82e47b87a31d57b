//! Text-generation boundary: task kinds, prompt templates and the generator
//! trait the rest of the app talks to.

pub mod gemini;

#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const TEMPERATURE: f32 = 0.7;
pub const TOP_K: u32 = 40;
pub const TOP_P: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiTask {
    FixGrammar,
    Continue,
    Summarize,
    GenerateTitle,
    GenerateTags,
}

impl AiTask {
    /// Menu order.
    pub const ALL: [AiTask; 5] = [
        AiTask::FixGrammar,
        AiTask::Continue,
        AiTask::Summarize,
        AiTask::GenerateTitle,
        AiTask::GenerateTags,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AiTask::FixGrammar => "Fix Grammar",
            AiTask::Continue => "Continue Writing",
            AiTask::Summarize => "Summarize",
            AiTask::GenerateTitle => "Generate Title",
            AiTask::GenerateTags => "Auto-Tag",
        }
    }

    /// Continuation is the only task that may start from an empty note.
    pub fn requires_content(self) -> bool {
        !matches!(self, AiTask::Continue)
    }

    /// Tasks whose prompt carries the note title as context.
    pub fn uses_title_context(self) -> bool {
        matches!(
            self,
            AiTask::FixGrammar | AiTask::Continue | AiTask::Summarize
        )
    }

    pub fn response_format(self) -> ResponseFormat {
        match self {
            AiTask::GenerateTags => ResponseFormat::StringArray,
            _ => ResponseFormat::Text,
        }
    }

    fn template(self) -> &'static str {
        match self {
            AiTask::Summarize => {
                "Please provide a concise summary (max 2-3 sentences) of the following note:"
            }
            AiTask::Continue => {
                "Continue writing the following text efficiently and creatively. Match the tone and style. Provide only the continuation, do not repeat the start:"
            }
            AiTask::FixGrammar => {
                "Fix the grammar, spelling, and punctuation of the following text. Keep the tone natural. Return only the corrected text:"
            }
            AiTask::GenerateTitle => {
                "Generate a short, descriptive, and engaging title (maximum 6 words) for the following note content. Do not use quotes:"
            }
            AiTask::GenerateTags => {
                "Analyze the following note content and generate up to 5 relevant tags (keywords). Return them as a JSON array of strings."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    /// JSON array of strings.
    StringArray,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub response: ResponseFormat,
}

impl GenerationRequest {
    pub fn for_task(task: AiTask, model: &str, content: &str, context: Option<&str>) -> Self {
        Self {
            model: model.to_string(),
            prompt: compose_prompt(task, content, context),
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
            response: task.response_format(),
        }
    }
}

pub fn compose_prompt(task: AiTask, content: &str, context: Option<&str>) -> String {
    let template = task.template();
    match context.filter(|c| !c.trim().is_empty()) {
        Some(context) => format!(
            "Context: {}\n\nTask Payload:\n{}\n\n{}",
            context, content, template
        ),
        None => format!("{}\n\nNote Content:\n{}", template, content),
    }
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no response text")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Anything that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutput {
    Text(String),
    Tags(Vec<String>),
}

/// Build the request for `task`, send it, and decode the answer.
#[instrument(skip(generator, content, title), fields(model = generator.model_name(), content_len = content.len()))]
pub async fn run_task(
    generator: &dyn TextGenerator,
    task: AiTask,
    content: &str,
    title: &str,
) -> Result<AiOutput, AiError> {
    let context = task.uses_title_context().then_some(title);
    let request = GenerationRequest::for_task(task, generator.model_name(), content, context);
    let text = generator.generate(&request).await?;

    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    debug!(?task, response_len = text.len(), "Generation finished");

    match task.response_format() {
        ResponseFormat::StringArray => parse_tags(&text).map(AiOutput::Tags),
        ResponseFormat::Text => Ok(AiOutput::Text(text.trim().to_string())),
    }
}

pub fn parse_tags(text: &str) -> Result<Vec<String>, AiError> {
    let raw: Vec<String> = serde_json::from_str(text.trim())
        .map_err(|e| AiError::MalformedResponse(e.to_string()))?;
    Ok(raw
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

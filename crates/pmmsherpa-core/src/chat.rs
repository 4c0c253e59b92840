//! Preparation of one chat turn: retrieval, context, citations and the
//! prompt bundle handed to the chat model.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

use crate::citation::{extract_citations, Citation};
use crate::context::format_context_for_prompt;
use crate::prompt::{build_messages, ChatMessage, ModelProvider};
use crate::retrieval::{RetrievalRequest, Retriever};

/// Heading placed before the rendered attachments.
pub const ATTACHMENTS_HEADING: &str = "\n\n--- User Attached Files ---";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("message or attachments required")]
    Empty,
}

/// A file uploaded with a message. `extracted_text` is absent for files
/// whose text could not be extracted (images, unsupported formats).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub id: String,
    pub file_name: String,
    pub file_type: String,
    #[serde(default)]
    pub extracted_text: Option<String>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            file_name: file_name.into(),
            file_type: file_type.into(),
            extracted_text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = Some(text.into());
        self
    }
}

/// Inline rendering of one attachment for the user message.
pub fn attachment_context(attachment: &Attachment) -> String {
    match attachment.extracted_text.as_deref().filter(|t| !t.is_empty()) {
        Some(text) => format!(
            "\n\n--- Attached File: {name} ---\n{text}\n--- End of {name} ---",
            name = attachment.file_name,
            text = text
        ),
        None => format!(
            "\n\n[Attached file: {} ({})]",
            attachment.file_name, attachment.file_type
        ),
    }
}

/// User message content with any attachments appended.
pub fn compose_user_message(message: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return message.to_string();
    }
    let mut content = String::from(message);
    content.push_str(ATTACHMENTS_HEADING);
    for attachment in attachments {
        content.push_str(&attachment_context(attachment));
    }
    content
}

/// Text used for retrieval: the message, or the attachment names when it is blank.
pub fn search_query(message: &str, attachments: &[Attachment]) -> String {
    if !message.trim().is_empty() {
        return message.to_string();
    }
    attachments
        .iter()
        .map(|a| a.file_name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnInput {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub model: ModelProvider,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedTurn {
    pub model: ModelProvider,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub citations: Vec<Citation>,
    pub chunk_count: usize,
    pub total_tokens: usize,
    pub retrieval_ms: u64,
}

/// Run retrieval for the turn and assemble everything the chat model needs.
///
/// Retrieval is fail-soft, so the only error is an empty turn.
pub async fn prepare_turn(
    retriever: &Retriever,
    input: TurnInput,
) -> Result<PreparedTurn, TurnError> {
    if input.message.trim().is_empty() && input.attachments.is_empty() {
        return Err(TurnError::Empty);
    }

    let query = search_query(&input.message, &input.attachments);

    let started = Instant::now();
    let retrieval = retriever.retrieve_context(&RetrievalRequest::new(query)).await;
    let retrieval_ms = started.elapsed().as_millis() as u64;

    info!(
        chunks = retrieval.chunks.len(),
        total_tokens = retrieval.total_tokens,
        retrieval_ms,
        model = %input.model,
        "retrieved context for chat turn"
    );

    let context = format_context_for_prompt(&retrieval.chunks);
    let citations = extract_citations(&retrieval.chunks);
    let user_content = compose_user_message(&input.message, &input.attachments);
    let bundle = build_messages(&user_content, &context, input.model, &input.history);

    Ok(PreparedTurn {
        model: input.model,
        system: bundle.system,
        messages: bundle.messages,
        citations,
        chunk_count: retrieval.chunks.len(),
        total_tokens: retrieval.total_tokens,
        retrieval_ms,
    })
}

//! System prompt and message assembly for the chat model.
//!
//! The chat call itself happens outside this crate. This module decides
//! *what* is sent: the persona prompt, a note for the selected model, the
//! retrieved context, and a bounded window of conversation history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of most recent history messages sent with each turn.
pub const HISTORY_WINDOW: usize = 10;

/// Persona and behaviour rules shared by every model.
pub const PERSONA_PROMPT: &str = r#"You are PMMSherpa, a product marketing assistant grounded in a curated knowledge base of PMM books, Product Marketing Alliance blog articles and Sharebird AMA sessions with PMM leaders.

## Your Roles

### Advisor
- Answer questions on product marketing strategy, frameworks and practice
- Cite the specific sources you draw on
- Synthesize across sources and explain concepts for practitioners at every level

### Executor
Produce ready-to-use deliverables: positioning statements, messaging frameworks, GTM and launch plans, interview guides, JTBD analyses, personas, battlecards, competitive matrices, sales enablement material and launch communications.

## Guidelines

1. Cite sources from the knowledge base in this form:
   - Books: [Source: "Book Title" by Author, Page X]
   - Blogs: [Source: "Article Title" by Author, PMA Blog]
   - AMAs: [Source: Speaker Name, Role at Company, Sharebird AMA]
2. Lead with a framework, then apply it to the user's context.
3. Be practical and specific.
4. Say so when the knowledge base has nothing relevant.
5. Stay consistent with earlier turns of the conversation.

## Guidance vs. Artifact Mode

- Guidance ("how do I", "what is", "explain", "best practices for"): teach, share frameworks, ask clarifying questions.
- Artifact ("create", "write", "generate", "draft", "build", "give me a"): produce the deliverable itself, not instructions for making it. If context is missing, ask one or two brief questions, then produce it."#;

/// Company behind a chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Anthropic,
    Google,
    OpenAI,
}

/// Static description of a selectable chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    /// Vendor model identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    pub vendor: Vendor,
    pub max_tokens: u32,
    pub is_thinking: bool,
}

/// Chat models offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelProvider {
    #[serde(rename = "claude-opus")]
    ClaudeOpus,
    #[serde(rename = "claude-sonnet")]
    ClaudeSonnet,
    #[serde(rename = "gemini-3-pro")]
    Gemini3Pro,
    #[serde(rename = "gemini-2.5-thinking")]
    Gemini25Thinking,
    #[serde(rename = "gpt-5.2")]
    Gpt52,
    #[serde(rename = "gpt-5.2-thinking")]
    Gpt52Thinking,
}

impl ModelProvider {
    pub const ALL: [ModelProvider; 6] = [
        ModelProvider::ClaudeOpus,
        ModelProvider::ClaudeSonnet,
        ModelProvider::Gemini3Pro,
        ModelProvider::Gemini25Thinking,
        ModelProvider::Gpt52,
        ModelProvider::Gpt52Thinking,
    ];

    /// Selector key, e.g. `"claude-sonnet"`.
    pub fn key(&self) -> &'static str {
        match self {
            ModelProvider::ClaudeOpus => "claude-opus",
            ModelProvider::ClaudeSonnet => "claude-sonnet",
            ModelProvider::Gemini3Pro => "gemini-3-pro",
            ModelProvider::Gemini25Thinking => "gemini-2.5-thinking",
            ModelProvider::Gpt52 => "gpt-5.2",
            ModelProvider::Gpt52Thinking => "gpt-5.2-thinking",
        }
    }

    pub fn config(&self) -> ModelConfig {
        match self {
            ModelProvider::ClaudeOpus => ModelConfig {
                id: "claude-opus-4-5-20251101",
                name: "Claude Opus 4.5",
                vendor: Vendor::Anthropic,
                max_tokens: 64_000,
                is_thinking: false,
            },
            ModelProvider::ClaudeSonnet => ModelConfig {
                id: "claude-sonnet-4-5-20250929",
                name: "Claude Sonnet 4.5",
                vendor: Vendor::Anthropic,
                max_tokens: 64_000,
                is_thinking: false,
            },
            ModelProvider::Gemini3Pro => ModelConfig {
                id: "gemini-3-pro-preview",
                name: "Gemini 3 Pro",
                vendor: Vendor::Google,
                max_tokens: 64_000,
                is_thinking: false,
            },
            ModelProvider::Gemini25Thinking => ModelConfig {
                id: "gemini-2.5-pro",
                name: "Gemini 2.5 Pro (Thinking)",
                vendor: Vendor::Google,
                max_tokens: 64_000,
                is_thinking: true,
            },
            ModelProvider::Gpt52 => ModelConfig {
                id: "gpt-5.2",
                name: "GPT-5.2",
                vendor: Vendor::OpenAI,
                max_tokens: 128_000,
                is_thinking: false,
            },
            ModelProvider::Gpt52Thinking => ModelConfig {
                id: "gpt-5.2-pro",
                name: "GPT-5.2 Pro (Thinking)",
                vendor: Vendor::OpenAI,
                max_tokens: 128_000,
                is_thinking: true,
            },
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.config().name
    }

    /// Value stored on persisted messages: `claude`, `gemini` or `openai`.
    pub fn storage_value(&self) -> &'static str {
        match self.config().vendor {
            Vendor::Anthropic => "claude",
            Vendor::Google => "gemini",
            Vendor::OpenAI => "openai",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelProvider::ALL
            .iter()
            .copied()
            .find(|m| m.key() == s)
            .ok_or_else(|| {
                let keys: Vec<&str> = ModelProvider::ALL.iter().map(|m| m.key()).collect();
                format!("unknown model '{}'. Must be one of: {}", s, keys.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of conversation history or the new user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything sent to the chat model for one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptBundle {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

fn model_note(model: ModelProvider) -> String {
    let config = model.config();
    match config.vendor {
        Vendor::Anthropic => format!(
            "\n\nYou are powered by {}. Leverage your advanced reasoning capabilities for complex strategic analysis.",
            config.name
        ),
        Vendor::Google if config.is_thinking => format!(
            "\n\nYou are powered by {} with extended thinking. Take time to reason through complex problems step-by-step.",
            config.name
        ),
        Vendor::Google => format!(
            "\n\nYou are powered by {}. Apply your multimodal understanding to analyze complex marketing scenarios.",
            config.name
        ),
        Vendor::OpenAI => String::new(),
    }
}

/// Persona prompt, model note, and the retrieved context section.
pub fn system_prompt_with_context(retrieved_context: &str, model: ModelProvider) -> String {
    format!(
        "{}{}\n\n## Retrieved Knowledge Context\nThe following excerpts from your knowledge base are relevant to the current query:\n\n{}\n\nUse these sources to inform your response and cite them appropriately.",
        PERSONA_PROMPT,
        model_note(model),
        retrieved_context
    )
}

/// The last [`HISTORY_WINDOW`] messages of `history`, oldest first.
pub fn recent_history(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    &history[start..]
}

/// System prompt plus bounded history followed by the new user message.
pub fn build_messages(
    user_message: &str,
    retrieved_context: &str,
    model: ModelProvider,
    history: &[ChatMessage],
) -> PromptBundle {
    let mut messages: Vec<ChatMessage> = recent_history(history).to_vec();
    messages.push(ChatMessage::user(user_message));

    PromptBundle {
        system: system_prompt_with_context(retrieved_context, model),
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_keys_round_trip() {
        for model in ModelProvider::ALL {
            assert_eq!(model.key().parse::<ModelProvider>().unwrap(), model);
        }
        assert!("gpt-2".parse::<ModelProvider>().is_err());
    }

    #[test]
    fn test_serde_uses_selector_keys() {
        let json = serde_json::to_string(&ModelProvider::Gemini25Thinking).unwrap();
        assert_eq!(json, "\"gemini-2.5-thinking\"");
    }

    #[test]
    fn test_storage_values() {
        assert_eq!(ModelProvider::ClaudeOpus.storage_value(), "claude");
        assert_eq!(ModelProvider::Gemini3Pro.storage_value(), "gemini");
        assert_eq!(ModelProvider::Gpt52Thinking.storage_value(), "openai");
    }

    #[test]
    fn test_system_prompt_embeds_context_and_note() {
        let context = "[Source 1] \"X\"\nbody";
        let prompt = system_prompt_with_context(context, ModelProvider::ClaudeSonnet);
        assert!(prompt.starts_with("You are PMMSherpa"));
        assert!(prompt.contains("You are powered by Claude Sonnet 4.5."));
        assert!(prompt.contains("## Retrieved Knowledge Context"));
        assert!(prompt.contains("[Source 1] \"X\"\nbody"));
    }

    #[test]
    fn test_thinking_note_for_google() {
        let prompt = system_prompt_with_context("", ModelProvider::Gemini25Thinking);
        assert!(prompt.contains("with extended thinking"));
        let plain = system_prompt_with_context("", ModelProvider::Gemini3Pro);
        assert!(plain.contains("multimodal understanding"));
    }

    #[test]
    fn test_openai_has_no_model_note() {
        let prompt = system_prompt_with_context("ctx", ModelProvider::Gpt52);
        assert!(!prompt.contains("You are powered by"));
    }

    #[test]
    fn test_history_window_keeps_latest() {
        let history: Vec<ChatMessage> = (0..14)
            .map(|i| ChatMessage::user(format!("m{}", i)))
            .collect();
        let bundle = build_messages("new", "ctx", ModelProvider::Gpt52, &history);
        assert_eq!(bundle.messages.len(), HISTORY_WINDOW + 1);
        assert_eq!(bundle.messages[0].content, "m4");
        assert_eq!(bundle.messages[HISTORY_WINDOW - 1].content, "m13");
        assert_eq!(bundle.messages.last().unwrap(), &ChatMessage::user("new"));
    }

    #[test]
    fn test_short_history_kept_whole() {
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let bundle = build_messages("next", "ctx", ModelProvider::ClaudeOpus, &history);
        assert_eq!(bundle.messages.len(), 3);
        assert_eq!(bundle.messages[1].role, Role::Assistant);
    }
}

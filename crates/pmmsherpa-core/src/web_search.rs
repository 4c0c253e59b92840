//! Heuristics for auto-enabling web search on a chat message.
//!
//! Precedence: URLs, then research trigger phrases, then current-information
//! question starters.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"{}|\\^`\[\]]+"#).expect("URL pattern is static and valid")
});

/// General phrases that signal a need for current or external information.
const RESEARCH_TRIGGERS: &[&str] = &[
    "search for", "search the web", "look up", "find information",
    "research", "investigate", "explore online",
    "latest", "recent", "current", "today", "this week", "this month",
    "this year", "2024", "2025", "now", "right now", "currently",
    "up to date", "up-to-date", "newest", "most recent",
    "news", "announcement", "announced", "released", "launched",
    "update", "updates", "what happened", "what's happening",
    "compare prices", "best deals", "cheapest", "where to buy",
    "availability", "in stock", "price of",
    "stock price", "weather", "score", "results", "standings",
    "exchange rate", "crypto price", "bitcoin price",
    "competitor analysis", "market share", "industry trends",
    "market trends", "competitive landscape", "market data",
    "what does", "who is", "how does", "tell me about",
];

/// PMM topics that usually benefit from fresh web data.
const PMM_RESEARCH_TRIGGERS: &[&str] = &[
    "competitors", "competing products", "competitive analysis",
    "market positioning", "how does x compare",
    "saas trends", "b2b trends", "marketing trends", "industry report",
    "analyst report", "gartner", "forrester", "g2 crowd",
    "pricing page", "pricing strategy", "how much does",
    "subscription model", "freemium",
    "product launch", "go-to-market", "gtm strategy",
    "launch announcement", "press release",
];

const QUESTION_STARTERS: &[&str] = &[
    "what is the latest",
    "what are the latest",
    "what's new",
    "what happened",
    "when did",
    "when was",
    "how much does",
    "how much is",
    "where can i find",
    "where can i buy",
    "who announced",
    "who released",
];

/// Why web search was enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebSearchReason {
    Url,
    ResearchTrigger,
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSearchDecision {
    pub should_enable: bool,
    pub reason: Option<WebSearchReason>,
    pub urls: Vec<String>,
}

/// All http(s) URLs in `message`, in order of appearance.
pub fn detect_urls(message: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(message)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn has_urls(message: &str) -> bool {
    URL_PATTERN.is_match(message)
}

/// Case-insensitive substring match against both trigger lists.
pub fn has_research_triggers(message: &str) -> bool {
    let lower = message.to_lowercase();
    RESEARCH_TRIGGERS
        .iter()
        .chain(PMM_RESEARCH_TRIGGERS.iter())
        .any(|t| lower.contains(t))
}

pub fn is_web_search_question(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    QUESTION_STARTERS.iter().any(|s| lower.starts_with(s))
}

pub fn should_auto_enable_web_search(message: &str) -> WebSearchDecision {
    let urls = detect_urls(message);
    if !urls.is_empty() {
        return WebSearchDecision {
            should_enable: true,
            reason: Some(WebSearchReason::Url),
            urls,
        };
    }

    let reason = if has_research_triggers(message) {
        Some(WebSearchReason::ResearchTrigger)
    } else if is_web_search_question(message) {
        Some(WebSearchReason::Question)
    } else {
        None
    };

    WebSearchDecision {
        should_enable: reason.is_some(),
        reason,
        urls: Vec::new(),
    }
}

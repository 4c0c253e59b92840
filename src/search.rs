//! CLI commands over the retrieval pipeline.
//!
//! Output goes to stdout; logs go to stderr.

use anyhow::{bail, Result};

use pmmsherpa_core::citation::{dedup_citations, extract_citations, group_citations};
use pmmsherpa_core::context::format_context_for_prompt;
use pmmsherpa_core::embedding::Embedder;
use pmmsherpa_core::expand::{expand_query, matched_acronyms};
use pmmsherpa_core::models::RetrievalResult;
use pmmsherpa_core::retrieval::{InvalidOverride, RetrievalRequest, Retriever, MAX_TOP_K};
use pmmsherpa_core::web_search::should_auto_enable_web_search;

use crate::config::Config;
use crate::embedding::OpenAIEmbedder;

/// Flags of `sherpa search`.
#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub semantic: bool,
    pub top_k: Option<usize>,
    pub weight: Option<f64>,
    pub threshold: Option<f64>,
    pub json: bool,
}

impl SearchArgs {
    fn request(&self, query: &str) -> RetrievalRequest {
        RetrievalRequest {
            query: query.to_string(),
            top_k: self.top_k,
            semantic_weight: self.weight,
            match_threshold: self.threshold,
        }
    }
}

pub async fn run_search(retriever: &Retriever, query: &str, args: &SearchArgs) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    if args.semantic && args.weight.is_some() {
        bail!("--weight applies to hybrid search only");
    }

    let request = args.request(query);
    if let Err(e) = request.check_overrides() {
        match e {
            InvalidOverride::TopK => bail!("--top-k must be between 1 and {}", MAX_TOP_K),
            InvalidOverride::SemanticWeight => bail!("--weight must be in [0.0, 1.0]"),
            InvalidOverride::MatchThreshold => bail!("--threshold must be in [0.0, 1.0]"),
        }
    }

    let result = if args.semantic {
        let options = request.semantic_options(retriever.semantic_defaults());
        retriever.semantic_search(query, &options).await
    } else {
        retriever.retrieve_context(&request).await
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_results(&result);
    Ok(())
}

fn print_results(result: &RetrievalResult) {
    if result.is_empty() {
        println!("No results.");
        return;
    }

    for (i, chunk) in result.chunks.iter().enumerate() {
        println!(
            "{}. [{:.2}] {} / {}",
            i + 1,
            chunk.similarity,
            chunk.source_type.label(),
            chunk.document_title
        );
        if let Some(ref author) = chunk.author {
            println!("    author: {}", author);
        }
        if let Some(page) = chunk.page_number {
            println!("    page: {}", page);
        }
        if let Some(ref question) = chunk.question {
            println!("    question: {}", question);
        }
        if let Some(ref url) = chunk.url {
            println!("    url: {}", url);
        }
        println!("    excerpt: \"{}\"", excerpt(&chunk.content, 160));
        println!("    id: {}", chunk.id);
        println!();
    }
    println!("~{} tokens", result.total_tokens);
}

fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    let trimmed = flat.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Print the prompt context block followed by grouped, deduplicated sources.
pub async fn run_context(retriever: &Retriever, query: &str) -> Result<()> {
    let result = retriever
        .retrieve_context(&RetrievalRequest::new(query))
        .await;

    println!("{}", format_context_for_prompt(&result.chunks));

    let citations = dedup_citations(&extract_citations(&result.chunks));
    if citations.is_empty() {
        return Ok(());
    }

    println!();
    println!("Sources:");
    for group in group_citations(&citations) {
        println!("  {}", group.label);
        for citation in &group.citations {
            println!("    - {}", citation.display_line());
        }
    }
    Ok(())
}

pub fn run_expand(query: &str) -> Result<()> {
    println!("{}", expand_query(query));
    let acronyms = matched_acronyms(query);
    if !acronyms.is_empty() {
        eprintln!("expanded: {}", acronyms.join(", "));
    }
    Ok(())
}

/// Embed each text and print its dimensionality and leading components.
pub async fn run_embed(config: &Config, texts: &[String]) -> Result<()> {
    if texts.is_empty() {
        bail!("at least one text is required");
    }
    let embedder = OpenAIEmbedder::from_config(&config.embedding)?;
    let vectors = embedder.embed_batch(texts).await?;

    for (text, vector) in texts.iter().zip(vectors.iter()) {
        let head: Vec<String> = vector.iter().take(4).map(|v| format!("{:.4}", v)).collect();
        println!(
            "{} dims [{}, ...] {}",
            vector.len(),
            head.join(", "),
            excerpt(text, 60)
        );
    }
    Ok(())
}

pub fn run_web_check(message: &str) -> Result<()> {
    let decision = should_auto_enable_web_search(message);
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

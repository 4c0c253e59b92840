//! Acronym-based query expansion.
//!
//! Users ask about "ICP" and "GTM"; the corpus mostly spells these out.
//! [`expand_query`] appends the spelled-out form of every whitelisted
//! acronym that appears as a whole word, so both the embedding and the
//! lexical leg of hybrid search see the corpus vocabulary.

use regex::Regex;
use std::sync::LazyLock;

/// Whitelisted acronyms in scan order. Expansions are appended in this order.
pub const PMM_ACRONYMS: &[(&str, &str)] = &[
    ("pmm", "product marketing manager"),
    ("gtm", "go to market"),
    ("jtbd", "jobs to be done"),
    ("tam", "total addressable market"),
    ("sam", "serviceable addressable market"),
    ("som", "serviceable obtainable market"),
    ("mrr", "monthly recurring revenue"),
    ("arr", "annual recurring revenue"),
    ("cac", "customer acquisition cost"),
    ("ltv", "lifetime value"),
    ("nps", "net promoter score"),
    ("pql", "product qualified lead"),
    ("icp", "ideal customer profile"),
    ("plg", "product led growth"),
    ("roi", "return on investment"),
    ("kpi", "key performance indicator"),
    ("b2b", "business to business"),
    ("b2c", "business to consumer"),
    ("saas", "software as a service"),
    ("vp", "value proposition"),
];

static ACRONYM_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    PMM_ACRONYMS
        .iter()
        .map(|(acronym, expansion)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(acronym));
            let re = Regex::new(&pattern).expect("acronym patterns are static and valid");
            (re, *expansion)
        })
        .collect()
});

/// Lower-case `query` and append the expansion of each whole-word acronym.
///
/// Each acronym contributes at most once regardless of how often it occurs.
/// A query with no whitelisted acronym comes back lower-cased and otherwise
/// unchanged.
///
/// ```rust
/// use pmmsherpa_core::expand::expand_query;
///
/// let expanded = expand_query("What's our ICP for enterprise SaaS?");
/// assert!(expanded.starts_with("what's our icp for enterprise saas?"));
/// assert!(expanded.contains("ideal customer profile"));
/// assert!(expanded.ends_with("software as a service"));
/// ```
pub fn expand_query(query: &str) -> String {
    let mut expanded = query.to_lowercase();

    for (pattern, expansion) in ACRONYM_PATTERNS.iter() {
        if pattern.is_match(&expanded) {
            expanded.push(' ');
            expanded.push_str(expansion);
        }
    }

    expanded
}

/// The acronyms of [`PMM_ACRONYMS`] found in `query`, in scan order.
pub fn matched_acronyms(query: &str) -> Vec<&'static str> {
    let lowered = query.to_lowercase();
    ACRONYM_PATTERNS
        .iter()
        .zip(PMM_ACRONYMS.iter())
        .filter(|((pattern, _), _)| pattern.is_match(&lowered))
        .map(|(_, (acronym, _))| *acronym)
        .collect()
}

//! Typed job payloads.
//!
//! One variant per [`JobKind`], each with its own validated shape. The queue
//! core never interprets payload contents beyond validation and dedup
//! fingerprinting; processors decode the variant they registered for.

use serde::{Deserialize, Serialize};

use super::kind::JobKind;

/// Payload of a job, tagged by kind.
///
/// Design:
/// - The serde tag is the job kind's wire name, so a serialized payload is
///   self-describing and `payload.kind()` can never disagree with the tag.
/// - The dedup fingerprint subset is defined per variant in
///   [`JobPayload::fingerprint_key`], in one match, so the policy is explicit
///   and testable per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Crawl a site starting from one URL.
    Crawl {
        start_url: String,
        #[serde(default)]
        max_pages: Option<u32>,
    },
    /// Expand seed terms into a keyword set.
    GenerateKeywords { seed_terms: Vec<String> },
    /// Plan a batch of articles for the site.
    Plan { article_count: u32 },
    /// Score a set of pages.
    Score { page_urls: Vec<String> },
    /// Enrich a drafted article with supporting data.
    Enrich { article_id: String },
    /// Fetch search results for one query.
    Serp { query: String },
    /// Refresh search metrics for tracked keywords.
    Metrics { keywords: Vec<String> },
    /// Analyze a set of competitor domains.
    Competitors { domains: Vec<String> },
    /// Process one piece of user feedback.
    Feedback { note: String },
}

impl JobPayload {
    /// The kind this payload belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Crawl { .. } => JobKind::Crawl,
            JobPayload::GenerateKeywords { .. } => JobKind::GenerateKeywords,
            JobPayload::Plan { .. } => JobKind::Plan,
            JobPayload::Score { .. } => JobKind::Score,
            JobPayload::Enrich { .. } => JobKind::Enrich,
            JobPayload::Serp { .. } => JobKind::Serp,
            JobPayload::Metrics { .. } => JobKind::Metrics,
            JobPayload::Competitors { .. } => JobKind::Competitors,
            JobPayload::Feedback { .. } => JobKind::Feedback,
        }
    }

    /// Validate the payload shape. Runs before any store mutation.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            JobPayload::Crawl {
                start_url,
                max_pages,
            } => {
                if start_url.trim().is_empty() {
                    return Err("crawl: start_url must not be empty".into());
                }
                if let Some(0) = max_pages {
                    return Err("crawl: max_pages must be at least 1".into());
                }
            }
            JobPayload::GenerateKeywords { seed_terms } => {
                if seed_terms.is_empty() || seed_terms.iter().any(|t| t.trim().is_empty()) {
                    return Err("generate_keywords: seed_terms must be non-empty".into());
                }
            }
            JobPayload::Plan { article_count } => {
                if *article_count == 0 {
                    return Err("plan: article_count must be at least 1".into());
                }
            }
            JobPayload::Score { page_urls } => {
                if page_urls.is_empty() {
                    return Err("score: page_urls must be non-empty".into());
                }
            }
            JobPayload::Enrich { article_id } => {
                if article_id.trim().is_empty() {
                    return Err("enrich: article_id must not be empty".into());
                }
            }
            JobPayload::Serp { query } => {
                if query.trim().is_empty() {
                    return Err("serp: query must not be empty".into());
                }
            }
            JobPayload::Metrics { keywords } => {
                if keywords.is_empty() {
                    return Err("metrics: keywords must be non-empty".into());
                }
            }
            JobPayload::Competitors { domains } => {
                if domains.is_empty() {
                    return Err("competitors: domains must be non-empty".into());
                }
            }
            JobPayload::Feedback { note } => {
                if note.trim().is_empty() {
                    return Err("feedback: note must not be empty".into());
                }
            }
        }
        Ok(())
    }

    /// The payload subset that counts toward the dedup fingerprint.
    ///
    /// Per-kind policy:
    /// - crawl: the start URL only — two crawls of the same site from the
    ///   same URL are the same logical job even with different page budgets
    /// - generate_keywords / score / metrics / competitors: the sorted item
    ///   set, so ordering differences don't defeat dedup
    /// - plan: empty — at most one plan runs per site at a time
    /// - enrich: the article id
    /// - serp: the normalized (trimmed, lowercased) query
    /// - feedback: the trimmed note
    pub fn fingerprint_key(&self) -> String {
        fn sorted_join(items: &[String]) -> String {
            let mut items: Vec<&str> = items.iter().map(|s| s.trim()).collect();
            items.sort_unstable();
            items.join(",")
        }

        match self {
            JobPayload::Crawl { start_url, .. } => {
                start_url.trim().trim_end_matches('/').to_string()
            }
            JobPayload::GenerateKeywords { seed_terms } => sorted_join(seed_terms),
            JobPayload::Plan { .. } => String::new(),
            JobPayload::Score { page_urls } => sorted_join(page_urls),
            JobPayload::Enrich { article_id } => article_id.trim().to_string(),
            JobPayload::Serp { query } => query.trim().to_lowercase(),
            JobPayload::Metrics { keywords } => sorted_join(keywords),
            JobPayload::Competitors { domains } => sorted_join(domains).to_lowercase(),
            JobPayload::Feedback { note } => note.trim().to_string(),
        }
    }
}

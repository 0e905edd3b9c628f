//! Job kinds: the closed set of work the queue dispatches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a job. Determines which processor handles it and the shape of
/// its payload.
///
/// Design note: a closed enum (instead of a free-form string) lets processor
/// dispatch be exhaustive and keeps typos out of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Crawl a site's pages.
    Crawl,
    /// Expand seed terms into a keyword set.
    GenerateKeywords,
    /// Plan a batch of articles.
    Plan,
    /// Score existing pages.
    Score,
    /// Enrich a drafted article.
    Enrich,
    /// Fetch search results for a query.
    Serp,
    /// Refresh search metrics for tracked keywords.
    Metrics,
    /// Analyze competitor domains.
    Competitors,
    /// Process user feedback.
    Feedback,
}

impl JobKind {
    pub const ALL: [JobKind; 9] = [
        JobKind::Crawl,
        JobKind::GenerateKeywords,
        JobKind::Plan,
        JobKind::Score,
        JobKind::Enrich,
        JobKind::Serp,
        JobKind::Metrics,
        JobKind::Competitors,
        JobKind::Feedback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Crawl => "crawl",
            JobKind::GenerateKeywords => "generate_keywords",
            JobKind::Plan => "plan",
            JobKind::Score => "score",
            JobKind::Enrich => "enrich",
            JobKind::Serp => "serp",
            JobKind::Metrics => "metrics",
            JobKind::Competitors => "competitors",
            JobKind::Feedback => "feedback",
        }
    }

    pub fn parse(s: &str) -> Option<JobKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

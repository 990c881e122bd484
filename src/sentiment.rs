// src/sentiment.rs
//! Scoring seam. The scoring algorithm itself lives outside this crate; here we
//! only define its result shape and the cache-aware call path.

use serde::{Deserialize, Serialize};

use crate::cache::ResultCache;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentScore {
    /// Normalized overall polarity in [-1, 1].
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub label: SentimentLabel,
}

/// Pure `text -> score` function supplied by the caller.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> SentimentScore;
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> SentimentScore + Send + Sync,
{
    fn score(&self, text: &str) -> SentimentScore {
        self(text)
    }
}

/// Consult the cache, score on a miss, store the fresh result.
/// `cache = None` means the caller decided at startup to run without caching.
pub async fn analyze_cached(
    cache: Option<&ResultCache>,
    scorer: &dyn SentimentScorer,
    text: &str,
) -> SentimentScore {
    let Some(cache) = cache else {
        return scorer.score(text);
    };

    if let Some(hit) = cache.get::<SentimentScore>(text).await {
        return hit;
    }

    let fresh = scorer.score(text);
    // A failed store only costs a recomputation next time.
    let _ = cache.set(text, &fresh).await;
    fresh
}

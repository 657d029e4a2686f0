//! Relevance scoring of candidate items against the document being composed.
//!
//! Scores are additive and never negative. Every contributing factor leaves a
//! human-readable reason so the UI can explain why an item was picked.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use super::budget::estimate_tokens;
use super::item::{DocumentMeta, IndexedItem};
use crate::keywords::{KeywordSet, strip_markdown, tokenize};

/// Weights for each scoring factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    /// Per distinct shared tag.
    pub tag: u64,
    pub category: u64,
    pub recency: u64,
    /// Items used more recently than this get the recency bonus.
    pub recency_window: Duration,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            tag: 10,
            category: 5,
            recency: 3,
            recency_window: Duration::hours(24),
        }
    }
}

/// A candidate together with its score and estimated token cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredItem {
    pub item: IndexedItem,
    pub score: u64,
    /// Why the item scored what it did, in factor order.
    pub reasons: Vec<String>,
    pub tokens: u32,
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one item. Deterministic for identical inputs, including `now`.
    pub fn score(
        &self,
        item: &IndexedItem,
        keywords: &KeywordSet,
        meta: &DocumentMeta,
        now: DateTime<Utc>,
    ) -> ScoredItem {
        let mut score: u64 = 0;
        let mut reasons = Vec::new();

        let shared_tags = shared_tag_count(&item.tags, &meta.tags);
        if shared_tags > 0 {
            let points = self.weights.tag.saturating_mul(shared_tags);
            score = score.saturating_add(points);
            reasons.push(format!("Tag matches: +{points} ({shared_tags} tags)"));
        }

        if !meta.category.is_empty() && item.category == meta.category {
            score = score.saturating_add(self.weights.category);
            reasons.push(format!("Category match: +{}", self.weights.category));
        }

        let overlap = keyword_overlap(&item.content, keywords);
        if overlap > 0 {
            score = score.saturating_add(overlap);
            reasons.push(format!("Keyword overlap: +{overlap}"));
        }

        // A timestamp in the future (clock skew) counts as recent.
        if let Some(last_used) = item.last_used_at
            && now.signed_duration_since(last_used) < self.weights.recency_window
        {
            score = score.saturating_add(self.weights.recency);
            reasons.push(format!("Recently used: +{}", self.weights.recency));
        }

        if item.use_count > 0 {
            score = score.saturating_add(u64::from(item.use_count));
            reasons.push(format!("Frequently used: +{}", item.use_count));
        }

        ScoredItem {
            item: item.clone(),
            score,
            reasons,
            tokens: estimate_tokens(&item.content),
        }
    }
}

fn shared_tag_count(item_tags: &[String], doc_tags: &[String]) -> u64 {
    let doc: HashSet<String> = doc_tags.iter().map(|t| t.to_lowercase()).collect();
    let item: HashSet<String> = item_tags.iter().map(|t| t.to_lowercase()).collect();
    item.intersection(&doc).count() as u64
}

/// Sum of document keyword frequencies whose keyword appears as a token of `content`.
fn keyword_overlap(content: &str, keywords: &KeywordSet) -> u64 {
    if keywords.is_empty() || content.is_empty() {
        return 0;
    }
    let tokens: HashSet<String> = tokenize(&strip_markdown(content)).collect();
    keywords
        .iter()
        .filter(|(word, _)| tokens.contains(*word))
        .fold(0u64, |acc, (_, freq)| acc.saturating_add(u64::from(freq)))
}

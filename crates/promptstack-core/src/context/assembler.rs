//! Context assembly: ranks both candidate pools and packs each into its cap.
//!
//! Packing is greedy in rank order and stops at the first item that does not
//! fit, or at the per-pool item limit, whichever binds first. A lower-ranked
//! but smaller item is never pulled in past a larger one, which keeps the
//! selection a prefix of the ranking.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use promptstack_config::ContextConfig;
use tracing::debug;

use super::budget::{ContextSource, TokenBudget, can_add};
use super::item::{DocumentMeta, IndexedItem};
use super::scorer::{RelevanceScorer, ScoredItem};
use crate::keywords::KeywordSet;

pub const DEFAULT_MAX_LIBRARY_ITEMS: usize = 5;
pub const DEFAULT_MAX_HISTORY_ITEMS: usize = 3;

/// The context chosen for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Library items in rank order.
    pub library: Vec<ScoredItem>,
    /// History items in rank order.
    pub history: Vec<ScoredItem>,
    pub total_tokens: u32,
    /// Both pools are within their caps.
    pub fits: bool,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.library.is_empty() && self.history.is_empty()
    }

    /// All selected items, library first.
    pub fn items(&self) -> impl Iterator<Item = &ScoredItem> {
        self.library.iter().chain(self.history.iter())
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    scorer: RelevanceScorer,
    max_library: usize,
    max_history: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(
            RelevanceScorer::default(),
            DEFAULT_MAX_LIBRARY_ITEMS,
            DEFAULT_MAX_HISTORY_ITEMS,
        )
    }
}

impl ContextAssembler {
    pub fn new(scorer: RelevanceScorer, max_library: usize, max_history: usize) -> Self {
        Self {
            scorer,
            max_library,
            max_history,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(
            RelevanceScorer::default(),
            config.max_library_items,
            config.max_history_items,
        )
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    /// Select context from both pools for a document.
    pub fn assemble(
        &self,
        keywords: &KeywordSet,
        meta: &DocumentMeta,
        library: &[IndexedItem],
        history: &[IndexedItem],
        budget: &TokenBudget,
        now: DateTime<Utc>,
    ) -> Selection {
        let library_candidates: Vec<IndexedItem> = library
            .iter()
            .filter(|item| meta.origin_id.as_deref() != Some(item.id.as_str()))
            .cloned()
            .collect();

        let library = self.select_pool(
            self.rank(&library_candidates, keywords, meta, now),
            budget.cap_for(ContextSource::Library),
            self.max_library,
            ContextSource::Library,
        );
        let history = self.select_pool(
            self.rank(history, keywords, meta, now),
            budget.cap_for(ContextSource::History),
            self.max_history,
            ContextSource::History,
        );

        let library_check = budget.check_context_set(&library, ContextSource::Library);
        let history_check = budget.check_context_set(&history, ContextSource::History);

        Selection {
            total_tokens: library_check.tokens.saturating_add(history_check.tokens),
            fits: library_check.within_budget && history_check.within_budget,
            library,
            history,
        }
    }

    /// Score a pool and sort it best-first.
    ///
    /// Ties go to the most recently used item (never-used items last), then to
    /// the pool's own order.
    pub fn rank(
        &self,
        items: &[IndexedItem],
        keywords: &KeywordSet,
        meta: &DocumentMeta,
        now: DateTime<Utc>,
    ) -> Vec<ScoredItem> {
        let mut scored: Vec<ScoredItem> = items
            .iter()
            .map(|item| self.scorer.score(item, keywords, meta, now))
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| compare_recency(&a.item, &b.item))
        });
        scored
    }

    fn select_pool(
        &self,
        ranked: Vec<ScoredItem>,
        cap: u32,
        max_items: usize,
        source: ContextSource,
    ) -> Vec<ScoredItem> {
        let cheapest = ranked.iter().map(|s| s.tokens).min();
        if cheapest.is_none_or(|tokens| tokens > cap) || max_items == 0 {
            debug!(
                pool = source.label(),
                candidates = ranked.len(),
                cap,
                "No candidate fits the pool"
            );
            return Vec::new();
        }

        let mut selected = Vec::new();
        let mut used: u32 = 0;
        for candidate in ranked {
            if selected.len() >= max_items || !can_add(candidate.tokens, used, cap) {
                break;
            }
            used += candidate.tokens;
            debug!(
                pool = source.label(),
                id = %candidate.item.id,
                score = candidate.score,
                tokens = candidate.tokens,
                "Selected context item"
            );
            selected.push(candidate);
        }
        debug!(
            pool = source.label(),
            selected = selected.len(),
            tokens = used,
            cap,
            "Packed context pool"
        );
        selected
    }
}

/// More recent first; items never used sort after used ones.
fn compare_recency(a: &IndexedItem, b: &IndexedItem) -> Ordering {
    match (a.last_used_at, b.last_used_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BudgetCaps;
    use crate::keywords::extract_keywords;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn item(id: &str, use_count: u32, content: &str) -> IndexedItem {
        IndexedItem {
            content: content.to_string(),
            use_count,
            ..IndexedItem::new(id, id)
        }
    }

    fn ids(items: &[ScoredItem]) -> Vec<&str> {
        items.iter().map(|s| s.item.id.as_str()).collect()
    }

    #[test]
    fn test_ranks_by_score() {
        let library = vec![item("low", 1, "x"), item("high", 9, "x"), item("mid", 4, "x")];
        let budget = TokenBudget::new(200_000, BudgetCaps::default());
        let selection = ContextAssembler::default().assemble(
            &KeywordSet::new(),
            &DocumentMeta::default(),
            &library,
            &[],
            &budget,
            now(),
        );
        assert_eq!(ids(&selection.library), vec!["high", "mid", "low"]);
        assert!(selection.history.is_empty());
        assert!(selection.fits);
    }

    #[test]
    fn test_ties_prefer_recent_then_input_order() {
        let mut a = item("a", 0, "x");
        let mut b = item("b", 0, "x");
        let c = item("c", 0, "x");
        let d = item("d", 0, "x");
        // Both outside the recency window so the bonus does not apply.
        a.last_used_at = Some(now() - Duration::days(10));
        b.last_used_at = Some(now() - Duration::days(3));
        let ranked = ContextAssembler::default().rank(
            &[c, a, d, b],
            &KeywordSet::new(),
            &DocumentMeta::default(),
            now(),
        );
        assert_eq!(ids(&ranked), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_respects_max_items() {
        let history: Vec<IndexedItem> = (0..10).map(|i| item(&format!("h{i}"), i, "x")).collect();
        let budget = TokenBudget::new(200_000, BudgetCaps::default());
        let selection = ContextAssembler::default().assemble(
            &KeywordSet::new(),
            &DocumentMeta::default(),
            &[],
            &history,
            &budget,
            now(),
        );
        assert_eq!(ids(&selection.history), vec!["h9", "h8", "h7"]);
    }

    #[test]
    fn test_stops_at_first_item_over_cap() {
        // history cap on a 1000-token window is 100
        let budget = TokenBudget::new(1000, BudgetCaps::default());
        let big = "word ".repeat(100); // 82 tokens
        let history = vec![item("first", 9, &big), item("second", 8, &big), item("third", 7, "tiny")];
        let selection = ContextAssembler::default().assemble(
            &KeywordSet::new(),
            &DocumentMeta::default(),
            &[],
            &history,
            &budget,
            now(),
        );
        assert_eq!(ids(&selection.history), vec!["first"]);
        assert_eq!(selection.total_tokens, 82);
    }

    #[test]
    fn test_cheapest_over_cap_yields_empty_pool() {
        let budget = TokenBudget::new(100, BudgetCaps::default());
        let library = vec![item("a", 1, &"word ".repeat(100))];
        let selection = ContextAssembler::default().assemble(
            &KeywordSet::new(),
            &DocumentMeta::default(),
            &library,
            &[],
            &budget,
            now(),
        );
        assert!(selection.is_empty());
        assert_eq!(selection.total_tokens, 0);
        assert!(selection.fits);
    }

    #[test]
    fn test_excludes_origin_prompt_from_library_only() {
        let library = vec![item("origin", 50, "x"), item("other", 1, "x")];
        let history = vec![item("origin", 50, "x")];
        let meta = DocumentMeta::default().with_origin("origin");
        let budget = TokenBudget::new(200_000, BudgetCaps::default());
        let selection = ContextAssembler::default().assemble(
            &KeywordSet::new(),
            &meta,
            &library,
            &history,
            &budget,
            now(),
        );
        assert_eq!(ids(&selection.library), vec!["other"]);
        assert_eq!(ids(&selection.history), vec!["origin"]);
    }

    #[test]
    fn test_keywords_drive_ranking() {
        let library = vec![
            item("unrelated", 0, "Write a haiku about autumn leaves."),
            item("related", 0, "Binary search over a sorted list."),
        ];
        let keywords = extract_keywords("Implement binary search on a sorted list");
        let budget = TokenBudget::new(200_000, BudgetCaps::default());
        let selection = ContextAssembler::default().assemble(
            &keywords,
            &DocumentMeta::default(),
            &library,
            &[],
            &budget,
            now(),
        );
        assert_eq!(selection.library[0].item.id, "related");
        assert!(selection.library[0].score >= 4);
    }

    #[test]
    fn test_zero_max_items() {
        let assembler = ContextAssembler::new(RelevanceScorer::default(), 0, 0);
        let budget = TokenBudget::new(200_000, BudgetCaps::default());
        let selection = assembler.assemble(
            &KeywordSet::new(),
            &DocumentMeta::default(),
            &[item("a", 1, "x")],
            &[item("b", 1, "x")],
            &budget,
            now(),
        );
        assert!(selection.is_empty());
    }
}

//! Token budget management: estimates and per-source caps.
//!
//! The context window of the target model is split into fixed fractions:
//!
//! - **Document** (25%, hard block; warning from 15%)
//! - **Library context** (15%)
//! - **History context** (10%)
//!
//! Everything here is a pure function of the text, the window size and the caps.

use promptstack_config::BudgetConfig;

use super::scorer::ScoredItem;

/// Fraction of a pool cap at which the pool is reported as nearly full.
const POOL_WARNING_RATIO: f64 = 0.8;

/// Estimate the token count of `text`.
///
/// Blends word, character and line counts:
/// `0.5*words + 0.25*(chars/4) + 0.25*lines`, rounded, in integer arithmetic.
/// Only monotonicity under appending is relied upon; the constants are a heuristic.
pub fn estimate_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let words = text.split_whitespace().count() as u64;
    let chars = text.chars().count() as u64;
    let lines = text.matches('\n').count() as u64 + 1;
    let estimate = (8 * words + chars + 4 * lines + 8) / 16;
    u32::try_from(estimate).unwrap_or(u32::MAX)
}

/// Whether an item of `item_tokens` still fits when `current_tokens` are already used.
pub fn can_add(item_tokens: u32, current_tokens: u32, cap: u32) -> bool {
    current_tokens
        .checked_add(item_tokens)
        .is_some_and(|total| total <= cap)
}

/// Format a token count for display: `"950 tokens"`, `"1.2K tokens"`.
pub fn format_token_count(tokens: u32) -> String {
    if tokens < 1000 {
        format!("{tokens} tokens")
    } else {
        format!("{:.1}K tokens", f64::from(tokens) / 1000.0)
    }
}

/// Budget fractions of the context window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetCaps {
    pub document: f64,
    pub library: f64,
    pub history: f64,
    pub warning: f64,
}

impl Default for BudgetCaps {
    fn default() -> Self {
        Self {
            document: 0.25,
            library: 0.15,
            history: 0.10,
            warning: 0.15,
        }
    }
}

impl From<&BudgetConfig> for BudgetCaps {
    fn from(config: &BudgetConfig) -> Self {
        Self {
            document: config.document_cap,
            library: config.library_cap,
            history: config.history_cap,
            warning: config.warning_threshold,
        }
    }
}

/// Which candidate pool a context set was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextSource {
    Library,
    History,
}

impl ContextSource {
    pub fn label(&self) -> &'static str {
        match self {
            ContextSource::Library => "Library",
            ContextSource::History => "History",
        }
    }
}

/// Outcome of a budget check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetCheck {
    pub tokens: u32,
    pub limit: u32,
    pub within_budget: bool,
    pub at_warning: bool,
    pub at_block: bool,
}

/// Token budget for one model's context window.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBudget {
    window: u32,
    caps: BudgetCaps,
}

impl TokenBudget {
    pub fn new(window: u32, caps: BudgetCaps) -> Self {
        Self { window, caps }
    }

    /// Total context window size in tokens.
    pub fn window_size(&self) -> u32 {
        self.window
    }

    pub fn caps(&self) -> BudgetCaps {
        self.caps
    }

    /// Hard limit for the document itself.
    pub fn document_limit(&self) -> u32 {
        self.fraction(self.caps.document)
    }

    /// Document size at which the status bar starts warning.
    pub fn warning_threshold(&self) -> u32 {
        self.fraction(self.caps.warning)
    }

    /// Token cap for a candidate pool.
    pub fn cap_for(&self, source: ContextSource) -> u32 {
        match source {
            ContextSource::Library => self.fraction(self.caps.library),
            ContextSource::History => self.fraction(self.caps.history),
        }
    }

    /// Check the document text against the document cap.
    pub fn check_document(&self, text: &str) -> BudgetCheck {
        self.check_document_tokens(estimate_tokens(text))
    }

    /// Check an already estimated document size against the document cap.
    pub fn check_document_tokens(&self, tokens: u32) -> BudgetCheck {
        let limit = self.document_limit();
        BudgetCheck {
            tokens,
            limit,
            within_budget: tokens <= limit,
            at_warning: tokens >= self.warning_threshold(),
            // The block threshold is inclusive: a document filling its cap is refused.
            at_block: tokens >= limit,
        }
    }

    /// Check a selected context set against its pool cap.
    pub fn check_context_set(&self, items: &[ScoredItem], source: ContextSource) -> BudgetCheck {
        let tokens = items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.tokens));
        let limit = self.cap_for(source);
        let within_budget = tokens <= limit;
        BudgetCheck {
            tokens,
            limit,
            within_budget,
            at_warning: f64::from(tokens) >= f64::from(limit) * POOL_WARNING_RATIO,
            at_block: !within_budget,
        }
    }

    /// Percentage of the context window, e.g. `"12.5%"`.
    pub fn format_percentage(&self, tokens: u32) -> String {
        if self.window == 0 {
            return "0%".to_string();
        }
        format!("{:.1}%", f64::from(tokens) / f64::from(self.window) * 100.0)
    }

    /// Status-bar line for the document.
    pub fn document_status(&self, text: &str) -> String {
        let check = self.check_document(text);
        if check.at_block {
            format!(
                "Document exceeds token budget ({} / {} limit)",
                format_token_count(check.tokens),
                format_token_count(check.limit)
            )
        } else if check.at_warning {
            format!(
                "Document approaching token budget ({} / {} limit)",
                format_token_count(check.tokens),
                format_token_count(check.limit)
            )
        } else {
            format!(
                "Document: {} ({} of context)",
                format_token_count(check.tokens),
                self.format_percentage(check.tokens)
            )
        }
    }

    /// Status-bar line for a selected context set.
    pub fn context_status(&self, items: &[ScoredItem], source: ContextSource) -> String {
        let check = self.check_context_set(items, source);
        if check.at_block {
            format!(
                "{} context exceeds budget ({} / {} limit)",
                source.label(),
                format_token_count(check.tokens),
                format_token_count(check.limit)
            )
        } else {
            format!(
                "{} context: {} ({} of context)",
                source.label(),
                format_token_count(check.tokens),
                self.format_percentage(check.tokens)
            )
        }
    }

    fn fraction(&self, fraction: f64) -> u32 {
        (f64::from(self.window) * fraction).floor() as u32
    }
}

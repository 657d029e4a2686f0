//! Context engine: relevance scoring, token budgeting and context assembly.
//!
//! The context engine decides which library prompts and history entries ride
//! along with a suggestion request:
//!
//! 1. **Relevance Scorer**: additive, explainable scores from shared tags,
//!    category, keyword overlap, recency and usage.
//!
//! 2. **Token Budget**: heuristic token estimates and fixed fractions of the
//!    model's context window per source.
//!
//! 3. **Context Assembler**: ranks each pool and packs it greedily into its cap.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                Context Engine                 │
//! │                                               │
//! │  ┌───────────┐   ┌───────────┐   ┌──────────┐ │
//! │  │ Relevance │   │ Context   │   │ Token    │ │
//! │  │ Scorer    │──▶│ Assembler │◀──│ Budget   │ │
//! │  │ ·tags     │   │ ·rank     │   │ ·estimate│ │
//! │  │ ·category │   │ ·pack     │   │ ·caps    │ │
//! │  │ ·keywords │   │ ·exclude  │   │ ·status  │ │
//! │  └───────────┘   └─────▲─────┘   └──────────┘ │
//! │                        │                      │
//! │              CandidateSource (pools)          │
//! └───────────────────────────────────────────────┘
//! ```

pub mod assembler;
pub mod budget;
pub mod item;
pub mod pool;
pub mod scorer;

pub use assembler::{ContextAssembler, Selection};
pub use budget::{
    BudgetCaps, BudgetCheck, ContextSource, TokenBudget, can_add, estimate_tokens,
    format_token_count,
};
pub use item::{DocumentMeta, IndexedItem};
pub use pool::{CandidateSource, PoolError, StaticPool};
pub use scorer::{RelevanceScorer, ScoredItem, ScoringWeights};

//! Builders and fakes for engine tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use promptstack_core::BoxFuture;
use promptstack_core::clock::Clock;
use promptstack_core::context::IndexedItem;
use promptstack_core::error::TransportError;
use promptstack_core::llm::SuggestionTransport;
use promptstack_core::suggestion::{Edit, SuggestionRequest};
use tokio_util::sync::CancellationToken;

/// Shorthand for [`Edit::new`].
pub fn edit(line: usize, column: usize, old: &str, new: &str) -> Edit {
    Edit::new(line, column, old, new)
}

/// Fluent builder for [`IndexedItem`].
///
/// ```ignore
/// let item = ItemBuilder::new("p1")
///     .tags(["rust", "async"])
///     .category("coding")
///     .used_hours_ago(&clock, 2)
///     .build();
/// ```
pub struct ItemBuilder {
    item: IndexedItem,
}

impl ItemBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            item: IndexedItem::new(id, format!("Item {id}")),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.item.title = title.to_string();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.item.category = category.to_string();
        self
    }

    pub fn content(mut self, content: &str) -> Self {
        self.item.content = content.to_string();
        self
    }

    pub fn last_used_at(mut self, at: DateTime<Utc>) -> Self {
        self.item.last_used_at = Some(at);
        self
    }

    pub fn used_hours_ago(self, clock: &FixedClock, hours: i64) -> Self {
        let at = clock.now() - Duration::hours(hours);
        self.last_used_at(at)
    }

    pub fn use_count(mut self, count: u32) -> Self {
        self.item.use_count = count;
        self
    }

    pub fn build(self) -> IndexedItem {
        self.item
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Default for FixedClock {
    /// 2025-01-15 12:00:00 UTC.
    fn default() -> Self {
        Self(
            Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

enum Step {
    Reply(Result<String, TransportError>),
    /// Wait until cancelled.
    Hang,
}

/// A [`SuggestionTransport`] that plays back a script of replies.
///
/// Once the script runs out every call fails with a network error.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<SuggestionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful raw reply.
    pub fn reply(self, raw: impl Into<String>) -> Self {
        self.push(Step::Reply(Ok(raw.into())))
    }

    /// Queue a failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Step::Reply(Err(error)))
    }

    /// Queue a call that never answers until its token is cancelled.
    pub fn hang(self) -> Self {
        self.push(Step::Hang)
    }

    /// Number of `send_request` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<SuggestionRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    fn push(self, step: Step) -> Self {
        self.steps.lock().expect("lock poisoned").push_back(step);
        self
    }
}

impl SuggestionTransport for ScriptedTransport {
    fn send_request<'a>(
        &'a self,
        request: &'a SuggestionRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<String, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());
        let step = self.steps.lock().expect("lock poisoned").pop_front();
        Box::pin(async move {
            match step {
                Some(Step::Reply(reply)) => reply,
                Some(Step::Hang) => {
                    cancel.cancelled().await;
                    Err(TransportError::Cancelled)
                }
                None => Err(TransportError::Network("script exhausted".to_string())),
            }
        })
    }
}

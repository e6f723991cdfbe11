//! Per-visitor view session state.
//!
//! One `ViewTracker` is created at startup and injected through the app
//! state; nothing here is a global. A visitor is Idle or Viewing exactly one
//! post, and reading time can only ever be attached to a view that was
//! started through the tracker.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use retainer::Cache;

/// How long a visitor's session markers stick around. Within this window a
/// re-visit of the same post does not create a new view row.
const SESSION_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Reads shorter than this are bounces and are discarded.
pub const MIN_READ_SECONDS: u64 = 5;

#[derive(Clone, Copy, Debug)]
struct ViewingState {
    post_id: i32,
    view_id: i32,
    started: Instant,
}

#[derive(Debug, PartialEq)]
pub enum ViewDecision {
    /// The visitor is already viewing this post; re-renders must not count
    /// again.
    AlreadyViewing,
    New {
        /// False when the visitor has seen this post earlier in the session
        /// (counts as a view, but not a unique one).
        first_in_session: bool,
    },
}

#[derive(Debug, PartialEq)]
pub enum ReadingOutcome {
    /// No matching view was started this session; nothing to update.
    NoActiveView,
    /// Elapsed time under the bounce threshold; discarded.
    TooShort,
    Finished {
        view_id: i32,
        seconds: i64,
    },
}

pub struct ViewTracker {
    active: Cache<String, ViewingState>,
    seen: Cache<String, ()>,
}

impl ViewTracker {
    pub fn new() -> Self {
        ViewTracker {
            active: Cache::new(),
            seen: Cache::new(),
        }
    }

    pub fn visitor_key(ip: &IpAddr, user_agent: Option<&str>) -> String {
        format!("{ip}|{}", user_agent.unwrap_or("-"))
    }

    pub async fn decide_view(&self, visitor: &str, post_id: i32) -> ViewDecision {
        if let Some(state) = self.active.get(&visitor.to_string()).await {
            if state.post_id == post_id {
                return ViewDecision::AlreadyViewing;
            }
        }

        let first_in_session = self.seen.get(&seen_key(visitor, post_id)).await.is_none();

        ViewDecision::New { first_in_session }
    }

    /// Marks the view as started. Must be called with the id of the view row
    /// the caller just recorded, so a later reading-time report can find it.
    pub async fn record_view(&self, visitor: &str, post_id: i32, view_id: i32) {
        self.active
            .insert(
                visitor.to_string(),
                ViewingState {
                    post_id,
                    view_id,
                    started: Instant::now(),
                },
                SESSION_TTL,
            )
            .await;

        self.seen
            .insert(seen_key(visitor, post_id), (), SESSION_TTL)
            .await;
    }

    /// Resolves a reading-time report against the active view. Never creates
    /// state: reporting without a prior view is a no-op.
    pub async fn finish_view(&self, visitor: &str, post_id: i32) -> ReadingOutcome {
        let state = match self.active.get(&visitor.to_string()).await {
            Some(state) if state.post_id == post_id => *state,
            _ => return ReadingOutcome::NoActiveView,
        };

        let seconds = state.started.elapsed().as_secs();
        if seconds < MIN_READ_SECONDS {
            return ReadingOutcome::TooShort;
        }

        ReadingOutcome::Finished {
            view_id: state.view_id,
            seconds: seconds as i64,
        }
    }

    #[cfg(test)]
    async fn insert_active(&self, visitor: &str, state: ViewingState) {
        self.active
            .insert(visitor.to_string(), state, SESSION_TTL)
            .await;
    }
}

impl Default for ViewTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn seen_key(visitor: &str, post_id: i32) -> String {
    format!("{visitor}:{post_id}")
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_reading_time_without_view_is_a_noop() {
        let tracker = ViewTracker::new();
        assert_eq!(
            tracker.finish_view("v", 1).await,
            ReadingOutcome::NoActiveView
        );
    }

    #[tokio::test]
    async fn test_short_reads_are_discarded() {
        let tracker = ViewTracker::new();
        tracker.record_view("v", 1, 10).await;

        // no time has passed, so this is a bounce
        assert_eq!(tracker.finish_view("v", 1).await, ReadingOutcome::TooShort);
    }

    #[tokio::test]
    async fn test_rerender_of_same_post_does_not_count_again() {
        let tracker = ViewTracker::new();

        assert_eq!(
            tracker.decide_view("v", 1).await,
            ViewDecision::New {
                first_in_session: true
            }
        );
        tracker.record_view("v", 1, 10).await;

        assert_eq!(
            tracker.decide_view("v", 1).await,
            ViewDecision::AlreadyViewing
        );
    }

    #[tokio::test]
    async fn test_returning_to_a_post_counts_but_is_not_unique() {
        let tracker = ViewTracker::new();

        tracker.record_view("v", 1, 10).await;
        tracker.record_view("v", 2, 11).await;

        // back to post 1: a new view, but the session has seen it before
        assert_eq!(
            tracker.decide_view("v", 1).await,
            ViewDecision::New {
                first_in_session: false
            }
        );
    }

    #[tokio::test]
    async fn test_visitors_are_independent() {
        let tracker = ViewTracker::new();
        tracker.record_view("a", 1, 10).await;

        assert_eq!(
            tracker.decide_view("b", 1).await,
            ViewDecision::New {
                first_in_session: true
            }
        );
        assert_eq!(
            tracker.finish_view("b", 1).await,
            ReadingOutcome::NoActiveView
        );
    }

    #[tokio::test]
    async fn test_long_enough_reads_report_elapsed_seconds() {
        let tracker = ViewTracker::new();
        tracker
            .insert_active(
                "v",
                ViewingState {
                    post_id: 1,
                    view_id: 42,
                    started: Instant::now() - Duration::from_secs(40),
                },
            )
            .await;

        match tracker.finish_view("v", 1).await {
            ReadingOutcome::Finished { view_id, seconds } => {
                assert_eq!(view_id, 42);
                assert!(seconds >= 40);
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reading_time_for_wrong_post_is_a_noop() {
        let tracker = ViewTracker::new();
        tracker.record_view("v", 1, 10).await;

        assert_eq!(
            tracker.finish_view("v", 2).await,
            ReadingOutcome::NoActiveView
        );
    }
}

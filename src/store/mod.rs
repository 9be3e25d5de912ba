//! Document store collaborator interface.
//!
//! The engine treats persistence as an external key-value/document service with
//! point reads, merge writes, and per-document change-notification feeds. The
//! [`DocumentStore`] trait captures exactly the surface the sync engine needs;
//! [`memory::MemoryStore`] provides the in-process implementation used by tests
//! and the demo binary.

pub mod error;
pub mod memory;
pub mod models;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use self::error::StoreResult;
use self::models::{ClassroomDoc, ClassroomPatch, GameDoc, GamePatch, RosterDoc, VoteOption};

/// Abstraction over the hosted document store keyed by classroom and
/// (classroom, game) identifiers.
///
/// Durable writes never span multiple documents; vote increments are blind and
/// commutative so concurrent writers converge without coordination.
pub trait DocumentStore: Send + Sync {
    /// Create or replace a classroom document.
    fn put_classroom(&self, doc: ClassroomDoc) -> BoxFuture<'static, StoreResult<()>>;
    /// Point read of a classroom document.
    fn find_classroom(
        &self,
        classroom_id: &str,
    ) -> BoxFuture<'static, StoreResult<Option<ClassroomDoc>>>;
    /// Look up a classroom by its join password.
    fn find_classroom_by_password(
        &self,
        password: &str,
    ) -> BoxFuture<'static, StoreResult<Option<ClassroomDoc>>>;
    /// Merge a partial write onto an existing classroom document.
    fn merge_classroom(
        &self,
        classroom_id: &str,
        patch: ClassroomPatch,
    ) -> BoxFuture<'static, StoreResult<()>>;
    /// Create or replace a game document under a classroom.
    fn put_game(&self, classroom_id: &str, doc: GameDoc) -> BoxFuture<'static, StoreResult<()>>;
    /// Point read of a game document.
    fn find_game(
        &self,
        classroom_id: &str,
        game_id: &str,
    ) -> BoxFuture<'static, StoreResult<Option<GameDoc>>>;
    /// Merge a partial write onto an existing game document.
    fn merge_game(
        &self,
        classroom_id: &str,
        game_id: &str,
        patch: GamePatch,
    ) -> BoxFuture<'static, StoreResult<()>>;
    /// Atomically bump a vote counter on a game document.
    fn increment_vote(
        &self,
        classroom_id: &str,
        game_id: &str,
        option: VoteOption,
    ) -> BoxFuture<'static, StoreResult<()>>;
    /// Replace the roster snapshot for a classroom.
    fn put_roster(&self, classroom_id: &str, roster: RosterDoc)
    -> BoxFuture<'static, StoreResult<()>>;
    /// Point read of the roster snapshot for a classroom.
    fn find_roster(
        &self,
        classroom_id: &str,
    ) -> BoxFuture<'static, StoreResult<Option<RosterDoc>>>;
    /// Subscribe to classroom document changes. `None` marks deletion.
    fn watch_classroom(&self, classroom_id: &str) -> Subscription<Option<ClassroomDoc>>;
    /// Subscribe to game document changes. `None` marks deletion.
    fn watch_game(&self, classroom_id: &str, game_id: &str) -> Subscription<Option<GameDoc>>;
    /// Subscribe to roster snapshot changes.
    fn watch_roster(&self, classroom_id: &str) -> Subscription<RosterDoc>;
}

/// Shared handle to a document store implementation.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Handle that cancels a [`Subscription`].
///
/// Disposing is idempotent: calling [`Disposer::dispose`] any number of times,
/// or disposing a subscription that was already superseded, is safe and has the
/// same observable effect as a single call.
#[derive(Clone)]
pub struct Disposer {
    cancel: Arc<watch::Sender<bool>>,
}

impl Disposer {
    /// Stop delivery on the associated subscription.
    pub fn dispose(&self) {
        let _ = self.cancel.send(true);
    }

    /// Whether the subscription has already been cancelled.
    pub fn is_disposed(&self) -> bool {
        *self.cancel.borrow()
    }
}

/// A live change-notification feed for a single document.
///
/// Each call to [`Subscription::recv`] yields the next snapshot pushed by the
/// store, or `None` once the feed is cancelled or the store shuts down. Lagged
/// broadcast slots are skipped rather than tearing the feed down: the next
/// snapshot always supersedes anything missed.
pub struct Subscription<T> {
    rx: broadcast::Receiver<T>,
    cancelled: watch::Receiver<bool>,
    disposer: Disposer,
}

impl<T: Clone> Subscription<T> {
    /// Wrap a broadcast receiver into a cancellable subscription.
    pub fn new(rx: broadcast::Receiver<T>) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            rx,
            cancelled: cancel_rx,
            disposer: Disposer {
                cancel: Arc::new(cancel_tx),
            },
        }
    }

    /// Obtain a disposer handle that cancels this subscription.
    pub fn disposer(&self) -> Disposer {
        self.disposer.clone()
    }

    /// Cancel this subscription in place.
    pub fn dispose(&self) {
        self.disposer.dispose();
    }

    /// Wait for the next snapshot, or `None` when the feed ends.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            if *self.cancelled.borrow() {
                return None;
            }

            tokio::select! {
                changed = self.cancelled.changed() => {
                    if changed.is_err() || *self.cancelled.borrow() {
                        return None;
                    }
                }
                msg = self.rx.recv() => match msg {
                    Ok(snapshot) => return Some(snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Skip lagged snapshots but keep the feed alive.
                        debug!(skipped, "subscription lagged behind the change feed");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_delivers_snapshots_in_order() {
        let (tx, rx) = broadcast::channel(8);
        let mut sub = Subscription::new(rx);

        tx.send(1u32).unwrap();
        tx.send(2u32).unwrap();

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
    }

    #[tokio::test]
    async fn disposed_subscription_stops_delivering() {
        let (tx, rx) = broadcast::channel(8);
        let mut sub = Subscription::new(rx);
        let disposer = sub.disposer();

        tx.send(1u32).unwrap();
        disposer.dispose();

        assert_eq!(sub.recv().await, None);
        // A snapshot published after disposal must not come back either.
        tx.send(2u32).unwrap();
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn disposing_twice_is_idempotent() {
        let (tx, rx) = broadcast::channel(8);
        let mut sub = Subscription::<u32>::new(rx);
        let disposer = sub.disposer();

        disposer.dispose();
        disposer.dispose();

        assert!(disposer.is_disposed());
        drop(tx);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn closed_feed_ends_the_subscription() {
        let (tx, rx) = broadcast::channel(8);
        let mut sub = Subscription::<u32>::new(rx);
        drop(tx);

        assert_eq!(sub.recv().await, None);
    }
}

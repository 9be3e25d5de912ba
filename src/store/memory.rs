//! In-memory [`DocumentStore`] backed by [`DashMap`] with broadcast change feeds.
//!
//! This is the store used by tests and the demo binary. Every mutation runs
//! under the per-key shard lock and publishes the resulting snapshot before the
//! lock is released, so feed subscribers observe snapshots in mutation order.

use std::future::ready;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::store::{
    DocumentStore, Subscription,
    error::{StoreError, StoreResult},
    models::{ClassroomDoc, ClassroomPatch, GameDoc, GamePatch, RosterDoc, VoteOption},
};

/// Capacity of each per-document broadcast feed. Subscribers that lag further
/// than this skip ahead to newer snapshots.
const FEED_CAPACITY: usize = 32;

/// Process-local document store with change notification.
#[derive(Default)]
pub struct MemoryStore {
    classrooms: DashMap<String, ClassroomDoc>,
    games: DashMap<(String, String), GameDoc>,
    rosters: DashMap<String, RosterDoc>,
    classroom_feeds: DashMap<String, broadcast::Sender<Option<ClassroomDoc>>>,
    game_feeds: DashMap<(String, String), broadcast::Sender<Option<GameDoc>>>,
    roster_feeds: DashMap<String, broadcast::Sender<RosterDoc>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a classroom document, notifying watchers with a `None` snapshot.
    pub fn delete_classroom(&self, classroom_id: &str) {
        self.classrooms.remove(classroom_id);
        if let Some(feed) = self.classroom_feeds.get(classroom_id) {
            let _ = feed.send(None);
        }
    }

    /// Delete a game document, notifying watchers with a `None` snapshot.
    pub fn delete_game(&self, classroom_id: &str, game_id: &str) {
        let key = (classroom_id.to_string(), game_id.to_string());
        self.games.remove(&key);
        if let Some(feed) = self.game_feeds.get(&key) {
            let _ = feed.send(None);
        }
    }

    fn publish_classroom(&self, classroom_id: &str, snapshot: ClassroomDoc) {
        if let Some(feed) = self.classroom_feeds.get(classroom_id) {
            let _ = feed.send(Some(snapshot));
        }
    }

    fn publish_game(&self, key: &(String, String), snapshot: GameDoc) {
        if let Some(feed) = self.game_feeds.get(key) {
            let _ = feed.send(Some(snapshot));
        }
    }

    fn publish_roster(&self, classroom_id: &str, snapshot: RosterDoc) {
        if let Some(feed) = self.roster_feeds.get(classroom_id) {
            let _ = feed.send(snapshot);
        }
    }
}

impl DocumentStore for MemoryStore {
    fn put_classroom(&self, doc: ClassroomDoc) -> BoxFuture<'static, StoreResult<()>> {
        let id = doc.id.clone();
        self.classrooms.insert(id.clone(), doc.clone());
        self.publish_classroom(&id, doc);
        Box::pin(ready(Ok(())))
    }

    fn find_classroom(
        &self,
        classroom_id: &str,
    ) -> BoxFuture<'static, StoreResult<Option<ClassroomDoc>>> {
        let found = self.classrooms.get(classroom_id).map(|doc| doc.clone());
        Box::pin(ready(Ok(found)))
    }

    fn find_classroom_by_password(
        &self,
        password: &str,
    ) -> BoxFuture<'static, StoreResult<Option<ClassroomDoc>>> {
        let found = self
            .classrooms
            .iter()
            .find(|entry| entry.password == password)
            .map(|entry| entry.clone());
        Box::pin(ready(Ok(found)))
    }

    fn merge_classroom(
        &self,
        classroom_id: &str,
        patch: ClassroomPatch,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let result = match self.classrooms.get_mut(classroom_id) {
            Some(mut entry) => {
                patch.apply_to(&mut entry);
                let snapshot = entry.clone();
                self.publish_classroom(classroom_id, snapshot);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("classroom `{classroom_id}`"))),
        };
        Box::pin(ready(result))
    }

    fn put_game(&self, classroom_id: &str, doc: GameDoc) -> BoxFuture<'static, StoreResult<()>> {
        let key = (classroom_id.to_string(), doc.id.clone());
        self.games.insert(key.clone(), doc.clone());
        self.publish_game(&key, doc);
        Box::pin(ready(Ok(())))
    }

    fn find_game(
        &self,
        classroom_id: &str,
        game_id: &str,
    ) -> BoxFuture<'static, StoreResult<Option<GameDoc>>> {
        let key = (classroom_id.to_string(), game_id.to_string());
        let found = self.games.get(&key).map(|doc| doc.clone());
        Box::pin(ready(Ok(found)))
    }

    fn merge_game(
        &self,
        classroom_id: &str,
        game_id: &str,
        patch: GamePatch,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let key = (classroom_id.to_string(), game_id.to_string());
        let result = match self.games.get_mut(&key) {
            Some(mut entry) => {
                patch.apply_to(&mut entry);
                let snapshot = entry.clone();
                self.publish_game(&key, snapshot);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "game `{game_id}` in classroom `{classroom_id}`"
            ))),
        };
        Box::pin(ready(result))
    }

    fn increment_vote(
        &self,
        classroom_id: &str,
        game_id: &str,
        option: VoteOption,
    ) -> BoxFuture<'static, StoreResult<()>> {
        let key = (classroom_id.to_string(), game_id.to_string());
        let result = match self.games.get_mut(&key) {
            Some(mut entry) => {
                entry.votes.record(option);
                let snapshot = entry.clone();
                self.publish_game(&key, snapshot);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "game `{game_id}` in classroom `{classroom_id}`"
            ))),
        };
        Box::pin(ready(result))
    }

    fn put_roster(
        &self,
        classroom_id: &str,
        roster: RosterDoc,
    ) -> BoxFuture<'static, StoreResult<()>> {
        self.rosters
            .insert(classroom_id.to_string(), roster.clone());
        self.publish_roster(classroom_id, roster);
        Box::pin(ready(Ok(())))
    }

    fn find_roster(
        &self,
        classroom_id: &str,
    ) -> BoxFuture<'static, StoreResult<Option<RosterDoc>>> {
        let found = self.rosters.get(classroom_id).map(|roster| roster.clone());
        Box::pin(ready(Ok(found)))
    }

    fn watch_classroom(&self, classroom_id: &str) -> Subscription<Option<ClassroomDoc>> {
        let feed = self
            .classroom_feeds
            .entry(classroom_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0);
        Subscription::new(feed.subscribe())
    }

    fn watch_game(&self, classroom_id: &str, game_id: &str) -> Subscription<Option<GameDoc>> {
        let feed = self
            .game_feeds
            .entry((classroom_id.to_string(), game_id.to_string()))
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0);
        Subscription::new(feed.subscribe())
    }

    fn watch_roster(&self, classroom_id: &str) -> Subscription<RosterDoc> {
        let feed = self
            .roster_feeds
            .entry(classroom_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_CAPACITY).0);
        Subscription::new(feed.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classroom(id: &str, password: &str) -> ClassroomDoc {
        ClassroomDoc {
            id: id.into(),
            password: password.into(),
            is_active: true,
            ..ClassroomDoc::default()
        }
    }

    #[tokio::test]
    async fn put_then_find_round_trips() {
        let store = MemoryStore::new();
        store.put_classroom(classroom("c1", "logic101")).await.unwrap();

        let found = store.find_classroom("c1").await.unwrap().unwrap();
        assert_eq!(found.password, "logic101");
        assert!(store.find_classroom("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_by_password_matches_exactly() {
        let store = MemoryStore::new();
        store.put_classroom(classroom("c1", "logic101")).await.unwrap();
        store.put_classroom(classroom("c2", "proof212")).await.unwrap();

        let found = store
            .find_classroom_by_password("proof212")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "c2");
        assert!(
            store
                .find_classroom_by_password("nope")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn watchers_observe_merges() {
        let store = MemoryStore::new();
        store.put_classroom(classroom("c1", "pw")).await.unwrap();

        let mut sub = store.watch_classroom("c1");
        store
            .merge_classroom(
                "c1",
                ClassroomPatch {
                    active_game_id: Some(Some("g1".into())),
                    ..ClassroomPatch::default()
                },
            )
            .await
            .unwrap();

        let snapshot = sub.recv().await.unwrap().unwrap();
        assert_eq!(snapshot.active_game_id.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn merge_against_missing_game_reports_not_found() {
        let store = MemoryStore::new();
        let err = store
            .merge_game("c1", "g1", GamePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_vote_increments_all_land() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store
            .put_game(
                "c1",
                GameDoc {
                    id: "g1".into(),
                    ..GameDoc::default()
                },
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_vote("c1", "g1", VoteOption::Switch).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let game = store.find_game("c1", "g1").await.unwrap().unwrap();
        assert_eq!(game.votes.switch, 8);
        assert_eq!(game.votes.dont_switch, 0);
    }

    #[tokio::test]
    async fn deletion_notifies_watchers_with_none() {
        let store = MemoryStore::new();
        store.put_classroom(classroom("c1", "pw")).await.unwrap();

        let mut sub = store.watch_classroom("c1");
        store.delete_classroom("c1");

        assert_eq!(sub.recv().await, Some(None));
    }
}

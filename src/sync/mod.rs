//! Remote sync controller bridging the document store's change feeds into the
//! session state store.
//!
//! One controller task runs per attached classroom. It watches the classroom
//! document, re-subscribes to the live game whenever `active_game_id` changes
//! (disposing the stale feed exactly once), forwards roster snapshots, and
//! tears everything down on shutdown. The controller only ever submits events;
//! it never touches the session state directly.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::state::RoomTimerSnapshot;
use crate::session::{SessionEvent, SessionHub};
use crate::store::models::GameDoc;
use crate::store::{SharedStore, Subscription};
use crate::timer::TimerRegistry;

/// Bridges store change notifications to [`SessionHub`] events.
pub struct RemoteSyncController {
    store: SharedStore,
    hub: SessionHub,
    round_timer: Option<(Arc<TimerRegistry>, String)>,
}

impl RemoteSyncController {
    /// Build a controller over the given store and session store handle.
    pub fn new(store: SharedStore, hub: SessionHub) -> Self {
        Self {
            store,
            hub,
            round_timer: None,
        }
    }

    /// Reconcile the legacy round timer carried on the game document into a
    /// local timer unit, with the remote snapshot always winning over the
    /// unit's own countdown.
    pub fn with_round_timer(mut self, registry: Arc<TimerRegistry>, room_id: impl Into<String>) -> Self {
        self.round_timer = Some((registry, room_id.into()));
        self
    }

    /// Spawn the controller loop for a classroom on the current runtime.
    ///
    /// The task ends when `shutdown` flips to `true` or the classroom feed
    /// closes; all subscriptions are disposed on the way out.
    pub fn spawn(self, classroom_id: String, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(classroom_id, shutdown))
    }

    /// Drive the subscription protocol for one classroom until shutdown.
    pub async fn run(self, classroom_id: String, mut shutdown: watch::Receiver<bool>) {
        let mut classroom_sub = self.store.watch_classroom(&classroom_id);
        let mut roster_sub = self.store.watch_roster(&classroom_id);
        let mut game_sub: Option<Subscription<Option<GameDoc>>> = None;
        let mut game_id: Option<String> = None;

        // The change feeds only carry future writes; prime the projection
        // with point reads so a client attaching mid-session catches up.
        self.prime(&classroom_id, &mut game_sub, &mut game_id).await;
        self.hub.dispatch(SessionEvent::SetLoading(false));

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                snapshot = classroom_sub.recv() => match snapshot {
                    Some(Some(classroom)) => {
                        self.track_active_game(
                            &classroom_id,
                            classroom.active_game_id.clone(),
                            &mut game_sub,
                            &mut game_id,
                        )
                        .await;
                    }
                    Some(None) => {
                        // Classroom deleted remotely: the round is over and
                        // nothing is left to follow.
                        debug!(classroom_id, "classroom document deleted");
                        Self::dispose_game(&mut game_sub, &mut game_id);
                        self.hub.dispatch(SessionEvent::SetDebateStarted(false));
                    }
                    None => {
                        warn!(classroom_id, "classroom change feed closed");
                        break;
                    }
                },
                roster = roster_sub.recv() => match roster {
                    Some(roster) => self.hub.dispatch(SessionEvent::SetTeams(roster)),
                    None => {
                        warn!(classroom_id, "roster change feed closed");
                        break;
                    }
                },
                snapshot = async { game_sub.as_mut().expect("branch guarded").recv().await },
                    if game_sub.is_some() =>
                {
                    match snapshot {
                        Some(Some(game)) => self.forward_game(game),
                        Some(None) => {
                            // Game deleted while still referenced; treat like
                            // the round ending.
                            Self::dispose_game(&mut game_sub, &mut game_id);
                            self.hub.dispatch(SessionEvent::SetDebateStarted(false));
                        }
                        None => {
                            Self::dispose_game(&mut game_sub, &mut game_id);
                        }
                    }
                }
            }
        }

        classroom_sub.dispose();
        roster_sub.dispose();
        Self::dispose_game(&mut game_sub, &mut game_id);
        info!(classroom_id, "remote sync controller stopped");
    }

    /// Initial point reads covering whatever happened before we subscribed.
    async fn prime(
        &self,
        classroom_id: &str,
        game_sub: &mut Option<Subscription<Option<GameDoc>>>,
        game_id: &mut Option<String>,
    ) {
        match self.store.find_roster(classroom_id).await {
            Ok(Some(roster)) => self.hub.dispatch(SessionEvent::SetTeams(roster)),
            Ok(None) => {}
            Err(err) => self
                .hub
                .dispatch(SessionEvent::SetError(Some(err.to_string()))),
        }

        match self.store.find_classroom(classroom_id).await {
            Ok(Some(classroom)) => {
                self.track_active_game(classroom_id, classroom.active_game_id, game_sub, game_id)
                    .await;
            }
            Ok(None) => {}
            Err(err) => self
                .hub
                .dispatch(SessionEvent::SetError(Some(err.to_string()))),
        }
    }

    /// Re-point the game subscription when the classroom's live game changed.
    async fn track_active_game(
        &self,
        classroom_id: &str,
        live_game_id: Option<String>,
        game_sub: &mut Option<Subscription<Option<GameDoc>>>,
        game_id: &mut Option<String>,
    ) {
        if live_game_id == *game_id {
            return;
        }

        Self::dispose_game(game_sub, game_id);

        match live_game_id {
            Some(id) => {
                debug!(classroom_id, game_id = %id, "following new live game");
                *game_sub = Some(self.store.watch_game(classroom_id, &id));

                // Catch up on the snapshot written before we subscribed.
                match self.store.find_game(classroom_id, &id).await {
                    Ok(Some(game)) => self.forward_game(game),
                    Ok(None) => {}
                    Err(err) => self
                        .hub
                        .dispatch(SessionEvent::SetError(Some(err.to_string()))),
                }

                *game_id = Some(id);
            }
            None => {
                self.hub.dispatch(SessionEvent::SetDebateStarted(false));
            }
        }
    }

    /// Normalize a game snapshot into store events.
    fn forward_game(&self, game: GameDoc) {
        if let Some((registry, room_id)) = &self.round_timer {
            registry.apply_remote(
                room_id,
                RoomTimerSnapshot {
                    time: game.timer,
                    is_running: game.is_timer_running,
                },
            );
        }
        self.hub.dispatch(SessionEvent::UpdateDebateData(game.into()));
    }

    /// Dispose the current game subscription, if any. Safe to call when no
    /// subscription is active, and the disposer itself is idempotent.
    fn dispose_game(
        game_sub: &mut Option<Subscription<Option<GameDoc>>>,
        game_id: &mut Option<String>,
    ) {
        if let Some(sub) = game_sub.take() {
            sub.dispose();
        }
        *game_id = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::store::DocumentStore;
    use crate::store::memory::MemoryStore;
    use crate::store::models::{ClassroomDoc, ClassroomPatch, GameDoc, GamePatch, RosterDoc, Student};

    const WAIT: Duration = Duration::from_secs(2);

    struct Fixture {
        store: Arc<MemoryStore>,
        hub: SessionHub,
        shutdown: watch::Sender<bool>,
    }

    async fn attach(classroom_id: &str) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store
            .put_classroom(ClassroomDoc {
                id: classroom_id.into(),
                is_active: true,
                ..ClassroomDoc::default()
            })
            .await
            .unwrap();

        let hub = SessionHub::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        RemoteSyncController::new(store.clone(), hub.clone())
            .spawn(classroom_id.into(), shutdown_rx);

        // The controller has finished priming once it drops the loading flag.
        timeout(WAIT, hub.wait_for(|state| !state.is_loading))
            .await
            .unwrap()
            .unwrap();

        Fixture {
            store,
            hub,
            shutdown: shutdown_tx,
        }
    }

    fn game(id: &str, topic: &str) -> GameDoc {
        GameDoc {
            id: id.into(),
            topic: topic.into(),
            ..GameDoc::default()
        }
    }

    async fn activate(store: &MemoryStore, classroom_id: &str, game_id: &str) {
        store
            .merge_classroom(
                classroom_id,
                ClassroomPatch {
                    active_game_id: Some(Some(game_id.into())),
                    ..ClassroomPatch::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn activating_a_game_starts_the_debate() {
        let fixture = attach("c1").await;

        fixture.store.put_game("c1", game("g1", "X")).await.unwrap();
        activate(&fixture.store, "c1", "g1").await;

        let state = timeout(
            WAIT,
            fixture.hub.wait_for(|state| state.debate_started),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(state.topic, "X");
        assert_eq!(state.active_game_id.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn roster_snapshots_flow_into_the_projection() {
        let fixture = attach("c1").await;

        fixture
            .store
            .put_roster(
                "c1",
                RosterDoc {
                    team_a: vec![Student {
                        id: "555-0101".into(),
                        name: "Ada".into(),
                    }],
                    team_b: Vec::new(),
                },
            )
            .await
            .unwrap();

        let state = timeout(
            WAIT,
            fixture.hub.wait_for(|state| !state.team_a.is_empty()),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(state.team_a[0].name, "Ada");
    }

    #[tokio::test]
    async fn switching_games_stops_deliveries_from_the_old_feed() {
        let fixture = attach("c1").await;

        fixture.store.put_game("c1", game("g1", "first")).await.unwrap();
        activate(&fixture.store, "c1", "g1").await;
        timeout(
            WAIT,
            fixture.hub.wait_for(|state| state.topic == "first"),
        )
        .await
        .unwrap()
        .unwrap();

        fixture.store.put_game("c1", game("g2", "second")).await.unwrap();
        activate(&fixture.store, "c1", "g2").await;
        timeout(
            WAIT,
            fixture.hub.wait_for(|state| state.topic == "second"),
        )
        .await
        .unwrap()
        .unwrap();

        // A late write to the superseded game must not reach the projection.
        fixture
            .store
            .merge_game(
                "c1",
                "g1",
                GamePatch {
                    topic: Some("stale".into()),
                    ..GamePatch::default()
                },
            )
            .await
            .unwrap();
        fixture
            .store
            .merge_game(
                "c1",
                "g2",
                GamePatch {
                    topic: Some("fresh".into()),
                    ..GamePatch::default()
                },
            )
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut rx = fixture.hub.watch();
        let state = timeout(
            WAIT,
            rx.wait_for(|state| {
                seen.push(state.topic.clone());
                state.topic == "fresh"
            }),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();

        assert_eq!(state.active_game_id.as_deref(), Some("g2"));
        assert!(!seen.iter().any(|topic| topic == "stale"));
    }

    #[tokio::test]
    async fn clearing_the_active_game_ends_the_debate() {
        let fixture = attach("c1").await;

        fixture.store.put_game("c1", game("g1", "X")).await.unwrap();
        activate(&fixture.store, "c1", "g1").await;
        timeout(WAIT, fixture.hub.wait_for(|state| state.debate_started))
            .await
            .unwrap()
            .unwrap();

        fixture
            .store
            .merge_classroom(
                "c1",
                ClassroomPatch {
                    active_game_id: Some(None),
                    ..ClassroomPatch::default()
                },
            )
            .await
            .unwrap();

        timeout(
            WAIT,
            fixture.hub.wait_for(|state| !state.debate_started),
        )
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn attaching_mid_session_catches_up_from_point_reads() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_classroom(ClassroomDoc {
                id: "c1".into(),
                active_game_id: Some("g1".into()),
                ..ClassroomDoc::default()
            })
            .await
            .unwrap();
        store.put_game("c1", game("g1", "ongoing")).await.unwrap();

        let hub = SessionHub::new();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        RemoteSyncController::new(store, hub.clone()).spawn("c1".into(), shutdown_rx);

        let state = timeout(WAIT, hub.wait_for(|state| state.debate_started))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.topic, "ongoing");
    }

    #[tokio::test]
    async fn shutdown_disposes_every_subscription() {
        let fixture = attach("c1").await;

        fixture.store.put_game("c1", game("g1", "X")).await.unwrap();
        activate(&fixture.store, "c1", "g1").await;
        timeout(WAIT, fixture.hub.wait_for(|state| state.debate_started))
            .await
            .unwrap()
            .unwrap();

        fixture.shutdown.send(true).unwrap();
        // Give the controller a beat to unwind.
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Writes after shutdown no longer reach the projection.
        fixture
            .store
            .merge_game(
                "c1",
                "g1",
                GamePatch {
                    topic: Some("after-shutdown".into()),
                    ..GamePatch::default()
                },
            )
            .await
            .unwrap();

        let result = timeout(
            Duration::from_millis(300),
            fixture
                .hub
                .wait_for(|state| state.topic == "after-shutdown"),
        )
        .await;
        assert!(result.is_err(), "stale delivery after shutdown");
    }
}

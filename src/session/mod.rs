//! Session state store: the single-writer reducer loop and its handle.
//!
//! All components submit [`SessionEvent`]s through a [`SessionHub`]; exactly
//! one task owns the state and folds events in arrival order, publishing each
//! resulting state on a watch channel. No component ever read-modify-writes
//! the projection directly, which keeps transitions atomic with respect to
//! each other.

pub mod reducer;
pub mod state;

use tokio::sync::{mpsc, watch};
use tracing::warn;

pub use self::reducer::{DebateUpdate, SessionEvent, reduce};
pub use self::state::{ActivePlayers, RoomTimerSnapshot, SessionState};

/// Cheaply cloneable handle to the session state store.
#[derive(Clone)]
pub struct SessionHub {
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Receiver<SessionState>,
}

impl SessionHub {
    /// Construct the store and spawn its reducer loop on the current runtime.
    pub fn new() -> Self {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<SessionEvent>();
        let (state_tx, state_rx) = watch::channel(SessionState::default());

        tokio::spawn(async move {
            let mut state = SessionState::default();
            // Events are folded one at a time in arrival order; the loop ends
            // once every hub handle is gone.
            while let Some(event) = event_rx.recv().await {
                state = reduce(&state, event);
                if state_tx.send(state.clone()).is_err() {
                    break;
                }
            }
        });

        Self {
            events: event_tx,
            snapshot: state_rx,
        }
    }

    /// Submit an event to the reducer loop.
    pub fn dispatch(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            warn!("session store loop is gone; dropping event");
        }
    }

    /// Clone of the most recently published state.
    pub fn snapshot(&self) -> SessionState {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every published state, for awaiting changes.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.snapshot.clone()
    }

    /// Wait until the published state satisfies the predicate, returning it.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionState) -> bool,
    ) -> Option<SessionState> {
        let mut rx = self.watch();
        rx.wait_for(predicate).await.ok().map(|state| state.clone())
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::RosterDoc;

    #[tokio::test]
    async fn dispatched_events_are_applied_in_order() {
        let hub = SessionHub::new();

        hub.dispatch(SessionEvent::SetLoading(false));
        hub.dispatch(SessionEvent::SetDebateStarted(true));
        hub.dispatch(SessionEvent::SetDebateStarted(false));

        let state = hub
            .wait_for(|state| !state.is_loading && !state.debate_started)
            .await
            .unwrap();
        assert!(!state.debate_started);
    }

    #[tokio::test]
    async fn roster_update_does_not_reset_the_session() {
        let hub = SessionHub::new();
        let student = crate::store::models::Student {
            id: "555-0101".into(),
            name: "Ada".into(),
        };

        hub.dispatch(SessionEvent::SetDebateStarted(true));
        hub.dispatch(SessionEvent::SetTeams(RosterDoc {
            team_a: vec![student],
            team_b: Vec::new(),
        }));

        let state = hub
            .wait_for(|state| !state.team_a.is_empty())
            .await
            .unwrap();
        // The debate flag must survive the roster event.
        assert!(state.debate_started);
    }
}

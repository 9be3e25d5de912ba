//! The deterministic transition function of the session state store.
//!
//! Events form a closed tagged union dispatched through an exhaustive match,
//! so adding a variant is a compile error until every consumer handles it. The
//! wire encoding keeps the historical SCREAMING_SNAKE_CASE action tags, and
//! unrecognized tags deserialize into [`SessionEvent::Unknown`], which reduces
//! to the input state unchanged.

use serde::{Deserialize, Deserializer, Serialize};

use crate::session::state::{ActivePlayers, RoomTimerSnapshot, SessionState};
use crate::store::models::{ClassroomDoc, GameDoc, RosterDoc, Side, Stance, VoteTally};

/// Normalized set of game fields carried by [`SessionEvent::UpdateDebateData`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateUpdate {
    /// Identifier of the game this update describes.
    pub active_game_id: String,
    /// Motion being debated.
    #[serde(default)]
    pub topic: String,
    /// Vote tally as last written to the store.
    #[serde(default)]
    pub votes: VoteTally,
    /// Which team currently presents the "Pro" argument.
    #[serde(default)]
    pub speaking_for: Side,
    /// Stance team A argues.
    #[serde(default)]
    pub team_a_stance: Stance,
    /// Whether a round is live; always true for updates built from a game.
    #[serde(default)]
    pub debate_started: bool,
    /// Legacy single round timer, seconds remaining.
    #[serde(default)]
    pub timer: u32,
    /// Legacy single round timer running flag.
    #[serde(default)]
    pub is_timer_running: bool,
    /// Speakers of the round.
    #[serde(default)]
    pub active_players: ActivePlayers,
}

impl From<GameDoc> for DebateUpdate {
    fn from(game: GameDoc) -> Self {
        Self {
            active_game_id: game.id,
            topic: game.topic,
            votes: game.votes,
            speaking_for: game.speaking_for,
            team_a_stance: game.team_a_stance,
            debate_started: true,
            timer: game.timer,
            is_timer_running: game.is_timer_running,
            active_players: ActivePlayers {
                team_a: game.team_a_players,
                team_b: game.team_b_players,
            },
        }
    }
}

/// Events accepted by the session reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    /// Toggle the full-page loading indicator.
    SetLoading(bool),
    /// Surface (or clear) a dismissible error banner.
    SetError(Option<String>),
    /// Attach to (or detach from) a classroom.
    SetClassroom(Option<ClassroomDoc>),
    /// Flip the round-is-live flag without touching game data.
    SetDebateStarted(bool),
    /// Replace the master rosters. Touches nothing but the two team lists.
    SetTeams(RosterDoc),
    /// Apply a normalized game snapshot.
    UpdateDebateData(DebateUpdate),
    /// Authoritative countdown update for one room.
    #[serde(rename_all = "camelCase")]
    UpdateRoomTimer {
        /// Room identifier the update is keyed by.
        room_id: String,
        /// Remaining seconds.
        time: u32,
        /// Whether the countdown is advancing.
        is_running: bool,
    },
    /// Reset one room's countdown to a stopped initial duration.
    #[serde(rename_all = "camelCase")]
    ResetRoomTimer {
        /// Room identifier the reset is keyed by.
        room_id: String,
        /// Seconds to seed the stopped timer with.
        initial_time: u32,
    },
    /// Restore the initial state, keeping the loading indicator off.
    ResetState,
    /// Forward-compatibility catch-all for event kinds this build predates.
    #[serde(untagged, deserialize_with = "deserialize_ignore_any")]
    Unknown,
}

/// Catch-all deserializer: `#[serde(other)]` rejects unknown tags that carry a
/// payload in adjacently tagged enums, so the `Unknown` variant instead uses an
/// untagged fallback that consumes and discards whatever payload is present.
fn deserialize_ignore_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<(), D::Error> {
    serde::de::IgnoredAny::deserialize(deserializer)?;
    Ok(())
}

/// Pure transition function: `(old state, event) -> new state`.
///
/// Never mutates the input and never fails. `SetTeams` deliberately updates
/// only the two roster fields; replacing the whole state here once reset every
/// live session whenever a roster snapshot arrived, so the narrow update is a
/// correctness requirement covered by tests.
pub fn reduce(state: &SessionState, event: SessionEvent) -> SessionState {
    match event {
        SessionEvent::SetLoading(is_loading) => SessionState {
            is_loading,
            ..state.clone()
        },
        SessionEvent::SetError(error) => SessionState {
            error,
            ..state.clone()
        },
        SessionEvent::SetClassroom(classroom) => SessionState {
            classroom,
            ..state.clone()
        },
        SessionEvent::SetDebateStarted(debate_started) => SessionState {
            debate_started,
            ..state.clone()
        },
        SessionEvent::SetTeams(roster) => SessionState {
            team_a: roster.team_a,
            team_b: roster.team_b,
            ..state.clone()
        },
        SessionEvent::UpdateDebateData(update) => SessionState {
            active_game_id: Some(update.active_game_id),
            topic: update.topic,
            votes: update.votes,
            speaking_for: update.speaking_for,
            team_a_stance: update.team_a_stance,
            debate_started: update.debate_started,
            timer: update.timer,
            is_timer_running: update.is_timer_running,
            active_players: update.active_players,
            ..state.clone()
        },
        SessionEvent::UpdateRoomTimer {
            room_id,
            time,
            is_running,
        } => {
            let mut next = state.clone();
            next.timers
                .insert(room_id, RoomTimerSnapshot { time, is_running });
            next
        }
        SessionEvent::ResetRoomTimer {
            room_id,
            initial_time,
        } => {
            let mut next = state.clone();
            next.timers.insert(
                room_id,
                RoomTimerSnapshot {
                    time: initial_time,
                    is_running: false,
                },
            );
            next
        }
        SessionEvent::ResetState => SessionState {
            is_loading: false,
            ..SessionState::default()
        },
        SessionEvent::Unknown => state.clone(),
    }
}

//! The client-local projection of an active classroom session.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::store::models::{ClassroomDoc, Side, Stance, Student, VoteTally};

/// Placeholder topic shown before the first game snapshot arrives.
pub const WAITING_TOPIC: &str = "Waiting for topic...";

/// Latest observed countdown state for one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTimerSnapshot {
    /// Remaining seconds.
    pub time: u32,
    /// Whether the countdown is advancing.
    pub is_running: bool,
}

/// The subset of each roster actively speaking in the current round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePlayers {
    /// Speakers drawn from team A.
    pub team_a: Vec<Student>,
    /// Speakers drawn from team B.
    pub team_b: Vec<Student>,
}

/// Full session projection held by every connected client.
///
/// A single instance exists per client and is only ever rebuilt through the
/// reducer's transition function, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Motion of the active round.
    pub topic: String,
    /// Live vote tally.
    pub votes: VoteTally,
    /// Which team currently presents the "Pro" argument.
    pub speaking_for: Side,
    /// Stance team A argues.
    pub team_a_stance: Stance,
    /// Master roster, team A.
    pub team_a: Vec<Student>,
    /// Master roster, team B.
    pub team_b: Vec<Student>,
    /// Whether a breakout round is live.
    pub debate_started: bool,
    /// The classroom this client is attached to, if any.
    pub classroom: Option<ClassroomDoc>,
    /// Whether the full-page loading indicator should show.
    pub is_loading: bool,
    /// Dismissible error banner text, if any.
    pub error: Option<String>,
    /// Latest observed countdown snapshot per room identifier.
    pub timers: IndexMap<String, RoomTimerSnapshot>,
    /// Legacy single round timer, seconds remaining.
    pub timer: u32,
    /// Legacy single round timer running flag.
    pub is_timer_running: bool,
    /// Speakers of the current round.
    pub active_players: ActivePlayers,
    /// Identifier of the live game, if any.
    pub active_game_id: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            topic: WAITING_TOPIC.to_string(),
            votes: VoteTally::default(),
            speaking_for: Side::A,
            team_a_stance: Stance::Pro,
            team_a: Vec::new(),
            team_b: Vec::new(),
            debate_started: false,
            classroom: None,
            is_loading: true,
            error: None,
            timers: IndexMap::new(),
            timer: 0,
            is_timer_running: false,
            active_players: ActivePlayers::default(),
            active_game_id: None,
        }
    }
}

impl SessionState {
    /// Latest observed snapshot for a room, if the room is known.
    pub fn room_timer(&self, room_id: &str) -> Option<RoomTimerSnapshot> {
        self.timers.get(room_id).copied()
    }
}

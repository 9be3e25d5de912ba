//! Serde models for the JSON documents kept in the external store.
//!
//! Field names follow the camelCase convention of the hosted documents so the
//! in-memory store, fixtures, and any real backend agree on the wire shape.
//! Remote payloads are loosely typed; every field a peer may omit carries a
//! serde default so deserialization never fails the sync path.

use serde::{Deserialize, Serialize};

/// Which stance team A argues in the active round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    /// Team A argues in favor of the motion.
    Pro,
    /// Team A argues against the motion.
    Con,
}

impl Default for Stance {
    fn default() -> Self {
        Stance::Pro
    }
}

/// Identifies one of the two fixed teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Team A.
    A,
    /// Team B.
    B,
}

impl Default for Side {
    fn default() -> Self {
        Side::A
    }
}

/// The two options spectators can vote for during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    /// Vote to switch the speaking side.
    #[serde(rename = "switch")]
    Switch,
    /// Vote to keep the current speaking side.
    #[serde(rename = "dontSwitch")]
    DontSwitch,
}

/// Blind vote counters keyed by the fixed vote options.
///
/// Counters only ever grow while a game is active; they are zeroed when a new
/// game document is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    /// Votes cast for switching the speaking side.
    #[serde(default)]
    pub switch: u32,
    /// Votes cast for keeping the speaking side.
    #[serde(default)]
    pub dont_switch: u32,
}

impl VoteTally {
    /// Bump the counter for the given option.
    pub fn record(&mut self, option: VoteOption) {
        match option {
            VoteOption::Switch => self.switch += 1,
            VoteOption::DontSwitch => self.dont_switch += 1,
        }
    }
}

/// A registered student, unique by their phone-like identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// Phone-number-like identifier, unique across both teams.
    pub id: String,
    /// Display name shown in the roster.
    #[serde(default)]
    pub name: String,
}

/// The full roster of a classroom partitioned into the two teams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterDoc {
    /// Students assigned to team A, in registration order.
    #[serde(default)]
    pub team_a: Vec<Student>,
    /// Students assigned to team B, in registration order.
    #[serde(default)]
    pub team_b: Vec<Student>,
}

/// Top-level classroom session document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomDoc {
    /// Opaque identifier assigned at creation, immutable afterwards.
    pub id: String,
    /// Display name of the classroom.
    #[serde(default)]
    pub name: String,
    /// Join password handed out to spectators.
    #[serde(default)]
    pub password: String,
    /// Display name of the teacher running the session.
    #[serde(default)]
    pub admin_name: String,
    /// Creation timestamp, RFC 3339.
    #[serde(default)]
    pub created_at: String,
    /// Whether the session is accepting joins.
    #[serde(default)]
    pub is_active: bool,
    /// Identifier of the currently live game, if a round is running.
    #[serde(default)]
    pub active_game_id: Option<String>,
}

/// One timed breakout debate round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDoc {
    /// Identifier of the game within its classroom.
    pub id: String,
    /// Motion being debated.
    #[serde(default)]
    pub topic: String,
    /// Stance team A argues.
    #[serde(default)]
    pub team_a_stance: Stance,
    /// Which team currently presents the "Pro" argument.
    #[serde(default)]
    pub speaking_for: Side,
    /// Live vote tally for the round.
    #[serde(default)]
    pub votes: VoteTally,
    /// Subset of team A actively speaking in this round.
    #[serde(default)]
    pub team_a_players: Vec<Student>,
    /// Subset of team B actively speaking in this round.
    #[serde(default)]
    pub team_b_players: Vec<Student>,
    /// Remaining seconds on the legacy single round timer.
    #[serde(default)]
    pub timer: u32,
    /// Whether the legacy round timer is counting down.
    #[serde(default)]
    pub is_timer_running: bool,
    /// Creation timestamp, RFC 3339.
    #[serde(default)]
    pub created_at: String,
}

/// Partial merge write against a classroom document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomPatch {
    /// New active game identifier; `Some(None)` clears the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_game_id: Option<Option<String>>,
    /// New activity flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ClassroomPatch {
    /// Merge the set fields onto an existing classroom document.
    pub fn apply_to(&self, doc: &mut ClassroomDoc) {
        if let Some(active_game_id) = &self.active_game_id {
            doc.active_game_id = active_game_id.clone();
        }
        if let Some(is_active) = self.is_active {
            doc.is_active = is_active;
        }
    }
}

/// Partial merge write against a game document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamePatch {
    /// Replacement topic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Replacement stance for team A.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_stance: Option<Stance>,
    /// Replacement speaking side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaking_for: Option<Side>,
    /// Replacement value for the legacy round timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<u32>,
    /// Replacement running flag for the legacy round timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_timer_running: Option<bool>,
}

impl GamePatch {
    /// Merge the set fields onto an existing game document.
    pub fn apply_to(&self, doc: &mut GameDoc) {
        if let Some(topic) = &self.topic {
            doc.topic = topic.clone();
        }
        if let Some(stance) = self.team_a_stance {
            doc.team_a_stance = stance;
        }
        if let Some(side) = self.speaking_for {
            doc.speaking_for = side;
        }
        if let Some(timer) = self.timer {
            doc.timer = timer;
        }
        if let Some(running) = self.is_timer_running {
            doc.is_timer_running = running;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_defaults_missing_teams_to_empty() {
        let roster: RosterDoc = serde_json::from_str(r#"{"teamB":[{"id":"555-0101"}]}"#).unwrap();
        assert!(roster.team_a.is_empty());
        assert_eq!(roster.team_b.len(), 1);
        assert_eq!(roster.team_b[0].id, "555-0101");
        assert_eq!(roster.team_b[0].name, "");
    }

    #[test]
    fn vote_tally_uses_fixed_camel_case_keys() {
        let tally = VoteTally {
            switch: 3,
            dont_switch: 1,
        };
        let json = serde_json::to_value(&tally).unwrap();
        assert_eq!(json["switch"], 3);
        assert_eq!(json["dontSwitch"], 1);
    }

    #[test]
    fn game_patch_merges_only_set_fields() {
        let mut doc = GameDoc {
            id: "g1".into(),
            topic: "old".into(),
            timer: 120,
            is_timer_running: true,
            ..GameDoc::default()
        };

        let patch = GamePatch {
            topic: Some("new".into()),
            ..GamePatch::default()
        };
        patch.apply_to(&mut doc);

        assert_eq!(doc.topic, "new");
        assert_eq!(doc.timer, 120);
        assert!(doc.is_timer_running);
    }

    #[test]
    fn classroom_patch_can_clear_active_game() {
        let mut doc = ClassroomDoc {
            id: "c1".into(),
            active_game_id: Some("g1".into()),
            ..ClassroomDoc::default()
        };

        let patch = ClassroomPatch {
            active_game_id: Some(None),
            ..ClassroomPatch::default()
        };
        patch.apply_to(&mut doc);

        assert_eq!(doc.active_game_id, None);
    }
}

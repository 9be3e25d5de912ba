//! Game lifecycle and voting: bootstrap a round, activate it on the
//! classroom, steer it, and record votes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::session::state::RoomTimerSnapshot;
use crate::session::{SessionEvent, SessionHub};
use crate::store::DocumentStore;
use crate::store::models::{
    ClassroomPatch, GameDoc, GamePatch, Side, Stance, Student, VoteOption, VoteTally,
};
use crate::timer::clamp_duration;

/// Payload used to bootstrap a new debate round.
#[derive(Debug, Clone)]
pub struct CreateGameRequest {
    /// Motion to debate.
    pub topic: String,
    /// Stance team A argues.
    pub team_a_stance: Stance,
    /// Which team opens as the "Pro" speaker.
    pub speaking_for: Side,
    /// Speakers drawn from team A.
    pub team_a_players: Vec<Student>,
    /// Speakers drawn from team B.
    pub team_b_players: Vec<Student>,
    /// Round duration in seconds; loosely typed and clamped at zero.
    pub round_seconds: i64,
}

/// Create a game document and activate it on the classroom.
///
/// Votes start zeroed; activation is the merge of `active_game_id` onto the
/// classroom document, which is what every subscribed client reacts to.
pub async fn create_game(
    store: &dyn DocumentStore,
    classroom_id: &str,
    request: CreateGameRequest,
) -> Result<GameDoc, ServiceError> {
    let game = build_game(request)?;

    store.put_game(classroom_id, game.clone()).await?;
    store
        .merge_classroom(
            classroom_id,
            ClassroomPatch {
                active_game_id: Some(Some(game.id.clone())),
                ..ClassroomPatch::default()
            },
        )
        .await?;

    info!(classroom_id, game_id = %game.id, "created and activated game");
    Ok(game)
}

/// End the live round by clearing the classroom's active game reference.
///
/// The superseded game document stays in the store but is no longer
/// referenced by anything.
pub async fn end_round(store: &dyn DocumentStore, classroom_id: &str) -> Result<(), ServiceError> {
    store
        .merge_classroom(
            classroom_id,
            ClassroomPatch {
                active_game_id: Some(None),
                ..ClassroomPatch::default()
            },
        )
        .await?;
    Ok(())
}

/// Change which team presents the "Pro" argument.
pub async fn set_speaking_side(
    store: &dyn DocumentStore,
    classroom_id: &str,
    game_id: &str,
    side: Side,
) -> Result<(), ServiceError> {
    store
        .merge_game(
            classroom_id,
            game_id,
            GamePatch {
                speaking_for: Some(side),
                ..GamePatch::default()
            },
        )
        .await?;
    Ok(())
}

/// Change the stance team A argues.
pub async fn set_stance(
    store: &dyn DocumentStore,
    classroom_id: &str,
    game_id: &str,
    stance: Stance,
) -> Result<(), ServiceError> {
    store
        .merge_game(
            classroom_id,
            game_id,
            GamePatch {
                team_a_stance: Some(stance),
                ..GamePatch::default()
            },
        )
        .await?;
    Ok(())
}

/// Persist the round timer onto the game document.
///
/// Only the admin client calls this: electing a single durable writer keeps
/// concurrently running clients from racing divergent `time` values onto the
/// same document. Everyone else just predicts locally until the authoritative
/// snapshot comes back through the game feed.
pub async fn persist_round_timer(
    store: &dyn DocumentStore,
    classroom_id: &str,
    game_id: &str,
    snapshot: RoomTimerSnapshot,
) -> Result<(), ServiceError> {
    store
        .merge_game(
            classroom_id,
            game_id,
            GamePatch {
                timer: Some(snapshot.time),
                is_timer_running: Some(snapshot.is_running),
                ..GamePatch::default()
            },
        )
        .await?;
    Ok(())
}

/// One spectator's single-use vote token for the current game.
///
/// The double-vote invariant is enforced by this guard before anything is
/// dispatched, not detected after the fact.
#[derive(Debug, Default)]
pub struct Ballot {
    cast: AtomicBool,
}

impl Ballot {
    /// Fresh ballot for a new round.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this ballot has already been used.
    pub fn has_voted(&self) -> bool {
        self.cast.load(Ordering::Acquire)
    }

    fn try_claim(&self) -> bool {
        !self.cast.swap(true, Ordering::AcqRel)
    }

    fn release(&self) {
        self.cast.store(false, Ordering::Release);
    }
}

/// Cast a vote: a fire-and-forget durable increment.
///
/// The caller may mark the vote as cast immediately; the visible tally only
/// moves once the increment comes back through the game subscription. A store
/// failure surfaces as a `SetError` event and re-arms the ballot so the
/// spectator can simply vote again.
pub async fn submit_vote(
    store: &dyn DocumentStore,
    hub: &SessionHub,
    ballot: &Ballot,
    classroom_id: &str,
    game_id: &str,
    option: VoteOption,
) -> Result<(), ServiceError> {
    if !ballot.try_claim() {
        return Err(ServiceError::InvalidState("vote already cast".into()));
    }

    if let Err(err) = store.increment_vote(classroom_id, game_id, option).await {
        ballot.release();
        hub.dispatch(SessionEvent::SetError(Some(err.to_string())));
        return Err(err.into());
    }

    Ok(())
}

fn build_game(request: CreateGameRequest) -> Result<GameDoc, ServiceError> {
    let CreateGameRequest {
        topic,
        team_a_stance,
        speaking_for,
        team_a_players,
        team_b_players,
        round_seconds,
    } = request;

    if topic.trim().is_empty() {
        return Err(ServiceError::InvalidInput("topic must not be empty".into()));
    }

    let mut seen_ids = HashSet::new();
    for player in team_a_players.iter().chain(team_b_players.iter()) {
        if !seen_ids.insert(player.id.as_str()) {
            return Err(ServiceError::InvalidInput(format!(
                "player `{}` appears on both sides",
                player.id
            )));
        }
    }

    Ok(GameDoc {
        id: Uuid::new_v4().simple().to_string(),
        topic,
        team_a_stance,
        speaking_for,
        votes: VoteTally::default(),
        team_a_players,
        team_b_players,
        timer: clamp_duration(round_seconds),
        is_timer_running: false,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    })
}

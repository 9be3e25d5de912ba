//! Registry owning every live room timer and the shared tick driver.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use crate::session::state::RoomTimerSnapshot;
use crate::session::{SessionEvent, SessionHub};
use crate::timer::unit::RoomTimer;

/// Owns the mapping of room identifier to [`RoomTimer`].
///
/// Units are created lazily on first reference. Every state change produced
/// here is pushed to the session store as the authoritative update for that
/// room, so all observers converge on the same value without running their own
/// perfectly synchronized clock. Operations on different rooms are fully
/// independent; there is no cross-room transaction or ordering guarantee.
pub struct TimerRegistry {
    timers: DashMap<String, RoomTimer>,
    hub: SessionHub,
    default_seconds: u32,
}

impl TimerRegistry {
    /// Build a registry that publishes updates into the given session store.
    pub fn new(hub: SessionHub, default_seconds: u32) -> Self {
        Self {
            timers: DashMap::new(),
            hub,
            default_seconds,
        }
    }

    /// Return the current snapshot for a room, creating its timer on first
    /// reference seeded with `initial_time` (registry default when `None`).
    pub fn get_or_create(&self, room_id: &str, initial_time: Option<u32>) -> RoomTimerSnapshot {
        let seed = initial_time.unwrap_or(self.default_seconds);
        let created = !self.timers.contains_key(room_id);
        let snapshot = self
            .timers
            .entry(room_id.to_string())
            .or_insert_with(|| RoomTimer::new(seed))
            .snapshot();

        if created {
            debug!(room_id, seed, "created room timer");
            self.publish(room_id, snapshot);
        }
        snapshot
    }

    /// Start one room's countdown at the given duration.
    pub fn start(&self, room_id: &str, duration: u32) {
        let snapshot = self.with_timer(room_id, |timer| timer.start(duration));
        self.publish(room_id, snapshot);
    }

    /// Pause one room's countdown, preserving remaining time.
    pub fn pause(&self, room_id: &str) {
        let snapshot = self.with_timer(room_id, |timer| timer.pause());
        self.publish(room_id, snapshot);
    }

    /// Reset one room's countdown to a stopped duration.
    pub fn reset(&self, room_id: &str, duration: u32) {
        self.with_timer(room_id, |timer| timer.reset(duration));
        self.hub.dispatch(SessionEvent::ResetRoomTimer {
            room_id: room_id.to_string(),
            initial_time: duration,
        });
    }

    /// Start several rooms at the same duration, each independently.
    pub fn start_all<I, S>(&self, room_ids: I, duration: u32)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for room_id in room_ids {
            self.start(room_id.as_ref(), duration);
        }
    }

    /// Pause several rooms, each independently.
    pub fn pause_all<I, S>(&self, room_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for room_id in room_ids {
            self.pause(room_id.as_ref());
        }
    }

    /// Reset several rooms to the same duration, each independently.
    pub fn reset_all<I, S>(&self, room_ids: I, duration: u32)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for room_id in room_ids {
            self.reset(room_id.as_ref(), duration);
        }
    }

    /// Apply an authoritative remote snapshot for a room.
    ///
    /// Remote always wins: whatever the local countdown predicted is
    /// discarded in favor of the snapshot, which is then republished so the
    /// session store converges too.
    pub fn apply_remote(&self, room_id: &str, snapshot: RoomTimerSnapshot) {
        self.with_timer(room_id, |timer| timer.overwrite(snapshot));
        self.publish(room_id, snapshot);
    }

    /// Advance every running timer by one second, publishing the rooms that
    /// changed.
    pub fn tick_all(&self) {
        let mut changed = Vec::new();
        for mut entry in self.timers.iter_mut() {
            if entry.value_mut().tick() {
                changed.push((entry.key().clone(), entry.value().snapshot()));
            }
        }
        for (room_id, snapshot) in changed {
            self.publish(&room_id, snapshot);
        }
    }

    fn with_timer(&self, room_id: &str, op: impl FnOnce(&mut RoomTimer)) -> RoomTimerSnapshot {
        let mut entry = self
            .timers
            .entry(room_id.to_string())
            .or_insert_with(|| RoomTimer::new(self.default_seconds));
        op(&mut entry);
        entry.snapshot()
    }

    fn publish(&self, room_id: &str, snapshot: RoomTimerSnapshot) {
        self.hub.dispatch(SessionEvent::UpdateRoomTimer {
            room_id: room_id.to_string(),
            time: snapshot.time,
            is_running: snapshot.is_running,
        });
    }
}

/// Spawn the 1-second tick driver for a registry.
///
/// The first tick fires a full second after the call, and missed ticks are
/// skipped rather than bursted so a stalled runtime does not fast-forward the
/// countdowns.
pub fn spawn_ticker(registry: Arc<TimerRegistry>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(1);
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            registry.tick_all();
        }
    })
}

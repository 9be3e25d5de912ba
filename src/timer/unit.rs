//! A single countdown clock bound to one room identifier.

use crate::session::state::RoomTimerSnapshot;

/// Clamp a loosely-typed duration to the unsigned range the timers work in.
///
/// Remote payloads may carry negative durations; those start an
/// already-expired timer rather than failing.
pub fn clamp_duration(seconds: i64) -> u32 {
    seconds.clamp(0, i64::from(u32::MAX)) as u32
}

/// Countdown state for one room.
///
/// The unit only advances through explicit [`RoomTimer::tick`] calls; the
/// registry drives those from a shared 1-second interval. `time` never goes
/// below zero, and reaching zero forces the running flag off until an explicit
/// start or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomTimer {
    time: u32,
    is_running: bool,
}

impl RoomTimer {
    /// Seed a stopped timer with the given duration.
    pub fn new(initial_time: u32) -> Self {
        Self {
            time: initial_time,
            is_running: false,
        }
    }

    /// Set the remaining time and start counting down.
    ///
    /// Starting with a zero duration yields an already-expired timer, so the
    /// running flag stays off.
    pub fn start(&mut self, duration: u32) {
        self.time = duration;
        self.is_running = duration > 0;
    }

    /// Stop counting down, preserving the remaining time.
    pub fn pause(&mut self) {
        self.is_running = false;
    }

    /// Set the remaining time without starting the countdown.
    pub fn reset(&mut self, duration: u32) {
        self.time = duration;
        self.is_running = false;
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `true` when the call changed the timer state, so callers know
    /// whether to publish an update. A paused or expired timer ticks to
    /// nothing.
    pub fn tick(&mut self) -> bool {
        if !self.is_running || self.time == 0 {
            return false;
        }

        self.time -= 1;
        if self.time == 0 {
            self.is_running = false;
        }
        true
    }

    /// Overwrite local countdown state with an authoritative remote snapshot.
    ///
    /// Remote always wins over local prediction; the local countdown exists
    /// only to smooth the display between remote updates.
    pub fn overwrite(&mut self, snapshot: RoomTimerSnapshot) {
        self.time = snapshot.time;
        self.is_running = snapshot.is_running;
    }

    /// Current countdown state.
    pub fn snapshot(&self) -> RoomTimerSnapshot {
        RoomTimerSnapshot {
            time: self.time,
            is_running: self.is_running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_then_tick_counts_down() {
        let mut timer = RoomTimer::new(60);
        timer.start(300);

        for _ in 0..3 {
            assert!(timer.tick());
        }

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.time, 297);
        assert!(snapshot.is_running);
    }

    #[test]
    fn pause_preserves_remaining_time() {
        let mut timer = RoomTimer::new(60);
        timer.start(300);
        timer.tick();
        timer.tick();
        timer.tick();
        timer.pause();

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.time, 297);
        assert!(!snapshot.is_running);
        assert!(!timer.tick());
    }

    #[test]
    fn time_never_goes_below_zero_and_stops_at_zero() {
        let mut timer = RoomTimer::new(60);
        timer.start(2);

        assert!(timer.tick());
        assert!(timer.tick());

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.time, 0);
        assert!(!snapshot.is_running);

        // Further ticks are no-ops and the flag stays off.
        for _ in 0..5 {
            assert!(!timer.tick());
        }
        assert_eq!(timer.snapshot().time, 0);
        assert!(!timer.snapshot().is_running);
    }

    #[test]
    fn zero_duration_starts_already_expired() {
        let mut timer = RoomTimer::new(60);
        timer.start(0);

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.time, 0);
        assert!(!snapshot.is_running);
    }

    #[test]
    fn reset_stops_and_reseeds() {
        let mut timer = RoomTimer::new(60);
        timer.start(300);
        timer.tick();
        timer.reset(300);

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.time, 300);
        assert!(!snapshot.is_running);
    }

    #[test]
    fn remote_snapshot_overwrites_local_prediction() {
        let mut timer = RoomTimer::new(60);
        timer.start(300);
        timer.tick();
        timer.tick();

        timer.overwrite(RoomTimerSnapshot {
            time: 295,
            is_running: true,
        });

        assert_eq!(timer.snapshot().time, 295);
        assert!(timer.snapshot().is_running);
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        assert_eq!(clamp_duration(-5), 0);
        assert_eq!(clamp_duration(0), 0);
        assert_eq!(clamp_duration(300), 300);
    }
}

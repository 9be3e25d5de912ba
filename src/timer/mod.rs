//! Per-room countdown timers: the single-clock unit and the registry that
//! owns one unit per room identifier.

pub mod registry;
pub mod unit;

pub use self::registry::{TimerRegistry, spawn_ticker};
pub use self::unit::{RoomTimer, clamp_duration};

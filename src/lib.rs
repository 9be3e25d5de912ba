//! Library crate for rostrum-sync, exposing modules for binaries and integration tests.

pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod store;
pub mod sync;
pub mod timer;

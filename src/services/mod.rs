//! Service layer: durable operations against the document store plus the
//! content-generator collaborator.
//!
//! Services never touch the session projection directly; anything a client
//! should see flows back through the store's change feeds and the sync
//! controller.

pub mod classroom_service;
pub mod content_service;
pub mod game_service;

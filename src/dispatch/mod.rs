//! Broadcast dispatch engine.

pub mod analyzer;
pub mod dispatcher;
pub mod payload;
pub mod progress;

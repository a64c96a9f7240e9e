#![forbid(unsafe_code)]

//! Template broadcast service: dispatches provider-approved message
//! templates to contact groups with pacing, durable per-contact status, and
//! a single-job admission gate.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod http;
pub mod models;
pub mod persistence;
pub mod provider;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};

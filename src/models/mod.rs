//! Domain model module declarations.

pub mod contact;
pub mod plan;
pub mod progress;
pub mod template;

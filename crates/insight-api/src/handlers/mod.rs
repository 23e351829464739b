//! HTTP handlers.

pub mod insights;
pub mod jobs;
pub mod team;

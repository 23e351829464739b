//! # insight-core
//!
//! Core types, catalogs, and traits for the sprint insight pipeline.
//!
//! This crate provides the data model shared by the producer, queue, consumer
//! and HTTP layer, plus the trait seams their backends implement.

pub mod catalog;
pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use catalog::{resolve_job_tag, InsightBatch, JobTarget, ASK_JOB_TAG, JOB_CATALOG};
pub use error::{Error, GatewayError, Result};
pub use models::*;
pub use traits::*;

//! # insight-jobs
//!
//! Producer, consumer, and background worker for the sprint insight pipeline.
//!
//! The producer turns a named batch into queued jobs. The worker claims jobs
//! from the [`JobQueue`](insight_core::JobQueue) and runs the consumer, which
//! calls the gateway and writes one field of the insight dataset.

pub mod consumer;
pub mod handler;
pub mod producer;
pub mod worker;

pub use consumer::InsightJobHandler;
pub use handler::{JobContext, JobHandler, JobResult, ProgressCallback};
pub use producer::InsightProducer;
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};

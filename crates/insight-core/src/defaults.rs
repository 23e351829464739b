//! Centralized default constants for the insight pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers and strings.

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Key holding the opaque application settings blob.
pub const KEY_APP_SETTINGS: &str = "AppSettings";

/// Key holding the single insight dataset record.
pub const KEY_AI_DATASET: &str = "AIDataset";

/// Key holding the scalar ad-hoc question response.
pub const KEY_ASK_RESPONSE: &str = "AskGPTResponse";

/// Key holding the ordered team skill list.
pub const KEY_TEAM_SKILLS: &str = "TeamSkills";

// =============================================================================
// CONSUMER
// =============================================================================

/// Stored in place of an insight when the gateway returns zero choices.
pub const NO_CHOICES_MESSAGE: &str = "AI response did not include any choices.";

/// Prefix shared by every job-type tag.
pub const JOB_TAG_PREFIX: &str = "callOpenAI-";

// =============================================================================
// SKILLS
// =============================================================================

/// Lowest accepted skill level.
pub const SKILL_LEVEL_MIN: u8 = 1;

/// Highest accepted skill level.
pub const SKILL_LEVEL_MAX: u8 = 10;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default HTTP server bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default worker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const GEN_MODEL: &str = "gpt-3.5-turbo";

/// Number of choices requested per completion.
pub const CHOICE_COUNT: u32 = 1;

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// ISSUE SOURCE
// =============================================================================

/// Timeout for issue-tracker requests in seconds.
pub const ISSUE_SOURCE_TIMEOUT_SECS: u64 = 30;

/// Account type of human (non-service) users.
pub const HUMAN_ACCOUNT_TYPE: &str = "atlassian";

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default number of delivery attempts before a job is marked failed.
pub const JOB_MAX_ATTEMPTS: i32 = 3;

/// Default worker poll interval in milliseconds.
///
/// The worker is also woken by the queue's notifier on enqueue, so this only
/// bounds latency for jobs inserted by another process.
pub const JOB_POLL_INTERVAL_MS: u64 = 1_000;

/// Default maximum concurrent jobs per worker.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Default job execution timeout in seconds (5 minutes).
pub const JOB_TIMEOUT_SECS: u64 = 300;

/// Seconds a job may stay `running` in the database queue before another
/// worker reclaims it. Twice the default job timeout.
pub const JOB_STALE_AFTER_SECS: u64 = 2 * JOB_TIMEOUT_SECS;

/// Finished (completed or failed) jobs the in-memory queue keeps for status
/// lookups before dropping the oldest.
pub const JOB_RETAINED_FINISHED: usize = 1_000;

//! Core data models for the insight pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{HUMAN_ACCOUNT_TYPE, SKILL_LEVEL_MAX, SKILL_LEVEL_MIN};
use crate::{Error, Result};

// =============================================================================
// INSIGHT TYPES
// =============================================================================

/// One of the fixed insight categories a job can generate.
///
/// The serialized name doubles as the field key inside the persisted
/// [`InsightDataset`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InsightType {
    SprintPlanSteps,
    SprintTaskPriority,
    SprintLeads,
    DailySummary,
    DailyQuestionsToAsk,
    DailyBottlenecks,
    DailyQueriesToSolve,
    Daily24HoursIssueUpdated,
    Daily3DaysIssueUpdated,
    Daily3DaysIdleIssues,
    Daily7DaysIdleIssues,
    ReviewAchievementsSummary,
    ReviewKeyAchievements,
    ReviewFailureSummary,
    ReviewKeyFailures,
    ReviewTopPerformers,
    ReviewLaggards,
    ReviewBottleneckIssues,
}

/// Tab an insight belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    SprintPlanning,
    DailyBrief,
    Review,
}

impl InsightType {
    /// Every insight type, in dataset order.
    pub const ALL: [InsightType; 18] = [
        InsightType::SprintPlanSteps,
        InsightType::SprintTaskPriority,
        InsightType::SprintLeads,
        InsightType::DailySummary,
        InsightType::DailyQuestionsToAsk,
        InsightType::DailyBottlenecks,
        InsightType::DailyQueriesToSolve,
        InsightType::Daily24HoursIssueUpdated,
        InsightType::Daily3DaysIssueUpdated,
        InsightType::Daily3DaysIdleIssues,
        InsightType::Daily7DaysIdleIssues,
        InsightType::ReviewAchievementsSummary,
        InsightType::ReviewKeyAchievements,
        InsightType::ReviewFailureSummary,
        InsightType::ReviewKeyFailures,
        InsightType::ReviewTopPerformers,
        InsightType::ReviewLaggards,
        InsightType::ReviewBottleneckIssues,
    ];

    /// Persisted field name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::SprintPlanSteps => "SprintPlanSteps",
            InsightType::SprintTaskPriority => "SprintTaskPriority",
            InsightType::SprintLeads => "SprintLeads",
            InsightType::DailySummary => "DailySummary",
            InsightType::DailyQuestionsToAsk => "DailyQuestionsToAsk",
            InsightType::DailyBottlenecks => "DailyBottlenecks",
            InsightType::DailyQueriesToSolve => "DailyQueriesToSolve",
            InsightType::Daily24HoursIssueUpdated => "Daily24HoursIssueUpdated",
            InsightType::Daily3DaysIssueUpdated => "Daily3DaysIssueUpdated",
            InsightType::Daily3DaysIdleIssues => "Daily3DaysIdleIssues",
            InsightType::Daily7DaysIdleIssues => "Daily7DaysIdleIssues",
            InsightType::ReviewAchievementsSummary => "ReviewAchievementsSummary",
            InsightType::ReviewKeyAchievements => "ReviewKeyAchievements",
            InsightType::ReviewFailureSummary => "ReviewFailureSummary",
            InsightType::ReviewKeyFailures => "ReviewKeyFailures",
            InsightType::ReviewTopPerformers => "ReviewTopPerformers",
            InsightType::ReviewLaggards => "ReviewLaggards",
            InsightType::ReviewBottleneckIssues => "ReviewBottleneckIssues",
        }
    }

    /// Category this insight is shown under.
    pub fn category(&self) -> InsightCategory {
        match self {
            InsightType::SprintPlanSteps
            | InsightType::SprintTaskPriority
            | InsightType::SprintLeads => InsightCategory::SprintPlanning,
            InsightType::DailySummary
            | InsightType::DailyQuestionsToAsk
            | InsightType::DailyBottlenecks
            | InsightType::DailyQueriesToSolve
            | InsightType::Daily24HoursIssueUpdated
            | InsightType::Daily3DaysIssueUpdated
            | InsightType::Daily3DaysIdleIssues
            | InsightType::Daily7DaysIdleIssues => InsightCategory::DailyBrief,
            InsightType::ReviewAchievementsSummary
            | InsightType::ReviewKeyAchievements
            | InsightType::ReviewFailureSummary
            | InsightType::ReviewKeyFailures
            | InsightType::ReviewTopPerformers
            | InsightType::ReviewLaggards
            | InsightType::ReviewBottleneckIssues => InsightCategory::Review,
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        InsightType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown insight type: {}", s)))
    }
}

// =============================================================================
// INSIGHT DATASET
// =============================================================================

/// The single shared record of generated insights.
///
/// Always holds every [`InsightType`]; an empty string means "not yet
/// generated". On load, missing keys are filled with empty strings and
/// unknown keys are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct InsightDataset {
    fields: BTreeMap<InsightType, String>,
}

impl Default for InsightDataset {
    fn default() -> Self {
        Self {
            fields: InsightType::ALL
                .iter()
                .map(|t| (*t, String::new()))
                .collect(),
        }
    }
}

impl InsightDataset {
    /// Generated text for `insight`, or `""` if not yet generated.
    pub fn get(&self, insight: InsightType) -> &str {
        self.fields.get(&insight).map(String::as_str).unwrap_or("")
    }

    /// Replace one field, returning the previous value.
    pub fn set(&mut self, insight: InsightType, value: impl Into<String>) -> String {
        self.fields
            .insert(insight, value.into())
            .unwrap_or_default()
    }

    /// Whether `insight` has a non-empty value.
    pub fn is_generated(&self, insight: InsightType) -> bool {
        !self.get(insight).is_empty()
    }

    /// Number of fields holding a value.
    pub fn generated_count(&self) -> usize {
        self.fields.values().filter(|v| !v.is_empty()).count()
    }

    /// Iterate fields in [`InsightType::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (InsightType, &str)> {
        InsightType::ALL.iter().map(move |t| (*t, self.get(*t)))
    }
}

impl From<BTreeMap<String, String>> for InsightDataset {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut dataset = InsightDataset::default();
        for (key, value) in raw {
            if let Ok(insight) = key.parse::<InsightType>() {
                dataset.set(insight, value);
            }
        }
        dataset
    }
}

impl From<InsightDataset> for BTreeMap<String, String> {
    fn from(dataset: InsightDataset) -> Self {
        dataset
            .fields
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Application settings blob. Only `api_key` is read by the pipeline.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(rename = "APIKey", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "AIModel", default, skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    #[serde(rename = "AIAnonymize", default, skip_serializing_if = "Option::is_none")]
    pub ai_anonymize: Option<String>,
}

impl AppSettings {
    /// True once any setting has been saved.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() || self.ai_model.is_some() || self.ai_anonymize.is_some()
    }

    /// API key to send to the gateway, unvalidated.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl fmt::Debug for AppSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("ai_model", &self.ai_model)
            .field("ai_anonymize", &self.ai_anonymize)
            .finish()
    }
}

// =============================================================================
// TEAM SKILLS
// =============================================================================

/// A skill claimed by one team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub member_name: String,
    pub skill: String,
    pub skill_level: u8,
}

impl SkillEntry {
    pub fn new(member_name: impl Into<String>, skill: impl Into<String>, skill_level: u8) -> Self {
        Self {
            member_name: member_name.into(),
            skill: skill.into(),
            skill_level,
        }
    }

    /// Reject entries outside the 1–10 scale or with blank names.
    pub fn validate(&self) -> Result<()> {
        if self.member_name.trim().is_empty() {
            return Err(Error::InvalidInput("member_name must not be empty".into()));
        }
        if self.skill.trim().is_empty() {
            return Err(Error::InvalidInput("skill must not be empty".into()));
        }
        if !(SKILL_LEVEL_MIN..=SKILL_LEVEL_MAX).contains(&self.skill_level) {
            return Err(Error::InvalidInput(format!(
                "skill_level must be between {} and {}, got {}",
                SKILL_LEVEL_MIN, SKILL_LEVEL_MAX, self.skill_level
            )));
        }
        Ok(())
    }
}

// =============================================================================
// ISSUES AND USERS
// =============================================================================

/// Issue reduced to what the prompts need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedIssue {
    pub key: String,
    pub summary: String,
    pub description: String,
}

/// Rich-text document as returned by the issue tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichDocument {
    #[serde(default)]
    pub content: Vec<DocumentBlock>,
}

/// Top-level block of a [`RichDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub content: Option<Vec<TextRun>>,
}

/// Inline node inside a block. Non-text nodes have no `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub text: Option<String>,
}

impl RichDocument {
    /// Plain text of all paragraph blocks.
    ///
    /// Runs inside a paragraph are joined with a single space; paragraphs are
    /// concatenated with no separator. Other block types are skipped.
    pub fn flatten(&self) -> String {
        self.content
            .iter()
            .filter(|block| block.block_type == "paragraph")
            .filter_map(|block| block.content.as_ref())
            .filter(|runs| !runs.is_empty())
            .map(|runs| {
                runs.iter()
                    .map(|run| run.text.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

/// Issue record as returned by the issue source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIssue {
    pub key: String,
    pub fields: RawIssueFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<RichDocument>,
}

impl RawIssue {
    pub fn simplify(&self) -> SimplifiedIssue {
        SimplifiedIssue {
            key: self.key.clone(),
            summary: self.fields.summary.clone(),
            description: self
                .fields
                .description
                .as_ref()
                .map(RichDocument::flatten)
                .unwrap_or_default(),
        }
    }
}

/// User record as returned by the user source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "accountType", default)]
    pub account_type: String,
    #[serde(default)]
    pub active: bool,
}

impl RawUser {
    /// Active human account (not an app or service user).
    pub fn is_team_member(&self) -> bool {
        self.active && self.account_type == HUMAN_ACCOUNT_TYPE
    }
}

/// A user who can be assigned skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub account_id: String,
    pub display_name: String,
}

impl From<RawUser> for TeamMember {
    fn from(user: RawUser) -> Self {
        Self {
            account_id: user.account_id,
            display_name: user.display_name,
        }
    }
}

// =============================================================================
// PROMPT CONTEXT
// =============================================================================

/// Data embedded in every prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiPromptContext {
    pub issues: Vec<SimplifiedIssue>,
    #[serde(rename = "memberSkills")]
    pub member_skills: Vec<SkillEntry>,
}

// =============================================================================
// JOBS
// =============================================================================

/// Data carried by a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub prompt: String,
}

impl JobPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// Queue-side status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed and failed jobs are never delivered again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Job(format!("Unknown job status: {}", other))),
        }
    }
}

/// A job as tracked by the queue.
///
/// `job_type` is the transport tag; it is resolved against the catalog only
/// when the job is consumed, so unknown tags can be queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// New pending job with a time-ordered id.
    pub fn new(job_type: impl Into<String>, payload: JobPayload, max_attempts: i32) -> Self {
        Self {
            id: Uuid::now_v7(),
            job_type: job_type.into(),
            payload,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Whether a retryable failure may re-queue this job.
    pub fn has_attempts_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            id: self.id,
            job_type: self.job_type.clone(),
        }
    }
}

/// Opaque reference returned by enqueue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: Uuid,
    pub job_type: String,
}

// =============================================================================
// READINESS
// =============================================================================

/// Missing configuration that makes generated insights unhelpful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessWarning {
    SettingsMissing,
    SkillsMissing,
}

impl ReadinessWarning {
    pub fn message(&self) -> &'static str {
        match self {
            ReadinessWarning::SettingsMissing => {
                "Configure the AI API key and model choice in the app settings."
            }
            ReadinessWarning::SkillsMissing => "Add team member skills in the skill mapping.",
        }
    }
}

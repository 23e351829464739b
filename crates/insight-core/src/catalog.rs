//! Job-tag and batch catalogs.
//!
//! Job tags are the transport-level strings carried by queued jobs. The
//! consumer resolves them through [`resolve_job_tag`]; anything not listed
//! here is dropped without touching storage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::InsightType;
use crate::{Error, Result};

/// Tag of the ad-hoc question job.
pub const ASK_JOB_TAG: &str = "callOpenAI-AskGPT";

/// Where a consumed job writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobTarget {
    /// One field of the insight dataset.
    Insight(InsightType),
    /// The scalar ad-hoc question response.
    AskResponse,
}

/// Every known job tag and its target.
pub const JOB_CATALOG: [(&str, JobTarget); 19] = [
    ("callOpenAI-SprintPlanSteps", JobTarget::Insight(InsightType::SprintPlanSteps)),
    ("callOpenAI-SprintTaskPriority", JobTarget::Insight(InsightType::SprintTaskPriority)),
    ("callOpenAI-SprintLeads", JobTarget::Insight(InsightType::SprintLeads)),
    ("callOpenAI-DailySummary", JobTarget::Insight(InsightType::DailySummary)),
    ("callOpenAI-DailyQuestions", JobTarget::Insight(InsightType::DailyQuestionsToAsk)),
    ("callOpenAI-DailyBottlenecks", JobTarget::Insight(InsightType::DailyBottlenecks)),
    ("callOpenAI-DailyQueries", JobTarget::Insight(InsightType::DailyQueriesToSolve)),
    (
        "callOpenAI-DailyIssueUpdates24Hours",
        JobTarget::Insight(InsightType::Daily24HoursIssueUpdated),
    ),
    (
        "callOpenAI-DailyIssueUpdates3Days",
        JobTarget::Insight(InsightType::Daily3DaysIssueUpdated),
    ),
    ("callOpenAI-DailyIdleIssues3Days", JobTarget::Insight(InsightType::Daily3DaysIdleIssues)),
    ("callOpenAI-DailyIdleIssues7Days", JobTarget::Insight(InsightType::Daily7DaysIdleIssues)),
    (
        "callOpenAI-ReviewAchievementsSummary",
        JobTarget::Insight(InsightType::ReviewAchievementsSummary),
    ),
    ("callOpenAI-ReviewAchievements", JobTarget::Insight(InsightType::ReviewKeyAchievements)),
    ("callOpenAI-ReviewFailuresSummary", JobTarget::Insight(InsightType::ReviewFailureSummary)),
    ("callOpenAI-ReviewFailures", JobTarget::Insight(InsightType::ReviewKeyFailures)),
    ("callOpenAI-ReviewTeamPerformanceTop", JobTarget::Insight(InsightType::ReviewTopPerformers)),
    ("callOpenAI-ReviewTeamPerformanceLags", JobTarget::Insight(InsightType::ReviewLaggards)),
    (
        "callOpenAI-ReviewBottleneckIssues",
        JobTarget::Insight(InsightType::ReviewBottleneckIssues),
    ),
    (ASK_JOB_TAG, JobTarget::AskResponse),
];

/// Look up the target of a job tag. `None` for unknown tags.
pub fn resolve_job_tag(tag: &str) -> Option<JobTarget> {
    JOB_CATALOG
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, target)| *target)
}

impl JobTarget {
    /// Job tag that routes to this target.
    pub fn tag(&self) -> &'static str {
        JOB_CATALOG
            .iter()
            .find(|(_, target)| target == self)
            .map(|(tag, _)| *tag)
            // every target has a catalog row; checked by tests
            .unwrap_or(ASK_JOB_TAG)
    }
}

/// Named group of insights generated together by one controller action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsightBatch {
    #[serde(rename = "Sprint-PlanAll")]
    SprintPlanAll,
    #[serde(rename = "Sprint-PlanSteps")]
    SprintPlanSteps,
    #[serde(rename = "Sprint-TaskPriority")]
    SprintTaskPriority,
    #[serde(rename = "Sprint-Leads")]
    SprintLeads,
    #[serde(rename = "Daily-BriefAll")]
    DailyBriefAll,
    #[serde(rename = "Daily-SummaryAndQuestions")]
    DailySummaryAndQuestions,
    #[serde(rename = "Daily-BottlenecksAndQueries")]
    DailyBottlenecksAndQueries,
    #[serde(rename = "Daily-IssueUpdates24Hours3Days")]
    DailyIssueUpdates,
    #[serde(rename = "Daily-IdleIssues3Days7Days")]
    DailyIdleIssues,
    #[serde(rename = "Review-All")]
    ReviewAll,
    #[serde(rename = "Review-SummaryAndAchievements")]
    ReviewAchievements,
    #[serde(rename = "Review-SummaryAndFailures")]
    ReviewFailures,
    #[serde(rename = "Review-TeamPerformance")]
    ReviewTeamPerformance,
    #[serde(rename = "Review-BottleneckIssues")]
    ReviewBottleneckIssues,
}

impl InsightBatch {
    pub const ALL: [InsightBatch; 14] = [
        InsightBatch::SprintPlanAll,
        InsightBatch::SprintPlanSteps,
        InsightBatch::SprintTaskPriority,
        InsightBatch::SprintLeads,
        InsightBatch::DailyBriefAll,
        InsightBatch::DailySummaryAndQuestions,
        InsightBatch::DailyBottlenecksAndQueries,
        InsightBatch::DailyIssueUpdates,
        InsightBatch::DailyIdleIssues,
        InsightBatch::ReviewAll,
        InsightBatch::ReviewAchievements,
        InsightBatch::ReviewFailures,
        InsightBatch::ReviewTeamPerformance,
        InsightBatch::ReviewBottleneckIssues,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            InsightBatch::SprintPlanAll => "Sprint-PlanAll",
            InsightBatch::SprintPlanSteps => "Sprint-PlanSteps",
            InsightBatch::SprintTaskPriority => "Sprint-TaskPriority",
            InsightBatch::SprintLeads => "Sprint-Leads",
            InsightBatch::DailyBriefAll => "Daily-BriefAll",
            InsightBatch::DailySummaryAndQuestions => "Daily-SummaryAndQuestions",
            InsightBatch::DailyBottlenecksAndQueries => "Daily-BottlenecksAndQueries",
            InsightBatch::DailyIssueUpdates => "Daily-IssueUpdates24Hours3Days",
            InsightBatch::DailyIdleIssues => "Daily-IdleIssues3Days7Days",
            InsightBatch::ReviewAll => "Review-All",
            InsightBatch::ReviewAchievements => "Review-SummaryAndAchievements",
            InsightBatch::ReviewFailures => "Review-SummaryAndFailures",
            InsightBatch::ReviewTeamPerformance => "Review-TeamPerformance",
            InsightBatch::ReviewBottleneckIssues => "Review-BottleneckIssues",
        }
    }

    /// Insight types enqueued by this batch, in enqueue order.
    pub fn members(&self) -> &'static [InsightType] {
        use InsightType::*;
        match self {
            InsightBatch::SprintPlanAll => &[SprintPlanSteps, SprintTaskPriority, SprintLeads],
            InsightBatch::SprintPlanSteps => &[SprintPlanSteps],
            InsightBatch::SprintTaskPriority => &[SprintTaskPriority],
            InsightBatch::SprintLeads => &[SprintLeads],
            InsightBatch::DailyBriefAll => &[
                DailySummary,
                DailyQuestionsToAsk,
                DailyBottlenecks,
                DailyQueriesToSolve,
                Daily24HoursIssueUpdated,
                Daily3DaysIssueUpdated,
                Daily3DaysIdleIssues,
                Daily7DaysIdleIssues,
            ],
            InsightBatch::DailySummaryAndQuestions => &[DailySummary, DailyQuestionsToAsk],
            InsightBatch::DailyBottlenecksAndQueries => &[DailyBottlenecks, DailyQueriesToSolve],
            InsightBatch::DailyIssueUpdates => &[Daily24HoursIssueUpdated, Daily3DaysIssueUpdated],
            InsightBatch::DailyIdleIssues => &[Daily3DaysIdleIssues, Daily7DaysIdleIssues],
            InsightBatch::ReviewAll => &[
                ReviewAchievementsSummary,
                ReviewKeyAchievements,
                ReviewFailureSummary,
                ReviewKeyFailures,
                ReviewTopPerformers,
                ReviewLaggards,
                ReviewBottleneckIssues,
            ],
            InsightBatch::ReviewAchievements => &[ReviewAchievementsSummary, ReviewKeyAchievements],
            InsightBatch::ReviewFailures => &[ReviewFailureSummary, ReviewKeyFailures],
            InsightBatch::ReviewTeamPerformance => &[ReviewTopPerformers, ReviewLaggards],
            InsightBatch::ReviewBottleneckIssues => &[ReviewBottleneckIssues],
        }
    }
}

impl fmt::Display for InsightBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InsightBatch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        InsightBatch::ALL
            .iter()
            .copied()
            .find(|b| b.name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown batch: {}", s)))
    }
}

//! Prompt templates for every insight type.
//!
//! Each prompt embeds the JSON-serialized [`AiPromptContext`] followed by a
//! category framing line and a task-specific instruction. Building a prompt
//! is pure: the same context always yields the same text.

use insight_core::{AiPromptContext, InsightCategory, InsightType, Result};

const BACKLOG_LINE: &str =
    "These issues represent backlog tasks/issues of SCRUM based project management.";

const SPRINT_FRAMING: &str = "We need to plan SPRINT out of it.";

const MEETING_FRAMING: &str = "We need to prepare a daily SPRINT meeting out of it.";

const SPRINT_PLAN_STEPS: &str = "Create a step by step plan of action with following instructions:
- Give a relevant title to each step
- Club similar or logical issues together
- Name team members who have relevant skills to work each step's issues.
- Estimate a time to finish for all issues of this step.
Based on above instructions, please prepare a plan for the sprint each in a smaller paragraphs or bullet points";

fn instruction(insight: InsightType) -> &'static str {
    match insight {
        InsightType::SprintPlanSteps => SPRINT_PLAN_STEPS,
        InsightType::SprintTaskPriority => {
            "Arrange issues in priority order and provide a logically arranged list."
        }
        InsightType::SprintLeads => "Which team members can be the lead here based on skill sets?",
        InsightType::DailySummary => "Write a brief summary of recent updates, comments and issues.",
        InsightType::DailyQuestionsToAsk => {
            "Prepare a list of questions that I need to ask in today's meeting based on recent issue updates and comments."
        }
        InsightType::DailyBottlenecks => {
            "Prepare a list of bottlenecks or concerns that needs to be resolved based on recent issue updates and comments."
        }
        InsightType::DailyQueriesToSolve => {
            "Prepare a list of queries that I need to address from my side based on recent issue updates, comments and concerns."
        }
        InsightType::Daily24HoursIssueUpdated => {
            "Prepare a list of issues that were updated in last 24 hours."
        }
        InsightType::Daily3DaysIssueUpdated => {
            "Prepare a list of issues that were updated in last 3 days."
        }
        InsightType::Daily3DaysIdleIssues => {
            "Prepare a list of issues that are idle and has no updates since last 3 days."
        }
        InsightType::Daily7DaysIdleIssues => {
            "Prepare a list of issues that are idle and has no updates since last 7 days."
        }
        InsightType::ReviewAchievementsSummary => {
            "Write a brief summary of achievements in this sprint based on recent updates, comments and progress."
        }
        InsightType::ReviewKeyAchievements => {
            "Prepare a list of achievements in this sprint based on recent updates, comments and progress."
        }
        InsightType::ReviewFailureSummary => {
            "Write a brief summary of failures in this sprint based on recent updates, comments and progress."
        }
        InsightType::ReviewKeyFailures => {
            "Prepare a list of failures in this sprint based on recent updates, comments and progress."
        }
        InsightType::ReviewTopPerformers => {
            "Prepare a list of team members who performed really well in this sprint based on recent updates, comments and progress."
        }
        InsightType::ReviewLaggards => {
            "Prepare a list of team members who performed poorly in this sprint based on recent updates, comments and progress."
        }
        InsightType::ReviewBottleneckIssues => {
            "Prepare a list of concerns and bottlenecks that needs to be improved in this sprint based on recent updates, comments and progress."
        }
    }
}

fn framing(category: InsightCategory) -> &'static str {
    match category {
        InsightCategory::SprintPlanning => SPRINT_FRAMING,
        // Review prompts share the meeting framing
        InsightCategory::DailyBrief | InsightCategory::Review => MEETING_FRAMING,
    }
}

fn preamble(ctx: &AiPromptContext) -> Result<String> {
    let json = serde_json::to_string(ctx)?;
    Ok(format!(
        "Here is json containing list of issues and team member skills: {}.\n{}",
        json, BACKLOG_LINE
    ))
}

/// Build the prompt for one insight type.
pub fn build_prompt(insight: InsightType, ctx: &AiPromptContext) -> Result<String> {
    Ok(format!(
        "{} {}\n{}",
        preamble(ctx)?,
        framing(insight.category()),
        instruction(insight)
    ))
}

/// Build the prompt for an ad-hoc question about the same context.
pub fn build_ask_prompt(ctx: &AiPromptContext, question: &str) -> Result<String> {
    Ok(format!(
        "{}\nBased on above data, answer this question: {}",
        preamble(ctx)?,
        question
    ))
}

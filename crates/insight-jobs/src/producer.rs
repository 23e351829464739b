//! Insight producer: builds prompt context and queues generation jobs.
//!
//! The producer never waits for generation. Callers enqueue a batch, then
//! poll [`InsightProducer::refresh`] to see whichever fields have arrived.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use insight_core::{
    AiPromptContext, AppSettings, InsightBatch, InsightDataset, InsightType, IssueSource, Job,
    JobHandle, JobPayload, JobQueue, JobTarget, ReadinessWarning, Result, SkillEntry, TeamMember,
    ASK_JOB_TAG,
};
use insight_inference::{build_ask_prompt, build_prompt};
use insight_store::Storage;

/// Front door for every user-facing insight action.
#[derive(Clone)]
pub struct InsightProducer {
    queue: Arc<dyn JobQueue>,
    storage: Storage,
    issues: Arc<dyn IssueSource>,
}

impl InsightProducer {
    pub fn new(queue: Arc<dyn JobQueue>, storage: Storage, issues: Arc<dyn IssueSource>) -> Self {
        Self {
            queue,
            storage,
            issues,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Current project issues plus the persisted skill list.
    pub async fn build_context(&self, project: &str) -> Result<AiPromptContext> {
        let raw = self.issues.project_issues(project).await?;
        let issues = raw.iter().map(|issue| issue.simplify()).collect::<Vec<_>>();
        let member_skills = self.storage.skills.list().await?;

        debug!(
            subsystem = "jobs",
            component = "producer",
            project,
            issue_count = issues.len(),
            skill_count = member_skills.len(),
            "Built prompt context"
        );

        Ok(AiPromptContext {
            issues,
            member_skills,
        })
    }

    /// Queue one job per member of `batch`, all sharing a single context.
    pub async fn run_batch(&self, project: &str, batch: InsightBatch) -> Result<Vec<JobHandle>> {
        let ctx = self.build_context(project).await?;
        let mut handles = Vec::with_capacity(batch.members().len());

        for insight in batch.members() {
            handles.push(self.enqueue_insight(*insight, &ctx).await?);
        }

        info!(
            subsystem = "jobs",
            component = "producer",
            op = "run_batch",
            project,
            batch = %batch,
            job_count = handles.len(),
            "Queued insight batch"
        );
        Ok(handles)
    }

    /// Queue a single insight outside any named batch.
    pub async fn generate(&self, project: &str, insight: InsightType) -> Result<JobHandle> {
        let ctx = self.build_context(project).await?;
        self.enqueue_insight(insight, &ctx).await
    }

    async fn enqueue_insight(&self, insight: InsightType, ctx: &AiPromptContext) -> Result<JobHandle> {
        let prompt = build_prompt(insight, ctx)?;
        let tag = JobTarget::Insight(insight).tag();
        let handle = self.queue.enqueue(tag, JobPayload::new(prompt)).await?;
        debug!(job_id = %handle.id, job_type = tag, insight = %insight, "Queued insight job");
        Ok(handle)
    }

    /// Clear the previous answer and queue a free-form question.
    pub async fn ask(&self, project: &str, question: &str) -> Result<JobHandle> {
        self.storage.ask.clear().await?;
        let ctx = self.build_context(project).await?;
        let prompt = build_ask_prompt(&ctx, question)?;
        let handle = self.queue.enqueue(ASK_JOB_TAG, JobPayload::new(prompt)).await?;

        info!(
            subsystem = "jobs",
            component = "producer",
            op = "ask",
            project,
            job_id = %handle.id,
            "Queued question"
        );
        Ok(handle)
    }

    /// Re-read the dataset. Fields still empty have not been generated yet.
    pub async fn refresh(&self) -> Result<InsightDataset> {
        self.storage.insights.get().await
    }

    pub async fn ask_response(&self) -> Result<Option<String>> {
        self.storage.ask.get().await
    }

    pub async fn settings(&self) -> Result<AppSettings> {
        self.storage.settings.get().await
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        self.storage.settings.save(settings).await
    }

    pub async fn skills(&self) -> Result<Vec<SkillEntry>> {
        self.storage.skills.list().await
    }

    pub async fn add_skill(&self, entry: SkillEntry) -> Result<usize> {
        self.storage.skills.append(entry).await
    }

    pub async fn remove_skill(&self, index: usize) -> Result<SkillEntry> {
        self.storage.skills.remove(index).await
    }

    /// Active human accounts, for the skill mapping form.
    pub async fn team_members(&self) -> Result<Vec<TeamMember>> {
        let users = self.issues.users().await?;
        Ok(users
            .into_iter()
            .filter(|u| u.is_team_member())
            .map(TeamMember::from)
            .collect())
    }

    /// Configuration gaps that make generated insights unhelpful.
    pub async fn readiness(&self) -> Result<Vec<ReadinessWarning>> {
        let mut warnings = Vec::new();
        if !self.storage.settings.get().await?.is_configured() {
            warnings.push(ReadinessWarning::SettingsMissing);
        }
        if self.storage.skills.list().await?.is_empty() {
            warnings.push(ReadinessWarning::SkillsMissing);
        }
        Ok(warnings)
    }

    pub async fn job(&self, id: Uuid) -> Result<Option<Job>> {
        self.queue.get(id).await
    }
}

//! Team skill list repository.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use insight_core::defaults::KEY_TEAM_SKILLS;
use insight_core::{Error, KeyValueStore, Result, SkillEntry};

/// Ordered list of [`SkillEntry`] values.
#[derive(Clone)]
pub struct TeamSkillRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl TeamSkillRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub async fn list(&self) -> Result<Vec<SkillEntry>> {
        match self.kv.get(KEY_TEAM_SKILLS).await? {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Validate and append an entry. Returns the new list length.
    pub async fn append(&self, entry: SkillEntry) -> Result<usize> {
        entry.validate()?;
        let mut skills = self.list().await?;
        debug!(
            subsystem = "store",
            component = "skills",
            op = "append",
            member = %entry.member_name,
            skill = %entry.skill,
            "Adding team skill"
        );
        skills.push(entry);
        self.write(&skills).await?;
        Ok(skills.len())
    }

    /// Remove the entry at `index`, returning it.
    pub async fn remove(&self, index: usize) -> Result<SkillEntry> {
        let mut skills = self.list().await?;
        if index >= skills.len() {
            return Err(Error::NotFound(format!("Skill entry {}", index)));
        }
        let removed = skills.remove(index);
        self.write(&skills).await?;
        Ok(removed)
    }

    async fn write(&self, skills: &[SkillEntry]) -> Result<()> {
        self.kv
            .set(KEY_TEAM_SKILLS, serde_json::to_value(skills)?)
            .await
    }
}

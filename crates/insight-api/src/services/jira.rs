//! Jira Cloud REST client implementing [`IssueSource`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use insight_core::defaults::ISSUE_SOURCE_TIMEOUT_SECS;
use insight_core::{Error, IssueSource, RawIssue, RawUser, Result};

/// Connection settings for a Jira site.
#[derive(Clone)]
pub struct JiraConfig {
    /// Site URL, e.g. `https://team.atlassian.net`.
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl JiraConfig {
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            email: email.into(),
            api_token: api_token.into(),
            timeout_seconds: ISSUE_SOURCE_TIMEOUT_SECS,
        }
    }

    /// `None` unless `JIRA_BASE_URL`, `JIRA_EMAIL` and `JIRA_API_TOKEN` are all set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let config = Self::new(var("JIRA_BASE_URL")?, var("JIRA_EMAIL")?, var("JIRA_API_TOKEN")?);
        Some(config)
    }

    pub fn with_timeout_seconds(mut self, secs: u64) -> Self {
        self.timeout_seconds = secs;
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

pub struct JiraIssueSource {
    client: Client,
    config: JiraConfig,
}

impl JiraIssueSource {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!("Initializing Jira issue source: url={}", config.base_url);
        Ok(Self { client, config })
    }

    fn get(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        self.client
            .get(url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header("Accept", "application/json")
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = req
            .send()
            .await
            .map_err(|e| Error::IssueSource(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::IssueSource(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::IssueSource(format!("Invalid response: {}", e)))
    }
}

#[async_trait]
impl IssueSource for JiraIssueSource {
    async fn project_issues(&self, project: &str) -> Result<Vec<RawIssue>> {
        let jql = project_jql(project);
        let response: SearchResponse = self
            .send_json(self.get("/rest/api/3/search").query(&[("jql", jql.as_str())]))
            .await?;

        debug!(
            subsystem = "api",
            component = "jira",
            project,
            issue_count = response.issues.len(),
            "Fetched project issues"
        );
        Ok(response.issues)
    }

    async fn users(&self) -> Result<Vec<RawUser>> {
        self.send_json(self.get("/rest/api/3/users")).await
    }
}

/// JQL matching every issue of `project`, quoted so the key cannot extend
/// the query.
fn project_jql(project: &str) -> String {
    let escaped = project.replace('\\', "\\\\").replace('"', "\\\"");
    format!("project = \"{}\"", escaped)
}

/// Placeholder used when no issue tracker is configured.
pub struct UnconfiguredIssueSource;

#[async_trait]
impl IssueSource for UnconfiguredIssueSource {
    async fn project_issues(&self, _project: &str) -> Result<Vec<RawIssue>> {
        Err(Error::IssueSource(
            "Issue tracker not configured: set JIRA_BASE_URL, JIRA_EMAIL and JIRA_API_TOKEN".into(),
        ))
    }

    async fn users(&self) -> Result<Vec<RawUser>> {
        self.project_issues("").await.map(|_| Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let config = JiraConfig::new("https://x.atlassian.net", "me@x.dev", "secret-token");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_project_jql_escapes_quotes() {
        assert_eq!(project_jql("PRJ"), r#"project = "PRJ""#);
        assert_eq!(
            project_jql(r#"A" OR project != "B"#),
            r#"project = "A\" OR project != \"B""#
        );
        assert_eq!(project_jql(r"A\"), r#"project = "A\\""#);
    }

    #[tokio::test]
    async fn test_quoted_project_stays_one_literal() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/search"))
            .and(query_param("jql", r#"project = "X\" OR key != \"Y""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"issues": []})))
            .expect(1)
            .mount(&server)
            .await;

        let source =
            JiraIssueSource::new(JiraConfig::new(server.uri(), "me@x.dev", "token")).unwrap();
        let issues = source.project_issues(r#"X" OR key != "Y"#).await.unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_source_errors() {
        let err = UnconfiguredIssueSource.project_issues("PRJ").await.unwrap_err();
        assert!(matches!(err, Error::IssueSource(_)));
        assert!(UnconfiguredIssueSource.users().await.is_err());
    }
}

//! External service clients.

pub mod jira;

pub use jira::{JiraConfig, JiraIssueSource, UnconfiguredIssueSource};

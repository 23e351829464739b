//! HTTP API tests over in-memory storage, a mock gateway, and a mocked Jira.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use insight_api::services::{JiraConfig, JiraIssueSource, UnconfiguredIssueSource};
use insight_api::{router, AppState};
use insight_core::{IssueSource, JobQueue};
use insight_inference::mock::MockGateway;
use insight_jobs::{InsightJobHandler, InsightProducer, WorkerBuilder, WorkerConfig, WorkerHandle};
use insight_store::{MemoryJobQueue, Storage};

struct TestApp {
    router: Router,
    queue: Arc<MemoryJobQueue>,
    worker: Option<WorkerHandle>,
}

async fn mock_jira() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/search"))
        .and(query_param("jql", "project = \"PRJ\""))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0,
            "total": 1,
            "issues": [{
                "key": "PRJ-1",
                "fields": {
                    "summary": "Add login page",
                    "description": {"type": "doc", "version": 1, "content": [
                        {"type": "paragraph", "content": [{"type": "text", "text": "Hello"}, {"type": "text", "text": "World"}]},
                        {"type": "paragraph", "content": [{"type": "text", "text": "Again"}]}
                    ]}
                }
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/search"))
        .and(query_param("jql", "project = \"NOPE\""))
        .respond_with(ResponseTemplate::new(400).set_body_string("project does not exist"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"accountId": "1", "displayName": "Ana", "accountType": "atlassian", "active": true},
            {"accountId": "2", "displayName": "Jira Bot", "accountType": "app", "active": true},
            {"accountId": "3", "displayName": "Gone", "accountType": "atlassian", "active": false}
        ])))
        .mount(&server)
        .await;

    server
}

async fn spawn_app(issues: Arc<dyn IssueSource>, gateway: MockGateway, run_worker: bool) -> TestApp {
    let storage = Storage::memory();
    let queue = Arc::new(MemoryJobQueue::new());

    let worker = if run_worker {
        Some(
            WorkerBuilder::new(queue.clone())
                .with_config(WorkerConfig::default().with_poll_interval(20))
                .with_handler(InsightJobHandler::new(storage.clone(), Arc::new(gateway)))
                .build()
                .await
                .start(),
        )
    } else {
        None
    };

    let producer = InsightProducer::new(queue.clone(), storage, issues);
    TestApp {
        router: router(AppState::new(producer)),
        queue,
        worker,
    }
}

async fn jira_app(gateway: MockGateway, run_worker: bool) -> (TestApp, MockServer) {
    let server = mock_jira().await;
    let source = JiraIssueSource::new(JiraConfig::new(server.uri(), "pm@team.dev", "token")).unwrap();
    (spawn_app(Arc::new(source), gateway, run_worker).await, server)
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn wait_until_drained(app: &TestApp) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let jobs = app.queue.jobs().await;
            if jobs.iter().all(|j| j.status.is_terminal()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("jobs did not finish");
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_insights_start_empty() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;
    let (status, body) = send(&app, "GET", "/api/v1/insights", None).await;

    assert_eq!(status, StatusCode::OK);
    let fields = body.as_object().unwrap();
    assert_eq!(fields.len(), 18);
    assert!(fields.values().all(|v| v == ""));
}

#[tokio::test]
async fn test_list_batches() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;
    let (_, body) = send(&app, "GET", "/api/v1/batches", None).await;

    let batches = body.as_array().unwrap();
    assert_eq!(batches.len(), 14);
    let plan_all = batches
        .iter()
        .find(|b| b["name"] == "Sprint-PlanAll")
        .unwrap();
    assert_eq!(
        plan_all["members"],
        json!(["SprintPlanSteps", "SprintTaskPriority", "SprintLeads"])
    );
}

#[tokio::test]
async fn test_run_batch_returns_accepted_with_handles() {
    let (app, _jira) = jira_app(MockGateway::new(), false).await;

    let (status, body) = send(&app, "POST", "/api/v1/projects/PRJ/batches/Review-TeamPerformance", None).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["batch"], "Review-TeamPerformance");
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["job_type"], "callOpenAI-ReviewTeamPerformanceTop");
    assert_eq!(jobs[1]["job_type"], "callOpenAI-ReviewTeamPerformanceLags");
    assert_eq!(app.queue.pending_count().await.unwrap(), 2);

    // Nothing is generated until a worker runs.
    let id = jobs[0]["id"].as_str().unwrap();
    let (status, job) = send(&app, "GET", &format!("/api/v1/jobs/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "pending");

    let prompt = job["payload"]["prompt"].as_str().unwrap();
    assert!(prompt.contains(r#""description":"Hello WorldAgain""#));
}

#[tokio::test]
async fn test_unknown_batch_is_bad_request() {
    let (app, _jira) = jira_app(MockGateway::new(), false).await;
    let (status, body) = send(&app, "POST", "/api/v1/projects/PRJ/batches/Sprint-Everything", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Sprint-Everything"));
    assert_eq!(app.queue.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_issue_source_failure_is_bad_gateway() {
    let (app, _jira) = jira_app(MockGateway::new(), false).await;
    let (status, body) = send(&app, "POST", "/api/v1/projects/NOPE/batches/Sprint-Leads", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("project does not exist"));
    assert_eq!(app.queue.pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unconfigured_issue_source_is_bad_gateway() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;
    let (status, _) = send(&app, "POST", "/api/v1/projects/PRJ/ask", Some(json!({"question": "why?"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_batch_is_generated_by_worker() {
    let gateway = MockGateway::new()
        .with_rule("step by step plan", Ok("1. Auth".to_string()))
        .with_rule("priority order", Ok("PRJ-1".to_string()))
        .with_rule("be the lead", Ok("Ana".to_string()));
    let (app, _jira) = jira_app(gateway, true).await;

    let (status, _) = send(&app, "POST", "/api/v1/projects/PRJ/batches/Sprint-PlanSteps", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_until_drained(&app).await;
    let (status, _) = send(&app, "POST", "/api/v1/projects/PRJ/insights/SprintLeads", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_until_drained(&app).await;

    let (_, body) = send(&app, "GET", "/api/v1/insights", None).await;
    assert_eq!(body["SprintPlanSteps"], "1. Auth");
    assert_eq!(body["SprintLeads"], "Ana");
    assert_eq!(body["SprintTaskPriority"], "");

    let (status, _) = send(&app, "DELETE", "/api/v1/insights", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", "/api/v1/insights", None).await;
    assert_eq!(body["SprintLeads"], "");

    app.worker.unwrap().shutdown_and_wait().await.unwrap();
}

#[tokio::test]
async fn test_ask_round_trip() {
    let (app, _jira) = jira_app(MockGateway::new().with_default_response("Ana"), true).await;

    let (status, body) = send(&app, "GET", "/api/v1/ask", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], Value::Null);

    let (status, job) = send(
        &app,
        "POST",
        "/api/v1/projects/PRJ/ask",
        Some(json!({"question": "Who owns PRJ-1?"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(job["job_type"], "callOpenAI-AskGPT");

    wait_until_drained(&app).await;
    let (_, body) = send(&app, "GET", "/api/v1/ask", None).await;
    assert_eq!(body["response"], "Ana");

    app.worker.unwrap().shutdown_and_wait().await.unwrap();
}

#[tokio::test]
async fn test_blank_question_is_rejected() {
    let (app, _jira) = jira_app(MockGateway::new(), false).await;
    let (status, _) = send(&app, "POST", "/api/v1/projects/PRJ/ask", Some(json!({"question": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_never_echo_key() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;

    let (_, body) = send(&app, "GET", "/api/v1/settings", None).await;
    assert_eq!(body["api_key_set"], false);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/settings",
        Some(json!({"APIKey": "sk-secret", "AIModel": "ChatGPT", "AIAnonymize": "No"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api_key_set"], true);
    assert!(!body.to_string().contains("sk-secret"));

    let (_, body) = send(&app, "GET", "/api/v1/settings", None).await;
    assert_eq!(body["AIModel"], "ChatGPT");
    assert_eq!(body["api_key_set"], true);
}

#[tokio::test]
async fn test_skill_mapping_and_readiness() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;

    let (_, body) = send(&app, "GET", "/api/v1/readiness", None).await;
    assert_eq!(body["ready"], false);
    assert_eq!(body["warnings"].as_array().unwrap().len(), 2);
    assert_eq!(body["warnings"][0]["code"], "settings_missing");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/skills",
        Some(json!({"member_name": "Ana", "skill": "Rust", "skill_level": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["count"], 1);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/skills",
        Some(json!({"member_name": "Ben", "skill": "SQL", "skill_level": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/v1/readiness", None).await;
    assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(body["warnings"][0]["code"], "settings_missing");

    let (_, skills) = send(&app, "GET", "/api/v1/skills", None).await;
    assert_eq!(skills.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", "/api/v1/skills/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, removed) = send(&app, "DELETE", "/api/v1/skills/0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["member_name"], "Ana");
}

#[tokio::test]
async fn test_team_members_are_active_humans() {
    let (app, _jira) = jira_app(MockGateway::new(), false).await;
    let (status, body) = send(&app, "GET", "/api/v1/team-members", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"account_id": "1", "display_name": "Ana"}]));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = spawn_app(Arc::new(UnconfiguredIssueSource), MockGateway::new(), false).await;
    let (status, body) = send(
        &app,
        "GET",
        "/api/v1/jobs/0190b6a4-0000-7000-8000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

//! # insight-api
//!
//! HTTP surface for the sprint insight pipeline: queue insight batches and
//! questions, poll the stored results, and manage settings and team skills.

pub mod config;
pub mod error;
pub mod handlers;
pub mod services;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use insight_jobs::InsightProducer;

use handlers::{insights, jobs, team};

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    pub producer: InsightProducer,
}

impl AppState {
    pub fn new(producer: InsightProducer) -> Self {
        Self { producer }
    }
}

/// All routes, without CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(jobs::health_check))
        // Insights
        .route(
            "/api/v1/insights",
            get(insights::get_insights).delete(insights::reset_insights),
        )
        .route("/api/v1/batches", get(insights::list_batches))
        .route(
            "/api/v1/projects/:project/batches/:batch",
            post(insights::run_batch),
        )
        .route(
            "/api/v1/projects/:project/insights/:insight",
            post(insights::generate_insight),
        )
        .route("/api/v1/projects/:project/ask", post(insights::ask))
        .route("/api/v1/ask", get(insights::get_ask_response))
        // Team configuration
        .route(
            "/api/v1/settings",
            get(team::get_settings).put(team::save_settings),
        )
        .route("/api/v1/skills", get(team::list_skills).post(team::add_skill))
        .route("/api/v1/skills/:index", delete(team::remove_skill))
        .route("/api/v1/team-members", get(team::team_members))
        .route("/api/v1/readiness", get(team::readiness))
        // Jobs
        .route("/api/v1/jobs/:id", get(jobs::get_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

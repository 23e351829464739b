//! Insight generation and ad-hoc question endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use insight_core::{InsightBatch, InsightType, JobHandle};

use crate::error::ApiError;
use crate::AppState;

pub async fn get_insights(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.producer.refresh().await?))
}

#[derive(Debug, Serialize)]
pub struct BatchInfo {
    pub name: &'static str,
    pub members: Vec<&'static str>,
}

pub async fn list_batches() -> impl IntoResponse {
    let batches: Vec<BatchInfo> = InsightBatch::ALL
        .iter()
        .map(|b| BatchInfo {
            name: b.name(),
            members: b.members().iter().map(InsightType::as_str).collect(),
        })
        .collect();
    Json(batches)
}

#[derive(Debug, Serialize)]
pub struct BatchQueued {
    pub batch: InsightBatch,
    pub jobs: Vec<JobHandle>,
}

pub async fn run_batch(
    State(state): State<AppState>,
    Path((project, batch)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let batch: InsightBatch = batch.parse()?;
    let jobs = state.producer.run_batch(&project, batch).await?;
    Ok((StatusCode::ACCEPTED, Json(BatchQueued { batch, jobs })))
}

pub async fn generate_insight(
    State(state): State<AppState>,
    Path((project, insight)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let insight: InsightType = insight.parse()?;
    let job = state.producer.generate(&project, insight).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

pub async fn reset_insights(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.producer.storage().insights.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

pub async fn ask(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question is required".to_string()));
    }
    let job = state.producer.ask(&project, question).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[derive(Debug, Serialize)]
pub struct AskResponseBody {
    /// `null` until the answer arrives.
    pub response: Option<String>,
}

pub async fn get_ask_response(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(AskResponseBody {
        response: state.producer.ask_response().await?,
    }))
}

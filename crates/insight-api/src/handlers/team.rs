//! Settings, skill mapping, and readiness endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use insight_core::{AppSettings, ReadinessWarning, SkillEntry};

use crate::error::ApiError;
use crate::AppState;

/// Settings as returned to clients. The key itself is never echoed.
#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub api_key_set: bool,
    #[serde(rename = "AIModel")]
    pub ai_model: Option<String>,
    #[serde(rename = "AIAnonymize")]
    pub ai_anonymize: Option<String>,
}

impl From<AppSettings> for SettingsView {
    fn from(settings: AppSettings) -> Self {
        Self {
            api_key_set: settings.api_key.as_deref().is_some_and(|k| !k.is_empty()),
            ai_model: settings.ai_model,
            ai_anonymize: settings.ai_anonymize,
        }
    }
}

pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(SettingsView::from(state.producer.settings().await?)))
}

pub async fn save_settings(
    State(state): State<AppState>,
    Json(settings): Json<AppSettings>,
) -> Result<impl IntoResponse, ApiError> {
    state.producer.save_settings(&settings).await?;
    Ok(Json(SettingsView::from(settings)))
}

pub async fn list_skills(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.producer.skills().await?))
}

pub async fn add_skill(
    State(state): State<AppState>,
    Json(entry): Json<SkillEntry>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.producer.add_skill(entry).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "count": count }))))
}

pub async fn remove_skill(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.producer.remove_skill(index).await?))
}

pub async fn team_members(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.producer.team_members().await?))
}

#[derive(Debug, Serialize)]
pub struct WarningView {
    pub code: ReadinessWarning,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadinessView {
    pub ready: bool,
    pub warnings: Vec<WarningView>,
}

pub async fn readiness(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let warnings = state.producer.readiness().await?;
    Ok(Json(ReadinessView {
        ready: warnings.is_empty(),
        warnings: warnings
            .into_iter()
            .map(|code| WarningView {
                code,
                message: code.message(),
            })
            .collect(),
    }))
}

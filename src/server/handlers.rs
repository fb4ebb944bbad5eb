//! HTTP request handlers

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form, Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::error::ApiError;
use super::page::render_page;
use super::state::AppState;
use crate::dataset::{Dataset, DatasetPreview};
use crate::shell::{render, FormState, View};

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

fn session_path(id: Uuid) -> String {
    format!("/sessions/{}", id)
}

/// GET / - Start a new session and go to its page
pub async fn new_session(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    let session = state.create_session().await?;
    Ok(Redirect::to(&session_path(session.id)))
}

/// GET /sessions/{id} - Render the page from the stored widget values
pub async fn show_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let (dataset, form) = state.snapshot(id).await?;
    let view = render(dataset, &form, &state.shell_config())?;
    Ok(Html(render_page(id, &view)))
}

/// POST /sessions/{id} - Re-run the whole pipeline with new widget values
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>, ApiError> {
    let form = FormState::from_pairs(&pairs, state.config.edge_slots);
    tracing::debug!(session = %id, estimate = form.estimate, "form submitted");

    let dataset = state.update_form(id, form.clone()).await?;
    let view = render(dataset, &form, &state.shell_config())?;
    Ok(Html(render_page(id, &view)))
}

/// POST /sessions/{id}/dataset - Multipart CSV upload (field `file`)
pub async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await?;
            let dataset = Dataset::from_bytes(&bytes)?;
            state.load_dataset(id, dataset).await?;
            return Ok(Redirect::to(&session_path(id)));
        }
    }

    Err(ApiError::InvalidParameter(
        "Missing 'file' field in upload".to_string(),
    ))
}

/// DELETE /sessions/{id} - End a session
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.end_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub created_at: String,
    pub edge_slots: usize,
}

/// POST /api/sessions - Create a session
pub async fn api_create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let session = state.create_session().await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: session.id,
            created_at: session.created_at.to_rfc3339(),
            edge_slots: state.config.edge_slots,
        }),
    ))
}

/// PUT /api/sessions/{id}/dataset - Raw CSV body
pub async fn api_put_dataset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<DatasetPreview>, ApiError> {
    let dataset = Dataset::from_bytes(&body)?;
    let dataset = state.load_dataset(id, dataset).await?;
    Ok(Json(dataset.preview(state.config.preview_rows)))
}

/// POST /api/sessions/{id}/view - Evaluate a JSON form
pub async fn api_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(mut form): Json<FormState>,
) -> Result<Json<View>, ApiError> {
    form.edges.truncate(state.config.edge_slots);
    let dataset = state.update_form(id, form.clone()).await?;
    let view = render(dataset, &form, &state.shell_config())?;
    Ok(Json(view))
}

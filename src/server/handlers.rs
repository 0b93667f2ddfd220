// HTTP handlers - thin adapters from requests onto ChatApp

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::types::*;
use crate::app::{AppError, ChatApp, SessionSnapshot};
use crate::errors::FeedbackError;

pub fn create_router(app: Arc<ChatApp>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/sessions", post(open_session))
        .route("/v1/sessions/:id", get(get_session).delete(delete_session))
        .route("/v1/sessions/:id/query", post(submit_query))
        .route("/v1/sessions/:id/feedback", post(submit_feedback))
        .with_state(app)
}

pub async fn health_check(State(app): State<Arc<ChatApp>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "sessions": app.sessions().active_count(),
        "model_loaded": app.loader().is_loaded().await,
    }))
}

async fn open_session(
    State(app): State<Arc<ChatApp>>,
    body: Option<Json<OpenSessionRequest>>,
) -> Result<Json<OpenSessionResponse>, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let session = app.open_session(request.session_id.as_deref())?;
    Ok(Json(OpenSessionResponse {
        session_id: session.id().to_string(),
        feedback_options: app.feedback_options(),
    }))
}

async fn get_session(
    State(app): State<Arc<ChatApp>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = app.session(&id)?;
    Ok(Json(app.snapshot(&session).await))
}

async fn delete_session(State(app): State<Arc<ChatApp>>, Path(id): Path<String>) -> StatusCode {
    if app.sessions().delete(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn submit_query(
    State(app): State<Arc<ChatApp>>,
    Path(id): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let session = app.session(&id)?;
    // Every interaction re-runs the page; the publisher must still start only once
    app.ensure_publisher(&session);

    let reply = app.submit(&session, &request.query).await?;
    Ok(Json(QueryResponse {
        answer: reply.answer,
        notices: reply.notices,
    }))
}

async fn submit_feedback(
    State(app): State<Arc<ChatApp>>,
    Path(id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let session = app.session(&id)?;
    let reply = app.feedback(&session, request.into_action()).await?;
    Ok(Json(FeedbackResponse {
        state: reply.state,
        message: reply.message,
    }))
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::EmptyQuery => StatusCode::BAD_REQUEST,
            AppError::Generation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Feedback(FeedbackError::EmptySuggestion) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Feedback(FeedbackError::SuggestionDisabled) => StatusCode::BAD_REQUEST,
            AppError::Feedback(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::debug!("Request failed with {}: {}", status, self);
        }
        let notices = match &self {
            AppError::Generation { notices } => notices.clone(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            error: self.to_string(),
            notices,
        };
        (status, Json(body)).into_response()
    }
}

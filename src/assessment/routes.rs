//! REST endpoints that let a browser client drive the session.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::error::SessionError;

use super::controller::{SessionController, SessionSnapshot};
use super::model::PatientProfile;
use super::notify::{Notifier, RecordingNotifier};

/// Shared state for assessment routes.
#[derive(Clone)]
pub struct AssessmentRouteState {
    pub controller: Arc<SessionController>,
    /// Must be the notifier the controller was built with.
    pub notifications: Arc<RecordingNotifier>,
    pub model: String,
}

#[derive(Serialize)]
struct SessionResponse {
    #[serde(flatten)]
    session: SessionSnapshot,
    notifications: Vec<String>,
}

#[derive(Deserialize)]
struct TurnRequest {
    text: String,
}

/// A session error rendered as `{"error": ..., "notifications": [...]}`.
struct ApiError {
    status: StatusCode,
    message: String,
    notifications: Vec<String>,
}

impl ApiError {
    fn from_session(state: &AssessmentRouteState, err: SessionError) -> Self {
        Self {
            status: status_for(&err),
            message: err.to_string(),
            notifications: state.notifications.drain(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": self.message,
                "notifications": self.notifications,
            })),
        )
            .into_response()
    }
}

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::InvalidProfile(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::EmptyTurn => StatusCode::BAD_REQUEST,
        SessionError::RemoteUnavailable(_) | SessionError::MalformedReport { .. } => {
            StatusCode::BAD_GATEWAY
        }
        SessionError::InvalidTransition { .. }
        | SessionError::WrongStage { .. }
        | SessionError::TurnInFlight
        | SessionError::InterviewComplete
        | SessionError::InterviewAlreadyStarted
        | SessionError::SessionReset => StatusCode::CONFLICT,
    }
}

async fn session_response(state: &AssessmentRouteState) -> Json<SessionResponse> {
    Json(SessionResponse {
        session: state.controller.snapshot().await,
        notifications: state.notifications.drain(),
    })
}

type ApiResult = Result<Json<SessionResponse>, ApiError>;

/// GET /api/session
async fn get_session(State(state): State<AssessmentRouteState>) -> Json<SessionResponse> {
    session_response(&state).await
}

/// POST /api/intake
///
/// Stores the profile and moves to INTERVIEW. Fetches the warm-up greeting
/// too when that is enabled; a failed warm-up does not fail the intake and
/// reaches the client as a notification.
async fn post_intake(
    State(state): State<AssessmentRouteState>,
    Json(profile): Json<PatientProfile>,
) -> ApiResult {
    state
        .controller
        .submit_intake(profile)
        .await
        .map_err(|e| ApiError::from_session(&state, e))?;
    if state.controller.config().warm_up {
        if let Err(e) = state.controller.start_interview().await {
            warn!(error = %e, "Warm-up greeting unavailable");
            // Remote failures have already notified and reset the session; a
            // reset while the warm-up was in flight leaves nothing to report.
            if !e.is_remote_failure() && !matches!(e, SessionError::SessionReset) {
                state
                    .notifications
                    .notify(&format!("Greeting unavailable: {e}"));
            }
        }
    }
    Ok(session_response(&state).await)
}

/// POST /api/interview/start
async fn post_start(State(state): State<AssessmentRouteState>) -> ApiResult {
    state
        .controller
        .start_interview()
        .await
        .map_err(|e| ApiError::from_session(&state, e))?;
    Ok(session_response(&state).await)
}

/// POST /api/interview/turn
async fn post_turn(
    State(state): State<AssessmentRouteState>,
    Json(turn): Json<TurnRequest>,
) -> ApiResult {
    state
        .controller
        .send_turn(&turn.text)
        .await
        .map_err(|e| ApiError::from_session(&state, e))?;
    Ok(session_response(&state).await)
}

/// POST /api/interview/complete
async fn post_complete(State(state): State<AssessmentRouteState>) -> ApiResult {
    state
        .controller
        .complete_interview()
        .await
        .map_err(|e| ApiError::from_session(&state, e))?;
    Ok(session_response(&state).await)
}

/// POST /api/reset
async fn post_reset(State(state): State<AssessmentRouteState>) -> Json<SessionResponse> {
    state.controller.reset().await;
    session_response(&state).await
}

/// GET /api/health
async fn get_health(State(state): State<AssessmentRouteState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.model,
        "stage": state.controller.stage().await,
    }))
}

/// Build the assessment REST routes.
pub fn assessment_routes(state: AssessmentRouteState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/intake", post(post_intake))
        .route("/api/interview/start", post(post_start))
        .route("/api/interview/turn", post(post_turn))
        .route("/api/interview/complete", post(post_complete))
        .route("/api/reset", post(post_reset))
        .route("/api/health", get(get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

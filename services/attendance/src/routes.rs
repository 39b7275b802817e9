//! HTTP surface for the attendance engine

use crate::coordinator::{ManualRecordOutcome, SubmitOutcome};
use crate::error::{ApiError, ApiResult};
use crate::models::{DisplayLocator, EventCategory, NewSession, Session};
use crate::state::AppState;
use crate::verification::VerifiedUpsert;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/sign-ins", post(submit_sign_in))
        .route("/sessions/:id/records", post(record_manual))
        .route("/members/:user_id/history", get(member_history))
        .route("/verification/tokens", post(issue_state_token))
        .route("/verification/complete", post(complete_verification))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "attendance-engine"
    }))
}

/// Session creation request
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub category: EventCategory,
    pub code: String,
    pub duration_minutes: i64,
    pub created_by: String,
    pub channel_id: String,
    pub message_id: String,
}

/// Session readback response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub category: EventCategory,
    pub code: String,
    pub created_by: String,
    pub channel_id: String,
    pub message_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub total_sign_ins: i64,
}

fn session_response(session: Session, total_sign_ins: i64) -> SessionResponse {
    SessionResponse {
        id: session.id,
        category: session.category,
        code: session.code,
        created_by: session.created_by,
        channel_id: session.locator.channel_id,
        message_id: session.locator.message_id,
        created_at: session.created_at,
        expires_at: session.expires_at,
        total_sign_ins,
    }
}

/// Create a new attendance session and arm its closure timer
pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_session = NewSession::new(
        payload.category,
        payload.code,
        payload.duration_minutes,
        payload.created_by,
        DisplayLocator {
            channel_id: payload.channel_id,
            message_id: payload.message_id,
        },
        state.clock.now(),
    )?;

    let session = state
        .repository
        .create_session(new_session)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create session: {}", e);
            ApiError::InternalServerError
        })?;

    state.scheduler.schedule_close(&session).await;

    Ok((StatusCode::CREATED, Json(session_response(session, 0))))
}

/// Get a session by ID
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .repository
        .get_session(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get session: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("Session not found".to_string()))?;

    let total = state.repository.count_sign_ins(id).await.map_err(|e| {
        tracing::error!("Failed to count sign-ins: {}", e);
        ApiError::InternalServerError
    })?;

    Ok(Json(session_response(session, total)))
}

/// Sign-in submission request
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub user_id: String,
    pub display_name: String,
    pub code: String,
}

/// Submit a sign-in for a session
pub async fn submit_sign_in(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = state
        .coordinator
        .submit(id, &payload.user_id, &payload.display_name, &payload.code)
        .await
        .map_err(|e| {
            tracing::error!("Sign-in submission failed: {}", e);
            ApiError::InternalServerError
        })?;

    let response = match outcome {
        SubmitOutcome::Success { total, history } => (
            StatusCode::OK,
            Json(json!({
                "message": "Signed in successfully.",
                "total": total,
                "history": history,
            })),
        ),
        SubmitOutcome::SessionNotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "This attendance session no longer exists." })),
        ),
        SubmitOutcome::SessionExpired => (
            StatusCode::GONE,
            Json(json!({ "error": "This attendance session has expired." })),
        ),
        SubmitOutcome::VerificationRequired => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "You must verify your membership before signing in." })),
        ),
        SubmitOutcome::InvalidCode => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Incorrect attendance code. Please try again." })),
        ),
        SubmitOutcome::AlreadySignedIn => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "You have already signed in for this event." })),
        ),
    };

    Ok(response)
}

/// Operator-recorded sign-in request
#[derive(Debug, Deserialize)]
pub struct ManualRecordRequest {
    pub user_id: String,
    pub display_name: String,
}

/// Record a sign-in on a member's behalf
pub async fn record_manual(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ManualRecordRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = state
        .coordinator
        .record_manual(id, &payload.user_id, &payload.display_name)
        .await
        .map_err(|e| {
            tracing::error!("Manual sign-in record failed: {}", e);
            ApiError::InternalServerError
        })?;

    let response = match outcome {
        ManualRecordOutcome::Recorded { total } => (
            StatusCode::OK,
            Json(json!({
                "message": "Attendance recorded.",
                "total": total,
            })),
        ),
        ManualRecordOutcome::SessionNotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "This attendance session no longer exists." })),
        ),
        ManualRecordOutcome::AlreadySignedIn => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "This member has already signed in for this event." })),
        ),
    };

    Ok(response)
}

/// Get a member's per-category attendance history
pub async fn member_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let history = state
        .repository
        .attendance_history(&user_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load attendance history: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(json!({
        "user_id": user_id,
        "history": history,
    })))
}

/// State token issue request
#[derive(Debug, Deserialize)]
pub struct IssueTokenRequest {
    pub user_id: String,
}

/// Issue a single-use state token for a verification round-trip
pub async fn issue_state_token(
    State(state): State<AppState>,
    Json(payload): Json<IssueTokenRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let token = state.registry.issue(&payload.user_id).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "token": token,
            "expires_in_seconds": state.config.state_token_ttl_secs,
        })),
    ))
}

/// Verification completion request
#[derive(Debug, Deserialize)]
pub struct CompleteVerificationRequest {
    pub token: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// Complete a verification round-trip and link the member
pub async fn complete_verification(
    State(state): State<AppState>,
    Json(payload): Json<CompleteVerificationRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Some(user_id) = state.registry.consume(&payload.token).await else {
        return Ok((
            StatusCode::GONE,
            Json(json!({ "error": "This verification link is invalid or has expired." })),
        ));
    };

    let upsert = state
        .directory
        .mark_verified(
            &user_id,
            &payload.email,
            payload.full_name.as_deref(),
            state.clock.now(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to link verified member: {}", e);
            ApiError::InternalServerError
        })?;

    let response = match upsert {
        VerifiedUpsert::Linked => (
            StatusCode::OK,
            Json(json!({
                "message": "Verification complete.",
                "user_id": user_id,
            })),
        ),
        VerifiedUpsert::EmailTaken => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "This email is already linked to another member." })),
        ),
    };

    Ok(response)
}

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tower_sessions::Session;

use super::input::Input;
use super::validation::{Rule, Validator};
use super::{ApiError, ApiResponse, AppState};
use crate::domain::UserId;
use crate::services::UserInfo;

const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Handlers
// ============================================================================

/// POST /user/register
/// Create an account and start a session for it
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    input: Input,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let input = input.only(&["name", "email", "password"]);
    Validator::new(&input)
        .rule("name", vec![Rule::Required, Rule::Min(3), Rule::Max(50)])
        .rule("email", vec![Rule::Max(255)])
        .rule("password", vec![Rule::Required])
        .validate()?;

    let name = input.string("name").unwrap_or_default();
    let password = input.string("password").unwrap_or_default();
    let email = input.string("email");

    let user = state
        .auth_service()
        .register(&name, email.as_deref(), &password)
        .await?;

    start_session(&session, &user).await?;

    Ok(Json(ApiResponse::success(user)))
}

/// POST /user/login
/// Authenticate with name and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    input: Input,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let input = input.only(&["name", "password"]);
    Validator::new(&input)
        .rule("name", vec![Rule::Required])
        .rule("password", vec![Rule::Required])
        .validate()?;

    let name = input.string("name").unwrap_or_default();
    let password = input.string("password").unwrap_or_default();

    let user = state.auth_service().login(&name, &password).await?;

    start_session(&session, &user).await?;

    Ok(Json(ApiResponse::success(user)))
}

/// POST /user/logout
/// Invalidate the current session
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /user/me
/// Get the logged in user
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let id = current_user_id(&session)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    let user = state
        .auth_service()
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(user)))
}

// ============================================================================
// Helpers
// ============================================================================

/// The logged in user, if any. Session errors count as anonymous.
pub async fn current_user_id(session: &Session) -> Option<UserId> {
    match session.get::<UserId>(SESSION_USER_KEY).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read session");
            None
        }
    }
}

async fn start_session(session: &Session, user: &UserInfo) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    tracing::Span::current().record("user_id", user.id.value());
    Ok(())
}

//! Session middleware

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::header::AUTHORIZATION,
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::{AppState, AppError};

/// Session resolved from the bearer token
#[derive(Debug, Clone, Copy)]
pub struct SessionContext {
    pub session_id: Uuid,
}

/// Middleware: Require a known session id
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req)?;

    let session_id = Uuid::parse_str(&token).map_err(|_| AppError::Unauthorized)?;

    if !state.sessions.touch(session_id) {
        tracing::debug!("Unknown session {}", session_id);
        return Err(AppError::Unauthorized);
    }

    req.extensions_mut().insert(SessionContext { session_id });

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Result<String, AppError> {
    let auth_header = req.headers()
        .get(AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .ok_or(AppError::Unauthorized)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<SessionContext>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

//! Authentication handlers

use axum::{extract::State, Json};

use crate::{AppError, AppResult, AppState};
use crate::logic::navigation::{require_page, transition, Action, Page};
use crate::middleware::session::SessionContext;
use crate::models::{AuthResponse, LoginRequest, SignupRequest};

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.session(ctx.session_id)?;
    require_page(session.page, Page::Login)?;

    if !state.store.authenticate(&req.username, &req.password).await? {
        tracing::warn!("Failed login for '{}'", req.username);
        return Err(AppError::InvalidCredentials);
    }

    let page = state.commit(ctx.session_id, |session| {
        let page = transition(session.page, Action::LoginSucceeded)?;
        session.log_in(&req.username, req.remember);
        session.page = page;
        Ok(page)
    })?;

    tracing::info!("User '{}' logged in (session {})", req.username, ctx.session_id);

    Ok(Json(AuthResponse {
        page,
        message: format!("Welcome, {}", req.username),
        user: Some(req.username),
    }))
}

/// Create account endpoint
pub async fn signup(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<SignupRequest>,
) -> AppResult<Json<AuthResponse>> {
    let session = state.session(ctx.session_id)?;
    require_page(session.page, Page::Signup)?;

    if req.username.trim().is_empty() || req.password.trim().is_empty() {
        return Err(AppError::EmptyField);
    }
    if req.password != req.confirm_password {
        return Err(AppError::PasswordMismatch);
    }

    state.store.register(&req.username, &req.password).await?;

    let page = state.commit(ctx.session_id, |session| {
        session.page = transition(session.page, Action::SignupSucceeded)?;
        Ok(session.page)
    })?;

    tracing::info!("New account registered: {}", req.username);

    Ok(Json(AuthResponse {
        page,
        user: None,
        message: "Account created successfully! Please login.".to_string(),
    }))
}

/// Logout endpoint; counters and the trained model stay with the session
pub async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> AppResult<Json<AuthResponse>> {
    let (page, user) = state.commit(ctx.session_id, |session| {
        let page = transition(session.page, Action::Logout)?;
        let user = session.user.clone();
        session.log_out();
        session.page = page;
        Ok((page, user))
    })?;

    tracing::info!(
        "User '{}' logged out (session {})",
        user.as_deref().unwrap_or("-"), ctx.session_id
    );

    Ok(Json(AuthResponse {
        page,
        user: None,
        message: "Logged out".to_string(),
    }))
}

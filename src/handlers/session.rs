//! Session and navigation handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppResult, AppState};
use crate::logic::navigation::{transition, Action};
use crate::middleware::session::SessionContext;
use crate::models::View;

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub view: View,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub action: Action,
}

/// Start a session on the login page
pub async fn create(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session = state.sessions.create();
    tracing::debug!("Session created: {}", session.id);

    Json(CreateSessionResponse {
        session_id: session.id,
        view: View::render(&session, state.config.preview_rows),
    })
}

/// Render the current page
pub async fn view(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> AppResult<Json<View>> {
    let session = state.session(ctx.session_id)?;
    Ok(Json(View::render(&session, state.config.preview_rows)))
}

/// Plain page-to-page navigation; returns the new page's view
pub async fn navigate(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(req): Json<NavigateRequest>,
) -> AppResult<Json<View>> {
    if !req.action.is_navigation() {
        return Err(AppError::ValidationError(format!(
            "{:?} is not a navigation action",
            req.action
        )));
    }

    let preview_rows = state.config.preview_rows;
    let view = state.commit(ctx.session_id, |session| {
        session.page = transition(session.page, req.action)?;
        Ok(View::render(session, preview_rows))
    })?;

    tracing::debug!("Session {} -> {}", ctx.session_id, view.page());
    Ok(Json(view))
}

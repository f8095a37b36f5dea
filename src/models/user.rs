//! Auth request/response models

use serde::{Deserialize, Serialize};

use crate::logic::navigation::Page;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Outcome of a login, signup or logout
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub page: Page,
    pub user: Option<String>,
    pub message: String,
}

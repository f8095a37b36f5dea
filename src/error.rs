//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::db::CredentialError;
use crate::logic::classifier::ClassifierError;
use crate::logic::navigation::{InvalidPage, InvalidTransition};
use crate::logic::training::PipelineError;
use crate::models::DatasetError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    InvalidCredentials,
    UsernameTaken,
    EmptyField,
    PasswordMismatch,
    Unauthorized,

    // Navigation errors
    InvalidTransition(String),

    // Dataset errors
    MissingLabelColumn,
    MissingFeatureColumns(Vec<String>),
    MalformedDataset(String),
    NoDatasetStaged,
    ModelNotTrained,

    // Validation errors
    ValidationError(String),

    // Storage errors
    StorageError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid username or password".to_string()),
            AppError::UsernameTaken => (StatusCode::CONFLICT, "Username already exists".to_string()),
            AppError::EmptyField => (StatusCode::BAD_REQUEST, "Username and password cannot be empty".to_string()),
            AppError::PasswordMismatch => (StatusCode::BAD_REQUEST, "Passwords do not match".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Session required".to_string()),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::MissingLabelColumn => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Dataset must contain a 'label' column".to_string(),
            ),
            AppError::MissingFeatureColumns(cols) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Test file is missing feature columns: {}", cols.join(", ")),
            ),
            AppError::MalformedDataset(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::NoDatasetStaged => (StatusCode::CONFLICT, "Upload a training dataset first".to_string()),
            AppError::ModelNotTrained => (StatusCode::CONFLICT, "Train a model before detection".to_string()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StorageError(msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error occurred".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::UsernameTaken => AppError::UsernameTaken,
            CredentialError::EmptyField => AppError::EmptyField,
            CredentialError::Hash(msg) => AppError::InternalError(msg),
            other => AppError::StorageError(other.to_string()),
        }
    }
}

impl From<DatasetError> for AppError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::MissingLabelColumn => AppError::MissingLabelColumn,
            DatasetError::MissingColumns(cols) => AppError::MissingFeatureColumns(cols),
            other => AppError::MalformedDataset(other.to_string()),
        }
    }
}

impl From<ClassifierError> for AppError {
    fn from(err: ClassifierError) -> Self {
        AppError::MalformedDataset(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Dataset(e) => e.into(),
            PipelineError::Classifier(e) => e.into(),
            other => AppError::MalformedDataset(other.to_string()),
        }
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::InvalidTransition(err.to_string())
    }
}

impl From<InvalidPage> for AppError {
    fn from(err: InvalidPage) -> Self {
        AppError::InvalidTransition(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::ValidationError(err.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

//! Dashboard handlers: stage a training file, train, detect

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::{AppError, AppResult, AppState};
use crate::logic::detection::Verdict;
use crate::logic::navigation::{require_page, Page};
use crate::logic::training;
use crate::middleware::session::SessionContext;
use crate::models::{Dataset, DatasetPreview};

/// Multipart field carrying the CSV
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct StagedDatasetResponse {
    pub file_name: String,
    pub features: Vec<String>,
    pub dataset: DatasetPreview,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub accuracy: f64,
    pub accuracy_percent: String,
    pub features: Vec<String>,
    pub datasets_uploaded: u64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub file_name: String,
    pub verdict: Verdict,
    pub rows: usize,
    pub flagged_rows: usize,
    pub test_files_checked: u64,
    pub message: String,
}

/// Upload a labeled training file and preview it
pub async fn upload_dataset(
    State(state): State<AppState>,
    ctx: SessionContext,
    multipart: Multipart,
) -> AppResult<Json<StagedDatasetResponse>> {
    let session = state.session(ctx.session_id)?;
    require_page(session.page, Page::Dashboard)?;

    let (file_name, dataset) = read_csv_upload(multipart).await?;
    if let Err(e) = dataset.require_label() {
        tracing::warn!("Rejected training file '{}': {}", file_name, e);
        return Err(e.into());
    }

    let preview = dataset.head(state.config.preview_rows);
    let features = dataset.feature_columns();

    state.commit(ctx.session_id, |session| {
        require_page(session.page, Page::Dashboard)?;
        session.staged_dataset = Some(Arc::new(dataset));
        Ok(())
    })?;

    tracing::info!(
        "Training file staged: {} ({} rows, {} features)",
        file_name, preview.rows, features.len()
    );

    Ok(Json(StagedDatasetResponse {
        file_name,
        features,
        dataset: preview,
    }))
}

/// Train on the staged file and keep the model in the session
pub async fn train(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> AppResult<Json<TrainResponse>> {
    let session = state.session(ctx.session_id)?;
    require_page(session.page, Page::Dashboard)?;

    let dataset = session.staged_dataset.ok_or(AppError::NoDatasetStaged)?;
    let classifier = state.classifier.clone();
    let split = state.split_config();

    let detector = tokio::task::spawn_blocking(move || {
        training::train(classifier.as_ref(), &dataset, &split)
    })
    .await??;

    let accuracy = detector.accuracy();
    let features = detector.features().to_vec();

    // The user may have left the dashboard while the model was fitting
    let datasets_uploaded = state.commit(ctx.session_id, |session| {
        require_page(session.page, Page::Dashboard)?;
        session.record_training(detector);
        Ok(session.datasets_uploaded)
    })?;

    let accuracy_percent = format!("{:.2}", accuracy * 100.0);
    tracing::info!(
        "Model trained for session {}: accuracy {}%, features {:?}",
        ctx.session_id, accuracy_percent, features
    );

    Ok(Json(TrainResponse {
        accuracy,
        message: format!("Model trained successfully. Accuracy: {}%", accuracy_percent),
        accuracy_percent,
        features,
        datasets_uploaded,
    }))
}

/// Classify an uploaded file as a whole
pub async fn detect(
    State(state): State<AppState>,
    ctx: SessionContext,
    multipart: Multipart,
) -> AppResult<Json<DetectResponse>> {
    let session = state.session(ctx.session_id)?;
    require_page(session.page, Page::Dashboard)?;

    let detector = session.detector.ok_or(AppError::ModelNotTrained)?;
    let (file_name, dataset) = read_csv_upload(multipart).await?;

    let detection = tokio::task::spawn_blocking(move || detector.detect(&dataset))
        .await?
        .map_err(|e| {
            tracing::warn!("Detection failed for '{}': {}", file_name, e);
            AppError::from(e)
        })?;

    let test_files_checked = state.commit(ctx.session_id, |session| {
        require_page(session.page, Page::Dashboard)?;
        session.record_detection(detection.verdict);
        Ok(session.test_files_checked)
    })?;

    tracing::info!(
        "File '{}' classified {} ({}/{} rows flagged)",
        file_name, detection.verdict, detection.flagged_rows, detection.rows
    );

    Ok(Json(DetectResponse {
        file_name,
        verdict: detection.verdict,
        rows: detection.rows,
        flagged_rows: detection.flagged_rows,
        test_files_checked,
        message: detection.verdict.banner().to_string(),
    }))
}

/// Pull the CSV out of the `file` field (or the first field carrying a file)
async fn read_csv_upload(mut multipart: Multipart) -> AppResult<(String, Dataset)> {
    while let Some(field) = multipart.next_field().await? {
        let is_file = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field.bytes().await?;
        tracing::debug!("Received file: {} ({} bytes)", file_name, data.len());

        let dataset = Dataset::from_csv_bytes(&data)?;
        return Ok((file_name, dataset));
    }

    Err(AppError::ValidationError("No file uploaded".to_string()))
}

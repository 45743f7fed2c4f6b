use axum::{
    extract::{Multipart, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task;
use tracing::{error, info};

use super::read_file_field;
use crate::{
    error::{AppError, AppResult},
    state::AppState,
    summarizer::{
        extract_pdf_text, pdf_prompt, shape_generated_text, shape_text_summary, SummaryModel,
        TextSummary,
    },
};

#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub texto: String,
}

pub async fn summarize_text(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<SummarizeRequest>, AppError>,
) -> AppResult<Json<TextSummary>> {
    if payload.texto.trim().is_empty() {
        return Err(AppError::bad_request("texto must not be empty"));
    }
    let raw = state
        .summarizer
        .infer(SummaryModel::Text, &payload.texto)
        .await?;
    Ok(Json(shape_text_summary(raw)))
}

pub async fn summarize_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let upload = read_file_field(&mut multipart).await?;
    if !upload.file_name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(AppError::bad_request("file must be a PDF"));
    }

    let text = task::spawn_blocking(move || extract_pdf_text(&upload.bytes))
        .await
        .map_err(|err| {
            error!(error = %err, "pdf extraction task panicked");
            AppError::internal(err)
        })?
        .map_err(|err| AppError::bad_request(format!("could not read PDF: {err}")))?;

    if text.trim().is_empty() {
        return Err(AppError::bad_request("PDF contains no extractable text"));
    }
    info!(characters = text.chars().count(), "pdf text extracted");

    let raw = state
        .summarizer
        .infer(SummaryModel::Pdf, &pdf_prompt(&text))
        .await?;
    let resumen = shape_generated_text(&raw)?;
    Ok(Json(json!({ "resumen": resumen })))
}

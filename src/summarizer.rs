use std::{panic, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::StatusCode;
use pdfium_render::prelude::*;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{config::AppConfig, error::AppError};

/// Characters of extracted PDF text forwarded to the model.
pub const PDF_TEXT_LIMIT: usize = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryModel {
    /// Abstractive summarizer for raw text.
    Text,
    /// Instruction-following model used for PDF key points.
    Pdf,
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer responded with {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("summarizer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected summarizer response: {0}")]
    InvalidResponse(String),
}

impl From<SummarizerError> for AppError {
    fn from(value: SummarizerError) -> Self {
        match value {
            SummarizerError::Upstream { status, body } => AppError::upstream(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            ),
            other => AppError::upstream(StatusCode::BAD_GATEWAY, other.to_string()),
        }
    }
}

#[async_trait]
pub trait Summarizer: Send + Sync + 'static {
    async fn infer(&self, model: SummaryModel, inputs: &str) -> Result<Value, SummarizerError>;
}

pub struct HttpSummarizer {
    client: Client,
    text_url: String,
    pdf_url: String,
    api_token: Option<String>,
}

impl HttpSummarizer {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.summarizer_timeout_seconds.max(1)))
            .build()
            .context("failed to build summarizer HTTP client")?;
        Ok(Self {
            client,
            text_url: config.summarizer_text_url.clone(),
            pdf_url: config.summarizer_pdf_url.clone(),
            api_token: config.summarizer_api_token.clone(),
        })
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn infer(&self, model: SummaryModel, inputs: &str) -> Result<Value, SummarizerError> {
        let url = match model {
            SummaryModel::Text => &self.text_url,
            SummaryModel::Pdf => &self.pdf_url,
        };

        let mut request = self.client.post(url).json(&json!({ "inputs": inputs }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, ?model, "summarizer request rejected");
            return Err(SummarizerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| SummarizerError::InvalidResponse(err.to_string()))
    }
}

/// Either the extracted summary or, when the upstream shape is unexpected,
/// the raw upstream payload.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSummary {
    Resumen(String),
    Detalle(Value),
}

pub fn shape_text_summary(value: Value) -> TextSummary {
    let summary = value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("summary_text"))
        .and_then(Value::as_str)
        .map(str::to_string);
    match summary {
        Some(text) => TextSummary::Resumen(text),
        None => TextSummary::Detalle(value),
    }
}

pub fn shape_generated_text(value: &Value) -> Result<String, SummarizerError> {
    value
        .as_array()
        .and_then(|items| items.first())
        .and_then(|first| first.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SummarizerError::InvalidResponse(value.to_string()))
}

pub fn pdf_prompt(text: &str) -> String {
    let excerpt: String = text.chars().take(PDF_TEXT_LIMIT).collect();
    format!("Resume el siguiente texto legal en 3 puntos clave:\n\n{excerpt}")
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, String> {
    let pdfium = panic::catch_unwind(Pdfium::default)
        .map_err(|_| "failed to initialize PDFium".to_string())?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|err| format!("load pdf: {err}"))?;

    let mut combined = String::new();
    let pages = document.pages();
    for page_index in 0..pages.len() {
        let page = pages
            .get(page_index)
            .map_err(|err| format!("load page {page_index}: {err}"))?;
        if let Ok(page_text) = page.text() {
            combined.push_str(&page_text.all());
            combined.push('\n');
        };
    }

    Ok(combined)
}

use std::env;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_SUMMARIZER_TEXT_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-cnn";
pub const DEFAULT_SUMMARIZER_PDF_URL: &str =
    "https://api-inference.huggingface.co/models/google/flan-t5-base";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_key_id: String,
    pub jwt_previous_key: Option<PreviousSigningKey>,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub password_reset_expiry_minutes: i64,
    pub cors_allowed_origin: Option<String>,
    pub summarizer_text_url: String,
    pub summarizer_pdf_url: String,
    pub summarizer_api_token: Option<String>,
    pub summarizer_timeout_seconds: u64,
    pub worker_poll_interval_seconds: u64,
}

/// Verification-only key kept around while tokens signed with it expire.
#[derive(Clone, Debug)]
pub struct PreviousSigningKey {
    pub key_id: String,
    pub secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let jwt_key_id = env::var("JWT_KEY_ID").unwrap_or_else(|_| "v1".to_string());
        let jwt_previous_key = match (
            env::var("JWT_PREVIOUS_KEY_ID").ok(),
            env::var("JWT_PREVIOUS_SECRET").ok(),
        ) {
            (Some(key_id), Some(secret)) if !secret.trim().is_empty() => {
                Some(PreviousSigningKey { key_id, secret })
            }
            (None, None) => None,
            _ => bail!("JWT_PREVIOUS_KEY_ID and JWT_PREVIOUS_SECRET must be set together"),
        };
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "causas".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "causas-clients".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let password_reset_expiry_minutes = env::var("PASSWORD_RESET_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .context("PASSWORD_RESET_EXPIRY_MINUTES must be an integer")?;
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let summarizer_text_url = env::var("SUMMARIZER_TEXT_URL")
            .unwrap_or_else(|_| DEFAULT_SUMMARIZER_TEXT_URL.to_string());
        let summarizer_pdf_url = env::var("SUMMARIZER_PDF_URL")
            .unwrap_or_else(|_| DEFAULT_SUMMARIZER_PDF_URL.to_string());
        Url::parse(&summarizer_text_url).context("SUMMARIZER_TEXT_URL must be a valid URL")?;
        Url::parse(&summarizer_pdf_url).context("SUMMARIZER_PDF_URL must be a valid URL")?;
        let summarizer_api_token = env::var("HUGGINGFACE_API_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let summarizer_timeout_seconds = env::var("SUMMARIZER_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("SUMMARIZER_TIMEOUT_SECONDS must be an integer")?;
        let worker_poll_interval_seconds = env::var("WORKER_POLL_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .context("WORKER_POLL_INTERVAL_SECONDS must be an integer")?;

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_key_id,
            jwt_previous_key,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            password_reset_expiry_minutes,
            cors_allowed_origin,
            summarizer_text_url,
            summarizer_pdf_url,
            summarizer_api_token,
            summarizer_timeout_seconds,
            worker_poll_interval_seconds,
        })
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn redact_database_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("*****"));
            }
            parsed.to_string()
        }
        Err(_) => "***".to_string(),
    }
}

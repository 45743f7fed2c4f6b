use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::warn;

use super::{JobExecution, JobHandler};
use crate::{
    jobs::{PasswordResetEmail, JOB_SEND_PASSWORD_RESET_EMAIL},
    mailer::password_reset_email,
    models::Job,
    state::AppState,
};

const MAX_ATTEMPTS: i32 = 5;

pub struct SendPasswordResetEmailJob;

impl SendPasswordResetEmailJob {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SendPasswordResetEmailJob {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobHandler for SendPasswordResetEmailJob {
    fn job_type(&self) -> &'static str {
        JOB_SEND_PASSWORD_RESET_EMAIL
    }

    async fn handle(&self, state: Arc<AppState>, job: Job) -> JobExecution {
        let payload: PasswordResetEmail = match serde_json::from_value(job.payload.clone()) {
            Ok(payload) => payload,
            Err(err) => {
                return JobExecution::Failed {
                    error: format!("invalid password reset payload: {err}"),
                }
            }
        };

        let email = password_reset_email(&payload.correo, &payload.token, payload.expires_in_minutes);
        match state.mailer.send(email).await {
            Ok(()) => JobExecution::Success,
            Err(err) => retry_or_fail(job.attempts, err.to_string()),
        }
    }
}

fn retry_or_fail(attempts: i32, error: String) -> JobExecution {
    if attempts >= MAX_ATTEMPTS {
        JobExecution::Failed {
            error: format!("giving up after {attempts} attempts: {error}"),
        }
    } else {
        warn!(attempts, %error, "password reset email delivery failed");
        JobExecution::Retry {
            delay: Duration::from_secs(30 * u64::from(attempts.max(1).unsigned_abs())),
            error,
        }
    }
}

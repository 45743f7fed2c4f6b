use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

/// Writes messages to the log instead of delivering them. Used until a real
/// transport is configured.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, body = %email.body, "email dispatched to log");
        Ok(())
    }
}

pub fn password_reset_email(to: &str, token: &str, expires_in_minutes: i64) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Restablecimiento de contraseña".to_string(),
        body: format!(
            "Se solicitó restablecer su contraseña.\n\n\
             Use el siguiente código para confirmar el cambio: {token}\n\n\
             El código vence en {expires_in_minutes} minutos. \
             Si usted no hizo esta solicitud, ignore este mensaje."
        ),
    }
}

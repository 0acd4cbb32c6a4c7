//! Transactional email: a transport trait, the SES transport and the message
//! templates for each form.

mod ses;
pub mod templates;

pub use ses::SesMailer;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::config::EmailConfig;

/// Fully rendered email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid email message: {0}")]
    Build(String),
    #[error("email transport unavailable: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Sender and staff inbox used by every template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailboxes {
    pub from: String,
    pub notifications: String,
}

impl From<&EmailConfig> for Mailboxes {
    fn from(config: &EmailConfig) -> Self {
        Self {
            from: config.from_address.clone(),
            notifications: config.notification_address.clone(),
        }
    }
}

/// Send and swallow: failures are logged and never surface to the caller.
pub async fn deliver<M>(mailer: &M, message: EmailMessage, kind: &'static str, submission_id: &str)
where
    M: Mailer + ?Sized,
{
    let recipients = message.to.join(", ");
    match mailer.send(message).await {
        Ok(()) => info!(kind, submission_id, recipients = %recipients, "email sent"),
        Err(err) => error!(
            kind,
            submission_id,
            recipients = %recipients,
            error = %err,
            "failed to send email"
        ),
    }
}

use async_trait::async_trait;
use aws_sdk_ses::error::DisplayErrorContext;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client;

use super::{EmailMessage, MailError, Mailer};

/// Amazon SES transport using `SendEmail`.
#[derive(Debug, Clone)]
pub struct SesMailer {
    client: Client,
}

impl SesMailer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&shared))
    }
}

fn content(data: String) -> Result<Content, MailError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|err| MailError::Build(err.to_string()))
}

fn ses_message(subject: String, text: String, html: Option<String>) -> Result<Message, MailError> {
    let mut body = Body::builder().text(content(text)?);
    if let Some(html) = html {
        body = body.html(content(html)?);
    }

    Ok(Message::builder()
        .subject(content(subject)?)
        .body(body.build())
        .build())
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let EmailMessage {
            from,
            to,
            subject,
            text,
            html,
        } = message;

        let message = ses_message(subject, text, html)?;

        self.client
            .send_email()
            .source(from)
            .destination(Destination::builder().set_to_addresses(Some(to)).build())
            .message(message)
            .send()
            .await
            .map_err(|err| MailError::Transport(DisplayErrorContext(&err).to_string()))?;
        Ok(())
    }
}

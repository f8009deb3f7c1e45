//! SMTP delivery through lettre's tokio transport.
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{NotificationError, NotificationGateway};
use crate::config::SmtpSettings;

/// STARTTLS relay with optional credentials
pub struct SmtpGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpGateway {
    pub fn new(settings: &SmtpSettings, from: &str) -> anyhow::Result<Self> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid email.from {from:?}: {e}"))?;

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?.port(settings.port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl NotificationGateway for SmtpGateway {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                NotificationError::InvalidAddress(e.to_string())
            })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        Ok(())
    }
}

//! Email delivery over SMTP submission.
//!
//! Sends the report as a `multipart/alternative` message with a single HTML
//! part, through an authenticated STARTTLS relay.

use crate::config::{Credentials, EmailConfig};
use crate::report::ComposedReport;
use anyhow::{Context, Result};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};

/// Sends reports from the configured sender to the configured recipient.
pub struct Mailer {
    from: Mailbox,
    to: Mailbox,
    relay: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    /// Create a mailer. Fails if either address does not parse.
    pub fn new(config: &EmailConfig, credentials: &Credentials) -> Result<Self> {
        let from: Mailbox = credentials
            .email_sender
            .parse()
            .with_context(|| format!("Invalid sender address {:?}", credentials.email_sender))?;
        let to: Mailbox = credentials
            .email_recipient
            .parse()
            .with_context(|| {
                format!("Invalid recipient address {:?}", credentials.email_recipient)
            })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("Failed to set up SMTP relay {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(SmtpCredentials::new(
                credentials.email_sender.clone(),
                credentials.email_password.clone(),
            ))
            .build();

        Ok(Self {
            from,
            to,
            relay: format!("{}:{}", config.smtp_host, config.smtp_port),
            transport,
        })
    }

    /// Send a composed report.
    pub async fn send(&self, report: &ComposedReport) -> Result<()> {
        let message = build_message(&self.from, &self.to, &report.subject, &report.html)?;

        debug!("Submitting message via {}", self.relay);
        let response = self
            .transport
            .send(message)
            .await
            .with_context(|| format!("Failed to send email via {}", self.relay))?;

        info!("Email sent to {} ({})", self.to, response.code());
        Ok(())
    }
}

/// Build the MIME message for a report.
pub fn build_message(from: &Mailbox, to: &Mailbox, subject: &str, html: &str) -> Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(subject)
        .multipart(MultiPart::alternative().singlepart(SinglePart::html(html.to_string())))
        .context("Failed to build email message")
}

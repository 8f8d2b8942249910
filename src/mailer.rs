//! One-shot SMTP delivery of teacher reset codes.
//!
//! Delivery is synchronous and bounded by [`SMTP_TIMEOUT`]. There is no retry;
//! callers fall back to showing the code when this returns an error.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::error::{StoreError, StoreResult};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@school.example";
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl MailConfig {
    /// `None` unless `SMTP_HOST` is set.
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

fn transport_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Transport(e.to_string())
}

pub fn send_reset_code(config: &MailConfig, to: &str, code: &str) -> StoreResult<()> {
    let email = Message::builder()
        .from(config.from_address.parse().map_err(transport_err)?)
        .to(to.parse().map_err(transport_err)?)
        .subject("Roster - teacher password reset code")
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Your password reset code is: {}\n\nIf you did not request this, ignore this email.",
            code
        ))
        .map_err(transport_err)?;

    let mut builder = SmtpTransport::starttls_relay(&config.smtp_host)
        .map_err(transport_err)?
        .port(config.smtp_port)
        .timeout(Some(SMTP_TIMEOUT));
    if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
        builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }
    let mailer = builder.build();
    mailer.send(&email).map_err(transport_err)?;

    tracing::info!(to, "reset code email sent");
    Ok(())
}

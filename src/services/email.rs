//! Email confirmation messages sent over SMTP.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

const CONFIRMATION_SUBJECT: &str = "Confirm your email";

/// Sends account emails. Absent entirely when SMTP is not configured.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
    public_base_url: String,
}

impl EmailService {
    /// Builds the service from config. Returns `None` if SMTP is not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.email_enabled() {
            tracing::debug!("Email disabled (MAIL_SERVER or MAIL_FROM unset)");
            return None;
        }
        let host = config.mail_server.as_deref()?;
        let from: Mailbox = match config.mail_from.as_deref()?.parse() {
            Ok(from) => from,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid MAIL_FROM, email disabled");
                return None;
            }
        };

        let builder = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
            Ok(builder) => builder.port(config.mail_port),
            Err(e) => {
                tracing::warn!(error = %e, host = %host, "Invalid SMTP relay, email disabled");
                return None;
            }
        };
        let builder = if let (Some(u), Some(p)) = (&config.mail_username, &config.mail_password) {
            builder.credentials(Credentials::new(u.clone(), p.clone()))
        } else {
            builder
        };

        tracing::info!(
            host = %host,
            port = config.mail_port,
            "Email service initialized (SMTP with STARTTLS)"
        );

        Some(Self {
            mailer: Arc::new(builder.build()),
            from,
            public_base_url: config.public_base_url.clone(),
        })
    }

    /// Sends the email-confirmation link for a freshly issued email token
    pub async fn send_confirmation(&self, email: &str, username: &str, token: &str) -> AppResult<()> {
        let to: Mailbox = email
            .parse()
            .map_err(|e| AppError::InvalidInput(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(CONFIRMATION_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(confirmation_body(username, &self.public_base_url, token))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::info!(email = %email, "Confirmation email sent");
        Ok(())
    }
}

/// Link a user follows to confirm their email address
pub fn confirmation_link(public_base_url: &str, token: &str) -> String {
    let base = if public_base_url.ends_with('/') {
        public_base_url.to_string()
    } else {
        format!("{}/", public_base_url)
    };
    format!("{}api/auth/confirmed_email/{}", base, token)
}

fn confirmation_body(username: &str, public_base_url: &str, token: &str) -> String {
    format!(
        "Hi {},\n\nThanks for signing up to PhotoShare. Confirm your email address by opening the link below:\n\n{}\n",
        username,
        confirmation_link(public_base_url, token)
    )
}

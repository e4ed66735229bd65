//! Email service for account verification and password reset

use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send the email verification link
    pub async fn send_verification(&self, to: &str, name: &str, token: &str) -> AppResult<()> {
        let link = format!("{}/verify-email?token={}", self.config.frontend_url, token);
        let body = format!(
            r#"
Hi {name},

Welcome to Windsurf Gear Tracker! Please verify your email address by opening this link:

{link}

The link expires in 24 hours.
"#
        );

        self.send_email(to, "Verify your email", &body).await
    }

    /// Send the password reset link
    pub async fn send_password_reset(&self, to: &str, name: &str, token: &str) -> AppResult<()> {
        let link = format!("{}/reset-password?token={}", self.config.frontend_url, token);
        let body = format!(
            r#"
Hi {name},

A password reset was requested for your account. Open this link to choose a new password:

{link}

The link expires in 1 hour. If you did not request a reset, ignore this email.
"#
        );

        self.send_email(to, "Password reset request", &body).await
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        if !self.config.enabled {
            tracing::info!(to = %to, subject = %subject, "Email delivery disabled, message not sent");
            tracing::debug!("{}", body);
            return Ok(());
        }

        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Windsurf Gear Tracker");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><p>{}</p></body></html>"#,
                                body.trim().replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(username), Some(password)) => {
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => mailer_builder,
        };

        let mailer = mailer_builder.build();

        // The SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_delivery_succeeds_without_smtp() {
        let service = EmailService::new(EmailConfig::default());
        service
            .send_verification("alice@example.com", "Alice", "token")
            .await
            .unwrap();
        service
            .send_password_reset("alice@example.com", "Alice", "token")
            .await
            .unwrap();
    }
}

//! Email delivery for registration confirmations and organizer alerts.
//!
//! Supports two providers:
//! - `console`: Logs emails instead of sending them (development)
//! - `sendgrid`: Uses the SendGrid v3 mail API
//!
//! Every attempt resolves to a [`NotificationOutcome`]; transport errors
//! never propagate to the registration flow.

use async_trait::async_trait;
use domain::models::{NotificationOutcome, Registration};
use domain::services::RegistrationNotifier;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{EmailConfig, EventConfig};
use crate::middleware::metrics::record_notification;

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
}

/// Email service for registration mail.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    event: Arc<EventConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig, event: EventConfig) -> Self {
        Self {
            config: Arc::new(config),
            event: Arc::new(event),
            client: reqwest::Client::new(),
        }
    }

    /// Check if a delivery channel is configured at all.
    pub fn is_configured(&self) -> bool {
        self.config.enabled
            && match self.config.provider.as_str() {
                "console" => true,
                "sendgrid" => !self.config.sendgrid_api_key.is_empty(),
                _ => false,
            }
    }

    /// Send an email message through the configured provider.
    pub async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Err(EmailError::NotConfigured);
        }

        match self.config.provider.as_str() {
            "console" => {
                self.send_console(message);
                Ok(())
            }
            "sendgrid" => self.send_sendgrid(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Attendee confirmation for a persisted registration.
    pub fn render_confirmation(&self, registration: &Registration) -> EmailMessage {
        let event = &self.event;
        let registered_on = registration.created_at.format("%B %-d, %Y").to_string();
        let days = registration.days.labels();

        let mut details = vec![
            format!("- Name: {}", registration.full_name),
            format!("- Email: {}", registration.email),
            format!("- Affiliation: {}", registration.affiliation),
        ];
        if let Some(phone) = &registration.phone {
            details.push(format!("- Phone: {}", phone));
        }
        if let Some(interests) = &registration.research_interests {
            details.push(format!("- Research Interests: {}", interests));
        }
        details.push(format!("- Registration Date: {}", registered_on));

        let body_text = format!(
            r#"Dear {name},

Thank you for registering for {event}!

Event Details:
- Dates: {dates}
- Venue: {venue}

Your Registration:
{details}

Days you will attend:
{days}

We look forward to seeing you!

Contact us: {contact}

Best regards,
{event} Organizing Committee"#,
            name = registration.full_name,
            event = event.name,
            dates = event.dates,
            venue = event.venue,
            details = details.join("\n"),
            days = days
                .iter()
                .map(|d| format!("- {}", d))
                .collect::<Vec<_>>()
                .join("\n"),
            contact = self.config.admin_email,
        );

        let detail_rows = details
            .iter()
            .map(|line| format!("<li>{}</li>", escape_html(line.trim_start_matches("- "))))
            .collect::<String>();
        let day_rows = days
            .iter()
            .map(|d| format!("<li>{}</li>", escape_html(d)))
            .collect::<String>();

        let body_html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{event}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto;">
    <div style="background: #1e4d2b; color: white; padding: 30px; text-align: center;">
        <h1 style="margin: 0; font-size: 24px;">{event}</h1>
    </div>
    <div style="padding: 30px;">
        <p>Welcome, {name}!</p>
        <p>Thank you for registering. Your registration is confirmed.</p>
        <h3 style="color: #1e4d2b;">Your Registration Details</h3>
        <ul>{detail_rows}</ul>
        <h3 style="color: #1e4d2b;">Days You Will Attend</h3>
        <ul>{day_rows}</ul>
        <p><strong>Dates:</strong> {dates}<br><strong>Venue:</strong> {venue}</p>
        <p>For any questions, contact us at {contact}.</p>
    </div>
    <div style="background: #f8f9fa; padding: 20px; text-align: center; color: #666; font-size: 14px;">
        This email was sent to {email} regarding your registration. Please keep it for your records.
    </div>
</body>
</html>"#,
            event = escape_html(&event.name),
            name = escape_html(&registration.full_name),
            detail_rows = detail_rows,
            day_rows = day_rows,
            dates = escape_html(&event.dates),
            venue = escape_html(&event.venue),
            contact = escape_html(&self.config.admin_email),
            email = escape_html(&registration.email),
        );

        EmailMessage {
            to: registration.email.clone(),
            to_name: Some(registration.full_name.clone()),
            subject: format!("{} - Registration Confirmed", event.name),
            body_text,
            body_html,
        }
    }

    /// Organizer alert for a new registration.
    pub fn render_admin_alert(&self, registration: &Registration) -> EmailMessage {
        let not_provided = "Not provided";
        let days = registration.days.labels().join(", ");
        let registered_at = registration.created_at.format("%Y-%m-%d %H:%M:%S UTC");

        let rows = [
            ("Name", registration.full_name.as_str()),
            ("Email", registration.email.as_str()),
            ("Affiliation", registration.affiliation.as_str()),
            ("Phone", registration.phone.as_deref().unwrap_or(not_provided)),
            (
                "Research Interests",
                registration
                    .research_interests
                    .as_deref()
                    .unwrap_or(not_provided),
            ),
            ("Days", days.as_str()),
        ];

        let mut body_text = format!("New Registration for {}\n\n", self.event.name);
        let mut body_html = String::from("<h2>New Registration Received</h2><ul>");
        for (label, value) in rows {
            body_text.push_str(&format!("{}: {}\n", label, value));
            body_html.push_str(&format!(
                "<li><strong>{}:</strong> {}</li>",
                label,
                escape_html(value)
            ));
        }
        body_text.push_str(&format!("Registration Time: {}\n", registered_at));
        body_html.push_str(&format!(
            "<li><strong>Registration Time:</strong> {}</li></ul>\
             <p>Please review this registration in the admin dashboard.</p>",
            registered_at
        ));

        EmailMessage {
            to: self.config.admin_email.clone(),
            to_name: None,
            subject: format!("New Registration - {}", self.event.name),
            body_text,
            body_html,
        }
    }

    /// Console provider - logs email instead of sending it.
    fn send_console(&self, message: &EmailMessage) {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body (plain text)");
    }

    /// SendGrid provider - one request, no retries.
    async fn send_sendgrid(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut recipient = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = serde_json::json!(name);
        }

        let body = serde_json::json!({
            "personalizations": [{ "to": [recipient] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.body_text },
                { "type": "text/html", "value": message.body_html }
            ]
        });

        let response = self
            .client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}",
                status
            )))
        }
    }

    async fn deliver(&self, kind: &'static str, message: &EmailMessage) -> NotificationOutcome {
        let outcome = match self.send(message).await {
            Ok(()) => NotificationOutcome::sent(),
            Err(EmailError::NotConfigured) => NotificationOutcome::not_configured(),
            Err(e) => NotificationOutcome::failed(e.to_string()),
        };
        record_notification(kind, outcome.success);
        outcome
    }
}

#[async_trait]
impl RegistrationNotifier for EmailService {
    async fn send_confirmation(&self, registration: &Registration) -> NotificationOutcome {
        let message = self.render_confirmation(registration);
        self.deliver("confirmation", &message).await
    }

    async fn send_admin_notification(&self, registration: &Registration) -> NotificationOutcome {
        let message = self.render_admin_alert(registration);
        self.deliver("admin_alert", &message).await
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use domain::models::{AttendanceDay, DaySelection, PaymentStatus, RegistrationStatus};

    fn email_config(enabled: bool, provider: &str) -> EmailConfig {
        EmailConfig {
            enabled,
            provider: provider.to_string(),
            sendgrid_api_key: String::new(),
            sender_email: "noreply@example.com".to_string(),
            sender_name: "Research Week".to_string(),
            admin_email: "organizers@example.com".to_string(),
        }
    }

    fn service(enabled: bool, provider: &str) -> EmailService {
        EmailService::new(email_config(enabled, provider), EventConfig::default())
    }

    fn registration() -> Registration {
        let created = Utc.with_ymd_and_hms(2025, 10, 3, 8, 30, 0).unwrap();
        Registration {
            id: 12,
            full_name: "Ana <Reyes>".to_string(),
            email: "ana@example.com".to_string(),
            affiliation: "DLSMHSI".to_string(),
            phone: None,
            research_interests: Some("Public health".to_string()),
            days: DaySelection::from_days([AttendanceDay::Day1, AttendanceDay::Day3]),
            registration_status: RegistrationStatus::Active,
            payment_status: PaymentStatus::Pending,
            email_sent: false,
            email_sent_at: None,
            attendance_confirmed: false,
            notes: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_confirmation_rendering_is_deterministic() {
        let service = service(true, "console");
        let first = service.render_confirmation(&registration());
        let second = service.render_confirmation(&registration());
        assert_eq!(first, second);

        assert_eq!(first.to, "ana@example.com");
        assert!(first.subject.ends_with("Registration Confirmed"));
        assert!(first.body_text.contains("Day 1 - Nov 10"));
        assert!(first.body_text.contains("Day 3 - Nov 12"));
        assert!(!first.body_text.contains("Day 2 - Nov 11"));
        assert!(first.body_text.contains("Registration Date: October 3, 2025"));
        assert!(first.body_text.contains("Research Interests: Public health"));
        assert!(!first.body_text.contains("Phone:"));
    }

    #[test]
    fn test_confirmation_html_escapes_input() {
        let message = service(true, "console").render_confirmation(&registration());
        assert!(message.body_html.contains("Ana &lt;Reyes&gt;"));
        assert!(!message.body_html.contains("<Reyes>"));
    }

    #[test]
    fn test_admin_alert_rendering() {
        let message = service(true, "console").render_admin_alert(&registration());
        assert_eq!(message.to, "organizers@example.com");
        assert!(message.body_text.contains("Phone: Not provided"));
        assert!(message.body_text.contains("Registration Time: 2025-10-03 08:30:00 UTC"));
    }

    #[test]
    fn test_is_configured() {
        assert!(service(true, "console").is_configured());
        assert!(!service(false, "console").is_configured());
        assert!(!service(true, "sendgrid").is_configured());
        assert!(!service(true, "smtp").is_configured());
    }

    #[tokio::test]
    async fn test_console_provider_succeeds() {
        let outcome = service(true, "console")
            .send_confirmation(&registration())
            .await;
        assert!(outcome.success);
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_disabled_service_is_not_configured() {
        let outcome = service(false, "console")
            .send_confirmation(&registration())
            .await;
        assert!(outcome.is_not_configured());
    }

    #[tokio::test]
    async fn test_sendgrid_without_key_is_not_configured() {
        let outcome = service(true, "sendgrid")
            .send_admin_notification(&registration())
            .await;
        assert!(outcome.is_not_configured());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}

//! Notification seam for registration messages.
//!
//! Provides the abstraction the intake lifecycle uses to send attendee
//! confirmations and organizer alerts. Implementations never return errors:
//! every attempt resolves to a [`NotificationOutcome`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{NotificationOutcome, Registration};

/// Dispatches registration messages. One attempt per call, no retries.
#[async_trait::async_trait]
pub trait RegistrationNotifier: Send + Sync {
    /// Send the attendee-facing confirmation for a freshly persisted registration.
    async fn send_confirmation(&self, registration: &Registration) -> NotificationOutcome;

    /// Alert the organizers about a new registration.
    async fn send_admin_notification(&self, registration: &Registration) -> NotificationOutcome;
}

/// Mock notifier for development and testing.
///
/// Logs notifications but doesn't actually send them, and counts calls.
#[derive(Debug, Default)]
pub struct MockRegistrationNotifier {
    /// Whether to simulate delivery failures.
    pub simulate_failure: bool,
    /// Whether to behave as if no channel were configured.
    pub unconfigured: bool,
    /// Artificial latency applied before every attempt.
    pub delay: Option<Duration>,
    confirmations: AtomicUsize,
    admin_notifications: AtomicUsize,
}

impl MockRegistrationNotifier {
    /// Create a mock notifier that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock notifier that simulates delivery failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Create a mock notifier with no delivery channel.
    pub fn unconfigured() -> Self {
        Self {
            unconfigured: true,
            ..Self::default()
        }
    }

    /// Create a mock notifier that takes `delay` per attempt.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Number of confirmation attempts made so far.
    pub fn confirmations_sent(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }

    /// Number of admin notification attempts made so far.
    pub fn admin_notifications_sent(&self) -> usize {
        self.admin_notifications.load(Ordering::SeqCst)
    }

    async fn attempt(&self, kind: &str, registration: &Registration) -> NotificationOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unconfigured {
            return NotificationOutcome::not_configured();
        }

        if self.simulate_failure {
            tracing::warn!(
                registration_id = registration.id,
                kind = kind,
                "Mock notifier simulating failure"
            );
            return NotificationOutcome::failed("Simulated failure");
        }

        tracing::info!(
            registration_id = registration.id,
            recipient = %registration.email,
            kind = kind,
            "Mock: Would send registration notification"
        );
        NotificationOutcome::sent()
    }
}

#[async_trait::async_trait]
impl RegistrationNotifier for MockRegistrationNotifier {
    async fn send_confirmation(&self, registration: &Registration) -> NotificationOutcome {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        self.attempt("confirmation", registration).await
    }

    async fn send_admin_notification(&self, registration: &Registration) -> NotificationOutcome {
        self.admin_notifications.fetch_add(1, Ordering::SeqCst);
        self.attempt("admin_alert", registration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DaySelection, PaymentStatus, RegistrationStatus};
    use chrono::Utc;

    fn registration() -> Registration {
        let now = Utc::now();
        Registration {
            id: 1,
            full_name: "Test Attendee".to_string(),
            email: "attendee@example.com".to_string(),
            affiliation: "Test U".to_string(),
            phone: None,
            research_interests: None,
            days: DaySelection {
                day2: true,
                ..Default::default()
            },
            registration_status: RegistrationStatus::Active,
            payment_status: PaymentStatus::Pending,
            email_sent: false,
            email_sent_at: None,
            attendance_confirmed: false,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_mock_notifier_send() {
        let notifier = MockRegistrationNotifier::new();
        let outcome = notifier.send_confirmation(&registration()).await;
        assert!(outcome.success);
        assert_eq!(notifier.confirmations_sent(), 1);
        assert_eq!(notifier.admin_notifications_sent(), 0);
    }

    #[tokio::test]
    async fn test_mock_notifier_failure() {
        let notifier = MockRegistrationNotifier::failing();
        let outcome = notifier.send_confirmation(&registration()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Simulated failure"));
    }

    #[tokio::test]
    async fn test_mock_notifier_unconfigured() {
        let notifier = MockRegistrationNotifier::unconfigured();
        let outcome = notifier.send_admin_notification(&registration()).await;
        assert!(outcome.is_not_configured());
        assert_eq!(notifier.admin_notifications_sent(), 1);
    }
}

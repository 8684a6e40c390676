//! Best-effort purchaser notifications.
//!
//! Settlement never talks to the mail transport directly. It drops a
//! [`Notification`] into a bounded outbox channel and moves on; a spawned worker
//! renders and sends each message, logging and discarding failures. A full or
//! closed outbox is also only logged.

use crate::domain::money::Price;
use crate::domain::ports::MailSenderRef;
use html_escape::encode_safe;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Sent once per newly settled course.
    Enrolled {
        to: String,
        name: String,
        course_name: String,
    },
    /// Sent once per verified payment that settled at least one course.
    PaymentReceived {
        to: String,
        name: String,
        amount: Price,
        currency: String,
        order_ref: String,
        payment_ref: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Self::Enrolled { to, .. } | Self::PaymentReceived { to, .. } => to,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::Enrolled { course_name, .. } => {
                format!("Successfully Enrolled into {course_name}")
            }
            Self::PaymentReceived { .. } => "Payment Received".to_string(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Enrolled {
                name, course_name, ..
            } => format!(
                "<p>Dear {},</p>\
                 <p>You have successfully registered for the course <strong>{}</strong>.</p>\
                 <p>Log in to your dashboard to start learning.</p>",
                encode_safe(name),
                encode_safe(course_name),
            ),
            Self::PaymentReceived {
                name,
                amount,
                currency,
                order_ref,
                payment_ref,
                ..
            } => format!(
                "<p>Dear {},</p>\
                 <p>We have received a payment of <strong>{} {}</strong>.</p>\
                 <p>Order ID: {}<br/>Payment ID: {}</p>",
                encode_safe(name),
                encode_safe(currency),
                amount,
                encode_safe(order_ref),
                encode_safe(payment_ref),
            ),
        }
    }
}

/// Producer side of the notification outbox.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<Notification>,
}

impl Notifier {
    /// Creates an outbox without a worker. The caller owns the receiver.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Creates an outbox drained by a background worker sending through `mailer`.
    ///
    /// The worker exits once every `Notifier` clone has been dropped.
    pub fn spawn(capacity: usize, mailer: MailSenderRef) -> (Self, JoinHandle<()>) {
        let (notifier, receiver) = Self::channel(capacity);
        let handle = tokio::spawn(run_worker(receiver, mailer));
        (notifier, handle)
    }

    /// Queues a message without waiting. Never fails the caller.
    pub fn enqueue(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                warn!(to = n.recipient(), subject = %n.subject(), "Notification outbox full, dropping message");
            }
            Err(TrySendError::Closed(n)) => {
                warn!(to = n.recipient(), subject = %n.subject(), "Notification outbox closed, dropping message");
            }
        }
    }
}

pub async fn run_worker(mut receiver: mpsc::Receiver<Notification>, mailer: MailSenderRef) {
    while let Some(notification) = receiver.recv().await {
        let to = notification.recipient();
        let subject = notification.subject();
        match mailer.send(to, &subject, &notification.render()).await {
            Ok(()) => debug!(to, subject = %subject, "Notification sent"),
            Err(e) => warn!(to, subject = %subject, error = %e, "Notification failed"),
        }
    }
    debug!("Notification outbox closed, worker exiting");
}

//! Lifecycle email notifications
//!
//! Services enqueue an [`OutboundEmail`] on the [`NotificationOutbox`] after the
//! write it describes has committed. The [`NotificationWorker`] consumes the
//! outbox, retries failed sends with exponential backoff and records
//! successful slot confirmations on the request.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use shared::ContactInfo;

use crate::config::NotificationConfig;
use crate::external::{EmailParams, EmailReceipt, EmailSender, NotificationError};
use crate::gateway::PersistenceGateway;

const SLOT_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";
const SLOT_DISPLAY_FORMAT: &str = "%b %-d, %Y, %-I:%M %p";
const DEFAULT_SELLER_NAME: &str = "Scrap Link Seller";

// ============================================================================
// Templates
// ============================================================================

/// Which lifecycle email this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    /// To the seller, when a recycler requests pickup
    NewPickupRequest,
    /// To the recycler, acknowledging their request
    RequestConfirmation,
    /// To the recycler, when the seller picks a slot
    SlotConfirmed,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::NewPickupRequest => "new_pickup_request",
            EmailKind::RequestConfirmation => "request_confirmation",
            EmailKind::SlotConfirmed => "slot_confirmed",
        }
    }
}

/// Render a `datetime-local` slot for humans; anything else is shown as typed
pub fn format_slot(raw: &str) -> String {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, SLOT_INPUT_FORMAT)
        .map(|dt| dt.format(SLOT_DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|_| trimmed.to_string())
}

fn format_slots(slots: &[String]) -> Option<String> {
    if slots.is_empty() {
        return None;
    }
    Some(
        slots
            .iter()
            .map(|s| format_slot(s))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

pub fn new_request_email(
    seller: &ContactInfo,
    recycler_name: &str,
    scrap_type: &str,
    proposed_slots: &[String],
) -> EmailParams {
    let seller_name = seller.display_name();
    let slot_info = format_slots(proposed_slots)
        .map(|slots| format!("\n\nPreferred Pickup Slot: {}", slots))
        .unwrap_or_default();

    EmailParams::new(
        &seller.email,
        seller_name,
        "New Pickup Request Received!",
        format!(
            "Hi {},\n\nYou have received a new pickup request from {} for your {} scrap listing.{}\n\nPlease check your dashboard to accept or reject the request.",
            seller_name, recycler_name, scrap_type, slot_info
        ),
    )
    .with("scrap_type", scrap_type)
}

pub fn request_confirmation_email(
    recycler: &ContactInfo,
    scrap_type: &str,
    proposed_slots: &[String],
) -> EmailParams {
    let name = recycler.display_name();
    let slot_info = format_slots(proposed_slots)
        .map(|slots| format!("\n\nYour Preferred Pickup Slot: {}", slots))
        .unwrap_or_default();

    EmailParams::new(
        &recycler.email,
        name,
        "Pickup Request Confirmation - SCRAP LINK",
        format!(
            "Hi {},\n\nYour pickup request for {} has been successfully submitted.{}\n\nThe seller will review your request and confirm the pickup slot. You will be notified once they respond.\n\nThank you for using SCRAP LINK!",
            name, scrap_type, slot_info
        ),
    )
    .with("scrap_type", scrap_type)
}

pub fn slot_confirmed_email(
    recycler: &ContactInfo,
    seller_name: Option<&str>,
    scrap_type: &str,
    weight: Decimal,
    slot: &str,
) -> EmailParams {
    let from_name = seller_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_SELLER_NAME);
    let pickup_slot = format_slot(slot);
    let weight = weight.normalize().to_string();

    EmailParams::new(
        &recycler.email,
        recycler.display_name(),
        "Your Pickup has been Scheduled!",
        format!(
            "Great news! Your pickup request for {} scrap ({}kg) has been accepted.\n\nScheduled Pickup Slot: {}\n\nAccepted by: {}",
            scrap_type, weight, pickup_slot, from_name
        ),
    )
    .with("from_name", from_name)
    .with("scrap_type", scrap_type)
    .with("weight", weight)
    .with("pickup_slot", pickup_slot)
}

// ============================================================================
// Outbox
// ============================================================================

/// An email waiting to be delivered
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub kind: EmailKind,
    pub request_id: Uuid,
    pub params: EmailParams,
}

/// Sending half of the notification queue
#[derive(Clone)]
pub struct NotificationOutbox {
    sender: mpsc::UnboundedSender<OutboundEmail>,
}

impl NotificationOutbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundEmail>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an email. Returns `false` (and logs) if the worker is gone.
    pub fn enqueue(&self, email: OutboundEmail) -> bool {
        let kind = email.kind;
        let request_id = email.request_id;
        match self.sender.send(email) {
            Ok(()) => {
                tracing::debug!(kind = kind.as_str(), %request_id, "email queued");
                true
            }
            Err(_) => {
                tracing::warn!(kind = kind.as_str(), %request_id, "notification worker stopped, email dropped");
                false
            }
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Exponential backoff between delivery attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based count of failures so far)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }
}

impl From<&NotificationConfig> for RetryPolicy {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// Delivers queued emails
#[derive(Clone)]
pub struct NotificationWorker {
    sender: Arc<dyn EmailSender>,
    gateway: Arc<dyn PersistenceGateway>,
    policy: RetryPolicy,
}

impl NotificationWorker {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        gateway: Arc<dyn PersistenceGateway>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            sender,
            gateway,
            policy,
        }
    }

    /// Send one email, retrying per the policy
    pub async fn deliver(&self, email: &OutboundEmail) -> Result<EmailReceipt, NotificationError> {
        let mut attempt = 1;
        let receipt = loop {
            match self.sender.send(&email.params).await {
                Ok(receipt) => break receipt,
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    tracing::warn!(
                        kind = email.kind.as_str(),
                        request_id = %email.request_id,
                        attempt,
                        error = %e,
                        "email send failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        tracing::info!(
            kind = email.kind.as_str(),
            request_id = %email.request_id,
            to = %email.params.to_email,
            status = receipt.status,
            "email delivered"
        );

        if email.kind == EmailKind::SlotConfirmed {
            if let Err(e) = self.gateway.set_slot_notified(email.request_id, true).await {
                tracing::warn!(request_id = %email.request_id, error = %e, "failed to record slot notification");
            }
        }

        Ok(receipt)
    }

    async fn deliver_logged(&self, email: &OutboundEmail) {
        if let Err(e) = self.deliver(email).await {
            tracing::error!(
                kind = email.kind.as_str(),
                request_id = %email.request_id,
                error = %e,
                "email delivery gave up"
            );
        }
    }

    /// Deliver everything currently queued, without waiting for more
    pub async fn drain(&self, receiver: &mut mpsc::UnboundedReceiver<OutboundEmail>) -> usize {
        let mut delivered = 0;
        while let Ok(email) = receiver.try_recv() {
            self.deliver_logged(&email).await;
            delivered += 1;
        }
        delivered
    }

    /// Consume the queue until every outbox handle is dropped
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<OutboundEmail>) {
        tracing::info!("notification worker started");
        while let Some(email) = receiver.recv().await {
            self.deliver_logged(&email).await;
        }
        tracing::info!("notification worker stopped");
    }

    pub fn spawn(self, receiver: mpsc::UnboundedReceiver<OutboundEmail>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }
}

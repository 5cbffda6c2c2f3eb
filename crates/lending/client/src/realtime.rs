//! Realtime push events.
//!
//! The socket transport itself lives outside this crate; it hands us
//! `(event name, JSON payload)` pairs, which are decoded here into
//! [`RealtimeEvent`]s and mapped onto loan events and notifications.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use lending_types::{LendingResult, LoanEvent, LoanStatus};

use crate::error::ClientResult;

pub const LOAN_STATUS_CHANGED: &str = "loan-status-changed";
pub const PAYMENT_RECEIVED: &str = "payment-received";
pub const PAYMENT_NOTIFICATION: &str = "payment-notification";
pub const NOTIFICATION: &str = "notification";
pub const SYSTEM_ANNOUNCEMENT: &str = "system-announcement";

/// Number of notifications kept in the feed.
pub const NOTIFICATION_FEED_CAPACITY: usize = 10;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanStatusChanged {
    pub loan_id: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceived {
    pub loan_id: String,
    #[serde(default)]
    pub amount: f64,
    pub remaining_balance: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RealtimeEvent {
    LoanStatusChanged(LoanStatusChanged),
    PaymentReceived(PaymentReceived),
    PaymentNotification(MessagePayload),
    Notification(MessagePayload),
    SystemAnnouncement(MessagePayload),
}

/// Decode a pushed event. Unrecognized event names yield `Ok(None)`.
pub fn decode(event: &str, payload: &Value) -> ClientResult<Option<RealtimeEvent>> {
    let decoded = match event {
        LOAN_STATUS_CHANGED => {
            RealtimeEvent::LoanStatusChanged(serde_json::from_value(payload.clone())?)
        }
        PAYMENT_RECEIVED => RealtimeEvent::PaymentReceived(serde_json::from_value(payload.clone())?),
        PAYMENT_NOTIFICATION => {
            RealtimeEvent::PaymentNotification(serde_json::from_value(payload.clone())?)
        }
        NOTIFICATION => RealtimeEvent::Notification(serde_json::from_value(payload.clone())?),
        SYSTEM_ANNOUNCEMENT => {
            RealtimeEvent::SystemAnnouncement(serde_json::from_value(payload.clone())?)
        }
        other => {
            debug!(event = other, "Ignoring unrecognized realtime event");
            return Ok(None);
        }
    };
    trace!(event, "Decoded realtime event");
    Ok(Some(decoded))
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::LoanStatusChanged(_) => LOAN_STATUS_CHANGED,
            RealtimeEvent::PaymentReceived(_) => PAYMENT_RECEIVED,
            RealtimeEvent::PaymentNotification(_) => PAYMENT_NOTIFICATION,
            RealtimeEvent::Notification(_) => NOTIFICATION,
            RealtimeEvent::SystemAnnouncement(_) => SYSTEM_ANNOUNCEMENT,
        }
    }

    /// Loan the event refers to, if any.
    pub fn loan_id(&self) -> Option<&str> {
        match self {
            RealtimeEvent::LoanStatusChanged(e) => Some(&e.loan_id),
            RealtimeEvent::PaymentReceived(e) => Some(&e.loan_id),
            _ => None,
        }
    }

    /// The status-machine event carried by this push, if any.
    ///
    /// A status push naming `approved` or `rejected` is mapped to the
    /// dedicated event so history reads naturally; everything else is a
    /// bare assertion.
    pub fn loan_event(&self) -> LendingResult<Option<LoanEvent>> {
        match self {
            RealtimeEvent::LoanStatusChanged(e) => {
                let event = match LoanStatus::parse(&e.status)? {
                    LoanStatus::Approved => LoanEvent::Approved,
                    LoanStatus::Rejected => LoanEvent::Rejected {
                        reason: e.message.clone(),
                    },
                    status => LoanEvent::StatusAsserted { status },
                };
                Ok(Some(event))
            }
            RealtimeEvent::PaymentReceived(e) => Ok(Some(LoanEvent::PaymentReceived {
                remaining_balance: e.remaining_balance,
            })),
            _ => Ok(None),
        }
    }

    /// User-facing notification for this push.
    pub fn notification(&self, now: DateTime<Utc>) -> Notification {
        let (kind, title, message) = match self {
            RealtimeEvent::LoanStatusChanged(e) => (
                NotificationKind::LoanStatus,
                "Loan Status Update".to_string(),
                e.message
                    .clone()
                    .unwrap_or_else(|| format!("Your loan is now {}", e.status)),
            ),
            RealtimeEvent::PaymentReceived(e) => (
                NotificationKind::Payment,
                "Payment Received".to_string(),
                format!(
                    "Payment of GHS {:.2} received. Remaining balance: GHS {:.2}",
                    e.amount, e.remaining_balance
                ),
            ),
            RealtimeEvent::PaymentNotification(p) => (
                NotificationKind::Payment,
                p.title.clone().unwrap_or_else(|| "Payment Update".to_string()),
                p.message.clone(),
            ),
            RealtimeEvent::Notification(p) => (
                NotificationKind::General,
                p.title.clone().unwrap_or_else(|| "Notification".to_string()),
                p.message.clone(),
            ),
            RealtimeEvent::SystemAnnouncement(p) => (
                NotificationKind::Announcement,
                p.title
                    .clone()
                    .unwrap_or_else(|| "System Announcement".to_string()),
                p.message.clone(),
            ),
        };
        Notification {
            id: Uuid::new_v4(),
            kind,
            title,
            message,
            received_at: now,
            read: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LoanStatus,
    Payment,
    General,
    Announcement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
    pub read: bool,
}

/// Most-recent-first notification list, bounded to
/// [`NOTIFICATION_FEED_CAPACITY`] items.
#[derive(Clone, Debug)]
pub struct NotificationFeed {
    capacity: usize,
    items: VecDeque<Notification>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_capacity(NOTIFICATION_FEED_CAPACITY)
    }
}

impl NotificationFeed {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.items.push_front(notification);
        self.items.truncate(self.capacity);
    }

    pub fn items(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns false if no notification has that id.
    pub fn mark_read(&mut self, id: Uuid) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for notification in self.items.iter_mut() {
            notification.read = true;
        }
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

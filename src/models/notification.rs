// SPDX-License-Identifier: MIT

//! Notification records produced by the membership workflow.
//!
//! The engine only produces these; delivery, read state and inbox
//! pagination belong to the message subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    JoinRequested,
    RequestApproved,
    RequestRejected,
    ActivityCancelled,
}

/// A single notification event, one per affected party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub recipient_id: String,
    pub sender_id: String,
    pub kind: NotificationKind,
    pub activity_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        kind: NotificationKind,
        sender_id: &str,
        recipient_id: &str,
        activity_id: &str,
        activity_title: &str,
    ) -> Self {
        let body = match kind {
            NotificationKind::JoinRequested => {
                format!("New join request for \"{activity_title}\"")
            }
            NotificationKind::RequestApproved => {
                format!("Your request to join \"{activity_title}\" was approved")
            }
            NotificationKind::RequestRejected => {
                format!("Your request to join \"{activity_title}\" was declined")
            }
            NotificationKind::ActivityCancelled => {
                format!("Activity \"{activity_title}\" has been cancelled")
            }
        };
        Self {
            recipient_id: recipient_id.to_string(),
            sender_id: sender_id.to_string(),
            kind,
            activity_id: activity_id.to_string(),
            body,
            created_at: Utc::now(),
        }
    }
}

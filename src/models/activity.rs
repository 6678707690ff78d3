// SPDX-License-Identifier: MIT

//! Activity entity: the one record with non-trivial invariants.
//!
//! Membership state per (activity, user) pair is encoded by two disjoint
//! sets on the document: `participants` and `join_requests`. The derived
//! [`ViewerStatus`] enum is the only way callers should interpret them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an activity.
///
/// Transitions are monotonic along
/// `recruiting -> {ongoing|cancelled} -> {completed|cancelled}`;
/// `cancelled` and `completed` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Recruiting,
    Ongoing,
    Cancelled,
    Completed,
}

impl ActivityStatus {
    /// Whether no further status transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, ActivityStatus::Cancelled | ActivityStatus::Completed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: ActivityStatus) -> bool {
        use ActivityStatus::*;
        match (self, next) {
            (Recruiting, Ongoing) | (Recruiting, Cancelled) => true,
            (Ongoing, Completed) | (Ongoing, Cancelled) => true,
            _ => false,
        }
    }
}

/// Membership state of a viewer relative to an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerStatus {
    None,
    Requested,
    Joined,
}

/// Where and when the activity happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Planned duration in minutes
    pub duration_minutes: u32,
}

/// Participant capacity configuration.
///
/// `gender_limit`, `age_range` and `level_requirement` are advisory
/// eligibility filters; the engine never enforces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capacity {
    pub max_count: u32,
    pub min_count: u32,
    #[serde(default = "default_gender_limit")]
    pub gender_limit: String,
    #[serde(default = "default_age_range")]
    pub age_range: [u32; 2],
    #[serde(default = "default_level")]
    pub level_requirement: String,
}

fn default_gender_limit() -> String {
    "all".to_string()
}

fn default_age_range() -> [u32; 2] {
    [18, 60]
}

fn default_level() -> String {
    "all".to_string()
}

/// Cost of participation, opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fee {
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_pay_type")]
    pub pay_type: String,
    #[serde(default)]
    pub include_equipment: bool,
}

fn default_pay_type() -> String {
    "free".to_string()
}

impl Default for Fee {
    fn default() -> Self {
        Self {
            amount: 0.0,
            pay_type: default_pay_type(),
            include_equipment: false,
        }
    }
}

/// Stored activity document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Document ID
    pub id: String,
    /// Owner reference, immutable after creation
    pub organizer_id: String,
    pub title: String,
    pub description: String,
    /// Sport/category (badminton, running, ...)
    pub sport: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Location,
    pub schedule: Schedule,
    pub capacity: Capacity,
    #[serde(default)]
    pub fee: Fee,
    /// Enrolled users, organizer first; bounded by `capacity.max_count`
    pub participants: Vec<String>,
    /// Denormalized mirror of `participants.len()`, maintained inside the
    /// same guarded update as the set mutation it mirrors
    pub current_count: u32,
    /// Pending enrollment intents, disjoint from `participants`
    pub join_requests: Vec<String>,
    pub status: ActivityStatus,
    pub views_count: u64,
    pub likes_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Derive the membership state of `user_id` from the two sets.
    pub fn viewer_status(&self, user_id: &str) -> ViewerStatus {
        if self.participants.iter().any(|p| p == user_id) {
            ViewerStatus::Joined
        } else if self.join_requests.iter().any(|r| r == user_id) {
            ViewerStatus::Requested
        } else {
            ViewerStatus::None
        }
    }

    pub fn is_organizer(&self, user_id: &str) -> bool {
        self.organizer_id == user_id
    }

    pub fn is_full(&self) -> bool {
        self.current_count >= self.capacity.max_count
    }

    /// Verify the document-level invariants.
    ///
    /// Returns the first violated invariant as a message. Writes never
    /// produce a violating document; this is the oracle the tests use.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.status != ActivityStatus::Cancelled
            && !self.participants.iter().any(|p| *p == self.organizer_id)
        {
            return Err(format!(
                "organizer {} not in participants",
                self.organizer_id
            ));
        }
        if self.participants.len() as u32 > self.capacity.max_count {
            return Err(format!(
                "participants {} exceed max_count {}",
                self.participants.len(),
                self.capacity.max_count
            ));
        }
        if self.current_count as usize != self.participants.len() {
            return Err(format!(
                "current_count {} out of sync with participants {}",
                self.current_count,
                self.participants.len()
            ));
        }
        if let Some(dup) = self
            .join_requests
            .iter()
            .find(|r| self.participants.contains(*r))
        {
            return Err(format!("user {} in both membership sets", dup));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_activity() -> Activity {
        let now = Utc::now();
        Activity {
            id: "act-1".to_string(),
            organizer_id: "org".to_string(),
            title: "Morning run".to_string(),
            description: "Easy 5k".to_string(),
            sport: "running".to_string(),
            category: String::new(),
            cover_image: None,
            images: vec![],
            tags: vec![],
            location: Location {
                name: "Riverside".to_string(),
                address: None,
                city: Some("Shenzhen".to_string()),
            },
            schedule: Schedule {
                start_time: now + chrono::Duration::hours(2),
                end_time: now + chrono::Duration::hours(3),
                duration_minutes: 60,
            },
            capacity: Capacity {
                max_count: 4,
                min_count: 2,
                gender_limit: "all".to_string(),
                age_range: [18, 60],
                level_requirement: "all".to_string(),
            },
            fee: Fee::default(),
            participants: vec!["org".to_string()],
            current_count: 1,
            join_requests: vec![],
            status: ActivityStatus::Recruiting,
            views_count: 0,
            likes_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_transitions_are_monotonic() {
        use ActivityStatus::*;
        assert!(Recruiting.can_transition_to(Ongoing));
        assert!(Recruiting.can_transition_to(Cancelled));
        assert!(Ongoing.can_transition_to(Completed));
        assert!(Ongoing.can_transition_to(Cancelled));

        assert!(!Recruiting.can_transition_to(Completed));
        assert!(!Cancelled.can_transition_to(Recruiting));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Ongoing.can_transition_to(Recruiting));
    }

    #[test]
    fn viewer_status_derives_from_sets() {
        let mut activity = sample_activity();
        activity.join_requests.push("alice".to_string());

        assert_eq!(activity.viewer_status("org"), ViewerStatus::Joined);
        assert_eq!(activity.viewer_status("alice"), ViewerStatus::Requested);
        assert_eq!(activity.viewer_status("bob"), ViewerStatus::None);
    }

    #[test]
    fn invariants_hold_for_fresh_activity() {
        assert!(sample_activity().check_invariants().is_ok());
    }

    #[test]
    fn invariant_rejects_overlapping_sets() {
        let mut activity = sample_activity();
        activity.participants.push("alice".to_string());
        activity.current_count = 2;
        activity.join_requests.push("alice".to_string());
        assert!(activity.check_invariants().is_err());
    }

    #[test]
    fn invariant_rejects_counter_drift() {
        let mut activity = sample_activity();
        activity.current_count = 3;
        assert!(activity.check_invariants().is_err());
    }

    #[test]
    fn invariant_ignores_organizer_after_cancel() {
        let mut activity = sample_activity();
        activity.status = ActivityStatus::Cancelled;
        activity.participants.clear();
        activity.current_count = 0;
        assert!(activity.check_invariants().is_ok());
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&ActivityStatus::Recruiting).unwrap();
        assert_eq!(json, "\"recruiting\"");
    }
}

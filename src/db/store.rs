// SPDX-License-Identifier: MIT

//! Store adapter: atomic, guarded single-document operations.
//!
//! The engine never touches persistence except through [`ActivityStore`].
//! A mutation is a set of [`StoreOp`]s applied together under one guard
//! evaluation against the current document revision; the backend commits
//! all of them or none. The store has no cross-document transactions and
//! none are needed: the activity is the only contended record.

use crate::error::AppError;
use crate::models::{Activity, ActivityStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Guard predicate, evaluated against the current revision of the
/// document immediately before the ops are applied.
pub type Guard<'a> = dyn Fn(&Activity) -> Result<(), AppError> + Send + Sync + 'a;

/// Which membership set an op targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSet {
    Participants,
    JoinRequests,
}

/// Single-document mutation primitives.
///
/// `Push`/`Pull` are set semantics (no duplicates, absent pulls are
/// no-ops); `IncrementCount` adjusts the denormalized participant counter
/// and must appear in the same op set as the membership change it mirrors.
#[derive(Debug, Clone)]
pub enum StoreOp {
    SetStatus(ActivityStatus),
    Push(MemberSet, String),
    Pull(MemberSet, String),
    IncrementCount(i64),
}

/// Outcome of a guarded update attempt.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Guard held and the write committed; carries the new document.
    Applied(Activity),
    /// Guard rejected the current document state. Not retryable.
    Rejected(AppError),
    /// The document changed between read and commit. Retryable.
    Contended,
    /// No document with that id.
    Missing,
}

/// Listing filter. Empty/None fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub statuses: Vec<ActivityStatus>,
    /// Empty matches every sport; one or more entries is set membership
    pub sports: Vec<String>,
    pub city: Option<String>,
    pub starts_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
    pub organizer_id: Option<String>,
    /// Match activities whose participants contain this user
    pub participant_id: Option<String>,
    /// Exclude these ids (recommendation backfill)
    pub exclude_ids: Vec<String>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&activity.status) {
            return false;
        }
        if !self.sports.is_empty() && !self.sports.contains(&activity.sport) {
            return false;
        }
        if let Some(city) = &self.city {
            if activity.location.city.as_deref() != Some(city.as_str()) {
                return false;
            }
        }
        if let Some(after) = self.starts_after {
            if activity.schedule.start_time < after {
                return false;
            }
        }
        if let Some(before) = self.starts_before {
            if activity.schedule.start_time >= before {
                return false;
            }
        }
        if let Some(organizer) = &self.organizer_id {
            if &activity.organizer_id != organizer {
                return false;
            }
        }
        if let Some(participant) = &self.participant_id {
            if !activity.participants.contains(participant) {
                return false;
            }
        }
        if self.exclude_ids.contains(&activity.id) {
            return false;
        }
        true
    }
}

/// Stable listing orders. Ties are broken by document id so pagination
/// never straddles duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    StartTimeAsc,
    CreatedAtDesc,
    ViewsDesc,
}

/// Atomic, guarded operations against one activity document.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Store a new activity under its id.
    async fn insert(&self, activity: &Activity) -> Result<(), AppError>;

    /// Fetch the current revision of an activity.
    async fn fetch(&self, id: &str) -> Result<Option<Activity>, AppError>;

    /// Apply `ops` iff `guard` accepts the current document and the
    /// revision has not moved by commit time. Bumps `updated_at`.
    async fn guarded_apply(
        &self,
        id: &str,
        guard: &Guard<'_>,
        ops: &[StoreOp],
    ) -> Result<UpdateOutcome, AppError>;

    /// Atomically increment the view counter, returning the updated
    /// document. Monotonic and not safety-critical, so unguarded.
    async fn increment_views(&self, id: &str) -> Result<Option<Activity>, AppError>;

    /// Filtered, ordered, offset-paginated listing.
    async fn query(
        &self,
        filter: &ActivityFilter,
        order: SortOrder,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Activity>, AppError>;
}

/// Apply an op set to a document in place. Shared by all backends so the
/// semantics cannot drift between them.
pub(crate) fn apply_ops(activity: &mut Activity, ops: &[StoreOp]) {
    for op in ops {
        match op {
            StoreOp::SetStatus(status) => activity.status = *status,
            StoreOp::Push(set, user) => {
                let target = member_set_mut(activity, *set);
                if !target.iter().any(|u| u == user) {
                    target.push(user.clone());
                }
            }
            StoreOp::Pull(set, user) => {
                member_set_mut(activity, *set).retain(|u| u != user);
            }
            StoreOp::IncrementCount(delta) => {
                let count = i64::from(activity.current_count) + delta;
                activity.current_count = count.max(0) as u32;
            }
        }
    }
    activity.updated_at = Utc::now();
}

fn member_set_mut(activity: &mut Activity, set: MemberSet) -> &mut Vec<String> {
    match set {
        MemberSet::Participants => &mut activity.participants,
        MemberSet::JoinRequests => &mut activity.join_requests,
    }
}

/// Comparison function for a sort order, id as tie-break.
pub(crate) fn compare(order: SortOrder, a: &Activity, b: &Activity) -> std::cmp::Ordering {
    let primary = match order {
        SortOrder::StartTimeAsc => a.schedule.start_time.cmp(&b.schedule.start_time),
        SortOrder::CreatedAtDesc => b.created_at.cmp(&a.created_at),
        SortOrder::ViewsDesc => b.views_count.cmp(&a.views_count),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

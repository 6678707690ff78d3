// SPDX-License-Identifier: MIT

//! Membership workflow: the request/approve/reject/leave/cancel state
//! machine.
//!
//! Per (activity, user) pair the state is NONE, REQUESTED or JOINED,
//! encoded by the two disjoint membership sets. Every transition is one
//! guarded compound update through the [`GuardedUpdater`]; the guard
//! re-checks the full precondition at commit time, so retrying an
//! already-applied transition fails with Conflict instead of
//! double-applying. Notifications are emitted strictly after the commit
//! and never affect the result.

use crate::db::{ActivityStore, MemberSet, StoreOp};
use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStatus, NotificationEvent, NotificationKind, ViewerStatus};
use crate::services::directory::UserDirectory;
use crate::services::enforcer::GuardedUpdater;
use crate::services::notify::{dispatch, NotificationSink};
use std::sync::Arc;

pub struct MembershipWorkflow {
    updater: GuardedUpdater,
    directory: Arc<dyn UserDirectory>,
    sink: Arc<dyn NotificationSink>,
}

impl MembershipWorkflow {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        directory: Arc<dyn UserDirectory>,
        sink: Arc<dyn NotificationSink>,
        retry_attempts: u32,
    ) -> Self {
        Self {
            updater: GuardedUpdater::new(store, retry_attempts),
            directory,
            sink,
        }
    }

    /// NONE -> REQUESTED. The actor asks to join; the organizer is
    /// notified.
    pub async fn request_join(&self, actor_id: &str, activity_id: &str) -> Result<ViewerStatus> {
        let actor = self.directory.resolve(actor_id).await?;

        let requester = actor.id.clone();
        let guard = move |activity: &Activity| {
            require_recruiting(activity)?;
            if activity.is_organizer(&requester) {
                return Err(AppError::Conflict(
                    "cannot join your own activity".to_string(),
                ));
            }
            match activity.viewer_status(&requester) {
                ViewerStatus::Joined => {
                    return Err(AppError::Conflict("already a participant".to_string()))
                }
                ViewerStatus::Requested => {
                    return Err(AppError::Conflict("already requested to join".to_string()))
                }
                ViewerStatus::None => {}
            }
            require_free_slot(activity)
        };

        let updated = self
            .updater
            .apply(
                activity_id,
                &guard,
                &[StoreOp::Push(MemberSet::JoinRequests, actor.id.clone())],
            )
            .await?;

        tracing::info!(activity_id, actor = %actor.id, "Join requested");
        dispatch(
            self.sink.clone(),
            vec![NotificationEvent::new(
                NotificationKind::JoinRequested,
                &actor.id,
                &updated.organizer_id,
                &updated.id,
                &updated.title,
            )],
        );
        Ok(ViewerStatus::Requested)
    }

    /// REQUESTED -> JOINED. Organizer only; capacity is re-checked at
    /// commit time, so racing approvals for the last slot resolve to one
    /// winner and one Conflict.
    pub async fn approve(&self, actor_id: &str, activity_id: &str, user_id: &str) -> Result<()> {
        let actor = self.directory.resolve(actor_id).await?;
        let target = self.directory.resolve(user_id).await?;

        let caller = actor.id.clone();
        let candidate = target.id.clone();
        let guard = move |activity: &Activity| {
            if !activity.is_organizer(&caller) {
                return Err(AppError::Forbidden(
                    "only the organizer can approve requests".to_string(),
                ));
            }
            require_recruiting(activity)?;
            if !activity.join_requests.contains(&candidate) {
                return Err(AppError::Conflict(
                    "user has no pending join request".to_string(),
                ));
            }
            require_free_slot(activity)
        };

        let updated = self
            .updater
            .apply(
                activity_id,
                &guard,
                &[
                    StoreOp::Pull(MemberSet::JoinRequests, target.id.clone()),
                    StoreOp::Push(MemberSet::Participants, target.id.clone()),
                    StoreOp::IncrementCount(1),
                ],
            )
            .await?;

        tracing::info!(
            activity_id,
            approved = %target.id,
            count = updated.current_count,
            "Join request approved"
        );
        dispatch(
            self.sink.clone(),
            vec![NotificationEvent::new(
                NotificationKind::RequestApproved,
                &actor.id,
                &target.id,
                &updated.id,
                &updated.title,
            )],
        );
        Ok(())
    }

    /// REQUESTED -> NONE. Organizer only. Rejecting a user without a
    /// pending request is a Conflict and never mutates state.
    pub async fn reject(&self, actor_id: &str, activity_id: &str, user_id: &str) -> Result<()> {
        let actor = self.directory.resolve(actor_id).await?;
        let target = self.directory.resolve(user_id).await?;

        let caller = actor.id.clone();
        let candidate = target.id.clone();
        let guard = move |activity: &Activity| {
            if !activity.is_organizer(&caller) {
                return Err(AppError::Forbidden(
                    "only the organizer can reject requests".to_string(),
                ));
            }
            require_recruiting(activity)?;
            if !activity.join_requests.contains(&candidate) {
                return Err(AppError::Conflict(
                    "user has no pending join request".to_string(),
                ));
            }
            Ok(())
        };

        let updated = self
            .updater
            .apply(
                activity_id,
                &guard,
                &[StoreOp::Pull(MemberSet::JoinRequests, target.id.clone())],
            )
            .await?;

        tracing::info!(activity_id, rejected = %target.id, "Join request rejected");
        dispatch(
            self.sink.clone(),
            vec![NotificationEvent::new(
                NotificationKind::RequestRejected,
                &actor.id,
                &target.id,
                &updated.id,
                &updated.title,
            )],
        );
        Ok(())
    }

    /// JOINED -> NONE. The organizer cannot leave their own activity.
    pub async fn leave(&self, actor_id: &str, activity_id: &str) -> Result<ViewerStatus> {
        let actor = self.directory.resolve(actor_id).await?;

        let caller = actor.id.clone();
        let guard = move |activity: &Activity| {
            if activity.is_organizer(&caller) {
                return Err(AppError::Conflict(
                    "the organizer cannot leave their own activity".to_string(),
                ));
            }
            require_recruiting(activity)?;
            if !activity.participants.contains(&caller) {
                return Err(AppError::Conflict("not a participant".to_string()));
            }
            Ok(())
        };

        self.updater
            .apply(
                activity_id,
                &guard,
                &[
                    StoreOp::Pull(MemberSet::Participants, actor.id.clone()),
                    StoreOp::IncrementCount(-1),
                ],
            )
            .await?;

        tracing::info!(activity_id, left = %actor.id, "Participant left");
        Ok(ViewerStatus::None)
    }

    /// Any non-terminal state -> CANCELLED. Organizer only. Freezes both
    /// membership sets permanently and fans out one notification per
    /// participant except the organizer.
    pub async fn cancel(&self, actor_id: &str, activity_id: &str) -> Result<()> {
        let actor = self.directory.resolve(actor_id).await?;

        let caller = actor.id.clone();
        let guard = move |activity: &Activity| {
            if !activity.is_organizer(&caller) {
                return Err(AppError::Forbidden(
                    "only the organizer can cancel the activity".to_string(),
                ));
            }
            if !activity.status.can_transition_to(ActivityStatus::Cancelled) {
                return Err(AppError::Conflict(format!(
                    "activity is already {:?}",
                    activity.status
                )));
            }
            Ok(())
        };

        let updated = self
            .updater
            .apply(
                activity_id,
                &guard,
                &[StoreOp::SetStatus(ActivityStatus::Cancelled)],
            )
            .await?;

        tracing::info!(
            activity_id,
            participants = updated.participants.len(),
            "Activity cancelled"
        );

        let events: Vec<NotificationEvent> = updated
            .participants
            .iter()
            .filter(|p| **p != updated.organizer_id)
            .map(|participant| {
                NotificationEvent::new(
                    NotificationKind::ActivityCancelled,
                    &actor.id,
                    participant,
                    &updated.id,
                    &updated.title,
                )
            })
            .collect();
        dispatch(self.sink.clone(), events);
        Ok(())
    }
}

fn require_recruiting(activity: &Activity) -> Result<()> {
    if activity.status != ActivityStatus::Recruiting {
        return Err(AppError::Conflict(format!(
            "activity is not recruiting (status {:?})",
            activity.status
        )));
    }
    Ok(())
}

fn require_free_slot(activity: &Activity) -> Result<()> {
    if activity.is_full() {
        return Err(AppError::Conflict("activity is full".to_string()));
    }
    Ok(())
}

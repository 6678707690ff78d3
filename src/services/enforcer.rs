// SPDX-License-Identifier: MIT

//! Optimistic-retry wrapper over guarded store updates.
//!
//! Every mutation of participants, join requests or status flows through
//! [`GuardedUpdater::apply`]. Contended commits and transient store
//! failures are retried a bounded number of times with jittered backoff;
//! a guard rejection is final and returned immediately. This is what
//! keeps `|participants| <= max_count` true under arbitrary concurrent
//! callers: the loser of a race over the last slot gets a Conflict
//! instead of a silently oversubscribed activity.

use crate::db::{ActivityStore, StoreOp, UpdateOutcome};
use crate::db::store::Guard;
use crate::error::AppError;
use crate::models::Activity;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

const BACKOFF_BASE_MS: u64 = 10;
const BACKOFF_JITTER_MS: u64 = 10;

pub struct GuardedUpdater {
    store: Arc<dyn ActivityStore>,
    max_attempts: u32,
}

impl GuardedUpdater {
    pub fn new(store: Arc<dyn ActivityStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Apply `ops` to the activity under `guard`, retrying contention.
    ///
    /// Returns the updated document on success. `NotFound` if the id does
    /// not resolve, the guard's error if it rejects, `Conflict` once the
    /// retry budget is exhausted.
    pub async fn apply(
        &self,
        activity_id: &str,
        guard: &Guard<'_>,
        ops: &[StoreOp],
    ) -> Result<Activity, AppError> {
        let mut last_store_error = None;

        for attempt in 1..=self.max_attempts {
            match self.store.guarded_apply(activity_id, guard, ops).await {
                Ok(UpdateOutcome::Applied(activity)) => return Ok(activity),
                Ok(UpdateOutcome::Rejected(denied)) => return Err(denied),
                Ok(UpdateOutcome::Missing) => {
                    return Err(AppError::NotFound(activity_id.to_string()))
                }
                Ok(UpdateOutcome::Contended) => {
                    tracing::debug!(activity_id, attempt, "Guarded update contended, retrying");
                }
                Err(e @ AppError::Store(_)) => {
                    // Transient I/O failure: eligible for the same bounded retry.
                    tracing::warn!(activity_id, attempt, error = %e, "Store error during guarded update");
                    last_store_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(backoff(attempt)).await;
            }
        }

        match last_store_error {
            Some(e) => Err(e),
            None => Err(AppError::Conflict(
                "operation lost a concurrent update race, please retry".to_string(),
            )),
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(0..BACKOFF_JITTER_MS);
    Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt) + jitter)
}

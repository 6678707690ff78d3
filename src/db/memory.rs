// SPDX-License-Identifier: MIT

//! In-process store backend.
//!
//! Backs tests and local development. Documents carry a revision counter;
//! a guarded update reads a snapshot, evaluates the guard against it, then
//! commits only if the revision is still the one it read. This mirrors
//! the optimistic-concurrency behavior of the Firestore backend, so the
//! retry paths are exercised the same way in both.

use crate::db::store::{
    apply_ops, compare, ActivityFilter, ActivityStore, Guard, SortOrder, StoreOp, UpdateOutcome,
};
use crate::error::AppError;
use crate::models::Activity;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Clone)]
struct Versioned {
    revision: u64,
    activity: Activity,
}

/// DashMap-backed activity store.
#[derive(Default)]
pub struct MemoryStore {
    documents: DashMap<String, Versioned>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn insert(&self, activity: &Activity) -> Result<(), AppError> {
        self.documents.insert(
            activity.id.clone(),
            Versioned {
                revision: 0,
                activity: activity.clone(),
            },
        );
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Activity>, AppError> {
        Ok(self.documents.get(id).map(|doc| doc.activity.clone()))
    }

    async fn guarded_apply(
        &self,
        id: &str,
        guard: &Guard<'_>,
        ops: &[StoreOp],
    ) -> Result<UpdateOutcome, AppError> {
        // Snapshot read: guard evaluation happens outside the entry lock,
        // exactly as a remote read-verify-write would.
        let snapshot = match self.documents.get(id) {
            Some(doc) => doc.clone(),
            None => return Ok(UpdateOutcome::Missing),
        };

        if let Err(denied) = guard(&snapshot.activity) {
            return Ok(UpdateOutcome::Rejected(denied));
        }

        let mut entry = match self.documents.get_mut(id) {
            Some(entry) => entry,
            None => return Ok(UpdateOutcome::Missing),
        };
        if entry.revision != snapshot.revision {
            return Ok(UpdateOutcome::Contended);
        }

        apply_ops(&mut entry.activity, ops);
        entry.revision += 1;
        Ok(UpdateOutcome::Applied(entry.activity.clone()))
    }

    async fn increment_views(&self, id: &str) -> Result<Option<Activity>, AppError> {
        match self.documents.get_mut(id) {
            Some(mut entry) => {
                entry.activity.views_count += 1;
                entry.revision += 1;
                Ok(Some(entry.activity.clone()))
            }
            None => Ok(None),
        }
    }

    async fn query(
        &self,
        filter: &ActivityFilter,
        order: SortOrder,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Activity>, AppError> {
        let mut matches: Vec<Activity> = self
            .documents
            .iter()
            .filter(|doc| filter.matches(&doc.activity))
            .map(|doc| doc.activity.clone())
            .collect();
        matches.sort_by(|a, b| compare(order, a, b));
        Ok(matches.into_iter().skip(skip).take(limit).collect())
    }
}

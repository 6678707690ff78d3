// SPDX-License-Identifier: MIT

//! Firestore-backed store adapter.
//!
//! Guarded updates are expressed as transactions: read the document inside
//! the transaction, evaluate the guard client-side, stage the write and
//! commit. A commit rejected because the document moved surfaces as
//! [`UpdateOutcome::Contended`] and is retried by the caller.

use crate::db::collections;
use crate::db::store::{
    apply_ops, ActivityFilter, ActivityStore, Guard, SortOrder, StoreOp, UpdateOutcome,
};
use crate::error::AppError;
use crate::models::Activity;
use async_trait::async_trait;

/// Connect to Firestore.
///
/// For local development with the emulator, set FIRESTORE_EMULATOR_HOST.
pub async fn connect(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
    // If the emulator environment variable is set, use an unauthenticated
    // connection to avoid local credential warnings and leakage.
    if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
        return connect_emulator(project_id).await;
    }

    let client = firestore::FirestoreDb::new(project_id)
        .await
        .map_err(|e| AppError::Store(format!("Failed to connect to Firestore: {}", e)))?;

    tracing::info!(project = project_id, "Connected to Firestore");
    Ok(client)
}

async fn connect_emulator(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
    tracing::info!("Using unauthenticated connection for Firestore Emulator");

    let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
        Ok(gcloud_sdk::Token {
            token_type: "Bearer".to_string(),
            token: gcloud_sdk::SecretValue::new(
                "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                    .to_string()
                    .into(),
            ),
            expiry: chrono::Utc::now() + chrono::Duration::hours(1),
        })
    });

    let options = firestore::FirestoreDbOptions::new(project_id.to_string());

    let client = firestore::FirestoreDb::with_options_token_source(
        options,
        gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
    )
    .await
    .map_err(|e| AppError::Store(format!("Failed to connect to Firestore Emulator: {}", e)))?;

    tracing::info!(project = project_id, "Connected to Firestore (Emulator)");
    Ok(client)
}

const VIEW_COMMIT_ATTEMPTS: u32 = 3;

/// Firestore activity store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    pub fn new(client: firestore::FirestoreDb) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActivityStore for FirestoreStore {
    async fn insert(&self, activity: &Activity) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Activity>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }

    async fn guarded_apply(
        &self,
        id: &str,
        guard: &Guard<'_>,
        ops: &[StoreOp],
    ) -> Result<UpdateOutcome, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

        // The read must carry the transaction's consistency selector so the
        // document lands in the transaction's read set; only then does the
        // commit fail when a concurrent writer moved the document.
        let current: Option<Activity> = self
            .client
            .clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Store(format!("Failed to read in transaction: {}", e)))?;

        let Some(mut activity) = current else {
            let _ = transaction.rollback().await;
            return Ok(UpdateOutcome::Missing);
        };

        if let Err(denied) = guard(&activity) {
            let _ = transaction.rollback().await;
            return Ok(UpdateOutcome::Rejected(denied));
        }

        apply_ops(&mut activity, ops);

        self.client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(id)
            .object(&activity)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Store(format!("Failed to stage write: {}", e)))?;

        match transaction.commit().await {
            Ok(_) => Ok(UpdateOutcome::Applied(activity)),
            Err(e) => {
                // Concurrent modification; the caller retries with a fresh read.
                tracing::debug!(activity_id = id, error = %e, "Guarded update contended");
                Ok(UpdateOutcome::Contended)
            }
        }
    }

    async fn increment_views(&self, id: &str) -> Result<Option<Activity>, AppError> {
        // The counter write conflicts with concurrent bumps of the same
        // document, so a failed commit is re-read and retried a few times.
        for _ in 0..VIEW_COMMIT_ATTEMPTS {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Store(format!("Failed to begin transaction: {}", e)))?;

            let current: Option<Activity> = self
                .client
                .clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ))
                .fluent()
                .select()
                .by_id_in(collections::ACTIVITIES)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Store(e.to_string()))?;

            let Some(mut activity) = current else {
                let _ = transaction.rollback().await;
                return Ok(None);
            };

            activity.views_count += 1;

            self.client
                .fluent()
                .update()
                .in_col(collections::ACTIVITIES)
                .document_id(id)
                .object(&activity)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Store(format!("Failed to stage write: {}", e)))?;

            match transaction.commit().await {
                Ok(_) => return Ok(Some(activity)),
                Err(e) => {
                    tracing::debug!(activity_id = id, error = %e, "View counter commit contended");
                }
            }
        }

        Err(AppError::Store(format!(
            "view counter for {id} stayed contended"
        )))
    }

    async fn query(
        &self,
        filter: &ActivityFilter,
        order: SortOrder,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Activity>, AppError> {
        let (order_field, direction) = match order {
            SortOrder::StartTimeAsc => (
                "schedule.start_time",
                firestore::FirestoreQueryDirection::Ascending,
            ),
            SortOrder::CreatedAtDesc => {
                ("created_at", firestore::FirestoreQueryDirection::Descending)
            }
            SortOrder::ViewsDesc => ("views_count", firestore::FirestoreQueryDirection::Descending),
        };

        // The server query covers only the single-valued conditions; status
        // sets, preference lists and id exclusions are screened client-side.
        // Both `skip` and `limit` count screened matches, so the loop walks
        // the server superset in batches until enough matches are collected
        // or the superset runs out.
        let needed = skip + limit;
        let batch_size = needed + filter.exclude_ids.len();
        let mut matches: Vec<Activity> = Vec::with_capacity(needed);
        let mut cursor = 0usize;

        loop {
            let server_filter = filter.clone();
            let fetched: Vec<Activity> = self
                .client
                .fluent()
                .select()
                .from(collections::ACTIVITIES)
                .filter(move |q| {
                    let mut conditions = Vec::new();
                    if server_filter.statuses.len() == 1 {
                        conditions.push(
                            q.field("status")
                                .eq(status_literal(server_filter.statuses[0])),
                        );
                    }
                    if server_filter.sports.len() == 1 {
                        conditions.push(q.field("sport").eq(server_filter.sports[0].clone()));
                    }
                    if let Some(city) = &server_filter.city {
                        conditions.push(q.field("location.city").eq(city.clone()));
                    }
                    if let Some(after) = server_filter.starts_after {
                        conditions.push(
                            q.field("schedule.start_time")
                                .greater_than_or_equal(after.to_rfc3339()),
                        );
                    }
                    if let Some(before) = server_filter.starts_before {
                        conditions
                            .push(q.field("schedule.start_time").less_than(before.to_rfc3339()));
                    }
                    if let Some(organizer) = &server_filter.organizer_id {
                        conditions.push(q.field("organizer_id").eq(organizer.clone()));
                    }
                    if let Some(participant) = &server_filter.participant_id {
                        conditions
                            .push(q.field("participants").array_contains(participant.clone()));
                    }
                    q.for_all(conditions)
                })
                .order_by([(order_field, direction.clone())])
                .offset(cursor as u32)
                .limit(batch_size as u32)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Store(e.to_string()))?;

            let fetched_len = fetched.len();
            matches.extend(fetched.into_iter().filter(|a| filter.matches(a)));

            if matches.len() >= needed || fetched_len < batch_size {
                break;
            }
            cursor += fetched_len;
        }

        Ok(matches.into_iter().skip(skip).take(limit).collect())
    }
}

fn status_literal(status: crate::models::ActivityStatus) -> String {
    // Matches the serde lowercase representation stored in the document.
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

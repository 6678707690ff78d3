// SPDX-License-Identifier: MIT

//! Notification sink collaborator.
//!
//! Emission is fire-and-forget, at-most-once, and happens strictly after
//! the state mutation commits. A sink failure is logged and never rolls
//! back or blocks the primary operation.

use crate::db::collections;
use crate::error::AppError;
use crate::models::NotificationEvent;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_EMITS: usize = 50;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: NotificationEvent) -> Result<(), AppError>;
}

/// Dispatch a batch of events in the background with bounded concurrency.
///
/// Returns immediately; failures are logged per event.
pub fn dispatch(sink: Arc<dyn NotificationSink>, events: Vec<NotificationEvent>) {
    if events.is_empty() {
        return;
    }
    tokio::spawn(async move {
        stream::iter(events)
            .for_each_concurrent(MAX_CONCURRENT_EMITS, |event| {
                let sink = sink.clone();
                async move {
                    let recipient = event.recipient_id.clone();
                    let kind = event.kind;
                    if let Err(e) = sink.emit(event).await {
                        tracing::warn!(
                            recipient = %recipient,
                            kind = ?kind,
                            error = %e,
                            "Notification emit failed"
                        );
                    }
                }
            })
            .await;
    });
}

/// Sink that writes notification records to the `messages` collection.
#[derive(Clone)]
pub struct FirestoreSink {
    client: firestore::FirestoreDb,
}

impl FirestoreSink {
    pub fn new(client: firestore::FirestoreDb) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationSink for FirestoreSink {
    async fn emit(&self, event: NotificationEvent) -> Result<(), AppError> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::MESSAGES)
            .document_id(&doc_id)
            .object(&event)
            .execute()
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        Ok(())
    }
}

/// Capturing sink for tests and local development.
#[derive(Default)]
pub struct MemorySink {
    events: std::sync::Mutex<Vec<NotificationEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn recorded(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("sink poisoned").clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn emit(&self, event: NotificationEvent) -> Result<(), AppError> {
        self.events.lock().expect("sink poisoned").push(event);
        Ok(())
    }
}

// SPDX-License-Identifier: MIT

//! User directory collaborator.
//!
//! Profile storage is an external concern; the engine only needs to
//! resolve an actor id into a [`UserRef`] and to embed display summaries
//! in responses. An unresolvable actor is a 4004.

use crate::db::collections;
use crate::error::AppError;
use crate::models::UserRef;
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id. `Ok(None)` means the id is unknown.
    async fn lookup(&self, user_id: &str) -> Result<Option<UserRef>, AppError>;

    /// Resolve an actor id, failing with `UnknownUser` if absent.
    async fn resolve(&self, user_id: &str) -> Result<UserRef, AppError> {
        self.lookup(user_id)
            .await?
            .ok_or_else(|| AppError::UnknownUser(user_id.to_string()))
    }
}

/// In-process directory used by tests and local development.
#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<String, UserRef>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user: UserRef) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserRef>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.clone()))
    }
}

/// Directory backed by the `users` collection.
#[derive(Clone)]
pub struct FirestoreDirectory {
    client: firestore::FirestoreDb,
}

impl FirestoreDirectory {
    pub fn new(client: firestore::FirestoreDb) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserDirectory for FirestoreDirectory {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserRef>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Store(e.to_string()))
    }
}

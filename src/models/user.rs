// SPDX-License-Identifier: MIT

//! User reference as seen by the engine.
//!
//! Identity and profile storage live elsewhere; the engine only stores and
//! compares user ids, plus the few display fields it embeds in responses.

use serde::{Deserialize, Serialize};

/// Resolved user reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    /// Preferred sports, used by the recommendation primary tier
    #[serde(default)]
    pub sports_preferences: Vec<String>,
}

impl UserRef {
    /// Compact profile embedded in activity views.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            nickname: self.nickname.clone(),
            avatar: self.avatar.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// Display subset of a user, embedded in list/detail responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub nickname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub is_verified: bool,
}

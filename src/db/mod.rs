//! Persistence layer: the store adapter and its backends.

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use store::{ActivityFilter, ActivityStore, MemberSet, SortOrder, StoreOp, UpdateOutcome};

/// Collection names as constants.
pub mod collections {
    pub const ACTIVITIES: &str = "activities";
    pub const USERS: &str = "users";
    /// Notification records produced by the workflow
    pub const MESSAGES: &str = "messages";
}

// SPDX-License-Identifier: MIT

//! Business services built on the store adapter.

pub mod directory;
pub mod enforcer;
pub mod membership;
pub mod notify;
pub mod registry;

pub use directory::{FirestoreDirectory, MemoryDirectory, UserDirectory};
pub use enforcer::GuardedUpdater;
pub use membership::MembershipWorkflow;
pub use notify::{FirestoreSink, MemorySink, NotificationSink};
pub use registry::ActivityRegistry;

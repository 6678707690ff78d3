// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod activity;
pub mod notification;
pub mod user;

pub use activity::{Activity, ActivityStatus, Capacity, Fee, Location, Schedule, ViewerStatus};
pub use notification::{NotificationEvent, NotificationKind};
pub use user::{UserRef, UserSummary};

// SPDX-License-Identifier: MIT

//! Sportmate: activity membership and lifecycle engine.
//!
//! Creates capacity-bounded group activities and mediates the two-phase
//! request/approve enrollment workflow, organizer-only cancellation and
//! fan-out notification of state changes. All contended writes go through
//! guarded single-document updates with bounded optimistic retry.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::{ActivityRegistry, MembershipWorkflow};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub registry: ActivityRegistry,
    pub workflow: MembershipWorkflow,
}

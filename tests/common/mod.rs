// SPDX-License-Identifier: MIT

use sportmate::config::Config;
use sportmate::db::MemoryStore;
use sportmate::models::{Capacity, Fee, Location, Schedule, UserRef};
use sportmate::routes::create_router;
use sportmate::services::registry::CreateActivity;
use sportmate::services::{
    ActivityRegistry, MembershipWorkflow, MemoryDirectory, MemorySink,
};
use sportmate::AppState;
use std::sync::Arc;

/// Check if the Firestore emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if the emulator is not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Memory-backed application plus handles to the store collaborators.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub sink: Arc<MemorySink>,
    pub state: Arc<AppState>,
}

/// Build a memory-backed app with a few seeded users.
///
/// Seeded ids: `org` (tennis preference), `alice`, `bob`, `carol`.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, TestHarness) {
    let config = Config::test_default();
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let sink = Arc::new(MemorySink::new());

    for (id, nickname, prefs) in [
        ("org", "Organizer", vec!["tennis"]),
        ("alice", "Alice", vec![]),
        ("bob", "Bob", vec!["running"]),
        ("carol", "Carol", vec![]),
    ] {
        directory.add(UserRef {
            id: id.to_string(),
            nickname: nickname.to_string(),
            avatar: None,
            is_verified: false,
            sports_preferences: prefs.into_iter().map(str::to_string).collect(),
        });
    }

    let registry = ActivityRegistry::new(
        store.clone(),
        directory.clone(),
        config.default_page_size,
        config.max_page_size,
    );
    let workflow = MembershipWorkflow::new(
        store.clone(),
        directory.clone(),
        sink.clone(),
        config.update_retry_attempts,
    );

    let state = Arc::new(AppState {
        config,
        registry,
        workflow,
    });

    let harness = TestHarness {
        store,
        directory,
        sink,
        state: state.clone(),
    };

    (create_router(state), harness)
}

/// A valid creation payload starting one hour from now.
#[allow(dead_code)]
pub fn sample_create(sport: &str, max_count: u32) -> CreateActivity {
    let now = chrono::Utc::now();
    CreateActivity {
        title: format!("{sport} meetup"),
        description: "Casual game, all levels welcome".to_string(),
        sport: sport.to_string(),
        category: String::new(),
        cover_image: None,
        images: vec![],
        tags: vec!["social".to_string()],
        location: Location {
            name: "City park".to_string(),
            address: None,
            city: Some("Springfield".to_string()),
        },
        schedule: Schedule {
            start_time: now + chrono::Duration::hours(1),
            end_time: now + chrono::Duration::hours(3),
            duration_minutes: 120,
        },
        capacity: Capacity {
            max_count,
            min_count: 2.min(max_count),
            gender_limit: "all".to_string(),
            age_range: [18, 60],
            level_requirement: "all".to_string(),
        },
        fee: Fee::default(),
    }
}

/// Wait until the background notification dispatch has delivered
/// `expected` events, or fail after a short budget.
#[allow(dead_code)]
pub async fn await_notifications(sink: &MemorySink, expected: usize) {
    for _ in 0..100 {
        if sink.recorded().len() >= expected {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!(
        "expected {expected} notifications, got {}",
        sink.recorded().len()
    );
}

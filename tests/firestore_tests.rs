// SPDX-License-Identifier: MIT

//! Firestore backend tests.
//!
//! These require the Firestore emulator; set FIRESTORE_EMULATOR_HOST.
//! Each test works on freshly inserted documents with uuid ids so runs
//! are isolated from each other.

use chrono::Utc;
use sportmate::db::{
    ActivityFilter, ActivityStore, FirestoreStore, MemberSet, SortOrder, StoreOp,
};
use sportmate::error::AppError;
use sportmate::models::{
    Activity, ActivityStatus, Capacity, Fee, Location, Schedule,
};
use sportmate::services::GuardedUpdater;
use std::sync::Arc;

mod common;

async fn test_store() -> FirestoreStore {
    let client = sportmate::db::firestore::connect("test-project")
        .await
        .expect("Failed to connect to Firestore emulator");
    FirestoreStore::new(client)
}

fn test_activity(sport: &str, max_count: u32, start_offset_hours: i64) -> Activity {
    let now = Utc::now();
    Activity {
        id: uuid::Uuid::new_v4().to_string(),
        organizer_id: "org".to_string(),
        title: format!("{sport} meetup"),
        description: "d".to_string(),
        sport: sport.to_string(),
        category: String::new(),
        cover_image: None,
        images: vec![],
        tags: vec![],
        location: Location {
            name: "court".to_string(),
            address: None,
            city: None,
        },
        schedule: Schedule {
            start_time: now + chrono::Duration::hours(start_offset_hours),
            end_time: now + chrono::Duration::hours(start_offset_hours + 1),
            duration_minutes: 60,
        },
        capacity: Capacity {
            max_count,
            min_count: 2.min(max_count),
            gender_limit: "all".to_string(),
            age_range: [18, 60],
            level_requirement: "all".to_string(),
        },
        fee: Fee::default(),
        participants: vec!["org".to_string()],
        current_count: 1,
        join_requests: vec![],
        status: ActivityStatus::Recruiting,
        views_count: 0,
        likes_count: 0,
        created_at: now,
        updated_at: now,
    }
}

fn free_slot_guard(activity: &Activity) -> Result<(), AppError> {
    if activity.is_full() {
        return Err(AppError::Conflict("activity is full".to_string()));
    }
    Ok(())
}

fn enroll_ops(user: &str) -> Vec<StoreOp> {
    vec![
        StoreOp::Push(MemberSet::Participants, user.to_string()),
        StoreOp::IncrementCount(1),
    ]
}

#[tokio::test]
async fn concurrent_guarded_updates_preserve_both_writes() {
    require_emulator!();
    let store = Arc::new(test_store().await);
    let activity = test_activity("tennis", 4, 1);
    store.insert(&activity).await.unwrap();

    // Both writers fit; if the commit were not conditioned on the read,
    // the overlapping full-document writes would erase one enrollment.
    let updater = Arc::new(GuardedUpdater::new(store.clone(), 5));
    let mut handles = Vec::new();
    for user in ["alice", "bob"] {
        let updater = updater.clone();
        let id = activity.id.clone();
        handles.push(tokio::spawn(async move {
            updater.apply(&id, &free_slot_guard, &enroll_ops(user)).await
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked").unwrap();
    }

    let final_state = store.fetch(&activity.id).await.unwrap().unwrap();
    assert_eq!(final_state.current_count, 3);
    assert!(final_state.participants.contains(&"alice".to_string()));
    assert!(final_state.participants.contains(&"bob".to_string()));
    final_state.check_invariants().unwrap();
}

#[tokio::test]
async fn racing_enrollments_for_last_slot_yield_one_winner() {
    require_emulator!();
    let store = Arc::new(test_store().await);
    // maxCount=2: the organizer plus exactly one free slot.
    let activity = test_activity("tennis", 2, 1);
    store.insert(&activity).await.unwrap();

    let updater = Arc::new(GuardedUpdater::new(store.clone(), 5));
    let mut handles = Vec::new();
    for user in ["alice", "bob"] {
        let updater = updater.clone();
        let id = activity.id.clone();
        handles.push(tokio::spawn(async move {
            updater.apply(&id, &free_slot_guard, &enroll_ops(user)).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => winners += 1,
            Err(e) => assert!(matches!(e, AppError::Conflict(_))),
        }
    }
    assert_eq!(winners, 1, "exactly one enrollment must win the last slot");

    let final_state = store.fetch(&activity.id).await.unwrap().unwrap();
    assert_eq!(final_state.current_count, 2);
    assert_eq!(final_state.participants.len(), 2);
    final_state.check_invariants().unwrap();
}

#[tokio::test]
async fn concurrent_view_increments_all_count() {
    require_emulator!();
    let store = Arc::new(test_store().await);
    let activity = test_activity("tennis", 4, 1);
    store.insert(&activity).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let id = activity.id.clone();
        handles.push(tokio::spawn(async move { store.increment_views(&id).await }));
    }
    for handle in handles {
        handle.await.expect("task panicked").unwrap().unwrap();
    }

    let final_state = store.fetch(&activity.id).await.unwrap().unwrap();
    assert_eq!(final_state.views_count, 2);
}

#[tokio::test]
async fn query_counts_skip_and_limit_against_screened_matches() {
    require_emulator!();
    let store = test_store().await;

    // Unique sport isolates this test's documents; the two-status filter
    // forces client-side screening past the server query.
    let sport = format!("sport-{}", uuid::Uuid::new_v4());
    let plan = [
        (1, ActivityStatus::Recruiting),
        (2, ActivityStatus::Cancelled),
        (3, ActivityStatus::Ongoing),
        (4, ActivityStatus::Cancelled),
        (5, ActivityStatus::Recruiting),
        (6, ActivityStatus::Recruiting),
    ];
    let mut ids_by_offset = Vec::new();
    for (offset, status) in plan {
        let mut activity = test_activity(&sport, 4, offset);
        activity.status = status;
        store.insert(&activity).await.unwrap();
        ids_by_offset.push((offset, activity.id));
    }
    let id_at = |offset: i64| -> String {
        ids_by_offset
            .iter()
            .find(|(o, _)| *o == offset)
            .unwrap()
            .1
            .clone()
    };

    let filter = ActivityFilter {
        statuses: vec![ActivityStatus::Recruiting, ActivityStatus::Ongoing],
        sports: vec![sport.clone()],
        ..Default::default()
    };

    // Matching in start-time order: offsets 1, 3, 5, 6.
    let first = store
        .query(&filter, SortOrder::StartTimeAsc, 0, 2)
        .await
        .unwrap();
    let first_ids: Vec<String> = first.iter().map(|a| a.id.clone()).collect();
    assert_eq!(first_ids, vec![id_at(1), id_at(3)], "screened-out documents must not shrink the page");

    let second = store
        .query(&filter, SortOrder::StartTimeAsc, 2, 2)
        .await
        .unwrap();
    let second_ids: Vec<String> = second.iter().map(|a| a.id.clone()).collect();
    assert_eq!(second_ids, vec![id_at(5), id_at(6)], "skip must count matches, not superset rows");

    let past_end = store
        .query(&filter, SortOrder::StartTimeAsc, 4, 2)
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

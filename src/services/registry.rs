// SPDX-License-Identifier: MIT

//! Activity registry: creation and the read path.
//!
//! Independent of the membership workflow but shares the entity and the
//! store adapter. Listing order: upcoming-first by start time, except the
//! organizer's own view (newest created first) and the recommendation
//! backfill tier (most viewed first). Pagination is offset-based with
//! `has_more = (returned == page_size)` as the continuation signal.

use crate::db::{ActivityFilter, ActivityStore, SortOrder};
use crate::error::{AppError, Result};
use crate::models::{
    Activity, ActivityStatus, Capacity, Fee, Location, Schedule, UserSummary, ViewerStatus,
};
use crate::services::directory::UserDirectory;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Caller-supplied activity definition.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub description: String,
    #[validate(length(min = 1, max = 50))]
    pub sport: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Location,
    pub schedule: Schedule,
    pub capacity: Capacity,
    #[serde(default)]
    pub fee: Fee,
}

/// Pagination input shared by all listing actions.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: Option<u32>,
}

fn default_page() -> u32 {
    1
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: None,
        }
    }
}

/// Listing filter input.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilters {
    /// "recruiting" (default), "ongoing" or "all"
    #[serde(default)]
    pub status: Option<String>,
    /// Specific sport, or "all"
    #[serde(default)]
    pub sport: Option<String>,
    /// "today", "week" or "all"
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// One activity as rendered in listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub sport: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub location: Location,
    pub schedule: Schedule,
    pub capacity: Capacity,
    pub current_count: u32,
    pub fee: Fee,
    pub tags: Vec<String>,
    pub status: ActivityStatus,
    pub views_count: u64,
    pub likes_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_status: Option<ViewerStatus>,
    /// Pending request count, organizer's own listing only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_requests_count: Option<u32>,
}

/// Full activity view returned by `detail`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetail {
    #[serde(flatten)]
    pub item: ActivityItem,
    pub category: String,
    pub images: Vec<String>,
    pub participants_info: Vec<UserSummary>,
    /// Pending requester profiles, surfaced only to the organizer
    pub join_requests: Vec<UserSummary>,
    pub is_organizer: bool,
}

/// One page of activities plus a cheap continuation signal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub activities: Vec<ActivityItem>,
    pub has_more: bool,
}

pub struct ActivityRegistry {
    store: Arc<dyn ActivityStore>,
    directory: Arc<dyn UserDirectory>,
    default_page_size: u32,
    max_page_size: u32,
}

impl ActivityRegistry {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        directory: Arc<dyn UserDirectory>,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        Self {
            store,
            directory,
            default_page_size,
            max_page_size,
        }
    }

    fn page_window(&self, paging: &Paging) -> (usize, usize) {
        let page = paging.page.max(1);
        let size = paging
            .page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        (((page - 1) * size) as usize, size as usize)
    }

    /// Create an activity. The organizer is auto-enrolled as the first
    /// participant and the activity starts recruiting.
    pub async fn create(&self, actor_id: &str, spec: CreateActivity) -> Result<Activity> {
        let organizer = self.directory.resolve(actor_id).await?;

        spec.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let now = Utc::now();
        if spec.schedule.start_time <= now {
            return Err(AppError::Validation(
                "start time must be in the future".to_string(),
            ));
        }
        if spec.schedule.end_time < spec.schedule.start_time {
            return Err(AppError::Validation(
                "end time must not precede start time".to_string(),
            ));
        }
        if spec.capacity.min_count < 1 || spec.capacity.max_count < spec.capacity.min_count {
            return Err(AppError::Validation(
                "capacity requires 1 <= min_count <= max_count".to_string(),
            ));
        }

        let activity = Activity {
            id: uuid::Uuid::new_v4().to_string(),
            organizer_id: organizer.id.clone(),
            title: spec.title,
            description: spec.description,
            sport: spec.sport,
            category: spec.category,
            cover_image: spec.cover_image,
            images: spec.images,
            tags: spec.tags,
            location: spec.location,
            schedule: spec.schedule,
            capacity: spec.capacity,
            fee: spec.fee,
            participants: vec![organizer.id.clone()],
            current_count: 1,
            join_requests: vec![],
            status: ActivityStatus::Recruiting,
            views_count: 0,
            likes_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&activity).await?;
        tracing::info!(
            activity_id = %activity.id,
            organizer = %organizer.id,
            sport = %activity.sport,
            "Activity created"
        );
        Ok(activity)
    }

    /// Fetch an activity, bumping its view counter in the same call.
    pub async fn detail(&self, viewer_id: Option<&str>, activity_id: &str) -> Result<ActivityDetail> {
        let activity = self
            .store
            .increment_views(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(activity_id.to_string()))?;

        let viewer_status = viewer_id.map(|v| activity.viewer_status(v));
        let is_organizer = viewer_id.is_some_and(|v| activity.is_organizer(v));

        let organizer = self.summary_of(&activity.organizer_id).await?;
        let participants_info = self.summaries_of(&activity.participants).await?;
        let join_requests = if is_organizer {
            self.summaries_of(&activity.join_requests).await?
        } else {
            vec![]
        };

        Ok(ActivityDetail {
            category: activity.category.clone(),
            images: activity.images.clone(),
            participants_info,
            join_requests,
            is_organizer,
            item: render_item(activity, organizer, viewer_status, None),
        })
    }

    /// Public listing: status/sport/time-range/city filters, soonest first.
    pub async fn list(
        &self,
        viewer_id: Option<&str>,
        filters: ListFilters,
        paging: Paging,
    ) -> Result<ActivityPage> {
        let statuses = match filters.status.as_deref() {
            None | Some("recruiting") => vec![ActivityStatus::Recruiting],
            Some("ongoing") => vec![ActivityStatus::Ongoing],
            Some("all") => vec![ActivityStatus::Recruiting, ActivityStatus::Ongoing],
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "unknown status filter: {other}"
                )))
            }
        };

        let now = Utc::now();
        let (starts_after, starts_before) = match filters.time_range.as_deref() {
            None | Some("all") => (None, None),
            Some("today") => (Some(now), Some(now + Duration::days(1))),
            Some("week") => (Some(now), Some(now + Duration::days(7))),
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "unknown time range: {other}"
                )))
            }
        };

        let filter = ActivityFilter {
            statuses,
            sports: match filters.sport.as_deref() {
                None | Some("all") => vec![],
                Some(sport) => vec![sport.to_string()],
            },
            city: filters.city,
            starts_after,
            starts_before,
            ..Default::default()
        };

        let (skip, limit) = self.page_window(&paging);
        let activities = self
            .store
            .query(&filter, SortOrder::StartTimeAsc, skip, limit)
            .await?;
        self.render_page(activities, viewer_id, limit, false).await
    }

    /// Activities the actor organizes, newest first.
    pub async fn my_activities(
        &self,
        actor_id: &str,
        status: Option<ActivityStatus>,
        paging: Paging,
    ) -> Result<ActivityPage> {
        let actor = self.directory.resolve(actor_id).await?;

        let filter = ActivityFilter {
            statuses: status.into_iter().collect(),
            organizer_id: Some(actor.id),
            ..Default::default()
        };

        let (skip, limit) = self.page_window(&paging);
        let activities = self
            .store
            .query(&filter, SortOrder::CreatedAtDesc, skip, limit)
            .await?;
        self.render_page(activities, Some(actor_id), limit, true).await
    }

    /// Activities the actor participates in, soonest first.
    pub async fn my_joined_activities(
        &self,
        actor_id: &str,
        status: Option<ActivityStatus>,
        paging: Paging,
    ) -> Result<ActivityPage> {
        let actor = self.directory.resolve(actor_id).await?;

        let filter = ActivityFilter {
            statuses: status.into_iter().collect(),
            participant_id: Some(actor.id),
            ..Default::default()
        };

        let (skip, limit) = self.page_window(&paging);
        let activities = self
            .store
            .query(&filter, SortOrder::StartTimeAsc, skip, limit)
            .await?;
        self.render_page(activities, Some(actor_id), limit, false).await
    }

    /// Personalized recommendation.
    ///
    /// Primary tier: future recruiting activities in the viewer's
    /// preferred sports, soonest first. An under-filled page is backfilled
    /// with the most-viewed remaining future recruiting activities,
    /// excluding ids already returned.
    pub async fn recommend(&self, actor_id: &str, paging: Paging) -> Result<ActivityPage> {
        let viewer = self.directory.resolve(actor_id).await?;
        let now = Utc::now();
        let (skip, limit) = self.page_window(&paging);

        let primary_filter = ActivityFilter {
            statuses: vec![ActivityStatus::Recruiting],
            sports: viewer.sports_preferences.clone(),
            starts_after: Some(now),
            ..Default::default()
        };
        let mut activities = self
            .store
            .query(&primary_filter, SortOrder::StartTimeAsc, skip, limit)
            .await?;

        if activities.len() < limit {
            let backfill_filter = ActivityFilter {
                statuses: vec![ActivityStatus::Recruiting],
                starts_after: Some(now),
                exclude_ids: activities.iter().map(|a| a.id.clone()).collect(),
                ..Default::default()
            };
            let backfill = self
                .store
                .query(
                    &backfill_filter,
                    SortOrder::ViewsDesc,
                    0,
                    limit - activities.len(),
                )
                .await?;
            activities.extend(backfill);
        }

        self.render_page(activities, Some(actor_id), limit, false).await
    }

    async fn render_page(
        &self,
        activities: Vec<Activity>,
        viewer_id: Option<&str>,
        page_size: usize,
        with_request_count: bool,
    ) -> Result<ActivityPage> {
        let has_more = activities.len() == page_size;
        let mut items = Vec::with_capacity(activities.len());
        for activity in activities {
            let organizer = self.summary_of(&activity.organizer_id).await?;
            let viewer_status = viewer_id.map(|v| activity.viewer_status(v));
            let request_count =
                with_request_count.then(|| activity.join_requests.len() as u32);
            items.push(render_item(activity, organizer, viewer_status, request_count));
        }
        Ok(ActivityPage {
            activities: items,
            has_more,
        })
    }

    async fn summary_of(&self, user_id: &str) -> Result<Option<UserSummary>> {
        Ok(self.directory.lookup(user_id).await?.map(|u| u.summary()))
    }

    async fn summaries_of(&self, user_ids: &[String]) -> Result<Vec<UserSummary>> {
        let mut summaries = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if let Some(summary) = self.summary_of(id).await? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }
}

fn render_item(
    activity: Activity,
    organizer: Option<UserSummary>,
    viewer_status: Option<ViewerStatus>,
    join_requests_count: Option<u32>,
) -> ActivityItem {
    ActivityItem {
        id: activity.id,
        title: activity.title,
        description: activity.description,
        sport: activity.sport,
        cover_image: activity.cover_image,
        location: activity.location,
        schedule: activity.schedule,
        capacity: activity.capacity,
        current_count: activity.current_count,
        fee: activity.fee,
        tags: activity.tags,
        status: activity.status,
        views_count: activity.views_count,
        likes_count: activity.likes_count,
        created_at: activity.created_at,
        organizer,
        viewer_status,
        join_requests_count,
    }
}

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::post_views)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostViewEvent {
    pub id: i32,
    pub post_id: i32,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub reading_time: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::post_views)]
pub struct NewPostViewEvent {
    pub post_id: i32,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub reading_time: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::post_shares)]
pub struct NewPostShare {
    pub post_id: i32,
    pub platform: String,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::post_analytics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PostAnalyticsRow {
    pub id: i32,
    pub post_id: i32,
    pub views: i64,
    pub unique_views: i64,
    pub shares: i64,
    pub likes: i64,
    pub reading_time: i64,
    pub updated_at: NaiveDateTime,
}

/// The aggregate shape handed to callers. Missing rows and read failures
/// both collapse to zeroes so downstream arithmetic never sees a null.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Default)]
pub struct AnalyticsSummary {
    pub views: i64,
    pub unique_views: i64,
    pub shares: i64,
    pub likes: i64,
    pub reading_time: i64,
}

impl AnalyticsSummary {
    pub fn zeroed() -> Self {
        Self::default()
    }
}

impl From<PostAnalyticsRow> for AnalyticsSummary {
    fn from(row: PostAnalyticsRow) -> Self {
        AnalyticsSummary {
            views: row.views,
            unique_views: row.unique_views,
            shares: row.shares,
            likes: row.likes,
            reading_time: row.reading_time,
        }
    }
}

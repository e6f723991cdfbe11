use axum::{
    Json, Router,
    extract::{Path, State},
    http::{
        HeaderMap, StatusCode,
        header::{REFERER, USER_AGENT},
    },
    routing::{get, post},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::{AppError, ServerError},
    identity::AuthUser,
    real_ip::ClientIp,
    schema::{post_analytics, post_shares, post_views, posts},
};

use super::{
    models::{AnalyticsSummary, NewPostShare, NewPostViewEvent, PostAnalyticsRow, PostViewEvent},
    tracker::{ReadingOutcome, ViewDecision, ViewTracker},
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/{slug}/view", post(track_view))
        .route("/{slug}/reading-time", post(track_reading_time))
        .route("/{slug}/share", post(track_share))
        .route("/{slug}/like", post(like_post).delete(unlike_post))
        .route("/{slug}/analytics", get(get_post_analytics))
}

#[derive(Serialize)]
pub struct TrackResult {
    pub counted: bool,
}

/// Records one view per navigation. Re-renders of the same post within a
/// session are ignored, and failures never surface to the reader.
#[axum::debug_handler]
pub async fn track_view(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
) -> Json<TrackResult> {
    let user_agent = header_str(&headers, USER_AGENT.as_str());
    let referrer = header_str(&headers, REFERER.as_str());
    let visitor = ViewTracker::visitor_key(&ip, user_agent.as_deref());

    let counted: Result<bool, ServerError> = async {
        let mut conn = ctx.diesel.get().await?;

        let Some(post_id) = resolve_post_id(&mut conn, &slug).await? else {
            return Ok(false);
        };

        let first_in_session = match ctx.tracker.decide_view(&visitor, post_id).await {
            ViewDecision::AlreadyViewing => return Ok(false),
            ViewDecision::New { first_in_session } => first_in_session,
        };

        let view_id = diesel::insert_into(post_views::table)
            .values(&NewPostViewEvent {
                post_id,
                user_agent: user_agent.clone(),
                referrer: referrer.clone(),
                reading_time: 0,
            })
            .returning(post_views::id)
            .get_result::<i32>(&mut conn)
            .await?;

        bump_view_aggregate(&mut conn, post_id, first_in_session).await?;

        ctx.tracker.record_view(&visitor, post_id, view_id).await;

        Ok(true)
    }
    .await;

    match counted {
        Ok(counted) => Json(TrackResult { counted }),
        Err(error) => {
            tracing::error!(%error, %slug, "Failed to track view");
            Json(TrackResult { counted: false })
        }
    }
}

#[derive(Serialize)]
pub struct ReadingTimeResult {
    pub recorded: bool,
}

/// Attaches elapsed reading time to the most recent view of this post by
/// this visitor. Bounces (< 5 s) are discarded, and a report without a
/// prior view never creates a row.
#[axum::debug_handler]
pub async fn track_reading_time(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
) -> Json<ReadingTimeResult> {
    let user_agent = header_str(&headers, USER_AGENT.as_str());
    let visitor = ViewTracker::visitor_key(&ip, user_agent.as_deref());

    let recorded: Result<bool, ServerError> = async {
        let mut conn = ctx.diesel.get().await?;

        let Some(post_id) = resolve_post_id(&mut conn, &slug).await? else {
            return Ok(false);
        };

        let (view_id, seconds) = match ctx.tracker.finish_view(&visitor, post_id).await {
            ReadingOutcome::Finished { view_id, seconds } => (view_id, seconds),
            ReadingOutcome::NoActiveView | ReadingOutcome::TooShort => return Ok(false),
        };

        // The unload/visibility/teardown hooks can all fire for one view;
        // later reports just overwrite with a larger elapsed value, and the
        // aggregate moves by the delta.
        let previous = post_views::table
            .filter(post_views::id.eq(view_id))
            .select(PostViewEvent::as_select())
            .first::<PostViewEvent>(&mut conn)
            .await
            .optional()?
            .map(|view| view.reading_time)
            .unwrap_or(0);

        diesel::update(post_views::table.filter(post_views::id.eq(view_id)))
            .set(post_views::reading_time.eq(seconds as i32))
            .execute(&mut conn)
            .await?;

        diesel::update(post_analytics::table.filter(post_analytics::post_id.eq(post_id)))
            .set((
                post_analytics::reading_time
                    .eq(post_analytics::reading_time + (seconds - previous as i64)),
                post_analytics::updated_at.eq(chrono::Utc::now().naive_utc()),
            ))
            .execute(&mut conn)
            .await?;

        Ok(true)
    }
    .await;

    match recorded {
        Ok(recorded) => Json(ReadingTimeResult { recorded }),
        Err(error) => {
            tracing::error!(%error, %slug, "Failed to record reading time");
            Json(ReadingTimeResult { recorded: false })
        }
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SharePlatform {
    Twitter,
    Linkedin,
    Facebook,
    Reddit,
    Whatsapp,
    Copy,
    Native,
}

impl SharePlatform {
    fn as_str(&self) -> &'static str {
        match self {
            SharePlatform::Twitter => "twitter",
            SharePlatform::Linkedin => "linkedin",
            SharePlatform::Facebook => "facebook",
            SharePlatform::Reddit => "reddit",
            SharePlatform::Whatsapp => "whatsapp",
            SharePlatform::Copy => "copy",
            SharePlatform::Native => "native",
        }
    }
}

impl<'de> Deserialize<'de> for SharePlatform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "twitter" => Ok(SharePlatform::Twitter),
            "linkedin" => Ok(SharePlatform::Linkedin),
            "facebook" => Ok(SharePlatform::Facebook),
            "reddit" => Ok(SharePlatform::Reddit),
            "whatsapp" => Ok(SharePlatform::Whatsapp),
            "copy" => Ok(SharePlatform::Copy),
            "native" => Ok(SharePlatform::Native),
            _ => Err(serde::de::Error::custom("invalid share platform")),
        }
    }
}

#[derive(Deserialize)]
pub struct ShareSubmission {
    platform: SharePlatform,
}

/// Fire and forget: the share dialog opened regardless, so this endpoint
/// reports success even when the insert fails.
#[axum::debug_handler]
pub async fn track_share(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    crate::json::Json(body): crate::json::Json<ShareSubmission>,
) -> StatusCode {
    let result: Result<(), ServerError> = async {
        let mut conn = ctx.diesel.get().await?;

        let Some(post_id) = resolve_post_id(&mut conn, &slug).await? else {
            return Ok(());
        };

        diesel::insert_into(post_shares::table)
            .values(&NewPostShare {
                post_id,
                platform: body.platform.as_str().to_string(),
            })
            .execute(&mut conn)
            .await?;

        let now = chrono::Utc::now().naive_utc();
        diesel::insert_into(post_analytics::table)
            .values((
                post_analytics::post_id.eq(post_id),
                post_analytics::views.eq(0i64),
                post_analytics::unique_views.eq(0i64),
                post_analytics::shares.eq(1i64),
                post_analytics::likes.eq(0i64),
                post_analytics::reading_time.eq(0i64),
                post_analytics::updated_at.eq(now),
            ))
            .on_conflict(post_analytics::post_id)
            .do_update()
            .set((
                post_analytics::shares.eq(post_analytics::shares + 1),
                post_analytics::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
    .await;

    if let Err(error) = result {
        tracing::error!(%error, %slug, platform = body.platform.as_str(), "Failed to track share");
    }

    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
pub struct LikeCount {
    pub likes: i64,
}

#[axum::debug_handler]
pub async fn like_post(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Result<Json<LikeCount>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let post_id = resolve_post_id(&mut conn, &slug)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found(format!("No post found for `{slug}`")))?;

    let now = chrono::Utc::now().naive_utc();
    let likes = diesel::insert_into(post_analytics::table)
        .values((
            post_analytics::post_id.eq(post_id),
            post_analytics::views.eq(0i64),
            post_analytics::unique_views.eq(0i64),
            post_analytics::shares.eq(0i64),
            post_analytics::likes.eq(1i64),
            post_analytics::reading_time.eq(0i64),
            post_analytics::updated_at.eq(now),
        ))
        .on_conflict(post_analytics::post_id)
        .do_update()
        .set((
            post_analytics::likes.eq(post_analytics::likes + 1),
            post_analytics::updated_at.eq(now),
        ))
        .returning(post_analytics::likes)
        .get_result::<i64>(&mut conn)
        .await?;

    Ok(Json(LikeCount { likes }))
}

/// The counter never goes below zero, even if a browser with cleared local
/// state sends more unlikes than likes.
#[axum::debug_handler]
pub async fn unlike_post(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Result<Json<LikeCount>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let post_id = resolve_post_id(&mut conn, &slug)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found(format!("No post found for `{slug}`")))?;

    let likes = diesel::update(post_analytics::table.filter(post_analytics::post_id.eq(post_id)))
        .set((
            post_analytics::likes
                .eq(diesel::dsl::sql::<diesel::sql_types::Int8>("GREATEST(likes - 1, 0)")),
            post_analytics::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .returning(post_analytics::likes)
        .get_result::<i64>(&mut conn)
        .await
        .optional()?
        .unwrap_or(0);

    Ok(Json(LikeCount { likes }))
}

#[axum::debug_handler]
pub async fn get_post_analytics(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Json<AnalyticsSummary> {
    let summary: Result<AnalyticsSummary, ServerError> = async {
        let mut conn = ctx.diesel.get().await?;

        let Some(post_id) = resolve_post_id(&mut conn, &slug).await? else {
            return Ok(AnalyticsSummary::zeroed());
        };

        let row = post_analytics::table
            .filter(post_analytics::post_id.eq(post_id))
            .select(PostAnalyticsRow::as_select())
            .first::<PostAnalyticsRow>(&mut conn)
            .await
            .optional()?;

        Ok(row.map(AnalyticsSummary::from).unwrap_or_default())
    }
    .await;

    match summary {
        Ok(summary) => Json(summary),
        Err(error) => {
            tracing::error!(%error, %slug, "Failed to fetch analytics, serving zeroes");
            Json(AnalyticsSummary::zeroed())
        }
    }
}

#[derive(Serialize)]
pub struct PostAnalyticsEntry {
    pub post_id: i32,

    #[serde(flatten)]
    pub summary: AnalyticsSummary,
}

#[axum::debug_handler]
pub async fn get_all_analytics(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
) -> Json<Vec<PostAnalyticsEntry>> {
    let rows: Result<Vec<PostAnalyticsRow>, ServerError> = async {
        let mut conn = ctx.diesel.get().await?;
        Ok(post_analytics::table
            .select(PostAnalyticsRow::as_select())
            .load::<PostAnalyticsRow>(&mut conn)
            .await?)
    }
    .await;

    match rows {
        Ok(rows) => Json(
            rows.into_iter()
                .map(|row| PostAnalyticsEntry {
                    post_id: row.post_id,
                    summary: AnalyticsSummary::from(row),
                })
                .collect(),
        ),
        Err(error) => {
            tracing::error!(%error, "Failed to fetch analytics, serving none");
            Json(vec![])
        }
    }
}

async fn resolve_post_id(
    conn: &mut diesel_async::AsyncPgConnection,
    slug: &str,
) -> Result<Option<i32>, diesel::result::Error> {
    posts::table
        .filter(posts::slug.eq(slug))
        .filter(posts::published.eq(true))
        .select(posts::id)
        .first::<i32>(conn)
        .await
        .optional()
}

async fn bump_view_aggregate(
    conn: &mut diesel_async::AsyncPgConnection,
    post_id: i32,
    first_in_session: bool,
) -> Result<(), diesel::result::Error> {
    let unique_inc: i64 = if first_in_session { 1 } else { 0 };
    let now = chrono::Utc::now().naive_utc();

    diesel::insert_into(post_analytics::table)
        .values((
            post_analytics::post_id.eq(post_id),
            post_analytics::views.eq(1i64),
            post_analytics::unique_views.eq(unique_inc),
            post_analytics::shares.eq(0i64),
            post_analytics::likes.eq(0i64),
            post_analytics::reading_time.eq(0i64),
            post_analytics::updated_at.eq(now),
        ))
        .on_conflict(post_analytics::post_id)
        .do_update()
        .set((
            post_analytics::views.eq(post_analytics::views + 1),
            post_analytics::unique_views.eq(post_analytics::unique_views + unique_inc),
            post_analytics::updated_at.eq(now),
        ))
        .execute(conn)
        .await?;

    Ok(())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

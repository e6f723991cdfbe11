//! Derived counters for the admin dashboard. Everything here is computed
//! from already-fetched collections; there is no state of its own.

use std::collections::BTreeMap;

use axum::{Json, extract::State};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    App,
    analytics::models::{AnalyticsSummary, PostAnalyticsRow},
    blog::{models::post::Post, post::PostView},
    error::AppError,
    identity::AuthUser,
    schema::{comments, post_analytics, posts},
};

#[derive(Serialize, Debug, PartialEq)]
pub struct DashboardStats {
    pub total_posts: usize,
    pub published_posts: usize,
    pub draft_posts: usize,
    pub featured_posts: usize,
    pub total_comments: i64,
    pub pending_comments: i64,
    pub total_views: i64,
    pub total_shares: i64,
    pub total_likes: i64,
    pub avg_views_per_post: i64,
    pub engagement_rate: i64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct AuthorStats {
    pub author: String,
    pub total: usize,
    pub published: usize,
    pub drafts: usize,
    pub featured: usize,
    pub first_post_at: NaiveDateTime,
    pub latest_post_at: NaiveDateTime,
}

#[derive(Serialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub authors: Vec<AuthorStats>,
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
) -> Result<Json<Dashboard>, AppError> {
    // Independent fetches, raced freely; each grabs its own connection.
    let (all_posts, (total_comments, pending_comments), analytics) = tokio::try_join!(
        load_all_posts(&ctx),
        load_comment_counts(&ctx),
        load_analytics(&ctx),
    )?;

    let stats = compute_stats(&all_posts, total_comments, pending_comments, &analytics);
    let authors = author_stats(&all_posts);

    Ok(Json(Dashboard { stats, authors }))
}

pub fn compute_stats(
    posts: &[PostView],
    total_comments: i64,
    pending_comments: i64,
    analytics: &[AnalyticsSummary],
) -> DashboardStats {
    let published_posts = posts.iter().filter(|p| p.published).count();
    let featured_posts = posts.iter().filter(|p| p.featured).count();

    let total_views: i64 = analytics.iter().map(|a| a.views).sum();
    let total_shares: i64 = analytics.iter().map(|a| a.shares).sum();
    let total_likes: i64 = analytics.iter().map(|a| a.likes).sum();

    let avg_views_per_post = if posts.is_empty() {
        0
    } else {
        (total_views as f64 / posts.len() as f64).round() as i64
    };

    let engagement_rate = if total_views == 0 {
        0
    } else {
        (((total_shares + total_likes + total_comments) as f64 / total_views as f64) * 100.0)
            .round() as i64
    };

    DashboardStats {
        total_posts: posts.len(),
        published_posts,
        draft_posts: posts.len() - published_posts,
        featured_posts,
        total_comments,
        pending_comments,
        total_views,
        total_shares,
        total_likes,
        avg_views_per_post,
        engagement_rate,
    }
}

/// Groups by the exact author string; rows without an author were already
/// normalized into the "Unknown" bucket.
pub fn author_stats(posts: &[PostView]) -> Vec<AuthorStats> {
    let mut by_author: BTreeMap<String, AuthorStats> = BTreeMap::new();

    for post in posts {
        let entry = by_author
            .entry(post.author.clone())
            .or_insert_with(|| AuthorStats {
                author: post.author.clone(),
                total: 0,
                published: 0,
                drafts: 0,
                featured: 0,
                first_post_at: post.created_at,
                latest_post_at: post.created_at,
            });

        entry.total += 1;
        if post.published {
            entry.published += 1;
        } else {
            entry.drafts += 1;
        }
        if post.featured {
            entry.featured += 1;
        }
        entry.first_post_at = entry.first_post_at.min(post.created_at);
        entry.latest_post_at = entry.latest_post_at.max(post.created_at);
    }

    by_author.into_values().collect()
}

async fn load_all_posts(ctx: &App) -> Result<Vec<PostView>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = posts::table
        .order(posts::created_at.desc())
        .select(Post::as_select())
        .load::<Post>(&mut conn)
        .await?;

    Ok(rows.into_iter().map(PostView::from).collect())
}

async fn load_comment_counts(ctx: &App) -> Result<(i64, i64), AppError> {
    let mut conn = ctx.diesel.get().await?;

    let total = comments::table.count().get_result::<i64>(&mut conn).await?;

    let pending = comments::table
        .filter(comments::approved.eq(false))
        .count()
        .get_result::<i64>(&mut conn)
        .await?;

    Ok((total, pending))
}

async fn load_analytics(ctx: &App) -> Result<Vec<AnalyticsSummary>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = post_analytics::table
        .select(PostAnalyticsRow::as_select())
        .load::<PostAnalyticsRow>(&mut conn)
        .await?;

    Ok(rows.into_iter().map(AnalyticsSummary::from).collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn make_post(author: &str, published: bool, featured: bool, day: u32) -> PostView {
        let date = NaiveDate::from_ymd_opt(2025, 2, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();

        PostView {
            id: day as i32,
            slug: format!("post-{day}"),
            title: "t".into(),
            excerpt: String::new(),
            content: String::new(),
            author: author.into(),
            author_profession: String::new(),
            tags: vec![],
            image: None,
            read_time: String::new(),
            featured,
            published,
            comments_enabled: true,
            publish_date: date,
            created_at: date,
            updated_at: date,
        }
    }

    fn summary(views: i64, shares: i64, likes: i64) -> AnalyticsSummary {
        AnalyticsSummary {
            views,
            unique_views: views,
            shares,
            likes,
            reading_time: 0,
        }
    }

    #[test]
    fn test_empty_inputs_yield_zeroes_not_nan() {
        let stats = compute_stats(&[], 0, 0, &[]);
        assert_eq!(stats.avg_views_per_post, 0);
        assert_eq!(stats.engagement_rate, 0);
        assert_eq!(stats.total_posts, 0);
    }

    #[test]
    fn test_engagement_rate_guards_zero_views() {
        let posts = vec![make_post("Ada", true, false, 1)];
        // comments and likes exist but nobody viewed anything yet
        let stats = compute_stats(&posts, 5, 0, &[summary(0, 2, 3)]);
        assert_eq!(stats.engagement_rate, 0);
    }

    #[test]
    fn test_counter_math() {
        let posts = vec![
            make_post("Ada", true, true, 1),
            make_post("Ada", false, false, 2),
            make_post("Grace", true, false, 3),
        ];
        let analytics = vec![summary(100, 5, 10), summary(50, 0, 5)];

        let stats = compute_stats(&posts, 15, 4, &analytics);

        assert_eq!(stats.total_posts, 3);
        assert_eq!(stats.published_posts, 2);
        assert_eq!(stats.draft_posts, 1);
        assert_eq!(stats.featured_posts, 1);
        assert_eq!(stats.total_views, 150);
        assert_eq!(stats.total_shares, 5);
        assert_eq!(stats.total_likes, 15);
        // 150 views / 3 posts
        assert_eq!(stats.avg_views_per_post, 50);
        // round((5 + 15 + 15) / 150 * 100) = 23
        assert_eq!(stats.engagement_rate, 23);
    }

    #[test]
    fn test_author_grouping_tracks_first_and_latest() {
        let posts = vec![
            make_post("Ada", true, false, 5),
            make_post("Ada", false, true, 1),
            make_post("Unknown", true, false, 3),
        ];

        let authors = author_stats(&posts);
        assert_eq!(authors.len(), 2);

        let ada = authors.iter().find(|a| a.author == "Ada").unwrap();
        assert_eq!(ada.total, 2);
        assert_eq!(ada.published, 1);
        assert_eq!(ada.drafts, 1);
        assert_eq!(ada.featured, 1);
        assert_eq!(ada.first_post_at.format("%d").to_string(), "01");
        assert_eq!(ada.latest_post_at.format("%d").to_string(), "05");

        let unknown = authors.iter().find(|a| a.author == "Unknown").unwrap();
        assert_eq!(unknown.total, 1);
    }

    #[test]
    fn test_stats_recompute_from_changed_inputs() {
        let posts = vec![make_post("Ada", true, false, 1)];
        let before = compute_stats(&posts, 0, 0, &[summary(10, 0, 0)]);
        let after = compute_stats(&posts, 0, 0, &[summary(20, 0, 0)]);
        assert_eq!(before.avg_views_per_post, 10);
        assert_eq!(after.avg_views_per_post, 20);
    }
}

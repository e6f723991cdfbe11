use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    blog::models::post::Post,
    error::ServerError,
    schema::{post_analytics, posts},
    utils::natural_cmp,
};

use super::{PostView, fallback};

pub const PAGE_SIZE: usize = 9;

#[derive(Deserialize)]
pub struct ListQueries {
    tag: Option<String>,
    q: Option<String>,
    month: Option<String>,
    sort: Option<SortOrder>,
    page: Option<usize>,
}

#[derive(Deserialize)]
pub struct RecentQueries {
    limit: Option<usize>,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SortOrder {
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
    Trending,
}

impl<'de> Deserialize<'de> for SortOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "az" => Ok(SortOrder::TitleAsc),
            "za" => Ok(SortOrder::TitleDesc),
            "trending" => Ok(SortOrder::Trending),
            _ => Err(serde::de::Error::custom("invalid sort order")),
        }
    }
}

#[derive(Serialize)]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

#[axum::debug_handler]
pub async fn list_posts(State(ctx): State<App>, q: Query<ListQueries>) -> Json<PostPage> {
    let posts = load_published_posts(&ctx).await;

    let mut posts = filter_posts(
        posts,
        q.tag.as_deref(),
        q.q.as_deref(),
        q.month.as_deref(),
    );

    let sort = q.sort.unwrap_or(SortOrder::Newest);
    let views = if sort == SortOrder::Trending {
        load_view_counts(&ctx).await
    } else {
        HashMap::new()
    };
    sort_posts(&mut posts, sort, &views);

    let page = q.page.unwrap_or(1);
    let total = posts.len();
    let posts = paginate(&posts, page).to_vec();

    Json(PostPage {
        posts,
        total,
        page,
        page_size: PAGE_SIZE,
    })
}

#[axum::debug_handler]
pub async fn list_featured(State(ctx): State<App>) -> Json<Vec<PostView>> {
    let mut posts = load_published_posts(&ctx).await;
    posts.retain(|p| p.featured);
    sort_posts(&mut posts, SortOrder::Newest, &HashMap::new());
    Json(posts)
}

#[axum::debug_handler]
pub async fn list_recent(State(ctx): State<App>, q: Query<RecentQueries>) -> Json<Vec<PostView>> {
    let mut posts = load_published_posts(&ctx).await;
    sort_posts(&mut posts, SortOrder::Newest, &HashMap::new());
    posts.truncate(q.limit.unwrap_or(3));
    Json(posts)
}

/// The read path never errors out: any backend failure degrades to the
/// static fallback list.
pub async fn load_published_posts(ctx: &App) -> Vec<PostView> {
    match query_published(ctx).await {
        Ok(posts) => published_only(posts),
        Err(error) => {
            tracing::error!(%error, "Failed to fetch posts, serving fallback content");
            published_only(fallback::fallback_posts())
        }
    }
}

async fn query_published(ctx: &App) -> Result<Vec<PostView>, ServerError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = posts::table
        .filter(posts::published.eq(true))
        .order(posts::created_at.desc())
        .select(Post::as_select())
        .load::<Post>(&mut conn)
        .await?;

    Ok(rows.into_iter().map(PostView::from).collect())
}

async fn load_view_counts(ctx: &App) -> HashMap<i32, i64> {
    let counts: Result<Vec<(i32, i64)>, ServerError> = async {
        let mut conn = ctx.diesel.get().await?;
        Ok(post_analytics::table
            .select((post_analytics::post_id, post_analytics::views))
            .load::<(i32, i64)>(&mut conn)
            .await?)
    }
    .await;

    match counts {
        Ok(counts) => counts.into_iter().collect(),
        Err(error) => {
            tracing::error!(%error, "Failed to fetch view counts, trending order degrades to newest");
            HashMap::new()
        }
    }
}

pub fn published_only(mut posts: Vec<PostView>) -> Vec<PostView> {
    posts.retain(|p| p.published);
    posts
}

pub fn filter_posts(
    posts: Vec<PostView>,
    tag: Option<&str>,
    q: Option<&str>,
    month: Option<&str>,
) -> Vec<PostView> {
    let tag = tag.filter(|t| !t.is_empty() && *t != "All");
    let q = q.map(str::to_lowercase).filter(|q| !q.is_empty());
    let month = month.filter(|m| !m.is_empty());

    posts
        .into_iter()
        .filter(|post| {
            if let Some(tag) = tag {
                if !post.tags.iter().any(|t| t == tag) {
                    return false;
                }
            }

            if let Some(q) = &q {
                let matches = post.title.to_lowercase().contains(q)
                    || post.excerpt.to_lowercase().contains(q)
                    || post.tags.iter().any(|t| t.to_lowercase().contains(q));
                if !matches {
                    return false;
                }
            }

            if let Some(month) = month {
                if post.publish_date.format("%Y-%m").to_string() != month {
                    return false;
                }
            }

            true
        })
        .collect()
}

pub fn sort_posts(posts: &mut [PostView], sort: SortOrder, views: &HashMap<i32, i64>) {
    match sort {
        SortOrder::Newest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOrder::TitleAsc => posts.sort_by(|a, b| natural_cmp(&a.title, &b.title)),
        SortOrder::TitleDesc => posts.sort_by(|a, b| natural_cmp(&b.title, &a.title)),
        SortOrder::Trending => posts.sort_by(|a, b| {
            let views_a = views.get(&a.id).copied().unwrap_or(0);
            let views_b = views.get(&b.id).copied().unwrap_or(0);
            views_b
                .cmp(&views_a)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
    }
}

/// 1-based pagination with a fixed page size; out-of-range pages are empty.
pub fn paginate(posts: &[PostView], page: usize) -> &[PostView] {
    let page = page.max(1);
    let start = (page - 1) * PAGE_SIZE;
    if start >= posts.len() {
        return &[];
    }
    let end = (start + PAGE_SIZE).min(posts.len());
    &posts[start..end]
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn make_post(id: i32, title: &str, tags: &[&str], published: bool, day: u32) -> PostView {
        let date = NaiveDate::from_ymd_opt(2025, 4, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        PostView {
            id,
            slug: format!("post-{id}"),
            title: title.into(),
            excerpt: format!("Excerpt for {title}"),
            content: String::new(),
            author: "Ada".into(),
            author_profession: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image: None,
            read_time: String::new(),
            featured: false,
            published,
            comments_enabled: true,
            publish_date: date,
            created_at: date,
            updated_at: date,
        }
    }

    #[test]
    fn test_unpublished_posts_never_listed() {
        let posts = vec![
            make_post(1, "Live", &[], true, 1),
            make_post(2, "Draft", &[], false, 2),
        ];

        let visible = published_only(posts);
        assert_eq!(visible.len(), 1);
        assert!(visible.iter().all(|p| p.published));
    }

    #[test]
    fn test_newest_and_oldest_are_exact_reverses() {
        let mut newest = vec![
            make_post(1, "a", &[], true, 3),
            make_post(2, "b", &[], true, 1),
            make_post(3, "c", &[], true, 2),
        ];
        let mut oldest = newest.clone();

        sort_posts(&mut newest, SortOrder::Newest, &HashMap::new());
        sort_posts(&mut oldest, SortOrder::Oldest, &HashMap::new());

        let reversed: Vec<i32> = oldest.iter().rev().map(|p| p.id).collect();
        let ids: Vec<i32> = newest.iter().map(|p| p.id).collect();
        assert_eq!(ids, reversed);
    }

    #[test]
    fn test_tag_all_and_absent_are_unfiltered() {
        let posts = vec![
            make_post(1, "a", &["rust"], true, 1),
            make_post(2, "b", &["games"], true, 2),
        ];

        assert_eq!(filter_posts(posts.clone(), None, None, None).len(), 2);
        assert_eq!(filter_posts(posts.clone(), Some("All"), None, None).len(), 2);
        assert_eq!(filter_posts(posts.clone(), Some("rust"), None, None).len(), 1);
        assert_eq!(filter_posts(posts, Some("missing"), None, None).len(), 0);
    }

    #[test]
    fn test_tag_match_is_exact_membership() {
        let posts = vec![make_post(1, "a", &["rustacean"], true, 1)];
        // substring of a tag is not a membership match
        assert_eq!(filter_posts(posts, Some("rust"), None, None).len(), 0);
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_excerpt_tags() {
        let posts = vec![
            make_post(1, "Async Rust", &[], true, 1),
            make_post(2, "Databases", &["PostgreSQL"], true, 2),
            make_post(3, "Unrelated", &[], true, 3),
        ];

        assert_eq!(filter_posts(posts.clone(), None, Some("async"), None).len(), 1);
        assert_eq!(
            filter_posts(posts.clone(), None, Some("postgres"), None).len(),
            1
        );
        // excerpt carries the title text as well
        assert_eq!(
            filter_posts(posts, None, Some("UNRELATED"), None).len(),
            1
        );
    }

    #[test]
    fn test_month_filter() {
        let mut in_march = make_post(1, "a", &[], true, 1);
        in_march.publish_date = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let in_april = make_post(2, "b", &[], true, 2);

        let posts = vec![in_march, in_april];
        let filtered = filter_posts(posts, None, None, Some("2025-03"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_title_sort_is_natural_and_case_insensitive() {
        let mut posts = vec![
            make_post(1, "Part 10", &[], true, 1),
            make_post(2, "part 2", &[], true, 2),
            make_post(3, "Appendix", &[], true, 3),
        ];

        sort_posts(&mut posts, SortOrder::TitleAsc, &HashMap::new());
        let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        sort_posts(&mut posts, SortOrder::TitleDesc, &HashMap::new());
        let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_trending_sorts_by_views_then_newest() {
        let mut posts = vec![
            make_post(1, "a", &[], true, 1),
            make_post(2, "b", &[], true, 2),
            make_post(3, "c", &[], true, 3),
        ];
        // posts 1 and 3 tie on views, the newer one (3) wins
        let views = HashMap::from([(1, 7), (2, 50), (3, 7)]);

        sort_posts(&mut posts, SortOrder::Trending, &views);
        let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_pagination_is_one_based_and_fixed_size() {
        let posts: Vec<PostView> = (1..=20)
            .map(|i| make_post(i, "p", &[], true, (i as u32 % 27) + 1))
            .collect();

        assert_eq!(paginate(&posts, 1).len(), PAGE_SIZE);
        assert_eq!(paginate(&posts, 2).len(), PAGE_SIZE);
        assert_eq!(paginate(&posts, 3).len(), 20 - 2 * PAGE_SIZE);
        assert!(paginate(&posts, 4).is_empty());
        // page 0 clamps to the first page
        assert_eq!(paginate(&posts, 0), paginate(&posts, 1));
    }
}

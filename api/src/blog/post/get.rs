use axum::{
    Json,
    extract::{Path, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    App,
    blog::models::post::Post,
    error::{AppError, ServerError},
    markdown,
    schema::posts,
};

use super::{PostView, fallback};

#[derive(Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostView,
    /// The markdown content rendered for display.
    pub content_html: String,
}

#[axum::debug_handler]
pub async fn get_post(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, AppError> {
    let live = match query_by_slug(&ctx, &slug).await {
        Ok(post) => post,
        Err(error) => {
            tracing::error!(%error, %slug, "Failed to fetch post, trying fallback content");
            None
        }
    };

    let post = live.or_else(|| {
        fallback::fallback_posts()
            .into_iter()
            .find(|p| p.slug == slug)
    });

    let post = post.ok_or_else(|| AppError::not_found(format!("No post found for `{slug}`")))?;

    let content_html = markdown::render(&post.content);

    Ok(Json(PostDetail { post, content_html }))
}

async fn query_by_slug(ctx: &App, slug: &str) -> Result<Option<PostView>, ServerError> {
    let mut conn = ctx.diesel.get().await?;

    let row = posts::table
        .filter(posts::slug.eq(slug))
        .filter(posts::published.eq(true))
        .select(Post::as_select())
        .first::<Post>(&mut conn)
        .await
        .optional()?;

    Ok(row.map(PostView::from))
}

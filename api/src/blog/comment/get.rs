use axum::{
    Json,
    extract::{Path, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{App, blog::models::comment::Comment, error::ServerError, schema::{comments, posts}};

use super::CommentView;

/// Public comment listing: approved only, oldest first so the discussion
/// reads top to bottom. Backend failures degrade to an empty list.
#[axum::debug_handler]
pub async fn get_comments(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Json<Vec<CommentView>> {
    match query_approved(&ctx, &slug).await {
        Ok(rows) => Json(rows),
        Err(error) => {
            tracing::error!(%error, %slug, "Failed to fetch comments, serving none");
            Json(vec![])
        }
    }
}

async fn query_approved(ctx: &App, slug: &str) -> Result<Vec<CommentView>, ServerError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = comments::table
        .inner_join(posts::table)
        .filter(posts::slug.eq(slug))
        .filter(comments::approved.eq(true))
        .order(comments::created_at.asc())
        .select(Comment::as_select())
        .load::<Comment>(&mut conn)
        .await?;

    Ok(rows.into_iter().map(CommentView::from).collect())
}

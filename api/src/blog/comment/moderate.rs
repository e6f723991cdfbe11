use axum::{
    Json,
    extract::{Path, Query, State},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App, blog::models::comment::Comment, error::AppError, identity::AuthUser, schema::comments,
};

#[derive(PartialEq, Clone, Copy)]
pub enum StatusFilter {
    Pending,
    Approved,
    All,
}

impl<'de> Deserialize<'de> for StatusFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        match String::deserialize(deserializer)?.as_str() {
            "pending" => Ok(StatusFilter::Pending),
            "approved" => Ok(StatusFilter::Approved),
            "all" => Ok(StatusFilter::All),
            _ => Err(serde::de::Error::custom("invalid status filter")),
        }
    }
}

#[derive(Deserialize)]
pub struct ModerationQueries {
    status: Option<StatusFilter>,
}

/// Moderation listing is newest-first, unlike the public chronological view.
#[axum::debug_handler]
pub async fn list_comments(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    q: Query<ModerationQueries>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let mut query = comments::table
        .order(comments::created_at.desc())
        .select(Comment::as_select())
        .into_boxed();

    match q.status.unwrap_or(StatusFilter::All) {
        StatusFilter::Pending => query = query.filter(comments::approved.eq(false)),
        StatusFilter::Approved => query = query.filter(comments::approved.eq(true)),
        StatusFilter::All => {}
    }

    let rows = query.load::<Comment>(&mut conn).await?;

    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn approve_comment(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<Comment>, AppError> {
    set_approval(&ctx, id, true).await
}

/// Flips approval, so an approved comment can be sent back to pending.
#[axum::debug_handler]
pub async fn toggle_comment(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<Comment>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let comment = diesel::update(comments::table.filter(comments::id.eq(id)))
        .set(comments::approved.eq(diesel::dsl::not(comments::approved)))
        .returning(Comment::as_returning())
        .get_result::<Comment>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("No comment with id {id}")))?;

    Ok(Json(comment))
}

/// Rejection is a hard delete; the comment is gone from every view.
#[axum::debug_handler]
pub async fn reject_comment(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    Path(id): Path<i32>,
) -> Result<(), AppError> {
    let mut conn = ctx.diesel.get().await?;

    let deleted = diesel::delete(comments::table.filter(comments::id.eq(id)))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(AppError::not_found(format!("No comment with id {id}")));
    }

    Ok(())
}

#[derive(Serialize)]
pub struct BulkApproveResult {
    pub approved: usize,
}

/// Approves everything currently pending. Zero pending comments is a
/// successful no-op, not an error.
#[axum::debug_handler]
pub async fn bulk_approve(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
) -> Result<Json<BulkApproveResult>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let approved = diesel::update(comments::table.filter(comments::approved.eq(false)))
        .set(comments::approved.eq(true))
        .execute(&mut conn)
        .await?;

    Ok(Json(BulkApproveResult { approved }))
}

async fn set_approval(ctx: &App, id: i32, approved: bool) -> Result<Json<Comment>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let comment = diesel::update(comments::table.filter(comments::id.eq(id)))
        .set(comments::approved.eq(approved))
        .returning(Comment::as_returning())
        .get_result::<Comment>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("No comment with id {id}")))?;

    Ok(Json(comment))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    blog::models::comment::{Comment, NewComment},
    error::AppError,
    real_ip::ClientIp,
    schema::{comments, posts},
};

use super::CommentView;

#[derive(Deserialize)]
pub struct CommentSubmission {
    name: String,
    email: String,
    comment: String,
}

impl CommentSubmission {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err("No name provided");
        }
        if self.name.len() > 50 {
            return Err("Name too long");
        }

        self.email = self.email.trim().to_lowercase();
        if self.email.is_empty() {
            return Err("No email provided");
        }
        if self.email.len() > 50 {
            return Err("Email too long");
        }
        if !self.email.contains('@') {
            return Err("Invalid email");
        }

        self.comment = self.comment.trim().to_string();
        if self.comment.is_empty() {
            return Err("No comment provided");
        }
        if self.comment.len() > 5000 {
            return Err("Comment too long (max 5000 characters)");
        }

        Ok(())
    }
}

#[axum::debug_handler]
pub async fn create_comment(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    ClientIp(ip): ClientIp,
    crate::json::Json(mut submission): crate::json::Json<CommentSubmission>,
) -> Result<Json<CommentView>, AppError> {
    ctx.check_public_rate(ip)?;

    submission
        .validate()
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    let post = posts::table
        .filter(posts::slug.eq(&slug))
        .filter(posts::published.eq(true))
        .select((posts::id, posts::comments_enabled))
        .first::<(i32, bool)>(&mut conn)
        .await
        .optional()?;

    let Some((post_id, comments_enabled)) = post else {
        return Err(AppError::not_found(format!("No post found for `{slug}`")));
    };

    if !comments_enabled {
        return Err((
            "Comments are disabled for this post",
            StatusCode::FORBIDDEN,
        ))?;
    }

    // Every submission lands unapproved; it only becomes public once the
    // moderation view approves it.
    let comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            post_id,
            name: submission.name,
            email: submission.email,
            content: submission.comment,
            approved: false,
        })
        .returning(Comment::as_returning())
        .get_result::<Comment>(&mut conn)
        .await?;

    Ok(Json(CommentView::from(comment)))
}

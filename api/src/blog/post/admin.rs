use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    blog::models::post::{NewPost, Post, UpdatePost},
    error::AppError,
    identity::AuthUser,
    schema::posts,
};

use super::PostView;

#[derive(Deserialize)]
pub struct PostSubmission {
    slug: String,
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    content: String,
    author: Option<String>,
    author_profession: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    image: Option<String>,
    read_time: Option<String>,
    #[serde(default)]
    featured: bool,
    #[serde(default)]
    published: bool,
    #[serde(default = "default_comments_enabled")]
    comments_enabled: bool,
    publish_date: Option<NaiveDateTime>,
}

fn default_comments_enabled() -> bool {
    true
}

impl PostSubmission {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.slug = self.slug.trim().to_lowercase();
        if self.slug.is_empty() {
            return Err("No slug provided");
        }
        if !self
            .slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err("Slug may only contain letters, digits, `-` and `_`");
        }

        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err("No title provided");
        }

        Ok(())
    }
}

#[derive(Deserialize, Default)]
pub struct PostPatch {
    slug: Option<String>,
    title: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
    author: Option<String>,
    author_profession: Option<String>,
    tags: Option<Vec<String>>,
    image: Option<String>,
    read_time: Option<String>,
    featured: Option<bool>,
    published: Option<bool>,
    comments_enabled: Option<bool>,
    publish_date: Option<NaiveDateTime>,
}

#[axum::debug_handler]
pub async fn create_post(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    crate::json::Json(mut submission): crate::json::Json<PostSubmission>,
) -> Result<Json<PostView>, AppError> {
    submission
        .validate()
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let new_post = NewPost {
        slug: submission.slug,
        title: submission.title,
        excerpt: submission.excerpt,
        content: submission.content,
        author: submission.author,
        author_profession: submission.author_profession,
        tags: submission.tags,
        image: submission.image,
        read_time: submission.read_time,
        featured: submission.featured,
        published: submission.published,
        comments_enabled: submission.comments_enabled,
        publish_date: submission.publish_date,
    };

    let mut conn = ctx.diesel.get().await?;

    let post = diesel::insert_into(posts::table)
        .values(&new_post)
        .returning(Post::as_returning())
        .get_result::<Post>(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => AppError::from((
                "A post with this slug already exists".to_string(),
                StatusCode::CONFLICT,
            )),
            e => e.into(),
        })?;

    Ok(Json(PostView::from(post)))
}

#[axum::debug_handler]
pub async fn update_post(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    Path(id): Path<i32>,
    crate::json::Json(patch): crate::json::Json<PostPatch>,
) -> Result<Json<PostView>, AppError> {
    let changes = UpdatePost {
        slug: patch.slug.map(|s| s.trim().to_lowercase()),
        title: patch.title,
        excerpt: patch.excerpt,
        content: patch.content,
        author: patch.author,
        author_profession: patch.author_profession,
        tags: patch.tags,
        image: patch.image,
        read_time: patch.read_time,
        featured: patch.featured,
        published: patch.published,
        comments_enabled: patch.comments_enabled,
        publish_date: patch.publish_date,
    };

    let mut conn = ctx.diesel.get().await?;

    let post = diesel::update(posts::table.filter(posts::id.eq(id)))
        // updated_at always changes, so the changeset is never empty
        .set((&changes, posts::updated_at.eq(chrono::Utc::now().naive_utc())))
        .returning(Post::as_returning())
        .get_result::<Post>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found(format!("No post with id {id}")))?;

    Ok(Json(PostView::from(post)))
}

#[axum::debug_handler]
pub async fn delete_post(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    Path(id): Path<i32>,
) -> Result<(), AppError> {
    let mut conn = ctx.diesel.get().await?;

    let deleted = diesel::delete(posts::table.filter(posts::id.eq(id)))
        .execute(&mut conn)
        .await?;

    if deleted == 0 {
        return Err(AppError::not_found(format!("No post with id {id}")));
    }

    Ok(())
}

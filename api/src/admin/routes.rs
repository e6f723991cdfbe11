use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{
    App,
    analytics::routes::get_all_analytics,
    blog::{
        comment::moderate::{
            approve_comment, bulk_approve, list_comments, reject_comment, toggle_comment,
        },
        post::admin::{create_post, delete_post, update_post},
        trending::replace_trending,
    },
    media::upload_media,
};

use super::dashboard::get_dashboard;

// Every handler behind this router authenticates through the `AuthUser`
// extractor.
pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/dashboard", get(get_dashboard))
        .route("/analytics", get(get_all_analytics))
        .route("/comments", get(list_comments))
        .route("/comments/bulk-approve", post(bulk_approve))
        .route("/comments/{id}/approve", post(approve_comment))
        .route("/comments/{id}/toggle", post(toggle_comment))
        .route("/comments/{id}", delete(reject_comment))
        .route("/posts", post(create_post))
        .route("/posts/{id}", put(update_post).delete(delete_post))
        .route("/trending", put(replace_trending))
        .route("/media", put(upload_media))
        .route("/messages", get(crate::contact::list_messages))
}

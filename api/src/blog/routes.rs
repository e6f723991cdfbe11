use axum::{
    Router,
    routing::{get, post},
};

use crate::App;

use super::{
    comment::{create::create_comment, get::get_comments},
    post::{
        get::get_post,
        list::{list_featured, list_posts, list_recent},
    },
    trending::get_trending,
};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/posts", get(list_posts))
        .route("/posts/featured", get(list_featured))
        .route("/posts/recent", get(list_recent))
        .route("/posts/{slug}", get(get_post))
        .route("/trending", get(get_trending))
        .route("/{slug}/comments", get(get_comments))
        .route("/{slug}/comments", post(create_comment))
}

use axum::{Json, extract::State, http::StatusCode};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};
use serde::Deserialize;

use crate::{
    App,
    blog::models::trending::NewTrendingPost,
    error::{AppError, ServerError},
    identity::AuthUser,
    schema::trending_posts,
};

/// Insertion order is the trending rank. Read failures degrade to an empty
/// list like every other public read.
#[axum::debug_handler]
pub async fn get_trending(State(ctx): State<App>) -> Json<Vec<String>> {
    let slugs: Result<Vec<String>, ServerError> = async {
        let mut conn = ctx.diesel.get().await?;
        Ok(trending_posts::table
            .order((trending_posts::created_at.asc(), trending_posts::id.asc()))
            .select(trending_posts::slug)
            .load::<String>(&mut conn)
            .await?)
    }
    .await;

    match slugs {
        Ok(slugs) => Json(slugs),
        Err(error) => {
            tracing::error!(%error, "Failed to fetch trending list, serving none");
            Json(vec![])
        }
    }
}

#[derive(Deserialize)]
pub struct TrendingSubmission {
    slugs: Vec<String>,
}

/// Replaces the curated set. Delete-then-insert runs in one transaction, so
/// an interrupted replace leaves the previous list intact and a retry
/// converges.
#[axum::debug_handler]
pub async fn replace_trending(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    crate::json::Json(body): crate::json::Json<TrendingSubmission>,
) -> Result<Json<Vec<String>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let rows: Vec<NewTrendingPost> = body
        .slugs
        .iter()
        .map(|slug| NewTrendingPost {
            slug: slug.trim().to_string(),
        })
        .filter(|row| !row.slug.is_empty())
        .collect();

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            diesel::delete(trending_posts::table).execute(conn).await?;

            if !rows.is_empty() {
                diesel::insert_into(trending_posts::table)
                    .values(&rows)
                    .execute(conn)
                    .await?;
            }

            Ok(())
        }
        .scope_boxed()
    })
    .await
    .map_err(map_trending_error)?;

    Ok(Json(body.slugs))
}

// The admin needs an actionable message when the table was never created,
// rather than a generic database error.
fn map_trending_error(e: diesel::result::Error) -> AppError {
    if let diesel::result::Error::DatabaseError(_, info) = &e {
        if info.message().contains("trending_posts") {
            return (
                "The trending_posts table is missing or misconfigured; create it \
                 before curating the trending list"
                    .to_string(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
                .into();
        }
    }

    e.into()
}

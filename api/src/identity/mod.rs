use axum::http::request::Parts;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::{
    App,
    error::{ApiRequestError, AppError},
    schema::{identities, sessions},
};

use self::models::identity::Identity;

pub mod models;
pub mod routes;

pub const COOKIE_NAME: &str = "auth_token";

#[derive(thiserror::Error, Debug)]
pub enum AuthenticationError {
    #[error("Authentication required, but no cookie `{COOKIE_NAME}` found in headers.")]
    NoCookie,

    #[error(
        "Unauthorized, please check if you're logged in by refreshing the \
         page. This could be due to an expired session or token has became invalid."
    )]
    Unauthorized,

    #[error("Invalid email or password.")]
    InvalidCredentials,
}

impl From<AuthenticationError> for AppError {
    fn from(e: AuthenticationError) -> Self {
        AppError::Request {
            msg: e.to_string(),
            status: e.status_code(),
            code: e.error_code(),
        }
    }
}

pub struct MaybeAuthUser(pub Result<Identity, AuthenticationError>);

impl axum::extract::FromRequestParts<App> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let jar = axum_extra::extract::cookie::CookieJar::from_headers(&parts.headers);

        let session_token: &str = if let Some(t) = jar.get(COOKIE_NAME) {
            t.value()
        } else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::NoCookie)));
        };

        let now = chrono::Utc::now().naive_utc();
        let mut conn = state.diesel.get().await?;

        let identity = sessions::table
            .inner_join(identities::table)
            .filter(sessions::token.eq(session_token))
            .filter(sessions::active.eq(true))
            .filter(sessions::expires_at.gt(now))
            .filter(sessions::issued_at.le(now))
            .select((sessions::id, Identity::as_select()))
            .first::<(i32, Identity)>(&mut conn)
            .await
            .optional()?;

        let Some((session_id, identity)) = identity else {
            return Ok(MaybeAuthUser(Err(AuthenticationError::Unauthorized)));
        };

        // Sliding expiry: any authenticated activity pushes the idle
        // deadline forward, so only inactivity ends the session.
        diesel::update(sessions::table.filter(sessions::id.eq(session_id)))
            .set((
                sessions::expires_at.eq(now + state.config.session_idle),
                sessions::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(MaybeAuthUser(Ok(identity)))
    }
}

pub struct AuthUser(pub Identity);

impl axum::extract::FromRequestParts<App> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &App) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(auth_user) = MaybeAuthUser::from_request_parts(parts, state).await?;

        Ok(AuthUser(auth_user?))
    }
}

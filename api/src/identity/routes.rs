use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    error::{ApiRequestError, AppError},
    identity::models::{
        identity::{Identity, NewIdentity},
        session::Session,
    },
    real_ip::ClientIp,
    schema::{identities, sessions},
};

use super::{AuthenticationError, COOKIE_NAME, MaybeAuthUser};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/is_auth", get(is_auth))
}

impl ApiRequestError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::NoCookie => StatusCode::BAD_REQUEST,
            AuthenticationError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthenticationError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_code(&self) -> &'static str {
        "AUTH_ERR"
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(serde::Serialize)]
struct IsAuth {
    is_auth: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

async fn is_auth(MaybeAuthUser(identity): MaybeAuthUser) -> Result<Json<IsAuth>, AppError> {
    Ok(Json(IsAuth {
        is_auth: identity.is_ok(),
        email: identity.ok().map(|i| i.email),
    }))
}

#[axum::debug_handler]
async fn login(
    State(ctx): State<App>,
    ClientIp(ip): ClientIp,
    crate::json::Json(body): crate::json::Json<LoginRequest>,
) -> Result<(CookieJar, Json<IsAuth>), AppError> {
    ctx.check_public_rate(ip)?;

    let admin = ctx.config.admin.as_ref().ok_or((
        "Admin login is not configured on this deployment",
        StatusCode::SERVICE_UNAVAILABLE,
    ))?;

    let email = body.email.trim().to_lowercase();
    if email != admin.email.trim().to_lowercase() || body.password != admin.password {
        return Err(AuthenticationError::InvalidCredentials.into());
    }

    let mut conn = ctx.diesel.get().await?;

    let identity = identities::table
        .filter(identities::email.eq(&email))
        .select(Identity::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    let identity = match identity {
        Some(identity) => identity,
        None => {
            diesel::insert_into(identities::table)
                .values(&NewIdentity {
                    email: email.clone(),
                })
                .returning(Identity::as_returning())
                .get_result(&mut conn)
                .await?
        }
    };

    let session = Session::new_with_identity_id(identity.id, ctx.config.session_idle);

    diesel::insert_into(sessions::table)
        .values(&session)
        .execute(&mut conn)
        .await?;

    let auth_cookie = axum_extra::extract::cookie::Cookie::build((COOKIE_NAME, session.token))
        .secure(true)
        .http_only(true)
        .path("/");

    Ok((
        CookieJar::new().add(auth_cookie),
        Json(IsAuth {
            is_auth: true,
            email: Some(identity.email),
        }),
    ))
}

#[axum::debug_handler]
async fn logout(State(ctx): State<App>, jar: CookieJar) -> Result<CookieJar, AppError> {
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        let mut conn = ctx.diesel.get().await?;

        diesel::update(sessions::table.filter(sessions::token.eq(cookie.value())))
            .set(sessions::active.eq(false))
            .execute(&mut conn)
            .await?;
    }

    let auth_cookie = axum_extra::extract::cookie::Cookie::build(COOKIE_NAME)
        .path("/")
        .expires(time::OffsetDateTime::UNIX_EPOCH);

    Ok(CookieJar::new().add(auth_cookie))
}

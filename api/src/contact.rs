use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App, error::AppError, identity::AuthUser, real_ip::ClientIp, schema::contact_messages,
};

pub fn route() -> Router<App> {
    Router::<App>::new().route("/contact", post(create_contact))
}

#[derive(Queryable, Selectable, Identifiable, Debug, Serialize)]
#[diesel(table_name = crate::schema::contact_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContactMessage {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::contact_messages)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct ContactSubmission {
    name: String,
    email: String,
    message: String,
}

impl ContactSubmission {
    fn validate(&mut self) -> Result<(), &'static str> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err("No name provided");
        }

        self.email = self.email.trim().to_lowercase();
        if self.email.is_empty() || !self.email.contains('@') {
            return Err("Invalid email");
        }

        self.message = self.message.trim().to_string();
        if self.message.is_empty() {
            return Err("No message provided");
        }
        if self.message.len() > 10_000 {
            return Err("Message too long");
        }

        Ok(())
    }
}

/// Write path: failures surface to the sender so the form can show an error
/// banner instead of silently dropping the message.
#[axum::debug_handler]
pub async fn create_contact(
    State(ctx): State<App>,
    ClientIp(ip): ClientIp,
    crate::json::Json(mut submission): crate::json::Json<ContactSubmission>,
) -> Result<StatusCode, AppError> {
    ctx.check_public_rate(ip)?;

    submission
        .validate()
        .map_err(|e| (e, StatusCode::BAD_REQUEST))?;

    let mut conn = ctx.diesel.get().await?;

    diesel::insert_into(contact_messages::table)
        .values(&NewContactMessage {
            name: submission.name,
            email: submission.email,
            message: submission.message,
        })
        .execute(&mut conn)
        .await?;

    Ok(StatusCode::CREATED)
}

#[axum::debug_handler]
pub async fn list_messages(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    let mut conn = ctx.diesel.get().await?;

    let rows = contact_messages::table
        .order(contact_messages::created_at.desc())
        .select(ContactMessage::as_select())
        .load::<ContactMessage>(&mut conn)
        .await?;

    Ok(Json(rows))
}

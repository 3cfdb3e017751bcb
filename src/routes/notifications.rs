use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::Notification,
    routes::complaints::to_iso,
    schema::notifications,
    state::AppState,
};

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub complaint_id: Option<i64>,
    pub channel: String,
    pub status: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<NotificationResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Notification> = notifications::table
        .filter(notifications::user_id.eq(user.id))
        .order(notifications::created_at.desc())
        .load(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|notification| NotificationResponse {
            id: notification.id,
            complaint_id: notification.complaint_id,
            channel: notification.channel,
            status: notification.status,
            subject: notification.subject,
            body: notification.body,
            sent_at: notification.sent_at.map(to_iso),
            read_at: notification.read_at.map(to_iso),
            created_at: to_iso(notification.created_at),
        })
        .collect();

    Ok(Json(response))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;

    let notification: Notification = notifications::table
        .find(notification_id)
        .first(&mut conn)
        .optional()?
        .ok_or(AppError::NotFound)?;

    // Another user's notification is indistinguishable from a missing one.
    if notification.user_id != user.id {
        return Err(AppError::NotFound);
    }

    // Marking twice keeps the first read stamp.
    if notification.read_at.is_none() {
        diesel::update(notifications::table.find(notification.id))
            .set(notifications::read_at.eq(Utc::now().naive_utc()))
            .execute(&mut conn)?;
    }

    Ok(StatusCode::NO_CONTENT)
}

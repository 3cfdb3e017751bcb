use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::models::NewNotification;
use crate::schema::{notifications, subscriptions};

pub const CHANNEL_IN_APP: &str = "IN_APP";
pub const STATUS_SENT: &str = "SENT";

/// Subscribes a user to a complaint. Safe to call repeatedly; an existing
/// subscription is left untouched.
pub fn subscribe(conn: &mut PgConnection, user_id: Uuid, complaint_id: i64) -> QueryResult<()> {
    diesel::insert_into(subscriptions::table)
        .values(&crate::models::NewSubscription {
            user_id,
            complaint_id,
        })
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

/// Writes one IN_APP notification per subscriber of the complaint, minus
/// the acting user. In-app rows are born SENT; EMAIL delivery has no
/// sender in this service.
pub fn notify_subscribers(
    conn: &mut PgConnection,
    complaint_id: i64,
    actor_id: Uuid,
    subject: &str,
    body: &str,
) -> QueryResult<usize> {
    let subscriber_ids: Vec<Uuid> = subscriptions::table
        .filter(subscriptions::complaint_id.eq(complaint_id))
        .filter(subscriptions::user_id.ne(actor_id))
        .select(subscriptions::user_id)
        .load(conn)?;

    if subscriber_ids.is_empty() {
        return Ok(0);
    }

    let now = Utc::now().naive_utc();
    let rows: Vec<NewNotification> = subscriber_ids
        .into_iter()
        .map(|user_id| NewNotification {
            user_id,
            complaint_id: Some(complaint_id),
            channel: CHANNEL_IN_APP.to_string(),
            status: STATUS_SENT.to_string(),
            subject: Some(subject.to_string()),
            body: body.to_string(),
            sent_at: Some(now),
        })
        .collect();

    diesel::insert_into(notifications::table)
        .values(&rows)
        .execute(conn)
}

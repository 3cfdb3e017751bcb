use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{ActivityEntry, NewActivityEntry};
use crate::schema::activity_log;

pub const COMPLAINT_CREATED: &str = "COMPLAINT_CREATED";
pub const STATUS_CHANGED: &str = "STATUS_CHANGED";
pub const ASSIGNEE_CHANGED: &str = "ASSIGNEE_CHANGED";
pub const PRIORITY_CHANGED: &str = "PRIORITY_CHANGED";
pub const COMMENT_ADDED: &str = "COMMENT_ADDED";
pub const USER_CREATED: &str = "USER_CREATED";
pub const USER_UPDATED: &str = "USER_UPDATED";

/// Appends one audit row. Called inside the same transaction as the write
/// it describes, so the log never records a change that was rolled back.
pub fn record(
    conn: &mut PgConnection,
    complaint_id: Option<i64>,
    actor_id: Option<Uuid>,
    action: &str,
    from_value: Option<&str>,
    to_value: Option<&str>,
    meta: Option<Value>,
) -> QueryResult<()> {
    let entry = NewActivityEntry {
        complaint_id,
        actor_id,
        action: action.to_string(),
        from_value: from_value.map(str::to_string),
        to_value: to_value.map(str::to_string),
        meta,
    };

    diesel::insert_into(activity_log::table)
        .values(&entry)
        .execute(conn)?;
    Ok(())
}

pub fn for_complaint(conn: &mut PgConnection, complaint_id: i64) -> QueryResult<Vec<ActivityEntry>> {
    activity_log::table
        .filter(activity_log::complaint_id.eq(complaint_id))
        .order(activity_log::created_at.desc())
        .load(conn)
}

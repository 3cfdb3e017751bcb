use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub department_id: Option<i32>,
    pub is_active: bool,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub department_id: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = departments)]
pub struct Department {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = departments)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = categories)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = sla_policies)]
pub struct SlaPolicy {
    pub id: i32,
    pub priority: String,
    pub time_to_first_response_minutes: i32,
    pub time_to_resolution_minutes: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sla_policies)]
pub struct NewSlaPolicy {
    pub priority: String,
    pub time_to_first_response_minutes: i32,
    pub time_to_resolution_minutes: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = complaints)]
pub struct Complaint {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub student_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub department_id: i32,
    pub category_id: Option<i32>,
    pub is_sla_breached: bool,
    pub sla_due_first_response_at: Option<NaiveDateTime>,
    pub sla_due_resolution_at: Option<NaiveDateTime>,
    pub first_response_at: Option<NaiveDateTime>,
    pub resolved_at: Option<NaiveDateTime>,
    pub closed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = complaints)]
pub struct NewComplaint {
    pub code: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub student_id: Uuid,
    pub department_id: i32,
    pub category_id: Option<i32>,
    pub sla_due_first_response_at: Option<NaiveDateTime>,
    pub sla_due_resolution_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = comments)]
#[diesel(belongs_to(Complaint))]
pub struct Comment {
    pub id: i64,
    pub complaint_id: i64,
    pub author_id: Uuid,
    pub body: String,
    pub is_internal: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub complaint_id: i64,
    pub author_id: Uuid,
    pub body: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Associations)]
#[diesel(table_name = subscriptions)]
#[diesel(belongs_to(Complaint))]
#[diesel(belongs_to(Profile, foreign_key = user_id))]
#[diesel(primary_key(user_id, complaint_id))]
pub struct Subscription {
    pub user_id: Uuid,
    pub complaint_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub complaint_id: i64,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = activity_log)]
pub struct ActivityEntry {
    pub id: i64,
    pub complaint_id: Option<i64>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = activity_log)]
pub struct NewActivityEntry {
    pub complaint_id: Option<i64>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub meta: Option<serde_json::Value>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: i64,
    pub user_id: Uuid,
    pub complaint_id: Option<i64>,
    pub channel: String,
    pub status: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: Option<NaiveDateTime>,
    pub read_at: Option<NaiveDateTime>,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub complaint_id: Option<i64>,
    pub channel: String,
    pub status: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: Option<NaiveDateTime>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(Profile, foreign_key = user_id))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use diesel::{pg::PgConnection, prelude::*};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    activity,
    auth::AuthenticatedUser,
    domain::{
        lifecycle,
        role::{Action, Role},
        status::{Priority, Status},
        visibility,
    },
    error::{AppError, AppResult},
    models::{Category, Complaint, Department, NewComplaint, Profile, SlaPolicy},
    notify,
    schema::{categories, complaints, departments, profiles, sla_policies},
    state::AppState,
};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_ATTEMPTS: usize = 5;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

#[derive(Deserialize)]
pub struct CreateComplaintRequest {
    pub title: String,
    pub description: String,
    pub department_id: i32,
    pub category_id: Option<i32>,
    pub priority: Option<String>,
}

#[derive(Deserialize)]
pub struct ComplaintListQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct UpdateAssigneeRequest {
    #[serde(default)]
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Deserialize)]
pub struct UpdatePriorityRequest {
    pub priority: String,
}

#[derive(Serialize, Clone)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize, Clone)]
pub struct CatalogRef {
    pub id: i32,
    pub name: String,
}

#[derive(Serialize)]
pub struct ComplaintResponse {
    pub id: i64,
    pub code: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub student: PersonRef,
    pub assignee: Option<PersonRef>,
    pub department: CatalogRef,
    pub category: Option<CatalogRef>,
    pub is_sla_breached: bool,
    pub sla_due_first_response_at: Option<String>,
    pub sla_due_resolution_at: Option<String>,
    pub first_response_at: Option<String>,
    pub resolved_at: Option<String>,
    pub closed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct ActivityResponse {
    pub id: i64,
    pub action: String,
    pub actor: Option<PersonRef>,
    pub from_value: Option<String>,
    pub to_value: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub created_at: String,
}

pub async fn create_complaint(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateComplaintRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    user.role.require(Action::CreateComplaint)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::bad_request(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }

    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::bad_request("description must not be empty"));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::bad_request(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }

    let priority = match payload.priority.as_deref() {
        Some(value) => Priority::parse(value)
            .ok_or_else(|| AppError::bad_request(format!("unknown priority: {value}")))?,
        None => Priority::Medium,
    };

    let mut conn = state.db()?;

    departments::table
        .find(payload.department_id)
        .first::<Department>(&mut conn)
        .optional()?
        .filter(|department| department.is_active)
        .ok_or_else(|| AppError::bad_request("unknown department"))?;

    if let Some(category_id) = payload.category_id {
        categories::table
            .find(category_id)
            .first::<Category>(&mut conn)
            .optional()?
            .filter(|category| category.is_active)
            .ok_or_else(|| AppError::bad_request("unknown category"))?;
    }

    let now = Utc::now().naive_utc();
    let policy: Option<SlaPolicy> = sla_policies::table
        .filter(sla_policies::priority.eq(priority.as_str()))
        .first(&mut conn)
        .optional()?;
    let (due_first_response, due_resolution) = match &policy {
        Some(policy) => (
            Some(now + ChronoDuration::minutes(policy.time_to_first_response_minutes as i64)),
            Some(now + ChronoDuration::minutes(policy.time_to_resolution_minutes as i64)),
        ),
        None => (None, None),
    };

    let complaint = conn.transaction::<Complaint, AppError, _>(|conn| {
        let complaint = insert_complaint(
            conn,
            user.id,
            &title,
            &description,
            priority,
            payload.department_id,
            payload.category_id,
            due_first_response,
            due_resolution,
        )?;

        activity::record(
            conn,
            Some(complaint.id),
            Some(user.id),
            activity::COMPLAINT_CREATED,
            None,
            Some(&complaint.status),
            Some(json!({ "title": complaint.title })),
        )?;

        notify::subscribe(conn, user.id, complaint.id)?;

        Ok(complaint)
    })?;

    info!(complaint_id = complaint.id, code = %complaint.code, "complaint created");

    let response = to_complaint_response(&mut conn, complaint)?;
    Ok(Json(response))
}

pub async fn list_complaints(
    State(state): State<AppState>,
    Query(params): Query<ComplaintListQuery>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ComplaintResponse>>> {
    let mut conn = state.db()?;

    let mut query = complaints::table.into_boxed();

    // Students only ever see their own rows; the same rule that guards
    // single fetches is applied here as a filter.
    if !user.role.allows(Action::ViewAllComplaints) {
        query = query.filter(complaints::student_id.eq(user.id));
    }

    if let Some(raw) = params.status.as_deref() {
        let status = Status::parse(raw)
            .ok_or_else(|| AppError::bad_request(format!("unknown status: {raw}")))?;
        query = query.filter(complaints::status.eq(status.as_str()));
    }

    let rows: Vec<Complaint> = query.order(complaints::created_at.desc()).load(&mut conn)?;

    let response = to_complaint_responses(&mut conn, rows)?;
    Ok(Json(response))
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
) -> AppResult<Json<ComplaintResponse>> {
    let mut conn = state.db()?;

    let complaint = load_visible_complaint(&mut conn, &user, complaint_id)?;
    let response = to_complaint_response(&mut conn, complaint)?;
    Ok(Json(response))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    user.role.require(Action::TransitionComplaint)?;

    let mut conn = state.db()?;

    let updated = conn.transaction::<Complaint, AppError, _>(|conn| {
        let complaint: Complaint = complaints::table
            .find(complaint_id)
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now().naive_utc();
        let plan = lifecycle::plan_transition(user.role, &complaint, &payload.status, now)?;

        diesel::update(complaints::table.find(complaint.id))
            .set((
                complaints::status.eq(plan.status.as_str()),
                complaints::resolved_at.eq(plan.resolved_at),
                complaints::closed_at.eq(plan.closed_at),
                complaints::updated_at.eq(plan.updated_at),
            ))
            .execute(conn)?;

        activity::record(
            conn,
            Some(complaint.id),
            Some(user.id),
            activity::STATUS_CHANGED,
            Some(&complaint.status),
            Some(plan.status.as_str()),
            None,
        )?;

        notify::notify_subscribers(
            conn,
            complaint.id,
            user.id,
            &format!("Complaint {} is now {}", complaint.code, plan.status.as_str()),
            &format!(
                "Status changed from {} to {}.",
                complaint.status,
                plan.status.as_str()
            ),
        )?;

        let refreshed = complaints::table.find(complaint.id).first(conn)?;
        Ok(refreshed)
    })?;

    info!(complaint_id = updated.id, status = %updated.status, "complaint status updated");

    let response = to_complaint_response(&mut conn, updated)?;
    Ok(Json(response))
}

pub async fn update_assignee(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateAssigneeRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    user.role.require(Action::AssignComplaint)?;

    let Some(assignee_request) = payload.assignee_id else {
        return Err(AppError::bad_request("assignee_id is required"));
    };

    let mut conn = state.db()?;

    let updated = conn.transaction::<Complaint, AppError, _>(|conn| {
        let complaint: Complaint = complaints::table
            .find(complaint_id)
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound)?;

        if let Some(assignee_id) = assignee_request {
            let target: Profile = profiles::table
                .find(assignee_id)
                .first(conn)
                .optional()?
                .ok_or_else(|| AppError::bad_request("unknown assignee"))?;

            let is_staff = Role::parse(&target.role)
                .map(|role| role.is_staff())
                .unwrap_or(false);
            if !target.is_active || !is_staff {
                return Err(AppError::bad_request(
                    "assignee must be an active staff member",
                ));
            }
        }

        let now = Utc::now().naive_utc();
        diesel::update(complaints::table.find(complaint.id))
            .set((
                complaints::assignee_id.eq(assignee_request),
                complaints::updated_at.eq(now),
            ))
            .execute(conn)?;

        let from_value = complaint.assignee_id.map(|id| id.to_string());
        let to_value = assignee_request.map(|id| id.to_string());
        activity::record(
            conn,
            Some(complaint.id),
            Some(user.id),
            activity::ASSIGNEE_CHANGED,
            from_value.as_deref(),
            to_value.as_deref(),
            None,
        )?;

        if let Some(assignee_id) = assignee_request {
            notify::subscribe(conn, assignee_id, complaint.id)?;
        }

        let refreshed = complaints::table.find(complaint.id).first(conn)?;
        Ok(refreshed)
    })?;

    let response = to_complaint_response(&mut conn, updated)?;
    Ok(Json(response))
}

pub async fn update_priority(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdatePriorityRequest>,
) -> AppResult<Json<ComplaintResponse>> {
    user.role.require(Action::ChangePriority)?;

    let priority = Priority::parse(&payload.priority).ok_or_else(|| {
        AppError::bad_request(format!("unknown priority: {}", payload.priority))
    })?;

    let mut conn = state.db()?;

    let updated = conn.transaction::<Complaint, AppError, _>(|conn| {
        let complaint: Complaint = complaints::table
            .find(complaint_id)
            .first(conn)
            .optional()?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now().naive_utc();
        diesel::update(complaints::table.find(complaint.id))
            .set((
                complaints::priority.eq(priority.as_str()),
                complaints::updated_at.eq(now),
            ))
            .execute(conn)?;

        activity::record(
            conn,
            Some(complaint.id),
            Some(user.id),
            activity::PRIORITY_CHANGED,
            Some(&complaint.priority),
            Some(priority.as_str()),
            None,
        )?;

        let refreshed = complaints::table.find(complaint.id).first(conn)?;
        Ok(refreshed)
    })?;

    let response = to_complaint_response(&mut conn, updated)?;
    Ok(Json(response))
}

pub async fn list_activity(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ActivityResponse>>> {
    user.role.require(Action::ViewActivityLog)?;

    let mut conn = state.db()?;

    complaints::table
        .find(complaint_id)
        .first::<Complaint>(&mut conn)
        .optional()?
        .ok_or(AppError::NotFound)?;

    let entries = activity::for_complaint(&mut conn, complaint_id)?;

    let mut actor_ids: Vec<Uuid> = entries.iter().filter_map(|entry| entry.actor_id).collect();
    actor_ids.sort();
    actor_ids.dedup();

    let actor_names: HashMap<Uuid, String> = profiles::table
        .filter(profiles::id.eq_any(&actor_ids))
        .select((profiles::id, profiles::name))
        .load::<(Uuid, String)>(&mut conn)?
        .into_iter()
        .collect();

    let response = entries
        .into_iter()
        .map(|entry| ActivityResponse {
            id: entry.id,
            action: entry.action,
            actor: entry.actor_id.map(|id| PersonRef {
                id,
                name: actor_names.get(&id).cloned().unwrap_or_default(),
            }),
            from_value: entry.from_value,
            to_value: entry.to_value,
            meta: entry.meta,
            created_at: to_iso(entry.created_at),
        })
        .collect();

    Ok(Json(response))
}

/// Loads a complaint and applies the visibility rule. A row that exists
/// but is not visible to the actor is reported as NotFound.
pub(crate) fn load_visible_complaint(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
    complaint_id: i64,
) -> AppResult<Complaint> {
    let complaint: Complaint = complaints::table
        .find(complaint_id)
        .first(conn)
        .optional()?
        .ok_or(AppError::NotFound)?;

    if !visibility::can_view(user.role, user.id, &complaint) {
        return Err(AppError::NotFound);
    }

    Ok(complaint)
}

#[allow(clippy::too_many_arguments)]
fn insert_complaint(
    conn: &mut PgConnection,
    student_id: Uuid,
    title: &str,
    description: &str,
    priority: Priority,
    department_id: i32,
    category_id: Option<i32>,
    due_first_response: Option<NaiveDateTime>,
    due_resolution: Option<NaiveDateTime>,
) -> AppResult<Complaint> {
    // Each attempt runs in its own savepoint so a code collision can be
    // retried without aborting the surrounding transaction.
    for _ in 0..CODE_ATTEMPTS {
        let new_complaint = NewComplaint {
            code: generate_code(),
            title: title.to_string(),
            description: description.to_string(),
            status: Status::Submitted.as_str().to_string(),
            priority: priority.as_str().to_string(),
            student_id,
            department_id,
            category_id,
            sla_due_first_response_at: due_first_response,
            sla_due_resolution_at: due_resolution,
        };

        let attempt = conn.transaction::<Complaint, diesel::result::Error, _>(|conn| {
            diesel::insert_into(complaints::table)
                .values(&new_complaint)
                .get_result(conn)
        });

        match attempt {
            Ok(complaint) => return Ok(complaint),
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => continue,
            Err(err) => return Err(AppError::from(err)),
        }
    }

    Err(AppError::internal(
        "could not allocate a unique complaint code",
    ))
}

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("CMP-{suffix}")
}

pub(crate) fn to_complaint_response(
    conn: &mut PgConnection,
    complaint: Complaint,
) -> AppResult<ComplaintResponse> {
    to_complaint_responses(conn, vec![complaint])?
        .pop()
        .ok_or_else(|| AppError::internal("complaint response missing"))
}

pub(crate) fn to_complaint_responses(
    conn: &mut PgConnection,
    rows: Vec<Complaint>,
) -> AppResult<Vec<ComplaintResponse>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut person_ids: Vec<Uuid> = Vec::with_capacity(rows.len() * 2);
    for complaint in &rows {
        person_ids.push(complaint.student_id);
        if let Some(assignee_id) = complaint.assignee_id {
            person_ids.push(assignee_id);
        }
    }
    person_ids.sort();
    person_ids.dedup();

    let person_names: HashMap<Uuid, String> = profiles::table
        .filter(profiles::id.eq_any(&person_ids))
        .select((profiles::id, profiles::name))
        .load::<(Uuid, String)>(conn)?
        .into_iter()
        .collect();

    let department_names: HashMap<i32, String> = departments::table
        .select((departments::id, departments::name))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();

    let category_names: HashMap<i32, String> = categories::table
        .select((categories::id, categories::name))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();

    let responses = rows
        .into_iter()
        .map(|complaint| {
            let student = PersonRef {
                id: complaint.student_id,
                name: person_names
                    .get(&complaint.student_id)
                    .cloned()
                    .unwrap_or_default(),
            };
            let assignee = complaint.assignee_id.map(|id| PersonRef {
                id,
                name: person_names.get(&id).cloned().unwrap_or_default(),
            });
            let department = CatalogRef {
                id: complaint.department_id,
                name: department_names
                    .get(&complaint.department_id)
                    .cloned()
                    .unwrap_or_default(),
            };
            let category = complaint.category_id.map(|id| CatalogRef {
                id,
                name: category_names.get(&id).cloned().unwrap_or_default(),
            });

            ComplaintResponse {
                id: complaint.id,
                code: complaint.code,
                title: complaint.title,
                description: complaint.description,
                status: complaint.status,
                priority: complaint.priority,
                student,
                assignee,
                department,
                category,
                is_sla_breached: complaint.is_sla_breached,
                sla_due_first_response_at: complaint.sla_due_first_response_at.map(to_iso),
                sla_due_resolution_at: complaint.sla_due_resolution_at.map(to_iso),
                first_response_at: complaint.first_response_at.map(to_iso),
                resolved_at: complaint.resolved_at.map(to_iso),
                closed_at: complaint.closed_at.map(to_iso),
                created_at: to_iso(complaint.created_at),
                updated_at: to_iso(complaint.updated_at),
            }
        })
        .collect();

    Ok(responses)
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

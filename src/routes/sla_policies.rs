use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    domain::{role::Action, status::Priority},
    error::{AppError, AppResult},
    models::{NewSlaPolicy, SlaPolicy},
    routes::complaints::to_iso,
    schema::sla_policies,
    state::AppState,
};

#[derive(Deserialize)]
pub struct UpsertSlaPolicyRequest {
    pub time_to_first_response_minutes: i32,
    pub time_to_resolution_minutes: i32,
}

#[derive(Serialize)]
pub struct SlaPolicyResponse {
    pub id: i32,
    pub priority: String,
    pub time_to_first_response_minutes: i32,
    pub time_to_resolution_minutes: i32,
    pub created_at: String,
    pub updated_at: String,
}

fn to_response(policy: SlaPolicy) -> SlaPolicyResponse {
    SlaPolicyResponse {
        id: policy.id,
        priority: policy.priority,
        time_to_first_response_minutes: policy.time_to_first_response_minutes,
        time_to_resolution_minutes: policy.time_to_resolution_minutes,
        created_at: to_iso(policy.created_at),
        updated_at: to_iso(policy.updated_at),
    }
}

pub async fn list_policies(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<SlaPolicyResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<SlaPolicy> = sla_policies::table
        .order(sla_policies::id.asc())
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(to_response).collect()))
}

/// One policy per priority. PUT either creates the row or replaces the
/// windows of the existing one.
pub async fn upsert_policy(
    State(state): State<AppState>,
    Path(priority): Path<String>,
    user: AuthenticatedUser,
    Json(payload): Json<UpsertSlaPolicyRequest>,
) -> AppResult<Json<SlaPolicyResponse>> {
    user.role.require(Action::ManageCatalog)?;

    let priority = Priority::parse(&priority)
        .ok_or_else(|| AppError::bad_request(format!("unknown priority: {priority}")))?;

    if payload.time_to_first_response_minutes <= 0 || payload.time_to_resolution_minutes <= 0 {
        return Err(AppError::bad_request("sla windows must be positive"));
    }

    let mut conn = state.db()?;

    let new_policy = NewSlaPolicy {
        priority: priority.as_str().to_string(),
        time_to_first_response_minutes: payload.time_to_first_response_minutes,
        time_to_resolution_minutes: payload.time_to_resolution_minutes,
    };

    let policy: SlaPolicy = diesel::insert_into(sla_policies::table)
        .values(&new_policy)
        .on_conflict(sla_policies::priority)
        .do_update()
        .set((
            sla_policies::time_to_first_response_minutes
                .eq(payload.time_to_first_response_minutes),
            sla_policies::time_to_resolution_minutes.eq(payload.time_to_resolution_minutes),
            sla_policies::updated_at.eq(Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)?;

    Ok(Json(to_response(policy)))
}

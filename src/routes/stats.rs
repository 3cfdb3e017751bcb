use std::collections::HashMap;

use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::Serialize;

use crate::{
    auth::AuthenticatedUser,
    domain::{
        role::{Action, Role},
        stats::{self, ComplaintStats, RoleCounts},
    },
    error::AppResult,
    models::{Complaint, Profile},
    schema::{categories, complaints, departments, profiles},
    state::AppState,
};

#[derive(Serialize)]
pub struct GroupCount {
    pub id: i32,
    pub name: String,
    pub total: i64,
}

#[derive(Serialize)]
pub struct OverviewResponse {
    pub complaints: ComplaintStats,
    pub roles: Option<RoleCounts>,
    pub departments: Option<Vec<GroupCount>>,
    pub categories: Option<Vec<GroupCount>>,
}

/// Dashboard numbers over the complaints the actor authored.
pub async fn my_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ComplaintStats>> {
    let mut conn = state.db()?;

    let rows: Vec<Complaint> = complaints::table
        .filter(complaints::student_id.eq(user.id))
        .load(&mut conn)?;

    Ok(Json(stats::summarize(&rows)))
}

/// Dashboard numbers over every complaint. Admins additionally get role
/// counts and per-department/per-category totals.
pub async fn overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<OverviewResponse>> {
    user.role.require(Action::ViewAllComplaints)?;

    let mut conn = state.db()?;

    let rows: Vec<Complaint> = complaints::table.load(&mut conn)?;
    let complaint_stats = stats::summarize(&rows);

    if !matches!(user.role, Role::Admin) {
        return Ok(Json(OverviewResponse {
            complaints: complaint_stats,
            roles: None,
            departments: None,
            categories: None,
        }));
    }

    let people: Vec<Profile> = profiles::table.load(&mut conn)?;
    let roles = stats::count_roles(&people);

    let mut department_totals: HashMap<i32, i64> = HashMap::new();
    let mut category_totals: HashMap<i32, i64> = HashMap::new();
    for complaint in &rows {
        *department_totals.entry(complaint.department_id).or_default() += 1;
        if let Some(category_id) = complaint.category_id {
            *category_totals.entry(category_id).or_default() += 1;
        }
    }

    let department_names: Vec<(i32, String)> = departments::table
        .select((departments::id, departments::name))
        .load(&mut conn)?;
    let category_names: Vec<(i32, String)> = categories::table
        .select((categories::id, categories::name))
        .load(&mut conn)?;

    Ok(Json(OverviewResponse {
        complaints: complaint_stats,
        roles: Some(roles),
        departments: Some(named_counts(department_names, &department_totals)),
        categories: Some(named_counts(category_names, &category_totals)),
    }))
}

fn named_counts(names: Vec<(i32, String)>, totals: &HashMap<i32, i64>) -> Vec<GroupCount> {
    names
        .into_iter()
        .map(|(id, name)| GroupCount {
            id,
            name,
            total: totals.get(&id).copied().unwrap_or(0),
        })
        .collect()
}

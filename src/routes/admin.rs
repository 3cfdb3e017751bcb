use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    activity,
    auth::{password::hash_password, AuthenticatedUser},
    domain::role::{Action, Role},
    error::{AppError, AppResult},
    models::{Department, NewProfile, Profile},
    routes::complaints::{to_iso, CatalogRef},
    schema::{complaints, departments, profiles},
    state::AppState,
};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub department_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub department_id: Option<Option<i32>>,
}

#[derive(AsChangeset)]
#[diesel(table_name = profiles)]
struct UpdateProfileChangeset<'a> {
    name: Option<&'a str>,
    role: Option<&'a str>,
    is_active: Option<bool>,
    department_id: Option<Option<i32>>,
}

#[derive(Serialize)]
pub struct AdminUserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: Option<CatalogRef>,
    pub is_active: bool,
    pub complaint_count: i64,
    pub last_login_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

fn to_user_response(
    profile: Profile,
    department_names: &HashMap<i32, String>,
    counts: &HashMap<Uuid, i64>,
) -> AdminUserResponse {
    let department = profile.department_id.map(|id| CatalogRef {
        id,
        name: department_names.get(&id).cloned().unwrap_or_default(),
    });

    AdminUserResponse {
        id: profile.id,
        name: profile.name,
        email: profile.email,
        role: profile.role,
        department,
        is_active: profile.is_active,
        complaint_count: counts.get(&profile.id).copied().unwrap_or(0),
        last_login_at: profile.last_login_at.map(to_iso),
        created_at: to_iso(profile.created_at),
        updated_at: to_iso(profile.updated_at),
    }
}

fn load_department_names(conn: &mut PgConnection) -> AppResult<HashMap<i32, String>> {
    let names = departments::table
        .select((departments::id, departments::name))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();
    Ok(names)
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<AdminUserResponse>>> {
    user.role.require(Action::ManageUsers)?;

    let mut conn = state.db()?;

    let rows: Vec<Profile> = profiles::table
        .order(profiles::created_at.asc())
        .load(&mut conn)?;

    let department_names = load_department_names(&mut conn)?;

    let counts: Vec<(Uuid, i64)> = complaints::table
        .group_by(complaints::student_id)
        .select((complaints::student_id, count_star()))
        .load(&mut conn)?;
    let count_map: HashMap<Uuid, i64> = counts.into_iter().collect();

    let response = rows
        .into_iter()
        .map(|profile| to_user_response(profile, &department_names, &count_map))
        .collect();

    Ok(Json(response))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<AdminUserResponse>> {
    user.role.require(Action::ManageUsers)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a valid email address is required"));
    }

    if payload.password.chars().count() < 8 {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }

    let role = Role::parse(&payload.role)
        .ok_or_else(|| AppError::bad_request(format!("unknown role: {}", payload.role)))?;

    let mut conn = state.db()?;

    if let Some(department_id) = payload.department_id {
        departments::table
            .find(department_id)
            .first::<Department>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::bad_request("unknown department"))?;
    }

    let password_hash = hash_password(&payload.password)?;

    let new_profile = NewProfile {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash,
        role: role.as_str().to_string(),
        department_id: payload.department_id,
    };

    let profile = conn.transaction::<Profile, AppError, _>(|conn| {
        let profile: Profile = match diesel::insert_into(profiles::table)
            .values(&new_profile)
            .get_result(conn)
        {
            Ok(profile) => profile,
            Err(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            )) => return Err(AppError::bad_request("email already registered")),
            Err(err) => return Err(AppError::from(err)),
        };

        activity::record(
            conn,
            None,
            Some(user.id),
            activity::USER_CREATED,
            None,
            Some(&profile.role),
            Some(json!({ "email": profile.email })),
        )?;

        Ok(profile)
    })?;

    info!(user_id = %profile.id, role = %profile.role, "user created");

    let department_names = load_department_names(&mut conn)?;
    Ok(Json(to_user_response(
        profile,
        &department_names,
        &HashMap::new(),
    )))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(target_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<AdminUserResponse>> {
    user.role.require(Action::ManageUsers)?;

    if payload.name.is_none()
        && payload.role.is_none()
        && payload.is_active.is_none()
        && payload.department_id.is_none()
    {
        return Err(AppError::bad_request("no fields to update"));
    }

    let name = match payload.name.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("name must not be empty"));
            }
            Some(trimmed)
        }
        None => None,
    };

    let role = match payload.role.as_deref() {
        Some(raw) => Some(
            Role::parse(raw)
                .ok_or_else(|| AppError::bad_request(format!("unknown role: {raw}")))?,
        ),
        None => None,
    };

    let mut conn = state.db()?;

    let target: Profile = profiles::table
        .find(target_id)
        .first(&mut conn)
        .optional()?
        .ok_or(AppError::NotFound)?;

    if let Some(new_role) = role {
        if target.id == user.id && new_role.as_str() != target.role {
            return Err(AppError::bad_request("cannot change your own role"));
        }
    }

    if let Some(Some(department_id)) = payload.department_id {
        departments::table
            .find(department_id)
            .first::<Department>(&mut conn)
            .optional()?
            .ok_or_else(|| AppError::bad_request("unknown department"))?;
    }

    let changeset = UpdateProfileChangeset {
        name,
        role: role.map(|role| role.as_str()),
        is_active: payload.is_active,
        department_id: payload.department_id,
    };

    let updated = conn.transaction::<Profile, AppError, _>(|conn| {
        // The profile row is the only place a role lives; one UPDATE
        // changes it everywhere.
        diesel::update(profiles::table.find(target.id))
            .set((&changeset, profiles::updated_at.eq(Utc::now().naive_utc())))
            .execute(conn)?;

        let updated: Profile = profiles::table.find(target.id).first(conn)?;

        let (from_value, to_value) = if updated.role != target.role {
            (Some(target.role.as_str()), Some(updated.role.as_str()))
        } else {
            (None, None)
        };
        activity::record(
            conn,
            None,
            Some(user.id),
            activity::USER_UPDATED,
            from_value,
            to_value,
            Some(json!({ "email": updated.email })),
        )?;

        Ok(updated)
    })?;

    let department_names = load_department_names(&mut conn)?;

    let complaint_count: i64 = complaints::table
        .filter(complaints::student_id.eq(updated.id))
        .count()
        .get_result(&mut conn)?;
    let mut counts = HashMap::new();
    counts.insert(updated.id, complaint_count);

    Ok(Json(to_user_response(updated, &department_names, &counts)))
}

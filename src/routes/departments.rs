use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::{dsl::count_star, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthenticatedUser,
    domain::role::{Action, Role},
    error::{AppError, AppResult},
    models::{Department, NewDepartment},
    routes::complaints::to_iso,
    schema::{complaints, departments, profiles},
    state::AppState,
};

const MAX_NAME_CHARS: usize = 100;

#[derive(Deserialize)]
pub struct CreateDepartmentRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateDepartmentRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(AsChangeset)]
#[diesel(table_name = departments)]
struct UpdateDepartmentChangeset<'a> {
    name: Option<&'a str>,
    description: Option<Option<&'a str>>,
    is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct DepartmentResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub complaint_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn to_response(department: Department, complaint_count: i64) -> DepartmentResponse {
    DepartmentResponse {
        id: department.id,
        name: department.name,
        description: department.description,
        is_active: department.is_active,
        complaint_count,
        created_at: to_iso(department.created_at),
        updated_at: to_iso(department.updated_at),
    }
}

pub async fn list_departments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<DepartmentResponse>>> {
    let mut conn = state.db()?;

    let mut query = departments::table.into_boxed();
    if !matches!(user.role, Role::Admin) {
        query = query.filter(departments::is_active.eq(true));
    }

    let rows: Vec<Department> = query.order(departments::name.asc()).load(&mut conn)?;

    let usage: Vec<(i32, i64)> = complaints::table
        .group_by(complaints::department_id)
        .select((complaints::department_id, count_star()))
        .load(&mut conn)?;
    let usage_map: HashMap<i32, i64> = usage.into_iter().collect();

    let response = rows
        .into_iter()
        .map(|department| {
            let count = usage_map.get(&department.id).copied().unwrap_or(0);
            to_response(department, count)
        })
        .collect();

    Ok(Json(response))
}

pub async fn create_department(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateDepartmentRequest>,
) -> AppResult<Json<DepartmentResponse>> {
    user.role.require(Action::ManageCatalog)?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::bad_request(format!(
            "name must be at most {MAX_NAME_CHARS} characters"
        )));
    }

    let mut conn = state.db()?;

    let new_department = NewDepartment {
        name,
        description: payload.description,
    };

    let department: Department = match diesel::insert_into(departments::table)
        .values(&new_department)
        .get_result(&mut conn)
    {
        Ok(department) => department,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request(
                "a department with this name already exists",
            ))
        }
        Err(err) => return Err(AppError::from(err)),
    };

    Ok(Json(to_response(department, 0)))
}

pub async fn update_department(
    State(state): State<AppState>,
    Path(department_id): Path<i32>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateDepartmentRequest>,
) -> AppResult<Json<DepartmentResponse>> {
    user.role.require(Action::ManageCatalog)?;

    if payload.name.is_none() && payload.description.is_none() && payload.is_active.is_none() {
        return Err(AppError::bad_request("no fields to update"));
    }

    let name = match payload.name.as_deref() {
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(AppError::bad_request("name must not be empty"));
            }
            if trimmed.chars().count() > MAX_NAME_CHARS {
                return Err(AppError::bad_request(format!(
                    "name must be at most {MAX_NAME_CHARS} characters"
                )));
            }
            Some(trimmed)
        }
        None => None,
    };

    let changeset = UpdateDepartmentChangeset {
        name,
        description: payload
            .description
            .as_ref()
            .map(|value| value.as_deref()),
        is_active: payload.is_active,
    };

    let mut conn = state.db()?;

    let affected = match diesel::update(departments::table.find(department_id))
        .set((
            &changeset,
            departments::updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
    {
        Ok(affected) => affected,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request(
                "a department with this name already exists",
            ))
        }
        Err(err) => return Err(AppError::from(err)),
    };
    if affected == 0 {
        return Err(AppError::NotFound);
    }

    let department: Department = departments::table.find(department_id).first(&mut conn)?;

    let complaint_count: i64 = complaints::table
        .filter(complaints::department_id.eq(department_id))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(to_response(department, complaint_count)))
}

pub async fn delete_department(
    State(state): State<AppState>,
    Path(department_id): Path<i32>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    user.role.require(Action::ManageCatalog)?;

    let mut conn = state.db()?;

    let complaint_count: i64 = complaints::table
        .filter(complaints::department_id.eq(department_id))
        .count()
        .get_result(&mut conn)?;
    if complaint_count > 0 {
        return Err(AppError::bad_request(
            "department is referenced by complaints",
        ));
    }

    let member_count: i64 = profiles::table
        .filter(profiles::department_id.eq(department_id))
        .count()
        .get_result(&mut conn)?;
    if member_count > 0 {
        return Err(AppError::bad_request("department has assigned members"));
    }

    let affected =
        diesel::delete(departments::table.find(department_id)).execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

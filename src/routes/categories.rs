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
    models::{Category, NewCategory},
    routes::complaints::to_iso,
    schema::{categories, complaints},
    state::AppState,
};

const MAX_NAME_CHARS: usize = 100;

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(AsChangeset)]
#[diesel(table_name = categories)]
struct UpdateCategoryChangeset<'a> {
    name: Option<&'a str>,
    description: Option<Option<&'a str>>,
    is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub complaint_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

fn to_response(category: Category, complaint_count: i64) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        name: category.name,
        description: category.description,
        is_active: category.is_active,
        complaint_count,
        created_at: to_iso(category.created_at),
        updated_at: to_iso(category.updated_at),
    }
}

fn category_usage(conn: &mut PgConnection) -> AppResult<HashMap<i32, i64>> {
    let usage: Vec<(Option<i32>, i64)> = complaints::table
        .group_by(complaints::category_id)
        .select((complaints::category_id, count_star()))
        .load(conn)?;

    Ok(usage
        .into_iter()
        .filter_map(|(category_id, count)| category_id.map(|id| (id, count)))
        .collect())
}

pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<CategoryResponse>>> {
    let mut conn = state.db()?;

    let mut query = categories::table.into_boxed();
    if !matches!(user.role, Role::Admin) {
        query = query.filter(categories::is_active.eq(true));
    }

    let rows: Vec<Category> = query.order(categories::name.asc()).load(&mut conn)?;
    let usage_map = category_usage(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|category| {
            let count = usage_map.get(&category.id).copied().unwrap_or(0);
            to_response(category, count)
        })
        .collect();

    Ok(Json(response))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<CategoryResponse>> {
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

    let new_category = NewCategory {
        name,
        description: payload.description,
    };

    let category: Category = match diesel::insert_into(categories::table)
        .values(&new_category)
        .get_result(&mut conn)
    {
        Ok(category) => category,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request(
                "a category with this name already exists",
            ))
        }
        Err(err) => return Err(AppError::from(err)),
    };

    Ok(Json(to_response(category, 0)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateCategoryRequest>,
) -> AppResult<Json<CategoryResponse>> {
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

    let changeset = UpdateCategoryChangeset {
        name,
        description: payload
            .description
            .as_ref()
            .map(|value| value.as_deref()),
        is_active: payload.is_active,
    };

    let mut conn = state.db()?;

    let affected = match diesel::update(categories::table.find(category_id))
        .set((&changeset, categories::updated_at.eq(Utc::now().naive_utc())))
        .execute(&mut conn)
    {
        Ok(affected) => affected,
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request(
                "a category with this name already exists",
            ))
        }
        Err(err) => return Err(AppError::from(err)),
    };
    if affected == 0 {
        return Err(AppError::NotFound);
    }

    let category: Category = categories::table.find(category_id).first(&mut conn)?;
    let usage_map = category_usage(&mut conn)?;
    let count = usage_map.get(&category_id).copied().unwrap_or(0);

    Ok(Json(to_response(category, count)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    user.role.require(Action::ManageCatalog)?;

    let mut conn = state.db()?;

    let complaint_count: i64 = complaints::table
        .filter(complaints::category_id.eq(category_id))
        .count()
        .get_result(&mut conn)?;
    if complaint_count > 0 {
        return Err(AppError::bad_request(
            "category is referenced by complaints",
        ));
    }

    let affected = diesel::delete(categories::table.find(category_id)).execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

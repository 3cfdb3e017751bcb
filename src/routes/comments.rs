use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    activity,
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{Comment, NewComment},
    notify,
    routes::complaints::{load_visible_complaint, to_iso, PersonRef},
    schema::{comments, profiles},
    state::AppState,
};

const MAX_BODY_CHARS: usize = 2000;

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub author: PersonRef,
    pub body: String,
    pub is_internal: bool,
    pub created_at: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let mut conn = state.db()?;

    let complaint = load_visible_complaint(&mut conn, &user, complaint_id)?;

    let rows: Vec<Comment> = comments::table
        .filter(comments::complaint_id.eq(complaint.id))
        .order(comments::created_at.asc())
        .load(&mut conn)?;

    let mut author_ids: Vec<Uuid> = rows.iter().map(|comment| comment.author_id).collect();
    author_ids.sort();
    author_ids.dedup();

    let author_names: HashMap<Uuid, String> = profiles::table
        .filter(profiles::id.eq_any(&author_ids))
        .select((profiles::id, profiles::name))
        .load::<(Uuid, String)>(&mut conn)?
        .into_iter()
        .collect();

    let response = rows
        .into_iter()
        .map(|comment| CommentResponse {
            id: comment.id,
            author: PersonRef {
                id: comment.author_id,
                name: author_names
                    .get(&comment.author_id)
                    .cloned()
                    .unwrap_or_default(),
            },
            body: comment.body,
            is_internal: comment.is_internal,
            created_at: to_iso(comment.created_at),
        })
        .collect();

    Ok(Json(response))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(complaint_id): Path<i64>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCommentRequest>,
) -> AppResult<Json<CommentResponse>> {
    let mut conn = state.db()?;

    // Commenting requires the same visibility as reading.
    let complaint = load_visible_complaint(&mut conn, &user, complaint_id)?;

    let body = payload.body.trim().to_string();
    if body.is_empty() {
        return Err(AppError::bad_request("comment body must not be empty"));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(AppError::bad_request(format!(
            "comment body must be at most {MAX_BODY_CHARS} characters"
        )));
    }

    let comment = conn.transaction::<Comment, AppError, _>(|conn| {
        let new_comment = NewComment {
            complaint_id: complaint.id,
            author_id: user.id,
            body: body.clone(),
        };

        let comment: Comment = diesel::insert_into(comments::table)
            .values(&new_comment)
            .get_result(conn)?;

        activity::record(
            conn,
            Some(complaint.id),
            Some(user.id),
            activity::COMMENT_ADDED,
            None,
            None,
            None,
        )?;

        notify::notify_subscribers(
            conn,
            complaint.id,
            user.id,
            &format!("New comment on complaint {}", complaint.code),
            &format!("{} commented on {}.", user.name, complaint.title),
        )?;

        Ok(comment)
    })?;

    Ok(Json(CommentResponse {
        id: comment.id,
        author: PersonRef {
            id: comment.author_id,
            name: user.name.clone(),
        },
        body: comment.body,
        is_internal: comment.is_internal,
        created_at: to_iso(comment.created_at),
    }))
}

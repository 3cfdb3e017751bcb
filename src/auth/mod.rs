pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::role::Role;
use crate::error::AppError;
use crate::models::Profile;
use crate::schema::profiles;
use crate::state::AppState;

/// The acting user on a request. The bearer token proves identity; role
/// and the active flag are re-read from `profiles` on every request, so
/// an admin's role change or deactivation applies immediately rather
/// than when the token expires.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized)?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::Unauthorized)?;

        let mut conn = state.db()?;
        let profile = profiles::table
            .find(claims.sub)
            .first::<Profile>(&mut conn)
            .optional()?
            .ok_or(AppError::Unauthorized)?;

        if !profile.is_active {
            return Err(AppError::Unauthorized);
        }

        // Fail closed on any role value outside the known set.
        let role = Role::parse(&profile.role).ok_or(AppError::Unauthorized)?;

        Ok(AuthenticatedUser {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            role,
        })
    }
}

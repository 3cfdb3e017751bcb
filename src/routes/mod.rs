use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod complaints;
pub mod departments;
pub mod health;
pub mod notifications;
pub mod sla_policies;
pub mod stats;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let complaints_routes = Router::new()
        .route(
            "/",
            get(complaints::list_complaints).post(complaints::create_complaint),
        )
        .route("/:id", get(complaints::get_complaint))
        .route("/:id/status", patch(complaints::update_status))
        .route("/:id/assignee", patch(complaints::update_assignee))
        .route("/:id/priority", patch(complaints::update_priority))
        .route("/:id/activity", get(complaints::list_activity))
        .route(
            "/:id/comments",
            get(comments::list_comments).post(comments::add_comment),
        );

    let stats_routes = Router::new()
        .route("/me", get(stats::my_stats))
        .route("/overview", get(stats::overview));

    let notifications_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/:id/read", post(notifications::mark_read));

    let departments_routes = Router::new()
        .route(
            "/",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/:id",
            patch(departments::update_department).delete(departments::delete_department),
        );

    let categories_routes = Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/:id",
            patch(categories::update_category).delete(categories::delete_category),
        );

    let sla_routes = Router::new()
        .route("/", get(sla_policies::list_policies))
        .route("/:priority", put(sla_policies::upsert_policy));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/:id", patch(admin::update_user));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/complaints", complaints_routes)
        .nest("/api/stats", stats_routes)
        .nest("/api/notifications", notifications_routes)
        .nest("/api/departments", departments_routes)
        .nest("/api/categories", categories_routes)
        .nest("/api/sla-policies", sla_routes)
        .nest("/api/admin", admin_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 256))
}

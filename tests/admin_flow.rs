mod common;

use anyhow::{ensure, Result};
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_vec, TestApp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PASSWORD: &str = "s3cret-pass";

#[derive(Deserialize)]
struct UserBody {
    email: String,
    role: String,
    is_active: bool,
    complaint_count: i64,
}

#[derive(Serialize)]
struct NewUserPayload<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    role: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    department_id: Option<i32>,
}

#[derive(Serialize)]
struct NewComplaintPayload<'a> {
    title: &'a str,
    description: &'a str,
    department_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<&'a str>,
}

async fn seed_admin(app: &TestApp) -> Result<String> {
    app.insert_profile("Root Admin", "admin@example.com", PASSWORD, "ADMIN", None)
        .await?;
    app.login_token("admin@example.com", PASSWORD).await
}

#[tokio::test]
async fn admin_manages_users_and_roles() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin_token = seed_admin(&app).await?;
    let department_id = app.seed_department("Academics").await?;

    let response = app
        .post_json(
            "/api/admin/users",
            &NewUserPayload {
                name: "New Staff",
                email: "newstaff@example.com",
                password: PASSWORD,
                role: "STAFF",
                department_id: Some(department_id),
            },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let created: UserBody = serde_json::from_slice(&body)?;
    assert_eq!(created.role, "STAFF");
    assert!(created.is_active);

    // The account works right away.
    let staff_token = app.login_token("newstaff@example.com", PASSWORD).await?;

    let response = app
        .post_json(
            "/api/admin/users",
            &NewUserPayload {
                name: "Other Staff",
                email: "newstaff@example.com",
                password: PASSWORD,
                role: "STAFF",
                department_id: None,
            },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Management stays admin-only.
    let response = app
        .post_json(
            "/api/admin/users",
            &NewUserPayload {
                name: "Sneaky",
                email: "sneaky@example.com",
                password: PASSWORD,
                role: "ADMIN",
                department_id: None,
            },
            Some(&staff_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/api/admin/users", Some(&staff_token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get("/api/admin/users", Some(&admin_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let users: Vec<UserBody> = serde_json::from_slice(&body)?;
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u.email == "newstaff@example.com"));
    assert!(users.iter().all(|u| u.complaint_count == 0));

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn role_changes_take_effect_without_a_new_token() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin_token = seed_admin(&app).await?;
    let department_id = app.seed_department("Operations").await?;
    let student_id = app
        .insert_profile("Student One", "student@example.com", PASSWORD, "STUDENT", None)
        .await?;
    let student_token = app.login_token("student@example.com", PASSWORD).await?;

    let response = app
        .post_json(
            "/api/complaints",
            &NewComplaintPayload {
                title: "Broken chair in hall B",
                description: "Half the chairs in hall B are unusable.",
                department_id,
                priority: None,
            },
            Some(&student_token),
        )
        .await?;
    ensure!(response.status() == StatusCode::OK, "create failed");
    let body = body_to_vec(response.into_body()).await?;
    #[derive(Deserialize)]
    struct Created {
        id: i64,
    }
    let complaint: Created = serde_json::from_slice(&body)?;

    #[derive(Serialize)]
    struct StatusPayload<'a> {
        status: &'a str,
    }
    let response = app
        .patch_json(
            &format!("/api/complaints/{}/status", complaint.id),
            &StatusPayload {
                status: "UNDER_REVIEW",
            },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Promote the author to staff.
    #[derive(Serialize)]
    struct RolePayload<'a> {
        role: &'a str,
    }
    let response = app
        .patch_json(
            &format!("/api/admin/users/{student_id}"),
            &RolePayload { role: "STAFF" },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // The old token now carries staff rights because the role is read
    // from the profile row on every request.
    let response = app
        .patch_json(
            &format!("/api/complaints/{}/status", complaint.id),
            &StatusPayload {
                status: "UNDER_REVIEW",
            },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Admins cannot demote themselves.
    let response = app.get("/api/auth/me", Some(&admin_token)).await?;
    let body = body_to_vec(response.into_body()).await?;
    #[derive(Deserialize)]
    struct Me {
        id: Uuid,
    }
    let me: Me = serde_json::from_slice(&body)?;
    let response = app
        .patch_json(
            &format!("/api/admin/users/{}", me.id),
            &RolePayload { role: "STUDENT" },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn catalog_management_is_admin_only() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin_token = seed_admin(&app).await?;
    app.insert_profile("Student One", "student@example.com", PASSWORD, "STUDENT", None)
        .await?;
    let student_token = app.login_token("student@example.com", PASSWORD).await?;

    #[derive(Serialize)]
    struct NewDepartmentPayload<'a> {
        name: &'a str,
    }
    #[derive(Deserialize)]
    struct DepartmentBody {
        id: i32,
        name: String,
        is_active: bool,
    }

    let response = app
        .post_json(
            "/api/departments",
            &NewDepartmentPayload { name: "Placements" },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let placements: DepartmentBody = serde_json::from_slice(&body)?;
    assert!(placements.is_active);

    let response = app
        .post_json(
            "/api/departments",
            &NewDepartmentPayload { name: "Placements" },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/departments",
            &NewDepartmentPayload { name: "Shadow Ops" },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Deactivated departments disappear from the student view.
    let response = app
        .post_json(
            "/api/departments",
            &NewDepartmentPayload { name: "Legacy" },
            Some(&admin_token),
        )
        .await?;
    let body = body_to_vec(response.into_body()).await?;
    let legacy: DepartmentBody = serde_json::from_slice(&body)?;

    #[derive(Serialize)]
    struct Deactivate {
        is_active: bool,
    }
    let response = app
        .patch_json(
            &format!("/api/departments/{}", legacy.id),
            &Deactivate { is_active: false },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/api/departments", Some(&student_token)).await?;
    let body = body_to_vec(response.into_body()).await?;
    let visible: Vec<DepartmentBody> = serde_json::from_slice(&body)?;
    assert!(visible.iter().all(|d| d.name != "Legacy"));

    let response = app.get("/api/departments", Some(&admin_token)).await?;
    let body = body_to_vec(response.into_body()).await?;
    let all: Vec<DepartmentBody> = serde_json::from_slice(&body)?;
    assert!(all.iter().any(|d| d.name == "Legacy"));

    // A department referenced by complaints cannot be deleted.
    let response = app
        .post_json(
            "/api/complaints",
            &NewComplaintPayload {
                title: "Placement cell unreachable",
                description: "No response to any placement query this month.",
                department_id: placements.id,
                priority: None,
            },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .delete(&format!("/api/departments/{}", placements.id), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .delete(&format!("/api/departments/{}", legacy.id), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .delete(&format!("/api/departments/{}", legacy.id), Some(&admin_token))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn sla_policies_are_upserted_per_priority() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let admin_token = seed_admin(&app).await?;
    let department_id = app.seed_department("Support").await?;
    app.insert_profile("Student One", "student@example.com", PASSWORD, "STUDENT", None)
        .await?;
    let student_token = app.login_token("student@example.com", PASSWORD).await?;

    #[derive(Serialize)]
    struct PolicyPayload {
        time_to_first_response_minutes: i32,
        time_to_resolution_minutes: i32,
    }
    #[derive(Deserialize)]
    struct PolicyBody {
        id: i32,
        priority: String,
        time_to_resolution_minutes: i32,
    }

    let response = app
        .put_json(
            "/api/sla-policies/HIGH",
            &PolicyPayload {
                time_to_first_response_minutes: 60,
                time_to_resolution_minutes: 480,
            },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let created: PolicyBody = serde_json::from_slice(&body)?;
    assert_eq!(created.priority, "HIGH");

    // A second PUT replaces the windows instead of adding a row.
    let response = app
        .put_json(
            "/api/sla-policies/HIGH",
            &PolicyPayload {
                time_to_first_response_minutes: 30,
                time_to_resolution_minutes: 240,
            },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let replaced: PolicyBody = serde_json::from_slice(&body)?;
    assert_eq!(replaced.id, created.id);
    assert_eq!(replaced.time_to_resolution_minutes, 240);

    let response = app.get("/api/sla-policies", Some(&student_token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let policies: Vec<PolicyBody> = serde_json::from_slice(&body)?;
    assert_eq!(policies.len(), 1);

    let response = app
        .put_json(
            "/api/sla-policies/SEVERE",
            &PolicyPayload {
                time_to_first_response_minutes: 10,
                time_to_resolution_minutes: 60,
            },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put_json(
            "/api/sla-policies/LOW",
            &PolicyPayload {
                time_to_first_response_minutes: 0,
                time_to_resolution_minutes: 60,
            },
            Some(&admin_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .put_json(
            "/api/sla-policies/HIGH",
            &PolicyPayload {
                time_to_first_response_minutes: 30,
                time_to_resolution_minutes: 240,
            },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // New complaints pick up the windows of their priority.
    #[derive(Deserialize)]
    struct ComplaintBody {
        sla_due_first_response_at: Option<String>,
        sla_due_resolution_at: Option<String>,
    }

    let response = app
        .post_json(
            "/api/complaints",
            &NewComplaintPayload {
                title: "Exam portal down",
                description: "Cannot submit the weekly assessment.",
                department_id,
                priority: Some("HIGH"),
            },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let with_policy: ComplaintBody = serde_json::from_slice(&body)?;
    assert!(with_policy.sla_due_first_response_at.is_some());
    assert!(with_policy.sla_due_resolution_at.is_some());

    let response = app
        .post_json(
            "/api/complaints",
            &NewComplaintPayload {
                title: "Snack machine out of order",
                description: "Third floor machine swallowed my coins.",
                department_id,
                priority: Some("LOW"),
            },
            Some(&student_token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let without_policy: ComplaintBody = serde_json::from_slice(&body)?;
    assert!(without_policy.sla_due_first_response_at.is_none());
    assert!(without_policy.sla_due_resolution_at.is_none());

    app.cleanup().await?;
    Ok(())
}

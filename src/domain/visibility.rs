use uuid::Uuid;

use crate::domain::role::Role;
use crate::models::Complaint;

/// Read access for a single complaint. Staff and admins see every row;
/// students only their own. Listing applies the same rule as a query
/// filter, and a failed check surfaces as NotFound so responses never
/// reveal that the row exists.
pub fn can_view(role: Role, actor_id: Uuid, complaint: &Complaint) -> bool {
    match role {
        Role::Staff | Role::Admin => true,
        Role::Student => complaint.student_id == actor_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn complaint_owned_by(student_id: Uuid) -> Complaint {
        let created = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Complaint {
            id: 7,
            code: "CMP-4D8N1T".to_string(),
            title: "Wifi drops in the lab".to_string(),
            description: "Connection drops every few minutes on the lab floor.".to_string(),
            status: "SUBMITTED".to_string(),
            priority: "HIGH".to_string(),
            student_id,
            assignee_id: None,
            department_id: 2,
            category_id: Some(1),
            is_sla_breached: false,
            sla_due_first_response_at: None,
            sla_due_resolution_at: None,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn owner_sees_their_complaint_and_other_students_do_not() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let subject = complaint_owned_by(owner);

        assert!(can_view(Role::Student, owner, &subject));
        assert!(!can_view(Role::Student, other, &subject));
    }

    #[test]
    fn staff_and_admin_see_everything() {
        let subject = complaint_owned_by(Uuid::new_v4());
        let stranger = Uuid::new_v4();

        assert!(can_view(Role::Staff, stranger, &subject));
        assert!(can_view(Role::Admin, stranger, &subject));
    }

}

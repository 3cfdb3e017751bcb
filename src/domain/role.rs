use crate::error::{AppError, AppResult};

/// Closed set of roles an account can hold. The `profiles.role` column is
/// constrained to the same three values, so parsing only fails for rows
/// written outside the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Staff,
    Admin,
}

/// Role-gated operations. Handlers name the action they are about to
/// perform and ask [`Role::allows`] instead of comparing role strings at
/// each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateComplaint,
    TransitionComplaint,
    AssignComplaint,
    ChangePriority,
    ViewAllComplaints,
    ViewActivityLog,
    ManageUsers,
    ManageCatalog,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "STUDENT" => Some(Role::Student),
            "STAFF" => Some(Role::Staff),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Staff => "STAFF",
            Role::Admin => "ADMIN",
        }
    }

    /// Staff and admins share the triage surface.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::CreateComplaint => matches!(self, Role::Student),
            Action::TransitionComplaint
            | Action::AssignComplaint
            | Action::ChangePriority
            | Action::ViewAllComplaints
            | Action::ViewActivityLog => self.is_staff(),
            Action::ManageUsers | Action::ManageCatalog => matches!(self, Role::Admin),
        }
    }

    pub fn require(&self, action: Action) -> AppResult<()> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(AppError::forbidden("insufficient role"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!(Role::parse("STUDENT"), Some(Role::Student));
        assert_eq!(Role::parse("STAFF"), Some(Role::Staff));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
    }

    #[test]
    fn rejects_unknown_roles() {
        assert_eq!(Role::parse("student"), None);
        assert_eq!(Role::parse("SUPERUSER"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn only_students_create_complaints() {
        assert!(Role::Student.allows(Action::CreateComplaint));
        assert!(!Role::Staff.allows(Action::CreateComplaint));
        assert!(!Role::Admin.allows(Action::CreateComplaint));
    }

    #[test]
    fn triage_actions_require_staff_or_admin() {
        for action in [
            Action::TransitionComplaint,
            Action::AssignComplaint,
            Action::ChangePriority,
            Action::ViewAllComplaints,
            Action::ViewActivityLog,
        ] {
            assert!(!Role::Student.allows(action), "{action:?}");
            assert!(Role::Staff.allows(action), "{action:?}");
            assert!(Role::Admin.allows(action), "{action:?}");
        }
    }

    #[test]
    fn management_is_admin_only() {
        for action in [Action::ManageUsers, Action::ManageCatalog] {
            assert!(!Role::Student.allows(action), "{action:?}");
            assert!(!Role::Staff.allows(action), "{action:?}");
            assert!(Role::Admin.allows(action), "{action:?}");
        }
    }

    #[test]
    fn require_maps_denial_to_forbidden() {
        let err = Role::Student
            .require(Action::TransitionComplaint)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(Role::Admin.require(Action::ManageUsers).is_ok());
    }
}

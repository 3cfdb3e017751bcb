/// Complaint lifecycle states. `Draft` is reserved for a future
/// save-without-submitting flow; creation always starts at `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Draft,
    Submitted,
    UnderReview,
    InProgress,
    WaitingOnStudent,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Draft,
        Status::Submitted,
        Status::UnderReview,
        Status::InProgress,
        Status::WaitingOnStudent,
        Status::Resolved,
        Status::Closed,
    ];

    pub fn parse(value: &str) -> Option<Status> {
        match value {
            "DRAFT" => Some(Status::Draft),
            "SUBMITTED" => Some(Status::Submitted),
            "UNDER_REVIEW" => Some(Status::UnderReview),
            "IN_PROGRESS" => Some(Status::InProgress),
            "WAITING_ON_STUDENT" => Some(Status::WaitingOnStudent),
            "RESOLVED" => Some(Status::Resolved),
            "CLOSED" => Some(Status::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "DRAFT",
            Status::Submitted => "SUBMITTED",
            Status::UnderReview => "UNDER_REVIEW",
            Status::InProgress => "IN_PROGRESS",
            Status::WaitingOnStudent => "WAITING_ON_STUDENT",
            Status::Resolved => "RESOLVED",
            Status::Closed => "CLOSED",
        }
    }

    /// RESOLVED and CLOSED form the closed partition; every other state
    /// counts as open. The dashboard counters depend on this split.
    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Resolved | Status::Closed)
    }

    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn parse(value: &str) -> Option<Priority> {
        match value {
            "LOW" => Some(Priority::Low),
            "MEDIUM" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            "CRITICAL" => Some(Priority::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_status() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("REOPENED"), None);
        assert_eq!(Status::parse("resolved"), None);
    }

    #[test]
    fn open_and_closed_partition_all_statuses() {
        for status in Status::ALL {
            assert_ne!(status.is_open(), status.is_closed(), "{status:?}");
        }
        assert!(Status::Resolved.is_closed());
        assert!(Status::Closed.is_closed());
        assert!(Status::Submitted.is_open());
        assert!(Status::Draft.is_open());
        assert!(Status::WaitingOnStudent.is_open());
    }

    #[test]
    fn round_trips_every_priority() {
        for priority in Priority::ALL {
            assert_eq!(Priority::parse(priority.as_str()), Some(priority));
        }
        assert_eq!(Priority::parse("URGENT"), None);
    }
}

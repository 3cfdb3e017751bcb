use serde::Serialize;

use crate::domain::role::Role;
use crate::domain::status::Status;
use crate::models::{Complaint, Profile};

/// Dashboard counters derived from a snapshot of complaint rows. Never
/// stored; recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplaintStats {
    pub total: i64,
    pub open: i64,
    pub resolved: i64,
    pub sla_breached: i64,
}

/// Reduces a snapshot into counters. `open` and `resolved` partition the
/// input, so `open + resolved == total` always holds. A breached complaint
/// stops counting as breached once it reaches the closed partition.
pub fn summarize(complaints: &[Complaint]) -> ComplaintStats {
    let mut stats = ComplaintStats {
        total: complaints.len() as i64,
        open: 0,
        resolved: 0,
        sla_breached: 0,
    };

    for complaint in complaints {
        let closed = Status::parse(&complaint.status)
            .map(|status| status.is_closed())
            .unwrap_or(false);
        if closed {
            stats.resolved += 1;
        } else {
            stats.open += 1;
            if complaint.is_sla_breached {
                stats.sla_breached += 1;
            }
        }
    }

    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub students: i64,
    pub staff: i64,
    pub admins: i64,
}

pub fn count_roles(profiles: &[Profile]) -> RoleCounts {
    let mut counts = RoleCounts {
        students: 0,
        staff: 0,
        admins: 0,
    };

    for profile in profiles {
        match Role::parse(&profile.role) {
            Some(Role::Student) => counts.students += 1,
            Some(Role::Staff) => counts.staff += 1,
            Some(Role::Admin) => counts.admins += 1,
            None => {}
        }
    }

    counts
}

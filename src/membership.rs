//! Group membership placement rules.
//!
//! Pure planning functions: the routes load the roster and the existing
//! member set, functions here decide who gets which role, and the routes
//! persist the result. Placement is one-time — syncing never re-grades a
//! row that already exists, so a later promotion does not retroactively
//! change group-admin status.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::employee::Employee;
use crate::models::group::{GroupMember, GroupMemberRole};

/// Role an employee receives when auto-enrolled into their department group:
/// head-of-department by position, or Manager/Admin by role, becomes a group
/// admin; everyone else a member.
pub fn department_member_role(employee: &Employee) -> GroupMemberRole {
    if employee.is_department_head() || employee.role.is_managerial() {
        GroupMemberRole::Admin
    } else {
        GroupMemberRole::Member
    }
}

/// First head-of-department in the roster, used as the department group's
/// creator. A department without a head yields `None` and the group keeps an
/// unset creator.
pub fn pick_department_head(roster: &[Employee]) -> Option<&Employee> {
    roster.iter().find(|e| e.is_department_head())
}

/// Missing membership rows for a department group. Inactive employees are
/// skipped; employees already in `existing` are left untouched, which makes
/// repeated syncs no-ops.
pub fn plan_department_sync(
    group_id: Uuid,
    roster: &[Employee],
    existing: &HashSet<Uuid>,
    now: DateTime<Utc>,
) -> Vec<GroupMember> {
    roster
        .iter()
        .filter(|e| e.is_active() && !existing.contains(&e.id))
        .map(|e| GroupMember {
            group_id,
            emp_id: e.id,
            role: department_member_role(e),
            joined_at: now,
        })
        .collect()
}

/// Initial member rows for a new custom group: the creator as admin, then
/// each distinct requested id as member. Duplicates and the creator's own id
/// collapse.
pub fn initial_custom_members(
    group_id: Uuid,
    creator_id: Uuid,
    member_ids: &[Uuid],
    now: DateTime<Utc>,
) -> Vec<GroupMember> {
    let mut members = vec![GroupMember {
        group_id,
        emp_id: creator_id,
        role: GroupMemberRole::Admin,
        joined_at: now,
    }];

    let mut seen: HashSet<Uuid> = HashSet::from([creator_id]);
    for &emp_id in member_ids {
        if seen.insert(emp_id) {
            members.push(GroupMember {
                group_id,
                emp_id,
                role: GroupMemberRole::Member,
                joined_at: now,
            });
        }
    }

    members
}

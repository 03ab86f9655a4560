use uuid::Uuid;

use crate::models::employee::{position_is_department_head, Employee, Role};

/// Normalized authority derived once at the policy boundary from the formal
/// role and the free-text position title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EffectiveAuthority {
    Employee = 0,
    DepartmentHead = 1,
    Manager = 2,
    Admin = 3,
}

impl EffectiveAuthority {
    pub fn derive(role: Role, position: Option<&str>) -> Self {
        match role {
            Role::Admin => Self::Admin,
            Role::Manager => Self::Manager,
            Role::Employee if position_is_department_head(position) => Self::DepartmentHead,
            Role::Employee => Self::Employee,
        }
    }
}

/// The employee attempting an action, reduced to the fields policy rules
/// consult. The department-head marker is kept separately from the authority
/// ladder: comment deletion honors the position marker and the Admin role
/// but not the Manager role, so the marker cannot be folded into one rank.
#[derive(Debug, Clone)]
pub struct Actor {
    pub emp_id: Uuid,
    pub role: Role,
    pub authority: EffectiveAuthority,
    pub is_department_head: bool,
    pub department: Option<String>,
    pub cap_bac: Option<String>,
}

impl Actor {
    pub fn from_employee(employee: &Employee) -> Self {
        Self {
            emp_id: employee.id,
            role: employee.role,
            authority: EffectiveAuthority::derive(employee.role, employee.position.as_deref()),
            is_department_head: employee.is_department_head(),
            department: employee.department.clone(),
            cap_bac: employee.cap_bac.clone(),
        }
    }

    pub fn has_elevated_cap_bac(&self) -> bool {
        self.cap_bac.as_deref() == Some(super::ELEVATED_CAP_BAC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_wins_over_position() {
        let authority = EffectiveAuthority::derive(Role::Admin, Some("Trưởng phòng"));
        assert_eq!(authority, EffectiveAuthority::Admin);
    }

    #[test]
    fn head_position_upgrades_plain_employee() {
        let authority = EffectiveAuthority::derive(Role::Employee, Some("Trưởng phòng kỹ thuật"));
        assert_eq!(authority, EffectiveAuthority::DepartmentHead);
    }

    #[test]
    fn plain_employee_stays_employee() {
        let authority = EffectiveAuthority::derive(Role::Employee, Some("Dev"));
        assert_eq!(authority, EffectiveAuthority::Employee);
        assert_eq!(
            EffectiveAuthority::derive(Role::Employee, None),
            EffectiveAuthority::Employee
        );
    }
}

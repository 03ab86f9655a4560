use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// Formal role assigned by HR. Ordered from lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Employee = 0,
    Manager = 1,
    Admin = 2,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Manager and Admin carry managerial authority by role alone.
    pub fn is_managerial(&self) -> bool {
        matches!(self, Self::Manager | Self::Admin)
    }
}

/// Employment status. Employees are never hard-deleted; offboarding moves
/// the status to `Resigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Resigned,
    OnLeave,
}

impl EmployeeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "resigned" => Some(Self::Resigned),
            "on_leave" => Some(Self::OnLeave),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resigned => "resigned",
            Self::OnLeave => "on_leave",
        }
    }
}

/// Position substrings that mark an employee as head of their department.
/// The marker is a secondary authority signal alongside the formal role.
const DEPARTMENT_HEAD_MARKERS: &[&str] = &["trưởng phòng", "department head"];

pub fn position_is_department_head(position: Option<&str>) -> bool {
    let Some(position) = position else {
        return false;
    };
    let lowered = position.to_lowercase();
    DEPARTMENT_HEAD_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_bac: Option<String>,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn is_department_head(&self) -> bool {
        position_is_department_head(self.position.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbEmployee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub cap_bac: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbEmployee> for Employee {
    type Error = AppError;

    fn try_from(value: DbEmployee) -> Result<Self, Self::Error> {
        let role = Role::parse(&value.role)
            .ok_or_else(|| AppError::internal(format!("unknown role: {}", value.role)))?;
        let status = EmployeeStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("unknown status: {}", value.status)))?;

        Ok(Employee {
            id: value.id,
            name: value.name,
            email: value.email,
            role,
            department: value.department,
            position: value.position,
            cap_bac: value.cap_bac,
            status,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Nguyễn Văn An")]
    pub name: String,
    #[schema(example = "an.nguyen@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    #[schema(example = "Sales")]
    pub department: Option<String>,
    #[schema(example = "Nhân viên kinh doanh")]
    pub position: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "an.nguyen@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub employee: Employee,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub position: Option<String>,
    pub cap_bac: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    pub status: EmployeeStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DepartmentTransferRequest {
    #[schema(example = "Engineering")]
    pub department: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_marker_matches_vietnamese_title() {
        assert!(position_is_department_head(Some("Trưởng phòng kinh doanh")));
        assert!(position_is_department_head(Some("Department Head, Sales")));
        assert!(!position_is_department_head(Some("Dev")));
        assert!(!position_is_department_head(None));
    }

    #[test]
    fn role_parse_round_trip() {
        for role in [Role::Employee, Role::Manager, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("ceo"), None);
    }

    #[test]
    fn manager_and_admin_are_managerial() {
        assert!(!Role::Employee.is_managerial());
        assert!(Role::Manager.is_managerial());
        assert!(Role::Admin.is_managerial());
    }
}

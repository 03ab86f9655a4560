use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Auto-derived, one per department, never deletable.
    Department,
    /// Hand-picked member list, owned by its creator.
    Custom,
}

impl GroupType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "department" => Some(Self::Department),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Department => "department",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupMemberRole {
    Admin,
    Member,
}

impl GroupMemberRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupChat {
    pub id: Uuid,
    pub group_name: String,
    pub group_type: GroupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbGroupChat {
    pub id: Uuid,
    pub group_name: String,
    pub group_type: String,
    pub department: Option<String>,
    pub created_by: Option<Uuid>,
    pub group_avatar: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbGroupChat> for GroupChat {
    type Error = AppError;

    fn try_from(value: DbGroupChat) -> Result<Self, Self::Error> {
        let group_type = GroupType::parse(&value.group_type).ok_or_else(|| {
            AppError::internal(format!("unknown group type: {}", value.group_type))
        })?;

        Ok(GroupChat {
            id: value.id,
            group_name: value.group_name,
            group_type,
            department: value.department,
            created_by: value.created_by,
            group_avatar: value.group_avatar,
            description: value.description,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub emp_id: Uuid,
    pub role: GroupMemberRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbGroupMember {
    pub group_id: Uuid,
    pub emp_id: Uuid,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl TryFrom<DbGroupMember> for GroupMember {
    type Error = AppError;

    fn try_from(value: DbGroupMember) -> Result<Self, Self::Error> {
        let role = GroupMemberRole::parse(&value.role)
            .ok_or_else(|| AppError::internal(format!("unknown member role: {}", value.role)))?;

        Ok(GroupMember {
            group_id: value.group_id,
            emp_id: value.emp_id,
            role,
            joined_at: value.joined_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomGroupCreateRequest {
    #[schema(example = "Lunch crew")]
    pub group_name: String,
    pub description: Option<String>,
    pub group_avatar: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GroupUpdateRequest {
    pub group_name: Option<String>,
    pub description: Option<String>,
    pub group_avatar: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnsureDepartmentGroupRequest {
    #[schema(example = "Engineering")]
    pub department: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub emp_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: GroupChat,
    pub members: Vec<GroupMember>,
}

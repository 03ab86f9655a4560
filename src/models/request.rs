use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::employee::Role;

/// Lifecycle of an approval request. `Pending` is the only state that
/// accepts a transition; `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub emp_id: Uuid,
    pub request_type: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_file: Option<String>,
    pub request_date: DateTime<Utc>,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRequest {
    pub id: Uuid,
    pub emp_id: Uuid,
    pub request_type: String,
    pub title: String,
    pub content: String,
    pub attached_file: Option<String>,
    pub request_date: DateTime<Utc>,
    pub status: String,
    pub approved_by: Option<Uuid>,
    pub approved_date: Option<DateTime<Utc>>,
    pub approver_role: Option<String>,
    pub rejection_reason: Option<String>,
}

impl TryFrom<DbRequest> for ApprovalRequest {
    type Error = AppError;

    fn try_from(value: DbRequest) -> Result<Self, Self::Error> {
        let status = RequestStatus::parse(&value.status)
            .ok_or_else(|| AppError::internal(format!("unknown request status: {}", value.status)))?;
        let approver_role = match value.approver_role.as_deref() {
            Some(raw) => Some(
                Role::parse(raw)
                    .ok_or_else(|| AppError::internal(format!("unknown approver role: {raw}")))?,
            ),
            None => None,
        };

        Ok(ApprovalRequest {
            id: value.id,
            emp_id: value.emp_id,
            request_type: value.request_type,
            title: value.title,
            content: value.content,
            attached_file: value.attached_file,
            request_date: value.request_date,
            status,
            approved_by: value.approved_by,
            approved_date: value.approved_date,
            approver_role,
            rejection_reason: value.rejection_reason,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    #[schema(example = "leave")]
    pub request_type: String,
    #[schema(example = "Annual leave, 3 days")]
    pub title: String,
    #[schema(example = "Family trip from 2026-09-07 to 2026-09-09")]
    pub content: String,
    pub attached_file: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectRequest {
    #[schema(example = "Quarter-end freeze, resubmit next month")]
    pub rejection_reason: String,
}

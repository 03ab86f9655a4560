//! Request approval workflow.
//!
//! Pure state machine over [`ApprovalRequest`]: Pending -> Approved or
//! Rejected, both terminal. Functions here take already-loaded entities and
//! return the new state plus the notification event that is due; the caller
//! persists the result. Persistence must commit decisions with a
//! compare-and-set on `status = 'pending'` so a racing approver observes
//! `InvalidTransition` instead of overwriting a resolved request.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::authz::{self, Action, RequestTarget, Target};
use crate::errors::AppError;
use crate::events::RequestEvent;
use crate::models::employee::Employee;
use crate::models::request::{ApprovalRequest, RequestStatus, SubmitRequest};
use crate::utils::require_non_blank;

/// Builds a new request in `Pending`. Title and content are required.
pub fn submit(
    emp_id: Uuid,
    payload: SubmitRequest,
    now: DateTime<Utc>,
) -> Result<ApprovalRequest, AppError> {
    require_non_blank(&payload.title, "title")?;
    require_non_blank(&payload.content, "content")?;
    require_non_blank(&payload.request_type, "request_type")?;

    Ok(ApprovalRequest {
        id: Uuid::new_v4(),
        emp_id,
        request_type: payload.request_type,
        title: payload.title,
        content: payload.content,
        attached_file: payload.attached_file,
        request_date: now,
        status: RequestStatus::Pending,
        approved_by: None,
        approved_date: None,
        approver_role: None,
        rejection_reason: None,
    })
}

pub fn approve(
    request: &ApprovalRequest,
    approver: &Employee,
    now: DateTime<Utc>,
) -> Result<(ApprovalRequest, RequestEvent), AppError> {
    ensure_decidable(request, approver)?;

    let mut updated = request.clone();
    updated.status = RequestStatus::Approved;
    updated.approved_by = Some(approver.id);
    updated.approved_date = Some(now);
    updated.approver_role = Some(approver.role);
    updated.rejection_reason = None;

    let event = RequestEvent::Approved {
        emp_id: request.emp_id,
        request_type: request.request_type.clone(),
        approver_name: approver.name.clone(),
    };

    Ok((updated, event))
}

pub fn reject(
    request: &ApprovalRequest,
    approver: &Employee,
    rejection_reason: String,
    now: DateTime<Utc>,
) -> Result<(ApprovalRequest, RequestEvent), AppError> {
    // The reason is validated before authorization so a malformed call gets
    // the same answer no matter who makes it.
    require_non_blank(&rejection_reason, "rejection_reason")?;
    ensure_decidable(request, approver)?;

    let mut updated = request.clone();
    updated.status = RequestStatus::Rejected;
    updated.approved_by = Some(approver.id);
    updated.approved_date = Some(now);
    updated.approver_role = Some(approver.role);
    updated.rejection_reason = Some(rejection_reason);

    let event = RequestEvent::Rejected {
        emp_id: request.emp_id,
        request_type: request.request_type.clone(),
        approver_name: approver.name.clone(),
    };

    Ok((updated, event))
}

/// Checks that the submitter may withdraw their own still-pending request.
/// Both a foreign requester and a resolved request come back `Forbidden`.
pub fn withdraw(request: &ApprovalRequest, requester: &Employee) -> Result<(), AppError> {
    let actor = authz::Actor::from_employee(requester);
    let target = Target::Request(RequestTarget { request });
    if !authz::check(&actor, Action::Withdraw, &target).is_allow() {
        return Err(AppError::forbidden(
            "only the submitter may withdraw a still-pending request",
        ));
    }
    Ok(())
}

fn ensure_decidable(request: &ApprovalRequest, approver: &Employee) -> Result<(), AppError> {
    if request.status.is_terminal() {
        return Err(AppError::invalid_transition(format!(
            "request is already {}",
            request.status.as_str()
        )));
    }

    // Explicit equality guard, independent of the role rule below.
    if approver.id == request.emp_id {
        return Err(AppError::forbidden("submitter may not decide their own request"));
    }

    let actor = authz::Actor::from_employee(approver);
    let target = Target::Request(RequestTarget { request });
    if !authz::check(&actor, Action::Decide, &target).is_allow() {
        return Err(AppError::forbidden("only managers or admins may decide requests"));
    }

    Ok(())
}

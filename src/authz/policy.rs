use uuid::Uuid;

use super::actor::{Actor, EffectiveAuthority};
use crate::models::group::{GroupChat, GroupMemberRole, GroupType};
use crate::models::request::{ApprovalRequest, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
    AddMember,
    RemoveMember,
    /// Approve or reject an approval request; both share one rule.
    Decide,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Group plus the membership context the caller already holds. `actor_role`
/// is the actor's role inside this group, if any; `subject_id` is the member
/// an action is aimed at (removal).
#[derive(Debug, Clone)]
pub struct GroupTarget<'a> {
    pub group: &'a GroupChat,
    pub actor_role: Option<GroupMemberRole>,
    pub subject_id: Option<Uuid>,
}

impl<'a> GroupTarget<'a> {
    pub fn new(group: &'a GroupChat) -> Self {
        Self {
            group,
            actor_role: None,
            subject_id: None,
        }
    }

    pub fn with_actor_role(mut self, role: Option<GroupMemberRole>) -> Self {
        self.actor_role = role;
        self
    }

    pub fn with_subject(mut self, emp_id: Uuid) -> Self {
        self.subject_id = Some(emp_id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RequestTarget<'a> {
    pub request: &'a ApprovalRequest,
}

#[derive(Debug, Clone)]
pub enum Target<'a> {
    Post { author_id: Uuid },
    Comment { author_id: Uuid },
    Group(GroupTarget<'a>),
    Request(RequestTarget<'a>),
}

/// Capability table over (entity kind, action). Combinations without a rule
/// deny; every arm below is a named predicate so the asymmetries between
/// entity kinds stay visible in one place.
pub fn check(actor: &Actor, action: Action, target: &Target) -> Decision {
    let decision = match (target, action) {
        (Target::Post { author_id }, Action::Edit) => can_edit_post(actor, *author_id),
        (Target::Post { author_id }, Action::Delete) => can_delete_post(actor, *author_id),
        (Target::Comment { author_id }, Action::Edit) => can_edit_comment(actor, *author_id),
        (Target::Comment { author_id }, Action::Delete) => can_delete_comment(actor, *author_id),
        (Target::Group(group), Action::Edit) => can_edit_group(actor, group),
        (Target::Group(group), Action::Delete) => can_delete_group(actor, group),
        (Target::Group(group), Action::AddMember) => can_add_member(actor, group),
        (Target::Group(group), Action::RemoveMember) => can_remove_member(actor, group),
        (Target::Request(request), Action::Decide) => can_decide_request(actor, request.request),
        (Target::Request(request), Action::Withdraw) => {
            can_withdraw_request(actor, request.request)
        }
        _ => Decision::Deny,
    };

    tracing::debug!(
        actor = %actor.emp_id,
        ?action,
        allowed = decision.is_allow(),
        "policy decision"
    );

    decision
}

fn can_edit_post(actor: &Actor, author_id: Uuid) -> Decision {
    Decision::from_bool(
        actor.emp_id == author_id
            || actor.role.is_managerial()
            || actor.has_elevated_cap_bac(),
    )
}

fn can_delete_post(actor: &Actor, author_id: Uuid) -> Decision {
    // Same population as edit: owner, any Manager/Admin, or the A1 rank.
    Decision::from_bool(
        actor.emp_id == author_id
            || actor.role.is_managerial()
            || actor.has_elevated_cap_bac(),
    )
}

// Comments allow no manager override on edit; strict self-ownership.
fn can_edit_comment(actor: &Actor, author_id: Uuid) -> Decision {
    Decision::from_bool(actor.emp_id == author_id)
}

// Deletion honors the position marker and the Admin role, but a Manager by
// role alone is denied.
fn can_delete_comment(actor: &Actor, author_id: Uuid) -> Decision {
    Decision::from_bool(
        actor.emp_id == author_id
            || actor.is_department_head
            || actor.authority == EffectiveAuthority::Admin,
    )
}

fn can_edit_group(actor: &Actor, target: &GroupTarget) -> Decision {
    let is_creator = target.group.created_by == Some(actor.emp_id);
    let manager_override =
        target.group.group_type == GroupType::Department && actor.role.is_managerial();
    Decision::from_bool(is_creator || manager_override)
}

fn can_delete_group(actor: &Actor, target: &GroupTarget) -> Decision {
    match target.group.group_type {
        // Department groups are structural; nobody may delete them.
        GroupType::Department => Decision::Deny,
        GroupType::Custom => Decision::from_bool(target.group.created_by == Some(actor.emp_id)),
    }
}

fn can_add_member(actor: &Actor, target: &GroupTarget) -> Decision {
    let is_creator = target.group.created_by == Some(actor.emp_id);
    let department_manager =
        target.group.group_type == GroupType::Department && actor.role.is_managerial();
    Decision::from_bool(is_creator || department_manager)
}

fn can_remove_member(actor: &Actor, target: &GroupTarget) -> Decision {
    let Some(subject_id) = target.subject_id else {
        return Decision::Deny;
    };

    let removing_self = actor.emp_id == subject_id;

    // Department membership is derived from the roster, not voluntary.
    if target.group.group_type == GroupType::Department && removing_self {
        return Decision::Deny;
    }

    let is_group_admin = target.actor_role == Some(GroupMemberRole::Admin);
    Decision::from_bool(is_group_admin || removing_self)
}

fn can_decide_request(actor: &Actor, request: &ApprovalRequest) -> Decision {
    // Self-approval is excluded before any role check; a Manager submitting
    // their own request must not satisfy the role rule.
    if actor.emp_id == request.emp_id {
        return Decision::Deny;
    }
    Decision::from_bool(actor.role.is_managerial())
}

fn can_withdraw_request(actor: &Actor, request: &ApprovalRequest) -> Decision {
    Decision::from_bool(
        request.status == RequestStatus::Pending && actor.emp_id == request.emp_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::employee::Role;

    fn actor(role: Role, position: Option<&str>) -> Actor {
        Actor {
            emp_id: Uuid::new_v4(),
            role,
            authority: EffectiveAuthority::derive(role, position),
            is_department_head: crate::models::employee::position_is_department_head(position),
            department: Some("Sales".to_string()),
            cap_bac: None,
        }
    }

    fn group(group_type: GroupType, created_by: Option<Uuid>) -> GroupChat {
        GroupChat {
            id: Uuid::new_v4(),
            group_name: "g".to_string(),
            group_type,
            department: match group_type {
                GroupType::Department => Some("Sales".to_string()),
                GroupType::Custom => None,
            },
            created_by,
            group_avatar: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn request(emp_id: Uuid, status: RequestStatus) -> ApprovalRequest {
        ApprovalRequest {
            id: Uuid::new_v4(),
            emp_id,
            request_type: "leave".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            attached_file: None,
            request_date: Utc::now(),
            status,
            approved_by: None,
            approved_date: None,
            approver_role: None,
            rejection_reason: None,
        }
    }

    #[test]
    fn manager_may_edit_others_posts_but_not_comments() {
        let manager = actor(Role::Manager, None);
        let author_id = Uuid::new_v4();

        assert!(check(&manager, Action::Edit, &Target::Post { author_id }).is_allow());
        assert!(!check(&manager, Action::Edit, &Target::Comment { author_id }).is_allow());
    }

    #[test]
    fn cap_bac_a1_overrides_post_ownership() {
        let mut employee = actor(Role::Employee, None);
        let author_id = Uuid::new_v4();
        assert!(!check(&employee, Action::Delete, &Target::Post { author_id }).is_allow());

        employee.cap_bac = Some("A1".to_string());
        assert!(check(&employee, Action::Delete, &Target::Post { author_id }).is_allow());
    }

    #[test]
    fn comment_delete_ignores_manager_role_but_honors_head_marker() {
        let author_id = Uuid::new_v4();
        let target = Target::Comment { author_id };

        let manager = actor(Role::Manager, None);
        assert!(!check(&manager, Action::Delete, &target).is_allow());

        let head = actor(Role::Employee, Some("Trưởng phòng"));
        assert!(check(&head, Action::Delete, &target).is_allow());

        let admin = actor(Role::Admin, None);
        assert!(check(&admin, Action::Delete, &target).is_allow());
    }

    #[test]
    fn custom_group_add_member_only_for_creator() {
        let creator = actor(Role::Employee, None);
        let outsider = actor(Role::Admin, None);
        let g = group(GroupType::Custom, Some(creator.emp_id));

        assert!(check(&creator, Action::AddMember, &Target::Group(GroupTarget::new(&g))).is_allow());
        // Even an Admin may not add to someone else's custom group.
        assert!(!check(&outsider, Action::AddMember, &Target::Group(GroupTarget::new(&g))).is_allow());
    }

    #[test]
    fn department_group_add_member_requires_managerial_role() {
        let g = group(GroupType::Department, None);

        let manager = actor(Role::Manager, None);
        let employee = actor(Role::Employee, None);
        let head = actor(Role::Employee, Some("Trưởng phòng"));

        assert!(check(&manager, Action::AddMember, &Target::Group(GroupTarget::new(&g))).is_allow());
        assert!(!check(&employee, Action::AddMember, &Target::Group(GroupTarget::new(&g))).is_allow());
        // Head-by-position is not a formal Manager/Admin role.
        assert!(!check(&head, Action::AddMember, &Target::Group(GroupTarget::new(&g))).is_allow());
    }

    #[test]
    fn department_groups_are_never_deletable() {
        let creator = actor(Role::Admin, None);
        let g = group(GroupType::Department, Some(creator.emp_id));

        assert!(!check(&creator, Action::Delete, &Target::Group(GroupTarget::new(&g))).is_allow());
    }

    #[test]
    fn custom_group_delete_only_for_creator() {
        let creator = actor(Role::Employee, None);
        let admin = actor(Role::Admin, None);
        let g = group(GroupType::Custom, Some(creator.emp_id));

        assert!(check(&creator, Action::Delete, &Target::Group(GroupTarget::new(&g))).is_allow());
        assert!(!check(&admin, Action::Delete, &Target::Group(GroupTarget::new(&g))).is_allow());
    }

    #[test]
    fn remove_member_requires_group_admin_or_self() {
        let g = group(GroupType::Custom, Some(Uuid::new_v4()));
        let subject = Uuid::new_v4();

        let group_admin = actor(Role::Employee, None);
        let target = Target::Group(
            GroupTarget::new(&g)
                .with_actor_role(Some(GroupMemberRole::Admin))
                .with_subject(subject),
        );
        assert!(check(&group_admin, Action::RemoveMember, &target).is_allow());

        let plain_member = actor(Role::Employee, None);
        let target = Target::Group(
            GroupTarget::new(&g)
                .with_actor_role(Some(GroupMemberRole::Member))
                .with_subject(subject),
        );
        assert!(!check(&plain_member, Action::RemoveMember, &target).is_allow());

        // Self-removal from a custom group is fine.
        let leaver = actor(Role::Employee, None);
        let target = Target::Group(
            GroupTarget::new(&g)
                .with_actor_role(Some(GroupMemberRole::Member))
                .with_subject(leaver.emp_id),
        );
        assert!(check(&leaver, Action::RemoveMember, &target).is_allow());
    }

    #[test]
    fn department_group_forbids_self_removal() {
        let g = group(GroupType::Department, None);
        let leaver = actor(Role::Manager, None);
        let target = Target::Group(
            GroupTarget::new(&g)
                .with_actor_role(Some(GroupMemberRole::Admin))
                .with_subject(leaver.emp_id),
        );

        assert!(!check(&leaver, Action::RemoveMember, &target).is_allow());
    }

    #[test]
    fn remove_member_without_subject_denies() {
        let g = group(GroupType::Custom, Some(Uuid::new_v4()));
        let admin = actor(Role::Admin, None);
        let target = Target::Group(GroupTarget::new(&g).with_actor_role(Some(GroupMemberRole::Admin)));

        assert!(!check(&admin, Action::RemoveMember, &target).is_allow());
    }

    #[test]
    fn self_approval_denied_for_any_role() {
        for role in [Role::Employee, Role::Manager, Role::Admin] {
            let submitter = actor(role, None);
            let req = request(submitter.emp_id, RequestStatus::Pending);
            let target = Target::Request(RequestTarget { request: &req });

            assert!(
                !check(&submitter, Action::Decide, &target).is_allow(),
                "self-approval must be denied for {role:?}"
            );
        }
    }

    #[test]
    fn only_managerial_roles_decide_requests() {
        let req = request(Uuid::new_v4(), RequestStatus::Pending);
        let target = Target::Request(RequestTarget { request: &req });

        assert!(check(&actor(Role::Manager, None), Action::Decide, &target).is_allow());
        assert!(check(&actor(Role::Admin, None), Action::Decide, &target).is_allow());
        assert!(!check(&actor(Role::Employee, None), Action::Decide, &target).is_allow());
        // Position-derived head without the formal role cannot decide.
        assert!(!check(&actor(Role::Employee, Some("Trưởng phòng")), Action::Decide, &target).is_allow());
    }

    #[test]
    fn withdraw_only_while_pending_and_only_by_submitter() {
        let submitter = actor(Role::Employee, None);

        let pending = request(submitter.emp_id, RequestStatus::Pending);
        let target = Target::Request(RequestTarget { request: &pending });
        assert!(check(&submitter, Action::Withdraw, &target).is_allow());

        let resolved = request(submitter.emp_id, RequestStatus::Approved);
        let target = Target::Request(RequestTarget { request: &resolved });
        assert!(!check(&submitter, Action::Withdraw, &target).is_allow());

        let stranger = actor(Role::Admin, None);
        let pending = request(submitter.emp_id, RequestStatus::Pending);
        let target = Target::Request(RequestTarget { request: &pending });
        assert!(!check(&stranger, Action::Withdraw, &target).is_allow());
    }

    #[test]
    fn unmatched_combinations_deny() {
        let admin = actor(Role::Admin, None);
        let req = request(Uuid::new_v4(), RequestStatus::Pending);

        // No edit rule exists for requests.
        let target = Target::Request(RequestTarget { request: &req });
        assert!(!check(&admin, Action::Edit, &target).is_allow());
    }
}

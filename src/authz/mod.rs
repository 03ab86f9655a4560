//! Authorization module - policy engine over forum entities
//!
//! Pure capability table keyed by (entity kind, action). Every predicate is
//! total: missing context (unset department, unknown creator) evaluates to
//! `Deny`, never to a panic or an implicit `Allow`.

mod actor;
mod policy;

pub use actor::{Actor, EffectiveAuthority};
pub use policy::{check, Action, Decision, GroupTarget, RequestTarget, Target};

/// Elevated rank marker that grants post edit/delete regardless of role.
pub const ELEVATED_CAP_BAC: &str = "A1";

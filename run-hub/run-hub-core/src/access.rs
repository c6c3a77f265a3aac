//! Ownership-based modification rights.
//!
//! These checks are advisory: the store accepts any write. Callers are
//! expected to ask before mutating.

use crate::model::Owner;

/// Whether `identity` may modify resources belonging to `owner_id`.
///
/// `owner` is the stored record for `owner_id`, if any. It is only consulted
/// when the identity is not the owner itself.
pub fn may_modify(identity: Option<&str>, owner_id: &str, owner: Option<&Owner>) -> bool {
    let Some(identity) = identity else {
        return false;
    };
    if identity == owner_id {
        return true;
    }
    match owner {
        Some(owner) if owner.isgroup => owner.has_member(identity),
        _ => false,
    }
}

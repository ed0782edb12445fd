use crate::model::common::Role;

/// The set of roles an endpoint accepts. Used as the type parameter of
/// [`super::AuthToken`], so a handler's signature states who may call it.
pub trait Audience {
    /// Human-readable description, for error messages.
    const DESCRIPTION: &'static str;

    /// Does this audience include the given role?
    fn admits(role: Role) -> bool;
}

/// Anyone with an account.
pub struct Member;

impl Audience for Member {
    const DESCRIPTION: &'static str = "members";

    fn admits(_role: Role) -> bool {
        true
    }
}

/// People who live in the community: residents and the committee, but not
/// outside vendors.
pub struct Household;

impl Audience for Household {
    const DESCRIPTION: &'static str = "residents and committee members";

    fn admits(role: Role) -> bool {
        matches!(role, Role::Resident | Role::Committee)
    }
}

/// The management committee.
pub struct Committee;

impl Audience for Committee {
    const DESCRIPTION: &'static str = "committee members";

    fn admits(role: Role) -> bool {
        role == Role::Committee
    }
}

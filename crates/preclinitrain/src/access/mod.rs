//! Capability checks the engine performs before accepting evidence-writing operations.
//!
//! The engine depends only on the [`AccessPolicy`] trait; [`RoleBasedPolicy`] is the
//! concrete role/permission lookup shipped alongside it.

mod permission;
mod policy;

pub use permission::{default_role_grants, Permission};
pub use policy::{
    ensure_permitted, AccessPolicy, FacilityContext, RequestContext, RoleAssignment,
    RoleBasedPolicy,
};

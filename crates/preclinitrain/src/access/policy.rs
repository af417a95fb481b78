use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::permission::{default_role_grants, Permission};
use crate::workflows::{EngineError, FacilityId, UserId};

/// Capability check consumed by the engine.
pub trait AccessPolicy: Send + Sync {
    /// Whether `user` holds `permission`. With a facility context the grant must come from
    /// an approved role assignment in that facility.
    fn authorize(
        &self,
        user: UserId,
        permission: Permission,
        facility: Option<&FacilityContext>,
    ) -> bool;

    /// Global (facility-independent) check.
    fn can(&self, user: UserId, permission: Permission) -> bool {
        self.authorize(user, permission, None)
    }
}

/// The facility the acting user has currently selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityContext {
    pub facility_id: FacilityId,
}

/// Who is performing a write, and in which facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: UserId,
    pub facility: Option<FacilityContext>,
}

impl RequestContext {
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            facility: None,
        }
    }

    pub fn in_facility(mut self, facility_id: FacilityId) -> Self {
        self.facility = Some(FacilityContext { facility_id });
        self
    }
}

/// A role held by a user, either globally or inside one facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user: UserId,
    pub role: String,
    #[serde(default)]
    pub facility: Option<FacilityId>,
    #[serde(default)]
    pub approved: bool,
}

/// Role/permission lookup backed by in-process tables.
#[derive(Debug, Clone, Default)]
pub struct RoleBasedPolicy {
    administrators: BTreeSet<UserId>,
    roles: BTreeMap<String, BTreeSet<Permission>>,
    assignments: Vec<RoleAssignment>,
}

impl RoleBasedPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy pre-populated with the stock Admin, Team Leader, Tutor, Validator and User roles.
    pub fn with_default_roles() -> Self {
        let mut policy = Self::new();
        for (name, grants) in default_role_grants() {
            policy.define_role(name, grants);
        }
        policy
    }

    pub fn define_role(
        &mut self,
        name: impl Into<String>,
        grants: impl IntoIterator<Item = Permission>,
    ) -> &mut Self {
        self.roles
            .entry(name.into())
            .or_default()
            .extend(grants);
        self
    }

    /// Global administrators hold every permission everywhere.
    pub fn grant_admin(&mut self, user: UserId) -> &mut Self {
        self.administrators.insert(user);
        self
    }

    pub fn assign(&mut self, assignment: RoleAssignment) -> &mut Self {
        self.assignments.push(assignment);
        self
    }

    pub fn assign_global(&mut self, user: UserId, role: impl Into<String>) -> &mut Self {
        self.assign(RoleAssignment {
            user,
            role: role.into(),
            facility: None,
            approved: true,
        })
    }

    pub fn assign_in_facility(
        &mut self,
        user: UserId,
        role: impl Into<String>,
        facility: FacilityId,
        approved: bool,
    ) -> &mut Self {
        self.assign(RoleAssignment {
            user,
            role: role.into(),
            facility: Some(facility),
            approved,
        })
    }

    fn role_grants(&self, role: &str, permission: Permission) -> bool {
        self.roles
            .get(role)
            .map(|grants| grants.contains(&permission))
            .unwrap_or(false)
    }
}

impl AccessPolicy for RoleBasedPolicy {
    fn authorize(
        &self,
        user: UserId,
        permission: Permission,
        facility: Option<&FacilityContext>,
    ) -> bool {
        if self.administrators.contains(&user) {
            return true;
        }

        self.assignments
            .iter()
            .filter(|assignment| assignment.user == user)
            .filter(|assignment| match facility {
                None => assignment.facility.is_none(),
                Some(context) => {
                    assignment.approved && assignment.facility == Some(context.facility_id)
                }
            })
            .any(|assignment| self.role_grants(&assignment.role, permission))
    }
}

/// Fails with `PermissionDenied` unless the actor may perform `permission`.
///
/// When `scope` names a facility the request must carry that same facility as its
/// selected context; a missing or different selection is a denial.
pub fn ensure_permitted<A>(
    policy: &A,
    context: &RequestContext,
    permission: Permission,
    scope: Option<FacilityId>,
) -> Result<(), EngineError>
where
    A: AccessPolicy + ?Sized,
{
    let granted = match scope {
        None => policy.can(context.actor, permission),
        Some(required) => match context.facility {
            Some(selected) if selected.facility_id == required => {
                policy.authorize(context.actor, permission, Some(&selected))
            }
            _ => false,
        },
    };

    if granted {
        Ok(())
    } else {
        warn!(
            user = %context.actor,
            %permission,
            facility = ?scope,
            "authorization failure"
        );
        Err(EngineError::PermissionDenied {
            user: context.actor,
            permission,
        })
    }
}

use crate::access::Permission;

use super::ids::{SkillId, UserId};
use super::store::RepositoryError;

/// Error raised by the compliance engine. Callers translate these for their own transport.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(
        "competency for user {user} and skill {skill} changed concurrently; gave up after {attempts} attempt(s)"
    )]
    Conflict {
        user: UserId,
        skill: SkillId,
        attempts: u32,
    },
    #[error("user {user} is not permitted to {permission}")]
    PermissionDenied { user: UserId, permission: Permission },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<u64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

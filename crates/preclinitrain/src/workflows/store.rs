use super::ids::UserId;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness or version check failed; the caller may re-read and retry.
    #[error("record changed concurrently or already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of user accounts, used to reject evidence for unknown users.
pub trait UserDirectory: Send + Sync {
    fn user_exists(&self, user: UserId) -> Result<bool, RepositoryError>;
}

use super::domain::{AttendanceRecord, ContinuousTrainingEvent, UserContinuousTraining};
use crate::workflows::ids::{AttendanceId, EventId, UserId};
use crate::workflows::store::{RepositoryError, UserDirectory};

/// Storage abstraction for continuing-education events and attendance.
pub trait ContinuousTrainingRepository: Send + Sync {
    fn event(&self, id: EventId) -> Result<Option<ContinuousTrainingEvent>, RepositoryError>;
    fn attendance(
        &self,
        id: AttendanceId,
    ) -> Result<Option<UserContinuousTraining>, RepositoryError>;
    /// Every attendance of the user joined with its event, whatever the status.
    fn attendances_for_user(&self, user: UserId) -> Result<Vec<AttendanceRecord>, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the user already attends the event.
    fn insert_attendance(
        &self,
        record: UserContinuousTraining,
    ) -> Result<UserContinuousTraining, RepositoryError>;
    fn update_attendance(
        &self,
        record: UserContinuousTraining,
    ) -> Result<UserContinuousTraining, RepositoryError>;
}

pub trait ContinuousTrainingStore: ContinuousTrainingRepository + UserDirectory {}

impl<T> ContinuousTrainingStore for T where T: ContinuousTrainingRepository + UserDirectory {}

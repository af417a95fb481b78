use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::domain::{Competency, Skill, SkillPracticeEvent};
use crate::workflows::ids::{SkillId, UserId};
use crate::workflows::store::{RepositoryError, UserDirectory};

/// Storage abstraction for canonical competency rows.
///
/// Implementations must enforce the (user, skill, species-set) uniqueness on `insert` and
/// compare `version` on `update`, returning [`RepositoryError::Conflict`] when either check
/// fails so the reconciler can re-read and retry.
pub trait CompetencyRepository: Send + Sync {
    fn for_user_skill(
        &self,
        user: UserId,
        skill: SkillId,
    ) -> Result<Vec<Competency>, RepositoryError>;
    fn for_user(&self, user: UserId) -> Result<Vec<Competency>, RepositoryError>;
    fn insert(&self, record: Competency) -> Result<Competency, RepositoryError>;
    /// Persists `record` if the stored version still equals `record.version`; returns the
    /// stored row with its bumped version.
    fn update(&self, record: Competency) -> Result<Competency, RepositoryError>;
}

/// Skill reference data and the tutor roster per skill.
pub trait SkillCatalog: Send + Sync {
    fn skill(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError>;
    fn tutors(&self, skill: SkillId) -> Result<BTreeSet<UserId>, RepositoryError>;
    /// Returns `true` when the user was not already a tutor.
    fn add_tutor(&self, skill: SkillId, user: UserId) -> Result<bool, RepositoryError>;
}

/// Skill-practice declarations. Only recency matters to the engine.
pub trait PracticeLog: Send + Sync {
    fn record(&self, event: SkillPracticeEvent) -> Result<SkillPracticeEvent, RepositoryError>;
    /// Most recent practice instant for any event by `user` that lists `skill`.
    fn latest_practice(
        &self,
        user: UserId,
        skill: SkillId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError>;
    fn has_practice_at(
        &self,
        user: UserId,
        skill: SkillId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

/// Everything the competency workflow reads and writes.
pub trait CompetencyStore: CompetencyRepository + SkillCatalog + PracticeLog + UserDirectory {}

impl<T> CompetencyStore for T where
    T: CompetencyRepository + SkillCatalog + PracticeLog + UserDirectory
{
}

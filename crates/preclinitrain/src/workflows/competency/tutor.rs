use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::Skill;
use super::recycling::recycling_due_date;
use super::repository::CompetencyStore;
use crate::workflows::error::EngineError;
use crate::workflows::ids::{SkillId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorValidityReason {
    Valid,
    NotATutor,
    NoValidationRecord,
    CompetencyExpired,
}

impl TutorValidityReason {
    pub const fn message(self) -> &'static str {
        match self {
            Self::Valid => "tutor is valid",
            Self::NotATutor => "not a tutor for this skill",
            Self::NoValidationRecord => "no validation record found",
            Self::CompetencyExpired => "competency expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TutorValidity {
    pub tutor_id: UserId,
    pub skill_id: SkillId,
    pub valid: bool,
    pub reason: String,
    pub code: TutorValidityReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recycling_due_date: Option<DateTime<Utc>>,
}

impl TutorValidity {
    fn new(
        tutor_id: UserId,
        skill_id: SkillId,
        code: TutorValidityReason,
        recycling_due_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            tutor_id,
            skill_id,
            valid: code == TutorValidityReason::Valid,
            reason: code.message().to_string(),
            code,
            recycling_due_date,
        }
    }
}

/// Decides whether a tutor's competence in a skill is still current on a given date.
///
/// The most recent evidence for the tutor and skill is used whether it precedes or follows
/// `as_of`; species are ignored.
pub struct TutorValidityChecker<S> {
    store: Arc<S>,
}

impl<S> TutorValidityChecker<S>
where
    S: CompetencyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn is_valid_tutor(
        &self,
        tutor: UserId,
        skill_id: SkillId,
        as_of: DateTime<Utc>,
    ) -> Result<TutorValidity, EngineError> {
        let skill = self.load_skill(skill_id)?;
        if !self.store.tutors(skill_id)?.contains(&tutor) {
            return Ok(TutorValidity::new(
                tutor,
                skill_id,
                TutorValidityReason::NotATutor,
                None,
            ));
        }
        self.evaluate(tutor, &skill, as_of)
    }

    /// Validity of every tutor registered for the skill, in tutor id order.
    pub fn check_all(
        &self,
        skill_id: SkillId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<TutorValidity>, EngineError> {
        let skill = self.load_skill(skill_id)?;
        self.store
            .tutors(skill_id)?
            .into_iter()
            .map(|tutor| self.evaluate(tutor, &skill, as_of))
            .collect()
    }

    fn load_skill(&self, skill_id: SkillId) -> Result<Skill, EngineError> {
        self.store
            .skill(skill_id)?
            .ok_or_else(|| EngineError::not_found("skill", skill_id))
    }

    fn evaluate(
        &self,
        tutor: UserId,
        skill: &Skill,
        as_of: DateTime<Utc>,
    ) -> Result<TutorValidity, EngineError> {
        let evaluated = self
            .store
            .for_user_skill(tutor, skill.id)?
            .into_iter()
            .map(|competency| competency.evaluation_date)
            .max();
        let practiced = self.store.latest_practice(tutor, skill.id)?;

        let Some(latest) = evaluated.max(practiced) else {
            return Ok(TutorValidity::new(
                tutor,
                skill.id,
                TutorValidityReason::NoValidationRecord,
                None,
            ));
        };

        let due = recycling_due_date(latest, skill);
        let code = match due {
            Some(due) if as_of > due => TutorValidityReason::CompetencyExpired,
            _ => TutorValidityReason::Valid,
        };
        Ok(TutorValidity::new(tutor, skill.id, code, due))
    }
}

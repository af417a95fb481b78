use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Competency, Skill};
use super::repository::{PracticeLog, SkillCatalog};
use crate::workflows::error::EngineError;
use crate::workflows::time::{average_months, fractional_days, DAYS_PER_MONTH};

/// Where a competency stands relative to its recycling deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecyclingState {
    NeverExpires,
    Current,
    /// Inside the lead-time quarter before the due date.
    DueSoon,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecyclingAssessment {
    pub latest_practice_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recycling_due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_date: Option<DateTime<Utc>>,
    pub needs_recycling: bool,
    pub state: RecyclingState,
}

/// Later of the evaluation date and the most recent practice on the same skill.
pub fn latest_practice_date(
    evaluation_date: DateTime<Utc>,
    latest_practice: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    latest_practice.map_or(evaluation_date, |practiced| practiced.max(evaluation_date))
}

/// `None` when the skill never expires, or when the deadline falls outside the
/// representable range.
pub fn recycling_due_date(latest: DateTime<Utc>, skill: &Skill) -> Option<DateTime<Utc>> {
    let months = skill.validity_months()?;
    latest.checked_add_signed(average_months(months))
}

pub fn warning_date(due: DateTime<Utc>, validity_months: u32) -> DateTime<Utc> {
    let lead = fractional_days(f64::from(validity_months) * DAYS_PER_MONTH / 4.0);
    due.checked_sub_signed(lead).unwrap_or(due)
}

pub fn assess(
    evaluation_date: DateTime<Utc>,
    latest_practice: Option<DateTime<Utc>>,
    skill: &Skill,
    now: DateTime<Utc>,
) -> RecyclingAssessment {
    let latest = latest_practice_date(evaluation_date, latest_practice);

    let (Some(months), Some(due)) = (skill.validity_months(), recycling_due_date(latest, skill))
    else {
        return RecyclingAssessment {
            latest_practice_date: latest,
            recycling_due_date: None,
            warning_date: None,
            needs_recycling: false,
            state: RecyclingState::NeverExpires,
        };
    };

    let warning = warning_date(due, months);
    let needs_recycling = now > due;
    let state = if needs_recycling {
        RecyclingState::Expired
    } else if now >= warning {
        RecyclingState::DueSoon
    } else {
        RecyclingState::Current
    };

    RecyclingAssessment {
        latest_practice_date: latest,
        recycling_due_date: Some(due),
        warning_date: Some(warning),
        needs_recycling,
        state,
    }
}

/// Reads the skill and practice history for a competency and derives its deadlines.
pub struct RecyclingCalculator<S> {
    store: Arc<S>,
}

impl<S> RecyclingCalculator<S>
where
    S: SkillCatalog + PracticeLog + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn assess(
        &self,
        competency: &Competency,
        now: DateTime<Utc>,
    ) -> Result<RecyclingAssessment, EngineError> {
        let skill = self
            .store
            .skill(competency.skill_id)?
            .ok_or_else(|| EngineError::not_found("skill", competency.skill_id))?;
        self.assess_with_skill(competency, &skill, now)
    }

    /// Same as [`Self::assess`] for callers that already hold the skill.
    pub fn assess_with_skill(
        &self,
        competency: &Competency,
        skill: &Skill,
        now: DateTime<Utc>,
    ) -> Result<RecyclingAssessment, EngineError> {
        let practiced = self
            .store
            .latest_practice(competency.user_id, competency.skill_id)?;
        Ok(assess(competency.evaluation_date, practiced, skill, now))
    }
}

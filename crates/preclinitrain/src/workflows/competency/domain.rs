use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::error::EngineError;
use crate::workflows::ids::{
    CompetencyId, ExternalTrainingId, PracticeEventId, SessionId, SkillId, SpeciesId, UserId,
};
use crate::workflows::time::{deserialize_instant, deserialize_optional_instant};

/// Skill definition from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    /// `None` (or zero) means competencies in this skill never expire.
    pub validity_period_months: Option<u32>,
    #[serde(default)]
    pub species: SpeciesSet,
}

impl Skill {
    /// Validity period in months, treating a zero period the same as no period.
    pub fn validity_months(&self) -> Option<u32> {
        self.validity_period_months.filter(|months| *months > 0)
    }

    pub fn never_expires(&self) -> bool {
        self.validity_months().is_none()
    }
}

/// Sorted set of species a competency or claim applies to. Equality is exact set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesSet(BTreeSet<SpeciesId>);

impl SpeciesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, species: SpeciesId) -> bool {
        self.0.contains(&species)
    }

    pub fn iter(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SpeciesId> for SpeciesSet {
    fn from_iter<I: IntoIterator<Item = SpeciesId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompetencyLevel {
    Novice,
    Intermediate,
    Expert,
}

impl CompetencyLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Novice => "Novice",
            Self::Intermediate => "Intermediate",
            Self::Expert => "Expert",
        }
    }
}

impl fmt::Display for CompetencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CompetencyLevel {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "novice" => Ok(Self::Novice),
            "intermediate" => Ok(Self::Intermediate),
            "expert" => Ok(Self::Expert),
            _ => Err(EngineError::invalid(format!(
                "level must be Novice, Intermediate or Expert (found '{value}')"
            ))),
        }
    }
}

/// Who vouched for a competency. Internal and external evaluators are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Evaluator {
    Internal(UserId),
    External(String),
    None,
}

impl Evaluator {
    pub fn internal_id(&self) -> Option<UserId> {
        match self {
            Evaluator::Internal(id) => Some(*id),
            _ => None,
        }
    }
}

/// Record that produced (or last refreshed) a competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EvidenceOrigin {
    TrainingSession(SessionId),
    ExternalTraining(ExternalTrainingId),
}

/// Canonical competency row, unique per (user, skill, species-set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub id: CompetencyId,
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub level: CompetencyLevel,
    pub evaluation_date: DateTime<Utc>,
    pub evaluator: Evaluator,
    #[serde(default)]
    pub origin: Option<EvidenceOrigin>,
    #[serde(default)]
    pub species: SpeciesSet,
    /// Optimistic-lock version, bumped by the store on every update.
    #[serde(default)]
    pub version: u64,
}

impl Competency {
    pub fn matches_key(&self, user_id: UserId, skill_id: SkillId, species: &SpeciesSet) -> bool {
        self.user_id == user_id && self.skill_id == skill_id && &self.species == species
    }
}

/// Informal declaration that a user practised one or more skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPracticeEvent {
    pub id: PracticeEventId,
    pub user_id: UserId,
    pub practice_date: DateTime<Utc>,
    pub skills: BTreeSet<SkillId>,
    #[serde(default)]
    pub notes: String,
}

/// Normalised evidence of competence handed to the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub species: SpeciesSet,
    pub level: CompetencyLevel,
    pub observed_at: DateTime<Utc>,
    pub evaluator: Evaluator,
    pub source: EvidenceSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvidenceSource {
    SessionEvaluation {
        session_id: SessionId,
    },
    ExternalClaim {
        external_training_id: ExternalTrainingId,
        wants_to_be_tutor: bool,
        practice_date: Option<DateTime<Utc>>,
    },
    Administrative,
}

impl EvidenceSource {
    pub fn origin(&self) -> Option<EvidenceOrigin> {
        match self {
            EvidenceSource::SessionEvaluation { session_id } => {
                Some(EvidenceOrigin::TrainingSession(*session_id))
            }
            EvidenceSource::ExternalClaim {
                external_training_id,
                ..
            } => Some(EvidenceOrigin::ExternalTraining(*external_training_id)),
            EvidenceSource::Administrative => None,
        }
    }
}

/// Inbound result of a supervised training session for one attendee and skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionValidation {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub level: String,
    pub evaluator_user_id: UserId,
    #[serde(deserialize_with = "deserialize_instant")]
    pub evaluation_date: DateTime<Utc>,
    pub training_session_id: SessionId,
}

/// Inbound approval of an external training submission and its skill claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTrainingApproval {
    pub external_training_id: ExternalTrainingId,
    pub user_id: UserId,
    #[serde(default)]
    pub trainer_name: Option<String>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub training_date: DateTime<Utc>,
    pub claims: Vec<ExternalTrainingSkillClaim>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTrainingSkillClaim {
    pub skill_id: SkillId,
    pub level: String,
    #[serde(default)]
    pub species_ids: Vec<SpeciesId>,
    #[serde(default)]
    pub wants_to_be_tutor: bool,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub practice_date: Option<DateTime<Utc>>,
}

/// Inbound self-declaration of skill practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeDeclaration {
    pub user_id: UserId,
    pub skill_ids: Vec<SkillId>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub practice_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Administrative competency entry with an explicit species-set and evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyEntry {
    pub user_id: UserId,
    pub skill_id: SkillId,
    pub level: String,
    #[serde(default)]
    pub species_ids: Vec<SpeciesId>,
    #[serde(deserialize_with = "deserialize_instant")]
    pub evaluation_date: DateTime<Utc>,
    pub evaluator: Evaluator,
}

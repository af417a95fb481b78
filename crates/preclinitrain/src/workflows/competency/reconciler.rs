use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{Competency, Evidence, EvidenceSource, Skill, SkillPracticeEvent};
use super::repository::CompetencyStore;
use crate::workflows::error::EngineError;
use crate::workflows::ids::{CompetencyId, PracticeEventId};
use crate::workflows::store::RepositoryError;

pub const DEFAULT_RECONCILE_ATTEMPTS: u32 = 3;

const EXTERNAL_PRACTICE_NOTE: &str = "Practice declared from external training validation.";

static COMPETENCY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PRACTICE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_competency_id() -> CompetencyId {
    CompetencyId(COMPETENCY_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn next_practice_event_id() -> PracticeEventId {
    PracticeEventId(PRACTICE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Keeps generated ids above ids loaded from elsewhere.
pub(crate) fn reserve_competency_id(id: CompetencyId) {
    COMPETENCY_SEQUENCE.fetch_max(id.0 + 1, Ordering::Relaxed);
}

pub(crate) fn reserve_practice_event_id(id: PracticeEventId) {
    PRACTICE_SEQUENCE.fetch_max(id.0 + 1, Ordering::Relaxed);
}

/// Merges evidence into one canonical competency per (user, skill, species-set).
///
/// The read-compare-write step runs under the store's optimistic checks: a concurrent
/// insert of the same key or a stale version surfaces as a repository conflict and the
/// whole step is retried from a fresh read, up to `max_attempts` times.
pub struct CompetencyReconciler<S> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S> CompetencyReconciler<S>
where
    S: CompetencyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_RECONCILE_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn reconcile(&self, evidence: Evidence) -> Result<Competency, EngineError> {
        let skill = self
            .store
            .skill(evidence.skill_id)?
            .ok_or_else(|| EngineError::not_found("skill", evidence.skill_id))?;
        if !self.store.user_exists(evidence.user_id)? {
            return Err(EngineError::not_found("user", evidence.user_id));
        }

        let competency = self.upsert(&evidence)?;
        self.apply_side_effects(&evidence, &skill)?;
        Ok(competency)
    }

    fn upsert(&self, evidence: &Evidence) -> Result<Competency, EngineError> {
        for attempt in 1..=self.max_attempts {
            match self.try_upsert(evidence) {
                Ok(competency) => return Ok(competency),
                Err(RepositoryError::Conflict) => {
                    warn!(
                        user = %evidence.user_id,
                        skill = %evidence.skill_id,
                        attempt,
                        "competency changed concurrently; retrying reconciliation"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(EngineError::Conflict {
            user: evidence.user_id,
            skill: evidence.skill_id,
            attempts: self.max_attempts,
        })
    }

    fn try_upsert(&self, evidence: &Evidence) -> Result<Competency, RepositoryError> {
        let existing = self
            .store
            .for_user_skill(evidence.user_id, evidence.skill_id)?;

        let matching = existing.into_iter().find(|competency| {
            competency.matches_key(evidence.user_id, evidence.skill_id, &evidence.species)
        });

        match matching {
            Some(mut competency) => {
                competency.level = evidence.level;
                competency.evaluation_date = evidence.observed_at;
                competency.evaluator = evidence.evaluator.clone();
                if let Some(origin) = evidence.source.origin() {
                    competency.origin = Some(origin);
                }
                let updated = self.store.update(competency)?;
                debug!(
                    competency = %updated.id,
                    level = %updated.level,
                    "competency refreshed in place"
                );
                Ok(updated)
            }
            None => {
                let created = self.store.insert(Competency {
                    id: next_competency_id(),
                    user_id: evidence.user_id,
                    skill_id: evidence.skill_id,
                    level: evidence.level,
                    evaluation_date: evidence.observed_at,
                    evaluator: evidence.evaluator.clone(),
                    origin: evidence.source.origin(),
                    species: evidence.species.clone(),
                    version: 0,
                })?;
                info!(
                    competency = %created.id,
                    user = %created.user_id,
                    skill = %created.skill_id,
                    species = created.species.len(),
                    "competency created"
                );
                Ok(created)
            }
        }
    }

    fn apply_side_effects(&self, evidence: &Evidence, skill: &Skill) -> Result<(), EngineError> {
        let EvidenceSource::ExternalClaim {
            wants_to_be_tutor,
            practice_date,
            ..
        } = &evidence.source
        else {
            return Ok(());
        };

        if *wants_to_be_tutor && self.store.add_tutor(skill.id, evidence.user_id)? {
            info!(user = %evidence.user_id, skill = %skill.name, "tutor added from external claim");
        }

        if let Some(practiced_at) = practice_date {
            if self
                .store
                .has_practice_at(evidence.user_id, skill.id, *practiced_at)?
            {
                debug!(user = %evidence.user_id, skill = %skill.id, "practice already recorded");
            } else {
                self.store.record(SkillPracticeEvent {
                    id: next_practice_event_id(),
                    user_id: evidence.user_id,
                    practice_date: *practiced_at,
                    skills: BTreeSet::from([skill.id]),
                    notes: EXTERNAL_PRACTICE_NOTE.to_string(),
                })?;
            }
        }

        Ok(())
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::domain::{
    Competency, CompetencyEntry, CompetencyLevel, Evaluator, Evidence, EvidenceSource,
    ExternalTrainingApproval, PracticeDeclaration, SessionValidation, Skill, SkillPracticeEvent,
    SpeciesSet,
};
use super::reconciler::{next_practice_event_id, CompetencyReconciler};
use super::recycling::{RecyclingAssessment, RecyclingCalculator};
use super::repository::CompetencyStore;
use super::tutor::{TutorValidity, TutorValidityChecker};
use crate::access::{ensure_permitted, AccessPolicy, Permission, RequestContext};
use crate::workflows::error::EngineError;
use crate::workflows::ids::{CompetencyId, SkillId, UserId};

/// One competency in a user's recycling report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecyclingReportEntry {
    pub competency_id: CompetencyId,
    pub skill_id: SkillId,
    pub skill_name: String,
    pub level: CompetencyLevel,
    pub species: SpeciesSet,
    #[serde(flatten)]
    pub assessment: RecyclingAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecyclingReport {
    pub user_id: UserId,
    pub generated_at: DateTime<Utc>,
    /// Soonest deadline first; competencies that never expire come last.
    pub entries: Vec<RecyclingReportEntry>,
}

impl RecyclingReport {
    pub fn needing_recycling(&self) -> impl Iterator<Item = &RecyclingReportEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.assessment.needs_recycling)
    }
}

/// Result of checking one user against a list of required skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetencyCheck {
    pub user_id: UserId,
    pub valid: bool,
    pub details: Vec<String>,
}

/// Entry point for every competency write and the read-only views derived from them.
pub struct CompetencyService<S, A: ?Sized> {
    store: Arc<S>,
    policy: Arc<A>,
    reconciler: CompetencyReconciler<S>,
    recycling: RecyclingCalculator<S>,
    tutors: TutorValidityChecker<S>,
}

impl<S, A> CompetencyService<S, A>
where
    S: CompetencyStore + 'static,
    A: AccessPolicy + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, policy: Arc<A>) -> Self {
        Self {
            reconciler: CompetencyReconciler::new(store.clone()),
            recycling: RecyclingCalculator::new(store.clone()),
            tutors: TutorValidityChecker::new(store.clone()),
            store,
            policy,
        }
    }

    pub fn with_reconcile_attempts(mut self, attempts: u32) -> Self {
        self.reconciler = self.reconciler.with_max_attempts(attempts);
        self
    }

    /// Applies a supervised-session evaluation. The competency covers every species the
    /// skill applies to.
    pub fn validate_session(
        &self,
        context: &RequestContext,
        validation: SessionValidation,
    ) -> Result<Competency, EngineError> {
        ensure_permitted(
            self.policy.as_ref(),
            context,
            Permission::TrainingSessionValidate,
            None,
        )?;

        let level: CompetencyLevel = validation.level.parse()?;
        let skill = self.load_skill(validation.skill_id)?;
        self.ensure_user(validation.evaluator_user_id)?;

        self.reconciler.reconcile(Evidence {
            user_id: validation.user_id,
            skill_id: skill.id,
            species: skill.species.clone(),
            level,
            observed_at: validation.evaluation_date,
            evaluator: Evaluator::Internal(validation.evaluator_user_id),
            source: EvidenceSource::SessionEvaluation {
                session_id: validation.training_session_id,
            },
        })
    }

    /// Turns every claim of an approved external training into evidence, in claim order.
    ///
    /// Every claim's level and skill are checked before any claim is applied, so a malformed
    /// claim leaves the store untouched.
    pub fn approve_external_training(
        &self,
        context: &RequestContext,
        approval: ExternalTrainingApproval,
    ) -> Result<Vec<Competency>, EngineError> {
        ensure_permitted(
            self.policy.as_ref(),
            context,
            Permission::ExternalTrainingValidate,
            None,
        )?;

        let evaluator = match approval.trainer_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Evaluator::External(name.to_string()),
            _ => Evaluator::Internal(context.actor),
        };

        let levels = approval
            .claims
            .iter()
            .map(|claim| claim.level.parse::<CompetencyLevel>())
            .collect::<Result<Vec<_>, _>>()?;
        for claim in &approval.claims {
            self.load_skill(claim.skill_id)?;
        }
        self.ensure_user(approval.user_id)?;

        let mut competencies = Vec::with_capacity(approval.claims.len());
        for (claim, level) in approval.claims.into_iter().zip(levels) {
            let competency = self.reconciler.reconcile(Evidence {
                user_id: approval.user_id,
                skill_id: claim.skill_id,
                species: claim.species_ids.into_iter().collect(),
                level,
                observed_at: approval.training_date,
                evaluator: evaluator.clone(),
                source: EvidenceSource::ExternalClaim {
                    external_training_id: approval.external_training_id,
                    wants_to_be_tutor: claim.wants_to_be_tutor,
                    practice_date: claim.practice_date,
                },
            })?;
            competencies.push(competency);
        }

        info!(
            external_training = %approval.external_training_id,
            user = %approval.user_id,
            claims = competencies.len(),
            "external training approved"
        );
        Ok(competencies)
    }

    /// Records a practice declaration. Skills already declared for the same user and
    /// instant are skipped; `None` means nothing new was recorded.
    pub fn declare_practice(
        &self,
        context: &RequestContext,
        declaration: PracticeDeclaration,
    ) -> Result<Option<SkillPracticeEvent>, EngineError> {
        let permission = if declaration.user_id == context.actor {
            Permission::SelfDeclareSkillPractice
        } else {
            Permission::SkillPracticeManage
        };
        ensure_permitted(self.policy.as_ref(), context, permission, None)?;

        if declaration.skill_ids.is_empty() {
            return Err(EngineError::invalid(
                "a practice declaration needs at least one skill",
            ));
        }
        self.ensure_user(declaration.user_id)?;

        let mut fresh = BTreeSet::new();
        for skill_id in declaration.skill_ids {
            self.load_skill(skill_id)?;
            if self
                .store
                .has_practice_at(declaration.user_id, skill_id, declaration.practice_date)?
            {
                debug!(
                    user = %declaration.user_id,
                    skill = %skill_id,
                    "practice already declared for this date"
                );
            } else {
                fresh.insert(skill_id);
            }
        }

        if fresh.is_empty() {
            return Ok(None);
        }

        let event = self.store.record(SkillPracticeEvent {
            id: next_practice_event_id(),
            user_id: declaration.user_id,
            practice_date: declaration.practice_date,
            skills: fresh,
            notes: declaration.notes.unwrap_or_default(),
        })?;
        info!(
            user = %event.user_id,
            skills = event.skills.len(),
            "skill practice declared"
        );
        Ok(Some(event))
    }

    /// Administrative entry of a competency with an explicit species-set and evaluator.
    pub fn record_competency(
        &self,
        context: &RequestContext,
        entry: CompetencyEntry,
    ) -> Result<Competency, EngineError> {
        ensure_permitted(
            self.policy.as_ref(),
            context,
            Permission::CompetencyManage,
            None,
        )?;

        let level: CompetencyLevel = entry.level.parse()?;
        if let Evaluator::Internal(evaluator) = entry.evaluator {
            self.ensure_user(evaluator)?;
        }

        self.reconciler.reconcile(Evidence {
            user_id: entry.user_id,
            skill_id: entry.skill_id,
            species: entry.species_ids.into_iter().collect(),
            level,
            observed_at: entry.evaluation_date,
            evaluator: entry.evaluator,
            source: EvidenceSource::Administrative,
        })
    }

    pub fn recycling_report(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<RecyclingReport, EngineError> {
        self.ensure_user(user)?;

        let mut skills: BTreeMap<SkillId, Skill> = BTreeMap::new();
        let mut entries = Vec::new();
        for competency in self.store.for_user(user)? {
            if !skills.contains_key(&competency.skill_id) {
                let skill = self.load_skill(competency.skill_id)?;
                skills.insert(skill.id, skill);
            }
            let Some(skill) = skills.get(&competency.skill_id) else {
                continue;
            };

            let assessment = self.recycling.assess_with_skill(&competency, skill, now)?;
            entries.push(RecyclingReportEntry {
                competency_id: competency.id,
                skill_id: skill.id,
                skill_name: skill.name.clone(),
                level: competency.level,
                species: competency.species,
                assessment,
            });
        }

        entries.sort_by_key(|entry| {
            (
                entry.assessment.recycling_due_date.is_none(),
                entry.assessment.recycling_due_date,
                entry.competency_id,
            )
        });

        Ok(RecyclingReport {
            user_id: user,
            generated_at: now,
            entries,
        })
    }

    /// A user passes when every listed skill has at least one competency that does not
    /// need recycling at `now`.
    pub fn check_competency(
        &self,
        users: &[UserId],
        skill_ids: &[SkillId],
        now: DateTime<Utc>,
    ) -> Result<Vec<CompetencyCheck>, EngineError> {
        let mut skills: BTreeMap<SkillId, Option<Skill>> = BTreeMap::new();
        for skill_id in skill_ids {
            if !skills.contains_key(skill_id) {
                skills.insert(*skill_id, self.store.skill(*skill_id)?);
            }
        }

        let mut checks = Vec::with_capacity(users.len());
        for &user in users {
            if !self.store.user_exists(user)? {
                checks.push(CompetencyCheck {
                    user_id: user,
                    valid: false,
                    details: vec!["user not found".to_string()],
                });
                continue;
            }

            let mut details = Vec::new();
            for skill_id in skill_ids {
                let current = match skills.get(skill_id).and_then(Option::as_ref) {
                    Some(skill) => self.holds_current(user, skill, now)?,
                    None => false,
                };
                if !current {
                    let name = skills
                        .get(skill_id)
                        .and_then(Option::as_ref)
                        .map_or_else(|| format!("unknown skill {skill_id}"), |s| s.name.clone());
                    details.push(format!("not competent in {name}"));
                }
            }

            checks.push(CompetencyCheck {
                user_id: user,
                valid: details.is_empty(),
                details,
            });
        }
        Ok(checks)
    }

    pub fn tutor_validity(
        &self,
        tutor: UserId,
        skill: SkillId,
        as_of: DateTime<Utc>,
    ) -> Result<TutorValidity, EngineError> {
        self.tutors.is_valid_tutor(tutor, skill, as_of)
    }

    pub fn tutor_validity_all(
        &self,
        skill: SkillId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<TutorValidity>, EngineError> {
        self.tutors.check_all(skill, as_of)
    }

    pub fn competencies_for(&self, user: UserId) -> Result<Vec<Competency>, EngineError> {
        self.ensure_user(user)?;
        Ok(self.store.for_user(user)?)
    }

    fn holds_current(
        &self,
        user: UserId,
        skill: &Skill,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        for competency in self.store.for_user_skill(user, skill.id)? {
            if !self
                .recycling
                .assess_with_skill(&competency, skill, now)?
                .needs_recycling
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn load_skill(&self, skill_id: SkillId) -> Result<Skill, EngineError> {
        self.store
            .skill(skill_id)?
            .ok_or_else(|| EngineError::not_found("skill", skill_id))
    }

    fn ensure_user(&self, user: UserId) -> Result<(), EngineError> {
        if self.store.user_exists(user)? {
            Ok(())
        } else {
            Err(EngineError::not_found("user", user))
        }
    }
}

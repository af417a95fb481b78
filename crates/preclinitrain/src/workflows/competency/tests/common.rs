use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::access::{RequestContext, RoleBasedPolicy};
use crate::workflows::competency::{
    Competency, CompetencyLevel, CompetencyRepository, Evaluator, Evidence, EvidenceSource,
    PracticeLog, Skill, SkillCatalog, SkillPracticeEvent, SpeciesSet,
};
use crate::workflows::ids::{
    ExternalTrainingId, PracticeEventId, SessionId, SkillId, SpeciesId, UserId,
};
use crate::workflows::memory::InMemoryStore;
use crate::workflows::store::{RepositoryError, UserDirectory};

pub(super) const ADMIN: UserId = UserId(1);
pub(super) const VALIDATOR: UserId = UserId(2);
pub(super) const TRAINEE: UserId = UserId(3);
pub(super) const TUTOR: UserId = UserId(4);
pub(super) const MISSING_USER: UserId = UserId(99);

/// 12-month validity, applies to mice and rats.
pub(super) const GAVAGE: SkillId = SkillId(10);
/// No validity period.
pub(super) const HANDLING: SkillId = SkillId(11);
/// 24-month validity.
pub(super) const SURGERY: SkillId = SkillId(12);
pub(super) const MISSING_SKILL: SkillId = SkillId(404);

pub(super) const MOUSE: SpeciesId = SpeciesId(1);
pub(super) const RAT: SpeciesId = SpeciesId(2);

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
}

pub(super) fn evaluated_at() -> DateTime<Utc> {
    at(2023, 3, 1)
}

pub(super) fn species(ids: &[SpeciesId]) -> SpeciesSet {
    ids.iter().copied().collect()
}

pub(super) fn skill(id: SkillId, name: &str, months: Option<u32>, applies_to: &[SpeciesId]) -> Skill {
    Skill {
        id,
        name: name.to_string(),
        validity_period_months: months,
        species: species(applies_to),
    }
}

pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for user in [ADMIN, VALIDATOR, TRAINEE, TUTOR] {
        store.add_user(user).expect("user seeded");
    }
    store
        .add_skill(skill(GAVAGE, "Oral gavage", Some(12), &[MOUSE, RAT]))
        .expect("skill seeded");
    store
        .add_skill(skill(HANDLING, "Restraint and handling", None, &[MOUSE]))
        .expect("skill seeded");
    store
        .add_skill(skill(SURGERY, "Aseptic surgery", Some(24), &[RAT]))
        .expect("skill seeded");
    Arc::new(store)
}

pub(super) fn policy() -> Arc<RoleBasedPolicy> {
    let mut policy = RoleBasedPolicy::with_default_roles();
    policy
        .grant_admin(ADMIN)
        .assign_global(VALIDATOR, "Validator")
        .assign_global(TRAINEE, "User")
        .assign_global(TUTOR, "Tutor");
    Arc::new(policy)
}

pub(super) fn context(actor: UserId) -> RequestContext {
    RequestContext::new(actor)
}

pub(super) fn session_evidence(
    user: UserId,
    skill: SkillId,
    applies_to: &[SpeciesId],
    level: CompetencyLevel,
    observed_at: DateTime<Utc>,
) -> Evidence {
    Evidence {
        user_id: user,
        skill_id: skill,
        species: species(applies_to),
        level,
        observed_at,
        evaluator: Evaluator::Internal(TUTOR),
        source: EvidenceSource::SessionEvaluation {
            session_id: SessionId(7),
        },
    }
}

pub(super) fn external_evidence(
    user: UserId,
    skill: SkillId,
    wants_to_be_tutor: bool,
    practice_date: Option<DateTime<Utc>>,
) -> Evidence {
    Evidence {
        user_id: user,
        skill_id: skill,
        species: species(&[MOUSE]),
        level: CompetencyLevel::Intermediate,
        observed_at: evaluated_at(),
        evaluator: Evaluator::External("Dr. Okafor".to_string()),
        source: EvidenceSource::ExternalClaim {
            external_training_id: ExternalTrainingId(31),
            wants_to_be_tutor,
            practice_date,
        },
    }
}

pub(super) fn practice(
    store: &InMemoryStore,
    id: u64,
    user: UserId,
    skills: &[SkillId],
    practiced_at: DateTime<Utc>,
) {
    store
        .record(SkillPracticeEvent {
            id: PracticeEventId(id),
            user_id: user,
            practice_date: practiced_at,
            skills: skills.iter().copied().collect::<BTreeSet<_>>(),
            notes: String::new(),
        })
        .expect("practice recorded");
}

pub(super) fn days(value: f64) -> Duration {
    crate::workflows::time::fractional_days(value)
}

/// Store double that fails the next `n` competency writes with a conflict.
pub(super) struct ConflictingStore {
    inner: Arc<InMemoryStore>,
    conflicts: AtomicU32,
    pub(super) attempts: AtomicU32,
}

impl ConflictingStore {
    pub(super) fn new(inner: Arc<InMemoryStore>, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts: AtomicU32::new(conflicts),
            attempts: AtomicU32::new(0),
        }
    }

    fn injected_conflict(&self) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl UserDirectory for ConflictingStore {
    fn user_exists(&self, user: UserId) -> Result<bool, RepositoryError> {
        self.inner.user_exists(user)
    }
}

impl CompetencyRepository for ConflictingStore {
    fn for_user_skill(
        &self,
        user: UserId,
        skill: SkillId,
    ) -> Result<Vec<Competency>, RepositoryError> {
        self.inner.for_user_skill(user, skill)
    }

    fn for_user(&self, user: UserId) -> Result<Vec<Competency>, RepositoryError> {
        self.inner.for_user(user)
    }

    fn insert(&self, record: Competency) -> Result<Competency, RepositoryError> {
        if self.injected_conflict() {
            return Err(RepositoryError::Conflict);
        }
        self.inner.insert(record)
    }

    fn update(&self, record: Competency) -> Result<Competency, RepositoryError> {
        if self.injected_conflict() {
            return Err(RepositoryError::Conflict);
        }
        self.inner.update(record)
    }
}

impl SkillCatalog for ConflictingStore {
    fn skill(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError> {
        self.inner.skill(id)
    }

    fn tutors(&self, skill: SkillId) -> Result<BTreeSet<UserId>, RepositoryError> {
        self.inner.tutors(skill)
    }

    fn add_tutor(&self, skill: SkillId, user: UserId) -> Result<bool, RepositoryError> {
        self.inner.add_tutor(skill, user)
    }
}

impl PracticeLog for ConflictingStore {
    fn record(&self, event: SkillPracticeEvent) -> Result<SkillPracticeEvent, RepositoryError> {
        self.inner.record(event)
    }

    fn latest_practice(
        &self,
        user: UserId,
        skill: SkillId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        self.inner.latest_practice(user, skill)
    }

    fn has_practice_at(
        &self,
        user: UserId,
        skill: SkillId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.inner.has_practice_at(user, skill, at)
    }
}

//! In-process reference store implementing every repository trait, plus the JSON dataset
//! format used to seed it.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::competency::reconciler::{reserve_competency_id, reserve_practice_event_id};
use super::competency::{
    Competency, CompetencyRepository, PracticeLog, Skill, SkillCatalog, SkillPracticeEvent,
};
use super::continuous_training::service::reserve_attendance_id;
use super::continuous_training::{
    AttendanceRecord, ContinuousTrainingEvent, ContinuousTrainingRepository,
    UserContinuousTraining,
};
use super::ids::{AttendanceId, CompetencyId, EventId, SkillId, UserId};
use super::store::{RepositoryError, UserDirectory};
use crate::access::{RoleAssignment, RoleBasedPolicy};

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeSet<UserId>,
    skills: BTreeMap<SkillId, Skill>,
    tutors: BTreeMap<SkillId, BTreeSet<UserId>>,
    competencies: BTreeMap<CompetencyId, Competency>,
    practice: Vec<SkillPracticeEvent>,
    events: BTreeMap<EventId, ContinuousTrainingEvent>,
    attendances: BTreeMap<AttendanceId, UserContinuousTraining>,
}

/// Mutex-guarded store enforcing the same uniqueness and version checks a relational
/// backend would.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: Dataset) -> Result<Self, RepositoryError> {
        let store = Self::new();
        for user in dataset.users {
            store.add_user(user)?;
        }
        for skill in dataset.skills {
            store.add_skill(skill)?;
        }
        for tutor in dataset.tutors {
            store.add_tutor(tutor.skill_id, tutor.user_id)?;
        }
        for competency in dataset.competencies {
            store.insert(competency)?;
        }
        for event in dataset.practice_events {
            store.record(event)?;
        }
        for event in dataset.events {
            store.add_event(event)?;
        }
        for attendance in dataset.attendances {
            store.insert_attendance(attendance)?;
        }
        Ok(store)
    }

    pub fn add_user(&self, user: UserId) -> Result<(), RepositoryError> {
        self.state()?.users.insert(user);
        Ok(())
    }

    pub fn add_skill(&self, skill: Skill) -> Result<(), RepositoryError> {
        self.state()?.skills.insert(skill.id, skill);
        Ok(())
    }

    pub fn add_event(&self, event: ContinuousTrainingEvent) -> Result<(), RepositoryError> {
        self.state()?.events.insert(event.id, event);
        Ok(())
    }

    pub fn competency_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.state()?.competencies.len())
    }

    pub fn practice_events(&self, user: UserId) -> Result<Vec<SkillPracticeEvent>, RepositoryError> {
        Ok(self
            .state()?
            .practice
            .iter()
            .filter(|event| event.user_id == user)
            .cloned()
            .collect())
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl UserDirectory for InMemoryStore {
    fn user_exists(&self, user: UserId) -> Result<bool, RepositoryError> {
        Ok(self.state()?.users.contains(&user))
    }
}

impl CompetencyRepository for InMemoryStore {
    fn for_user_skill(
        &self,
        user: UserId,
        skill: SkillId,
    ) -> Result<Vec<Competency>, RepositoryError> {
        Ok(self
            .state()?
            .competencies
            .values()
            .filter(|competency| competency.user_id == user && competency.skill_id == skill)
            .cloned()
            .collect())
    }

    fn for_user(&self, user: UserId) -> Result<Vec<Competency>, RepositoryError> {
        Ok(self
            .state()?
            .competencies
            .values()
            .filter(|competency| competency.user_id == user)
            .cloned()
            .collect())
    }

    fn insert(&self, record: Competency) -> Result<Competency, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.competencies.contains_key(&record.id)
            || state.competencies.values().any(|existing| {
                existing.matches_key(record.user_id, record.skill_id, &record.species)
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        reserve_competency_id(record.id);
        state.competencies.insert(record.id, record.clone());
        Ok(record)
    }

    fn update(&self, mut record: Competency) -> Result<Competency, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .competencies
            .get(&record.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::Conflict);
        }
        let collides = state.competencies.values().any(|other| {
            other.id != record.id
                && other.matches_key(record.user_id, record.skill_id, &record.species)
        });
        if collides {
            return Err(RepositoryError::Conflict);
        }

        record.version += 1;
        state.competencies.insert(record.id, record.clone());
        Ok(record)
    }
}

impl SkillCatalog for InMemoryStore {
    fn skill(&self, id: SkillId) -> Result<Option<Skill>, RepositoryError> {
        Ok(self.state()?.skills.get(&id).cloned())
    }

    fn tutors(&self, skill: SkillId) -> Result<BTreeSet<UserId>, RepositoryError> {
        Ok(self
            .state()?
            .tutors
            .get(&skill)
            .cloned()
            .unwrap_or_default())
    }

    fn add_tutor(&self, skill: SkillId, user: UserId) -> Result<bool, RepositoryError> {
        Ok(self.state()?.tutors.entry(skill).or_default().insert(user))
    }
}

impl PracticeLog for InMemoryStore {
    fn record(&self, event: SkillPracticeEvent) -> Result<SkillPracticeEvent, RepositoryError> {
        let mut state = self.state()?;
        if state.practice.iter().any(|existing| existing.id == event.id) {
            return Err(RepositoryError::Conflict);
        }
        reserve_practice_event_id(event.id);
        state.practice.push(event.clone());
        Ok(event)
    }

    fn latest_practice(
        &self,
        user: UserId,
        skill: SkillId,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        Ok(self
            .state()?
            .practice
            .iter()
            .filter(|event| event.user_id == user && event.skills.contains(&skill))
            .map(|event| event.practice_date)
            .max())
    }

    fn has_practice_at(
        &self,
        user: UserId,
        skill: SkillId,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        Ok(self.state()?.practice.iter().any(|event| {
            event.user_id == user && event.practice_date == at && event.skills.contains(&skill)
        }))
    }
}

impl ContinuousTrainingRepository for InMemoryStore {
    fn event(&self, id: EventId) -> Result<Option<ContinuousTrainingEvent>, RepositoryError> {
        Ok(self.state()?.events.get(&id).cloned())
    }

    fn attendance(
        &self,
        id: AttendanceId,
    ) -> Result<Option<UserContinuousTraining>, RepositoryError> {
        Ok(self.state()?.attendances.get(&id).cloned())
    }

    fn attendances_for_user(&self, user: UserId) -> Result<Vec<AttendanceRecord>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .attendances
            .values()
            .filter(|attendance| attendance.user_id == user)
            .filter_map(|attendance| {
                state.events.get(&attendance.event_id).map(|event| AttendanceRecord {
                    attendance: attendance.clone(),
                    event: event.clone(),
                })
            })
            .collect())
    }

    fn insert_attendance(
        &self,
        record: UserContinuousTraining,
    ) -> Result<UserContinuousTraining, RepositoryError> {
        let mut state = self.state()?;
        let duplicate = state.attendances.contains_key(&record.id)
            || state.attendances.values().any(|existing| {
                existing.user_id == record.user_id && existing.event_id == record.event_id
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        reserve_attendance_id(record.id);
        state.attendances.insert(record.id, record.clone());
        Ok(record)
    }

    fn update_attendance(
        &self,
        record: UserContinuousTraining,
    ) -> Result<UserContinuousTraining, RepositoryError> {
        let mut state = self.state()?;
        match state.attendances.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(record)
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TutorAssignment {
    pub skill_id: SkillId,
    pub user_id: UserId,
}

/// Role data shipped alongside a dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessDataset {
    #[serde(default)]
    pub administrators: Vec<UserId>,
    #[serde(default)]
    pub assignments: Vec<RoleAssignment>,
}

impl AccessDataset {
    /// Stock roles plus the dataset's administrators and assignments.
    pub fn policy(&self) -> RoleBasedPolicy {
        let mut policy = RoleBasedPolicy::with_default_roles();
        for admin in &self.administrators {
            policy.grant_admin(*admin);
        }
        for assignment in &self.assignments {
            policy.assign(assignment.clone());
        }
        policy
    }
}

/// Serialized snapshot of everything the engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub users: Vec<UserId>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub tutors: Vec<TutorAssignment>,
    #[serde(default)]
    pub competencies: Vec<Competency>,
    #[serde(default)]
    pub practice_events: Vec<SkillPracticeEvent>,
    #[serde(default)]
    pub events: Vec<ContinuousTrainingEvent>,
    #[serde(default)]
    pub attendances: Vec<UserContinuousTraining>,
    #[serde(default)]
    pub access: AccessDataset,
}

impl Dataset {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

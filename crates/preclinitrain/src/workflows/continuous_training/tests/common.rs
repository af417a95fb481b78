use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::access::{RequestContext, RoleBasedPolicy};
use crate::workflows::continuous_training::{
    AttendanceRecord, AttendanceStatus, ContinuousTrainingEvent, ContinuousTrainingRepository,
    TrainingModality, UserContinuousTraining,
};
use crate::workflows::ids::{AttendanceId, EventId, FacilityId, UserId};
use crate::workflows::memory::InMemoryStore;
use crate::workflows::time::average_years;

pub(super) const ADMIN: UserId = UserId(1);
pub(super) const VALIDATOR: UserId = UserId(2);
pub(super) const LEARNER: UserId = UserId(3);
pub(super) const FACILITY_VALIDATOR: UserId = UserId(5);
pub(super) const MISSING_USER: UserId = UserId(99);

pub(super) const NORTH_WING: FacilityId = FacilityId(1);
pub(super) const SOUTH_WING: FacilityId = FacilityId(2);

pub(super) const SEMINAR: EventId = EventId(20);
pub(super) const WEBINAR: EventId = EventId(21);
pub(super) const NORTH_WORKSHOP: EventId = EventId(22);

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn years_ago(years: f64) -> DateTime<Utc> {
    now() - average_years(years)
}

pub(super) fn event(
    id: EventId,
    modality: TrainingModality,
    event_date: DateTime<Utc>,
    duration_hours: f64,
) -> ContinuousTrainingEvent {
    ContinuousTrainingEvent {
        id,
        title: format!("Event {id}"),
        modality,
        event_date,
        duration_hours,
        facility_id: None,
    }
}

pub(super) fn record(
    id: u64,
    status: AttendanceStatus,
    hours: Option<f64>,
    event: ContinuousTrainingEvent,
) -> AttendanceRecord {
    AttendanceRecord {
        attendance: UserContinuousTraining {
            id: AttendanceId(id),
            user_id: LEARNER,
            event_id: event.id,
            status,
            validated_hours: hours,
            validated_by: None,
            validation_date: None,
        },
        event,
    }
}

pub(super) fn approved(
    id: u64,
    modality: TrainingModality,
    event_date: DateTime<Utc>,
    hours: f64,
) -> AttendanceRecord {
    record(
        id,
        AttendanceStatus::Approved,
        Some(hours),
        event(EventId(id), modality, event_date, hours),
    )
}

pub(super) fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    for user in [ADMIN, VALIDATOR, LEARNER, FACILITY_VALIDATOR] {
        store.add_user(user).expect("user seeded");
    }
    store
        .add_event(event(SEMINAR, TrainingModality::Presential, years_ago(3.0), 10.0))
        .expect("event seeded");
    store
        .add_event(event(WEBINAR, TrainingModality::Online, years_ago(1.0), 5.0))
        .expect("event seeded");
    let mut workshop = event(
        NORTH_WORKSHOP,
        TrainingModality::Presential,
        years_ago(0.5),
        7.0,
    );
    workshop.facility_id = Some(NORTH_WING);
    store.add_event(workshop).expect("event seeded");
    Arc::new(store)
}

/// Stores the records' events and attendances.
pub(super) fn seed_records(store: &InMemoryStore, records: &[AttendanceRecord]) {
    for record in records {
        store.add_event(record.event.clone()).expect("event seeded");
        store
            .insert_attendance(record.attendance.clone())
            .expect("attendance seeded");
    }
}

pub(super) fn policy() -> Arc<RoleBasedPolicy> {
    let mut policy = RoleBasedPolicy::with_default_roles();
    policy
        .grant_admin(ADMIN)
        .assign_global(VALIDATOR, "Validator")
        .assign_global(LEARNER, "User")
        .assign_in_facility(FACILITY_VALIDATOR, "Validator", NORTH_WING, true);
    Arc::new(policy)
}

pub(super) fn context(actor: UserId) -> RequestContext {
    RequestContext::new(actor)
}

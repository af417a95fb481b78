//! Integration coverage for continuing-education intake, validation and compliance.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use preclinitrain::access::{RequestContext, RoleBasedPolicy};
    use preclinitrain::workflows::continuous_training::ContinuousTrainingService;
    use preclinitrain::workflows::memory::{Dataset, InMemoryStore};
    use preclinitrain::workflows::UserId;

    pub const VALIDATOR: UserId = UserId(7);
    pub const LEARNER: UserId = UserId(8);

    const DATASET: &str = r#"{
        "users": [7, 8],
        "events": [
            {"id": 1, "title": "Refinement in rodent surgery", "modality": "Presential",
             "event_date": "2021-06-15T09:00:00Z", "duration_hours": 10.0},
            {"id": 2, "title": "3Rs webinar", "modality": "Online",
             "event_date": "2023-06-15", "duration_hours": 5.0},
            {"id": 3, "title": "Legacy course", "modality": "Presential",
             "event_date": "2016-01-10", "duration_hours": 21.0}
        ],
        "attendances": [
            {"id": 9001, "user_id": 8, "event_id": 3, "status": "Approved", "validated_hours": 21.0}
        ],
        "access": {
            "assignments": [
                {"user": 7, "role": "Validator", "approved": true},
                {"user": 8, "role": "User", "approved": true}
            ]
        }
    }"#;

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0)
            .single()
            .expect("valid instant")
    }

    pub fn context(actor: UserId) -> RequestContext {
        RequestContext::new(actor)
    }

    pub fn service() -> ContinuousTrainingService<InMemoryStore, RoleBasedPolicy> {
        let dataset = Dataset::from_json(DATASET).expect("dataset parses");
        let policy = Arc::new(dataset.access.policy());
        let store = Arc::new(InMemoryStore::from_dataset(dataset).expect("dataset loads"));
        ContinuousTrainingService::new(store, policy)
    }
}

use common::*;
use preclinitrain::workflows::continuous_training::{
    AttendanceSubmission, AttendanceValidation, REQUIRED_HOURS,
};
use preclinitrain::workflows::EventId;

#[test]
fn validated_attendance_feeds_the_compliance_snapshot() {
    let service = service();

    let before = service.snapshot(LEARNER, now()).expect("snapshot");
    assert_eq!(before.total_hours_6y, 0.0, "the 2016 course is outside the window");
    assert_eq!(before.per_year_hours.len(), 6);

    for (event_id, hours) in [(EventId(1), None), (EventId(2), Some(5.0))] {
        let attendance = service
            .submit_attendance(
                &context(LEARNER),
                AttendanceSubmission {
                    user_id: LEARNER,
                    event_id,
                },
            )
            .expect("submission");
        service
            .validate_attendance(
                &context(VALIDATOR),
                AttendanceValidation {
                    user_continuous_training_id: attendance.id,
                    validated_hours: hours,
                    status: "Approved".to_string(),
                },
                now(),
            )
            .expect("validation");
    }

    let after = service.snapshot(LEARNER, now()).expect("snapshot");
    assert_eq!(after.total_hours_6y, 15.0);
    assert_eq!(after.live_hours_6y, 10.0);
    assert_eq!(after.online_hours_6y, 5.0);
    assert_eq!(after.required_hours, REQUIRED_HOURS);
    assert!(!after.is_compliant);
    assert!(after.is_live_compliant);
    assert_eq!(after.per_year_hours[&2021], 10.0);
    assert_eq!(after.per_year_hours[&2023], 5.0);

    let json = serde_json::to_value(&after).expect("snapshot serializes");
    assert_eq!(json["total_hours_6y"], 15.0);
    assert_eq!(json["per_year_hours"]["2021"], 10.0);
}

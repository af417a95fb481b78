use std::sync::Arc;

use super::common::*;
use crate::access::{Permission, RoleBasedPolicy};
use crate::workflows::competency::{
    CompetencyEntry, CompetencyLevel, CompetencyRepository, CompetencyService, Evaluator,
    EvidenceOrigin, ExternalTrainingApproval, ExternalTrainingSkillClaim, PracticeDeclaration,
    RecyclingState, SessionValidation, SkillCatalog,
};
use crate::workflows::error::EngineError;
use crate::workflows::ids::{ExternalTrainingId, SessionId, UserId};
use crate::workflows::memory::InMemoryStore;

fn service() -> (
    Arc<InMemoryStore>,
    CompetencyService<InMemoryStore, RoleBasedPolicy>,
) {
    let store = seeded_store();
    let service = CompetencyService::new(store.clone(), policy());
    (store, service)
}

fn session(user: UserId, level: &str) -> SessionValidation {
    SessionValidation {
        user_id: user,
        skill_id: GAVAGE,
        level: level.to_string(),
        evaluator_user_id: TUTOR,
        evaluation_date: evaluated_at(),
        training_session_id: SessionId(55),
    }
}

fn claim(level: &str) -> ExternalTrainingSkillClaim {
    ExternalTrainingSkillClaim {
        skill_id: SURGERY,
        level: level.to_string(),
        species_ids: vec![RAT],
        wants_to_be_tutor: true,
        practice_date: Some(at(2023, 1, 20)),
    }
}

fn approval(trainer: Option<&str>, claims: Vec<ExternalTrainingSkillClaim>) -> ExternalTrainingApproval {
    ExternalTrainingApproval {
        external_training_id: ExternalTrainingId(9),
        user_id: TRAINEE,
        trainer_name: trainer.map(str::to_string),
        training_date: at(2023, 2, 1),
        claims,
    }
}

#[test]
fn session_validation_covers_the_skill_species() {
    let (_, service) = service();

    let competency = service
        .validate_session(&context(TUTOR), session(TRAINEE, "intermediate"))
        .expect("tutor may validate sessions");

    assert_eq!(competency.species, species(&[MOUSE, RAT]));
    assert_eq!(competency.level, CompetencyLevel::Intermediate);
    assert_eq!(competency.evaluator, Evaluator::Internal(TUTOR));
    assert_eq!(
        competency.origin,
        Some(EvidenceOrigin::TrainingSession(SessionId(55)))
    );
}

#[test]
fn session_validation_requires_permission() {
    let (store, service) = service();

    match service.validate_session(&context(TRAINEE), session(TRAINEE, "Novice")) {
        Err(EngineError::PermissionDenied { user, permission }) => {
            assert_eq!(user, TRAINEE);
            assert_eq!(permission, Permission::TrainingSessionValidate);
        }
        other => panic!("expected permission denied, got {other:?}"),
    }
    assert_eq!(store.competency_count().unwrap(), 0);
}

#[test]
fn session_validation_rejects_bad_levels_and_missing_evaluators() {
    let (store, service) = service();

    assert!(matches!(
        service.validate_session(&context(VALIDATOR), session(TRAINEE, "Guru")),
        Err(EngineError::InvalidArgument(_))
    ));

    let mut orphan = session(TRAINEE, "Novice");
    orphan.evaluator_user_id = MISSING_USER;
    assert!(matches!(
        service.validate_session(&context(VALIDATOR), orphan),
        Err(EngineError::NotFound { entity: "user", .. })
    ));
    assert_eq!(store.competency_count().unwrap(), 0);
}

#[test]
fn external_approval_credits_the_trainer_and_applies_side_effects() {
    let (store, service) = service();

    let competencies = service
        .approve_external_training(
            &context(VALIDATOR),
            approval(Some("  Dr. Lindqvist "), vec![claim("Expert")]),
        )
        .expect("approval succeeds");

    assert_eq!(competencies.len(), 1);
    let competency = &competencies[0];
    assert_eq!(competency.evaluator, Evaluator::External("Dr. Lindqvist".to_string()));
    assert_eq!(competency.evaluation_date, at(2023, 2, 1));
    assert_eq!(competency.species, species(&[RAT]));
    assert!(store.tutors(SURGERY).unwrap().contains(&TRAINEE));
    assert_eq!(store.practice_events(TRAINEE).unwrap().len(), 1);
}

#[test]
fn external_approval_without_trainer_credits_the_approver() {
    let (_, service) = service();

    let competencies = service
        .approve_external_training(&context(VALIDATOR), approval(Some("   "), vec![claim("Novice")]))
        .expect("approval succeeds");

    assert_eq!(competencies[0].evaluator, Evaluator::Internal(VALIDATOR));
}

#[test]
fn malformed_claims_abort_the_whole_approval() {
    let (store, service) = service();

    let result = service.approve_external_training(
        &context(VALIDATOR),
        approval(None, vec![claim("Novice"), claim("Wizard")]),
    );

    assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    assert_eq!(store.competency_count().unwrap(), 0);
    assert!(store.tutors(SURGERY).unwrap().is_empty());
}

#[test]
fn an_unknown_claim_skill_aborts_the_whole_approval() {
    let (store, service) = service();
    let mut unknown = claim("Novice");
    unknown.skill_id = MISSING_SKILL;

    let result = service.approve_external_training(
        &context(VALIDATOR),
        approval(None, vec![claim("Expert"), unknown]),
    );

    assert!(matches!(
        result,
        Err(EngineError::NotFound { entity: "skill", .. })
    ));
    assert_eq!(store.competency_count().unwrap(), 0);
    assert!(store.tutors(SURGERY).unwrap().is_empty());
    assert!(store.practice_events(TRAINEE).unwrap().is_empty());
}

#[test]
fn approval_for_an_unknown_user_writes_nothing() {
    let (store, service) = service();
    let mut request = approval(None, vec![claim("Expert")]);
    request.user_id = MISSING_USER;

    let result = service.approve_external_training(&context(VALIDATOR), request);

    assert!(matches!(
        result,
        Err(EngineError::NotFound { entity: "user", .. })
    ));
    assert_eq!(store.competency_count().unwrap(), 0);
    assert!(store.tutors(SURGERY).unwrap().is_empty());
}

#[test]
fn competencies_are_listed_per_user() {
    let (_, service) = service();
    service
        .validate_session(&context(TUTOR), session(TRAINEE, "novice"))
        .expect("session applied");
    service
        .approve_external_training(&context(VALIDATOR), approval(None, vec![claim("Expert")]))
        .expect("claim applied");

    let listed = service.competencies_for(TRAINEE).expect("trainee exists");
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|competency| competency.user_id == TRAINEE));

    let err = service
        .competencies_for(MISSING_USER)
        .expect_err("unknown users are reported");
    assert!(matches!(err, EngineError::NotFound { entity: "user", .. }));
}

#[test]
fn practice_declarations_skip_skills_already_declared_that_day() {
    let (store, service) = service();
    let declaration = PracticeDeclaration {
        user_id: TRAINEE,
        skill_ids: vec![GAVAGE],
        practice_date: at(2024, 4, 2),
        notes: Some("Weekly dosing study".to_string()),
    };

    let first = service
        .declare_practice(&context(TRAINEE), declaration.clone())
        .expect("self declaration allowed")
        .expect("new practice recorded");
    assert_eq!(first.notes, "Weekly dosing study");

    let mut widened = declaration;
    widened.skill_ids.push(SURGERY);
    let second = service
        .declare_practice(&context(TRAINEE), widened.clone())
        .expect("declaration accepted")
        .expect("surgery is new");
    assert_eq!(second.skills.len(), 1);
    assert!(second.skills.contains(&SURGERY));

    assert!(service
        .declare_practice(&context(TRAINEE), widened)
        .expect("declaration accepted")
        .is_none());
    assert_eq!(store.practice_events(TRAINEE).unwrap().len(), 2);
}

#[test]
fn practice_declarations_validate_their_input() {
    let (_, service) = service();
    let base = PracticeDeclaration {
        user_id: TRAINEE,
        skill_ids: Vec::new(),
        practice_date: at(2024, 4, 2),
        notes: None,
    };

    assert!(matches!(
        service.declare_practice(&context(TRAINEE), base.clone()),
        Err(EngineError::InvalidArgument(_))
    ));

    let unknown = PracticeDeclaration {
        skill_ids: vec![MISSING_SKILL],
        ..base.clone()
    };
    assert!(matches!(
        service.declare_practice(&context(TRAINEE), unknown),
        Err(EngineError::NotFound { entity: "skill", .. })
    ));

    let on_behalf = PracticeDeclaration {
        user_id: TUTOR,
        skill_ids: vec![GAVAGE],
        ..base
    };
    assert!(matches!(
        service.declare_practice(&context(TRAINEE), on_behalf),
        Err(EngineError::PermissionDenied {
            permission: Permission::SkillPracticeManage,
            ..
        })
    ));
}

#[test]
fn administrative_entries_need_competency_manage() {
    let (store, service) = service();
    let entry = CompetencyEntry {
        user_id: TRAINEE,
        skill_id: HANDLING,
        level: "Expert".to_string(),
        species_ids: vec![MOUSE],
        evaluation_date: at(2022, 6, 1),
        evaluator: Evaluator::External("Animal welfare body".to_string()),
    };

    assert!(matches!(
        service.record_competency(&context(VALIDATOR), entry.clone()),
        Err(EngineError::PermissionDenied { .. })
    ));

    let competency = service
        .record_competency(&context(ADMIN), entry)
        .expect("admin may record");
    assert_eq!(competency.origin, None);
    assert_eq!(store.for_user(TRAINEE).unwrap().len(), 1);
}

#[test]
fn recycling_report_orders_by_due_date_with_permanent_skills_last() {
    let (_, service) = service();
    let admin = context(ADMIN);
    for (skill_id, year) in [(SURGERY, 2023), (HANDLING, 2021), (GAVAGE, 2023)] {
        service
            .record_competency(
                &admin,
                CompetencyEntry {
                    user_id: TRAINEE,
                    skill_id,
                    level: "Novice".to_string(),
                    species_ids: vec![MOUSE],
                    evaluation_date: at(year, 1, 1),
                    evaluator: Evaluator::Internal(TUTOR),
                },
            )
            .expect("entry recorded");
    }

    let report = service
        .recycling_report(TRAINEE, at(2024, 6, 1))
        .expect("report builds");

    let order: Vec<_> = report.entries.iter().map(|entry| entry.skill_id).collect();
    assert_eq!(order, vec![GAVAGE, SURGERY, HANDLING]);
    assert_eq!(report.entries[0].assessment.state, RecyclingState::Expired);
    assert_eq!(report.entries[2].assessment.state, RecyclingState::NeverExpires);
    assert_eq!(report.needing_recycling().count(), 1);
}

#[test]
fn competency_check_lists_failing_skills() {
    let (_, service) = service();
    service
        .validate_session(&context(TUTOR), session(TRAINEE, "Expert"))
        .expect("session validated");

    let checks = service
        .check_competency(
            &[TRAINEE, TUTOR, MISSING_USER],
            &[GAVAGE, MISSING_SKILL],
            at(2023, 6, 1),
        )
        .expect("check runs");

    assert_eq!(checks.len(), 3);
    assert!(!checks[0].valid);
    assert_eq!(checks[0].details, vec!["not competent in unknown skill 404".to_string()]);
    assert_eq!(
        checks[1].details,
        vec![
            "not competent in Oral gavage".to_string(),
            "not competent in unknown skill 404".to_string()
        ]
    );
    assert_eq!(checks[2].details, vec!["user not found".to_string()]);

    let passing = service
        .check_competency(&[TRAINEE], &[GAVAGE], at(2023, 6, 1))
        .expect("check runs");
    assert!(passing[0].valid);
    assert!(passing[0].details.is_empty());

    let lapsed = service
        .check_competency(&[TRAINEE], &[GAVAGE], at(2025, 6, 1))
        .expect("check runs");
    assert!(!lapsed[0].valid);
}

#[test]
fn tutor_views_delegate_to_the_checker() {
    let (store, service) = service();
    store.add_tutor(GAVAGE, TUTOR).expect("tutor added");

    let single = service
        .tutor_validity(TUTOR, GAVAGE, at(2024, 1, 1))
        .expect("single check");
    assert_eq!(single.reason, "no validation record found");

    let all = service
        .tutor_validity_all(GAVAGE, at(2024, 1, 1))
        .expect("bulk check");
    assert_eq!(all.len(), 1);
}

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use preclinitrain::access::{RequestContext, RoleAssignment};
use preclinitrain::error::AppError;
use preclinitrain::workflows::competency::{
    Competency, CompetencyLevel, Evaluator, EvidenceOrigin, ExternalTrainingApproval,
    ExternalTrainingSkillClaim, PracticeDeclaration, SessionValidation, Skill, SkillPracticeEvent,
    DEFAULT_RECONCILE_ATTEMPTS,
};
use preclinitrain::workflows::continuous_training::{
    AttendanceStatus, AttendanceSubmission, AttendanceValidation, ContinuousTrainingEvent,
    TrainingModality, UserContinuousTraining,
};
use preclinitrain::workflows::memory::{AccessDataset, Dataset, TutorAssignment};
use preclinitrain::workflows::time::{average_months, average_years};
use preclinitrain::workflows::{
    AttendanceId, CompetencyId, EventId, ExternalTrainingId, PracticeEventId, SessionId, SkillId,
    SpeciesId, UserId,
};

use crate::infra::Engine;

pub(crate) const DEMO_ADMIN: UserId = UserId(1);
pub(crate) const DEMO_VALIDATOR: UserId = UserId(2);
pub(crate) const DEMO_TUTOR: UserId = UserId(3);
pub(crate) const DEMO_LEARNER: UserId = UserId(4);

/// Oral gavage, 12-month validity.
pub(crate) const DEMO_SKILL: SkillId = SkillId(1);
const HANDLING: SkillId = SkillId(2);
const SURGERY: SkillId = SkillId(3);

const MOUSE: SpeciesId = SpeciesId(1);
const RAT: SpeciesId = SpeciesId(2);

const ETHICS_SEMINAR: EventId = EventId(1);
const REFINEMENT_WEBINAR: EventId = EventId(2);
const IMAGING_WORKSHOP: EventId = EventId(3);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference instant for the demo (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant_arg)]
    pub(crate) as_of: Option<DateTime<Utc>>,
}

/// Small laboratory roster with records placed relative to `now`.
pub(crate) fn demo_dataset(now: DateTime<Utc>) -> Dataset {
    let skill = |id, name: &str, months, species: &[SpeciesId]| Skill {
        id,
        name: name.to_string(),
        validity_period_months: months,
        species: species.iter().copied().collect(),
    };
    let event = |id, title: &str, modality, event_date, duration_hours| ContinuousTrainingEvent {
        id,
        title: title.to_string(),
        modality,
        event_date,
        duration_hours,
        facility_id: None,
    };

    Dataset {
        users: vec![DEMO_ADMIN, DEMO_VALIDATOR, DEMO_TUTOR, DEMO_LEARNER],
        skills: vec![
            skill(DEMO_SKILL, "Oral gavage", Some(12), &[MOUSE, RAT]),
            skill(HANDLING, "Restraint and handling", None, &[MOUSE]),
            skill(SURGERY, "Aseptic surgery", Some(24), &[RAT]),
        ],
        tutors: vec![TutorAssignment {
            skill_id: DEMO_SKILL,
            user_id: DEMO_TUTOR,
        }],
        competencies: vec![
            Competency {
                id: CompetencyId(1),
                user_id: DEMO_TUTOR,
                skill_id: DEMO_SKILL,
                level: CompetencyLevel::Expert,
                evaluation_date: now - Duration::days(60),
                evaluator: Evaluator::Internal(DEMO_VALIDATOR),
                origin: Some(EvidenceOrigin::TrainingSession(SessionId(1))),
                species: [MOUSE, RAT].into_iter().collect(),
                version: 0,
            },
            Competency {
                id: CompetencyId(2),
                user_id: DEMO_LEARNER,
                skill_id: DEMO_SKILL,
                level: CompetencyLevel::Novice,
                evaluation_date: now - average_months(13),
                evaluator: Evaluator::Internal(DEMO_TUTOR),
                origin: Some(EvidenceOrigin::TrainingSession(SessionId(2))),
                species: [MOUSE].into_iter().collect(),
                version: 0,
            },
            Competency {
                id: CompetencyId(3),
                user_id: DEMO_LEARNER,
                skill_id: HANDLING,
                level: CompetencyLevel::Intermediate,
                evaluation_date: now - average_years(4.0),
                evaluator: Evaluator::External("Regional training centre".to_string()),
                origin: None,
                species: [MOUSE].into_iter().collect(),
                version: 0,
            },
        ],
        practice_events: vec![SkillPracticeEvent {
            id: PracticeEventId(1),
            user_id: DEMO_TUTOR,
            practice_date: now - Duration::days(20),
            skills: BTreeSet::from([DEMO_SKILL]),
            notes: "Dosing study, cohort B".to_string(),
        }],
        events: vec![
            event(
                ETHICS_SEMINAR,
                "Ethics committee seminar",
                TrainingModality::Presential,
                now - average_years(3.0),
                10.0,
            ),
            event(
                REFINEMENT_WEBINAR,
                "Refinement webinar",
                TrainingModality::Online,
                now - average_years(1.0),
                5.0,
            ),
            event(
                IMAGING_WORKSHOP,
                "In vivo imaging workshop",
                TrainingModality::Presential,
                now - Duration::days(30),
                7.0,
            ),
        ],
        attendances: vec![
            UserContinuousTraining {
                id: AttendanceId(1),
                user_id: DEMO_LEARNER,
                event_id: ETHICS_SEMINAR,
                status: AttendanceStatus::Approved,
                validated_hours: Some(10.0),
                validated_by: Some(DEMO_VALIDATOR),
                validation_date: Some(now - average_years(3.0)),
            },
            UserContinuousTraining {
                id: AttendanceId(2),
                user_id: DEMO_LEARNER,
                event_id: REFINEMENT_WEBINAR,
                status: AttendanceStatus::Approved,
                validated_hours: Some(5.0),
                validated_by: Some(DEMO_VALIDATOR),
                validation_date: Some(now - average_years(1.0)),
            },
        ],
        access: AccessDataset {
            administrators: vec![DEMO_ADMIN],
            assignments: vec![
                global(DEMO_VALIDATOR, "Validator"),
                global(DEMO_TUTOR, "Tutor"),
                global(DEMO_LEARNER, "User"),
            ],
        },
    }
}

fn global(user: UserId, role: &str) -> RoleAssignment {
    RoleAssignment {
        user,
        role: role.to_string(),
        facility: None,
        approved: true,
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let now = args.as_of.unwrap_or_else(Utc::now);
    let engine = Engine::from_dataset(demo_dataset(now), DEFAULT_RECONCILE_ATTEMPTS)?;

    println!("Competency and continuing-education demo (as of {now})");

    let learner = RequestContext::new(DEMO_LEARNER);
    let tutor = RequestContext::new(DEMO_TUTOR);
    let validator = RequestContext::new(DEMO_VALIDATOR);

    println!("\nEvidence intake");
    let refreshed = engine.competencies.validate_session(
        &tutor,
        SessionValidation {
            user_id: DEMO_LEARNER,
            skill_id: SURGERY,
            level: "Novice".to_string(),
            evaluator_user_id: DEMO_TUTOR,
            evaluation_date: now - Duration::days(7),
            training_session_id: SessionId(10),
        },
    )?;
    println!(
        "- session validated: competency {} ({}, {} species)",
        refreshed.id,
        refreshed.level,
        refreshed.species.len()
    );

    let approved = engine.competencies.approve_external_training(
        &validator,
        ExternalTrainingApproval {
            external_training_id: ExternalTrainingId(1),
            user_id: DEMO_LEARNER,
            trainer_name: Some("Dr. Amsel".to_string()),
            training_date: now - Duration::days(14),
            claims: vec![ExternalTrainingSkillClaim {
                skill_id: DEMO_SKILL,
                level: "Intermediate".to_string(),
                species_ids: vec![MOUSE],
                wants_to_be_tutor: true,
                practice_date: Some(now - Duration::days(15)),
            }],
        },
    )?;
    for competency in &approved {
        println!(
            "- external claim merged into competency {} (version {})",
            competency.id, competency.version
        );
    }

    match engine.competencies.declare_practice(
        &learner,
        PracticeDeclaration {
            user_id: DEMO_LEARNER,
            skill_ids: vec![HANDLING, SURGERY],
            practice_date: now - Duration::days(2),
            notes: Some("Weekly colony check".to_string()),
        },
    )? {
        Some(event) => println!("- practice declared for {} skill(s)", event.skills.len()),
        None => println!("- practice already on record"),
    }

    println!("\nRecycling report for user {DEMO_LEARNER}");
    let report = engine.competencies.recycling_report(DEMO_LEARNER, now)?;
    for entry in &report.entries {
        let due = entry
            .assessment
            .recycling_due_date
            .map(|due| due.date_naive().to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  - {} [{}]: {:?}, due {}",
            entry.skill_name, entry.level, entry.assessment.state, due
        );
    }

    println!("\nTutor validity for skill {DEMO_SKILL}");
    for result in engine.competencies.tutor_validity_all(DEMO_SKILL, now)? {
        println!("  - tutor {}: {}", result.tutor_id, result.reason);
    }

    println!("\nContinuing education");
    let attendance = engine.training.submit_attendance(
        &learner,
        AttendanceSubmission {
            user_id: DEMO_LEARNER,
            event_id: IMAGING_WORKSHOP,
        },
    )?;
    let validated = engine.training.validate_attendance(
        &validator,
        AttendanceValidation {
            user_continuous_training_id: attendance.id,
            validated_hours: None,
            status: "Approved".to_string(),
        },
        now,
    )?;
    println!(
        "- attendance {} approved for {:.1}h",
        validated.id,
        validated.validated_hours.unwrap_or_default()
    );

    let snapshot = engine.training.snapshot(DEMO_LEARNER, now)?;
    println!(
        "- {:.1}h over six years ({:.1}h live, {:.1}h online) of {:.0}h required",
        snapshot.total_hours_6y,
        snapshot.live_hours_6y,
        snapshot.online_hours_6y,
        snapshot.required_hours
    );
    println!(
        "- compliant: {} | live compliant: {} | at risk next year: {}",
        snapshot.is_compliant, snapshot.is_live_compliant, snapshot.is_at_risk_next_year
    );
    for (year, hours) in &snapshot.per_year_hours {
        println!("    {year}: {hours:.1}h");
    }
    println!(
        "\nStore now holds {} competencies",
        engine.store.competency_count().map_err(preclinitrain::workflows::EngineError::from)?
    );

    Ok(())
}

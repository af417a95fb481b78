//! Skill competencies: reconciling evidence into canonical records, deciding when a
//! competency needs recycling, and checking whether tutors are still current.

pub mod domain;
pub mod reconciler;
pub mod recycling;
pub mod repository;
pub mod service;
pub mod tutor;

#[cfg(test)]
mod tests;

pub use domain::{
    Competency, CompetencyEntry, CompetencyLevel, Evaluator, Evidence, EvidenceOrigin,
    EvidenceSource, ExternalTrainingApproval, ExternalTrainingSkillClaim, PracticeDeclaration,
    SessionValidation, Skill, SkillPracticeEvent, SpeciesSet,
};
pub use reconciler::{CompetencyReconciler, DEFAULT_RECONCILE_ATTEMPTS};
pub use recycling::{RecyclingAssessment, RecyclingCalculator, RecyclingState};
pub use repository::{CompetencyRepository, CompetencyStore, PracticeLog, SkillCatalog};
pub use service::{
    CompetencyCheck, CompetencyService, RecyclingReport, RecyclingReportEntry,
};
pub use tutor::{TutorValidity, TutorValidityChecker, TutorValidityReason};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::workflows::EngineError;

/// Closed catalogue of named capabilities a role may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AdminAccess,
    UserManage,
    RoleManage,
    PermissionManage,
    TeamManage,
    ViewTeamCompetencies,
    SkillManage,
    SpeciesManage,
    TutorForSkill,
    CompetencyManage,
    SkillPracticeManage,
    TrainingPathManage,
    TrainingSessionManage,
    TrainingRequestManage,
    ExternalTrainingValidate,
    TrainingSessionValidate,
    ContinuousTrainingManage,
    ContinuousTrainingValidate,
    InitialRegulatoryTrainingManage,
    SelfEditProfile,
    SelfViewProfile,
    SelfDeclareSkillPractice,
    SelfSubmitTrainingRequest,
    SelfSubmitExternalTraining,
    SelfSubmitContinuousTrainingAttendance,
    SelfRequestContinuousTrainingEvent,
    ViewReports,
    ViewAnyCertificate,
    ViewAnyBooklet,
}

impl Permission {
    pub const ALL: [Permission; 29] = [
        Self::AdminAccess,
        Self::UserManage,
        Self::RoleManage,
        Self::PermissionManage,
        Self::TeamManage,
        Self::ViewTeamCompetencies,
        Self::SkillManage,
        Self::SpeciesManage,
        Self::TutorForSkill,
        Self::CompetencyManage,
        Self::SkillPracticeManage,
        Self::TrainingPathManage,
        Self::TrainingSessionManage,
        Self::TrainingRequestManage,
        Self::ExternalTrainingValidate,
        Self::TrainingSessionValidate,
        Self::ContinuousTrainingManage,
        Self::ContinuousTrainingValidate,
        Self::InitialRegulatoryTrainingManage,
        Self::SelfEditProfile,
        Self::SelfViewProfile,
        Self::SelfDeclareSkillPractice,
        Self::SelfSubmitTrainingRequest,
        Self::SelfSubmitExternalTraining,
        Self::SelfSubmitContinuousTrainingAttendance,
        Self::SelfRequestContinuousTrainingEvent,
        Self::ViewReports,
        Self::ViewAnyCertificate,
        Self::ViewAnyBooklet,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::AdminAccess => "admin_access",
            Self::UserManage => "user_manage",
            Self::RoleManage => "role_manage",
            Self::PermissionManage => "permission_manage",
            Self::TeamManage => "team_manage",
            Self::ViewTeamCompetencies => "view_team_competencies",
            Self::SkillManage => "skill_manage",
            Self::SpeciesManage => "species_manage",
            Self::TutorForSkill => "tutor_for_skill",
            Self::CompetencyManage => "competency_manage",
            Self::SkillPracticeManage => "skill_practice_manage",
            Self::TrainingPathManage => "training_path_manage",
            Self::TrainingSessionManage => "training_session_manage",
            Self::TrainingRequestManage => "training_request_manage",
            Self::ExternalTrainingValidate => "external_training_validate",
            Self::TrainingSessionValidate => "training_session_validate",
            Self::ContinuousTrainingManage => "continuous_training_manage",
            Self::ContinuousTrainingValidate => "continuous_training_validate",
            Self::InitialRegulatoryTrainingManage => "initial_regulatory_training_manage",
            Self::SelfEditProfile => "self_edit_profile",
            Self::SelfViewProfile => "self_view_profile",
            Self::SelfDeclareSkillPractice => "self_declare_skill_practice",
            Self::SelfSubmitTrainingRequest => "self_submit_training_request",
            Self::SelfSubmitExternalTraining => "self_submit_external_training",
            Self::SelfSubmitContinuousTrainingAttendance => {
                "self_submit_continuous_training_attendance"
            }
            Self::SelfRequestContinuousTrainingEvent => "self_request_continuous_training_event",
            Self::ViewReports => "view_reports",
            Self::ViewAnyCertificate => "view_any_certificate",
            Self::ViewAnyBooklet => "view_any_booklet",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Permission {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|permission| permission.name() == wanted)
            .ok_or_else(|| EngineError::invalid(format!("unknown permission '{value}'")))
    }
}

/// Stock roles seeded for a new installation, keyed by role name.
pub fn default_role_grants() -> BTreeMap<&'static str, Vec<Permission>> {
    use Permission::*;

    let mut roles = BTreeMap::new();
    roles.insert("Admin", Permission::ALL.to_vec());
    roles.insert(
        "Team Leader",
        vec![
            SelfEditProfile,
            SelfDeclareSkillPractice,
            SelfSubmitTrainingRequest,
            SelfSubmitExternalTraining,
            ViewTeamCompetencies,
            TrainingRequestManage,
            TutorForSkill,
            SelfSubmitContinuousTrainingAttendance,
            SelfRequestContinuousTrainingEvent,
        ],
    );
    roles.insert(
        "Tutor",
        vec![
            SelfEditProfile,
            SelfDeclareSkillPractice,
            SelfSubmitTrainingRequest,
            SelfSubmitExternalTraining,
            TrainingSessionValidate,
            TutorForSkill,
            SelfSubmitContinuousTrainingAttendance,
            SelfRequestContinuousTrainingEvent,
        ],
    );
    roles.insert(
        "Validator",
        vec![
            SelfEditProfile,
            ContinuousTrainingValidate,
            ExternalTrainingValidate,
            TrainingSessionValidate,
            SelfSubmitContinuousTrainingAttendance,
            SelfRequestContinuousTrainingEvent,
        ],
    );
    roles.insert(
        "User",
        vec![
            SelfEditProfile,
            SelfDeclareSkillPractice,
            SelfSubmitTrainingRequest,
            SelfSubmitExternalTraining,
            SelfSubmitContinuousTrainingAttendance,
            SelfRequestContinuousTrainingEvent,
        ],
    );
    roles
}

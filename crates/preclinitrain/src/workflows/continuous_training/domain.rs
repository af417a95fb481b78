use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::error::EngineError;
use crate::workflows::ids::{AttendanceId, EventId, FacilityId, UserId};
use crate::workflows::time::{deserialize_instant, deserialize_optional_instant};

/// How a continuing-education event was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrainingModality {
    Online,
    /// In person; counts towards the live-training share.
    Presential,
}

impl TrainingModality {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Presential => "Presential",
        }
    }
}

impl fmt::Display for TrainingModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TrainingModality {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "presential" => Ok(Self::Presential),
            _ => Err(EngineError::invalid(format!(
                "modality must be Online or Presential (found '{value}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Pending,
    Approved,
    Rejected,
}

impl AttendanceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AttendanceStatus {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(EngineError::invalid(format!(
                "status must be Pending, Approved or Rejected (found '{value}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousTrainingEvent {
    pub id: EventId,
    pub title: String,
    pub modality: TrainingModality,
    #[serde(deserialize_with = "deserialize_instant")]
    pub event_date: DateTime<Utc>,
    pub duration_hours: f64,
    /// Events organised by a facility are validated under that facility's roles.
    #[serde(default)]
    pub facility_id: Option<FacilityId>,
}

/// A user's attendance at an event and its validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContinuousTraining {
    pub id: AttendanceId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub status: AttendanceStatus,
    /// Hours actually credited; only set while the attendance is approved.
    #[serde(default)]
    pub validated_hours: Option<f64>,
    #[serde(default)]
    pub validated_by: Option<UserId>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    pub validation_date: Option<DateTime<Utc>>,
}

impl UserContinuousTraining {
    /// Hours this attendance contributes to any sum.
    pub fn credited_hours(&self) -> f64 {
        match self.status {
            AttendanceStatus::Approved => self.validated_hours.unwrap_or(0.0),
            AttendanceStatus::Pending | AttendanceStatus::Rejected => 0.0,
        }
    }
}

/// Attendance joined with its event, the unit the aggregator sums over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub attendance: UserContinuousTraining,
    pub event: ContinuousTrainingEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSubmission {
    pub user_id: UserId,
    pub event_id: EventId,
}

/// Inbound validation decision for one attendance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceValidation {
    pub user_continuous_training_id: AttendanceId,
    #[serde(default)]
    pub validated_hours: Option<f64>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_parse_case_insensitively() {
        assert_eq!(
            "APPROVED".parse::<AttendanceStatus>().unwrap(),
            AttendanceStatus::Approved
        );
        assert!(matches!(
            "done".parse::<AttendanceStatus>(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn only_approved_attendance_credits_hours() {
        let mut attendance = UserContinuousTraining {
            id: AttendanceId(1),
            user_id: UserId(1),
            event_id: EventId(1),
            status: AttendanceStatus::Rejected,
            validated_hours: Some(4.0),
            validated_by: None,
            validation_date: None,
        };
        assert_eq!(attendance.credited_hours(), 0.0);
        attendance.status = AttendanceStatus::Approved;
        assert_eq!(attendance.credited_hours(), 4.0);
    }

    #[test]
    fn modality_rejects_unknown_values() {
        assert_eq!(
            "presential".parse::<TrainingModality>().unwrap(),
            TrainingModality::Presential
        );
        assert!("hybrid".parse::<TrainingModality>().is_err());
    }
}

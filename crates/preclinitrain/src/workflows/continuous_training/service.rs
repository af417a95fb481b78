use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::aggregator::{ComplianceSnapshot, ContinuousTrainingAggregator};
use super::domain::{
    AttendanceStatus, AttendanceSubmission, AttendanceValidation, TrainingModality,
    UserContinuousTraining,
};
use super::repository::ContinuousTrainingStore;
use crate::access::{ensure_permitted, AccessPolicy, Permission, RequestContext};
use crate::workflows::error::EngineError;
use crate::workflows::ids::{AttendanceId, UserId};

static ATTENDANCE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_attendance_id() -> AttendanceId {
    AttendanceId(ATTENDANCE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn reserve_attendance_id(id: AttendanceId) {
    ATTENDANCE_SEQUENCE.fetch_max(id.0 + 1, Ordering::Relaxed);
}

fn ensure_valid_hours(hours: f64) -> Result<(), EngineError> {
    if hours.is_finite() && hours >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "validated hours must be a non-negative number (found {hours})"
        )))
    }
}

/// Attendance intake and validation plus the compliance views built on the aggregator.
pub struct ContinuousTrainingService<R, A: ?Sized> {
    store: Arc<R>,
    policy: Arc<A>,
    aggregator: ContinuousTrainingAggregator<R>,
}

impl<R, A> ContinuousTrainingService<R, A>
where
    R: ContinuousTrainingStore + 'static,
    A: AccessPolicy + ?Sized + 'static,
{
    pub fn new(store: Arc<R>, policy: Arc<A>) -> Self {
        Self {
            aggregator: ContinuousTrainingAggregator::new(store.clone()),
            store,
            policy,
        }
    }

    /// Registers a pending attendance. A second submission for the same user and event
    /// fails with a repository conflict.
    pub fn submit_attendance(
        &self,
        context: &RequestContext,
        submission: AttendanceSubmission,
    ) -> Result<UserContinuousTraining, EngineError> {
        let permission = if submission.user_id == context.actor {
            Permission::SelfSubmitContinuousTrainingAttendance
        } else {
            Permission::ContinuousTrainingManage
        };
        ensure_permitted(self.policy.as_ref(), context, permission, None)?;

        if !self.store.user_exists(submission.user_id)? {
            return Err(EngineError::not_found("user", submission.user_id));
        }
        if self.store.event(submission.event_id)?.is_none() {
            return Err(EngineError::not_found("event", submission.event_id));
        }

        let stored = self.store.insert_attendance(UserContinuousTraining {
            id: next_attendance_id(),
            user_id: submission.user_id,
            event_id: submission.event_id,
            status: AttendanceStatus::Pending,
            validated_hours: None,
            validated_by: None,
            validation_date: None,
        })?;
        info!(
            attendance = %stored.id,
            user = %stored.user_id,
            event = %stored.event_id,
            "continuing-education attendance submitted"
        );
        Ok(stored)
    }

    /// Approves, rejects or resets an attendance. Approval without explicit hours credits
    /// the event's nominal duration; any other status clears the credited hours.
    pub fn validate_attendance(
        &self,
        context: &RequestContext,
        validation: AttendanceValidation,
        now: DateTime<Utc>,
    ) -> Result<UserContinuousTraining, EngineError> {
        let mut attendance = self
            .store
            .attendance(validation.user_continuous_training_id)?
            .ok_or_else(|| {
                EngineError::not_found("attendance", validation.user_continuous_training_id)
            })?;
        let event = self
            .store
            .event(attendance.event_id)?
            .ok_or_else(|| EngineError::not_found("event", attendance.event_id))?;

        ensure_permitted(
            self.policy.as_ref(),
            context,
            Permission::ContinuousTrainingValidate,
            event.facility_id,
        )?;

        let status: AttendanceStatus = validation.status.parse()?;
        if let Some(hours) = validation.validated_hours {
            ensure_valid_hours(hours)?;
        }

        attendance.status = status;
        attendance.validated_hours = match status {
            AttendanceStatus::Approved => {
                let hours = validation.validated_hours.unwrap_or(event.duration_hours);
                ensure_valid_hours(hours)?;
                Some(hours)
            }
            AttendanceStatus::Pending | AttendanceStatus::Rejected => None,
        };
        attendance.validated_by = Some(context.actor);
        attendance.validation_date = Some(now);

        let stored = self.store.update_attendance(attendance)?;
        info!(
            attendance = %stored.id,
            status = %stored.status,
            hours = stored.validated_hours.unwrap_or(0.0),
            validator = %context.actor,
            "continuing-education attendance validated"
        );
        Ok(stored)
    }

    pub fn hours_in_window(
        &self,
        user: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        modality: Option<TrainingModality>,
    ) -> Result<f64, EngineError> {
        self.aggregator.hours_in_window(user, start, end, modality)
    }

    pub fn snapshot(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<ComplianceSnapshot, EngineError> {
        self.aggregator.snapshot(user, now)
    }

    pub fn cohort(
        &self,
        users: &[UserId],
        now: DateTime<Utc>,
    ) -> Result<Vec<ComplianceSnapshot>, EngineError> {
        self.aggregator.cohort(users, now)
    }
}

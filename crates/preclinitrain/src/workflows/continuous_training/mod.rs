//! Continuing-education hours: attendance intake and validation, rolling and
//! calendar-year aggregation, and the compliance flags derived from them.

pub mod aggregator;
pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::{
    hours_in_window, per_year_hours, six_year_total_from_slices, ComplianceSnapshot,
    ContinuousTrainingAggregator, HourWindow, AT_RISK_DAYS, AT_RISK_WINDOW_YEARS, DAYS_REQUIRED,
    AT_RISK_HOURS, HOURS_PER_DAY, MIN_LIVE_SHARE, REQUIRED_HOURS, REQUIRED_LIVE_HOURS, WINDOW_YEARS,
};
pub use domain::{
    AttendanceRecord, AttendanceStatus, AttendanceSubmission, AttendanceValidation,
    ContinuousTrainingEvent, TrainingModality, UserContinuousTraining,
};
pub use repository::{ContinuousTrainingRepository, ContinuousTrainingStore};
pub use service::ContinuousTrainingService;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use super::domain::{AttendanceRecord, TrainingModality};
use super::repository::ContinuousTrainingStore;
use crate::workflows::error::EngineError;
use crate::workflows::ids::UserId;
use crate::workflows::time::{average_years, year_start};

pub const DAYS_REQUIRED: f64 = 3.0;
pub const HOURS_PER_DAY: f64 = 7.0;
/// Length of the rolling compliance window, in average years.
pub const WINDOW_YEARS: f64 = 6.0;
pub const MIN_LIVE_SHARE: f64 = 1.0 / 3.0;
pub const AT_RISK_WINDOW_YEARS: f64 = 5.0;
pub const AT_RISK_DAYS: f64 = 2.5;

pub const REQUIRED_HOURS: f64 = DAYS_REQUIRED * HOURS_PER_DAY;
pub const REQUIRED_LIVE_HOURS: f64 = REQUIRED_HOURS * MIN_LIVE_SHARE;
pub const AT_RISK_HOURS: f64 = AT_RISK_DAYS * HOURS_PER_DAY;

/// Calendar years shown in the per-year breakdown, current year included.
const REPORTED_YEARS: i32 = 6;

/// Half-open interval `[start, end)` of event dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl HourWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::invalid(format!(
                "window start {start} is after its end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `years` average years ending at `now`.
    pub fn trailing(now: DateTime<Utc>, years: f64) -> Self {
        let start = now
            .checked_sub_signed(average_years(years))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn calendar_year(year: i32) -> Option<Self> {
        Some(Self {
            start: year_start(year)?,
            end: year_start(year + 1)?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Intersection with `other`, or `None` when they do not overlap.
    pub fn clip(&self, other: &HourWindow) -> Option<HourWindow> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(HourWindow { start, end })
    }
}

/// Approved hours whose event falls inside `window`, optionally restricted to one modality.
pub fn hours_in_window(
    records: &[AttendanceRecord],
    window: HourWindow,
    modality: Option<TrainingModality>,
) -> f64 {
    records
        .iter()
        .filter(|record| window.contains(record.event.event_date))
        .filter(|record| modality.map_or(true, |wanted| record.event.modality == wanted))
        .map(|record| record.attendance.credited_hours())
        .sum()
}

/// Hours per calendar year for the current year and the five before it.
pub fn per_year_hours(records: &[AttendanceRecord], now: DateTime<Utc>) -> BTreeMap<i32, f64> {
    let current = now.year();
    ((current - REPORTED_YEARS + 1)..=current)
        .filter_map(|year| {
            HourWindow::calendar_year(year)
                .map(|window| (year, hours_in_window(records, window, None)))
        })
        .collect()
}

/// Rebuilds the rolling six-year total from calendar-year slices, each clipped to the
/// rolling window so partial years at either edge are counted once.
pub fn six_year_total_from_slices(records: &[AttendanceRecord], now: DateTime<Utc>) -> f64 {
    let rolling = HourWindow::trailing(now, WINDOW_YEARS);
    (rolling.start.year()..=now.year())
        .filter_map(HourWindow::calendar_year)
        .filter_map(|year| year.clip(&rolling))
        .map(|slice| hours_in_window(records, slice, None))
        .sum()
}

/// Per-user continuing-education compliance, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplianceSnapshot {
    pub user_id: UserId,
    pub as_of: DateTime<Utc>,
    pub total_hours_6y: f64,
    pub live_hours_6y: f64,
    pub online_hours_6y: f64,
    pub required_hours: f64,
    pub is_compliant: bool,
    pub required_live_hours: f64,
    pub is_live_compliant: bool,
    /// Early warning only: fewer than 2.5 days over the last five years.
    pub is_at_risk_next_year: bool,
    pub per_year_hours: BTreeMap<i32, f64>,
}

impl ComplianceSnapshot {
    pub fn from_records(user_id: UserId, records: &[AttendanceRecord], now: DateTime<Utc>) -> Self {
        let window = HourWindow::trailing(now, WINDOW_YEARS);
        let total_hours_6y = hours_in_window(records, window, None);
        let live_hours_6y = hours_in_window(records, window, Some(TrainingModality::Presential));
        let online_hours_6y = hours_in_window(records, window, Some(TrainingModality::Online));
        let recent = hours_in_window(
            records,
            HourWindow::trailing(now, AT_RISK_WINDOW_YEARS),
            None,
        );

        Self {
            user_id,
            as_of: now,
            total_hours_6y,
            live_hours_6y,
            online_hours_6y,
            required_hours: REQUIRED_HOURS,
            is_compliant: total_hours_6y >= REQUIRED_HOURS,
            required_live_hours: REQUIRED_LIVE_HOURS,
            is_live_compliant: live_hours_6y >= REQUIRED_LIVE_HOURS,
            is_at_risk_next_year: recent < AT_RISK_HOURS,
            per_year_hours: per_year_hours(records, now),
        }
    }
}

/// Loads a user's attendance and runs the window arithmetic over it.
pub struct ContinuousTrainingAggregator<R> {
    store: Arc<R>,
}

impl<R> ContinuousTrainingAggregator<R>
where
    R: ContinuousTrainingStore + 'static,
{
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    pub fn hours_in_window(
        &self,
        user: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        modality: Option<TrainingModality>,
    ) -> Result<f64, EngineError> {
        let window = HourWindow::new(start, end)?;
        let records = self.records(user)?;
        Ok(hours_in_window(&records, window, modality))
    }

    pub fn snapshot(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<ComplianceSnapshot, EngineError> {
        let records = self.records(user)?;
        Ok(ComplianceSnapshot::from_records(user, &records, now))
    }

    pub fn six_year_total_from_slices(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<f64, EngineError> {
        let records = self.records(user)?;
        Ok(six_year_total_from_slices(&records, now))
    }

    pub fn cohort(
        &self,
        users: &[UserId],
        now: DateTime<Utc>,
    ) -> Result<Vec<ComplianceSnapshot>, EngineError> {
        users.iter().map(|user| self.snapshot(*user, now)).collect()
    }

    fn records(&self, user: UserId) -> Result<Vec<AttendanceRecord>, EngineError> {
        if !self.store.user_exists(user)? {
            return Err(EngineError::not_found("user", user));
        }
        Ok(self.store.attendances_for_user(user)?)
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use croner::Cron;

use crate::error::ScheduleError;

/// Midnight UTC on January 1st.
pub const DEFAULT_REFRESH_SCHEDULE: &str = "0 0 1 1 *";

/// Calendar trigger for refresh runs, as a five-field cron expression
/// evaluated in UTC.
#[derive(Clone)]
pub struct RefreshSchedule {
    expression: String,
    cron: Cron,
}

impl RefreshSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let expression = expression.trim().to_string();
        let cron = Cron::new(&expression)
            .parse()
            .map_err(|e| ScheduleError::InvalidExpression {
                expression: expression.clone(),
                message: e.to_string(),
            })?;
        Ok(Self { expression, cron })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First occurrence strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        self.cron
            .find_next_occurrence(&after, false)
            .map_err(|_| ScheduleError::NoUpcomingOccurrence {
                expression: self.expression.clone(),
            })
    }

    /// The next `count` occurrences after `from`.
    pub fn upcoming(
        &self,
        from: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        let mut occurrences = Vec::with_capacity(count);
        let mut cursor = from;
        for _ in 0..count {
            cursor = self.next_after(cursor)?;
            occurrences.push(cursor);
        }
        Ok(occurrences)
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::parse(DEFAULT_REFRESH_SCHEDULE).unwrap_or_else(|e| {
            unreachable!("default refresh schedule must parse: {e}")
        })
    }
}

impl fmt::Debug for RefreshSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshSchedule")
            .field("expression", &self.expression)
            .finish()
    }
}

impl PartialEq for RefreshSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl Eq for RefreshSchedule {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_fires_on_new_year() {
        let schedule = RefreshSchedule::default();
        let from = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let next = schedule.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn occurrence_is_strictly_after() {
        let schedule = RefreshSchedule::default();
        let new_year = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        let next = schedule.next_after(new_year).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2028, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn upcoming_lists_consecutive_years() {
        let schedule = RefreshSchedule::default();
        let from = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let years: Vec<i32> = schedule
            .upcoming(from, 3)
            .unwrap()
            .iter()
            .map(|d| chrono::Datelike::year(d))
            .collect();
        assert_eq!(years, vec![2027, 2028, 2029]);
    }

    #[test]
    fn custom_expression() {
        let schedule = RefreshSchedule::parse("30 2 * * 0").unwrap();
        assert_eq!(schedule.expression(), "30 2 * * 0");
        let from = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(); // Monday
        let next = schedule.next_after(from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 10, 25, 2, 30, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        let err = RefreshSchedule::parse("every new year").unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidExpression { .. }));
    }
}

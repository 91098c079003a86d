//! Reporting-period computation.
//!
//! A digest published on any day of week N always describes the full
//! Monday–Sunday span of week N-1.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Identity of the week a digest covers, derived once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDescriptor {
    /// ISO week number of the reporting week (not of `pub_date`).
    pub week_number: u32,
    /// ISO week-based year of the reporting week.
    pub year: i32,
    /// Publish date, i.e. the day the run happens.
    pub pub_date: NaiveDate,
    /// Human-readable span, e.g. `October 05 – October 11, 2026`.
    pub date_range: String,
    /// Target document filename, e.g. `2026-week-41.md`.
    pub filename: String,
}

/// Compute the reporting period for a run happening on `today`.
pub fn compute_period(today: NaiveDate) -> PeriodDescriptor {
    let days_since_monday = i64::from(today.weekday().num_days_from_monday());
    let this_monday = today - Duration::days(days_since_monday);
    let last_monday = this_monday - Duration::days(7);
    let last_sunday = last_monday + Duration::days(6);

    let iso = last_monday.iso_week();
    let week_number = iso.week();
    let year = iso.year();

    let date_range = format!(
        "{} – {}",
        last_monday.format("%B %d"),
        last_sunday.format("%B %d, %Y")
    );

    PeriodDescriptor {
        week_number,
        year,
        pub_date: today,
        date_range,
        filename: format!("{year}-week-{week_number:02}.md"),
    }
}

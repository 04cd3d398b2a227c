use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::period::Period;

/// Day 15 closes the first half; day 16 opens the second half.
const FIRST_HALF_END: u32 = 15;

/// One calendar month, identified by year and zero-based month index.
/// The wire format is `YYYY-MM` (one-based, zero-padded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    pub year: i32,
    pub month0: u32,
}

impl MonthKey {
    pub fn new(year: i32, month0: u32) -> anyhow::Result<Self> {
        if month0 > 11 {
            return Err(anyhow!("month index out of range 0-11: {month0}"));
        }
        Ok(Self { year, month0 })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month0: date.month0(),
        }
    }

    /// The following month, rolling December into January.
    pub fn next(self) -> Self {
        if self.month0 == 11 {
            Self {
                year: self.year + 1,
                month0: 0,
            }
        } else {
            Self {
                year: self.year,
                month0: self.month0 + 1,
            }
        }
    }

    pub fn first_day(self) -> NaiveDate {
        // Always valid: month0 is range-checked at construction.
        NaiveDate::from_ymd_opt(self.year, self.month0 + 1, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(self) -> NaiveDate {
        // First of the next month, minus one day. Exact for every month
        // including leap Februaries; no length table.
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MIN)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month0 + 1)
    }
}

impl FromStr for MonthKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let re = Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{2})$")
            .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
        let caps = re
            .captures(s.trim())
            .ok_or_else(|| anyhow!("expected YYYY-MM month key, got: {s}"))?;

        let year: i32 = caps
            .name("year")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing year in month key"))?
            .parse()
            .context("invalid year in month key")?;
        let month: u32 = caps
            .name("month")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing month in month key"))?
            .parse()
            .context("invalid month in month key")?;
        if !(1..=12).contains(&month) {
            return Err(anyhow!("month out of range 01-12: {s}"));
        }

        Self::new(year, month - 1)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = anyhow::Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// The freshly generated S1/S2 pair for one month. Both periods come back
/// with empty `manager_name`/`employee_id`; the caller stamps those.
#[derive(Debug, Clone)]
pub struct MonthPeriods {
    pub first_half: Period,
    pub second_half: Period,
}

/// Partitions `(year, month0)` into the S1 (1st-15th) and S2 (16th-end)
/// periods. Weekend dates are dropped from `dates`, never shifted, and
/// `period_ending` stays on the true calendar boundary.
#[tracing::instrument]
pub fn generate_month(year: i32, month0: u32) -> anyhow::Result<MonthPeriods> {
    let key = MonthKey::new(year, month0)?;

    let s1_start = key.first_day();
    let s1_end = NaiveDate::from_ymd_opt(year, month0 + 1, FIRST_HALF_END)
        .ok_or_else(|| anyhow!("invalid calendar month: {year}-{}", month0 + 1))?;
    let s2_start = s1_end
        .succ_opt()
        .ok_or_else(|| anyhow!("date overflow after {s1_end}"))?;
    let s2_end = key.last_day();

    let first_half = Period::new(s1_end, weekdays_in_range(s1_start, s1_end));
    let second_half = Period::new(s2_end, weekdays_in_range(s2_start, s2_end));

    tracing::debug!(
        month = %key,
        s1_days = first_half.dates.len(),
        s2_days = second_half.dates.len(),
        "generated month periods"
    );

    Ok(MonthPeriods {
        first_half,
        second_half,
    })
}

/// Weekdays (Mon-Fri) in the inclusive range, in calendar order.
fn weekdays_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Due-date rule: S1 periods are due on the 15th of their own month, S2
/// periods on the 1st of the following month (December rolls the year).
/// Pure function of the period ending; "now" plays no part.
pub fn due_date(period_ending: NaiveDate) -> NaiveDate {
    if period_ending.day() <= FIRST_HALF_END {
        period_ending
            .with_day(FIRST_HALF_END)
            .unwrap_or(period_ending)
    } else {
        MonthKey::from_date(period_ending).next().first_day()
    }
}

/// Parses a `YYYY-MM-DD` wire date. Anything else is an error; malformed
/// input is never clamped or corrected.
pub fn parse_iso_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("expected YYYY-MM-DD date, got: {raw}"))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};

    use super::{MonthKey, due_date, generate_month, parse_iso_date};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn generated_dates_are_weekdays_only() {
        for (year, month0) in [(2025, 0), (2024, 1), (2025, 5), (2023, 11), (2026, 7)] {
            let pair = generate_month(year, month0).expect("generate");
            for day in pair
                .first_half
                .dates
                .iter()
                .chain(pair.second_half.dates.iter())
            {
                assert!(
                    !matches!(day.weekday(), Weekday::Sat | Weekday::Sun),
                    "{day} is a weekend"
                );
            }
        }
    }

    #[test]
    fn generated_dates_stay_inside_their_half() {
        let pair = generate_month(2025, 2).expect("generate");
        for day in &pair.first_half.dates {
            assert!(day.day() <= 15);
        }
        for day in &pair.second_half.dates {
            assert!(day.day() >= 16);
        }
        assert!(pair.first_half.dates.windows(2).all(|w| w[0] < w[1]));
        assert!(pair.second_half.dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn january_2025_boundaries_are_exact() {
        let pair = generate_month(2025, 0).expect("generate");
        assert_eq!(pair.first_half.period_ending, date(2025, 1, 15));
        assert_eq!(pair.second_half.period_ending, date(2025, 1, 31));
        // Jan 1st 2025 is a Wednesday, so S1 starts on the 1st itself.
        assert_eq!(pair.first_half.dates.first(), Some(&date(2025, 1, 1)));
        assert_eq!(pair.second_half.dates.first(), Some(&date(2025, 1, 16)));
    }

    #[test]
    fn february_respects_leap_years() {
        let leap = generate_month(2024, 1).expect("generate");
        assert_eq!(leap.second_half.period_ending, date(2024, 2, 29));

        let common = generate_month(2023, 1).expect("generate");
        assert_eq!(common.second_half.period_ending, date(2023, 2, 28));
    }

    #[test]
    fn month_index_out_of_range_fails_fast() {
        assert!(generate_month(2025, 12).is_err());
        assert!(MonthKey::new(2025, 99).is_err());
    }

    #[test]
    fn due_date_follows_the_s1_s2_rule() {
        assert_eq!(due_date(date(2025, 1, 15)), date(2025, 1, 15));
        assert_eq!(due_date(date(2025, 1, 31)), date(2025, 2, 1));
        assert_eq!(due_date(date(2025, 12, 31)), date(2026, 1, 1));
        assert_eq!(due_date(date(2024, 2, 29)), date(2024, 3, 1));
    }

    #[test]
    fn month_key_wire_format_roundtrips() {
        let key: MonthKey = "2025-02".parse().expect("parse month key");
        assert_eq!(key.year, 2025);
        assert_eq!(key.month0, 1);
        assert_eq!(key.to_string(), "2025-02");

        assert!("2025-13".parse::<MonthKey>().is_err());
        assert!("2025-00".parse::<MonthKey>().is_err());
        assert!("202five".parse::<MonthKey>().is_err());
    }

    #[test]
    fn month_key_next_rolls_the_year() {
        let december = MonthKey::new(2025, 11).expect("valid key");
        let january = december.next();
        assert_eq!(january.year, 2026);
        assert_eq!(january.month0, 0);
        assert_eq!(january.first_day(), date(2026, 1, 1));
        assert_eq!(december.last_day(), date(2025, 12, 31));
    }

    #[test]
    fn iso_date_parsing_rejects_garbage() {
        assert_eq!(parse_iso_date("2025-01-15").expect("parse"), date(2025, 1, 15));
        assert!(parse_iso_date("2025-02-30").is_err());
        assert!(parse_iso_date("15/01/2025").is_err());
    }
}

use crate::calendar::MonthKey;
use crate::period::Period;

/// The month a period belongs to, read off the period's own data: the first
/// covered date when present, otherwise the period ending. Never stored or
/// cached anywhere else, so the answer is always consistent with however
/// the period was generated.
pub fn period_month(period: &Period) -> MonthKey {
    period
        .dates
        .first()
        .map(|first| MonthKey::from_date(*first))
        .unwrap_or_else(|| MonthKey::from_date(period.period_ending))
}

/// Outcome of a duplicate-month check. A conflict is data, not an error:
/// the manual path surfaces `matches` to the user, the scheduler skips.
#[derive(Debug, Clone)]
pub struct ConflictCheck {
    pub month: MonthKey,
    pub matches: Vec<Period>,
}

impl ConflictCheck {
    pub fn is_conflict(&self) -> bool {
        !self.matches.is_empty()
    }
}

/// Collects every existing period that already occupies the target month.
pub fn check_conflict(periods: &[Period], target: MonthKey) -> ConflictCheck {
    let matches = periods
        .iter()
        .filter(|period| period_month(period) == target)
        .cloned()
        .collect();

    ConflictCheck {
        month: target,
        matches,
    }
}

/// Distinct months present in a period list, newest first. Drives the
/// month-grouped period listing.
pub fn months_covered(periods: &[Period]) -> Vec<MonthKey> {
    let mut months: Vec<MonthKey> = periods.iter().map(period_month).collect();
    months.sort();
    months.dedup();
    months.reverse();
    months
}

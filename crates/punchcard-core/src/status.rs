use chrono::NaiveDate;

use crate::calendar::due_date;
use crate::period::Candidate;

/// Classification of a pending period relative to its due date. Only
/// meaningful for periods that have not been uploaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Urgent,
    Overdue,
}

impl Urgency {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Urgent => "urgent",
            Self::Overdue => "overdue",
        }
    }
}

/// Due-date rule: overdue once today is strictly past the due date, urgent
/// when the due date is one or two days out. The due day itself is still
/// normal. Re-evaluated on every call; nothing here caches "today".
pub fn classify_by_due_date(today: NaiveDate, period_ending: NaiveDate) -> Urgency {
    let due = due_date(period_ending);
    if today > due {
        return Urgency::Overdue;
    }

    let days_until = (due - today).num_days();
    if days_until > 0 && days_until <= 2 {
        Urgency::Urgent
    } else {
        Urgency::Normal
    }
}

/// The older, separate overdue rule: the period ended more than seven days
/// ago. Kept distinct from `classify_by_due_date`; the pending-actions
/// summary uses this one, the scheduler alert path uses the due-date rule.
pub fn is_overdue_by_seven_days(today: NaiveDate, period_ending: NaiveDate) -> bool {
    (today - period_ending).num_days() > 7
}

/// Companion to the seven-day rule: the period ends within the next two
/// days (but has not ended yet).
pub fn is_urgent_by_period_end(today: NaiveDate, period_ending: NaiveDate) -> bool {
    let days_until = (period_ending - today).num_days();
    days_until > 0 && days_until <= 2
}

/// Roster-wide counts of what still needs doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingActions {
    pub pending_downloads: usize,
    pub pending_uploads: usize,
    pub overdue_periods: usize,
}

/// Walks every period of every candidate: not-yet-downloaded counts as a
/// pending download, downloaded-but-not-uploaded as a pending upload, and
/// of those the seven-day rule decides what is overdue.
pub fn pending_actions_summary(roster: &[Candidate], today: NaiveDate) -> PendingActions {
    let mut summary = PendingActions::default();

    for candidate in roster {
        for period in &candidate.timesheets {
            if !period.downloaded {
                summary.pending_downloads += 1;
            }
            if period.downloaded && !period.uploaded {
                summary.pending_uploads += 1;
                if is_overdue_by_seven_days(today, period.period_ending) {
                    summary.overdue_periods += 1;
                }
            }
        }
    }

    summary
}

/// Per-candidate urgent/overdue counts by the period-end rule, considering
/// only periods that are downloaded but still waiting on a signed upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrgencyCounts {
    pub urgent: usize,
    pub overdue: usize,
}

pub fn urgency_status(candidate: &Candidate, today: NaiveDate) -> UrgencyCounts {
    let mut counts = UrgencyCounts::default();

    for period in &candidate.timesheets {
        if !period.downloaded || period.uploaded {
            continue;
        }
        let days_until_end = (period.period_ending - today).num_days();
        if days_until_end < 0 {
            counts.overdue += 1;
        } else if days_until_end <= 2 {
            counts.urgent += 1;
        }
    }

    counts
}

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::calendar::{MonthKey, generate_month};
use crate::conflict::check_conflict;
use crate::datastore::RosterStore;
use crate::period::Candidate;
use crate::status::{Urgency, classify_by_due_date};

/// Day of the month on which next month's periods are materialized.
pub const GENERATION_DAY: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    None,
    GenerateFor(MonthKey),
}

/// What one tick decided. `new_guard` is the value the caller should write
/// back to durable storage after acting; when nothing fires it simply
/// echoes the guard it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerDecision {
    pub action: SchedulerAction,
    pub new_guard: Option<MonthKey>,
}

/// Pure scheduling policy. From the 26th onward the target is next month;
/// the decision fires only while the stored guard differs from the target,
/// which covers both the 26th itself and any later day when the process was
/// not running on the 26th. Re-entrancy is handled here by the guard and
/// downstream by conflict detection, not by locking.
pub fn decide(today: NaiveDate, last_processed: Option<MonthKey>) -> SchedulerDecision {
    let target = MonthKey::from_date(today).next();

    if today.day() >= GENERATION_DAY && last_processed != Some(target) {
        debug!(day = today.day(), target = %target, "scheduler fires");
        SchedulerDecision {
            action: SchedulerAction::GenerateFor(target),
            new_guard: Some(target),
        }
    } else {
        SchedulerDecision {
            action: SchedulerAction::None,
            new_guard: last_processed,
        }
    }
}

/// Outcome of one generation run across the roster. Candidate names only;
/// the periods themselves are already in the store.
#[derive(Debug, Clone, Default)]
pub struct GenerationRun {
    pub target: Option<MonthKey>,
    pub generated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Generates the S1/S2 pair for every candidate that does not already have
/// periods in the target month, stamping each pair with the candidate's
/// current manager and employee id. One candidate's store failure is logged
/// and does not stop the rest; the roster is processed as an independent
/// set, never a transaction.
#[tracing::instrument(skip(store, roster), fields(target = %target, roster = roster.len()))]
pub fn run_generation(
    store: &RosterStore,
    roster: &[Candidate],
    target: MonthKey,
) -> anyhow::Result<GenerationRun> {
    info!(target = %target, "starting period generation");

    let mut run = GenerationRun {
        target: Some(target),
        ..GenerationRun::default()
    };

    for candidate in roster {
        let existing = check_conflict(&candidate.timesheets, target);
        if existing.is_conflict() {
            debug!(
                candidate = %candidate.name,
                matches = existing.matches.len(),
                "skipping: month already has periods"
            );
            run.skipped.push(candidate.name.clone());
            continue;
        }

        let mut pair = generate_month(target.year, target.month0)?;
        pair.first_half.manager_name = candidate.manager.clone();
        pair.first_half.employee_id = candidate.employee_id.clone();
        pair.second_half.manager_name = candidate.manager.clone();
        pair.second_half.employee_id = candidate.employee_id.clone();

        match store.append_periods(candidate.id, vec![pair.first_half, pair.second_half]) {
            Ok(()) => {
                info!(candidate = %candidate.name, "generated S1 and S2 periods");
                run.generated.push(candidate.name.clone());
            }
            Err(err) => {
                warn!(
                    candidate = %candidate.name,
                    error = %err,
                    "failed to store generated periods; continuing"
                );
                run.failed.push(candidate.name.clone());
            }
        }
    }

    info!(
        generated = run.generated.len(),
        skipped = run.skipped.len(),
        failed = run.failed.len(),
        "generation run finished"
    );
    Ok(run)
}

/// Counts of un-uploaded periods that need attention, by the due-date rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertIntent {
    pub urgent: usize,
    pub overdue: usize,
}

/// Read-only scan emitted on every tick, independent of whether generation
/// fired. `None` when nothing needs attention.
pub fn alert_intent(roster: &[Candidate], today: NaiveDate) -> Option<AlertIntent> {
    let mut urgent = 0;
    let mut overdue = 0;

    for candidate in roster {
        for period in &candidate.timesheets {
            if period.uploaded {
                continue;
            }
            match classify_by_due_date(today, period.period_ending) {
                Urgency::Overdue => overdue += 1,
                Urgency::Urgent => urgent += 1,
                Urgency::Normal => {}
            }
        }
    }

    if urgent == 0 && overdue == 0 {
        None
    } else {
        Some(AlertIntent { urgent, overdue })
    }
}

/// Advisory check for manual generation: requesting next month's periods
/// before the 26th preempts the automation, which deserves a warning
/// rather than a refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EarlyGeneration {
    pub should_warn: bool,
    pub is_next_month: bool,
    pub automation_date: NaiveDate,
}

pub fn early_generation_check(today: NaiveDate, target: MonthKey) -> EarlyGeneration {
    let is_next_month = target == MonthKey::from_date(today).next();
    let automation_date = today.with_day(GENERATION_DAY).unwrap_or(today);

    EarlyGeneration {
        should_warn: is_next_month && today < automation_date,
        is_next_month,
        automation_date,
    }
}

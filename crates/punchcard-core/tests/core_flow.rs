use chrono::{NaiveDate, TimeZone, Utc};
use punchcard_core::calendar::MonthKey;
use punchcard_core::conflict::check_conflict;
use punchcard_core::datastore::RosterStore;
use punchcard_core::period::Candidate;
use punchcard_core::scheduler::{self, SchedulerAction};
use punchcard_core::status::pending_actions_summary;
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn scheduler_tick_generates_idempotently() {
    let temp = tempdir().expect("tempdir");
    let store = RosterStore::open(temp.path()).expect("open store");

    let mut candidate = Candidate::new("Morgan Reyes".to_string());
    candidate.company = "Acme Staffing".to_string();
    candidate.manager = "D. Okafor".to_string();
    candidate.employee_id = "E-1042".to_string();
    store.save_roster(&[candidate]).expect("save roster");

    // January 26th: the tick targets February.
    let today = date(2025, 1, 26);
    let guard = store.load_last_processed().expect("load guard");
    assert_eq!(guard, None);

    let decision = scheduler::decide(today, guard);
    let SchedulerAction::GenerateFor(target) = decision.action else {
        panic!("expected a generation target on the 26th");
    };
    assert_eq!(target, MonthKey::new(2025, 1).expect("valid key"));

    let roster = store.load_roster().expect("load roster");
    let run = scheduler::run_generation(&store, &roster, target).expect("run generation");
    assert_eq!(run.generated.len(), 1);
    store
        .save_last_processed(decision.new_guard.expect("guard after firing"))
        .expect("save guard");

    // The pair landed, stamped from the candidate profile.
    let roster = store.load_roster().expect("reload roster");
    assert_eq!(roster[0].timesheets.len(), 2);
    assert!(roster[0]
        .timesheets
        .iter()
        .all(|p| p.manager_name == "D. Okafor" && p.employee_id == "E-1042"));

    // Next day: the guard holds, nothing fires.
    let decision = scheduler::decide(
        date(2025, 1, 27),
        store.load_last_processed().expect("load guard"),
    );
    assert_eq!(decision.action, SchedulerAction::None);

    // Even a forced re-run is idempotent thanks to conflict detection.
    let rerun = scheduler::run_generation(&store, &roster, target).expect("re-run generation");
    assert!(rerun.generated.is_empty());
    assert_eq!(rerun.skipped.len(), 1);
    assert_eq!(
        store.load_roster().expect("final roster")[0].timesheets.len(),
        2
    );

    let conflicts = check_conflict(&roster[0].timesheets, target);
    assert!(conflicts.is_conflict());
    assert_eq!(conflicts.matches.len(), 2);
}

#[test]
fn lifecycle_flags_feed_the_summary() {
    let temp = tempdir().expect("tempdir");
    let store = RosterStore::open(temp.path()).expect("open store");

    let candidate = Candidate::new("Jordan Li".to_string());
    let id = candidate.id;
    store.save_roster(&[candidate]).expect("save roster");

    let target = MonthKey::new(2025, 0).expect("valid key");
    let roster = store.load_roster().expect("load roster");
    scheduler::run_generation(&store, &roster, target).expect("generate january");

    let mut roster = store.load_roster().expect("reload");
    let sheets = &mut roster
        .iter_mut()
        .find(|c| c.id == id)
        .expect("candidate present")
        .timesheets;
    sheets[0].downloaded = true;
    sheets[1].downloaded = true;
    sheets[1].mark_uploaded(
        Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0)
            .single()
            .expect("valid stamp"),
    );
    store.save_roster(&roster).expect("save flags");

    let roster = store.load_roster().expect("final load");
    let summary = pending_actions_summary(&roster, date(2025, 2, 10));
    assert_eq!(summary.pending_downloads, 0);
    assert_eq!(summary.pending_uploads, 1);
    // S1 ended January 15th, well past the seven-day window.
    assert_eq!(summary.overdue_periods, 1);
}

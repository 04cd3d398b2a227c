use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::calendar::{MonthKey, generate_month, parse_iso_date};
use crate::cli::Command;
use crate::clock::project_today;
use crate::config::Config;
use crate::conflict::check_conflict;
use crate::datastore::RosterStore;
use crate::period::Candidate;
use crate::render::Renderer;
use crate::scheduler::{
    self, SchedulerAction, early_generation_check,
};
use crate::status::pending_actions_summary;

#[instrument(skip(store, cfg, renderer, command, now))]
pub fn dispatch(
    store: &mut RosterStore,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let today = project_today(now);
    debug!(%today, ?command, "dispatching command");

    match command {
        Command::Add {
            name,
            company,
            email,
            contact_number,
            manager,
            employee_id,
        } => cmd_add(
            store,
            name,
            company,
            email,
            contact_number,
            manager,
            employee_id,
        ),
        Command::List => cmd_list(store, renderer, today),
        Command::Periods { candidate } => cmd_periods(store, renderer, &candidate, today),
        Command::Generate {
            candidate,
            month,
            force,
        } => cmd_generate(store, renderer, &candidate, &month, force, today),
        Command::Tick => cmd_tick(store, cfg, today),
        Command::MarkDownloaded {
            candidate,
            period_ending,
        } => cmd_mark(store, &candidate, &period_ending, Mark::Downloaded, now),
        Command::MarkUploaded {
            candidate,
            period_ending,
        } => cmd_mark(store, &candidate, &period_ending, Mark::Uploaded, now),
        Command::Remove {
            candidate,
            period_ending,
        } => cmd_remove(store, &candidate, period_ending.as_deref()),
        Command::Status => cmd_status(store, renderer, today),
        Command::Export => cmd_export(store),
    }
}

#[instrument(skip_all, fields(name = %name))]
fn cmd_add(
    store: &mut RosterStore,
    name: String,
    company: String,
    email: String,
    contact_number: String,
    manager: String,
    employee_id: String,
) -> anyhow::Result<()> {
    info!("command add");

    let mut roster = store.load_roster()?;
    if roster
        .iter()
        .any(|c| c.name.eq_ignore_ascii_case(&name))
    {
        return Err(anyhow!("candidate already on the roster: {name}"));
    }

    let mut candidate = Candidate::new(name);
    candidate.company = company;
    candidate.email = email;
    candidate.contact_number = contact_number;
    candidate.manager = manager;
    candidate.employee_id = employee_id;

    println!("Added candidate {} ({}).", candidate.name, candidate.id);
    roster.push(candidate);
    store.save_roster(&roster)?;

    debug!(roster_count = roster.len(), "candidate added");
    Ok(())
}

#[instrument(skip_all)]
fn cmd_list(
    store: &mut RosterStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");
    let roster = store.load_roster()?;
    renderer.print_roster_table(&roster, today)
}

#[instrument(skip(store, renderer, today))]
fn cmd_periods(
    store: &mut RosterStore,
    renderer: &mut Renderer,
    selector: &str,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command periods");
    let roster = store.load_roster()?;
    let candidate = resolve_candidate(&roster, selector)?;
    renderer.print_period_table(candidate, today)
}

#[instrument(skip(store, renderer, today))]
fn cmd_generate(
    store: &mut RosterStore,
    renderer: &mut Renderer,
    selector: &str,
    month: &str,
    force: bool,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command generate");

    let target: MonthKey = month
        .parse()
        .with_context(|| format!("invalid target month: {month}"))?;
    let roster = store.load_roster()?;
    let candidate = resolve_candidate(&roster, selector)?;

    // Manual requests surface conflicts instead of silently skipping.
    let existing = check_conflict(&candidate.timesheets, target);
    if existing.is_conflict() {
        println!(
            "{} already has {} period(s) for {}:",
            candidate.name,
            existing.matches.len(),
            target
        );
        for period in &existing.matches {
            println!(
                "  {} ending {}",
                period.sub_period().label(),
                period.period_ending.format("%Y-%m-%d")
            );
        }
        return Err(anyhow!("generation for {target} would duplicate an existing period"));
    }

    let early = early_generation_check(today, target);
    if early.should_warn {
        let note = format!(
            "note: {} is next month; automation would generate it on {}",
            target,
            early.automation_date.format("%Y-%m-%d")
        );
        println!("{}", renderer.warn_paint(&note));
        if !force {
            return Err(anyhow!(
                "refusing early generation for {target}; pass --force to override"
            ));
        }
    }

    let mut pair = generate_month(target.year, target.month0)?;
    pair.first_half.manager_name = candidate.manager.clone();
    pair.first_half.employee_id = candidate.employee_id.clone();
    pair.second_half.manager_name = candidate.manager.clone();
    pair.second_half.employee_id = candidate.employee_id.clone();

    let candidate_id = candidate.id;
    let name = candidate.name.clone();
    store.append_periods(candidate_id, vec![pair.first_half, pair.second_half])?;

    println!("Generated S1 and S2 periods for {name} ({target}).");
    Ok(())
}

#[instrument(skip_all)]
fn cmd_tick(store: &mut RosterStore, cfg: &Config, today: NaiveDate) -> anyhow::Result<()> {
    info!("command tick");

    let guard = store.load_last_processed()?;
    let decision = scheduler::decide(today, guard);

    match decision.action {
        SchedulerAction::GenerateFor(target) => {
            let roster = store.load_roster()?;
            let run = scheduler::run_generation(store, &roster, target)?;
            // The guard advances even when some candidates failed, so a
            // broken candidate cannot wedge the whole roster into retrying
            // every tick. Failed candidates stay conflict-free and can be
            // regenerated manually.
            if let Some(new_guard) = decision.new_guard {
                store.save_last_processed(new_guard)?;
            }
            println!(
                "Generated periods for {} ({} generated, {} skipped, {} failed).",
                target,
                run.generated.len(),
                run.skipped.len(),
                run.failed.len()
            );
            for name in &run.failed {
                println!("  failed: {name}");
            }
        }
        SchedulerAction::None => {
            debug!(?guard, "nothing to generate");
            println!("No generation due.");
        }
    }

    if cfg.get_bool("alerts").unwrap_or(true) {
        emit_alerts(store, today);
    }

    Ok(())
}

/// Alert emission is best-effort: a failure here must never block the
/// generation that already happened.
fn emit_alerts(store: &RosterStore, today: NaiveDate) {
    let roster = match store.load_roster() {
        Ok(roster) => roster,
        Err(err) => {
            warn!(error = %err, "skipping alerts; roster unavailable");
            return;
        }
    };

    if let Some(intent) = scheduler::alert_intent(&roster, today) {
        warn!(
            urgent = intent.urgent,
            overdue = intent.overdue,
            "periods need attention"
        );
        if intent.overdue > 0 {
            println!(
                "ALERT: {} period(s) overdue. S1 is due by the 15th, S2 by the 1st of the next month.",
                intent.overdue
            );
        }
        if intent.urgent > 0 {
            println!("ALERT: {} period(s) due within 2 days.", intent.urgent);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Mark {
    Downloaded,
    Uploaded,
}

#[instrument(skip(store, now))]
fn cmd_mark(
    store: &mut RosterStore,
    selector: &str,
    period_ending: &str,
    mark: Mark,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command mark");

    let ending = parse_iso_date(period_ending)?;
    let mut roster = store.load_roster()?;
    let candidate_id = resolve_candidate(&roster, selector)?.id;

    let candidate = roster_entry(&mut roster, candidate_id)?;
    let period = candidate
        .timesheets
        .iter_mut()
        .find(|p| p.period_ending == ending)
        .ok_or_else(|| anyhow!("no period ending {period_ending} for {selector}"))?;

    match mark {
        Mark::Downloaded => {
            period.downloaded = true;
            println!("Marked {} {} as downloaded.", selector, period_ending);
        }
        Mark::Uploaded => {
            period.mark_uploaded(now);
            println!("Marked {} {} as uploaded.", selector, period_ending);
        }
    }

    store.save_roster(&roster)?;
    Ok(())
}

#[instrument(skip(store))]
fn cmd_remove(
    store: &mut RosterStore,
    selector: &str,
    period_ending: Option<&str>,
) -> anyhow::Result<()> {
    info!("command remove");

    let mut roster = store.load_roster()?;
    let candidate_id = resolve_candidate(&roster, selector)?.id;

    match period_ending {
        Some(raw) => {
            let ending = parse_iso_date(raw)?;
            let candidate = roster_entry(&mut roster, candidate_id)?;
            let before = candidate.timesheets.len();
            candidate.timesheets.retain(|p| p.period_ending != ending);
            if candidate.timesheets.len() == before {
                return Err(anyhow!("no period ending {raw} for {selector}"));
            }
            println!("Removed period ending {raw} from {}.", candidate.name);
        }
        None => {
            roster.retain(|c| c.id != candidate_id);
            println!("Removed candidate {selector}.");
        }
    }

    store.save_roster(&roster)?;
    Ok(())
}

#[instrument(skip_all)]
fn cmd_status(
    store: &mut RosterStore,
    renderer: &mut Renderer,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command status");
    let roster = store.load_roster()?;
    let summary = pending_actions_summary(&roster, today);
    renderer.print_summary(&summary)
}

#[instrument(skip_all)]
fn cmd_export(store: &mut RosterStore) -> anyhow::Result<()> {
    info!("command export");
    let roster = store.load_roster()?;
    let payload = serde_json::to_string_pretty(&roster).context("failed to serialize roster")?;
    println!("{payload}");
    Ok(())
}

fn roster_entry(roster: &mut [Candidate], id: Uuid) -> anyhow::Result<&mut Candidate> {
    roster
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| anyhow!("candidate disappeared from roster: {id}"))
}

/// Resolves a candidate by UUID, exact name (case-insensitive), or unique
/// name prefix, in that order.
fn resolve_candidate<'a>(
    roster: &'a [Candidate],
    selector: &str,
) -> anyhow::Result<&'a Candidate> {
    if let Ok(id) = selector.parse::<Uuid>()
        && let Some(candidate) = roster.iter().find(|c| c.id == id)
    {
        return Ok(candidate);
    }

    if let Some(candidate) = roster
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(selector))
    {
        return Ok(candidate);
    }

    let needle = selector.to_ascii_lowercase();
    let mut matches = roster
        .iter()
        .filter(|c| c.name.to_ascii_lowercase().starts_with(&needle));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no candidate matches: {selector}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("candidate selector is ambiguous: {selector}"));
    }

    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::resolve_candidate;
    use crate::period::Candidate;

    #[test]
    fn selector_resolution_prefers_exact_then_prefix() {
        let roster = vec![
            Candidate::new("Morgan Reyes".to_string()),
            Candidate::new("Mo Farah".to_string()),
            Candidate::new("Jordan Li".to_string()),
        ];

        let exact = resolve_candidate(&roster, "mo farah").expect("exact match");
        assert_eq!(exact.name, "Mo Farah");

        let prefix = resolve_candidate(&roster, "Jor").expect("prefix match");
        assert_eq!(prefix.name, "Jordan Li");

        assert!(resolve_candidate(&roster, "Mo F").is_ok());
        assert!(resolve_candidate(&roster, "Mo").is_err());
        assert!(resolve_candidate(&roster, "Casey").is_err());

        let by_id = resolve_candidate(&roster, &roster[2].id.to_string()).expect("uuid match");
        assert_eq!(by_id.name, "Jordan Li");
    }
}

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::MonthKey;
use crate::period::{Candidate, Period};

/// File-backed roster storage: one candidate per JSONL line, plus the
/// scheduler's last-processed month key in its own file so the generation
/// guard survives process restarts.
#[derive(Debug)]
pub struct RosterStore {
    pub data_dir: PathBuf,
    pub roster_path: PathBuf,
    pub schedule_path: PathBuf,
}

impl RosterStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let roster_path = data_dir.join("roster.data");
        let schedule_path = data_dir.join("schedule.data");

        if !roster_path.exists() {
            fs::write(&roster_path, "")?;
        }
        if !schedule_path.exists() {
            fs::write(&schedule_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            roster = %roster_path.display(),
            schedule = %schedule_path.display(),
            "opened roster store"
        );

        Ok(Self {
            data_dir,
            roster_path,
            schedule_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_roster(&self) -> anyhow::Result<Vec<Candidate>> {
        debug!(file = %self.roster_path.display(), "loading roster");
        let file = fs::File::open(&self.roster_path)
            .with_context(|| format!("failed opening {}", self.roster_path.display()))?;
        let reader = BufReader::new(file);

        let mut out = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let candidate: Candidate = serde_json::from_str(trimmed).with_context(|| {
                format!(
                    "failed parsing {} line {}",
                    self.roster_path.display(),
                    idx + 1
                )
            })?;
            out.push(candidate);
        }

        debug!(count = out.len(), "loaded candidates");
        Ok(out)
    }

    #[tracing::instrument(skip(self, roster))]
    pub fn save_roster(&self, roster: &[Candidate]) -> anyhow::Result<()> {
        debug!(
            file = %self.roster_path.display(),
            count = roster.len(),
            "saving roster atomically"
        );

        let dir = self.roster_path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        for candidate in roster {
            let serialized = serde_json::to_string(candidate)?;
            writeln!(temp, "{serialized}")?;
        }
        temp.flush()?;

        temp.persist(&self.roster_path).map_err(|err| {
            anyhow!("failed to persist {}: {}", self.roster_path.display(), err)
        })?;

        Ok(())
    }

    /// Appends generated periods to one candidate, atomic per candidate:
    /// either the whole pair lands or nothing does.
    #[tracing::instrument(skip(self, candidate_id, periods), fields(candidate = %candidate_id, count = periods.len()))]
    pub fn append_periods(
        &self,
        candidate_id: Uuid,
        periods: Vec<Period>,
    ) -> anyhow::Result<()> {
        let mut roster = self.load_roster()?;
        let candidate = roster
            .iter_mut()
            .find(|c| c.id == candidate_id)
            .ok_or_else(|| anyhow!("candidate not found in roster: {candidate_id}"))?;

        candidate.timesheets.extend(periods);
        self.save_roster(&roster)?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn load_last_processed(&self) -> anyhow::Result<Option<MonthKey>> {
        let raw = fs::read_to_string(&self.schedule_path)
            .with_context(|| format!("failed reading {}", self.schedule_path.display()))?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let key = trimmed
            .parse::<MonthKey>()
            .with_context(|| format!("corrupt schedule guard in {}", self.schedule_path.display()))?;
        Ok(Some(key))
    }

    #[tracing::instrument(skip(self))]
    pub fn save_last_processed(&self, key: MonthKey) -> anyhow::Result<()> {
        debug!(guard = %key, "persisting schedule guard");
        fs::write(&self.schedule_path, key.to_string())
            .with_context(|| format!("failed writing {}", self.schedule_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::RosterStore;
    use crate::calendar::{MonthKey, generate_month};
    use crate::period::Candidate;

    #[test]
    fn roster_roundtrips_through_jsonl() {
        let temp = tempdir().expect("tempdir");
        let store = RosterStore::open(temp.path()).expect("open store");

        let mut candidate = Candidate::new("Morgan Reyes".to_string());
        candidate.company = "Acme Staffing".to_string();
        candidate.manager = "D. Okafor".to_string();
        candidate.employee_id = "E-1042".to_string();
        let id = candidate.id;

        store.save_roster(&[candidate]).expect("save roster");

        let pair = generate_month(2025, 0).expect("generate");
        store
            .append_periods(id, vec![pair.first_half, pair.second_half])
            .expect("append periods");

        let roster = store.load_roster().expect("load roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].timesheets.len(), 2);
        assert_eq!(roster[0].company, "Acme Staffing");
    }

    #[test]
    fn schedule_guard_survives_reopen() {
        let temp = tempdir().expect("tempdir");
        let key = MonthKey::new(2025, 1).expect("valid key");

        {
            let store = RosterStore::open(temp.path()).expect("open store");
            assert_eq!(store.load_last_processed().expect("load guard"), None);
            store.save_last_processed(key).expect("save guard");
        }

        let reopened = RosterStore::open(temp.path()).expect("reopen store");
        assert_eq!(reopened.load_last_processed().expect("load guard"), Some(key));
    }

    #[test]
    fn appending_to_a_missing_candidate_fails() {
        let temp = tempdir().expect("tempdir");
        let store = RosterStore::open(temp.path()).expect("open store");

        let pair = generate_month(2025, 0).expect("generate");
        let err = store.append_periods(uuid::Uuid::new_v4(), vec![pair.first_half]);
        assert!(err.is_err());
    }
}

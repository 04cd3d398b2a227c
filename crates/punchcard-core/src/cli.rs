use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "punchcard",
    version,
    about = "Punchcard: bi-monthly timesheet tracking for a candidate roster",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "punchcardrc")]
    pub punchcardrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a candidate to the roster
    Add {
        name: String,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        contact_number: String,
        #[arg(long, default_value = "")]
        manager: String,
        #[arg(long, default_value = "")]
        employee_id: String,
    },

    /// List candidates with their urgency counts
    List,

    /// Show one candidate's periods with due dates and status
    Periods { candidate: String },

    /// Manually generate the S1/S2 pair for a month (YYYY-MM)
    Generate {
        candidate: String,
        month: String,
        /// Proceed even when this preempts the monthly automation
        #[arg(long)]
        force: bool,
    },

    /// Run one scheduler tick: generate if due, then emit alerts
    Tick,

    /// Mark a period (by its YYYY-MM-DD ending) as downloaded
    MarkDownloaded {
        candidate: String,
        period_ending: String,
    },

    /// Mark a period (by its YYYY-MM-DD ending) as uploaded
    MarkUploaded {
        candidate: String,
        period_ending: String,
    },

    /// Remove a candidate, or just one period of theirs
    Remove {
        candidate: String,
        period_ending: Option<String>,
    },

    /// Roster-wide pending downloads/uploads/overdue summary
    Status,

    /// Dump the roster as JSON
    Export,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|err| anyhow!("failed to init tracing: {err}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli};

    #[test]
    fn parses_generate_with_overrides() {
        let cli = GlobalCli::parse_from([
            "punchcard",
            "-vv",
            "--rc",
            "color=off",
            "generate",
            "Morgan",
            "2025-02",
        ]);

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides.len(), 1);
        assert_eq!(cli.rc_overrides[0].key, "color");
        match cli.command {
            Command::Generate {
                candidate, month, ..
            } => {
                assert_eq!(candidate, "Morgan");
                assert_eq!(month, "2025-02");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

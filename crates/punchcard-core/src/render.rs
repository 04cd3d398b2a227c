use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::calendar::due_date;
use crate::config::Config;
use crate::conflict::{months_covered, period_month};
use crate::period::Candidate;
use crate::status::{PendingActions, Urgency, classify_by_due_date, urgency_status};

const RED: &str = "31";
const YELLOW: &str = "33";
const ORANGE: &str = "33;1";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, roster, today))]
    pub fn print_roster_table(
        &mut self,
        roster: &[Candidate],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "Name".to_string(),
            "Company".to_string(),
            "Manager".to_string(),
            "Periods".to_string(),
            "Urgent".to_string(),
            "Overdue".to_string(),
        ];

        let mut rows = Vec::with_capacity(roster.len());
        for candidate in roster {
            let counts = urgency_status(candidate, today);

            let urgent = if counts.urgent > 0 {
                self.paint(&counts.urgent.to_string(), ORANGE)
            } else {
                counts.urgent.to_string()
            };
            let overdue = if counts.overdue > 0 {
                self.paint(&counts.overdue.to_string(), RED)
            } else {
                counts.overdue.to_string()
            };

            rows.push(vec![
                candidate.name.clone(),
                candidate.company.clone(),
                candidate.manager.clone(),
                candidate.timesheets.len().to_string(),
                urgent,
                overdue,
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, candidate, today))]
    pub fn print_period_table(
        &mut self,
        candidate: &Candidate,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "{} ({})", candidate.name, candidate.company)?;

        for month in months_covered(&candidate.timesheets) {
            writeln!(out)?;
            writeln!(out, "{month}")?;

            let headers = vec![
                "Half".to_string(),
                "Ending".to_string(),
                "Due".to_string(),
                "Status".to_string(),
                "Downloaded".to_string(),
                "Uploaded".to_string(),
            ];

            let mut rows = Vec::new();
            for period in candidate
                .timesheets
                .iter()
                .filter(|p| period_month(p) == month)
            {
                let status = if period.uploaded {
                    "done".to_string()
                } else {
                    let urgency = classify_by_due_date(today, period.period_ending);
                    match urgency {
                        Urgency::Overdue => self.paint(urgency.label(), RED),
                        Urgency::Urgent => self.paint(urgency.label(), ORANGE),
                        Urgency::Normal => urgency.label().to_string(),
                    }
                };

                rows.push(vec![
                    period.sub_period().label().to_string(),
                    period.period_ending.format("%Y-%m-%d").to_string(),
                    due_date(period.period_ending).format("%Y-%m-%d").to_string(),
                    status,
                    mark(period.downloaded).to_string(),
                    mark(period.uploaded).to_string(),
                ]);
            }

            write_table(&mut out, headers, rows)?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, summary))]
    pub fn print_summary(&mut self, summary: &PendingActions) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "pending downloads  {}", summary.pending_downloads)?;
        writeln!(out, "pending uploads    {}", summary.pending_uploads)?;

        let overdue = summary.overdue_periods.to_string();
        let overdue = if summary.overdue_periods > 0 {
            self.paint(&overdue, RED)
        } else {
            overdue
        };
        writeln!(out, "overdue periods    {overdue}")?;

        Ok(())
    }

    pub fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    pub fn warn_paint(&self, text: &str) -> String {
        self.paint(text, YELLOW)
    }
}

fn mark(flag: bool) -> &'static str {
    if flag { "yes" } else { "-" }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

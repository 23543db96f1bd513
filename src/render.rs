use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use comfy_table::{ContentArrangement, Table};
use rand::seq::IndexedRandom;
use serde::Deserialize;

use crate::filter::FilterSet;
use crate::normalize::{NormalizedEvent, Severity};
use crate::pipeline::RunSummary;
use crate::tree::Node;

pub const RED: &str = "31";
pub const GREEN: &str = "32";
pub const YELLOW: &str = "33";
pub const CYAN: &str = "36";
pub const WHITE: &str = "37";

pub const NO_EVENT_DATA_FOUND: &str = "No Event Data Found.";

const LOGO: &str = r"
    __                ____                           __
   / /   ____  ____ _/  _/___  _________  ___  _____/ /_
  / /   / __ \/ __ `// // __ \/ ___/ __ \/ _ \/ ___/ __/
 / /___/ /_/ / /_/ // // / / (__  ) /_/ /  __/ /__/ /_
/_____/\____/\__, /___/_/ /_/____/ .___/\___/\___/\__/
            /____/              /_/
";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent { Random, Red, Green, Yellow, Blue, Cyan, Magenta, White }

const ACCENT_CHOICES: [Accent; 7] = [Accent::Red, Accent::Green, Accent::Yellow, Accent::Blue, Accent::Cyan, Accent::Magenta, Accent::White];

impl Accent {
    fn code(self) -> &'static str {
        match self {
            Accent::Red => RED,
            Accent::Green => GREEN,
            Accent::Yellow => YELLOW,
            Accent::Blue => "34",
            Accent::Magenta => "35",
            Accent::Cyan => CYAN,
            Accent::White | Accent::Random => WHITE,
        }
    }
}

/// Display settings chosen once at startup and handed to every render call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub accent: Accent,
    pub enabled: bool,
}

impl Palette {
    /// Resolves [`Accent::Random`] to a concrete colour.
    pub fn new(accent: Accent, enabled: bool) -> Self {
        let accent = match accent {
            Accent::Random => *ACCENT_CHOICES.choose(&mut rand::rng()).unwrap_or(&Accent::Cyan),
            a => a,
        };
        Self { accent, enabled }
    }

    #[cfg(test)]
    pub fn plain() -> Self { Self { accent: Accent::White, enabled: false } }

    pub fn paint(&self, s: &str, code: &str) -> String {
        if self.enabled { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
    }

    pub fn accent(&self, s: &str) -> String { self.paint(s, self.accent.code()) }
}

pub fn sev_code(sev: Severity) -> &'static str {
    match sev {
        Severity::Information => GREEN,
        Severity::Warning => YELLOW,
        Severity::Error => RED,
        _ => WHITE,
    }
}

fn level_display(e: &NormalizedEvent) -> String {
    let sev = e.severity();
    if sev != Severity::Other && e.level.trim().chars().all(|c| c.is_ascii_digit()) {
        format!("{} ({})", e.level, sev.name())
    } else {
        e.level.clone()
    }
}

fn cell(node: Option<&Node>) -> String {
    if let Some(t) = node.and_then(Node::text) { return t.to_string(); }
    match node {
        Some(n @ (Node::Map(_) | Node::List(_))) => serde_json::to_string(n).unwrap_or_default(),
        _ => "N/A".to_string(),
    }
}

fn table(rows: Vec<[String; 2]>) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    for row in rows { table.add_row(row.to_vec()); }
    table.to_string()
}

/// Text block for an event's data: a Field/Value table for named items, the
/// raw text for a single string, or [`NO_EVENT_DATA_FOUND`].
pub fn event_data_block(data: Option<&Node>) -> String {
    match data.and_then(|d| d.get("Data")) {
        Some(Node::List(items)) => {
            let rows = items
                .iter()
                .map(|item| match item {
                    Node::Text(t) => ["N/A".to_string(), t.clone()],
                    other => [other.attr("Name").unwrap_or("N/A").to_string(), cell(other.get(crate::tree::TEXT_KEY))],
                })
                .collect();
            table(rows)
        }
        Some(item @ Node::Map(entries)) => {
            let rows = match item.attr("Name") {
                Some(name) => vec![[name.to_string(), cell(item.get(crate::tree::TEXT_KEY))]],
                None => entries.iter().map(|(k, v)| [k.clone(), cell(Some(v))]).collect(),
            };
            table(rows)
        }
        Some(Node::Text(t)) => t.clone(),
        _ => NO_EVENT_DATA_FOUND.to_string(),
    }
}

pub fn render_event<W: Write>(out: &mut W, p: &Palette, e: &NormalizedEvent) -> io::Result<()> {
    let sev = sev_code(e.severity());
    writeln!(out, "{}", p.paint(&"=".repeat(60), sev))?;
    writeln!(out)?;
    let fields: [(&str, String); 9] = [
        ("Log Name     :", e.log_name.clone()),
        ("Event ID     :", e.event_id.clone()),
        ("Source       :", e.source.clone()),
        ("Task Category:", e.task_category.clone()),
        ("Level        :", p.paint(&level_display(e), sev)),
        ("Version      :", e.version.clone()),
        ("Computer     :", e.computer.clone()),
        ("User         :", e.user.clone()),
        ("Timestamp    :", e.timestamp.clone()),
    ];
    for (label, value) in fields {
        writeln!(out, "{} {}", p.accent(label), value)?;
    }
    writeln!(out, "{}", p.accent("Event Data   :"))?;
    writeln!(out, "{}", event_data_block(e.event_data.as_ref()))?;
    writeln!(out)
}

pub fn render_banner<W: Write>(out: &mut W, p: &Palette) -> io::Result<()> {
    writeln!(out, "{}", p.accent(LOGO))
}

pub fn render_arguments<W: Write>(out: &mut W, p: &Palette, path: &Path, filters: &FilterSet) -> io::Result<()> {
    writeln!(out, "{}", p.accent(&format!("{:=^60}", "[Arguments]")))?;
    writeln!(out, "{}", p.accent(&format!("{:<14}: {}", "File Path", path.display())))?;
    for (label, value) in filters.describe() {
        writeln!(out, "{}", p.accent(&format!("{:<14}: {}", label, value)))?;
    }
    writeln!(out)
}

pub fn render_summary<W: Write>(out: &mut W, p: &Palette, s: &RunSummary) -> io::Result<()> {
    writeln!(out, "{}", p.paint(&format!("{} of {} events matched", s.matched, s.scanned), CYAN))
}

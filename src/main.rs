use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, ColorChoice, CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use is_terminal::IsTerminal;
use serde::Deserialize;

mod event_xml;
mod filter;
mod normalize;
mod pipeline;
mod render;
mod tree;

use filter::FilterSet;
use pipeline::{InspectError, inspect_path};
use render::{Accent, Palette, RED};

const DEFAULT_CONFIG: &str = "loginspect.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(
    name = "loginspect",
    about = "Parse .evtx files with optional filters",
    long_about = "Reads a Windows Event Log (.evtx) file and prints each event that passes every supplied filter.",
    after_long_help = "Examples:\n  loginspect Security.evtx --event_id 4624 --level Information\n  loginspect System.evtx --keyword disk --start_time 2024-01-01T00:00:00 --end_time 2024-12-31T23:59:59\n  loginspect Application.evtx --level Error --no-color > errors.txt",
    color = ColorChoice::Auto
)]
struct Args {
    /// Path to the .evtx file to parse
    file_path: Option<PathBuf>,
    /// Filter by Event ID
    #[arg(long = "event_id", visible_alias = "event-id")]
    event_id: Option<u32>,
    /// Filter by keyword in Event Data (case-insensitive)
    #[arg(long, short = 'k')]
    keyword: Option<String>,
    /// Filter by event level (e.g. Information, Warning, Error)
    #[arg(long, short = 'l')]
    level: Option<String>,
    /// Events at or after this time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long = "start_time", visible_alias = "start-time")]
    start_time: Option<String>,
    /// Events at or before this time (YYYY-MM-DDTHH:MM:SS)
    #[arg(long = "end_time", visible_alias = "end-time")]
    end_time: Option<String>,
    /// Banner and label colour (random when unset)
    #[arg(long, value_enum)]
    accent: Option<Accent>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long, default_value_t = false)]
    no_banner: bool,
    #[arg(long, default_value_t = false)]
    progress: bool,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    /// TOML file with default filters and display options
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<PathBuf>,
}

impl Args {
    fn filter_set(&self) -> FilterSet {
        FilterSet::new(self.event_id, self.keyword.clone(), self.level.clone(), self.start_time.clone(), self.end_time.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    event_id: Option<u32>,
    keyword: Option<String>,
    level: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    accent: Option<Accent>,
    no_color: Option<bool>,
    force_color: Option<bool>,
    no_banner: Option<bool>,
    progress: Option<bool>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        let mut cmd = Args::command();
        if let Some(path) = args.completions_out.as_ref() {
            let mut f = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            clap_complete::generate(sh, &mut cmd, "loginspect", &mut f);
        } else {
            clap_complete::generate(sh, &mut cmd, "loginspect", &mut std::io::stdout());
        }
        return Ok(());
    }
    if let Some(cfg) = load_config(args.config.as_deref()) { apply_config(&mut args, cfg); }
    init_logging(&args);

    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let enable_color = if args.force_color { true } else { color_default && !args.no_color };
    let palette = Palette::new(args.accent.unwrap_or(Accent::Random), enable_color);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if !args.no_banner { render::render_banner(&mut out, &palette)?; }
    let Some(path) = args.file_path.clone() else {
        write!(out, "{}", Args::command().render_long_help())?;
        return Ok(());
    };
    let filters = args.filter_set();
    if filters.is_empty() { log::info!("No filters supplied, every event will be shown"); } else { log::debug!("Active filters: {:?}", filters); }
    render::render_arguments(&mut out, &palette, &path, &filters)?;
    match inspect_path(&path, &filters, &palette, &mut out, args.progress) {
        Ok(summary) => render::render_summary(&mut out, &palette, &summary)?,
        Err(InspectError::NotFound(p)) => {
            log::warn!("Missing EVTX: {}", p.display());
            writeln!(out, "{}", palette.paint(&format!("File not found: {}", p.display()), RED))?;
        }
        Err(e) => writeln!(out, "{}", palette.paint(&format!("Error parsing the file: {e}"), RED))?,
    }
    Ok(())
}

/// Reads the explicit config path, or `loginspect.toml` in the working
/// directory when no path was given. An unreadable default is not an error.
fn load_config(path: Option<&Path>) -> Option<AppConfig> {
    let (p, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let s = match std::fs::read_to_string(&p) {
        Ok(s) => s,
        Err(e) => {
            if explicit { eprintln!("Failed to read config {}: {}", p.display(), e); }
            return None;
        }
    };
    match toml::from_str::<AppConfig>(&s) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("Failed to parse config {}: {}", p.display(), e);
            None
        }
    }
}

/// Config values fill in whatever the command line left unset.
fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.event_id.is_none() && let Some(v) = cfg.event_id { args.event_id = Some(v); }
    if args.keyword.is_none() && let Some(v) = cfg.keyword { args.keyword = Some(v); }
    if args.level.is_none() && let Some(v) = cfg.level { args.level = Some(v); }
    if args.start_time.is_none() && let Some(v) = cfg.start_time { args.start_time = Some(v); }
    if args.end_time.is_none() && let Some(v) = cfg.end_time { args.end_time = Some(v); }
    if args.accent.is_none() && let Some(v) = cfg.accent { args.accent = Some(v); }
    if let Some(v) = cfg.no_color { args.no_color |= v; }
    if let Some(v) = cfg.force_color { args.force_color |= v; }
    if let Some(v) = cfg.no_banner { args.no_banner |= v; }
    if let Some(v) = cfg.progress { args.progress |= v; }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn level_filter(args: &Args) -> Option<log::LevelFilter> {
    if args.quiet { return Some(log::LevelFilter::Error); }
    if let Some(lvl) = args.log_level {
        return Some(match lvl {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        });
    }
    match args.verbose {
        0 => None,
        1 => Some(log::LevelFilter::Info),
        2 => Some(log::LevelFilter::Debug),
        _ => Some(log::LevelFilter::Trace),
    }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if let Some(f) = level_filter(args) { builder.filter_level(f); }
    if let Some(fmt) = args.log_format {
        match fmt {
            LogFormat::Json => {
                builder.format(|buf, record| {
                    let ts = chrono::Local::now().to_rfc3339();
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                });
            }
            LogFormat::Text => {
                builder.format(|buf, record| {
                    let ts = chrono::Local::now().format("%H:%M:%S");
                    writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
                });
            }
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }
    builder.init();
}

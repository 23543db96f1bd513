use std::io::Write;
use std::path::{Path, PathBuf};

use evtx::{EvtxParser, ParserSettings};
use indicatif::ProgressBar;

use crate::event_xml::{TreeError, parse_record};
use crate::filter::FilterSet;
use crate::normalize::normalize;
use crate::render::{CYAN, Palette, render_event};

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{0}")]
    Container(#[from] evtx::err::EvtxError),
    #[error("record {index}: {source}")]
    Record { index: usize, source: TreeError },
    #[error("output failed: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub matched: usize,
}

/// Opens `path`, streams its records through the filters, and writes every
/// accepted event to `out`. A missing file is reported before anything is
/// opened; the first unreadable record ends the run.
pub fn inspect_path<W: Write>(path: &Path, filters: &FilterSet, palette: &Palette, out: &mut W, progress: bool) -> Result<RunSummary, InspectError> {
    if !path.exists() { return Err(InspectError::NotFound(path.to_path_buf())); }
    let mut parser = EvtxParser::from_path(path)?.with_configuration(ParserSettings::new().num_threads(1));
    log::debug!("Opened EVTX {}", path.display());
    writeln!(out, "{}", palette.paint(&format!("Parsing {}...", path.display()), CYAN))?;
    writeln!(out)?;
    let records = parser.records().map(|r| r.map(|rec| rec.data).map_err(InspectError::from));
    process_records(records, filters, palette, out, progress)
}

/// Parse, normalize, filter and render each record in order.
pub fn process_records<I, W>(records: I, filters: &FilterSet, palette: &Palette, out: &mut W, progress: bool) -> Result<RunSummary, InspectError>
where
    I: IntoIterator<Item = Result<String, InspectError>>,
    W: Write,
{
    let pb = if progress { Some(ProgressBar::new_spinner()) } else { None };
    let mut summary = RunSummary::default();
    let result = (|| -> Result<(), InspectError> {
        for r in records {
            summary.scanned += 1;
            if let Some(ref pb) = pb && summary.scanned % 500 == 0 {
                pb.tick();
                pb.set_message(format!("Scanned {} records", summary.scanned));
            }
            let xml = r?;
            let tree = parse_record(&xml).map_err(|source| InspectError::Record { index: summary.scanned, source })?;
            let event = normalize(&tree);
            if !filters.accepts(&event) { continue; }
            summary.matched += 1;
            render_event(out, palette, &event)?;
        }
        Ok(())
    })();
    if let Some(pb) = pb { pb.finish_and_clear(); }
    match result {
        Ok(()) => {
            log::info!("Scanned {} records, {} matched", summary.scanned, summary.matched);
            Ok(summary)
        }
        Err(e) => {
            log::error!("Aborted after {} records ({} matched): {}", summary.scanned, summary.matched, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: u32, level: &str, user: &str) -> Result<String, InspectError> {
        Ok(format!(
            "<Event><System><Provider Name=\"Microsoft-Windows-Security-Auditing\"/><EventID>{id}</EventID><Level>{level}</Level><TimeCreated SystemTime=\"2024-06-0{id}T12:00:00.000000Z\"/><Channel>Security</Channel></System><EventData><Data Name=\"TargetUserName\">{user}</Data></EventData></Event>"
        ))
    }

    fn run(records: Vec<Result<String, InspectError>>, filters: &FilterSet) -> (Result<RunSummary, InspectError>, String) {
        let mut out = Vec::new();
        let r = process_records(records, filters, &Palette::plain(), &mut out, false);
        (r, String::from_utf8(out).unwrap())
    }

    #[test]
    fn no_filters_render_every_record() {
        let (r, out) = run(vec![rec(1, "Information", "alice"), rec(2, "Warning", "bob"), rec(3, "Error", "carol")], &FilterSet::default());
        assert_eq!(r.unwrap(), RunSummary { scanned: 3, matched: 3 });
        assert_eq!(out.matches("Log Name").count(), 3);
    }

    #[test]
    fn level_filter_selects_single_warning() {
        let f = FilterSet::new(None, None, Some("Warning".to_string()), None, None);
        let (r, out) = run(vec![rec(1, "Information", "alice"), rec(2, "Warning", "bob"), rec(3, "Error", "carol")], &f);
        assert_eq!(r.unwrap(), RunSummary { scanned: 3, matched: 1 });
        assert_eq!(out.matches("Log Name").count(), 1);
        assert!(out.contains("bob"));
        assert!(!out.contains("alice"));
    }

    #[test]
    fn combined_filters_are_conjunctive() {
        let f = FilterSet::new(Some(3), Some("CAROL".to_string()), Some("error".to_string()), Some("2024-06-03T12:00:00.000000Z".to_string()), Some("2024-06-03T12:00:00.000000Z".to_string()));
        let (r, _) = run(vec![rec(1, "Error", "carol"), rec(2, "Error", "carol"), rec(3, "Error", "carol")], &f);
        assert_eq!(r.unwrap().matched, 1);
    }

    #[test]
    fn malformed_record_aborts_the_run() {
        let records = vec![rec(1, "Information", "alice"), Ok("<Event><System></Event>".to_string()), rec(3, "Information", "carol")];
        let (r, out) = run(records, &FilterSet::default());
        assert!(matches!(r, Err(InspectError::Record { index: 2, .. })));
        assert!(out.contains("alice"));
        assert!(!out.contains("carol"));
    }

    #[test]
    fn reader_error_aborts_the_run() {
        let records = vec![rec(1, "Information", "alice"), Err(InspectError::Output(std::io::Error::other("bad chunk"))), rec(3, "Information", "carol")];
        let (r, out) = run(records, &FilterSet::default());
        assert!(r.unwrap_err().to_string().contains("bad chunk"));
        assert!(!out.contains("carol"));
    }

    #[test]
    fn missing_file_is_reported_before_reading() {
        let p = std::env::temp_dir().join("loginspect_does_not_exist.evtx");
        let _ = std::fs::remove_file(&p);
        let mut out = Vec::new();
        let r = inspect_path(&p, &FilterSet::default(), &Palette::plain(), &mut out, false);
        assert!(matches!(r, Err(InspectError::NotFound(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn non_evtx_file_is_a_container_error() {
        let p = std::env::temp_dir().join("loginspect_not_evtx.evtx");
        std::fs::write(&p, b"this is not an event log container").unwrap();
        let mut out = Vec::new();
        let r = inspect_path(&p, &FilterSet::default(), &Palette::plain(), &mut out, false);
        assert!(matches!(r, Err(InspectError::Container(_))));
        let _ = std::fs::remove_file(&p);
    }
}

use crate::normalize::{NormalizedEvent, Severity};

/// Optional predicates over a [`NormalizedEvent`], built once per run.
/// A `None` field imposes no constraint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub event_id: Option<String>,
    pub keyword: Option<String>,
    pub level: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl FilterSet {
    pub fn new(event_id: Option<u32>, keyword: Option<String>, level: Option<String>, start_time: Option<String>, end_time: Option<String>) -> Self {
        Self {
            event_id: event_id.map(|id| id.to_string()),
            keyword: active(keyword),
            level: active(level),
            start_time: active(start_time),
            end_time: active(end_time),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.event_id.is_none() && self.keyword.is_none() && self.level.is_none() && self.start_time.is_none() && self.end_time.is_none()
    }

    /// True when every active predicate holds.
    pub fn accepts(&self, e: &NormalizedEvent) -> bool {
        self.pass_event_id(e) && self.pass_level(e) && self.pass_time(e) && self.pass_keyword(e)
    }

    fn pass_event_id(&self, e: &NormalizedEvent) -> bool {
        self.event_id.as_ref().is_none_or(|id| *id == e.event_id)
    }

    fn pass_keyword(&self, e: &NormalizedEvent) -> bool {
        self.keyword.as_ref().is_none_or(|k| e.event_data_text().to_lowercase().contains(&k.to_lowercase()))
    }

    fn pass_level(&self, e: &NormalizedEvent) -> bool {
        self.level.as_ref().is_none_or(|l| {
            let sev = e.severity();
            l.eq_ignore_ascii_case(&e.level) || (sev != Severity::Other && l.eq_ignore_ascii_case(sev.name()))
        })
    }

    // Lexical comparison: ISO-8601 strings of equal precision sort chronologically.
    fn pass_time(&self, e: &NormalizedEvent) -> bool {
        if let Some(start) = self.start_time.as_ref() && e.timestamp.as_str() < start.as_str() { return false; }
        if let Some(end) = self.end_time.as_ref() && e.timestamp.as_str() > end.as_str() { return false; }
        true
    }

    /// Active predicates as label/value pairs, in display order.
    pub fn describe(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(v) = self.event_id.as_deref() { out.push(("Event ID", v)); }
        if let Some(v) = self.keyword.as_deref() { out.push(("Keyword", v)); }
        if let Some(v) = self.level.as_deref() { out.push(("Level", v)); }
        if let Some(v) = self.start_time.as_deref() { out.push(("Start Time", v)); }
        if let Some(v) = self.end_time.as_deref() { out.push(("End Time", v)); }
        out
    }
}

// Blank values impose no constraint.
fn active(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

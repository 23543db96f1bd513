use crate::tree::Node;

pub const UNKNOWN_LOG: &str = "Unknown Log";
pub const UNKNOWN_SOURCE: &str = "Unknown Source";
pub const UNKNOWN_TASK: &str = "Unknown Task";
pub const UNKNOWN_LEVEL: &str = "Unknown Level";
pub const UNKNOWN_VERSION: &str = "Unknown Version";
pub const UNKNOWN_DOMAIN: &str = "Unknown Domain";
pub const UNKNOWN_USER: &str = "Unknown User";

/// String form of absent event data, as seen by the keyword filter.
pub const NO_EVENT_DATA: &str = "None";

/// Fixed-shape view of one record. Every field is populated, with a default
/// where the record lacks it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub log_name: String,
    pub event_id: String,
    pub source: String,
    pub task_category: String,
    pub level: String,
    pub version: String,
    pub computer: String,
    pub user: String,
    pub timestamp: String,
    pub event_data: Option<Node>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity { Critical, Error, Warning, Information, Verbose, Other }

impl Severity {
    /// Accepts level names in any case and the numeric codes Windows writes
    /// into `<Level>`.
    pub fn from_level(level: &str) -> Self {
        let l = level.trim();
        match l {
            "1" => return Severity::Critical,
            "2" => return Severity::Error,
            "3" => return Severity::Warning,
            "0" | "4" => return Severity::Information,
            "5" => return Severity::Verbose,
            _ => {}
        }
        [Severity::Critical, Severity::Error, Severity::Warning, Severity::Information, Severity::Verbose]
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(l))
            .unwrap_or(Severity::Other)
    }

    pub fn name(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Information => "Information",
            Severity::Verbose => "Verbose",
            Severity::Other => "Other",
        }
    }
}

impl NormalizedEvent {
    pub fn severity(&self) -> Severity { Severity::from_level(&self.level) }

    /// Event data as one searchable string: its JSON rendering, or
    /// [`NO_EVENT_DATA`] when the record has none.
    pub fn event_data_text(&self) -> String {
        match &self.event_data {
            Some(node) => serde_json::to_string(node).unwrap_or_default(),
            None => NO_EVENT_DATA.to_string(),
        }
    }
}

fn field(system: Option<&Node>, key: &str, default: &str) -> String {
    system
        .and_then(|s| s.get(key))
        .and_then(Node::text)
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

fn attr(system: Option<&Node>, key: &str, name: &str, default: &str) -> String {
    system
        .and_then(|s| s.get(key))
        .and_then(|n| n.attr(name))
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// Builds a [`NormalizedEvent`] from a record tree. Never fails: missing or
/// oddly shaped data falls back to the field default.
pub fn normalize(tree: &Node) -> NormalizedEvent {
    let system = tree.path(&["Event", "System"]);
    let event_data = tree
        .path(&["Event", "EventData"])
        .filter(|d| !d.is_empty())
        .cloned();
    NormalizedEvent {
        log_name: field(system, "Channel", UNKNOWN_LOG),
        event_id: field(system, "EventID", ""),
        source: attr(system, "Provider", "Name", UNKNOWN_SOURCE),
        task_category: field(system, "Task", UNKNOWN_TASK),
        level: field(system, "Level", UNKNOWN_LEVEL),
        version: field(system, "Version", UNKNOWN_VERSION),
        computer: field(system, "Computer", UNKNOWN_DOMAIN),
        user: attr(system, "Security", "UserID", UNKNOWN_USER),
        timestamp: attr(system, "TimeCreated", "SystemTime", ""),
        event_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_xml::parse_record;

    const FULL: &str = r#"<Event xmlns="http://schemas.microsoft.com/win/2004/08/events/event"><System><Provider Name="Microsoft-Windows-Security-Auditing"/><EventID Qualifiers="0">4625</EventID><Version>2</Version><Level>Error</Level><Task>Logon</Task><TimeCreated SystemTime="2024-05-02T10:00:00.000000Z"/><Channel>Security</Channel><Computer>WS01.corp.local</Computer><Security UserID="S-1-5-18"/></System><EventData><Data Name="TargetUserName">Administrator</Data></EventData></Event>"#;

    #[test]
    fn extracts_every_system_field() {
        let e = normalize(&parse_record(FULL).unwrap());
        assert_eq!(e.log_name, "Security");
        assert_eq!(e.event_id, "4625");
        assert_eq!(e.source, "Microsoft-Windows-Security-Auditing");
        assert_eq!(e.task_category, "Logon");
        assert_eq!(e.level, "Error");
        assert_eq!(e.version, "2");
        assert_eq!(e.computer, "WS01.corp.local");
        assert_eq!(e.user, "S-1-5-18");
        assert_eq!(e.timestamp, "2024-05-02T10:00:00.000000Z");
        assert!(e.event_data.is_some());
    }

    #[test]
    fn missing_fields_take_documented_defaults() {
        let e = normalize(&parse_record("<Event><System><EventID>7</EventID></System></Event>").unwrap());
        assert_eq!(e.event_id, "7");
        assert_eq!(e.log_name, UNKNOWN_LOG);
        assert_eq!(e.source, UNKNOWN_SOURCE);
        assert_eq!(e.task_category, UNKNOWN_TASK);
        assert_eq!(e.level, UNKNOWN_LEVEL);
        assert_eq!(e.version, UNKNOWN_VERSION);
        assert_eq!(e.computer, UNKNOWN_DOMAIN);
        assert_eq!(e.user, UNKNOWN_USER);
        assert_eq!(e.timestamp, "");
        assert_eq!(e.event_data, None);
        assert_eq!(e.event_data_text(), NO_EVENT_DATA);
    }

    #[test]
    fn empty_elements_count_as_missing() {
        let e = normalize(&parse_record("<Event><System><Task/><Computer></Computer><Security/></System><EventData/></Event>").unwrap());
        assert_eq!(e.task_category, UNKNOWN_TASK);
        assert_eq!(e.computer, UNKNOWN_DOMAIN);
        assert_eq!(e.user, UNKNOWN_USER);
        assert_eq!(e.event_data, None);
    }

    #[test]
    fn non_event_root_yields_all_defaults() {
        let e = normalize(&parse_record("<Other><System><Channel>X</Channel></System></Other>").unwrap());
        assert_eq!(e.log_name, UNKNOWN_LOG);
        assert_eq!(e.event_id, "");
    }

    #[test]
    fn misshapen_provider_falls_back() {
        // Provider present as plain text instead of carrying a Name attribute.
        let e = normalize(&parse_record("<Event><System><Provider>Disk</Provider><TimeCreated>now</TimeCreated></System></Event>").unwrap());
        assert_eq!(e.source, UNKNOWN_SOURCE);
        assert_eq!(e.timestamp, "");
    }

    #[test]
    fn event_id_is_not_coerced() {
        let e = normalize(&parse_record("<Event><System><EventID>0042</EventID></System></Event>").unwrap());
        assert_eq!(e.event_id, "0042");
    }

    #[test]
    fn severity_from_names_and_codes() {
        assert_eq!(Severity::from_level("warning"), Severity::Warning);
        assert_eq!(Severity::from_level("2"), Severity::Error);
        assert_eq!(Severity::from_level("4"), Severity::Information);
        assert_eq!(Severity::from_level("1"), Severity::Critical);
        assert_eq!(Severity::from_level(UNKNOWN_LEVEL), Severity::Other);
    }

    #[test]
    fn event_data_text_contains_values() {
        let e = normalize(&parse_record(FULL).unwrap());
        assert!(e.event_data_text().contains("Administrator"));
    }
}

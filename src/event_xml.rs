use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event as XmlEvent};

use crate::tree::{Node, TEXT_KEY};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attr(#[from] AttrError),
    #[error("element <{0}> is never closed")]
    Unclosed(String),
    #[error("more than one root element (found <{0}>)")]
    MultipleRoots(String),
    #[error("record contains no XML element")]
    NoRoot,
}

struct Frame {
    name: String,
    entries: Vec<(String, Node)>,
    text: String,
}

impl Frame {
    fn open(e: &BytesStart) -> Result<Self, TreeError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut entries = Vec::new();
        for a in e.attributes() {
            let a = a?;
            let k = String::from_utf8_lossy(a.key.as_ref());
            let v = a.unescape_value()?.into_owned();
            Node::push_entry(&mut entries, format!("@{k}"), Node::Text(v));
        }
        Ok(Frame { name, entries, text: String::new() })
    }

    fn close(self) -> (String, Node) {
        let text = self.text.trim().to_string();
        let node = match (self.entries.is_empty(), text.is_empty()) {
            (true, true) => Node::Empty,
            (true, false) => Node::Text(text),
            (false, _) => {
                let mut entries = self.entries;
                if !text.is_empty() { entries.push((TEXT_KEY.to_string(), Node::Text(text))); }
                Node::Map(entries)
            }
        };
        (self.name, node)
    }
}

/// Parses one record's XML into a [`Node`] tree rooted at a single-entry map
/// (`{"Event": {...}}` for a Windows event).
pub fn parse_record(xml: &str) -> Result<Node, TreeError> {
    let mut reader = Reader::from_str(xml);
    let cfg = reader.config_mut();
    cfg.trim_text(true);
    cfg.check_end_names = true;
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Node)> = None;
    loop {
        match reader.read_event()? {
            XmlEvent::Start(e) => stack.push(Frame::open(&e)?),
            XmlEvent::Empty(e) => {
                let (name, node) = Frame::open(&e)?.close();
                attach(&mut stack, &mut root, name, node)?;
            }
            XmlEvent::End(_) => {
                if let Some(frame) = stack.pop() {
                    let (name, node) = frame.close();
                    attach(&mut stack, &mut root, name, node)?;
                }
            }
            XmlEvent::Text(t) => {
                if let Some(top) = stack.last_mut() { top.text.push_str(&t.unescape()?); }
            }
            XmlEvent::CData(c) => {
                if let Some(top) = stack.last_mut() { top.text.push_str(&String::from_utf8_lossy(&c.into_inner())); }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }
    if let Some(open) = stack.pop() { return Err(TreeError::Unclosed(open.name)); }
    let (name, node) = root.ok_or(TreeError::NoRoot)?;
    Ok(Node::Map(vec![(name, node)]))
}

fn attach(stack: &mut [Frame], root: &mut Option<(String, Node)>, name: String, node: Node) -> Result<(), TreeError> {
    if let Some(parent) = stack.last_mut() {
        Node::push_entry(&mut parent.entries, name, node);
        Ok(())
    } else if root.is_some() {
        Err(TreeError::MultipleRoots(name))
    } else {
        *root = Some((name, node));
        Ok(())
    }
}

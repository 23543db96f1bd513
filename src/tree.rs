use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Key under which an element's text content is stored once it also carries
/// attributes or child elements.
pub const TEXT_KEY: &str = "#text";

/// One record's XML as a loosely shaped tree.
///
/// Attributes live under `@name` keys, repeated sibling elements are grouped
/// into a [`Node::List`], and an element holding only text collapses to
/// [`Node::Text`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Map(Vec<(String, Node)>),
    List(Vec<Node>),
    Empty,
}

impl Node {
    /// Child of a map by key. Any other shape has no children.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Walks `keys` from this node; `None` as soon as a step is missing.
    pub fn path(&self, keys: &[&str]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Scalar value of the node: the text itself, or the `#text` entry of a
    /// map (an element with attributes such as `<EventID Qualifiers="0">`).
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s.as_str()),
            Node::Map(_) => self.get(TEXT_KEY).and_then(Node::text),
            _ => None,
        }
    }

    /// Value of the attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.get(&format!("@{name}")).and_then(Node::text)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Text(s) => s.is_empty(),
            Node::Map(entries) => entries.is_empty(),
            Node::List(items) => items.is_empty(),
        }
    }

    /// Inserts `value` under `key`, turning a repeated key into a list.
    pub(crate) fn push_entry(entries: &mut Vec<(String, Node)>, key: String, value: Node) {
        if let Some((_, existing)) = entries.iter_mut().find(|(k, _)| *k == key) {
            match existing {
                Node::List(items) => items.push(value),
                other => {
                    let first = std::mem::replace(other, Node::Empty);
                    *other = Node::List(vec![first, value]);
                }
            }
        } else {
            entries.push((key, value));
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Text(s) => serializer.serialize_str(s),
            Node::Empty => serializer.serialize_none(),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items { seq.serialize_element(item)?; }
                seq.end()
            }
            Node::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries { map.serialize_entry(k, v)?; }
                map.end()
            }
        }
    }
}

// Wire payload normalization
//
// The backend serializes the same logical field in several shapes (plain
// strings, DynamoDB-style `{"S": ..}` wrappers, `{"value": ..}` wrappers,
// numbers). Everything here is pure: malformed input degrades to defaults
// and is never reported as an error.

use super::{Edge, Node};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

/// A loosely-typed text field as it appears on the wire
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireText {
    Plain(String),
    Number(serde_json::Number),
    Dynamo {
        #[serde(rename = "S")]
        s: String,
    },
    Wrapped {
        value: String,
    },
    Other(Value),
}

impl WireText {
    /// Extract the text, `None` for empty or unusable values
    pub fn text(&self) -> Option<String> {
        let raw = match self {
            WireText::Plain(s) => s.clone(),
            WireText::Number(n) => n.to_string(),
            WireText::Dynamo { s } => s.clone(),
            WireText::Wrapped { value } => value.clone(),
            WireText::Other(_) => return None,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// A node record from a snapshot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireNode {
    pub id: Option<WireText>,
    pub name: Option<WireText>,
    #[serde(alias = "avatarUrl")]
    pub avatar: Option<WireText>,
}

/// An edge endpoint: either a bare id or a node-like object carrying `id`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EndpointRef {
    Node {
        id: WireText,
        #[serde(default)]
        name: Option<WireText>,
        #[serde(default, alias = "avatarUrl")]
        avatar: Option<WireText>,
    },
    Text(WireText),
}

/// Timestamp as milliseconds, numeric string or RFC 3339 text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(f64),
    Text(String),
    Other(Value),
}

/// An edge record; snapshot links use `source`/`target`, live events `from`/`to`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireLink {
    #[serde(alias = "from")]
    pub source: Option<EndpointRef>,
    #[serde(alias = "to")]
    pub target: Option<EndpointRef>,
    #[serde(rename = "createdAt", alias = "created_at", alias = "ts")]
    pub created_at: Option<WireTimestamp>,
}

/// Canonical contents of a snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Canonical live connection event
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub from: Node,
    pub to: Node,
    pub edge: Edge,
}

/// Text of an optional wire field, or `fallback`
pub fn text_or(field: Option<&WireText>, fallback: &str) -> String {
    field
        .and_then(WireText::text)
        .unwrap_or_else(|| fallback.to_string())
}

/// Build a canonical node, substituting the given defaults for missing fields
pub fn normalize_node(raw: &WireNode, fallback_id: &str, fallback_name: &str) -> Node {
    let id = text_or(raw.id.as_ref(), fallback_id);
    let name = match raw.name.as_ref().and_then(WireText::text) {
        Some(name) => name,
        None if fallback_name.is_empty() => id.clone(),
        None => fallback_name.to_string(),
    };
    Node {
        id,
        name,
        avatar: raw.avatar.as_ref().and_then(WireText::text),
    }
}

/// Resolve an endpoint to its node id
pub fn endpoint_id(endpoint: &EndpointRef) -> Option<String> {
    match endpoint {
        EndpointRef::Node { id, .. } => id.text(),
        EndpointRef::Text(text) => text.text(),
    }
}

/// Resolve an endpoint to a node; bare ids get their id as display name
pub fn endpoint_node(endpoint: &EndpointRef) -> Option<Node> {
    let id = endpoint_id(endpoint)?;
    match endpoint {
        EndpointRef::Node { name, avatar, .. } => Some(Node {
            name: text_or(name.as_ref(), &id),
            avatar: avatar.as_ref().and_then(WireText::text),
            id,
        }),
        EndpointRef::Text(_) => Some(Node::new(id.clone(), id)),
    }
}

/// Epoch milliseconds beyond this magnitude (about the year 2286) are unreadable
const MAX_TIMESTAMP_MS: f64 = 1e13;

fn plausible_millis(ms: f64) -> Option<i64> {
    (ms.is_finite() && ms.abs() <= MAX_TIMESTAMP_MS).then_some(ms as i64)
}

/// Milliseconds for a wire timestamp, `now` when absent or unreadable
pub fn resolve_timestamp(ts: Option<&WireTimestamp>, now: i64) -> i64 {
    match ts {
        Some(WireTimestamp::Millis(ms)) => plausible_millis(*ms).unwrap_or(now),
        Some(WireTimestamp::Text(text)) => {
            let text = text.trim();
            if let Ok(ms) = text.parse::<f64>() {
                return plausible_millis(ms).unwrap_or(now);
            }
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp_millis())
                .unwrap_or(now)
        }
        _ => now,
    }
}

/// Decode one element leniently; anything unreadable becomes the default
fn decode_lenient<T>(value: &Value) -> T
where
    T: for<'de> Deserialize<'de> + Default,
{
    T::deserialize(value).unwrap_or_default()
}

fn array_field<'a>(body: &'a Value, keys: &[&str]) -> &'a [Value] {
    keys.iter()
        .find_map(|key| body.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Normalize a `{nodes, links}` snapshot body
///
/// Each element is decoded on its own so a single malformed record never
/// drops the rest. Link endpoints given as node objects also contribute
/// node records (after the explicit node list, so explicit records win).
pub fn normalize_snapshot(body: &Value, now: i64) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for raw in array_field(body, &["nodes"]) {
        let wire: WireNode = decode_lenient(raw);
        let node = normalize_node(&wire, "", "");
        if !node.id.is_empty() {
            snapshot.nodes.push(node);
        }
    }

    for raw in array_field(body, &["links", "edges"]) {
        let wire: WireLink = decode_lenient(raw);
        let (Some(source), Some(target)) = (wire.source.as_ref(), wire.target.as_ref()) else {
            continue;
        };
        let (Some(source_node), Some(target_node)) = (endpoint_node(source), endpoint_node(target))
        else {
            continue;
        };
        let created_at = resolve_timestamp(wire.created_at.as_ref(), now);
        snapshot.edges.push(Edge::new(
            source_node.id.clone(),
            target_node.id.clone(),
            created_at,
        ));
        if matches!(source, EndpointRef::Node { .. }) {
            snapshot.nodes.push(source_node);
        }
        if matches!(target, EndpointRef::Node { .. }) {
            snapshot.nodes.push(target_node);
        }
    }

    snapshot
}

/// Normalize a live `{from, to, createdAt?}` payload
///
/// Returns `None` when either endpoint has no usable id.
pub fn normalize_connection(body: &Value, now: i64) -> Option<Connection> {
    let wire: WireLink = decode_lenient(body);
    let from = endpoint_node(wire.source.as_ref()?)?;
    let to = endpoint_node(wire.target.as_ref()?)?;
    let created_at = resolve_timestamp(wire.created_at.as_ref(), now);
    let edge = Edge::new(from.id.clone(), to.id.clone(), created_at);
    Some(Connection { from, to, edge })
}

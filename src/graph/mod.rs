// Graph domain model
//
// Canonical node/edge shapes shared by the normalization layer, the
// reconciliation store and the activity tracker.

pub mod normalize;
pub mod store;
pub mod tracker;

pub use store::{EdgeOutcome, GraphStore};
pub use tracker::{ActivityTracker, ExpiringQueue};

/// Node identifier as delivered by the backend
pub type NodeId = String;

/// A person on the wall
///
/// Identity is `id`. Display attributes come from whichever record
/// introduced the node first and are never overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub avatar: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
        }
    }
}

/// A single connection event between two nodes
///
/// Edges are immutable history: two connections between the same pair at
/// different times are distinct edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    /// Creation time in milliseconds since the Unix epoch
    pub created_at: i64,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, created_at: i64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            created_at,
        }
    }

    /// Key identifying the unordered endpoint pair
    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.source, &self.target)
    }

    #[cfg(test)]
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Unordered node pair, smaller id first
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(pub NodeId, pub NodeId);

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }
}

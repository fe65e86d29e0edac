// Reconciliation store
//
// Single owner of the session's nodes and edges. Snapshot merges and live
// events both funnel through here; key-based dedupe makes the end state
// independent of arrival order. Derived aggregates (degree, neighbors,
// rank) are recomputed from the full edge list after every change.

use super::{Edge, Node, NodeId, PairKey};
use std::collections::{HashMap, HashSet};

/// Default grace window for near-duplicate live events (ms)
pub const DEFAULT_DEDUPE_GRACE_MS: i64 = 4_000;

/// Default cap on retained edge history
pub const DEFAULT_MAX_EDGES: usize = 50_000;

/// Number of crowned nodes
pub const RANK_SIZE: usize = 3;

/// Result of feeding a live edge into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// New edge stored
    Added,
    /// Exact (source, target, created_at) already present
    Duplicate,
    /// Same pair already has an edge within the grace window
    Suppressed,
    /// Older than the eviction watermark
    Expired,
}

/// Counts from a snapshot merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub nodes_added: usize,
    pub edges_added: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EdgeKey {
    source: NodeId,
    target: NodeId,
    created_at: i64,
}

impl From<&Edge> for EdgeKey {
    fn from(edge: &Edge) -> Self {
        Self {
            source: edge.source.clone(),
            target: edge.target.clone(),
            created_at: edge.created_at,
        }
    }
}

#[derive(Debug, Clone)]
struct NodeEntry {
    node: Node,
    /// First-seen order, used to break rank ties
    seq: u64,
}

/// Aggregates recomputed from the edge list
#[derive(Debug, Clone, Default)]
pub struct Derived {
    pub degree: HashMap<NodeId, usize>,
    pub neighbors: HashMap<NodeId, HashSet<NodeId>>,
    pub rank: Vec<NodeId>,
}

/// Deduplicated node/edge set for one wall session
#[derive(Debug, Clone)]
pub struct GraphStore {
    nodes: HashMap<NodeId, NodeEntry>,
    next_seq: u64,
    edges: Vec<Edge>,
    edge_keys: HashSet<EdgeKey>,
    pair_times: HashMap<PairKey, Vec<i64>>,
    grace_ms: i64,
    max_edges: Option<usize>,
    /// Edges created before this instant were evicted and stay out
    evicted_before: Option<i64>,
    derived: Derived,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_DEDUPE_GRACE_MS, Some(DEFAULT_MAX_EDGES))
    }

    pub fn with_limits(grace_ms: i64, max_edges: Option<usize>) -> Self {
        Self {
            nodes: HashMap::new(),
            next_seq: 0,
            edges: Vec::new(),
            edge_keys: HashSet::new(),
            pair_times: HashMap::new(),
            grace_ms: grace_ms.max(0),
            max_edges,
            evicted_before: None,
            derived: Derived::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id).map(|entry| &entry.node)
    }

    #[cfg(test)]
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Nodes in first-seen order
    pub fn nodes(&self) -> Vec<&Node> {
        let mut entries: Vec<&NodeEntry> = self.nodes.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| &entry.node).collect()
    }

    /// Edges in insertion order
    #[cfg(test)]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn derived(&self) -> &Derived {
        &self.derived
    }

    pub fn degree(&self, id: &str) -> usize {
        self.derived.degree.get(id).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn neighbors(&self, id: &str) -> Option<&HashSet<NodeId>> {
        self.derived.neighbors.get(id)
    }

    /// Crowned nodes, best first
    #[cfg(test)]
    pub fn rank(&self) -> &[NodeId] {
        &self.derived.rank
    }

    /// Position of `id` in the crown ranking
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.derived.rank.iter().position(|ranked| ranked == id)
    }

    /// Leaderboard rows: the `limit` best connected nodes with their degree
    pub fn leaders(&self, limit: usize) -> Vec<(&Node, usize)> {
        ranked(&self.nodes, &self.derived.degree, limit)
            .iter()
            .filter_map(|id| {
                let entry = self.nodes.get(id)?;
                Some((&entry.node, self.degree(id)))
            })
            .collect()
    }

    /// Insert a node unless one with the same id exists
    ///
    /// First writer wins: later name/avatar changes are dropped.
    pub fn upsert_node(&mut self, node: Node) -> bool {
        self.insert_node(node)
    }

    /// Store one historical edge through the snapshot path
    #[cfg(test)]
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        self.merge_snapshot(Vec::new(), vec![edge]).edges_added > 0
    }

    /// Store a live edge, suppressing near-duplicates for the same pair
    pub fn add_live_edge(&mut self, edge: Edge) -> EdgeOutcome {
        if self.is_expired(&edge) {
            return EdgeOutcome::Expired;
        }
        if self.edge_keys.contains(&EdgeKey::from(&edge)) {
            return EdgeOutcome::Duplicate;
        }
        if self.within_grace(&edge) {
            return EdgeOutcome::Suppressed;
        }
        if !self.insert_edge(edge) {
            return EdgeOutcome::Duplicate;
        }
        self.enforce_retention();
        self.recompute();
        EdgeOutcome::Added
    }

    /// Merge a snapshot without overwriting anything already present
    ///
    /// Idempotent. Edge endpoints missing from the node list get a
    /// placeholder node named after their id.
    pub fn merge_snapshot(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> MergeStats {
        let mut stats = MergeStats::default();

        for node in nodes {
            if self.insert_node(node) {
                stats.nodes_added += 1;
            }
        }

        for edge in edges {
            for id in [&edge.source, &edge.target] {
                if self.insert_node(Node::new(id.clone(), id.clone())) {
                    stats.nodes_added += 1;
                }
            }
            if self.insert_edge(edge) {
                stats.edges_added += 1;
            }
        }

        if stats.edges_added > 0 {
            self.enforce_retention();
        }
        if stats.nodes_added > 0 || stats.edges_added > 0 {
            self.recompute();
        }
        stats
    }

    fn insert_node(&mut self, node: Node) -> bool {
        if node.id.is_empty() || self.nodes.contains_key(&node.id) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.nodes.insert(node.id.clone(), NodeEntry { node, seq });
        true
    }

    fn insert_edge(&mut self, edge: Edge) -> bool {
        if edge.source.is_empty() || edge.target.is_empty() || self.is_expired(&edge) {
            return false;
        }
        if !self.edge_keys.insert(EdgeKey::from(&edge)) {
            return false;
        }
        self.pair_times
            .entry(edge.pair())
            .or_default()
            .push(edge.created_at);
        self.edges.push(edge);
        true
    }

    /// Whether `edge` predates evicted history and would be rejected
    pub fn is_expired(&self, edge: &Edge) -> bool {
        self.evicted_before
            .is_some_and(|watermark| edge.created_at < watermark)
    }

    fn within_grace(&self, edge: &Edge) -> bool {
        self.pair_times.get(&edge.pair()).is_some_and(|times| {
            times
                .iter()
                .any(|t| t.abs_diff(edge.created_at) <= self.grace_ms.unsigned_abs())
        })
    }

    /// Evict the oldest edges beyond `max_edges`
    fn enforce_retention(&mut self) {
        let Some(max) = self.max_edges else {
            return;
        };
        if self.edges.len() <= max {
            return;
        }

        let mut by_age: Vec<i64> = self.edges.iter().map(|e| e.created_at).collect();
        by_age.sort_unstable();
        let overflow = self.edges.len() - max;
        // Everything strictly older than the first kept timestamp goes; ties
        // at the boundary stay so the watermark never rejects kept history.
        let watermark = by_age[overflow];

        let before = self.edges.len();
        self.edges.retain(|e| e.created_at >= watermark);
        self.edge_keys = self.edges.iter().map(EdgeKey::from).collect();
        self.pair_times.clear();
        for edge in &self.edges {
            self.pair_times
                .entry(edge.pair())
                .or_default()
                .push(edge.created_at);
        }
        self.evicted_before = Some(watermark);

        tracing::debug!(
            evicted = before - self.edges.len(),
            watermark,
            "Evicted old edges from wall history"
        );
    }

    fn recompute(&mut self) {
        self.derived = compute_derived(&self.nodes, &self.edges);
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Count the edges touching each node (a self loop counts once)
pub fn degree_map(edges: &[Edge]) -> HashMap<NodeId, usize> {
    let mut degree: HashMap<NodeId, usize> = HashMap::new();
    for edge in edges {
        *degree.entry(edge.source.clone()).or_insert(0) += 1;
        if edge.target != edge.source {
            *degree.entry(edge.target.clone()).or_insert(0) += 1;
        }
    }
    degree
}

/// Connected nodes ordered by degree descending, then first seen, then id
fn ranked(
    nodes: &HashMap<NodeId, NodeEntry>,
    degree: &HashMap<NodeId, usize>,
    limit: usize,
) -> Vec<NodeId> {
    let mut ranked: Vec<(&NodeId, usize, u64)> = degree
        .iter()
        .filter(|(_, d)| **d > 0)
        .map(|(id, d)| (id, *d, nodes.get(id).map_or(u64::MAX, |entry| entry.seq)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(id, _, _)| id.clone())
        .collect()
}

fn compute_derived(nodes: &HashMap<NodeId, NodeEntry>, edges: &[Edge]) -> Derived {
    let degree = degree_map(edges);

    let mut neighbors: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    for edge in edges {
        neighbors
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone());
        neighbors
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.source.clone());
    }

    let rank = ranked(nodes, &degree, RANK_SIZE);

    Derived {
        degree,
        neighbors,
        rank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sorted_keys(store: &GraphStore) -> Vec<(String, String, i64)> {
        let mut keys: Vec<_> = store
            .edges()
            .iter()
            .map(|e| (e.source.clone(), e.target.clone(), e.created_at))
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_upsert_is_first_writer_wins() {
        let mut store = GraphStore::new();
        assert!(store.upsert_node(Node::new("a", "Alice")));
        assert!(!store.upsert_node(Node::new("a", "Alicia")));
        assert_eq!(store.node("a").unwrap().name, "Alice");
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_add_same_triple_twice() {
        let mut store = GraphStore::new();
        assert!(store.add_edge(Edge::new("a", "b", 1000)));
        assert!(!store.add_edge(Edge::new("a", "b", 1000)));
        assert_eq!(store.edge_count(), 1);

        // Same pair at another time is a separate event
        assert!(store.add_edge(Edge::new("a", "b", 90_000)));
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn test_grace_window_collapses_near_duplicates() {
        let mut store = GraphStore::new();
        assert_eq!(store.add_live_edge(Edge::new("a", "b", 10_000)), EdgeOutcome::Added);
        // Reversed pair inside the window
        assert_eq!(
            store.add_live_edge(Edge::new("b", "a", 13_000)),
            EdgeOutcome::Suppressed
        );
        // Window is inclusive
        assert_eq!(
            store.add_live_edge(Edge::new("a", "b", 14_000)),
            EdgeOutcome::Suppressed
        );
        assert_eq!(store.edge_count(), 1);

        assert_eq!(store.add_live_edge(Edge::new("a", "b", 14_001)), EdgeOutcome::Added);
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn test_grace_check_survives_extreme_timestamps() {
        let mut store = GraphStore::new();
        assert_eq!(store.add_live_edge(Edge::new("a", "b", 1_000)), EdgeOutcome::Added);
        assert_eq!(store.add_live_edge(Edge::new("a", "b", i64::MIN)), EdgeOutcome::Added);
        assert_eq!(store.add_live_edge(Edge::new("b", "a", i64::MAX)), EdgeOutcome::Added);
        assert_eq!(
            store.add_live_edge(Edge::new("a", "b", i64::MAX - 10)),
            EdgeOutcome::Suppressed
        );
        assert_eq!(store.edge_count(), 3);
    }

    #[test]
    fn test_live_duplicate_reported_before_grace() {
        let mut store = GraphStore::new();
        store.add_live_edge(Edge::new("a", "b", 1000));
        assert_eq!(
            store.add_live_edge(Edge::new("a", "b", 1000)),
            EdgeOutcome::Duplicate
        );
    }

    #[test]
    fn test_degree_triangle() {
        let mut store = GraphStore::new();
        store.add_edge(Edge::new("A", "B", 1));
        store.add_edge(Edge::new("A", "C", 2));
        store.add_edge(Edge::new("B", "C", 3));
        assert_eq!(store.degree("A"), 2);
        assert_eq!(store.degree("B"), 2);
        assert_eq!(store.degree("C"), 2);
        assert_eq!(store.degree("D"), 0);

        let neighbors = store.neighbors("A").unwrap();
        assert!(neighbors.contains("B") && neighbors.contains("C"));
    }

    #[test]
    fn test_rank_breaks_ties_by_first_seen() {
        let mut store = GraphStore::new();
        store.upsert_node(Node::new("zed", "Zed"));
        store.upsert_node(Node::new("amy", "Amy"));
        store.upsert_node(Node::new("hub", "Hub"));
        store.upsert_node(Node::new("lee", "Lee"));
        store.add_edge(Edge::new("hub", "zed", 1));
        store.add_edge(Edge::new("hub", "amy", 2));
        store.add_edge(Edge::new("hub", "lee", 3));

        // hub has degree 3; zed/amy/lee tie at 1 and zed was seen first
        assert_eq!(store.rank(), &["hub".to_string(), "zed".to_string(), "amy".to_string()]);
        assert_eq!(store.rank_of("lee"), None);
        assert_eq!(store.rank_of("hub"), Some(0));

        let leaders: Vec<_> = store
            .leaders(10)
            .into_iter()
            .map(|(node, degree)| (node.name.as_str(), degree))
            .collect();
        assert_eq!(leaders, vec![("Hub", 3), ("Zed", 1), ("Amy", 1), ("Lee", 1)]);
    }

    #[test]
    fn test_snapshot_then_live_same_edge() {
        let mut store = GraphStore::new();
        let stats = store.merge_snapshot(
            vec![Node::new("a", "Alice"), Node::new("b", "Bob")],
            vec![Edge::new("a", "b", 1000)],
        );
        assert_eq!(stats, MergeStats { nodes_added: 2, edges_added: 1 });

        store.upsert_node(Node::new("a", "Alice"));
        store.upsert_node(Node::new("b", "Bob"));
        assert_eq!(
            store.add_live_edge(Edge::new("a", "b", 1000)),
            EdgeOutcome::Duplicate
        );
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_merge_creates_placeholder_endpoints() {
        let mut store = GraphStore::new();
        store.merge_snapshot(vec![Node::new("a", "Alice")], vec![Edge::new("a", "ghost", 5)]);
        assert_eq!(store.node("ghost").unwrap().name, "ghost");
        assert_eq!(store.node("a").unwrap().name, "Alice");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = GraphStore::new();
        let nodes = vec![Node::new("a", "Alice"), Node::new("b", "Bob")];
        let edges = vec![Edge::new("a", "b", 1), Edge::new("b", "a", 2)];
        store.merge_snapshot(nodes.clone(), edges.clone());
        let again = store.merge_snapshot(nodes, edges);
        assert_eq!(again, MergeStats::default());
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn test_retention_evicts_oldest_and_blocks_readd() {
        let mut store = GraphStore::with_limits(DEFAULT_DEDUPE_GRACE_MS, Some(3));
        for ts in [10, 20, 30, 40, 50] {
            store.add_edge(Edge::new("a", "b", ts));
        }
        assert_eq!(store.edge_count(), 3);
        let oldest = store.edges().iter().map(|e| e.created_at).min();
        assert_eq!(oldest, Some(30));

        // A later snapshot carrying evicted history does not resurrect it
        let stats = store.merge_snapshot(vec![], vec![Edge::new("a", "b", 10)]);
        assert_eq!(stats.edges_added, 0);
        assert_eq!(
            store.add_live_edge(Edge::new("a", "c", 5)),
            EdgeOutcome::Expired
        );
        // Nodes are never evicted
        assert!(store.contains_node("a") && store.contains_node("b"));
    }

    fn arb_edge() -> impl Strategy<Value = Edge> {
        (0u8..5, 0u8..5, 0i64..20).prop_map(|(s, t, ts)| {
            Edge::new(format!("n{}", s), format!("n{}", t), ts * 10_000)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any interleaving of snapshot merges and single adds over the
        /// same edges, duplicates included, converges to the same set.
        #[test]
        fn prop_merge_and_add_order_independent(
            edges in proptest::collection::vec(arb_edge(), 0..30),
            split in 0usize..30,
            seed in any::<u64>(),
        ) {
            let mut reference = GraphStore::new();
            reference.merge_snapshot(vec![], edges.clone());

            // Shuffle deterministically, add some singly, merge the rest
            // twice, then replay everything once more.
            let mut shuffled = edges.clone();
            let len = shuffled.len();
            if len > 1 {
                for i in 0..len {
                    let j = ((seed.wrapping_mul(i as u64 + 1)) % len as u64) as usize;
                    shuffled.swap(i, j);
                }
            }
            let split = split.min(len);
            let mut store = GraphStore::new();
            for edge in &shuffled[..split] {
                store.merge_snapshot(vec![], vec![edge.clone()]);
            }
            store.merge_snapshot(vec![], shuffled[split..].to_vec());
            store.merge_snapshot(vec![], shuffled[split..].to_vec());
            for edge in &edges {
                store.merge_snapshot(vec![], vec![edge.clone()]);
            }

            prop_assert_eq!(sorted_keys(&store), sorted_keys(&reference));
        }

        /// Degree always equals the number of edge endpoints at that node
        #[test]
        fn prop_degree_matches_edge_count(
            edges in proptest::collection::vec(arb_edge(), 0..30),
        ) {
            let mut store = GraphStore::new();
            for edge in edges {
                store.add_live_edge(edge);
            }
            for i in 0..5 {
                let id = format!("n{}", i);
                let expected = store.edges().iter().filter(|e| e.touches(&id)).count();
                prop_assert_eq!(store.degree(&id), expected);
            }
        }
    }
}

//! Causal DAG
//!
//! Wraps a `daggy::Dag` keyed by variable name. Cycles are rejected at
//! construction time, and the graph queries needed for identification
//! (ancestors, descendants, d-separation) are provided here.

use super::dot::ParsedGraph;
use daggy::{Dag, EdgeIndex, NodeIndex, Walker};
use std::collections::{HashMap, HashSet, VecDeque};

/// Error types for DAG operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    /// Cycle detected when adding edge
    CycleDetected(String),
    /// Node not found
    NodeNotFound(String),
}

impl std::fmt::Display for DagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DagError::CycleDetected(msg) => write!(f, "Cycle detected: {}", msg),
            DagError::NodeNotFound(msg) => write!(f, "Node not found: {}", msg),
        }
    }
}

impl std::error::Error for DagError {}

/// Acyclic graph over named variables.
#[derive(Debug, Clone)]
pub struct CausalDag {
    /// The underlying daggy DAG
    dag: Dag<String, ()>,
    /// Map from variable name to daggy NodeIndex
    name_to_index: HashMap<String, NodeIndex>,
}

impl CausalDag {
    /// Creates a new empty DAG
    pub fn new() -> Self {
        CausalDag {
            dag: Dag::new(),
            name_to_index: HashMap::new(),
        }
    }

    /// Builds a DAG from parsed DOT, failing on the first edge that closes a cycle.
    pub fn from_parsed(graph: &ParsedGraph) -> Result<Self, DagError> {
        let mut dag = CausalDag::new();
        for node in &graph.nodes {
            dag.add_node(node);
        }
        for (from, to) in &graph.edges {
            dag.add_edge(from, to)?;
        }
        Ok(dag)
    }

    /// Adds a variable, returning the existing index if it is already present.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.name_to_index.get(name) {
            return index;
        }
        let index = self.dag.add_node(name.to_string());
        self.name_to_index.insert(name.to_string(), index);
        index
    }

    /// Adds a directed edge between two existing variables.
    ///
    /// Self-loops and edges that would close a cycle are rejected.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<EdgeIndex, DagError> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;

        match self.dag.add_edge(from_index, to_index, ()) {
            Ok(edge_index) => Ok(edge_index),
            Err(_would_cycle) => Err(DagError::CycleDetected(format!(
                "adding edge {} -> {} would create a cycle",
                from, to
            ))),
        }
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex, DagError> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| DagError::NodeNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    /// Variable names in insertion order
    pub fn node_names(&self) -> Vec<String> {
        self.dag
            .graph()
            .node_indices()
            .map(|index| self.dag[index].clone())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.dag.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.dag.edge_count()
    }

    /// Direct parents of a variable, without duplicates.
    pub fn parents(&self, name: &str) -> Vec<String> {
        let Some(&index) = self.name_to_index.get(name) else {
            return Vec::new();
        };
        let mut parents: Vec<String> = Vec::new();
        for (_, parent) in self.dag.parents(index).iter(&self.dag) {
            let parent_name = &self.dag[parent];
            if !parents.contains(parent_name) {
                parents.push(parent_name.clone());
            }
        }
        parents
    }

    /// Direct children of a variable, without duplicates.
    pub fn children(&self, name: &str) -> Vec<String> {
        let Some(&index) = self.name_to_index.get(name) else {
            return Vec::new();
        };
        let mut children: Vec<String> = Vec::new();
        for (_, child) in self.dag.children(index).iter(&self.dag) {
            let child_name = &self.dag[child];
            if !children.contains(child_name) {
                children.push(child_name.clone());
            }
        }
        children
    }

    /// All strict descendants of a variable.
    pub fn descendants(&self, name: &str) -> HashSet<String> {
        let mut descendants = HashSet::new();
        let mut to_visit = self.children(name);

        while let Some(current) = to_visit.pop() {
            if descendants.insert(current.clone()) {
                to_visit.extend(self.children(&current));
            }
        }

        descendants
    }

    /// The given variables together with all of their ancestors.
    pub fn ancestral_set<'a, I>(&self, names: I) -> HashSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut ancestors = HashSet::new();
        let mut to_visit: Vec<String> = names.into_iter().cloned().collect();

        while let Some(current) = to_visit.pop() {
            if ancestors.insert(current.clone()) {
                to_visit.extend(self.parents(&current));
            }
        }

        ancestors
    }

    /// Copy of this DAG with every edge leaving `name` removed.
    pub fn without_outgoing(&self, name: &str) -> Result<CausalDag, DagError> {
        let mut pruned = CausalDag::new();
        for node in self.node_names() {
            pruned.add_node(&node);
        }
        for edge in self.dag.raw_edges() {
            let from = &self.dag[edge.source()];
            let to = &self.dag[edge.target()];
            if from != name {
                pruned.add_edge(from, to)?;
            }
        }
        Ok(pruned)
    }

    /// Tests whether `x` and `y` are d-separated given `given`.
    ///
    /// Uses the moralized ancestral graph: restrict to ancestors of
    /// {x, y} ∪ given, marry co-parents, drop directions, delete `given`,
    /// then check whether `x` can still reach `y`.
    pub fn is_d_separated(&self, x: &str, y: &str, given: &[String]) -> bool {
        let mut roots: Vec<String> = vec![x.to_string(), y.to_string()];
        roots.extend(given.iter().cloned());
        let ancestral = self.ancestral_set(roots.iter());

        let mut links: Vec<(String, String)> = Vec::new();
        for node in &ancestral {
            let parents = self.parents(node);
            for parent in &parents {
                links.push((parent.clone(), node.clone()));
            }
            for (i, first) in parents.iter().enumerate() {
                for second in &parents[i + 1..] {
                    links.push((first.clone(), second.clone()));
                }
            }
        }

        let mut adjacency: HashMap<&str, HashSet<&str>> = HashMap::new();
        for (a, b) in &links {
            adjacency.entry(a.as_str()).or_default().insert(b.as_str());
            adjacency.entry(b.as_str()).or_default().insert(a.as_str());
        }

        let blocked: HashSet<&str> = given.iter().map(String::as_str).collect();
        if blocked.contains(x) || blocked.contains(y) {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::from([x]);
        while let Some(current) = queue.pop_front() {
            if current == y {
                return false;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(neighbors) = adjacency.get(current) {
                for &next in neighbors {
                    if !blocked.contains(next) && !visited.contains(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        true
    }
}

impl Default for CausalDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::causal::dot::parse_digraph;

    fn dag(dot: &str) -> CausalDag {
        CausalDag::from_parsed(&parse_digraph(dot).unwrap()).unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_empty_dag() {
        let dag = CausalDag::new();
        assert_eq!(dag.node_count(), 0);
        assert_eq!(dag.edge_count(), 0);
    }

    #[test]
    fn test_cycle_rejected() {
        let parsed = parse_digraph("digraph { A -> B; B -> C; C -> A; }").unwrap();
        let result = CausalDag::from_parsed(&parsed);
        assert!(matches!(result, Err(DagError::CycleDetected(_))));
    }

    #[test]
    fn test_cycle_detection_agrees_with_petgraph() {
        use petgraph::algo::is_cyclic_directed;
        use petgraph::graph::DiGraph;

        let cases = [
            "digraph { A -> B; B -> C; }",
            "digraph { A -> B; B -> A; }",
            "digraph { A -> B; A -> C; C -> B; }",
            "digraph { A -> B; B -> C; C -> D; D -> B; }",
        ];

        for dot in cases {
            let parsed = parse_digraph(dot).unwrap();
            let mut reference = DiGraph::<String, ()>::new();
            let indices: HashMap<&String, _> = parsed
                .nodes
                .iter()
                .map(|n| (n, reference.add_node(n.clone())))
                .collect();
            for (from, to) in &parsed.edges {
                reference.add_edge(indices[from], indices[to], ());
            }

            assert_eq!(
                CausalDag::from_parsed(&parsed).is_err(),
                is_cyclic_directed(&reference),
                "mismatch for {}",
                dot
            );
        }
    }

    #[test]
    fn test_unknown_node_in_edge() {
        let mut dag = CausalDag::new();
        dag.add_node("A");
        assert_eq!(
            dag.add_edge("A", "Z").unwrap_err(),
            DagError::NodeNotFound("Z".to_string())
        );
    }

    #[test]
    fn test_parents_children_descendants() {
        let dag = dag("digraph { W -> T; W -> Y; T -> M; M -> Y; T -> M; }");
        let mut parents = dag.parents("Y");
        parents.sort();
        assert_eq!(parents, names(&["M", "W"]));
        assert_eq!(dag.children("T"), names(&["M"]));

        let descendants = dag.descendants("T");
        assert!(descendants.contains("M"));
        assert!(descendants.contains("Y"));
        assert!(!descendants.contains("T"));
        assert!(!descendants.contains("W"));
    }

    #[test]
    fn test_ancestral_set_includes_roots() {
        let dag = dag("digraph { A -> B; B -> C; D -> C; E; }");
        let roots = names(&["B"]);
        let ancestors = dag.ancestral_set(roots.iter());
        assert_eq!(ancestors.len(), 2);
        assert!(ancestors.contains("A"));
        assert!(ancestors.contains("B"));
    }

    #[test]
    fn test_without_outgoing() {
        let dag = dag("digraph { W -> T; T -> Y; W -> Y; }");
        let pruned = dag.without_outgoing("T").unwrap();
        assert_eq!(pruned.node_count(), 3);
        assert_eq!(pruned.edge_count(), 2);
        assert!(pruned.children("T").is_empty());
        assert_eq!(pruned.parents("T"), names(&["W"]));
    }

    #[test]
    fn test_d_separation_chain_fork_collider() {
        let chain = dag("digraph { A -> B; B -> C; }");
        assert!(!chain.is_d_separated("A", "C", &[]));
        assert!(chain.is_d_separated("A", "C", &names(&["B"])));

        let fork = dag("digraph { B -> A; B -> C; }");
        assert!(!fork.is_d_separated("A", "C", &[]));
        assert!(fork.is_d_separated("A", "C", &names(&["B"])));

        let collider = dag("digraph { A -> B; C -> B; }");
        assert!(collider.is_d_separated("A", "C", &[]));
        assert!(!collider.is_d_separated("A", "C", &names(&["B"])));
    }

    #[test]
    fn test_d_separation_descendant_of_collider() {
        let dag = dag("digraph { A -> B; C -> B; B -> D; }");
        assert!(dag.is_d_separated("A", "C", &[]));
        assert!(!dag.is_d_separated("A", "C", &names(&["D"])));
    }
}

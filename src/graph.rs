//! Causal graph construction
//!
//! Builds the user-defined directed graph from the selected node set and a
//! fixed number of edge slots, and serializes it as DOT text for the causal
//! engine. Cycles are not checked here; the engine rejects them.

use serde::{Deserialize, Serialize};

/// Number of edge slots offered by the form.
pub const DEFAULT_EDGE_SLOTS: usize = 3;

/// One (source, target) edge slot. Either endpoint may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCandidate {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl EdgeCandidate {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        EdgeCandidate {
            source: Some(source.into()),
            target: Some(target.into()),
        }
    }

    /// Returns the edge if both endpoints are set and differ.
    fn as_edge(&self) -> Option<(String, String)> {
        match (&self.source, &self.target) {
            (Some(source), Some(target)) if source != target => {
                Some((source.clone(), target.clone()))
            }
            _ => None,
        }
    }
}

/// Directed graph over dataset columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CausalGraph {
    /// Node names in selection order
    pub nodes: Vec<String>,
    /// Edges in slot order; duplicates are kept
    pub edges: Vec<(String, String)>,
}

/// Builds a graph from the selected nodes and edge slots.
///
/// Self-loops and incomplete slots are dropped; everything else is kept in
/// order, including duplicate edges.
pub fn build_graph(nodes: &[String], candidates: &[EdgeCandidate]) -> CausalGraph {
    let edges = candidates.iter().filter_map(EdgeCandidate::as_edge).collect();

    CausalGraph {
        nodes: nodes.to_vec(),
        edges,
    }
}

impl CausalGraph {
    pub fn has_edges(&self) -> bool {
        !self.edges.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Serializes the graph as a DOT `digraph`.
    ///
    /// Emits one `src -> tgt;` line per edge in order, followed by a bare
    /// statement for each node no edge touches.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph {\n");
        for (source, target) in &self.edges {
            dot.push_str(&format!(
                "    {} -> {};\n",
                dot_id(source),
                dot_id(target)
            ));
        }
        for node in &self.nodes {
            let connected = self
                .edges
                .iter()
                .any(|(source, target)| source == node || target == node);
            if !connected {
                dot.push_str(&format!("    {};\n", dot_id(node)));
            }
        }
        dot.push('}');
        dot
    }
}

/// Quotes a DOT identifier unless it is a plain alphanumeric id.
pub fn dot_id(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_self_loops_are_dropped() {
        let nodes = names(&["A", "B", "C"]);
        let candidates = vec![
            EdgeCandidate::new("A", "B"),
            EdgeCandidate::new("B", "C"),
            EdgeCandidate::new("A", "A"),
        ];

        let graph = build_graph(&nodes, &candidates);
        assert_eq!(
            graph.edges,
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let nodes = names(&["A", "B"]);
        let candidates = vec![
            EdgeCandidate::new("B", "B"),
            EdgeCandidate::new("A", "B"),
            EdgeCandidate::new("B", "A"),
        ];

        let once = build_graph(&nodes, &candidates);
        let again_candidates: Vec<EdgeCandidate> = once
            .edges
            .iter()
            .map(|(s, t)| EdgeCandidate::new(s.as_str(), t.as_str()))
            .collect();
        let twice = build_graph(&nodes, &again_candidates);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_duplicates_and_cycles_are_kept() {
        let nodes = names(&["A", "B"]);
        let candidates = vec![
            EdgeCandidate::new("A", "B"),
            EdgeCandidate::new("A", "B"),
            EdgeCandidate::new("B", "A"),
        ];

        let graph = build_graph(&nodes, &candidates);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_unset_endpoints_are_skipped() {
        let nodes = names(&["A", "B"]);
        let candidates = vec![
            EdgeCandidate {
                source: Some("A".to_string()),
                target: None,
            },
            EdgeCandidate::default(),
        ];

        assert!(!build_graph(&nodes, &candidates).has_edges());
    }

    #[test]
    fn test_to_dot_one_line_per_edge() {
        let nodes = names(&["A", "B", "C"]);
        let graph = build_graph(
            &nodes,
            &[EdgeCandidate::new("A", "B"), EdgeCandidate::new("B", "C")],
        );

        let dot = graph.to_dot();
        assert_eq!(dot, "digraph {\n    A -> B;\n    B -> C;\n}");
        let normalized = dot.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalized, "digraph { A -> B; B -> C; }");
    }

    #[test]
    fn test_to_dot_isolated_nodes() {
        let nodes = names(&["A", "B", "D"]);
        let graph = build_graph(&nodes, &[EdgeCandidate::new("A", "B")]);
        assert_eq!(graph.to_dot(), "digraph {\n    A -> B;\n    D;\n}");
    }

    #[test]
    fn test_dot_id_quoting() {
        assert_eq!(dot_id("age"), "age");
        assert_eq!(dot_id("_x1"), "_x1");
        assert_eq!(dot_id("1st"), "\"1st\"");
        assert_eq!(dot_id("blood pressure"), "\"blood pressure\"");
        assert_eq!(dot_id("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}

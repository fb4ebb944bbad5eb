//! DAG visualization
//!
//! Produces a standalone HTML page drawing the causal graph with vis-network.
//! The page is assembled in memory; node and edge data are embedded as JSON.

use crate::graph::CausalGraph;
use serde::Serialize;

const VIS_NETWORK_JS: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

/// Height of the rendered network, in pixels.
pub const NETWORK_HEIGHT_PX: u32 = 500;

/// Error raised while rendering a graph.
#[derive(Debug)]
pub enum RenderError {
    /// Node or edge data could not be serialized
    Serialize(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Serialize(msg) => write!(f, "Failed to serialize graph: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialize(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct NetworkNode<'a> {
    id: &'a str,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct NetworkEdge<'a> {
    from: &'a str,
    to: &'a str,
}

/// Renders the graph as a self-contained HTML document.
pub fn render_network(graph: &CausalGraph) -> Result<String, RenderError> {
    let nodes: Vec<NetworkNode> = graph
        .nodes
        .iter()
        .map(|name| NetworkNode {
            id: name.as_str(),
            label: name.as_str(),
        })
        .collect();
    let edges: Vec<NetworkEdge> = graph
        .edges
        .iter()
        .map(|(from, to)| NetworkEdge {
            from: from.as_str(),
            to: to.as_str(),
        })
        .collect();

    // no raw `<` inside the inline script (`</script>`, `<!--`)
    let nodes_json = escape_script_json(&serde_json::to_string(&nodes)?);
    let edges_json = escape_script_json(&serde_json::to_string(&edges)?);

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "rendering network"
    );

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<script src="{script}"></script>
<style>
#network {{ width: 100%; height: {height}px; border: 1px solid lightgray; }}
</style>
</head>
<body>
<div id="network"></div>
<script>
var nodes = new vis.DataSet({nodes});
var edges = new vis.DataSet({edges});
var options = {{
  edges: {{ arrows: {{ to: {{ enabled: true }} }} }},
  physics: {{ enabled: true }}
}};
new vis.Network(document.getElementById("network"), {{ nodes: nodes, edges: edges }}, options);
</script>
</body>
</html>
"#,
        script = VIS_NETWORK_JS,
        height = NETWORK_HEIGHT_PX,
        nodes = nodes_json,
        edges = edges_json,
    ))
}

fn escape_script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
}

/// Escapes text for an HTML attribute or element body.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wraps a rendered document in an iframe so it can be embedded in a page.
pub fn embed_srcdoc(html: &str) -> String {
    format!(
        r#"<iframe srcdoc="{}" style="width: 100%; height: {}px; border: none;"></iframe>"#,
        escape_html(html),
        NETWORK_HEIGHT_PX + 20
    )
}

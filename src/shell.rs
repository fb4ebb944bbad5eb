//! Interactive form evaluation
//!
//! The whole page is a pure function of the current form values and the
//! session's dataset: every interaction re-runs load → build → render →
//! (optionally) estimate from scratch. Widget defaults mirror select boxes
//! that fall back to their first option.

use crate::causal::{CausalError, CausalEstimate};
use crate::dataset::{Dataset, DatasetPreview, DEFAULT_PREVIEW_ROWS};
use crate::estimator::{run_analysis, AnalysisRequest};
use crate::graph::{build_graph, CausalGraph, EdgeCandidate, DEFAULT_EDGE_SLOTS};
use crate::render::{render_network, RenderError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Form field names used by the HTML page
pub const FIELD_NODES: &str = "nodes";
pub const FIELD_TREATMENT: &str = "treatment";
pub const FIELD_OUTCOME: &str = "outcome";
pub const FIELD_ESTIMATE: &str = "estimate";

pub fn edge_source_field(slot: usize) -> String {
    format!("edge{}_source", slot)
}

pub fn edge_target_field(slot: usize) -> String {
    format!("edge{}_target", slot)
}

/// Layout settings for the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellConfig {
    /// Number of (source, target) slots shown
    pub edge_slots: usize,
    /// Rows shown in the data preview
    pub preview_rows: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            edge_slots: DEFAULT_EDGE_SLOTS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

/// Raw widget values submitted by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    /// Selected nodes; `None` means "not touched yet" (all columns)
    #[serde(default)]
    pub nodes: Option<Vec<String>>,
    #[serde(default)]
    pub edges: Vec<EdgeCandidate>,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    /// The estimate button was pressed
    #[serde(default)]
    pub estimate: bool,
}

impl FormState {
    /// Decodes urlencoded form pairs.
    ///
    /// `nodes` may repeat; an explicit empty selection is sent as a single
    /// empty `nodes` value so it can be told apart from an untouched form.
    /// Edge fields for slots at or past `edge_slots` are ignored.
    pub fn from_pairs(pairs: &[(String, String)], edge_slots: usize) -> Self {
        let mut form = FormState::default();
        let mut edges: Vec<EdgeCandidate> = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                FIELD_NODES => {
                    let nodes = form.nodes.get_or_insert_with(Vec::new);
                    if !value.is_empty() {
                        nodes.push(value.clone());
                    }
                }
                FIELD_TREATMENT => form.treatment = non_empty(value),
                FIELD_OUTCOME => form.outcome = non_empty(value),
                FIELD_ESTIMATE => form.estimate = true,
                other => {
                    if let Some((slot, is_source)) = parse_edge_field(other) {
                        if slot >= edge_slots {
                            continue;
                        }
                        if edges.len() <= slot {
                            edges.resize(slot + 1, EdgeCandidate::default());
                        }
                        if is_source {
                            edges[slot].source = non_empty(value);
                        } else {
                            edges[slot].target = non_empty(value);
                        }
                    }
                }
            }
        }

        form.edges = edges;
        form
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_edge_field(key: &str) -> Option<(usize, bool)> {
    let rest = key.strip_prefix("edge")?;
    let (slot, side) = rest.split_once('_')?;
    let slot = slot.parse::<usize>().ok()?;
    match side {
        "source" => Some((slot, true)),
        "target" => Some((slot, false)),
        _ => None,
    }
}

/// Stage of the interaction reached by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellStage {
    /// No dataset uploaded
    Initial,
    /// Dataset present, no usable edge yet
    DatasetLoaded,
    /// DAG rendered, treatment/outcome selectable
    GraphDefined,
    /// Estimate computed and shown
    EstimateShown,
}

/// Resolved edge slot after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeSlot {
    pub source: Option<String>,
    pub target: Option<String>,
}

/// Everything needed to display the page
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub stage: ShellStage,
    pub preview: Option<DatasetPreview>,
    pub columns: Vec<String>,
    pub nodes: Vec<String>,
    pub edge_slots: Vec<EdgeSlot>,
    pub graph: Option<CausalGraph>,
    pub dot: Option<String>,
    pub dag_html: Option<String>,
    pub treatment_options: Vec<String>,
    pub outcome_options: Vec<String>,
    pub treatment: Option<String>,
    pub outcome: Option<String>,
    pub estimate: Option<CausalEstimate>,
}

impl View {
    fn initial() -> Self {
        View {
            stage: ShellStage::Initial,
            preview: None,
            columns: Vec::new(),
            nodes: Vec::new(),
            edge_slots: Vec::new(),
            graph: None,
            dot: None,
            dag_html: None,
            treatment_options: Vec::new(),
            outcome_options: Vec::new(),
            treatment: None,
            outcome: None,
            estimate: None,
        }
    }

    /// Estimate text as shown to the user
    pub fn estimate_text(&self) -> Option<String> {
        self.estimate.as_ref().map(|estimate| estimate.to_string())
    }
}

/// Failures surfaced while evaluating the form
#[derive(Debug)]
pub enum ShellError {
    /// Graph rendering failed
    Render(RenderError),
    /// The causal engine failed
    Analysis(CausalError),
}

impl std::fmt::Display for ShellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShellError::Render(err) => write!(f, "Rendering failed: {}", err),
            ShellError::Analysis(err) => write!(f, "Analysis failed: {}", err),
        }
    }
}

impl std::error::Error for ShellError {}

impl From<RenderError> for ShellError {
    fn from(err: RenderError) -> Self {
        ShellError::Render(err)
    }
}

impl From<CausalError> for ShellError {
    fn from(err: CausalError) -> Self {
        ShellError::Analysis(err)
    }
}

/// Picks `choice` if it is one of `options`, otherwise the first option.
fn select(options: &[String], choice: Option<&String>) -> Option<String> {
    match choice {
        Some(choice) if options.contains(choice) => Some(choice.clone()),
        _ => options.first().cloned(),
    }
}

/// Node selection restricted to existing columns, without duplicates.
fn resolve_nodes(columns: &[String], requested: Option<&Vec<String>>) -> Vec<String> {
    match requested {
        None => columns.to_vec(),
        Some(requested) => {
            let mut nodes: Vec<String> = Vec::new();
            for name in requested {
                if columns.contains(name) && !nodes.contains(name) {
                    nodes.push(name.clone());
                }
            }
            nodes
        }
    }
}

/// Evaluates the form against the session's dataset.
///
/// # Errors
/// Rendering and estimation failures are returned as-is; there is no
/// partial view.
pub fn render(
    dataset: Option<Arc<Dataset>>,
    form: &FormState,
    config: &ShellConfig,
) -> Result<View, ShellError> {
    let Some(dataset) = dataset else {
        return Ok(View::initial());
    };

    let mut view = View::initial();
    view.stage = ShellStage::DatasetLoaded;
    view.preview = Some(dataset.preview(config.preview_rows));
    view.columns = dataset.columns().to_vec();
    view.nodes = resolve_nodes(dataset.columns(), form.nodes.as_ref());

    let candidates: Vec<EdgeCandidate> = (0..config.edge_slots)
        .map(|slot| {
            let submitted = form.edges.get(slot);
            EdgeCandidate {
                source: select(&view.nodes, submitted.and_then(|e| e.source.as_ref())),
                target: select(&view.nodes, submitted.and_then(|e| e.target.as_ref())),
            }
        })
        .collect();
    view.edge_slots = candidates
        .iter()
        .map(|candidate| EdgeSlot {
            source: candidate.source.clone(),
            target: candidate.target.clone(),
        })
        .collect();

    let graph = build_graph(&view.nodes, &candidates);
    if !graph.has_edges() {
        tracing::debug!("no usable edges; skipping render and estimation");
        return Ok(view);
    }

    view.stage = ShellStage::GraphDefined;
    view.dag_html = Some(render_network(&graph)?);
    view.dot = Some(graph.to_dot());

    view.treatment_options = view.nodes.clone();
    view.treatment = select(&view.treatment_options, form.treatment.as_ref());
    view.outcome_options = view
        .nodes
        .iter()
        .filter(|name| Some(*name) != view.treatment.as_ref())
        .cloned()
        .collect();
    view.outcome = select(&view.outcome_options, form.outcome.as_ref());

    if form.estimate {
        if let (Some(treatment), Some(outcome)) = (&view.treatment, &view.outcome) {
            let request = AnalysisRequest::new(treatment.as_str(), outcome.as_str());
            let estimate = run_analysis(dataset.clone(), &graph, &request)?;
            view.estimate = Some(estimate);
            view.stage = ShellStage::EstimateShown;
        }
    }

    view.graph = Some(graph);
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::from_bytes(
                b"A,B,C\n0,1.0,2.1\n1,2.9,6.8\n2,5.1,11.2\n3,7.0,14.9\n4,9.2,19.1\n5,10.8,22.0\n6,13.1,26.3\n",
            )
            .unwrap(),
        )
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn chain_form() -> FormState {
        FormState {
            nodes: None,
            edges: vec![
                EdgeCandidate::new("A", "B"),
                EdgeCandidate::new("B", "C"),
                EdgeCandidate::new("A", "A"),
            ],
            treatment: Some("A".to_string()),
            outcome: Some("C".to_string()),
            estimate: false,
        }
    }

    #[test]
    fn test_initial_without_dataset() {
        let view = render(None, &chain_form(), &ShellConfig::default()).unwrap();
        assert_eq!(view.stage, ShellStage::Initial);
        assert!(view.preview.is_none());
    }

    #[test]
    fn test_untouched_form_stays_dataset_loaded() {
        // Every slot defaults to (first, first), which is a self-loop
        let view = render(Some(dataset()), &FormState::default(), &ShellConfig::default()).unwrap();

        assert_eq!(view.stage, ShellStage::DatasetLoaded);
        assert_eq!(view.nodes, vec!["A", "B", "C"]);
        assert_eq!(view.edge_slots.len(), 3);
        assert!(view.dag_html.is_none());
        assert!(view.treatment_options.is_empty());
        assert_eq!(view.preview.unwrap().rows.len(), 5);
    }

    #[test]
    fn test_chain_is_rendered() {
        let view = render(Some(dataset()), &chain_form(), &ShellConfig::default()).unwrap();

        assert_eq!(view.stage, ShellStage::GraphDefined);
        assert_eq!(view.graph.as_ref().unwrap().edge_count(), 2);
        assert_eq!(
            view.dot.as_deref(),
            Some("digraph {\n    A -> B;\n    B -> C;\n}")
        );
        assert!(view.dag_html.is_some());
        assert!(view.estimate.is_none());
    }

    #[test]
    fn test_outcome_options_exclude_treatment() {
        let mut form = chain_form();
        form.treatment = Some("B".to_string());
        form.outcome = Some("B".to_string());

        let view = render(Some(dataset()), &form, &ShellConfig::default()).unwrap();
        assert_eq!(view.treatment.as_deref(), Some("B"));
        assert_eq!(view.outcome_options, vec!["A", "C"]);
        assert_eq!(view.outcome.as_deref(), Some("A"));
    }

    #[test]
    fn test_estimate_on_request() {
        let mut form = chain_form();
        form.estimate = true;

        let view = render(Some(dataset()), &form, &ShellConfig::default()).unwrap();
        assert_eq!(view.stage, ShellStage::EstimateShown);
        let text = view.estimate_text().unwrap();
        assert!(text.contains("b: C~A"));
    }

    #[test]
    fn test_estimate_failure_propagates() {
        let mut form = chain_form();
        form.edges = vec![
            EdgeCandidate::new("A", "B"),
            EdgeCandidate::new("B", "C"),
            EdgeCandidate::new("C", "A"),
        ];
        form.estimate = true;

        let result = render(Some(dataset()), &form, &ShellConfig::default());
        assert!(matches!(
            result,
            Err(ShellError::Analysis(CausalError::CyclicGraph(_)))
        ));
    }

    #[test]
    fn test_node_selection_limits_edges() {
        let form = FormState {
            nodes: Some(vec!["A".to_string(), "C".to_string(), "A".to_string(), "Z".to_string()]),
            edges: vec![EdgeCandidate::new("A", "B"), EdgeCandidate::new("C", "A")],
            ..FormState::default()
        };

        let view = render(Some(dataset()), &form, &ShellConfig::default()).unwrap();
        assert_eq!(view.nodes, vec!["A", "C"]);
        // B is not selectable, so that slot's target falls back to A
        assert_eq!(
            view.graph.unwrap().edges,
            vec![("C".to_string(), "A".to_string())]
        );
    }

    #[test]
    fn test_empty_node_selection() {
        let form = FormState {
            nodes: Some(Vec::new()),
            edges: vec![EdgeCandidate::new("A", "B")],
            ..FormState::default()
        };

        let view = render(Some(dataset()), &form, &ShellConfig::default()).unwrap();
        assert!(view.nodes.is_empty());
        assert_eq!(view.stage, ShellStage::DatasetLoaded);
        assert_eq!(view.edge_slots[0].source, None);
    }

    #[test]
    fn test_edge_slots_are_capped() {
        let config = ShellConfig {
            edge_slots: 1,
            preview_rows: 2,
        };
        let view = render(Some(dataset()), &chain_form(), &config).unwrap();
        assert_eq!(view.graph.unwrap().edge_count(), 1);
        assert_eq!(view.preview.unwrap().rows.len(), 2);
    }

    #[test]
    fn test_from_pairs() {
        let form = FormState::from_pairs(
            &pairs(&[
                ("nodes", "A"),
                ("nodes", "B"),
                ("edge0_source", "A"),
                ("edge0_target", "B"),
                ("edge2_source", "B"),
                ("treatment", "A"),
                ("outcome", ""),
                ("estimate", "1"),
                ("unrelated", "x"),
            ]),
            DEFAULT_EDGE_SLOTS,
        );

        assert_eq!(form.nodes, Some(vec!["A".to_string(), "B".to_string()]));
        assert_eq!(form.edges.len(), 3);
        assert_eq!(form.edges[0], EdgeCandidate::new("A", "B"));
        assert_eq!(form.edges[1], EdgeCandidate::default());
        assert_eq!(form.edges[2].source.as_deref(), Some("B"));
        assert_eq!(form.edges[2].target, None);
        assert_eq!(form.treatment.as_deref(), Some("A"));
        assert_eq!(form.outcome, None);
        assert!(form.estimate);
    }

    #[test]
    fn test_from_pairs_explicit_empty_selection() {
        let form = FormState::from_pairs(&pairs(&[("nodes", "")]), DEFAULT_EDGE_SLOTS);
        assert_eq!(form.nodes, Some(Vec::new()));

        let untouched = FormState::from_pairs(&[], DEFAULT_EDGE_SLOTS);
        assert_eq!(untouched.nodes, None);
    }

    #[test]
    fn test_from_pairs_ignores_slots_past_limit() {
        let form = FormState::from_pairs(
            &pairs(&[
                ("edge0_source", "A"),
                ("edge18446744073709551615_source", "A"),
                ("edge100000000_target", "B"),
                ("edge3_source", "C"),
            ]),
            3,
        );
        assert_eq!(form.edges.len(), 1);
        assert_eq!(form.edges[0].source.as_deref(), Some("A"));

        let none = FormState::from_pairs(&pairs(&[("edge0_source", "A")]), 0);
        assert!(none.edges.is_empty());
    }
}

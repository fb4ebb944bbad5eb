//! Causal effect estimation for a user-defined graph
//!
//! Serializes the graph, hands it to the causal engine together with the
//! dataset, and returns whatever the engine produces. Nothing is validated or
//! recovered here; engine failures are returned to the caller unchanged.

use crate::causal::{CausalEngine, CausalError, CausalEstimate, CausalModel, EstimationMethod};
use crate::dataset::Dataset;
use crate::graph::CausalGraph;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Treatment/outcome pair selected by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub treatment: String,
    pub outcome: String,
}

impl AnalysisRequest {
    pub fn new(treatment: impl Into<String>, outcome: impl Into<String>) -> Self {
        AnalysisRequest {
            treatment: treatment.into(),
            outcome: outcome.into(),
        }
    }
}

/// Identifies and estimates the effect of `treatment` on `outcome`.
///
/// The effect is estimated with backdoor adjustment via linear regression.
pub fn run_analysis(
    data: Arc<Dataset>,
    graph: &CausalGraph,
    request: &AnalysisRequest,
) -> Result<CausalEstimate, CausalError> {
    let dot = graph.to_dot();
    tracing::info!(
        treatment = %request.treatment,
        outcome = %request.outcome,
        edges = graph.edge_count(),
        "running causal analysis"
    );
    tracing::debug!(graph = %dot, "serialized graph");

    let model = CausalModel::new(data, &request.treatment, &request.outcome, &dot)?;
    let estimand = model.identify_effect()?;
    model.estimate_effect(&estimand, EstimationMethod::BackdoorLinearRegression)
}

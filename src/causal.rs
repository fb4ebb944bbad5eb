//! Causal Inference Engine
//!
//! Builds a causal model from a dataset and a DOT graph, identifies the
//! effect of a treatment on an outcome with the backdoor criterion, and
//! estimates it by linear regression on the adjustment set.
//!
//! ```
//! use causaliq::causal::{CausalEngine, CausalModel, EstimationMethod};
//! use causaliq::Dataset;
//! use std::sync::Arc;
//!
//! let data = Arc::new(Dataset::from_bytes(b"A,B\n0,1\n1,3\n2,5\n3,7\n").unwrap());
//! let model = CausalModel::new(data, "A", "B", "digraph { A -> B; }").unwrap();
//! let estimand = model.identify_effect().unwrap();
//! let estimate = model
//!     .estimate_effect(&estimand, EstimationMethod::BackdoorLinearRegression)
//!     .unwrap();
//! assert!((estimate.value - 2.0).abs() < 1e-9);
//! ```

pub mod dag;
pub mod dot;
pub mod regression;

use crate::dataset::{Dataset, DatasetError};
use dag::{CausalDag, DagError};
use regression::{fit_ols, RegressionError};
use serde::Serialize;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

/// z-value for a two-sided 95% interval
const Z_95: f64 = 1.96;

/// Errors raised by the causal engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CausalError {
    /// The graph text is not valid DOT
    GraphParse(String),
    /// The graph contains a directed cycle
    CyclicGraph(String),
    /// Treatment or outcome is missing from the graph
    VariableNotInGraph(String),
    /// Treatment and outcome are the same, or otherwise unusable
    InvalidQuery(String),
    /// No observed adjustment set satisfies the backdoor criterion
    NotIdentifiable { treatment: String, outcome: String },
    /// Method name is not supported
    UnsupportedMethod(String),
    /// Regressors are collinear or the treatment does not vary
    SingularDesign,
    /// Not enough rows for the regression
    InsufficientData { samples: usize, parameters: usize },
    /// A required column could not be read
    Data(DatasetError),
}

impl std::fmt::Display for CausalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CausalError::GraphParse(msg) => write!(f, "Invalid graph: {}", msg),
            CausalError::CyclicGraph(msg) => write!(f, "Graph is not acyclic: {}", msg),
            CausalError::VariableNotInGraph(name) => {
                write!(f, "Variable '{}' is not a node of the graph", name)
            }
            CausalError::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
            CausalError::NotIdentifiable { treatment, outcome } => write!(
                f,
                "Effect of '{}' on '{}' is not identifiable via the backdoor criterion",
                treatment, outcome
            ),
            CausalError::UnsupportedMethod(name) => {
                write!(f, "Unsupported estimation method: {}", name)
            }
            CausalError::SingularDesign => write!(
                f,
                "Regression design matrix is singular (treatment constant or collinear with adjustment set)"
            ),
            CausalError::InsufficientData {
                samples,
                parameters,
            } => write!(
                f,
                "Not enough data: {} rows for {} regression parameters",
                samples, parameters
            ),
            CausalError::Data(err) => write!(f, "Data error: {}", err),
        }
    }
}

impl std::error::Error for CausalError {}

impl From<DagError> for CausalError {
    fn from(err: DagError) -> Self {
        match err {
            DagError::CycleDetected(msg) => CausalError::CyclicGraph(msg),
            DagError::NodeNotFound(name) => CausalError::VariableNotInGraph(name),
        }
    }
}

impl From<DatasetError> for CausalError {
    fn from(err: DatasetError) -> Self {
        CausalError::Data(err)
    }
}

impl From<RegressionError> for CausalError {
    fn from(err: RegressionError) -> Self {
        match err {
            RegressionError::Singular => CausalError::SingularDesign,
            RegressionError::InsufficientData {
                samples,
                parameters,
            } => CausalError::InsufficientData {
                samples,
                parameters,
            },
            RegressionError::LengthMismatch => CausalError::InvalidQuery(err.to_string()),
        }
    }
}

/// Supported estimation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EstimationMethod {
    /// OLS of outcome on treatment plus the backdoor adjustment set
    #[serde(rename = "backdoor.linear_regression")]
    BackdoorLinearRegression,
}

impl EstimationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            EstimationMethod::BackdoorLinearRegression => "backdoor.linear_regression",
        }
    }
}

impl std::fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EstimationMethod {
    type Err = CausalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backdoor.linear_regression" => Ok(EstimationMethod::BackdoorLinearRegression),
            other => Err(CausalError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Kind of estimand produced by identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimandKind {
    /// Effect identified by adjusting for a backdoor set
    Backdoor,
    /// No directed path from treatment to outcome; the effect is zero
    NoDirectedPath,
}

/// Result of identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifiedEstimand {
    pub kind: EstimandKind,
    pub treatment: String,
    pub outcome: String,
    /// Variables to adjust for, in graph order
    pub backdoor_variables: Vec<String>,
}

impl IdentifiedEstimand {
    /// Regression formula realized by this estimand, e.g. `Y~T+W`
    pub fn formula(&self) -> String {
        let mut terms = vec![self.treatment.clone()];
        terms.extend(self.backdoor_variables.iter().cloned());
        format!("{}~{}", self.outcome, terms.join("+"))
    }
}

impl std::fmt::Display for IdentifiedEstimand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Estimand type: nonparametric-ate")?;
        match self.kind {
            EstimandKind::NoDirectedPath => writeln!(
                f,
                "No directed path from {} to {}; the causal effect is zero",
                self.treatment, self.outcome
            ),
            EstimandKind::Backdoor => {
                writeln!(f, "### Estimand : backdoor")?;
                if self.backdoor_variables.is_empty() {
                    writeln!(f, "  d/d[{}] E[{}]", self.treatment, self.outcome)?;
                } else {
                    writeln!(
                        f,
                        "  d/d[{}] E[{}|{}]",
                        self.treatment,
                        self.outcome,
                        self.backdoor_variables.join(",")
                    )?;
                }
                writeln!(
                    f,
                    "  Assumption: unconfoundedness given {{{}}}",
                    self.backdoor_variables.join(",")
                )
            }
        }
    }
}

/// Point estimate of an average treatment effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalEstimate {
    pub estimand: IdentifiedEstimand,
    pub method: EstimationMethod,
    /// Effect of moving the treatment from 0 to 1
    pub value: f64,
    pub std_error: Option<f64>,
    pub confidence_interval: Option<(f64, f64)>,
    pub sample_size: usize,
    pub realized_formula: String,
}

impl std::fmt::Display for CausalEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "*** Causal Estimate ***")?;
        writeln!(f)?;
        writeln!(f, "## Identified estimand")?;
        write!(f, "{}", self.estimand)?;
        writeln!(f)?;
        writeln!(f, "## Realized estimand")?;
        writeln!(f, "b: {}", self.realized_formula)?;
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Target units: ate")?;
        writeln!(f)?;
        writeln!(f, "## Estimate")?;
        writeln!(f, "Mean value: {}", self.value)?;
        if let Some(std_error) = self.std_error {
            writeln!(f, "Std. error: {}", std_error)?;
        }
        if let Some((low, high)) = self.confidence_interval {
            writeln!(f, "95% CI: [{}, {}]", low, high)?;
        }
        write!(f, "Samples: {}", self.sample_size)
    }
}

/// Capability interface of a causal-inference engine
pub trait CausalEngine {
    /// Determines how the effect can be computed from data, given the graph
    fn identify_effect(&self) -> Result<IdentifiedEstimand, CausalError>;

    /// Estimates an identified effect with the given method
    fn estimate_effect(
        &self,
        estimand: &IdentifiedEstimand,
        method: EstimationMethod,
    ) -> Result<CausalEstimate, CausalError>;
}

/// Dataset, graph and query bundled together.
#[derive(Debug, Clone)]
pub struct CausalModel {
    data: Arc<Dataset>,
    treatment: String,
    outcome: String,
    dag: CausalDag,
}

impl CausalModel {
    /// Builds a model from DOT text.
    ///
    /// # Errors
    /// Fails if the graph does not parse, contains a cycle, or does not
    /// contain both variables, or if treatment and outcome coincide.
    pub fn new(
        data: Arc<Dataset>,
        treatment: &str,
        outcome: &str,
        graph: &str,
    ) -> Result<Self, CausalError> {
        if treatment == outcome {
            return Err(CausalError::InvalidQuery(format!(
                "treatment and outcome are both '{}'",
                treatment
            )));
        }

        let parsed = dot::parse_digraph(graph)?;
        let dag = CausalDag::from_parsed(&parsed)?;

        for variable in [treatment, outcome] {
            if !dag.contains(variable) {
                return Err(CausalError::VariableNotInGraph(variable.to_string()));
            }
        }

        let unobserved: Vec<String> = dag
            .node_names()
            .into_iter()
            .filter(|name| !data.has_column(name))
            .collect();
        if !unobserved.is_empty() {
            log::warn!(
                "Graph variables without data are treated as unobserved: {}",
                unobserved.join(", ")
            );
        }

        Ok(CausalModel {
            data,
            treatment: treatment.to_string(),
            outcome: outcome.to_string(),
            dag,
        })
    }

    pub fn treatment(&self) -> &str {
        &self.treatment
    }

    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    pub fn dag(&self) -> &CausalDag {
        &self.dag
    }

    fn is_observed(&self, name: &str) -> bool {
        self.data.has_column(name)
    }

    /// Checks the backdoor criterion for `adjustment`; `pruned` is the
    /// graph with the treatment's outgoing edges removed.
    fn satisfies_backdoor(
        &self,
        pruned: &CausalDag,
        adjustment: &[String],
        descendants: &HashSet<String>,
    ) -> bool {
        if adjustment.iter().any(|w| descendants.contains(w)) {
            return false;
        }
        pruned.is_d_separated(&self.treatment, &self.outcome, adjustment)
    }

    /// Orders a set of variables the way they appear in the graph.
    fn in_graph_order(&self, set: &HashSet<String>) -> Vec<String> {
        self.dag
            .node_names()
            .into_iter()
            .filter(|name| set.contains(name))
            .collect()
    }

    fn backdoor_candidates(&self, descendants: &HashSet<String>) -> Vec<Vec<String>> {
        let parents: HashSet<String> = self.dag.parents(&self.treatment).into_iter().collect();

        let roots = [self.treatment.clone(), self.outcome.clone()];
        let ancestors: HashSet<String> = self
            .dag
            .ancestral_set(roots.iter())
            .into_iter()
            .filter(|name| {
                name != &self.treatment
                    && name != &self.outcome
                    && !descendants.contains(name)
                    && self.is_observed(name)
            })
            .collect();

        let mut candidates = Vec::new();
        if parents.iter().all(|p| self.is_observed(p)) {
            candidates.push(self.in_graph_order(&parents));
        }
        candidates.push(self.in_graph_order(&ancestors));
        candidates.push(Vec::new());
        candidates
    }
}

impl CausalEngine for CausalModel {
    fn identify_effect(&self) -> Result<IdentifiedEstimand, CausalError> {
        let descendants = self.dag.descendants(&self.treatment);

        if !descendants.contains(&self.outcome) {
            log::info!(
                "No directed path from {} to {}; effect is zero",
                self.treatment,
                self.outcome
            );
            return Ok(IdentifiedEstimand {
                kind: EstimandKind::NoDirectedPath,
                treatment: self.treatment.clone(),
                outcome: self.outcome.clone(),
                backdoor_variables: Vec::new(),
            });
        }

        let pruned = self.dag.without_outgoing(&self.treatment)?;
        for candidate in self.backdoor_candidates(&descendants) {
            if self.satisfies_backdoor(&pruned, &candidate, &descendants) {
                log::info!(
                    "Identified backdoor set for {} -> {}: {{{}}}",
                    self.treatment,
                    self.outcome,
                    candidate.join(", ")
                );
                return Ok(IdentifiedEstimand {
                    kind: EstimandKind::Backdoor,
                    treatment: self.treatment.clone(),
                    outcome: self.outcome.clone(),
                    backdoor_variables: candidate,
                });
            }
        }

        Err(CausalError::NotIdentifiable {
            treatment: self.treatment.clone(),
            outcome: self.outcome.clone(),
        })
    }

    fn estimate_effect(
        &self,
        estimand: &IdentifiedEstimand,
        method: EstimationMethod,
    ) -> Result<CausalEstimate, CausalError> {
        if estimand.treatment != self.treatment || estimand.outcome != self.outcome {
            return Err(CausalError::InvalidQuery(
                "estimand was identified for a different treatment/outcome".to_string(),
            ));
        }

        let realized_formula = estimand.formula();

        if estimand.kind == EstimandKind::NoDirectedPath {
            return Ok(CausalEstimate {
                estimand: estimand.clone(),
                method,
                value: 0.0,
                std_error: None,
                confidence_interval: None,
                sample_size: self.data.row_count(),
                realized_formula,
            });
        }

        match method {
            EstimationMethod::BackdoorLinearRegression => {
                let response = self.data.numeric_column(&estimand.outcome)?;
                let mut regressors = vec![self.data.numeric_column(&estimand.treatment)?];
                for variable in &estimand.backdoor_variables {
                    regressors.push(self.data.numeric_column(variable)?);
                }

                let fit = fit_ols(&response, &regressors)?;
                let value = fit.coefficients[1];
                let std_error = fit.std_errors[1];

                log::info!(
                    "Estimated {} with {} rows: {}",
                    realized_formula,
                    fit.n_samples,
                    value
                );

                Ok(CausalEstimate {
                    estimand: estimand.clone(),
                    method,
                    value,
                    std_error: Some(std_error),
                    confidence_interval: Some((
                        value - Z_95 * std_error,
                        value + Z_95 * std_error,
                    )),
                    sample_size: fit.n_samples,
                    realized_formula,
                })
            }
        }
    }
}

pub mod dataset;
pub mod graph;
pub mod render;
pub mod causal;
pub mod estimator;
pub mod shell;
pub mod server;

pub use dataset::{Dataset, DatasetError, DatasetPreview};
pub use graph::{build_graph, CausalGraph, EdgeCandidate, DEFAULT_EDGE_SLOTS};
pub use render::{render_network, RenderError};
pub use causal::{
    CausalEngine,
    CausalError,
    CausalEstimate,
    CausalModel,
    EstimandKind,
    EstimationMethod,
    IdentifiedEstimand,
};
pub use estimator::{run_analysis, AnalysisRequest};
pub use shell::{render, FormState, ShellConfig, ShellError, ShellStage, View};
pub use server::{run_server, ApiError, AppState, ServerConfig};

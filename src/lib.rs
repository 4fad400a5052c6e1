//! `walkgen`: second-order random walks over precomputed transition graphs.
//!
//! Walks are the training corpus for skip-gram style node embeddings. Transition
//! probabilities are computed upstream; this crate only samples from them.
//!
//! Public invariants (must not drift):
//! - **Length**: every walk holds between 1 and its source's walk length nodes; walks end
//!   early only on dead ends (or on dangling references, see [`WalkConfig::strict_references`]).
//! - **Validity**: every step follows a first-travel or second-order table of the node it
//!   leaves; no walk contains a node without its own transition entry.
//! - **Determinism**: identical inputs and seed produce identical batches.
//! - **No silent normalization**: distributions that do not sum to one are rejected with
//!   [`Error::InvalidDistribution`] before any walk is produced.
//!
//! ```
//! use walkgen::{generate_walks, Overrides, TransitionGraph, TransitionNode, WalkConfig};
//!
//! let graph: TransitionGraph<u32> = [
//!     (0, TransitionNode::new().with_first_travel(vec![1], vec![1.0])),
//!     (1, TransitionNode::new()
//!         .with_first_travel(vec![0], vec![1.0])
//!         .with_transitions(0, vec![0], vec![1.0])),
//! ]
//! .into_iter()
//! .collect();
//!
//! let config = WalkConfig { walk_length: 4, num_walks: 2, ..WalkConfig::default() };
//! let walks = generate_walks(&graph, &Overrides::new(), config).unwrap();
//! assert_eq!(walks.len(), 4);
//! assert!(walks.contains(&vec!["0".to_string(), "1".into(), "0".into(), "1".into()]));
//! ```

pub mod graph;
pub mod progress;
pub mod random_walk;
pub mod sampling;

pub use graph::{TransitionGraph, TransitionNode};
pub use progress::{NoProgress, Progress, TracingProgress};
#[cfg(feature = "parallel")]
pub use random_walk::generate_walks_parallel;
pub use random_walk::{
    generate_node_walks, generate_node_walks_for_iterations, generate_walks,
    generate_walks_cancellable, generate_walks_streaming, stringify_walks, Overrides,
    RunSummary, SamplingOverride, Walk, WalkBatch, WalkConfig, WalkRun,
};
pub use sampling::{check_distribution, sample_cdf, DistributionDefect, DISTRIBUTION_TOLERANCE};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid distribution at node {node} ({context}): {defect}")]
    InvalidDistribution { node: String, context: String, defect: DistributionDefect },
    #[error("malformed graph: node {node} references {missing}, which has no transition entry")]
    MalformedGraph { node: String, missing: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

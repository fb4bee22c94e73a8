//! Bagged decision-tree ensemble for binary labels.
//!
//! Each tree is a CART classifier grown on a bootstrap sample of the rows,
//! trying a random subset of features at every node. Predictions average the
//! positive-class fraction of the leaves reached in every tree.
//! - Deterministic for a fixed seed.
//! - Stored as plain node arenas so models serialize to JSON with serde.

mod model;
mod train;

pub use model::{DecisionTree, Node, RandomForest, ShapeMismatch};
pub use train::{FitError, ForestOptions, MaxFeatures, fit_forest};

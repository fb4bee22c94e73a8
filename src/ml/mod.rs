//! Machine learning building blocks for training and inference.
//!
//! The learners are implemented in-crate so the fitted models serialize with
//! serde and load without any framework at prediction time.

pub mod forest;
pub mod multi_output;

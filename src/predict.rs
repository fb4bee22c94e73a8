//! Predictor pipeline: parse one feature row, load the artifact, classify.
//!
//! Output is a JSON array with one inner array per input row, each holding
//! one 0/1 flag per task in label order, e.g. `[[1,0,1,0]]`.

use std::path::Path;

use thiserror::Error;

use crate::artifact::{ArtifactError, ModelArtifact};
use crate::ml::forest::ShapeMismatch;
use crate::schema::{FEATURE_COUNT, FeatureVector};

#[derive(Debug, Error)]
pub enum PredictError {
    /// A feature token is not a decimal number.
    #[error("Feature argument {position} ({token:?}) is not a number")]
    InvalidNumber { position: usize, token: String },
    /// The wrong number of feature tokens was supplied.
    #[error("Expected {expected} feature values but got {actual}")]
    WrongArgumentCount { expected: usize, actual: usize },
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatch),
    #[error("Failed to encode prediction: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Parse exactly [`FEATURE_COUNT`] decimal tokens. Positions in errors are 1-based.
pub fn parse_features<S: AsRef<str>>(tokens: &[S]) -> Result<FeatureVector, PredictError> {
    if tokens.len() != FEATURE_COUNT {
        return Err(PredictError::WrongArgumentCount {
            expected: FEATURE_COUNT,
            actual: tokens.len(),
        });
    }
    let mut values = [0.0f64; FEATURE_COUNT];
    for (idx, (slot, token)) in values.iter_mut().zip(tokens).enumerate() {
        let token = token.as_ref();
        *slot = token
            .trim()
            .parse::<f64>()
            .map_err(|_| PredictError::InvalidNumber {
                position: idx + 1,
                token: token.to_string(),
            })?;
    }
    Ok(FeatureVector::new(values))
}

/// Classify rows with an already loaded artifact.
pub fn predict_with_artifact(
    artifact: &ModelArtifact,
    rows: &[FeatureVector],
) -> Result<Vec<Vec<u8>>, PredictError> {
    rows.iter()
        .map(|row| {
            artifact
                .predict(row)
                .map(|prediction| prediction.flags().to_vec())
                .map_err(PredictError::from)
        })
        .collect()
}

/// Load the artifact at `path` and classify a single row.
pub fn predict_from_path(
    path: &Path,
    features: &FeatureVector,
) -> Result<Vec<Vec<u8>>, PredictError> {
    let artifact = ModelArtifact::load(path)?;
    predict_with_artifact(&artifact, std::slice::from_ref(features))
}

/// Compact JSON rendering of a prediction batch.
pub fn render_output(predictions: &[Vec<u8>]) -> Result<String, PredictError> {
    Ok(serde_json::to_string(predictions)?)
}

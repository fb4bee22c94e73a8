//! Persisted model artifact: the fitted forests plus the column schema they
//! were trained with.
//!
//! The artifact is JSON. Writes go through a temp file in the target
//! directory followed by a rename, so a concurrent reader sees either the old
//! artifact or the new one.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ml::forest::ShapeMismatch;
use crate::ml::multi_output::MultiOutputForest;
use crate::schema::{FeatureVector, Schema, SchemaError, TaskPrediction};

/// Artifact layout version written by this build.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Errors raised while writing or reading an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact exists at the path.
    #[error("Model artifact not found at {path}; run maintpred-train first")]
    Missing { path: PathBuf },
    /// The artifact exists but could not be read.
    #[error("Failed to read model artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The artifact is not valid JSON or does not have the expected layout.
    #[error("Model artifact {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The artifact parsed but its contents are inconsistent.
    #[error("Model artifact {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    /// The artifact was written by an incompatible build.
    #[error("Model artifact {path} has format version {found} but this build reads {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    /// The artifact was trained on different columns.
    #[error("Model artifact {path} was trained on a different schema: {source}")]
    SchemaMismatch {
        path: PathBuf,
        source: SchemaError,
    },
    /// Serializing the artifact failed.
    #[error("Failed to serialize model artifact: {0}")]
    Serialize(serde_json::Error),
    /// Writing the artifact failed.
    #[error("Failed to write model artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Fitted model together with the schema it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub schema: Schema,
    /// Rows the forests were fitted on.
    pub trained_rows: usize,
    pub model: MultiOutputForest,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

impl ModelArtifact {
    /// Wrap a freshly fitted model with the current schema.
    pub fn new(model: MultiOutputForest, trained_rows: usize) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            schema: Schema::current(),
            trained_rows,
            model,
        }
    }

    /// Predict task flags for one row.
    pub fn predict(&self, features: &FeatureVector) -> Result<TaskPrediction, ShapeMismatch> {
        let flags = self.model.predict_row(features.as_slice())?;
        TaskPrediction::from_flags(&flags).ok_or(ShapeMismatch {
            expected: crate::schema::TASK_COUNT,
            actual: flags.len(),
        })
    }

    /// Write the artifact, replacing any existing file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let write_error = |source| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_error)?;

        let bytes = serde_json::to_vec(self).map_err(ArtifactError::Serialize)?;
        let mut temp = tempfile::NamedTempFile::new_in(&dir).map_err(write_error)?;
        temp.write_all(&bytes).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(path).map_err(|err| write_error(err.error))?;

        tracing::info!(
            bytes = bytes.len(),
            outputs = self.model.n_outputs(),
            "Wrote model artifact to {}",
            path.display()
        );
        Ok(())
    }

    /// Read and validate an artifact.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ArtifactError::Missing {
                    path: path.to_path_buf(),
                }
            } else {
                ArtifactError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let corrupt = |source| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            source,
        };

        let header: ArtifactHeader = serde_json::from_slice(&bytes).map_err(corrupt)?;
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: header.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(corrupt)?;

        Schema::current()
            .ensure_matches(&artifact.schema)
            .map_err(|source| ArtifactError::SchemaMismatch {
                path: path.to_path_buf(),
                source,
            })?;
        artifact
            .model
            .validate()
            .map_err(|reason| ArtifactError::Malformed {
                path: path.to_path_buf(),
                reason,
            })?;
        artifact
            .check_model_width()
            .map_err(|source| ArtifactError::SchemaMismatch {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            trained_rows = artifact.trained_rows,
            "Loaded model artifact from {}",
            path.display()
        );
        Ok(artifact)
    }

    fn check_model_width(&self) -> Result<(), SchemaError> {
        if self.model.n_outputs() != self.schema.tasks.len() {
            return Err(SchemaError::ModelWidth {
                kind: "task",
                schema: self.schema.tasks.len(),
                model: self.model.n_outputs(),
            });
        }
        if self.model.feature_count() != self.schema.features.len() {
            return Err(SchemaError::ModelWidth {
                kind: "feature",
                schema: self.schema.features.len(),
                model: self.model.feature_count(),
            });
        }
        Ok(())
    }
}

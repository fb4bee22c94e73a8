//! Trainer pipeline: synthesize, split, fit one forest per task, persist.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;

use crate::artifact::{ArtifactError, ModelArtifact};
use crate::config::{Config, TrainingSettings};
use crate::dataset::{Dataset, SplitError, synthesize};
use crate::ml::forest::FitError;
use crate::ml::multi_output::MultiOutputForest;
use crate::schema::{MaintenanceTask, TASK_COUNT};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Failed to split dataset: {0}")]
    Split(#[from] SplitError),
    #[error("Failed to fit model: {0}")]
    Fit(#[from] FitError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub model_path: PathBuf,
    pub train_rows: usize,
    /// Rows held out from fitting; not evaluated here.
    pub holdout_rows: usize,
    /// Positive labels per task in the training rows.
    pub positives: [usize; TASK_COUNT],
}

/// Synthesize the training dataset described by `settings`.
pub fn build_dataset(settings: &TrainingSettings) -> Dataset {
    let mut rng = match settings.data_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    synthesize(settings.rows, settings.label_source, &mut rng)
}

/// A fitted artifact and the split it came from.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub artifact: ModelArtifact,
    pub train: Dataset,
    pub held_out: Dataset,
}

/// Split `dataset` and fit a model on the training part.
pub fn fit_artifact(
    dataset: &Dataset,
    settings: &TrainingSettings,
) -> Result<FittedModel, TrainError> {
    let (train, held_out) = dataset.train_test_split(settings.test_fraction, settings.split_seed)?;
    tracing::info!(
        train_rows = train.len(),
        held_out_rows = held_out.len(),
        trees = settings.forest.n_trees,
        "Fitting one forest per maintenance task"
    );
    let model = MultiOutputForest::fit(&train.x, &train.y, &settings.forest)?;
    Ok(FittedModel {
        artifact: ModelArtifact::new(model, train.len()),
        train,
        held_out,
    })
}

/// Run the full trainer and write the artifact to `config.model_path`.
pub fn train_and_save(config: &Config) -> Result<TrainSummary, TrainError> {
    let dataset = build_dataset(&config.training);
    let fitted = fit_artifact(&dataset, &config.training)?;
    fitted.artifact.save(&config.model_path)?;

    let mut positives = [0usize; TASK_COUNT];
    for flags in &fitted.train.y {
        for (count, &flag) in positives.iter_mut().zip(flags) {
            *count += usize::from(flag);
        }
    }
    for task in MaintenanceTask::ALL {
        tracing::debug!(task = %task, positives = positives[task.index()], "Training labels");
    }

    Ok(TrainSummary {
        model_path: config.model_path.clone(),
        train_rows: fitted.train.len(),
        holdout_rows: fitted.held_out.len(),
        positives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::{ForestOptions, Node};
    use crate::schema::FeatureVector;
    use tempfile::tempdir;

    fn small_settings() -> TrainingSettings {
        TrainingSettings {
            rows: 200,
            data_seed: Some(11),
            forest: ForestOptions {
                n_trees: 5,
                ..ForestOptions::default()
            },
            ..TrainingSettings::default()
        }
    }

    #[test]
    fn fit_uses_eighty_percent_of_rows() {
        let settings = small_settings();
        let dataset = build_dataset(&settings);
        let fitted = fit_artifact(&dataset, &settings).unwrap();
        assert_eq!(fitted.artifact.trained_rows, 160);
        assert_eq!(fitted.train.len(), 160);
        assert_eq!(fitted.held_out.len(), 40);
        assert_eq!(fitted.artifact.model.n_outputs(), TASK_COUNT);
        assert_eq!(fitted.artifact.model.feature_count(), 5);
    }

    #[test]
    fn seeded_training_is_reproducible() {
        let settings = small_settings();
        let a = fit_artifact(&build_dataset(&settings), &settings).unwrap().artifact;
        let b = fit_artifact(&build_dataset(&settings), &settings).unwrap().artifact;
        assert_eq!(a, b);
    }

    #[test]
    fn trained_artifact_survives_save_and_load_exactly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hhmodel.json");
        let settings = small_settings();
        let fitted = fit_artifact(&build_dataset(&settings), &settings).unwrap();
        fitted.artifact.save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, fitted.artifact);

        // Rows sitting exactly on a split threshold route the same way.
        for forest in &fitted.artifact.model.forests {
            for tree in &forest.trees {
                for node in &tree.nodes {
                    if let Node::Split {
                        feature, threshold, ..
                    } = node
                    {
                        let mut row = [0.5; 5];
                        row[*feature] = *threshold;
                        let features = FeatureVector::new(row);
                        assert_eq!(
                            loaded.predict(&features).unwrap(),
                            fitted.artifact.predict(&features).unwrap()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn train_and_save_writes_loadable_artifact() {
        let dir = tempdir().unwrap();
        let config = Config {
            model_path: dir.path().join("hhmodel.json"),
            training: small_settings(),
        };
        let summary = train_and_save(&config).unwrap();
        assert_eq!(summary.model_path, config.model_path);
        assert_eq!(summary.train_rows, 160);
        assert_eq!(summary.holdout_rows, 40);
        assert!(summary.positives.iter().all(|&count| count <= 160));

        let artifact = ModelArtifact::load(&config.model_path).unwrap();
        let prediction = artifact
            .predict(&FeatureVector::new([0.0, 2000.0, 0.5, 0.5, 0.5]))
            .unwrap();
        assert!(prediction.flags().iter().all(|&flag| flag <= 1));
    }
}

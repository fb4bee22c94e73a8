//! Column schema shared by the trainer and the predictor.
//!
//! Feature and task order is positional: the model only sees row indices, so
//! both sides must agree on the order defined here. The schema is persisted
//! alongside the fitted model and checked again when the artifact is loaded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered feature column names.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["Mileage", "Year", "Feature1", "Feature2", "Feature3"];

/// Number of features in every row.
pub const FEATURE_COUNT: usize = 5;

/// Number of maintenance tasks predicted per row.
pub const TASK_COUNT: usize = 4;

/// Errors raised when a row or a persisted schema does not fit the current one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The number of values does not match the feature count.
    #[error("Expected {expected} feature values but got {actual}")]
    WrongFeatureCount { expected: usize, actual: usize },
    /// A column list differs in length.
    #[error("{kind} schema has {actual} columns but expected {expected}")]
    ColumnCount {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A column differs by name at a given position.
    #[error("{kind} column {index} is {actual:?} but expected {expected:?}")]
    ColumnName {
        kind: &'static str,
        index: usize,
        expected: String,
        actual: String,
    },
    /// A fitted model's width disagrees with the column list.
    #[error("Model has {model} {kind} columns but the schema lists {schema}")]
    ModelWidth {
        kind: &'static str,
        schema: usize,
        model: usize,
    },
}

/// Maintenance tasks in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaintenanceTask {
    OilChange,
    BeltChange,
    BrakeChange,
    TireReplacement,
}

impl MaintenanceTask {
    /// All tasks, in the order labels are stored and predicted.
    pub const ALL: [MaintenanceTask; TASK_COUNT] = [
        MaintenanceTask::OilChange,
        MaintenanceTask::BeltChange,
        MaintenanceTask::BrakeChange,
        MaintenanceTask::TireReplacement,
    ];

    /// Human readable task name, used as the label column name.
    pub fn display_name(self) -> &'static str {
        match self {
            MaintenanceTask::OilChange => "Oil Change",
            MaintenanceTask::BeltChange => "Belt Change",
            MaintenanceTask::BrakeChange => "Brake Change",
            MaintenanceTask::TireReplacement => "Tire Replacement",
        }
    }

    /// Mileage cutoff used by the synthetic label generator.
    pub fn mileage_cutoff(self) -> u32 {
        match self {
            MaintenanceTask::OilChange => 10_000,
            MaintenanceTask::BeltChange => 40_000,
            MaintenanceTask::BrakeChange => 50_000,
            MaintenanceTask::TireReplacement => 60_000,
        }
    }

    /// Position of the task in a label row.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for MaintenanceTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One row of model input, in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Build a row from a slice, rejecting anything but exactly five values.
    pub fn from_slice(values: &[f64]) -> Result<Self, SchemaError> {
        let row: [f64; FEATURE_COUNT] =
            values.try_into().map_err(|_| SchemaError::WrongFeatureCount {
                expected: FEATURE_COUNT,
                actual: values.len(),
            })?;
        Ok(Self(row))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Predicted task flags for a single row, in [`MaintenanceTask::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPrediction([u8; TASK_COUNT]);

impl TaskPrediction {
    /// Convert a raw prediction row, which must hold one 0/1 flag per task.
    pub fn from_flags(flags: &[u8]) -> Option<Self> {
        let row: [u8; TASK_COUNT] = flags.try_into().ok()?;
        row.iter().all(|&flag| flag <= 1).then_some(Self(row))
    }

    pub fn flags(&self) -> [u8; TASK_COUNT] {
        self.0
    }

    /// Tasks predicted as due.
    pub fn active_tasks(&self) -> impl Iterator<Item = MaintenanceTask> + '_ {
        MaintenanceTask::ALL
            .into_iter()
            .filter(|task| self.0[task.index()] == 1)
    }
}

/// Column names persisted with a trained model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub features: Vec<String>,
    pub tasks: Vec<String>,
}

impl Schema {
    /// The schema this build trains and predicts with.
    pub fn current() -> Self {
        Self {
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            tasks: MaintenanceTask::ALL
                .iter()
                .map(|task| task.display_name().to_string())
                .collect(),
        }
    }

    /// Check that `other` lists the same columns in the same order.
    pub fn ensure_matches(&self, other: &Schema) -> Result<(), SchemaError> {
        compare_columns("feature", &self.features, &other.features)?;
        compare_columns("task", &self.tasks, &other.tasks)
    }
}

fn compare_columns(
    kind: &'static str,
    expected: &[String],
    actual: &[String],
) -> Result<(), SchemaError> {
    if expected.len() != actual.len() {
        return Err(SchemaError::ColumnCount {
            kind,
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    for (index, (want, got)) in expected.iter().zip(actual).enumerate() {
        if want != got {
            return Err(SchemaError::ColumnName {
                kind,
                index,
                expected: want.clone(),
                actual: got.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_vector_requires_exactly_five_values() {
        assert!(FeatureVector::from_slice(&[0.0, 2000.0, 0.5, 0.5, 0.5]).is_ok());
        assert_eq!(
            FeatureVector::from_slice(&[1.0, 2.0, 3.0, 4.0]),
            Err(SchemaError::WrongFeatureCount {
                expected: 5,
                actual: 4
            })
        );
        assert!(FeatureVector::from_slice(&[0.0; 6]).is_err());
    }

    #[test]
    fn task_order_matches_label_columns() {
        let names: Vec<_> = MaintenanceTask::ALL
            .iter()
            .map(|task| task.display_name())
            .collect();
        assert_eq!(
            names,
            ["Oil Change", "Belt Change", "Brake Change", "Tire Replacement"]
        );
        assert_eq!(MaintenanceTask::TireReplacement.index(), 3);
    }

    #[test]
    fn active_tasks_follow_flags() {
        let prediction = TaskPrediction::from_flags(&[1, 0, 1, 0]).unwrap();
        let active: Vec<_> = prediction.active_tasks().collect();
        assert_eq!(
            active,
            vec![MaintenanceTask::OilChange, MaintenanceTask::BrakeChange]
        );
        assert!(TaskPrediction::from_flags(&[1, 2, 0, 0]).is_none());
        assert!(TaskPrediction::from_flags(&[1, 0, 0]).is_none());
    }

    #[test]
    fn schema_mismatch_reports_first_difference() {
        let current = Schema::current();
        let mut swapped = current.clone();
        swapped.features.swap(0, 1);
        assert_eq!(
            current.ensure_matches(&swapped),
            Err(SchemaError::ColumnName {
                kind: "feature",
                index: 0,
                expected: "Mileage".into(),
                actual: "Year".into(),
            })
        );

        let mut short = current.clone();
        short.tasks.pop();
        assert!(matches!(
            current.ensure_matches(&short),
            Err(SchemaError::ColumnCount { kind: "task", .. })
        ));
        assert!(current.ensure_matches(&Schema::current()).is_ok());
    }
}

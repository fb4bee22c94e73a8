//! Multi-label wrapper fitting one independent forest per output column.

use serde::{Deserialize, Serialize};

use super::forest::{FitError, ForestOptions, RandomForest, ShapeMismatch, fit_forest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiOutputForest {
    /// One forest per output, in label column order.
    pub forests: Vec<RandomForest>,
}

impl MultiOutputForest {
    /// Fit every label column of `y` against `x` with the same options.
    pub fn fit<R, L>(x: &[R], y: &[L], options: &ForestOptions) -> Result<Self, FitError>
    where
        R: AsRef<[f64]>,
        L: AsRef<[u8]>,
    {
        if x.len() != y.len() {
            return Err(FitError::LengthMismatch {
                rows: x.len(),
                labels: y.len(),
            });
        }
        let n_outputs = y.first().ok_or(FitError::EmptyDataset)?.as_ref().len();
        if n_outputs == 0 {
            return Err(FitError::NoOutputs);
        }
        for (index, labels) in y.iter().enumerate() {
            let actual = labels.as_ref().len();
            if actual != n_outputs {
                return Err(FitError::RaggedLabels {
                    index,
                    expected: n_outputs,
                    actual,
                });
            }
        }

        let mut forests = Vec::with_capacity(n_outputs);
        for output in 0..n_outputs {
            let column: Vec<u8> = y.iter().map(|labels| labels.as_ref()[output]).collect();
            let positives = column.iter().filter(|&&label| label == 1).count();
            tracing::debug!(output, positives, rows = column.len(), "Fitting output");
            forests.push(fit_forest(x, &column, options)?);
        }
        Ok(Self { forests })
    }

    pub fn n_outputs(&self) -> usize {
        self.forests.len()
    }

    /// Row width the forests were fitted on.
    pub fn feature_count(&self) -> usize {
        self.forests
            .first()
            .map(|forest| forest.feature_count)
            .unwrap_or(0)
    }

    /// One 0/1 flag per output for a single row.
    pub fn predict_row(&self, row: &[f64]) -> Result<Vec<u8>, ShapeMismatch> {
        self.forests.iter().map(|forest| forest.predict(row)).collect()
    }

    /// Predict every row; the result has one inner vector per row.
    pub fn predict<R: AsRef<[f64]>>(&self, rows: &[R]) -> Result<Vec<Vec<u8>>, ShapeMismatch> {
        rows.iter()
            .map(|row| self.predict_row(row.as_ref()))
            .collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let feature_count = self.feature_count();
        if self.forests.is_empty() {
            return Err("Model has no outputs".to_string());
        }
        for (idx, forest) in self.forests.iter().enumerate() {
            if forest.feature_count != feature_count {
                return Err(format!(
                    "Output {idx} expects {} features but output 0 expects {feature_count}",
                    forest.feature_count
                ));
            }
            forest
                .validate()
                .map_err(|err| format!("Output {idx}: {err}"))?;
        }
        Ok(())
    }
}

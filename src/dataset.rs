//! Synthetic maintenance dataset and the train/held-out split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{FEATURE_COUNT, MaintenanceTask, TASK_COUNT};

/// Upper bound (exclusive) for synthetic mileage draws.
pub const MILEAGE_LIMIT: u32 = 200_000;
/// Range of synthetic manufacturing years.
pub const YEAR_RANGE: std::ops::Range<u32> = 2000..2023;

/// How synthetic labels are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// Each task thresholds its own fresh mileage draw, unrelated to the row.
    #[default]
    IndependentDraw,
    /// Each task thresholds the row's own mileage.
    RowMileage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("Test fraction {0} must be strictly between 0 and 1")]
    InvalidFraction(String),
    #[error("Cannot split {rows} rows into non-empty train and held-out sets")]
    TooFewRows { rows: usize },
}

/// Feature rows with aligned label rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub x: Vec<[f64; FEATURE_COUNT]>,
    pub y: Vec<[u8; TASK_COUNT]>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Shuffle and split into `(train, held_out)`.
    ///
    /// The held-out set takes `ceil(test_fraction * n)` rows from the front of
    /// the permutation; the rest form the training set.
    pub fn train_test_split(
        &self,
        test_fraction: f64,
        seed: u64,
    ) -> Result<(Dataset, Dataset), SplitError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(SplitError::InvalidFraction(test_fraction.to_string()));
        }
        let n = self.len();
        let n_test = (test_fraction * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(SplitError::TooFewRows { rows: n });
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let (test_idx, train_idx) = order.split_at(n_test);
        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: indices.iter().map(|&i| self.x[i]).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}

/// Generate `rows` synthetic vehicles.
///
/// Columns are drawn one after another (all mileages, then all years, the
/// placeholder features, then each task's labels).
pub fn synthesize<G: Rng>(rows: usize, labels: LabelSource, rng: &mut G) -> Dataset {
    let mileage: Vec<u32> = (0..rows).map(|_| rng.random_range(0..MILEAGE_LIMIT)).collect();
    let year: Vec<u32> = (0..rows).map(|_| rng.random_range(YEAR_RANGE)).collect();
    let placeholders: [Vec<f64>; 3] =
        std::array::from_fn(|_| (0..rows).map(|_| rng.random::<f64>()).collect());

    let mut y = vec![[0u8; TASK_COUNT]; rows];
    for task in MaintenanceTask::ALL {
        let cutoff = task.mileage_cutoff();
        for (row, flags) in y.iter_mut().enumerate() {
            let reference = match labels {
                LabelSource::IndependentDraw => rng.random_range(0..MILEAGE_LIMIT),
                LabelSource::RowMileage => mileage[row],
            };
            flags[task.index()] = u8::from(reference > cutoff);
        }
    }

    let x = (0..rows)
        .map(|row| {
            [
                f64::from(mileage[row]),
                f64::from(year[row]),
                placeholders[0][row],
                placeholders[1][row],
                placeholders[2][row],
            ]
        })
        .collect();
    tracing::debug!(rows, ?labels, "Synthesized dataset");
    Dataset { x, y }
}

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{DecisionTree, Node, RandomForest};

/// Errors raised while fitting a forest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("Empty dataset")]
    EmptyDataset,
    #[error("Mismatched X/Y lengths: {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Row {index} has {actual} values but expected {expected}")]
    RaggedRow {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Label row {index} has {actual} outputs but expected {expected}")]
    RaggedLabels {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Label at row {index} is {value}; labels must be 0 or 1")]
    InvalidLabel { index: usize, value: u8 },
    #[error("Need at least one output column")]
    NoOutputs,
    #[error("Need at least one tree")]
    NoTrees,
    #[error("min_samples_split must be at least 2 (got {0})")]
    MinSamplesSplit(usize),
}

/// Number of features tried at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MaxFeaturesRepr", into = "MaxFeaturesRepr")]
pub enum MaxFeatures {
    /// `floor(sqrt(d))`, at least one.
    Sqrt,
    /// Every feature.
    All,
    /// A fixed count, clamped to `1..=d`.
    Fixed(usize),
}

impl MaxFeatures {
    pub fn resolve(self, feature_count: usize) -> usize {
        let wanted = match self {
            MaxFeatures::Sqrt => (feature_count as f64).sqrt().floor() as usize,
            MaxFeatures::All => feature_count,
            MaxFeatures::Fixed(count) => count,
        };
        wanted.clamp(1, feature_count.max(1))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaxFeaturesRepr {
    Count(usize),
    Name(String),
}

impl TryFrom<MaxFeaturesRepr> for MaxFeatures {
    type Error = String;

    fn try_from(value: MaxFeaturesRepr) -> Result<Self, Self::Error> {
        match value {
            MaxFeaturesRepr::Count(0) => Err("max_features must be at least 1".to_string()),
            MaxFeaturesRepr::Count(count) => Ok(MaxFeatures::Fixed(count)),
            MaxFeaturesRepr::Name(name) => match name.as_str() {
                "sqrt" => Ok(MaxFeatures::Sqrt),
                "all" => Ok(MaxFeatures::All),
                other => Err(format!(
                    "Unknown max_features {other:?} (expected \"sqrt\", \"all\" or a count)"
                )),
            },
        }
    }
}

impl From<MaxFeatures> for MaxFeaturesRepr {
    fn from(value: MaxFeatures) -> Self {
        match value {
            MaxFeatures::Sqrt => MaxFeaturesRepr::Name("sqrt".to_string()),
            MaxFeatures::All => MaxFeaturesRepr::Name("all".to_string()),
            MaxFeatures::Fixed(count) => MaxFeaturesRepr::Count(count),
        }
    }
}

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestOptions {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Features tried per split.
    pub max_features: MaxFeatures,
    /// Depth limit; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
    /// Draw a bootstrap sample per tree instead of using every row.
    pub bootstrap: bool,
    /// Seed for bootstrap draws and feature selection.
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Fit a forest on rows `x` and binary labels `y`.
pub fn fit_forest<R: AsRef<[f64]>>(
    x: &[R],
    y: &[u8],
    options: &ForestOptions,
) -> Result<RandomForest, FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    if x.is_empty() {
        return Err(FitError::EmptyDataset);
    }
    if options.n_trees == 0 {
        return Err(FitError::NoTrees);
    }
    if options.min_samples_split < 2 {
        return Err(FitError::MinSamplesSplit(options.min_samples_split));
    }
    let feature_count = x[0].as_ref().len();
    for (index, row) in x.iter().enumerate() {
        let actual = row.as_ref().len();
        if actual != feature_count {
            return Err(FitError::RaggedRow {
                index,
                expected: feature_count,
                actual,
            });
        }
    }
    if let Some((index, &value)) = y.iter().enumerate().find(|(_, value)| **value > 1) {
        return Err(FitError::InvalidLabel { index, value });
    }

    let grow = GrowParams {
        feature_count,
        max_features: options.max_features.resolve(feature_count),
        max_depth: options.max_depth,
        min_samples_split: options.min_samples_split,
    };
    let n = x.len();
    let mut seeder = StdRng::seed_from_u64(options.seed);
    let tree_seeds: Vec<u64> = (0..options.n_trees).map(|_| seeder.random()).collect();

    let trees = tree_seeds
        .into_iter()
        .map(|tree_seed| {
            let mut rng = StdRng::seed_from_u64(tree_seed);
            let samples: Vec<usize> = if options.bootstrap {
                (0..n).map(|_| rng.random_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            grow_tree(x, y, samples, &grow, &mut rng)
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        trees = trees.len(),
        rows = n,
        max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0),
        "Fitted forest"
    );
    Ok(RandomForest {
        feature_count,
        trees,
    })
}

struct GrowParams {
    feature_count: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
}

struct PendingNode {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn grow_tree<R: AsRef<[f64]>>(
    x: &[R],
    y: &[u8],
    samples: Vec<usize>,
    params: &GrowParams,
    rng: &mut StdRng,
) -> DecisionTree {
    let mut nodes = vec![Node::Leaf { positive: 0.0 }];
    let mut stack = vec![PendingNode {
        node: 0,
        samples,
        depth: 0,
    }];

    while let Some(pending) = stack.pop() {
        let total = pending.samples.len();
        let positives = pending.samples.iter().filter(|&&i| y[i] == 1).count();
        let positive = if total == 0 {
            0.0
        } else {
            positives as f64 / total as f64
        };
        let is_pure = positives == 0 || positives == total;
        let at_depth_limit = params
            .max_depth
            .is_some_and(|limit| pending.depth >= limit);
        if is_pure || total < params.min_samples_split || at_depth_limit {
            nodes[pending.node] = Node::Leaf { positive };
            continue;
        }

        let Some(split) = best_split(x, y, &pending.samples, positives, params, rng) else {
            nodes[pending.node] = Node::Leaf { positive };
            continue;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = pending
            .samples
            .into_iter()
            .partition(|&i| x[i].as_ref()[split.feature] <= split.threshold);
        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf { positive: 0.0 });
        nodes.push(Node::Leaf { positive: 0.0 });
        nodes[pending.node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        stack.push(PendingNode {
            node: right,
            samples: right_samples,
            depth: pending.depth + 1,
        });
        stack.push(PendingNode {
            node: left,
            samples: left_samples,
            depth: pending.depth + 1,
        });
    }

    DecisionTree { nodes }
}

/// Lowest weighted Gini split over a random feature subset.
///
/// Features are visited in random order. At least `max_features` are tried;
/// if none of them separates the samples, the remaining ones are tried too.
fn best_split<R: AsRef<[f64]>>(
    x: &[R],
    y: &[u8],
    samples: &[usize],
    positives: usize,
    params: &GrowParams,
    rng: &mut StdRng,
) -> Option<Split> {
    let mut features: Vec<usize> = (0..params.feature_count).collect();
    features.shuffle(rng);

    let total = samples.len();
    let mut best: Option<Split> = None;
    let mut column: Vec<(f64, u8)> = Vec::with_capacity(total);

    for (visited, &feature) in features.iter().enumerate() {
        if visited >= params.max_features && best.is_some() {
            break;
        }
        column.clear();
        column.extend(samples.iter().map(|&i| (x[i].as_ref()[feature], y[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_total = 0usize;
        let mut left_positives = 0usize;
        for pair in column.windows(2) {
            let (value, label) = pair[0];
            let next = pair[1].0;
            left_total += 1;
            left_positives += usize::from(label);
            if next.is_nan() || next <= value {
                continue;
            }
            let right_total = total - left_total;
            let right_positives = positives - left_positives;
            let impurity = (left_total as f64 * gini(left_positives, left_total)
                + right_total as f64 * gini(right_positives, right_total))
                / total as f64;
            if best.is_none_or(|current| impurity < current.impurity) {
                best = Some(Split {
                    feature,
                    threshold: midpoint(value, next),
                    impurity,
                });
            }
        }
    }
    best
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low / 2.0 + high / 2.0;
    if mid >= high || !mid.is_finite() { low } else { mid }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A row did not have the width the model was fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Row has {actual} features but the model was fitted on {expected}")]
pub struct ShapeMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// Tree node stored in a flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Terminal node holding the fraction of positive training samples.
    Leaf { positive: f64 },
    /// Routes `row[feature] <= threshold` to `left`, everything else to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary CART classifier. Node 0 is the root; children always sit at higher
/// indices than their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Probability of the positive class for a row.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { positive }) => return *positive,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max_depth = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                let child_depth = depths[idx] + 1;
                for child in [*left, *right] {
                    if let Some(slot) = depths.get_mut(child) {
                        *slot = child_depth;
                    }
                }
                max_depth = max_depth.max(child_depth);
            }
        }
        max_depth
    }

    /// Validate structural invariants of a tree loaded from disk.
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { positive } => {
                    if !(0.0..=1.0).contains(positive) {
                        return Err(format!("Leaf {idx} has probability {positive} outside [0, 1]"));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= feature_count {
                        return Err(format!(
                            "Node {idx} splits on feature {feature} but rows have {feature_count}"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("Node {idx} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("Node {idx} points at invalid child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ensemble of decision trees voting on one binary label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Row width seen at fit time.
    pub feature_count: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Mean positive-class probability across all trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64, ShapeMismatch> {
        self.check_width(row)?;
        if self.trees.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict_proba(row)).sum();
        Ok(total / self.trees.len() as f64)
    }

    /// Predicted label; ties resolve to the negative class.
    pub fn predict(&self, row: &[f64]) -> Result<u8, ShapeMismatch> {
        Ok(u8::from(self.predict_proba(row)? > 0.5))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("Forest has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count)
                .map_err(|err| format!("Tree {idx}: {err}"))?;
        }
        Ok(())
    }

    fn check_width(&self, row: &[f64]) -> Result<(), ShapeMismatch> {
        if row.len() == self.feature_count {
            Ok(())
        } else {
            Err(ShapeMismatch {
                expected: self.feature_count,
                actual: row.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f64, left: f64, right: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { positive: left },
                Node::Leaf { positive: right },
            ],
        }
    }

    #[test]
    fn tree_routes_on_threshold() {
        let tree = stump(0.5, 0.0, 1.0);
        assert_eq!(tree.predict_proba(&[0.5]), 0.0);
        assert_eq!(tree.predict_proba(&[0.6]), 1.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn forest_averages_and_breaks_ties_low() {
        let forest = RandomForest {
            feature_count: 1,
            trees: vec![stump(0.5, 0.0, 1.0), stump(1.5, 0.0, 1.0)],
        };
        assert_eq!(forest.predict_proba(&[1.0]).unwrap(), 0.5);
        assert_eq!(forest.predict(&[1.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[2.0]).unwrap(), 1);
    }

    #[test]
    fn forest_rejects_wrong_width() {
        let forest = RandomForest {
            feature_count: 1,
            trees: vec![stump(0.5, 0.0, 1.0)],
        };
        assert_eq!(
            forest.predict(&[1.0, 2.0]),
            Err(ShapeMismatch {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn validate_catches_backward_children() {
        let tree = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 1,
                },
                Node::Leaf { positive: 1.0 },
            ],
        };
        assert!(tree.validate(1).is_err());
        assert!(stump(0.5, 0.0, 1.0).validate(1).is_ok());
        assert!(stump(0.5, 0.0, 1.0).validate(0).is_err());
    }
}

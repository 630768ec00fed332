//! Gradient-boosted regression trees
//!
//! Least-squares boosting over depth-limited trees with greedy splits and
//! shrinkage. Training is fully deterministic: identical inputs produce an
//! identical forest, which keeps artifact fingerprints reproducible.

use super::Regressor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtParams {
    /// Number of boosting rounds
    pub trees: usize,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum rows per leaf; splits that would go below are rejected
    pub min_leaf: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            trees: 200,
            learning_rate: 0.05,
            max_depth: 4,
            min_leaf: 8,
        }
    }
}

/// One node of a regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let value = row.get(*feature).copied().unwrap_or(0.0);
                if value <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

/// A fitted forest. Serialized verbatim into the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtModel {
    pub base_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<TreeNode>,
}

impl Regressor for GbdtModel {
    fn predict(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        self.base_score + self.learning_rate * boost
    }
}

/// Fits a [`GbdtModel`] on a wide feature matrix
#[derive(Debug, Clone, Default)]
pub struct GbdtTrainer {
    params: GbdtParams,
}

impl GbdtTrainer {
    pub fn new(params: GbdtParams) -> Self {
        Self { params }
    }

    /// Fit on `rows` (feature-major) against `targets`. Caller guarantees
    /// equal lengths and a non-empty matrix.
    pub fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> GbdtModel {
        let n = targets.len();
        let base_score = if n == 0 {
            0.0
        } else {
            targets.iter().sum::<f64>() / n as f64
        };
        let mut predictions = vec![base_score; n];
        let mut trees = Vec::with_capacity(self.params.trees);
        let indices: Vec<usize> = (0..n).collect();

        for round in 0..self.params.trees {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();
            let sse: f64 = residuals.iter().map(|r| r * r).sum();
            if sse < 1e-12 {
                debug!(round, "residuals exhausted, stopping early");
                break;
            }
            let tree = self.build_tree(rows, &residuals, &indices, 0);
            for (i, prediction) in predictions.iter_mut().enumerate() {
                *prediction += self.params.learning_rate * tree.predict(&rows[i]);
            }
            trees.push(tree);
        }

        GbdtModel {
            base_score,
            learning_rate: self.params.learning_rate,
            trees,
        }
    }

    fn build_tree(
        &self,
        rows: &[Vec<f64>],
        residuals: &[f64],
        indices: &[usize],
        depth: usize,
    ) -> TreeNode {
        let leaf = |idx: &[usize]| {
            let sum: f64 = idx.iter().map(|&i| residuals[i]).sum();
            TreeNode::Leaf {
                value: sum / idx.len().max(1) as f64,
            }
        };

        if depth >= self.params.max_depth || indices.len() < 2 * self.params.min_leaf {
            return leaf(indices);
        }

        let Some((feature, threshold)) = self.best_split(rows, residuals, indices) else {
            return leaf(indices);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i].get(feature).copied().unwrap_or(0.0) <= threshold);
        if left.is_empty() || right.is_empty() {
            return leaf(indices);
        }

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.build_tree(rows, residuals, &left, depth + 1)),
            right: Box::new(self.build_tree(rows, residuals, &right, depth + 1)),
        }
    }

    /// Best (feature, threshold) by squared-error reduction, or `None` when
    /// no split beats keeping the node whole
    fn best_split(
        &self,
        rows: &[Vec<f64>],
        residuals: &[f64],
        indices: &[usize],
    ) -> Option<(usize, f64)> {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let total_sum: f64 = indices.iter().map(|&i| residuals[i]).sum();
        let parent_score = total_sum * total_sum / indices.len() as f64;

        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..n_features {
            let mut pairs: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (rows[i].get(feature).copied().unwrap_or(0.0), residuals[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left_sum = 0.0;
            for split_at in 1..pairs.len() {
                left_sum += pairs[split_at - 1].1;
                if pairs[split_at].0 == pairs[split_at - 1].0 {
                    continue;
                }
                if split_at < self.params.min_leaf || pairs.len() - split_at < self.params.min_leaf
                {
                    continue;
                }
                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / split_at as f64
                    + right_sum * right_sum / (pairs.len() - split_at) as f64;
                if score > parent_score + 1e-12
                    && best.map(|(_, _, s)| score > s).unwrap_or(true)
                {
                    let threshold = (pairs[split_at - 1].0 + pairs[split_at].0) / 2.0;
                    best = Some((feature, threshold, score));
                }
            }
        }
        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 10 when x0 < 0.5, else 30; second feature is noise-free filler
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![i as f64 / 40.0, 1.0])
            .collect();
        let targets: Vec<f64> = rows
            .iter()
            .map(|r| if r[0] < 0.5 { 10.0 } else { 30.0 })
            .collect();
        (rows, targets)
    }

    #[test]
    fn test_fit_learns_a_step_function() {
        let (rows, targets) = step_dataset();
        let model = GbdtTrainer::new(GbdtParams {
            trees: 50,
            learning_rate: 0.3,
            max_depth: 2,
            min_leaf: 2,
        })
        .fit(&rows, &targets);

        assert!((model.predict(&[0.1, 1.0]) - 10.0).abs() < 1.0);
        assert!((model.predict(&[0.9, 1.0]) - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (rows, targets) = step_dataset();
        let trainer = GbdtTrainer::default();
        let a = trainer.fit(&rows, &targets);
        let b = trainer.fit(&rows, &targets);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_target_collapses_to_base_score() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let targets = vec![7.5; 20];
        let model = GbdtTrainer::default().fit(&rows, &targets);
        assert_eq!(model.base_score, 7.5);
        assert!((model.predict(&[3.0]) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_model_serde_round_trip() {
        let (rows, targets) = step_dataset();
        let model = GbdtTrainer::default().fit(&rows, &targets);
        let json = serde_json::to_string(&model).unwrap();
        let restored: GbdtModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, restored);
    }

    #[test]
    fn test_short_row_scores_without_panicking() {
        let (rows, targets) = step_dataset();
        let model = GbdtTrainer::default().fit(&rows, &targets);
        // Missing trailing feature reads as 0.0
        let _ = model.predict(&[0.2]);
    }
}

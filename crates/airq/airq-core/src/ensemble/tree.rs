//! CART regression tree
//!
//! Greedy binary splits chosen by variance reduction. Thresholds sit halfway
//! between adjacent distinct feature values; rows with `x <= threshold` go left.
//! Nodes live in a flat arena and are grown with an explicit work stack, so
//! deep trees on sorted inputs cannot exhaust the call stack.

use airq_spi::ForestParams;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    /// Depth limit (root is depth 0)
    pub max_depth: Option<usize>,
    /// Minimum rows required to attempt a split
    pub min_samples_split: usize,
    /// Minimum rows in each child
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl From<&ForestParams> for TreeParams {
    fn from(params: &ForestParams) -> Self {
        Self {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            min_samples_leaf: params.min_samples_leaf.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct Pending {
    node: usize,
    indices: Vec<usize>,
    depth: usize,
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total impurity decrease contributed by each feature
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows selected by `indices` (duplicates allowed).
    ///
    /// Every row must have the same number of features. An empty selection
    /// yields a single leaf predicting 0.
    pub fn fit<R: AsRef<[f64]>>(
        rows: &[R],
        targets: &[f64],
        indices: &[usize],
        params: &TreeParams,
    ) -> Self {
        let n_features = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut tree = Self {
            nodes: vec![Node::Leaf { value: 0.0 }],
            n_features,
            impurity_decrease: vec![0.0; n_features],
        };
        if indices.is_empty() {
            return tree;
        }

        let mut stack = vec![Pending {
            node: 0,
            indices: indices.to_vec(),
            depth: 0,
        }];

        while let Some(pending) = stack.pop() {
            let n = pending.indices.len();
            let sum: f64 = pending.indices.iter().map(|&i| targets[i]).sum();
            let sum_sq: f64 = pending.indices.iter().map(|&i| targets[i] * targets[i]).sum();
            let node_sse = (sum_sq - sum * sum / n as f64).max(0.0);

            let depth_ok = params.max_depth.map_or(true, |d| pending.depth < d);
            let split = if depth_ok && n >= params.min_samples_split && node_sse > 1e-12 {
                best_split(rows, targets, &pending.indices, n_features, params.min_samples_leaf)
            } else {
                None
            };

            let Some(split) = split else {
                tree.nodes[pending.node] = Node::Leaf {
                    value: sum / n as f64,
                };
                continue;
            };

            tree.impurity_decrease[split.feature] += split.gain;

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = pending
                .indices
                .iter()
                .partition(|&&i| rows[i].as_ref()[split.feature] <= split.threshold);

            let left = tree.nodes.len();
            let right = left + 1;
            tree.nodes.push(Node::Leaf { value: 0.0 });
            tree.nodes.push(Node::Leaf { value: 0.0 });
            tree.nodes[pending.node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push(Pending {
                node: right,
                indices: right_rows,
                depth: pending.depth + 1,
            });
            stack.push(Pending {
                node: left,
                indices: left_rows,
                depth: pending.depth + 1,
            });
        }

        tree
    }

    /// Predict one row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Check that the node arena is a well-formed tree over `n_features`
    /// inputs.
    ///
    /// Children are always pushed after their parent, so every child index
    /// must be in range and greater than the index of the node that points to
    /// it. That also rules out cycles, so `predict` cannot loop or index out of
    /// bounds on a tree that passes.
    pub fn check_structure(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.n_features != n_features {
            return Err(format!(
                "tree has {} features, expected {}",
                self.n_features, n_features
            ));
        }
        if self.impurity_decrease.len() != n_features {
            return Err(format!(
                "tree has {} importance entries, expected {}",
                self.impurity_decrease.len(),
                n_features
            ));
        }
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } if !value.is_finite() => {
                    return Err(format!("node {} has non-finite leaf value", index));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {}", index, feature));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {} has NaN threshold", index));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(format!("node {} has child index {}", index, child));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of features the tree was grown on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[node] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Impurity decrease per feature, normalized to sum to 1.
    ///
    /// All zeros for a tree that never split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.n_features];
        }
        self.impurity_decrease.iter().map(|d| d / total).collect()
    }
}

/// Best variance-reducing split across all features, if any is admissible.
fn best_split<R: AsRef<[f64]>>(
    rows: &[R],
    targets: &[f64],
    indices: &[usize],
    n_features: usize,
    min_leaf: usize,
) -> Option<Split> {
    let n = indices.len();
    if n < 2 * min_leaf {
        return None;
    }

    let total_sum: f64 = indices.iter().map(|&i| targets[i]).sum();
    let parent_score = total_sum * total_sum / n as f64;

    let mut best: Option<(Split, f64)> = None;
    let mut sorted = indices.to_vec();

    for feature in 0..n_features {
        let value = |i: usize| rows[i].as_ref()[feature];
        sorted.sort_by(|&a, &b| value(a).total_cmp(&value(b)));

        let mut left_sum = 0.0;
        for split_at in 1..n {
            left_sum += targets[sorted[split_at - 1]];

            let n_left = split_at;
            let n_right = n - split_at;
            if n_left < min_leaf {
                continue;
            }
            if n_right < min_leaf {
                break;
            }

            let lo = value(sorted[split_at - 1]);
            let hi = value(sorted[split_at]);
            if lo >= hi {
                continue;
            }

            let right_sum = total_sum - left_sum;
            // Maximising this is equivalent to minimising the children's SSE.
            let score = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;

            if best.map_or(true, |(_, s)| score > s) {
                let mut threshold = (lo + hi) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                let split = Split {
                    feature,
                    threshold,
                    gain: (score - parent_score).max(0.0),
                };
                best = Some((split, score));
            }
        }
    }

    best.map(|(split, _)| split)
}

//! Random forest classifier for the binary dropout label.
//!
//! Trees are CART classifiers grown on Gini impurity. Each tree sees a
//! bootstrap sample of the rows and, at every node, a random subset of the
//! features. Every random draw comes from a `ChaCha8Rng`, so a fit is fully
//! determined by [`ForestParams::random_seed`] and the input.
//!
//! Leaves store the fraction of dropout rows that reached them; the forest
//! probability is the mean of those fractions over all trees.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MaxFeatures;
use crate::error::{LearningError, Result};
use crate::matrix::Matrix;

/// Hyperparameters of a [`RandomForest`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub random_seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            random_seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        dropout_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Weighted impurity decrease, in sample counts.
        gain: f64,
    },
}

/// A single CART tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grow a tree on every row of `x` (no bootstrap).
    ///
    /// # Errors
    ///
    /// Same conditions as [`RandomForest::fit`].
    pub fn fit(x: &Matrix, y: &[u8], params: &ForestParams) -> Result<Self> {
        check_training_set(x, y)?;
        let rng = ChaCha8Rng::seed_from_u64(params.random_seed);
        let samples = (0..x.n_rows()).collect();
        Ok(TreeBuilder::new(x, y, params, rng).grow(samples))
    }

    /// Dropout fraction of the leaf `row` falls into.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { dropout_fraction } => return *dropout_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf; a lone root leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[index] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        deepest
    }

    /// Impurity-decrease importances normalised to sum to 1.
    ///
    /// Returns `None` for a tree without splits.
    pub fn feature_importances(&self, n_features: usize) -> Option<Vec<f64>> {
        let mut importances = vec![0.0; n_features];
        for node in &self.nodes {
            if let Node::Split { feature, gain, .. } = node {
                importances[*feature] += gain;
            }
        }
        let total: f64 = importances.iter().sum();
        if total <= 0.0 {
            return None;
        }
        importances.iter_mut().for_each(|v| *v /= total);
        Some(importances)
    }

    /// Check that every split points forward to an existing node and reads a
    /// feature below `n_features`, so [`predict_row`](Self::predict_row)
    /// cannot index out of bounds or loop.
    pub(crate) fn check_structure(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            else {
                continue;
            };
            if *feature >= n_features {
                return Err(format!(
                    "node {index} splits on feature {feature} of {n_features}"
                ));
            }
            for child in [*left, *right] {
                if child <= index || child >= self.nodes.len() {
                    return Err(format!(
                        "node {index} points to node {child} of {}",
                        self.nodes.len()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Gini impurity of a node with `n` rows of which `ones` are dropouts.
#[inline]
fn gini(n: usize, ones: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = ones as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    weighted_impurity: f64,
}

struct TreeBuilder<'a> {
    x: &'a Matrix,
    y: &'a [u8],
    max_features: usize,
    min_samples_split: usize,
    max_depth: Option<usize>,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
    features: Vec<usize>,
    sorted: Vec<(f64, u8)>,
}

impl<'a> TreeBuilder<'a> {
    fn new(x: &'a Matrix, y: &'a [u8], params: &ForestParams, rng: ChaCha8Rng) -> Self {
        Self {
            x,
            y,
            max_features: params.max_features.resolve(x.n_cols()),
            min_samples_split: params.min_samples_split,
            max_depth: params.max_depth,
            rng,
            nodes: Vec::new(),
            features: (0..x.n_cols()).collect(),
            sorted: Vec::with_capacity(x.n_rows()),
        }
    }

    fn grow(mut self, samples: Vec<usize>) -> DecisionTree {
        self.nodes.push(Node::Leaf {
            dropout_fraction: 0.0,
        });
        let mut stack = vec![(0usize, samples, 0usize)];

        while let Some((index, samples, depth)) = stack.pop() {
            let n = samples.len();
            let ones = samples.iter().filter(|&&s| self.y[s] == 1).count();
            let splittable = n >= self.min_samples_split
                && ones > 0
                && ones < n
                && self.max_depth.is_none_or(|max| depth < max);

            let candidate = if splittable {
                self.best_split(&samples, ones)
            } else {
                None
            };

            let Some(split) = candidate else {
                self.nodes[index] = Node::Leaf {
                    dropout_fraction: ones as f64 / n as f64,
                };
                continue;
            };

            let x = self.x;
            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&s| x.get(s, split.feature) <= split.threshold);

            let left_index = self.nodes.len();
            let right_index = left_index + 1;
            self.nodes.push(Node::Leaf {
                dropout_fraction: 0.0,
            });
            self.nodes.push(Node::Leaf {
                dropout_fraction: 0.0,
            });
            self.nodes[index] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left: left_index,
                right: right_index,
                gain: n as f64 * (gini(n, ones) - split.weighted_impurity),
            };

            stack.push((right_index, right, depth + 1));
            stack.push((left_index, left, depth + 1));
        }

        DecisionTree { nodes: self.nodes }
    }

    /// Best Gini split over a random subset of features.
    ///
    /// Features are drawn without replacement until `max_features` non-constant
    /// ones have been evaluated or every feature has been drawn.
    fn best_split(&mut self, samples: &[usize], ones: usize) -> Option<SplitCandidate> {
        let (x, y) = (self.x, self.y);
        let n_features = self.features.len();
        let n = samples.len();
        let mut best: Option<SplitCandidate> = None;
        let mut evaluated = 0;

        for i in 0..n_features {
            if evaluated >= self.max_features {
                break;
            }
            let j = self.rng.gen_range(i..n_features);
            self.features.swap(i, j);
            let feature = self.features[i];

            self.sorted.clear();
            self.sorted
                .extend(samples.iter().map(|&s| (x.get(s, feature), y[s])));
            self.sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            if self.sorted[0].0 >= self.sorted[n - 1].0 {
                continue;
            }
            evaluated += 1;

            let mut left_n = 0;
            let mut left_ones = 0;
            for k in 1..n {
                let (previous, label) = self.sorted[k - 1];
                left_n += 1;
                left_ones += usize::from(label);

                let current = self.sorted[k].0;
                if current <= previous {
                    continue;
                }

                let right_n = n - left_n;
                let weighted_impurity = (left_n as f64 * gini(left_n, left_ones)
                    + right_n as f64 * gini(right_n, ones - left_ones))
                    / n as f64;

                if best
                    .as_ref()
                    .is_none_or(|b| weighted_impurity < b.weighted_impurity)
                {
                    let mut threshold = previous / 2.0 + current / 2.0;
                    if threshold >= current || !threshold.is_finite() {
                        threshold = previous;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        weighted_impurity,
                    });
                }
            }
        }

        best
    }
}

fn check_training_set(x: &Matrix, y: &[u8]) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(LearningError::InvalidData(format!(
            "{} feature rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    if y.is_empty() {
        return Err(LearningError::TrainingFailed(
            "cannot fit on an empty training set".to_string(),
        ));
    }
    if x.n_cols() == 0 {
        return Err(LearningError::TrainingFailed(
            "training set has no predictor columns".to_string(),
        ));
    }
    let ones = y.iter().filter(|&&label| label == 1).count();
    if ones == 0 || ones == y.len() {
        return Err(LearningError::TrainingFailed(
            "training labels contain a single class".to_string(),
        ));
    }
    Ok(())
}

/// Bagged ensemble of [`DecisionTree`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit `params.n_estimators` trees on bootstrap samples of `(x, y)`.
    ///
    /// # Errors
    ///
    /// - [`LearningError::TrainingFailed`] if the set is empty, has no columns,
    ///   or holds a single class
    /// - [`LearningError::TrainingFailed`] if `params.n_estimators` is 0
    /// - [`LearningError::InvalidData`] if `x` and `y` disagree in length
    pub fn fit(x: &Matrix, y: &[u8], params: &ForestParams) -> Result<Self> {
        if params.n_estimators == 0 {
            return Err(LearningError::TrainingFailed(
                "a forest needs at least one tree".to_string(),
            ));
        }
        check_training_set(x, y)?;

        let n = x.n_rows();
        let mut seeder = ChaCha8Rng::seed_from_u64(params.random_seed);
        let seeds: Vec<u64> = (0..params.n_estimators)
            .map(|_| seeder.next_u64())
            .collect();

        let trees: Vec<DecisionTree> = seeds
            .into_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                TreeBuilder::new(x, y, params, rng).grow(bootstrap)
            })
            .collect();

        let importances = average_importances(&trees, x.n_cols());

        debug!(
            trees = trees.len(),
            nodes = trees.iter().map(DecisionTree::node_count).sum::<usize>(),
            rows = n,
            features = x.n_cols(),
            "Fitted random forest"
        );

        Ok(Self {
            params: *params,
            n_features: x.n_cols(),
            trees,
            importances,
        })
    }

    /// Probability of the dropout class for every row.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if `x` has the wrong width.
    pub fn dropout_probabilities(&self, x: &Matrix) -> Result<Vec<f64>> {
        if x.n_cols() != self.n_features {
            return Err(LearningError::InvalidData(format!(
                "expected {} features, got {}",
                self.n_features,
                x.n_cols()
            )));
        }
        let n_trees = self.trees.len() as f64;
        Ok((0..x.n_rows())
            .map(|r| {
                let row = x.row(r);
                self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees
            })
            .collect())
    }

    /// `[P(graduate), P(dropout)]` for every row.
    ///
    /// # Errors
    ///
    /// See [`dropout_probabilities`](Self::dropout_probabilities).
    pub fn predict_proba(&self, x: &Matrix) -> Result<Vec<[f64; 2]>> {
        Ok(self
            .dropout_probabilities(x)?
            .into_iter()
            .map(|p| [1.0 - p, p])
            .collect())
    }

    /// Class 1 where the dropout probability exceeds 0.5, else 0.
    ///
    /// # Errors
    ///
    /// See [`dropout_probabilities`](Self::dropout_probabilities).
    pub fn predict(&self, x: &Matrix) -> Result<Vec<u8>> {
        Ok(self
            .dropout_probabilities(x)?
            .into_iter()
            .map(|p| u8::from(p > 0.5))
            .collect())
    }

    /// Mean decrease in impurity per feature; sums to 1 when any tree split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Structural check for a forest decoded from untrusted bytes.
    pub(crate) fn check_structure(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if self.importances.len() != self.n_features {
            return Err(format!(
                "{} importances for {} features",
                self.importances.len(),
                self.n_features
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check_structure(self.n_features)
                .map_err(|reason| format!("tree {i}: {reason}"))?;
        }
        Ok(())
    }
}

fn average_importances(trees: &[DecisionTree], n_features: usize) -> Vec<f64> {
    let per_tree: Vec<Vec<f64>> = trees
        .iter()
        .filter_map(|tree| tree.feature_importances(n_features))
        .collect();

    let mut mean = vec![0.0; n_features];
    if per_tree.is_empty() {
        return mean;
    }
    for importances in &per_tree {
        for (total, value) in mean.iter_mut().zip(importances) {
            *total += value;
        }
    }
    let sum: f64 = mean.iter().sum();
    if sum > 0.0 {
        mean.iter_mut().for_each(|v| *v /= sum);
    }
    mean
}

//! Stratified train/test splitting and k-fold cross-validation.
//!
//! Both splitters shuffle each class separately with a seeded `ChaCha8Rng`
//! so that class proportions carry over to every subset and a run is
//! reproducible from its seed.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::error::{LearningError, Result};

/// Row indices of each class, in ascending order. Index 0 holds class 0.
fn class_indices(labels: &[u8]) -> [Vec<usize>; 2] {
    let mut classes = [Vec::new(), Vec::new()];
    for (index, label) in labels.iter().enumerate() {
        classes[usize::from(*label == 1)].push(index);
    }
    classes
}

/// Split row indices into `(train, test)` preserving class proportions.
///
/// The test set holds `ceil(test_size · n)` rows. Each class gets its
/// proportional share of the test set; leftover rows go to the classes with
/// the largest fractional remainder. Both index lists are sorted ascending.
///
/// # Errors
///
/// Returns [`LearningError::InvalidData`] if `test_size` leaves either side
/// empty.
///
/// # Example
///
/// ```
/// use evasao_learning::validation::stratified_train_test_split;
///
/// let labels: Vec<u8> = (0..1000).map(|i| u8::from(i < 400)).collect();
/// let (train, test) = stratified_train_test_split(&labels, 0.2, 42).unwrap();
///
/// assert_eq!(test.len(), 200);
/// assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 80);
/// assert_eq!(train.len(), 800);
/// ```
pub fn stratified_train_test_split(
    labels: &[u8],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = labels.len();
    let n_test = (test_size * n as f64 - 1e-9).ceil().max(0.0) as usize;
    if n_test == 0 || n_test >= n {
        return Err(LearningError::InvalidData(format!(
            "test_size {test_size} leaves an empty train or test set for {n} rows"
        )));
    }

    let classes = class_indices(labels);
    let quotas = test_quotas([classes[0].len(), classes[1].len()], n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for (mut members, quota) in classes.into_iter().zip(quotas) {
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..quota]);
        train.extend_from_slice(&members[quota..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    Ok((train, test))
}

/// Per-class share of `n_test` by largest remainder.
fn test_quotas(counts: [usize; 2], n_test: usize) -> [usize; 2] {
    let n: usize = counts.iter().sum();
    let mut quotas = counts.map(|count| count * n_test / n);
    let remainders = counts.map(|count| count * n_test % n);

    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        remainders[b]
            .cmp(&remainders[a])
            .then(counts[b].cmp(&counts[a]))
    });

    let mut leftover = n_test - quotas.iter().sum::<usize>();
    for class in order {
        if leftover == 0 {
            break;
        }
        if quotas[class] < counts[class] {
            quotas[class] += 1;
            leftover -= 1;
        }
    }
    quotas
}

/// Stratified k-fold splitter with shuffling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl StratifiedKFold {
    #[must_use]
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// `(train, test)` index pairs, one per fold.
    ///
    /// Each class is shuffled and dealt round-robin over the folds, so fold
    /// sizes differ by at most one overall and per class.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if `n_splits < 2` or a class
    /// present in `labels` has fewer members than `n_splits`.
    pub fn split(&self, labels: &[u8]) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(LearningError::InvalidData(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }

        let classes = class_indices(labels);
        for (class, members) in classes.iter().enumerate() {
            if !members.is_empty() && members.len() < self.n_splits {
                return Err(LearningError::InvalidData(format!(
                    "class {class} has {} rows, fewer than {} folds",
                    members.len(),
                    self.n_splits
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut fold_of = vec![0usize; labels.len()];
        let mut position = 0;
        for mut members in classes {
            members.shuffle(&mut rng);
            for index in members {
                fold_of[index] = position % self.n_splits;
                position += 1;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                (0..labels.len()).partition(|&index| fold_of[index] != fold)
            })
            .collect())
    }
}

//! Seeded, label-stratified train/test split.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use std::collections::BTreeMap;

/// Row indices of each partition, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Compute a stratified split of `labels`.
///
/// The test partition has `ceil(test_size * n)` rows. Each class contributes
/// `floor(test_size' * n_class)` rows and the remaining slots go to the
/// classes with the largest fractional remainders, so class proportions are
/// preserved up to rounding in both partitions. The result depends only on
/// the labels and the seed.
pub fn stratified_split(labels: &[i64], test_size: f64, seed: u64) -> Result<SplitIndices> {
    let n = labels.len();
    if n == 0 {
        return Err(PipelineError::InvalidSplit("no rows to split".to_string()));
    }
    if test_size.is_nan() || test_size <= 0.0 || test_size >= 1.0 {
        return Err(PipelineError::InvalidSplit(format!(
            "test fraction {test_size} outside (0, 1)"
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n - n_test;
    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::InvalidSplit(format!(
            "{n} rows cannot give non-empty partitions at test fraction {test_size}"
        )));
    }

    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        classes.entry(label).or_default().push(i);
    }
    if let Some((label, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(PipelineError::InvalidSplit(format!(
            "class {label} has {} member(s); stratification needs at least 2",
            members.len()
        )));
    }
    if n_test < classes.len() || n_train < classes.len() {
        return Err(PipelineError::InvalidSplit(format!(
            "partitions of {n_train}/{n_test} rows cannot hold all {} classes",
            classes.len()
        )));
    }

    let allocation = allocate_test_counts(&classes, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for ((_, members), class_test) in classes.iter().zip(allocation) {
        let mut members = members.clone();
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..class_test]);
        train.extend_from_slice(&members[class_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(SplitIndices { train, test })
}

/// Largest-remainder allocation of `n_test` rows across classes.
///
/// Each class keeps at least one row in each partition.
fn allocate_test_counts(classes: &BTreeMap<i64, Vec<usize>>, n_test: usize) -> Vec<usize> {
    let n: usize = classes.values().map(Vec::len).sum();
    let fraction = n_test as f64 / n as f64;

    let exact: Vec<f64> = classes.values().map(|m| m.len() as f64 * fraction).collect();
    let mut counts: Vec<usize> = exact
        .iter()
        .zip(classes.values())
        .map(|(e, m)| (e.floor() as usize).clamp(1, m.len() - 1))
        .collect();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let sizes: Vec<usize> = classes.values().map(Vec::len).collect();
    let mut assigned: usize = counts.iter().sum();

    // Distribute missing slots by remainder, then take back any excess.
    while assigned < n_test {
        let Some(&k) = order.iter().find(|&&k| counts[k] + 1 < sizes[k]) else {
            break;
        };
        counts[k] += 1;
        assigned += 1;
        order.retain(|&o| o != k);
        order.push(k);
    }
    while assigned > n_test {
        let Some(&k) = order.iter().rev().find(|&&k| counts[k] > 1) else {
            break;
        };
        counts[k] -= 1;
        assigned -= 1;
        order.retain(|&o| o != k);
        order.insert(0, k);
    }

    counts
}

/// Gather rows of a matrix.
pub fn take_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

/// Gather entries of a vector.
pub fn take_entries<T: Clone>(y: &Array1<T>, indices: &[usize]) -> Array1<T> {
    indices.iter().map(|&i| y[i].clone()).collect()
}

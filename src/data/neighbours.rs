use faer::MatRef;
use num_traits::Float;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::data::structures::NeighbourList;

//////////////////////
// Distance helpers //
//////////////////////

/// Euclidean distance between row `i` of `a` and row `j` of `b`
#[inline]
fn row_distance<T>(a: MatRef<T>, i: usize, b: MatRef<T>, j: usize) -> T
where
    T: Float,
{
    let mut acc = T::zero();
    for d in 0..a.ncols() {
        let diff = a[(i, d)] - b[(j, d)];
        acc = acc + diff * diff;
    }
    acc.sqrt()
}

/// Sort candidate (distance, index) pairs and keep the closest `k`
fn keep_closest<T>(mut candidates: Vec<(T, usize)>, k: usize) -> (Vec<usize>, Vec<T>)
where
    T: Float,
{
    candidates.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    candidates.truncate(k);

    let indices = candidates.iter().map(|&(_, j)| j).collect();
    let distances = candidates.iter().map(|&(d, _)| d).collect();
    (indices, distances)
}

//////////////////
// Exact search //
//////////////////

/// Exact k-nearest-neighbour search via parallel brute force
///
/// Each query row is scored against every data row; self matches are
/// dropped. Distances returned are plain Euclidean.
///
/// ### Params
///
/// * `data` - Data matrix (samples x features)
/// * `k` - Number of neighbours per point (capped at n - 1)
///
/// ### Returns
///
/// `NeighbourList` with `k` neighbours per point, closest first
pub fn exact_knn<T>(data: MatRef<T>, k: usize) -> NeighbourList<T>
where
    T: Float + Send + Sync,
{
    let n = data.nrows();
    let k = k.min(n.saturating_sub(1));

    let rows: Vec<(Vec<usize>, Vec<T>)> = (0..n)
        .into_par_iter()
        .map(|i| {
            let candidates: Vec<(T, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (row_distance(data, i, data, j), j))
                .collect();
            keep_closest(candidates, k)
        })
        .collect();

    let (indices, distances) = rows.into_iter().unzip();
    NeighbourList { indices, distances }
}

/// Exact k-nearest neighbours of query rows against a separate target set
///
/// Used by `transform`: new points are scored against the stored training
/// data, so no self filtering applies.
///
/// ### Params
///
/// * `queries` - Query matrix (new samples x features)
/// * `targets` - Target matrix (training samples x features)
/// * `k` - Number of neighbours per query (capped at the target count)
///
/// ### Returns
///
/// `NeighbourList` whose indices refer into `targets`
pub fn exact_knn_cross<T>(queries: MatRef<T>, targets: MatRef<T>, k: usize) -> NeighbourList<T>
where
    T: Float + Send + Sync,
{
    let n_queries = queries.nrows();
    let n_targets = targets.nrows();
    let k = k.min(n_targets);

    let rows: Vec<(Vec<usize>, Vec<T>)> = (0..n_queries)
        .into_par_iter()
        .map(|i| {
            let candidates: Vec<(T, usize)> = (0..n_targets)
                .map(|j| (row_distance(queries, i, targets, j), j))
                .collect();
            keep_closest(candidates, k)
        })
        .collect();

    let (indices, distances) = rows.into_iter().unzip();
    NeighbourList { indices, distances }
}

////////////////////////
// Projection forests //
////////////////////////

/// Recursively split a point set with random hyperplanes
///
/// Splitting picks two distinct random points, projects the set onto their
/// difference vector and cuts at the median projection. Sets at or below
/// `leaf_size` (or sets the projection cannot separate) become leaves.
fn split_recursive<T>(
    data: MatRef<T>,
    points: Vec<usize>,
    leaf_size: usize,
    rng: &mut StdRng,
    leaves: &mut Vec<Vec<usize>>,
) where
    T: Float,
{
    if points.len() <= leaf_size {
        leaves.push(points);
        return;
    }

    let a = points[rng.random_range(0..points.len())];
    let mut b = points[rng.random_range(0..points.len())];
    for _ in 0..8 {
        if b != a {
            break;
        }
        b = points[rng.random_range(0..points.len())];
    }
    if a == b {
        leaves.push(points);
        return;
    }

    // project onto the direction x_a - x_b
    let mut projections: Vec<T> = points
        .iter()
        .map(|&p| {
            let mut acc = T::zero();
            for d in 0..data.ncols() {
                acc = acc + (data[(a, d)] - data[(b, d)]) * data[(p, d)];
            }
            acc
        })
        .collect();

    let mut sorted = projections.clone();
    sorted.sort_unstable_by(|x, y| x.partial_cmp(y).unwrap());
    let threshold = sorted[sorted.len() / 2];

    let mut left = Vec::with_capacity(points.len() / 2);
    let mut right = Vec::with_capacity(points.len() / 2);
    for (&p, proj) in points.iter().zip(projections.drain(..)) {
        if proj < threshold {
            left.push(p);
        } else {
            right.push(p);
        }
    }

    // degenerate hyperplane (many tied projections): fall back to an even
    // index split so recursion always terminates
    if left.is_empty() || right.is_empty() {
        let mid = points.len() / 2;
        left = points[..mid].to_vec();
        right = points[mid..].to_vec();
    }

    split_recursive(data, left, leaf_size, rng, leaves);
    split_recursive(data, right, leaf_size, rng, leaves);
}

/// Approximate k-nearest-neighbour search via a random projection forest
///
/// Annoy-style scheme: several trees partition the data with random
/// hyperplane splits; each point's candidate set is the union of its leaf
/// cohabitants across all trees, rescored exactly. Recall grows with
/// `n_trees` and `leaf_size`.
///
/// ### Params
///
/// * `data` - Data matrix (samples x features)
/// * `k` - Number of neighbours per point
/// * `n_trees` - Trees in the forest (typically 8-16)
/// * `leaf_size` - Maximum leaf population; at least `k + 1` is enforced
/// * `seed` - Seed for the hyperplane draws
///
/// ### Returns
///
/// `NeighbourList` with up to `k` neighbours per point, closest first.
/// Rows can come up short when the forest never co-locates enough
/// candidates; callers treat the lists as ragged.
pub fn approximate_knn<T>(
    data: MatRef<T>,
    k: usize,
    n_trees: usize,
    leaf_size: usize,
    seed: u64,
) -> NeighbourList<T>
where
    T: Float + Send + Sync,
{
    let n = data.nrows();
    let k = k.min(n.saturating_sub(1));
    let leaf_size = leaf_size.max(k + 1);

    let mut candidates: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); n];

    for tree in 0..n_trees {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(tree as u64));
        let mut leaves: Vec<Vec<usize>> = Vec::new();
        split_recursive(data, (0..n).collect(), leaf_size, &mut rng, &mut leaves);

        for leaf in &leaves {
            for &p in leaf {
                for &q in leaf {
                    if q != p {
                        candidates[p].insert(q);
                    }
                }
            }
        }
    }

    let rows: Vec<(Vec<usize>, Vec<T>)> = candidates
        .into_par_iter()
        .enumerate()
        .map(|(i, cand)| {
            let scored: Vec<(T, usize)> = cand
                .into_iter()
                .map(|j| (row_distance(data, i, data, j), j))
                .collect();
            keep_closest(scored, k)
        })
        .collect();

    let (indices, distances) = rows.into_iter().unzip();
    NeighbourList { indices, distances }
}

///////////
// Tests //
///////////

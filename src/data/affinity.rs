use num_traits::Float;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::data::structures::{NeighbourList, SparseAffinities};

////////////////
// Affinities //
////////////////

/// Calibrate conditional affinities to a target perplexity
///
/// For each point i the precision `beta = 1 / (2 * sigma^2)` of a Gaussian
/// kernel over its neighbourhood is found by binary search so that the
/// Shannon entropy of `p_{j|i}` equals `ln(perplexity)` within `tol`. The
/// entropy is evaluated on the unnormalised kernel via
/// `H = ln(sum_p) + beta * sum(d * p) / sum_p`, which avoids normalising
/// inside the search loop.
///
/// The bracket starts unbounded: beta doubles (or halves) until the target
/// is straddled, then bisects. Rows that fail to converge within `max_iter`
/// keep their last beta; this is deliberate best-effort behaviour, and a
/// perplexity exceeding the supplied neighbourhood degenerates to the
/// uniform distribution over the row.
///
/// ### Params
///
/// * `neighbours` - Per-point neighbour indices and distances
/// * `perplexity` - Target effective neighbour count (typical: 5-50)
/// * `tol` - Entropy convergence tolerance (typical: 1e-8)
/// * `max_iter` - Binary search iteration cap (typical: 200)
/// * `distances_squared` - Whether the supplied distances are already
///   squared; if false they are squared before entering the kernel
///
/// ### Returns
///
/// Normalised conditional probabilities `p_{j|i}`, row-parallel to
/// `neighbours.indices`
pub fn perplexity_affinities<T>(
    neighbours: &NeighbourList<T>,
    perplexity: T,
    tol: T,
    max_iter: usize,
    distances_squared: bool,
) -> Vec<Vec<T>>
where
    T: Float + Send + Sync,
{
    let target_entropy = perplexity.ln();
    let two = T::one() + T::one();
    let eps = T::epsilon();

    neighbours
        .distances
        .par_iter()
        .map(|dists| {
            let d_sq: Vec<T> = dists
                .iter()
                .map(|&d| if distances_squared { d } else { d * d })
                .collect();

            let mut beta = T::one();
            let mut min_beta = T::neg_infinity();
            let mut max_beta = T::infinity();
            let mut probs = vec![T::zero(); d_sq.len()];

            for _ in 0..max_iter {
                let mut sum_p = T::zero();
                let mut sum_dp = T::zero();
                for (p, &d) in probs.iter_mut().zip(&d_sq) {
                    *p = (-d * beta).exp();
                    sum_p = sum_p + *p;
                    sum_dp = sum_dp + d * *p;
                }

                let entropy = (sum_p + eps).ln() + beta * sum_dp / (sum_p + eps);
                let entropy_diff = entropy - target_entropy;
                if entropy_diff.abs() <= tol {
                    break;
                }

                if entropy_diff > T::zero() {
                    // too flat: tighten the kernel
                    min_beta = beta;
                    if max_beta.is_infinite() {
                        beta = beta * two;
                    } else {
                        beta = (beta + max_beta) / two;
                    }
                } else {
                    // too peaked: widen the kernel
                    max_beta = beta;
                    if min_beta.is_infinite() {
                        beta = beta / two;
                    } else {
                        beta = (beta + min_beta) / two;
                    }
                }
            }

            let sum_p = probs.iter().fold(T::zero(), |acc, &p| acc + p) + eps;
            for p in probs.iter_mut() {
                *p = *p / sum_p;
            }
            probs
        })
        .collect()
}

/// Symmetrise conditional affinities: `P = (P + P^T) / 2N`
///
/// Converts the directed conditionals `p_{j|i}` into the joint matrix the
/// attractive gradient consumes. Both triangles are stored so every row can
/// be walked contiguously; columns within a row are sorted. Self entries
/// are dropped.
///
/// Resulting invariants: `P_ij == P_ji`, `sum_ij P == 1`, and each row sums
/// to roughly `1/N`.
///
/// ### Params
///
/// * `neighbours` - The neighbour lists the conditionals were built on
/// * `conditional` - Output of [`perplexity_affinities`]
///
/// ### Returns
///
/// Square CSR affinity matrix over the N points
pub fn symmetrise<T>(neighbours: &NeighbourList<T>, conditional: &[Vec<T>]) -> SparseAffinities<T>
where
    T: Float + Send + Sync,
{
    let n = neighbours.len();
    let normalisation = (T::one() + T::one()) * T::from(n).unwrap();

    // directed adjacency for O(1) lookup of p_{j|i}
    let mut adj: Vec<FxHashMap<usize, T>> = vec![FxHashMap::default(); n];
    let mut rev: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, (row_idx, row_p)) in neighbours.indices.iter().zip(conditional).enumerate() {
        for (&j, &p) in row_idx.iter().zip(row_p) {
            if j != i && p > T::zero() {
                adj[i].insert(j, p);
                rev[j].push(i);
            }
        }
    }

    let rows: Vec<Vec<(usize, T)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut partners: Vec<usize> =
                adj[i].keys().copied().chain(rev[i].iter().copied()).collect();
            partners.sort_unstable();
            partners.dedup();

            partners
                .into_iter()
                .map(|j| {
                    let w_ij = adj[i].get(&j).copied().unwrap_or_else(T::zero);
                    let w_ji = adj[j].get(&i).copied().unwrap_or_else(T::zero);
                    (j, (w_ij + w_ji) / normalisation)
                })
                .collect()
        })
        .collect();

    rows_to_csr(rows, (n, n))
}

/// Affinities of new points over a frozen reference set
///
/// Rows are perplexity-calibrated exactly like the fitted affinities, then
/// globally rescaled so the whole matrix sums to 1. No symmetrisation
/// applies: the matrix is rectangular (new x reference) and the reference
/// side is never optimised.
///
/// ### Params
///
/// * `neighbours` - Neighbours of each new point within the reference set
/// * `perplexity` - Target perplexity
/// * `tol` - Entropy tolerance
/// * `max_iter` - Binary search cap
/// * `distances_squared` - Whether distances are already squared
/// * `n_reference` - Size of the reference set (column count)
///
/// ### Returns
///
/// Rectangular CSR matrix, rows sorted by column index
pub fn transform_affinities<T>(
    neighbours: &NeighbourList<T>,
    perplexity: T,
    tol: T,
    max_iter: usize,
    distances_squared: bool,
    n_reference: usize,
) -> SparseAffinities<T>
where
    T: Float + Send + Sync,
{
    let conditional =
        perplexity_affinities(neighbours, perplexity, tol, max_iter, distances_squared);

    let total = conditional
        .iter()
        .flat_map(|row| row.iter())
        .fold(T::zero(), |acc, &p| acc + p)
        + T::epsilon();

    let rows: Vec<Vec<(usize, T)>> = neighbours
        .indices
        .iter()
        .zip(conditional)
        .map(|(row_idx, row_p)| {
            let mut row: Vec<(usize, T)> = row_idx
                .iter()
                .zip(row_p)
                .map(|(&j, p)| (j, p / total))
                .collect();
            row.sort_unstable_by_key(|&(j, _)| j);
            row
        })
        .collect();

    rows_to_csr(rows, (neighbours.len(), n_reference))
}

/// Assemble per-row (column, value) lists into CSR
fn rows_to_csr<T>(rows: Vec<Vec<(usize, T)>>, shape: (usize, usize)) -> SparseAffinities<T>
where
    T: Float,
{
    let nnz = rows.iter().map(|r| r.len()).sum();
    let mut indices = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    let mut indptr = Vec::with_capacity(shape.0 + 1);
    indptr.push(0);

    for row in rows {
        for (j, w) in row {
            indices.push(j);
            values.push(w);
        }
        indptr.push(indices.len());
    }

    SparseAffinities {
        indices,
        indptr,
        values,
        shape,
    }
}

///////////
// Tests //
///////////

use num_traits::{Float, FromPrimitive};
use rayon::prelude::*;

use crate::data::structures::SparseAffinities;
use crate::error::Result;
use crate::utils::fft::{repulsion_1d, repulsion_2d, FftFloat, FftParams};
use crate::utils::quadtree::QuadTree;

///////////////////////
// Gradient engines  //
///////////////////////

/////////////////////////
// Attractive gradient //
/////////////////////////

/// Accumulate the attractive (positive) t-SNE forces
///
/// For every optimised point i, adds `sum_j P_ij * q_ij * (y_i - y_j)` into
/// its gradient row, walking the sparse affinity row. The similarity is the
/// Student-t kernel `q_ij = dof / (dof + ||y_i - y_j||^2)`, raised to
/// `(dof + 1) / 2` when `dof != 1`. Early exaggeration enters here as a
/// plain multiplier on the affinity values.
///
/// Rows are processed in parallel; each worker reads the embeddings, writes
/// only its own gradient row and keeps the pairwise difference in a stack
/// scratch, so the result is identical for any thread count. The optional
/// KL bookkeeping is folded serially for the same reason.
///
/// ### Params
///
/// * `affinities` - Sparse P, rows parallel to `embedding`
/// * `embedding` - The optimised points (rows of P)
/// * `targets` - The attracting points (columns of P); the same slice as
///   `embedding` when fitting, the frozen reference when transforming
/// * `gradient` - Gradient rows, accumulated into (not zeroed here)
/// * `exaggeration` - Current exaggeration factor (1 outside the early phase)
/// * `dof` - Student-t degrees of freedom
/// * `eval_error` - Also accumulate the KL divergence pieces
///
/// ### Returns
///
/// `(kl_partial, p_sum)`: `sum P * ln(P / (q + eps))` and `sum P`, both zero
/// unless `eval_error` is set. The caller completes the divergence as
/// `kl_partial + p_sum * ln(Z + eps)`.
pub fn positive_gradient<T>(
    affinities: &SparseAffinities<T>,
    embedding: &[Vec<T>],
    targets: &[Vec<T>],
    gradient: &mut [Vec<T>],
    exaggeration: T,
    dof: T,
    eval_error: bool,
) -> (T, T)
where
    T: Float + FromPrimitive + Send + Sync,
{
    let n_dim = embedding[0].len();
    let exponent = (dof + T::one()) / (T::one() + T::one());
    let eps = T::epsilon();

    let partials: Vec<(T, T)> = gradient
        .par_iter_mut()
        .enumerate()
        .map(|(i, grad_row)| {
            let point = &embedding[i];
            let (cols, vals) = affinities.row(i);

            let mut kl = T::zero();
            let mut p_sum = T::zero();
            let mut diff = [T::zero(); 2];

            for (&j, &p) in cols.iter().zip(vals) {
                let other = &targets[j];

                let mut dist_sq = T::zero();
                for d in 0..n_dim {
                    diff[d] = point[d] - other[d];
                    dist_sq = dist_sq + diff[d] * diff[d];
                }

                let mut q = dof / (dof + dist_sq);
                if dof != T::one() {
                    q = q.powf(exponent);
                }

                let p_eff = p * exaggeration;
                for d in 0..n_dim {
                    grad_row[d] = grad_row[d] + p_eff * q * diff[d];
                }

                if eval_error {
                    kl = kl + p_eff * (p_eff / (q + eps)).ln();
                    p_sum = p_sum + p_eff;
                }
            }

            (kl, p_sum)
        })
        .collect();

    partials
        .into_iter()
        .fold((T::zero(), T::zero()), |(kl, ps), (k, p)| (kl + k, ps + p))
}

////////////////////////
// Repulsive gradient //
////////////////////////

/// The repulsive-force approximation in use
///
/// One variant per engine, resolved once from the configuration; the
/// optimiser calls [`NegativeGradient::compute`] uniformly.
#[derive(Clone, Debug)]
pub enum NegativeGradient<T> {
    /// Quadtree summarisation with accuracy threshold `theta`
    BarnesHut { theta: T },
    /// FFT interpolation for 1-D embeddings
    Fft1D(FftParams),
    /// FFT interpolation for 2-D embeddings
    Fft2D(FftParams),
}

impl<T> NegativeGradient<T>
where
    T: FftFloat + FromPrimitive,
{
    /// Fill `repulsion` with the normalised repulsive forces
    ///
    /// Every engine writes `sum_j q_ij^2 * (y_i - y_j) / (Z + eps)` into row
    /// i and returns the partition function Z. The Barnes-Hut arm rebuilds
    /// its quadtree from the current embedding; each worker owns one
    /// repulsion row and one slot of the partial-Z vector, and Z itself is
    /// folded serially.
    ///
    /// ### Params
    ///
    /// * `embedding` - Current positions
    /// * `repulsion` - Output rows, overwritten
    /// * `dof` - Student-t degrees of freedom (Barnes-Hut only; the FFT
    ///   engines are resolved for dof = 1)
    ///
    /// ### Returns
    ///
    /// The partition function Z
    pub fn compute(&self, embedding: &[Vec<T>], repulsion: &mut [Vec<T>], dof: T) -> Result<T> {
        match self {
            NegativeGradient::BarnesHut { theta } => {
                let tree = QuadTree::new(embedding);

                let partial_z: Vec<T> = repulsion
                    .par_iter_mut()
                    .zip(embedding.par_iter())
                    .map(|(row, point)| {
                        let (fx, fy, sum_q) = tree.repulsion_at(point[0], point[1], *theta, dof);
                        row[0] = fx;
                        row[1] = fy;
                        sum_q
                    })
                    .collect();

                let z = partial_z.into_iter().fold(T::zero(), |acc, q| acc + q);
                let z_inv = T::one() / (z + T::epsilon());

                repulsion.par_iter_mut().for_each(|row| {
                    row[0] = row[0] * z_inv;
                    row[1] = row[1] * z_inv;
                });

                Ok(z)
            }
            NegativeGradient::Fft1D(params) => {
                let ys: Vec<T> = embedding.iter().map(|p| p[0]).collect();
                let (forces, z) = repulsion_1d(&ys, params)?;

                for (row, f) in repulsion.iter_mut().zip(forces) {
                    row[0] = f;
                }
                Ok(z)
            }
            NegativeGradient::Fft2D(params) => {
                let xs: Vec<T> = embedding.iter().map(|p| p[0]).collect();
                let ys: Vec<T> = embedding.iter().map(|p| p[1]).collect();
                let (fx, fy, z) = repulsion_2d(&xs, &ys, params)?;

                for ((row, x), y) in repulsion.iter_mut().zip(fx).zip(fy) {
                    row[0] = x;
                    row[1] = y;
                }
                Ok(z)
            }
        }
    }
}

///////////
// Tests //
///////////

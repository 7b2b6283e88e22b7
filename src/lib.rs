//! Fast t-SNE for 1-D and 2-D embeddings.
//!
//! The pipeline follows the standard accelerated t-SNE construction:
//!
//! 1. Find k-nearest neighbours (exact brute force or a random projection
//!    forest), or accept precomputed neighbour lists
//! 2. Calibrate per-point Gaussian bandwidths to a target perplexity
//! 3. Symmetrise the conditionals into a sparse joint affinity matrix
//! 4. Run momentum gradient descent with adaptive gains, where repulsive
//!    forces come from a Barnes-Hut quadtree or FFT interpolation
//!
//! [`fit`] returns a [`TsneModel`] that keeps enough state to later
//! [`TsneModel::transform`] unseen points onto the frozen embedding.

pub mod data;
pub mod error;
pub mod training;
pub mod utils;

use faer::{
    traits::{ComplexField, RealField},
    Mat, MatRef,
};
use num_traits::{Float, FromPrimitive, ToPrimitive};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::time::Instant;
use thousands::*;
use tracing::info;

use crate::data::affinity::{perplexity_affinities, symmetrise, transform_affinities};
use crate::data::neighbours::{approximate_knn, exact_knn, exact_knn_cross};
use crate::training::gradient::NegativeGradient;
use crate::training::optimiser::gradient_descent;
use crate::utils::fft::FftFloat;

pub use crate::data::structures::{NeighbourList, SparseAffinities};
pub use crate::error::{Result, TsneError};
pub use crate::training::gradient::positive_gradient;
pub use crate::training::optimiser::{
    EmbeddingObserver, KlDivergenceRecorder, ObserverControl, OptimParams, OptimisationReport,
};
pub use crate::utils::fft::FftParams;

/// Entropy tolerance of the perplexity calibration
const CALIBRATION_TOL: f64 = 1e-8;
/// Iteration cap of the perplexity calibration
const CALIBRATION_MAX_ITER: usize = 200;
/// Spread of the random initialisation
const INIT_STD: f64 = 1e-4;
/// Default iteration count for `transform`
const TRANSFORM_N_ITER: usize = 250;

///////////////////
// Configuration //
///////////////////

/// How neighbourhoods are computed when none are supplied
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NeighbourMethod {
    /// Brute-force search, O(N^2) but exact
    #[default]
    Exact,
    /// Random projection forest, approximate but near-linear
    Approx,
}

/// Parse the neighbour search method
///
/// ### Params
///
/// * `s` - One of `"exact"` or `"approx"`
///
/// ### Returns
///
/// Option of the method
pub fn parse_neighbour_method(s: &str) -> Option<NeighbourMethod> {
    match s.to_lowercase().as_str() {
        "exact" => Some(NeighbourMethod::Exact),
        "approx" => Some(NeighbourMethod::Approx),
        _ => None,
    }
}

/// Which repulsive-force approximation to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GradientMethod {
    /// Quadtree summarisation, O(N log N); 2-D only
    #[default]
    BarnesHut,
    /// FFT interpolation, O(N); 1-D and 2-D
    Fft,
}

/// Parse the negative gradient method
///
/// ### Params
///
/// * `s` - One of `"barnes hut" | "bh"` or `"fft"`
///
/// ### Returns
///
/// Option of the method
pub fn parse_gradient_method(s: &str) -> Option<GradientMethod> {
    match s.to_lowercase().as_str() {
        "barnes hut" | "barnes-hut" | "bh" => Some(GradientMethod::BarnesHut),
        "fft" => Some(GradientMethod::Fft),
        _ => None,
    }
}

/// All t-SNE options
///
/// ### Fields
///
/// * `n_components` - Embedding dimensionality, 1 or 2
/// * `perplexity` - Target effective neighbour count (default 30)
/// * `learning_rate` - Step size; `None` resolves to `max(200, N / 12)`
/// * `n_iter` - Total optimisation iterations (default 750)
/// * `early_exaggeration_iter` - Iterations with exaggerated affinities
/// * `early_exaggeration` - The exaggeration multiplier (default 12)
/// * `initial_momentum` / `final_momentum` - Momentum schedule (0.5 / 0.8)
/// * `neighbours` - Neighbour search method when none are supplied
/// * `negative_gradient_method` - Repulsion engine
/// * `theta` - Barnes-Hut accuracy threshold (default 0.5)
/// * `fft_params` - FFT grid knobs
/// * `dof` - Student-t degrees of freedom (default 1)
/// * `n_jobs` - Thread count; zero or negative means all cores minus |n|
/// * `callbacks_every_iters` - Observer dispatch cadence (default 50)
#[derive(Clone, Debug)]
pub struct TsneParams<T> {
    pub n_components: usize,
    pub perplexity: T,
    pub learning_rate: Option<T>,
    pub n_iter: usize,
    pub early_exaggeration_iter: usize,
    pub early_exaggeration: T,
    pub initial_momentum: T,
    pub final_momentum: T,
    pub neighbours: NeighbourMethod,
    pub negative_gradient_method: GradientMethod,
    pub theta: T,
    pub fft_params: FftParams,
    pub dof: T,
    pub n_jobs: isize,
    pub callbacks_every_iters: usize,
}

impl<T> TsneParams<T>
where
    T: Float + FromPrimitive,
{
    /// Generate new t-SNE parameters
    ///
    /// Options left as `None` fall back to the defaults listed on the
    /// struct.
    ///
    /// ### Params
    ///
    /// * `n_components` - Embedding dimensionality. Default `2`.
    /// * `perplexity` - Target perplexity. Default `30`.
    /// * `learning_rate` - Step size. Defaults to `max(200, N / 12)` at fit
    ///   time.
    /// * `n_iter` - Iterations. Default `750`.
    /// * `negative_gradient_method` - `"bh"` or `"fft"`. Default `"bh"`.
    /// * `theta` - Barnes-Hut threshold. Default `0.5`.
    /// * `n_jobs` - Thread count. Default `-1` (all cores but one).
    ///
    /// ### Returns
    ///
    /// Hopefully sensible parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n_components: Option<usize>,
        perplexity: Option<T>,
        learning_rate: Option<T>,
        n_iter: Option<usize>,
        negative_gradient_method: Option<String>,
        theta: Option<T>,
        n_jobs: Option<isize>,
    ) -> Self {
        let method = negative_gradient_method
            .as_deref()
            .and_then(parse_gradient_method)
            .unwrap_or_default();

        Self {
            n_components: n_components.unwrap_or(2),
            perplexity: perplexity.unwrap_or_else(|| T::from_f64(30.0).unwrap()),
            learning_rate,
            n_iter: n_iter.unwrap_or(750),
            negative_gradient_method: method,
            theta: theta.unwrap_or_else(|| T::from_f64(0.5).unwrap()),
            n_jobs: n_jobs.unwrap_or(-1),
            ..Self::default()
        }
    }
}

impl<T: Float + FromPrimitive> Default for TsneParams<T> {
    fn default() -> Self {
        Self {
            n_components: 2,
            perplexity: T::from_f64(30.0).unwrap(),
            learning_rate: None,
            n_iter: 750,
            early_exaggeration_iter: 250,
            early_exaggeration: T::from_f64(12.0).unwrap(),
            initial_momentum: T::from_f64(0.5).unwrap(),
            final_momentum: T::from_f64(0.8).unwrap(),
            neighbours: NeighbourMethod::Exact,
            negative_gradient_method: GradientMethod::BarnesHut,
            theta: T::from_f64(0.5).unwrap(),
            fft_params: FftParams::default(),
            dof: T::one(),
            n_jobs: -1,
            callbacks_every_iters: 50,
        }
    }
}

/////////////
// Helpers //
/////////////

/// Build the worker pool from the `n_jobs` convention
fn build_pool(n_jobs: isize) -> Result<rayon::ThreadPool> {
    let available = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);
    let threads = if n_jobs > 0 {
        n_jobs as usize
    } else {
        available.saturating_sub(n_jobs.unsigned_abs()).max(1)
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| TsneError::ResourceFailure(format!("could not build thread pool: {}", e)))
}

/// Reject matrices with non-finite entries
fn validate_matrix<T: Float>(data: MatRef<T>, what: &str) -> Result<()> {
    for i in 0..data.nrows() {
        for j in 0..data.ncols() {
            if !data[(i, j)].is_finite() {
                return Err(TsneError::InvalidInput(format!(
                    "{} contains a non-finite value at ({}, {})",
                    what, i, j
                )));
            }
        }
    }
    Ok(())
}

/// Resolve the configured repulsion engine for the target dimensionality
fn resolve_engine<T>(params: &TsneParams<T>) -> Result<NegativeGradient<T>>
where
    T: Float,
{
    match params.negative_gradient_method {
        GradientMethod::BarnesHut => {
            if params.n_components != 2 {
                return Err(TsneError::Configuration(
                    "Barnes-Hut repulsion requires a 2-D embedding; use the FFT method for 1-D"
                        .into(),
                ));
            }
            Ok(NegativeGradient::BarnesHut {
                theta: params.theta,
            })
        }
        GradientMethod::Fft => {
            if params.dof != T::one() {
                return Err(TsneError::Configuration(
                    "the FFT repulsion engine supports dof = 1 only".into(),
                ));
            }
            if params.n_components == 1 {
                Ok(NegativeGradient::Fft1D(params.fft_params))
            } else {
                Ok(NegativeGradient::Fft2D(params.fft_params))
            }
        }
    }
}

/// Seeded Gaussian initialisation with small spread
fn random_init<T>(n: usize, n_dim: usize, seed: u64) -> Vec<Vec<T>>
where
    T: Float + FromPrimitive,
{
    let mut rng = StdRng::seed_from_u64(seed);
    let std = T::from_f64(INIT_STD).unwrap();

    (0..n)
        .map(|_| {
            (0..n_dim)
                .map(|_| T::from_f64(rng.sample::<f64, _>(StandardNormal)).unwrap() * std)
                .collect()
        })
        .collect()
}

/// Learning rate default: `max(200, N / 12)`
fn default_learning_rate<T: Float + FromPrimitive>(n: usize) -> T {
    T::from_f64((n as f64 / 12.0).max(200.0)).unwrap()
}

/// Neighbourhood size for a perplexity: `3 * perplexity`, capped
fn neighbourhood_size<T: Float + ToPrimitive>(perplexity: T, n_targets: usize) -> usize {
    let k = (perplexity.to_f64().unwrap_or(30.0) * 3.0).ceil() as usize;
    k.clamp(1, n_targets)
}

/////////
// Fit //
/////////

/// Fitted t-SNE state
///
/// Carries the final embedding alongside the training data and parameters,
/// which is exactly the state [`TsneModel::transform`] needs to place new
/// points onto the frozen map.
#[derive(Debug)]
pub struct TsneModel<T> {
    data: Mat<T>,
    embedding: Vec<Vec<T>>,
    params: TsneParams<T>,
    report: OptimisationReport<T>,
}

/// Run t-SNE on a data matrix
///
/// ### Params
///
/// * `data` - Input matrix (samples x features)
/// * `params` - The t-SNE parameters
/// * `neighbours` - Optional precomputed neighbour lists (plain Euclidean
///   distances); computed per `params.neighbours` when absent
/// * `init` - Optional initial embedding (samples x `n_components`), e.g.
///   from PCA; a seeded Gaussian with spread 1e-4 when absent
/// * `seed` - Seed for every stochastic step
/// * `observers` - Observer chain dispatched every
///   `callbacks_every_iters` iterations; may be empty
///
/// ### Returns
///
/// The fitted [`TsneModel`]. The embedding is row-major: one
/// `[x(, y)]` vector per input sample.
///
/// ### Example
///
/// ```ignore
/// use faer::Mat;
/// use tsne_rs::{fit, TsneParams};
///
/// let data = Mat::from_fn(500, 32, |_, _| rand::random::<f64>());
/// let model = fit(data.as_ref(), &TsneParams::default(), None, None, 42, &mut []).unwrap();
/// let embedding = model.embedding();
/// ```
pub fn fit<T>(
    data: MatRef<T>,
    params: &TsneParams<T>,
    neighbours: Option<NeighbourList<T>>,
    init: Option<Vec<Vec<T>>>,
    seed: u64,
    observers: &mut [Box<dyn EmbeddingObserver<T>>],
) -> Result<TsneModel<T>>
where
    T: FftFloat + FromPrimitive + ToPrimitive + ComplexField + RealField,
{
    let n = data.nrows();
    if n == 0 || data.ncols() == 0 {
        return Err(TsneError::InvalidInput("empty input matrix".into()));
    }
    if params.n_components == 0 || params.n_components > 2 {
        return Err(TsneError::InvalidInput(format!(
            "n_components must be 1 or 2, got {}",
            params.n_components
        )));
    }
    validate_matrix(data, "data")?;

    if let Some(init) = &init {
        if init.len() != n || init.iter().any(|row| row.len() != params.n_components) {
            return Err(TsneError::InvalidInput(format!(
                "initial embedding must be {} x {}",
                n, params.n_components
            )));
        }
        if init.iter().flatten().any(|v| !Float::is_finite(*v)) {
            return Err(TsneError::InvalidInput(
                "initial embedding contains non-finite values".into(),
            ));
        }
    }

    // a single point has nothing to optimise against
    if n == 1 {
        let embedding = init.unwrap_or_else(|| random_init(1, params.n_components, seed));
        return Ok(TsneModel {
            data: Mat::from_fn(n, data.ncols(), |i, j| data[(i, j)]),
            embedding,
            params: params.clone(),
            report: OptimisationReport {
                iterations: 0,
                kl_divergence: None,
            },
        });
    }

    let max_perplexity = T::from_usize(n).unwrap() / T::from_f64(3.0).unwrap();
    if params.perplexity >= max_perplexity {
        return Err(TsneError::InvalidInput(format!(
            "perplexity must stay below N / 3 = {:.1}",
            max_perplexity.to_f64().unwrap_or(0.0)
        )));
    }

    let engine = resolve_engine(params)?;
    let pool = build_pool(params.n_jobs)?;

    if let Some(list) = &neighbours {
        list.validate(n, n)?;
    }

    pool.install(|| {
        let start = Instant::now();
        let neighbours = match neighbours {
            Some(list) => list,
            None => {
                let k = neighbourhood_size(params.perplexity, n - 1);
                match params.neighbours {
                    NeighbourMethod::Exact => exact_knn(data, k),
                    NeighbourMethod::Approx => {
                        approximate_knn(data, k, 12, k + k / 2, seed)
                    }
                }
            }
        };
        info!("kNN search done in {:.2?}", start.elapsed());

        let start = Instant::now();
        let tol = T::from_f64(CALIBRATION_TOL).unwrap();
        let conditional = perplexity_affinities(
            &neighbours,
            params.perplexity,
            tol,
            CALIBRATION_MAX_ITER,
            false,
        );
        let affinities = symmetrise(&neighbours, &conditional);
        info!(
            "affinity matrix with {} entries built in {:.2?}",
            affinities.nnz().separate_with_underscores(),
            start.elapsed()
        );

        let mut embedding =
            init.unwrap_or_else(|| random_init(n, params.n_components, seed));

        let optim = OptimParams {
            n_iter: params.n_iter,
            learning_rate: params
                .learning_rate
                .unwrap_or_else(|| default_learning_rate(n)),
            early_exaggeration_iter: params.early_exaggeration_iter,
            early_exaggeration: params.early_exaggeration,
            initial_momentum: params.initial_momentum,
            final_momentum: params.final_momentum,
            dof: params.dof,
            callbacks_every_iters: params.callbacks_every_iters,
        };

        let start = Instant::now();
        let report =
            gradient_descent(&mut embedding, None, &affinities, &engine, &optim, observers)?;
        info!(
            "optimised {} iterations in {:.2?}",
            report.iterations, start.elapsed()
        );

        Ok(TsneModel {
            data: Mat::from_fn(n, data.ncols(), |i, j| data[(i, j)]),
            embedding,
            params: params.clone(),
            report,
        })
    })
}

/// Run t-SNE and return the embedding directly
///
/// Convenience over [`fit`] for callers that do not need `transform`.
pub fn fit_transform<T>(
    data: MatRef<T>,
    params: &TsneParams<T>,
    seed: u64,
) -> Result<Vec<Vec<T>>>
where
    T: FftFloat + FromPrimitive + ToPrimitive + ComplexField + RealField,
{
    fit(data, params, None, None, seed, &mut []).map(TsneModel::into_embedding)
}

impl<T> TsneModel<T>
where
    T: FftFloat + FromPrimitive + ToPrimitive + ComplexField + RealField,
{
    /// The fitted embedding, one row per training sample
    pub fn embedding(&self) -> &[Vec<T>] {
        &self.embedding
    }

    /// The optimisation report of the fit
    pub fn report(&self) -> &OptimisationReport<T> {
        &self.report
    }

    /// Consume the model, keeping only the embedding
    pub fn into_embedding(self) -> Vec<Vec<T>> {
        self.embedding
    }

    /// Place new points onto the frozen embedding
    ///
    /// New rows are attracted towards the reference positions through
    /// perplexity-calibrated affinities over the training data, while the
    /// repulsive pass runs over the new points only; the reference never
    /// moves. Initialisation is the affinity-weighted mean of the
    /// reference positions, and no early exaggeration applies.
    ///
    /// ### Params
    ///
    /// * `new_data` - Matrix of unseen samples (same feature count)
    /// * `n_iter` - Iterations to run. Default `250`.
    /// * `seed` - Seed (only used for degenerate initialisation)
    /// * `observers` - Observer chain, as in [`fit`]
    ///
    /// ### Returns
    ///
    /// Embedding rows for the new samples, in the reference frame
    pub fn transform(
        &self,
        new_data: MatRef<T>,
        n_iter: Option<usize>,
        seed: u64,
        observers: &mut [Box<dyn EmbeddingObserver<T>>],
    ) -> Result<Vec<Vec<T>>> {
        let n_new = new_data.nrows();
        let n_ref = self.data.nrows();

        if n_new == 0 {
            return Err(TsneError::InvalidInput("empty input matrix".into()));
        }
        if new_data.ncols() != self.data.ncols() {
            return Err(TsneError::InvalidInput(format!(
                "expected {} features, got {}",
                self.data.ncols(),
                new_data.ncols()
            )));
        }
        validate_matrix(new_data, "new data")?;

        let engine = resolve_engine(&self.params)?;
        let pool = build_pool(self.params.n_jobs)?;

        pool.install(|| {
            let k = neighbourhood_size(self.params.perplexity, n_ref);
            let neighbours = exact_knn_cross(new_data, self.data.as_ref(), k);

            // the reference neighbourhood caps the usable perplexity
            let perplexity_cap = T::from_usize(k).unwrap() / T::from_f64(3.0).unwrap();
            let perplexity = if self.params.perplexity < perplexity_cap {
                self.params.perplexity
            } else {
                perplexity_cap
            };

            let tol = T::from_f64(CALIBRATION_TOL).unwrap();
            let affinities = transform_affinities(
                &neighbours,
                perplexity,
                tol,
                CALIBRATION_MAX_ITER,
                false,
                n_ref,
            );

            // start every new point at the weighted centre of the reference
            // positions it is attracted to
            let mut embedding: Vec<Vec<T>> = (0..n_new)
                .map(|i| {
                    let (cols, vals) = affinities.row(i);
                    let total = vals.iter().fold(T::zero(), |acc, &v| acc + v);

                    let mut point = vec![T::zero(); self.params.n_components];
                    if total > T::zero() {
                        for (&j, &w) in cols.iter().zip(vals) {
                            for d in 0..self.params.n_components {
                                point[d] = point[d] + w * self.embedding[j][d];
                            }
                        }
                        for v in point.iter_mut() {
                            *v = *v / total;
                        }
                    } else {
                        point = random_init::<T>(1, self.params.n_components, seed)
                            .pop()
                            .unwrap();
                    }
                    point
                })
                .collect();

            let optim = OptimParams {
                n_iter: n_iter.unwrap_or(TRANSFORM_N_ITER),
                learning_rate: self
                    .params
                    .learning_rate
                    .unwrap_or_else(|| default_learning_rate(n_new)),
                early_exaggeration_iter: 0,
                early_exaggeration: T::one(),
                initial_momentum: self.params.initial_momentum,
                final_momentum: self.params.final_momentum,
                dof: self.params.dof,
                callbacks_every_iters: self.params.callbacks_every_iters,
            };

            gradient_descent(
                &mut embedding,
                Some(&self.embedding),
                &affinities,
                &engine,
                &optim,
                observers,
            )?;

            Ok(embedding)
        })
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod facade_tests {
    use super::*;

    fn tiny_data(n: usize, d: usize) -> Mat<f64> {
        let mut rng = StdRng::seed_from_u64(0);
        let values: Vec<f64> = (0..n * d).map(|_| rng.random()).collect();
        Mat::from_fn(n, d, |i, j| values[i * d + j])
    }

    #[test]
    fn test_parse_methods() {
        assert_eq!(parse_gradient_method("BH"), Some(GradientMethod::BarnesHut));
        assert_eq!(
            parse_gradient_method("barnes hut"),
            Some(GradientMethod::BarnesHut)
        );
        assert_eq!(parse_gradient_method("fft"), Some(GradientMethod::Fft));
        assert_eq!(parse_gradient_method("exactly"), None);

        assert_eq!(parse_neighbour_method("exact"), Some(NeighbourMethod::Exact));
        assert_eq!(parse_neighbour_method("Approx"), Some(NeighbourMethod::Approx));
        assert_eq!(parse_neighbour_method("hnsw"), None);
    }

    #[test]
    fn test_empty_input_rejected() {
        let data = Mat::<f64>::from_fn(0, 5, |_, _| 0.0);
        let err = fit(
            data.as_ref(),
            &TsneParams::default(),
            None,
            None,
            0,
            &mut [],
        )
        .unwrap_err();
        assert!(matches!(err, TsneError::InvalidInput(_)));
    }

    #[test]
    fn test_nonfinite_input_rejected() {
        let data = Mat::from_fn(20, 4, |i, j| if (i, j) == (3, 1) { f64::NAN } else { 0.5 });

        let err = fit(
            data.as_ref(),
            &TsneParams::default(),
            None,
            None,
            0,
            &mut [],
        )
        .unwrap_err();
        assert!(matches!(err, TsneError::InvalidInput(_)));
    }

    #[test]
    fn test_oversized_perplexity_rejected() {
        let data = tiny_data(30, 4);
        let params = TsneParams {
            perplexity: 10.0,
            ..TsneParams::default()
        };

        let err = fit(data.as_ref(), &params, None, None, 0, &mut []).unwrap_err();
        assert!(matches!(err, TsneError::InvalidInput(_)));
    }

    #[test]
    fn test_bh_in_one_dimension_rejected() {
        let data = tiny_data(50, 4);
        let params = TsneParams {
            n_components: 1,
            perplexity: 5.0,
            ..TsneParams::default()
        };

        let err = fit(data.as_ref(), &params, None, None, 0, &mut []).unwrap_err();
        assert!(matches!(err, TsneError::Configuration(_)));
    }

    #[test]
    fn test_fft_with_dof_rejected() {
        let data = tiny_data(50, 4);
        let params = TsneParams {
            negative_gradient_method: GradientMethod::Fft,
            dof: 0.7,
            perplexity: 5.0,
            ..TsneParams::default()
        };

        let err = fit(data.as_ref(), &params, None, None, 0, &mut []).unwrap_err();
        assert!(matches!(err, TsneError::Configuration(_)));
    }

    #[test]
    fn test_single_point_returns_init_unchanged() {
        let data = tiny_data(1, 8);
        let init = vec![vec![0.3, -0.7]];

        let model = fit(
            data.as_ref(),
            &TsneParams::default(),
            None,
            Some(init.clone()),
            0,
            &mut [],
        )
        .unwrap();

        assert_eq!(model.embedding(), init.as_slice());
        assert_eq!(model.report().iterations, 0);
    }

    #[test]
    fn test_mismatched_init_rejected() {
        let data = tiny_data(20, 4);
        let init = vec![vec![0.0, 0.0]; 19];

        let params = TsneParams {
            perplexity: 5.0,
            ..TsneParams::default()
        };
        let err = fit(data.as_ref(), &params, None, Some(init), 0, &mut []).unwrap_err();
        assert!(matches!(err, TsneError::InvalidInput(_)));
    }

    #[test]
    fn test_params_new_defaults() {
        let params = TsneParams::<f64>::new(None, None, None, None, None, None, None);
        assert_eq!(params.n_components, 2);
        assert_eq!(params.perplexity, 30.0);
        assert_eq!(params.n_iter, 750);
        assert_eq!(params.early_exaggeration_iter, 250);
        assert_eq!(params.early_exaggeration, 12.0);
        assert_eq!(params.negative_gradient_method, GradientMethod::BarnesHut);
        assert_eq!(params.theta, 0.5);
        assert_eq!(params.dof, 1.0);
    }
}

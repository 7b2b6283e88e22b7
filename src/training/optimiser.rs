use num_traits::{Float, FromPrimitive, ToPrimitive};
use rayon::prelude::*;
use thousands::*;
use tracing::debug;

use crate::data::structures::SparseAffinities;
use crate::error::{Result, TsneError};
use crate::training::gradient::{positive_gradient, NegativeGradient};
use crate::utils::fft::FftFloat;

///////////////
// Optimiser //
///////////////

/////////////
// Globals //
/////////////

const MIN_GAIN: f64 = 0.01;
const GAIN_RAISE: f64 = 0.2;
const GAIN_DECAY: f64 = 0.8;
const GRADIENT_SCALE: f64 = 4.0;

///////////////
// Observers //
///////////////

/// Verdict returned by an observer after each inspection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverControl {
    /// Keep optimising
    Continue,
    /// Halt at this iteration boundary
    Stop,
}

/// Receives the live embedding at a configurable cadence
///
/// The embedding reference is only valid for the duration of the call and
/// is guaranteed to be in a consistent post-step state (updated and
/// recentred); observers wanting to keep it must copy. Returning
/// [`ObserverControl::Stop`] halts the optimisation at the current
/// iteration boundary; gradient kernels are never interrupted mid-flight.
pub trait EmbeddingObserver<T>: Send {
    /// Inspect the current state
    ///
    /// ### Params
    ///
    /// * `iteration` - 1-based iteration count just completed
    /// * `error` - Current KL divergence estimate
    /// * `embedding` - Live positions, one `[x(, y)]` row per point
    fn on_iteration(&mut self, iteration: usize, error: T, embedding: &[Vec<T>])
        -> ObserverControl;
}

/// Observer recording the KL divergence trajectory
///
/// ### Fields
///
/// * `history` - `(iteration, kl)` pairs in dispatch order
#[derive(Default)]
pub struct KlDivergenceRecorder<T> {
    pub history: Vec<(usize, T)>,
}

impl<T: Float + Send> EmbeddingObserver<T> for KlDivergenceRecorder<T> {
    fn on_iteration(&mut self, iteration: usize, error: T, _: &[Vec<T>]) -> ObserverControl {
        self.history.push((iteration, error));
        ObserverControl::Continue
    }
}

/// Run the observer chain, short-circuiting on the first stop request
fn dispatch<T: Float>(
    observers: &mut [Box<dyn EmbeddingObserver<T>>],
    iteration: usize,
    error: T,
    embedding: &[Vec<T>],
) -> ObserverControl {
    for observer in observers.iter_mut() {
        if observer.on_iteration(iteration, error, embedding) == ObserverControl::Stop {
            return ObserverControl::Stop;
        }
    }
    ObserverControl::Continue
}

////////////
// Params //
////////////

/// Gradient descent schedule
///
/// ### Fields
///
/// * `n_iter` - Total iterations
/// * `learning_rate` - Base step size
/// * `early_exaggeration_iter` - Iterations with exaggerated affinities
/// * `early_exaggeration` - The exaggeration multiplier (typically 12)
/// * `initial_momentum` - Momentum during the exaggeration phase
/// * `final_momentum` - Momentum afterwards
/// * `dof` - Student-t degrees of freedom
/// * `callbacks_every_iters` - Observer cadence; 0 disables dispatch
#[derive(Clone, Debug)]
pub struct OptimParams<T> {
    pub n_iter: usize,
    pub learning_rate: T,
    pub early_exaggeration_iter: usize,
    pub early_exaggeration: T,
    pub initial_momentum: T,
    pub final_momentum: T,
    pub dof: T,
    pub callbacks_every_iters: usize,
}

impl<T: Float + FromPrimitive> Default for OptimParams<T> {
    fn default() -> Self {
        Self {
            n_iter: 750,
            learning_rate: T::from_f64(200.0).unwrap(),
            early_exaggeration_iter: 250,
            early_exaggeration: T::from_f64(12.0).unwrap(),
            initial_momentum: T::from_f64(0.5).unwrap(),
            final_momentum: T::from_f64(0.8).unwrap(),
            dof: T::one(),
            callbacks_every_iters: 50,
        }
    }
}

/// Outcome of a descent run
///
/// ### Fields
///
/// * `iterations` - Iterations actually executed (smaller than `n_iter`
///   when an observer stopped the run)
/// * `kl_divergence` - Last evaluated KL divergence, if any was computed
#[derive(Clone, Debug)]
pub struct OptimisationReport<T> {
    pub iterations: usize,
    pub kl_divergence: Option<T>,
}

/////////////
// Descent //
/////////////

/// Adaptive-gain parameter update
///
/// Gains grow additively while the gradient keeps its direction against
/// the running update and decay multiplicatively when it flips, floored at
/// `MIN_GAIN`. The update vector then takes a momentum step.
///
/// ### Params
///
/// * `value` - Coordinate to move
/// * `update` - Momentum accumulator for this coordinate
/// * `gain` - Adaptive gain for this coordinate
/// * `gradient` - Current gradient component
/// * `learning_rate` - Base step size
/// * `momentum` - Momentum coefficient
#[inline(always)]
fn update_parameter<T>(
    value: &mut T,
    update: &mut T,
    gain: &mut T,
    gradient: T,
    learning_rate: T,
    momentum: T,
) where
    T: Float + FromPrimitive,
{
    if (gradient > T::zero()) != (*update > T::zero()) {
        *gain = *gain + T::from_f64(GAIN_RAISE).unwrap();
    } else {
        *gain = *gain * T::from_f64(GAIN_DECAY).unwrap();
    }
    *gain = (*gain).max(T::from_f64(MIN_GAIN).unwrap());

    *update = momentum * *update - learning_rate * *gain * gradient;
    *value = *value + *update;
}

/// Momentum gradient descent over the embedding
///
/// Per iteration: rebuild the repulsive approximation and evaluate it,
/// accumulate the attractive forces on the (possibly exaggerated)
/// affinities, scale the combined gradient by 4, take a gain-adapted
/// momentum step, recentre every column, and hand the state to the
/// observers. Momentum and exaggeration switch together when the early
/// phase ends. A non-finite gradient or divergence aborts with
/// `NumericalFailure`.
///
/// In transform mode `reference` holds the frozen points the affinity
/// columns refer to; attraction pulls towards them, repulsion runs over
/// the optimised rows only, and recentring is skipped so the rows stay in
/// the reference frame.
///
/// ### Params
///
/// * `embedding` - Positions to optimise in place
/// * `reference` - Frozen attraction targets, or `None` to self-attract
/// * `affinities` - Sparse P, rows parallel to `embedding`
/// * `method` - The repulsive engine
/// * `params` - Schedule and kernel parameters
/// * `observers` - Observer chain; may be empty
///
/// ### Returns
///
/// Report with the executed iteration count and the last KL estimate
pub fn gradient_descent<T>(
    embedding: &mut [Vec<T>],
    reference: Option<&[Vec<T>]>,
    affinities: &SparseAffinities<T>,
    method: &NegativeGradient<T>,
    params: &OptimParams<T>,
    observers: &mut [Box<dyn EmbeddingObserver<T>>],
) -> Result<OptimisationReport<T>>
where
    T: FftFloat + FromPrimitive + ToPrimitive,
{
    let n = embedding.len();
    let n_dim = embedding[0].len();

    let mut update_flat = vec![T::zero(); n * n_dim];
    let mut gains_flat = vec![T::one(); n * n_dim];
    let mut attraction = vec![vec![T::zero(); n_dim]; n];
    let mut repulsion = vec![vec![T::zero(); n_dim]; n];

    let scale = T::from_f64(GRADIENT_SCALE).unwrap();
    let eps = T::epsilon();

    let mut last_kl: Option<T> = None;
    let mut iterations = params.n_iter;

    for iter in 0..params.n_iter {
        let exaggeration = if iter < params.early_exaggeration_iter {
            params.early_exaggeration
        } else {
            T::one()
        };
        let momentum = if iter < params.early_exaggeration_iter {
            params.initial_momentum
        } else {
            params.final_momentum
        };

        let dispatch_now = params.callbacks_every_iters > 0
            && !observers.is_empty()
            && (iter + 1) % params.callbacks_every_iters == 0;
        let eval_error = dispatch_now || iter + 1 == params.n_iter;

        // repulsive pass writes its buffer, attractive pass accumulates
        // into a separate one; they are combined below
        let z = method.compute(embedding, &mut repulsion, params.dof)?;

        attraction.par_iter_mut().for_each(|row| {
            for v in row.iter_mut() {
                *v = T::zero();
            }
        });
        let (kl_partial, p_sum) = match reference {
            Some(targets) => positive_gradient(
                affinities,
                embedding,
                targets,
                &mut attraction,
                exaggeration,
                params.dof,
                eval_error,
            ),
            None => positive_gradient(
                affinities,
                embedding,
                embedding,
                &mut attraction,
                exaggeration,
                params.dof,
                eval_error,
            ),
        };

        if eval_error {
            let kl = kl_partial + p_sum * (z + eps).ln();
            if !kl.is_finite() {
                return Err(TsneError::NumericalFailure(format!(
                    "KL divergence became non-finite at iteration {}",
                    iter + 1
                )));
            }
            last_kl = Some(kl);
        }

        // grad = 4 * (attraction - repulsion), staged into the attraction
        // buffer
        attraction
            .par_iter_mut()
            .zip(repulsion.par_iter())
            .for_each(|(attr, rep)| {
                for d in 0..n_dim {
                    attr[d] = (attr[d] - rep[d]) * scale;
                }
            });

        if !attraction
            .par_iter()
            .all(|row| row.iter().all(|v| v.is_finite()))
        {
            return Err(TsneError::NumericalFailure(format!(
                "gradient became non-finite at iteration {}",
                iter + 1
            )));
        }

        for (i, point) in embedding.iter_mut().enumerate() {
            for d in 0..n_dim {
                update_parameter(
                    &mut point[d],
                    &mut update_flat[i * n_dim + d],
                    &mut gains_flat[i * n_dim + d],
                    attraction[i][d],
                    params.learning_rate,
                    momentum,
                );
            }
        }

        // recentre to kill translation drift and keep the FFT grids tight;
        // in transform mode the frozen reference anchors the frame instead
        if reference.is_none() {
            let mut means = vec![T::zero(); n_dim];
            for point in embedding.iter() {
                for d in 0..n_dim {
                    means[d] = means[d] + point[d];
                }
            }
            let n_float = T::from_usize(n).unwrap();
            for m in means.iter_mut() {
                *m = *m / n_float;
            }
            embedding.par_iter_mut().for_each(|point| {
                for d in 0..n_dim {
                    point[d] = point[d] - means[d];
                }
            });
        }

        if (iter + 1) % 50 == 0 || iter + 1 == params.n_iter {
            debug!(
                "iteration {}/{} | Z = {}",
                iter + 1,
                params.n_iter,
                z.to_f32().unwrap_or(f32::NAN).separate_with_underscores()
            );
        }

        if dispatch_now {
            let kl = last_kl.unwrap();
            if dispatch(observers, iter + 1, kl, embedding) == ObserverControl::Stop {
                iterations = iter + 1;
                break;
            }
        }
    }

    Ok(OptimisationReport {
        iterations,
        kl_divergence: last_kl,
    })
}

///////////
// Tests //
///////////

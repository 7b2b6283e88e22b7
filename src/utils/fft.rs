use num_traits::{Float, FromPrimitive, Signed};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Result, TsneError};

////////////
// Traits //
////////////

/// Floating-point types usable in the FFT repulsion path
pub trait FftFloat: Float + FromPrimitive + Signed + Send + Sync + Debug + 'static {}
impl<T: Float + FromPrimitive + Signed + Send + Sync + Debug + 'static> FftFloat for T {}

////////////
// Params //
////////////

/// Knobs of the FFT interpolation scheme
///
/// ### Fields
///
/// * `n_interpolation_points` - Lagrange nodes per grid cell (typically 3);
///   accuracy improves with this at cubic cost
/// * `min_num_intervals` - Lower bound on grid cells per axis
/// * `ints_per_interval` - Target embedding-units per grid cell
#[derive(Clone, Copy, Debug)]
pub struct FftParams {
    pub n_interpolation_points: usize,
    pub min_num_intervals: usize,
    pub ints_per_interval: f64,
}

impl Default for FftParams {
    fn default() -> Self {
        Self {
            n_interpolation_points: 3,
            min_num_intervals: 10,
            ints_per_interval: 1.0,
        }
    }
}

/////////////
// Helpers //
/////////////

/// Cells per axis for the current spread
///
/// `max(min_num_intervals, spread / ints_per_interval)`, rounded up to an
/// FFT-friendly composite of small primes.
fn choose_grid_size(spread: f64, ints_per_interval: f64, min_num_intervals: usize) -> usize {
    let n_boxes = (spread / ints_per_interval).max(min_num_intervals as f64) as usize;

    const ALLOWED_SIZES: [usize; 20] = [
        25, 27, 32, 36, 40, 48, 50, 54, 60, 64, 72, 75, 80, 81, 90, 96, 100, 108, 120, 125,
    ];

    if n_boxes <= ALLOWED_SIZES[19] {
        for &size in &ALLOWED_SIZES {
            if size >= n_boxes {
                return size;
            }
        }
    }

    n_boxes
}

/// Lagrange interpolation weights at `position` (in [0, 1])
///
/// ### Params
///
/// * `position` - Intra-cell coordinate of the point
/// * `offsets` - Node positions within [0, 1]
/// * `denominators` - Precomputed products of node differences
/// * `weights` - Output buffer, one weight per node
pub fn lagrange_weights<T>(position: T, offsets: &[T], denominators: &[T], weights: &mut [T])
where
    T: Float,
{
    for (k, w) in weights.iter_mut().enumerate() {
        let mut numerator = T::one();
        for (j, &node) in offsets.iter().enumerate() {
            if j != k {
                numerator = numerator * (position - node);
            }
        }
        *w = numerator / denominators[k];
    }
}

/// Squared Cauchy kernel `(1 + d^2)^-2` at squared distance `d_sq`
#[inline]
fn squared_cauchy<T: Float>(d_sq: T) -> T {
    let denom = T::one() + d_sq;
    T::one() / (denom * denom)
}

//////////////
// AxisGrid //
//////////////

/// Uniform interpolation grid along one axis
///
/// Nodes sit at half-cell offsets: `h/2, 3h/2, ...` within each cell, with
/// `h` the node spacing. The same structure serves the x and y axes of the
/// square 2-D grid and the single axis of the 1-D engine.
///
/// ### Fields
///
/// * `coord_min` - Lower edge of the grid
/// * `box_width` - Cell width in embedding units
/// * `n_boxes` - Cells along the axis
/// * `n_interp` - Nodes per cell
/// * `offsets` - Node positions within the unit cell
/// * `denominators` - Lagrange denominators for those positions
struct AxisGrid<T> {
    coord_min: T,
    box_width: T,
    n_boxes: usize,
    n_interp: usize,
    offsets: Vec<T>,
    denominators: Vec<T>,
}

impl<T> AxisGrid<T>
where
    T: Float + FromPrimitive,
{
    fn new(coord_min: T, coord_max: T, n_boxes: usize, n_interp: usize) -> Self {
        let two = T::one() + T::one();
        let box_width = (coord_max - coord_min) / T::from_usize(n_boxes).unwrap();

        let h = T::one() / T::from_usize(n_interp).unwrap();
        let mut offsets = vec![T::zero(); n_interp];
        offsets[0] = h / two;
        for i in 1..n_interp {
            offsets[i] = offsets[i - 1] + h;
        }

        let mut denominators = vec![T::one(); n_interp];
        for i in 0..n_interp {
            for j in 0..n_interp {
                if i != j {
                    denominators[i] = denominators[i] * (offsets[i] - offsets[j]);
                }
            }
        }

        Self {
            coord_min,
            box_width,
            n_boxes,
            n_interp,
            offsets,
            denominators,
        }
    }

    /// Total interpolation nodes along the axis
    #[inline]
    fn n_nodes(&self) -> usize {
        self.n_boxes * self.n_interp
    }

    /// Spacing between adjacent nodes in embedding units
    #[inline]
    fn node_step(&self) -> T {
        self.box_width / T::from_usize(self.n_interp).unwrap()
    }

    /// Cell index containing a coordinate (clamped to the grid)
    #[inline]
    fn box_of(&self, coord: T) -> usize {
        ((coord - self.coord_min) / self.box_width)
            .to_usize()
            .unwrap_or(0)
            .min(self.n_boxes - 1)
    }

    /// Intra-cell position of a coordinate, in [0, 1]
    #[inline]
    fn position_in_box(&self, coord: T, box_idx: usize) -> T {
        let box_min = self.coord_min + T::from_usize(box_idx).unwrap() * self.box_width;
        (coord - box_min) / self.box_width
    }
}

/// Raw coordinate bounds over one or two axes
fn coordinate_bounds<T: Float>(coords: &[&[T]]) -> (T, T) {
    let mut min_v = T::infinity();
    let mut max_v = T::neg_infinity();
    for axis in coords {
        for &v in *axis {
            min_v = min_v.min(v);
            max_v = max_v.max(v);
        }
    }
    (min_v, max_v)
}

/// Pad bounds slightly so no point sits exactly on the grid edge
fn padded_bounds<T: Float + FromPrimitive>(min_v: T, max_v: T) -> (T, T) {
    let pad = (max_v - min_v) * T::from_f64(1e-3).unwrap() + T::from_f64(1e-9).unwrap();
    (min_v - pad, max_v + pad)
}

/// Sizes that must not overflow grid allocations
fn checked_grid(n_boxes: usize, n_interp: usize, dims: u32) -> Result<(usize, usize)> {
    let n_nodes = n_boxes
        .checked_mul(n_interp)
        .ok_or_else(|| TsneError::ResourceFailure("interpolation grid overflow".into()))?;
    let n_fft = n_nodes
        .checked_mul(2)
        .ok_or_else(|| TsneError::ResourceFailure("fft grid overflow".into()))?;
    n_fft
        .checked_pow(dims)
        .ok_or_else(|| TsneError::ResourceFailure("fft buffer overflow".into()))?;
    Ok((n_nodes, n_fft))
}

/// Run a batch of independent in-place FFTs over contiguous rows
fn fft_rows<T: FftFloat>(buffer: &mut [Complex<T>], n_fft: usize, plan: &Arc<dyn Fft<T>>) {
    buffer
        .par_chunks_mut(n_fft)
        .for_each(|row| plan.process(row));
}

/// Square matrix transpose of a flat complex buffer
fn transpose_square<T: Copy>(buffer: &mut [Complex<T>], n: usize) {
    for i in 0..n {
        for j in (i + 1)..n {
            buffer.swap(i * n + j, j * n + i);
        }
    }
}

////////////////////
// 1-D repulsion  //
////////////////////

/// FFT-accelerated repulsive forces for a 1-D embedding
///
/// Charges `{1, y, y^2}` are spread onto the interpolation grid, convolved
/// with the squared Cauchy kernel on a doubled circulant grid, and gathered
/// back, giving per-point potentials `phi_0..phi_2` with:
///
/// - `Z = sum_i (1 + y_i^2) phi_0 - 2 y_i phi_1 + phi_2 - N`
/// - `rep_i = (y_i phi_0 - phi_1) / (Z + eps)`
///
/// ### Params
///
/// * `positions` - Current 1-D coordinates
/// * `params` - Grid configuration
///
/// ### Returns
///
/// `(repulsion, Z)`: normalised repulsive force per point and the partition
/// function estimate
pub fn repulsion_1d<T>(positions: &[T], params: &FftParams) -> Result<(Vec<T>, T)>
where
    T: FftFloat,
{
    let n = positions.len();
    let n_terms = 3;

    let (raw_min, raw_max) = coordinate_bounds(&[positions]);
    let spread = (raw_max - raw_min).to_f64().unwrap_or(0.0);
    if spread < 1e-9 {
        // fully collapsed embedding: zero net force, every pair at q = 1
        let nf = T::from_usize(n).unwrap();
        return Ok((vec![T::zero(); n], nf * nf - nf));
    }
    let (coord_min, coord_max) = padded_bounds(raw_min, raw_max);

    let n_boxes = choose_grid_size(spread, params.ints_per_interval, params.min_num_intervals);
    let (n_nodes, n_fft) = checked_grid(n_boxes, params.n_interpolation_points, 1)?;
    let grid = AxisGrid::new(coord_min, coord_max, n_boxes, params.n_interpolation_points);

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(n_fft);
    let inverse = planner.plan_fft_inverse(n_fft);

    // circulant kernel, mirrored about the grid origin, transformed once
    let step = grid.node_step();
    let mut kernel = vec![Complex::new(T::zero(), T::zero()); n_fft];
    for i in 0..n_nodes {
        let d = step * T::from_usize(i).unwrap();
        let k = squared_cauchy(d * d);
        kernel[n_nodes + i] = Complex::new(k, T::zero());
        kernel[n_nodes - i] = Complex::new(k, T::zero());
    }
    forward.process(&mut kernel);

    // per-point cell assignment and Lagrange weights
    let n_interp = grid.n_interp;
    let mut boxes = vec![0usize; n];
    let mut weights = vec![T::zero(); n * n_interp];
    for (i, &y) in positions.iter().enumerate() {
        boxes[i] = grid.box_of(y);
        let pos = grid.position_in_box(y, boxes[i]);
        lagrange_weights(
            pos,
            &grid.offsets,
            &grid.denominators,
            &mut weights[i * n_interp..(i + 1) * n_interp],
        );
    }

    // spread charges {1, y, y^2} onto the grid
    let mut w_grid = vec![T::zero(); n_nodes * n_terms];
    for (i, &y) in positions.iter().enumerate() {
        let charges = [T::one(), y, y * y];
        for k in 0..n_interp {
            let node = boxes[i] * n_interp + k;
            let w = weights[i * n_interp + k];
            for (t, &c) in charges.iter().enumerate() {
                w_grid[node * n_terms + t] = w_grid[node * n_terms + t] + w * c;
            }
        }
    }

    // convolve each term on the doubled grid
    let norm = T::from_usize(n_fft).unwrap();
    let mut potentials_grid = vec![T::zero(); n_nodes * n_terms];
    let mut buffer = vec![Complex::new(T::zero(), T::zero()); n_fft];
    for term in 0..n_terms {
        for v in buffer.iter_mut() {
            *v = Complex::new(T::zero(), T::zero());
        }
        for node in 0..n_nodes {
            buffer[n_nodes + node] = Complex::new(w_grid[node * n_terms + term], T::zero());
        }

        forward.process(&mut buffer);
        for (v, &k) in buffer.iter_mut().zip(&kernel) {
            *v = *v * k;
        }
        inverse.process(&mut buffer);

        for node in 0..n_nodes {
            potentials_grid[node * n_terms + term] = buffer[node].re / norm;
        }
    }

    // gather potentials back to the points
    let mut phi = vec![T::zero(); n * n_terms];
    for i in 0..n {
        for k in 0..n_interp {
            let node = boxes[i] * n_interp + k;
            let w = weights[i * n_interp + k];
            for t in 0..n_terms {
                phi[i * n_terms + t] = phi[i * n_terms + t] + w * potentials_grid[node * n_terms + t];
            }
        }
    }

    // partition function and normalised forces
    let two = T::one() + T::one();
    let mut z = T::zero();
    for (i, &y) in positions.iter().enumerate() {
        let p0 = phi[i * n_terms];
        let p1 = phi[i * n_terms + 1];
        let p2 = phi[i * n_terms + 2];
        z = z + (T::one() + y * y) * p0 - two * y * p1 + p2;
    }
    z = z - T::from_usize(n).unwrap();

    let z_inv = T::one() / (z + T::epsilon());
    let repulsion = positions
        .iter()
        .enumerate()
        .map(|(i, &y)| (y * phi[i * n_terms] - phi[i * n_terms + 1]) * z_inv)
        .collect();

    Ok((repulsion, z))
}

////////////////////
// 2-D repulsion  //
////////////////////

/// FFT-accelerated repulsive forces for a 2-D embedding
///
/// Same construction as [`repulsion_1d`] one dimension up: charges
/// `{1, x, y, x^2 + y^2}` on a square grid, kernel mirrored across all four
/// quadrants of the doubled grid, row/column FFT passes parallelised over
/// the independent 1-D transforms, with:
///
/// - `Z = sum_i (1 + x_i^2 + y_i^2) phi_0 - 2 (x_i phi_1 + y_i phi_2) + phi_3 - N`
/// - `rep_x,i = (x_i phi_0 - phi_1) / (Z + eps)` and analogously for y
///
/// ### Params
///
/// * `xs` / `ys` - Current coordinates, one slice per axis
/// * `params` - Grid configuration
///
/// ### Returns
///
/// `(repulsion_x, repulsion_y, Z)`
pub fn repulsion_2d<T>(xs: &[T], ys: &[T], params: &FftParams) -> Result<(Vec<T>, Vec<T>, T)>
where
    T: FftFloat,
{
    let n = xs.len();
    let n_terms = 4;

    let (raw_min, raw_max) = coordinate_bounds(&[xs, ys]);
    let spread = (raw_max - raw_min).to_f64().unwrap_or(0.0);
    if spread < 1e-9 {
        let nf = T::from_usize(n).unwrap();
        return Ok((vec![T::zero(); n], vec![T::zero(); n], nf * nf - nf));
    }
    let (coord_min, coord_max) = padded_bounds(raw_min, raw_max);

    let n_boxes = choose_grid_size(spread, params.ints_per_interval, params.min_num_intervals);
    let (n_nodes, n_fft) = checked_grid(n_boxes, params.n_interpolation_points, 2)?;
    let grid = AxisGrid::new(coord_min, coord_max, n_boxes, params.n_interpolation_points);

    let mut planner = FftPlanner::new();
    let forward = planner.plan_fft_forward(n_fft);
    let inverse = planner.plan_fft_inverse(n_fft);

    // kernel on the doubled grid, mirrored into all four quadrants
    let step = grid.node_step();
    let mut kernel = vec![Complex::new(T::zero(), T::zero()); n_fft * n_fft];
    for i in 0..n_nodes {
        for j in 0..n_nodes {
            let dx = step * T::from_usize(i).unwrap();
            let dy = step * T::from_usize(j).unwrap();
            let k = Complex::new(squared_cauchy(dx * dx + dy * dy), T::zero());

            kernel[(n_nodes + i) * n_fft + (n_nodes + j)] = k;
            kernel[(n_nodes - i) * n_fft + (n_nodes + j)] = k;
            kernel[(n_nodes + i) * n_fft + (n_nodes - j)] = k;
            kernel[(n_nodes - i) * n_fft + (n_nodes - j)] = k;
        }
    }
    fft_2d(&mut kernel, n_fft, &forward);

    // cell assignments and per-axis Lagrange weights
    let n_interp = grid.n_interp;
    let mut boxes = vec![(0usize, 0usize); n];
    let mut x_weights = vec![T::zero(); n * n_interp];
    let mut y_weights = vec![T::zero(); n * n_interp];
    for i in 0..n {
        let bx = grid.box_of(xs[i]);
        let by = grid.box_of(ys[i]);
        boxes[i] = (by, bx);

        lagrange_weights(
            grid.position_in_box(xs[i], bx),
            &grid.offsets,
            &grid.denominators,
            &mut x_weights[i * n_interp..(i + 1) * n_interp],
        );
        lagrange_weights(
            grid.position_in_box(ys[i], by),
            &grid.offsets,
            &grid.denominators,
            &mut y_weights[i * n_interp..(i + 1) * n_interp],
        );
    }

    // spread charges {1, x, y, x^2 + y^2} onto the grid
    let mut w_grid = vec![T::zero(); n_nodes * n_nodes * n_terms];
    for i in 0..n {
        let (by, bx) = boxes[i];
        let charges = [T::one(), xs[i], ys[i], xs[i] * xs[i] + ys[i] * ys[i]];

        for ky in 0..n_interp {
            let row = by * n_interp + ky;
            let wy = y_weights[i * n_interp + ky];
            for kx in 0..n_interp {
                let col = bx * n_interp + kx;
                let w = wy * x_weights[i * n_interp + kx];
                let node = row * n_nodes + col;
                for (t, &c) in charges.iter().enumerate() {
                    w_grid[node * n_terms + t] = w_grid[node * n_terms + t] + w * c;
                }
            }
        }
    }

    // convolve each term: embed, forward, Hadamard, inverse, extract
    let norm = T::from_usize(n_fft * n_fft).unwrap();
    let mut potentials_grid = vec![T::zero(); n_nodes * n_nodes * n_terms];
    let mut buffer = vec![Complex::new(T::zero(), T::zero()); n_fft * n_fft];
    for term in 0..n_terms {
        for v in buffer.iter_mut() {
            *v = Complex::new(T::zero(), T::zero());
        }
        for row in 0..n_nodes {
            for col in 0..n_nodes {
                let w = w_grid[(row * n_nodes + col) * n_terms + term];
                buffer[(n_nodes + row) * n_fft + (n_nodes + col)] = Complex::new(w, T::zero());
            }
        }

        fft_2d(&mut buffer, n_fft, &forward);
        for (v, &k) in buffer.iter_mut().zip(&kernel) {
            *v = *v * k;
        }
        fft_2d(&mut buffer, n_fft, &inverse);

        for row in 0..n_nodes {
            for col in 0..n_nodes {
                potentials_grid[(row * n_nodes + col) * n_terms + term] =
                    buffer[row * n_fft + col].re / norm;
            }
        }
    }

    // gather potentials back to the points
    let mut phi = vec![T::zero(); n * n_terms];
    for i in 0..n {
        let (by, bx) = boxes[i];
        for ky in 0..n_interp {
            let row = by * n_interp + ky;
            let wy = y_weights[i * n_interp + ky];
            for kx in 0..n_interp {
                let col = bx * n_interp + kx;
                let w = wy * x_weights[i * n_interp + kx];
                let node = row * n_nodes + col;
                for t in 0..n_terms {
                    phi[i * n_terms + t] =
                        phi[i * n_terms + t] + w * potentials_grid[node * n_terms + t];
                }
            }
        }
    }

    // partition function and normalised forces
    let two = T::one() + T::one();
    let mut z = T::zero();
    for i in 0..n {
        let p0 = phi[i * n_terms];
        let p1 = phi[i * n_terms + 1];
        let p2 = phi[i * n_terms + 2];
        let p3 = phi[i * n_terms + 3];
        z = z + (T::one() + xs[i] * xs[i] + ys[i] * ys[i]) * p0
            - two * (xs[i] * p1 + ys[i] * p2)
            + p3;
    }
    z = z - T::from_usize(n).unwrap();

    let z_inv = T::one() / (z + T::epsilon());
    let mut rep_x = vec![T::zero(); n];
    let mut rep_y = vec![T::zero(); n];
    for i in 0..n {
        let p0 = phi[i * n_terms];
        rep_x[i] = (xs[i] * p0 - phi[i * n_terms + 1]) * z_inv;
        rep_y[i] = (ys[i] * p0 - phi[i * n_terms + 2]) * z_inv;
    }

    Ok((rep_x, rep_y, z))
}

/// In-place 2-D FFT as a row pass, transpose, row pass, transpose
///
/// Each pass runs the independent 1-D transforms in parallel.
fn fft_2d<T: FftFloat>(buffer: &mut [Complex<T>], n_fft: usize, plan: &Arc<dyn Fft<T>>) {
    fft_rows(buffer, n_fft, plan);
    transpose_square(buffer, n_fft);
    fft_rows(buffer, n_fft, plan);
    transpose_square(buffer, n_fft);
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_fft {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_lagrange_weights_partition_of_unity() {
        let grid = AxisGrid::<f64>::new(0.0, 1.0, 1, 3);

        let mut weights = vec![0.0; 3];
        lagrange_weights(0.37, &grid.offsets, &grid.denominators, &mut weights);
        let sum: f64 = weights.iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-12);

        // at a node, the weight collapses onto that node
        lagrange_weights(grid.offsets[1], &grid.offsets, &grid.denominators, &mut weights);
        assert_relative_eq!(weights[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(weights[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(weights[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_choose_grid_size_rounding() {
        assert_eq!(choose_grid_size(3.0, 1.0, 10), 25);
        assert_eq!(choose_grid_size(70.0, 1.0, 10), 72);
        assert_eq!(choose_grid_size(500.0, 1.0, 10), 500);
    }

    /// Exact O(N^2) repulsion in 1-D
    fn direct_1d(positions: &[f64]) -> (Vec<f64>, f64) {
        let n = positions.len();
        let mut z = 0.0;
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let d = positions[i] - positions[j];
                    z += 1.0 / (1.0 + d * d);
                }
            }
        }

        let forces = (0..n)
            .map(|i| {
                (0..n)
                    .filter(|&j| j != i)
                    .map(|j| {
                        let d = positions[i] - positions[j];
                        let q = 1.0 / (1.0 + d * d);
                        q * q * d / z
                    })
                    .sum()
            })
            .collect();

        (forces, z)
    }

    /// Exact O(N^2) repulsion in 2-D
    fn direct_2d(xs: &[f64], ys: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
        let n = xs.len();
        let mut z = 0.0;
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = xs[i] - xs[j];
                    let dy = ys[i] - ys[j];
                    z += 1.0 / (1.0 + dx * dx + dy * dy);
                }
            }
        }

        let mut fx = vec![0.0; n];
        let mut fy = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let dx = xs[i] - xs[j];
                    let dy = ys[i] - ys[j];
                    let q = 1.0 / (1.0 + dx * dx + dy * dy);
                    fx[i] += q * q * dx / z;
                    fy[i] += q * q * dy / z;
                }
            }
        }

        (fx, fy, z)
    }

    #[test]
    fn test_repulsion_1d_matches_direct() {
        let mut rng = StdRng::seed_from_u64(9);
        let positions: Vec<f64> = (0..300).map(|_| rng.random::<f64>() * 8.0 - 4.0).collect();

        let (fft_f, fft_z) = repulsion_1d(&positions, &FftParams::default()).unwrap();
        let (direct_f, direct_z) = direct_1d(&positions);

        assert!(
            ((fft_z - direct_z) / direct_z).abs() < 0.01,
            "Z mismatch: fft = {}, direct = {}",
            fft_z,
            direct_z
        );

        let err: f64 = fft_f
            .iter()
            .zip(&direct_f)
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        let norm: f64 = direct_f.iter().map(|b| b.powi(2)).sum::<f64>().sqrt();
        assert!(err / norm < 0.01, "relative force error {:.4}", err / norm);
    }

    #[test]
    fn test_repulsion_2d_matches_direct() {
        let mut rng = StdRng::seed_from_u64(11);
        let xs: Vec<f64> = (0..250).map(|_| rng.random::<f64>() * 6.0 - 3.0).collect();
        let ys: Vec<f64> = (0..250).map(|_| rng.random::<f64>() * 6.0 - 3.0).collect();

        let (fft_x, fft_y, fft_z) = repulsion_2d(&xs, &ys, &FftParams::default()).unwrap();
        let (direct_x, direct_y, direct_z) = direct_2d(&xs, &ys);

        assert!(
            ((fft_z - direct_z) / direct_z).abs() < 0.01,
            "Z mismatch: fft = {}, direct = {}",
            fft_z,
            direct_z
        );

        let err: f64 = fft_x
            .iter()
            .zip(&direct_x)
            .chain(fft_y.iter().zip(&direct_y))
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        let norm: f64 = direct_x
            .iter()
            .chain(direct_y.iter())
            .map(|b| b.powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(err / norm < 0.02, "relative force error {:.4}", err / norm);
    }

    #[test]
    fn test_repulsion_2d_forces_sum_to_zero() {
        let mut rng = StdRng::seed_from_u64(13);
        let xs: Vec<f64> = (0..120).map(|_| rng.random::<f64>() * 4.0 - 2.0).collect();
        let ys: Vec<f64> = (0..120).map(|_| rng.random::<f64>() * 4.0 - 2.0).collect();

        let (fx, fy, _) = repulsion_2d(&xs, &ys, &FftParams::default()).unwrap();

        assert!(fx.iter().sum::<f64>().abs() < 1e-3);
        assert!(fy.iter().sum::<f64>().abs() < 1e-3);
    }

    #[test]
    fn test_collapsed_embedding_short_circuits() {
        let positions = vec![0.25; 40];
        let (forces, z) = repulsion_1d(&positions, &FftParams::default()).unwrap();

        assert!(forces.iter().all(|&f| f == 0.0));
        assert_relative_eq!(z, 40.0 * 39.0);

        let (fx, fy, z2) = repulsion_2d(&positions, &positions, &FftParams::default()).unwrap();
        assert!(fx.iter().all(|&f| f == 0.0));
        assert!(fy.iter().all(|&f| f == 0.0));
        assert_relative_eq!(z2, 40.0 * 39.0);
    }
}

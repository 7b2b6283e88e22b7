use num_traits::Float;

use crate::error::{Result, TsneError};

/////////////////////
// Data structures //
/////////////////////

/////////////////////
// Neighbour lists //
/////////////////////

/// k-nearest-neighbour lists for a set of query points
///
/// Indices and distances are parallel: `distances[i][j]` is the distance
/// from query point `i` to point `indices[i][j]`. Rows may have differing
/// lengths (ragged neighbourhoods are fine), but indices and distances must
/// always agree row by row.
///
/// ### Fields
///
/// * `indices` - Per query point, the indices of its neighbours
/// * `distances` - Per query point, the distances to those neighbours
#[derive(Clone, Debug)]
pub struct NeighbourList<T> {
    pub indices: Vec<Vec<usize>>,
    pub distances: Vec<Vec<T>>,
}

impl<T> NeighbourList<T>
where
    T: Float,
{
    /// Number of query points
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when no query points are present
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Validate the list against the point set it refers to
    ///
    /// ### Params
    ///
    /// * `n_queries` - Expected number of query points
    /// * `n_targets` - Size of the point set the indices refer into
    ///
    /// ### Returns
    ///
    /// `Ok(())` or `InvalidInput` describing the first violation found:
    /// mismatched row counts, ragged index/distance rows, out-of-range
    /// indices, or negative/non-finite distances.
    pub fn validate(&self, n_queries: usize, n_targets: usize) -> Result<()> {
        if self.indices.len() != n_queries || self.distances.len() != n_queries {
            return Err(TsneError::InvalidInput(format!(
                "neighbour list covers {} points, expected {}",
                self.indices.len(),
                n_queries
            )));
        }

        for (i, (idx, dist)) in self.indices.iter().zip(&self.distances).enumerate() {
            if idx.len() != dist.len() {
                return Err(TsneError::InvalidInput(format!(
                    "row {}: {} indices but {} distances",
                    i,
                    idx.len(),
                    dist.len()
                )));
            }
            if let Some(&j) = idx.iter().find(|&&j| j >= n_targets) {
                return Err(TsneError::InvalidInput(format!(
                    "row {}: neighbour index {} out of range (n = {})",
                    i, j, n_targets
                )));
            }
            if dist.iter().any(|d| !d.is_finite() || *d < T::zero()) {
                return Err(TsneError::InvalidInput(format!(
                    "row {}: non-finite or negative neighbour distance",
                    i
                )));
            }
        }

        Ok(())
    }
}

///////////////////////
// Sparse affinities //
///////////////////////

/// Sparse affinity matrix in CSR form
///
/// After symmetrisation both triangles are stored explicitly so that the
/// attractive gradient can walk each row contiguously. Column indices
/// within a row are sorted ascending.
///
/// ### Fields
///
/// * `indices` - Column index per stored value
/// * `indptr` - Row pointers; row `i` occupies `indices[indptr[i]..indptr[i+1]]`
/// * `values` - The affinity values
/// * `shape` - `(n_rows, n_cols)`; square for fitted affinities, rectangular
///   (new x reference) in transform mode
#[derive(Clone, Debug)]
pub struct SparseAffinities<T> {
    pub indices: Vec<usize>,
    pub indptr: Vec<usize>,
    pub values: Vec<T>,
    pub shape: (usize, usize),
}

impl<T> SparseAffinities<T>
where
    T: Float,
{
    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.shape.0
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `i`
    #[inline]
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        let start = self.indptr[i];
        let end = self.indptr[i + 1];
        (&self.indices[start..end], &self.values[start..end])
    }

    /// Sum of all stored values
    pub fn total(&self) -> T {
        self.values.iter().fold(T::zero(), |acc, &v| acc + v)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_structures {
    use super::*;

    fn small_list() -> NeighbourList<f64> {
        NeighbourList {
            indices: vec![vec![1, 2], vec![0, 2], vec![0, 1]],
            distances: vec![vec![1.0, 2.0], vec![1.0, 1.5], vec![2.0, 1.5]],
        }
    }

    #[test]
    fn test_neighbour_list_validate_ok() {
        assert!(small_list().validate(3, 3).is_ok());
    }

    #[test]
    fn test_neighbour_list_validate_ragged() {
        let mut list = small_list();
        list.distances[1].pop();
        assert!(matches!(
            list.validate(3, 3),
            Err(TsneError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_neighbour_list_validate_out_of_range() {
        let mut list = small_list();
        list.indices[0][0] = 7;
        assert!(list.validate(3, 3).is_err());
    }

    #[test]
    fn test_neighbour_list_validate_nonfinite() {
        let mut list = small_list();
        list.distances[2][1] = f64::NAN;
        assert!(list.validate(3, 3).is_err());
    }

    #[test]
    fn test_sparse_row_access() {
        let p = SparseAffinities {
            indices: vec![1, 2, 0, 0],
            indptr: vec![0, 2, 3, 4],
            values: vec![0.5, 0.5, 1.0, 1.0],
            shape: (3, 3),
        };

        let (cols, vals) = p.row(0);
        assert_eq!(cols, &[1, 2]);
        assert_eq!(vals, &[0.5, 0.5]);
        assert_eq!(p.nnz(), 4);
        assert_eq!(p.total(), 3.0);
    }
}

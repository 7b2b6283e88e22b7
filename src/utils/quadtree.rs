use num_traits::{Float, FromPrimitive};

//////////////
// QuadTree //
//////////////

/// Coordinates closer than this are treated as the same point
const DUPLICATE_EPS: f64 = 1e-12;

/// A square region of the embedding plane
///
/// ### Fields
///
/// * `min_x` / `min_y` - Lower-left corner
/// * `width` - Side length (cells stay square down the tree)
#[derive(Clone, Copy, Debug)]
struct Cell<T> {
    min_x: T,
    min_y: T,
    width: T,
}

impl<T: Float> Cell<T> {
    /// Quadrant of a point relative to the cell centre
    ///
    /// ### Returns
    ///
    /// `usize` -> 0 (SW), 1 (SE), 2 (NW), 3 (NE)
    fn quadrant(&self, x: T, y: T) -> usize {
        let half = self.width / (T::one() + T::one());
        let east = if x > self.min_x + half { 1 } else { 0 };
        let north = if y > self.min_y + half { 2 } else { 0 };
        east + north
    }

    /// The sub-cell covering a given quadrant
    fn child(&self, quadrant: usize) -> Self {
        let half = self.width / (T::one() + T::one());
        let east = (quadrant & 1) == 1;
        let north = (quadrant & 2) == 2;

        Cell {
            min_x: if east { self.min_x + half } else { self.min_x },
            min_y: if north { self.min_y + half } else { self.min_y },
            width: half,
        }
    }
}

/// A node in the flattened quadtree
///
/// ### Fields
///
/// * `com_x` / `com_y` - Centre of mass of the points below this node
/// * `mass` - Number of points below this node
/// * `width` - Side length of the cell this node covers
/// * `children` - Arena indices of the four sub-cells, `None` where empty
/// * `point_idx` - For leaves, the index of a contained embedding point
/// * `duplicates` - Leaf holding >= 2 points with identical coordinates
#[derive(Debug, Clone)]
pub struct QuadNode<T> {
    pub com_x: T,
    pub com_y: T,
    pub mass: T,
    pub width: T,
    pub children: [Option<usize>; 4],
    pub point_idx: Option<usize>,
    pub duplicates: bool,
}

impl<T: Float> QuadNode<T> {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.point_idx.is_some()
    }
}

/// Quadtree over a 2-D embedding, stored in a flat arena
///
/// Nodes live contiguously in one `Vec` and address each other by index,
/// so a rebuild is a single allocation and dropping the tree is O(1). The
/// tree is rebuilt from scratch every iteration and never mutated while
/// gradients read it.
///
/// ### Fields
///
/// * `nodes` - The arena; `nodes[root]` covers the full bounding square
/// * `root` - Arena index of the root (always 0 after construction)
pub struct QuadTree<T> {
    pub nodes: Vec<QuadNode<T>>,
    root: usize,
}

impl<T> QuadTree<T>
where
    T: Float + FromPrimitive + Send + Sync,
{
    /// Bulk-build the tree from the current embedding
    ///
    /// The root cell is the bounding square of all points, padded slightly
    /// so no point sits exactly on an edge.
    ///
    /// ### Params
    ///
    /// * `embedding` - Current 2-D positions, one `[x, y]` row per point
    pub fn new(embedding: &[Vec<T>]) -> Self {
        let (min_v, max_v) = embedding.iter().fold(
            (T::infinity(), T::neg_infinity()),
            |(lo, hi), p| (lo.min(p[0]).min(p[1]), hi.max(p[0]).max(p[1])),
        );

        let pad = T::from_f64(1e-6).unwrap();
        let cell = Cell {
            min_x: min_v - pad,
            min_y: min_v - pad,
            width: (max_v - min_v) + pad + pad,
        };

        let mut nodes: Vec<QuadNode<T>> = Vec::with_capacity(embedding.len() * 2);
        let all_points: Vec<usize> = (0..embedding.len()).collect();
        let root = Self::build_recursive(&mut nodes, embedding, all_points, cell);

        Self { nodes, root }
    }

    /// All points in the bucket share one coordinate (within tolerance)
    fn all_identical(embedding: &[Vec<T>], points: &[usize]) -> bool {
        let eps = T::from_f64(DUPLICATE_EPS).unwrap();
        let first = &embedding[points[0]];
        points.iter().all(|&p| {
            (embedding[p][0] - first[0]).abs() <= eps
                && (embedding[p][1] - first[1]).abs() <= eps
        })
    }

    /// Insert a bucket of points, splitting into quadrants until buckets
    /// are single points or duplicate groups
    ///
    /// ### Returns
    ///
    /// Arena index of the created node
    fn build_recursive(
        nodes: &mut Vec<QuadNode<T>>,
        embedding: &[Vec<T>],
        points: Vec<usize>,
        cell: Cell<T>,
    ) -> usize {
        let mass = T::from_usize(points.len()).unwrap();

        // leaves: single point, coincident points, or a cell shrunk below
        // coordinate resolution (prevents unbounded subdivision)
        let degenerate = cell.width < T::from_f64(DUPLICATE_EPS).unwrap();
        if points.len() == 1 || degenerate || Self::all_identical(embedding, &points) {
            let (sum_x, sum_y) = points
                .iter()
                .fold((T::zero(), T::zero()), |(sx, sy), &p| {
                    (sx + embedding[p][0], sy + embedding[p][1])
                });

            let node_idx = nodes.len();
            nodes.push(QuadNode {
                com_x: sum_x / mass,
                com_y: sum_y / mass,
                mass,
                width: cell.width,
                children: [None; 4],
                point_idx: Some(points[0]),
                duplicates: points.len() > 1,
            });
            return node_idx;
        }

        let mut buckets: [Vec<usize>; 4] = [Vec::new(), Vec::new(), Vec::new(), Vec::new()];
        let mut sum_x = T::zero();
        let mut sum_y = T::zero();

        for &p in &points {
            sum_x = sum_x + embedding[p][0];
            sum_y = sum_y + embedding[p][1];
            buckets[cell.quadrant(embedding[p][0], embedding[p][1])].push(p);
        }

        let node_idx = nodes.len();
        nodes.push(QuadNode {
            com_x: sum_x / mass,
            com_y: sum_y / mass,
            mass,
            width: cell.width,
            children: [None; 4],
            point_idx: None,
            duplicates: false,
        });

        let mut children = [None; 4];
        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                children[quadrant] =
                    Some(Self::build_recursive(nodes, embedding, bucket, cell.child(quadrant)));
            }
        }
        nodes[node_idx].children = children;

        node_idx
    }

    /// Accumulate the Barnes-Hut repulsion acting on one point
    ///
    /// Walks the tree with an explicit stack. A node stands in for its
    /// subtree when `width^2 < theta^2 * r^2` (with r the distance to its
    /// centre of mass) or when it is a leaf. The leaf containing the query
    /// point itself contributes `mass - 1` to the partition sum and nothing
    /// to the force, which is exact for duplicate groups.
    ///
    /// ### Params
    ///
    /// * `p_x` / `p_y` - Query point coordinates
    /// * `theta` - Accuracy threshold; 0 degenerates to the exact O(N) walk
    /// * `dof` - Student-t degrees of freedom of the similarity kernel
    ///
    /// ### Returns
    ///
    /// `(force_x, force_y, sum_q)`: the unnormalised repulsion on the point
    /// and its contribution to the partition function Z
    pub fn repulsion_at(&self, p_x: T, p_y: T, theta: T, dof: T) -> (T, T, T) {
        let mut force_x = T::zero();
        let mut force_y = T::zero();
        let mut sum_q = T::zero();

        let exponent = (dof + T::one()) / (T::one() + T::one());
        let self_eps = T::from_f64(DUPLICATE_EPS).unwrap();

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];

            let dx = p_x - node.com_x;
            let dy = p_y - node.com_y;
            let dist_sq = dx * dx + dy * dy;

            if node.is_leaf() && dist_sq < self_eps {
                // the query's own leaf: duplicates sit at distance zero,
                // so only the partition term survives
                sum_q = sum_q + (node.mass - T::one());
                continue;
            }

            let summarise = node.width * node.width < theta * theta * dist_sq;
            if summarise || node.is_leaf() {
                let mut q = dof / (dof + dist_sq);
                if dof != T::one() {
                    q = q.powf(exponent);
                }

                sum_q = sum_q + node.mass * q;
                let mult = node.mass * q * q;
                force_x = force_x + mult * dx;
                force_y = force_y + mult * dy;
            } else {
                for child in node.children.iter().flatten() {
                    stack.push(*child);
                }
            }
        }

        (force_x, force_y, sum_q)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod test_quadtree {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_embedding(n: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| vec![rng.random::<f64>() * 10.0 - 5.0, rng.random::<f64>() * 10.0 - 5.0])
            .collect()
    }

    /// Exact O(N^2) reference for the repulsion on point `i`
    fn direct_repulsion(embedding: &[Vec<f64>], i: usize, dof: f64) -> (f64, f64, f64) {
        let mut fx = 0.0;
        let mut fy = 0.0;
        let mut sum_q = 0.0;
        let exponent = (dof + 1.0) / 2.0;

        for (j, p) in embedding.iter().enumerate() {
            if j == i {
                continue;
            }
            let dx = embedding[i][0] - p[0];
            let dy = embedding[i][1] - p[1];
            let dist_sq = dx * dx + dy * dy;
            let mut q = dof / (dof + dist_sq);
            if dof != 1.0 {
                q = q.powf(exponent);
            }
            sum_q += q;
            fx += q * q * dx;
            fy += q * q * dy;
        }

        (fx, fy, sum_q)
    }

    #[test]
    fn test_root_mass_and_centre() {
        let embedding = random_embedding(200, 1);
        let tree = QuadTree::new(&embedding);

        let n = embedding.len() as f64;
        let root = &tree.nodes[0];
        assert_relative_eq!(root.mass, n);

        let com_x: f64 = embedding.iter().map(|p| p[0]).sum::<f64>() / n;
        let com_y: f64 = embedding.iter().map(|p| p[1]).sum::<f64>() / n;
        assert_relative_eq!(root.com_x, com_x, epsilon = 1e-10);
        assert_relative_eq!(root.com_y, com_y, epsilon = 1e-10);
    }

    #[test]
    fn test_exact_traversal_matches_direct() {
        let embedding = random_embedding(150, 2);
        let tree = QuadTree::new(&embedding);

        for i in [0, 50, 149] {
            let (fx, fy, sq) = tree.repulsion_at(embedding[i][0], embedding[i][1], 0.0, 1.0);
            let (dfx, dfy, dsq) = direct_repulsion(&embedding, i, 1.0);

            assert_relative_eq!(fx, dfx, epsilon = 1e-9);
            assert_relative_eq!(fy, dfy, epsilon = 1e-9);
            assert_relative_eq!(sq, dsq, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_approximation_close_to_direct() {
        let embedding = random_embedding(500, 3);
        let tree = QuadTree::new(&embedding);

        let mut err_sq = 0.0;
        let mut norm_sq = 0.0;
        for (i, p) in embedding.iter().enumerate() {
            let (fx, fy, _) = tree.repulsion_at(p[0], p[1], 0.5, 1.0);
            let (dfx, dfy, _) = direct_repulsion(&embedding, i, 1.0);
            err_sq += (fx - dfx).powi(2) + (fy - dfy).powi(2);
            norm_sq += dfx.powi(2) + dfy.powi(2);
        }

        let rel = (err_sq / norm_sq).sqrt();
        assert!(rel < 0.05, "theta=0.5 relative error too large: {:.4}", rel);
    }

    #[test]
    fn test_all_duplicates_flagged_and_forceless() {
        let embedding = vec![vec![1.5, -2.0]; 20];
        let tree = QuadTree::new(&embedding);

        assert_eq!(tree.nodes.len(), 1, "coincident points must not subdivide");
        assert!(tree.nodes[0].duplicates);
        assert_relative_eq!(tree.nodes[0].mass, 20.0);

        let (fx, fy, sum_q) = tree.repulsion_at(1.5, -2.0, 0.5, 1.0);
        assert_eq!(fx, 0.0);
        assert_eq!(fy, 0.0);
        // q = 1 at distance zero, one unit of mass is the point itself
        assert_relative_eq!(sum_q, 19.0);
    }

    #[test]
    fn test_duplicate_group_partition_term() {
        let mut embedding = vec![vec![0.0, 0.0]; 3];
        embedding.push(vec![4.0, 0.0]);

        let tree = QuadTree::new(&embedding);
        let (_, _, sum_q) = tree.repulsion_at(0.0, 0.0, 0.0, 1.0);

        // two coincident partners at q = 1 plus the far point at q = 1/17
        assert_relative_eq!(sum_q, 2.0 + 1.0 / 17.0, epsilon = 1e-12);
    }

    #[test]
    fn test_generalised_dof_traversal() {
        let embedding = random_embedding(80, 5);
        let tree = QuadTree::new(&embedding);

        for i in [3, 40] {
            let (fx, fy, sq) = tree.repulsion_at(embedding[i][0], embedding[i][1], 0.0, 2.5);
            let (dfx, dfy, dsq) = direct_repulsion(&embedding, i, 2.5);

            assert_relative_eq!(fx, dfx, epsilon = 1e-9);
            assert_relative_eq!(fy, dfy, epsilon = 1e-9);
            assert_relative_eq!(sq, dsq, epsilon = 1e-9);
        }
    }
}

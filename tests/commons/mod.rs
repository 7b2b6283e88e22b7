use faer::Mat;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Create a synthetic dataset with five well-separated clusters
///
/// Cluster centres sit at the origin, on three axes at distance 20, and at
/// the all-10s point; each cluster gets tight uniform noise so the clusters
/// stay clearly separated.
pub fn create_diagnostic_data(
    n_per_cluster: usize,
    n_dim: usize,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_total = n_per_cluster * 5;

    let mut data_vec = Vec::with_capacity(n_total * n_dim);
    let mut labels = Vec::with_capacity(n_total);

    let centres = [
        vec![0.0; n_dim],
        (0..n_dim)
            .map(|i| if i == 0 { 20.0 } else { 0.0 })
            .collect::<Vec<_>>(),
        (0..n_dim)
            .map(|i| if i == 1 { 20.0 } else { 0.0 })
            .collect::<Vec<_>>(),
        (0..n_dim)
            .map(|i| if i == 2 { 20.0 } else { 0.0 })
            .collect::<Vec<_>>(),
        vec![10.0; n_dim],
    ];

    for (cluster_id, centre) in centres.iter().enumerate() {
        for _ in 0..n_per_cluster {
            for dim in 0..n_dim {
                let noise: f64 = rng.random::<f64>() * 0.5 - 0.25;
                data_vec.push(centre[dim] + noise);
            }
            labels.push(cluster_id);
        }
    }

    let data = Mat::from_fn(n_total, n_dim, |i, j| data_vec[i * n_dim + j]);
    (data, labels)
}

/// Two isotropic Gaussian blobs with centres `separation` apart on axis 0
pub fn two_blobs(
    n_per_blob: usize,
    n_dim: usize,
    separation: f64,
    seed: u64,
) -> (Mat<f64>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_total = n_per_blob * 2;

    let mut data_vec = Vec::with_capacity(n_total * n_dim);
    let mut labels = Vec::with_capacity(n_total);

    for blob in 0..2 {
        let shift = if blob == 0 { 0.0 } else { separation };
        for _ in 0..n_per_blob {
            for dim in 0..n_dim {
                // Box-Muller keeps the blobs isotropic Gaussian
                let u1: f64 = rng.random::<f64>().max(1e-12);
                let u2: f64 = rng.random::<f64>();
                let gauss = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                data_vec.push(gauss + if dim == 0 { shift } else { 0.0 });
            }
            labels.push(blob);
        }
    }

    let data = Mat::from_fn(n_total, n_dim, |i, j| data_vec[i * n_dim + j]);
    (data, labels)
}

/// Separation quality of a labelled 2-D embedding: minimum inter-centroid
/// distance over mean intra-cluster distance
pub fn separation_ratio(embedding: &[Vec<f64>], labels: &[usize], n_clusters: usize) -> f64 {
    let n_dim = embedding[0].len();

    let mut centroids = vec![vec![0.0; n_dim]; n_clusters];
    let mut counts = vec![0usize; n_clusters];
    for (point, &label) in embedding.iter().zip(labels) {
        for d in 0..n_dim {
            centroids[label][d] += point[d];
        }
        counts[label] += 1;
    }
    for (centroid, &count) in centroids.iter_mut().zip(&counts) {
        for v in centroid.iter_mut() {
            *v /= count as f64;
        }
    }

    let mut min_inter = f64::INFINITY;
    for i in 0..n_clusters {
        for j in (i + 1)..n_clusters {
            let dist: f64 = centroids[i]
                .iter()
                .zip(&centroids[j])
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            min_inter = min_inter.min(dist);
        }
    }

    let mut avg_intra = 0.0;
    for (point, &label) in embedding.iter().zip(labels) {
        let dist: f64 = point
            .iter()
            .zip(&centroids[label])
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        avg_intra += dist;
    }
    avg_intra /= embedding.len() as f64;

    min_inter / avg_intra
}

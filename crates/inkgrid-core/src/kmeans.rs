//! Seeded k-means over 3-vectors (Lab colors in practice).
//!
//! Initialization is k-means++ drawn from a `StdRng` built from
//! [`KMeansParams::seed`]; no global RNG state is touched, so identical input
//! and parameters always produce identical labels.
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Parameters for k-means clustering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansParams {
    /// Requested number of clusters. Reduced when the input has fewer distinct points.
    pub k: usize,
    /// Max Lloyd iterations per attempt.
    pub max_iters: usize,
    /// Stop an attempt once no center moves further than this.
    pub epsilon: f32,
    /// Independent k-means++ restarts; the most compact result wins.
    pub attempts: usize,
    /// RNG seed for the k-means++ draws.
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 3,
            max_iters: 20,
            epsilon: 1.0,
            attempts: 10,
            seed: 42,
        }
    }
}

/// Result of k-means clustering.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansResult {
    pub centers: Vec<[f32; 3]>,
    /// For each input point, the index of its center.
    pub labels: Vec<usize>,
    /// Sum of squared distances from points to their centers.
    pub compactness: f64,
}

impl KMeansResult {
    pub fn k(&self) -> usize {
        self.centers.len()
    }

    /// Number of points assigned to each center.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.centers.len()];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}

#[inline]
fn dist2(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let d0 = a[0] - b[0];
    let d1 = a[1] - b[1];
    let d2 = a[2] - b[2];
    d0 * d0 + d1 * d1 + d2 * d2
}

/// Index of and squared distance to the closest center. Ties go to the lower index.
pub fn nearest_center(p: &[f32; 3], centers: &[[f32; 3]]) -> (usize, f32) {
    let mut best = (0usize, f32::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = dist2(p, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

/// Cluster `points` into at most `params.k` groups.
///
/// Returns `None` for empty input or `k == 0`.
pub fn kmeans(points: &[[f32; 3]], params: &KMeansParams) -> Option<KMeansResult> {
    if points.is_empty() || params.k == 0 {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansResult> = None;

    for _ in 0..params.attempts.max(1) {
        let centers = init_plus_plus(points, params.k, &mut rng);
        let result = lloyd(points, centers, params);
        let better = best
            .as_ref()
            .map_or(true, |b| result.compactness < b.compactness);
        if better {
            best = Some(result);
        }
    }

    if let Some(b) = &best {
        debug!(
            "kmeans: n={} k={} compactness={:.2}",
            points.len(),
            b.k(),
            b.compactness
        );
    }
    best
}

/// k-means++ seeding. Stops early when every remaining point coincides with a
/// chosen center, so the returned count can be below `k`.
fn init_plus_plus(points: &[[f32; 3]], k: usize, rng: &mut StdRng) -> Vec<[f32; 3]> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..points.len())]);

    let mut d2: Vec<f32> = points.iter().map(|p| dist2(p, &centers[0])).collect();

    while centers.len() < k {
        let total: f64 = d2.iter().map(|&d| d as f64).sum();
        if total <= 0.0 {
            break;
        }
        let mut target = rng.gen::<f64>() * total;
        let mut pick = farthest(&d2);
        for (i, &d) in d2.iter().enumerate() {
            target -= d as f64;
            if target <= 0.0 && d > 0.0 {
                pick = i;
                break;
            }
        }
        let c = points[pick];
        centers.push(c);
        for (i, p) in points.iter().enumerate() {
            d2[i] = d2[i].min(dist2(p, &c));
        }
    }

    centers
}

fn farthest(d2: &[f32]) -> usize {
    let mut best = 0;
    for (i, &d) in d2.iter().enumerate() {
        if d > d2[best] {
            best = i;
        }
    }
    best
}

fn lloyd(points: &[[f32; 3]], mut centers: Vec<[f32; 3]>, params: &KMeansParams) -> KMeansResult {
    let k = centers.len();
    let mut labels = vec![0usize; points.len()];

    for _ in 0..params.max_iters.max(1) {
        for (i, p) in points.iter().enumerate() {
            labels[i] = nearest_center(p, &centers).0;
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (p, &l) in points.iter().zip(&labels) {
            for c in 0..3 {
                sums[l][c] += p[c] as f64;
            }
            counts[l] += 1;
        }

        let mut max_shift = 0.0f32;
        for j in 0..k {
            // Empty clusters keep their previous center.
            if counts[j] == 0 {
                continue;
            }
            let n = counts[j] as f64;
            let next = [
                (sums[j][0] / n) as f32,
                (sums[j][1] / n) as f32,
                (sums[j][2] / n) as f32,
            ];
            max_shift = max_shift.max(dist2(&next, &centers[j]).sqrt());
            centers[j] = next;
        }

        if max_shift <= params.epsilon {
            break;
        }
    }

    let mut compactness = 0.0f64;
    for (i, p) in points.iter().enumerate() {
        let (l, d) = nearest_center(p, &centers);
        labels[i] = l;
        compactness += d as f64;
    }

    KMeansResult {
        centers,
        labels,
        compactness,
    }
}

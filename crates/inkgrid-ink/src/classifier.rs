//! Ink-ID classification of sampled cell colors.
//!
//! Steps, in order:
//! 1. cluster the Lab values of all cells with seeded k-means,
//! 2. reject the run when clusters are too loose to trust,
//! 3. drop clusters whose RGB centroid looks like background or grid line and
//!    move their cells to the nearest surviving ink,
//! 4. merge ink clusters whose centroids are within `merge_tolerance` on
//!    every channel,
//! 5. renumber inks by first appearance in row-major order and check the
//!    number of distinct inks.

use crate::sampling::{sample_cells, to_grid, SampledColor};
use crate::{ClassifierParams, ClassifyError, KSelection, Rejection};
use inkgrid_core::{
    kmeans, perceptual_distance, rgb_to_lab, KMeansResult, LabColor, PixelBuffer, Rgb,
};
use inkgrid_grid::GridGeometry;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A group of cells sharing one ink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InkCluster {
    /// Final ink id; `None` for clusters rejected as background.
    pub ink_id: Option<u32>,
    /// Mean sampled RGB of the member cells.
    pub rgb: Rgb,
    /// Mean Lab of the member cells.
    pub lab: LabColor,
    /// Row-major cell indices.
    pub cells: Vec<usize>,
    pub rejection: Option<Rejection>,
}

impl InkCluster {
    #[inline]
    pub fn is_ink(&self) -> bool {
        self.rejection.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterQuality {
    /// Mean Lab distance from each cell to its k-means center.
    pub mean_intra_distance: f32,
    /// `100 / (mean_intra_distance + 1)`; below `2` the clustering is untrusted.
    pub score: f32,
}

/// Result of classifying one grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub size: usize,
    /// Row-major ink ids, `size²` entries.
    pub pattern: Vec<u32>,
    pub samples: Vec<SampledColor>,
    /// Ink clusters ordered by id, followed by rejected clusters.
    pub clusters: Vec<InkCluster>,
    pub quality: ClusterQuality,
}

impl Classification {
    pub fn distinct_inks(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_ink()).count()
    }

    /// Sampled colors as `rows × cols` RGB triples.
    pub fn extracted_colors(&self) -> Vec<Vec<Rgb>> {
        to_grid(&self.samples, self.size)
    }

    /// Reference color of each ink id.
    pub fn palette(&self) -> Vec<Rgb> {
        self.clusters
            .iter()
            .filter(|c| c.is_ink())
            .map(|c| c.rgb)
            .collect()
    }
}

fn mean_rgb(samples: &[SampledColor], cells: &[usize]) -> Rgb {
    let mut acc = [0u32; 3];
    for &i in cells {
        for c in 0..3 {
            acc[c] += samples[i].rgb[c] as u32;
        }
    }
    let n = cells.len().max(1) as u32;
    acc.map(|v| ((v + n / 2) / n) as u8)
}

fn mean_lab(labs: &[LabColor], cells: &[usize]) -> LabColor {
    let n = cells.len().max(1) as f32;
    let (l, a, b) = cells.iter().fold((0.0, 0.0, 0.0), |acc, &i| {
        (acc.0 + labs[i].l, acc.1 + labs[i].a, acc.2 + labs[i].b)
    });
    LabColor::new(l / n, a / n, b / n)
}

fn mean_intra_distance(points: &[[f32; 3]], km: &KMeansResult) -> f32 {
    let total: f32 = points
        .iter()
        .zip(&km.labels)
        .map(|(p, &l)| {
            perceptual_distance(
                LabColor::from_array(*p),
                LabColor::from_array(km.centers[l]),
            )
        })
        .sum();
    total / points.len().max(1) as f32
}

/// Mean intra-cluster distance over the smallest center separation. Lower is
/// better; single-cluster results score `INFINITY`.
fn separation_ratio(points: &[[f32; 3]], km: &KMeansResult) -> f32 {
    let mut min_inter = f32::INFINITY;
    for i in 0..km.k() {
        for j in (i + 1)..km.k() {
            let d = perceptual_distance(
                LabColor::from_array(km.centers[i]),
                LabColor::from_array(km.centers[j]),
            );
            min_inter = min_inter.min(d);
        }
    }
    if !min_inter.is_finite() || min_inter <= 0.0 {
        return f32::INFINITY;
    }
    mean_intra_distance(points, km) / min_inter
}

pub struct InkClassifier {
    params: ClassifierParams,
}

impl InkClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    /// Sample every cell of `geometry` in `buf`, then classify.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, buf, geometry), fields(size = geometry.size))
    )]
    pub fn classify_cells(
        &self,
        buf: &PixelBuffer,
        geometry: &GridGeometry,
    ) -> Result<Classification, ClassifyError> {
        let samples = sample_cells(buf, geometry, &self.params.sampling, &self.params.filter);
        self.classify(samples, geometry.size)
    }

    fn cluster(&self, points: &[[f32; 3]]) -> Option<KMeansResult> {
        let run = |k: usize| {
            let mut p = self.params.kmeans.clone();
            p.k = k;
            kmeans(points, &p)
        };
        match self.params.k {
            KSelection::Fixed(k) => run(k),
            KSelection::Auto { min, max } => {
                let mut best: Option<(f32, KMeansResult)> = None;
                for k in min.max(1)..=max.max(min.max(1)) {
                    let Some(km) = run(k) else { continue };
                    if km.k() < k && best.is_some() {
                        // Fewer distinct points than k: larger k adds nothing.
                        break;
                    }
                    let ratio = separation_ratio(points, &km);
                    debug!("auto k: k={} ratio={:.3}", km.k(), ratio);
                    if best.as_ref().map_or(true, |(r, _)| ratio < *r) {
                        best = Some((ratio, km));
                    }
                }
                best.map(|(_, km)| km)
            }
        }
    }

    /// Classify row-major cell samples of a `size × size` grid.
    pub fn classify(
        &self,
        samples: Vec<SampledColor>,
        size: usize,
    ) -> Result<Classification, ClassifyError> {
        if samples.is_empty() {
            return Err(ClassifyError::NoSamples);
        }
        let labs: Vec<LabColor> = samples.iter().map(|s| rgb_to_lab(s.rgb)).collect();
        let points: Vec<[f32; 3]> = labs.iter().map(|l| l.to_array()).collect();
        let km = self.cluster(&points).ok_or(ClassifyError::NoSamples)?;

        let mean_intra = mean_intra_distance(&points, &km);
        let quality = ClusterQuality {
            mean_intra_distance: mean_intra,
            score: 100.0 / (mean_intra + 1.0),
        };
        if mean_intra > self.params.max_mean_intra_distance {
            return Err(ClassifyError::PoorSeparation {
                mean_distance: mean_intra,
                max: self.params.max_mean_intra_distance,
            });
        }

        // Raw k-means groups; centers left without members are dropped.
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); km.k()];
        for (i, &l) in km.labels.iter().enumerate() {
            groups[l].push(i);
        }
        groups.retain(|g| !g.is_empty());

        let filter = &self.params.filter;
        let mut inks: Vec<Vec<usize>> = Vec::new();
        let mut rejected: Vec<InkCluster> = Vec::new();
        for cells in groups {
            let rgb = mean_rgb(&samples, &cells);
            match filter.rejection(rgb) {
                None => inks.push(cells),
                Some(reason) => {
                    warn!(
                        "dropping cluster rgb={:?} ({} cells): {:?}",
                        rgb,
                        cells.len(),
                        reason
                    );
                    rejected.push(InkCluster {
                        ink_id: None,
                        rgb,
                        lab: mean_lab(&labs, &cells),
                        cells,
                        rejection: Some(reason),
                    });
                }
            }
        }
        if inks.is_empty() {
            return Err(ClassifyError::NoInkClusters);
        }

        let inks = self.merge_duplicates(&samples, inks);

        // Cells of rejected clusters move to the closest ink.
        let ink_labs: Vec<LabColor> = inks.iter().map(|c| mean_lab(&labs, c)).collect();
        let mut owner = vec![usize::MAX; samples.len()];
        for (g, cells) in inks.iter().enumerate() {
            for &i in cells {
                owner[i] = g;
            }
        }
        for r in &rejected {
            for &i in &r.cells {
                owner[i] = nearest_ink(labs[i], &ink_labs);
            }
        }

        // Dense ids by first appearance.
        let mut id_of_group: Vec<Option<u32>> = vec![None; inks.len()];
        let mut next = 0u32;
        let mut pattern = Vec::with_capacity(samples.len());
        for &g in &owner {
            let id = *id_of_group[g].get_or_insert_with(|| {
                next += 1;
                next - 1
            });
            pattern.push(id);
        }

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); inks.len()];
        for (i, &g) in owner.iter().enumerate() {
            members[g].push(i);
        }
        let mut clusters: Vec<InkCluster> = members
            .into_iter()
            .zip(&id_of_group)
            .filter_map(|(cells, id)| {
                id.map(|id| InkCluster {
                    ink_id: Some(id),
                    rgb: mean_rgb(&samples, &cells),
                    lab: mean_lab(&labs, &cells),
                    cells,
                    rejection: None,
                })
            })
            .collect();
        clusters.sort_by_key(|c| c.ink_id);
        let distinct = clusters.len();
        clusters.extend(rejected);

        info!(
            "classified {}x{}: {} inks, mean intra distance {:.1}",
            size, size, distinct, mean_intra
        );

        let rule = self.params.variety;
        if !rule.accepts(distinct) {
            return Err(ClassifyError::ColorVariety {
                distinct,
                min: rule.min_distinct,
                max: rule.max_distinct,
            });
        }

        Ok(Classification {
            size,
            pattern,
            samples,
            clusters,
            quality,
        })
    }

    /// Fold each ink cluster into the first earlier cluster whose mean RGB is
    /// within tolerance on every channel.
    fn merge_duplicates(&self, samples: &[SampledColor], inks: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        let tol = self.params.merge_tolerance as i16;
        let mut kept: Vec<(Rgb, Vec<usize>)> = Vec::new();
        for cells in inks {
            let rgb = mean_rgb(samples, &cells);
            let twin = kept
                .iter_mut()
                .find(|(seen, _)| (0..3).all(|c| (seen[c] as i16 - rgb[c] as i16).abs() < tol));
            match twin {
                Some((_, into)) => {
                    warn!("merging duplicate ink cluster rgb={:?}", rgb);
                    into.extend(cells);
                }
                None => kept.push((rgb, cells)),
            }
        }
        kept.into_iter()
            .map(|(_, mut cells)| {
                cells.sort_unstable();
                cells
            })
            .collect()
    }
}

impl Default for InkClassifier {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

fn nearest_ink(lab: LabColor, inks: &[LabColor]) -> usize {
    let mut best = (0usize, f32::INFINITY);
    for (i, &c) in inks.iter().enumerate() {
        let d = perceptual_distance(lab, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYAN: Rgb = [0, 229, 255];
    const TEAL: Rgb = [0, 150, 136];
    const BLUE: Rgb = [33, 150, 243];

    fn samples(colors: &[Rgb]) -> Vec<SampledColor> {
        let size = (colors.len() as f64).sqrt() as usize;
        colors
            .iter()
            .enumerate()
            .map(|(i, &rgb)| SampledColor {
                row: i / size,
                col: i % size,
                rgb,
                support: 1,
            })
            .collect()
    }

    #[test]
    fn two_inks_read_back_in_first_appearance_order() {
        let colors = [TEAL, CYAN, TEAL, CYAN, TEAL, CYAN, TEAL, CYAN, CYAN];
        let c = InkClassifier::default()
            .classify(samples(&colors), 3)
            .expect("classify");
        assert_eq!(c.pattern, vec![0, 1, 0, 1, 0, 1, 0, 1, 1]);
        assert_eq!(c.distinct_inks(), 2);
        assert_eq!(c.palette(), vec![TEAL, CYAN]);
        assert!(c.quality.mean_intra_distance < 1e-3);
    }

    #[test]
    fn grid_line_cluster_is_dropped_and_its_cells_reassigned() {
        // One cell sampled on a dark grid line.
        let mut colors = vec![CYAN, BLUE, CYAN, BLUE, CYAN, BLUE, CYAN, BLUE, CYAN];
        colors[4] = [25, 25, 30];
        let c = InkClassifier::default()
            .classify(samples(&colors), 3)
            .expect("classify");
        assert_eq!(c.distinct_inks(), 2);
        assert_eq!(c.pattern.len(), 9);
        assert!(c.pattern[4] <= 1);
        let rejected: Vec<_> = c.clusters.iter().filter(|k| !k.is_ink()).collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].rejection, Some(Rejection::NearBlack));
        assert_eq!(rejected[0].cells, vec![4]);
    }

    #[test]
    fn near_identical_clusters_merge() {
        // Three clusters forced by k=3, two of them 2 units apart.
        let colors = [
            CYAN,
            [0, 231, 253],
            BLUE,
            CYAN,
            [0, 231, 253],
            BLUE,
            CYAN,
            BLUE,
            BLUE,
        ];
        let c = InkClassifier::default()
            .classify(samples(&colors), 3)
            .expect("classify");
        assert_eq!(c.distinct_inks(), 2);
        assert_eq!(c.pattern, vec![0, 0, 1, 0, 0, 1, 0, 1, 1]);
    }

    #[test]
    fn single_ink_is_insufficient_variety() {
        let colors = [CYAN; 9];
        let err = InkClassifier::default()
            .classify(samples(&colors), 3)
            .unwrap_err();
        assert_eq!(
            err,
            ClassifyError::ColorVariety {
                distinct: 1,
                min: 2,
                max: 5
            }
        );
    }

    #[test]
    fn background_only_has_no_ink() {
        let colors = [
            [250, 250, 250],
            [10, 10, 10],
            [128, 128, 128],
            [250, 250, 250],
        ];
        let err = InkClassifier::default()
            .classify(samples(&colors), 2)
            .unwrap_err();
        assert_eq!(err, ClassifyError::NoInkClusters);
    }

    #[test]
    fn loose_clusters_fail_quality_gate() {
        let params = ClassifierParams {
            max_mean_intra_distance: 1.0,
            k: KSelection::Fixed(2),
            ..ClassifierParams::default()
        };
        let colors = [
            CYAN,
            [0, 200, 230],
            TEAL,
            [20, 120, 110],
            BLUE,
            [60, 110, 200],
            CYAN,
            TEAL,
            BLUE,
        ];
        let err = InkClassifier::new(params)
            .classify(samples(&colors), 3)
            .unwrap_err();
        assert!(
            matches!(err, ClassifyError::PoorSeparation { .. }),
            "{err:?}"
        );
    }

    #[test]
    fn auto_k_finds_three_inks() {
        let params = ClassifierParams {
            k: KSelection::Auto { min: 2, max: 5 },
            ..ClassifierParams::default()
        };
        let colors = [CYAN, TEAL, BLUE, TEAL, BLUE, CYAN, BLUE, CYAN, TEAL];
        let c = InkClassifier::new(params)
            .classify(samples(&colors), 3)
            .expect("classify");
        assert_eq!(c.distinct_inks(), 3);
        assert_eq!(c.pattern, vec![0, 1, 2, 1, 2, 0, 2, 0, 1]);
    }

    #[test]
    fn classification_is_reproducible() {
        let colors = [
            CYAN,
            TEAL,
            BLUE,
            [0, 220, 250],
            [5, 145, 140],
            [30, 155, 240],
            CYAN,
            TEAL,
            BLUE,
        ];
        let a = InkClassifier::default()
            .classify(samples(&colors), 3)
            .expect("a");
        let b = InkClassifier::default()
            .classify(samples(&colors), 3)
            .expect("b");
        assert_eq!(a, b);
    }
}

//! Sobel edges, a restricted Hough transform and segment measurement.
//!
//! Only angles near the image axes are voted: the grid strategy discards
//! every segment that is not close to horizontal or vertical, so the other
//! bins would never contribute.

use inkgrid_core::GrayImage;
use nalgebra::Point2;

const NMS_WINDOW_RHO: isize = 2;
const NMS_WINDOW_THETA: isize = 1;

const SOBEL_GX: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_GY: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Binary edge map, row-major.
#[derive(Clone, Debug)]
pub struct EdgeMap {
    pub width: usize,
    pub height: usize,
    data: Vec<bool>,
}

impl EdgeMap {
    #[inline]
    pub fn is_edge(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    /// Edge test with out-of-bounds coordinates reading as "no edge".
    #[inline]
    fn is_edge_i(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.is_edge(x as usize, y as usize)
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&e| e).count()
    }
}

/// Sobel gradient magnitude thresholded at `threshold`. Border pixels are
/// never edges.
pub fn sobel_edges(gray: &GrayImage, threshold: f32) -> EdgeMap {
    let (w, h) = (gray.width, gray.height);
    let mut data = vec![false; w * h];
    let t2 = threshold * threshold;

    for y in 1..h.saturating_sub(1) {
        for x in 1..w.saturating_sub(1) {
            let mut gx = 0i32;
            let mut gy = 0i32;
            for (ky, (row_x, row_y)) in SOBEL_GX.iter().zip(&SOBEL_GY).enumerate() {
                for kx in 0..3 {
                    let v = gray.get(x + kx - 1, y + ky - 1) as i32;
                    gx += v * row_x[kx];
                    gy += v * row_y[kx];
                }
            }
            if (gx * gx + gy * gy) as f32 > t2 {
                data[y * w + x] = true;
            }
        }
    }

    EdgeMap {
        width: w,
        height: h,
        data,
    }
}

/// A line in normal form: `x·cos θ + y·sin θ = ρ`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoughLine {
    pub rho: f32,
    pub theta_deg: f32,
    pub votes: u32,
}

struct Accumulator {
    rho_bins: usize,
    max_rho: f32,
    thetas_deg: Vec<f32>,
    trig: Vec<(f32, f32)>,
    data: Vec<u32>,
}

impl Accumulator {
    fn new(width: usize, height: usize, angle_window_deg: f32) -> Self {
        let max_rho = ((width * width + height * height) as f32).sqrt().ceil();
        let rho_bins = (2.0 * max_rho) as usize + 1;

        let near_axis = |deg: f32| {
            let d = deg.min((deg - 90.0).abs()).min(180.0 - deg);
            d <= angle_window_deg
        };
        let thetas_deg: Vec<f32> = (0..180)
            .map(|d| d as f32)
            .filter(|&d| near_axis(d))
            .collect();
        let trig = thetas_deg
            .iter()
            .map(|d| {
                let r = d.to_radians();
                (r.cos(), r.sin())
            })
            .collect();

        Self {
            rho_bins,
            max_rho,
            data: vec![0; rho_bins * thetas_deg.len()],
            thetas_deg,
            trig,
        }
    }

    #[inline]
    fn rho_index(&self, rho: f32) -> usize {
        ((rho + self.max_rho).round() as isize).clamp(0, self.rho_bins as isize - 1) as usize
    }

    #[inline]
    fn votes(&self, t: usize, r: usize) -> u32 {
        self.data[t * self.rho_bins + r]
    }

    fn vote_all(&mut self, edges: &EdgeMap) {
        for y in 0..edges.height {
            for x in 0..edges.width {
                if !edges.is_edge(x, y) {
                    continue;
                }
                for t in 0..self.trig.len() {
                    let (c, s) = self.trig[t];
                    let r = self.rho_index(x as f32 * c + y as f32 * s);
                    let idx = t * self.rho_bins + r;
                    self.data[idx] = self.data[idx].saturating_add(1);
                }
            }
        }
    }

    /// Non-maximum suppression. Equal neighbours resolve to the lower index.
    fn is_peak(&self, t: usize, r: usize, v: u32) -> bool {
        let nt = self.thetas_deg.len() as isize;
        for dt in -NMS_WINDOW_THETA..=NMS_WINDOW_THETA {
            let tt = t as isize + dt;
            if tt < 0 || tt >= nt {
                continue;
            }
            for dr in -NMS_WINDOW_RHO..=NMS_WINDOW_RHO {
                let rr = r as isize + dr;
                if (dt == 0 && dr == 0) || rr < 0 || rr >= self.rho_bins as isize {
                    continue;
                }
                let other = self.votes(tt as usize, rr as usize);
                let earlier = (tt, rr) < (t as isize, r as isize);
                if other > v || (other == v && earlier) {
                    return false;
                }
            }
        }
        true
    }
}

/// Vote `edges` into a Hough space restricted to angles within
/// `angle_window_deg` of an axis and return the strongest local maxima.
pub fn detect_lines(
    edges: &EdgeMap,
    angle_window_deg: f32,
    vote_threshold: u32,
    max_lines: usize,
) -> Vec<HoughLine> {
    let mut acc = Accumulator::new(edges.width, edges.height, angle_window_deg);
    acc.vote_all(edges);

    let mut peaks = Vec::new();
    for t in 0..acc.thetas_deg.len() {
        for r in 0..acc.rho_bins {
            let v = acc.votes(t, r);
            if v >= vote_threshold.max(1) && acc.is_peak(t, r, v) {
                peaks.push(HoughLine {
                    rho: r as f32 - acc.max_rho,
                    theta_deg: acc.thetas_deg[t],
                    votes: v,
                });
            }
        }
    }

    peaks.sort_by(|a, b| b.votes.cmp(&a.votes));
    peaks.truncate(max_lines);
    peaks
}

/// Supported piece of a Hough line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub p0: Point2<f32>,
    pub p1: Point2<f32>,
}

impl Segment {
    pub fn length(&self) -> f32 {
        (self.p1 - self.p0).norm()
    }

    /// Direction in degrees, `(-180, 180]`.
    pub fn angle_deg(&self) -> f32 {
        let d = self.p1 - self.p0;
        d.y.atan2(d.x).to_degrees()
    }

    pub fn midpoint(&self) -> Point2<f32> {
        Point2::from((self.p0.coords + self.p1.coords) * 0.5)
    }
}

/// Walk `line` across the edge map and return its longest run of edge
/// support, bridging up to `max_gap` missing steps.
pub fn measure_segment(edges: &EdgeMap, line: &HoughLine, max_gap: usize) -> Option<Segment> {
    let r = line.theta_deg.to_radians();
    let (c, s) = (r.cos(), r.sin());
    let horizontal_ish = s.abs() >= c.abs();

    // Step along the dominant axis; probe one pixel either side across it.
    let steps = if horizontal_ish {
        edges.width
    } else {
        edges.height
    };
    let point_at = |i: usize| -> Point2<f32> {
        let u = i as f32;
        if horizontal_ish {
            Point2::new(u, (line.rho - u * c) / s)
        } else {
            Point2::new((line.rho - u * s) / c, u)
        }
    };
    let supported = |p: Point2<f32>| -> bool {
        let (x, y) = (p.x.round() as i64, p.y.round() as i64);
        (-1..=1).any(|d| {
            if horizontal_ish {
                edges.is_edge_i(x, y + d)
            } else {
                edges.is_edge_i(x + d, y)
            }
        })
    };

    let mut best: Option<(usize, usize)> = None;
    let mut run: Option<(usize, usize)> = None;
    let close = |run: (usize, usize), best: &mut Option<(usize, usize)>| {
        if best.map_or(true, |(a, b)| run.1 - run.0 > b - a) {
            *best = Some(run);
        }
    };

    for i in 0..steps {
        if !supported(point_at(i)) {
            continue;
        }
        run = match run {
            Some((start, last)) if i - last <= max_gap + 1 => Some((start, i)),
            Some(done) => {
                close(done, &mut best);
                Some((i, i))
            }
            None => Some((i, i)),
        };
    }
    if let Some(done) = run {
        close(done, &mut best);
    }

    best.filter(|(a, b)| b > a).map(|(a, b)| Segment {
        p0: point_at(a),
        p1: point_at(b),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gray_from_fn(w: usize, h: usize, f: impl Fn(usize, usize) -> u8) -> GrayImage {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        GrayImage {
            width: w,
            height: h,
            data,
        }
    }

    #[test]
    fn sobel_marks_both_sides_of_a_step() {
        let img = gray_from_fn(10, 10, |x, _| if x < 5 { 20 } else { 200 });
        let edges = sobel_edges(&img, 100.0);
        assert!(edges.is_edge(4, 5));
        assert!(edges.is_edge(5, 5));
        assert!(!edges.is_edge(2, 5));
        assert!(!edges.is_edge(0, 5));
    }

    #[test]
    fn horizontal_bar_gives_horizontal_segment() {
        let img = gray_from_fn(120, 80, |_, y| if (40..42).contains(&y) { 30 } else { 180 });
        let edges = sobel_edges(&img, 100.0);
        let lines = detect_lines(&edges, 10.0, 50, 32);
        assert!(!lines.is_empty());

        let best = lines[0];
        assert_abs_diff_eq!(best.theta_deg, 90.0, epsilon = 1.5);
        let seg = measure_segment(&edges, &best, 10).expect("segment");
        assert!(seg.length() > 100.0, "{seg:?}");
        assert!(seg.angle_deg().abs() < 10.0);
        assert_abs_diff_eq!(seg.midpoint().y, 40.5, epsilon = 2.5);
    }

    #[test]
    fn gaps_beyond_tolerance_split_runs() {
        // Vertical dark bar interrupted by a 30 px hole.
        let img = gray_from_fn(60, 200, |x, y| {
            let hole = (60..90).contains(&y);
            if (30..32).contains(&x) && !hole {
                20
            } else {
                200
            }
        });
        let edges = sobel_edges(&img, 100.0);
        let line = HoughLine {
            rho: 30.0,
            theta_deg: 0.0,
            votes: 0,
        };
        let seg = measure_segment(&edges, &line, 10).expect("segment");
        // The longer run is below the hole.
        assert!(seg.p0.y >= 88.0, "{seg:?}");
        assert!(seg.p1.y >= 190.0);

        let bridged = measure_segment(&edges, &line, 40).expect("segment");
        assert!(bridged.p0.y <= 2.0 && bridged.p1.y >= 190.0, "{bridged:?}");
    }

    #[test]
    fn blank_image_has_no_lines() {
        let img = gray_from_fn(50, 50, |_, _| 128);
        let edges = sobel_edges(&img, 100.0);
        assert_eq!(edges.count(), 0);
        assert!(detect_lines(&edges, 10.0, 10, 16).is_empty());
    }
}

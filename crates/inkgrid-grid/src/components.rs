//! Connected-component labelling with per-component statistics.
//!
//! Two-pass union-find over a raster. Pixels carry an optional class id; two
//! neighbours join when both are active and share the class id.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    Four,
    Eight,
}

/// Statistics of one connected component.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Class id shared by every pixel of the component.
    pub class: u32,
    pub area: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    sum_x: f64,
    sum_y: f64,
    /// Extreme points `[top-left, top-right, bottom-right, bottom-left]`,
    /// picked by `min(x+y)`, `max(x-y)`, `max(x+y)`, `min(x-y)`.
    pub extremes: [(usize, usize); 4],
}

impl Component {
    fn seed(class: u32, x: usize, y: usize) -> Self {
        Self {
            class,
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            sum_x: 0.0,
            sum_y: 0.0,
            extremes: [(x, y); 4],
        }
    }

    fn add(&mut self, x: usize, y: usize) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.sum_x += x as f64;
        self.sum_y += y as f64;

        let (xi, yi) = (x as i64, y as i64);
        let key = |(px, py): (usize, usize)| (px as i64, py as i64);
        let [tl, tr, br, bl] = self.extremes.map(key);
        if xi + yi < tl.0 + tl.1 {
            self.extremes[0] = (x, y);
        }
        if xi - yi > tr.0 - tr.1 {
            self.extremes[1] = (x, y);
        }
        if xi + yi > br.0 + br.1 {
            self.extremes[2] = (x, y);
        }
        if xi - yi < bl.0 - bl.1 {
            self.extremes[3] = (x, y);
        }
    }

    #[inline]
    pub fn bbox_width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    #[inline]
    pub fn bbox_height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    pub fn centroid(&self) -> (f32, f32) {
        let n = self.area.max(1) as f64;
        ((self.sum_x / n) as f32, (self.sum_y / n) as f32)
    }
}

struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    fn new() -> Self {
        // Label 0 is reserved for "no component".
        Self { parent: vec![0] }
    }

    fn make(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        while self.parent[x as usize] != root {
            let next = self.parent[x as usize];
            self.parent[x as usize] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) -> u32 {
        let ra = self.find(a);
        let rb = self.find(b);
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[hi as usize] = lo;
        lo
    }
}

/// Label a `width × height` raster. `class(i)` returns the class of pixel `i`
/// (row-major), or `None` for background.
///
/// Components are returned in order of their first pixel in raster order.
pub fn label_components(
    width: usize,
    height: usize,
    connectivity: Connectivity,
    class: impl Fn(usize) -> Option<u32>,
) -> Vec<Component> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let n = width * height;
    let classes: Vec<Option<u32>> = (0..n).map(&class).collect();
    let mut labels = vec![0u32; n];
    let mut sets = DisjointSet::new();

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let Some(c) = classes[i] else {
                continue;
            };

            let mut neighbours = [0u32; 4];
            let mut k = 0;
            let mut push = |j: usize| {
                if classes[j] == Some(c) {
                    neighbours[k] = labels[j];
                    k += 1;
                }
            };
            if x > 0 {
                push(i - 1);
            }
            if y > 0 {
                push(i - width);
                if connectivity == Connectivity::Eight {
                    if x > 0 {
                        push(i - width - 1);
                    }
                    if x + 1 < width {
                        push(i - width + 1);
                    }
                }
            }

            labels[i] = if k == 0 {
                sets.make()
            } else {
                let mut l = neighbours[0];
                for &other in &neighbours[1..k] {
                    l = sets.union(l, other);
                }
                sets.find(l)
            };
        }
    }

    let mut slot_of_root: Vec<Option<usize>> = vec![None; sets.parent.len()];
    let mut comps: Vec<Component> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if labels[i] == 0 {
                continue;
            }
            let root = sets.find(labels[i]) as usize;
            let slot = match slot_of_root[root] {
                Some(s) => s,
                None => {
                    let class = classes[i].unwrap_or_default();
                    comps.push(Component::seed(class, x, y));
                    slot_of_root[root] = Some(comps.len() - 1);
                    comps.len() - 1
                }
            };
            comps[slot].add(x, y);
        }
    }

    comps
}

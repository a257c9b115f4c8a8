//! Contour extraction and centroid tracking on the shadow mask.
//!
//! Only outermost borders are traced: a shadow region sitting inside a hole of
//! another region is ignored, and holes never produce borders of their own.
//! Foreground is 8-connected, background 4-connected. Borders are followed
//! with the Suzuki-Abe tracing step and stored with straight runs compressed
//! to their end points, which leaves the polygon (and so its moments) intact.
//!
//! Per tick, [`ContourTracker::observe`] picks the largest region, computes
//! its centroid from the polygon moments and reports how far the centroid
//! moved since the previous tick. Losing the region drops the baseline so the
//! next detection is a zero-distance anchor rather than a jump.

use crate::types::{BinaryMask, Contour, Point};
use tracing::{debug, trace};

// Neighbor offsets, counterclockwise on screen (y grows downward), starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
const WEST: usize = 4;

/// Raw polygon moments of a contour (Green's theorem over the closed point list).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Orientation-independent: a clockwise border gives the same values as a counterclockwise one.
    pub fn of(contour: &Contour) -> Self {
        let pts = &contour.points;
        let n = pts.len();
        if n < 3 {
            return Self { m00: 0.0, m10: 0.0, m01: 0.0 };
        }
        let (mut a00, mut a10, mut a01) = (0.0f64, 0.0f64, 0.0f64);
        for i in 0..n {
            let p = pts[i];
            let q = pts[(i + 1) % n];
            let (xi, yi, xj, yj) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
            let cross = xi * yj - xj * yi;
            a00 += cross;
            a10 += cross * (xi + xj);
            a01 += cross * (yi + yj);
        }
        let sign = if a00 < 0.0 { -1.0 } else { 1.0 };
        Self {
            m00: sign * a00 / 2.0,
            m10: sign * a10 / 6.0,
            m01: sign * a01 / 6.0,
        }
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00.abs() <= f64::EPSILON {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Enclosed area of the contour polygon.
pub fn contour_area(contour: &Contour) -> f64 {
    Moments::of(contour).m00
}

/// Centroid `(M10/M00, M01/M00)`, or `None` for a zero-area contour.
pub fn compute_centroid(contour: &Contour) -> Option<(f64, f64)> {
    Moments::of(contour).centroid()
}

/// Baseline for displacement. `initialized == false` means the next centroid is an anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackState {
    pub previous_centroid: (f64, f64),
    pub initialized: bool,
}

/// What one mask told the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// First detection after a reset or a loss; contributes no distance.
    Anchored { centroid: (f64, f64) },
    Moved { centroid: (f64, f64), distance: f64 },
    /// No region above the minimum area.
    Lost,
    /// A region passed the area filter but its moments are degenerate.
    Degenerate,
}

impl Observation {
    pub fn distance(&self) -> f64 {
        match self {
            Observation::Moved { distance, .. } => *distance,
            _ => 0.0,
        }
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        match self {
            Observation::Anchored { centroid } | Observation::Moved { centroid, .. } => {
                Some(*centroid)
            }
            _ => None,
        }
    }
}

/// Scratch grids live here so steady-state ticks do not allocate.
#[derive(Default)]
pub struct ContourTracker {
    state: TrackState,
    pad_w: usize,
    pad_h: usize,
    // Padded by one pixel on every side; 1 = shadow.
    grid: Vec<u8>,
    outside: Vec<bool>,
    visited: Vec<bool>,
    stack: Vec<usize>,
}

impl ContourTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Forget the baseline; the next detection anchors.
    pub fn reset(&mut self) {
        self.state = TrackState::default();
    }

    fn prepare(&mut self, mask: &BinaryMask) {
        let pw = mask.width as usize + 2;
        let ph = mask.height as usize + 2;
        if pw != self.pad_w || ph != self.pad_h {
            // Old grids are dropped here, before the new ones are built.
            self.grid = vec![0; pw * ph];
            self.outside = vec![false; pw * ph];
            self.visited = vec![false; pw * ph];
            self.pad_w = pw;
            self.pad_h = ph;
            debug!("contour scratch reallocated to {}x{}", mask.width, mask.height);
        }
        let w = mask.width as usize;
        for (y, row) in mask.data.chunks_exact(w.max(1)).enumerate() {
            let base = (y + 1) * pw + 1;
            for (x, &v) in row.iter().enumerate() {
                self.grid[base + x] = u8::from(v != 0);
            }
        }
        self.outside.fill(false);
        self.visited.fill(false);
    }

    // Background reachable from the padded frame edge (4-connected).
    fn flood_outside(&mut self) {
        let (pw, ph) = (self.pad_w, self.pad_h);
        self.stack.clear();
        self.stack.push(0);
        self.outside[0] = true;
        while let Some(i) = self.stack.pop() {
            let (x, y) = (i % pw, i / pw);
            let neighbors = [
                (x > 0).then(|| i - 1),
                (x + 1 < pw).then(|| i + 1),
                (y > 0).then(|| i - pw),
                (y + 1 < ph).then(|| i + pw),
            ];
            for j in neighbors.into_iter().flatten() {
                if self.grid[j] == 0 && !self.outside[j] {
                    self.outside[j] = true;
                    self.stack.push(j);
                }
            }
        }
    }

    // Mark the whole 8-connected region containing `start`.
    fn mark_region(&mut self, start: usize) {
        let pw = self.pad_w;
        self.stack.clear();
        self.stack.push(start);
        self.visited[start] = true;
        while let Some(i) = self.stack.pop() {
            let (x, y) = ((i % pw) as i32, (i / pw) as i32);
            for (dx, dy) in DIRS {
                // Padding keeps every shadow pixel's neighbors in range.
                let j = ((y + dy) as usize) * pw + (x + dx) as usize;
                if self.grid[j] != 0 && !self.visited[j] {
                    self.visited[j] = true;
                    self.stack.push(j);
                }
            }
        }
    }

    #[inline]
    fn is_shadow(&self, x: i32, y: i32) -> bool {
        self.grid[(y as usize) * self.pad_w + x as usize] != 0
    }

    // Follow the outer border that starts at padded (sx, sy), whose west neighbor is background.
    fn trace_border(&self, sx: i32, sy: i32) -> Vec<Point> {
        let start = Point::new(sx, sy);
        let step = |p: Point, d: usize| Point::new(p.x + DIRS[d].0, p.y + DIRS[d].1);

        // Clockwise from west for the first shadow neighbor.
        let first = (0..8)
            .map(|k| (WEST + 8 - k) % 8)
            .find(|&d| {
                let q = step(start, d);
                self.is_shadow(q.x, q.y)
            });
        let Some(d1) = first else {
            return vec![Point::new(sx - 1, sy - 1)];
        };
        let p1 = step(start, d1);

        let mut points = Vec::new();
        let mut prev = p1;
        let mut cur = start;
        loop {
            let back = DIRS
                .iter()
                .position(|&(dx, dy)| cur.x + dx == prev.x && cur.y + dy == prev.y)
                .unwrap_or(WEST);
            // Counterclockwise, starting just after the pixel we came from.
            let next = (1..=8)
                .map(|k| step(cur, (back + k) % 8))
                .find(|q| self.is_shadow(q.x, q.y))
                .unwrap_or(prev);
            points.push(Point::new(cur.x - 1, cur.y - 1));
            if next == start && cur == p1 {
                break;
            }
            prev = cur;
            cur = next;
        }
        points
    }

    /// Largest outer border whose enclosed area exceeds `min_area`.
    pub fn find_largest_region(&mut self, mask: &BinaryMask, min_area: f64) -> Option<Contour> {
        if mask.width == 0 || mask.height == 0 {
            return None;
        }
        self.prepare(mask);
        self.flood_outside();

        let pw = self.pad_w;
        let mut best: Option<(f64, Contour)> = None;
        let mut found = 0usize;
        for y in 1..self.pad_h - 1 {
            for x in 1..pw - 1 {
                let i = y * pw + x;
                if self.grid[i] == 0 || self.visited[i] || !self.outside[i - 1] {
                    continue;
                }
                let contour = Contour { points: compress_runs(self.trace_border(x as i32, y as i32)) };
                self.mark_region(i);
                found += 1;
                let area = contour_area(&contour);
                if best.as_ref().is_none_or(|(a, _)| area > *a) {
                    best = Some((area, contour));
                }
            }
        }
        trace!(regions = found, "outer borders traced");
        best.filter(|(area, _)| *area > min_area).map(|(_, c)| c)
    }

    /// Run one mask through detection and displacement.
    pub fn observe(&mut self, mask: &BinaryMask, min_area: f64) -> Observation {
        let Some(contour) = self.find_largest_region(mask, min_area) else {
            if self.state.initialized {
                debug!("tracking lost");
            }
            self.state.initialized = false;
            return Observation::Lost;
        };
        let Some(centroid) = compute_centroid(&contour) else {
            self.state.initialized = false;
            return Observation::Degenerate;
        };

        if !self.state.initialized {
            self.state = TrackState { previous_centroid: centroid, initialized: true };
            debug!(x = centroid.0, y = centroid.1, "tracking anchored");
            return Observation::Anchored { centroid };
        }

        let (px, py) = self.state.previous_centroid;
        let distance = ((centroid.0 - px).powi(2) + (centroid.1 - py).powi(2)).sqrt();
        self.state.previous_centroid = centroid;
        Observation::Moved { centroid, distance }
    }

    /// Distance the region's centroid moved this tick (0 on anchor or loss).
    pub fn update(&mut self, mask: &BinaryMask, min_area: f64) -> f64 {
        self.observe(mask, min_area).distance()
    }
}

// Drop points in the middle of straight runs; corners stay.
fn compress_runs(points: Vec<Point>) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points;
    }
    let dir = |a: Point, b: Point| ((b.x - a.x).signum(), (b.y - a.y).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            dir(prev, cur) != dir(cur, next)
        })
        .map(|i| points[i])
        .collect()
}

//! The append-only raw path: move/line/cubic/close verbs plus lazily cached
//! bounds and a monotonic mutation id that render-side caches key on.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::geom::{point, Point, Rect};

static NEXT_MUTATION_ID: AtomicU64 = AtomicU64::new(1);

/// A globally unique, monotonically increasing id bumped every time a path
/// is mutated. Draw caches compare this (plus the draw's transform) to decide
/// whether a previous tessellation is still valid.
fn next_mutation_id() -> u64 {
    NEXT_MUTATION_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Move,
    Line,
    Cubic,
    Close,
}

/// Append-only sequence of path verbs and their associated points.
///
/// Quadratics are never stored: callers must elevate them to cubics before
/// appending. An implicit `Move` to `(0, 0)` is injected the first time a
/// drawing verb is appended to an empty path, and empty segments (a `Line`
/// or `Cubic` whose points are coincident with the current point) are
/// pruned on append rather than filtered out later.
#[derive(Debug, Clone)]
pub struct RawPath {
    verbs: Vec<Verb>,
    points: Vec<Point>,
    mutation_id: u64,
    cached_bounds: Option<Rect>,
    /// Signed area accumulated verb-by-verb; only the sign is meaningful, and
    /// it's coarse (ignores the curvature of cubics, using their chord).
    coarse_signed_area: f64,
    current_point: Point,
    contour_start: Point,
    has_current_point: bool,
}

impl Default for RawPath {
    fn default() -> Self {
        Self::new()
    }
}

impl RawPath {
    pub fn new() -> Self {
        Self {
            verbs: Vec::new(),
            points: Vec::new(),
            mutation_id: next_mutation_id(),
            cached_bounds: None,
            coarse_signed_area: 0.0,
            current_point: point(0.0, 0.0),
            contour_start: point(0.0, 0.0),
            has_current_point: false,
        }
    }

    pub fn mutation_id(&self) -> u64 {
        self.mutation_id
    }

    fn bump_mutation(&mut self) {
        self.mutation_id = next_mutation_id();
        self.cached_bounds = None;
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    fn ensure_move(&mut self) {
        if !self.has_current_point {
            self.move_to(point(0.0, 0.0));
        }
    }

    pub fn move_to(&mut self, p: Point) {
        self.verbs.push(Verb::Move);
        self.points.push(p);
        self.current_point = p;
        self.contour_start = p;
        self.has_current_point = true;
        self.bump_mutation();
    }

    pub fn line_to(&mut self, p: Point) {
        self.ensure_move();
        if points_coincident(self.current_point, p) {
            return;
        }
        self.coarse_signed_area += cross(self.current_point, p);
        self.verbs.push(Verb::Line);
        self.points.push(p);
        self.current_point = p;
        self.bump_mutation();
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.ensure_move();
        if points_coincident(self.current_point, c1)
            && points_coincident(c1, c2)
            && points_coincident(c2, p)
        {
            return;
        }
        self.coarse_signed_area += cross(self.current_point, p);
        self.verbs.push(Verb::Cubic);
        self.points.push(c1);
        self.points.push(c2);
        self.points.push(p);
        self.current_point = p;
        self.bump_mutation();
    }

    pub fn close(&mut self) {
        if !self.has_current_point {
            return;
        }
        if let Some(&Verb::Close) = self.verbs.last() {
            return;
        }
        if !points_coincident(self.current_point, self.contour_start) {
            self.coarse_signed_area += cross(self.current_point, self.contour_start);
        }
        self.verbs.push(Verb::Close);
        self.current_point = self.contour_start;
        self.bump_mutation();
    }

    pub fn reset(&mut self) {
        self.verbs.clear();
        self.points.clear();
        self.coarse_signed_area = 0.0;
        self.current_point = point(0.0, 0.0);
        self.contour_start = point(0.0, 0.0);
        self.has_current_point = false;
        self.bump_mutation();
    }

    /// `true` when the accumulated verb sequence winds clockwise in a
    /// y-down coordinate system. Only the sign of the coarse area is used,
    /// so this is correct even though the area itself ignores curve bulge.
    pub fn is_clockwise(&self) -> bool {
        self.coarse_signed_area < 0.0
    }

    /// Axis-aligned bounds of every on-curve and control point. Computed
    /// lazily and cached until the next mutation.
    pub fn bounds(&mut self) -> Rect {
        if let Some(bounds) = self.cached_bounds {
            return bounds;
        }
        let mut bounds = Rect::EMPTY;
        for &p in &self.points {
            bounds.union_point(p);
        }
        self.cached_bounds = Some(bounds);
        bounds
    }

    /// Iterates `(verb, points)` pairs, where `points` has the verb's full
    /// argument points (e.g. 3 for `Cubic`, 1 for `Move`/`Line`, 0 for `Close`).
    pub fn iter(&self) -> RawPathIter<'_> {
        RawPathIter {
            verbs: &self.verbs,
            points: &self.points,
            verb_idx: 0,
            point_idx: 0,
        }
    }
}

#[inline]
fn points_coincident(a: Point, b: Point) -> bool {
    a.x == b.x && a.y == b.y
}

#[inline]
fn cross(a: Point, b: Point) -> f64 {
    (a.x as f64) * (b.y as f64) - (b.x as f64) * (a.y as f64)
}

pub struct RawPathIter<'a> {
    verbs: &'a [Verb],
    points: &'a [Point],
    verb_idx: usize,
    point_idx: usize,
}

impl<'a> Iterator for RawPathIter<'a> {
    type Item = (Verb, &'a [Point]);

    fn next(&mut self) -> Option<Self::Item> {
        let verb = *self.verbs.get(self.verb_idx)?;
        self.verb_idx += 1;
        let n = match verb {
            Verb::Move | Verb::Line => 1,
            Verb::Cubic => 3,
            Verb::Close => 0,
        };
        let pts = &self.points[self.point_idx..self.point_idx + n];
        self.point_idx += n;
        Some((verb, pts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_has_empty_bounds() {
        let mut p = RawPath::new();
        assert!(p.bounds().is_empty());
    }

    #[test]
    fn mutation_id_changes_on_append_but_not_on_read() {
        let mut p = RawPath::new();
        p.move_to(point(0.0, 0.0));
        let id_after_move = p.mutation_id();
        let _ = p.bounds();
        let _ = p.bounds();
        assert_eq!(p.mutation_id(), id_after_move);
        p.line_to(point(10.0, 10.0));
        assert_ne!(p.mutation_id(), id_after_move);
    }

    #[test]
    fn two_paths_get_distinct_mutation_ids() {
        let a = RawPath::new();
        let b = RawPath::new();
        assert_ne!(a.mutation_id(), b.mutation_id());
    }

    #[test]
    fn implicit_move_is_injected_for_bare_line() {
        let mut p = RawPath::new();
        p.line_to(point(5.0, 5.0));
        assert_eq!(p.verbs(), &[Verb::Move, Verb::Line]);
        assert_eq!(p.points()[0], point(0.0, 0.0));
    }

    #[test]
    fn zero_length_line_is_pruned() {
        let mut p = RawPath::new();
        p.move_to(point(1.0, 1.0));
        p.line_to(point(1.0, 1.0));
        assert_eq!(p.verbs(), &[Verb::Move]);
    }

    #[test]
    fn zero_length_cubic_is_pruned() {
        let mut p = RawPath::new();
        p.move_to(point(1.0, 1.0));
        p.cubic_to(point(1.0, 1.0), point(1.0, 1.0), point(1.0, 1.0));
        assert_eq!(p.verbs(), &[Verb::Move]);
    }

    #[test]
    fn close_is_idempotent() {
        let mut p = RawPath::new();
        p.move_to(point(0.0, 0.0));
        p.line_to(point(1.0, 0.0));
        p.close();
        let id_after_first_close = p.mutation_id();
        p.close();
        assert_eq!(p.mutation_id(), id_after_first_close);
    }

    #[test]
    fn clockwise_square_is_detected() {
        let mut p = RawPath::new();
        p.move_to(point(0.0, 0.0));
        p.line_to(point(10.0, 0.0));
        p.line_to(point(10.0, 10.0));
        p.line_to(point(0.0, 10.0));
        p.close();
        assert!(p.is_clockwise());
    }

    #[test]
    fn counter_clockwise_square_is_detected() {
        let mut p = RawPath::new();
        p.move_to(point(0.0, 0.0));
        p.line_to(point(0.0, 10.0));
        p.line_to(point(10.0, 10.0));
        p.line_to(point(10.0, 0.0));
        p.close();
        assert!(!p.is_clockwise());
    }

    #[test]
    fn reset_clears_state_and_bumps_mutation() {
        let mut p = RawPath::new();
        p.move_to(point(0.0, 0.0));
        p.line_to(point(5.0, 5.0));
        let id_before = p.mutation_id();
        p.reset();
        assert!(p.is_empty());
        assert_ne!(p.mutation_id(), id_before);
    }

    #[test]
    fn iter_yields_correct_point_counts_per_verb() {
        let mut p = RawPath::new();
        p.move_to(point(0.0, 0.0));
        p.cubic_to(point(1.0, 1.0), point(2.0, 1.0), point(3.0, 0.0));
        p.close();
        let collected: Vec<_> = p.iter().collect();
        assert_eq!(collected[0].0, Verb::Move);
        assert_eq!(collected[0].1.len(), 1);
        assert_eq!(collected[1].0, Verb::Cubic);
        assert_eq!(collected[1].1.len(), 3);
        assert_eq!(collected[2].0, Verb::Close);
        assert_eq!(collected[2].1.len(), 0);
    }
}

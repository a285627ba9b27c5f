//! Cubic Bézier evaluation, chopping, and the segment-count heuristics
//! (Wang's formula, polar segment counts) that drive tessellation budgeting.
//!
//! Quadratics never appear here: callers promote them to cubics before
//! reaching this module, matching the raw path's invariant.

use crate::geom::{point, Point, Transform};

/// `2^-10`, the tolerance used throughout chop-parameter comparisons.
pub const EPSILON: f32 = 1.0 / 1024.0;

/// A cubic's four control points.
pub type Cubic = [Point; 4];

#[inline(always)]
fn sub(a: Point, b: Point) -> (f32, f32) {
    (a.x - b.x, a.y - b.y)
}

#[inline(always)]
fn scale(v: (f32, f32), s: f32) -> (f32, f32) {
    (v.0 * s, v.1 * s)
}

#[inline(always)]
fn add(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    (a.0 + b.0, a.1 + b.1)
}

#[inline(always)]
fn add_point(p: Point, v: (f32, f32)) -> Point {
    point(p.x + v.0, p.y + v.1)
}

/// Precomputed power-basis coefficients for a cubic, `C(t) = A*t^3 + B*t^2 + C*t + P0`.
#[derive(Debug, Clone, Copy)]
pub struct EvalCubic {
    p0: Point,
    a: (f32, f32),
    b: (f32, f32),
    c: (f32, f32),
}

impl EvalCubic {
    pub fn new(pts: &Cubic) -> Self {
        let c = scale(sub(pts[1], pts[0]), 3.0);
        let b = add(scale(sub(pts[2], pts[1]), 3.0), scale(c, -1.0));
        let a = add(sub(pts[3], pts[0]), scale(scale(sub(pts[2], pts[1]), 3.0), -1.0));
        Self { p0: pts[0], a, b, c }
    }

    #[inline]
    pub fn eval_at(&self, t: f32) -> Point {
        // p0 + (c + (b + a*t)*t)*t
        let inner = add(self.b, scale(self.a, t));
        let inner = scale(inner, t);
        let inner = add(self.c, inner);
        let inner = scale(inner, t);
        add_point(self.p0, inner)
    }

    /// Evaluates at two parameters at once, returning `[p(t0), p(t1)]`.
    #[inline]
    pub fn eval_at_two(&self, t0: f32, t1: f32) -> [Point; 2] {
        [self.eval_at(t0), self.eval_at(t1)]
    }

    /// The curve's tangent (unnormalized derivative) at `t`.
    #[inline]
    pub fn tangent_at(&self, t: f32) -> Point {
        // c + (2b + 3a*t)*t
        let inner = add(scale(self.b, 2.0), scale(self.a, 3.0 * t));
        let inner = scale(inner, t);
        let tangent = add(self.c, inner);
        point(tangent.0, tangent.1)
    }

    pub fn a(&self) -> Point {
        point(self.a.0, self.a.1)
    }
    pub fn b(&self) -> Point {
        point(self.b.0, self.b.1)
    }
    pub fn c(&self) -> Point {
        point(self.c.0, self.c.1)
    }
}

/// De Casteljau chop of `pts` at `t`, returning the 7 control points of the
/// two resulting sub-cubics (`[0..4)` and `[3..7)`).
///
/// `t == 0.0` produces a degenerate first sub-cubic equal to
/// `(P0,P0,P0,P0..P3)`; `t == 1.0` produces a degenerate last sub-cubic.
pub fn chop_cubic_at(pts: &Cubic, t: f32) -> [Point; 7] {
    let ab = lerp(pts[0], pts[1], t);
    let bc = lerp(pts[1], pts[2], t);
    let cd = lerp(pts[2], pts[3], t);
    let abc = lerp(ab, bc, t);
    let bcd = lerp(bc, cd, t);
    let abcd = lerp(abc, bcd, t);
    [pts[0], ab, abc, abcd, bcd, cd, pts[3]]
}

/// Chops at two ordered parameters `t0 <= t1`, returning the 10 control
/// points of the three resulting sub-cubics.
pub fn chop_cubic_at_two(pts: &Cubic, t0: f32, t1: f32) -> [Point; 10] {
    debug_assert!(t0 <= t1);
    let first = chop_cubic_at(pts, t0);
    // Re-map t1 into the local parameter of the remaining [t0, 1] segment.
    let local_t1 = if t1 >= 1.0 {
        1.0
    } else {
        ((t1 - t0) / (1.0 - t0)).clamp(0.0, 1.0)
    };
    let remaining: Cubic = [first[3], first[4], first[5], first[6]];
    let second = chop_cubic_at(&remaining, local_t1);
    [
        first[0], first[1], first[2], first[3], second[1], second[2], second[3], second[4],
        second[5], second[6],
    ]
}

/// Chops at `n` ordered parameters in `[0, 1]`, returning `3n + 1` points.
/// When `t_values` is `None`, chops at `n` uniform steps instead.
pub fn chop_cubic_at_n(pts: &Cubic, t_values: Option<&[f32]>, n: usize) -> Vec<Point> {
    if n == 0 {
        return pts.to_vec();
    }

    let uniform;
    let t_values: &[f32] = match t_values {
        Some(values) => values,
        None => {
            uniform = (1..=n)
                .map(|i| i as f32 / (n + 1) as f32)
                .collect::<Vec<_>>();
            &uniform
        }
    };
    debug_assert_eq!(t_values.len(), n);

    let mut out = Vec::with_capacity(3 * n + 4);
    let mut remaining: Cubic = *pts;
    let mut prev_t = 0.0f32;
    out.extend_from_slice(&remaining);

    for &t in t_values {
        let local_t = if (1.0 - prev_t).abs() < f32::EPSILON {
            1.0
        } else {
            ((t - prev_t) / (1.0 - prev_t)).clamp(0.0, 1.0)
        };
        let chopped = chop_cubic_at(&remaining, local_t);
        // Replace the last 4 points (the not-yet-chopped tail) with the 7 new ones.
        out.truncate(out.len() - 4);
        out.extend_from_slice(&chopped);
        remaining = [chopped[3], chopped[4], chopped[5], chopped[6]];
        prev_t = t;
    }

    out
}

#[inline]
fn lerp(a: Point, b: Point, t: f32) -> Point {
    point(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Angle between two vectors in `[0, pi]`. Returns 0 when either vector is
/// zero-length or contains NaN.
pub fn angle_between(a: Point, b: Point) -> f32 {
    let dot = a.x * b.x + a.y * b.y;
    let len2 = (a.x * a.x + a.y * a.y) * (b.x * b.x + b.y * b.y);
    if !(len2 > 0.0) {
        return 0.0;
    }
    let cos_theta = (dot / len2.sqrt()).clamp(-1.0, 1.0);
    if cos_theta.is_nan() {
        0.0
    } else {
        cos_theta.acos()
    }
}

/// Result of splitting a cubic into sections that each rotate at most 180
/// degrees and don't inflect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Convex180Chops {
    pub chops: [f32; 2],
    pub count: usize,
    pub are_cusps: bool,
}

/// Finds up to two `t` in `(eps, 1-eps)` that split a cubic into non-inflecting,
/// at-most-180-degree-rotating sections.
///
/// Follows the inflection quadratic `a*T^2 + b*T + c = A x B * T^2 + A x C * T + B x C`
/// where `A, B, C` are the cubic's power-basis coefficients and `x` is the 2D cross product.
pub fn convex_180_chops(pts: &Cubic) -> Convex180Chops {
    const CUSP_THRESHOLD: f32 = 1e-4;

    let eval = EvalCubic::new(pts);
    let (a_vec, b_vec, c_vec) = (eval.a(), eval.b(), eval.c());

    let cross = |u: Point, v: Point| u.x * v.y - u.y * v.x;
    let a = cross(a_vec, b_vec);
    let b = cross(a_vec, c_vec);
    let c = cross(b_vec, c_vec);

    let discriminant = b * b - 4.0 * a * c;

    let mut result = Convex180Chops::default();

    if discriminant < -CUSP_THRESHOLD {
        // No inflection: the curve may still rotate more than 180 degrees.
        // Chop where the tangent direction is parallel to the starting tangent.
        if a.abs() > f32::EPSILON {
            let t = -b / (2.0 * a);
            push_chop(&mut result, t);
        }
        return result;
    }

    if discriminant.abs() <= CUSP_THRESHOLD {
        // Cusp (or a degenerate flat line).
        if a.abs() > f32::EPSILON || b.abs() > f32::EPSILON || c.abs() > f32::EPSILON {
            let t = -b / (2.0 * a);
            push_chop(&mut result, t);
        } else {
            // Flat: either an ordered line (no chop needed) or points out of
            // order, which needs a chop at the tangent-perpendicular root.
            let tan0 = eval.tangent_at(0.0);
            let (cx, cy) = sub(pts[3], pts[0]);
            let chord = point(cx, cy);
            if is_ordered_line(tan0, chord) {
                // 0 chops.
            } else if let Some(t) = tangent_perpendicular_root(&eval, tan0) {
                push_chop(&mut result, t);
            }
        }
        return result;
    }

    // Two real inflections.
    let sqrt_disc = discriminant.sqrt();
    let t0 = (-b - sqrt_disc) / (2.0 * a);
    let t1 = (-b + sqrt_disc) / (2.0 * a);
    let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };

    result.are_cusps = (t1 - t0).abs() <= EPSILON;

    push_chop(&mut result, t0);
    push_chop(&mut result, t1);
    result
}

fn push_chop(result: &mut Convex180Chops, t: f32) {
    if t.is_finite() && t > EPSILON && t < 1.0 - EPSILON && result.count < 2 {
        result.chops[result.count] = t;
        result.count += 1;
    }
}

fn is_ordered_line(tan0: Point, chord: Point) -> bool {
    // The points lie on a line traversed monotonically if the tangent and
    // chord point in the same direction.
    tan0.x * chord.x + tan0.y * chord.y >= 0.0
}

fn tangent_perpendicular_root(eval: &EvalCubic, tan0: Point) -> Option<f32> {
    // Solve tan0 . tangent(t) = 0 for t, where tangent(t) is the quadratic
    // derivative `c + (2b + 3a*t)*t`. This is itself quadratic in t.
    let a2 = tan0.x * eval.a().x * 3.0 + tan0.y * eval.a().y * 3.0;
    let b2 = tan0.x * eval.b().x * 2.0 + tan0.y * eval.b().y * 2.0;
    let c2 = tan0.x * eval.c().x + tan0.y * eval.c().y;

    if a2.abs() < f32::EPSILON {
        if b2.abs() < f32::EPSILON {
            return None;
        }
        return Some(-c2 / b2);
    }

    let disc = b2 * b2 - 4.0 * a2 * c2;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = (-b2 - sqrt_disc) / (2.0 * a2);
    let t1 = (-b2 + sqrt_disc) / (2.0 * a2);
    // Prefer whichever root lands in range.
    for t in [t0, t1] {
        if (EPSILON..=1.0 - EPSILON).contains(&t) {
            return Some(t);
        }
    }
    None
}

/// Iteratively chops a cubic into sections that each rotate at most 90
/// degrees, used to prepare a curve for feather-softening. Around a cusp,
/// pads the split by `cusp_padding` so that odd-numbered sub-cubics straddle
/// the cusp and can later be replaced by a pivot point.
pub fn convex_90_chops(pts: &Cubic, cusp_padding: f32) -> Vec<Cubic> {
    let c180 = convex_180_chops(pts);

    let segments: Vec<Cubic> = if c180.count == 0 {
        vec![*pts]
    } else if c180.are_cusps {
        let mid = (c180.chops[0] + c180.chops[1]) / 2.0;
        let pad = cusp_padding.max(0.0).min(mid - EPSILON).max(0.0);
        let lo = (mid - pad).max(EPSILON);
        let hi = (mid + pad).min(1.0 - EPSILON);
        let chopped = chop_cubic_at_two(pts, lo, hi);
        vec![
            [chopped[0], chopped[1], chopped[2], chopped[3]],
            [chopped[3], chopped[4], chopped[5], chopped[6]],
            [chopped[6], chopped[7], chopped[8], chopped[9]],
        ]
    } else {
        let chopped = chop_cubic_at_n(pts, Some(&c180.chops[..c180.count]), c180.count);
        let mut segs = Vec::new();
        let mut base = 0;
        while base + 3 < chopped.len() {
            segs.push([
                chopped[base],
                chopped[base + 1],
                chopped[base + 2],
                chopped[base + 3],
            ]);
            base += 3;
        }
        segs
    };

    // Each section may still rotate more than 90 degrees; recursively halve
    // until every section is within budget.
    let mut out = Vec::with_capacity(segments.len() * 2);
    for seg in segments {
        split_to_90(seg, &mut out, 6);
    }
    out
}

fn rotation_of(pts: &Cubic) -> f32 {
    let eval = EvalCubic::new(pts);
    angle_between(eval.tangent_at(0.0), eval.tangent_at(1.0))
}

fn split_to_90(seg: Cubic, out: &mut Vec<Cubic>, depth_budget: u32) {
    if depth_budget == 0 || rotation_of(&seg) <= std::f32::consts::FRAC_PI_2 + EPSILON {
        out.push(seg);
        return;
    }
    let chopped = chop_cubic_at(&seg, 0.5);
    split_to_90(
        [chopped[0], chopped[1], chopped[2], chopped[3]],
        out,
        depth_budget - 1,
    );
    split_to_90(
        [chopped[3], chopped[4], chopped[5], chopped[6]],
        out,
        depth_budget - 1,
    );
}

/// Returns the maximum perpendicular distance from the chord `P0->P3` and the
/// `t` at which it occurs, found by ternary search over the (unimodal for
/// convex arcs) height function.
pub fn curve_max_height(pts: &Cubic) -> (f32, f32) {
    let (cx, cy) = sub(pts[3], pts[0]);
    let chord_len = (cx * cx + cy * cy).sqrt();
    let eval = EvalCubic::new(pts);

    if chord_len < f32::EPSILON {
        // Degenerate chord: fall back to distance from P0.
        let mut best_h = 0.0f32;
        let mut best_t = 0.0f32;
        for i in 0..=64 {
            let t = i as f32 / 64.0;
            let p = eval.eval_at(t);
            let h = ((p.x - pts[0].x).powi(2) + (p.y - pts[0].y).powi(2)).sqrt();
            if h > best_h {
                best_h = h;
                best_t = t;
            }
        }
        return (best_h, best_t);
    }

    let nx = -cy / chord_len;
    let ny = cx / chord_len;
    let height_at = |t: f32| -> f32 {
        let p = eval.eval_at(t);
        ((p.x - pts[0].x) * nx + (p.y - pts[0].y) * ny).abs()
    };

    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    for _ in 0..40 {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if height_at(m1) < height_at(m2) {
            lo = m1;
        } else {
            hi = m2;
        }
    }
    let t = (lo + hi) / 2.0;
    (height_at(t), t)
}

/// Finds a symmetric `dt` around `t` such that the chord length of the
/// sub-cubic `[t-dt, t+dt]` approaches `spread`, then returns the rotation of
/// that sub-cubic. Used to measure local curvature for feather-softening.
pub fn curvature_at(pts: &Cubic, t: f32, spread: f32) -> f32 {
    let eval = EvalCubic::new(pts);
    if !(spread.is_finite() && spread > 0.0) {
        return 0.0;
    }

    let mut dt = 0.1f32;
    for _ in 0..16 {
        let t0 = (t - dt).max(0.0);
        let t1 = (t + dt).min(1.0);
        let p0 = eval.eval_at(t0);
        let p1 = eval.eval_at(t1);
        let chord = ((p1.x - p0.x).powi(2) + (p1.y - p0.y).powi(2)).sqrt();
        if chord < f32::EPSILON {
            break;
        }
        let ratio = spread / chord;
        dt = (dt * ratio).clamp(1e-5, 0.5);
        if (chord - spread).abs() < spread * 1e-3 {
            break;
        }
    }

    let t0 = (t - dt).max(0.0);
    let t1 = (t + dt).min(1.0);
    angle_between(eval.tangent_at(t0), eval.tangent_at(t1))
}

/// Raw (non-rounded) Wang's-formula segment-count term for a cubic, raised to
/// the 4th power so callers can batch the eventual `sqrt`/`sqrt` into a single
/// SIMD pass. `precision` is the inverse of the desired tolerance in pixels.
///
/// `xform` maps the difference vectors into device space (e.g. the 2x2 of the
/// drawing matrix) before measuring length, so segment counts reflect the
/// space the curve is actually rasterized in.
pub fn wangs_formula_cubic_pow4(pts: &Cubic, precision: f32, xform: Option<&Transform>) -> f32 {
    // d0 = p0 - 2*p1 + p2, d1 = p1 - 2*p2 + p3
    let d0 = add(sub(pts[0], pts[1]), sub(pts[2], pts[1]));
    let d1 = add(sub(pts[1], pts[2]), sub(pts[3], pts[2]));

    let (d0x, d0y) = match xform {
        Some(m) => m.map_vector(d0.0, d0.1),
        None => d0,
    };
    let (d1x, d1y) = match xform {
        Some(m) => m.map_vector(d1.0, d1.1),
        None => d1,
    };

    let len2_0 = d0x * d0x + d0y * d0y;
    let len2_1 = d1x * d1x + d1y * d1y;
    let max_len2 = len2_0.max(len2_1);

    // k = (3 * 2 / 8) * precision = 0.75 * precision; N^4 = max_len2^2 * k^2
    let k = 0.75 * precision;
    max_len2 * max_len2 * k * k
}

/// Number of evenly-spaced line segments needed to approximate the cubic to
/// within `1/precision` pixels.
pub fn wangs_formula_cubic(pts: &Cubic, precision: f32, xform: Option<&Transform>) -> f32 {
    wangs_formula_cubic_pow4(pts, precision, xform).powf(0.25)
}

/// Integer segment count: `ceil(log2(wangs_formula_cubic(..)))`, clamped to
/// be at least 0. Matches the vectorized `cubic_log2` used by the pre-pass
/// that batches many curves' segment counts together.
pub fn cubic_log2(pts: &Cubic, precision: f32, xform: Option<&Transform>) -> u32 {
    let n = wangs_formula_cubic(pts, precision, xform);
    if n <= 1.0 {
        0
    } else {
        n.log2().ceil() as u32
    }
}

/// Integer segment count (not log2): `ceil(wangs_formula_cubic(..))`, at
/// least 1.
pub fn cubic_segment_count(pts: &Cubic, precision: f32, xform: Option<&Transform>) -> u32 {
    wangs_formula_cubic(pts, precision, xform).ceil().max(1.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic_line(p0: Point, p3: Point) -> Cubic {
        let c1 = lerp(p0, p3, 1.0 / 3.0);
        let c2 = lerp(p0, p3, 2.0 / 3.0);
        [p0, c1, c2, p3]
    }

    #[test]
    fn chop_at_zero_is_degenerate_first() {
        let pts: Cubic = [
            point(0.0, 0.0),
            point(1.0, 1.0),
            point(2.0, 1.0),
            point(3.0, 0.0),
        ];
        let chopped = chop_cubic_at(&pts, 0.0);
        for p in &chopped[..4] {
            assert_eq!(*p, pts[0]);
        }
        assert_eq!(chopped[3], pts[0]);
    }

    #[test]
    fn chop_at_one_is_degenerate_last() {
        let pts: Cubic = [
            point(0.0, 0.0),
            point(1.0, 1.0),
            point(2.0, 1.0),
            point(3.0, 0.0),
        ];
        let chopped = chop_cubic_at(&pts, 1.0);
        for p in &chopped[3..] {
            assert_eq!(*p, pts[3]);
        }
    }

    #[test]
    fn chop_round_trip_matches_original_eval() {
        let pts: Cubic = [
            point(0.0, 0.0),
            point(10.0, 30.0),
            point(40.0, -10.0),
            point(50.0, 20.0),
        ];
        let eval = EvalCubic::new(&pts);
        let t_values = [0.2f32, 0.5, 0.8];
        let chopped = chop_cubic_at_n(&pts, Some(&t_values), t_values.len());

        // Sample the joined sub-cubics at their natural endpoints and compare
        // against the original curve evaluated at the same global t.
        let mut offset = 0usize;
        let mut prev_t = 0.0f32;
        for &t in &t_values {
            let sub: Cubic = [
                chopped[offset],
                chopped[offset + 1],
                chopped[offset + 2],
                chopped[offset + 3],
            ];
            let sub_eval = EvalCubic::new(&sub);
            let global_mid = (prev_t + t) / 2.0;
            let local_mid = if (t - prev_t).abs() < f32::EPSILON {
                0.0
            } else {
                0.5
            };
            let expected = eval.eval_at(global_mid);
            let actual = sub_eval.eval_at(local_mid);
            assert!((expected.x - actual.x).abs() < 1e-3);
            assert!((expected.y - actual.y).abs() < 1e-3);
            offset += 3;
            prev_t = t;
        }
    }

    #[test]
    fn middle_subcubic_of_two_equal_chops_is_degenerate() {
        let pts: Cubic = [
            point(0.0, 0.0),
            point(10.0, 30.0),
            point(40.0, -10.0),
            point(50.0, 20.0),
        ];
        let chopped = chop_cubic_at_two(&pts, 0.4, 0.4);
        // Points 3..7 (indices 3,4,5,6) form the degenerate middle sub-cubic.
        let p = chopped[3];
        assert!((chopped[4].x - p.x).abs() < 1e-4 && (chopped[4].y - p.y).abs() < 1e-4);
        assert!((chopped[5].x - p.x).abs() < 1e-4 && (chopped[5].y - p.y).abs() < 1e-4);
        assert!((chopped[6].x - p.x).abs() < 1e-4 && (chopped[6].y - p.y).abs() < 1e-4);
    }

    #[test]
    fn angle_between_zero_vector_is_zero() {
        assert_eq!(angle_between(point(0.0, 0.0), point(1.0, 0.0)), 0.0);
    }

    #[test]
    fn angle_between_opposite_vectors_is_pi() {
        let a = angle_between(point(1.0, 0.0), point(-1.0, 0.0));
        assert!((a - std::f32::consts::PI).abs() < 1e-4);
    }

    #[test]
    fn ordered_flat_line_has_no_chops() {
        let pts = cubic_line(point(0.0, 0.0), point(10.0, 10.0));
        let chops = convex_180_chops(&pts);
        assert_eq!(chops.count, 0);
    }

    #[test]
    fn s_curve_has_two_inflection_chops() {
        // A classic S-shaped cubic with two inflection points.
        let pts: Cubic = [
            point(0.0, 0.0),
            point(10.0, 10.0),
            point(0.0, 10.0),
            point(10.0, 0.0),
        ];
        let chops = convex_180_chops(&pts);
        assert!(chops.count <= 2);
        for i in 0..chops.count {
            assert!(chops.chops[i] > EPSILON && chops.chops[i] < 1.0 - EPSILON);
        }
    }

    #[test]
    fn wangs_formula_is_transform_invariant() {
        let pts: Cubic = [
            point(0.0, 0.0),
            point(10.0, 40.0),
            point(30.0, -20.0),
            point(40.0, 10.0),
        ];
        let m = Transform {
            a: 2.0,
            b: 0.5,
            c: -0.3,
            d: 1.5,
            tx: 100.0,
            ty: -50.0,
        };

        let lhs = cubic_log2(&pts, 4.0, Some(&m));

        let mapped: Cubic = [
            m.map_point(pts[0]),
            m.map_point(pts[1]),
            m.map_point(pts[2]),
            m.map_point(pts[3]),
        ];
        let rhs = cubic_log2(&mapped, 4.0, None);

        assert_eq!(lhs, rhs);
    }

    #[test]
    fn wangs_formula_tightness_for_flat_curve() {
        // A flat cubic (control points along the chord) needs exactly 1 segment.
        let pts = cubic_line(point(0.0, 0.0), point(100.0, 0.0));
        let n = cubic_segment_count(&pts, 4.0, None);
        assert_eq!(n, 1);
    }

    #[test]
    fn curve_max_height_for_symmetric_arc() {
        let pts: Cubic = [
            point(0.0, 0.0),
            point(0.0, 10.0),
            point(10.0, 10.0),
            point(10.0, 0.0),
        ];
        let (height, t) = curve_max_height(&pts);
        assert!(height > 0.0);
        assert!((t - 0.5).abs() < 0.1);
    }
}

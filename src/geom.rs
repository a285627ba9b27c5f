//! Core geometric primitives shared across the pipeline: points, axis-aligned
//! rectangles, and the 2x3 affine transform used to map paths into device space.

use lyon::geom::euclid::Point2D as EuclidPoint2D;

/// A point in single precision, used for both logical and device-space coordinates.
pub type Point = EuclidPoint2D<f32, lyon::geom::euclid::UnknownUnit>;

#[inline(always)]
pub fn point(x: f32, y: f32) -> Point {
    Point::new(x, y)
}

/// An axis-aligned rectangle with integer bounds (pixel-space render-target bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IRect {
    pub const ZERO: Self = Self {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    /// Intersection of two rectangles; empty (all zero) if they don't overlap.
    pub fn intersect(&self, other: &IRect) -> IRect {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        let r = IRect::new(left, top, right, bottom);
        if r.is_empty() {
            IRect::ZERO
        } else {
            r
        }
    }

    /// Smallest rectangle containing both `self` and `other`. Treats an empty
    /// operand as the identity for this operation.
    pub fn union(&self, other: &IRect) -> IRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IRect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }
}

/// An axis-aligned rectangle in floating point. "Empty" iff `left >= right`,
/// `top >= bottom`, or any component is NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for Rect {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Rect {
    /// A canonically empty rect, used as the identity for bounds accumulation.
    pub const EMPTY: Self = Self {
        left: f32::INFINITY,
        top: f32::INFINITY,
        right: f32::NEG_INFINITY,
        bottom: f32::NEG_INFINITY,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.left < self.right) || !(self.top < self.bottom)
    }

    pub fn union_point(&mut self, p: Point) {
        self.left = self.left.min(p.x);
        self.top = self.top.min(p.y);
        self.right = self.right.max(p.x);
        self.bottom = self.bottom.max(p.y);
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    /// Rounds out to the smallest enclosing integer rectangle.
    pub fn round_out(&self) -> IRect {
        if self.is_empty() {
            return IRect::ZERO;
        }
        IRect::new(
            self.left.floor() as i32,
            self.top.floor() as i32,
            self.right.ceil() as i32,
            self.bottom.ceil() as i32,
        )
    }
}

/// A 2x3 affine transform: `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    /// The 2x2 linear part, ignoring translation. Two transforms that differ
    /// only in translation share this key, which is what per-paint draw
    /// caches hash on.
    pub fn linear_part(&self) -> (f32, f32, f32, f32) {
        (self.a, self.b, self.c, self.d)
    }

    pub fn map_point(&self, p: Point) -> Point {
        point(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    pub fn map_vector(&self, dx: f32, dy: f32) -> (f32, f32) {
        (self.a * dx + self.c * dy, self.b * dx + self.d * dy)
    }

    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// `true` when the transform flips handedness (mirrors), which a
    /// clockwise-fill path must account for when deciding contour direction.
    pub fn is_left_handed(&self) -> bool {
        self.determinant() < 0.0
    }

    pub fn then_translate(&self, tx: f32, ty: f32) -> Self {
        Self {
            tx: self.tx + tx,
            ty: self.ty + ty,
            ..*self
        }
    }

    pub fn then(&self, other: &Transform) -> Self {
        Self {
            a: other.a * self.a + other.c * self.b,
            b: other.b * self.a + other.d * self.b,
            c: other.a * self.c + other.c * self.d,
            d: other.b * self.c + other.d * self.d,
            tx: other.a * self.tx + other.c * self.ty + other.tx,
            ty: other.b * self.tx + other.d * self.ty + other.ty,
        }
    }

    /// The larger singular value of the 2x2 linear part: the maximum amount
    /// any vector can be stretched by this transform. Used to scale feather
    /// radii and stroke widths from local to device space.
    pub fn find_max_scale(&self) -> f32 {
        // Singular values of [[a, c], [b, d]] via the eigenvalues of M^T*M.
        let (a, b, c, d) = (self.a, self.b, self.c, self.d);
        let s00 = a * a + b * b;
        let s01 = a * c + b * d;
        let s11 = c * c + d * d;
        let trace = s00 + s11;
        let det = s00 * s11 - s01 * s01;
        let disc = ((trace * trace) / 4.0 - det).max(0.0).sqrt();
        let max_eigenvalue = (trace / 2.0 + disc).max(0.0);
        max_eigenvalue.sqrt()
    }

    /// Maps an axis-aligned bounding box through this transform and returns
    /// the tight AABB of the four mapped corners.
    pub fn map_bounding_box(&self, r: &Rect) -> Rect {
        if r.is_empty() {
            return Rect::EMPTY;
        }
        let corners = [
            point(r.left, r.top),
            point(r.right, r.top),
            point(r.right, r.bottom),
            point(r.left, r.bottom),
        ];
        let mut out = Rect::EMPTY;
        for c in corners {
            out.union_point(self.map_point(c));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_max_scale_is_one() {
        assert!((Transform::IDENTITY.find_max_scale() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniform_scale_max_scale() {
        let t = Transform {
            a: 2.0,
            b: 0.0,
            c: 0.0,
            d: 2.0,
            tx: 0.0,
            ty: 0.0,
        };
        assert!((t.find_max_scale() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn map_bounding_box_is_tight_for_rotation() {
        // 90 degree rotation: (a,b,c,d) = (0,1,-1,0)
        let t = Transform {
            a: 0.0,
            b: 1.0,
            c: -1.0,
            d: 0.0,
            tx: 0.0,
            ty: 0.0,
        };
        let r = Rect::new(0.0, 0.0, 2.0, 1.0);
        let mapped = t.map_bounding_box(&r);
        assert!((mapped.left - (-1.0)).abs() < 1e-5);
        assert!((mapped.right - 0.0).abs() < 1e-5);
        assert!((mapped.top - 0.0).abs() < 1e-5);
        assert!((mapped.bottom - 2.0).abs() < 1e-5);
    }

    #[test]
    fn left_handed_detection() {
        let flipped = Transform {
            a: -2.0,
            b: 0.0,
            c: 0.0,
            d: 2.0,
            tx: 0.0,
            ty: 0.0,
        };
        assert!(flipped.is_left_handed());
        assert!(!Transform::IDENTITY.is_left_handed());
    }
}

//! Paint: the style attached to a drawn path. Bundles fill/stroke geometry
//! parameters, blending, and the feather (blur) radius that softens edges.
//!
//! # Examples
//!
//! ```
//! use pathforge::{Color, Paint, Stroke};
//! use pathforge::paint::{Join, Cap};
//!
//! let fill = Paint::fill(Color::rgb(255, 0, 0));
//! assert!(fill.stroke().is_none());
//!
//! let outline = Paint::stroked(Stroke::new(2.0, Color::BLACK), Join::Round, Cap::Round);
//! assert!(outline.stroke().is_some());
//! ```

use crate::color::Color;

/// Which regions of a self-intersecting or multi-contour path count as
/// "inside" for filling purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// How two stroked segments are connected at a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Join {
    #[default]
    Miter,
    Bevel,
    Round,
}

/// How an open contour's stroked endpoints are finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cap {
    #[default]
    Butt,
    Square,
    Round,
}

/// Porter-Duff and separable/non-separable blend modes, mirroring the set a
/// compositor backend is expected to implement in its fragment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    SrcOver,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Multiply,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// The stroke properties of a shape: width and the two join/cap choices that
/// affect the stroker's vertex budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Color,
    pub join: Join,
    pub cap: Cap,
}

impl Stroke {
    #[inline]
    pub fn new(width: impl Into<f32>, color: impl Into<Color>) -> Self {
        Self {
            width: width.into(),
            color: color.into(),
            join: Join::default(),
            cap: Cap::default(),
        }
    }

    #[inline]
    pub fn with_join(mut self, join: Join) -> Self {
        self.join = join;
        self
    }

    #[inline]
    pub fn with_cap(mut self, cap: Cap) -> Self {
        self.cap = cap;
        self
    }

    /// A stroke is empty if it has no width or is fully transparent; neither
    /// contributes geometry to the path draw builder.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.color == Color::TRANSPARENT
    }
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            width: 0.0,
            color: Color::TRANSPARENT,
            join: Join::default(),
            cap: Cap::default(),
        }
    }
}

/// A paint's fill attributes: color and the rule used to resolve
/// self-intersections.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Fill {
    pub color: Color,
    pub rule: FillRule,
}

/// The complete visual style applied to a drawn or clipped path: an optional
/// fill, an optional stroke, blend mode, and feather radius.
///
/// A paint with neither fill nor stroke contributes no geometry and is
/// skipped by the draw builder rather than emitting empty draws.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    fill: Option<Fill>,
    stroke: Option<Stroke>,
    blend_mode: BlendMode,
    /// Gaussian-ish feather radius in local units, or 0 for a hard edge.
    feather: f32,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fill: Some(Fill {
                color: Color::BLACK,
                rule: FillRule::default(),
            }),
            stroke: None,
            blend_mode: BlendMode::default(),
            feather: 0.0,
        }
    }
}

impl Paint {
    pub fn fill(color: impl Into<Color>) -> Self {
        Self {
            fill: Some(Fill {
                color: color.into(),
                rule: FillRule::default(),
            }),
            ..Self::default_empty()
        }
    }

    pub fn fill_with_rule(color: impl Into<Color>, rule: FillRule) -> Self {
        Self {
            fill: Some(Fill {
                color: color.into(),
                rule,
            }),
            ..Self::default_empty()
        }
    }

    pub fn stroked(stroke: Stroke, join: Join, cap: Cap) -> Self {
        Self {
            fill: None,
            stroke: Some(Stroke {
                join,
                cap,
                ..stroke
            }),
            ..Self::default_empty()
        }
    }

    fn default_empty() -> Self {
        Self {
            fill: None,
            stroke: None,
            blend_mode: BlendMode::default(),
            feather: 0.0,
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_feather(mut self, feather: f32) -> Self {
        self.feather = feather.max(0.0);
        self
    }

    pub fn fill_style(&self) -> Option<&Fill> {
        self.fill.as_ref()
    }

    pub fn stroke(&self) -> Option<&Stroke> {
        self.stroke.as_ref()
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn feather(&self) -> f32 {
        self.feather
    }

    pub fn is_feathered(&self) -> bool {
        self.feather > 0.0
    }

    /// `true` when this paint has neither fill nor (non-empty) stroke and so
    /// contributes no geometry.
    pub fn is_empty(&self) -> bool {
        self.fill.is_none() && self.stroke.as_ref().map(Stroke::is_empty).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paint_is_opaque_black_fill() {
        let p = Paint::default();
        assert!(!p.is_empty());
        assert_eq!(p.fill_style().unwrap().color, Color::BLACK);
    }

    #[test]
    fn empty_stroke_makes_stroke_only_paint_empty() {
        let p = Paint::stroked(Stroke::default(), Join::Miter, Cap::Butt);
        assert!(p.is_empty());
    }

    #[test]
    fn feather_is_clamped_to_non_negative() {
        let p = Paint::fill(Color::BLACK).with_feather(-5.0);
        assert_eq!(p.feather(), 0.0);
        assert!(!p.is_feathered());
    }

    #[test]
    fn fill_and_stroke_are_independent() {
        let stroke = Stroke::new(2.0, Color::rgb(0, 0, 0));
        let p = Paint::stroked(stroke, Join::Round, Cap::Round);
        assert!(p.fill_style().is_none());
        assert!(p.stroke().is_some());
        assert_eq!(p.stroke().unwrap().join, Join::Round);
    }
}

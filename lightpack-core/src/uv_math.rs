//! UV and pixel math
//!
//! Pure helpers shared by surface preparation and the compositor:
//! - power-of-two rounding for page sizes
//! - repeat-wrap normalization of lightmap UVs that leave [0, 1]
//! - affine scale/offset derivation between two UV rectangles

use glam::Vec2;

/// Distance from 0 or 1 under which a UV component snaps to the endpoint
pub const UV_SNAP_EPSILON: f32 = 1e-6;

// ============================================================================
// Rounding
// ============================================================================

/// Smallest power of two greater than or equal to `x`
///
/// Values of 0 round up to 1.
#[inline]
pub fn ceil_power_of_two(x: u32) -> u32 {
    x.max(1).next_power_of_two()
}

/// Loose float comparison used for UV bounds
///
/// Relative tolerance of 1e-6 with an absolute floor of a few ULPs around zero.
#[inline]
pub fn approximately(a: f32, b: f32) -> bool {
    (b - a).abs() < (UV_SNAP_EPSILON * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}

// ============================================================================
// Repeat-wrap
// ============================================================================

#[inline]
fn snap_endpoints(value: f32) -> f32 {
    if value.abs() < UV_SNAP_EPSILON {
        0.0
    } else if (1.0 - value).abs() < UV_SNAP_EPSILON {
        1.0
    } else {
        value
    }
}

/// Normalize a UV component the way repeat sampling would see it
///
/// Components within 1e-6 of 0 or 1 snap to the endpoint. Anything outside
/// [0, 1] is wrapped with `v mod 1` (shifted into the positive range).
/// The result always lies in [0, 1] and the function is idempotent.
#[inline]
pub fn clamp_repeat_uv(value: f32) -> f32 {
    clamp_repeat_uv_tracked(value).0
}

/// Like [`clamp_repeat_uv`], also reporting whether wrapping changed the value
///
/// Endpoint snapping alone is not reported as a modification.
pub fn clamp_repeat_uv_tracked(value: f32) -> (f32, bool) {
    let value = snap_endpoints(value);
    if (0.0..=1.0).contains(&value) {
        return (value, false);
    }
    let mut wrapped = value % 1.0;
    if wrapped < 0.0 {
        wrapped += 1.0;
    }
    // Wrapping can land a hair below 1.0 (or exactly on it), snap again
    let wrapped = snap_endpoints(wrapped);
    (wrapped, wrapped != value)
}

// ============================================================================
// Rectangles and transforms
// ============================================================================

/// Axis-aligned rectangle in UV space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UvRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl UvRect {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Build from `[min_x, min_y, max_x, max_y]`
    pub fn from_array(a: [f32; 4]) -> Self {
        Self {
            min: Vec2::new(a[0], a[1]),
            max: Vec2::new(a[2], a[3]),
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    /// Bounding box of a point set, or all zeros for an empty set
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        if any { Self { min, max } } else { Self::default() }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// True when min and max are approximately equal on either axis
    pub fn is_degenerate(&self) -> bool {
        approximately(self.min.x, self.max.x) || approximately(self.min.y, self.max.y)
    }

    /// Swap min/max per axis where the box is inverted
    pub fn normalized(self) -> Self {
        Self {
            min: self.min.min(self.max),
            max: self.min.max(self.max),
        }
    }

    /// Apply [`clamp_repeat_uv`] to all four components
    pub fn repeat_wrapped(self) -> Self {
        Self {
            min: Vec2::new(clamp_repeat_uv(self.min.x), clamp_repeat_uv(self.min.y)),
            max: Vec2::new(clamp_repeat_uv(self.max.x), clamp_repeat_uv(self.max.y)),
        }
    }
}

/// Per-axis affine transform `uv * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleOffset {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl Default for ScaleOffset {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ScaleOffset {
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    pub const fn new(scale: Vec2, offset: Vec2) -> Self {
        Self { scale, offset }
    }

    /// Build from `[scale_x, scale_y, offset_x, offset_y]`
    pub fn from_array(a: [f32; 4]) -> Self {
        Self {
            scale: Vec2::new(a[0], a[1]),
            offset: Vec2::new(a[2], a[3]),
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.scale.x, self.scale.y, self.offset.x, self.offset.y]
    }

    #[inline]
    pub fn apply(&self, uv: Vec2) -> Vec2 {
        uv * self.scale + self.offset
    }

    /// Transform both corners of a rectangle
    pub fn apply_rect(&self, rect: UvRect) -> UvRect {
        UvRect::new(self.apply(rect.min), self.apply(rect.max))
    }
}

/// Affine transform mapping `src` onto `dst`
///
/// Axes are independent. `src` must have non-zero width and height; callers
/// check [`UvRect::is_degenerate`] first.
pub fn calculate_uv_scale_offset(src: UvRect, dst: UvRect) -> ScaleOffset {
    let scale = dst.size() / src.size();
    let offset = dst.max - src.max * scale;
    ScaleOffset { scale, offset }
}

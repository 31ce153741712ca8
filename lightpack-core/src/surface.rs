//! Surface preparation
//!
//! Turns each lightmapped surface into a [`SurfaceMapping`] and a packing
//! [`RectRequest`]:
//!
//! 1. Bound the mesh's lightmap UV channel (`uv2`, falling back to `uv`).
//! 2. Move those bounds into lightmap space with the surface's current
//!    scale/offset.
//! 3. Repeat-wrap, un-invert and rasterize them against the source lightmap
//!    to get the pixel block to copy.
//! 4. Reserve `padding` extra texels on the right and bottom of the block.

use glam::{UVec2, Vec2};

use crate::error::SurfaceWarning;
use crate::page::RectRequest;
use crate::uv_math::{ScaleOffset, UvRect};

/// UV channels of a surface's mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UvChannels {
    /// Primary texture coordinates (channel 0)
    pub uv: Option<Vec<Vec2>>,
    /// Lightmap coordinates (channel 1)
    pub uv2: Option<Vec<Vec2>>,
}

/// A renderable surface as found in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSource {
    /// Hierarchy path, used in logs and warnings
    pub name: String,
    /// Source lightmap index, negative when not lightmapped
    pub lightmap_index: i32,
    pub lightmap_scale_offset: ScaleOffset,
    pub uvs: UvChannels,
}

/// UV bounds of a surface in mesh space and in lightmap space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshUvInfo {
    pub lightmap_index: usize,
    pub mesh_uv_bounds: UvRect,
    pub lightmap_uv_bounds: UvRect,
}

/// Half-open pixel block `[min, max)` in a source lightmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }
}

/// Everything the compositor needs to know about one prepared surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMapping {
    pub name: String,
    /// Index of the surface in the input slice
    pub source_index: usize,
    pub lightmap_index: usize,
    pub mesh_uv_bounds: UvRect,
    /// Pre-repack lightmap UV bounds (before wrapping)
    pub lightmap_uv_bounds: UvRect,
    /// Texels copied from the source lightmap (clamped to the image)
    pub pixel_bounds: PixelRect,
    /// Unclamped block size the packing rect was derived from
    pub extent: UVec2,
}

/// Output of [`prepare_surfaces`]
///
/// `rects[i].id == i` and refers to `mappings[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedBatch {
    pub mappings: Vec<SurfaceMapping>,
    pub rects: Vec<RectRequest>,
    pub warnings: Vec<SurfaceWarning>,
}

/// Bound the lightmap UV channel of a surface
///
/// Uses `uv2` unless it is missing or degenerate on either axis, in which
/// case `uv` is used. An empty channel bounds to all zeros.
pub fn mesh_uv_info(source: &SurfaceSource) -> Result<MeshUvInfo, SurfaceWarning> {
    let Ok(lightmap_index) = usize::try_from(source.lightmap_index) else {
        return Err(SurfaceWarning::NotLightmapped {
            surface: source.name.clone(),
        });
    };

    let points = match (&source.uvs.uv2, &source.uvs.uv) {
        (Some(uv2), Some(uv)) if bounds_of(uv2).is_degenerate() => uv,
        (Some(uv2), _) => uv2,
        (None, Some(uv)) => uv,
        (None, None) => {
            return Err(SurfaceWarning::MissingUvs {
                surface: source.name.clone(),
            });
        }
    };

    let scale_offset = source.lightmap_scale_offset;
    Ok(MeshUvInfo {
        lightmap_index,
        mesh_uv_bounds: bounds_of(points),
        lightmap_uv_bounds: UvRect::from_points(points.iter().map(|&p| scale_offset.apply(p))),
    })
}

fn bounds_of(points: &[Vec2]) -> UvRect {
    UvRect::from_points(points.iter().copied())
}

/// Rasterize lightmap UV bounds against a `width x height` lightmap
///
/// Returns the clamped pixel block and the unclamped block extent, or `None`
/// when the bounds cover no texels on some axis.
pub fn pixel_bounds(lightmap_uv: UvRect, width: u32, height: u32) -> Option<(PixelRect, UVec2)> {
    let uv = lightmap_uv.repeat_wrapped().normalized();
    let (w, h) = (width as f32, height as f32);

    let min_x = (uv.min.x * w).floor() as i64;
    let min_y = (uv.min.y * h).floor() as i64;
    let extent_x = ((uv.max.x - uv.min.x) * w).ceil() as i64;
    let extent_y = ((uv.max.y - uv.min.y) * h).ceil() as i64;
    if extent_x <= 0 || extent_y <= 0 {
        return None;
    }

    let clamp_x = |v: i64| v.clamp(0, width as i64) as u32;
    let clamp_y = |v: i64| v.clamp(0, height as i64) as u32;
    let rect = PixelRect {
        min_x: clamp_x(min_x),
        min_y: clamp_y(min_y),
        max_x: clamp_x(min_x + extent_x),
        max_y: clamp_y(min_y + extent_y),
    };
    Some((rect, UVec2::new(extent_x as u32, extent_y as u32)))
}

/// Build mappings and packing rects for every usable surface
///
/// `lightmap_dims[i]` is the size of source lightmap `i`, or `None` if it
/// failed to load. Unusable surfaces are skipped with a warning.
pub fn prepare_surfaces(
    sources: &[SurfaceSource],
    lightmap_dims: &[Option<(u32, u32)>],
    padding: u32,
) -> PreparedBatch {
    let mut batch = PreparedBatch::default();

    for (source_index, source) in sources.iter().enumerate() {
        let info = match mesh_uv_info(source) {
            Ok(info) => info,
            Err(warning) => {
                tracing::warn!("{}", warning);
                batch.warnings.push(warning);
                continue;
            }
        };

        let Some((width, height)) = lightmap_dims.get(info.lightmap_index).copied().flatten() else {
            let warning = SurfaceWarning::MissingLightmap {
                surface: source.name.clone(),
                index: source.lightmap_index,
            };
            tracing::warn!("{}", warning);
            batch.warnings.push(warning);
            continue;
        };

        let Some((pixels, extent)) = pixel_bounds(info.lightmap_uv_bounds, width, height) else {
            let warning = SurfaceWarning::EmptyPixelBounds {
                surface: source.name.clone(),
            };
            tracing::warn!("{}", warning);
            batch.warnings.push(warning);
            continue;
        };

        let id = batch.mappings.len();
        batch
            .rects
            .push(RectRequest::new(id, extent.x + padding, extent.y + padding));
        batch.mappings.push(SurfaceMapping {
            name: source.name.clone(),
            source_index,
            lightmap_index: info.lightmap_index,
            mesh_uv_bounds: info.mesh_uv_bounds,
            lightmap_uv_bounds: info.lightmap_uv_bounds,
            pixel_bounds: pixels,
            extent,
        });
    }

    tracing::debug!(
        "Prepared {} of {} surfaces ({} skipped)",
        batch.mappings.len(),
        sources.len(),
        batch.warnings.len()
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(min: Vec2, max: Vec2) -> Vec<Vec2> {
        vec![min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
    }

    fn source(name: &str, lightmap_index: i32, so: [f32; 4], uvs: UvChannels) -> SurfaceSource {
        SurfaceSource {
            name: name.to_string(),
            lightmap_index,
            lightmap_scale_offset: ScaleOffset::from_array(so),
            uvs,
        }
    }

    fn unit_uv2() -> UvChannels {
        UvChannels {
            uv: None,
            uv2: Some(quad(Vec2::ZERO, Vec2::ONE)),
        }
    }

    #[test]
    fn test_uv2_preferred() {
        let uvs = UvChannels {
            uv: Some(quad(Vec2::ZERO, Vec2::splat(4.0))),
            uv2: Some(quad(Vec2::new(0.1, 0.2), Vec2::new(0.3, 0.4))),
        };
        let info = mesh_uv_info(&source("a", 0, [1.0, 1.0, 0.0, 0.0], uvs)).unwrap();
        assert_eq!(info.mesh_uv_bounds.to_array(), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_degenerate_uv2_falls_back() {
        let uvs = UvChannels {
            uv: Some(quad(Vec2::ZERO, Vec2::splat(0.5))),
            uv2: Some(vec![Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0)]),
        };
        let info = mesh_uv_info(&source("a", 0, [1.0, 1.0, 0.0, 0.0], uvs)).unwrap();
        assert_eq!(info.mesh_uv_bounds.to_array(), [0.0, 0.0, 0.5, 0.5]);

        let only_uv = UvChannels {
            uv: Some(quad(Vec2::ZERO, Vec2::ONE)),
            uv2: None,
        };
        let info = mesh_uv_info(&source("b", 0, [1.0, 1.0, 0.0, 0.0], only_uv)).unwrap();
        assert_eq!(info.mesh_uv_bounds.to_array(), [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_lightmap_bounds_use_scale_offset() {
        let info = mesh_uv_info(&source("a", 2, [0.5, 0.25, 0.125, 0.5], unit_uv2())).unwrap();
        assert_eq!(info.lightmap_index, 2);
        assert_eq!(info.lightmap_uv_bounds.to_array(), [0.125, 0.5, 0.625, 0.75]);
    }

    #[test]
    fn test_uv_info_warnings() {
        let err = mesh_uv_info(&source("none", -1, [1.0, 1.0, 0.0, 0.0], unit_uv2())).unwrap_err();
        assert!(matches!(err, SurfaceWarning::NotLightmapped { .. }));
        let err = mesh_uv_info(&source("bare", 0, [1.0, 1.0, 0.0, 0.0], UvChannels::default()))
            .unwrap_err();
        assert_eq!(err.surface(), "bare");
        assert!(matches!(err, SurfaceWarning::MissingUvs { .. }));
    }

    #[test]
    fn test_pixel_bounds_basic() {
        let uv = UvRect::from_array([0.25, 0.5, 0.5, 0.75]);
        let (rect, extent) = pixel_bounds(uv, 64, 32).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                min_x: 16,
                min_y: 16,
                max_x: 32,
                max_y: 24
            }
        );
        assert_eq!(extent, UVec2::new(16, 8));
        assert_eq!((rect.width(), rect.height()), (16, 8));
    }

    #[test]
    fn test_pixel_bounds_wraps_and_swaps() {
        let wrapped = UvRect::from_array([1.25, -0.75, 1.5, -0.5]);
        let (rect, _) = pixel_bounds(wrapped, 16, 16).unwrap();
        assert_eq!((rect.min_x, rect.min_y, rect.max_x, rect.max_y), (4, 4, 8, 8));

        let inverted = UvRect::from_array([0.5, 0.5, 0.25, 0.25]);
        let (rect, extent) = pixel_bounds(inverted, 16, 16).unwrap();
        assert_eq!((rect.min_x, rect.min_y), (4, 4));
        assert_eq!(extent, UVec2::new(4, 4));
    }

    #[test]
    fn test_pixel_bounds_empty_and_clamped() {
        assert!(pixel_bounds(UvRect::from_array([0.3, 0.3, 0.3, 0.6]), 32, 32).is_none());

        let (rect, extent) = pixel_bounds(UvRect::from_array([0.75, 0.0, 1.0, 1.0]), 8, 8).unwrap();
        assert!(rect.max_x <= 8 && rect.max_y <= 8);
        assert_eq!((rect.min_x, rect.max_x), (6, 8));
        assert_eq!(extent, UVec2::new(2, 8));
    }

    #[test]
    fn test_prepare_surfaces() {
        let sources = vec![
            source("ok", 0, [0.5, 0.5, 0.0, 0.0], unit_uv2()),
            source("missing_map", 3, [0.5, 0.5, 0.0, 0.0], unit_uv2()),
            source("unloaded", 1, [0.5, 0.5, 0.0, 0.0], unit_uv2()),
            source("flat", 0, [0.0, 0.5, 0.25, 0.0], unit_uv2()),
            source("ok2", 0, [0.25, 0.25, 0.5, 0.5], unit_uv2()),
        ];
        let dims = [Some((64, 64)), None];
        let batch = prepare_surfaces(&sources, &dims, 2);

        assert_eq!(batch.mappings.len(), 2);
        assert_eq!(batch.mappings[0].source_index, 0);
        assert_eq!(batch.mappings[1].source_index, 4);
        assert_eq!(batch.rects[0], RectRequest::new(0, 34, 34));
        assert_eq!(batch.rects[1], RectRequest::new(1, 18, 18));
        assert_eq!(batch.mappings[1].pixel_bounds.min_x, 32);

        let surfaces: Vec<&str> = batch.warnings.iter().map(|w| w.surface()).collect();
        assert_eq!(surfaces, vec!["missing_map", "unloaded", "flat"]);
        assert!(matches!(batch.warnings[2], SurfaceWarning::EmptyPixelBounds { .. }));
    }
}

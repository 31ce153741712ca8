//! Atlas compositor
//!
//! Copies each packed surface's texel block from its source lightmap into the
//! atlas page it was placed on, and derives the scale/offset that makes the
//! surface sample the same texels from the atlas.
//!
//! Both images are stored top row first while UV v grows upward, so rows are
//! flipped on both sides of the copy: UV row `y` lives at image row
//! `height - 1 - y`.

use rayon::prelude::*;

use crate::error::{ImageError, SurfaceWarning};
use crate::packer::{MultiPagePacker, Placement};
use crate::page::PackedRect;
use crate::surface::{PixelRect, SurfaceMapping};
use crate::uv_math::{ScaleOffset, UvRect, calculate_uv_scale_offset};

/// Linear RGBA texel
pub type Rgba = [f32; 4];

// ============================================================================
// Images
// ============================================================================

/// A decoded source lightmap (top row first)
#[derive(Debug, Clone, PartialEq)]
pub struct LightmapImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl LightmapImage {
    /// Wrap a dense pixel buffer, checking its length
    pub fn new(width: u32, height: u32, pixels: Vec<Rgba>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ImageError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from a flat `[r, g, b, a, r, g, b, a, ...]` buffer
    pub fn from_floats(width: u32, height: u32, floats: &[f32]) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if floats.len() != expected * 4 {
            return Err(ImageError::SizeMismatch {
                width,
                height,
                expected,
                actual: floats.len() / 4,
            });
        }
        Self::new(width, height, bytemuck::cast_slice::<f32, Rgba>(floats).to_vec())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Texel at image column `x`, row `y` (row 0 is the top)
    pub fn get(&self, x: u32, y: u32) -> Rgba {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// One finished atlas page (top row first)
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasPage {
    /// Page index in the packer, also the new lightmap index
    pub index: usize,
    /// Side length in pixels
    pub size: u32,
    pub pixels: Vec<Rgba>,
}

impl AtlasPage {
    fn new(index: usize, size: u32) -> Self {
        Self {
            index,
            size,
            pixels: vec![[0.0; 4]; size as usize * size as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Rgba {
        self.pixels[y as usize * self.size as usize + x as usize]
    }

    /// Flat RGBA float view for encoders
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.pixels)
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// What happened to a prepared surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceOutcome {
    /// Samples `page` through `scale_offset`
    Mapped { page: usize, scale_offset: ScaleOffset },
    /// Lightmapping disabled for this surface (identity transform)
    Unmapped,
    /// No page accepted the surface's rect; keeps its old mapping
    Unpacked,
    /// Placed, but its source lightmap is unavailable; keeps its old mapping
    Skipped,
}

/// Result of [`composite`]
#[derive(Debug, Clone, Default)]
pub struct CompositeOutput {
    /// Occupied pages in page order
    pub pages: Vec<AtlasPage>,
    /// One outcome per mapping, same order as the input
    pub outcomes: Vec<SurfaceOutcome>,
    pub warnings: Vec<SurfaceWarning>,
}

impl CompositeOutput {
    pub fn mapped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, SurfaceOutcome::Mapped { .. }))
            .count()
    }
}

/// UV bounds of a packed block inside its page
///
/// The padding border is excluded and both edges are pulled in by half a
/// texel to absorb the rounding of the pixel block.
pub fn destination_uv_bounds(rect: &PackedRect, page_size: u32, padding: u32) -> UvRect {
    let size = page_size as f32;
    let pad = padding as f32;
    UvRect::from_array([
        (rect.x as f32 + 0.5) / size,
        (rect.y as f32 + 0.5) / size,
        ((rect.x + rect.width) as f32 - pad - 0.5) / size,
        ((rect.y + rect.height) as f32 - pad - 0.5) / size,
    ])
}

/// Copy every placed block into its page and derive new transforms
///
/// `mappings[i]` must correspond to rect id `i` in `packer`. `lightmaps` is
/// indexed by [`SurfaceMapping::lightmap_index`]. Pages no rect landed on are
/// never allocated.
pub fn composite(
    packer: &MultiPagePacker,
    mappings: &[SurfaceMapping],
    lightmaps: &[Option<LightmapImage>],
    padding: u32,
) -> CompositeOutput {
    let mut outcomes = vec![SurfaceOutcome::Unpacked; mappings.len()];
    let mut warnings = Vec::new();
    let mut by_page: Vec<Vec<Placement>> = vec![Vec::new(); packer.page_count()];

    for placement in packer.placements() {
        let Some(mapping) = mappings.get(placement.rect.id) else {
            tracing::warn!("Placed rect {} has no surface mapping", placement.rect.id);
            continue;
        };

        if source_image(lightmaps, mapping).is_none() {
            let warning = SurfaceWarning::MissingLightmap {
                surface: mapping.name.clone(),
                index: mapping.lightmap_index as i32,
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
            outcomes[placement.rect.id] = SurfaceOutcome::Skipped;
            continue;
        }

        // The block is copied even when the transform can't be derived
        by_page[placement.page].push(placement);

        outcomes[placement.rect.id] = if mapping.mesh_uv_bounds.is_degenerate() {
            let warning = SurfaceWarning::DegenerateUvBounds {
                surface: mapping.name.clone(),
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
            SurfaceOutcome::Unmapped
        } else {
            let dst = destination_uv_bounds(&placement.rect, placement.page_size, padding);
            SurfaceOutcome::Mapped {
                page: placement.page,
                scale_offset: calculate_uv_scale_offset(mapping.mesh_uv_bounds, dst),
            }
        };
    }

    for (id, outcome) in outcomes.iter().enumerate() {
        if *outcome == SurfaceOutcome::Unpacked {
            let warning = SurfaceWarning::Unpacked {
                surface: mappings[id].name.clone(),
                reason: "no page accepted its rect".to_string(),
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }
    }

    // Blocks never overlap, so pages can be filled independently
    let pages: Vec<AtlasPage> = by_page
        .par_iter()
        .enumerate()
        .filter(|(_, placements)| !placements.is_empty())
        .map(|(index, placements)| {
            let mut page = AtlasPage::new(index, placements[0].page_size);
            for placement in placements {
                let mapping = &mappings[placement.rect.id];
                if let Some(src) = source_image(lightmaps, mapping) {
                    copy_block(&mut page, src, &mapping.pixel_bounds, &placement.rect);
                }
            }
            tracing::debug!(
                "Composited page {} ({}x{}, {} blocks)",
                index,
                page.size,
                page.size,
                placements.len()
            );
            page
        })
        .collect();

    CompositeOutput {
        pages,
        outcomes,
        warnings,
    }
}

fn source_image<'a>(
    lightmaps: &'a [Option<LightmapImage>],
    mapping: &SurfaceMapping,
) -> Option<&'a LightmapImage> {
    lightmaps.get(mapping.lightmap_index)?.as_ref()
}

/// Copy `bounds` of `src` to `dst` at the rect's position, flipping rows
fn copy_block(page: &mut AtlasPage, src: &LightmapImage, bounds: &PixelRect, dst: &PackedRect) {
    if bounds.max_x > src.width
        || bounds.max_y > src.height
        || dst.x + bounds.width() > page.size
        || dst.y + bounds.height() > page.size
    {
        tracing::error!(
            "Block {:?} of a {}x{} lightmap does not fit at ({}, {}) on a {} page",
            bounds,
            src.width,
            src.height,
            dst.x,
            dst.y,
            page.size
        );
        return;
    }

    let size = page.size as usize;
    let src_width = src.width as usize;
    let (min_x, max_x) = (bounds.min_x as usize, bounds.max_x as usize);

    for y in bounds.min_y..bounds.max_y {
        let dy = (y - bounds.min_y + dst.y) as usize;
        let dst_row = size - 1 - dy;
        let src_row = (src.height - 1 - y) as usize;

        let from = &src.pixels[src_row * src_width + min_x..src_row * src_width + max_x];
        let start = dst_row * size + dst.x as usize;
        page.pixels[start..start + from.len()].copy_from_slice(from);
    }
}

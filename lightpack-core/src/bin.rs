//! Rectangle packing primitives
//!
//! A [`BinPacker`] owns the free-space state of one fixed-size square bin.
//! It places rectangles without overlap and never moves or removes a
//! rectangle once placed. Growing a bin means building a new packer and
//! replaying placements into it (see [`crate::page::Page`]).
//!
//! The free-space bookkeeping itself comes from `rect_packer` (skyline) and
//! `guillotiere` (guillotine); this module only adapts them to one contract.

use serde::{Deserialize, Serialize};

/// Free-space state of a fixed-size square bin
pub trait BinPacker: Send {
    /// Side length of the bin in pixels
    fn size(&self) -> u32;

    /// Place one `width x height` rectangle, returning its top-left corner
    ///
    /// Returns `None` when the rectangle does not fit; the state is unchanged.
    fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)>;

    /// Place several rectangles in order, reporting each result
    fn pack_many(&mut self, sizes: &[(u32, u32)]) -> Vec<Option<(u32, u32)>> {
        sizes.iter().map(|&(w, h)| self.pack(w, h)).collect()
    }
}

/// Which [`BinPacker`] a page builds its free-space state with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingAlgorithm {
    /// Skyline (`rect_packer`)
    #[default]
    Skyline,
    /// Guillotine splitting (`guillotiere`)
    Guillotine,
}

impl PackingAlgorithm {
    /// Build an empty bin of the given side length
    pub fn create(self, size: u32) -> Box<dyn BinPacker> {
        match self {
            PackingAlgorithm::Skyline => Box::new(SkylinePacker::new(size)),
            PackingAlgorithm::Guillotine => Box::new(GuillotinePacker::new(size)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PackingAlgorithm::Skyline => "skyline",
            PackingAlgorithm::Guillotine => "guillotine",
        }
    }
}

/// Side lengths both backends accept, or `None` for an impossible request
fn checked_dims(size: u32, width: u32, height: u32) -> Option<(i32, i32)> {
    if width == 0 || height == 0 || width > size || height > size {
        return None;
    }
    Some((i32::try_from(width).ok()?, i32::try_from(height).ok()?))
}

// ============================================================================
// Skyline
// ============================================================================

/// Skyline packer backed by [`rect_packer::Packer`]
///
/// No padding is configured here: the caller folds padding into each
/// rectangle's size. Rotation is never allowed since texel rows must stay rows.
pub struct SkylinePacker {
    size: u32,
    packer: rect_packer::Packer,
}

impl SkylinePacker {
    pub fn new(size: u32) -> Self {
        let side = i32::try_from(size).unwrap_or(i32::MAX);
        let config = rect_packer::Config {
            width: side,
            height: side,
            border_padding: 0,
            rectangle_padding: 0,
        };
        Self {
            size,
            packer: rect_packer::Packer::new(config),
        }
    }
}

impl BinPacker for SkylinePacker {
    fn size(&self) -> u32 {
        self.size
    }

    fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (w, h) = checked_dims(self.size, width, height)?;
        let rect = self.packer.pack(w, h, false)?;
        Some((rect.x as u32, rect.y as u32))
    }
}

// ============================================================================
// Guillotine
// ============================================================================

/// Guillotine packer backed by [`guillotiere::SimpleAtlasAllocator`]
pub struct GuillotinePacker {
    size: u32,
    allocator: guillotiere::SimpleAtlasAllocator,
}

impl GuillotinePacker {
    pub fn new(size: u32) -> Self {
        let side = i32::try_from(size).unwrap_or(i32::MAX);
        Self {
            size,
            allocator: guillotiere::SimpleAtlasAllocator::new(guillotiere::Size::new(side, side)),
        }
    }
}

impl BinPacker for GuillotinePacker {
    fn size(&self) -> u32 {
        self.size
    }

    fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (w, h) = checked_dims(self.size, width, height)?;
        let rect = self.allocator.allocate(guillotiere::Size::new(w, h))?;
        Some((rect.min.x as u32, rect.min.y as u32))
    }
}

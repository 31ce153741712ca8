//! Lightmap atlas repacking core
//!
//! Repacks the lightmap blocks used by a set of surfaces into densely packed,
//! power-of-two atlas pages and derives the scale/offset each surface needs to
//! sample the same texels from the new atlas.
//!
//! # Modules
//!
//! - [`uv_math`] - Power-of-two rounding, repeat-wrap UVs, scale/offset derivation
//! - [`bin`] - Packing primitives (skyline, guillotine) behind the [`BinPacker`] trait
//! - [`page`] - A single growable square bin
//! - [`packer`] - Multi-page greedy packer
//! - [`surface`] - Surface preparation (UV bounds → pixel bounds → packing rects)
//! - [`compositor`] - Pixel block copy and sampling transform derivation
//! - [`config`] - Packer configuration
//! - [`error`] - Packing errors and per-surface warnings

pub mod bin;
pub mod compositor;
pub mod config;
pub mod error;
pub mod packer;
pub mod page;
pub mod surface;
pub mod uv_math;

pub use bin::{BinPacker, GuillotinePacker, PackingAlgorithm, SkylinePacker};
pub use compositor::{AtlasPage, CompositeOutput, LightmapImage, Rgba, SurfaceOutcome, composite};
pub use config::PackerConfig;
pub use error::{ImageError, PackError, SurfaceWarning};
pub use packer::{MultiPagePacker, PackReport, Placement};
pub use page::{PackedRect, Page, RectRequest};
pub use surface::{
    MeshUvInfo, PixelRect, PreparedBatch, SurfaceMapping, SurfaceSource, UvChannels,
    mesh_uv_info, pixel_bounds, prepare_surfaces,
};
pub use uv_math::{
    ScaleOffset, UvRect, approximately, calculate_uv_scale_offset, ceil_power_of_two,
    clamp_repeat_uv, clamp_repeat_uv_tracked,
};

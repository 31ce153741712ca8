//! Packing errors and per-surface warnings
//!
//! Nothing here aborts a run: a [`PackError`] is scoped to one rectangle and a
//! [`SurfaceWarning`] to one surface.

/// A rectangle that can never be placed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    /// Zero width or height
    #[error("rect {id} is empty ({width}x{height})")]
    EmptyRect { id: usize, width: u32, height: u32 },

    /// Larger than a fully grown page on some axis
    #[error("rect {id} ({width}x{height}) exceeds the maximum page size {max_size}")]
    RectTooLarge {
        id: usize,
        width: u32,
        height: u32,
        max_size: u32,
    },
}

/// A surface that was skipped or left unmapped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceWarning {
    /// Renderer has no lightmap assigned
    #[error("{surface}: not lightmapped")]
    NotLightmapped { surface: String },

    /// Neither `uv2` nor `uv` is present
    #[error("{surface}: mesh has no UV channels")]
    MissingUvs { surface: String },

    /// Referenced lightmap is out of range or failed to load
    #[error("{surface}: lightmap {index} is not available")]
    MissingLightmap { surface: String, index: i32 },

    /// Lightmap UV bounds cover no texels
    #[error("{surface}: invalid lightmap UV (empty pixel bounds)")]
    EmptyPixelBounds { surface: String },

    /// Source UV bounds have zero width or height; surface left unmapped
    #[error("{surface}: invalid lightmap UV bounds (zero width or height)")]
    DegenerateUvBounds { surface: String },

    /// The surface's rectangle could not be placed on any page
    #[error("{surface}: not packed ({reason})")]
    Unpacked { surface: String, reason: String },
}

impl SurfaceWarning {
    /// Name of the surface the warning refers to
    pub fn surface(&self) -> &str {
        match self {
            SurfaceWarning::NotLightmapped { surface }
            | SurfaceWarning::MissingUvs { surface }
            | SurfaceWarning::MissingLightmap { surface, .. }
            | SurfaceWarning::EmptyPixelBounds { surface }
            | SurfaceWarning::DegenerateUvBounds { surface }
            | SurfaceWarning::Unpacked { surface, .. } => surface,
        }
    }
}

/// Pixel buffer construction error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("pixel buffer has {actual} texels, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

//! Lightmap image loading and atlas page writing

use anyhow::{Context, Result};
use lightpack_core::{AtlasPage, LightmapImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Load a lightmap (EXR, Radiance HDR, PNG) as linear RGBA floats
pub fn load_lightmap(path: &Path) -> Result<LightmapImage> {
    let img =
        image::open(path).with_context(|| format!("Failed to load lightmap: {}", path.display()))?;

    let rgba = img.into_rgba32f();
    let (width, height) = rgba.dimensions();
    LightmapImage::from_floats(width, height, rgba.as_raw())
        .with_context(|| format!("Failed to read lightmap pixels: {}", path.display()))
}

/// Load every lightmap in parallel, keeping index order
///
/// A lightmap that fails to load becomes `None`; surfaces referencing it are
/// skipped later.
pub fn load_all(paths: &[PathBuf]) -> Vec<Option<LightmapImage>> {
    paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| match load_lightmap(path) {
            Ok(lightmap) => {
                tracing::debug!(
                    "Loaded lightmap {} ({}x{}) from {}",
                    index,
                    lightmap.width(),
                    lightmap.height(),
                    path.display()
                );
                Some(lightmap)
            }
            Err(e) => {
                tracing::warn!("Lightmap {} unavailable: {:#}", index, e);
                None
            }
        })
        .collect()
}

/// File name of the atlas page with the given index
pub fn page_file_name(index: usize) -> String {
    format!("lightmap_{}.exr", index)
}

/// Write an atlas page as 32-bit float RGBA OpenEXR
pub fn write_page(path: &Path, page: &AtlasPage) -> Result<()> {
    let buffer = image::Rgba32FImage::from_raw(page.size, page.size, page.as_floats().to_vec())
        .with_context(|| format!("Atlas page {} has an invalid pixel buffer", page.index))?;

    image::DynamicImage::ImageRgba32F(buffer)
        .save_with_format(path, image::ImageFormat::OpenExr)
        .with_context(|| format!("Failed to write atlas page: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_test_exr(path: &Path, width: u32, height: u32) {
        let img = image::Rgba32FImage::from_fn(width, height, |x, y| {
            image::Rgba([x as f32, y as f32, 0.25, 1.0])
        });
        image::DynamicImage::ImageRgba32F(img)
            .save_with_format(path, image::ImageFormat::OpenExr)
            .unwrap();
    }

    #[test]
    fn test_load_exr() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lm.exr");
        write_test_exr(&path, 8, 4);

        let lightmap = load_lightmap(&path).unwrap();
        assert_eq!(lightmap.dimensions(), (8, 4));
        assert_eq!(lightmap.get(3, 2), [3.0, 2.0, 0.25, 1.0]);
    }

    #[test]
    fn test_load_all_keeps_order_and_gaps() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.exr");
        let b = dir.path().join("b.exr");
        write_test_exr(&a, 4, 4);
        write_test_exr(&b, 16, 8);

        let loaded = load_all(&[a, dir.path().join("missing.exr"), b]);
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].as_ref().unwrap().dimensions(), (4, 4));
        assert!(loaded[1].is_none());
        assert_eq!(loaded[2].as_ref().unwrap().dimensions(), (16, 8));
    }

    #[test]
    fn test_write_page_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(page_file_name(0));
        let mut pixels = vec![[0.0; 4]; 16];
        pixels[5] = [1.5, 0.5, 0.25, 1.0];
        let page = AtlasPage {
            index: 0,
            size: 4,
            pixels,
        };
        write_page(&path, &page).unwrap();

        let back = load_lightmap(&path).unwrap();
        assert_eq!(back.dimensions(), (4, 4));
        assert_eq!(back.get(1, 1), [1.5, 0.5, 0.25, 1.0]);
        assert_eq!(back.get(0, 0), [0.0; 4]);
    }
}

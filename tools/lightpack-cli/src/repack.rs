//! Repack pipeline
//!
//! scene + lightmaps -> prepared surfaces -> packed rects -> atlas pages,
//! updated scene and report in the output directory.

use anyhow::{Context, Result};
use lightpack_core::{
    LightmapImage, MultiPagePacker, SurfaceSource, composite, prepare_surfaces,
};
use std::path::{Path, PathBuf};

use crate::config::RepackConfig;
use crate::lightmap_io;
use crate::report::RepackReport;
use crate::scene::{CollectedRenderer, Scene};

/// File name of the rewritten scene in the output directory
pub const SCENE_FILE: &str = "scene.json";
/// File name of the report in the output directory
pub const REPORT_FILE: &str = "repack.json";

/// Command line overrides for a run
#[derive(Debug, Clone, Default)]
pub struct RepackOptions {
    /// Output directory (overrides manifest)
    pub output_dir: Option<PathBuf>,
    /// Pack and report without writing anything
    pub dry_run: bool,
}

/// Validate the manifest, scene and root selection without repacking
///
/// Returns the number of lightmapped renderers selected.
pub fn check(config: &RepackConfig) -> Result<usize> {
    config.validate()?;
    let scene = Scene::load(&config.scene_path())?;
    let collected = scene.collect_lightmapped(&config.roots)?;
    for path in config.lightmap_paths() {
        if !path.exists() {
            tracing::warn!("Lightmap not found: {}", path.display());
        }
    }
    Ok(collected.len())
}

/// Run a full repack
pub fn run(config: &RepackConfig, options: &RepackOptions) -> Result<RepackReport> {
    config.validate()?;
    let padding = config.lighting.padding;

    let mut scene = Scene::load(&config.scene_path())?;
    let collected = scene.collect_lightmapped(&config.roots)?;
    tracing::info!("Found {} lightmapped renderers", collected.len());

    let lightmaps = lightmap_io::load_all(&config.lightmap_paths());
    let dims: Vec<Option<(u32, u32)>> = lightmaps
        .iter()
        .map(|l| l.as_ref().map(LightmapImage::dimensions))
        .collect();

    let sources: Vec<SurfaceSource> = collected
        .iter()
        .map(CollectedRenderer::to_surface_source)
        .collect();
    let batch = prepare_surfaces(&sources, &dims, padding);
    tracing::info!("Packing {} lightmap blocks", batch.rects.len());

    let mut packer = MultiPagePacker::new(config.packer);
    let pack = packer.pack_rects(&batch.rects);
    if !pack.is_complete() {
        tracing::warn!(
            "{} of {} blocks were not packed",
            pack.dropped(),
            pack.requested
        );
    }

    let output = composite(&packer, &batch.mappings, &lightmaps, padding);
    let report = RepackReport::build(collected.len(), &batch, &packer, &pack, &output);

    if options.dry_run {
        tracing::info!("Dry run, nothing written");
        return Ok(report);
    }

    let output_dir = config.output_path(options.output_dir.as_deref());
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    for page in &output.pages {
        let path = output_dir.join(lightmap_io::page_file_name(page.index));
        lightmap_io::write_page(&path, page)?;
        tracing::info!("Wrote {} ({}x{})", path.display(), page.size, page.size);
    }

    let mut updated = 0;
    for (mapping, outcome) in batch.mappings.iter().zip(&output.outcomes) {
        let node = &collected[mapping.source_index].node;
        if scene.apply_outcome(node, outcome) {
            updated += 1;
        }
    }
    tracing::info!("Updated {} renderers", updated);

    write_outputs(&output_dir, &scene, &report)?;
    Ok(report)
}

fn write_outputs(output_dir: &Path, scene: &Scene, report: &RepackReport) -> Result<()> {
    scene.save(&output_dir.join(SCENE_FILE))?;
    report.save(&output_dir.join(REPORT_FILE))
}

//! Repack report (`repack.json`)

use anyhow::{Context, Result};
use lightpack_core::{CompositeOutput, MultiPagePacker, PackReport, PreparedBatch, SurfaceOutcome};
use serde::Serialize;
use std::path::Path;

/// Summary of one repack run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepackReport {
    /// Lightmapped renderers found in the selected hierarchy
    pub renderers: usize,
    /// Renderers that produced a packing rect
    pub prepared: usize,
    pub mapped: usize,
    pub unmapped: usize,
    pub unpacked: usize,
    pub skipped: usize,
    pub packing: PackingSummary,
    pub pages: Vec<PageSummary>,
    pub surfaces: Vec<SurfaceEntry>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackingSummary {
    pub algorithm: &'static str,
    pub requested: usize,
    pub placed: usize,
    pub dropped: usize,
    pub page_limit_reached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub index: usize,
    pub size: u32,
    pub rects: usize,
    pub use_rate: f32,
}

/// Final state of one prepared surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceEntry {
    pub name: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_offset: Option<[f32; 4]>,
}

impl RepackReport {
    pub fn build(
        renderers: usize,
        batch: &PreparedBatch,
        packer: &MultiPagePacker,
        pack: &PackReport,
        output: &CompositeOutput,
    ) -> Self {
        let surfaces: Vec<SurfaceEntry> = batch
            .mappings
            .iter()
            .zip(&output.outcomes)
            .map(|(mapping, outcome)| {
                let (name, page, scale_offset) = match outcome {
                    SurfaceOutcome::Mapped { page, scale_offset } => {
                        ("mapped", Some(*page), Some(scale_offset.to_array()))
                    }
                    SurfaceOutcome::Unmapped => ("unmapped", None, None),
                    SurfaceOutcome::Unpacked => ("unpacked", None, None),
                    SurfaceOutcome::Skipped => ("skipped", None, None),
                };
                SurfaceEntry {
                    name: mapping.name.clone(),
                    outcome: name,
                    page,
                    scale_offset,
                }
            })
            .collect();

        let count = |wanted: &str| surfaces.iter().filter(|s| s.outcome == wanted).count();

        let pages = packer
            .pages()
            .iter()
            .enumerate()
            .filter(|(_, page)| !page.placed().is_empty())
            .map(|(index, page)| PageSummary {
                index,
                size: page.size(),
                rects: page.placed().len(),
                use_rate: page.use_rate(),
            })
            .collect();

        let warnings = batch
            .warnings
            .iter()
            .chain(&output.warnings)
            .map(|w| w.to_string())
            .chain(pack.rejected.iter().map(|e| e.to_string()))
            .collect();

        Self {
            renderers,
            prepared: batch.mappings.len(),
            mapped: count("mapped"),
            unmapped: count("unmapped"),
            unpacked: count("unpacked"),
            skipped: count("skipped"),
            packing: PackingSummary {
                algorithm: packer.config().algorithm.name(),
                requested: pack.requested,
                placed: pack.placed,
                dropped: pack.dropped(),
                page_limit_reached: pack.page_limit_reached,
            },
            pages,
            surfaces,
            warnings,
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))
    }

    /// Log a short human-readable summary
    pub fn print_summary(&self) {
        tracing::info!(
            "{} renderers, {} prepared: {} mapped, {} unmapped, {} unpacked, {} skipped",
            self.renderers,
            self.prepared,
            self.mapped,
            self.unmapped,
            self.unpacked,
            self.skipped
        );
        for page in &self.pages {
            tracing::info!(
                "  page {}: {}x{}, {} blocks, {:.1}% used",
                page.index,
                page.size,
                page.size,
                page.rects,
                page.use_rate * 100.0
            );
        }
        if self.packing.dropped > 0 {
            tracing::warn!(
                "{} of {} rects could not be packed{}",
                self.packing.dropped,
                self.packing.requested,
                if self.packing.page_limit_reached {
                    " (page limit reached)"
                } else {
                    ""
                }
            );
        }
        if !self.warnings.is_empty() {
            tracing::warn!("{} warnings (see repack.json)", self.warnings.len());
        }
    }
}

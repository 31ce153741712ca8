//! repack.toml manifest parsing
//!
//! ```toml
//! scene = "scene.json"
//! output_dir = "repacked"
//! roots = ["Level/Static"]
//!
//! [lighting]
//! padding = 2
//!
//! [packer]
//! max_page_size = 1024
//!
//! [[lightmaps]]
//! path = "Lightmap-0_comp_light.exr"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use anyhow::{Context, Result};
use lightpack_core::PackerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// repack.toml manifest structure
#[derive(Debug, Clone, Deserialize)]
pub struct RepackConfig {
    /// Scene description (JSON)
    pub scene: PathBuf,

    /// Where atlas pages, the updated scene and the report are written.
    /// Default: "repacked"
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Hierarchy paths to repack. Default: every scene root
    #[serde(default)]
    pub roots: Vec<String>,

    #[serde(default)]
    pub lighting: LightingSection,

    #[serde(default)]
    pub packer: PackerConfig,

    /// Source lightmaps, in lightmap index order
    #[serde(default)]
    pub lightmaps: Vec<LightmapEntry>,

    /// Directory of the manifest file, set by [`RepackConfig::load`]
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Lighting settings the source lightmaps were baked with
#[derive(Debug, Clone, Deserialize)]
pub struct LightingSection {
    /// Texels reserved around every block.
    /// Default: 2
    #[serde(default = "default_padding")]
    pub padding: u32,
}

impl Default for LightingSection {
    fn default() -> Self {
        Self {
            padding: default_padding(),
        }
    }
}

/// Single source lightmap entry
#[derive(Debug, Clone, Deserialize)]
pub struct LightmapEntry {
    pub path: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("repacked")
}

fn default_padding() -> u32 {
    2
}

impl RepackConfig {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse repack.toml")
    }

    /// Check the manifest describes a runnable repack
    pub fn validate(&self) -> Result<()> {
        self.packer.validate().map_err(anyhow::Error::msg)?;

        if self.lightmaps.is_empty() {
            anyhow::bail!("No lightmaps declared (add [[lightmaps]] entries)");
        }
        if self.lighting.padding >= self.packer.max_page_size {
            anyhow::bail!(
                "Padding {} leaves no room on a {} page",
                self.lighting.padding,
                self.packer.max_page_size
            );
        }
        for root in &self.roots {
            if root.is_empty() || root.starts_with('/') || root.ends_with('/') {
                anyhow::bail!("Invalid root path: {:?}", root);
            }
        }
        Ok(())
    }

    /// Resolve a manifest-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    pub fn scene_path(&self) -> PathBuf {
        self.resolve(&self.scene)
    }

    pub fn lightmap_paths(&self) -> Vec<PathBuf> {
        self.lightmaps.iter().map(|l| self.resolve(&l.path)).collect()
    }

    /// Output directory, preferring a command line override
    pub fn output_path(&self, override_dir: Option<&Path>) -> PathBuf {
        match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.resolve(&self.output_dir),
        }
    }
}

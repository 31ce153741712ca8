//! Packer configuration (`[packer]` section of repack.toml)

use serde::{Deserialize, Serialize};

use crate::bin::PackingAlgorithm;

/// Default side length of a freshly opened page
pub const DEFAULT_INITIAL_PAGE_SIZE: u32 = 32;
/// Hard cap on page side length
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 1024;
/// Hard cap on the number of pages a packer will open
pub const DEFAULT_MAX_PAGES: usize = 128;

/// Settings for [`crate::packer::MultiPagePacker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Side length of new pages, rounded up to a power of two (default: 32)
    #[serde(default = "default_initial_page_size")]
    pub initial_page_size: u32,
    /// Largest side length a page may grow to (default: 1024)
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Maximum number of pages (default: 128)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Packing primitive used inside each page (default: skyline)
    #[serde(default)]
    pub algorithm: PackingAlgorithm,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            initial_page_size: DEFAULT_INITIAL_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            algorithm: PackingAlgorithm::default(),
        }
    }
}

fn default_initial_page_size() -> u32 {
    DEFAULT_INITIAL_PAGE_SIZE
}
fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}
fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

impl PackerConfig {
    /// Check the settings describe a usable packer
    pub fn validate(&self) -> Result<(), String> {
        if self.max_page_size == 0 || !self.max_page_size.is_power_of_two() {
            return Err(format!(
                "max_page_size {} must be a non-zero power of two",
                self.max_page_size
            ));
        }
        if self.initial_page_size == 0 || self.initial_page_size > self.max_page_size {
            return Err(format!(
                "initial_page_size {} must be between 1 and max_page_size ({})",
                self.initial_page_size, self.max_page_size
            ));
        }
        if self.max_pages == 0 {
            return Err("max_pages must be at least 1".to_string());
        }
        Ok(())
    }
}

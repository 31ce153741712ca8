//! lightpack library
//!
//! Scene, manifest and image plumbing around `lightpack-core`, shared by the
//! `lightpack` binary and its tests.

pub mod config;
pub mod lightmap_io;
pub mod repack;
pub mod report;
pub mod scene;

pub use config::RepackConfig;
pub use repack::{RepackOptions, check, run};
pub use report::RepackReport;
pub use scene::Scene;

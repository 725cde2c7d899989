//! Threshold-method comparison engine for porosity micrographs.
//!
//! Takes a batch of grayscale micrographs (typically coating cross-sections),
//! binarizes each one under a catalog of thresholding strategies, cleans the
//! resulting masks of speckle, and reports per-method porosity and pore counts
//! next to a side-by-side comparison panel.
//!
//! # Module Organization
//!
//! - **image_proc**: image types, normalization, contrast enhancement, the
//!   threshold estimators, mask synthesis and region measurement
//! - **catalog**: the named registry of threshold estimators
//! - **panel**: comparison panel layout and rendering
//! - **report**: the `summary.csv` metrics table
//! - **run**: input discovery and the batch orchestrator
//! - **config**: run configuration (serde, JSON on disk)
//! - **error**: run-level error taxonomy

pub mod catalog;
pub mod config;
pub mod error;
pub mod image_proc;
pub mod panel;
pub mod report;
pub mod run;

pub use catalog::{CatalogConfig, MethodCatalog, ThresholdEstimator};
pub use config::{ClaheConfig, ConfigError, RunConfig};
pub use error::PorelabError;
pub use image_proc::{
    analyze_regions, normalize, synthesize_mask, BinaryMask, Connectivity, IntensityImage,
    MaskOptions, Polarity, RawRaster, RegionMetrics, SegmentationError, ThresholdSpec,
};
pub use panel::{assemble_panel, ComparisonPanel, LabelRenderer, PanelLayout, PanelStyle};
pub use report::{MetricsRow, MetricsTable};
pub use run::{discover_inputs, ComparisonRun, ImageReport, RunSummary};

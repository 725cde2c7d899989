//! Run configuration.
//!
//! One explicit value carries every tunable of a run; nothing is read from
//! global state. The configuration serializes to JSON so a run can be
//! reproduced from a file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogConfig;
use crate::image_proc::contrast::Clahe;
use crate::image_proc::detection::Connectivity;
use crate::image_proc::mask::{MaskOptions, Polarity};

/// Invalid configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("window size must be odd and at least 1, got {0}")]
    InvalidWindowSize(usize),

    #[error("panel must have at least one column")]
    InvalidPanelColumns,

    #[error("CLAHE tile grid must be at least 1x1, got {0}x{1}")]
    InvalidTileGrid(usize, usize),

    #[error("CLAHE clip limit must be finite and non-negative, got {0}")]
    InvalidClipLimit(f32),

    #[error("failed to read or write config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// CLAHE parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheConfig {
    pub clip_limit: f32,
    /// Tiles along (x, y).
    pub tile_grid: (usize, usize),
}

impl Default for ClaheConfig {
    fn default() -> Self {
        let clahe = Clahe::default();
        Self {
            clip_limit: clahe.clip_limit,
            tile_grid: clahe.tile_grid,
        }
    }
}

impl ClaheConfig {
    pub fn enhancer(&self) -> Clahe {
        Clahe::new(self.clip_limit, self.tile_grid)
    }
}

/// Everything a comparison run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root searched recursively for micrographs.
    pub input_dir: PathBuf,
    /// Receives `masks/`, `panels/` and `summary.csv`.
    pub output_dir: PathBuf,
    /// File stems to process; empty processes every discovered file.
    pub targets: Vec<String>,
    pub use_clahe: bool,
    pub clahe: ClaheConfig,
    pub polarity: Polarity,
    pub min_component_size: usize,
    pub connectivity: Connectivity,
    pub window_size: usize,
    pub k: f64,
    pub fixed_levels: Vec<u8>,
    /// Catalog subset to run; empty runs the whole catalog.
    pub methods: Vec<String>,
    pub panel_columns: usize,
    /// Longest edge of one panel cell in pixels; 0 keeps full resolution.
    pub panel_max_cell: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        let catalog = CatalogConfig::default();
        let mask = MaskOptions::default();
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("processed_selected"),
            targets: Vec::new(),
            use_clahe: true,
            clahe: ClaheConfig::default(),
            polarity: mask.polarity,
            min_component_size: mask.min_component_size,
            connectivity: mask.connectivity,
            window_size: catalog.window_size,
            k: catalog.k,
            fixed_levels: catalog.fixed_levels,
            methods: Vec::new(),
            panel_columns: 4,
            panel_max_cell: 512,
        }
    }
}

impl RunConfig {
    /// Check value ranges the processing stages rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(ConfigError::InvalidWindowSize(self.window_size));
        }
        if self.panel_columns == 0 {
            return Err(ConfigError::InvalidPanelColumns);
        }
        let (gx, gy) = self.clahe.tile_grid;
        if gx == 0 || gy == 0 {
            return Err(ConfigError::InvalidTileGrid(gx, gy));
        }
        if !(self.clahe.clip_limit.is_finite() && self.clahe.clip_limit >= 0.0) {
            return Err(ConfigError::InvalidClipLimit(self.clahe.clip_limit));
        }
        Ok(())
    }

    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            window_size: self.window_size,
            k: self.k,
            fixed_levels: self.fixed_levels.clone(),
        }
    }

    pub fn mask_options(&self) -> MaskOptions {
        MaskOptions {
            polarity: self.polarity,
            min_component_size: self.min_component_size,
            connectivity: self.connectivity,
        }
    }

    /// Save configuration to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a JSON file; missing fields take defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

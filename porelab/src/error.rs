//! Run-level errors.
//!
//! Each processing layer has its own error enum; [`PorelabError`] wraps them
//! with the image, method and stage they occurred in so a failed run can be
//! traced back from its message alone.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::image_proc::detection::SegmentationError;
use crate::image_proc::normalize::DecodeError;

/// Processing stage reported with segmentation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Threshold,
    Mask,
    Panel,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Threshold => "threshold",
            Stage::Mask => "mask",
            Stage::Panel => "panel",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PorelabError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("no matching input images under {dir} (targets: {targets:?})")]
    InputNotFound { dir: PathBuf, targets: Vec<String> },

    #[error("images share the stem '{stem}' and would overwrite each other's outputs: {paths:?}")]
    DuplicateStem { stem: String, paths: Vec<PathBuf> },

    #[error("method catalog: {0}")]
    Catalog(#[source] SegmentationError),

    #[error("image '{image}', method '{method}', {stage} stage: {source}")]
    Segmentation {
        image: String,
        method: String,
        stage: Stage,
        #[source]
        source: SegmentationError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write metrics table: {0}")]
    Report(#[from] csv::Error),
}

impl PorelabError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn encode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Encode {
            path: path.into(),
            source,
        }
    }
}

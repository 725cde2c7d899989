//! Batch orchestrator: discovery, per-image evaluation and persistence.
//!
//! For every discovered micrograph, in lexicographic order of file stem:
//!
//! 1. decode and normalize to 8-bit intensity
//! 2. optionally enhance contrast
//! 3. evaluate every catalog method (threshold, mask, metrics) in parallel
//! 4. on this thread, in catalog order: write masks and append table rows
//! 5. assemble and write the comparison panel
//!
//! The metrics table is written once, after the last image, so an aborted
//! run never leaves a partial `summary.csv` behind. If writing an image's
//! outputs fails, the masks and panel already written for it are removed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::catalog::{MethodCatalog, ThresholdEstimator};
use crate::config::RunConfig;
use crate::error::{PorelabError, Stage};
use crate::image_proc::contrast::ContrastEnhancer;
use crate::image_proc::detection::SegmentationError;
use crate::image_proc::image::{BinaryMask, IntensityImage};
use crate::image_proc::io::{load_intensity_image, save_u8_image};
use crate::image_proc::mask::{synthesize_mask, MaskOptions};
use crate::image_proc::regions::{analyze_regions, RegionMetrics};
use crate::panel::{assemble_panel, LabelRenderer, PanelStyle};
use crate::report::{MetricsRow, MetricsTable};

/// Accepted input extensions, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// A micrograph found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputImage {
    pub path: PathBuf,
    /// File stem; names mask and panel files and is matched against targets.
    pub stem: String,
    /// File name with extension, as written to the metrics table.
    pub file_name: String,
}

impl InputImage {
    fn from_path(path: PathBuf) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?.to_string();
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path,
            stem,
            file_name,
        })
    }
}

fn collect_images(dir: &Path, found: &mut Vec<InputImage>) -> Result<(), PorelabError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PorelabError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| PorelabError::io(dir, e))?.path();
        if path.is_dir() {
            collect_images(&path, found)?;
        } else if let Some(image) = InputImage::from_path(path) {
            found.push(image);
        }
    }
    Ok(())
}

/// Recursively find supported images under `dir`, sorted by stem.
///
/// With non-empty `targets`, only files whose stem is listed are kept.
/// Fails with `InputNotFound` when nothing is left, and with `DuplicateStem`
/// when two kept files share a stem, since outputs are named by stem.
/// Targets that matched no file are logged as a warning.
pub fn discover_inputs(dir: &Path, targets: &[String]) -> Result<Vec<InputImage>, PorelabError> {
    let not_found = || PorelabError::InputNotFound {
        dir: dir.to_path_buf(),
        targets: targets.to_vec(),
    };
    if !dir.is_dir() {
        return Err(not_found());
    }

    let mut found = Vec::new();
    collect_images(dir, &mut found)?;

    if !targets.is_empty() {
        found.retain(|image| targets.contains(&image.stem));
    }
    found.sort_by(|a, b| a.stem.cmp(&b.stem).then_with(|| a.path.cmp(&b.path)));

    if found.is_empty() {
        return Err(not_found());
    }

    if let Some(pair) = found.windows(2).find(|pair| pair[0].stem == pair[1].stem) {
        let stem = pair[0].stem.clone();
        let paths = found
            .iter()
            .filter(|image| image.stem == stem)
            .map(|image| image.path.clone())
            .collect();
        return Err(PorelabError::DuplicateStem { stem, paths });
    }

    let present: BTreeSet<&str> = found.iter().map(|image| image.stem.as_str()).collect();
    let missing: Vec<&str> = targets
        .iter()
        .map(String::as_str)
        .filter(|t| !present.contains(t))
        .collect();
    if !missing.is_empty() {
        warn!("Targets not found under {}: {:?}", dir.display(), missing);
    }

    Ok(found)
}

/// Result of one method on one image, before anything is written.
enum MethodOutcome {
    Evaluated {
        mask: BinaryMask,
        metrics: RegionMetrics,
    },
    Skipped(SegmentationError),
}

/// What was produced for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub file_name: String,
    pub rows: Vec<MetricsRow>,
    pub mask_paths: Vec<PathBuf>,
    pub panel_path: PathBuf,
    /// Methods that produced no mask, e.g. on a uniform image.
    pub skipped_methods: Vec<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<ImageReport>,
    /// Inputs that failed to decode and were not targets.
    pub skipped_inputs: Vec<PathBuf>,
    pub table: MetricsTable,
    pub masks_dir: PathBuf,
    pub panels_dir: PathBuf,
    pub summary_csv: PathBuf,
}

impl RunSummary {
    pub fn image_count(&self) -> usize {
        self.reports.len()
    }
}

/// A configured comparison run.
pub struct ComparisonRun {
    config: RunConfig,
    catalog: MethodCatalog,
    enhancer: Option<Box<dyn ContrastEnhancer>>,
    mask_options: MaskOptions,
    panel_style: PanelStyle,
    labels: LabelRenderer,
}

impl ComparisonRun {
    /// Validate `config` and resolve the method subset against the catalog.
    pub fn new(config: RunConfig) -> Result<Self, PorelabError> {
        config.validate()?;

        let catalog = MethodCatalog::from_config(&config.catalog_config())
            .select(&config.methods)
            .map_err(PorelabError::Catalog)?;

        let enhancer: Option<Box<dyn ContrastEnhancer>> = if config.use_clahe {
            Some(Box::new(config.clahe.enhancer()))
        } else {
            None
        };

        let panel_style = PanelStyle {
            columns: config.panel_columns,
            max_cell: config.panel_max_cell,
            ..PanelStyle::default()
        };

        Ok(Self {
            mask_options: config.mask_options(),
            catalog,
            enhancer,
            panel_style,
            labels: LabelRenderer::new(),
            config,
        })
    }

    /// Replace the label renderer, e.g. with [`LabelRenderer::without_fonts`].
    pub fn with_label_renderer(mut self, labels: LabelRenderer) -> Self {
        self.labels = labels;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn catalog(&self) -> &MethodCatalog {
        &self.catalog
    }

    fn masks_dir(&self) -> PathBuf {
        self.config.output_dir.join("masks")
    }

    fn panels_dir(&self) -> PathBuf {
        self.config.output_dir.join("panels")
    }

    fn summary_csv(&self) -> PathBuf {
        self.config.output_dir.join("summary.csv")
    }

    /// Process every input and write masks, panels and `summary.csv`.
    pub fn run(&self) -> Result<RunSummary, PorelabError> {
        let inputs = discover_inputs(&self.config.input_dir, &self.config.targets)?;
        info!(
            "Found {} image(s) under {}; {} method(s) per image",
            inputs.len(),
            self.config.input_dir.display(),
            self.catalog.len()
        );

        let mut table = MetricsTable::new();
        let mut reports = Vec::with_capacity(inputs.len());
        let mut skipped_inputs = Vec::new();

        for input in &inputs {
            let image = match load_intensity_image(&input.path) {
                Ok(image) => image,
                Err(source) if self.config.targets.contains(&input.stem) => {
                    return Err(PorelabError::Decode {
                        path: input.path.clone(),
                        source,
                    });
                }
                Err(e) => {
                    warn!("Skipping {}: {}", input.path.display(), e);
                    skipped_inputs.push(input.path.clone());
                    continue;
                }
            };

            let report = self.process_image(input, &image)?;
            for row in &report.rows {
                table.push(row.clone());
            }
            reports.push(report);
        }

        let summary_csv = self.summary_csv();
        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| PorelabError::io(&self.config.output_dir, e))?;
        table.write_csv(&summary_csv)?;

        let summary = RunSummary {
            reports,
            skipped_inputs,
            table,
            masks_dir: self.masks_dir(),
            panels_dir: self.panels_dir(),
            summary_csv,
        };

        let names: Vec<&str> = summary.reports.iter().map(|r| r.file_name.as_str()).collect();
        info!("Processed {} image(s): {:?}", summary.image_count(), names);
        info!("Masks written to: {}", summary.masks_dir.display());
        info!("Panels written to: {}", summary.panels_dir.display());
        info!("Metrics table: {}", summary.summary_csv.display());

        Ok(summary)
    }

    /// Evaluate all methods on one decoded image and persist its outputs.
    pub fn process_image(
        &self,
        input: &InputImage,
        image: &IntensityImage,
    ) -> Result<ImageReport, PorelabError> {
        info!(
            "Processing {} ({}x{})",
            input.file_name,
            image.width(),
            image.height()
        );

        let image = match &self.enhancer {
            Some(enhancer) => {
                debug!("Applying {} to {}", enhancer.name(), input.stem);
                enhancer.enhance(image)
            }
            None => image.clone(),
        };

        let methods: Vec<&dyn ThresholdEstimator> = self.catalog.iter().collect();
        let outcomes = methods
            .par_iter()
            .map(|method| self.evaluate(*method, input, &image))
            .collect::<Result<Vec<_>, _>>()?;

        let mut written = Vec::new();
        let result = self.persist(input, &image, &methods, outcomes, &mut written);
        if result.is_err() {
            discard_partial_outputs(&input.stem, &written);
        }
        result
    }

    /// Write masks and the panel for one image. Every path is recorded in
    /// `written` before its file is created.
    fn persist(
        &self,
        input: &InputImage,
        image: &IntensityImage,
        methods: &[&dyn ThresholdEstimator],
        outcomes: Vec<MethodOutcome>,
        written: &mut Vec<PathBuf>,
    ) -> Result<ImageReport, PorelabError> {
        let mut rows = Vec::with_capacity(outcomes.len());
        let mut skipped_methods = Vec::new();
        let mut panel_cells = Vec::new();

        for (method, outcome) in methods.iter().zip(outcomes) {
            let name = method.name();
            match outcome {
                MethodOutcome::Evaluated { mask, metrics } => {
                    let dir = self.masks_dir().join(name);
                    std::fs::create_dir_all(&dir).map_err(|e| PorelabError::io(&dir, e))?;
                    let path = dir.join(format!("{}.png", input.stem));
                    written.push(path.clone());
                    save_u8_image(&mask.to_u8(), &path)
                        .map_err(|e| PorelabError::encode(&path, e))?;

                    debug!(
                        "{} / {}: porosity {:.4}, {} component(s)",
                        input.stem, name, metrics.foreground_fraction, metrics.component_count
                    );
                    rows.push(MetricsRow::from(metrics));
                    panel_cells.push((name.to_string(), mask));
                }
                MethodOutcome::Skipped(reason) => {
                    warn!("Skipping {} for {}: {}", name, input.file_name, reason);
                    rows.push(MetricsRow::skipped(&input.file_name, name));
                    skipped_methods.push(name.to_string());
                }
            }
        }
        let mask_paths = written.clone();

        let title = format!("{} (original + methods)", input.stem);
        let panel = assemble_panel(image, &panel_cells, &title, &self.panel_style, &self.labels)
            .map_err(|source| PorelabError::Segmentation {
                image: input.file_name.clone(),
                method: "original".to_string(),
                stage: Stage::Panel,
                source,
            })?;

        let panels_dir = self.panels_dir();
        std::fs::create_dir_all(&panels_dir).map_err(|e| PorelabError::io(&panels_dir, e))?;
        let panel_path = panels_dir.join(format!("{}_panel.png", input.stem));
        written.push(panel_path.clone());
        panel
            .save(&panel_path)
            .map_err(|e| PorelabError::encode(&panel_path, e))?;

        Ok(ImageReport {
            file_name: input.file_name.clone(),
            rows,
            mask_paths,
            panel_path,
            skipped_methods,
        })
    }

    fn evaluate(
        &self,
        method: &dyn ThresholdEstimator,
        input: &InputImage,
        image: &IntensityImage,
    ) -> Result<MethodOutcome, PorelabError> {
        let segmentation_error = |stage, source| PorelabError::Segmentation {
            image: input.file_name.clone(),
            method: method.name().to_string(),
            stage,
            source,
        };

        let threshold = match method.compute(image) {
            Ok(threshold) => threshold,
            Err(e @ SegmentationError::DegenerateHistogram { .. }) => {
                return Ok(MethodOutcome::Skipped(e))
            }
            Err(e) => return Err(segmentation_error(Stage::Threshold, e)),
        };

        let mask = synthesize_mask(image, &threshold, &self.mask_options)
            .map_err(|e| segmentation_error(Stage::Mask, e))?;
        let metrics = analyze_regions(
            &input.file_name,
            method.name(),
            &mask,
            self.mask_options.connectivity,
        );

        Ok(MethodOutcome::Evaluated { mask, metrics })
    }
}

/// Remove the outputs of an image whose processing failed part way.
fn discard_partial_outputs(stem: &str, written: &[PathBuf]) {
    if written.is_empty() {
        return;
    }
    warn!("Discarding {} partial output(s) for {}", written.len(), stem);
    for path in written {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

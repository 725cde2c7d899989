//! Compare thresholding methods on a batch of porosity micrographs.
//!
//! Writes one mask per (image, method), one comparison panel per image and a
//! `summary.csv` with porosity and component counts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use porelab::{ComparisonRun, Connectivity, MethodCatalog, Polarity, RunConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolarityArg {
    /// Dark pixels (pores) are foreground
    Below,
    /// Bright pixels (material) are foreground
    Above,
}

impl From<PolarityArg> for Polarity {
    fn from(arg: PolarityArg) -> Self {
        match arg {
            PolarityArg::Below => Polarity::Below,
            PolarityArg::Above => Polarity::Above,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConnectivityArg {
    Four,
    Eight,
}

impl From<ConnectivityArg> for Connectivity {
    fn from(arg: ConnectivityArg) -> Self {
        match arg {
            ConnectivityArg::Four => Connectivity::Four,
            ConnectivityArg::Eight => Connectivity::Eight,
        }
    }
}

/// Threshold-method comparison for porosity micrographs
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Compare thresholding methods on porosity micrographs",
    long_about = "Binarizes every input image under Otsu, Yen, triangle, Sauvola, Niblack and \
        a ladder of fixed thresholds, removes speckle, and reports porosity and pore counts \
        per method alongside a side-by-side comparison panel.\n\n\
        Flags override values loaded with --config; unset flags keep the config or default."
)]
struct Args {
    #[arg(long, help = "JSON run configuration to start from")]
    config: Option<PathBuf>,

    #[arg(long, help = "Write the effective configuration to this JSON file")]
    dump_config: Option<PathBuf>,

    #[arg(long, help = "Print the method catalog and exit")]
    list_methods: bool,

    #[arg(short, long, help = "Directory searched recursively for images")]
    input_dir: Option<PathBuf>,

    #[arg(short, long, help = "Directory for masks, panels and summary.csv")]
    output_dir: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "File stems to process (comma separated); default is every image"
    )]
    targets: Option<Vec<String>>,

    #[arg(long, help = "Disable CLAHE contrast enhancement")]
    no_clahe: bool,

    #[arg(long, help = "CLAHE clip limit")]
    clip_limit: Option<f32>,

    #[arg(long, num_args = 2, value_names = ["X", "Y"], help = "CLAHE tile grid")]
    tile_grid: Option<Vec<usize>>,

    #[arg(long, value_enum, help = "Which side of the threshold is foreground")]
    polarity: Option<PolarityArg>,

    #[arg(long, help = "Minimum connected component size in pixels")]
    min_component_size: Option<usize>,

    #[arg(long, value_enum, help = "Pixel connectivity for cleanup and counting")]
    connectivity: Option<ConnectivityArg>,

    #[arg(long, help = "Window size for Sauvola/Niblack (odd)")]
    window_size: Option<usize>,

    #[arg(short, long, help = "Sensitivity constant k for Sauvola/Niblack")]
    k: Option<f64>,

    #[arg(long, value_delimiter = ',', help = "Fixed threshold levels (comma separated)")]
    fixed_levels: Option<Vec<u8>>,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        help = "Subset of methods to run (comma separated); default is the whole catalog"
    )]
    methods: Option<Vec<String>>,

    #[arg(long, help = "Number of columns in the comparison panel")]
    panel_columns: Option<usize>,

    #[arg(long, help = "Longest panel cell edge in pixels (0 = full resolution)")]
    panel_max_cell: Option<u32>,
}

impl Args {
    fn build_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(targets) = &self.targets {
            config.targets = targets.clone();
        }
        if self.no_clahe {
            config.use_clahe = false;
        }
        if let Some(clip) = self.clip_limit {
            config.clahe.clip_limit = clip;
        }
        if let Some(grid) = &self.tile_grid {
            if let [x, y] = grid.as_slice() {
                config.clahe.tile_grid = (*x, *y);
            }
        }
        if let Some(polarity) = self.polarity {
            config.polarity = polarity.into();
        }
        if let Some(size) = self.min_component_size {
            config.min_component_size = size;
        }
        if let Some(connectivity) = self.connectivity {
            config.connectivity = connectivity.into();
        }
        if let Some(window) = self.window_size {
            config.window_size = window;
        }
        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(levels) = &self.fixed_levels {
            config.fixed_levels = levels.clone();
        }
        if let Some(methods) = &self.methods {
            config.methods = methods.clone();
        }
        if let Some(columns) = self.panel_columns {
            config.panel_columns = columns;
        }
        if let Some(max_cell) = self.panel_max_cell {
            config.panel_max_cell = max_cell;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = args.build_config()?;

    if let Some(path) = &args.dump_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        info!("Wrote effective configuration to {}", path.display());
    }

    if args.list_methods {
        let catalog = MethodCatalog::from_config(&config.catalog_config());
        for name in catalog.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let run = ComparisonRun::new(config).context("Invalid run configuration")?;
    let summary = run.run().context("Comparison run failed")?;

    println!(
        "Processed {} image(s), {} row(s) in {}",
        summary.image_count(),
        summary.table.len(),
        summary.summary_csv.display()
    );
    if !summary.skipped_inputs.is_empty() {
        println!("Skipped {} unreadable file(s)", summary.skipped_inputs.len());
    }

    Ok(())
}

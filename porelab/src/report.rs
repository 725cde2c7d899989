//! Per-(image, method) metrics table written as `summary.csv`.

use std::path::Path;

use serde::Serialize;

use crate::error::PorelabError;
use crate::image_proc::regions::RegionMetrics;

/// CSV column names, in order.
pub const SUMMARY_HEADER: [&str; 4] = ["image", "method", "porosity", "components"];

/// One table row. Skipped methods leave both measurements empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub image: String,
    pub method: String,
    pub porosity: Option<f64>,
    pub components: Option<usize>,
}

impl MetricsRow {
    /// Row for a method that produced no mask.
    pub fn skipped(image: &str, method: &str) -> Self {
        Self {
            image: image.to_string(),
            method: method.to_string(),
            porosity: None,
            components: None,
        }
    }
}

impl From<RegionMetrics> for MetricsRow {
    fn from(metrics: RegionMetrics) -> Self {
        Self {
            image: metrics.image_id,
            method: metrics.method_name,
            porosity: Some(metrics.foreground_fraction),
            components: Some(metrics.component_count),
        }
    }
}

/// Rows in the order they were appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTable {
    rows: Vec<MetricsRow>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: MetricsRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table with its header, even when it has no rows.
    pub fn write_csv(&self, path: &Path) -> Result<(), PorelabError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        wtr.write_record(SUMMARY_HEADER)?;

        for row in &self.rows {
            wtr.serialize(row)?;
        }

        wtr.flush().map_err(|e| PorelabError::io(path, e))?;
        Ok(())
    }
}

//! Named registry of threshold estimators.
//!
//! Every method is a [`ThresholdEstimator`] trait object registered under a
//! unique name. The catalog keeps declaration order, which drives the order
//! of table rows and panel cells:
//!
//! 1. `otsu`, `yen`, `triangle` (global, histogram based)
//! 2. `sauvola`, `niblack` (local window statistics)
//! 3. `fixed_<N>` for each configured level
//!
//! Estimators read only the image and their own parameters, so one catalog
//! can be shared across threads.

use crate::image_proc::detection::{
    niblack_threshold, otsu_threshold, sauvola_threshold, triangle_threshold, yen_threshold,
    Histogram, SegmentationError, SAUVOLA_DYNAMIC_RANGE,
};
use crate::image_proc::image::IntensityImage;
use crate::image_proc::mask::ThresholdSpec;

/// Trait for computing a threshold from an intensity image.
pub trait ThresholdEstimator: Send + Sync {
    /// Catalog name, used for table rows, mask directories and panel labels.
    fn name(&self) -> &str;

    /// Compute a scalar threshold or a per-pixel surface for `image`.
    fn compute(&self, image: &IntensityImage) -> Result<ThresholdSpec, SegmentationError>;
}

/// Global estimator backed by a histogram function.
struct HistogramMethod {
    name: &'static str,
    estimate: fn(&Histogram) -> Result<u8, SegmentationError>,
}

impl ThresholdEstimator for HistogramMethod {
    fn name(&self) -> &str {
        self.name
    }

    fn compute(&self, image: &IntensityImage) -> Result<ThresholdSpec, SegmentationError> {
        let t = (self.estimate)(&Histogram::from_image(image))?;
        Ok(ThresholdSpec::Scalar(t as f64))
    }
}

/// Sauvola local threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sauvola {
    pub window_size: usize,
    pub k: f64,
}

impl ThresholdEstimator for Sauvola {
    fn name(&self) -> &str {
        "sauvola"
    }

    fn compute(&self, image: &IntensityImage) -> Result<ThresholdSpec, SegmentationError> {
        Ok(ThresholdSpec::Surface(sauvola_threshold(
            image,
            self.window_size,
            self.k,
            SAUVOLA_DYNAMIC_RANGE,
        )))
    }
}

/// Niblack local threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Niblack {
    pub window_size: usize,
    pub k: f64,
}

impl ThresholdEstimator for Niblack {
    fn name(&self) -> &str {
        "niblack"
    }

    fn compute(&self, image: &IntensityImage) -> Result<ThresholdSpec, SegmentationError> {
        Ok(ThresholdSpec::Surface(niblack_threshold(
            image,
            self.window_size,
            self.k,
        )))
    }
}

/// Constant threshold, independent of image content.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLevel {
    name: String,
    level: u8,
}

impl FixedLevel {
    pub fn new(level: u8) -> Self {
        Self {
            name: format!("fixed_{level}"),
            level,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl ThresholdEstimator for FixedLevel {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, _image: &IntensityImage) -> Result<ThresholdSpec, SegmentationError> {
        Ok(ThresholdSpec::Scalar(self.level as f64))
    }
}

/// Parameters of the catalog's estimators.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    /// Odd side length of the local-statistics window.
    pub window_size: usize,
    /// Weight of the local standard deviation.
    pub k: f64,
    /// Levels registered as `fixed_<N>` methods, in order.
    pub fixed_levels: Vec<u8>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            window_size: 31,
            k: 0.2,
            fixed_levels: (48..=192).step_by(16).collect(),
        }
    }
}

/// Ordered registry of threshold estimators.
pub struct MethodCatalog {
    methods: Vec<Box<dyn ThresholdEstimator>>,
}

impl MethodCatalog {
    /// Build the full catalog in declaration order.
    pub fn from_config(config: &CatalogConfig) -> Self {
        let mut methods: Vec<Box<dyn ThresholdEstimator>> = vec![
            Box::new(HistogramMethod {
                name: "otsu",
                estimate: otsu_threshold,
            }),
            Box::new(HistogramMethod {
                name: "yen",
                estimate: yen_threshold,
            }),
            Box::new(HistogramMethod {
                name: "triangle",
                estimate: triangle_threshold,
            }),
            Box::new(Sauvola {
                window_size: config.window_size,
                k: config.k,
            }),
            Box::new(Niblack {
                window_size: config.window_size,
                k: config.k,
            }),
        ];

        let mut seen = std::collections::HashSet::new();
        for &level in &config.fixed_levels {
            if seen.insert(level) {
                methods.push(Box::new(FixedLevel::new(level)));
            }
        }

        Self { methods }
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Look up one estimator by name.
    pub fn get(&self, name: &str) -> Result<&dyn ThresholdEstimator, SegmentationError> {
        self.methods
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
            .ok_or_else(|| SegmentationError::UnknownMethod(name.to_string()))
    }

    /// Restrict the catalog to `names`, keeping declaration order.
    ///
    /// An empty list keeps every method. Fails on the first unknown name.
    pub fn select(self, names: &[String]) -> Result<Self, SegmentationError> {
        if names.is_empty() {
            return Ok(self);
        }
        for name in names {
            self.get(name)?;
        }
        let methods = self
            .methods
            .into_iter()
            .filter(|m| names.iter().any(|n| n == m.name()))
            .collect();
        Ok(Self { methods })
    }

    /// Estimators in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn ThresholdEstimator> {
        self.methods.iter().map(|m| m.as_ref())
    }
}

impl std::fmt::Debug for MethodCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::test_patterns::generate_horizontal_gradient;

    fn default_catalog() -> MethodCatalog {
        MethodCatalog::from_config(&CatalogConfig::default())
    }

    #[test]
    fn test_declaration_order() {
        let catalog = default_catalog();
        assert_eq!(
            catalog.names(),
            vec![
                "otsu", "yen", "triangle", "sauvola", "niblack", "fixed_48", "fixed_64",
                "fixed_80", "fixed_96", "fixed_112", "fixed_128", "fixed_144", "fixed_160",
                "fixed_176", "fixed_192"
            ]
        );
        assert_eq!(catalog.len(), 15);
    }

    #[test]
    fn test_unknown_method() {
        let catalog = default_catalog();
        assert_eq!(
            catalog.get("kittler").err(),
            Some(SegmentationError::UnknownMethod("kittler".to_string()))
        );
        assert!(catalog.get("fixed_128").is_ok());
    }

    #[test]
    fn test_select_keeps_declaration_order() {
        let catalog = default_catalog()
            .select(&["fixed_96".to_string(), "otsu".to_string()])
            .unwrap();
        assert_eq!(catalog.names(), vec!["otsu", "fixed_96"]);
    }

    #[test]
    fn test_select_rejects_unknown_name() {
        let result = default_catalog().select(&["otsu".to_string(), "bogus".to_string()]);
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some(SegmentationError::UnknownMethod("bogus".to_string()).to_string())
        );
    }

    #[test]
    fn test_duplicate_fixed_levels_registered_once() {
        let catalog = MethodCatalog::from_config(&CatalogConfig {
            fixed_levels: vec![64, 64, 32],
            ..CatalogConfig::default()
        });
        assert_eq!(&catalog.names()[5..], &["fixed_64", "fixed_32"]);
    }

    #[test]
    fn test_fixed_level_ignores_content() {
        let method = FixedLevel::new(96);
        let a = IntensityImage::from_elem(5, 5, 0);
        let b = IntensityImage::new(generate_horizontal_gradient(9, 3, 0u8, 255u8));
        assert_eq!(method.compute(&a).unwrap(), ThresholdSpec::Scalar(96.0));
        assert_eq!(method.compute(&b).unwrap(), ThresholdSpec::Scalar(96.0));
    }

    #[test]
    fn test_uniform_image_fails_only_histogram_methods() {
        let catalog = default_catalog();
        let image = IntensityImage::from_elem(12, 12, 77);
        for method in catalog.iter() {
            let result = method.compute(&image);
            match method.name() {
                "otsu" | "yen" | "triangle" => assert_eq!(
                    result,
                    Err(SegmentationError::DegenerateHistogram { distinct_levels: 1 }),
                    "{}",
                    method.name()
                ),
                _ => assert!(result.is_ok(), "{}", method.name()),
            }
        }
    }

    #[test]
    fn test_local_methods_return_matching_surface() {
        let image = IntensityImage::new(generate_horizontal_gradient(17, 11, 20u8, 220u8));
        for name in ["sauvola", "niblack"] {
            match default_catalog().get(name).unwrap().compute(&image).unwrap() {
                ThresholdSpec::Surface(surface) => assert_eq!(surface.dim(), (11, 17)),
                other => panic!("{name} returned {other:?}"),
            }
        }
    }

    #[test]
    fn test_histogram_methods_return_scalar_level() {
        let image = IntensityImage::from_raw(4, 1, vec![10, 10, 200, 200]).unwrap();
        let threshold = default_catalog().get("otsu").unwrap().compute(&image).unwrap();
        assert_eq!(threshold, ThresholdSpec::Scalar(10.0));
    }
}

//! End-to-end runs over synthetic micrographs written to a temp directory.

use std::path::Path;

use approx::assert_relative_eq;
use porelab::image_proc::io::save_u8_image;
use porelab::image_proc::test_patterns::generate_pore_field;
use porelab::{ComparisonRun, LabelRenderer, Polarity, PorelabError, RunConfig};
use tempfile::tempdir;

const SIZE: usize = 64;

/// One 81-pixel pore and one 13-pixel pore on a bright matrix.
fn write_pore_image(path: &Path) {
    let field = generate_pore_field(
        SIZE,
        SIZE,
        200,
        40,
        &[(20.0, 20.0, 5.0), (45.0, 45.0, 2.0)],
    );
    save_u8_image(&field, path).unwrap();
}

fn write_flat_image(path: &Path) {
    let flat = ndarray::Array2::from_elem((SIZE, SIZE), 120u8);
    save_u8_image(&flat, path).unwrap();
}

fn run(config: RunConfig) -> Result<porelab::RunSummary, PorelabError> {
    ComparisonRun::new(config)?
        .with_label_renderer(LabelRenderer::without_fonts())
        .run()
}

#[test]
fn test_full_catalog_run_writes_all_outputs() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    std::fs::create_dir_all(input.path().join("sub")).unwrap();
    write_pore_image(&input.path().join("b.png"));
    write_pore_image(&input.path().join("sub").join("a.png"));
    write_flat_image(&input.path().join("flat.png"));

    let summary = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        ..RunConfig::default()
    })
    .unwrap();

    assert_eq!(summary.image_count(), 3);
    assert_eq!(summary.table.len(), 3 * 15);

    // Lexicographic by stem, catalog order within an image
    let first: Vec<(&str, &str)> = summary
        .table
        .rows()
        .iter()
        .take(2)
        .map(|r| (r.image.as_str(), r.method.as_str()))
        .collect();
    assert_eq!(first, vec![("a.png", "otsu"), ("a.png", "yen")]);

    for stem in ["a", "b", "flat"] {
        assert!(output.path().join("masks/fixed_128").join(format!("{stem}.png")).is_file());
        assert!(output.path().join("panels").join(format!("{stem}_panel.png")).is_file());
    }
    assert!(output.path().join("masks/otsu/a.png").is_file());

    // Uniform image: histogram methods skipped, others measured
    let flat = summary
        .reports
        .iter()
        .find(|r| r.file_name == "flat.png")
        .unwrap();
    assert_eq!(flat.skipped_methods, vec!["otsu", "yen", "triangle"]);
    assert!(!output.path().join("masks/otsu/flat.png").exists());

    let csv = std::fs::read_to_string(output.path().join("summary.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "image,method,porosity,components");
    assert_eq!(lines.len(), 1 + 45);
    assert!(lines.contains(&"flat.png,otsu,,"));

    // Porosity is the foreground share of the mask written for that row
    for row in summary.table.rows() {
        let Some(porosity) = row.porosity else {
            continue;
        };
        let stem = Path::new(&row.image).file_stem().unwrap().to_str().unwrap();
        let mask_path = output
            .path()
            .join("masks")
            .join(&row.method)
            .join(format!("{stem}.png"));
        let mask = image::open(&mask_path).unwrap().to_luma8();
        let foreground = mask.pixels().filter(|p| p[0] == 255).count();
        assert_relative_eq!(
            porosity,
            foreground as f64 / (SIZE * SIZE) as f64,
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_pore_porosity_with_below_polarity() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_pore_image(&input.path().join("3_2.png"));

    let summary = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        use_clahe: false,
        polarity: Polarity::Below,
        methods: vec!["fixed_128".to_string(), "fixed_48".to_string()],
        ..RunConfig::default()
    })
    .unwrap();

    let rows = summary.table.rows();
    assert_eq!(rows.len(), 2);
    // Declaration order, not request order
    assert_eq!(rows[0].method, "fixed_48");
    assert_eq!(rows[1].method, "fixed_128");

    // Small pore falls below the 32-pixel cutoff
    let fixed_128 = &rows[1];
    assert_relative_eq!(
        fixed_128.porosity.unwrap(),
        81.0 / (SIZE * SIZE) as f64,
        epsilon = 1e-12
    );
    assert_eq!(fixed_128.components, Some(1));

    let mask = image::open(output.path().join("masks/fixed_128/3_2.png"))
        .unwrap()
        .to_luma8();
    assert_eq!(mask.get_pixel(20, 20)[0], 255);
    assert_eq!(mask.get_pixel(45, 45)[0], 0);
    assert_eq!(mask.get_pixel(0, 0)[0], 0);
}

#[test]
fn test_above_polarity_is_material() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_pore_image(&input.path().join("m.png"));

    let summary = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        use_clahe: false,
        methods: vec!["fixed_128".to_string()],
        ..RunConfig::default()
    })
    .unwrap();

    let row = &summary.table.rows()[0];
    let pores = 81.0 + 13.0;
    assert_relative_eq!(
        row.porosity.unwrap(),
        1.0 - pores / (SIZE * SIZE) as f64,
        epsilon = 1e-12
    );
    assert_eq!(row.components, Some(1));
}

#[test]
fn test_runs_are_deterministic() {
    let input = tempdir().unwrap();
    write_pore_image(&input.path().join("x.png"));

    let config = |out: &Path| RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: out.to_path_buf(),
        ..RunConfig::default()
    };
    let out_a = tempdir().unwrap();
    let out_b = tempdir().unwrap();
    let a = run(config(out_a.path())).unwrap();
    let b = run(config(out_b.path())).unwrap();

    assert_eq!(a.table, b.table);
    assert_eq!(
        std::fs::read(out_a.path().join("summary.csv")).unwrap(),
        std::fs::read(out_b.path().join("summary.csv")).unwrap()
    );
}

#[test]
fn test_missing_targets_abort_without_summary() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_pore_image(&input.path().join("1.png"));

    let result = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        targets: vec!["79".to_string(), "89".to_string()],
        ..RunConfig::default()
    });

    assert!(matches!(result, Err(PorelabError::InputNotFound { .. })));
    assert!(!output.path().join("summary.csv").exists());
}

#[test]
fn test_undecodable_target_aborts() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_pore_image(&input.path().join("1.png"));
    std::fs::write(input.path().join("2.png"), b"not a png").unwrap();

    let result = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        targets: vec!["1".to_string(), "2".to_string()],
        ..RunConfig::default()
    });

    assert!(matches!(result, Err(PorelabError::Decode { .. })));
    assert!(!output.path().join("summary.csv").exists());
}

#[test]
fn test_undecodable_non_target_is_skipped() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_pore_image(&input.path().join("1.png"));
    std::fs::write(input.path().join("2.png"), b"not a png").unwrap();

    let summary = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        methods: vec!["otsu".to_string()],
        ..RunConfig::default()
    })
    .unwrap();

    assert_eq!(summary.image_count(), 1);
    assert_eq!(summary.skipped_inputs.len(), 1);
    assert!(output.path().join("summary.csv").is_file());
}

#[test]
fn test_failed_write_discards_partial_masks() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    write_pore_image(&input.path().join("img3.png"));

    // A plain file where the yen mask directory belongs
    std::fs::create_dir_all(output.path().join("masks")).unwrap();
    std::fs::write(output.path().join("masks/yen"), b"").unwrap();

    let result = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        methods: vec!["otsu".to_string(), "yen".to_string()],
        ..RunConfig::default()
    });

    assert!(matches!(result, Err(PorelabError::Io { .. })));
    assert!(!output.path().join("masks/otsu/img3.png").exists());
    assert!(!output.path().join("panels/img3_panel.png").exists());
    assert!(!output.path().join("summary.csv").exists());
}

#[test]
fn test_duplicate_stems_abort_before_writing() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    std::fs::create_dir_all(input.path().join("a")).unwrap();
    std::fs::create_dir_all(input.path().join("b")).unwrap();
    write_pore_image(&input.path().join("a/img3.png"));
    write_flat_image(&input.path().join("b/img3.png"));

    let result = run(RunConfig {
        input_dir: input.path().to_path_buf(),
        output_dir: output.path().to_path_buf(),
        ..RunConfig::default()
    });

    assert!(matches!(result, Err(PorelabError::DuplicateStem { .. })));
    assert!(!output.path().join("masks").exists());
}

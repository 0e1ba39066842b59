//! Conversion command.

use anyhow::{Context, Result};
use idx_convert::{ConversionReport, ConvertConfig, Converter};

use crate::Cli;

pub fn run(cli: Cli) -> Result<()> {
    let config = ConvertConfig::builder(&cli.root_folder)
        .output_dir(&cli.output)
        .mode(cli.mode)
        .per_label(cli.count)
        .seed(cli.seed)
        .extensions(cli.extensions)
        .shape_policy(cli.on_shape_mismatch)
        .build();

    let report = Converter::new(config)
        .run()
        .with_context(|| format!("Failed to convert {}", cli.root_folder.display()))?;

    print_summary(&report, cli.verbose);

    if cli.verify {
        idx_convert::verify(&report).context("Verification of written files failed")?;
        println!("Verified {} files", report.files().count());
    }

    if let Some(manifest) = &cli.manifest {
        report
            .save(manifest)
            .with_context(|| format!("Failed to save manifest to {}", manifest.display()))?;
        println!("Saved manifest to: {}", manifest.display());
    }

    Ok(())
}

fn print_summary(report: &ConversionReport, verbose: bool) {
    println!("Converted {} (mode {}, seed {})", report.root.display(), report.mode, report.seed);
    println!("  Labels: {}", report.labels.len());
    if verbose {
        for label in &report.labels {
            println!(
                "    {} -> {}: {} of {} files ({} empty)",
                label.name, label.index, label.sampled, label.available, label.empty
            );
        }
    }
    println!("  Sampled: {}", report.sampled);
    println!("  Materialized: {}", report.materialized);
    if let Some(shape) = report.shape {
        println!("  Image shape: {shape}");
    }
    if !report.skipped.is_empty() {
        println!("  Skipped: {}", report.skipped.len());
        if verbose {
            for skipped in &report.skipped {
                println!("    {}: {}", skipped.path.display(), skipped.reason);
            }
        }
    }
    println!("  Train: {}", report.train_count());
    println!("  Test: {}", report.test_count());

    for file in report.files() {
        println!("  {}\t{} bytes\t{}", file.path.display(), file.bytes, file.checksum);
    }
}

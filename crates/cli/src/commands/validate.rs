//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::SinkConfig;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    queue: String,
    threads: usize,
    worker_count: usize,
    index_sink_count: usize,
    bucket_sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let (index_sinks, bucket_sinks) =
                blueprint
                    .workers
                    .iter()
                    .fold((0, 0), |(i, b), w| match w.destination {
                        SinkConfig::Index(_) => (i + 1, b),
                        SinkConfig::Bucket(_) => (i, b + 1),
                    });

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    queue: blueprint.work_queue.name.clone(),
                    threads: blueprint.param.threads,
                    worker_count: blueprint.workers.len(),
                    index_sink_count: index_sinks,
                    bucket_sink_count: bucket_sinks,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &contracts::EngineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.workers.is_empty() {
        warnings.push("No workers configured - every message will hit the unknown-bucket policy".to_string());
    }

    // Bucket destinations no worker consumes end the pipeline there
    for worker in &blueprint.workers {
        if let SinkConfig::Bucket(dest) = &worker.destination {
            let consumed = blueprint
                .workers
                .iter()
                .any(|w| w.source.bucket == dest.bucket);
            if !consumed {
                warnings.push(format!(
                    "Worker '{}' fans out to bucket '{}' which no worker consumes",
                    worker.name, dest.bucket
                ));
            }
        }
    }

    for worker in &blueprint.workers {
        if worker.delete_stale {
            warnings.push(format!(
                "Worker '{}' has stale-key deletion enabled",
                worker.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Queue: {}", summary.queue);
            println!("  Threads: {}", summary.threads);
            println!("  Workers: {}", summary.worker_count);
            println!(
                "  Destinations: {} index, {} bucket",
                summary.index_sink_count, summary.bucket_sink_count
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

//! `run` command implementation.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_engine(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(threads) = args.threads {
        info!(threads, "Overriding worker thread count from CLI");
        blueprint.param.threads = threads;
    }
    if args.drain {
        info!("Drain mode forced from CLI");
        blueprint.param.wait_forever = false;
    }
    if args.id.is_some() && blueprint.param.wait_forever {
        // One-shot reprocessing processes the seeded key and exits
        info!("One-shot id given, forcing drain mode");
        blueprint.param.wait_forever = false;
    }

    info!(
        queue = %blueprint.work_queue.name,
        workers = blueprint.workers.len(),
        threads = blueprint.param.threads,
        wait_forever = blueprint.param.wait_forever,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        one_shot_id: args.id.clone(),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    let pipeline = Pipeline::new(pipeline_config);

    // Setup graceful shutdown: first signal stops workers between messages
    let stop = CancellationToken::new();
    tokio::spawn({
        let stop = stop.clone();
        async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, stopping engine...");
            stop.cancel();
        }
    });

    info!("Starting engine...");
    let stats = pipeline
        .run(stop)
        .await
        .context("Engine execution failed")?;

    info!(
        processed = stats.snapshot.processed,
        committed = stats.snapshot.committed,
        rolled_back = stats.snapshot.rolled_back,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.rate()),
        "Engine completed"
    );
    stats.print_summary();

    info!("Blockflow finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::EngineBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Work queue: {}", blueprint.work_queue.name);
    println!(
        "Engine: {} thread(s), {}",
        blueprint.param.threads,
        if blueprint.param.wait_forever {
            "blocking mode"
        } else {
            "drain mode"
        }
    );
    println!(
        "Unknown buckets: {}",
        if blueprint.param.keep_unknown_on_queue {
            "keep on queue"
        } else {
            "drop"
        }
    );

    println!("\nWorkers ({}):", blueprint.workers.len());
    for worker in &blueprint.workers {
        println!(
            "  - {} : {} --[{}]--> {}",
            worker.name,
            worker.source.bucket,
            worker.transformer,
            worker.destination.identity()
        );
    }

    println!();
}

//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::SinkConfig;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    queue: QueueInfo,
    param: ParamInfo,
    workers: Vec<WorkerInfo>,
}

#[derive(Serialize)]
struct QueueInfo {
    name: String,
}

#[derive(Serialize)]
struct ParamInfo {
    threads: usize,
    wait_forever: bool,
    keep_unknown_on_queue: bool,
}

#[derive(Serialize)]
struct WorkerInfo {
    name: String,
    source_bucket: String,
    transformer: String,
    destination: DestinationInfo,
    delete_stale: bool,
}

#[derive(Serialize)]
struct DestinationInfo {
    kind: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    use_daily: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_queue_size: Option<usize>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Reading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let config_info = build_info(&blueprint);

    if args.json {
        let json = serde_json::to_string_pretty(&config_info)
            .context("Failed to serialize configuration info")?;
        println!("{}", json);
    } else {
        print_info(&config_info, args);
    }

    Ok(())
}

fn build_info(blueprint: &contracts::EngineBlueprint) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        queue: QueueInfo {
            name: blueprint.work_queue.name.clone(),
        },
        param: ParamInfo {
            threads: blueprint.param.threads,
            wait_forever: blueprint.param.wait_forever,
            keep_unknown_on_queue: blueprint.param.keep_unknown_on_queue,
        },
        workers: blueprint.workers.iter().map(worker_info).collect(),
    }
}

fn worker_info(worker: &contracts::WorkerConfig) -> WorkerInfo {
    let destination = match &worker.destination {
        SinkConfig::Bucket(cfg) => DestinationInfo {
            kind: "bucket".to_string(),
            name: cfg.bucket.clone(),
            use_daily: None,
            batch_size: None,
            max_queue_size: None,
        },
        SinkConfig::Index(cfg) => DestinationInfo {
            kind: "index".to_string(),
            name: cfg.index.clone(),
            use_daily: Some(cfg.use_daily),
            batch_size: Some(cfg.batch_size),
            max_queue_size: Some(cfg.max_queue_size),
        },
    };

    WorkerInfo {
        name: worker.name.clone(),
        source_bucket: worker.source.bucket.clone(),
        transformer: worker.transformer.clone(),
        destination,
        delete_stale: worker.delete_stale,
    }
}

fn print_info(config_info: &ConfigInfo, args: &InfoArgs) {
    println!("\n=== Configuration ===\n");
    println!("Version: {}", config_info.version);
    println!("Queue: {}", config_info.queue.name);
    println!(
        "Engine: {} thread(s), wait_forever={}, keep_unknown_on_queue={}",
        config_info.param.threads,
        config_info.param.wait_forever,
        config_info.param.keep_unknown_on_queue
    );

    println!("\nWorkers ({}):", config_info.workers.len());
    for worker in &config_info.workers {
        println!(
            "  - {} : {} --[{}]--> {} ({})",
            worker.name,
            worker.source_bucket,
            worker.transformer,
            worker.destination.name,
            worker.destination.kind
        );

        if args.workers {
            println!("      delete_stale: {}", worker.delete_stale);
        }

        if args.sinks {
            if let (Some(daily), Some(batch), Some(queue)) = (
                worker.destination.use_daily,
                worker.destination.batch_size,
                worker.destination.max_queue_size,
            ) {
                println!(
                    "      daily: {}, batch_size: {}, max_queue_size: {}",
                    daily, batch, queue
                );
            }
        }
    }

    println!();
}

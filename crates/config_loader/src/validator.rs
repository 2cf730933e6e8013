//! Configuration validation
//!
//! Rules:
//! - worker names unique
//! - queue name, bucket names, index names non-empty
//! - threads >= 1
//! - index sinks: batch_size >= 1, batch_size <= max_queue_size
//! - daily index sinks: at least one timestamp routing field

use std::collections::HashSet;

use contracts::{ContractError, EngineBlueprint, SinkConfig};

/// Validate an EngineBlueprint.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    validate_queue(blueprint)?;
    validate_param(blueprint)?;
    validate_worker_names(blueprint)?;
    validate_workers(blueprint)?;
    Ok(())
}

fn validate_queue(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    if blueprint.work_queue.name.is_empty() {
        return Err(ContractError::config_validation(
            "work_queue.name",
            "queue name cannot be empty",
        ));
    }
    Ok(())
}

fn validate_param(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    if blueprint.param.threads == 0 {
        return Err(ContractError::config_validation(
            "param.threads",
            "threads must be >= 1",
        ));
    }
    Ok(())
}

/// Worker name uniqueness
fn validate_worker_names(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for worker in &blueprint.workers {
        if worker.name.is_empty() {
            return Err(ContractError::config_validation(
                "workers[].name",
                "worker name cannot be empty",
            ));
        }
        if !seen.insert(&worker.name) {
            return Err(ContractError::config_validation(
                format!("workers[name={}]", worker.name),
                "duplicate worker name",
            ));
        }
    }
    Ok(())
}

fn validate_workers(blueprint: &EngineBlueprint) -> Result<(), ContractError> {
    for worker in &blueprint.workers {
        if worker.transformer.is_empty() {
            return Err(ContractError::config_validation(
                format!("workers[{}].transformer", worker.name),
                "transformer name cannot be empty",
            ));
        }
        if worker.source.bucket.is_empty() {
            return Err(ContractError::config_validation(
                format!("workers[{}].source.bucket", worker.name),
                "source bucket cannot be empty",
            ));
        }
        validate_destination(&worker.name, &worker.destination)?;
    }
    Ok(())
}

fn validate_destination(worker: &str, destination: &SinkConfig) -> Result<(), ContractError> {
    match destination {
        SinkConfig::Bucket(cfg) => {
            if cfg.bucket.is_empty() {
                return Err(ContractError::config_validation(
                    format!("workers[{worker}].destination.bucket"),
                    "destination bucket cannot be empty",
                ));
            }
        }
        SinkConfig::Index(cfg) => {
            if cfg.index.is_empty() {
                return Err(ContractError::config_validation(
                    format!("workers[{worker}].destination.index"),
                    "destination index cannot be empty",
                ));
            }
            if cfg.batch_size == 0 {
                return Err(ContractError::config_validation(
                    format!("workers[{worker}].destination.batch_size"),
                    "batch_size must be >= 1",
                ));
            }
            if cfg.batch_size > cfg.max_queue_size {
                return Err(ContractError::config_validation(
                    format!("workers[{worker}].destination.batch_size"),
                    format!(
                        "batch_size ({}) must be <= max_queue_size ({})",
                        cfg.batch_size, cfg.max_queue_size
                    ),
                ));
            }
            if cfg.use_daily && cfg.timestamp_fields.is_empty() {
                return Err(ContractError::config_validation(
                    format!("workers[{worker}].destination.timestamp_fields"),
                    "daily index requires at least one timestamp field",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        BucketSinkConfig, ConfigVersion, EngineParams, IndexSinkConfig, QueueConfig,
        WorkerConfig,
    };

    fn minimal_blueprint() -> EngineBlueprint {
        EngineBlueprint {
            version: ConfigVersion::V1,
            work_queue: QueueConfig { name: "etl".into() },
            param: EngineParams::default(),
            workers: vec![
                WorkerConfig {
                    name: "pulse2unittest".into(),
                    transformer: "line_split".into(),
                    delete_stale: false,
                    source: BucketSinkConfig::named("raw-pulse"),
                    destination: SinkConfig::Bucket(BucketSinkConfig::named("unittest-logs")),
                },
                WorkerConfig {
                    name: "unittest2es".into(),
                    transformer: "json_to_index".into(),
                    delete_stale: false,
                    source: BucketSinkConfig::named("unittest-logs"),
                    destination: SinkConfig::Index(IndexSinkConfig::named("unittest")),
                },
            ],
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_duplicate_worker_name() {
        let mut bp = minimal_blueprint();
        bp.workers.push(bp.workers[0].clone());
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("duplicate worker name"), "got: {err}");
    }

    #[test]
    fn test_zero_threads() {
        let mut bp = minimal_blueprint();
        bp.param.threads = 0;
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("threads"), "got: {err}");
    }

    #[test]
    fn test_empty_source_bucket() {
        let mut bp = minimal_blueprint();
        bp.workers[0].source.bucket = String::new();
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("source bucket"), "got: {err}");
    }

    #[test]
    fn test_batch_size_exceeds_queue() {
        let mut bp = minimal_blueprint();
        bp.workers[1].destination = SinkConfig::Index(IndexSinkConfig {
            batch_size: 5000,
            max_queue_size: 2000,
            ..IndexSinkConfig::named("unittest")
        });
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("batch_size"), "got: {err}");
    }

    #[test]
    fn test_daily_requires_timestamp_fields() {
        let mut bp = minimal_blueprint();
        bp.workers[1].destination = SinkConfig::Index(IndexSinkConfig {
            timestamp_fields: vec![],
            ..IndexSinkConfig::named("unittest")
        });
        let result = validate(&bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timestamp field"), "got: {err}");
    }
}

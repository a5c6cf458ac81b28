// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{ENV_GRAPH_OUTPUT, ENV_METRICS_OUTPUT, FALLBACK_MAX_CONCURRENCY};
use crate::errors::{ConfigError, FailureStrategy};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Engine configuration.
///
/// Controls how a build chain is executed: which executor runs it, how
/// failures are handled, and where the optional metrics report and DOT graph
/// are written. Every field has a default, so an empty file is valid.
///
/// # Fields
/// * `strategy` - Executor used to run the chain (defaults to `work_queue`)
/// * `failure_strategy` - How to handle step failures (defaults to `fail_fast`)
/// * `executor_options` - Executor tuning
/// * `metrics` - Metrics report output
/// * `graph_output` - Path of the DOT rendering of the chain
///
/// # Example
/// ```yaml
/// strategy: level
/// failure_strategy: continue_on_error
/// executor_options:
///   max_concurrency: 4
/// metrics:
///   output: target/metrics.json
/// graph_output: target/chain.dot
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: Strategy,
    pub failure_strategy: FailureStrategy,
    pub executor_options: ExecutorOptions,
    pub metrics: MetricsOptions,
    pub graph_output: Option<PathBuf>,
}

/// Executor used to run a chain.
///
/// # Variants
/// * `WorkQueue` - Dependency counting with a critical-path priority queue
/// * `Level` - Wave by wave, each wave in parallel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    WorkQueue,
    Level,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorOptions {
    /// Maximum number of step bodies running at once (defaults to available parallelism)
    pub max_concurrency: Option<usize>,
}

impl ExecutorOptions {
    /// Configured concurrency, or the platform's available parallelism.
    pub fn resolved_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_MAX_CONCURRENCY)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsOptions {
    /// Where the JSON metrics report is written; no report when unset
    pub output: Option<PathBuf>,
}

/// On-disk configuration format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl EngineConfig {
    /// Replaces output paths with the values of the override variables.
    ///
    /// `lookup` resolves a variable name; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty(ENV_METRICS_OUTPUT) {
            self.metrics.output = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty(ENV_GRAPH_OUTPUT) {
            self.graph_output = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor_options.max_concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "executor_options.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a configuration document without touching the environment.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<EngineConfig, ConfigError> {
    let cfg: EngineConfig = match format {
        // An empty YAML document is `null`, not an empty mapping
        ConfigFormat::Yaml if content.trim().is_empty() => EngineConfig::default(),
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Loads a YAML or TOML config file and applies the environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut cfg = parse_config(&content, format)?;
    cfg.apply_overrides(|name| std::env::var(name).ok());
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
strategy: level
failure_strategy: continue_on_error
executor_options:
  max_concurrency: 3
metrics:
  output: out/metrics.json
graph_output: out/chain.dot
"#;
        let cfg = parse_config(yaml, ConfigFormat::Yaml).unwrap();

        assert_eq!(cfg.strategy, Strategy::Level);
        assert_eq!(cfg.failure_strategy, FailureStrategy::ContinueOnError);
        assert_eq!(cfg.executor_options.max_concurrency, Some(3));
        assert_eq!(cfg.metrics.output, Some(PathBuf::from("out/metrics.json")));
        assert_eq!(cfg.graph_output, Some(PathBuf::from("out/chain.dot")));
    }

    #[test]
    fn parse_toml() {
        let toml = r#"
strategy = "work_queue"

[executor_options]
max_concurrency = 2
"#;
        let cfg = parse_config(toml, ConfigFormat::Toml).unwrap();

        assert_eq!(cfg.strategy, Strategy::WorkQueue);
        assert_eq!(cfg.failure_strategy, FailureStrategy::FailFast);
        assert_eq!(cfg.executor_options.resolved_concurrency(), 2);
        assert!(cfg.metrics.output.is_none());
    }

    #[test]
    fn empty_documents_use_defaults() {
        assert_eq!(
            parse_config("", ConfigFormat::Yaml).unwrap(),
            EngineConfig::default()
        );
        assert_eq!(
            parse_config("", ConfigFormat::Toml).unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let err = parse_config("executor_options:\n  max_concurrency: 0\n", ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = parse_config("strategy: reactive\n", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("a.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.json")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn overrides_replace_outputs() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_METRICS_OUTPUT, "/tmp/m.json"),
            (ENV_GRAPH_OUTPUT, "  "),
        ]);
        let mut cfg = EngineConfig {
            graph_output: Some(PathBuf::from("chain.dot")),
            ..EngineConfig::default()
        };

        cfg.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.metrics.output, Some(PathBuf::from("/tmp/m.json")));
        assert_eq!(cfg.graph_output, Some(PathBuf::from("chain.dot")));
    }
}

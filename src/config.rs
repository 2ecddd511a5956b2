//! Top-level run configurations for the two workloads.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::target::{
    validate_target, Target, DEFAULT_CONCURRENCY, DEFAULT_COUNT, DEFAULT_DURATION, DEFAULT_RPS,
};

/// Fixed-count workload: every target receives exactly `count` requests with
/// at most `concurrency` of them in flight at a time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StressConfig {
    pub targets: Vec<Target>,
    /// Total requests to make per target.
    pub count: u64,
    /// Concurrent requests per target.
    pub concurrency: u64,
    /// Suppress per-request progress lines.
    pub quiet: bool,
    /// Dump request, response metadata and body after each progress line.
    pub verbose: bool,
}

/// Time-boxed workload: every target receives `rps` requests per second for
/// `duration` seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub targets: Vec<Target>,
    /// Requests fired per second, per target.
    pub rps: u64,
    /// Benchmark length in seconds.
    pub duration: u64,
    pub quiet: bool,
    pub verbose: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            targets: vec![Target::default()],
            count: DEFAULT_COUNT,
            concurrency: DEFAULT_CONCURRENCY,
            quiet: false,
            verbose: false,
        }
    }
}

impl StressConfig {
    /// A config with package defaults, ready to run against one target.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.count == 0 {
            return Err(ConfigError::InvalidCount);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.concurrency > self.count {
            return Err(ConfigError::ConcurrencyExceedsCount);
        }
        for target in &self.targets {
            validate_target(target)?;
        }
        Ok(())
    }
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            targets: vec![Target::default()],
            rps: DEFAULT_RPS,
            duration: DEFAULT_DURATION,
            quiet: false,
            verbose: false,
        }
    }
}

impl BenchmarkConfig {
    /// A config with package defaults, ready to run against one target.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if self.rps == 0 {
            return Err(ConfigError::InvalidRps);
        }
        if self.duration == 0 {
            return Err(ConfigError::InvalidDuration);
        }
        for target in &self.targets {
            validate_target(target)?;
        }
        Ok(())
    }
}

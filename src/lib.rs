//! HTTP(S) and HTTP/2 load generator for performance and stress testing.
//!
//! Two workloads are supported: a fixed-count stress test (`count` requests
//! per target with bounded concurrency) and a time-boxed benchmark (`rps`
//! requests per second held for `duration` seconds). Per-request outcomes
//! stream to an opaque sink while the run is in flight; the collected stats
//! come back as one slice per target for reduction with
//! [`create_requests_stats`].
//!
//! # Example
//!
//! ```no_run
//! use pewpew::{create_requests_stats, create_text_summary, StressConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut cfg = StressConfig::new();
//!     cfg.targets[0].url = "http://localhost:8080".to_string();
//!     cfg.count = 100;
//!     cfg.concurrency = 10;
//!
//!     let results = pewpew::run_stress(cfg, std::io::stdout()).await?;
//!     for stats in &results {
//!         let summary = create_requests_stats(stats);
//!         println!("{}", create_text_summary(&summary));
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod dispatcher;
mod printer;
mod queue;
mod request;
mod runner;
mod util;
mod worker;

pub mod config;
pub mod error;
pub mod stats;
pub mod target;

pub use config::{BenchmarkConfig, StressConfig};
pub use runner::{run_benchmark, run_stress};
pub use stats::{create_requests_stats, create_text_summary, RequestStat, RequestStatSummary};
pub use target::{Target, TargetOptions};
pub use util::parse_key_val;

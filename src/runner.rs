//! Top-level drivers for the two workloads.
//!
//! Each target gets an independent worker group; groups share nothing but
//! the progress sink. The returned 2-D stats are indexed by the target's
//! position in the config, regardless of completion order.

use std::io::Write;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::client::create_client;
use crate::config::{BenchmarkConfig, StressConfig};
use crate::dispatcher::Dispatcher;
use crate::printer::Printer;
use crate::queue::create_request_queue;
use crate::stats::RequestStat;
use crate::worker::{run_ticket, run_worker};

/// Run a fixed-count stress test, streaming progress to `out`.
///
/// Every target receives exactly `count` requests with at most `concurrency`
/// in flight. Returns one stat slice per target once every group finishes.
pub async fn run_stress(
    cfg: StressConfig,
    out: impl Write + Send + 'static,
) -> Result<Vec<Vec<RequestStat>>> {
    cfg.validate().context("invalid configuration")?;
    let printer = Printer::new(Box::new(out));

    // Probe and prepare every target before any worker starts, so a broken
    // target aborts the whole run up front.
    let mut setups = Vec::with_capacity(cfg.targets.len());
    for target in &cfg.targets {
        let queue = create_request_queue(cfg.count, target, cfg.count as usize)
            .await
            .context("failed to create request with target configuration")?;
        let client = create_client(target).context("failed to create HTTP client")?;
        setups.push((queue, client));
    }

    let target_count = cfg.targets.len();
    printer.write_str(&format!(
        "Stress testing {target_count} target{}:\n",
        if target_count == 1 { "" } else { "s" },
    ));
    tracing::debug!(
        targets = target_count,
        count = cfg.count,
        concurrency = cfg.concurrency,
        "starting stress run"
    );

    let mut groups: JoinSet<(usize, Vec<RequestStat>)> = JoinSet::new();
    for (idx, (target, (queue, client))) in cfg.targets.iter().zip(setups).enumerate() {
        let printer = printer.clone();
        let url = target.url.clone();
        let (count, concurrency) = (cfg.count, cfg.concurrency);
        let (quiet, verbose) = (cfg.quiet, cfg.verbose);

        groups.spawn(async move {
            printer.write_str(&format!(
                "- Running {count} tests at {url}, {concurrency} at a time\n"
            ));

            let (stat_tx, mut stat_rx) = mpsc::unbounded_channel();
            let mut workers = JoinSet::new();
            for _ in 0..concurrency {
                workers.spawn(run_worker(
                    client.clone(),
                    queue.clone(),
                    stat_tx.clone(),
                    printer.clone(),
                    quiet,
                    verbose,
                ));
            }
            // Workers hold the only remaining senders; the channel closes
            // once they all finish draining the queue.
            drop(stat_tx);

            let mut stats = Vec::with_capacity(count as usize);
            while let Some(stat) = stat_rx.recv().await {
                stats.push(stat);
            }
            while workers.join_next().await.is_some() {}
            (idx, stats)
        });
    }

    collect_groups(groups, target_count).await
}

/// Run a time-boxed benchmark, streaming progress to `out`.
///
/// Every target receives `rps` requests per second for `duration` seconds.
/// A target is done once all `rps * duration` stats are in, which may be
/// after the nominal end of the window when the last batch is still in
/// flight.
pub async fn run_benchmark(
    cfg: BenchmarkConfig,
    out: impl Write + Send + 'static,
) -> Result<Vec<Vec<RequestStat>>> {
    cfg.validate().context("invalid configuration")?;
    let printer = Printer::new(Box::new(out));

    let total = cfg.rps * cfg.duration;
    let mut setups = Vec::with_capacity(cfg.targets.len());
    for target in &cfg.targets {
        // Rendezvous queue: building is amortized with dispatch.
        let queue = create_request_queue(total, target, 0)
            .await
            .context("failed to create request with target configuration")?;
        let client = create_client(target).context("failed to create HTTP client")?;
        setups.push((queue, client));
    }

    let target_count = cfg.targets.len();
    printer.write_str(&format!(
        "Benchmarking {target_count} target{}:\n",
        if target_count == 1 { "" } else { "s" },
    ));
    tracing::debug!(
        targets = target_count,
        rps = cfg.rps,
        duration = cfg.duration,
        "starting benchmark run"
    );

    let mut groups: JoinSet<(usize, Vec<RequestStat>)> = JoinSet::new();
    for (idx, (target, (queue, client))) in cfg.targets.iter().zip(setups).enumerate() {
        let printer = printer.clone();
        let url = target.url.clone();
        let (rps, duration) = (cfg.rps, cfg.duration);
        let (quiet, verbose) = (cfg.quiet, cfg.verbose);

        groups.spawn(async move {
            printer.write_str(&format!(
                "- Benchmarking {url} at {rps} RPS, for {duration} seconds\n"
            ));

            let (stat_tx, mut stat_rx) = mpsc::unbounded_channel();
            let ticket_printer = printer.clone();
            tokio::spawn(async move {
                Dispatcher::new(rps, duration)
                    .run(|| {
                        tokio::spawn(run_ticket(
                            client.clone(),
                            queue.clone(),
                            stat_tx.clone(),
                            ticket_printer.clone(),
                            quiet,
                            verbose,
                        ));
                    })
                    .await;
            });

            let mut stats = Vec::with_capacity(total as usize);
            while stats.len() < total as usize {
                match stat_rx.recv().await {
                    Some(stat) => stats.push(stat),
                    None => break,
                }
            }
            (idx, stats)
        });
    }

    collect_groups(groups, target_count).await
}

async fn collect_groups(
    mut groups: JoinSet<(usize, Vec<RequestStat>)>,
    target_count: usize,
) -> Result<Vec<Vec<RequestStat>>> {
    let mut results = vec![Vec::new(); target_count];
    while let Some(joined) = groups.join_next().await {
        let (idx, stats) = joined.context("target worker group failed")?;
        results[idx] = stats;
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::io;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::target::Target;

    const RESPONSE: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\n\r\nHello, world!";

    /// Minimal one-response-per-connection HTTP server for tests.
    async fn serve() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                    let _ = socket.write_all(RESPONSE).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{addr}")
    }

    fn refused_url() -> String {
        // Bind a port and drop it so connecting is refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    fn target(url: &str) -> Target {
        Target { url: url.to_string(), ..Target::default() }
    }

    #[tokio::test]
    async fn test_stress_rejects_invalid_config() {
        let cfg = StressConfig { count: 10, concurrency: 20, ..StressConfig::new() };
        assert!(run_stress(cfg, io::sink()).await.is_err());
    }

    #[tokio::test]
    async fn test_stress_aborts_on_unbuildable_target() {
        let mut cfg = StressConfig::new();
        cfg.targets = vec![Target {
            url: "http://localhost/[".to_string(),
            regex_url: true,
            ..Target::default()
        }];
        assert!(run_stress(cfg, io::sink()).await.is_err());
    }

    #[tokio::test]
    async fn test_stress_records_transport_errors() {
        let cfg = StressConfig {
            targets: vec![target(&refused_url())],
            count: 1,
            concurrency: 1,
            quiet: true,
            verbose: false,
        };
        let results = run_stress(cfg, io::sink()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 1);

        let stat = &results[0][0];
        assert!(stat.error.is_some());
        assert_eq!(stat.status_code, 0);
        assert_eq!(stat.data_transferred, 0);
    }

    #[tokio::test]
    async fn test_stress_default_config_shape() {
        // The default target points at http://localhost; whether or not
        // something is listening there, the run must produce a 1x10 result.
        let results = run_stress(StressConfig::new(), io::sink()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 10);
    }

    #[tokio::test]
    async fn test_stress_against_live_server() {
        let url = serve().await;
        let cfg = StressConfig {
            targets: vec![target(&url)],
            count: 10,
            concurrency: 2,
            quiet: true,
            verbose: false,
        };
        let results = run_stress(cfg, io::sink()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].len(), 10);
        for stat in &results[0] {
            assert!(stat.error.is_none(), "unexpected error: {:?}", stat.error);
            assert_eq!(stat.status_code, 200);
            assert!(stat.data_transferred > 0);
            assert!(stat.end_time >= stat.start_time);
        }
    }

    #[tokio::test]
    async fn test_stress_total_spans_all_targets() {
        let url_a = serve().await;
        let url_b = serve().await;
        let cfg = StressConfig {
            targets: vec![target(&url_a), target(&url_b)],
            count: 3,
            concurrency: 1,
            quiet: true,
            verbose: false,
        };
        let results = run_stress(cfg, io::sink()).await.unwrap();
        let flattened: usize = results.iter().map(Vec::len).sum();
        assert_eq!(flattened, 6);
    }

    #[tokio::test]
    async fn test_stress_writes_header_and_plan() {
        let url = serve().await;
        let (writer, buf) = shared_buf();
        let cfg = StressConfig {
            targets: vec![target(&url)],
            count: 2,
            concurrency: 1,
            quiet: true,
            verbose: false,
        };
        run_stress(cfg, writer).await.unwrap();

        let contents = String::from_utf8_lossy(&buf.lock()).into_owned();
        assert!(contents.contains("Stress testing 1 target:"));
        assert!(contents.contains(&format!("- Running 2 tests at {url}, 1 at a time")));
    }

    #[tokio::test]
    async fn test_benchmark_rejects_invalid_config() {
        let cfg = BenchmarkConfig { rps: 0, ..BenchmarkConfig::new() };
        assert!(run_benchmark(cfg, io::sink()).await.is_err());
    }

    #[tokio::test]
    async fn test_benchmark_two_targets() {
        let url_a = serve().await;
        let url_b = serve().await;
        let cfg = BenchmarkConfig {
            targets: vec![target(&url_a), target(&url_b)],
            rps: 1,
            duration: 1,
            quiet: true,
            verbose: false,
        };
        let results = run_benchmark(cfg, io::sink()).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[1].len(), 1);
        for stat in results.iter().flatten() {
            assert!(stat.error.is_none(), "unexpected error: {:?}", stat.error);
            assert_eq!(stat.status_code, 200);
        }
    }

    #[tokio::test]
    async fn test_benchmark_collects_late_completions() {
        // The window is one second but the batch completes whenever it
        // completes; the run must still account for every request.
        let url = serve().await;
        let cfg = BenchmarkConfig {
            targets: vec![target(&url)],
            rps: 5,
            duration: 1,
            quiet: true,
            verbose: false,
        };
        let results = run_benchmark(cfg, io::sink()).await.unwrap();
        assert_eq!(results[0].len(), 5);
    }

    fn shared_buf() -> (SharedBuf, std::sync::Arc<parking_lot::Mutex<Vec<u8>>>) {
        let buf = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        (SharedBuf { inner: buf.clone() }, buf)
    }

    struct SharedBuf {
        inner: std::sync::Arc<parking_lot::Mutex<Vec<u8>>>,
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

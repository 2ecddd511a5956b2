//! Per-target queue of prepared requests.

use flume::Receiver;

use crate::error::RequestError;
use crate::request::{build_request, PreparedRequest};
use crate::target::Target;

/// Lazily produce `count` prepared requests for one target.
///
/// One request is built up front as a probe so that configuration problems
/// (bad regex, unreadable body file, failing DNS) surface before any worker
/// starts. The remaining requests are built by a background task and
/// streamed through a bounded channel; each slot is built independently, so
/// regex-expanded URLs and bodies vary per request. The channel closing
/// signals that the queue is drained.
pub(crate) async fn create_request_queue(
    count: u64,
    target: &Target,
    capacity: usize,
) -> Result<Receiver<PreparedRequest>, RequestError> {
    build_request(target).await?;

    let (tx, rx) = flume::bounded(capacity);
    let target = target.clone();
    tokio::spawn(async move {
        for _ in 0..count {
            match build_request(&target).await {
                Ok(request) => {
                    if tx.send_async(request).await.is_err() {
                        // All receivers are gone.
                        break;
                    }
                }
                // The probe vetted this target; only per-slot generation can
                // still fail here. Drop the slot rather than kill the run.
                Err(err) => tracing::warn!(%err, "skipping request that failed to build"),
            }
        }
    });
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    #[tokio::test]
    async fn test_queue_yields_exactly_count_requests() {
        let queue = create_request_queue(5, &Target::default(), 5).await.unwrap();
        for _ in 0..5 {
            assert!(queue.recv_async().await.is_ok());
        }
        // Producer is done; the channel must now be closed.
        assert!(queue.recv_async().await.is_err());
    }

    #[tokio::test]
    async fn test_queue_probe_rejects_bad_target() {
        let target = Target {
            url: "http://localhost/[".to_string(),
            regex_url: true,
            ..Target::default()
        };
        assert!(create_request_queue(5, &target, 5).await.is_err());
    }

    #[tokio::test]
    async fn test_queue_regenerates_per_slot() {
        let target = Target {
            url: "http://localhost/[a-z]{8}".to_string(),
            regex_url: true,
            ..Target::default()
        };
        let queue = create_request_queue(8, &target, 8).await.unwrap();
        let mut paths = std::collections::HashSet::new();
        while let Ok(request) = queue.recv_async().await {
            paths.insert(request.url.path().to_string());
        }
        // Eight draws of eight random letters virtually never all collide.
        assert!(paths.len() > 1);
    }
}

//! Workers: drain a target's queue, execute requests and measure them.

use std::time::SystemTime;

use bytes::Bytes;
use flume::Receiver;
use reqwest::{Client, Request, Response, Version};
use tokio::sync::mpsc::UnboundedSender;

use crate::printer::Printer;
use crate::request::PreparedRequest;
use crate::stats::RequestStat;

/// What a successful exchange looked like on the wire, for verbose dumps.
pub(crate) struct VerboseDump {
    pub request: String,
    pub response: String,
    pub body: Bytes,
}

/// One cooperating worker of a target's pool.
///
/// Takes requests from the queue until it closes, reporting one stat per
/// attempt. Transport failures are recorded, never fatal.
pub(crate) async fn run_worker(
    client: Client,
    queue: Receiver<PreparedRequest>,
    stats: UnboundedSender<RequestStat>,
    printer: Printer,
    quiet: bool,
    verbose: bool,
) {
    while let Ok(request) = queue.recv_async().await {
        if !process_request(&client, &request, &stats, &printer, quiet, verbose).await {
            break;
        }
    }
}

/// Handle a single dispatched ticket: one queued request, one stat.
pub(crate) async fn run_ticket(
    client: Client,
    queue: Receiver<PreparedRequest>,
    stats: UnboundedSender<RequestStat>,
    printer: Printer,
    quiet: bool,
    verbose: bool,
) {
    if let Ok(request) = queue.recv_async().await {
        process_request(&client, &request, &stats, &printer, quiet, verbose).await;
    }
}

async fn process_request(
    client: &Client,
    request: &PreparedRequest,
    stats: &UnboundedSender<RequestStat>,
    printer: &Printer,
    quiet: bool,
    verbose: bool,
) -> bool {
    let (stat, dump) = execute_request(client, request).await;
    if !quiet {
        printer.print_stat(&stat);
        if verbose {
            if let Some(dump) = &dump {
                printer.print_verbose(&dump.request, &dump.response, &dump.body);
            }
        }
    }
    // A closed stat channel means the collector is gone.
    stats.send(stat).is_ok()
}

/// Execute one request, measuring timing and data volume.
///
/// The end timestamp is captured when the response head arrives; the body is
/// then always read to completion so received bytes are accurate and the
/// connection can be reused.
pub(crate) async fn execute_request(
    client: &Client,
    prepared: &PreparedRequest,
) -> (RequestStat, Option<VerboseDump>) {
    let url = prepared.url.to_string();
    let method = prepared.method.to_string();

    let start_time = SystemTime::now();
    let outcome = async {
        let request = prepared.to_request(client)?;
        let request_head = dump_request_head(&request);
        let sent = request_head.len() as u64
            + prepared.body.as_ref().map_or(0, |body| body.len() as u64);
        let response = client.execute(request).await?;
        Ok::<_, reqwest::Error>((request_head, sent, response))
    }
    .await;

    match outcome {
        Err(err) => {
            let duration = start_time.elapsed().unwrap_or_default();
            tracing::debug!(%err, %url, "request failed");
            let stat = RequestStat {
                proto: version_str(Version::HTTP_11).to_string(),
                url,
                method,
                start_time,
                end_time: start_time + duration,
                duration,
                status_code: 0,
                error: Some(err.to_string()),
                data_transferred: 0,
            };
            (stat, None)
        }
        Ok((request_head, sent, response)) => {
            let duration = start_time.elapsed().unwrap_or_default();
            let proto = version_str(response.version()).to_string();
            let status_code = response.status().as_u16();
            let response_head = dump_response_head(&response);
            let body = response.bytes().await.unwrap_or_default();
            let received = response_head.len() as u64 + body.len() as u64;

            let stat = RequestStat {
                proto,
                url,
                method,
                start_time,
                end_time: start_time + duration,
                duration,
                status_code,
                error: None,
                data_transferred: sent + received,
            };
            let dump = VerboseDump { request: request_head, response: response_head, body };
            (stat, Some(dump))
        }
    }
}

/// Serialize the outbound request line and headers, measuring sent head
/// bytes the same way they appear on the wire.
fn dump_request_head(request: &Request) -> String {
    use std::fmt::Write;

    let url = request.url();
    let mut head = String::new();
    match url.query() {
        Some(query) => {
            let _ = writeln!(head, "{} {}?{query} HTTP/1.1\r", request.method(), url.path());
        }
        None => {
            let _ = writeln!(head, "{} {} HTTP/1.1\r", request.method(), url.path());
        }
    }
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = writeln!(head, "Host: {host}:{port}\r");
            }
            None => {
                let _ = writeln!(head, "Host: {host}\r");
            }
        }
    }
    for (name, value) in request.headers() {
        let _ = writeln!(head, "{name}: {}\r", String::from_utf8_lossy(value.as_bytes()));
    }
    if let Some(body) = request.body().and_then(|body| body.as_bytes()) {
        let _ = writeln!(head, "Content-Length: {}\r", body.len());
    }
    head.push_str("\r\n");
    head
}

fn dump_response_head(response: &Response) -> String {
    use std::fmt::Write;

    let mut head = String::new();
    let _ = writeln!(head, "{} {}\r", version_str(response.version()), response.status());
    for (name, value) in response.headers() {
        let _ = writeln!(head, "{name}: {}\r", String::from_utf8_lossy(value.as_bytes()));
    }
    head.push_str("\r\n");
    head
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/?",
    }
}

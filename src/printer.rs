//! Serialized progress output shared by every worker of every target.

use std::io::Write;
use std::sync::Arc;

use crossterm::style::{Color, Stylize};
use parking_lot::Mutex;

use crate::stats::RequestStat;
use crate::util::IntoAdjustedByte;

/// A mutually-exclusive writer around an opaque byte sink.
///
/// One scoped lock guards each operation so lines from concurrent workers
/// never interleave. Write failures are swallowed: progress printing is
/// best-effort and must not fail a run.
#[derive(Clone)]
pub(crate) struct Printer {
    output: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Printer {
    pub(crate) fn new(output: Box<dyn Write + Send>) -> Self {
        Self { output: Arc::new(Mutex::new(output)) }
    }

    pub(crate) fn write_str(&self, s: &str) {
        let mut output = self.output.lock();
        let _ = output.write_all(s.as_bytes());
    }

    /// Print a colored single line per request stat.
    pub(crate) fn print_stat(&self, stat: &RequestStat) {
        let mut output = self.output.lock();
        match &stat.error {
            Some(err) => {
                let line = format!("Failed to make request: {err}");
                let _ = writeln!(output, "{}", line.with(Color::Red));
            }
            None => {
                let line = format!(
                    "{} {}\t{:.2} \t{} ms\t-> {} {}",
                    stat.proto,
                    stat.status_code,
                    stat.data_transferred.adjusted(),
                    stat.duration.as_millis(),
                    stat.method,
                    stat.url,
                );
                let _ = writeln!(output, "{}", line.with(status_color(stat.status_code)));
            }
        }
    }

    /// Dump the request head, response head and response body.
    pub(crate) fn print_verbose(&self, request: &str, response: &str, body: &[u8]) {
        let mut output = self.output.lock();
        let _ = writeln!(output, "Request:\n{request}");
        let _ = writeln!(output, "Response:\n{response}");
        let _ = writeln!(output, "Body:\n{}\n", String::from_utf8_lossy(body));
    }
}

/// The status class alone decides the line color: 1xx blue, 2xx green,
/// 3xx cyan, 4xx magenta, everything else (5xx and transport failures) red.
pub(crate) fn status_color(status_code: u16) -> Color {
    match status_code {
        100..=199 => Color::Blue,
        200..=299 => Color::Green,
        300..=399 => Color::Cyan,
        400..=499 => Color::Magenta,
        _ => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.inner.lock()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.inner.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn stat(status_code: u16, error: Option<&str>) -> RequestStat {
        RequestStat {
            proto: "HTTP/1.1".to_string(),
            url: "http://localhost".to_string(),
            method: "GET".to_string(),
            start_time: SystemTime::UNIX_EPOCH,
            end_time: SystemTime::UNIX_EPOCH + Duration::from_millis(5),
            duration: Duration::from_millis(5),
            status_code,
            error: error.map(str::to_string),
            data_transferred: if error.is_some() { 0 } else { 1234 },
        }
    }

    #[test]
    fn test_status_color_classes() {
        assert_eq!(status_color(100), Color::Blue);
        assert_eq!(status_color(101), Color::Blue);
        assert_eq!(status_color(200), Color::Green);
        assert_eq!(status_color(204), Color::Green);
        assert_eq!(status_color(301), Color::Cyan);
        assert_eq!(status_color(404), Color::Magenta);
        assert_eq!(status_color(500), Color::Red);
        assert_eq!(status_color(503), Color::Red);
        assert_eq!(status_color(0), Color::Red);
    }

    #[test]
    fn test_print_stat_line() {
        let buf = SharedBuf::default();
        let printer = Printer::new(Box::new(buf.clone()));
        printer.print_stat(&stat(200, None));

        let contents = buf.contents();
        assert!(contents.contains("HTTP/1.1 200"));
        assert!(contents.contains("5 ms"));
        assert!(contents.contains("-> GET http://localhost"));
        assert!(contents.contains("1.23 KB"));
    }

    #[test]
    fn test_print_stat_error_line() {
        let buf = SharedBuf::default();
        let printer = Printer::new(Box::new(buf.clone()));
        printer.print_stat(&stat(0, Some("connection refused")));

        assert!(buf.contents().contains("Failed to make request: connection refused"));
    }

    #[test]
    fn test_print_verbose_sections() {
        let buf = SharedBuf::default();
        let printer = Printer::new(Box::new(buf.clone()));
        printer.print_verbose("GET / HTTP/1.1", "HTTP/1.1 200 OK", b"hello");

        let contents = buf.contents();
        assert!(contents.contains("Request:\nGET / HTTP/1.1"));
        assert!(contents.contains("Response:\nHTTP/1.1 200 OK"));
        assert!(contents.contains("Body:\nhello"));
    }
}

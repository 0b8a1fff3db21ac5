//! Error log sink.
//!
//! Everything goes to a single text file that is only ever appended to.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

/// Install the global subscriber writing to `log_file`.
///
/// The returned guard flushes pending lines on drop, so keep it alive for the
/// life of the process.
pub fn init(log_file: &Path, level: Option<&str>) -> WorkerGuard {
    let dir = match log_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "error_log.txt".into());

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_max_level(
            level
                .and_then(|l| l.parse().ok())
                .unwrap_or(tracing::Level::ERROR),
        )
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .init();

    guard
}

/// Run `f` with events routed into a buffer and return what was written.
#[cfg(test)]
pub(crate) fn capture<F: FnOnce()>(f: F) -> String {
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let buffer = Buffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::ERROR)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

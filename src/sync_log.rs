//! Line-atomic logging shared by every worker thread.
//!
//! Each call composes the complete line into a local buffer first and then
//! writes it to the sink under a single mutex acquisition, so concurrent
//! writers never interleave mid-line. I/O failures are returned to the
//! caller, not swallowed.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Writes one complete line per call to the shared sink.
///
/// The sink is any `Write + Send` target: stdout for the binary, an
/// in-memory capture for tests.
pub struct SyncLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl SyncLog {
    /// A log writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new(sink: impl Write + Send + 'static) -> Self {
        SyncLog {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// A log paired with a capture handle that can read back everything
    /// written so far. The trace is the simulation's observable contract,
    /// so tests assert against this.
    pub fn captured() -> (Self, LogCapture) {
        let capture = LogCapture::default();
        let log = Self::new(CaptureWriter(Arc::clone(&capture.buf)));
        (log, capture)
    }

    /// Appends one line atomically. Call through the [`logln!`] macro.
    ///
    /// [`logln!`]: crate::logln
    pub fn line(&self, args: fmt::Arguments<'_>) -> io::Result<()> {
        let mut text = args.to_string();
        text.push('\n');
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log sink poisoned"))?;
        sink.write_all(text.as_bytes())?;
        sink.flush()
    }
}

impl fmt::Debug for SyncLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncLog").finish_non_exhaustive()
    }
}

/// Formats one log line and appends it to a [`SyncLog`], returning
/// `io::Result<()>`.
#[macro_export]
macro_rules! logln {
    ($log:expr, $($arg:tt)*) => {
        $log.line(format_args!($($arg)*))
    };
}

/// Cheaply clonable handle onto the bytes a captured [`SyncLog`] has written.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().expect("capture buffer poisoned");
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer poisoned"))?;
        inner.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

use std::fmt;
use std::fs::File;
use std::io::{self, Result as IoResult, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

type SharedTarget = Arc<Mutex<Box<dyn Write + Send>>>;

/// Swappable destination for log records.
///
/// Installed as the `env_logger` pipe target; every clone shares the same
/// destination, so `log_output` can redirect logging after the logger has
/// been initialised.
#[derive(Clone)]
pub struct LogSink {
    target: SharedTarget,
}

impl LogSink {
    /// Create a sink that writes to the provided destination.
    pub fn new(target: Box<dyn Write + Send>) -> Self {
        Self {
            target: Arc::new(Mutex::new(target)),
        }
    }

    /// Replace the destination for every clone of this sink.
    pub fn redirect(&self, target: Box<dyn Write + Send>) -> IoResult<()> {
        let mut guard = self.lock()?;
        guard.flush()?;
        *guard = target;
        Ok(())
    }

    /// Truncate or create `path` and send subsequent records there.
    pub fn redirect_to_file(&self, path: &Path) -> IoResult<()> {
        let file = File::create(path)?;
        self.redirect(Box::new(file))
    }

    /// Send subsequent records back to standard error.
    pub fn restore_stderr(&self) -> IoResult<()> {
        self.redirect(Box::new(io::stderr()))
    }

    fn lock(&self) -> IoResult<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.target
            .lock()
            .map_err(|_| io::Error::other("log sink lock poisoned"))
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(Box::new(io::stderr()))
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink").finish_non_exhaustive()
    }
}

impl Write for LogSink {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.lock()?.write(data)
    }

    fn flush(&mut self) -> IoResult<()> {
        self.lock()?.flush()
    }
}

/// Memory-backed writer for capturing directive and log output.
#[derive(Clone, Default)]
pub struct MemWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemWriter {
    /// Public constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: create writer and return (writer, handle).
    pub fn with_handle() -> (Self, Arc<Mutex<Vec<u8>>>) {
        let mw = MemWriter::new();
        let handle = Arc::clone(&mw.buf);
        (mw, handle)
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

//! Diagnostic logger passed explicitly to every component.
//!
//! Nothing here installs a process-wide subscriber. The binary builds one
//! `DiagnosticLogger` from its verbosity flag and hands a reference to the
//! orchestrator, which hands it on to every adapter call. Each message is
//! emitted through a private `tracing` dispatcher scoped to that call.

use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;

/// Verbosity-gated progress and error reporting.
///
/// A silent logger (verbosity 0) drops every message, so non-verbose runs
/// print nothing but the final JSON or the terminal error line.
///
/// # Security
/// Callers pass messages that identify targets by `host:port` only.
#[derive(Clone, Default)]
pub struct DiagnosticLogger {
    dispatch: Option<Dispatch>,
}

impl DiagnosticLogger {
    /// Creates a logger that discards everything.
    pub fn silent() -> Self {
        Self { dispatch: None }
    }

    /// Creates a logger writing to stderr.
    ///
    /// # Arguments
    /// * `verbosity` - 0=silent, 1=INFO, 2+=DEBUG
    ///
    /// # Example
    /// ```rust
    /// use dbenum_core::logging::DiagnosticLogger;
    ///
    /// let logger = DiagnosticLogger::new(1);
    /// assert!(logger.is_enabled());
    /// logger.info("probing 10.0.0.5:6379");
    /// ```
    pub fn new(verbosity: u8) -> Self {
        Self::with_writer(verbosity, std::io::stderr)
    }

    /// Creates a logger writing to an arbitrary `MakeWriter`.
    pub fn with_writer<W>(verbosity: u8, make_writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let Some(level) = level_for(verbosity) else {
            return Self::silent();
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(make_writer)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .without_time()
            .finish();

        Self {
            dispatch: Some(Dispatch::new(subscriber)),
        }
    }

    /// Creates a logger that records into memory, for inspecting output.
    pub fn capturing(verbosity: u8) -> (Self, CaptureBuffer) {
        let buffer = CaptureBuffer::default();
        let writer = buffer.clone();
        let logger = Self::with_writer(verbosity, move || writer.clone());
        (logger, buffer)
    }

    /// Returns true when messages are emitted at all.
    pub fn is_enabled(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Emits a progress line.
    pub fn info(&self, message: impl AsRef<str>) {
        if let Some(dispatch) = &self.dispatch {
            let message = message.as_ref();
            tracing::dispatcher::with_default(dispatch, || tracing::info!("{message}"));
        }
    }

    /// Emits a failure line.
    pub fn error(&self, message: impl AsRef<str>) {
        if let Some(dispatch) = &self.dispatch {
            let message = message.as_ref();
            tracing::dispatcher::with_default(dispatch, || tracing::error!("{message}"));
        }
    }

    /// Emits a detail line, only shown at verbosity 2 and above.
    pub fn debug(&self, message: impl AsRef<str>) {
        if let Some(dispatch) = &self.dispatch {
            let message = message.as_ref();
            tracing::dispatcher::with_default(dispatch, || tracing::debug!("{message}"));
        }
    }
}

impl std::fmt::Debug for DiagnosticLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticLogger")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Maps the CLI verbosity count to a maximum level.
fn level_for(verbosity: u8) -> Option<tracing::Level> {
    match verbosity {
        0 => None,
        1 => Some(tracing::Level::INFO),
        _ => Some(tracing::Level::DEBUG),
    }
}

/// Shared in-memory sink used by [`DiagnosticLogger::capturing`].
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    /// Returns everything written so far.
    pub fn contents(&self) -> String {
        let bytes = self
            .bytes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| std::io::Error::other("capture buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

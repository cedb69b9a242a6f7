//! Extraction options.

use std::sync::Arc;
use std::time::Duration;

use crate::Password;
use crate::format::Charset;
use crate::progress::{DEFAULT_POLL_INTERVAL, ProgressMonitor, ProgressSink};

/// Options for extraction operations.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use zipvault::{Charset, ExtractOptions};
///
/// let options = ExtractOptions::new()
///     .passphrase("secret")
///     .charset(Charset::Cp437)
///     .progress(|event| println!("{event:?}"))
///     .poll_interval(Duration::from_millis(250));
/// assert!(options.password.is_some());
/// ```
#[derive(Clone)]
pub struct ExtractOptions {
    /// Passphrase for encrypted entries.
    pub password: Option<Password>,
    /// Charset for entry names that do not carry the UTF-8 flag.
    pub charset: Charset,
    /// Remove the archive (every volume) once all entries are extracted.
    ///
    /// Honoured by [`extract`](crate::extract) and
    /// [`extract_all`](crate::extract_all), which close the archive first.
    /// [`ArchiveReader::extract`](crate::ArchiveReader::extract) leaves the
    /// archive in place.
    pub delete_archive_on_success: bool,
    /// Restore entry modification times on extracted files.
    pub preserve_modified_time: bool,
    /// Receiver of progress events.
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Monitor to update; a private one is used when unset.
    pub monitor: Option<ProgressMonitor>,
    /// Interval between `Handling` events.
    pub poll_interval: Duration,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            password: None,
            charset: Charset::default(),
            delete_archive_on_success: false,
            preserve_modified_time: true,
            progress: None,
            monitor: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("charset", &self.charset)
            .field("delete_archive_on_success", &self.delete_archive_on_success)
            .field("preserve_modified_time", &self.preserve_modified_time)
            .field("progress", &self.progress.is_some())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl ExtractOptions {
    /// Creates extraction options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the passphrase for encrypted entries. An empty passphrase is
    /// treated as none.
    pub fn passphrase(mut self, password: impl Into<Password>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Sets the charset for names without the UTF-8 flag.
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Removes the archive after a successful extraction.
    pub fn delete_archive_on_success(mut self, delete: bool) -> Self {
        self.delete_archive_on_success = delete;
        self
    }

    /// Sets whether modification times are restored.
    pub fn preserve_modified_time(mut self, preserve: bool) -> Self {
        self.preserve_modified_time = preserve;
        self
    }

    /// Sets the progress event receiver.
    pub fn progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// Uses an existing monitor, so another thread can observe it.
    pub fn monitor(mut self, monitor: ProgressMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Sets the interval between `Handling` events.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Result of an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractResult {
    /// Number of files extracted.
    pub entries_extracted: usize,
    /// Number of directory entries created.
    pub directories_created: usize,
    /// Total bytes written.
    pub bytes_extracted: u64,
    /// Whether the archive was removed afterwards.
    pub archive_deleted: bool,
}

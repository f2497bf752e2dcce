//! Progress notifications for packaging operations.
//!
//! Operations report progress to a [`PackagingObserver`] passed in by the
//! caller. Notifications are advisory: observers cannot influence control
//! flow and nothing they do is reported back.

use log::debug;
use std::cell::RefCell;
use std::fmt;
use std::io::Write;

/// The operation that emitted a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackagingOperation {
    /// Manifest extraction.
    ExtractManifest,
    /// Full package verification.
    VerifyPackage,
}

impl fmt::Display for PackagingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtractManifest => f.write_str("extract-manifest"),
            Self::VerifyPackage => f.write_str("verify-package"),
        }
    }
}

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// A step has started.
    Info,
    /// Detail useful when diagnosing a failure.
    Verbose,
    /// The operation completed.
    Success,
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingUpdate {
    /// The operation that emitted the update.
    pub operation: PackagingOperation,
    /// The update category.
    pub kind: UpdateKind,
    /// Human-readable text.
    pub message: String,
}

/// Receives progress notifications.
pub trait PackagingObserver {
    /// Handle one notification.
    fn on_update(&self, update: &PackagingUpdate);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PackagingObserver for NoopObserver {
    fn on_update(&self, _update: &PackagingUpdate) {}
}

/// Forwards each notification to zero or more observers, in order.
#[derive(Default)]
pub struct ObserverSet<'a> {
    observers: Vec<&'a dyn PackagingObserver>,
}

impl<'a> ObserverSet<'a> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    #[must_use]
    pub fn with(mut self, observer: &'a dyn PackagingObserver) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of observers in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether the set has no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl PackagingObserver for ObserverSet<'_> {
    fn on_update(&self, update: &PackagingUpdate) {
        for observer in &self.observers {
            observer.on_update(update);
        }
    }
}

/// How much a [`StreamObserver`] prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Nothing.
    Quiet,
    /// Info and success updates.
    #[default]
    Normal,
    /// Everything, including verbose detail.
    Verbose,
}

impl Verbosity {
    /// Derive the verbosity from `--quiet`/`--verbose` flags. Quiet wins.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, true) => Self::Verbose,
            (false, false) => Self::Normal,
        }
    }

    fn shows(self, kind: UpdateKind) -> bool {
        match self {
            Self::Quiet => false,
            Self::Normal => kind != UpdateKind::Verbose,
            Self::Verbose => true,
        }
    }
}

/// Writes notifications as lines to a stream, typically stderr.
pub struct StreamObserver<W: Write> {
    writer: RefCell<W>,
    verbosity: Verbosity,
}

impl<W: Write> StreamObserver<W> {
    /// Create an observer writing to `writer`.
    pub fn new(writer: W, verbosity: Verbosity) -> Self {
        Self {
            writer: RefCell::new(writer),
            verbosity,
        }
    }

    /// Consume the observer and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// A [`StreamObserver`] writing to standard error.
pub type StderrObserver = StreamObserver<std::io::Stderr>;

impl StderrObserver {
    /// Create an observer writing to standard error.
    #[must_use]
    pub fn stderr(verbosity: Verbosity) -> Self {
        Self::new(std::io::stderr(), verbosity)
    }
}

impl<W: Write> PackagingObserver for StreamObserver<W> {
    fn on_update(&self, update: &PackagingUpdate) {
        if !self.verbosity.shows(update.kind) {
            return;
        }
        // A re-entrant notification is dropped rather than panicking.
        let Ok(mut writer) = self.writer.try_borrow_mut() else {
            return;
        };
        if writeln!(writer, "{}", update.message).is_err() {
            // Best-effort output; ignore write failures.
        }
    }
}

/// Emits notifications for one operation, mirroring each to the log.
pub(crate) struct Notifier<'a> {
    operation: PackagingOperation,
    observer: &'a dyn PackagingObserver,
}

impl<'a> Notifier<'a> {
    pub(crate) fn new(operation: PackagingOperation, observer: &'a dyn PackagingObserver) -> Self {
        Self { operation, observer }
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        self.emit(UpdateKind::Info, message.into());
    }

    pub(crate) fn verbose(&self, message: impl Into<String>) {
        self.emit(UpdateKind::Verbose, message.into());
    }

    pub(crate) fn success(&self, message: impl Into<String>) {
        self.emit(UpdateKind::Success, message.into());
    }

    fn emit(&self, kind: UpdateKind, message: String) {
        debug!("[{}] {kind:?}: {message}", self.operation);
        self.observer.on_update(&PackagingUpdate {
            operation: self.operation,
            kind,
            message,
        });
    }
}

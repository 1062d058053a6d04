use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Faults raised by the vendor SDK behind a [`PlotterDriver`](crate::device::PlotterDriver).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("vendor library for {0} is not installed")]
    LibraryMissing(String),

    #[error("device handle already released")]
    Released,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("SDK error: {0}")]
    Sdk(String),
}

/// Errors returned by Session Controller operations.
///
/// Every variant maps onto exactly one [`ErrorKind`] so the façade can surface
/// a machine-checkable kind alongside the human-readable message.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Already connected")]
    AlreadyConnected,

    #[error("Not connected. Connect first.")]
    NotConnected,

    #[error("Failed to connect: No {0} device found")]
    DeviceNotFound(String),

    #[error("Invalid plotter type: {0}. Must be 'axidraw' or 'nextdraw'")]
    InvalidProfile(String),

    #[error("{0} library is not installed. Please install it to use {0} support.")]
    ProfileUnavailable(String),

    #[error("SVG content is required")]
    EmptyArtifact,

    #[error("Plot operation already in progress")]
    JobAlreadyRunning,

    #[error("No paused plot available")]
    NoPausedArtifact,

    #[error("Unknown command: {0}")]
    InvalidCommand(String),

    #[error("{0}")]
    MalformedArguments(String),

    #[error("Hardware failure: {0}")]
    HardwareFailure(#[from] DriverError),
}

/// Machine-checkable error kind carried on the wire next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    AlreadyConnected,
    NotConnected,
    DeviceNotFound,
    InvalidProfile,
    ProfileUnavailable,
    EmptyArtifact,
    JobAlreadyRunning,
    NoPausedArtifact,
    InvalidCommand,
    MalformedArguments,
    HardwareFailure,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::AlreadyConnected => ErrorKind::AlreadyConnected,
            SessionError::NotConnected => ErrorKind::NotConnected,
            SessionError::DeviceNotFound(_) => ErrorKind::DeviceNotFound,
            SessionError::InvalidProfile(_) => ErrorKind::InvalidProfile,
            SessionError::ProfileUnavailable(_) => ErrorKind::ProfileUnavailable,
            SessionError::EmptyArtifact => ErrorKind::EmptyArtifact,
            SessionError::JobAlreadyRunning => ErrorKind::JobAlreadyRunning,
            SessionError::NoPausedArtifact => ErrorKind::NoPausedArtifact,
            SessionError::InvalidCommand(_) => ErrorKind::InvalidCommand,
            SessionError::MalformedArguments(_) => ErrorKind::MalformedArguments,
            SessionError::HardwareFailure(_) => ErrorKind::HardwareFailure,
        }
    }
}

impl ErrorKind {
    /// Whether the fault lies with the request rather than the hardware.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ErrorKind::DeviceNotFound | ErrorKind::HardwareFailure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Errors raised by [`PlotctlClient`](crate::client::PlotctlClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with `success: false`.
    #[error("{message} ({kind})")]
    Rejected { kind: ErrorKind, message: String },

    /// The server answered with a status and body we could not interpret.
    #[error("server returned status {status}: {message}")]
    Unexpected { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Runs a teardown step whose failure must never block the caller.
///
/// The error is logged at `warn` and discarded.
pub fn best_effort<T>(what: &str, result: Result<T, DriverError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{what} failed: {err}");
            None
        }
    }
}

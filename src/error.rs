//! Unified error types for the BrewHMI firmware.
//!
//! Each subsystem has its own small `Copy` enum, and every one of them
//! converts into the firmware-wide [`Error`].  None of these are fatal:
//! the component that detects a failure handles it at its own boundary
//! and at most surfaces a short-lived status line.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Radio link send or peer management failed.
    Link(LinkError),
    /// An inbound radio frame or one of its tokens could not be decoded.
    Frame(FrameError),
    /// Profile store or profile exchange failure.
    Profile(ProfileError),
    /// The serial screen did not answer a request.
    Screen(ScreenError),
    /// Startup recovery of screen state failed.
    Display(DisplayError),
    /// Calibration or cleaning workflow failure.
    Workflow(WorkflowError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Profile(e) => write!(f, "profile: {e}"),
            Self::Screen(e) => write!(f, "screen: {e}"),
            Self::Display(e) => write!(f, "display: {e}"),
            Self::Workflow(e) => write!(f, "workflow: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The radio rejected an outbound frame.  Content is dropped, not retried.
    SendFailed,
    /// The radio refused to register the peer address.
    PeerRegistrationFailed,
    /// The link is administratively disabled.
    Disabled,
    /// No peer session is established.
    NotPaired,
    /// No application frame arrived within the peer timeout.
    PeerTimeout,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed => write!(f, "send failed"),
            Self::PeerRegistrationFailed => write!(f, "peer registration failed"),
            Self::Disabled => write!(f, "link disabled"),
            Self::NotPaired => write!(f, "not paired"),
            Self::PeerTimeout => write!(f, "peer timed out"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// A `|`-separated token had no `=`.
    MalformedToken,
    /// A frame length matched neither the pairing nor the application record.
    UnknownRecord(usize),
    /// A pairing record carried an unknown message kind.
    UnknownKind(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedToken => write!(f, "token without '='"),
            Self::UnknownRecord(len) => write!(f, "unknown record of {len} bytes"),
            Self::UnknownKind(kind) => write!(f, "unknown pairing kind {kind}"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

/// Why a profile exchange document was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseIssue {
    /// Not valid JSON, or the wrong shape (position of the failure).
    Syntax { line: usize, column: usize },
    /// Valid document without a single step.
    NoSteps,
    /// A slot-addressed document without a usable `id`.
    MissingId,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { line, column } => write!(f, "invalid JSON at {line}:{column}"),
            Self::NoSteps => write!(f, "profile has no steps"),
            Self::MissingId => write!(f, "missing or invalid id"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileError {
    /// An imported document could not be parsed.  No state was mutated.
    ImportParse(ParseIssue),
    /// No slot matched by name and none was free.  No state was mutated.
    StoreFull,
    /// Slot index outside `0..MAX_PROFILES`.
    InvalidSlot(usize),
    /// The addressed slot holds no profile.
    EmptySlot(usize),
    /// Persisting a record failed.
    Storage(StorageError),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportParse(issue) => write!(f, "import failed: {issue}"),
            Self::StoreFull => write!(f, "profile memory full"),
            Self::InvalidSlot(slot) => write!(f, "slot {slot} out of range"),
            Self::EmptySlot(slot) => write!(f, "slot {slot} is empty"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        Self::Profile(e)
    }
}

impl From<StorageError> for ProfileError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Screen / display errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenError {
    /// The screen answered with an error code or a sentinel value.
    NotReady,
    /// No complete response arrived in time.
    Timeout,
    /// The serial transport failed.
    Io,
}

impl fmt::Display for ScreenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "screen not ready"),
            Self::Timeout => write!(f, "screen response timeout"),
            Self::Io => write!(f, "serial I/O error"),
        }
    }
}

impl From<ScreenError> for Error {
    fn from(e: ScreenError) -> Self {
        Self::Screen(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// A bootstrap field never produced a valid value within its attempt budget.
    BootstrapFailed { field: &'static str },
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootstrapFailed { field } => write!(f, "bootstrap failed on {field}"),
        }
    }
}

impl From<DisplayError> for Error {
    fn from(e: DisplayError) -> Self {
        Self::Display(e)
    }
}

// ---------------------------------------------------------------------------
// Workflow errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowError {
    CalibrationTimeout,
    CleaningTimeout,
    /// The request needs a paired main controller.
    NotPaired,
    /// Another workflow (or the config portal) currently owns the status line.
    Busy,
    /// Weighing was requested without a positive reference weight.
    MissingReferenceWeight,
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CalibrationTimeout => write!(f, "calibration timed out"),
            Self::CleaningTimeout => write!(f, "cleaning timed out"),
            Self::NotPaired => write!(f, "main controller not paired"),
            Self::Busy => write!(f, "another workflow is active"),
            Self::MissingReferenceWeight => write!(f, "reference weight not set"),
        }
    }
}

impl From<WorkflowError> for Error {
    fn from(e: WorkflowError) -> Self {
        Self::Workflow(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_errors_convert_into_firmware_error() {
        let e: Error = LinkError::SendFailed.into();
        assert_eq!(e, Error::Link(LinkError::SendFailed));

        let e: Error = ProfileError::StoreFull.into();
        assert_eq!(e.to_string(), "profile: profile memory full");
    }

    #[test]
    fn storage_error_wraps_into_profile_error() {
        let e: ProfileError = StorageError::Full.into();
        assert_eq!(e, ProfileError::Storage(StorageError::Full));
    }

    #[test]
    fn parse_issue_reports_position() {
        let e = ProfileError::ImportParse(ParseIssue::Syntax { line: 1, column: 7 });
        assert_eq!(e.to_string(), "import failed: invalid JSON at 1:7");
    }
}

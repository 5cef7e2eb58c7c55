//! HID++ device sessions.
//!
//! Builds the stateful half of the protocol on top of `hidpp-protocol`:
//! a per-device session owning the synchronous transaction engine, the
//! inbound dispatch point, the deferred-init state machine, and the feature
//! command wrappers (root, device name, touchpad).
//!
//! The physical transport stays outside: callers plug in anything that can
//! push a raw report towards the device (see [`transport::RawHidTransport`])
//! and feed every inbound buffer to [`session::DeviceSession::handle_raw_event`].

pub mod features;
pub mod init;
pub mod session;
pub mod transport;

pub use init::InitState;
pub use session::{DeviceSession, DispatchOutcome, InitWorker, SessionBuilder, SessionConfig};
pub use transport::{DeviceBusyLock, RawHidTransport};

use thiserror::Error;

use hidpp_protocol::WireError;

/// Failures surfaced by session operations.
///
/// Inbound-path failures never show up here: an inbound frame of the wrong
/// size cannot be attributed to an outstanding request, so it is logged and
/// dropped instead. Lock contention inside deferred init is likewise absorbed
/// by the retry policy and only observable through the session's init state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HidppError {
    /// Framing failure building an outbound request.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The transport rejected the send; surfaced immediately, no waiting.
    #[error("transport send failed: {0}")]
    Transport(String),

    /// No matching answer arrived within the deadline.
    #[error("no matching answer within the deadline")]
    Timeout,

    /// The device answered with an error report instead of command output.
    #[error("device reported protocol error {code:#04x}")]
    Protocol {
        /// Device-defined error code (see `hidpp_protocol::ids::error_codes`).
        code: u8,
    },

    /// The device-specific init routine failed; the session stays
    /// uninitialized and is not retried automatically.
    #[error("device init failed: {0}")]
    InitFailed(String),
}

/// Convenience alias used throughout the crate.
pub type HidppResult<T> = Result<T, HidppError>;

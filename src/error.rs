//! Crate-wide error types.
//!
//! Each subsystem gets its own error enum so call sites can match on the
//! failure they actually care about; [`PeerConnectionError`] composes all of
//! them behind the opaque tags the public API promises.

use thiserror::Error;

/// Errors that can occur while validating a [`crate::config::Configuration`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two codecs were registered with the same payload type.
    #[error("duplicate payload type {0} in codec list")]
    DuplicatePayloadType(u8),

    /// A header extension URI was not in the set this crate understands.
    #[error("unsupported header extension: {0}")]
    UnsupportedHeaderExtension(String),

    /// The TOML configuration file could not be parsed.
    #[error("malformed configuration file: {0}")]
    MalformedFile(String),

    /// The configuration file could not be read from disk.
    #[error("failed to read configuration file: {0}")]
    Io(String),
}

/// Errors that can occur while rendering or applying SDP.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SdpError {
    /// The SDP text could not be parsed by the underlying `sdp` crate.
    #[error("malformed SDP: {0}")]
    Malformed(String),

    /// A remote media section referenced a codec this configuration does not
    /// support.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
}

/// Errors returned by the signaling state machine.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SignalingError {
    /// The requested `(source, type)` transition has no entry in the state
    /// table for the current state.
    #[error("invalid signaling transition")]
    InvalidTransition,
}

/// Top-level error surfaced through the public peer connection API.
///
/// Variants map 1:1 onto the opaque error tags the public API promises, so
/// callers can match on the tag while `std::error::Error::source` still
/// exposes the full chain for logging.
#[derive(Clone, Debug, Error)]
pub enum PeerConnectionError {
    /// Operation issued while the controller was in the wrong state for it.
    #[error("invalid state for this operation")]
    InvalidState,

    /// The signaling state machine rejected a `(source, type)` transition.
    #[error("invalid signaling transition: {0}")]
    InvalidTransition(#[from] SignalingError),

    /// A `SessionDescription` failed to parse or apply.
    #[error("invalid SDP: {0}")]
    InvalidSdp(#[from] SdpError),

    /// Configuration validation failed at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A codec referenced by the remote side is not supported locally.
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// `add_transceiver` was called with options that would panic
    /// `Transceiver::new` (e.g. `ssrc == rtx_ssrc`).
    #[error("invalid transceiver options: {0}")]
    InvalidTransceiverOptions(String),

    /// The peer connection (or the owning actor task) is closed.
    #[error("peer connection is closed")]
    Closed,
}

//! Core of a WebRTC peer-connection library: the JSEP/RFC 8829 signaling
//! state machine, RTP transceiver model and SDP m-line synthesis, and a
//! jitter buffer for RTP packet reordering.
//!
//! The ICE agent, DTLS/SRTP keying, RTP depayloading, and the signaling
//! transport are all external collaborators this crate only talks to
//! through narrow interfaces ([`ice::IceAgent`], [`sdp`]'s parser calls) —
//! see each module for the boundary it owns.

pub mod config;
pub mod direction;
pub mod error;
pub mod event_sink;
pub mod ice;
pub mod jitter_buffer;
pub mod peer_connection;
pub mod sdp;
pub mod signaling;
pub mod track;
pub mod transceiver;

pub use config::Configuration;
pub use error::PeerConnectionError;
pub use peer_connection::{PeerConnectionHandle, PeerEvent, SessionDescription};
pub use signaling::SignalingState;
pub use transceiver::Transceiver;

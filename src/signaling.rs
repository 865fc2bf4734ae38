//! JSEP/RFC 8829 §3.2 signaling state machine.

use crate::error::SignalingError;

/// `SessionDescription.type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// Which side originated a description being applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Local,
    Remote,
}

/// The six JSEP signaling states plus the implicit `closed` state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

impl SignalingState {
    /// Applies `(source, type)` to this state, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns [`SignalingError::InvalidTransition`] for any `(state, source,
    /// type)` triple not in the table. `Rollback` is always
    /// accepted and restores `Stable`, discarding any pending description on
    /// the rolled-back side; this crate keeps no description memory of its
    /// own before which side rollback must restore — that bookkeeping lives
    /// in `PeerConnection` state, not here.
    pub fn apply(self, source: Source, sdp_type: SdpType) -> Result<Self, SignalingError> {
        use SdpType::{Answer, Offer, Pranswer, Rollback};
        use Source::{Local, Remote};

        if self == Self::Closed {
            return Err(SignalingError::InvalidTransition);
        }

        if sdp_type == Rollback {
            return Ok(Self::Stable);
        }

        let next = match (self, source, sdp_type) {
            (Self::Stable, Local, Offer) => Self::HaveLocalOffer,
            (Self::Stable, Remote, Offer) => Self::HaveRemoteOffer,

            (Self::HaveLocalOffer, Local, Offer) => Self::HaveLocalOffer,
            (Self::HaveLocalOffer, Remote, Answer) => Self::Stable,
            (Self::HaveLocalOffer, Remote, Pranswer) => Self::HaveRemotePranswer,

            (Self::HaveRemoteOffer, Remote, Offer) => Self::HaveRemoteOffer,
            (Self::HaveRemoteOffer, Local, Answer) => Self::Stable,
            (Self::HaveRemoteOffer, Local, Pranswer) => Self::HaveLocalPranswer,

            (Self::HaveLocalPranswer, Local, Pranswer) => Self::HaveLocalPranswer,
            (Self::HaveLocalPranswer, Local, Answer) => Self::Stable,

            (Self::HaveRemotePranswer, Remote, Pranswer) => Self::HaveRemotePranswer,
            (Self::HaveRemotePranswer, Remote, Answer) => Self::Stable,

            _ => return Err(SignalingError::InvalidTransition),
        };

        Ok(next)
    }

    #[must_use]
    pub fn is_stable(self) -> bool {
        matches!(self, Self::Stable)
    }
}

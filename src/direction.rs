//! [`Direction`] of a [`crate::transceiver::Transceiver`].
//!
//! Modeled as a [`bitflags`] type over the `SEND`/`RECV` bits, the same shape
//! a `TransceiverDirection` bitflags type takes elsewhere in the WebRTC
//! ecosystem — `sendrecv` is simply `SEND | RECV`, and `enable`/`disable` compose by bit
//! operations instead of a match over four hand-written variants. `stopped`
//! is tracked separately (see [`crate::transceiver::Transceiver`]) since a
//! stopped transceiver is a terminal, non-renegotiable state that isn't one
//! of JSEP's four directions.

use bitflags::bitflags;

bitflags! {
    /// Which legs of a transceiver are active.
    pub struct Direction: u8 {
        /// Neither sending nor receiving.
        const INACTIVE = 0b00;
        /// Sending only.
        const SEND = 0b01;
        /// Receiving only.
        const RECV = 0b10;
    }
}

impl Direction {
    /// `sendrecv`, i.e. both legs active.
    #[must_use]
    pub fn send_recv() -> Self {
        Self::all()
    }

    /// Enables the given legs, leaving the others untouched.
    #[must_use]
    pub fn enable(self, legs: Self) -> Self {
        self | legs
    }

    /// Disables the given legs, leaving the others untouched.
    #[must_use]
    pub fn disable(self, legs: Self) -> Self {
        self - legs
    }

    /// `true` if this direction includes sending (`sendrecv`/`sendonly`).
    #[must_use]
    pub fn is_sending(self) -> bool {
        self.contains(Self::SEND)
    }

    /// `true` if this direction includes receiving (`sendrecv`/`recvonly`).
    #[must_use]
    pub fn is_receiving(self) -> bool {
        self.contains(Self::RECV)
    }

    /// JSEP/SDP attribute token for this direction (`a=<token>`).
    #[must_use]
    pub fn as_sdp_str(self) -> &'static str {
        match (self.is_sending(), self.is_receiving()) {
            (true, true) => "sendrecv",
            (true, false) => "sendonly",
            (false, true) => "recvonly",
            (false, false) => "inactive",
        }
    }

    /// Reconciles a local intent with a remote-offered direction, as
    /// `create_answer` does: the answer can only offer a leg the
    /// local side actually wants *and* the remote side offered the opposite
    /// leg of.
    #[must_use]
    pub fn reconcile_answer(local_intent: Self, remote_offered: Self) -> Self {
        let mut answer = Self::INACTIVE;
        if local_intent.is_sending() && remote_offered.is_receiving() {
            answer |= Self::SEND;
        }
        if local_intent.is_receiving() && remote_offered.is_sending() {
            answer |= Self::RECV;
        }
        answer
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sdp_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_composes_legs() {
        for (init, enable_leg, result) in &[
            (Direction::INACTIVE, Direction::SEND, Direction::SEND),
            (Direction::INACTIVE, Direction::RECV, Direction::RECV),
            (Direction::SEND, Direction::RECV, Direction::all()),
            (Direction::RECV, Direction::SEND, Direction::all()),
        ] {
            assert_eq!(init.enable(*enable_leg), *result);
        }
    }

    #[test]
    fn disable_composes_legs() {
        for (init, disable_leg, result) in &[
            (Direction::all(), Direction::SEND, Direction::RECV),
            (Direction::all(), Direction::RECV, Direction::SEND),
            (Direction::SEND, Direction::SEND, Direction::INACTIVE),
        ] {
            assert_eq!(init.disable(*disable_leg), *result);
        }
    }

    #[test]
    fn sdp_tokens_match_jsep() {
        assert_eq!(Direction::all().as_sdp_str(), "sendrecv");
        assert_eq!(Direction::SEND.as_sdp_str(), "sendonly");
        assert_eq!(Direction::RECV.as_sdp_str(), "recvonly");
        assert_eq!(Direction::INACTIVE.as_sdp_str(), "inactive");
    }

    #[test]
    fn reconcile_answer_inverts_remote_direction() {
        // Remote offered sendrecv, we only want to receive.
        let answer = Direction::reconcile_answer(Direction::RECV, Direction::all());
        assert_eq!(answer, Direction::RECV);

        // Remote offered recvonly (they only receive), we want sendrecv ->
        // we can only send.
        let answer = Direction::reconcile_answer(Direction::all(), Direction::RECV);
        assert_eq!(answer, Direction::SEND);
    }
}

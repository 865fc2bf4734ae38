//! The [`Transceiver`] model: pairs an optional send track
//! with a direction, mid, and two candidate SSRCs.

use crate::{
    config::{CodecParams, Configuration},
    direction::Direction,
    track::{MediaKind, MediaStreamTrack},
};

/// Synchronization source identifier (RFC 3550 §3).
pub type Ssrc = u32;

/// Per-kind RTX codec derivation rule: the retransmission payload type for a
/// primary codec of payload type `pt` is `pt + 1`. This is an allocation
/// scheme this crate owns; it assumes codec lists are built leaving room for
/// the paired RTX type, which callers constructing a [`Configuration`]
/// control.
fn rtx_payload_type_for(primary: u8) -> u8 {
    primary.wrapping_add(1)
}

/// A codec entry as negotiated on a transceiver, with its paired RTX entry
/// (if any) derived rather than stored, since RTX pairing is purely
/// mechanical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegotiatedCodec {
    pub payload_type: u8,
    pub mime_type: String,
    pub clock_rate: u32,
    pub channels: Option<u8>,
    pub sdp_fmtp_line: Option<String>,
    pub rtcp_feedback: Vec<String>,
}

impl From<&CodecParams> for NegotiatedCodec {
    fn from(c: &CodecParams) -> Self {
        Self {
            payload_type: c.payload_type,
            mime_type: c.mime_type.clone(),
            clock_rate: c.clock_rate,
            channels: c.channels,
            sdp_fmtp_line: c.sdp_fmtp_line.clone(),
            rtcp_feedback: c.rtcp_feedback.clone(),
        }
    }
}

impl NegotiatedCodec {
    /// The synthetic RTX codec entry paired with this primary codec.
    #[must_use]
    pub fn rtx_entry(&self) -> NegotiatedCodec {
        let prefix = self
            .mime_type
            .split('/')
            .next()
            .unwrap_or("video")
            .to_owned();
        NegotiatedCodec {
            payload_type: rtx_payload_type_for(self.payload_type),
            mime_type: format!("{prefix}/rtx"),
            clock_rate: self.clock_rate,
            channels: None,
            sdp_fmtp_line: Some(format!("apt={}", self.payload_type)),
            rtcp_feedback: vec![],
        }
    }
}

/// The local sender half of a transceiver: an optional attached track and
/// the SSRCs it would use if activated.
#[derive(Clone, Debug, Default)]
pub struct Sender {
    track: Option<MediaStreamTrack>,
    ssrc: Ssrc,
    rtx_ssrc: Option<Ssrc>,
}

impl Sender {
    #[must_use]
    pub fn track(&self) -> Option<&MediaStreamTrack> {
        self.track.as_ref()
    }

    #[must_use]
    pub fn ssrc(&self) -> Ssrc {
        self.ssrc
    }

    #[must_use]
    pub fn rtx_ssrc(&self) -> Option<Ssrc> {
        self.rtx_ssrc
    }

    pub fn set_track(&mut self, track: Option<MediaStreamTrack>) {
        self.track = track;
    }
}

/// Options accepted by [`Transceiver::new`].
#[derive(Clone, Debug, Default)]
pub struct TransceiverOptions {
    pub ssrc: Ssrc,
    pub rtx_ssrc: Ssrc,
    pub direction: Option<Direction>,
    pub codecs: Option<Vec<CodecParams>>,
}

/// A combination of one RTP sender and one RTP receiver sharing a `mid`.
#[derive(Clone, Debug)]
pub struct Transceiver {
    mid: Option<String>,
    kind: MediaKind,
    direction: Direction,
    stopped: bool,
    sender: Sender,
    codecs: Vec<NegotiatedCodec>,
    rtx_enabled: bool,
}

impl Transceiver {
    /// Creates a transceiver. `ssrc` must differ from `rtx_ssrc`; an RTX SSRC is only actually allocated when
    /// `config.rtx_enabled()` *and* the negotiated codec list contains a
    /// codec that pairs with one.
    ///
    /// # Panics
    ///
    /// Panics if `options.ssrc == options.rtx_ssrc` and both are non-zero —
    /// this is a caller programming error, not a runtime condition (no
    /// negotiation has happened yet to produce these values from untrusted
    /// input).
    #[must_use]
    pub fn new(
        kind: MediaKind,
        track: Option<MediaStreamTrack>,
        config: &Configuration,
        options: TransceiverOptions,
    ) -> Self {
        assert!(
            options.ssrc == 0 || options.ssrc != options.rtx_ssrc,
            "ssrc and rtx_ssrc must differ"
        );

        let source_codecs = options.codecs.as_deref().unwrap_or(match kind {
            MediaKind::Audio => config.audio_codecs(),
            MediaKind::Video => config.video_codecs(),
        });
        let codecs: Vec<NegotiatedCodec> = source_codecs.iter().map(NegotiatedCodec::from).collect();

        let rtx_enabled = config.rtx_enabled() && !codecs.is_empty();
        let rtx_ssrc = if rtx_enabled {
            Some(options.rtx_ssrc)
        } else {
            None
        };

        Self {
            mid: None,
            kind,
            direction: options.direction.unwrap_or_else(Direction::send_recv),
            stopped: false,
            sender: Sender {
                track,
                ssrc: options.ssrc,
                rtx_ssrc,
            },
            codecs,
            rtx_enabled,
        }
    }

    #[must_use]
    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub fn set_mid(&mut self, mid: String) {
        self.mid = Some(mid);
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        if self.stopped {
            Direction::INACTIVE
        } else {
            self.direction
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Replaces the negotiated codec list, e.g. after a renegotiation offers
    /// a different set, recomputing whether RTX stays enabled for it.
    pub fn set_codecs(&mut self, codecs: &[CodecParams], rtx_allowed: bool) {
        self.codecs = codecs.iter().map(NegotiatedCodec::from).collect();
        self.rtx_enabled = rtx_allowed && !self.codecs.is_empty();
        if !self.rtx_enabled {
            self.sender.rtx_ssrc = None;
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stops this transceiver. Stopped transceivers are never removed from
    /// the owning peer connection, only
    /// rendered as `inactive` and excluded from future negotiation intent.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    #[must_use]
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut Sender {
        &mut self.sender
    }

    #[must_use]
    pub fn codecs(&self) -> &[NegotiatedCodec] {
        &self.codecs
    }

    #[must_use]
    pub fn rtx_enabled(&self) -> bool {
        self.rtx_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn config(rtx: bool) -> Configuration {
        let mut features = HashSet::new();
        if rtx {
            features.insert(crate::config::Feature::Rtx);
        }
        Configuration::new(
            vec![],
            vec![],
            vec![CodecParams {
                payload_type: 96,
                mime_type: "video/VP8".into(),
                clock_rate: 90_000,
                channels: None,
                sdp_fmtp_line: None,
                rtcp_feedback: vec!["nack".into(), "goog-remb".into()],
            }],
            features,
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn rtx_only_allocated_when_enabled_and_codecs_present() {
        let cfg = config(true);
        let t = Transceiver::new(
            MediaKind::Video,
            None,
            &cfg,
            TransceiverOptions {
                ssrc: 1234,
                rtx_ssrc: 2345,
                ..Default::default()
            },
        );
        assert!(t.rtx_enabled());
        assert_eq!(t.sender().rtx_ssrc(), Some(2345));
    }

    #[test]
    fn rtx_not_allocated_when_disabled() {
        let cfg = config(false);
        let t = Transceiver::new(
            MediaKind::Video,
            None,
            &cfg,
            TransceiverOptions {
                ssrc: 1234,
                rtx_ssrc: 2345,
                ..Default::default()
            },
        );
        assert!(!t.rtx_enabled());
        assert_eq!(t.sender().rtx_ssrc(), None);
    }

    #[test]
    fn rtx_not_allocated_when_no_codecs() {
        let cfg = Configuration::new(vec![], vec![], vec![], {
            let mut f = HashSet::new();
            f.insert(crate::config::Feature::Rtx);
            f
        }, vec![])
        .unwrap();
        let t = Transceiver::new(
            MediaKind::Video,
            None,
            &cfg,
            TransceiverOptions {
                ssrc: 1234,
                rtx_ssrc: 2345,
                codecs: Some(vec![]),
                ..Default::default()
            },
        );
        assert!(!t.rtx_enabled());
    }

    #[test]
    fn stopped_transceiver_reports_inactive_direction() {
        let cfg = config(true);
        let mut t = Transceiver::new(MediaKind::Video, None, &cfg, TransceiverOptions::default());
        assert_eq!(t.direction(), Direction::send_recv());
        t.stop();
        assert_eq!(t.direction(), Direction::INACTIVE);
        assert!(t.is_stopped());
    }
}

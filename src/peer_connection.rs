//! The peer connection controller: a single-owner actor
//! that serializes every offer/answer/ICE operation through one mailbox.
//!
//! The actor owns a `Command` mailbox (`mpsc::UnboundedSender`/`Receiver`)
//! where each variant carries a `oneshot::Sender` reply channel, driven by a
//! `tokio::spawn`ed `PeerConnectionActor::run` loop. `PeerConnectionHandle`
//! is the cloneable, async-fn-shaped public API, the same "wrap the single
//! owned connection behind safe, cancellation-aware methods" shape a
//! browser's `RTCPeerConnection` binding presents to its caller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::config::Configuration;
use crate::direction::Direction;
use crate::error::{PeerConnectionError, SdpError};
use crate::event_sink::{self, EventReceiver, EventSender};
use crate::ice::{
    IceAgent, IceCandidateAttr, IceConnectionState, IceCredentials, IceEvent, IceRole,
};
use crate::jitter_buffer::{JitterBuffer, RtpPacket};
use crate::sdp::{self, SessionParams};
use crate::signaling::{SdpType as SignalingSdpType, SignalingState, Source};
use crate::track::MediaKind;
use crate::transceiver::{Transceiver, TransceiverOptions};

/// Default depth of the bounded owner event sink.
pub const DEFAULT_EVENT_SINK_CAPACITY: usize = 256;

/// A session description as exchanged over the signaling channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: WireSdpType,
    pub sdp: String,
}

impl SessionDescription {
    /// Serializes this description to the owner-facing wire JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (it never does for this
    /// type, but the fallible signature matches the rest of the wire-format
    /// API).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a description from its wire JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid [`SessionDescription`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Wire-facing `SessionDescription.type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireSdpType {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl From<WireSdpType> for Option<SignalingSdpType> {
    fn from(t: WireSdpType) -> Self {
        Some(match t {
            WireSdpType::Offer => SignalingSdpType::Offer,
            WireSdpType::Answer => SignalingSdpType::Answer,
            WireSdpType::Pranswer => SignalingSdpType::Pranswer,
            WireSdpType::Rollback => SignalingSdpType::Rollback,
        })
    }
}

/// Events pushed to the owner outside of the request/reply protocol.
#[derive(Clone, Debug)]
pub enum PeerEvent {
    IceCandidate(IceCandidateAttr),
    ConnectionStateChange(IceConnectionState),
    /// A remote m-line was matched (or newly created) with this `mid`.
    TrackAdded { mid: String, kind: MediaKind },
    /// Packets released from a receiving transceiver's jitter buffer.
    RtpReleased { mid: String, packets: Vec<RtpPacket> },
}

/// Options accepted by `create_offer`/`create_answer`. Empty
/// for now — no offer/answer options are defined beyond the transceiver set
/// already attached, but the type exists so the public API can grow
/// without a breaking signature change.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfferAnswerOptions;

enum Command {
    CreateOffer {
        reply: oneshot::Sender<Result<SessionDescription, PeerConnectionError>>,
    },
    CreateAnswer {
        reply: oneshot::Sender<Result<SessionDescription, PeerConnectionError>>,
    },
    SetLocalDescription {
        desc: SessionDescription,
        reply: oneshot::Sender<Result<(), PeerConnectionError>>,
    },
    SetRemoteDescription {
        desc: SessionDescription,
        reply: oneshot::Sender<Result<(), PeerConnectionError>>,
    },
    AddIceCandidate {
        candidate: String,
        reply: oneshot::Sender<Result<(), PeerConnectionError>>,
    },
    AddTransceiver {
        kind: MediaKind,
        options: TransceiverOptions,
        reply: oneshot::Sender<Result<(), PeerConnectionError>>,
    },
    InsertRtpPacket {
        mid: String,
        packet: RtpPacket,
        now_ms: u64,
        reply: oneshot::Sender<Result<(Vec<RtpPacket>, Option<u64>), PeerConnectionError>>,
    },
    HandleJitterTimeout {
        mid: String,
        now_ms: u64,
        reply: oneshot::Sender<Result<(Vec<RtpPacket>, Option<u64>), PeerConnectionError>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// A cloneable, async handle to a running [`PeerConnectionActor`].
#[derive(Clone)]
pub struct PeerConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: EventReceiver<PeerEvent>,
}

impl PeerConnectionHandle {
    /// Starts a peer connection actor task and returns its handle. Validates
    /// `config` and starts `ice_agent` in the controlled role, seeded with
    /// STUN URLs filtered from its servers.
    pub async fn start<A>(
        config: Configuration,
        ice_agent: A,
        ice_events: mpsc::UnboundedReceiver<IceEvent>,
        event_sink_capacity: usize,
    ) -> Result<Self, PeerConnectionError>
    where
        A: IceAgent + 'static,
    {
        let ice_agent = Arc::new(ice_agent);
        ice_agent
            .start(IceRole::Controlled, config.stun_urls())
            .await
            .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e.to_string())))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = event_sink::channel(event_sink_capacity);

        let actor = PeerConnectionActor {
            config,
            state: SignalingState::Stable,
            transceivers: Vec::new(),
            current_local_desc: None,
            current_remote_desc: None,
            pending_local_desc: None,
            pending_remote_desc: None,
            ice_agent,
            jitter_buffers: HashMap::new(),
            remote_offered_directions: HashMap::new(),
            events: event_tx,
            commands: command_rx,
            ice_events,
            session_id: rand_session_id(),
            session_version: 0,
            next_mid: 0,
            closed: false,
        };

        tokio::spawn(actor.run());

        Ok(Self {
            commands: command_tx,
            events: event_rx,
        })
    }

    async fn call<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R, PeerConnectionError>>) -> Command,
    ) -> Result<R, PeerConnectionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .map_err(|_| PeerConnectionError::Closed)?;
        reply_rx.await.map_err(|_| PeerConnectionError::Closed)?
    }

    pub async fn add_transceiver(
        &self,
        kind: MediaKind,
        options: TransceiverOptions,
    ) -> Result<(), PeerConnectionError> {
        self.call(|reply| Command::AddTransceiver { kind, options, reply }).await
    }

    pub async fn create_offer(
        &self,
        _options: OfferAnswerOptions,
    ) -> Result<SessionDescription, PeerConnectionError> {
        self.call(|reply| Command::CreateOffer { reply }).await
    }

    pub async fn create_answer(
        &self,
        _options: OfferAnswerOptions,
    ) -> Result<SessionDescription, PeerConnectionError> {
        self.call(|reply| Command::CreateAnswer { reply }).await
    }

    pub async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        self.call(|reply| Command::SetLocalDescription { desc, reply }).await
    }

    pub async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        self.call(|reply| Command::SetRemoteDescription { desc, reply }).await
    }

    /// Strips the leading `"candidate:"` token and forwards the remainder
    /// to the ICE agent.
    pub async fn add_ice_candidate(&self, candidate: &str) -> Result<(), PeerConnectionError> {
        let candidate = candidate
            .strip_prefix("candidate:")
            .unwrap_or(candidate)
            .to_owned();
        self.call(|reply| Command::AddIceCandidate { candidate, reply }).await
    }

    pub async fn insert_rtp_packet(
        &self,
        mid: impl Into<String>,
        packet: RtpPacket,
        now_ms: u64,
    ) -> Result<(Vec<RtpPacket>, Option<u64>), PeerConnectionError> {
        let mid = mid.into();
        self.call(|reply| Command::InsertRtpPacket { mid, packet, now_ms, reply }).await
    }

    pub async fn handle_jitter_timeout(
        &self,
        mid: impl Into<String>,
        now_ms: u64,
    ) -> Result<(Vec<RtpPacket>, Option<u64>), PeerConnectionError> {
        let mid = mid.into();
        self.call(|reply| Command::HandleJitterTimeout { mid, now_ms, reply }).await
    }

    /// Transitions to `closed`, stops the ICE agent, and drops
    /// transceivers.
    pub async fn close(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(Command::Close { reply: reply_tx }).is_ok() {
            let _ = reply_rx.await;
        }
    }

    /// Waits for the next event pushed to this connection's owner.
    pub async fn next_event(&self) -> PeerEvent {
        self.events.recv().await
    }

    /// Count of owner events dropped for mailbox overflow.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped_events()
    }
}

fn rand_session_id() -> u64 {
    uuid::Uuid::new_v4().as_u128() as u64
}

struct PeerConnectionActor<A: IceAgent> {
    config: Configuration,
    state: SignalingState,
    transceivers: Vec<Transceiver>,
    current_local_desc: Option<SessionDescription>,
    current_remote_desc: Option<SessionDescription>,
    pending_local_desc: Option<SessionDescription>,
    pending_remote_desc: Option<SessionDescription>,
    ice_agent: Arc<A>,
    jitter_buffers: HashMap<String, JitterBuffer>,
    /// Direction most recently offered by the remote side for each `mid`,
    /// captured while reconciling remote m-lines so `create_answer` can
    /// reconcile against what was actually offered instead of a constant.
    remote_offered_directions: HashMap<String, Direction>,
    events: EventSender<PeerEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    ice_events: mpsc::UnboundedReceiver<IceEvent>,
    session_id: u64,
    session_version: u64,
    next_mid: u32,
    closed: bool,
}

impl<A: IceAgent> PeerConnectionActor<A> {
    /// The actor's main loop: a single `select!` between the command
    /// mailbox and ICE events, giving causal FIFO ordering by construction.
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                ice_event = self.ice_events.recv() => {
                    match ice_event {
                        Some(event) => self.handle_ice_event(event),
                        None => {}
                    }
                }
            }
            if self.closed {
                break;
            }
        }
        debug!("peer connection actor loop exited");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::AddTransceiver { kind, options, reply } => {
                let result = self.add_transceiver(kind, options);
                let _ = reply.send(result);
            }
            Command::CreateOffer { reply } => {
                let result = self.create_offer().await;
                let _ = reply.send(result);
            }
            Command::CreateAnswer { reply } => {
                let result = self.create_answer().await;
                let _ = reply.send(result);
            }
            Command::SetLocalDescription { desc, reply } => {
                let result = self.set_local_description(desc).await;
                let _ = reply.send(result);
            }
            Command::SetRemoteDescription { desc, reply } => {
                let result = self.set_remote_description(desc).await;
                let _ = reply.send(result);
            }
            Command::AddIceCandidate { candidate, reply } => {
                let result = self
                    .ice_agent
                    .add_remote_candidate(IceCandidateAttr(candidate))
                    .await
                    .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e.to_string())));
                let _ = reply.send(result);
            }
            Command::InsertRtpPacket { mid, packet, now_ms, reply } => {
                let result = self.insert_rtp_packet(&mid, packet, now_ms);
                let _ = reply.send(result);
            }
            Command::HandleJitterTimeout { mid, now_ms, reply } => {
                let result = self.handle_jitter_timeout(&mid, now_ms);
                let _ = reply.send(result);
            }
            Command::Close { reply } => {
                self.close();
                let _ = reply.send(());
            }
        }
    }

    fn handle_ice_event(&mut self, event: IceEvent) {
        match event {
            IceEvent::NewCandidate(attr) => {
                trace!("new local ice candidate");
                self.events.push(PeerEvent::IceCandidate(attr));
            }
            IceEvent::StateChange(state) => {
                info!("ice connection state changed to {state:?}");
                if state == IceConnectionState::Failed {
                    warn!("ice connection failed, this is terminal");
                }
                self.events.push(PeerEvent::ConnectionStateChange(state));
            }
        }
    }

    fn add_transceiver(
        &mut self,
        kind: MediaKind,
        options: TransceiverOptions,
    ) -> Result<(), PeerConnectionError> {
        if self.closed {
            return Err(PeerConnectionError::Closed);
        }
        if options.ssrc != 0 && options.ssrc == options.rtx_ssrc {
            return Err(PeerConnectionError::InvalidTransceiverOptions(
                "ssrc and rtx_ssrc must differ".to_owned(),
            ));
        }
        self.transceivers.push(Transceiver::new(kind, None, &self.config, options));
        Ok(())
    }

    fn fresh_mid(&mut self) -> String {
        let mid = self.next_mid.to_string();
        self.next_mid += 1;
        mid
    }

    fn session_params(&self) -> SessionParams {
        SessionParams {
            ice_ufrag: "0000".to_owned(),
            ice_pwd: "000000000000000000000000".to_owned(),
            ice_options: None,
            fingerprint: ("sha-256".to_owned(), "00".to_owned()),
            setup: "actpass".to_owned(),
        }
    }

    async fn create_offer(&mut self) -> Result<SessionDescription, PeerConnectionError> {
        if self.closed {
            return Err(PeerConnectionError::Closed);
        }
        let creds = self
            .ice_agent
            .get_local_credentials()
            .await
            .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e.to_string())))?;

        let mut params = self.session_params();
        params.ice_ufrag = creds.ufrag;
        params.ice_pwd = creds.pwd;

        for i in 0..self.transceivers.len() {
            if self.transceivers[i].mid().is_none() {
                let mid = self.fresh_mid();
                self.transceivers[i].set_mid(mid);
            }
        }

        let media_descriptions = self
            .transceivers
            .iter()
            .map(|t| sdp::to_offer_mline(t, &params, t.mid().unwrap_or_default()))
            .collect();

        self.session_version += 1;
        let session = sdp::render_session(media_descriptions, self.session_id, self.session_version);
        let sdp_text = session.marshal();

        self.state = self
            .state
            .apply(Source::Local, crate::signaling::SdpType::Offer)
            .map_err(PeerConnectionError::from)?;

        let desc = SessionDescription {
            sdp_type: WireSdpType::Offer,
            sdp: sdp_text,
        };
        self.pending_local_desc = Some(desc.clone());
        Ok(desc)
    }

    async fn create_answer(&mut self) -> Result<SessionDescription, PeerConnectionError> {
        if !matches!(
            self.state,
            SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPranswer
        ) {
            return Err(PeerConnectionError::InvalidState);
        }

        let creds = self
            .ice_agent
            .get_local_credentials()
            .await
            .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e.to_string())))?;
        let mut params = self.session_params();
        params.ice_ufrag = creds.ufrag;
        params.ice_pwd = creds.pwd;

        for t in &mut self.transceivers {
            let remote_offered = t
                .mid()
                .and_then(|mid| self.remote_offered_directions.get(mid))
                .copied()
                .unwrap_or_else(Direction::send_recv);
            let reconciled = Direction::reconcile_answer(t.direction(), remote_offered);
            t.set_direction(reconciled);
        }

        let media_descriptions = self
            .transceivers
            .iter()
            .map(|t| sdp::to_offer_mline(t, &params, t.mid().unwrap_or_default()))
            .collect();

        self.session_version += 1;
        let session = sdp::render_session(media_descriptions, self.session_id, self.session_version);
        let sdp_text = session.marshal();

        self.state = self
            .state
            .apply(Source::Local, crate::signaling::SdpType::Answer)
            .map_err(PeerConnectionError::from)?;

        let desc = SessionDescription {
            sdp_type: WireSdpType::Answer,
            sdp: sdp_text,
        };
        self.current_local_desc = Some(desc.clone());
        self.pending_local_desc = None;
        Ok(desc)
    }

    async fn set_local_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        self.apply_description(Source::Local, desc).await
    }

    async fn set_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        self.apply_description(Source::Remote, desc).await
    }

    async fn apply_description(
        &mut self,
        source: Source,
        desc: SessionDescription,
    ) -> Result<(), PeerConnectionError> {
        if self.closed {
            return Err(PeerConnectionError::Closed);
        }

        let signaling_type: Option<crate::signaling::SdpType> = desc.sdp_type.into();
        let signaling_type = signaling_type.expect("WireSdpType always maps to a SdpType");

        if signaling_type == crate::signaling::SdpType::Rollback {
            self.state = self.state.apply(source, signaling_type).map_err(PeerConnectionError::from)?;
            match source {
                Source::Local => self.pending_local_desc = None,
                Source::Remote => self.pending_remote_desc = None,
            }
            return Ok(());
        }

        let next_state = self.state.apply(source, signaling_type).map_err(PeerConnectionError::from)?;

        let mut parsed: sdp::ParsedSession = sdp::parse(&desc.sdp)
            .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e)))?;

        self.state = next_state;

        if source == Source::Remote {
            if let Some(creds) = parsed.ice_credentials.take() {
                self.ice_agent
                    .set_remote_credentials(creds)
                    .await
                    .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e.to_string())))?;
            }
            self.ice_agent
                .gather_candidates()
                .await
                .map_err(|e| PeerConnectionError::InvalidSdp(SdpError::Malformed(e.to_string())))?;

            for section in &parsed.media_sections {
                if let Some((hash_fn, _)) = &section.fingerprint {
                    trace!("m-line {} carries a {hash_fn} DTLS fingerprint", section.mid);
                }
                self.reconcile_transceiver_for_remote_mline(section);
            }
        }

        match (source, self.state.is_stable()) {
            (Source::Local, true) => self.current_local_desc = Some(desc),
            (Source::Local, false) => self.pending_local_desc = Some(desc),
            (Source::Remote, true) => self.current_remote_desc = Some(desc),
            (Source::Remote, false) => self.pending_remote_desc = Some(desc),
        }

        Ok(())
    }

    fn reconcile_transceiver_for_remote_mline(&mut self, section: &sdp::ParsedMediaSection) {
        self.remote_offered_directions
            .insert(section.mid.clone(), section.direction);

        let existing = self
            .transceivers
            .iter()
            .position(|t| t.mid() == Some(section.mid.as_str()));

        match existing {
            Some(idx) => {
                let t = &mut self.transceivers[idx];
                let reconciled = Direction::reconcile_answer(t.direction(), section.direction);
                t.set_direction(reconciled);
                if !section.codecs.is_empty() {
                    t.set_codecs(&section.codecs, self.config.rtx_enabled());
                }
            }
            None => {
                let codecs = (!section.codecs.is_empty()).then(|| section.codecs.clone());
                let mut t = Transceiver::new(
                    section.kind,
                    None,
                    &self.config,
                    TransceiverOptions {
                        direction: Some(Direction::reconcile_answer(
                            Direction::send_recv(),
                            section.direction,
                        )),
                        codecs,
                        ..Default::default()
                    },
                );
                t.set_mid(section.mid.clone());
                self.transceivers.push(t);
                self.jitter_buffers
                    .insert(section.mid.clone(), JitterBuffer::new(crate::jitter_buffer::DEFAULT_LATENCY_MS));
                self.events.push(PeerEvent::TrackAdded {
                    mid: section.mid.clone(),
                    kind: section.kind,
                });
            }
        }
    }

    fn insert_rtp_packet(
        &mut self,
        mid: &str,
        packet: RtpPacket,
        now_ms: u64,
    ) -> Result<(Vec<RtpPacket>, Option<u64>), PeerConnectionError> {
        if self.closed {
            return Err(PeerConnectionError::Closed);
        }
        let buffer = self
            .jitter_buffers
            .entry(mid.to_owned())
            .or_insert_with(|| JitterBuffer::new(crate::jitter_buffer::DEFAULT_LATENCY_MS));
        let (released, next_timer) = buffer.insert(packet, now_ms);
        if !released.is_empty() {
            self.events.push(PeerEvent::RtpReleased {
                mid: mid.to_owned(),
                packets: released.clone(),
            });
        }
        Ok((released, next_timer))
    }

    fn handle_jitter_timeout(
        &mut self,
        mid: &str,
        now_ms: u64,
    ) -> Result<(Vec<RtpPacket>, Option<u64>), PeerConnectionError> {
        if self.closed {
            return Err(PeerConnectionError::Closed);
        }
        let buffer = self
            .jitter_buffers
            .entry(mid.to_owned())
            .or_insert_with(|| JitterBuffer::new(crate::jitter_buffer::DEFAULT_LATENCY_MS));
        let (released, next_timer) = buffer.handle_timeout(now_ms);
        if !released.is_empty() {
            self.events.push(PeerEvent::RtpReleased {
                mid: mid.to_owned(),
                packets: released.clone(),
            });
        }
        Ok((released, next_timer))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        info!("closing peer connection");
        self.state = SignalingState::Closed;
        self.transceivers.clear();
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ice::test_double::RecordingIceAgent;
    use std::collections::HashSet;

    fn config() -> Configuration {
        Configuration::new(vec![], vec![], vec![], HashSet::new(), vec![]).unwrap()
    }

    async fn started_handle() -> PeerConnectionHandle {
        let _ = env_logger::builder().is_test(true).try_init();
        let (_ice_tx, ice_rx) = mpsc::unbounded_channel();
        PeerConnectionHandle::start(
            config(),
            RecordingIceAgent::new(IceCredentials {
                ufrag: "abcd".into(),
                pwd: "0123456789abcdef01234567".into(),
            }),
            ice_rx,
            DEFAULT_EVENT_SINK_CAPACITY,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_offer_with_no_transceivers_still_produces_a_session_header() {
        let handle = started_handle().await;
        let offer = handle.create_offer(OfferAnswerOptions).await.unwrap();
        assert_eq!(offer.sdp_type, WireSdpType::Offer);
        assert!(offer.sdp.contains("v=0"));
        assert!(offer.sdp.contains("o=-"));
    }

    #[tokio::test]
    async fn create_answer_before_remote_offer_is_invalid_state() {
        let handle = started_handle().await;
        let err = handle.create_answer(OfferAnswerOptions).await.unwrap_err();
        assert!(matches!(err, PeerConnectionError::InvalidState));
    }

    #[tokio::test]
    async fn close_rejects_subsequent_operations() {
        let handle = started_handle().await;
        handle.close().await;
        let err = handle.create_offer(OfferAnswerOptions).await.unwrap_err();
        assert!(matches!(err, PeerConnectionError::Closed));
    }

    #[test]
    fn session_description_round_trips_through_json() {
        let desc = SessionDescription {
            sdp_type: WireSdpType::Offer,
            sdp: "v=0\r\n".to_owned(),
        };
        let json = desc.to_json().unwrap();
        assert_eq!(SessionDescription::from_json(&json).unwrap(), desc);
    }

    #[tokio::test]
    async fn add_ice_candidate_strips_prefix_and_forwards() {
        let handle = started_handle().await;
        handle
            .add_ice_candidate("candidate:foo 1 UDP 2 1.2.3.4 9 typ host")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn add_transceiver_rejects_colliding_ssrc_and_rtx_ssrc() {
        let handle = started_handle().await;
        let err = handle
            .add_transceiver(
                MediaKind::Video,
                TransceiverOptions {
                    ssrc: 555,
                    rtx_ssrc: 555,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PeerConnectionError::InvalidTransceiverOptions(_)));
    }

    fn remote_offer_with_direction(mid: &str, direction: Direction) -> SessionDescription {
        let cfg = Configuration::new(
            vec![],
            vec![],
            vec![crate::config::CodecParams {
                payload_type: 96,
                mime_type: "video/VP8".into(),
                clock_rate: 90_000,
                channels: None,
                sdp_fmtp_line: None,
                rtcp_feedback: vec!["nack".into()],
            }],
            HashSet::new(),
            vec![],
        )
        .unwrap();
        let mut t = Transceiver::new(
            MediaKind::Video,
            None,
            &cfg,
            TransceiverOptions {
                direction: Some(direction),
                ..Default::default()
            },
        );
        t.set_mid(mid.to_owned());
        let params = sdp::SessionParams {
            ice_ufrag: "abcd".to_owned(),
            ice_pwd: "0123456789abcdef01234567".to_owned(),
            ice_options: None,
            fingerprint: ("sha-256".to_owned(), "AB:CD".to_owned()),
            setup: "actpass".to_owned(),
        };
        let mline = sdp::to_offer_mline(&t, &params, mid);
        let session = sdp::render_session(vec![mline], 1, 1);
        SessionDescription {
            sdp_type: WireSdpType::Offer,
            sdp: session.marshal(),
        }
    }

    #[tokio::test]
    async fn create_answer_reconciles_against_actual_remote_offered_direction() {
        let handle = started_handle().await;
        let offer = remote_offer_with_direction("0", Direction::RECV);
        handle.set_remote_description(offer).await.unwrap();

        // The locally created transceiver defaults to sendrecv intent;
        // answering a remote recvonly offer can only send.
        let answer = handle.create_answer(OfferAnswerOptions).await.unwrap();
        assert!(answer.sdp.contains("a=sendonly"));
        assert!(!answer.sdp.contains("a=sendrecv"));
    }

    #[tokio::test]
    async fn renegotiation_updates_existing_transceiver_direction() {
        let handle = started_handle().await;
        handle
            .set_remote_description(remote_offer_with_direction("0", Direction::all()))
            .await
            .unwrap();
        let first_answer = handle.create_answer(OfferAnswerOptions).await.unwrap();
        assert!(first_answer.sdp.contains("a=sendrecv"));

        handle
            .set_remote_description(remote_offer_with_direction("0", Direction::RECV))
            .await
            .unwrap();
        let second_answer = handle.create_answer(OfferAnswerOptions).await.unwrap();
        assert!(second_answer.sdp.contains("a=sendonly"));
    }
}

//! SDP rendering: turns a [`Transceiver`] plus shared
//! session parameters into a `sdp::MediaDescription`, and stitches a set of
//! rendered m-lines into a full `sdp::SessionDescription`.
//!
//! Parsing/marshaling itself is delegated to the `sdp` crate; this module
//! only decides *which* attributes to attach and in what order, mirroring
//! the `add_transceiver_sdp`/`generate_session_description` shape used
//! elsewhere in the ecosystem for the same job.

use std::io::Cursor;

use sdp::description::common::{Address, ConnectionInformation};
use sdp::description::media::{MediaName, RangedPort};
use sdp::description::session::Origin;
use sdp::{MediaDescription, SessionDescription};

use crate::config::CodecParams;
use crate::direction::Direction;
use crate::ice::IceCredentials;
use crate::track::MediaKind;
use crate::transceiver::Transceiver;

/// Parameters shared by every m-line in one session.
#[derive(Clone, Debug)]
pub struct SessionParams {
    pub ice_ufrag: String,
    pub ice_pwd: String,
    pub ice_options: Option<String>,
    /// `(hash_fn, hex)`, e.g. `("sha-256", "AB:CD:...")`.
    pub fingerprint: (String, String),
    /// DTLS setup role token: `"actpass"`, `"active"`, or `"passive"`.
    pub setup: String,
}

/// Renders one transceiver into a JSEP-shaped media description.
///
/// `candidate_mid` is used only when the transceiver has not yet been
/// assigned a `mid`.
#[must_use]
pub fn to_offer_mline(
    transceiver: &Transceiver,
    session_params: &SessionParams,
    candidate_mid: &str,
) -> MediaDescription {
    let mid = transceiver.mid().unwrap_or(candidate_mid).to_owned();

    let mut media = MediaDescription {
        media_name: MediaName {
            media: transceiver.kind().as_sdp_str().to_owned(),
            port: RangedPort {
                value: 9,
                range: None,
            },
            protos: vec![
                "UDP".to_owned(),
                "TLS".to_owned(),
                "RTP".to_owned(),
                "SAVPF".to_owned(),
            ],
            formats: vec![],
        },
        media_title: None,
        connection_information: Some(ConnectionInformation {
            network_type: "IN".to_owned(),
            address_type: "IP4".to_owned(),
            address: Some(Address {
                address: "0.0.0.0".to_owned(),
                ttl: None,
                range: None,
            }),
        }),
        bandwidth: vec![],
        encryption_key: None,
        attributes: vec![],
    }
    .with_ice_credentials(session_params.ice_ufrag.clone(), session_params.ice_pwd.clone())
    .with_fingerprint(
        session_params.fingerprint.0.clone(),
        session_params.fingerprint.1.clone(),
    )
    .with_value_attribute("setup".to_owned(), session_params.setup.clone())
    .with_value_attribute("mid".to_owned(), mid);

    if let Some(options) = &session_params.ice_options {
        media = media.with_value_attribute("ice-options".to_owned(), options.clone());
    }

    media = media.with_property_attribute(transceiver.direction().as_sdp_str().to_owned());

    for codec in transceiver.codecs() {
        media = render_codec(media, codec.payload_type, &codec.mime_type, codec.clock_rate, codec.channels, codec.sdp_fmtp_line.as_deref(), &codec.rtcp_feedback);
        if transceiver.rtx_enabled() {
            let rtx = codec.rtx_entry();
            media = render_codec(media, rtx.payload_type, &rtx.mime_type, rtx.clock_rate, rtx.channels, rtx.sdp_fmtp_line.as_deref(), &rtx.rtcp_feedback);
        }
    }

    let has_sender_attrs = transceiver.direction().is_sending() && !transceiver.codecs().is_empty();
    if has_sender_attrs {
        media = render_sender_attributes(media, transceiver);
    }

    media
}

fn render_codec(
    media: MediaDescription,
    payload_type: u8,
    mime_type: &str,
    clock_rate: u32,
    channels: Option<u8>,
    fmtp: Option<&str>,
    rtcp_feedback: &[String],
) -> MediaDescription {
    let name = mime_type
        .rsplit('/')
        .next()
        .unwrap_or(mime_type)
        .to_owned();
    let mut media = media.with_codec(
        payload_type,
        name,
        clock_rate,
        u16::from(channels.unwrap_or(0)),
        fmtp.unwrap_or_default().to_owned(),
    );
    for feedback in rtcp_feedback {
        media = media.with_value_attribute(
            "rtcp-fb".to_owned(),
            format!("{payload_type} {feedback}"),
        );
    }
    media
}

/// Emits MSID/SSRC/SSRC-group attributes for a sending transceiver. Only
/// called once the direction+codec precondition has already been checked by
/// the caller.
fn render_sender_attributes(media: MediaDescription, transceiver: &Transceiver) -> MediaDescription {
    let sender = transceiver.sender();
    let primary_ssrc = sender.ssrc();
    let rtx_ssrc = sender.rtx_ssrc();

    let stream_ids: Vec<String> = sender
        .track()
        .map(|t| t.stream_ids().iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    let track_id = sender
        .track()
        .map(|t| t.id().to_string())
        .unwrap_or_else(|| "-".to_owned());

    let mut media = media;
    if stream_ids.is_empty() {
        media = media.with_property_attribute(format!("msid:- {track_id}"));
        media = emit_ssrc_msid(media, primary_ssrc, "-");
        if let Some(rtx) = rtx_ssrc {
            media = emit_ssrc_msid(media, rtx, "-");
        }
    } else {
        for stream_id in &stream_ids {
            media = media.with_property_attribute(format!("msid:{stream_id} {track_id}"));
        }
        for stream_id in &stream_ids {
            media = emit_ssrc_msid(media, primary_ssrc, stream_id);
        }
        if let Some(rtx) = rtx_ssrc {
            for stream_id in &stream_ids {
                media = emit_ssrc_msid(media, rtx, stream_id);
            }
        }
    }

    if let Some(rtx) = rtx_ssrc {
        media = media.with_value_attribute(
            "ssrc-group".to_owned(),
            format!("FID {primary_ssrc} {rtx}"),
        );
    }

    media
}

fn emit_ssrc_msid(media: MediaDescription, ssrc: u32, stream_id: &str) -> MediaDescription {
    media.with_value_attribute("ssrc".to_owned(), format!("{ssrc} msid:{stream_id}"))
}

/// Assembles a full offer/answer SDP from rendered m-lines.
#[must_use]
pub fn render_session(media_descriptions: Vec<MediaDescription>, session_id: u64, session_version: u64) -> SessionDescription {
    let mids: Vec<&str> = media_descriptions
        .iter()
        .flat_map(|m| m.attributes.iter())
        .filter(|a| a.key == "mid")
        .filter_map(|a| a.value.as_deref())
        .collect();

    // `SessionDescription::default()` already yields the fixed `v=0`/`s=-`/
    // `t=0 0` fields every offer/answer carries; only the parts
    // that vary per session get set explicitly here.
    let session = SessionDescription {
        origin: Origin {
            username: "-".to_owned(),
            session_id,
            session_version,
            network_type: "IN".to_owned(),
            address_type: "IP4".to_owned(),
            unicast_address: "127.0.0.1".to_owned(),
        },
        media_descriptions,
        ..Default::default()
    };

    session
        .with_value_attribute("group".to_owned(), format!("BUNDLE {}", mids.join(" ")))
        .with_value_attribute("msid-semantic".to_owned(), " WMS".to_owned())
}

/// A remote media section's negotiation-relevant attributes, extracted
/// from a parsed `SessionDescription`.
#[derive(Clone, Debug)]
pub struct ParsedMediaSection {
    pub mid: String,
    pub kind: MediaKind,
    pub direction: Direction,
    pub fingerprint: Option<(String, String)>,
    /// Codecs offered on this m-line, decoded from its `rtpmap`/`fmtp`/
    /// `rtcp-fb` attributes. Excludes RTX entries (`rtpmap` name `rtx`):
    /// this crate derives its own RTX pairing from the primary codec list
    /// rather than negotiating it independently.
    pub codecs: Vec<CodecParams>,
}

/// A parsed remote session description, reduced to what this crate's
/// negotiation logic consults.
#[derive(Clone, Debug)]
pub struct ParsedSession {
    pub ice_credentials: Option<IceCredentials>,
    pub media_sections: Vec<ParsedMediaSection>,
}

/// Parses SDP text via the `sdp` crate.
///
/// # Errors
///
/// Returns the underlying parser's error message on malformed SDP.
pub fn parse(text: &str) -> Result<ParsedSession, String> {
    let mut reader = Cursor::new(text.as_bytes());
    let parsed = SessionDescription::unmarshal(&mut reader).map_err(|e| e.to_string())?;

    let session_ice_credentials = extract_ice_credentials(&parsed.attributes);

    let media_sections = parsed
        .media_descriptions
        .iter()
        .map(|m| {
            let mid = m
                .attributes
                .iter()
                .find(|a| a.key == "mid")
                .and_then(|a| a.value.clone())
                .unwrap_or_default();

            let kind = match m.media_name.media.as_str() {
                "audio" => MediaKind::Audio,
                _ => MediaKind::Video,
            };

            let direction = direction_from_attributes(&m.attributes);

            let fingerprint = m
                .attributes
                .iter()
                .find(|a| a.key == "fingerprint")
                .and_then(|a| a.value.clone())
                .and_then(|v| v.split_once(' ').map(|(h, x)| (h.to_owned(), x.to_owned())));

            let codecs = parse_codecs(m, kind);

            ParsedMediaSection {
                mid,
                kind,
                direction,
                fingerprint,
                codecs,
            }
        })
        .collect();

    Ok(ParsedSession {
        ice_credentials: session_ice_credentials,
        media_sections,
    })
}

fn extract_ice_credentials(attributes: &[sdp::description::common::Attribute]) -> Option<IceCredentials> {
    let ufrag = attributes
        .iter()
        .find(|a| a.key == "ice-ufrag")
        .and_then(|a| a.value.clone())?;
    let pwd = attributes
        .iter()
        .find(|a| a.key == "ice-pwd")
        .and_then(|a| a.value.clone())?;
    Some(IceCredentials { ufrag, pwd })
}

/// Finds the value of the first attribute `key` whose value starts with
/// `"<payload_type> "`, returning the remainder after that prefix. Mirrors
/// the `"<pt> <rest>"` shape `render_codec`/`with_codec` emit for `rtpmap`,
/// `fmtp`, and `rtcp-fb`.
fn attribute_for_payload_type<'a>(
    attributes: &'a [sdp::description::common::Attribute],
    key: &str,
    payload_type: u8,
) -> Option<&'a str> {
    attributes.iter().find_map(|a| {
        if a.key != key {
            return None;
        }
        let value = a.value.as_deref()?;
        let (pt, rest) = value.split_once(' ')?;
        (pt.parse::<u8>().ok()? == payload_type).then_some(rest)
    })
}

/// Decodes the codec list offered on one m-line from its `rtpmap`/`fmtp`/
/// `rtcp-fb` attributes, skipping RTX entries (derived locally, never
/// negotiated independently).
fn parse_codecs(m: &MediaDescription, kind: MediaKind) -> Vec<CodecParams> {
    let mut codecs = Vec::new();

    for fmt in &m.media_name.formats {
        let Ok(payload_type) = fmt.parse::<u8>() else {
            continue;
        };
        let Some(rtpmap) = attribute_for_payload_type(&m.attributes, "rtpmap", payload_type) else {
            continue;
        };

        let mut parts = rtpmap.splitn(3, '/');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() || name.eq_ignore_ascii_case("rtx") {
            continue;
        }
        let clock_rate: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let channels: Option<u8> = parts.next().and_then(|s| s.parse().ok());

        let sdp_fmtp_line =
            attribute_for_payload_type(&m.attributes, "fmtp", payload_type).map(str::to_owned);

        let rtcp_feedback: Vec<String> = m
            .attributes
            .iter()
            .filter(|a| a.key == "rtcp-fb")
            .filter_map(|a| a.value.as_deref())
            .filter_map(|v| v.split_once(' '))
            .filter(|(pt, _)| pt.parse::<u8>() == Ok(payload_type))
            .map(|(_, rest)| rest.to_owned())
            .collect();

        codecs.push(CodecParams {
            payload_type,
            mime_type: format!("{}/{name}", kind.as_sdp_str()),
            clock_rate,
            channels,
            sdp_fmtp_line,
            rtcp_feedback,
        });
    }

    codecs
}

fn direction_from_attributes(attributes: &[sdp::description::common::Attribute]) -> Direction {
    for (token, direction) in [
        ("sendrecv", Direction::all()),
        ("sendonly", Direction::SEND),
        ("recvonly", Direction::RECV),
        ("inactive", Direction::INACTIVE),
    ] {
        if attributes.iter().any(|a| a.key == token) {
            return direction;
        }
    }
    Direction::all()
}

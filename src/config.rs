//! Immutable peer connection configuration.
//!
//! [`Configuration`] is validated once at construction and then handed by
//! value (cloned) into every [`crate::peer_connection`] it configures, the
//! same "copied into each peer connection, no cross-connection sharing"
//! rule the concurrency model requires.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A single `STUN`/`TURN` server description, handed to the ICE agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub credential: Option<String>,
}

impl IceServer {
    /// `true` for `stun:`/`stuns:` URLs, the subset the ICE agent is
    /// seeded with on [`super::peer_connection::PeerConnectionHandle::start`].
    #[must_use]
    pub fn is_stun(&self) -> bool {
        self.urls
            .iter()
            .any(|u| u.starts_with("stun:") || u.starts_with("stuns:"))
    }
}

/// Optional features a [`Configuration`] can turn on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// RTX (RFC 4588) retransmission payloads and SSRC-group synthesis.
    Rtx,
}

/// A single negotiable codec entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecParams {
    pub payload_type: u8,
    pub mime_type: String,
    pub clock_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub channels: Option<u8>,
    #[serde(default)]
    pub sdp_fmtp_line: Option<String>,
    #[serde(default)]
    pub rtcp_feedback: Vec<String>,
}

/// Wire/file-loadable shape of a [`Configuration`].
///
/// Carries exactly the same fields as [`Configuration`]; deserialized and
/// then funneled through [`Configuration::new`] so there is a single
/// validation routine regardless of how the configuration was constructed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    #[serde(default)]
    pub audio_codecs: Vec<CodecParams>,
    #[serde(default)]
    pub video_codecs: Vec<CodecParams>,
    #[serde(default)]
    pub features: HashSet<Feature>,
    #[serde(default)]
    pub header_extensions: Vec<String>,
}

/// Header extensions this crate knows how to negotiate.
const SUPPORTED_HEADER_EXTENSIONS: &[&str] = &[
    "urn:ietf:params:rtp-hdrext:sdes:mid",
    "urn:ietf:params:rtp-hdrext:ssrc-audio-level",
    "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
    "urn:3gpp:video-orientation",
];

/// Immutable, validated peer-connection configuration.
#[derive(Clone, Debug)]
pub struct Configuration {
    ice_servers: Vec<IceServer>,
    audio_codecs: Vec<CodecParams>,
    video_codecs: Vec<CodecParams>,
    features: HashSet<Feature>,
    header_extensions: Vec<String>,
}

impl Configuration {
    /// Validates and builds a [`Configuration`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicatePayloadType`] if `audio_codecs` or
    /// `video_codecs` (considered separately) contain two entries with the
    /// same payload type, or [`ConfigError::UnsupportedHeaderExtension`] if
    /// `header_extensions` names one this crate does not recognize.
    pub fn new(
        ice_servers: Vec<IceServer>,
        audio_codecs: Vec<CodecParams>,
        video_codecs: Vec<CodecParams>,
        features: HashSet<Feature>,
        header_extensions: Vec<String>,
    ) -> Result<Self, ConfigError> {
        Self::assert_unique_payload_types(&audio_codecs)?;
        Self::assert_unique_payload_types(&video_codecs)?;
        for ext in &header_extensions {
            if !SUPPORTED_HEADER_EXTENSIONS.contains(&ext.as_str()) {
                return Err(ConfigError::UnsupportedHeaderExtension(ext.clone()));
            }
        }

        Ok(Self {
            ice_servers,
            audio_codecs,
            video_codecs,
            features,
            header_extensions,
        })
    }

    fn assert_unique_payload_types(codecs: &[CodecParams]) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for codec in codecs {
            if !seen.insert(codec.payload_type) {
                return Err(ConfigError::DuplicatePayloadType(codec.payload_type));
            }
        }
        Ok(())
    }

    /// Loads and validates a [`Configuration`] from a TOML file already read
    /// into memory.
    pub fn from_toml_str(contents: &str) -> Result<Self, crate::error::PeerConnectionError> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| ConfigError::MalformedFile(e.to_string()))?;
        Self::new(
            file.ice_servers,
            file.audio_codecs,
            file.video_codecs,
            file.features,
            file.header_extensions,
        )
        .map_err(Into::into)
    }

    /// Reads and validates a [`Configuration`] from a TOML file on disk,
    /// funneling through the same [`Self::new`] validation as the
    /// programmatic constructor.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::error::PeerConnectionError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    #[must_use]
    pub fn ice_servers(&self) -> &[IceServer] {
        &self.ice_servers
    }

    #[must_use]
    pub fn audio_codecs(&self) -> &[CodecParams] {
        &self.audio_codecs
    }

    #[must_use]
    pub fn video_codecs(&self) -> &[CodecParams] {
        &self.video_codecs
    }

    #[must_use]
    pub fn header_extensions(&self) -> &[String] {
        &self.header_extensions
    }

    /// `true` if RTX retransmission is enabled for this configuration.
    #[must_use]
    pub fn rtx_enabled(&self) -> bool {
        self.features.contains(&Feature::Rtx)
    }

    /// STUN server URLs, the subset the ICE agent is seeded with.
    #[must_use]
    pub fn stun_urls(&self) -> Vec<String> {
        self.ice_servers
            .iter()
            .filter(|s| s.is_stun())
            .flat_map(|s| s.urls.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(pt: u8) -> CodecParams {
        CodecParams {
            payload_type: pt,
            mime_type: "audio/opus".into(),
            clock_rate: 48_000,
            channels: Some(2),
            sdp_fmtp_line: None,
            rtcp_feedback: vec![],
        }
    }

    #[test]
    fn rejects_duplicate_payload_types() {
        let err = Configuration::new(
            vec![],
            vec![codec(111), codec(111)],
            vec![],
            HashSet::new(),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicatePayloadType(111));
    }

    #[test]
    fn rejects_unknown_header_extension() {
        let err = Configuration::new(
            vec![],
            vec![],
            vec![],
            HashSet::new(),
            vec!["urn:made-up:extension".into()],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedHeaderExtension(_)));
    }

    #[test]
    fn rtx_enabled_reflects_feature_set() {
        let mut features = HashSet::new();
        features.insert(Feature::Rtx);
        let cfg = Configuration::new(vec![], vec![], vec![], features, vec![]).unwrap();
        assert!(cfg.rtx_enabled());

        let cfg = Configuration::new(vec![], vec![], vec![], HashSet::new(), vec![]).unwrap();
        assert!(!cfg.rtx_enabled());
    }

    #[test]
    fn stun_urls_filters_turn_entries() {
        let cfg = Configuration::new(
            vec![
                IceServer {
                    urls: vec!["stun:stun.example.com:3478".into()],
                    username: None,
                    credential: None,
                },
                IceServer {
                    urls: vec!["turn:turn.example.com:3478".into()],
                    username: Some("u".into()),
                    credential: Some("p".into()),
                },
            ],
            vec![],
            vec![],
            HashSet::new(),
            vec![],
        )
        .unwrap();
        assert_eq!(cfg.stun_urls(), vec!["stun:stun.example.com:3478"]);
    }

    #[test]
    fn from_toml_str_parses_codec_lists() {
        let toml = r#"
            [[audio_codecs]]
            payload_type = 111
            mime_type = "audio/opus"
            clock_rate = 48000
            channels = 2

            features = ["rtx"]
        "#;
        let cfg = Configuration::from_toml_str(toml).unwrap();
        assert_eq!(cfg.audio_codecs().len(), 1);
        assert_eq!(cfg.audio_codecs()[0].payload_type, 111);
        assert!(cfg.rtx_enabled());
    }

    #[test]
    fn from_toml_str_rejects_malformed_toml() {
        let err = Configuration::from_toml_str("not = [valid").unwrap_err();
        assert!(matches!(
            err,
            crate::error::PeerConnectionError::InvalidConfig(ConfigError::MalformedFile(_))
        ));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("crate-config-test-{:?}.toml", std::thread::current().id()));
        std::fs::write(&path, "audio_codecs = []\n").unwrap();
        let cfg = Configuration::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(cfg.audio_codecs().is_empty());
    }

    #[test]
    fn from_file_reports_io_error_for_missing_file() {
        let err = Configuration::from_file("/nonexistent/path/to/config.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::PeerConnectionError::InvalidConfig(ConfigError::Io(_))
        ));
    }
}

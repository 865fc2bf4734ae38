//! The ICE agent boundary: treated as an external collaborator
//! with a specified interface only. Modeled as an `async_trait` so unit
//! tests can swap in a double instead of driving real connectivity checks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The controlling/controlled role an ICE agent starts in (ICE-lite is out
/// of scope for this crate; the peer connection always starts its agent
/// `Controlled`, mirroring a client answering into an SFU-style offerer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IceRole {
    Controlling,
    Controlled,
}

/// Local or remote ICE credentials (ufrag/pwd pair).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCredentials {
    pub ufrag: String,
    pub pwd: String,
}

/// A single candidate attribute, already stripped of the leading
/// `"candidate:"` token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateAttr(pub String);

/// The owner-facing candidate message schema exchanged over the
/// application's signaling transport: `{candidate, sdp_mid,
/// sdp_m_line_index, username_fragment?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IceCandidateMessage {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username_fragment: Option<String>,
}

impl IceCandidateMessage {
    /// Builds the full `"candidate:<attr>"` line message for a given `mid`.
    #[must_use]
    pub fn new(attr: &IceCandidateAttr, sdp_mid: String, sdp_m_line_index: u16) -> Self {
        Self {
            candidate: format!("candidate:{}", attr.0),
            sdp_mid: Some(sdp_mid),
            sdp_m_line_index: Some(sdp_m_line_index),
            username_fragment: None,
        }
    }

    /// Serializes this message to its wire JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (it never does for this type,
    /// but the fallible signature matches the rest of the wire-format API).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a candidate message from its wire JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid [`IceCandidateMessage`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// High-level connectivity states an `IceAgent` reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

/// Events an `IceAgent` emits asynchronously.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IceEvent {
    NewCandidate(IceCandidateAttr),
    StateChange(IceConnectionState),
}

/// Errors an `IceAgent` implementation can surface to its caller.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum IceAgentError {
    #[error("ice agent transport error: {0}")]
    Transport(String),
}

/// The external ICE agent interface this crate consumes.
///
/// Implementations drive real candidate gathering and connectivity checks;
/// this crate only calls these methods and reacts to the events they push
/// onto whatever channel the implementation wires up separately — the trait
/// itself is request/response only.
#[async_trait]
pub trait IceAgent: Send + Sync {
    async fn start(&self, role: IceRole, stun_servers: Vec<String>) -> Result<(), IceAgentError>;

    async fn get_local_credentials(&self) -> Result<IceCredentials, IceAgentError>;

    async fn set_remote_credentials(&self, creds: IceCredentials) -> Result<(), IceAgentError>;

    async fn gather_candidates(&self) -> Result<(), IceAgentError>;

    async fn add_remote_candidate(&self, attr: IceCandidateAttr) -> Result<(), IceAgentError>;
}

#[cfg(test)]
pub mod test_double {
    use super::*;
    use std::sync::Mutex;

    /// A deterministic [`IceAgent`] double recording calls for assertions.
    #[derive(Default)]
    pub struct RecordingIceAgent {
        pub local_credentials: IceCredentials,
        pub calls: Mutex<Vec<String>>,
    }

    impl RecordingIceAgent {
        #[must_use]
        pub fn new(local_credentials: IceCredentials) -> Self {
            Self {
                local_credentials,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl Default for IceCredentials {
        fn default() -> Self {
            Self {
                ufrag: "0000".to_owned(),
                pwd: "000000000000000000000000".to_owned(),
            }
        }
    }

    #[async_trait]
    impl IceAgent for RecordingIceAgent {
        async fn start(&self, _role: IceRole, _stun_servers: Vec<String>) -> Result<(), IceAgentError> {
            self.calls.lock().unwrap().push("start".to_owned());
            Ok(())
        }

        async fn get_local_credentials(&self) -> Result<IceCredentials, IceAgentError> {
            self.calls.lock().unwrap().push("get_local_credentials".to_owned());
            Ok(self.local_credentials.clone())
        }

        async fn set_remote_credentials(&self, _creds: IceCredentials) -> Result<(), IceAgentError> {
            self.calls.lock().unwrap().push("set_remote_credentials".to_owned());
            Ok(())
        }

        async fn gather_candidates(&self) -> Result<(), IceAgentError> {
            self.calls.lock().unwrap().push("gather_candidates".to_owned());
            Ok(())
        }

        async fn add_remote_candidate(&self, attr: IceCandidateAttr) -> Result<(), IceAgentError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add_remote_candidate:{}", attr.0));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_double::RecordingIceAgent;
    use super::*;

    #[test]
    fn candidate_message_round_trips_through_json() {
        let attr = IceCandidateAttr("foo 1 UDP 2 1.2.3.4 9 typ host".into());
        let message = IceCandidateMessage::new(&attr, "0".into(), 0);
        let json = message.to_json().unwrap();
        assert_eq!(IceCandidateMessage::from_json(&json).unwrap(), message);
    }

    #[tokio::test]
    async fn recording_double_tracks_call_order() {
        let agent = RecordingIceAgent::new(IceCredentials {
            ufrag: "abcd".into(),
            pwd: "0123456789abcdef01234567".into(),
        });
        agent.start(IceRole::Controlled, vec![]).await.unwrap();
        agent.gather_candidates().await.unwrap();
        agent
            .add_remote_candidate(IceCandidateAttr("foo 1 UDP 2 1.2.3.4 9 typ host".into()))
            .await
            .unwrap();

        let calls = agent.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "start".to_owned(),
                "gather_candidates".to_owned(),
                "add_remote_candidate:foo 1 UDP 2 1.2.3.4 9 typ host".to_owned(),
            ]
        );
    }
}

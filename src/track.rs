//! [`MediaStreamTrack`] identity handle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally-unique id. New ids never compare equal to an old one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque stream-grouping id, used only to group tracks under one `MSID`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    /// Generates a fresh, unique stream id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StreamId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StreamId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Kind of media a [`MediaStreamTrack`] or [`crate::transceiver::Transceiver`]
/// carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// SDP media-type token (`m=<audio|video> ...`).
    #[must_use]
    pub fn as_sdp_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// An identity-bearing handle for a local or remote media track.
///
/// Equality and hashing are by [`TrackId`] only — two tracks with identical
/// `kind`/`stream_ids` but different ids are distinct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MediaStreamTrack {
    id: TrackId,
    kind: MediaKind,
    stream_ids: Vec<StreamId>,
}

impl MediaStreamTrack {
    /// Creates a track with a freshly generated id.
    #[must_use]
    pub fn new(kind: MediaKind, stream_ids: Vec<StreamId>) -> Self {
        Self {
            id: TrackId::generate(),
            kind,
            stream_ids,
        }
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn stream_ids(&self) -> &[StreamId] {
        &self.stream_ids
    }
}

impl PartialEq for MediaStreamTrack {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for MediaStreamTrack {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_id_only() {
        let a = MediaStreamTrack::new(MediaKind::Audio, vec![]);
        let b = MediaStreamTrack::new(MediaKind::Audio, vec![]);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn stream_ids_are_preserved_in_order() {
        let ids: Vec<StreamId> = vec!["a".into(), "b".into()];
        let t = MediaStreamTrack::new(MediaKind::Video, ids.clone());
        assert_eq!(t.stream_ids(), ids.as_slice());
    }

    #[test]
    fn generate_stream_id_is_unique() {
        assert_ne!(StreamId::generate(), StreamId::generate());
    }
}

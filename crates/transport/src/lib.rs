use std::fmt;
use std::sync::Arc;

/// Identity of a tab. Never reused within a session, even after the tab is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

/// Identity of a sound, unique across every tab of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound-{}", self.0)
    }
}

/// Key of a payload in the blob store.
///
/// Keys are minted by the session from its library counter, never by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey(String);

impl BlobKey {
    pub const PREFIX: &'static str = "lib-";

    /// Mint the key for the given library sequence number.
    pub fn from_seq(seq: u64) -> Self {
        Self(format!("{}{}", Self::PREFIX, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BlobKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for BlobKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw audio payload plus the MIME type its origin declared for it.
///
/// The bytes are shared so handing the same payload to the engine and the
/// blob store does not copy it.
#[derive(Clone)]
pub struct MediaSource {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

impl MediaSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    pub fn is_audio(&self) -> bool {
        is_audio_mime(&self.mime)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSource")
            .field("len", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

/// Strip parameters (`; codecs=...`) and normalise case.
pub fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a declared content type names an audio payload.
pub fn is_audio_mime(mime: &str) -> bool {
    let essence = mime_essence(mime);
    essence
        .strip_prefix("audio/")
        .is_some_and(|subtype| !subtype.is_empty())
}

/// Transport message sent from a playback handle to its voice. Volume and
/// loop are parameters shared outside the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Play,
    /// Always answered with [`PlaybackEvent::Paused`], even when already paused.
    Pause,
    Seek { seconds: f64 },
}

/// Event reported by a voice. Events of one voice are strictly ordered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    Started,
    Paused,
    /// Playback reached the end without looping. The position is back at zero
    /// and the handle stays usable.
    Ended,
    ProgressAdvanced { current: f64, total: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Convert a slider percentage into a gain in `[0.0, 1.0]`.
pub fn percent_to_gain(percent: f64) -> f32 {
    if percent.is_nan() {
        return 0.0;
    }
    (percent.clamp(0.0, 100.0) / 100.0) as f32
}

/// Gain actually sent to the engine for one sound.
pub fn effective_gain(master: f32, volume: f32) -> f32 {
    (master * volume).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_key_from_seq() {
        assert_eq!(BlobKey::from_seq(7).as_str(), "lib-7");
        assert_eq!(BlobKey::from_seq(0).to_string(), "lib-0");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(TabId(3).to_string(), "tab-3");
        assert_eq!(SoundId(12).to_string(), "sound-12");
    }

    #[test]
    fn test_audio_mime_detection() {
        assert!(is_audio_mime("audio/mpeg"));
        assert!(is_audio_mime("Audio/WAV"));
        assert!(is_audio_mime("audio/ogg; codecs=vorbis"));
        assert!(!is_audio_mime("audio/"));
        assert!(!is_audio_mime("video/mp4"));
        assert!(!is_audio_mime("text/html; charset=utf-8"));
        assert!(!is_audio_mime(""));
    }

    #[test]
    fn test_mime_essence() {
        assert_eq!(mime_essence(" Audio/Ogg ; codecs=opus"), "audio/ogg");
    }

    #[test]
    fn test_percent_to_gain_clamps() {
        assert_eq!(percent_to_gain(50.0), 0.5);
        assert_eq!(percent_to_gain(150.0), 1.0);
        assert_eq!(percent_to_gain(-20.0), 0.0);
        assert_eq!(percent_to_gain(f64::NAN), 0.0);
    }

    #[test]
    fn test_effective_gain() {
        assert_eq!(effective_gain(0.5, 0.5), 0.25);
        assert_eq!(effective_gain(1.0, 0.8), 0.8);
        assert_eq!(effective_gain(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_media_source_is_audio() {
        let source = MediaSource::new(vec![1u8, 2, 3], "audio/wav");
        assert!(source.is_audio());
        assert_eq!(source.len(), 3);

        let source = MediaSource::new(Vec::<u8>::new(), "image/png");
        assert!(!source.is_audio());
        assert!(source.is_empty());
    }

    #[test]
    fn test_playback_state_default() {
        assert_eq!(PlaybackState::default(), PlaybackState::Stopped);
        assert!(PlaybackState::Playing.is_playing());
        assert!(!PlaybackState::Paused.is_playing());
    }
}

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use board_engine::PlaybackHandle;
use board_transport::{BlobKey, MediaSource, PlaybackEvent, PlaybackState, SoundId};

/// Whether a sound survives a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    /// Payload lives in the blob store and the sound is written to the descriptor.
    #[default]
    Durable,
    /// Payload lives in memory only ("quick play").
    Ephemeral,
}

/// In-memory handle to an ephemeral payload, revoked when its sound goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransientHandle(u64);

impl fmt::Display for TransientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:session/{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadRef {
    Durable(BlobKey),
    Ephemeral(TransientHandle),
}

impl PayloadRef {
    pub fn persistence(&self) -> Persistence {
        match self {
            PayloadRef::Durable(_) => Persistence::Durable,
            PayloadRef::Ephemeral(_) => Persistence::Ephemeral,
        }
    }

    pub fn blob_key(&self) -> Option<&BlobKey> {
        match self {
            PayloadRef::Durable(key) => Some(key),
            PayloadRef::Ephemeral(_) => None,
        }
    }
}

/// Ephemeral payloads of one session.
#[derive(Debug, Default)]
pub(crate) struct TransientPool {
    next: u64,
    payloads: HashMap<TransientHandle, MediaSource>,
}

impl TransientPool {
    pub fn create(&mut self, source: MediaSource) -> TransientHandle {
        let handle = TransientHandle(self.next);
        self.next += 1;
        self.payloads.insert(handle, source);
        handle
    }

    pub fn revoke(&mut self, handle: TransientHandle) -> bool {
        self.payloads.remove(&handle).is_some()
    }

    pub fn revoke_all(&mut self) -> usize {
        let count = self.payloads.len();
        self.payloads.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }
}

/// Where a new sound's payload comes from.
#[derive(Debug, Clone)]
pub enum SoundSource {
    /// Raw bytes, e.g. a local file or a fetched URL. `name` is the default
    /// display name.
    Media { source: MediaSource, name: String },
    /// A payload already in the blob store.
    Library(BlobKey),
}

impl SoundSource {
    /// Read a local file, deriving its content type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = board_decode::mime_from_path(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SoundSource::Media {
            source: MediaSource::new(bytes, mime),
            name,
        })
    }
}

/// Options for [`crate::Session::add_sound`].
#[derive(Debug, Clone, Default)]
pub struct AddSound {
    pub persistence: Persistence,
    /// Overrides the name the source suggests.
    pub display_name: Option<String>,
}

impl AddSound {
    pub fn durable() -> Self {
        Self::default()
    }

    pub fn ephemeral() -> Self {
        Self {
            persistence: Persistence::Ephemeral,
            display_name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// One loaded clip and the playback handle it owns.
pub struct SoundEntry {
    pub(crate) id: SoundId,
    pub(crate) name: String,
    pub(crate) volume: f32,
    pub(crate) looping: bool,
    pub(crate) payload: PayloadRef,
    pub(crate) playback: Box<dyn PlaybackHandle>,
    pub(crate) state: PlaybackState,
    pub(crate) position: f64,
    pub(crate) duration: f64,
    /// Stops sent to the voice whose `Paused` acknowledgement has not arrived.
    pub(crate) pending_stops: u32,
}

impl SoundEntry {
    pub(crate) fn new(
        id: SoundId,
        name: String,
        payload: PayloadRef,
        playback: Box<dyn PlaybackHandle>,
    ) -> Self {
        let duration = playback.duration();
        Self {
            id,
            name,
            volume: 1.0,
            looping: false,
            payload,
            playback,
            state: PlaybackState::Stopped,
            position: 0.0,
            duration,
            pending_stops: 0,
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn payload(&self) -> &PayloadRef {
        &self.payload
    }

    pub fn persistence(&self) -> Persistence {
        self.payload.persistence()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Fraction of the clip played so far, for progress bars.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn playback(&self) -> &dyn PlaybackHandle {
        self.playback.as_ref()
    }

    /// Pause and rewind.
    pub(crate) fn stop(&mut self) {
        self.playback.pause();
        self.playback.seek(0.0);
        self.position = 0.0;
        self.state = PlaybackState::Stopped;
        self.pending_stops += 1;
    }

    /// Events the voice produced before it saw the last stop are dropped.
    pub(crate) fn apply_event(&mut self, event: PlaybackEvent) {
        if self.pending_stops > 0 {
            if event == PlaybackEvent::Paused {
                self.pending_stops -= 1;
            }
            return;
        }

        match event {
            PlaybackEvent::Started => self.state = PlaybackState::Playing,
            PlaybackEvent::Paused => {
                if self.state != PlaybackState::Stopped {
                    self.state = PlaybackState::Paused;
                }
            }
            PlaybackEvent::Ended => {
                self.state = PlaybackState::Stopped;
                self.position = 0.0;
            }
            PlaybackEvent::ProgressAdvanced { current, total } => {
                self.position = current;
                self.duration = total;
            }
        }
    }
}

impl fmt::Debug for SoundEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("volume", &self.volume)
            .field("looping", &self.looping)
            .field("payload", &self.payload)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("duration", &self.duration)
            .finish()
    }
}

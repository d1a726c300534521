pub mod error;
pub mod import;
pub mod observer;
pub mod reconcile;
pub mod refs;
pub mod session;
pub mod sound;
pub mod tab;

pub use error::{Missing, Result, SessionError};
pub use import::{FetchedMedia, Fetcher, REMOTE_PLACEHOLDER_NAME, display_name_from_url};
pub use observer::{SessionObserver, SessionWarning};
pub use reconcile::{GapReason, HydrationGap, HydrationReport, Reconciler};
pub use refs::count_references;
pub use session::{DEFAULT_TAB_NAME, LibraryEntry, Session, UNTITLED_SOUND};
pub use sound::{AddSound, PayloadRef, Persistence, SoundEntry, SoundSource, TransientHandle};
pub use tab::Tab;

pub use board_engine::{ClockEngine, PlaybackEngine, PlaybackHandle};
pub use board_project::{
    BlobStore, DescriptorFormat, DescriptorStore, DirBlobStore, FileDescriptorStore,
    MemoryBlobStore, MemoryDescriptorStore, StoreError,
};
pub use board_transport::{BlobKey, MediaSource, PlaybackEvent, PlaybackState, SoundId, TabId};

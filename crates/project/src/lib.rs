mod fs;
mod load;
mod memory;
mod save;

use board_transport::BlobKey;
use serde::{Deserialize, Serialize};

pub use fs::{DirBlobStore, FileDescriptorStore};
pub use load::decode_descriptor;
pub use memory::{MemoryBlobStore, MemoryDescriptorStore};
pub use save::encode_descriptor;

/// Snapshot of a whole session, minus the audio bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default = "default_volume")]
    pub master_volume: f32,
    #[serde(default)]
    pub next_tab_id: u64,
    #[serde(default)]
    pub next_sound_seq: u64,
    #[serde(default)]
    pub next_library_key: u64,
    #[serde(default)]
    pub active_tab_id: u64,
    #[serde(default)]
    pub tabs: Vec<TabData>,
    /// Informational; the session rebuilds reference counts from `tabs`.
    #[serde(default)]
    pub library: Vec<LibraryData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabData {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub sounds: Vec<SoundData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundData {
    pub id: u64,
    pub name: String,
    pub blob_key: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default, rename = "loop")]
    pub looping: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryData {
    pub key: String,
    pub name: String,
}

fn default_volume() -> f32 {
    1.0
}

/// Encoding used when writing descriptors. Reading accepts either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorFormat {
    #[default]
    Json,
    Msgpack,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("invalid blob key '{0}'")]
    InvalidKey(BlobKey),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key to bytes storage for audio payloads.
pub trait BlobStore {
    fn put(&mut self, key: &BlobKey, bytes: &[u8]) -> Result<BlobKey, StoreError>;
    /// `Ok(None)` when nothing is stored under `key`.
    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError>;
    /// Deleting an absent key is not an error.
    fn delete(&mut self, key: &BlobKey) -> Result<(), StoreError>;
}

/// Durable home of the single session descriptor.
pub trait DescriptorStore {
    /// `Ok(None)` when no descriptor was ever saved.
    fn load(&self) -> Result<Option<Descriptor>, StoreError>;
    /// Replace the stored descriptor as a whole.
    fn save(&mut self, descriptor: &Descriptor) -> Result<(), StoreError>;
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use board_transport::BlobKey;

use crate::{BlobStore, Descriptor, DescriptorFormat, DescriptorStore, StoreError};
use crate::{decode_descriptor, encode_descriptor};

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

/// Blob store held in process memory.
///
/// Clones share the same contents, so a second session built from a clone
/// sees what the first one stored (a stand-in for a page reload).
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<BlobKey, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &BlobKey) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<BlobKey> {
        let mut keys: Vec<BlobKey> = self
            .blobs
            .lock()
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&mut self, key: &BlobKey, bytes: &[u8]) -> Result<BlobKey, StoreError> {
        self.blobs
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.clone(), bytes.to_vec());
        Ok(key.clone())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn delete(&mut self, key: &BlobKey) -> Result<(), StoreError> {
        self.blobs.lock().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}

/// Descriptor store held in process memory.
///
/// The descriptor is kept encoded, so loading goes through the same decoding
/// path as a file would.
#[derive(Debug, Clone, Default)]
pub struct MemoryDescriptorStore {
    encoded: Arc<Mutex<Option<Vec<u8>>>>,
    format: DescriptorFormat,
}

impl MemoryDescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(format: DescriptorFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Seed the store with raw bytes, e.g. a hand-written or corrupt document.
    pub fn set_raw(&self, bytes: Vec<u8>) {
        if let Ok(mut encoded) = self.encoded.lock() {
            *encoded = Some(bytes);
        }
    }

    pub fn raw(&self) -> Option<Vec<u8>> {
        self.encoded.lock().ok().and_then(|encoded| encoded.clone())
    }
}

impl DescriptorStore for MemoryDescriptorStore {
    fn load(&self) -> Result<Option<Descriptor>, StoreError> {
        let encoded = self.encoded.lock().map_err(|_| poisoned())?;
        encoded.as_deref().map(decode_descriptor).transpose()
    }

    fn save(&mut self, descriptor: &Descriptor) -> Result<(), StoreError> {
        let bytes = encode_descriptor(descriptor, self.format)?;
        *self.encoded.lock().map_err(|_| poisoned())? = Some(bytes);
        Ok(())
    }
}

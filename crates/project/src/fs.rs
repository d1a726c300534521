use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use board_transport::BlobKey;

use crate::{BlobStore, Descriptor, DescriptorFormat, DescriptorStore, StoreError};
use crate::{decode_descriptor, encode_descriptor};

/// Write through a sibling temp file and rename, so readers see either the
/// old contents or the new ones.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Blob store keeping one file per key inside a directory.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &BlobKey) -> Result<PathBuf, StoreError> {
        let valid = !key.as_str().is_empty()
            && key
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.clone()));
        }
        Ok(self.root.join(format!("{}.blob", key.as_str())))
    }
}

impl BlobStore for DirBlobStore {
    fn put(&mut self, key: &BlobKey, bytes: &[u8]) -> Result<BlobKey, StoreError> {
        let path = self.path_for(key)?;
        write_atomic(&path, bytes)?;
        tracing::debug!(%key, len = bytes.len(), "stored blob");
        Ok(key.clone())
    }

    fn get(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, key: &BlobKey) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(%key, "deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Descriptor store backed by a single file.
#[derive(Debug, Clone)]
pub struct FileDescriptorStore {
    path: PathBuf,
    format: DescriptorFormat,
}

impl FileDescriptorStore {
    pub fn new(path: impl Into<PathBuf>, format: DescriptorFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

impl DescriptorStore for FileDescriptorStore {
    fn load(&self) -> Result<Option<Descriptor>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode_descriptor(&bytes).map(Some)
    }

    fn save(&mut self, descriptor: &Descriptor) -> Result<(), StoreError> {
        let bytes = encode_descriptor(descriptor, self.format)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&self.path, &bytes)?;
        tracing::debug!(path = %self.path.display(), len = bytes.len(), "saved descriptor");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SoundData, TabData};
    use tempfile::tempdir;

    fn descriptor() -> Descriptor {
        Descriptor {
            master_volume: 1.0,
            next_tab_id: 1,
            next_sound_seq: 1,
            next_library_key: 1,
            active_tab_id: 0,
            tabs: vec![TabData {
                id: 0,
                name: "Main Sounds".to_string(),
                sounds: vec![SoundData {
                    id: 0,
                    name: "kick.wav".to_string(),
                    blob_key: "lib-0".to_string(),
                    volume: 1.0,
                    looping: false,
                }],
            }],
            library: vec![],
        }
    }

    #[test]
    fn test_dir_blob_store_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let mut store = DirBlobStore::open(dir.path().join("blobs")).expect("open");
        let key = BlobKey::from_seq(1);

        store.put(&key, b"RIFF....").expect("put");
        assert!(dir.path().join("blobs").join("lib-1.blob").exists());
        assert_eq!(store.get(&key).expect("get"), Some(b"RIFF....".to_vec()));

        store.delete(&key).expect("delete");
        assert_eq!(store.get(&key).expect("get"), None);
    }

    #[test]
    fn test_dir_blob_store_missing_key_is_none() {
        let dir = tempdir().expect("tempdir");
        let store = DirBlobStore::open(dir.path()).expect("open");
        assert_eq!(store.get(&BlobKey::from_seq(42)).expect("get"), None);
    }

    #[test]
    fn test_dir_blob_store_delete_absent_is_ok() {
        let dir = tempdir().expect("tempdir");
        let mut store = DirBlobStore::open(dir.path()).expect("open");
        store.delete(&BlobKey::from_seq(42)).expect("delete");
    }

    #[test]
    fn test_dir_blob_store_rejects_path_like_keys() {
        let dir = tempdir().expect("tempdir");
        let mut store = DirBlobStore::open(dir.path()).expect("open");

        let result = store.put(&BlobKey::from("../escape"), b"x");
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_file_descriptor_missing_is_none() {
        let dir = tempdir().expect("tempdir");
        let store =
            FileDescriptorStore::new(dir.path().join("session.json"), DescriptorFormat::Json);
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn test_file_descriptor_json_roundtrip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("session.json");
        let mut store = FileDescriptorStore::new(&path, DescriptorFormat::Json);

        store.save(&descriptor()).expect("save");
        assert!(path.exists());

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.contains("\"blobKey\": \"lib-0\""));
        assert_eq!(store.load().expect("load"), Some(descriptor()));
    }

    #[test]
    fn test_file_descriptor_reads_msgpack_written_by_other_format() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("session.bin");

        FileDescriptorStore::new(&path, DescriptorFormat::Msgpack)
            .save(&descriptor())
            .expect("save");

        let reader = FileDescriptorStore::new(&path, DescriptorFormat::Json);
        assert_eq!(reader.load().expect("load"), Some(descriptor()));
    }

    #[test]
    fn test_file_descriptor_save_leaves_no_temp_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let mut store = FileDescriptorStore::new(&path, DescriptorFormat::Json);

        store.save(&descriptor()).expect("save");
        store.save(&descriptor()).expect("save again");

        let entries: Vec<_> = fs::read_dir(dir.path()).expect("read dir").collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_file_descriptor_invalid_contents() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, b"not valid json or msgpack").expect("write");

        let store = FileDescriptorStore::new(&path, DescriptorFormat::Json);
        assert!(matches!(store.load(), Err(StoreError::Deserialize(_))));
    }
}

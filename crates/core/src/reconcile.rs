//! Translation between the live session and its durable form.
//!
//! Saving always writes a full snapshot of the model as it is at the moment of
//! the call, so saves that complete out of order still converge. Hydration
//! restores what it can and records a gap for every sound it had to skip.

use std::collections::HashSet;

use board_engine::PlaybackEngine;
use board_project::{
    BlobStore, Descriptor, DescriptorStore, LibraryData, MemoryBlobStore, MemoryDescriptorStore,
    SoundData, StoreError, TabData,
};
use board_transport::{BlobKey, MediaSource, SoundId, TabId, effective_gain};

use crate::session::{LibraryEntry, Session, default_tab_name};
use crate::sound::{PayloadRef, SoundEntry};
use crate::tab::Tab;

/// Content type given to payloads read back from the blob store; the store
/// keeps bytes only, so the decoder has to sniff the container.
pub(crate) const STORED_MIME: &str = "audio/x-stored";

/// Owner of the two durable stores.
pub struct Reconciler {
    blobs: Box<dyn BlobStore>,
    descriptors: Box<dyn DescriptorStore>,
}

impl Reconciler {
    pub fn new(
        blobs: impl BlobStore + 'static,
        descriptors: impl DescriptorStore + 'static,
    ) -> Self {
        Self {
            blobs: Box::new(blobs),
            descriptors: Box::new(descriptors),
        }
    }

    /// Stores that live only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryBlobStore::new(), MemoryDescriptorStore::new())
    }

    pub(crate) fn save(&mut self, descriptor: &Descriptor) -> Result<(), StoreError> {
        self.descriptors.save(descriptor)
    }

    pub(crate) fn load(&self) -> Result<Option<Descriptor>, StoreError> {
        self.descriptors.load()
    }

    pub(crate) fn put_blob(&mut self, key: &BlobKey, bytes: &[u8]) -> Result<BlobKey, StoreError> {
        self.blobs.put(key, bytes)
    }

    pub(crate) fn get_blob(&self, key: &BlobKey) -> Result<Option<Vec<u8>>, StoreError> {
        self.blobs.get(key)
    }

    pub(crate) fn delete_blob(&mut self, key: &BlobKey) -> Result<(), StoreError> {
        self.blobs.delete(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GapReason {
    /// The descriptor names a blob the store does not have.
    MissingBlob,
    /// The blob store failed to read the payload. The sound stays in the saved
    /// session and its blob is kept, so a later start can restore it.
    Unreadable(String),
    /// The payload was read but the engine could not open it.
    Undecodable(String),
}

/// A persisted sound that hydration had to skip.
#[derive(Debug, Clone, PartialEq)]
pub struct HydrationGap {
    pub tab: TabId,
    pub sound: SoundId,
    pub name: String,
    pub blob_key: BlobKey,
    pub reason: GapReason,
}

/// A saved sound kept only in its durable form because its payload could
/// not be read. The next restore tries again.
#[derive(Debug, Clone)]
pub(crate) struct HeldSound {
    pub tab: TabId,
    pub key: BlobKey,
    pub data: SoundData,
}

#[derive(Debug, Clone, Default)]
pub struct HydrationReport {
    pub restored_tabs: usize,
    pub restored_sounds: usize,
    pub gaps: Vec<HydrationGap>,
    /// Set when the descriptor existed but could not be read; the session
    /// then starts fresh.
    pub descriptor_error: Option<String>,
}

impl HydrationReport {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty() && self.descriptor_error.is_none()
    }
}

impl Session {
    /// Restore the session saved in `reconciler`, or start a fresh one.
    ///
    /// Never fails as a whole: unreadable descriptors and missing or broken
    /// payloads end up in the report.
    pub fn hydrate(
        engine: impl PlaybackEngine + 'static,
        reconciler: Reconciler,
    ) -> (Self, HydrationReport) {
        let mut report = HydrationReport::default();

        let descriptor = match reconciler.load() {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                tracing::info!("no saved session, starting fresh");
                report.restored_tabs = 1;
                return (Session::fresh(Box::new(engine), reconciler), report);
            }
            Err(e) => {
                tracing::warn!(error = %e, "saved session unreadable, starting fresh");
                report.descriptor_error = Some(e.to_string());
                report.restored_tabs = 1;
                return (Session::fresh(Box::new(engine), reconciler), report);
            }
        };

        let mut session = Session::empty(Box::new(engine), reconciler);
        session.master_volume = if descriptor.master_volume.is_finite() {
            descriptor.master_volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        session.next_tab_id = descriptor.next_tab_id;
        session.next_sound_seq = descriptor.next_sound_seq;
        session.next_library_key = descriptor.next_library_key;

        let mut seen_sounds: HashSet<SoundId> = HashSet::new();
        let mut missing_keys: Vec<BlobKey> = Vec::new();

        for tab_data in &descriptor.tabs {
            let tab_id = TabId(tab_data.id);
            if session.tabs.iter().any(|tab| tab.id == tab_id) {
                tracing::warn!(%tab_id, "duplicate tab in saved session, skipping");
                continue;
            }

            let name = match tab_data.name.trim() {
                "" => default_tab_name(tab_data.id),
                name => name.to_string(),
            };
            let mut tab = Tab::new(tab_id, name);

            for sound_data in &tab_data.sounds {
                let sound_id = SoundId(sound_data.id);
                if !seen_sounds.insert(sound_id) {
                    tracing::warn!(%sound_id, "duplicate sound in saved session, skipping");
                    continue;
                }

                match session.restore_sound(sound_data) {
                    Ok(entry) => tab.sounds.push(entry),
                    Err(reason) => {
                        let gap = HydrationGap {
                            tab: tab_id,
                            sound: sound_id,
                            name: sound_data.name.clone(),
                            blob_key: BlobKey::from(sound_data.blob_key.clone()),
                            reason,
                        };
                        tracing::warn!(
                            %sound_id,
                            key = %gap.blob_key,
                            reason = ?gap.reason,
                            "skipping sound during restore"
                        );
                        match gap.reason {
                            GapReason::MissingBlob => missing_keys.push(gap.blob_key.clone()),
                            GapReason::Unreadable(_) => session.held.push(HeldSound {
                                tab: tab_id,
                                key: gap.blob_key.clone(),
                                data: sound_data.clone(),
                            }),
                            GapReason::Undecodable(_) => {}
                        }
                        report.gaps.push(gap);
                    }
                }
            }

            report.restored_sounds += tab.sounds.len();
            session.tabs.push(tab);
        }

        if session.tabs.is_empty() {
            let id = TabId(session.next_tab_id);
            session.next_tab_id += 1;
            session
                .tabs
                .push(Tab::new(id, crate::session::DEFAULT_TAB_NAME.to_string()));
        }
        report.restored_tabs = session.tabs.len();

        let active = TabId(descriptor.active_tab_id);
        session.active_tab = if session.tabs.iter().any(|tab| tab.id == active) {
            active
        } else {
            session.tabs[0].id
        };

        session.library = descriptor
            .library
            .iter()
            .map(|entry| LibraryEntry {
                key: BlobKey::from(entry.key.clone()),
                name: entry.name.clone(),
            })
            .filter(|entry| !missing_keys.contains(&entry.key))
            .collect();
        session.rebuild_library();

        tracing::info!(
            tabs = report.restored_tabs,
            sounds = report.restored_sounds,
            gaps = report.gaps.len(),
            "restored session"
        );

        let dropped_sounds = report
            .gaps
            .iter()
            .any(|gap| !matches!(gap.reason, GapReason::Unreadable(_)));
        if dropped_sounds || !session.pending_gc.is_empty() {
            session.persist();
        }

        (session, report)
    }

    /// Build a descriptor from the live model. Ephemeral sounds are left out.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            master_volume: self.master_volume,
            next_tab_id: self.next_tab_id,
            next_sound_seq: self.next_sound_seq,
            next_library_key: self.next_library_key,
            active_tab_id: self.active_tab.0,
            tabs: self
                .tabs
                .iter()
                .map(|tab| TabData {
                    id: tab.id.0,
                    name: tab.name.clone(),
                    sounds: tab
                        .sounds
                        .iter()
                        .filter_map(|sound| {
                            sound.payload.blob_key().map(|key| SoundData {
                                id: sound.id.0,
                                name: sound.name.clone(),
                                blob_key: key.as_str().to_string(),
                                volume: sound.volume,
                                looping: sound.looping,
                            })
                        })
                        .chain(
                            self.held
                                .iter()
                                .filter(|held| held.tab == tab.id)
                                .map(|held| held.data.clone()),
                        )
                        .collect(),
                })
                .collect(),
            library: self
                .library
                .iter()
                .map(|entry| LibraryData {
                    key: entry.key.as_str().to_string(),
                    name: entry.name.clone(),
                })
                .collect(),
        }
    }

    fn restore_sound(&mut self, data: &SoundData) -> Result<SoundEntry, GapReason> {
        let key = BlobKey::from(data.blob_key.clone());
        let bytes = match self.reconciler.get_blob(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(GapReason::MissingBlob),
            Err(e) => return Err(GapReason::Unreadable(e.to_string())),
        };

        let source = MediaSource::new(bytes, STORED_MIME);
        let playback = self
            .engine
            .load(&source)
            .map_err(|e| GapReason::Undecodable(e.to_string()))?;

        let mut entry = SoundEntry::new(
            SoundId(data.id),
            data.name.clone(),
            PayloadRef::Durable(key),
            playback,
        );
        entry.volume = if data.volume.is_finite() {
            data.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        entry.looping = data.looping;
        entry
            .playback
            .set_volume(effective_gain(self.master_volume, entry.volume));
        entry.playback.set_loop(entry.looping);
        Ok(entry)
    }

    /// Make the library agree with the restored and held sounds: add keys
    /// they use but the library forgot, and queue unreferenced keys for deletion.
    fn rebuild_library(&mut self) {
        let used: Vec<(BlobKey, String)> = self
            .tabs
            .iter()
            .flat_map(|tab| tab.sounds.iter())
            .filter_map(|sound| {
                let key = sound.payload.blob_key()?;
                Some((key.clone(), sound.name.clone()))
            })
            .chain(
                self.held
                    .iter()
                    .map(|held| (held.key.clone(), held.data.name.clone())),
            )
            .collect();
        for (key, name) in used {
            if !self.library.iter().any(|entry| entry.key == key) {
                self.library.push(LibraryEntry { key, name });
            }
        }

        let keys: Vec<BlobKey> = self.library.iter().map(|entry| entry.key.clone()).collect();
        let orphans = self.unreferenced(keys);
        if !orphans.is_empty() {
            tracing::info!(count = orphans.len(), "queued orphaned blobs for deletion");
        }
        self.schedule_gc(orphans);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::{AddSound, Persistence};
    use crate::test_support::{FlakyBlobStore, FlakyDescriptorStore, wav_media};
    use board_engine::ClockEngine;

    fn reconciler(blobs: &MemoryBlobStore, descriptors: &MemoryDescriptorStore) -> Reconciler {
        Reconciler::new(blobs.clone(), descriptors.clone())
    }

    #[test]
    fn test_hydrate_empty_store_gives_default_session() {
        let (session, report) = Session::hydrate(ClockEngine::unlocked(), Reconciler::in_memory());

        assert!(report.is_complete());
        assert_eq!(report.restored_tabs, 1);
        assert_eq!(session.tabs().len(), 1);
        assert_eq!(session.active_tab().name(), "Main Sounds");
        assert_eq!(session.active_tab_id(), TabId(0));
    }

    #[test]
    fn test_round_trip_restores_durable_sounds() {
        let blobs = MemoryBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();

        let (mut session, _) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));
        let main = session.active_tab_id();
        let kick = session
            .add_sound(main, wav_media("kick.wav", 0.5), AddSound::durable())
            .expect("add kick");
        let quick = session
            .add_sound(main, wav_media("quick.wav", 0.5), AddSound::ephemeral())
            .expect("add quick");
        let crowd = session.create_tab(Some("Crowd"));
        let cheer = session
            .add_sound(crowd, wav_media("cheer.wav", 1.0), AddSound::durable())
            .expect("add cheer");

        session.set_sound_volume(kick, 40.0).expect("volume");
        session.toggle_loop(cheer).expect("loop");
        session.rename_sound(crowd, cheer, "Big Cheer").expect("rename");
        session.set_master_volume(80.0);
        session.set_active_tab(main).expect("activate");
        let before = session.descriptor();
        drop(session);

        let (restored, report) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));

        assert!(report.is_complete());
        assert_eq!(report.restored_sounds, 2);
        assert_eq!(restored.descriptor(), before);
        assert_eq!(restored.active_tab_id(), main);
        assert_eq!(restored.master_volume(), 0.8);

        let kick = restored.sound(kick).expect("kick restored");
        assert_eq!(kick.name(), "kick.wav");
        assert_eq!(kick.volume(), 0.4);
        assert!(!kick.looping());
        assert!((kick.playback().volume() - 0.32).abs() < 1e-6);

        let cheer = restored.sound(cheer).expect("cheer restored");
        assert_eq!(cheer.name(), "Big Cheer");
        assert!(cheer.looping());
        assert!(cheer.playback().looping());

        assert!(restored.sound(quick).is_none());
    }

    #[test]
    fn test_counters_restored_verbatim() {
        let blobs = MemoryBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();

        let (mut session, _) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));
        let main = session.active_tab_id();
        let doomed_tab = session.create_tab(None);
        let doomed = session
            .add_sound(main, wav_media("a.wav", 0.1), AddSound::durable())
            .expect("add");
        session.remove_sound(main, doomed).expect("remove");
        session.remove_tab(doomed_tab).expect("remove tab");
        drop(session);

        let (mut restored, _) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));
        let tab = restored.create_tab(None);
        let sound = restored
            .add_sound(tab, wav_media("b.wav", 0.1), AddSound::durable())
            .expect("add");

        assert!(tab > doomed_tab);
        assert!(sound > doomed);
        assert_eq!(restored.library()[0].key, BlobKey::from_seq(1));
    }

    #[test]
    fn test_missing_blob_skips_only_that_sound() {
        let blobs = MemoryBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();

        let (mut session, _) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));
        let main = session.active_tab_id();
        let keep = session
            .add_sound(main, wav_media("keep.wav", 0.2), AddSound::durable())
            .expect("add");
        let lost = session
            .add_sound(main, wav_media("lost.wav", 0.2), AddSound::durable())
            .expect("add");
        let other_tab = session.create_tab(Some("Other"));
        let also_kept = session
            .add_sound(other_tab, wav_media("other.wav", 0.2), AddSound::durable())
            .expect("add");
        let lost_key = session
            .sound(lost)
            .and_then(|s| s.payload().blob_key().cloned())
            .expect("durable key");
        drop(session);

        let mut raw = blobs.clone();
        board_project::BlobStore::delete(&mut raw, &lost_key).expect("delete");

        let (restored, report) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));

        assert_eq!(report.gaps.len(), 1);
        let gap = &report.gaps[0];
        assert_eq!(gap.sound, lost);
        assert_eq!(gap.tab, main);
        assert_eq!(gap.name, "lost.wav");
        assert_eq!(gap.reason, GapReason::MissingBlob);

        assert!(restored.sound(keep).is_some());
        assert!(restored.sound(also_kept).is_some());
        assert!(restored.sound(lost).is_none());
        assert!(!restored.library().iter().any(|e| e.key == lost_key));

        let saved = descriptors.load().expect("load").expect("saved");
        let saved_ids: Vec<u64> = saved
            .tabs
            .iter()
            .flat_map(|tab| tab.sounds.iter().map(|s| s.id))
            .collect();
        assert!(!saved_ids.contains(&lost.0));
    }

    #[test]
    fn test_undecodable_blob_is_a_gap() {
        let mut blobs = MemoryBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();
        board_project::BlobStore::put(&mut blobs, &BlobKey::from_seq(0), b"garbage")
            .expect("put");
        descriptors.set_raw(
            br#"{"nextTabId":1,"nextSoundSeq":1,"nextLibraryKey":1,"activeTabId":0,
                "tabs":[{"id":0,"name":"Main Sounds","sounds":[
                    {"id":0,"name":"bad.wav","blobKey":"lib-0","volume":1.0,"loop":false}]}]}"#
                .to_vec(),
        );

        let (session, report) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));

        assert_eq!(report.gaps.len(), 1);
        assert!(matches!(report.gaps[0].reason, GapReason::Undecodable(_)));
        assert!(session.active_tab().is_empty());
    }

    #[test]
    fn test_unreadable_blob_is_held_until_store_recovers() {
        let blobs = FlakyBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();

        let (mut session, _) = Session::hydrate(
            ClockEngine::unlocked(),
            Reconciler::new(blobs.clone(), descriptors.clone()),
        );
        let main = session.active_tab_id();
        let horn = session
            .add_sound(main, wav_media("horn.wav", 0.3), AddSound::durable())
            .expect("add horn");
        session.set_sound_volume(horn, 60.0).expect("volume");
        let key = session
            .sound(horn)
            .and_then(|s| s.payload().blob_key().cloned())
            .expect("durable key");
        drop(session);

        blobs.fail_gets(true);
        let (mut offline, report) = Session::hydrate(
            ClockEngine::unlocked(),
            Reconciler::new(blobs.clone(), descriptors.clone()),
        );

        assert_eq!(report.gaps.len(), 1);
        assert!(matches!(report.gaps[0].reason, GapReason::Unreadable(_)));
        assert!(offline.sound(horn).is_none());
        assert_eq!(offline.count_references(&key), 1);
        assert!(offline.library().iter().any(|e| e.key == key));

        offline.create_tab(Some("Later"));
        assert!(blobs.inner().contains(&key));
        let saved = descriptors.load().expect("load").expect("saved");
        let held = saved
            .tabs
            .iter()
            .flat_map(|tab| tab.sounds.iter())
            .find(|s| s.id == horn.0)
            .expect("held sound still saved");
        assert_eq!(held.blob_key, key.as_str());
        assert_eq!(held.volume, 0.6);
        drop(offline);

        blobs.fail_gets(false);
        let (restored, report) = Session::hydrate(
            ClockEngine::unlocked(),
            Reconciler::new(blobs.clone(), descriptors.clone()),
        );

        assert!(report.is_complete());
        let horn = restored.sound(horn).expect("horn restored");
        assert_eq!(horn.name(), "horn.wav");
        assert_eq!(horn.volume(), 0.6);
    }

    #[test]
    fn test_removing_tab_releases_held_blob() {
        let blobs = FlakyBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();

        let (mut session, _) = Session::hydrate(
            ClockEngine::unlocked(),
            Reconciler::new(blobs.clone(), descriptors.clone()),
        );
        let doomed = session.create_tab(Some("Doomed"));
        let sound = session
            .add_sound(doomed, wav_media("gone.wav", 0.2), AddSound::durable())
            .expect("add");
        let key = session
            .sound(sound)
            .and_then(|s| s.payload().blob_key().cloned())
            .expect("durable key");
        drop(session);

        blobs.fail_gets(true);
        let (mut offline, _) = Session::hydrate(
            ClockEngine::unlocked(),
            Reconciler::new(blobs.clone(), descriptors.clone()),
        );
        blobs.fail_gets(false);

        offline.remove_tab(doomed).expect("remove tab");

        assert_eq!(offline.count_references(&key), 0);
        assert!(!blobs.inner().contains(&key));
        let saved = descriptors.load().expect("load").expect("saved");
        assert!(saved.tabs.iter().all(|tab| tab.sounds.is_empty()));
    }

    #[test]
    fn test_corrupt_descriptor_starts_fresh() {
        let descriptors = MemoryDescriptorStore::new();
        descriptors.set_raw(b"{ definitely not a descriptor".to_vec());

        let (session, report) = Session::hydrate(
            ClockEngine::unlocked(),
            reconciler(&MemoryBlobStore::new(), &descriptors),
        );

        assert!(report.descriptor_error.is_some());
        assert!(!report.is_complete());
        assert_eq!(session.tabs().len(), 1);
    }

    #[test]
    fn test_descriptor_without_tabs_gets_default_tab() {
        let descriptors = MemoryDescriptorStore::new();
        descriptors.set_raw(br#"{"nextTabId":4,"activeTabId":2,"tabs":[]}"#.to_vec());

        let (mut session, _) = Session::hydrate(
            ClockEngine::unlocked(),
            reconciler(&MemoryBlobStore::new(), &descriptors),
        );

        assert_eq!(session.tabs().len(), 1);
        assert_eq!(session.active_tab_id(), TabId(4));
        assert_eq!(session.create_tab(None), TabId(5));
    }

    #[test]
    fn test_dangling_active_tab_falls_back_to_first() {
        let descriptors = MemoryDescriptorStore::new();
        descriptors.set_raw(
            br#"{"nextTabId":9,"activeTabId":7,"tabs":[{"id":3,"name":"Three"},{"id":5,"name":"  "}]}"#
                .to_vec(),
        );

        let (session, _) = Session::hydrate(
            ClockEngine::unlocked(),
            reconciler(&MemoryBlobStore::new(), &descriptors),
        );

        assert_eq!(session.active_tab_id(), TabId(3));
        assert_eq!(session.tab(TabId(5)).map(|t| t.name()), Some("Tab 6"));
    }

    #[test]
    fn test_orphaned_library_blob_deleted_on_hydrate() {
        let mut blobs = MemoryBlobStore::new();
        let descriptors = MemoryDescriptorStore::new();
        board_project::BlobStore::put(&mut blobs, &BlobKey::from_seq(3), b"orphan")
            .expect("put");
        descriptors.set_raw(
            br#"{"nextTabId":1,"nextLibraryKey":4,"tabs":[{"id":0,"name":"Main Sounds"}],
                "library":[{"key":"lib-3","name":"orphan.wav"}]}"#
                .to_vec(),
        );

        let (session, _) =
            Session::hydrate(ClockEngine::unlocked(), reconciler(&blobs, &descriptors));

        assert!(session.library().is_empty());
        assert!(!blobs.contains(&BlobKey::from_seq(3)));
    }

    #[test]
    fn test_failed_save_keeps_model_and_retry_succeeds() {
        let blobs = MemoryBlobStore::new();
        let descriptors = FlakyDescriptorStore::new();
        let (mut session, _) = Session::hydrate(
            ClockEngine::unlocked(),
            Reconciler::new(blobs.clone(), descriptors.clone()),
        );
        let main = session.active_tab_id();

        descriptors.set_failing(true);
        let id = session
            .add_sound(main, wav_media("a.wav", 0.1), AddSound::durable())
            .expect("add still succeeds");
        assert!(session.sound(id).is_some());
        assert!(session.save().is_err());

        descriptors.set_failing(false);
        session.save().expect("retry");
        let saved = descriptors.inner().load().expect("load").expect("saved");
        assert_eq!(saved.tabs[0].sounds[0].id, id.0);
    }

    #[test]
    fn test_ephemeral_entries_never_reach_descriptor() {
        let mut session = Session::new(ClockEngine::unlocked());
        let main = session.active_tab_id();
        session
            .add_sound(main, wav_media("quick.wav", 0.1), AddSound::ephemeral())
            .expect("add");

        let descriptor = session.descriptor();
        assert!(descriptor.tabs[0].sounds.is_empty());
        assert!(descriptor.library.is_empty());
        assert_eq!(
            session.sound(SoundId(0)).map(|s| s.persistence()),
            Some(Persistence::Ephemeral)
        );
    }
}

use board_engine::PlaybackEngine;
use board_project::StoreError;
use board_transport::{
    BlobKey, MediaSource, SoundId, TabId, effective_gain, is_audio_mime, percent_to_gain,
};

use crate::error::{Missing, Result, SessionError};
use crate::import::{Fetcher, display_name_from_url};
use crate::observer::{SessionObserver, SessionWarning, notify};
use crate::reconcile::{HeldSound, Reconciler, STORED_MIME};
use crate::refs;
use crate::sound::{AddSound, PayloadRef, Persistence, SoundEntry, SoundSource, TransientPool};
use crate::tab::Tab;

pub const DEFAULT_TAB_NAME: &str = "Main Sounds";
pub const UNTITLED_SOUND: &str = "Untitled sound";

pub(crate) fn default_tab_name(tab_seq: u64) -> String {
    format!("Tab {}", tab_seq + 1)
}

/// A stored payload and the name it was first added under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub key: BlobKey,
    pub name: String,
}

/// The soundboard: tabs of sounds, master volume and identity counters.
///
/// Every operation either applies completely or leaves the session untouched.
/// Operations that change persisted state end with a full descriptor save;
/// failures of that save are logged and reported to observers but never undo
/// the change.
pub struct Session {
    pub(crate) tabs: Vec<Tab>,
    pub(crate) active_tab: TabId,
    pub(crate) master_volume: f32,
    pub(crate) next_tab_id: u64,
    pub(crate) next_sound_seq: u64,
    pub(crate) next_library_key: u64,
    pub(crate) library: Vec<LibraryEntry>,
    /// Unreferenced blobs waiting for a successful save before deletion.
    pub(crate) pending_gc: Vec<BlobKey>,
    /// Saved sounds whose payload could not be read this run. They stay in
    /// the descriptor and keep their blob alive until a later restore.
    pub(crate) held: Vec<HeldSound>,
    pub(crate) transients: TransientPool,
    pub(crate) engine: Box<dyn PlaybackEngine>,
    pub(crate) reconciler: Reconciler,
    pub(crate) observers: Vec<Box<dyn SessionObserver>>,
}

impl Session {
    /// A fresh session whose stores live in memory only.
    pub fn new(engine: impl PlaybackEngine + 'static) -> Self {
        Self::fresh(Box::new(engine), Reconciler::in_memory())
    }

    pub(crate) fn empty(engine: Box<dyn PlaybackEngine>, reconciler: Reconciler) -> Self {
        Self {
            tabs: Vec::new(),
            active_tab: TabId(0),
            master_volume: 1.0,
            next_tab_id: 0,
            next_sound_seq: 0,
            next_library_key: 0,
            library: Vec::new(),
            pending_gc: Vec::new(),
            held: Vec::new(),
            transients: TransientPool::default(),
            engine,
            reconciler,
            observers: Vec::new(),
        }
    }

    pub(crate) fn fresh(engine: Box<dyn PlaybackEngine>, reconciler: Reconciler) -> Self {
        let mut session = Self::empty(engine, reconciler);
        session
            .tabs
            .push(Tab::new(TabId(0), DEFAULT_TAB_NAME.to_string()));
        session.next_tab_id = 1;
        session
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Append a tab and make it active. A blank name becomes "Tab N".
    pub fn create_tab(&mut self, name: Option<&str>) -> TabId {
        let id = TabId(self.next_tab_id);
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_tab_name(self.next_tab_id));
        self.next_tab_id += 1;

        tracing::info!(%id, %name, "created tab");
        self.tabs.push(Tab::new(id, name));
        self.active_tab = id;

        if let Some(tab) = self.tabs.last() {
            notify(&mut self.observers, |o| o.on_tab_added(tab));
        }
        notify(&mut self.observers, |o| o.on_active_tab_changed(id));
        self.persist();
        id
    }

    /// Remove a tab and every sound in it. The last tab cannot be removed.
    pub fn remove_tab(&mut self, id: TabId) -> Result<()> {
        let index = self.tab_index(id)?;
        if self.tabs.len() == 1 {
            return Err(SessionError::InvariantViolation("cannot remove the last tab"));
        }

        let mut tab = self.tabs.remove(index);
        let mut keys: Vec<BlobKey> = tab
            .sounds
            .drain(..)
            .filter_map(|entry| self.release(id, entry))
            .collect();
        keys.extend(self.drop_held(id));

        tracing::info!(%id, "removed tab");
        notify(&mut self.observers, |o| o.on_tab_removed(id));

        if self.active_tab == id {
            let first = self.tabs[0].id;
            self.active_tab = first;
            notify(&mut self.observers, |o| o.on_active_tab_changed(first));
        }

        self.collect_garbage(keys);
        Ok(())
    }

    /// Rename a tab. Blank input leaves the name unchanged.
    pub fn rename_tab(&mut self, id: TabId, name: &str) -> Result<()> {
        let index = self.tab_index(id)?;
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        self.tabs[index].name = name.to_string();
        notify(&mut self.observers, |o| o.on_tab_renamed(id, name));
        self.persist();
        Ok(())
    }

    pub fn set_active_tab(&mut self, id: TabId) -> Result<()> {
        self.tab_index(id)?;
        if self.active_tab == id {
            return Ok(());
        }

        self.active_tab = id;
        notify(&mut self.observers, |o| o.on_active_tab_changed(id));
        self.persist();
        Ok(())
    }

    /// Remove every sound in a tab, leaving the tab itself in place.
    ///
    /// Asking the user first is the caller's job; this always clears.
    pub fn clear_tab(&mut self, id: TabId) -> Result<usize> {
        let index = self.tab_index(id)?;

        let entries: Vec<SoundEntry> = self.tabs[index].sounds.drain(..).collect();
        let removed = entries.len();
        let mut keys: Vec<BlobKey> = entries
            .into_iter()
            .filter_map(|entry| self.release(id, entry))
            .collect();
        keys.extend(self.drop_held(id));

        tracing::info!(%id, removed, "cleared tab");
        self.collect_garbage(keys);
        Ok(removed)
    }

    /// Load a payload into a new sound at the end of a tab.
    pub fn add_sound(
        &mut self,
        tab_id: TabId,
        source: SoundSource,
        options: AddSound,
    ) -> Result<SoundId> {
        let tab_index = self.tab_index(tab_id)?;

        let (media, suggested, library_key) = match source {
            SoundSource::Media { source, name } => {
                if !source.is_audio() {
                    return Err(SessionError::UnsupportedMedia { mime: source.mime });
                }
                (source, name, None)
            }
            SoundSource::Library(key) => {
                let bytes = self
                    .reconciler
                    .get_blob(&key)?
                    .ok_or_else(|| SessionError::NotFound(Missing::Blob(key.clone())))?;
                let name = self
                    .library
                    .iter()
                    .find(|entry| entry.key == key)
                    .map(|entry| entry.name.clone())
                    .unwrap_or_else(|| key.to_string());
                (MediaSource::new(bytes, STORED_MIME), name, Some(key))
            }
        };

        let name = options
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| Some(suggested.trim().to_string()).filter(|name| !name.is_empty()))
            .unwrap_or_else(|| UNTITLED_SOUND.to_string());

        let mut playback = self
            .engine
            .load(&media)
            .map_err(|source| SessionError::Decode {
                name: name.clone(),
                source,
            })?;
        playback.set_volume(effective_gain(self.master_volume, 1.0));
        playback.set_loop(false);

        let payload = match (options.persistence, library_key) {
            (Persistence::Durable, Some(key)) => {
                if !self.library.iter().any(|entry| entry.key == key) {
                    self.library.push(LibraryEntry {
                        key: key.clone(),
                        name: name.clone(),
                    });
                }
                PayloadRef::Durable(key)
            }
            (Persistence::Durable, None) => {
                let key = BlobKey::from_seq(self.next_library_key);
                self.reconciler.put_blob(&key, &media.bytes)?;
                self.next_library_key += 1;
                self.library.push(LibraryEntry {
                    key: key.clone(),
                    name: name.clone(),
                });
                PayloadRef::Durable(key)
            }
            (Persistence::Ephemeral, _) => PayloadRef::Ephemeral(self.transients.create(media)),
        };

        let id = SoundId(self.next_sound_seq);
        self.next_sound_seq += 1;

        tracing::info!(%id, tab = %tab_id, %name, payload = ?payload, "added sound");
        let tab = &mut self.tabs[tab_index];
        tab.sounds.push(SoundEntry::new(id, name, payload, playback));
        if let Some(entry) = tab.sounds.last() {
            notify(&mut self.observers, |o| o.on_sound_added(tab_id, entry));
        }
        self.persist();
        Ok(id)
    }

    /// Fetch a URL and add it as a sound named after the URL's last segment.
    ///
    /// Nothing is created when the fetch fails or the content is not audio.
    pub fn import_url(
        &mut self,
        tab_id: TabId,
        url: &str,
        persistence: Persistence,
        fetcher: &dyn Fetcher,
    ) -> Result<SoundId> {
        self.tab_index(tab_id)?;

        let fetched = fetcher.fetch(url).map_err(|source| {
            tracing::warn!(%url, error = %source, "fetch failed");
            SessionError::Fetch {
                url: url.to_string(),
                source,
            }
        })?;
        if !is_audio_mime(&fetched.content_type) {
            return Err(SessionError::UnsupportedMedia {
                mime: fetched.content_type,
            });
        }

        let source = SoundSource::Media {
            source: MediaSource::new(fetched.bytes, fetched.content_type),
            name: display_name_from_url(url),
        };
        self.add_sound(
            tab_id,
            source,
            AddSound {
                persistence,
                display_name: None,
            },
        )
    }

    /// Stop and remove a sound. Its blob is deleted once nothing else uses it.
    pub fn remove_sound(&mut self, tab_id: TabId, sound_id: SoundId) -> Result<()> {
        let tab_index = self.tab_index(tab_id)?;
        let entry = self.tabs[tab_index]
            .take_sound(sound_id)
            .ok_or(SessionError::NotFound(Missing::Sound(sound_id)))?;

        let key = self.release(tab_id, entry);
        self.collect_garbage(key);
        Ok(())
    }

    /// Rename a sound. Blank input keeps the previous name.
    pub fn rename_sound(&mut self, tab_id: TabId, sound_id: SoundId, name: &str) -> Result<()> {
        let tab_index = self.tab_index(tab_id)?;
        let entry = self.tabs[tab_index]
            .sound_mut(sound_id)
            .ok_or(SessionError::NotFound(Missing::Sound(sound_id)))?;

        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        entry.name = name.to_string();
        notify(&mut self.observers, |o| o.on_sound_renamed(sound_id, name));
        self.persist();
        Ok(())
    }

    /// Set a sound's own volume from a 0–100 slider value. Returns the
    /// effective gain now sent to the engine.
    pub fn set_sound_volume(&mut self, sound_id: SoundId, percent: f64) -> Result<f32> {
        let master = self.master_volume;
        let entry = self.entry_mut(sound_id)?;
        entry.volume = percent_to_gain(percent);
        let volume = entry.volume;
        let effective = effective_gain(master, volume);
        entry.playback.set_volume(effective);

        notify(&mut self.observers, |o| {
            o.on_volume_changed(sound_id, volume, effective)
        });
        self.persist();
        Ok(effective)
    }

    /// Set the master volume from a 0–100 slider value and push the new
    /// effective gain to every sound.
    pub fn set_master_volume(&mut self, percent: f64) -> f32 {
        self.master_volume = percent_to_gain(percent);
        let master = self.master_volume;

        let mut changed = Vec::new();
        for entry in self.tabs.iter_mut().flat_map(|tab| tab.sounds.iter_mut()) {
            let effective = effective_gain(master, entry.volume);
            entry.playback.set_volume(effective);
            changed.push((entry.id, entry.volume, effective));
        }

        notify(&mut self.observers, |o| o.on_master_volume_changed(master));
        for (id, volume, effective) in changed {
            notify(&mut self.observers, |o| o.on_volume_changed(id, volume, effective));
        }
        self.persist();
        master
    }

    /// Flip looping for a sound and return the new value.
    pub fn toggle_loop(&mut self, sound_id: SoundId) -> Result<bool> {
        let entry = self.entry_mut(sound_id)?;
        entry.looping = !entry.looping;
        let looping = entry.looping;
        entry.playback.set_loop(looping);

        notify(&mut self.observers, |o| o.on_loop_changed(sound_id, looping));
        self.persist();
        Ok(looping)
    }

    /// Start playback. A rejection is reported but leaves the sound as it was.
    pub fn play(&mut self, sound_id: SoundId) -> Result<()> {
        let entry = self.entry_mut(sound_id)?;
        let Err(rejected) = entry.playback.play() else {
            return Ok(());
        };

        tracing::warn!(sound = %sound_id, reason = %rejected.reason, "playback rejected");
        let warning = SessionWarning::PlaybackRejected {
            sound: sound_id,
            reason: rejected.reason.clone(),
        };
        notify(&mut self.observers, |o| o.on_warning(&warning));
        Err(SessionError::PlaybackRejected {
            sound: sound_id,
            reason: rejected.reason,
        })
    }

    pub fn pause(&mut self, sound_id: SoundId) -> Result<()> {
        self.entry_mut(sound_id)?.playback.pause();
        Ok(())
    }

    /// Pause and rewind to the start.
    pub fn stop(&mut self, sound_id: SoundId) -> Result<()> {
        self.entry_mut(sound_id)?.stop();
        Ok(())
    }

    /// Move the play position by `delta` seconds, never before zero. Running
    /// past the end is left to the engine. Returns the requested position.
    pub fn seek_relative(&mut self, sound_id: SoundId, delta: f64) -> Result<f64> {
        let Self { tabs, observers, .. } = self;
        let entry = tabs
            .iter_mut()
            .find_map(|tab| tab.sound_mut(sound_id))
            .ok_or(SessionError::NotFound(Missing::Sound(sound_id)))?;
        drain_events(entry, observers);

        let target = (entry.position + delta).max(0.0);
        entry.playback.seek(target);
        entry.position = target;
        Ok(target)
    }

    /// Jump back `seconds`, clamping at the start.
    pub fn skip_back(&mut self, sound_id: SoundId, seconds: f64) -> Result<f64> {
        self.seek_relative(sound_id, -seconds.abs())
    }

    /// Stop every sound in every tab.
    pub fn stop_all(&mut self) {
        for entry in self.tabs.iter_mut().flat_map(|tab| tab.sounds.iter_mut()) {
            entry.stop();
        }
        tracing::info!("stopped all sounds");
    }

    /// Deliver pending playback events to the sounds and observers.
    /// Returns how many events were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        for tab in &mut self.tabs {
            for entry in &mut tab.sounds {
                handled += drain_events(entry, &mut self.observers);
            }
        }
        handled
    }

    /// Write the descriptor now. Automatic saves swallow their errors; this
    /// one returns them so the caller can retry.
    pub fn save(&mut self) -> Result<()> {
        self.write_descriptor().map_err(SessionError::from)
    }

    pub(crate) fn persist(&mut self) {
        if let Err(e) = self.write_descriptor() {
            tracing::warn!(error = %e, "failed to save session");
            let warning = SessionWarning::Persistence(e.to_string());
            notify(&mut self.observers, |o| o.on_warning(&warning));
        }
    }

    fn write_descriptor(&mut self) -> Result<(), StoreError> {
        let descriptor = self.descriptor();
        self.reconciler.save(&descriptor)?;
        self.flush_gc();
        Ok(())
    }

    /// Queue blobs that lost their last reference and drop them from the library.
    pub(crate) fn schedule_gc(&mut self, keys: Vec<BlobKey>) {
        for key in keys {
            self.library.retain(|entry| entry.key != key);
            if !self.pending_gc.contains(&key) {
                self.pending_gc.push(key);
            }
        }
    }

    /// Run after an in-memory removal: queue unreferenced blobs, then save.
    /// Blobs are only deleted once a descriptor without them is stored, so a
    /// failure in between leaves an orphan, never a dangling reference.
    fn collect_garbage(&mut self, candidates: impl IntoIterator<Item = BlobKey>) {
        let keys = self.unreferenced(candidates);
        self.schedule_gc(keys);
        self.persist();
    }

    /// Keys from `candidates` that neither a live nor a held sound uses.
    pub(crate) fn unreferenced(
        &self,
        candidates: impl IntoIterator<Item = BlobKey>,
    ) -> Vec<BlobKey> {
        refs::unreferenced(&self.tabs, candidates)
            .into_iter()
            .filter(|key| !self.held.iter().any(|held| &held.key == key))
            .collect()
    }

    /// Forget the held sounds of a tab that is being emptied and return their keys.
    fn drop_held(&mut self, tab: TabId) -> Vec<BlobKey> {
        let (dropped, kept): (Vec<HeldSound>, Vec<HeldSound>) = std::mem::take(&mut self.held)
            .into_iter()
            .partition(|held| held.tab == tab);
        self.held = kept;
        dropped.into_iter().map(|held| held.key).collect()
    }

    fn flush_gc(&mut self) {
        for key in std::mem::take(&mut self.pending_gc) {
            if self.count_references(&key) > 0 {
                continue;
            }
            match self.reconciler.delete_blob(&key) {
                Ok(()) => tracing::info!(%key, "deleted unreferenced blob"),
                Err(e) => {
                    tracing::warn!(%key, error = %e, "failed to delete blob, will retry");
                    self.pending_gc.push(key);
                }
            }
        }
    }

    /// Stop an entry that has left the model and free what it holds.
    /// Returns its blob key so the caller can check for other references.
    fn release(&mut self, tab_id: TabId, mut entry: SoundEntry) -> Option<BlobKey> {
        entry.stop();
        let id = entry.id;
        let key = match entry.payload {
            PayloadRef::Durable(key) => Some(key),
            PayloadRef::Ephemeral(handle) => {
                self.transients.revoke(handle);
                None
            }
        };

        tracing::info!(%id, tab = %tab_id, "removed sound");
        notify(&mut self.observers, |o| o.on_sound_removed(tab_id, id));
        key
    }

    /// Stop playback and revoke every ephemeral payload.
    pub fn teardown(mut self) {
        self.stop_all();
        let revoked = self.transients.revoke_all();
        tracing::info!(revoked, "session torn down");
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn active_tab_id(&self) -> TabId {
        self.active_tab
    }

    pub fn active_tab(&self) -> &Tab {
        self.tab(self.active_tab).unwrap_or(&self.tabs[0])
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn sound(&self, id: SoundId) -> Option<&SoundEntry> {
        self.tabs.iter().find_map(|tab| tab.sound(id))
    }

    /// The tab holding a sound.
    pub fn tab_of(&self, id: SoundId) -> Option<TabId> {
        self.tabs
            .iter()
            .find(|tab| tab.sound(id).is_some())
            .map(|tab| tab.id)
    }

    pub fn effective_volume(&self, id: SoundId) -> Option<f32> {
        self.sound(id)
            .map(|entry| effective_gain(self.master_volume, entry.volume))
    }

    pub fn library(&self) -> &[LibraryEntry] {
        &self.library
    }

    /// Sounds using `key`, including saved ones that could not be restored.
    pub fn count_references(&self, key: &BlobKey) -> usize {
        let held = self.held.iter().filter(|held| &held.key == key).count();
        refs::count_references(&self.tabs, key) + held
    }

    /// Ephemeral payloads currently held in memory.
    pub fn transient_payloads(&self) -> usize {
        self.transients.len()
    }

    fn tab_index(&self, id: TabId) -> Result<usize> {
        self.tabs
            .iter()
            .position(|tab| tab.id == id)
            .ok_or(SessionError::NotFound(Missing::Tab(id)))
    }

    fn entry_mut(&mut self, id: SoundId) -> Result<&mut SoundEntry> {
        self.tabs
            .iter_mut()
            .find_map(|tab| tab.sound_mut(id))
            .ok_or(SessionError::NotFound(Missing::Sound(id)))
    }
}

/// Apply one sound's queued events and pass them on, in order.
fn drain_events(entry: &mut SoundEntry, observers: &mut [Box<dyn SessionObserver>]) -> usize {
    let events = entry.playback.poll_events();
    for &event in &events {
        entry.apply_event(event);
        let id = entry.id;
        notify(observers, |o| o.on_playback(id, event));
    }
    events.len()
}

use board_transport::{SoundId, TabId};

use crate::sound::SoundEntry;

/// Named, ordered group of sounds. Insertion order is grid order.
#[derive(Debug)]
pub struct Tab {
    pub(crate) id: TabId,
    pub(crate) name: String,
    pub(crate) sounds: Vec<SoundEntry>,
}

impl Tab {
    pub(crate) fn new(id: TabId, name: String) -> Self {
        Self {
            id,
            name,
            sounds: Vec::new(),
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sounds(&self) -> &[SoundEntry] {
        &self.sounds
    }

    pub fn sound(&self, id: SoundId) -> Option<&SoundEntry> {
        self.sounds.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub(crate) fn sound_mut(&mut self, id: SoundId) -> Option<&mut SoundEntry> {
        self.sounds.iter_mut().find(|s| s.id == id)
    }

    pub(crate) fn take_sound(&mut self, id: SoundId) -> Option<SoundEntry> {
        let index = self.sounds.iter().position(|s| s.id == id)?;
        Some(self.sounds.remove(index))
    }
}

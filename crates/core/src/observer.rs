use board_transport::{PlaybackEvent, SoundId, TabId};

use crate::sound::SoundEntry;
use crate::tab::Tab;

/// Non-fatal conditions surfaced to the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionWarning {
    /// A store write failed. The in-memory session is still authoritative.
    Persistence(String),
    PlaybackRejected { sound: SoundId, reason: String },
}

/// Notifications for whatever renders the session.
///
/// Every method defaults to a no-op so a view only implements what it draws.
/// Calls happen after the model has been updated.
pub trait SessionObserver {
    fn on_tab_added(&mut self, _tab: &Tab) {}
    fn on_tab_removed(&mut self, _tab: TabId) {}
    fn on_tab_renamed(&mut self, _tab: TabId, _name: &str) {}
    fn on_active_tab_changed(&mut self, _tab: TabId) {}
    fn on_sound_added(&mut self, _tab: TabId, _sound: &SoundEntry) {}
    fn on_sound_removed(&mut self, _tab: TabId, _sound: SoundId) {}
    fn on_sound_renamed(&mut self, _sound: SoundId, _name: &str) {}
    fn on_volume_changed(&mut self, _sound: SoundId, _volume: f32, _effective: f32) {}
    fn on_master_volume_changed(&mut self, _master: f32) {}
    fn on_loop_changed(&mut self, _sound: SoundId, _looping: bool) {}
    fn on_playback(&mut self, _sound: SoundId, _event: PlaybackEvent) {}
    fn on_warning(&mut self, _warning: &SessionWarning) {}
}

pub(crate) fn notify(
    observers: &mut [Box<dyn SessionObserver>],
    mut f: impl FnMut(&mut dyn SessionObserver),
) {
    for observer in observers.iter_mut() {
        f(observer.as_mut());
    }
}

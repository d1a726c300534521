//! Pure functions over the in-memory tabs that decide when a blob may be deleted.
//!
//! Counts always come from the model, never from the stores, since the stores
//! give no cross-key atomicity.

use board_transport::BlobKey;

use crate::tab::Tab;

/// Number of sounds, across every tab, backed by `key`.
pub fn count_references(tabs: &[Tab], key: &BlobKey) -> usize {
    tabs.iter()
        .flat_map(|tab| tab.sounds.iter())
        .filter(|sound| sound.payload.blob_key() == Some(key))
        .count()
}

/// The keys from `candidates` that no sound references any more, without duplicates.
pub fn unreferenced(tabs: &[Tab], candidates: impl IntoIterator<Item = BlobKey>) -> Vec<BlobKey> {
    let mut keys: Vec<BlobKey> = Vec::new();
    for key in candidates {
        if !keys.contains(&key) && count_references(tabs, &key) == 0 {
            keys.push(key);
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::{PayloadRef, SoundEntry, TransientPool};
    use crate::test_support::wav_source;
    use board_engine::{ClockEngine, PlaybackEngine};
    use board_transport::{SoundId, TabId};

    fn entry(engine: &mut ClockEngine, id: u64, payload: PayloadRef) -> SoundEntry {
        let handle = engine.load(&wav_source(0.1)).expect("load");
        SoundEntry::new(SoundId(id), format!("s{id}"), payload, handle)
    }

    fn tabs() -> Vec<Tab> {
        let mut engine = ClockEngine::unlocked();
        let mut pool = TransientPool::default();
        let transient = pool.create(wav_source(0.1));

        let mut a = Tab::new(TabId(0), "A".to_string());
        a.sounds.push(entry(&mut engine, 0, PayloadRef::Durable(BlobKey::from_seq(0))));
        a.sounds.push(entry(&mut engine, 1, PayloadRef::Durable(BlobKey::from_seq(1))));
        a.sounds.push(entry(&mut engine, 2, PayloadRef::Ephemeral(transient)));

        let mut b = Tab::new(TabId(1), "B".to_string());
        b.sounds.push(entry(&mut engine, 3, PayloadRef::Durable(BlobKey::from_seq(0))));

        vec![a, b]
    }

    #[test]
    fn test_count_references_across_tabs() {
        let tabs = tabs();
        assert_eq!(count_references(&tabs, &BlobKey::from_seq(0)), 2);
        assert_eq!(count_references(&tabs, &BlobKey::from_seq(1)), 1);
        assert_eq!(count_references(&tabs, &BlobKey::from_seq(9)), 0);
    }

    #[test]
    fn test_count_references_empty_model() {
        assert_eq!(count_references(&[], &BlobKey::from_seq(0)), 0);
    }

    #[test]
    fn test_unreferenced_filters_and_dedups() {
        let tabs = tabs();
        let keys = unreferenced(
            &tabs,
            vec![
                BlobKey::from_seq(0),
                BlobKey::from_seq(5),
                BlobKey::from_seq(5),
                BlobKey::from_seq(1),
            ],
        );
        assert_eq!(keys, vec![BlobKey::from_seq(5)]);
    }
}

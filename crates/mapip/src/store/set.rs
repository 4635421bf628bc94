use std::collections::{BTreeMap, BTreeSet};

use crate::translation::{Event, EventKind, Translation};

/// The authoritative set of active translations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationSet {
    translations: BTreeSet<Translation>,
}

impl TranslationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or removes the event's translation. Returns whether the set changed.
    pub fn apply(&mut self, event: &Event) -> bool {
        match event.kind {
            EventKind::Added => self.translations.insert(event.translation.clone()),
            EventKind::Deleted => self.translations.remove(&event.translation),
        }
    }

    pub fn contains(&self, translation: &Translation) -> bool {
        self.translations.contains(translation)
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Translation> {
        self.translations.iter()
    }

    /// Collapses the set into a flat `from -> to` map.
    ///
    /// A self-loop never replaces a translation to another address. Otherwise
    /// the last translation in sort order wins.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = BTreeMap::new();
        for t in &self.translations {
            match map.get(&t.from) {
                Some(existing) if t.is_self_loop() && existing != &t.from => {}
                _ => {
                    map.insert(t.from.clone(), t.to.clone());
                }
            }
        }
        map
    }
}

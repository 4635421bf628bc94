//! Address translation value types.

use std::fmt;

/// A directional translation of one address to another.
///
/// `(a, b)` and `(b, a)` are distinct translations unless `a == b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Translation {
    pub from: String,
    pub to: String,
}

impl Translation {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// A translation of an address onto itself.
    pub fn self_loop(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            from: address.clone(),
            to: address,
        }
    }

    /// Returns a new translation with `from` and `to` swapped.
    pub fn reverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// What an event does to the translation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Deleted,
}

/// A translation tagged with the change to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub translation: Translation,
    pub kind: EventKind,
}

impl Event {
    pub fn new(translation: Translation, kind: EventKind) -> Self {
        Self { translation, kind }
    }

    pub fn added(translation: Translation) -> Self {
        Self::new(translation, EventKind::Added)
    }

    pub fn deleted(translation: Translation) -> Self {
        Self::new(translation, EventKind::Deleted)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EventKind::Added => "added",
            EventKind::Deleted => "deleted",
        };
        write!(f, "{} {}", kind, self.translation)
    }
}

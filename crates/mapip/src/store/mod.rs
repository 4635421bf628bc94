//! The aggregated translation store.
//!
//! A single task owns the [`TranslationSet`] and the output file. Producers
//! only hold a [`StoreHandle`] and enqueue events; the task applies each event
//! and then rewrites the file before looking at the next one, so every write
//! reflects a prefix of the event queue.

pub mod set;
pub mod writer;

use std::path::PathBuf;

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use set::TranslationSet;
pub use writer::MapWriter;

use crate::error::StoreError;
use crate::translation::{Event, EventKind};

/// Cloneable sender side of the store queue.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    sender: mpsc::UnboundedSender<Event>,
}

impl StoreHandle {
    /// Enqueues an event. Never waits for it to be applied.
    pub fn apply(&self, event: Event) -> Result<(), StoreError> {
        self.sender.send(event).map_err(|_| StoreError::Closed)
    }

    pub fn apply_all(&self, events: impl IntoIterator<Item = Event>) -> Result<(), StoreError> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }
}

/// Owner of the translation set; see [`TranslationStore::run`].
pub struct TranslationStore {
    set: TranslationSet,
    writer: MapWriter,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl TranslationStore {
    /// Creates an empty store writing to `output_path`, and its handle.
    pub fn new(output_path: impl Into<PathBuf>) -> (Self, StoreHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let store = Self {
            set: TranslationSet::new(),
            writer: MapWriter::new(output_path),
            receiver,
        };
        (store, StoreHandle { sender })
    }

    /// Applies queued events until every handle is dropped or `cancel` fires.
    ///
    /// Returns the final translation set.
    pub async fn run(mut self, cancel: CancellationToken) -> TranslationSet {
        info!("Writing ip map to {}", self.writer.output_path().display());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Translation store cancelled");
                    break;
                }
                event = self.receiver.recv() => match event {
                    Some(event) => self.apply(event).await,
                    None => {
                        debug!("Translation store input closed");
                        break;
                    }
                },
            }
        }

        self.set
    }

    async fn apply(&mut self, event: Event) {
        let changed = self.set.apply(&event);
        match event.kind {
            EventKind::Added => debug!("added entry: {} (changed: {})", event.translation, changed),
            EventKind::Deleted => {
                debug!("deleted entry: {} (changed: {})", event.translation, changed)
            }
        }

        // The set stays authoritative even if the file cannot be written.
        if let Err(e) = self.writer.persist(&self.set).await {
            error!("Failed to persist ip map: {}", e);
        }
    }
}

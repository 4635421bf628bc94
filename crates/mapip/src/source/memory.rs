//! In-process source driven by the caller.

use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};

use super::{ResourceSource, Subscription};
use crate::error::SourceError;
use crate::resource::{Observation, Resource};

#[derive(Default)]
struct Inner {
    snapshot: Vec<Resource>,
    current: Option<mpsc::UnboundedSender<Observation>>,
    failures_left: u32,
}

/// A source whose contents and subscriptions are controlled programmatically.
///
/// Only the most recent subscription receives published observations, like a
/// fresh watch on a real API server.
pub struct MemorySource {
    name: String,
    inner: Mutex<Inner>,
    subscriptions: watch::Sender<usize>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        let (subscriptions, _) = watch::channel(0);
        Self {
            name: name.into(),
            inner: Mutex::new(Inner::default()),
            subscriptions,
        }
    }

    pub fn with_snapshot(self, snapshot: Vec<Resource>) -> Self {
        self.set_snapshot(snapshot);
        self
    }

    /// Replaces what [`ResourceSource::list`] returns.
    pub fn set_snapshot(&self, snapshot: Vec<Resource>) {
        self.lock().snapshot = snapshot;
    }

    /// Makes the next `count` subscribe attempts fail.
    pub fn fail_next_subscribes(&self, count: u32) {
        self.lock().failures_left = count;
    }

    /// Delivers an observation to the active subscription.
    ///
    /// Returns false if nobody is subscribed; the observation is dropped.
    pub fn publish(&self, observation: Observation) -> bool {
        let mut inner = self.lock();
        let delivered = match &inner.current {
            Some(sender) => sender.send(observation).is_ok(),
            None => false,
        };
        if !delivered {
            inner.current = None;
        }
        delivered
    }

    /// Ends the active subscription stream.
    pub fn close(&self) {
        self.lock().current = None;
    }

    /// Number of successful subscribe calls so far.
    pub fn subscription_count(&self) -> usize {
        *self.subscriptions.borrow()
    }

    /// Waits until at least `count` subscriptions have been opened.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        let mut rx = self.subscriptions.subscribe();
        let _ = rx.wait_for(|n| *n >= count).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a panicking test; the data is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ResourceSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self) -> Result<Vec<Resource>, SourceError> {
        Ok(self.lock().snapshot.clone())
    }

    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        let receiver = {
            let mut inner = self.lock();
            if inner.failures_left > 0 {
                inner.failures_left -= 1;
                return Err(SourceError::Unavailable(self.name.clone()));
            }
            let (sender, receiver) = mpsc::unbounded_channel();
            inner.current = Some(sender);
            receiver
        };
        self.subscriptions.send_modify(|n| *n += 1);

        let stream = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|obs| (obs, receiver))
        });
        Ok(stream.boxed())
    }
}

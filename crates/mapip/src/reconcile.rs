//! Keeps the store in sync with one resource collection.
//!
//! Each reconciler runs a small state machine:
//!
//! ```text
//! Subscribing --ok--> Active --stream ended, backoff--> Subscribing
//!      |  ^             |
//!      |  +--backoff----+ (subscribe failed)
//!      +------------+---+--cancelled--> Terminal
//! ```
//!
//! Losing a subscription is routine; the reconciler waits out the backoff and
//! opens a new one. A subscription that ends before delivering anything counts
//! as a failed attempt.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::derive::Deriver;
use crate::error::ReconcileError;
use crate::resource::Observation;
use crate::source::{ResourceSource, Subscription};
use crate::store::StoreHandle;

/// Default wait between failed subscribe attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Fixed wait after a failed subscribe attempt.
    pub backoff: Duration,
    /// Consecutive failed attempts tolerated before giving up; `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            max_retries: None,
        }
    }
}

enum LoopState {
    Subscribing,
    Active {
        subscription: Subscription,
        observed: bool,
    },
    Terminal,
}

enum Wake {
    Cancelled,
    Closed,
    Observed(Observation),
}

/// Forwards observations from one source into the store.
pub struct Reconciler {
    source: Arc<dyn ResourceSource>,
    deriver: Arc<Deriver>,
    store: StoreHandle,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn ResourceSource>,
        deriver: Arc<Deriver>,
        store: StoreHandle,
        settings: ReconcileSettings,
    ) -> Self {
        Self {
            source,
            deriver,
            store,
            settings,
        }
    }

    /// Runs until `cancel` fires or the store stops accepting events.
    ///
    /// Only fails when `max_retries` is set and exceeded.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ReconcileError> {
        let span = info_span!("reconcile", source = %self.source.name());
        self.run_loop(cancel).instrument(span).await
    }

    async fn run_loop(self, cancel: CancellationToken) -> Result<(), ReconcileError> {
        let mut state = LoopState::Subscribing;
        let mut failures: u32 = 0;

        loop {
            state = match state {
                LoopState::Subscribing => self.subscribe(&cancel, &mut failures).await?,
                LoopState::Active {
                    mut subscription,
                    observed,
                } => {
                    let wake = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Wake::Cancelled,
                        next = subscription.next() => match next {
                            Some(observation) => Wake::Observed(observation),
                            None => Wake::Closed,
                        },
                    };

                    match wake {
                        Wake::Cancelled => LoopState::Terminal,
                        Wake::Closed => {
                            drop(subscription);
                            if observed {
                                info!("Subscription closed, resubscribing");
                            } else {
                                warn!("Subscription closed before any observation");
                                self.count_failure(&mut failures)?;
                            }
                            self.backoff(&cancel).await
                        }
                        Wake::Observed(observation) => {
                            failures = 0;
                            if self.forward(&observation) {
                                LoopState::Active {
                                    subscription,
                                    observed: true,
                                }
                            } else {
                                warn!("Translation store closed, stopping");
                                LoopState::Terminal
                            }
                        }
                    }
                }
                LoopState::Terminal => break,
            };
        }

        debug!("Reconciler stopped");
        Ok(())
    }

    async fn subscribe(
        &self,
        cancel: &CancellationToken,
        failures: &mut u32,
    ) -> Result<LoopState, ReconcileError> {
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(LoopState::Terminal),
            attempt = self.source.subscribe() => attempt,
        };

        match attempt {
            Ok(subscription) => {
                info!("Subscribed");
                Ok(LoopState::Active {
                    subscription,
                    observed: false,
                })
            }
            Err(e) => {
                warn!(error = %e, attempt = *failures + 1, "Failed to subscribe");
                self.count_failure(failures)?;
                Ok(self.backoff(cancel).await)
            }
        }
    }

    /// Records a failed attempt; errors once `max_retries` is exceeded.
    fn count_failure(&self, failures: &mut u32) -> Result<(), ReconcileError> {
        *failures += 1;
        match self.settings.max_retries {
            Some(max) if *failures > max => Err(ReconcileError::RetriesExhausted {
                source_name: self.source.name().to_string(),
                attempts: *failures,
            }),
            _ => Ok(()),
        }
    }

    async fn backoff(&self, cancel: &CancellationToken) -> LoopState {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => LoopState::Terminal,
            _ = tokio::time::sleep(self.settings.backoff) => LoopState::Subscribing,
        }
    }

    /// Derives and enqueues the events for one observation, in order.
    /// Returns false once the store is gone.
    fn forward(&self, observation: &Observation) -> bool {
        let events = self.deriver.derive(observation);
        debug!(
            resource = observation.resource.name(),
            kind = ?observation.kind,
            events = events.len(),
            "Observed change"
        );
        self.store.apply_all(events).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{NodeAddress, NodeSnapshot, Resource};
    use crate::source::MemorySource;
    use crate::store::TranslationStore;
    use crate::error::SourceError;
    use crate::translation::Translation;
    use async_trait::async_trait;
    use futures_util::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Every subscription ends immediately, like a watch rejected on its first frame.
    #[derive(Default)]
    struct EndingSource {
        subscribes: AtomicUsize,
    }

    #[async_trait]
    impl ResourceSource for EndingSource {
        fn name(&self) -> &str {
            "ending"
        }

        async fn list(&self) -> Result<Vec<Resource>, SourceError> {
            Ok(Vec::new())
        }

        async fn subscribe(&self) -> Result<Subscription, SourceError> {
            self.subscribes.fetch_add(1, Ordering::SeqCst);
            Ok(stream::empty().boxed())
        }
    }

    fn settings(max_retries: Option<u32>) -> ReconcileSettings {
        ReconcileSettings {
            backoff: Duration::from_millis(10),
            max_retries,
        }
    }

    fn node(name: &str, internal: &str) -> Resource {
        Resource::Node(NodeSnapshot::new(name, vec![NodeAddress::internal(internal)]))
    }

    #[tokio::test]
    async fn test_resubscribes_after_close() {
        let dir = TempDir::new().unwrap();
        let (store, handle) = TranslationStore::new(dir.path().join("out.yaml"));
        let cancel = CancellationToken::new();
        let store_task = tokio::spawn(store.run(cancel.clone()));

        let source = Arc::new(MemorySource::new("nodes"));
        let reconciler = Reconciler::new(
            source.clone(),
            Arc::new(Deriver::default()),
            handle,
            settings(None),
        );
        let task = tokio::spawn(reconciler.run(cancel.clone()));

        source.wait_for_subscriptions(1).await;
        assert!(source.publish(Observation::added(node("a", "10.0.0.1"))));
        source.close();
        source.wait_for_subscriptions(2).await;
        assert!(source.publish(Observation::added(node("b", "10.0.0.2"))));

        let path = dir.path().join("out.yaml");
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !std::fs::read_to_string(&path).is_ok_and(|s| s.contains("10.0.0.2")) {
            assert!(tokio::time::Instant::now() < deadline, "event after resubscribe was lost");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        task.await.unwrap().unwrap();
        let set = store_task.await.unwrap();
        assert!(set.contains(&Translation::self_loop("10.0.0.1")));
        assert!(set.contains(&Translation::self_loop("10.0.0.2")));
    }

    #[tokio::test]
    async fn test_retries_failed_subscribe() {
        let (_store, handle) = TranslationStore::new("unused.yaml");
        let source = Arc::new(MemorySource::new("nodes"));
        source.fail_next_subscribes(3);

        let cancel = CancellationToken::new();
        let reconciler = Reconciler::new(
            source.clone(),
            Arc::new(Deriver::default()),
            handle,
            settings(Some(5)),
        );
        let task = tokio::spawn(reconciler.run(cancel.clone()));

        tokio::time::timeout(Duration::from_secs(2), source.wait_for_subscriptions(1))
            .await
            .expect("never subscribed");
        cancel.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (_store, handle) = TranslationStore::new("unused.yaml");
        let source = Arc::new(MemorySource::new("nodes"));
        source.fail_next_subscribes(10);

        let reconciler = Reconciler::new(
            source,
            Arc::new(Deriver::default()),
            handle,
            settings(Some(2)),
        );
        let err = reconciler.run(CancellationToken::new()).await.unwrap_err();
        let ReconcileError::RetriesExhausted { source_name, attempts } = err;
        assert_eq!(source_name, "nodes");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let (_store, handle) = TranslationStore::new("unused.yaml");
        let source = Arc::new(MemorySource::new("nodes"));
        source.fail_next_subscribes(u32::MAX);

        let cancel = CancellationToken::new();
        let reconciler = Reconciler::new(
            source,
            Arc::new(Deriver::default()),
            handle,
            ReconcileSettings {
                backoff: Duration::from_secs(3600),
                max_retries: None,
            },
        );
        let task = tokio::spawn(reconciler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("reconciler ignored cancellation")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_stops_when_store_closed() {
        let (store, handle) = TranslationStore::new("unused.yaml");
        drop(store);

        let source = Arc::new(MemorySource::new("nodes"));
        let reconciler = Reconciler::new(
            source.clone(),
            Arc::new(Deriver::default()),
            handle,
            settings(None),
        );
        let task = tokio::spawn(reconciler.run(CancellationToken::new()));

        source.wait_for_subscriptions(1).await;
        source.publish(Observation::added(node("a", "10.0.0.1")));
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("reconciler kept running")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_backs_off_when_stream_ends() {
        let (_store, handle) = TranslationStore::new("unused.yaml");
        let source = Arc::new(EndingSource::default());
        let cancel = CancellationToken::new();
        let reconciler = Reconciler::new(
            source.clone(),
            Arc::new(Deriver::default()),
            handle,
            ReconcileSettings {
                backoff: Duration::from_secs(1),
                max_retries: None,
            },
        );
        let task = tokio::spawn(reconciler.run(cancel.clone()));

        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("reconciler ignored cancellation")
            .unwrap()
            .unwrap();
        assert_eq!(source.subscribes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_streams_count_toward_max_retries() {
        let (_store, handle) = TranslationStore::new("unused.yaml");
        let source = Arc::new(EndingSource::default());
        let reconciler = Reconciler::new(
            source.clone(),
            Arc::new(Deriver::default()),
            handle,
            settings(Some(2)),
        );

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            reconciler.run(CancellationToken::new()),
        )
        .await
        .expect("reconciler never gave up")
        .unwrap_err();
        let ReconcileError::RetriesExhausted { attempts, .. } = err;
        assert_eq!(attempts, 3);
        assert_eq!(source.subscribes.load(Ordering::SeqCst), 3);
    }
}

//! Startup order and task wiring.
//!
//! The store task starts first, then every source is listed once and the
//! snapshot is fed to the store, and only then do the reconcilers subscribe.
//! An entity removed between the listing and the subscription is never
//! deleted from the map.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::derive::Deriver;
use crate::error::{MapIpError, ReconcileError, Result};
use crate::reconcile::{ReconcileSettings, Reconciler};
use crate::resource::Observation;
use crate::source::ResourceSource;
use crate::store::{StoreHandle, TranslationSet, TranslationStore};

/// Everything the core needs apart from the sources.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub output_path: PathBuf,
    pub deriver: Deriver,
    pub reconcile: ReconcileSettings,
}

/// The collections to watch.
pub struct Sources {
    pub nodes: Arc<dyn ResourceSource>,
    pub config_record: Option<Arc<dyn ResourceSource>>,
}

impl Sources {
    pub fn nodes(nodes: Arc<dyn ResourceSource>) -> Self {
        Self {
            nodes,
            config_record: None,
        }
    }

    pub fn with_config_record(mut self, source: Arc<dyn ResourceSource>) -> Self {
        self.config_record = Some(source);
        self
    }

    fn all(&self) -> Vec<Arc<dyn ResourceSource>> {
        std::iter::once(Arc::clone(&self.nodes))
            .chain(self.config_record.iter().cloned())
            .collect()
    }
}

/// Lists `source` once and enqueues an `Added` derivation of every entity.
///
/// Returns the number of events enqueued.
pub async fn seed(
    source: &dyn ResourceSource,
    deriver: &Deriver,
    store: &StoreHandle,
) -> Result<usize> {
    let resources = source.list().await?;
    info!(source = source.name(), entities = resources.len(), "Seeding from snapshot");

    let mut count = 0;
    for resource in resources {
        let events = deriver.derive(&Observation::added(resource));
        count += events.len();
        store.apply_all(events)?;
    }
    Ok(count)
}

/// Runs the store and one reconciler per source until `cancel` fires.
///
/// Returns the final translation set. A failed snapshot listing aborts
/// startup; a reconciler that gives up stops everything else too.
pub async fn run(
    options: AppOptions,
    sources: Sources,
    cancel: CancellationToken,
) -> Result<TranslationSet> {
    let (store, handle) = TranslationStore::new(&options.output_path);
    let store_task = tokio::spawn(store.run(cancel.clone()));
    let deriver = Arc::new(options.deriver);

    for source in sources.all() {
        if let Err(e) = seed(source.as_ref(), &deriver, &handle).await {
            error!(source = source.name(), error = %e, "Failed to list current state");
            cancel.cancel();
            let _ = store_task.await;
            return Err(e);
        }
    }

    let loops: Vec<JoinHandle<std::result::Result<(), ReconcileError>>> = sources
        .all()
        .into_iter()
        .map(|source| {
            let reconciler = Reconciler::new(
                source,
                Arc::clone(&deriver),
                handle.clone(),
                options.reconcile,
            );
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let result = reconciler.run(cancel.clone()).await;
                if let Err(e) = &result {
                    error!(error = %e, "Reconciler failed, shutting down");
                    cancel.cancel();
                }
                result
            })
        })
        .collect();
    drop(handle);

    let mut first_error = None;
    for task in loops {
        let outcome = match task.await {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => MapIpError::from(e),
            Err(e) => {
                cancel.cancel();
                MapIpError::Task(e.to_string())
            }
        };
        first_error.get_or_insert(outcome);
    }

    let set = store_task
        .await
        .map_err(|e| MapIpError::Task(e.to_string()))?;

    match first_error {
        Some(e) => Err(e),
        None => {
            info!(translations = set.len(), "Stopped");
            Ok(set)
        }
    }
}

//! Shared fixtures for integration tests.
//!
//! `Harness` runs the full app against in-memory sources and a temporary
//! output file, and offers polling helpers for asserting on that file.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mapip::derive::StaticDiscovery;
use mapip::{
    app, AppOptions, Deriver, MemorySource, NodeAddress, NodePolicy, NodeSnapshot,
    ReconcileSettings, Resource, Sources, TranslationSet,
};

pub const WAIT: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(20);

pub struct Harness {
    _dir: TempDir,
    pub output_path: PathBuf,
    pub nodes: Arc<MemorySource>,
    pub records: Option<Arc<MemorySource>>,
    cancel: CancellationToken,
    task: JoinHandle<mapip::Result<TranslationSet>>,
}

impl Harness {
    pub async fn start(nodes: MemorySource, records: Option<MemorySource>) -> Self {
        let deriver = Deriver::new(NodePolicy::default(), Arc::new(StaticDiscovery::none()));
        Self::start_with(nodes, records, deriver).await
    }

    pub async fn start_with(
        nodes: MemorySource,
        records: Option<MemorySource>,
        deriver: Deriver,
    ) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let output_path = dir.path().join("output.yaml");
        let nodes = Arc::new(nodes);
        let records = records.map(Arc::new);

        let mut sources = Sources::nodes(nodes.clone());
        if let Some(records) = &records {
            sources = sources.with_config_record(records.clone());
        }

        let options = AppOptions {
            output_path: output_path.clone(),
            deriver,
            reconcile: ReconcileSettings {
                backoff: Duration::from_millis(10),
                max_retries: None,
            },
        };
        let cancel = CancellationToken::new();
        let task = tokio::spawn(app::run(options, sources, cancel.clone()));

        let harness = Self {
            _dir: dir,
            output_path,
            nodes,
            records,
            cancel,
            task,
        };
        harness.wait_subscribed().await;
        harness
    }

    /// Waits until every source has an open subscription.
    pub async fn wait_subscribed(&self) {
        tokio::time::timeout(WAIT, async {
            self.nodes.wait_for_subscriptions(1).await;
            if let Some(records) = &self.records {
                records.wait_for_subscriptions(1).await;
            }
        })
        .await
        .expect("sources were never subscribed");
    }

    /// Parses the output file, if it exists and is valid.
    pub fn read_map(&self) -> Option<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(&self.output_path).ok()?;
        serde_yaml::from_str(&content).ok()
    }

    /// Polls the output file until `check` holds, panicking after [`WAIT`].
    pub async fn eventually<F>(&self, what: &str, check: F)
    where
        F: Fn(&BTreeMap<String, String>) -> bool,
    {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            if self.read_map().is_some_and(|map| check(&map)) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {}; file: {:?}",
                what,
                self.read_map()
            );
            tokio::time::sleep(POLL).await;
        }
    }

    /// Polls until the file contains every pair of `expected`.
    pub async fn eventually_contains(&self, expected: &[(&str, &str)]) {
        self.eventually(&format!("{:?}", expected), |map| {
            expected
                .iter()
                .all(|(from, to)| map.get(*from).map(String::as_str) == Some(*to))
        })
        .await;
    }

    pub async fn stop(self) -> TranslationSet {
        self.cancel.cancel();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("app did not stop")
            .expect("app task panicked")
            .expect("app failed")
    }
}

pub fn node(name: &str, addresses: Vec<NodeAddress>) -> Resource {
    Resource::Node(NodeSnapshot::new(name, addresses))
}

pub fn record(name: &str, entries: &[(&str, &str)]) -> Resource {
    Resource::ConfigRecord(mapip::ConfigRecord::new(
        name,
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    ))
}

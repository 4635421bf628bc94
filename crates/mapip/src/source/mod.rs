//! Sources of resource observations.
//!
//! A source can list the entities it currently knows about and open a live
//! subscription of changes. Subscriptions end whenever the underlying stream
//! does; callers are expected to subscribe again.

pub mod k8s;
pub mod memory;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub use k8s::{KubeConfigMapSource, KubeNodeSource};
pub use memory::MemorySource;

use crate::error::SourceError;
use crate::resource::{Observation, Resource};

/// A live stream of observations. It may end at any time.
pub type Subscription = BoxStream<'static, Observation>;

#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Returns a snapshot of every entity the source currently holds.
    async fn list(&self) -> Result<Vec<Resource>, SourceError>;

    /// Opens a new subscription.
    async fn subscribe(&self) -> Result<Subscription, SourceError>;
}

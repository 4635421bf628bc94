pub mod app;
pub mod config;
pub mod derive;
pub mod error;
pub mod reconcile;
pub mod resource;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod translation;

pub use app::{AppOptions, Sources};
pub use config::{Config, LogFormat};
pub use derive::{AddressDiscovery, Deriver, NodePolicy};
pub use error::{
    ConfigError, MapIpError, PersistError, ReconcileError, Result, SourceError, StoreError,
};
pub use reconcile::{ReconcileSettings, Reconciler};
pub use resource::{ChangeKind, ConfigRecord, NodeAddress, NodeSnapshot, Observation, Resource};
pub use source::{MemorySource, ResourceSource, Subscription};
pub use store::{StoreHandle, TranslationSet, TranslationStore};
pub use translation::{Event, EventKind, Translation};

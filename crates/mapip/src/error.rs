use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapIpError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resource source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Reconcile error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Kubernetes API error for {resource}: {source}")]
    Kube {
        resource: String,
        #[source]
        source: kube::Error,
    },

    #[error("Source {0} is unavailable")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Translation store is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ip map for '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Gave up subscribing to {source_name} after {attempts} attempts")]
    RetriesExhausted { source_name: String, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, MapIpError>;

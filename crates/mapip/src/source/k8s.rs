//! Kubernetes-backed sources for nodes and a single config map.

use std::future;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use k8s_openapi::api::core::v1::{ConfigMap, Node};
use kube::api::{Api, ListParams, WatchEvent, WatchParams};
use kube::{Client, ResourceExt};

use super::{ResourceSource, Subscription};
use crate::error::SourceError;
use crate::resource::{
    AddressKind, ConfigRecord, NodeAddress, NodeSnapshot, Observation, Resource,
};

const NODE_INTERNAL_IP: &str = "InternalIP";
const NODE_EXTERNAL_IP: &str = "ExternalIP";

/// Watches every node of the cluster.
pub struct KubeNodeSource {
    api: Api<Node>,
}

impl KubeNodeSource {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl ResourceSource for KubeNodeSource {
    fn name(&self) -> &str {
        "nodes"
    }

    async fn list(&self) -> Result<Vec<Resource>, SourceError> {
        let nodes = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|e| kube_error("nodes", e))?;
        Ok(nodes.items.iter().map(node_resource).collect())
    }

    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        let events = self
            .api
            .watch(&WatchParams::default(), "0")
            .await
            .map_err(|e| kube_error("nodes", e))?;
        Ok(observations("nodes", events, node_resource))
    }
}

/// Watches one named config map.
pub struct KubeConfigMapSource {
    api: Api<ConfigMap>,
    name: String,
    label: String,
}

impl KubeConfigMapSource {
    pub fn new(client: Client, namespace: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            api: Api::namespaced(client, namespace),
            label: format!("configmap {}/{}", namespace, name),
            name,
        }
    }
}

#[async_trait]
impl ResourceSource for KubeConfigMapSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn list(&self) -> Result<Vec<Resource>, SourceError> {
        let config_map = self
            .api
            .get_opt(&self.name)
            .await
            .map_err(|e| kube_error(&self.label, e))?;
        Ok(config_map.iter().map(config_map_resource).collect())
    }

    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        let params = WatchParams::default().fields(&format!("metadata.name={}", self.name));
        let events = self
            .api
            .watch(&params, "0")
            .await
            .map_err(|e| kube_error(&self.label, e))?;
        Ok(observations("configmaps", events, config_map_resource))
    }
}

enum Step {
    Emit(Observation),
    Skip,
    Stop,
}

/// Adapts a raw watch stream. The subscription ends at the first error.
fn observations<K, S>(label: &'static str, events: S, convert: fn(&K) -> Resource) -> Subscription
where
    K: Send + 'static,
    S: Stream<Item = Result<WatchEvent<K>, kube::Error>> + Send + 'static,
{
    events
        .map(move |event| match event {
            Ok(WatchEvent::Added(obj)) => Step::Emit(Observation::added(convert(&obj))),
            Ok(WatchEvent::Modified(obj)) => Step::Emit(Observation::modified(convert(&obj))),
            Ok(WatchEvent::Deleted(obj)) => Step::Emit(Observation::deleted(convert(&obj))),
            Ok(WatchEvent::Bookmark(_)) => Step::Skip,
            Ok(WatchEvent::Error(e)) => {
                log::warn!("Watch on {} returned an error: {:?}", label, e);
                Step::Stop
            }
            Err(e) => {
                log::warn!("Watch on {} failed: {}", label, e);
                Step::Stop
            }
        })
        .take_while(|step| future::ready(!matches!(step, Step::Stop)))
        .filter_map(|step| {
            future::ready(match step {
                Step::Emit(observation) => Some(observation),
                Step::Skip | Step::Stop => None,
            })
        })
        .boxed()
}

fn kube_error(resource: &str, source: kube::Error) -> SourceError {
    SourceError::Kube {
        resource: resource.to_string(),
        source,
    }
}

fn address_kind(kind: &str) -> AddressKind {
    match kind {
        NODE_INTERNAL_IP => AddressKind::Internal,
        NODE_EXTERNAL_IP => AddressKind::External,
        _ => AddressKind::Other,
    }
}

pub fn node_resource(node: &Node) -> Resource {
    let addresses = node
        .status
        .as_ref()
        .and_then(|status| status.addresses.as_ref())
        .map(|addrs| {
            addrs
                .iter()
                .map(|a| NodeAddress {
                    kind: address_kind(&a.type_),
                    address: a.address.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    Resource::Node(NodeSnapshot::new(node.name_any(), addresses))
}

pub fn config_map_resource(config_map: &ConfigMap) -> Resource {
    Resource::ConfigRecord(ConfigRecord::new(
        config_map.name_any(),
        config_map.data.clone().unwrap_or_default(),
    ))
}

//! Turns resource observations into translation events.
//!
//! - Nodes: internal addresses map to the node's external address (or to
//!   themselves when it has none), external addresses map to themselves.
//! - Config records: every entry embeds a flat `from: to` map that is taken
//!   verbatim.
//!
//! Derivation recomputes the full set of events for the observed entity every
//! time; it never diffs against earlier observations.

pub mod config_record;
pub mod discovery;
pub mod node;

use std::sync::Arc;

pub use config_record::{parse_address_map, record_events};
pub use discovery::{AddressDiscovery, InterfaceDiscovery, StaticDiscovery};
pub use node::{node_events, NodePolicy};

use crate::resource::{Observation, Resource};
use crate::translation::Event;

/// Derives events for any kind of observation.
#[derive(Clone)]
pub struct Deriver {
    policy: NodePolicy,
    /// Name of the node this process runs on.
    node_name: Option<String>,
    discovery: Arc<dyn AddressDiscovery>,
}

impl Deriver {
    pub fn new(policy: NodePolicy, discovery: Arc<dyn AddressDiscovery>) -> Self {
        Self {
            policy,
            node_name: None,
            discovery,
        }
    }

    /// Sets the node whose observations also map this process's public address.
    pub fn with_node_name(mut self, node_name: Option<String>) -> Self {
        self.node_name = node_name.filter(|name| !name.is_empty());
        self
    }

    pub fn derive(&self, observation: &Observation) -> Vec<Event> {
        match &observation.resource {
            Resource::Node(node) => {
                let own = if self.is_own_node(&node.name) && observation.kind.is_upsert() {
                    // An empty address is still forwarded so the failure is visible in the map.
                    Some(self.discovery.discover().unwrap_or_default())
                } else {
                    None
                };
                node_events(node, observation.kind, &self.policy, own.as_deref())
            }
            Resource::ConfigRecord(record) => record_events(record, observation.kind),
        }
    }

    fn is_own_node(&self, name: &str) -> bool {
        self.node_name.as_deref() == Some(name)
    }
}

impl Default for Deriver {
    fn default() -> Self {
        Self::new(NodePolicy::default(), Arc::new(InterfaceDiscovery))
    }
}

impl std::fmt::Debug for Deriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deriver")
            .field("policy", &self.policy)
            .field("node_name", &self.node_name)
            .finish()
    }
}

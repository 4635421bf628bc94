//! Snapshots of the external entities the translation map is derived from.

use std::collections::BTreeMap;

use crate::translation::EventKind;

/// The change reported for an observed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Anything other than a deletion is an upsert.
    pub fn event_kind(self) -> EventKind {
        match self {
            ChangeKind::Deleted => EventKind::Deleted,
            ChangeKind::Added | ChangeKind::Modified => EventKind::Added,
        }
    }

    pub fn is_upsert(self) -> bool {
        self != ChangeKind::Deleted
    }
}

/// Classification of a node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Internal,
    External,
    /// Hostnames, DNS names and anything else not used for translation.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub kind: AddressKind,
    pub address: String,
}

impl NodeAddress {
    pub fn internal(address: impl Into<String>) -> Self {
        Self {
            kind: AddressKind::Internal,
            address: address.into(),
        }
    }

    pub fn external(address: impl Into<String>) -> Self {
        Self {
            kind: AddressKind::External,
            address: address.into(),
        }
    }
}

/// A node and its addresses, in the order the cluster reports them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub name: String,
    pub addresses: Vec<NodeAddress>,
}

impl NodeSnapshot {
    pub fn new(name: impl Into<String>, addresses: Vec<NodeAddress>) -> Self {
        Self {
            name: name.into(),
            addresses,
        }
    }
}

/// A configuration record whose entries each embed a flat `from: to` YAML map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub name: String,
    pub data: BTreeMap<String, String>,
}

impl ConfigRecord {
    pub fn new(name: impl Into<String>, data: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Node(NodeSnapshot),
    ConfigRecord(ConfigRecord),
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Resource::Node(node) => &node.name,
            Resource::ConfigRecord(record) => &record.name,
        }
    }
}

/// A point-in-time snapshot of one entity plus the change that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub kind: ChangeKind,
    pub resource: Resource,
}

impl Observation {
    pub fn new(kind: ChangeKind, resource: Resource) -> Self {
        Self { kind, resource }
    }

    pub fn added(resource: Resource) -> Self {
        Self::new(ChangeKind::Added, resource)
    }

    pub fn modified(resource: Resource) -> Self {
        Self::new(ChangeKind::Modified, resource)
    }

    pub fn deleted(resource: Resource) -> Self {
        Self::new(ChangeKind::Deleted, resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_deleted_maps_to_deleted() {
        assert_eq!(ChangeKind::Added.event_kind(), EventKind::Added);
        assert_eq!(ChangeKind::Modified.event_kind(), EventKind::Added);
        assert_eq!(ChangeKind::Deleted.event_kind(), EventKind::Deleted);
        assert!(!ChangeKind::Deleted.is_upsert());
    }

    #[test]
    fn test_resource_name() {
        let node = Resource::Node(NodeSnapshot::new("node-1", vec![]));
        let record = Resource::ConfigRecord(ConfigRecord::new("ips", BTreeMap::new()));
        assert_eq!(node.name(), "node-1");
        assert_eq!(record.name(), "ips");
    }
}

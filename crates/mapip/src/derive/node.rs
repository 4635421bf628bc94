//! Node address policy.

use crate::resource::{AddressKind, ChangeKind, NodeSnapshot};
use crate::translation::{Event, Translation};

/// Tunables for node derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePolicy {
    /// Also emit `external -> internal` for every overridden internal address.
    pub emit_reverse: bool,
}

impl Default for NodePolicy {
    fn default() -> Self {
        Self { emit_reverse: true }
    }
}

/// Derives the events for one node observation.
///
/// Every internal address maps to itself unless the node has an external
/// address, in which case it maps to the last external address listed.
/// Every external address also maps to itself. `own_address` is this
/// process's public address when the node is the one it runs on; it is only
/// used for upserts.
pub fn node_events(
    node: &NodeSnapshot,
    change: ChangeKind,
    policy: &NodePolicy,
    own_address: Option<&str>,
) -> Vec<Event> {
    let kind = change.event_kind();
    let mut events = Vec::with_capacity(node.addresses.len());
    let mut internal_idx = Vec::new();
    let mut last_internal: Option<&str> = None;
    let mut last_external: Option<&str> = None;

    for addr in &node.addresses {
        match addr.kind {
            AddressKind::Internal => {
                internal_idx.push(events.len());
                last_internal = Some(addr.address.as_str());
            }
            AddressKind::External => last_external = Some(addr.address.as_str()),
            AddressKind::Other => continue,
        }
        events.push(Event::new(Translation::self_loop(addr.address.as_str()), kind));
    }

    if let Some(external) = last_external {
        for &i in &internal_idx {
            events[i].translation.to = external.to_string();
        }

        if policy.emit_reverse {
            let reversed: Vec<Event> = internal_idx
                .iter()
                .map(|&i| &events[i].translation)
                .filter(|t| !t.is_self_loop())
                .map(|t| Event::new(t.reverse(), kind))
                .collect();
            events.extend(reversed);
        }
    }

    if let Some(own) = own_address {
        if change.is_upsert() {
            if let Some(target) = last_external.or(last_internal) {
                events.push(Event::added(Translation::new(own, target)));
            }
        }
    }

    events
}

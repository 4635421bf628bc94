//! Discovery of the address this process is reachable on.

use std::net::IpAddr;

/// Finds this process's own public address.
///
/// Discovery is best-effort; `None` means no usable address was found.
pub trait AddressDiscovery: Send + Sync {
    fn discover(&self) -> Option<String>;
}

/// Picks the first non-loopback address of the local network interfaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterfaceDiscovery;

impl AddressDiscovery for InterfaceDiscovery {
    fn discover(&self) -> Option<String> {
        let interfaces = match if_addrs::get_if_addrs() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                log::error!("Failed to list network interfaces: {}", e);
                return None;
            }
        };

        let found = pick_public(interfaces.iter().map(|iface| iface.ip()));
        if found.is_none() {
            log::warn!("No public ip found on local interfaces");
        }
        found.map(|ip| ip.to_string())
    }
}

fn pick_public(mut addrs: impl Iterator<Item = IpAddr>) -> Option<IpAddr> {
    addrs.find(|ip| !ip.is_loopback())
}

/// Returns a fixed address, or nothing.
#[derive(Debug, Default, Clone)]
pub struct StaticDiscovery(pub Option<String>);

impl StaticDiscovery {
    pub fn new(address: impl Into<String>) -> Self {
        Self(Some(address.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl AddressDiscovery for StaticDiscovery {
    fn discover(&self) -> Option<String> {
        self.0.clone()
    }
}

//! IPv4 address of the PPP interface

use nix::ifaddrs::getifaddrs;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::warn;

/// Source of the current link address
///
/// Read fresh on every call; implementations never cache.
pub trait AddressSource {
    /// The IPv4 address currently assigned, if any
    fn current_address(&self) -> Option<Ipv4Addr>;
}

/// Reads interface addresses with `getifaddrs(3)`
#[derive(Debug, Clone)]
pub struct InterfaceAddresses {
    interface: String,
}

impl InterfaceAddresses {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl AddressSource for InterfaceAddresses {
    fn current_address(&self) -> Option<Ipv4Addr> {
        let addrs = match getifaddrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                // Treated as "no address": the caller will cycle the link
                warn!(interface = %self.interface, error = %e, "getifaddrs failed");
                return None;
            }
        };

        addrs
            .filter(|ifa| ifa.interface_name == self.interface)
            .find_map(|ifa| {
                ifa.address
                    .as_ref()
                    .and_then(|addr| addr.as_sockaddr_in())
                    .map(|sin| *SocketAddrV4::from(*sin).ip())
            })
    }
}

use if_addrs::IfAddr;

use crate::error::{Error, Result};

/// Returns `ip:port` for the first non-loopback IPv4 interface.
pub fn discover_self_endpoint(port: u16) -> Result<String> {
    let interfaces =
        if_addrs::get_if_addrs().map_err(|e| Error::AddressDiscovery(e.to_string()))?;

    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.addr {
            IfAddr::V4(addr) => Some(format!("{}:{}", addr.ip, port)),
            _ => None,
        })
        .ok_or_else(|| Error::AddressDiscovery("no non-loopback IPv4 interface found".into()))
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Host facts that do not come from the seed document: network interfaces
//! and labelled block devices.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::constants::{
    BLOCK_DEVICES_PATH, IGNORED_BLOCK_DEVICE_LABELS, IGNORED_INTERFACE_PREFIXES,
    SYS_CLASS_NET_PATH,
};
use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    pub mac: String,
    pub ipv4: Vec<Ipv4Addr>,
}

pub trait HostInspector: Send + Sync {
    /// All interfaces, in kernel index order.
    fn interfaces(&self) -> Result<Vec<NetworkInterface>, AppError>;

    /// Block device label to resolved device node.
    fn block_devices(&self) -> Result<BTreeMap<String, String>, AppError>;

    fn interface(&self, name: &str) -> Result<NetworkInterface, AppError> {
        self.interfaces()?
            .into_iter()
            .find(|iface| iface.name == name)
            .ok_or_else(|| AppError::Network(format!("no such network interface: {name}")))
    }

    fn local_ipv4(&self, name: &str) -> Result<Ipv4Addr, AppError> {
        self.interface(name)?.ipv4.first().copied().ok_or_else(|| {
            tracing::error!("[imds] cannot determine address of {}", name);
            AppError::Network(format!("cannot determine address of {name}"))
        })
    }
}

/// First interface that is neither loopback nor a docker bridge.
pub fn select_default_interface(interfaces: &[NetworkInterface]) -> Option<String> {
    interfaces
        .iter()
        .find(|iface| {
            !IGNORED_INTERFACE_PREFIXES
                .iter()
                .any(|prefix| iface.name.starts_with(prefix))
        })
        .map(|iface| iface.name.clone())
}

/// Reads interfaces from sysfs and `getifaddrs`, block devices from
/// `/dev/disk/by-label`.
#[derive(Debug, Default)]
pub struct SystemInspector;

impl HostInspector for SystemInspector {
    fn interfaces(&self) -> Result<Vec<NetworkInterface>, AppError> {
        let addresses = ipv4_addresses()?;

        let mut interfaces = Vec::new();
        for entry in std::fs::read_dir(SYS_CLASS_NET_PATH)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let index: u32 = read_attribute(&entry.path(), "ifindex")
                .and_then(|index| index.parse().ok())
                .unwrap_or(u32::MAX);
            let mac = read_attribute(&entry.path(), "address").unwrap_or_default();
            let ipv4 = addresses
                .iter()
                .filter(|(iface, _)| *iface == name)
                .map(|(_, addr)| *addr)
                .collect();

            interfaces.push((index, NetworkInterface { name, mac, ipv4 }));
        }
        interfaces.sort_by_key(|(index, _)| *index);

        Ok(interfaces.into_iter().map(|(_, iface)| iface).collect())
    }

    fn block_devices(&self) -> Result<BTreeMap<String, String>, AppError> {
        let mut devices = BTreeMap::new();
        for entry in std::fs::read_dir(BLOCK_DEVICES_PATH)? {
            let entry = entry?;
            let label = entry.file_name().to_string_lossy().into_owned();
            if IGNORED_BLOCK_DEVICE_LABELS.contains(&label.as_str()) {
                continue;
            }

            // dangling links are skipped
            if let Ok(node) = std::fs::canonicalize(entry.path()) {
                devices.insert(label, node.display().to_string());
            }
        }

        Ok(devices)
    }
}

fn read_attribute(interface: &Path, attribute: &str) -> Option<String> {
    std::fs::read_to_string(interface.join(attribute))
        .ok()
        .map(|value| value.trim().to_string())
}

#[cfg(target_os = "linux")]
fn ipv4_addresses() -> Result<Vec<(String, Ipv4Addr)>, AppError> {
    use std::ffi::CStr;

    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: on success `head` points to a list owned by libc until freeifaddrs.
    if unsafe { libc::getifaddrs(&mut head) } != 0 {
        return Err(std::io::Error::last_os_error().into());
    }

    let mut addresses = Vec::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // SAFETY: cursor is a live node of the list returned by getifaddrs.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_addr.is_null() || entry.ifa_name.is_null() {
            continue;
        }
        // SAFETY: ifa_addr is non-null and points to a sockaddr for this node.
        let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
        if family != libc::AF_INET {
            continue;
        }

        // SAFETY: AF_INET addresses are sockaddr_in; ifa_name is a C string.
        let (addr, name) = unsafe {
            let sin = &*(entry.ifa_addr as *const libc::sockaddr_in);
            (
                Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)),
                CStr::from_ptr(entry.ifa_name).to_string_lossy().into_owned(),
            )
        };
        addresses.push((name, addr));
    }

    // SAFETY: head came from a successful getifaddrs and is freed exactly once.
    unsafe { libc::freeifaddrs(head) };

    Ok(addresses)
}

#[cfg(not(target_os = "linux"))]
fn ipv4_addresses() -> Result<Vec<(String, Ipv4Addr)>, AppError> {
    Ok(Vec::new())
}

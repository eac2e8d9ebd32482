//! Per-host configuration handed to command plugins.

use std::collections::BTreeMap;

/// Address family of the host's primary address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

/// Read-only host attributes, built from the flat attribute map supplied by
/// the host-configuration subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Host name.
    pub name: String,
    /// Display alias; falls back to the host name.
    pub alias: String,
    /// Primary address, if one is configured.
    pub address: Option<String>,
    /// Family of the primary address.
    pub ip_family: IpFamily,
    /// Explicit IPv4 address.
    pub ipv4_address: Option<String>,
    /// Explicit IPv6 address.
    pub ipv6_address: Option<String>,
    /// Additional IPv4 addresses.
    pub additional_ipv4: Vec<String>,
    /// Additional IPv6 addresses.
    pub additional_ipv6: Vec<String>,
    /// Host tags.
    pub tags: BTreeMap<String, String>,
    /// Host labels.
    pub labels: BTreeMap<String, String>,
    /// Free-form macros for plugin use.
    pub macros: BTreeMap<String, String>,
}

impl HostConfig {
    /// Build a host configuration from the flat attribute map
    /// (`address`, `alias`, `_ADDRESS_FAMILY`, `_ADDRESS_4`, `_ADDRESS_6`,
    /// `_ADDRESSES_4`, `_ADDRESSES_6`).
    #[must_use]
    pub fn from_attrs(name: impl Into<String>, attrs: &BTreeMap<String, String>) -> Self {
        let name = name.into();
        let non_empty = |key: &str| attrs.get(key).filter(|v| !v.is_empty()).cloned();
        let split = |key: &str| {
            attrs
                .get(key)
                .map(|v| v.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default()
        };
        Self {
            alias: attrs.get("alias").cloned().unwrap_or_else(|| name.clone()),
            address: non_empty("address"),
            ip_family: if attrs.get("_ADDRESS_FAMILY").map(String::as_str) == Some("6") {
                IpFamily::V6
            } else {
                IpFamily::V4
            },
            ipv4_address: non_empty("_ADDRESS_4"),
            ipv6_address: non_empty("_ADDRESS_6"),
            additional_ipv4: split("_ADDRESSES_4"),
            additional_ipv6: split("_ADDRESSES_6"),
            tags: BTreeMap::new(),
            labels: BTreeMap::new(),
            macros: BTreeMap::new(),
            name,
        }
    }

    /// Whether upstream IP resolution failed for this host.
    ///
    /// A failed lookup is encoded by the host-configuration subsystem as the
    /// sentinel address `0.0.0.0` or `::`.
    #[must_use]
    pub fn ip_lookup_failed(&self) -> bool {
        matches!(self.address.as_deref(), Some("0.0.0.0" | "::"))
    }
}

//! Proxy reference resolution.
//!
//! Rules may reference globally configured proxies by id. A stale reference
//! must not break configuration generation, so an unknown id degrades to
//! "use the environment" with a warning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::ProxyRef;
use crate::warnings::WarningSink;

/// A globally configured, named proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalProxy {
    /// Human readable title.
    pub title: String,
    /// The proxy URL.
    pub proxy_url: String,
}

/// Read-only registry of global proxies, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyRegistry {
    proxies: BTreeMap<String, GlobalProxy>,
}

/// A fully resolved proxy setting, ready for plugin consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedProxy {
    /// Connect directly.
    NoProxy,
    /// Take the proxy from the process environment.
    FromEnvironment,
    /// Use this URL.
    Url(String),
}

impl ProxyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a proxy by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&GlobalProxy> {
        self.proxies.get(id)
    }

    /// Resolve a proxy reference.
    ///
    /// An unknown stored-proxy id is not an error: a warning is recorded and
    /// the environment proxy is used instead, keeping configuration
    /// generation resilient to stale references. Explicit URLs never touch
    /// the registry.
    #[must_use]
    pub fn resolve(&self, reference: &ProxyRef, warnings: &WarningSink) -> ResolvedProxy {
        match reference {
            ProxyRef::NoProxy => ResolvedProxy::NoProxy,
            ProxyRef::Environment => ResolvedProxy::FromEnvironment,
            ProxyRef::Explicit { url } => ResolvedProxy::Url(url.clone()),
            ProxyRef::Stored { id } => match self.proxies.get(id) {
                Some(proxy) => ResolvedProxy::Url(proxy.proxy_url.clone()),
                None => {
                    warnings.warn(format!("The global proxy \"{id}\" does not exist."));
                    ResolvedProxy::FromEnvironment
                }
            },
        }
    }
}

impl FromIterator<(String, GlobalProxy)> for ProxyRegistry {
    fn from_iter<T: IntoIterator<Item = (String, GlobalProxy)>>(iter: T) -> Self {
        Self {
            proxies: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProxyRegistry {
        [(
            "corp".to_string(),
            GlobalProxy {
                title: "Corporate proxy".to_string(),
                proxy_url: "http://proxy.corp:3128".to_string(),
            },
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn stored_proxy_resolves_to_url() {
        let warnings = WarningSink::new();
        let resolved = registry().resolve(
            &ProxyRef::Stored {
                id: "corp".to_string(),
            },
            &warnings,
        );
        assert_eq!(resolved, ResolvedProxy::Url("http://proxy.corp:3128".to_string()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_stored_proxy_degrades_with_warning() {
        let warnings = WarningSink::new();
        let resolved = registry().resolve(
            &ProxyRef::Stored {
                id: "gone".to_string(),
            },
            &warnings,
        );
        assert_eq!(resolved, ResolvedProxy::FromEnvironment);
        assert_eq!(
            warnings.collect(),
            vec!["The global proxy \"gone\" does not exist.".to_string()]
        );
    }

    #[test]
    fn explicit_proxy_bypasses_registry() {
        let warnings = WarningSink::new();
        let resolved = ProxyRegistry::new().resolve(
            &ProxyRef::Explicit {
                url: "http://10.1.1.1:8080".to_string(),
            },
            &warnings,
        );
        assert_eq!(resolved, ResolvedProxy::Url("http://10.1.1.1:8080".to_string()));
        assert!(warnings.is_empty());
    }

    #[test]
    fn direct_and_environment_pass_through() {
        let warnings = WarningSink::new();
        let registry = ProxyRegistry::new();
        assert_eq!(registry.resolve(&ProxyRef::NoProxy, &warnings), ResolvedProxy::NoProxy);
        assert_eq!(
            registry.resolve(&ProxyRef::Environment, &warnings),
            ResolvedProxy::FromEnvironment
        );
    }
}

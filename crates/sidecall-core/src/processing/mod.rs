//! Recursive configuration processing.
//!
//! Walks a raw rule value, replaces every secret reference with a fresh
//! [`SecretToken`] and every proxy reference with its resolved descriptor,
//! and collects the two side maps the formatter needs later: plaintext for
//! secrets that were embedded directly in configuration, and the
//! surrogate-id to secret-name mapping for every token handed out.

use std::collections::BTreeMap;

use secrecy::SecretString;

use crate::proxy::ProxyRegistry;
use crate::value::{ParamValue, RawValue, SecretRef, SecretToken};
use crate::warnings::WarningSink;

/// Output of processing one configuration value.
#[derive(Debug)]
pub struct ReplacementResult {
    /// The sanitized value, shape-preserving.
    pub value: ParamValue,
    /// Plaintext of secrets embedded directly in configuration, by name.
    pub found_secrets: BTreeMap<String, SecretString>,
    /// Secret name for every surrogate id handed out in this pass.
    pub surrogates: BTreeMap<u64, String>,
}

/// Process one raw configuration value.
///
/// Surrogate ids are a counter scoped to this pass, assigned in traversal
/// order (mapping keys in key order), so the result is deterministic for a
/// given input and registry. Every token in the returned value has an entry
/// in the surrogate map.
#[must_use]
pub fn process_configuration(
    value: &RawValue,
    proxies: &ProxyRegistry,
    warnings: &WarningSink,
) -> ReplacementResult {
    let mut pass = Pass::default();
    let value = pass.walk(value, proxies, warnings);
    ReplacementResult {
        value,
        found_secrets: pass.found_secrets,
        surrogates: pass.surrogates,
    }
}

#[derive(Default)]
struct Pass {
    next_surrogate: u64,
    found_secrets: BTreeMap<String, SecretString>,
    surrogates: BTreeMap<u64, String>,
}

impl Pass {
    fn walk(&mut self, value: &RawValue, proxies: &ProxyRegistry, warnings: &WarningSink) -> ParamValue {
        match value {
            RawValue::Null => ParamValue::Null,
            RawValue::Bool(b) => ParamValue::Bool(*b),
            RawValue::Int(i) => ParamValue::Int(*i),
            RawValue::Float(f) => ParamValue::Float(*f),
            RawValue::Str(s) => ParamValue::Str(s.clone()),
            RawValue::Sequence(items) => ParamValue::Sequence(
                items
                    .iter()
                    .map(|item| self.walk(item, proxies, warnings))
                    .collect(),
            ),
            RawValue::Mapping(map) => ParamValue::Mapping(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.walk(item, proxies, warnings)))
                    .collect(),
            ),
            RawValue::Secret(secret) => ParamValue::Secret(self.replace_secret(secret)),
            RawValue::Proxy(proxy) => ParamValue::Proxy(proxies.resolve(proxy, warnings)),
        }
    }

    fn replace_secret(&mut self, secret: &SecretRef) -> SecretToken {
        let surrogate = self.next_surrogate;
        self.next_surrogate += 1;
        let name = match secret {
            SecretRef::Stored { name } => name.clone(),
            SecretRef::Explicit { name, plaintext } => {
                self.found_secrets.insert(name.clone(), plaintext.clone());
                name.clone()
            }
        };
        self.surrogates.insert(surrogate, name);
        SecretToken::new(surrogate)
    }
}

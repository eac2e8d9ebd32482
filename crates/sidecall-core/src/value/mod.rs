//! Configuration value model.
//!
//! Rule parameters arrive as arbitrarily nested values in which credentials
//! and proxy settings are encoded as tagged 3-tuples
//! `(marker, kind, payload)`. [`RawValue`] is the pre-processing
//! representation with those references as closed sum-type variants;
//! [`ParamValue`] is the sanitized counterpart in which every secret has been
//! replaced by an opaque [`SecretToken`] and every proxy reference by a
//! resolved proxy descriptor.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde_json::Value as Json;

use crate::proxy::ResolvedProxy;

/// First element of the tagged tuple encoding for post-processed values.
pub const POSTPROCESS_MARKER: &str = "cmk_postprocessed";

/// A secret reference embedded in raw configuration.
#[derive(Debug, Clone)]
pub enum SecretRef {
    /// Reference into the password store; the plaintext is never known here.
    Stored {
        /// Name of the store entry.
        name: String,
    },
    /// Secret whose plaintext was entered directly in the rule editor.
    Explicit {
        /// Name under which the plaintext is tracked for later lookup.
        name: String,
        /// The plaintext itself, kept wrapped until formatting time.
        plaintext: SecretString,
    },
}

/// A proxy reference embedded in raw configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRef {
    /// Force direct connections.
    NoProxy,
    /// Use whatever the process environment provides.
    Environment,
    /// Reference to a globally configured proxy by id.
    Stored {
        /// Registry id of the proxy.
        id: String,
    },
    /// Literal proxy URL.
    Explicit {
        /// The proxy URL.
        url: String,
    },
}

/// A raw configuration value as produced by the rule editor.
#[derive(Debug, Clone)]
pub enum RawValue {
    /// Absent value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Ordered sequence of values.
    Sequence(Vec<RawValue>),
    /// String-keyed mapping; key order is irrelevant.
    Mapping(BTreeMap<String, RawValue>),
    /// Post-processed secret reference.
    Secret(SecretRef),
    /// Post-processed proxy reference.
    Proxy(ProxyRef),
}

/// Error decoding the JSON wire form of a raw configuration value.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The tagged tuple names a kind this engine does not know.
    #[error("unknown post-processed value kind {0:?}")]
    UnknownKind(String),
    /// The tagged tuple payload does not have the shape its kind requires.
    #[error("malformed {kind:?} payload: {detail}")]
    MalformedPayload {
        /// Kind whose payload was malformed.
        kind: String,
        /// What was wrong with it.
        detail: String,
    },
}

impl RawValue {
    /// Decode a value from its JSON wire form.
    ///
    /// A 3-element array `["cmk_postprocessed", kind, payload]` is
    /// interpreted as a secret or proxy reference; everything else maps
    /// structurally.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if a tagged tuple carries an unknown kind
    /// or a payload of the wrong shape.
    pub fn from_json(value: &Json) -> Result<Self, DecodeError> {
        match value {
            Json::Null => Ok(Self::Null),
            Json::Bool(b) => Ok(Self::Bool(*b)),
            Json::Number(n) => Ok(n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or_default()), Self::Int)),
            Json::String(s) => Ok(Self::Str(s.clone())),
            Json::Array(items) => {
                if let Some(tagged) = Self::decode_tagged(items)? {
                    return Ok(tagged);
                }
                Ok(Self::Sequence(
                    items.iter().map(Self::from_json).collect::<Result<_, _>>()?,
                ))
            }
            Json::Object(map) => Ok(Self::Mapping(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                    .collect::<Result<_, DecodeError>>()?,
            )),
        }
    }

    /// Interpret a JSON array as a tagged tuple, if it is one.
    fn decode_tagged(items: &[Json]) -> Result<Option<Self>, DecodeError> {
        let [Json::String(marker), Json::String(kind), payload] = items else {
            return Ok(None);
        };
        if marker != POSTPROCESS_MARKER {
            return Ok(None);
        }
        let malformed = |detail: &str| DecodeError::MalformedPayload {
            kind: kind.clone(),
            detail: detail.to_string(),
        };
        match kind.as_str() {
            "stored_password" => {
                let (name, _) = password_payload(payload).ok_or_else(|| {
                    malformed("expected a [name, plaintext] pair")
                })?;
                Ok(Some(Self::Secret(SecretRef::Stored { name })))
            }
            "explicit_password" => {
                let (name, plaintext) = password_payload(payload).ok_or_else(|| {
                    malformed("expected a [name, plaintext] pair")
                })?;
                Ok(Some(Self::Secret(SecretRef::Explicit {
                    name,
                    plaintext: SecretString::from(plaintext),
                })))
            }
            "no_proxy" => Ok(Some(Self::Proxy(ProxyRef::NoProxy))),
            "environment_proxy" => Ok(Some(Self::Proxy(ProxyRef::Environment))),
            "stored_proxy" => match payload {
                Json::String(id) => Ok(Some(Self::Proxy(ProxyRef::Stored { id: id.clone() }))),
                _ => Err(malformed("expected a proxy id string")),
            },
            "explicit_proxy" => match payload {
                Json::String(url) => Ok(Some(Self::Proxy(ProxyRef::Explicit { url: url.clone() }))),
                _ => Err(malformed("expected a proxy URL string")),
            },
            other => Err(DecodeError::UnknownKind(other.to_string())),
        }
    }
}

fn password_payload(payload: &Json) -> Option<(String, String)> {
    let [Json::String(name), Json::String(plaintext)] = payload.as_array()?.as_slice() else {
        return None;
    };
    Some((name.clone(), plaintext.clone()))
}

/// An opaque stand-in for a secret inside sanitized configuration.
///
/// Created by the configuration processor with a surrogate id that is unique
/// within one processing pass; the id is a pass-scoped counter, so it is
/// stable across runs for the same input. The token carries a format
/// template with exactly one `%s` slot and a flag saying whether the secret
/// may be passed to the probe purely as a store reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretToken {
    /// Pass-unique id, resolved to a secret name via the surrogate map.
    pub surrogate: u64,
    /// Render template with exactly one `%s` slot.
    pub format: String,
    /// Whether the probe accepts a `name:store-path` reference instead of
    /// the value itself.
    pub pass_safely: bool,
}

impl SecretToken {
    pub(crate) fn new(surrogate: u64) -> Self {
        Self {
            surrogate,
            format: "%s".to_string(),
            pass_safely: false,
        }
    }

    /// Variant of this token that is rendered as a `name:store-path`
    /// reference; the engine never touches the plaintext for it.
    #[must_use]
    pub fn as_reference(&self) -> Self {
        Self {
            surrogate: self.surrogate,
            format: "%s".to_string(),
            pass_safely: true,
        }
    }

    /// Variant of this token embedded into a preformatted argument.
    ///
    /// The template must contain exactly one `%s` slot; this is validated at
    /// formatting time since a broken template is a plugin programming
    /// error.
    #[must_use]
    pub fn with_template(&self, template: impl Into<String>) -> Self {
        Self {
            surrogate: self.surrogate,
            format: template.into(),
            pass_safely: false,
        }
    }
}

/// A sanitized configuration value: structurally identical to the raw input
/// but with all secret and proxy references replaced.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Absent value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Ordered sequence of values.
    Sequence(Vec<ParamValue>),
    /// String-keyed mapping.
    Mapping(BTreeMap<String, ParamValue>),
    /// Surrogate token standing in for a secret.
    Secret(SecretToken),
    /// Resolved proxy descriptor.
    Proxy(ResolvedProxy),
}

impl ParamValue {
    /// Shortcut for looking up a key in a mapping value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    /// The string content, if this is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The secret token, if this value is one.
    #[must_use]
    pub fn as_secret(&self) -> Option<&SecretToken> {
        match self {
            Self::Secret(token) => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;

    #[test]
    fn scalars_map_structurally() {
        let value = RawValue::from_json(&json!({"port": 443, "verify": true, "name": "x"}))
            .unwrap();
        let RawValue::Mapping(map) = value else {
            panic!("expected mapping");
        };
        assert!(matches!(map["port"], RawValue::Int(443)));
        assert!(matches!(map["verify"], RawValue::Bool(true)));
    }

    #[test]
    fn plain_arrays_stay_sequences() {
        let value = RawValue::from_json(&json!(["a", "b", "c"])).unwrap();
        assert!(matches!(value, RawValue::Sequence(ref items) if items.len() == 3));
    }

    #[test]
    fn stored_password_is_recognized() {
        let value =
            RawValue::from_json(&json!(["cmk_postprocessed", "stored_password", ["pw1", ""]]))
                .unwrap();
        assert!(
            matches!(value, RawValue::Secret(SecretRef::Stored { ref name }) if name == "pw1")
        );
    }

    #[test]
    fn explicit_password_keeps_plaintext_wrapped() {
        let value = RawValue::from_json(&json!([
            "cmk_postprocessed",
            "explicit_password",
            ["uuid1234", "p4ssw0rd!"]
        ]))
        .unwrap();
        let RawValue::Secret(SecretRef::Explicit { name, plaintext }) = value else {
            panic!("expected explicit secret");
        };
        assert_eq!(name, "uuid1234");
        assert_eq!(plaintext.expose_secret(), "p4ssw0rd!");
    }

    #[test]
    fn proxy_kinds_decode() {
        let stored =
            RawValue::from_json(&json!(["cmk_postprocessed", "stored_proxy", "corp"])).unwrap();
        assert!(matches!(stored, RawValue::Proxy(ProxyRef::Stored { ref id }) if id == "corp"));

        let none = RawValue::from_json(&json!(["cmk_postprocessed", "no_proxy", ""])).unwrap();
        assert!(matches!(none, RawValue::Proxy(ProxyRef::NoProxy)));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = RawValue::from_json(&json!(["cmk_postprocessed", "frobnicate", ""]))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownKind(ref kind) if kind == "frobnicate"));
    }

    #[test]
    fn three_element_arrays_without_marker_are_plain() {
        let value = RawValue::from_json(&json!(["a", "b", "c"])).unwrap();
        assert!(matches!(value, RawValue::Sequence(_)));
    }
}

//! Secret-safe rendering of a plugin argument list.
//!
//! Literal atoms are shell-quoted verbatim. Secret tokens are rendered so
//! that no plaintext ends up in the result: pass-safely tokens become
//! `name:store-path` references, and for the remaining tokens of plugins on
//! the password-store hack allow-list the value is masked length-for-length
//! with asterisks while a `--pwstore=<pos>@<offset>@<name>` directive tells
//! the invoked program where to splice in the real value at run time.
//! Plugins not yet migrated to either mechanism get the plaintext embedded
//! into their format template; that is a known, bounded legacy exception.

use std::collections::BTreeMap;

use secrecy::{ExposeSecret, SecretString};

use super::{quote, Argument};
use crate::store::SecretsStore;
use crate::warnings::WarningSink;

/// Sentinel substituted when a referenced secret cannot be found.
const MISSING_SECRET: &str = "%%%";

/// Fatal formatting error: plugin output violated the secret contract.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// A token's surrogate id has no entry in the surrogate map.
    #[error("secret surrogate {surrogate} at argument {position} has no name mapping")]
    UnknownSurrogate {
        /// The dangling surrogate id.
        surrogate: u64,
        /// 0-based position of the offending atom.
        position: usize,
    },
    /// A token's format template does not have exactly one `%s` slot.
    #[error("secret format template {template:?} must contain exactly one %s slot")]
    BadTemplate {
        /// The offending template.
        template: String,
    },
}

/// Render an argument list into a single shell-safe command line string.
///
/// `found_secrets` (explicit secrets discovered during configuration
/// processing) takes precedence over the store at lookup time. A missing
/// secret never fails: a warning naming the secret and host is recorded and
/// the 3-character sentinel stands in for the value.
///
/// # Errors
///
/// Returns a [`FormatError`] for plugin programming errors: a token whose
/// surrogate is not in `surrogates`, or a broken format template.
pub fn replace_secrets(
    host_name: &str,
    arguments: &[Argument],
    store: &SecretsStore,
    found_secrets: &BTreeMap<String, SecretString>,
    surrogates: &BTreeMap<u64, String>,
    apply_password_store_hack: bool,
    warnings: &WarningSink,
) -> Result<String, FormatError> {
    let mut formatted: Vec<String> = Vec::with_capacity(arguments.len());
    let mut replacements: Vec<(usize, usize, String)> = Vec::new();

    for (position, argument) in arguments.iter().enumerate() {
        let token = match argument {
            Argument::Literal(text) => {
                formatted.push(quote(text));
                continue;
            }
            Argument::Secret(token) => token,
        };
        let name = surrogates
            .get(&token.surrogate)
            .ok_or(FormatError::UnknownSurrogate {
                surrogate: token.surrogate,
                position,
            })?;

        if token.pass_safely {
            formatted.push(quote(&format!("{name}:{}", store.path().display())));
            continue;
        }

        if token.format.matches("%s").count() != 1 {
            return Err(FormatError::BadTemplate {
                template: token.format.clone(),
            });
        }

        let value = match found_secrets
            .get(name)
            .or_else(|| store.lookup(name))
            .map(ExposeSecret::expose_secret)
        {
            Some(plaintext) => plaintext.to_string(),
            None => {
                warnings.warn(format!(
                    "The stored password \"{name}\" used by host \"{host_name}\" does not exist."
                ));
                MISSING_SECRET.to_string()
            }
        };

        if apply_password_store_hack {
            let slot = token.format.find("%s").unwrap_or_default();
            let masked = token
                .format
                .replacen("%s", &"*".repeat(value.chars().count()), 1);
            formatted.push(quote(&masked));
            replacements.push((formatted.len(), slot, name.clone()));
        } else {
            formatted.push(quote(&token.format.replacen("%s", &value, 1)));
        }
    }

    if !replacements.is_empty() {
        let directive = replacements
            .iter()
            .map(|(position, slot, name)| format!("{position}@{slot}@{name}"))
            .collect::<Vec<_>>()
            .join(",");
        formatted.insert(0, quote(&format!("--pwstore={directive}")));
    }

    Ok(formatted.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SecretToken;

    fn token(surrogate: u64) -> SecretToken {
        SecretToken {
            surrogate,
            format: "%s".to_string(),
            pass_safely: false,
        }
    }

    fn store_with(name: &str, value: &str) -> SecretsStore {
        SecretsStore::with_entries(
            "/pw/store",
            [(name.to_string(), SecretString::from(value))],
        )
    }

    fn surrogate_map(entries: &[(u64, &str)]) -> BTreeMap<u64, String> {
        entries
            .iter()
            .map(|(id, name)| (*id, (*name).to_string()))
            .collect()
    }

    #[test]
    fn literals_are_quoted() {
        let line = replace_secrets(
            "myhost",
            &["args".into(), "1; echo".into(), "-x".into(), "1".into()],
            &SecretsStore::new("/pw/store"),
            &BTreeMap::new(),
            &BTreeMap::new(),
            false,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(line, "args '1; echo' -x 1");
    }

    #[test]
    fn pass_safely_token_becomes_store_reference() {
        let line = replace_secrets(
            "myhost",
            &["--password-id".into(), token(0).as_reference().into()],
            &store_with("web_login", "hunter2"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "web_login")]),
            false,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(line, "--password-id web_login:/pw/store");
    }

    #[test]
    fn hack_mode_masks_length_for_length() {
        let warnings = WarningSink::new();
        let line = replace_secrets(
            "myhost",
            &[
                "arg1".into(),
                token(0).with_template("--password=%s").into(),
                "arg3".into(),
            ],
            &store_with("pw-id", "1234"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "pw-id")]),
            true,
            &warnings,
        )
        .unwrap();
        assert_eq!(line, "--pwstore=2@11@pw-id arg1 '--password=****' arg3");
        assert!(warnings.is_empty());
        assert!(!line.contains("1234"));
    }

    #[test]
    fn mask_length_counts_characters_not_bytes() {
        let line = replace_secrets(
            "myhost",
            &[token(0).with_template("--password=%s").into()],
            &store_with("pw-id", "pässwörd"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "pw-id")]),
            true,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(line, "--pwstore=1@11@pw-id '--password=********'");
    }

    #[test]
    fn hack_directive_is_itself_quoted() {
        // A hostile store entry name must not break out of the directive.
        let line = replace_secrets(
            "myhost",
            &[
                "arg1".into(),
                token(0).with_template("--password=%s").into(),
                "arg3".into(),
            ],
            &store_with("pw-id; echo HI;", "the password"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "pw-id; echo HI;")]),
            true,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(
            line,
            "'--pwstore=2@11@pw-id; echo HI;' arg1 '--password=************' arg3"
        );
    }

    #[test]
    fn one_directive_entry_per_secret_in_position_order() {
        let line = replace_secrets(
            "myhost",
            &[
                token(0).with_template("--first=%s").into(),
                "middle".into(),
                token(1).with_template("--second=%s").into(),
            ],
            &SecretsStore::with_entries(
                "/pw/store",
                [
                    ("a".to_string(), SecretString::from("x")),
                    ("b".to_string(), SecretString::from("yy")),
                ],
            ),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "a"), (1, "b")]),
            true,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(
            line,
            "--pwstore=1@8@a,3@9@b '--first=*' middle '--second=**'"
        );
    }

    #[test]
    fn missing_secret_warns_and_masks_with_sentinel_length() {
        let warnings = WarningSink::new();
        let line = replace_secrets(
            "myhost",
            &[token(0).with_template("--password=%s").into()],
            &SecretsStore::new("/pw/store"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "stored_password")]),
            true,
            &warnings,
        )
        .unwrap();
        assert_eq!(line, "--pwstore=1@11@stored_password '--password=***'");
        assert_eq!(
            warnings.collect(),
            vec![
                "The stored password \"stored_password\" used by host \"myhost\" does not exist."
                    .to_string()
            ]
        );
    }

    #[test]
    fn legacy_plugins_get_plaintext_embedded() {
        let line = replace_secrets(
            "myhost",
            &[token(0).with_template("--password=%s").into()],
            &store_with("pw-id", "hunter2"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "pw-id")]),
            false,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(line, "--password=hunter2");
    }

    #[test]
    fn found_secrets_take_precedence_over_store() {
        let mut found = BTreeMap::new();
        found.insert("pw-id".to_string(), SecretString::from("explicit"));
        let line = replace_secrets(
            "myhost",
            &[token(0).into()],
            &store_with("pw-id", "stored"),
            &found,
            &surrogate_map(&[(0, "pw-id")]),
            false,
            &WarningSink::new(),
        )
        .unwrap();
        assert_eq!(line, "explicit");
    }

    #[test]
    fn dangling_surrogate_is_fatal() {
        let err = replace_secrets(
            "myhost",
            &["x".into(), token(7).into()],
            &SecretsStore::new("/pw/store"),
            &BTreeMap::new(),
            &BTreeMap::new(),
            false,
            &WarningSink::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FormatError::UnknownSurrogate {
                surrogate: 7,
                position: 1
            }
        ));
    }

    #[test]
    fn slotless_template_is_fatal() {
        let err = replace_secrets(
            "myhost",
            &[token(0).with_template("--password").into()],
            &store_with("pw-id", "x"),
            &BTreeMap::new(),
            &surrogate_map(&[(0, "pw-id")]),
            true,
            &WarningSink::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FormatError::BadTemplate { .. }));
    }
}

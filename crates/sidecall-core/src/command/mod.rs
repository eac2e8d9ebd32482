//! Plugin command descriptors and secret-safe command line formatting.

mod quoting;
mod replace;

pub use quoting::quote;
pub use replace::{replace_secrets, FormatError};

use crate::value::SecretToken;

/// One atom of a plugin-declared argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Literal text, shell-quoted verbatim.
    Literal(String),
    /// A secret surrogate, resolved at formatting time.
    Secret(SecretToken),
}

impl From<&str> for Argument {
    fn from(text: &str) -> Self {
        Self::Literal(text.to_string())
    }
}

impl From<String> for Argument {
    fn from(text: String) -> Self {
        Self::Literal(text)
    }
}

impl From<SecretToken> for Argument {
    fn from(token: SecretToken) -> Self {
        Self::Secret(token)
    }
}

impl From<&SecretToken> for Argument {
    fn from(token: &SecretToken) -> Self {
        Self::Secret(token.clone())
    }
}

/// A single command produced by a plugin for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCommand {
    /// Service description; empty means the service is dropped.
    pub description: String,
    /// Argument atoms in execution order.
    pub arguments: Vec<Argument>,
    /// Optional payload written to the probe's standard input.
    pub stdin: Option<String>,
}

impl PluginCommand {
    /// Command with the given description and arguments and no stdin.
    pub fn new(description: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            description: description.into(),
            arguments,
            stdin: None,
        }
    }

    /// Attach a standard-input payload.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }
}

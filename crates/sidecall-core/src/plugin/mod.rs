//! The capability interface implemented by check and agent plugins.
//!
//! Plugins are registered programmatically by the discovery layer; the
//! engine only sees this trait. A plugin parses the sanitized rule
//! parameters into whatever internal shape it wants, then produces one or
//! more commands for a host.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::command::PluginCommand;
use crate::host::HostConfig;
use crate::value::ParamValue;

/// Failure inside a plugin's parameter parser or command function.
///
/// Treated as a recoverable configuration issue by the assemblers unless
/// debug mode is on.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    /// Error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A check or agent plugin.
pub trait CommandPlugin: Send + Sync {
    /// Plugin family hint for the executable finder, if any.
    fn family(&self) -> Option<&str> {
        None
    }

    /// Validate and reshape the sanitized rule parameters.
    ///
    /// The default keeps them as-is.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] if the parameters are unusable.
    fn parse_parameters(&self, raw: &ParamValue) -> Result<ParamValue, PluginError> {
        Ok(raw.clone())
    }

    /// Produce the commands for one host from parsed parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] if no command can be built.
    fn commands(
        &self,
        params: &ParamValue,
        host: &HostConfig,
    ) -> Result<Vec<PluginCommand>, PluginError>;
}

/// Plugin lookup table, keyed by plugin name.
pub type PluginMap = BTreeMap<String, Arc<dyn CommandPlugin>>;

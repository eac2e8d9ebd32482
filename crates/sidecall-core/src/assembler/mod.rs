//! Assembly of service definitions and agent command lines.
//!
//! Orchestrates configuration processing, plugin invocation, secret-safe
//! formatting and executable resolution per configured rule and per host.
//! A failing plugin never takes down the whole run: its contribution is
//! skipped with a warning, unless debug mode asks for the failure to
//! propagate.

mod active;
mod special;

pub use active::ActiveCheck;
pub use special::{SpecialAgent, SpecialAgentCommandLine};

use crate::command::FormatError;
use crate::plugin::PluginError;
use crate::value::ParamValue;

/// Command name used for the synthetic failed-IP-lookup service.
pub const CUSTOM_CHECK_COMMAND: &str = "check-mk-custom";

/// Command line of the synthetic always-critical service emitted when the
/// host's IP address could not be resolved.
pub const FAILED_IP_LOOKUP_COMMAND_LINE: &str =
    "echo \"CRIT - Failed to lookup IP address and no explicit IP address configured\"; exit 2";

/// One fully assembled service, the only artifact that outlives a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDefinition {
    /// Name of the plugin that produced the service.
    pub plugin_name: String,
    /// Final service description.
    pub description: String,
    /// Command name registered with the monitoring core.
    pub command: String,
    /// Executable plus shell-quoted arguments, ready for execution.
    pub command_line: String,
    /// Sanitized parameters, kept for audit; secrets appear only in
    /// surrogate form.
    pub parameters: ParamValue,
}

/// Fatal assembly failure.
///
/// Plugin failures only surface here with debug mode on; format errors are
/// always fatal since they indicate a plugin programming error.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// An active check plugin failed and debug mode is on.
    #[error("config creation for active check {plugin} failed on {host}: {source}")]
    ActiveCheckFailed {
        /// Plugin name.
        plugin: String,
        /// Host name.
        host: String,
        /// The plugin's error.
        #[source]
        source: PluginError,
    },
    /// A special agent plugin failed and debug mode is on.
    #[error("config creation for special agent {plugin} failed on {host}: {source}")]
    SpecialAgentFailed {
        /// Plugin name.
        plugin: String,
        /// Host name.
        host: String,
        /// The plugin's error.
        #[source]
        source: PluginError,
    },
    /// Plugin output violated the secret contract.
    #[error(transparent)]
    Format(#[from] FormatError),
}

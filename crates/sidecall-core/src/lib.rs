//! Secret-safe command construction for host-monitoring probes.
//!
//! This crate turns declarative check/agent rules plus per-host configuration
//! into the exact command lines that will be executed as external probes
//! (active checks and special agents). Configuration values may contain
//! credentials, so the engine guarantees that plaintext secrets never appear
//! in any artifact that is persisted or visible in a process listing: secrets
//! are replaced by opaque surrogate tokens during configuration processing
//! and only resolved at the final formatting step, either as a password-store
//! reference or as a length-masked placeholder completed by the invoked
//! program at run time.
//!
//! # Pipeline
//!
//! 1. [`processing::process_configuration`] walks a raw rule value, replaces
//!    secret and proxy references and collects the side maps.
//! 2. A [`plugin::CommandPlugin`] turns the sanitized parameters into one or
//!    more [`command::PluginCommand`]s.
//! 3. [`command::replace_secrets`] renders the shell-safe argument string,
//!    emitting the `--pwstore` directive for legacy plugins.
//! 4. [`assembler::ActiveCheck`] / [`assembler::SpecialAgent`] orchestrate
//!    the above per rule and per host, resolving executables through
//!    [`finder::ExecutableFinder`].

pub mod assembler;
pub mod command;
pub mod finder;
pub mod host;
pub mod plugin;
pub mod processing;
pub mod proxy;
pub mod store;
pub mod value;
pub mod warnings;

pub use assembler::{
    ActiveCheck, AssemblyError, ServiceDefinition, SpecialAgent, SpecialAgentCommandLine,
};
pub use command::{Argument, PluginCommand};
pub use finder::{ExecutableFinder, PathConfig};
pub use host::HostConfig;
pub use plugin::{CommandPlugin, PluginError, PluginMap};
pub use processing::{process_configuration, ReplacementResult};
pub use proxy::{ProxyRegistry, ResolvedProxy};
pub use store::SecretsStore;
pub use value::{ParamValue, RawValue, SecretToken};
pub use warnings::WarningSink;

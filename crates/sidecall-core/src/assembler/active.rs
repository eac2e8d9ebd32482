//! Active check assembly.

use std::collections::BTreeSet;

use super::{AssemblyError, ServiceDefinition, CUSTOM_CHECK_COMMAND, FAILED_IP_LOOKUP_COMMAND_LINE};
use crate::command::replace_secrets;
use crate::finder::ExecutableFinder;
use crate::host::HostConfig;
use crate::plugin::PluginMap;
use crate::processing::process_configuration;
use crate::proxy::ProxyRegistry;
use crate::store::SecretsStore;
use crate::value::{ParamValue, RawValue};
use crate::warnings::WarningSink;

/// Assembles service definitions for active checks on one host.
pub struct ActiveCheck {
    plugins: PluginMap,
    host: HostConfig,
    store: SecretsStore,
    proxies: ProxyRegistry,
    finder: ExecutableFinder,
    hack_plugins: BTreeSet<String>,
    warnings: WarningSink,
    debug: bool,
}

impl ActiveCheck {
    /// Assembler for the given host and collaborators.
    #[must_use]
    pub fn new(
        plugins: PluginMap,
        host: HostConfig,
        store: SecretsStore,
        proxies: ProxyRegistry,
        finder: ExecutableFinder,
        warnings: WarningSink,
    ) -> Self {
        Self {
            plugins,
            host,
            store,
            proxies,
            finder,
            hack_plugins: BTreeSet::new(),
            warnings,
            debug: false,
        }
    }

    /// Names of plugins still needing the password-store hack.
    #[must_use]
    pub fn with_password_store_hack(mut self, plugins: impl IntoIterator<Item = String>) -> Self {
        self.hack_plugins = plugins.into_iter().collect();
        self
    }

    /// Make plugin failures fatal instead of warned-and-skipped.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Assemble the services for the given rules.
    ///
    /// Unknown plugin names produce zero services. Within one rule, only
    /// the first service per distinct description survives; services with
    /// an empty description are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an [`AssemblyError`] on malformed plugin output, or on any
    /// plugin failure when debug mode is on.
    pub fn service_data(
        &self,
        rules: &[(String, Vec<RawValue>)],
    ) -> Result<Vec<ServiceDefinition>, AssemblyError> {
        let mut services = Vec::new();
        for (plugin_name, config_sets) in rules {
            let Some(plugin) = self.plugins.get(plugin_name) else {
                continue;
            };

            if self.host.ip_lookup_failed() {
                // The plugin is never invoked, but the sanitized parameters
                // are still kept for audit.
                let parameters = config_sets.first().map_or(ParamValue::Null, |raw| {
                    process_configuration(raw, &self.proxies, &self.warnings).value
                });
                services.push(ServiceDefinition {
                    plugin_name: plugin_name.clone(),
                    description: plugin_name.clone(),
                    command: CUSTOM_CHECK_COMMAND.to_string(),
                    command_line: FAILED_IP_LOOKUP_COMMAND_LINE.to_string(),
                    parameters,
                });
                continue;
            }

            let mut seen_descriptions = BTreeSet::new();
            'config_sets: for raw in config_sets {
                let processed = process_configuration(raw, &self.proxies, &self.warnings);
                let commands = match plugin
                    .parse_parameters(&processed.value)
                    .and_then(|params| plugin.commands(&params, &self.host))
                {
                    Ok(commands) => commands,
                    Err(err) => {
                        if self.debug {
                            return Err(AssemblyError::ActiveCheckFailed {
                                plugin: plugin_name.clone(),
                                host: self.host.name.clone(),
                                source: err,
                            });
                        }
                        self.warnings.warn(format!(
                            "Config creation for active check {plugin_name} failed on {}: {err}",
                            self.host.name
                        ));
                        break 'config_sets;
                    }
                };

                for command in commands {
                    if command.description.is_empty() {
                        self.warnings.warn(format!(
                            "Skipping invalid service with empty description \
                             (active check: {plugin_name}) on host {}",
                            self.host.name
                        ));
                        continue;
                    }
                    if !seen_descriptions.insert(command.description.clone()) {
                        continue;
                    }
                    let arguments = replace_secrets(
                        &self.host.name,
                        &command.arguments,
                        &self.store,
                        &processed.found_secrets,
                        &processed.surrogates,
                        self.hack_plugins.contains(plugin_name),
                        &self.warnings,
                    )?;
                    let executable = self
                        .finder
                        .find_check(&format!("check_{plugin_name}"), plugin.family());
                    let command_line = if arguments.is_empty() {
                        executable
                    } else {
                        format!("{executable} {arguments}")
                    };
                    services.push(ServiceDefinition {
                        plugin_name: plugin_name.clone(),
                        description: command.description,
                        command: format!("check_mk_active-{plugin_name}"),
                        command_line,
                        parameters: processed.value.clone(),
                    });
                }
            }
        }
        Ok(services)
    }
}

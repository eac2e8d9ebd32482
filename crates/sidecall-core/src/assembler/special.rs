//! Special agent assembly.

use std::collections::BTreeSet;

use super::AssemblyError;
use crate::command::replace_secrets;
use crate::finder::ExecutableFinder;
use crate::host::HostConfig;
use crate::plugin::PluginMap;
use crate::processing::process_configuration;
use crate::proxy::ProxyRegistry;
use crate::store::SecretsStore;
use crate::value::RawValue;
use crate::warnings::WarningSink;

/// A ready-to-execute special agent invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialAgentCommandLine {
    /// Agent executable plus shell-quoted arguments.
    pub command_line: String,
    /// Optional payload written to the agent's standard input.
    pub stdin: Option<String>,
}

/// Assembles command lines for special agents on one host.
pub struct SpecialAgent {
    plugins: PluginMap,
    host: HostConfig,
    store: SecretsStore,
    proxies: ProxyRegistry,
    finder: ExecutableFinder,
    hack_plugins: BTreeSet<String>,
    warnings: WarningSink,
    debug: bool,
}

impl SpecialAgent {
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

    /// Build the command lines for one agent rule.
    ///
    /// An unknown agent name yields no commands; a failing plugin yields no
    /// commands and a warning (unless debug mode is on).
    ///
    /// # Errors
    ///
    /// Returns an [`AssemblyError`] on malformed plugin output, or on any
    /// plugin failure when debug mode is on.
    pub fn command_lines(
        &self,
        agent_name: &str,
        raw_params: &RawValue,
    ) -> Result<Vec<SpecialAgentCommandLine>, AssemblyError> {
        let Some(plugin) = self.plugins.get(agent_name) else {
            return Ok(Vec::new());
        };

        let processed = process_configuration(raw_params, &self.proxies, &self.warnings);
        let commands = match plugin
            .parse_parameters(&processed.value)
            .and_then(|params| plugin.commands(&params, &self.host))
        {
            Ok(commands) => commands,
            Err(err) => {
                if self.debug {
                    return Err(AssemblyError::SpecialAgentFailed {
                        plugin: agent_name.to_string(),
                        host: self.host.name.clone(),
                        source: err,
                    });
                }
                self.warnings.warn(format!(
                    "Config creation for special agent {agent_name} failed on {}: {err}",
                    self.host.name
                ));
                return Ok(Vec::new());
            }
        };

        let source = self.finder.agent_source(agent_name);
        let mut lines = Vec::with_capacity(commands.len());
        for command in commands {
            let arguments = replace_secrets(
                &self.host.name,
                &command.arguments,
                &self.store,
                &processed.found_secrets,
                &processed.surrogates,
                self.hack_plugins.contains(agent_name),
                &self.warnings,
            )?;
            let command_line = if arguments.is_empty() {
                source.clone()
            } else {
                format!("{source} {arguments}")
            };
            lines.push(SpecialAgentCommandLine {
                command_line,
                stdin: command.stdin,
            });
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::command::{Argument, PluginCommand};
    use crate::finder::PathConfig;
    use crate::plugin::{CommandPlugin, PluginError};
    use crate::value::ParamValue;

    struct EchoAgent;

    impl CommandPlugin for EchoAgent {
        fn commands(
            &self,
            params: &ParamValue,
            host: &HostConfig,
        ) -> Result<Vec<PluginCommand>, PluginError> {
            let address = host.address.clone().unwrap_or_default();
            let mut arguments: Vec<Argument> = vec!["--address".into(), address.into()];
            if let Some(ParamValue::Secret(token)) = params.get("password") {
                arguments.push("--password".into());
                arguments.push(token.into());
            }
            if let Some(note) = params.get("note").and_then(ParamValue::as_str) {
                arguments.push(note.to_string().into());
            }
            let mut command = PluginCommand::new("agent", arguments);
            if let Some(payload) = params.get("stdin").and_then(ParamValue::as_str) {
                command = command.with_stdin(payload);
            }
            Ok(vec![command])
        }
    }

    struct FailingAgent;

    impl CommandPlugin for FailingAgent {
        fn commands(
            &self,
            _params: &ParamValue,
            _host: &HostConfig,
        ) -> Result<Vec<PluginCommand>, PluginError> {
            Err(PluginError::new("invalid combination of parameters"))
        }
    }

    fn host() -> HostConfig {
        let attrs: BTreeMap<String, String> = [("address", "1.2.3.4")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HostConfig::from_attrs("myhost", &attrs)
    }

    fn agent() -> SpecialAgent {
        let mut plugins = PluginMap::new();
        plugins.insert("echo".to_string(), Arc::new(EchoAgent) as Arc<dyn CommandPlugin>);
        plugins.insert("fail".to_string(), Arc::new(FailingAgent) as Arc<dyn CommandPlugin>);
        SpecialAgent::new(
            plugins,
            host(),
            SecretsStore::with_entries(
                "/pw/store",
                [("web_login".to_string(), SecretString::from("hunter2"))],
            ),
            ProxyRegistry::new(),
            ExecutableFinder::new(PathConfig::under_site_root("/omd/sites/heute")),
            WarningSink::new(),
        )
    }

    fn raw(json: serde_json::Value) -> RawValue {
        RawValue::from_json(&json).unwrap()
    }

    #[test]
    fn arguments_are_quoted_and_stdin_passes_through() {
        let lines = agent()
            .command_lines("echo", &raw(json!({"note": "two words", "stdin": "<xml/>"})))
            .unwrap();
        assert_eq!(
            lines,
            vec![SpecialAgentCommandLine {
                command_line: "$SITE_ROOT$/share/agents/special/agent_echo \
                               --address 1.2.3.4 'two words'"
                    .to_string(),
                stdin: Some("<xml/>".to_string()),
            }]
        );
    }

    #[test]
    fn unknown_agent_yields_no_commands() {
        let special = agent();
        assert_eq!(special.command_lines("absent", &raw(json!({}))).unwrap(), vec![]);
        assert!(special.warnings.is_empty());
    }

    #[test]
    fn stored_password_is_masked_under_the_hack() {
        let special = agent().with_password_store_hack(["echo".to_string()]);
        let lines = special
            .command_lines(
                "echo",
                &raw(json!({
                    "password": ["cmk_postprocessed", "stored_password", ["web_login", ""]],
                })),
            )
            .unwrap();
        assert_eq!(
            lines[0].command_line,
            "$SITE_ROOT$/share/agents/special/agent_echo \
             --pwstore=4@0@web_login --address 1.2.3.4 --password '*******'"
        );
        assert!(!lines[0].command_line.contains("hunter2"));
    }

    #[test]
    fn failing_plugin_warns_and_yields_nothing() {
        let special = agent();
        assert_eq!(special.command_lines("fail", &raw(json!({}))).unwrap(), vec![]);
        assert_eq!(
            special.warnings.collect(),
            vec![
                "Config creation for special agent fail failed on myhost: \
                 invalid combination of parameters"
                    .to_string()
            ]
        );
    }

    #[test]
    fn debug_mode_makes_plugin_failure_fatal() {
        let err = agent()
            .with_debug(true)
            .command_lines("fail", &raw(json!({})))
            .unwrap_err();
        assert!(matches!(err, AssemblyError::SpecialAgentFailed { .. }));
    }
}

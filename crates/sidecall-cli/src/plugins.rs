//! Built-in pass-through plugin for rule-driven command lines.

use sidecall_core::{
    Argument, CommandPlugin, HostConfig, ParamValue, PluginCommand, PluginError,
};

/// Plugin whose command layout is described entirely by the rule parameters.
///
/// Expects a mapping with an optional `description` string, an `args`
/// sequence of strings, numbers and secrets, and an optional `stdin`
/// string. This keeps the command line tool usable for any probe without
/// compiling a plugin per check.
pub struct RuleDriven;

impl CommandPlugin for RuleDriven {
    fn commands(
        &self,
        params: &ParamValue,
        host: &HostConfig,
    ) -> Result<Vec<PluginCommand>, PluginError> {
        let description = params
            .get("description")
            .and_then(ParamValue::as_str)
            .unwrap_or(&host.name);
        let mut arguments = Vec::new();
        if let Some(ParamValue::Sequence(items)) = params.get("args") {
            for item in items {
                match item {
                    ParamValue::Str(text) => arguments.push(Argument::Literal(text.clone())),
                    ParamValue::Int(number) => {
                        arguments.push(Argument::Literal(number.to_string()));
                    }
                    ParamValue::Secret(token) => arguments.push(Argument::Secret(token.clone())),
                    other => {
                        return Err(PluginError::new(format!(
                            "unsupported argument value {other:?}"
                        )));
                    }
                }
            }
        }
        let mut command = PluginCommand::new(description, arguments);
        if let Some(payload) = params.get("stdin").and_then(ParamValue::as_str) {
            command = command.with_stdin(payload);
        }
        Ok(vec![command])
    }
}

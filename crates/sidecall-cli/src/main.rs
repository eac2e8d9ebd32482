//! sidecall - render secret-safe monitoring probe command lines
//!
//! Reads rules and host attributes as JSON, runs them through the command
//! construction engine and prints the resulting services or agent command
//! lines. Secrets referenced by the rules never appear in the output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sidecall_core::proxy::GlobalProxy;
use sidecall_core::{
    ActiveCheck, CommandPlugin, ExecutableFinder, HostConfig, PathConfig, PluginMap,
    ProxyRegistry, RawValue, SecretsStore, SpecialAgent, WarningSink,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod plugins;

/// sidecall - render secret-safe monitoring probe command lines
#[derive(Parser, Debug)]
#[command(name = "sidecall")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Site installation root used for executable resolution
    #[arg(long, default_value = "/omd/sites/default")]
    site_root: PathBuf,

    /// Host name the commands are built for
    #[arg(long)]
    host_name: String,

    /// JSON file with the flat host attribute map
    #[arg(long)]
    host_attrs: Option<PathBuf>,

    /// Password store file in `name:secret` line format
    #[arg(long)]
    password_store: Option<PathBuf>,

    /// JSON file mapping proxy ids to global proxy definitions
    #[arg(long)]
    proxies: Option<PathBuf>,

    /// Plugin names still relying on the password store hack
    #[arg(long = "pwstore-hack")]
    pwstore_hack: Vec<String>,

    /// Make plugin failures fatal instead of warned-and-skipped
    #[arg(long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble active check services from a rules file
    Services {
        /// JSON array of `{"plugin": name, "params": [...]}` entries
        rules: PathBuf,
    },

    /// Assemble command lines for one special agent
    Agent {
        /// Agent name (resolves the `special/agent_<name>` executable)
        name: String,

        /// JSON file with the agent's rule parameters
        params: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let host =
        HostConfig::from_attrs(cli.host_name.as_str(), &load_host_attrs(cli.host_attrs.as_deref())?);
    let store = match &cli.password_store {
        Some(path) => SecretsStore::load(path)
            .with_context(|| format!("failed to load password store {}", path.display()))?,
        None => SecretsStore::new(cli.site_root.join("var/stored_passwords")),
    };
    let proxies = load_proxies(cli.proxies.as_deref())?;
    let finder = ExecutableFinder::new(PathConfig::under_site_root(&cli.site_root));
    let warnings = WarningSink::new();

    match &cli.command {
        Commands::Services { rules } => {
            let rules = load_rules(rules)?;
            let assembler = ActiveCheck::new(
                plugin_map(rules.iter().map(|(name, _)| name.as_str())),
                host,
                store,
                proxies,
                finder,
                warnings.clone(),
            )
            .with_password_store_hack(cli.pwstore_hack.clone())
            .with_debug(cli.debug);

            let services = assembler.service_data(&rules)?;
            let rendered: Vec<_> = services
                .iter()
                .map(|service| {
                    serde_json::json!({
                        "description": service.description,
                        "command": service.command,
                        "command_line": service.command_line,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        Commands::Agent { name, params } => {
            let params = load_params(params)?;
            let assembler = SpecialAgent::new(
                plugin_map(std::iter::once(name.as_str())),
                host,
                store,
                proxies,
                finder,
                warnings.clone(),
            )
            .with_password_store_hack(cli.pwstore_hack.clone())
            .with_debug(cli.debug);

            for line in assembler.command_lines(name, &params)? {
                println!("{}", line.command_line);
                if let Some(stdin) = line.stdin {
                    tracing::debug!("stdin payload of {} bytes withheld", stdin.len());
                }
            }
        }
    }

    for warning in warnings.collect() {
        eprintln!("WARNING: {warning}");
    }
    Ok(())
}

/// Register the rule-driven plugin under every name the input references.
fn plugin_map<'a>(names: impl Iterator<Item = &'a str>) -> PluginMap {
    names
        .map(|name| {
            (
                name.to_string(),
                Arc::new(plugins::RuleDriven) as Arc<dyn CommandPlugin>,
            )
        })
        .collect()
}

fn load_host_attrs(path: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read host attributes {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid host attribute map in {}", path.display()))
}

fn load_proxies(path: Option<&Path>) -> Result<ProxyRegistry> {
    let Some(path) = path else {
        return Ok(ProxyRegistry::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read proxy definitions {}", path.display()))?;
    let proxies: BTreeMap<String, GlobalProxy> = serde_json::from_str(&text)
        .with_context(|| format!("invalid proxy definitions in {}", path.display()))?;
    Ok(proxies.into_iter().collect())
}

fn load_params(path: &Path) -> Result<RawValue> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rule parameters {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    RawValue::from_json(&json)
        .with_context(|| format!("invalid rule parameters in {}", path.display()))
}

fn load_rules(path: &Path) -> Result<Vec<(String, Vec<RawValue>)>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    let entries = json
        .as_array()
        .with_context(|| format!("rules file {} must be a JSON array", path.display()))?;

    let mut rules = Vec::with_capacity(entries.len());
    for entry in entries {
        let plugin = entry
            .get("plugin")
            .and_then(serde_json::Value::as_str)
            .context("rule entry is missing the \"plugin\" name")?;
        let params = entry
            .get("params")
            .and_then(serde_json::Value::as_array)
            .context("rule entry is missing the \"params\" array")?;
        let config_sets = params
            .iter()
            .map(RawValue::from_json)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid parameters for plugin {plugin}"))?;
        rules.push((plugin.to_string(), config_sets));
    }
    Ok(rules)
}

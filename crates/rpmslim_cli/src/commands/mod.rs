//! CLI command implementations.

pub mod create_new;
pub mod use_existing;

use crate::Cli;
use rpmslim_api::{HttpTransport, ReqwestClient};
use rpmslim_engine::{DeclaredMirrors, Engine, EngineConfig, EngineError, EngineResult, PollConfig};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Engine talking to Pulp over HTTP.
pub type HttpEngine = Engine<HttpTransport<ReqwestClient>>;

/// The options a run resolved, printed before it starts.
#[derive(Debug, Serialize)]
struct ResolvedOptions<'a> {
    action: &'a str,
    host: &'a str,
    username: &'a str,
    repos_to_mirror_file: String,
    session_label: &'a str,
    poll_interval_secs: u64,
    deadline_secs: Option<u64>,
    fail_fast: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
}

/// Prints the resolved options as YAML.
pub(crate) fn print_options(cli: &Cli, action: &str, output: Option<&Path>) -> EngineResult<()> {
    let options = ResolvedOptions {
        action,
        host: &cli.host,
        username: &cli.username,
        repos_to_mirror_file: cli.repos_file.display().to_string(),
        session_label: &cli.session_label,
        poll_interval_secs: cli.poll_interval,
        deadline_secs: cli.deadline,
        fail_fast: cli.fail_fast,
        output_file: output.map(|p| p.display().to_string()),
    };
    let yaml = serde_yaml::to_string(&options)
        .map_err(|e| EngineError::Config(format!("cannot render options: {e}")))?;
    println!("{yaml}");
    Ok(())
}

/// Builds the engine configuration from the command line.
pub(crate) fn engine_config(cli: &Cli) -> EngineConfig {
    let mut poll = PollConfig::new(Duration::from_secs(cli.poll_interval));
    if let Some(deadline) = cli.deadline {
        poll = poll.with_deadline(Duration::from_secs(deadline));
    }
    EngineConfig::new(cli.session_label.clone())
        .with_fail_fast(cli.fail_fast)
        .with_poll(poll)
}

/// Connects an engine to the configured Pulp host.
pub(crate) fn connect(cli: &Cli, config: EngineConfig) -> EngineResult<HttpEngine> {
    let client = ReqwestClient::new(Duration::from_secs(cli.timeout))
        .map_err(|e| EngineError::Config(e.to_string()))?
        .with_basic_auth(cli.username.clone(), cli.password.clone());
    Ok(Engine::new(HttpTransport::new(cli.host.clone(), client), config))
}

/// Loads the declared mirrors file.
pub(crate) fn load_mirrors(cli: &Cli) -> EngineResult<DeclaredMirrors> {
    let path = &cli.repos_file;
    if !path.is_file() {
        return Err(EngineError::Config(format!(
            "could not find repos file '{}'",
            path.display()
        )));
    }
    DeclaredMirrors::load(path)
}

/// Prints the closing line of a run.
pub(crate) fn finish() {
    println!("\nFINIS");
}

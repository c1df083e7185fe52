//! Create-new command implementation.

use super::{connect, engine_config, finish, load_mirrors, print_options};
use crate::Cli;
use rpmslim_engine::EngineResult;
use tracing::info;

/// Runs the create-new command and returns the process exit code.
pub fn run(cli: &Cli) -> EngineResult<i32> {
    print_options(cli, "create_new", None)?;
    let mirrors = load_mirrors(cli)?;
    let engine = connect(cli, engine_config(cli))?;
    info!(repos = mirrors.len(), host = %cli.host, "creating new mirrors");

    let report = engine.create_new(&mirrors)?;

    println!("\nMirrors:");
    for name in &report.succeeded {
        println!("    {name}");
    }
    if !report.failed.is_empty() {
        println!("\nFailed:");
        for failure in &report.failed {
            println!("    {}: {}", failure.repository, failure.error);
        }
    }
    finish();
    Ok(report.exit_code())
}

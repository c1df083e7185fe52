//! Use-existing command implementation.

use super::{connect, engine_config, finish, load_mirrors, print_options};
use crate::Cli;
use rpmslim_engine::EngineResult;
use std::path::Path;
use tracing::info;

/// Runs the use-existing command and returns the process exit code.
pub fn run(cli: &Cli, output: &Path) -> EngineResult<i32> {
    print_options(cli, "use_existing", Some(output))?;
    let mirrors = load_mirrors(cli)?;
    let engine = connect(cli, engine_config(cli).with_output_path(output))?;
    info!(repos = mirrors.len(), host = %cli.host, "building slim repos from existing mirrors");

    let run = engine.use_existing(&mirrors)?;

    println!("\nWrote slim repos data to: '{}'", output.display());
    println!("\nSlim repos:");
    for url in run.summary_lines() {
        println!("    {url}");
    }
    if !run.report.failed.is_empty() {
        println!("\nFailed:");
        for failure in &run.report.failed {
            println!("    {}: {}", failure.repository, failure.error);
        }
    }
    finish();
    Ok(run.report.exit_code())
}

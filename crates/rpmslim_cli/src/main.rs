//! rpmslim CLI
//!
//! Mirrors RPM repositories into Pulp and builds slim copies of them.
//!
//! # Commands
//!
//! - `create-new` - Tear down and rebuild a full mirror per declared repository
//! - `use-existing` - Copy filtered packages from published mirrors into slim repositories

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Pulp RPM mirror and slim-repository builder.
#[derive(Parser)]
#[command(name = "rpmslim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pulp base URL
    #[arg(global = true, long, env = "PULP_HOST", default_value = "http://localhost:8080")]
    host: String,

    /// Pulp user name
    #[arg(global = true, long, env = "PULP_USER", default_value = "admin")]
    username: String,

    /// Pulp password
    #[arg(
        global = true,
        long,
        env = "PULP_PASSWORD",
        default_value = "admin",
        hide_default_value = true,
        hide_env_values = true
    )]
    password: String,

    /// YAML file with repos and RPMs to include
    #[arg(global = true, short = 'f', long = "file", default_value = "repos_to_mirror.yaml")]
    repos_file: PathBuf,

    /// Build session label; replaces the `pulp` prefix in slim repo names
    #[arg(global = true, short = 'l', long, default_value = "testbuild-6.6.0")]
    session_label: String,

    /// Seconds between two polls of a running task
    #[arg(
        global = true,
        long,
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval: u64,

    /// Give up waiting on a single task after this many seconds
    #[arg(global = true, long)]
    deadline: Option<u64>,

    /// HTTP request timeout in seconds
    #[arg(global = true, long, default_value = "60")]
    timeout: u64,

    /// Stop at the first repository that fails
    #[arg(global = true, long)]
    fail_fast: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete and recreate a full mirror pipeline for every declared repository
    CreateNew,

    /// Build slim repositories from already published mirrors
    UseExisting {
        /// Where to write the slim repository records
        #[arg(short, long, default_value = "_slim_repos.yaml")]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match &cli.command {
        Commands::CreateNew => commands::create_new::run(&cli),
        Commands::UseExisting { output } => commands::use_existing::run(&cli, output),
        Commands::Version => {
            println!("rpmslim v{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    };

    match result {
        Ok(code) => exit_code(code),
        Err(err) => {
            error!(error = %err, "run failed");
            eprintln!("error: {err}");
            exit_code(err.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let cli = Cli::try_parse_from(["rpmslim", "use-existing"]).unwrap();
        assert_eq!(cli.repos_file, PathBuf::from("repos_to_mirror.yaml"));
        assert_eq!(cli.session_label, "testbuild-6.6.0");
        assert_eq!(cli.poll_interval, 10);
        assert!(cli.deadline.is_none());
        match cli.command {
            Commands::UseExisting { output } => assert_eq!(output, PathBuf::from("_slim_repos.yaml")),
            _ => panic!("expected use-existing"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "rpmslim",
            "create-new",
            "-f",
            "mirrors.yaml",
            "-l",
            "nightly",
            "--deadline",
            "600",
            "--fail-fast",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::CreateNew));
        assert_eq!(cli.repos_file, PathBuf::from("mirrors.yaml"));
        assert_eq!(cli.session_label, "nightly");
        assert_eq!(cli.deadline, Some(600));
        assert!(cli.fail_fast);
    }

    #[test]
    fn poll_interval_must_be_positive() {
        let err = Cli::try_parse_from(["rpmslim", "create-new", "--poll-interval", "0"]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from(["rpmslim", "create-new", "--poll-interval", "1"]).unwrap();
        assert_eq!(cli.poll_interval, 1);
    }
}

//! # rpmslim Engine
//!
//! Reconciles declared RPM mirrors against a Pulp service.
//!
//! This crate provides:
//! - `TaskWaiter`: polls asynchronous tasks to a terminal state
//! - `Reconciler`: ensure-or-create and delete-by-name per resource kind
//! - `MirrorOrchestrator`: the create-new workflow (full mirror pipelines)
//! - `ContentCopyPlanner`: name-filtered, dependency-solving batch copies
//! - `SlimRepoPipeline`: the use-existing workflow (slim repositories)
//!
//! Every mutating call returns a task, and nothing a task creates is used
//! before the task has been waited on. Resource names are the
//! reconciliation key.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rpmslim_engine::{DeclaredMirrors, Engine, EngineConfig};
//!
//! let engine = Engine::new(api, EngineConfig::new("testbuild-6.6.0"));
//! let report = engine.create_new(&DeclaredMirrors::load(path)?)?;
//! std::process::exit(report.exit_code());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod copy;
mod declared;
mod engine;
mod error;
mod mirror;
mod output;
mod reconciler;
mod report;
mod slim;
mod waiter;
mod warnings;

pub use config::{EngineConfig, PollConfig, RepoRole, ROLE_LABEL_KEY, SESSION_LABEL_KEY};
pub use copy::{ContentCopyPlanner, CopyEntry, CopySpec};
pub use declared::{slim_name, DeclaredMirrors, RepoSpec};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use mirror::{MirrorOrchestrator, MirrorRecord, MirrorStage};
pub use output::{OutputEntry, RunOutput};
pub use reconciler::Reconciler;
pub use report::{RepoFailure, RunReport};
pub use slim::{SlimRepoPipeline, SlimRepoRecord, SlimRun};
pub use waiter::{CancelToken, Expected, TaskWaiter};
pub use warnings::{EngineWarning, WarningLog};

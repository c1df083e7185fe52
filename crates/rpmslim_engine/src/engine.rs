//! Engine facade tying the workflows to one service connection.

use crate::config::EngineConfig;
use crate::declared::DeclaredMirrors;
use crate::error::EngineResult;
use crate::mirror::MirrorOrchestrator;
use crate::reconciler::Reconciler;
use crate::report::RunReport;
use crate::slim::{SlimRepoPipeline, SlimRun};
use crate::waiter::{CancelToken, TaskWaiter};
use crate::warnings::WarningLog;
use rpmslim_api::PulpApi;
use std::sync::Arc;
use tracing::{info, info_span};

/// Runs the create-new and use-existing workflows against a service.
///
/// # Example
///
/// ```rust,ignore
/// use rpmslim_engine::{DeclaredMirrors, Engine, EngineConfig};
///
/// let engine = Engine::new(api, EngineConfig::new("testbuild-6.6.0"));
/// let mirrors = DeclaredMirrors::load("repos_to_mirror.yaml".as_ref())?;
/// let run = engine.use_existing(&mirrors)?;
/// for url in run.summary_lines() {
///     println!("{url}");
/// }
/// ```
pub struct Engine<A: ?Sized> {
    config: EngineConfig,
    cancel: CancelToken,
    warnings: WarningLog,
    api: Arc<A>,
}

impl<A: PulpApi> Engine<A> {
    /// Creates an engine owning its service client.
    pub fn new(api: A, config: EngineConfig) -> Self {
        Self::with_shared(Arc::new(api), config)
    }
}

impl<A: PulpApi + ?Sized> Engine<A> {
    /// Creates an engine over a shared service client.
    pub fn with_shared(api: Arc<A>, config: EngineConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            warnings: WarningLog::new(),
            api,
        }
    }

    /// The service client.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The run configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A handle that cancels every wait of this engine.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Warnings raised so far.
    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    /// A task waiter bound to this engine's polling and cancellation.
    pub fn waiter(&self) -> TaskWaiter<'_, A> {
        TaskWaiter::new(&*self.api, &self.config.poll, &self.cancel, &self.warnings)
    }

    /// A reconciler bound to this engine.
    pub fn reconciler(&self) -> Reconciler<'_, A> {
        Reconciler::new(&*self.api, self.waiter(), &self.warnings, &self.config)
    }

    /// Rebuilds a full mirror pipeline for every declared repository.
    ///
    /// Repositories are processed one after the other in declaration
    /// order. A failing repository is recorded in the report and the run
    /// moves on, unless `fail_fast` is configured.
    pub fn create_new(&self, mirrors: &DeclaredMirrors) -> EngineResult<RunReport> {
        let _span = info_span!("create_new", session = %self.config.session_label).entered();
        let orchestrator =
            MirrorOrchestrator::new(&*self.api, self.waiter(), &self.warnings, &self.config);

        let mut report = RunReport::new();
        for spec in mirrors.repos() {
            let result = orchestrator.run(spec);
            if let Some(record) = report.absorb(&spec.name, result, self.config.fail_fast)? {
                info!(
                    name = %record.name,
                    url = record.distro_url.as_deref().unwrap_or(""),
                    "mirror ready"
                );
                report.succeed(record.name);
            }
        }
        Ok(report)
    }

    /// Builds slim repositories from the declared mirrors' published content.
    pub fn use_existing(&self, mirrors: &DeclaredMirrors) -> EngineResult<SlimRun> {
        let _span = info_span!("use_existing", session = %self.config.session_label).entered();
        SlimRepoPipeline::new(&*self.api, self.waiter(), &self.warnings, &self.config).run(mirrors)
    }
}

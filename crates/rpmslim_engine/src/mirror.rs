//! The create-new workflow: a full mirror pipeline per declared repository.
//!
//! A pipeline moves through a fixed sequence of stages. Each stage takes
//! the repository's [`MirrorRecord`] by value and hands back the record
//! advanced by one stage, so nothing is shared between repositories.
//! A failing stage stops the pipeline where it is; earlier stages are not
//! rolled back.

use crate::config::{EngineConfig, RepoRole};
use crate::declared::RepoSpec;
use crate::error::{remote_err, EngineError, EngineResult};
use crate::reconciler::Reconciler;
use crate::waiter::{Expected, TaskWaiter};
use crate::warnings::WarningLog;
use rpmslim_api::{Href, PulpApi, SyncRequest};
use std::fmt;
use tracing::info;

/// How far a mirror pipeline has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MirrorStage {
    /// Nothing exists yet (or everything was torn down).
    Absent,
    /// The repository exists.
    RepoEnsured,
    /// The remote exists.
    RemoteCreated,
    /// The repository holds a mirror of the upstream.
    SyncCompleted,
    /// The synced version is published.
    PublicationEnsured,
    /// A distribution serves the publication.
    DistributionEnsured,
}

impl fmt::Display for MirrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MirrorStage::Absent => "absent",
            MirrorStage::RepoEnsured => "repo-ensured",
            MirrorStage::RemoteCreated => "remote-created",
            MirrorStage::SyncCompleted => "sync-completed",
            MirrorStage::PublicationEnsured => "publication-ensured",
            MirrorStage::DistributionEnsured => "distribution-ensured",
        };
        f.write_str(name)
    }
}

/// State of one mirror pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorRecord {
    /// Mirror name.
    pub name: String,
    /// Upstream URL.
    pub url: String,
    /// Last stage reached.
    pub stage: MirrorStage,
    /// Repository href.
    pub repository: Option<Href>,
    /// Remote href.
    pub remote: Option<Href>,
    /// Repository version produced by the sync.
    pub version: Option<Href>,
    /// Publication href.
    pub publication: Option<Href>,
    /// Distribution href.
    pub distribution: Option<Href>,
    /// URL the distribution is served at.
    pub distro_url: Option<String>,
}

impl MirrorRecord {
    /// A pipeline that has not started.
    pub fn new(spec: &RepoSpec) -> Self {
        Self {
            name: spec.name.clone(),
            url: spec.url.clone(),
            stage: MirrorStage::Absent,
            repository: None,
            remote: None,
            version: None,
            publication: None,
            distribution: None,
            distro_url: None,
        }
    }

    fn advance(mut self, stage: MirrorStage) -> Self {
        info!(repo = %self.name, stage = %stage, "mirror stage reached");
        self.stage = stage;
        self
    }

    fn require<'r>(&self, field: &'r Option<Href>, kind: &'static str) -> EngineResult<&'r Href> {
        field.as_ref().ok_or_else(|| EngineError::NotFound {
            kind,
            name: self.name.clone(),
        })
    }
}

/// Stands up full mirror pipelines.
pub struct MirrorOrchestrator<'a, A: ?Sized> {
    api: &'a A,
    waiter: TaskWaiter<'a, A>,
    reconciler: Reconciler<'a, A>,
    config: &'a EngineConfig,
}

impl<'a, A: PulpApi + ?Sized> MirrorOrchestrator<'a, A> {
    /// Creates an orchestrator.
    pub fn new(
        api: &'a A,
        waiter: TaskWaiter<'a, A>,
        warnings: &'a WarningLog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            api,
            waiter,
            reconciler: Reconciler::new(api, waiter, warnings, config),
            config,
        }
    }

    /// Tears down whatever exists under the name, then rebuilds the mirror.
    pub fn run(&self, spec: &RepoSpec) -> EngineResult<MirrorRecord> {
        let record = self.teardown(MirrorRecord::new(spec))?;
        let record = self.ensure_repository(record)?;
        let record = self.create_remote(record)?;
        let record = self.sync(record)?;
        let record = self.publish(record)?;
        self.distribute(record)
    }

    /// Deletes every resource carrying the record's name.
    pub fn teardown(&self, record: MirrorRecord) -> EngineResult<MirrorRecord> {
        info!(repo = %record.name, "tearing down existing mirror");
        self.reconciler.delete_mirror(&record.name)?;
        Ok(record.advance(MirrorStage::Absent))
    }

    /// Absent → repo-ensured.
    pub fn ensure_repository(&self, mut record: MirrorRecord) -> EngineResult<MirrorRecord> {
        let labels = self.config.labels(RepoRole::RemoteMirror);
        let repository = self.reconciler.ensure_repository(&record.name, &labels)?;
        record.repository = Some(repository.pulp_href);
        Ok(record.advance(MirrorStage::RepoEnsured))
    }

    /// Repo-ensured → remote-created.
    pub fn create_remote(&self, mut record: MirrorRecord) -> EngineResult<MirrorRecord> {
        let labels = self.config.labels(RepoRole::RemoteMirror);
        let remote = self
            .reconciler
            .ensure_remote(&record.name, &record.url, &labels)?;
        record.remote = Some(remote.pulp_href);
        Ok(record.advance(MirrorStage::RemoteCreated))
    }

    /// Remote-created → sync-completed, mirroring the upstream exactly.
    pub fn sync(&self, mut record: MirrorRecord) -> EngineResult<MirrorRecord> {
        let repository = record.require(&record.repository, "repository")?.clone();
        let remote = record.require(&record.remote, "remote")?.clone();

        info!(repo = %record.name, url = %record.url, "syncing from upstream");
        let task = self
            .api
            .sync_repository(&repository, &SyncRequest { remote, mirror: true })
            .map_err(remote_err("sync_repository", &record.name))?;
        let created = self.waiter.wait_created(&task.task, Expected::EXACTLY_ONE)?;

        // A sync that changes nothing creates no version; use the latest.
        let version = match created.into_iter().next() {
            Some(version) => version,
            None => self
                .api
                .read_repository(&repository)
                .map_err(remote_err("read_repository", &record.name))?
                .latest_version_href
                .ok_or_else(|| EngineError::NotFound {
                    kind: "repository version",
                    name: record.name.clone(),
                })?,
        };
        record.version = Some(version);
        Ok(record.advance(MirrorStage::SyncCompleted))
    }

    /// Sync-completed → publication-ensured.
    pub fn publish(&self, mut record: MirrorRecord) -> EngineResult<MirrorRecord> {
        let version = record.require(&record.version, "repository version")?;
        let publication = self.reconciler.ensure_publication(version)?;
        record.publication = Some(publication.pulp_href);
        Ok(record.advance(MirrorStage::PublicationEnsured))
    }

    /// Publication-ensured → distribution-ensured.
    pub fn distribute(&self, mut record: MirrorRecord) -> EngineResult<MirrorRecord> {
        let publication = record.require(&record.publication, "publication")?;
        let distribution = self
            .reconciler
            .ensure_distribution(&record.name, publication)?;
        record.distribution = Some(distribution.pulp_href);
        record.distro_url = distribution.base_url;
        Ok(record.advance(MirrorStage::DistributionEnsured))
    }
}

//! Ensure-or-create and delete-by-name for each resource kind.
//!
//! Names are the reconciliation key: an ensure call never creates a second
//! resource under a name that already exists. Existing repositories,
//! remotes and publications are reused as they are; distributions are the
//! one kind moved toward the desired state, because they are the
//! user-facing pointer and must serve the latest publication.

use crate::config::EngineConfig;
use crate::error::{remote_err, EngineError, EngineResult};
use crate::waiter::{Expected, TaskWaiter};
use crate::warnings::{EngineWarning, WarningLog};
use rpmslim_api::{
    Distribution, Href, Labels, NewDistribution, NewPublication, NewRemote, NewRepository,
    Publication, PulpApi, Remote, Repository, TaskRef,
};
use tracing::{info, warn};

/// Reconciles named resources against the remote service.
pub struct Reconciler<'a, A: ?Sized> {
    api: &'a A,
    waiter: TaskWaiter<'a, A>,
    warnings: &'a WarningLog,
    config: &'a EngineConfig,
}

impl<'a, A: PulpApi + ?Sized> Reconciler<'a, A> {
    /// Creates a reconciler.
    pub fn new(
        api: &'a A,
        waiter: TaskWaiter<'a, A>,
        warnings: &'a WarningLog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            api,
            waiter,
            warnings,
            config,
        }
    }

    /// Returns the repository named `name`, creating it if absent.
    pub fn ensure_repository(&self, name: &str, labels: &Labels) -> EngineResult<Repository> {
        let existing = self
            .api
            .list_repositories(name)
            .map_err(remote_err("list_repositories", name))?;
        if let Some(repository) = existing.into_iter().next() {
            self.already_exists("repository", name);
            return Ok(repository);
        }

        info!(resource = name, "creating repository");
        self.api
            .create_repository(&NewRepository {
                name: name.to_string(),
                pulp_labels: labels.clone(),
            })
            .map_err(remote_err("create_repository", name))
    }

    /// Returns the remote named `name`, creating it for `url` if absent.
    pub fn ensure_remote(&self, name: &str, url: &str, labels: &Labels) -> EngineResult<Remote> {
        let existing = self
            .api
            .list_remotes(name)
            .map_err(remote_err("list_remotes", name))?;
        if let Some(remote) = existing.into_iter().next() {
            self.already_exists("remote", name);
            return Ok(remote);
        }

        info!(resource = name, url, "creating remote");
        self.api
            .create_remote(&NewRemote {
                name: name.to_string(),
                url: url.to_string(),
                policy: self.config.remote_policy.clone(),
                tls_validation: self.config.tls_validation,
                pulp_labels: labels.clone(),
            })
            .map_err(remote_err("create_remote", name))
    }

    /// Returns a publication of `version`, publishing it if none exists.
    pub fn ensure_publication(&self, version: &Href) -> EngineResult<Publication> {
        let existing = self
            .api
            .list_publications(version)
            .map_err(remote_err("list_publications", version))?;
        if let Some(publication) = existing.into_iter().next() {
            self.already_exists("publication", version.as_str());
            return Ok(publication);
        }

        info!(version = %version, "creating publication");
        let TaskRef { task } = self
            .api
            .create_publication(&NewPublication::sha256(version.clone()))
            .map_err(remote_err("create_publication", version))?;
        let created = self.waiter.wait_created(&task, Expected::EXACTLY_ONE)?;
        let href = created.first().ok_or_else(|| EngineError::NotFound {
            kind: "publication",
            name: version.to_string(),
        })?;
        self.api
            .read_publication(href)
            .map_err(remote_err("read_publication", href))
    }

    /// Makes the distribution named `name` serve `publication`.
    ///
    /// An existing distribution already serving it is returned untouched;
    /// one serving anything else is updated in place.
    pub fn ensure_distribution(&self, name: &str, publication: &Href) -> EngineResult<Distribution> {
        let request = NewDistribution::named(name, publication.clone());
        let existing = self
            .api
            .list_distributions(name)
            .map_err(remote_err("list_distributions", name))?;

        let TaskRef { task } = match existing.into_iter().next() {
            Some(distribution) if distribution.publication.as_ref() == Some(publication) => {
                self.already_exists("distribution", name);
                return Ok(distribution);
            }
            Some(distribution) => {
                info!(resource = name, publication = %publication, "updating distribution");
                let task = self
                    .api
                    .update_distribution(&distribution.pulp_href, &request)
                    .map_err(remote_err("update_distribution", name))?;
                self.waiter.wait_completed(&task.task)?;
                return self.read_distribution(name);
            }
            None => {
                info!(resource = name, publication = %publication, "creating distribution");
                self.api
                    .create_distribution(&request)
                    .map_err(remote_err("create_distribution", name))?
            }
        };
        self.waiter.wait_created(&task, Expected::EXACTLY_ONE)?;
        self.read_distribution(name)
    }

    fn read_distribution(&self, name: &str) -> EngineResult<Distribution> {
        self.api
            .list_distributions(name)
            .map_err(remote_err("list_distributions", name))?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::DistributionNotFound {
                name: name.to_string(),
            })
    }

    /// Issues a delete for every repository named `name`; does not wait.
    pub fn delete_repositories(&self, name: &str) -> EngineResult<Vec<Href>> {
        let mut tasks = Vec::new();
        for repository in self
            .api
            .list_repositories(name)
            .map_err(remote_err("list_repositories", name))?
        {
            warn!(resource = name, href = %repository.pulp_href, "deleting repository");
            let task = self
                .api
                .delete_repository(&repository.pulp_href)
                .map_err(remote_err("delete_repository", name))?;
            tasks.extend(task.map(|t| t.task));
        }
        Ok(tasks)
    }

    /// Issues a delete for every remote named `name`; does not wait.
    pub fn delete_remotes(&self, name: &str) -> EngineResult<Vec<Href>> {
        let mut tasks = Vec::new();
        for remote in self
            .api
            .list_remotes(name)
            .map_err(remote_err("list_remotes", name))?
        {
            warn!(resource = name, href = %remote.pulp_href, "deleting remote");
            let task = self
                .api
                .delete_remote(&remote.pulp_href)
                .map_err(remote_err("delete_remote", name))?;
            tasks.extend(task.map(|t| t.task));
        }
        Ok(tasks)
    }

    /// Deletes the publication served by the distribution named `name`.
    ///
    /// Publications have no name, so they are only reachable through a
    /// distribution: without one, or when it serves nothing, this is a
    /// no-op and orphaned publications are left in place. A publication
    /// already removed along with its repository counts as deleted.
    pub fn delete_publications(&self, name: &str) -> EngineResult<Vec<Href>> {
        let distributions = self
            .api
            .list_distributions(name)
            .map_err(remote_err("list_distributions", name))?;
        let Some(publication) = distributions.into_iter().next().and_then(|d| d.publication)
        else {
            return Ok(Vec::new());
        };

        warn!(resource = name, href = %publication, "deleting publication");
        match self.api.delete_publication(&publication) {
            Ok(task) => Ok(task.map(|t| t.task).into_iter().collect()),
            Err(err) if err.is_not_found() => {
                info!(resource = name, href = %publication, "publication already gone");
                Ok(Vec::new())
            }
            Err(err) => Err(EngineError::remote("delete_publication", name, err)),
        }
    }

    /// Issues a delete for every distribution named `name`; does not wait.
    pub fn delete_distributions(&self, name: &str) -> EngineResult<Vec<Href>> {
        let mut tasks = Vec::new();
        for distribution in self
            .api
            .list_distributions(name)
            .map_err(remote_err("list_distributions", name))?
        {
            warn!(resource = name, href = %distribution.pulp_href, "deleting distribution");
            let task = self
                .api
                .delete_distribution(&distribution.pulp_href)
                .map_err(remote_err("delete_distribution", name))?;
            tasks.extend(task.map(|t| t.task));
        }
        Ok(tasks)
    }

    /// Tears down the whole mirror pipeline named `name`.
    ///
    /// All deletes are issued first, then awaited one by one. Any error
    /// stops the teardown; deletes already issued are not rolled back.
    pub fn delete_mirror(&self, name: &str) -> EngineResult<()> {
        let mut tasks = self.delete_repositories(name)?;
        tasks.extend(self.delete_remotes(name)?);
        tasks.extend(self.delete_publications(name)?);
        tasks.extend(self.delete_distributions(name)?);

        self.waiter.wait_all(&tasks)
    }

    fn already_exists(&self, kind: &'static str, name: &str) {
        self.warnings.push(EngineWarning::AlreadyExists {
            kind,
            name: name.to_string(),
        });
    }
}

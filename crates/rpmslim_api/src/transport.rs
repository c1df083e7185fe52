//! The remote service collaborator.

use crate::error::ApiResult;
use crate::resources::{
    CopyRequest, Distribution, Href, NewDistribution, NewPublication, NewRemote, NewRepository,
    Package, PackageQuery, Page, Publication, Remote, Repository, RepositoryVersion, SyncRequest,
    Task, TaskRef,
};

/// Request/response access to a Pulp service.
///
/// Every mutating call either returns the created resource directly or a
/// [`TaskRef`] that has to be polled through [`PulpApi::read_task`].
/// Implementations cover the real HTTP API as well as in-memory fakes.
pub trait PulpApi: Send + Sync {
    /// Lists repositories with exactly this name.
    fn list_repositories(&self, name: &str) -> ApiResult<Vec<Repository>>;

    /// Creates a repository.
    fn create_repository(&self, request: &NewRepository) -> ApiResult<Repository>;

    /// Reads a repository.
    fn read_repository(&self, href: &Href) -> ApiResult<Repository>;

    /// Deletes a repository.
    fn delete_repository(&self, href: &Href) -> ApiResult<Option<TaskRef>>;

    /// Syncs a repository from a remote.
    fn sync_repository(&self, repository: &Href, request: &SyncRequest) -> ApiResult<TaskRef>;

    /// Reads a repository version.
    fn read_repository_version(&self, href: &Href) -> ApiResult<RepositoryVersion>;

    /// Lists remotes with exactly this name.
    fn list_remotes(&self, name: &str) -> ApiResult<Vec<Remote>>;

    /// Creates a remote.
    fn create_remote(&self, request: &NewRemote) -> ApiResult<Remote>;

    /// Deletes a remote.
    fn delete_remote(&self, href: &Href) -> ApiResult<Option<TaskRef>>;

    /// Lists publications of a repository version.
    fn list_publications(&self, repository_version: &Href) -> ApiResult<Vec<Publication>>;

    /// Starts publication of a repository version.
    fn create_publication(&self, request: &NewPublication) -> ApiResult<TaskRef>;

    /// Reads a publication.
    fn read_publication(&self, href: &Href) -> ApiResult<Publication>;

    /// Deletes a publication.
    fn delete_publication(&self, href: &Href) -> ApiResult<Option<TaskRef>>;

    /// Lists distributions with exactly this name.
    fn list_distributions(&self, name: &str) -> ApiResult<Vec<Distribution>>;

    /// Starts creation of a distribution.
    fn create_distribution(&self, request: &NewDistribution) -> ApiResult<TaskRef>;

    /// Starts an update of a distribution.
    fn update_distribution(&self, href: &Href, request: &NewDistribution) -> ApiResult<TaskRef>;

    /// Deletes a distribution.
    fn delete_distribution(&self, href: &Href) -> ApiResult<Option<TaskRef>>;

    /// Lists one page of packages contained in a repository version.
    fn list_packages(&self, query: &PackageQuery) -> ApiResult<Page<Package>>;

    /// Starts a batched content copy.
    fn copy_content(&self, request: &CopyRequest) -> ApiResult<TaskRef>;

    /// Reads a task.
    fn read_task(&self, href: &Href) -> ApiResult<Task>;
}

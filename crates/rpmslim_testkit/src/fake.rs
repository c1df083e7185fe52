//! In-memory Pulp service.
//!
//! `FakePulp` keeps every resource in a single locked state and applies the
//! effects of asynchronous calls immediately; the spawned task then reports
//! `running` for a configurable number of polls before its final state.
//! Every trait call is journaled by name so tests can count them.
//!
//! Differences from a real service worth knowing:
//! - deleting a repository removes its versions; publications of those
//!   versions go too only with [`FakePulp::with_cascading_deletes`], and
//!   distributions keep pointing at them either way
//! - publication deletes are synchronous (no task)
//! - names are unique per resource kind; duplicates are rejected with 400

use parking_lot::Mutex;
use rpmslim_api::{
    ApiError, ApiResult, CopyRequest, Distribution, Href, NewDistribution, NewPublication,
    NewRemote, NewRepository, Package, PackageQuery, Page, Publication, PulpApi, Remote,
    Repository, RepositoryVersion, SyncRequest, Task, TaskRef, TaskState, API_ROOT,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Base URL distributions are served under.
pub const CONTENT_BASE: &str = "http://pulp.test/pulp/content/";

/// An upstream package with its runtime dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Package name.
    pub name: String,
    /// Names of packages this one requires.
    pub requires: Vec<String>,
}

impl PackageSpec {
    /// Creates a package without dependencies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
        }
    }

    /// Adds required package names.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }
}

impl From<&str> for PackageSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Hrefs of a pipeline created by [`FakePulp::seed_mirror`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededMirror {
    /// Repository.
    pub repository: Href,
    /// Remote.
    pub remote: Href,
    /// Synced repository version.
    pub version: Href,
    /// Publication of that version.
    pub publication: Href,
    /// Distribution serving the publication.
    pub distribution: Href,
}

struct StoredPackage {
    package: Package,
    requires: Vec<String>,
}

struct StoredVersion {
    version: RepositoryVersion,
    content: BTreeSet<Href>,
}

struct StoredTask {
    task: Task,
    pending: VecDeque<TaskState>,
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    repositories: BTreeMap<Href, Repository>,
    versions: BTreeMap<Href, StoredVersion>,
    remotes: BTreeMap<Href, Remote>,
    publications: BTreeMap<Href, Publication>,
    distributions: BTreeMap<Href, Distribution>,
    packages: BTreeMap<Href, StoredPackage>,
    upstreams: HashMap<String, Vec<Href>>,
    tasks: BTreeMap<Href, StoredTask>,
    calls: Vec<&'static str>,
    injected_errors: HashMap<&'static str, ApiError>,
    failing_tasks: HashMap<&'static str, String>,
    polls_before_complete: usize,
    page_size_cap: Option<u32>,
    cascade_deletes: bool,
}

impl FakeState {
    fn mint(&mut self, collection: &str) -> Href {
        self.next_id += 1;
        Href::new(format!("{API_ROOT}{collection}{:08}/", self.next_id))
    }

    fn record(&mut self, call: &'static str) -> ApiResult<()> {
        self.calls.push(call);
        match self.injected_errors.remove(call) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn spawn_task(&mut self, name: &str, outcome: Result<Vec<Href>, String>) -> TaskRef {
        let href = self.mint("tasks/");
        let (state, created_resources, error) = match outcome {
            Ok(created) => (TaskState::Completed, created, None),
            Err(description) => (
                TaskState::Failed,
                Vec::new(),
                Some(serde_json::json!({ "description": description })),
            ),
        };
        let task = Task {
            pulp_href: href.clone(),
            name: name.to_string(),
            state,
            created_resources,
            error,
        };
        let pending = std::iter::repeat(TaskState::Running)
            .take(self.polls_before_complete)
            .collect();
        self.tasks.insert(href.clone(), StoredTask { task, pending });
        TaskRef { task: href }
    }

    fn add_package(&mut self, spec: &PackageSpec) -> Href {
        let href = self.mint("content/rpm/packages/");
        let package = Package {
            pulp_href: href.clone(),
            name: spec.name.clone(),
            version: "1.0".into(),
            release: "1".into(),
            arch: "x86_64".into(),
        };
        self.packages.insert(
            href.clone(),
            StoredPackage {
                package,
                requires: spec.requires.clone(),
            },
        );
        href
    }

    fn create_repository(&mut self, request: &NewRepository) -> ApiResult<Repository> {
        if self.repositories.values().any(|r| r.name == request.name) {
            return Err(ApiError::http(400, r#"{"name":["This field must be unique."]}"#));
        }
        let href = self.mint("repositories/rpm/rpm/");
        let repository = Repository {
            pulp_href: href.clone(),
            name: request.name.clone(),
            latest_version_href: None,
            pulp_labels: request.pulp_labels.clone(),
        };
        self.repositories.insert(href.clone(), repository.clone());
        // Every repository starts with an empty version 0.
        self.add_version(&href, BTreeSet::new())?;
        self.repositories
            .get(&href)
            .cloned()
            .ok_or_else(|| ApiError::http(500, "repository vanished"))
    }

    fn add_version(&mut self, repository: &Href, content: BTreeSet<Href>) -> ApiResult<Href> {
        let number = self
            .versions
            .values()
            .filter(|v| v.version.repository.as_ref() == Some(repository))
            .count() as u64;
        let href = Href::new(format!("{}versions/{number}/", repository.as_str()));
        self.versions.insert(
            href.clone(),
            StoredVersion {
                version: RepositoryVersion {
                    pulp_href: href.clone(),
                    number,
                    repository: Some(repository.clone()),
                },
                content,
            },
        );
        let repo = self
            .repositories
            .get_mut(repository)
            .ok_or_else(|| not_found(repository))?;
        repo.latest_version_href = Some(href.clone());
        Ok(href)
    }

    fn create_remote(&mut self, request: &NewRemote) -> ApiResult<Remote> {
        if self.remotes.values().any(|r| r.name == request.name) {
            return Err(ApiError::http(400, r#"{"name":["This field must be unique."]}"#));
        }
        let href = self.mint("remotes/rpm/rpm/");
        let remote = Remote {
            pulp_href: href.clone(),
            name: request.name.clone(),
            url: request.url.clone(),
            policy: Some(request.policy.clone()),
        };
        self.remotes.insert(href, remote.clone());
        Ok(remote)
    }

    fn create_publication(&mut self, version: &Href) -> ApiResult<Href> {
        let stored = self.versions.get(version).ok_or_else(|| not_found(version))?;
        let repository = stored.version.repository.clone();
        let href = self.mint("publications/rpm/rpm/");
        self.publications.insert(
            href.clone(),
            Publication {
                pulp_href: href.clone(),
                repository_version: Some(version.clone()),
                repository,
            },
        );
        Ok(href)
    }

    fn create_distribution(&mut self, request: &NewDistribution) -> ApiResult<Href> {
        if self.distributions.values().any(|d| d.name == request.name) {
            return Err(ApiError::http(400, r#"{"name":["This field must be unique."]}"#));
        }
        let href = self.mint("distributions/rpm/rpm/");
        self.distributions.insert(
            href.clone(),
            Distribution {
                pulp_href: href.clone(),
                name: request.name.clone(),
                base_path: request.base_path.clone(),
                base_url: Some(format!("{CONTENT_BASE}{}/", request.base_path)),
                publication: Some(request.publication.clone()),
            },
        );
        Ok(href)
    }

    fn copy(&mut self, request: &CopyRequest) -> Result<Vec<Href>, String> {
        let mut additions = Vec::with_capacity(request.config.len());
        for entry in &request.config {
            let source = self
                .versions
                .get(&entry.source_repo_version)
                .ok_or_else(|| format!("unknown repository version {}", entry.source_repo_version))?;
            if !self.repositories.contains_key(&entry.dest_repo) {
                return Err(format!("unknown repository {}", entry.dest_repo));
            }
            let mut selected: BTreeSet<Href> = match &entry.content {
                Some(content) => {
                    if let Some(stray) = content.iter().find(|c| !source.content.contains(*c)) {
                        return Err(format!("content {stray} is not in the source version"));
                    }
                    content.iter().cloned().collect()
                }
                None => source.content.clone(),
            };
            if request.dependency_solving {
                self.close_over_dependencies(&source.content, &mut selected);
            }
            additions.push((entry.dest_repo.clone(), selected));
        }

        let mut created = Vec::with_capacity(additions.len());
        for (dest, selected) in additions {
            let mut content = self
                .repositories
                .get(&dest)
                .and_then(|r| r.latest_version_href.as_ref())
                .and_then(|v| self.versions.get(v))
                .map(|v| v.content.clone())
                .unwrap_or_default();
            content.extend(selected);
            created.push(self.add_version(&dest, content).map_err(|e| e.to_string())?);
        }
        Ok(created)
    }

    fn close_over_dependencies(&self, available: &BTreeSet<Href>, selected: &mut BTreeSet<Href>) {
        let mut queue: Vec<Href> = selected.iter().cloned().collect();
        while let Some(href) = queue.pop() {
            let Some(stored) = self.packages.get(&href) else {
                continue;
            };
            for required in &stored.requires {
                for candidate in available {
                    let matches = self
                        .packages
                        .get(candidate)
                        .is_some_and(|p| &p.package.name == required);
                    if matches && selected.insert(candidate.clone()) {
                        queue.push(candidate.clone());
                    }
                }
            }
        }
    }
}

fn not_found(href: &Href) -> ApiError {
    ApiError::http(404, format!("{href} not found"))
}

/// An in-memory Pulp service for tests.
pub struct FakePulp {
    state: Mutex<FakeState>,
}

impl FakePulp {
    /// Creates an empty service whose tasks complete on the first poll.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Makes every task report `running` for `polls` reads before finishing.
    pub fn with_polls_before_complete(self, polls: usize) -> Self {
        self.state.lock().polls_before_complete = polls;
        self
    }

    /// Makes repository deletes also remove publications of its versions.
    pub fn with_cascading_deletes(self) -> Self {
        self.state.lock().cascade_deletes = true;
        self
    }

    /// Caps the page size of the package listing.
    pub fn with_page_size_cap(self, cap: u32) -> Self {
        self.state.lock().page_size_cap = Some(cap);
        self
    }

    /// Registers upstream content served at `url`.
    pub fn add_upstream(&self, url: &str, packages: &[PackageSpec]) {
        let mut state = self.state.lock();
        let hrefs = packages.iter().map(|p| state.add_package(p)).collect();
        state.upstreams.insert(url.to_string(), hrefs);
    }

    /// Creates a complete mirror pipeline directly, without journaling calls.
    pub fn seed_mirror(&self, name: &str, url: &str, packages: &[PackageSpec]) -> SeededMirror {
        self.add_upstream(url, packages);
        let mut state = self.state.lock();
        let content: BTreeSet<Href> = state.upstreams[url].iter().cloned().collect();
        let repository = state
            .create_repository(&NewRepository {
                name: name.to_string(),
                pulp_labels: Default::default(),
            })
            .expect("seeded repository name must be unique")
            .pulp_href;
        let remote = state
            .create_remote(&NewRemote {
                name: name.to_string(),
                url: url.to_string(),
                policy: "on_demand".into(),
                tls_validation: false,
                pulp_labels: Default::default(),
            })
            .expect("seeded remote name must be unique")
            .pulp_href;
        let version = state
            .add_version(&repository, content)
            .expect("seeded repository exists");
        let publication = state
            .create_publication(&version)
            .expect("seeded version exists");
        let distribution = state
            .create_distribution(&NewDistribution::named(name, publication.clone()))
            .expect("seeded distribution name must be unique");
        SeededMirror {
            repository,
            remote,
            version,
            publication,
            distribution,
        }
    }

    /// Creates a repository directly, without journaling the call.
    pub fn seed_repository(&self, name: &str) -> Repository {
        self.state
            .lock()
            .create_repository(&NewRepository {
                name: name.to_string(),
                pulp_labels: Default::default(),
            })
            .expect("seeded repository name must be unique")
    }

    /// Creates a publication for a version directly.
    pub fn seed_publication(&self, version: &Href) -> Href {
        self.state
            .lock()
            .create_publication(version)
            .expect("seeded version exists")
    }

    /// Creates a distribution directly.
    pub fn seed_distribution(&self, name: &str, publication: Option<&Href>) -> Href {
        let mut state = self.state.lock();
        let placeholder = Href::new("/unset/");
        let href = state
            .create_distribution(&NewDistribution::named(
                name,
                publication.cloned().unwrap_or(placeholder),
            ))
            .expect("seeded distribution name must be unique");
        if publication.is_none() {
            if let Some(distribution) = state.distributions.get_mut(&href) {
                distribution.publication = None;
            }
        }
        href
    }

    /// Registers a task that walks through `states`; the last one is final.
    pub fn script_task(&self, name: &str, states: &[TaskState], created: &[Href]) -> Href {
        let mut state = self.state.lock();
        let href = state.mint("tasks/");
        let (last, pending) = states
            .split_last()
            .expect("a scripted task needs at least one state");
        let task = Task {
            pulp_href: href.clone(),
            name: name.to_string(),
            state: *last,
            created_resources: created.to_vec(),
            error: None,
        };
        state.tasks.insert(
            href.clone(),
            StoredTask {
                task,
                pending: pending.iter().copied().collect(),
            },
        );
        href
    }

    /// Makes the next call named `call` fail with `error`.
    pub fn fail_next(&self, call: &'static str, error: ApiError) {
        self.state.lock().injected_errors.insert(call, error);
    }

    /// Makes the next task spawned by `call` end in `failed`.
    pub fn fail_task(&self, call: &'static str, description: &str) {
        self.state
            .lock()
            .failing_tasks
            .insert(call, description.to_string());
    }

    /// Names of all calls received so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// Number of calls received with this name.
    pub fn call_count(&self, call: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    /// Clears the call journal.
    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Looks up a repository by name.
    pub fn repository(&self, name: &str) -> Option<Repository> {
        self.state
            .lock()
            .repositories
            .values()
            .find(|r| r.name == name)
            .cloned()
    }

    /// Looks up a remote by name.
    pub fn remote(&self, name: &str) -> Option<Remote> {
        self.state
            .lock()
            .remotes
            .values()
            .find(|r| r.name == name)
            .cloned()
    }

    /// Looks up a distribution by name.
    pub fn distribution(&self, name: &str) -> Option<Distribution> {
        self.state
            .lock()
            .distributions
            .values()
            .find(|d| d.name == name)
            .cloned()
    }

    /// Returns true if the publication exists.
    pub fn has_publication(&self, href: &Href) -> bool {
        self.state.lock().publications.contains_key(href)
    }

    /// Reads a publication.
    pub fn publication(&self, href: &Href) -> Option<Publication> {
        self.state.lock().publications.get(href).cloned()
    }

    /// Sorted package names contained in a repository version.
    pub fn version_package_names(&self, version: &Href) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = state
            .versions
            .get(version)
            .map(|v| {
                v.content
                    .iter()
                    .filter_map(|c| state.packages.get(c))
                    .map(|p| p.package.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for FakePulp {
    fn default() -> Self {
        Self::new()
    }
}

impl PulpApi for FakePulp {
    fn list_repositories(&self, name: &str) -> ApiResult<Vec<Repository>> {
        let mut state = self.state.lock();
        state.record("list_repositories")?;
        Ok(state
            .repositories
            .values()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }

    fn create_repository(&self, request: &NewRepository) -> ApiResult<Repository> {
        let mut state = self.state.lock();
        state.record("create_repository")?;
        state.create_repository(request)
    }

    fn read_repository(&self, href: &Href) -> ApiResult<Repository> {
        let mut state = self.state.lock();
        state.record("read_repository")?;
        state
            .repositories
            .get(href)
            .cloned()
            .ok_or_else(|| not_found(href))
    }

    fn delete_repository(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        let mut state = self.state.lock();
        state.record("delete_repository")?;
        if let Some(description) = state.failing_tasks.remove("delete_repository") {
            return Ok(Some(state.spawn_task("delete_repository", Err(description))));
        }
        state.repositories.remove(href).ok_or_else(|| not_found(href))?;
        state
            .versions
            .retain(|_, v| v.version.repository.as_ref() != Some(href));
        if state.cascade_deletes {
            state
                .publications
                .retain(|_, p| p.repository.as_ref() != Some(href));
        }
        Ok(Some(state.spawn_task("delete_repository", Ok(Vec::new()))))
    }

    fn sync_repository(&self, repository: &Href, request: &SyncRequest) -> ApiResult<TaskRef> {
        let mut state = self.state.lock();
        state.record("sync_repository")?;
        if let Some(description) = state.failing_tasks.remove("sync_repository") {
            return Ok(state.spawn_task("sync", Err(description)));
        }
        let remote = state
            .remotes
            .get(&request.remote)
            .cloned()
            .ok_or_else(|| not_found(&request.remote))?;
        if !state.repositories.contains_key(repository) {
            return Err(not_found(repository));
        }
        let Some(upstream) = state.upstreams.get(&remote.url).cloned() else {
            let description = format!("could not fetch {}", remote.url);
            return Ok(state.spawn_task("sync", Err(description)));
        };
        let mut content: BTreeSet<Href> = upstream.into_iter().collect();
        if !request.mirror {
            if let Some(latest) = state
                .repositories
                .get(repository)
                .and_then(|r| r.latest_version_href.clone())
            {
                if let Some(previous) = state.versions.get(&latest) {
                    content.extend(previous.content.iter().cloned());
                }
            }
        }
        let version = state.add_version(repository, content)?;
        Ok(state.spawn_task("sync", Ok(vec![version])))
    }

    fn read_repository_version(&self, href: &Href) -> ApiResult<RepositoryVersion> {
        let mut state = self.state.lock();
        state.record("read_repository_version")?;
        state
            .versions
            .get(href)
            .map(|v| v.version.clone())
            .ok_or_else(|| not_found(href))
    }

    fn list_remotes(&self, name: &str) -> ApiResult<Vec<Remote>> {
        let mut state = self.state.lock();
        state.record("list_remotes")?;
        Ok(state
            .remotes
            .values()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }

    fn create_remote(&self, request: &NewRemote) -> ApiResult<Remote> {
        let mut state = self.state.lock();
        state.record("create_remote")?;
        state.create_remote(request)
    }

    fn delete_remote(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        let mut state = self.state.lock();
        state.record("delete_remote")?;
        state.remotes.remove(href).ok_or_else(|| not_found(href))?;
        Ok(Some(state.spawn_task("delete_remote", Ok(Vec::new()))))
    }

    fn list_publications(&self, repository_version: &Href) -> ApiResult<Vec<Publication>> {
        let mut state = self.state.lock();
        state.record("list_publications")?;
        Ok(state
            .publications
            .values()
            .filter(|p| p.repository_version.as_ref() == Some(repository_version))
            .cloned()
            .collect())
    }

    fn create_publication(&self, request: &NewPublication) -> ApiResult<TaskRef> {
        let mut state = self.state.lock();
        state.record("create_publication")?;
        if let Some(description) = state.failing_tasks.remove("create_publication") {
            return Ok(state.spawn_task("publish", Err(description)));
        }
        let publication = state.create_publication(&request.repository_version)?;
        Ok(state.spawn_task("publish", Ok(vec![publication])))
    }

    fn read_publication(&self, href: &Href) -> ApiResult<Publication> {
        let mut state = self.state.lock();
        state.record("read_publication")?;
        state
            .publications
            .get(href)
            .cloned()
            .ok_or_else(|| not_found(href))
    }

    fn delete_publication(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        let mut state = self.state.lock();
        state.record("delete_publication")?;
        state
            .publications
            .remove(href)
            .ok_or_else(|| not_found(href))?;
        Ok(None)
    }

    fn list_distributions(&self, name: &str) -> ApiResult<Vec<Distribution>> {
        let mut state = self.state.lock();
        state.record("list_distributions")?;
        Ok(state
            .distributions
            .values()
            .filter(|d| d.name == name)
            .cloned()
            .collect())
    }

    fn create_distribution(&self, request: &NewDistribution) -> ApiResult<TaskRef> {
        let mut state = self.state.lock();
        state.record("create_distribution")?;
        if let Some(description) = state.failing_tasks.remove("create_distribution") {
            return Ok(state.spawn_task("general_create", Err(description)));
        }
        let distribution = state.create_distribution(request)?;
        Ok(state.spawn_task("general_create", Ok(vec![distribution])))
    }

    fn update_distribution(&self, href: &Href, request: &NewDistribution) -> ApiResult<TaskRef> {
        let mut state = self.state.lock();
        state.record("update_distribution")?;
        if let Some(description) = state.failing_tasks.remove("update_distribution") {
            return Ok(state.spawn_task("general_update", Err(description)));
        }
        let distribution = state
            .distributions
            .get_mut(href)
            .ok_or_else(|| not_found(href))?;
        distribution.name = request.name.clone();
        distribution.base_path = request.base_path.clone();
        distribution.base_url = Some(format!("{CONTENT_BASE}{}/", request.base_path));
        distribution.publication = Some(request.publication.clone());
        Ok(state.spawn_task("general_update", Ok(Vec::new())))
    }

    fn delete_distribution(&self, href: &Href) -> ApiResult<Option<TaskRef>> {
        let mut state = self.state.lock();
        state.record("delete_distribution")?;
        state
            .distributions
            .remove(href)
            .ok_or_else(|| not_found(href))?;
        Ok(Some(state.spawn_task("general_delete", Ok(Vec::new()))))
    }

    fn list_packages(&self, query: &PackageQuery) -> ApiResult<Page<Package>> {
        let mut state = self.state.lock();
        state.record("list_packages")?;
        let version = state
            .versions
            .get(&query.repository_version)
            .ok_or_else(|| not_found(&query.repository_version))?;
        let matches: Vec<Package> = version
            .content
            .iter()
            .filter_map(|c| state.packages.get(c))
            .filter(|p| query.names.is_empty() || query.names.contains(&p.package.name))
            .map(|p| p.package.clone())
            .collect();

        let limit = match state.page_size_cap {
            Some(cap) => query.limit.min(cap),
            None => query.limit,
        } as usize;
        let offset = query.offset as usize;
        let results: Vec<Package> = matches.iter().skip(offset).take(limit).cloned().collect();
        let end = offset + results.len();
        let next = (end < matches.len()).then(|| {
            format!(
                "{API_ROOT}content/rpm/packages/?limit={limit}&offset={end}&repository_version={}",
                query.repository_version
            )
        });
        Ok(Page {
            count: matches.len() as u64,
            next,
            previous: None,
            results,
        })
    }

    fn copy_content(&self, request: &CopyRequest) -> ApiResult<TaskRef> {
        let mut state = self.state.lock();
        state.record("copy_content")?;
        if let Some(description) = state.failing_tasks.remove("copy_content") {
            return Ok(state.spawn_task("copy_content", Err(description)));
        }
        let outcome = state.copy(request);
        Ok(state.spawn_task("copy_content", outcome))
    }

    fn read_task(&self, href: &Href) -> ApiResult<Task> {
        let mut state = self.state.lock();
        state.record("read_task")?;
        let stored = state.tasks.get_mut(href).ok_or_else(|| not_found(href))?;
        match stored.pending.pop_front() {
            Some(interim) => Ok(Task {
                state: interim,
                created_resources: Vec::new(),
                error: None,
                ..stored.task.clone()
            }),
            None => Ok(stored.task.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_mirror_is_fully_linked() {
        let pulp = FakePulp::new();
        let seeded = pulp.seed_mirror("el8", "https://up/el8", &["bash".into(), "glibc".into()]);

        let distribution = pulp.distribution("el8").unwrap();
        assert_eq!(distribution.publication, Some(seeded.publication.clone()));
        let publication = pulp.publication(&seeded.publication).unwrap();
        assert_eq!(publication.repository_version, Some(seeded.version.clone()));
        assert_eq!(pulp.version_package_names(&seeded.version), ["bash", "glibc"]);
        assert!(pulp.calls().is_empty());
    }

    #[test]
    fn tasks_report_running_before_final_state() {
        let pulp = FakePulp::new().with_polls_before_complete(2);
        let task = pulp.script_task("noop", &[TaskState::Completed], &[]);
        // Scripted tasks ignore the global poll count.
        assert_eq!(pulp.read_task(&task).unwrap().state, TaskState::Completed);

        let repo = pulp.seed_repository("r");
        let task = pulp.delete_repository(&repo.pulp_href).unwrap().unwrap().task;
        assert_eq!(pulp.read_task(&task).unwrap().state, TaskState::Running);
        assert_eq!(pulp.read_task(&task).unwrap().state, TaskState::Running);
        assert_eq!(pulp.read_task(&task).unwrap().state, TaskState::Completed);
    }

    #[test]
    fn cascading_repository_delete_takes_publications() {
        let pulp = FakePulp::new().with_cascading_deletes();
        let seeded = pulp.seed_mirror("el8", "https://up/el8", &["bash".into()]);

        pulp.delete_repository(&seeded.repository).unwrap();

        assert!(!pulp.has_publication(&seeded.publication));
        let distribution = pulp.distribution("el8").unwrap();
        assert_eq!(distribution.publication, Some(seeded.publication));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let pulp = FakePulp::new();
        pulp.seed_repository("dup");
        let err = pulp
            .create_repository(&NewRepository {
                name: "dup".into(),
                pulp_labels: Default::default(),
            })
            .unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 400, .. }));
    }

    #[test]
    fn injected_error_fires_once() {
        let pulp = FakePulp::new();
        pulp.fail_next("list_remotes", ApiError::http(503, "unavailable"));
        assert!(pulp.list_remotes("x").is_err());
        assert!(pulp.list_remotes("x").is_ok());
        assert_eq!(pulp.call_count("list_remotes"), 2);
    }

    #[test]
    fn package_listing_is_paginated() {
        let pulp = FakePulp::new().with_page_size_cap(2);
        let seeded = pulp.seed_mirror(
            "el8",
            "https://up/el8",
            &["a".into(), "b".into(), "c".into()],
        );
        let page = pulp
            .list_packages(&PackageQuery {
                repository_version: seeded.version.clone(),
                names: Vec::new(),
                limit: 100,
                offset: 0,
            })
            .unwrap();
        assert_eq!(page.count, 3);
        assert_eq!(page.results.len(), 2);
        assert!(page.has_more());
    }

    #[test]
    fn copy_pulls_in_dependencies() {
        let pulp = FakePulp::new();
        let seeded = pulp.seed_mirror(
            "el8",
            "https://up/el8",
            &[
                PackageSpec::new("bash").requires(["glibc"]),
                PackageSpec::new("glibc").requires(["tzdata"]),
                "tzdata".into(),
                "vim".into(),
            ],
        );
        let dest = pulp.seed_repository("slim");
        let bash = pulp
            .list_packages(&PackageQuery {
                repository_version: seeded.version.clone(),
                names: vec!["bash".into()],
                limit: 10,
                offset: 0,
            })
            .unwrap()
            .results[0]
            .pulp_href
            .clone();

        let task = pulp
            .copy_content(&CopyRequest {
                config: vec![rpmslim_api::CopyConfig {
                    source_repo_version: seeded.version,
                    dest_repo: dest.pulp_href.clone(),
                    content: Some(vec![bash]),
                }],
                dependency_solving: true,
            })
            .unwrap()
            .task;
        let task = pulp.read_task(&task).unwrap();
        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(
            pulp.version_package_names(&task.created_resources[0]),
            ["bash", "glibc", "tzdata"]
        );
    }
}

//! Resource types exchanged with the Pulp service.
//!
//! Field names follow the Pulp 3 JSON representation so the same types
//! serve the HTTP transport and the in-memory fake.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key/value labels attached to a resource (`pulp_labels`).
pub type Labels = BTreeMap<String, String>;

/// Opaque locator of a resource that lives in the remote service.
///
/// Hrefs are only ever handed back to further API calls; they are never
/// parsed locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Href(String);

impl Href {
    /// Wraps a raw href.
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    /// Returns the raw href.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Href {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Href {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An RPM repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Resource href.
    pub pulp_href: Href,
    /// Unique repository name.
    pub name: String,
    /// Href of the newest repository version, if any.
    #[serde(default)]
    pub latest_version_href: Option<Href>,
    /// Labels.
    #[serde(default)]
    pub pulp_labels: Labels,
}

/// Body of a repository create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepository {
    /// Repository name.
    pub name: String,
    /// Labels.
    pub pulp_labels: Labels,
}

/// An upstream sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    /// Resource href.
    pub pulp_href: Href,
    /// Unique remote name.
    pub name: String,
    /// Upstream URL.
    pub url: String,
    /// Download policy.
    #[serde(default)]
    pub policy: Option<String>,
}

/// Body of a remote create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRemote {
    /// Remote name.
    pub name: String,
    /// Upstream URL.
    pub url: String,
    /// Download policy (`on_demand`, `immediate`, `streamed`).
    pub policy: String,
    /// Whether the upstream TLS certificate is verified.
    pub tls_validation: bool,
    /// Labels.
    #[serde(default)]
    pub pulp_labels: Labels,
}

/// Body of a repository sync call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Remote to sync from.
    pub remote: Href,
    /// Mirror mode: the new version is an exact copy of upstream.
    pub mirror: bool,
}

/// An immutable snapshot of a repository's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryVersion {
    /// Resource href.
    pub pulp_href: Href,
    /// Version number within its repository.
    pub number: u64,
    /// Owning repository.
    #[serde(default)]
    pub repository: Option<Href>,
}

/// Servable metadata built from one repository version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Resource href.
    pub pulp_href: Href,
    /// Published repository version.
    #[serde(default)]
    pub repository_version: Option<Href>,
    /// Repository the version belongs to.
    #[serde(default)]
    pub repository: Option<Href>,
}

/// Body of a publication create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPublication {
    /// Repository version to publish.
    pub repository_version: Href,
    /// Checksum type used for repodata.
    pub metadata_checksum_type: String,
}

impl NewPublication {
    /// Creates a sha256 publication request for a version.
    pub fn sha256(repository_version: Href) -> Self {
        Self {
            repository_version,
            metadata_checksum_type: "sha256".into(),
        }
    }
}

/// A named, stable endpoint serving one publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    /// Resource href.
    pub pulp_href: Href,
    /// Unique distribution name.
    pub name: String,
    /// Path under the content app.
    pub base_path: String,
    /// Fully qualified URL clients fetch from.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Publication currently served.
    #[serde(default)]
    pub publication: Option<Href>,
}

/// Body of a distribution create or update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDistribution {
    /// Distribution name.
    pub name: String,
    /// Path under the content app.
    pub base_path: String,
    /// Publication to serve.
    pub publication: Href,
}

impl NewDistribution {
    /// Creates a distribution request whose base path equals its name.
    pub fn named(name: impl Into<String>, publication: Href) -> Self {
        let name = name.into();
        Self {
            base_path: name.clone(),
            name,
            publication,
        }
    }
}

/// An RPM package content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Resource href.
    pub pulp_href: Href,
    /// Package name.
    pub name: String,
    /// Version string.
    #[serde(default)]
    pub version: String,
    /// Release string.
    #[serde(default)]
    pub release: String,
    /// Architecture.
    #[serde(default)]
    pub arch: String,
}

/// One page request against the package listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    /// Repository version whose content is listed.
    pub repository_version: Href,
    /// Exact package names to match (`name__in`).
    pub names: Vec<String>,
    /// Page size.
    pub limit: u32,
    /// Number of results to skip.
    pub offset: u32,
}

/// A page of list results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of matches across all pages.
    pub count: u64,
    /// URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page, if any.
    #[serde(default)]
    pub previous: Option<String>,
    /// Results on this page.
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Returns true if more pages follow this one.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// One source/destination pair of a copy request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Version content is copied from.
    pub source_repo_version: Href,
    /// Repository receiving the content.
    pub dest_repo: Href,
    /// Explicit content units; `None` copies the whole version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Href>>,
}

/// Body of a batched copy call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRequest {
    /// Per-repository copy entries.
    pub config: Vec<CopyConfig>,
    /// Let the service pull in dependencies of the requested units.
    pub dependency_solving: bool,
}

/// Reference to the task spawned by an asynchronous call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    /// Task href.
    pub task: Href,
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Queued, not yet picked up by a worker.
    Waiting,
    /// Executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Canceled,
    /// Cancellation requested, not yet effective.
    Canceling,
    /// Not executed.
    Skipped,
}

impl TaskState {
    /// Returns true once the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Skipped
        )
    }

    /// Returns true if the task finished without error.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Completed)
    }

    /// Lowercase name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "waiting",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Canceling => "canceling",
            TaskState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task record as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task href.
    pub pulp_href: Href,
    /// Task name (the worker function).
    pub name: String,
    /// Current state.
    pub state: TaskState,
    /// Resources the task created.
    #[serde(default)]
    pub created_resources: Vec<Href>,
    /// Error details for failed tasks.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl Task {
    /// Extracts a human-readable error description, if the task carries one.
    pub fn error_description(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        match error.get("description").and_then(|d| d.as_str()) {
            Some(description) => Some(description.to_string()),
            None => Some(error.to_string()),
        }
    }
}

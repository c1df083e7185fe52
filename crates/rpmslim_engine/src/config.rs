//! Configuration for the engine.

use rpmslim_api::Labels;
use std::path::PathBuf;
use std::time::Duration;

/// Label key identifying the build session that created a resource.
pub const SESSION_LABEL_KEY: &str = "simpbuildsession";

/// Label key identifying what a repository is for.
pub const ROLE_LABEL_KEY: &str = "reporole";

/// Configuration for task polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status reads of the same task.
    pub interval: Duration,
    /// Upper bound on a single wait; `None` waits forever.
    pub deadline: Option<Duration>,
}

impl PollConfig {
    /// Creates a polling configuration with the given interval and no deadline.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Sets the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets a deadline for every wait.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// What a repository created by the engine is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoRole {
    /// Full mirror of an upstream repository.
    RemoteMirror,
    /// Filtered copy of a mirror.
    SlimRepo,
}

impl RepoRole {
    /// Label value for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoRole::RemoteMirror => "remote_mirror",
            RepoRole::SlimRepo => "slim_repo",
        }
    }
}

/// Configuration for a run of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Build session identifier; replaces `name_prefix` in slim names.
    pub build_name: String,
    /// Value of the session label put on created repositories.
    pub session_label: String,
    /// Prefix of upstream mirror names that slim names replace.
    pub name_prefix: String,
    /// Page size used when listing repository content.
    pub content_page_size: u32,
    /// Abort the whole run on the first failing repository.
    pub fail_fast: bool,
    /// Where the use-existing workflow writes its output.
    pub output_path: Option<PathBuf>,
    /// Download policy of created remotes.
    pub remote_policy: String,
    /// Whether created remotes verify upstream TLS certificates.
    pub tls_validation: bool,
    /// Task polling.
    pub poll: PollConfig,
}

impl EngineConfig {
    /// Creates a configuration for a build session, labelled with today's date.
    pub fn new(build_name: impl Into<String>) -> Self {
        let build_name = build_name.into();
        let session_label = format!("{}-{}", build_name, chrono::Local::now().format("%F"));
        Self {
            build_name,
            session_label,
            name_prefix: "pulp".into(),
            content_page_size: 100,
            fail_fast: false,
            output_path: None,
            remote_policy: "on_demand".into(),
            tls_validation: false,
            poll: PollConfig::default(),
        }
    }

    /// Overrides the session label.
    pub fn with_session_label(mut self, label: impl Into<String>) -> Self {
        self.session_label = label.into();
        self
    }

    /// Sets the mirror name prefix replaced in slim names.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Sets the content listing page size.
    pub fn with_content_page_size(mut self, size: u32) -> Self {
        self.content_page_size = size.max(1);
        self
    }

    /// Enables or disables whole-run abort on the first failure.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Sets the output file of the use-existing workflow.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the polling configuration.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Labels for a repository playing `role` in this session.
    pub fn labels(&self, role: RepoRole) -> Labels {
        let mut labels = Labels::new();
        labels.insert(SESSION_LABEL_KEY.into(), self.session_label.clone());
        labels.insert(ROLE_LABEL_KEY.into(), role.as_str().into());
        labels
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("testbuild")
    }
}

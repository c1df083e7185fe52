//! Batched, dependency-solving content copy.
//!
//! Package names are resolved to content hrefs by listing the source
//! version page by page; every requested name must be found. All entries
//! of a batch go out as a single copy request, so the batch either lands
//! as a whole or not at all.

use crate::error::{remote_err, EngineError, EngineResult};
use crate::waiter::TaskWaiter;
use rpmslim_api::{CopyConfig, CopyRequest, Href, PackageQuery, PulpApi, Task};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// One repository's share of a copy batch, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyEntry {
    /// Declared name of the source mirror, for error reporting.
    pub repository: String,
    /// Version content is copied from.
    pub source_version: Href,
    /// Repository receiving the content.
    pub dest_repo: Href,
    /// Exact package names to copy; empty copies the whole version.
    pub names: Vec<String>,
}

/// A resolved copy batch ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    /// Per-repository copy entries.
    pub config: Vec<CopyConfig>,
}

impl CopySpec {
    /// The request body, with dependency solving enabled.
    pub fn to_request(&self) -> CopyRequest {
        CopyRequest {
            config: self.config.clone(),
            dependency_solving: true,
        }
    }
}

/// Plans and executes content copies.
pub struct ContentCopyPlanner<'a, A: ?Sized> {
    api: &'a A,
    waiter: TaskWaiter<'a, A>,
    page_size: u32,
}

impl<'a, A: PulpApi + ?Sized> ContentCopyPlanner<'a, A> {
    /// Creates a planner listing content `page_size` packages at a time.
    pub fn new(api: &'a A, waiter: TaskWaiter<'a, A>, page_size: u32) -> Self {
        Self {
            api,
            waiter,
            page_size: page_size.max(1),
        }
    }

    /// Resolves package names to content hrefs in `version`.
    ///
    /// Returns `None` when `names` is empty, meaning the whole version. A
    /// name with no matching package fails with
    /// [`EngineError::MissingContent`].
    pub fn resolve_content(
        &self,
        repository: &str,
        version: &Href,
        names: &[String],
    ) -> EngineResult<Option<Vec<Href>>> {
        if names.is_empty() {
            return Ok(None);
        }
        let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();

        let mut query = PackageQuery {
            repository_version: version.clone(),
            names: wanted.iter().map(|n| n.to_string()).collect(),
            limit: self.page_size,
            offset: 0,
        };
        let mut found = BTreeSet::new();
        let mut content = Vec::new();
        loop {
            let page = self
                .api
                .list_packages(&query)
                .map_err(remote_err("list_packages", version))?;
            debug!(
                version = %version,
                offset = query.offset,
                count = page.count,
                received = page.results.len(),
                "listed packages"
            );
            let received = page.results.len() as u32;
            let more = page.has_more();
            for package in page.results {
                found.insert(package.name);
                content.push(package.pulp_href);
            }
            if !more || received == 0 {
                break;
            }
            query.offset += received;
        }

        let missing: Vec<String> = wanted
            .into_iter()
            .filter(|name| !found.contains(*name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::MissingContent {
                repository: repository.to_string(),
                version: version.clone(),
                missing,
            });
        }
        Ok(Some(content))
    }

    /// Resolves every entry into a single copy batch.
    pub fn plan(&self, entries: &[CopyEntry]) -> EngineResult<CopySpec> {
        let config = entries
            .iter()
            .map(|entry| self.plan_entry(entry))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(CopySpec { config })
    }

    /// Resolves a single entry.
    pub fn plan_entry(&self, entry: &CopyEntry) -> EngineResult<CopyConfig> {
        let content = self.resolve_content(&entry.repository, &entry.source_version, &entry.names)?;
        info!(
            repository = %entry.repository,
            dest = %entry.dest_repo,
            units = content.as_ref().map_or(0, Vec::len),
            "planned copy"
        );
        Ok(CopyConfig {
            source_repo_version: entry.source_version.clone(),
            dest_repo: entry.dest_repo.clone(),
            content,
        })
    }

    /// Submits the batch as one copy task and waits for it to complete.
    pub fn execute(&self, spec: &CopySpec) -> EngineResult<Task> {
        info!(entries = spec.config.len(), "submitting dependency-solving copy");
        let task = self
            .api
            .copy_content(&spec.to_request())
            .map_err(remote_err("copy_content", "batch"))?;
        self.waiter.wait_completed(&task.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::waiter::CancelToken;
    use crate::warnings::WarningLog;
    use rpmslim_api::TaskState;
    use rpmslim_testkit::{FakePulp, PackageSpec};
    use std::time::Duration;

    struct Fixture {
        pulp: FakePulp,
        poll: PollConfig,
        cancel: CancelToken,
        warnings: WarningLog,
    }

    impl Fixture {
        fn new(pulp: FakePulp) -> Self {
            Self {
                pulp,
                poll: PollConfig::new(Duration::ZERO),
                cancel: CancelToken::new(),
                warnings: WarningLog::new(),
            }
        }

        fn planner(&self, page_size: u32) -> ContentCopyPlanner<'_, FakePulp> {
            let waiter = TaskWaiter::new(&self.pulp, &self.poll, &self.cancel, &self.warnings);
            ContentCopyPlanner::new(&self.pulp, waiter, page_size)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolution_follows_every_page() {
        let fx = Fixture::new(FakePulp::new().with_page_size_cap(2));
        let packages: Vec<PackageSpec> = ["a", "b", "c", "d", "e"].map(PackageSpec::new).to_vec();
        let seeded = fx.pulp.seed_mirror("m", "https://up/m", &packages);

        let content = fx
            .planner(100)
            .resolve_content("m", &seeded.version, &names(&["a", "c", "e"]))
            .unwrap()
            .unwrap();

        assert_eq!(content.len(), 3);
        assert_eq!(fx.pulp.call_count("list_packages"), 2);
    }

    #[test]
    fn missing_names_are_reported() {
        let fx = Fixture::new(FakePulp::new());
        let seeded = fx.pulp.seed_mirror("m", "https://up/m", &["bash".into()]);

        let err = fx
            .planner(10)
            .resolve_content("m", &seeded.version, &names(&["bash", "zsh", "fish"]))
            .unwrap_err();

        match err {
            EngineError::MissingContent { missing, repository, .. } => {
                assert_eq!(repository, "m");
                assert_eq!(missing, ["fish", "zsh"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_filter_copies_whole_version() {
        let fx = Fixture::new(FakePulp::new());
        let seeded = fx.pulp.seed_mirror("m", "https://up/m", &["bash".into()]);

        let content = fx.planner(10).resolve_content("m", &seeded.version, &[]).unwrap();
        assert!(content.is_none());
        assert_eq!(fx.pulp.call_count("list_packages"), 0);
    }

    #[test]
    fn batch_is_one_copy_call() {
        let fx = Fixture::new(FakePulp::new());
        let a = fx.pulp.seed_mirror(
            "a",
            "https://up/a",
            &[PackageSpec::new("bash").requires(["glibc"]), "glibc".into(), "vim".into()],
        );
        let b = fx.pulp.seed_mirror("b", "https://up/b", &["httpd".into(), "nginx".into()]);
        let slim_a = fx.pulp.seed_repository("slim-a");
        let slim_b = fx.pulp.seed_repository("slim-b");

        let planner = fx.planner(10);
        let spec = planner
            .plan(&[
                CopyEntry {
                    repository: "a".into(),
                    source_version: a.version,
                    dest_repo: slim_a.pulp_href.clone(),
                    names: names(&["bash"]),
                },
                CopyEntry {
                    repository: "b".into(),
                    source_version: b.version,
                    dest_repo: slim_b.pulp_href.clone(),
                    names: Vec::new(),
                },
            ])
            .unwrap();
        assert!(spec.to_request().dependency_solving);

        let task = planner.execute(&spec).unwrap();

        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(fx.pulp.call_count("copy_content"), 1);
        let a_version = fx.pulp.repository("slim-a").unwrap().latest_version_href.unwrap();
        let b_version = fx.pulp.repository("slim-b").unwrap().latest_version_href.unwrap();
        assert_eq!(fx.pulp.version_package_names(&a_version), ["bash", "glibc"]);
        assert_eq!(fx.pulp.version_package_names(&b_version), ["httpd", "nginx"]);
    }

    #[test]
    fn failed_copy_task_is_an_error() {
        let fx = Fixture::new(FakePulp::new());
        let a = fx.pulp.seed_mirror("a", "https://up/a", &["bash".into()]);
        let slim = fx.pulp.seed_repository("slim");
        fx.pulp.fail_task("copy_content", "dependency solving failed");

        let planner = fx.planner(10);
        let spec = planner
            .plan(&[CopyEntry {
                repository: "a".into(),
                source_version: a.version,
                dest_repo: slim.pulp_href,
                names: names(&["bash"]),
            }])
            .unwrap();
        let err = planner.execute(&spec).unwrap_err();

        assert!(err.to_string().contains("dependency solving failed"));
        assert_eq!(err.exit_code(), 6);
    }
}

//! The use-existing workflow: slim copies of already published mirrors.
//!
//! Four phases:
//! 1. per mirror, follow distribution → publication → repository version,
//!    ensure the slim repository and resolve the package filter
//! 2. copy everything prepared in one dependency-solving batch
//! 3. per slim repository, publish its new version and distribute it
//! 4. write the run output
//!
//! Phases 1 and 3 isolate failures per repository; the batched copy in
//! phase 2 is all-or-nothing and stops the run.

use crate::config::{EngineConfig, RepoRole};
use crate::copy::{ContentCopyPlanner, CopySpec};
use crate::declared::{slim_name, DeclaredMirrors, RepoSpec};
use crate::error::{remote_err, EngineError, EngineResult};
use crate::output::{OutputEntry, RunOutput};
use crate::reconciler::Reconciler;
use crate::report::RunReport;
use crate::waiter::TaskWaiter;
use crate::warnings::WarningLog;
use rpmslim_api::{CopyConfig, Href, PulpApi};
use std::collections::BTreeSet;
use tracing::info;

/// State of one slim repository across the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlimRepoRecord {
    /// Slim repository name.
    pub name: String,
    /// Declared mirror it is derived from.
    pub source_repo_name: String,
    /// Published version of the mirror the content came from.
    pub source_version: Href,
    /// Slim repository href.
    pub repository: Href,
    /// Slim repository version after the copy.
    pub version: Option<Href>,
    /// Publication of that version.
    pub publication: Option<Href>,
    /// Distribution serving the publication.
    pub distribution: Option<Href>,
    /// URL the distribution is served at.
    pub distro_url: Option<String>,
}

impl SlimRepoRecord {
    fn output_entry(&self) -> Option<OutputEntry> {
        Some(OutputEntry {
            pulp_href: self.repository.clone(),
            source_repo_name: self.source_repo_name.clone(),
            distro_href: self.distribution.clone()?,
            distro_url: self.distro_url.clone()?,
        })
    }
}

/// Result of a use-existing run.
#[derive(Debug, Default)]
pub struct SlimRun {
    /// Slim repositories that were fully published.
    pub records: Vec<SlimRepoRecord>,
    /// What was (or would be) written to the output file.
    pub output: RunOutput,
    /// Per-repository outcome.
    pub report: RunReport,
}

impl SlimRun {
    /// Distribution URLs, one per slim repository.
    pub fn summary_lines(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.distro_url.clone())
            .collect()
    }
}

/// Builds slim repositories from published mirrors.
pub struct SlimRepoPipeline<'a, A: ?Sized> {
    api: &'a A,
    reconciler: Reconciler<'a, A>,
    planner: ContentCopyPlanner<'a, A>,
    config: &'a EngineConfig,
}

impl<'a, A: PulpApi + ?Sized> SlimRepoPipeline<'a, A> {
    /// Creates a pipeline.
    pub fn new(
        api: &'a A,
        waiter: TaskWaiter<'a, A>,
        warnings: &'a WarningLog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            api,
            reconciler: Reconciler::new(api, waiter, warnings, config),
            planner: ContentCopyPlanner::new(api, waiter, config.content_page_size),
            config,
        }
    }

    /// Runs all four phases over the declared mirrors.
    pub fn run(&self, mirrors: &DeclaredMirrors) -> EngineResult<SlimRun> {
        let mut report = RunReport::new();

        let mut prepared = Vec::with_capacity(mirrors.len());
        let mut claimed = BTreeSet::new();
        for spec in mirrors.repos() {
            let name = self.slim_name_for(spec);
            let result = if claimed.insert(name.clone()) {
                self.prepare(spec)
            } else {
                Err(EngineError::Config(format!(
                    "'{}' maps to slim repository '{name}', already claimed by another mirror",
                    spec.name
                )))
            };
            if let Some(entry) = report.absorb(&spec.name, result, self.config.fail_fast)? {
                prepared.push(entry);
            }
        }

        let (records, config): (Vec<SlimRepoRecord>, Vec<CopyConfig>) =
            prepared.into_iter().unzip();
        if !config.is_empty() {
            self.planner.execute(&CopySpec { config })?;
        }

        let mut run = SlimRun::default();
        for record in records {
            let source = record.source_repo_name.clone();
            let result = self.finish(record);
            if let Some(record) = report.absorb(&source, result, self.config.fail_fast)? {
                if let Some(entry) = record.output_entry() {
                    run.output.insert(record.name.clone(), entry);
                }
                report.succeed(source);
                run.records.push(record);
            }
        }
        run.report = report;

        if let Some(path) = &self.config.output_path {
            info!(path = %path.display(), entries = run.output.len(), "writing slim repos");
            run.output.save(path)?;
        }
        Ok(run)
    }

    /// Phase 1 for one mirror: package filter resolved, slim repository
    /// ensured, copy planned.
    ///
    /// Names are resolved before anything is created, so a missing package
    /// leaves no slim repository behind.
    pub fn prepare(&self, spec: &RepoSpec) -> EngineResult<(SlimRepoRecord, CopyConfig)> {
        let source_version = self.resolve_published_version(&spec.name)?;
        let name = self.slim_name_for(spec);
        info!(mirror = %spec.name, slim = %name, version = %source_version, "preparing slim repository");

        let content = self
            .planner
            .resolve_content(&spec.name, &source_version, &spec.rpms)?;
        let labels = self.config.labels(RepoRole::SlimRepo);
        let repository = self.reconciler.ensure_repository(&name, &labels)?;
        let copy = CopyConfig {
            source_repo_version: source_version.clone(),
            dest_repo: repository.pulp_href.clone(),
            content,
        };

        let record = SlimRepoRecord {
            name,
            source_repo_name: spec.name.clone(),
            source_version,
            repository: repository.pulp_href,
            version: None,
            publication: None,
            distribution: None,
            distro_url: None,
        };
        Ok((record, copy))
    }

    fn slim_name_for(&self, spec: &RepoSpec) -> String {
        slim_name(&spec.name, &self.config.name_prefix, &self.config.build_name)
    }

    /// Follows distribution → publication → repository version for `name`.
    pub fn resolve_published_version(&self, name: &str) -> EngineResult<Href> {
        let distribution = self
            .api
            .list_distributions(name)
            .map_err(remote_err("list_distributions", name))?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::DistributionNotFound {
                name: name.to_string(),
            })?;
        let publication_href =
            distribution
                .publication
                .ok_or_else(|| EngineError::PublicationNotFound {
                    distribution: name.to_string(),
                })?;
        let publication = self
            .api
            .read_publication(&publication_href)
            .map_err(remote_err("read_publication", &publication_href))?;
        let version_missing = || EngineError::NotFound {
            kind: "repository version",
            name: name.to_string(),
        };
        let version_href = publication.repository_version.ok_or_else(version_missing)?;
        let version = self
            .api
            .read_repository_version(&version_href)
            .map_err(|err| {
                if err.is_not_found() {
                    version_missing()
                } else {
                    EngineError::remote("read_repository_version", version_href.as_str(), err)
                }
            })?;
        Ok(version.pulp_href)
    }

    /// Phase 3 for one slim repository: latest version published and distributed.
    pub fn finish(&self, mut record: SlimRepoRecord) -> EngineResult<SlimRepoRecord> {
        let version = self
            .api
            .read_repository(&record.repository)
            .map_err(remote_err("read_repository", &record.name))?
            .latest_version_href
            .ok_or_else(|| EngineError::NotFound {
                kind: "repository version",
                name: record.name.clone(),
            })?;
        let publication = self.reconciler.ensure_publication(&version)?;
        let distribution = self
            .reconciler
            .ensure_distribution(&record.name, &publication.pulp_href)?;
        let url = distribution
            .base_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| EngineError::NotFound {
                kind: "distribution url",
                name: record.name.clone(),
            })?;

        info!(repo = %record.name, url = %url, "slim repository distributed");
        record.version = Some(version);
        record.publication = Some(publication.pulp_href);
        record.distribution = Some(distribution.pulp_href);
        record.distro_url = Some(url);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollConfig;
    use crate::waiter::CancelToken;
    use rpmslim_api::ApiError;
    use rpmslim_testkit::FakePulp;
    use std::time::Duration;

    struct Fixture {
        pulp: FakePulp,
        config: EngineConfig,
        cancel: CancelToken,
        warnings: WarningLog,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                pulp: FakePulp::new(),
                config: EngineConfig::new("build").with_poll(PollConfig::new(Duration::ZERO)),
                cancel: CancelToken::new(),
                warnings: WarningLog::new(),
            }
        }

        fn pipeline(&self) -> SlimRepoPipeline<'_, FakePulp> {
            let waiter = TaskWaiter::new(&self.pulp, &self.config.poll, &self.cancel, &self.warnings);
            SlimRepoPipeline::new(&self.pulp, waiter, &self.warnings, &self.config)
        }
    }

    #[test]
    fn missing_distribution_and_missing_publication_differ() {
        let fx = Fixture::new();
        fx.pulp.seed_distribution("pulp-bare", None);

        let err = fx.pipeline().resolve_published_version("pulp-ghost").unwrap_err();
        assert!(matches!(err, EngineError::DistributionNotFound { .. }));

        let err = fx.pipeline().resolve_published_version("pulp-bare").unwrap_err();
        assert!(matches!(err, EngineError::PublicationNotFound { .. }));
    }

    #[test]
    fn published_version_is_followed_through_three_lookups() {
        let fx = Fixture::new();
        let seeded = fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);

        let version = fx.pipeline().resolve_published_version("pulp-os").unwrap();

        assert_eq!(version, seeded.version);
        assert_eq!(fx.pulp.call_count("list_distributions"), 1);
        assert_eq!(fx.pulp.call_count("read_publication"), 1);
        assert_eq!(fx.pulp.call_count("read_repository_version"), 1);
    }

    #[test]
    fn dangling_published_version_is_not_found() {
        let fx = Fixture::new();
        let seeded = fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);
        // Versions go with their repository; the publication stays behind.
        fx.pulp.delete_repository(&seeded.repository).unwrap();

        let err = fx.pipeline().resolve_published_version("pulp-os").unwrap_err();

        assert!(matches!(err, EngineError::NotFound { kind: "repository version", .. }));
        assert_eq!(err.exit_code(), 3);
        let err = fx.pipeline().prepare(&RepoSpec {
            name: "pulp-os".into(),
            url: "https://up/os".into(),
            rpms: vec!["bash".into()],
        });
        assert!(err.is_err());
        assert_eq!(fx.pulp.call_count("list_packages"), 0);
        assert!(fx.pulp.repository("build-os").is_none());
    }

    #[test]
    fn version_lookup_errors_other_than_404_are_remote() {
        let fx = Fixture::new();
        fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);
        fx.pulp.fail_next("read_repository_version", ApiError::http(503, "busy"));

        let err = fx.pipeline().resolve_published_version("pulp-os").unwrap_err();

        assert!(matches!(err, EngineError::Remote { call: "read_repository_version", .. }));
    }

    #[test]
    fn missing_package_leaves_no_slim_repository() {
        let fx = Fixture::new();
        fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);

        let err = fx
            .pipeline()
            .prepare(&RepoSpec {
                name: "pulp-os".into(),
                url: "https://up/os".into(),
                rpms: vec!["zsh".into()],
            })
            .unwrap_err();

        assert!(matches!(err, EngineError::MissingContent { .. }));
        assert!(fx.pulp.repository("build-os").is_none());
        assert_eq!(fx.pulp.call_count("create_repository"), 0);
    }

    #[test]
    fn colliding_slim_names_fail_the_later_mirror() {
        let fx = Fixture::new();
        fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);
        let mirrors = DeclaredMirrors::from_yaml_str(
            "\
pulp-os:
  url: https://up/os
build-os:
  url: https://up/os2
",
        )
        .unwrap();

        let run = fx.pipeline().run(&mirrors).unwrap();

        assert_eq!(run.report.succeeded, ["pulp-os"]);
        assert_eq!(run.report.failed.len(), 1);
        assert_eq!(run.report.failed[0].repository, "build-os");
        assert!(matches!(run.report.failed[0].error, EngineError::Config(_)));
        assert_eq!(run.report.exit_code(), 2);
        assert_eq!(run.output.len(), 1);
        assert_eq!(run.output.get("build-os").unwrap().source_repo_name, "pulp-os");
        // The colliding mirror is rejected before any lookup.
        assert_eq!(fx.pulp.call_count("read_repository_version"), 1);
    }

    #[test]
    fn one_failing_mirror_does_not_stop_the_others() {
        let fx = Fixture::new();
        fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);
        let mirrors = DeclaredMirrors::from_yaml_str(
            "\
pulp-ghost:
  url: https://up/ghost
pulp-os:
  url: https://up/os
  rpms: [bash]
",
        )
        .unwrap();

        let run = fx.pipeline().run(&mirrors).unwrap();

        assert_eq!(run.report.succeeded, ["pulp-os"]);
        assert_eq!(run.report.failed.len(), 1);
        assert_eq!(run.report.failed[0].repository, "pulp-ghost");
        assert_eq!(run.summary_lines().len(), 1);
        assert!(run.output.get("build-os").is_some());
    }

    #[test]
    fn failing_copy_aborts_the_run() {
        let fx = Fixture::new();
        fx.pulp.seed_mirror("pulp-os", "https://up/os", &["bash".into()]);
        fx.pulp.fail_next("copy_content", ApiError::http(500, "copy broke"));
        let mirrors = DeclaredMirrors::from_yaml_str("pulp-os:\n  url: https://up/os\n").unwrap();

        let err = fx.pipeline().run(&mirrors).unwrap_err();

        assert!(matches!(err, EngineError::Remote { call: "copy_content", .. }));
        assert_eq!(fx.pulp.call_count("create_publication"), 0);
    }

    #[test]
    fn nothing_prepared_means_no_copy() {
        let fx = Fixture::new();
        let mirrors = DeclaredMirrors::from_yaml_str("pulp-ghost:\n  url: https://up/ghost\n").unwrap();

        let run = fx.pipeline().run(&mirrors).unwrap();

        assert!(run.records.is_empty());
        assert_eq!(run.report.exit_code(), 3);
        assert_eq!(fx.pulp.call_count("copy_content"), 0);
    }
}

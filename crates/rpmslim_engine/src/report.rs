//! Per-repository outcome of a run.

use crate::error::{EngineError, EngineResult};
use tracing::error;

/// A declared repository whose pipeline stopped with an error.
#[derive(Debug)]
pub struct RepoFailure {
    /// Declared repository name.
    pub repository: String,
    /// What stopped it.
    pub error: EngineError,
}

/// Which declared repositories made it through a run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Names processed to completion, in declaration order.
    pub succeeded: Vec<String>,
    /// Names that failed, in declaration order.
    pub failed: Vec<RepoFailure>,
}

impl RunReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed repository.
    pub fn succeed(&mut self, repository: impl Into<String>) {
        self.succeeded.push(repository.into());
    }

    /// Records a failed repository.
    pub fn fail(&mut self, repository: impl Into<String>, error: EngineError) {
        self.failed.push(RepoFailure {
            repository: repository.into(),
            error,
        });
    }

    /// Folds one repository's result into the report.
    ///
    /// An error is recorded and swallowed so the run can go on with the
    /// next repository, unless `fail_fast` is set or the run was
    /// cancelled, in which case it is returned.
    pub fn absorb<T>(
        &mut self,
        repository: &str,
        result: EngineResult<T>,
        fail_fast: bool,
    ) -> EngineResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if fail_fast || matches!(err, EngineError::Cancelled) => Err(err),
            Err(err) => {
                error!(repository, error = %err, "repository failed");
                self.fail(repository, err);
                Ok(None)
            }
        }
    }

    /// Returns true if no repository failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Exit code of the first failure, 0 if none.
    pub fn exit_code(&self) -> i32 {
        self.failed.first().map_or(0, |f| f.error.exit_code())
    }
}

//! Error types for the engine.

use rpmslim_api::{ApiError, Href, TaskState};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that stop a pipeline stage.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid input or configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No distribution carries this name.
    #[error("could not find distribution '{name}'")]
    DistributionNotFound {
        /// Distribution name.
        name: String,
    },

    /// The distribution exists but serves nothing.
    #[error("no publication found for distribution '{distribution}'")]
    PublicationNotFound {
        /// Distribution name.
        distribution: String,
    },

    /// A resource a later stage depends on is absent.
    #[error("{kind} not found for '{name}'")]
    NotFound {
        /// Resource kind.
        kind: &'static str,
        /// Name or href the lookup was for.
        name: String,
    },

    /// Requested package names are absent from the source version.
    #[error("packages missing from '{repository}' ({version}): {}", .missing.join(", "))]
    MissingContent {
        /// Declared repository name.
        repository: String,
        /// Source repository version.
        version: Href,
        /// Names that matched no package.
        missing: Vec<String>,
    },

    /// A call against the remote service failed.
    #[error("{call} failed for '{resource}': {source}")]
    Remote {
        /// The API call.
        call: &'static str,
        /// Name or href of the resource concerned.
        resource: String,
        /// Underlying error.
        #[source]
        source: ApiError,
    },

    /// A task finished without completing.
    #[error("task '{name}' ({task}) ended {state}{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    TaskFailed {
        /// Task href.
        task: Href,
        /// Task name.
        name: String,
        /// Terminal state.
        state: TaskState,
        /// Error description reported by the service.
        detail: Option<String>,
    },

    /// A wait exceeded its deadline.
    #[error("task {task} did not finish within {waited:?}")]
    Timeout {
        /// Task href.
        task: Href,
        /// Time spent waiting.
        waited: Duration,
    },

    /// The run was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// The run output could not be read or written.
    #[error("output file {path:?}: {message}")]
    Output {
        /// File path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

impl EngineError {
    /// Wraps an API error with the call and resource it concerns.
    pub fn remote(call: &'static str, resource: impl Into<String>, source: ApiError) -> Self {
        Self::Remote {
            call,
            resource: resource.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config(_) => 2,
            EngineError::DistributionNotFound { .. }
            | EngineError::PublicationNotFound { .. }
            | EngineError::NotFound { .. } => 3,
            EngineError::MissingContent { .. } => 4,
            EngineError::Remote { .. } => 5,
            EngineError::TaskFailed { .. } => 6,
            EngineError::Timeout { .. } => 7,
            EngineError::Cancelled => 8,
            EngineError::Output { .. } => 9,
        }
    }
}

/// Builds a closure mapping an [`ApiError`] into [`EngineError::Remote`].
pub(crate) fn remote_err(
    call: &'static str,
    resource: impl std::fmt::Display,
) -> impl FnOnce(ApiError) -> EngineError {
    let resource = resource.to_string();
    move |source| EngineError::remote(call, resource, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let errors = [
            EngineError::Config("bad".into()),
            EngineError::DistributionNotFound { name: "d".into() },
            EngineError::MissingContent {
                repository: "r".into(),
                version: Href::new("/v/"),
                missing: vec!["x".into()],
            },
            EngineError::remote("list_repositories", "r", ApiError::http(500, "boom")),
            EngineError::TaskFailed {
                task: Href::new("/t/"),
                name: "sync".into(),
                state: TaskState::Failed,
                detail: None,
            },
            EngineError::Timeout {
                task: Href::new("/t/"),
                waited: Duration::from_secs(1),
            },
            EngineError::Cancelled,
            EngineError::Output {
                path: "out.yaml".into(),
                message: "denied".into(),
            },
        ];
        let mut codes: Vec<i32> = errors.iter().map(EngineError::exit_code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn not_found_variants_share_a_code() {
        let a = EngineError::DistributionNotFound { name: "d".into() };
        let b = EngineError::PublicationNotFound {
            distribution: "d".into(),
        };
        assert_eq!(a.exit_code(), b.exit_code());
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn error_display() {
        let err = EngineError::MissingContent {
            repository: "pulp-base-os".into(),
            version: Href::new("/v/1/"),
            missing: vec!["zsh".into(), "fish".into()],
        };
        assert!(err.to_string().contains("zsh, fish"));

        let err = EngineError::TaskFailed {
            task: Href::new("/t/1/"),
            name: "sync".into(),
            state: TaskState::Failed,
            detail: Some("upstream 404".into()),
        };
        assert_eq!(err.to_string(), "task 'sync' (/t/1/) ended failed: upstream 404");
    }
}

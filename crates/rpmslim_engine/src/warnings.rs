//! Non-fatal conditions observed during a run.

use parking_lot::Mutex;
use rpmslim_api::Href;
use std::fmt;
use tracing::warn;

/// A condition worth an operator's attention that does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineWarning {
    /// An ensure call found the resource already present and reused it.
    AlreadyExists {
        /// Resource kind.
        kind: &'static str,
        /// Name or href it was looked up by.
        name: String,
    },
    /// A create task finished without reporting any created resource.
    NoCreatedResources {
        /// Task href.
        task: Href,
        /// Minimum number expected.
        expected: usize,
    },
    /// A create task reported more resources than expected.
    TooManyCreatedResources {
        /// Task href.
        task: Href,
        /// Number reported.
        count: usize,
        /// Maximum number expected.
        max: usize,
    },
}

impl fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineWarning::AlreadyExists { kind, name } => {
                write!(f, "{kind} '{name}' already exists")
            }
            EngineWarning::NoCreatedResources { task, expected } => {
                write!(f, "task {task} created 0 resources (expected at least {expected})")
            }
            EngineWarning::TooManyCreatedResources { task, count, max } => {
                write!(f, "task {task} created {count} resources (expected at most {max})")
            }
        }
    }
}

/// Collects warnings while logging each one as it arrives.
#[derive(Debug, Default)]
pub struct WarningLog {
    entries: Mutex<Vec<EngineWarning>>,
}

impl WarningLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and records a warning.
    pub fn push(&self, warning: EngineWarning) {
        warn!("{warning}");
        self.entries.lock().push(warning);
    }

    /// Returns every warning recorded so far.
    pub fn snapshot(&self) -> Vec<EngineWarning> {
        self.entries.lock().clone()
    }

    /// Number of recorded warnings.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_recorded_in_order() {
        let log = WarningLog::new();
        assert!(log.is_empty());

        log.push(EngineWarning::AlreadyExists {
            kind: "repository",
            name: "el8".into(),
        });
        log.push(EngineWarning::NoCreatedResources {
            task: Href::new("/t/1/"),
            expected: 1,
        });

        let entries = log.snapshot();
        assert_eq!(log.len(), 2);
        assert!(matches!(entries[0], EngineWarning::AlreadyExists { .. }));
        assert_eq!(
            entries[1].to_string(),
            "task /t/1/ created 0 resources (expected at least 1)"
        );
    }
}

//! Durable output of the use-existing workflow.

use crate::error::{EngineError, EngineResult};
use rpmslim_api::Href;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One slim repository as recorded in the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEntry {
    /// Slim repository href.
    pub pulp_href: Href,
    /// Declared mirror it was copied from.
    pub source_repo_name: String,
    /// Distribution href.
    pub distro_href: Href,
    /// URL the distribution is served at.
    pub distro_url: String,
}

/// Slim repository name to output entry, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    entries: Vec<(String, OutputEntry)>,
}

impl RunOutput {
    /// Creates an empty output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `name`.
    pub fn insert(&mut self, name: impl Into<String>, entry: OutputEntry) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((name, entry)),
        }
    }

    /// Looks up the entry for `name`.
    pub fn get(&self, name: &str) -> Option<&OutputEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    /// Entries in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &OutputEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the output as a YAML mapping.
    pub fn to_yaml(&self) -> EngineResult<String> {
        let mut mapping = serde_yaml::Mapping::new();
        for (name, entry) in &self.entries {
            let value = serde_yaml::to_value(entry).map_err(|e| EngineError::Output {
                path: Default::default(),
                message: e.to_string(),
            })?;
            mapping.insert(serde_yaml::Value::String(name.clone()), value);
        }
        serde_yaml::to_string(&mapping).map_err(|e| EngineError::Output {
            path: Default::default(),
            message: e.to_string(),
        })
    }

    /// Parses a YAML mapping written by [`RunOutput::to_yaml`].
    pub fn from_yaml_str(text: &str) -> EngineResult<Self> {
        let parse_err = |message: String| EngineError::Output {
            path: Default::default(),
            message,
        };
        let mapping: serde_yaml::Mapping =
            serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
        let mut output = Self::new();
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| parse_err(format!("key {key:?} is not a string")))?
                .to_string();
            let entry: OutputEntry =
                serde_yaml::from_value(value).map_err(|e| parse_err(format!("'{name}': {e}")))?;
            output.insert(name, entry);
        }
        Ok(output)
    }

    /// Writes the output to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> EngineResult<()> {
        let yaml = self.to_yaml().map_err(|e| with_path(e, path))?;
        std::fs::write(path, yaml).map_err(|e| EngineError::Output {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reads an output file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::Output {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&text).map_err(|e| with_path(e, path))
    }
}

fn with_path(error: EngineError, path: &Path) -> EngineError {
    match error {
        EngineError::Output { message, .. } => EngineError::Output {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(n: u32) -> OutputEntry {
        OutputEntry {
            pulp_href: Href::new(format!("/pulp/api/v3/repositories/rpm/rpm/{n}/")),
            source_repo_name: format!("pulp-src-{n}"),
            distro_href: Href::new(format!("/pulp/api/v3/distributions/rpm/rpm/{n}/")),
            distro_url: format!("http://pulp.test/pulp/content/slim-{n}/"),
        }
    }

    #[test]
    fn save_and_load_reproduce_every_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("_slim_repos.yaml");

        let mut output = RunOutput::new();
        output.insert("build-zeta", entry(2));
        output.insert("build-alpha", entry(1));
        output.save(&path).unwrap();

        let loaded = RunOutput::load(&path).unwrap();
        assert_eq!(loaded, output);
        let names: Vec<&str> = loaded.entries().map(|(n, _)| n).collect();
        assert_eq!(names, ["build-zeta", "build-alpha"]);
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.yaml");
        std::fs::write(&path, "stale: true\n").unwrap();

        let mut output = RunOutput::new();
        output.insert("slim", entry(7));
        output.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("stale"));
        assert!(text.contains("distro_url: http://pulp.test/pulp/content/slim-7/"));
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut output = RunOutput::new();
        output.insert("slim", entry(1));
        output.insert("slim", entry(2));
        assert_eq!(output.len(), 1);
        assert_eq!(output.get("slim"), Some(&entry(2)));
    }

    #[test]
    fn unwritable_path_is_an_output_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("out.yaml");
        let err = RunOutput::new().save(&path).unwrap_err();
        assert_eq!(err.exit_code(), 9);
        assert!(matches!(err, EngineError::Output { path: p, .. } if p == path));
    }
}

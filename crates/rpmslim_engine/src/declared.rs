//! Declared mirrors: the repositories a run works on.

use crate::error::{EngineError, EngineResult};
use serde::Deserialize;
use std::path::Path;

/// One declared upstream mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Mirror name; the reconciliation key on the service.
    pub name: String,
    /// Upstream repository URL.
    pub url: String,
    /// Package names to keep in the slim copy; empty keeps everything.
    pub rpms: Vec<String>,
}

#[derive(Deserialize)]
struct RawEntry {
    url: String,
    #[serde(default)]
    rpms: Option<Vec<String>>,
}

/// Declared mirrors in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredMirrors {
    repos: Vec<RepoSpec>,
}

impl DeclaredMirrors {
    /// Wraps an explicit list.
    pub fn new(repos: Vec<RepoSpec>) -> Self {
        Self { repos }
    }

    /// Reads a YAML mapping of `name: {url, rpms}` from `path`.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Parses a YAML mapping of `name: {url, rpms}`.
    pub fn from_yaml_str(text: &str) -> EngineResult<Self> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(text)
            .map_err(|e| EngineError::Config(format!("invalid mirrors document: {e}")))?;

        let mut repos = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = key
                .as_str()
                .ok_or_else(|| EngineError::Config(format!("mirror name {key:?} is not a string")))?
                .to_string();
            let entry: RawEntry = serde_yaml::from_value(value)
                .map_err(|e| EngineError::Config(format!("mirror '{name}': {e}")))?;
            if entry.url.trim().is_empty() {
                return Err(EngineError::Config(format!("mirror '{name}' has an empty url")));
            }
            repos.push(RepoSpec {
                name,
                url: entry.url,
                rpms: entry.rpms.unwrap_or_default(),
            });
        }
        Ok(Self { repos })
    }

    /// Declared repositories in order.
    pub fn repos(&self) -> &[RepoSpec] {
        &self.repos
    }

    /// Number of declared repositories.
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// Returns true if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// Derives the slim repository name of a mirror.
///
/// A leading `prefix` ending at a word boundary is replaced with
/// `build_name`; any other name is returned unchanged.
pub fn slim_name(name: &str, prefix: &str, build_name: &str) -> String {
    if prefix.is_empty() {
        return name.to_string();
    }
    match name.strip_prefix(prefix) {
        Some(rest) if rest.chars().next().map_or(true, |c| !is_word_char(c)) => {
            format!("{build_name}{rest}")
        }
        _ => name.to_string(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn declaration_order_is_preserved() {
        let mirrors = DeclaredMirrors::from_yaml_str(
            "\
pulp-zeta:
  url: https://up/zeta
pulp-alpha:
  url: https://up/alpha
  rpms: [bash]
",
        )
        .unwrap();

        let names: Vec<&str> = mirrors.repos().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["pulp-zeta", "pulp-alpha"]);
        assert!(mirrors.repos()[0].rpms.is_empty());
        assert_eq!(mirrors.repos()[1].rpms, ["bash"]);
    }

    #[test]
    fn missing_url_is_a_config_error() {
        let err = DeclaredMirrors::from_yaml_str("pulp-x:\n  rpms: [a]\n").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("pulp-x"));
    }

    #[test]
    fn non_mapping_document_is_a_config_error() {
        assert!(DeclaredMirrors::from_yaml_str("- a\n- b\n").is_err());
        assert!(DeclaredMirrors::from_yaml_str("pulp-x: [").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DeclaredMirrors::load(Path::new("/nonexistent/repos.yaml")).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn slim_name_examples() {
        assert_eq!(slim_name("pulp-base-os", "pulp", "build-6.6"), "build-6.6-base-os");
        assert_eq!(slim_name("pulp", "pulp", "b"), "b");
        assert_eq!(slim_name("pulpit-os", "pulp", "b"), "pulpit-os");
        assert_eq!(slim_name("epel-8", "pulp", "b"), "epel-8");
        assert_eq!(slim_name("pulp-x", "", "b"), "pulp-x");
    }

    proptest! {
        #[test]
        fn names_without_prefix_are_unchanged(name in "[a-z][a-z0-9-]{0,20}") {
            prop_assume!(!name.starts_with("pulp"));
            prop_assert_eq!(slim_name(&name, "pulp", "build"), name);
        }

        #[test]
        fn prefixed_names_keep_their_suffix(suffix in "-[a-z0-9-]{0,20}") {
            let name = format!("pulp{suffix}");
            let slim = slim_name(&name, "pulp", "build");
            prop_assert_eq!(slim, format!("build{suffix}"));
        }
    }
}

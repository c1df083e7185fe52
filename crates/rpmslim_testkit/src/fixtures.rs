//! Test fixtures.
//!
//! Declared-mirror files on disk and a small upstream package graph that
//! exercises dependency solving.

use crate::fake::PackageSpec;
use std::path::PathBuf;
use tempfile::TempDir;

/// A declared-mirrors YAML file in a temporary directory.
pub struct MirrorsFile {
    /// Path of the YAML file.
    pub path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl MirrorsFile {
    /// Writes `yaml` to `repos_to_mirror.yaml` in a fresh temporary directory.
    pub fn new(yaml: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("repos_to_mirror.yaml");
        std::fs::write(&path, yaml).expect("Failed to write mirrors file");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Returns a path next to the mirrors file, for run output.
    pub fn sibling(&self, file_name: &str) -> PathBuf {
        self._temp_dir.path().join(file_name)
    }
}

/// A base OS package set: `bash` needs `glibc`, which needs `tzdata`.
pub fn base_os_packages() -> Vec<PackageSpec> {
    vec![
        PackageSpec::new("bash").requires(["glibc", "ncurses-libs"]),
        PackageSpec::new("glibc").requires(["tzdata"]),
        PackageSpec::new("ncurses-libs"),
        PackageSpec::new("tzdata"),
        PackageSpec::new("vim-enhanced").requires(["vim-common"]),
        PackageSpec::new("vim-common"),
        PackageSpec::new("httpd"),
    ]
}

/// A declared-mirrors document covering a single base OS repository.
pub const BASE_OS_MIRRORS: &str = "\
pulp-base-os:
  url: https://example/os
  rpms:
    - bash
    - glibc
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrors_file_is_written() {
        let file = MirrorsFile::new(BASE_OS_MIRRORS);
        let contents = std::fs::read_to_string(&file.path).unwrap();
        assert!(contents.starts_with("pulp-base-os:"));
        assert!(file.sibling("_slim_repos.yaml").starts_with(file.path.parent().unwrap()));
    }
}

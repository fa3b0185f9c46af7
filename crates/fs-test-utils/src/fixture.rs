//! [`FixtureDir`] builder for filesystem test scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Contents of `test.txt` in [`FixtureDir::with_defaults`].
pub const TEST_TXT: &str = "FILE CONTENTS!!!";

/// Contents of `test.json` in [`FixtureDir::with_defaults`].
pub const TEST_JSON: &str = "{\n  \"foo\": {\n    \"bar\": \"baz\"\n  }\n}\n";

/// Contents of `test.yaml` in [`FixtureDir::with_defaults`].
pub const TEST_YAML: &str = "foo:\n  bar: baz\n";

/// A temporary directory with helpers for laying out files.
///
/// # Example
///
/// ```rust,no_run
/// use fs_test_utils::FixtureDir;
///
/// let fixture = FixtureDir::new()
///     .write("src/a.txt", "a")
///     .mkdir("empty");
/// fixture.assert_exists("src/a.txt");
/// ```
pub struct FixtureDir {
    temp_dir: TempDir,
}

impl Default for FixtureDir {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureDir {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a directory holding `test.txt`, `test.json`, `test.yaml` and
    /// an empty `empty.txt`.
    pub fn with_defaults() -> Self {
        Self::new()
            .write("test.txt", TEST_TXT)
            .write("test.json", TEST_JSON)
            .write("test.yaml", TEST_YAML)
            .write("empty.txt", "")
    }

    /// Return the root path of the temporary directory.
    ///
    /// Canonicalized, so it compares equal to paths resolved through
    /// symlinked temp roots such as `/var` on macOS.
    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.temp_dir.path()).unwrap()
    }

    /// Absolute path of `rel` below the root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    ///
    /// # Panics
    /// Panics if the filesystem operations fail.
    pub fn write(self, rel: &str, content: impl AsRef<[u8]>) -> Self {
        let full_path = self.path(rel);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("write: failed to create {}: {e}", parent.display()));
        }
        fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("write: failed to write {}: {e}", full_path.display()));
        self
    }

    /// Create the directory `rel` and its parents.
    ///
    /// # Panics
    /// Panics if the directory cannot be created.
    pub fn mkdir(self, rel: &str) -> Self {
        let full_path = self.path(rel);
        fs::create_dir_all(&full_path)
            .unwrap_or_else(|e| panic!("mkdir: failed to create {}: {e}", full_path.display()));
        self
    }

    /// Read `rel` as UTF-8.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read(&self, rel: &str) -> String {
        let full_path = self.path(rel);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// Assert that `rel` exists.
    pub fn assert_exists(&self, rel: &str) {
        let full_path = self.path(rel);
        assert!(
            full_path.exists(),
            "Expected path to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `rel` does **not** exist.
    pub fn assert_not_exists(&self, rel: &str) {
        let full_path = self.path(rel);
        assert!(
            !Path::new(&full_path).exists(),
            "Expected path NOT to exist: {}",
            full_path.display()
        );
    }
}

//! Working-directory context
//!
//! Relative paths are resolved against an explicit [`FsContext`] instead of
//! the process-wide current directory, so independent callers (and tests)
//! can each carry their own working directory.

use std::path::Path;

use crate::{Error, NormalizedPath, Result};

/// The working directory used to resolve relative paths and to guard
/// deletions.
///
/// The stored directory is absolute and canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsContext {
    cwd: NormalizedPath,
}

impl FsContext {
    /// Create a context rooted at `cwd`, which must be an existing
    /// directory. A relative `cwd` is taken relative to the process
    /// working directory.
    pub fn new(cwd: impl AsRef<Path>) -> Result<Self> {
        let cwd = cwd.as_ref();
        let canonical = dunce::canonicalize(cwd).map_err(|e| Error::from_stat(cwd, e))?;
        if !canonical.is_dir() {
            return Err(Error::NotFound {
                path: canonical,
            });
        }
        Ok(Self {
            cwd: NormalizedPath::new(canonical),
        })
    }

    /// Create a context from the process working directory.
    pub fn from_process() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;
        Self::new(cwd)
    }

    /// The current working directory of this context.
    pub fn cwd(&self) -> &NormalizedPath {
        &self.cwd
    }

    /// Absolute path of the given fragments below the working directory.
    ///
    /// With no fragments this is the working directory itself.
    pub fn cwd_join<I, S>(&self, segments: I) -> NormalizedPath
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let relative = NormalizedPath::from_segments(segments);
        self.cwd.join(relative.as_str())
    }

    /// Change the working directory of this context.
    ///
    /// The fragments are joined and resolved against the current working
    /// directory. The process working directory is left untouched.
    pub fn set_cwd<I, S>(&mut self, segments: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let target = self.resolve(NormalizedPath::from_segments(segments));
        let next = Self::new(target.to_native())?;
        tracing::debug!(from = %self.cwd, to = %next.cwd, "Changing working directory");
        *self = next;
        Ok(())
    }

    /// Make `path` absolute against the working directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> NormalizedPath {
        let path = NormalizedPath::new(path);
        if path.is_absolute() {
            path
        } else {
            self.cwd.join(path.as_str())
        }
    }

    /// True if both paths resolve to the same location.
    pub fn paths_equivalent(&self, first: impl AsRef<Path>, second: impl AsRef<Path>) -> bool {
        self.resolve(first).remove_trailing_slash() == self.resolve(second).remove_trailing_slash()
    }

    /// True if `descendant` lies inside `ancestor` once both are resolved.
    ///
    /// A path contains itself. Nothing on disk is consulted.
    pub fn path_contains(&self, ancestor: impl AsRef<Path>, descendant: impl AsRef<Path>) -> bool {
        let ancestor = self.resolve(ancestor);
        let descendant = self.resolve(descendant);
        if ancestor.is_network_path() != descendant.is_network_path() {
            return false;
        }

        let mut inner = descendant.segments();
        ancestor
            .segments()
            .all(|segment| inner.next() == Some(segment))
    }

    /// True if `path` is the working directory.
    pub fn is_cwd(&self, path: impl AsRef<Path>) -> bool {
        self.locate(path) == self.cwd
    }

    /// True if `path` is the working directory or lies below it.
    pub fn is_within_cwd(&self, path: impl AsRef<Path>) -> bool {
        let located = self.locate(path);
        self.path_contains(&self.cwd, &located)
    }

    /// Resolve `path` and canonicalize its parent directory.
    ///
    /// The last component is not followed, so a symlink is judged by where
    /// the link itself lives. Falls back to the lexical form when the
    /// parent does not exist.
    fn locate(&self, path: impl AsRef<Path>) -> NormalizedPath {
        let resolved = self.resolve(path).remove_trailing_slash();
        let native = resolved.to_native();

        let located = match (native.parent(), native.file_name()) {
            (Some(parent), Some(name)) => dunce::canonicalize(parent).map(|p| p.join(name)),
            _ => dunce::canonicalize(&native),
        };

        located.map(NormalizedPath::new).unwrap_or(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> (tempfile::TempDir, FsContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = FsContext::new(dir.path()).unwrap();
        (dir, ctx)
    }

    #[test]
    fn locate_does_not_require_existence() {
        let (_dir, ctx) = context();
        let located = ctx.locate("not/here.txt");
        assert_eq!(located, ctx.cwd().join("not/here.txt"));
    }

    #[test]
    fn locate_of_dot_is_cwd() {
        let (_dir, ctx) = context();
        assert_eq!(&ctx.locate("."), ctx.cwd());
        assert_eq!(&ctx.locate("./"), ctx.cwd());
    }
}

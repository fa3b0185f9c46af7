//! Existence and stat predicates
//!
//! The boolean predicates never fail: any stat error, including a
//! permission failure, reads as "no". Relative paths are resolved against
//! the [`FsContext`] working directory.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::io::{self, Encoding};
use crate::{Error, FsContext, NormalizedPath, Result};

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Snapshot of an entry's metadata. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatResult {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub readonly: bool,
}

impl StatResult {
    fn from_metadata(metadata: &fs::Metadata) -> Self {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Self {
            kind,
            len: metadata.len(),
            modified: metadata.modified().ok(),
            readonly: metadata.permissions().readonly(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == EntryKind::Symlink
    }
}

/// True if the path exists. Symlinks are followed.
pub fn exists(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    exists_at(&ctx.resolve(path))
}

pub fn is_file(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    stat_at(&ctx.resolve(path)).is_ok_and(|s| s.is_file())
}

pub fn is_directory(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    stat_at(&ctx.resolve(path)).is_ok_and(|s| s.is_dir())
}

/// True if the path is a symbolic link whose target exists.
pub fn is_symbolic_link(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    let path = ctx.resolve(path);
    exists_at(&path) && lstat_at(&path).is_ok_and(|s| s.is_symlink())
}

/// True if the file exists and its decoded content is empty.
///
/// A byte-order mark alone counts as empty. Missing paths and
/// unreadable entries are not empty.
pub fn is_empty_file(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    let path = ctx.resolve(path);
    if !exists_at(&path) {
        return false;
    }
    io::read_text(ctx, &path, Encoding::Utf8).is_ok_and(|content| content.is_empty())
}

/// Stat the path, following symlinks.
///
/// # Errors
///
/// [`Error::NotFound`] for a missing path, [`Error::Io`] otherwise.
pub fn stat(ctx: &FsContext, path: impl AsRef<Path>) -> Result<StatResult> {
    stat_at(&ctx.resolve(path))
}

/// Stat the path without following a final symlink.
pub fn lstat(ctx: &FsContext, path: impl AsRef<Path>) -> Result<StatResult> {
    lstat_at(&ctx.resolve(path))
}

/// Async [`stat`]; failures arrive through the returned `Result`.
pub async fn stat_async(ctx: &FsContext, path: impl AsRef<Path>) -> Result<StatResult> {
    let native = ctx.resolve(path).to_native();
    tokio::fs::metadata(&native)
        .await
        .map(|m| StatResult::from_metadata(&m))
        .map_err(|e| Error::from_stat(native, e))
}

pub async fn exists_async(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    tokio::fs::metadata(ctx.resolve(path).to_native()).await.is_ok()
}

pub async fn is_file_async(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    stat_async(ctx, path).await.is_ok_and(|s| s.is_file())
}

pub async fn is_directory_async(ctx: &FsContext, path: impl AsRef<Path>) -> bool {
    stat_async(ctx, path).await.is_ok_and(|s| s.is_dir())
}

fn exists_at(path: &NormalizedPath) -> bool {
    fs::metadata(path.to_native()).is_ok()
}

fn stat_at(path: &NormalizedPath) -> Result<StatResult> {
    let native = path.to_native();
    fs::metadata(&native)
        .map(|m| StatResult::from_metadata(&m))
        .map_err(|e| Error::from_stat(native, e))
}

fn lstat_at(path: &NormalizedPath) -> Result<StatResult> {
    let native = path.to_native();
    fs::symlink_metadata(&native)
        .map(|m| StatResult::from_metadata(&m))
        .map_err(|e| Error::from_stat(native, e))
}

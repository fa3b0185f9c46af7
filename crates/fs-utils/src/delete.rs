//! Guarded recursive deletion
//!
//! A delete request moves through three steps:
//!
//! 1. **Validate**: a missing target is reported as `false`.
//! 2. **Authorize**: unless forced, the working directory itself and
//!    anything outside it are refused with a warning and `false`.
//! 3. **Execute**: the target is removed recursively. Failures here are
//!    errors carrying the path, because the caller has committed to the
//!    deletion.
//!
//! [`rmdir`] is the unguarded walker for callers that already own the
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::glob::{self, ExpandOptions};
use crate::{Error, FsContext, NormalizedPath, Result};

/// Options for [`delete`] and the bulk variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Skip the working-directory check.
    pub force: bool,
    /// Base for relative targets and patterns, resolved against the
    /// context's working directory.
    pub cwd: Option<PathBuf>,
    /// Let bulk patterns match dotfiles.
    pub dot: bool,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    fn expand_options(&self) -> ExpandOptions {
        ExpandOptions {
            cwd: self.cwd.clone(),
            dot: self.dot,
            ..ExpandOptions::default()
        }
    }

    fn base(&self, ctx: &FsContext) -> NormalizedPath {
        self.expand_options().base(ctx)
    }
}

/// What happened to one delete target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Deleted,
    /// The target did not exist.
    Missing,
    /// Refused by the working-directory policy.
    Rejected,
}

/// Per-path results of a bulk deletion.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub deleted: Vec<NormalizedPath>,
    pub missing: Vec<NormalizedPath>,
    pub rejected: Vec<NormalizedPath>,
    pub failed: Vec<(NormalizedPath, Error)>,
}

impl DeleteReport {
    fn record(&mut self, target: NormalizedPath, outcome: Result<Outcome>) {
        match outcome {
            Ok(Outcome::Deleted) => self.deleted.push(target),
            Ok(Outcome::Missing) => self.missing.push(target),
            Ok(Outcome::Rejected) => self.rejected.push(target),
            Err(err) => self.failed.push((target, err)),
        }
    }

    fn sort(&mut self) {
        self.deleted.sort();
        self.missing.sort();
        self.rejected.sort();
        self.failed.sort_by(|a, b| a.0.cmp(&b.0));
    }

    /// True when no target hit an I/O failure.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn resolve_target(ctx: &FsContext, path: &Path, options: &DeleteOptions) -> NormalizedPath {
    let path = NormalizedPath::new(path);
    if path.is_absolute() {
        path
    } else {
        options.base(ctx).join(path.as_str())
    }
}

/// Validate and authorize; `None` means the target may be removed.
fn check(ctx: &FsContext, target: &NormalizedPath, force: bool) -> Option<Outcome> {
    if fs::symlink_metadata(target.to_native()).is_err() {
        tracing::warn!(path = %target, "Cannot delete a path that does not exist");
        return Some(Outcome::Missing);
    }

    if force {
        return None;
    }

    if ctx.is_cwd(target) {
        tracing::warn!(path = %target, "Cannot delete the current working directory");
        return Some(Outcome::Rejected);
    }

    if !ctx.is_within_cwd(target) {
        tracing::warn!(
            path = %target,
            cwd = %ctx.cwd(),
            "Cannot delete files outside the current working directory"
        );
        return Some(Outcome::Rejected);
    }

    None
}

fn delete_resolved(ctx: &FsContext, target: &NormalizedPath, force: bool) -> Result<Outcome> {
    if let Some(outcome) = check(ctx, target, force) {
        return Ok(outcome);
    }

    tracing::debug!(path = %target, force, "Deleting");
    let native = target.to_native();
    let metadata = fs::symlink_metadata(&native).map_err(|e| Error::io(&native, e))?;
    if metadata.is_dir() {
        rmdir(target)?;
    } else {
        fs::remove_file(&native).map_err(|e| Error::io(&native, e))?;
    }
    Ok(Outcome::Deleted)
}

async fn delete_resolved_async(
    ctx: &FsContext,
    target: &NormalizedPath,
    force: bool,
) -> Result<Outcome> {
    let verdict = {
        let ctx = ctx.clone();
        let target = target.clone();
        tokio::task::spawn_blocking(move || check(&ctx, &target, force)).await?
    };
    if let Some(outcome) = verdict {
        return Ok(outcome);
    }

    tracing::debug!(path = %target, force, "Deleting");
    let native = target.to_native();
    let metadata = tokio::fs::symlink_metadata(&native)
        .await
        .map_err(|e| Error::io(&native, e))?;
    if metadata.is_dir() {
        rmdir_async(target).await?;
    } else {
        tokio::fs::remove_file(&native)
            .await
            .map_err(|e| Error::io(&native, e))?;
    }
    Ok(Outcome::Deleted)
}

/// Delete a file or directory tree under the working-directory policy.
///
/// Returns `Ok(true)` once the target is gone and `Ok(false)` when it was
/// missing or refused.
///
/// # Errors
///
/// [`Error::Io`] if removal fails part way.
pub fn delete(ctx: &FsContext, path: impl AsRef<Path>, options: &DeleteOptions) -> Result<bool> {
    let target = resolve_target(ctx, path.as_ref(), options);
    delete_resolved(ctx, &target, options.force).map(|outcome| outcome == Outcome::Deleted)
}

/// Async [`delete`].
pub async fn delete_async(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    options: &DeleteOptions,
) -> Result<bool> {
    let target = resolve_target(ctx, path.as_ref(), options);
    delete_resolved_async(ctx, &target, options.force)
        .await
        .map(|outcome| outcome == Outcome::Deleted)
}

/// Drop paths whose ancestor is also listed; removing the ancestor takes
/// them along.
///
/// Ordering by segments keeps every descendant directly behind its
/// ancestor, so `out/x.txt` follows `out` and not `out.txt`.
fn outermost(mut relatives: Vec<NormalizedPath>) -> Vec<NormalizedPath> {
    relatives.sort_by(|a, b| a.segments().cmp(b.segments()));
    let mut kept: Vec<NormalizedPath> = Vec::with_capacity(relatives.len());
    for path in relatives {
        let nested = kept.last().is_some_and(|parent| is_ancestor(parent, &path));
        if !nested {
            kept.push(path);
        }
    }
    kept
}

fn is_ancestor(parent: &NormalizedPath, path: &NormalizedPath) -> bool {
    let mut inner = path.segments();
    parent.segments().all(|segment| inner.next() == Some(segment)) && inner.next().is_some()
}

/// Delete everything matched by `patterns`, one path after another.
///
/// Each match goes through [`delete`]'s steps independently; a failure is
/// recorded and the remaining paths are still attempted.
///
/// # Errors
///
/// Only pattern compilation errors abort the whole call.
pub fn delete_many<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    options: &DeleteOptions,
) -> Result<DeleteReport> {
    let base = options.base(ctx);
    let matches = glob::expand(ctx, patterns, &options.expand_options())?;

    let mut report = DeleteReport::default();
    for relative in outermost(matches) {
        let target = base.join(relative.as_str());
        let outcome = delete_resolved(ctx, &target, options.force);
        report.record(target, outcome);
    }
    Ok(report)
}

/// Delete everything matched by `patterns`, one task per path.
///
/// Completes after every task has finished; completion order is not
/// reflected in the report, whose lists are sorted.
///
/// # Errors
///
/// Pattern compilation errors, or [`Error::Task`] if a deletion task
/// panicked.
pub async fn delete_many_async<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    options: &DeleteOptions,
) -> Result<DeleteReport> {
    let base = options.base(ctx);
    let matches = glob::expand_async(ctx, patterns, &options.expand_options()).await?;

    let mut tasks = JoinSet::new();
    for relative in outermost(matches) {
        let ctx = ctx.clone();
        let target = base.join(relative.as_str());
        let force = options.force;
        tasks.spawn(async move {
            let outcome = delete_resolved_async(&ctx, &target, force).await;
            (target, outcome)
        });
    }

    let mut report = DeleteReport::default();
    while let Some(joined) = tasks.join_next().await {
        let (target, outcome) = joined?;
        report.record(target, outcome);
    }
    report.sort();
    Ok(report)
}

/// Remove a directory and everything in it, depth first.
///
/// No existence or working-directory checks are made.
pub fn rmdir(path: &NormalizedPath) -> Result<()> {
    let root = path.to_native();
    for entry in WalkDir::new(&root).contents_first(true) {
        let entry = entry.map_err(|e| Error::walk(&root, e))?;
        let entry_path = entry.path();
        let removed = if entry.file_type().is_dir() {
            fs::remove_dir(entry_path)
        } else {
            fs::remove_file(entry_path)
        };
        removed.map_err(|e| Error::io(entry_path, e))?;
    }
    Ok(())
}

/// Async [`rmdir`]: children are removed concurrently, then the directory.
///
/// Child directories go through the same depth-first walk as [`rmdir`] on
/// the blocking pool.
pub async fn rmdir_async(path: &NormalizedPath) -> Result<()> {
    let root = path.to_native();
    let mut entries = tokio::fs::read_dir(&root)
        .await
        .map_err(|e| Error::io(&root, e))?;

    let mut tasks = JoinSet::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&root, e))? {
        let child = entry.path();
        let file_type = entry.file_type().await.map_err(|e| Error::io(&child, e))?;
        tasks.spawn(async move {
            if file_type.is_dir() {
                let dir = NormalizedPath::new(&child);
                tokio::task::spawn_blocking(move || rmdir(&dir))
                    .await
                    .map_err(Error::from)
                    .and_then(|removed| removed)
            } else {
                tokio::fs::remove_file(&child)
                    .await
                    .map_err(|e| Error::io(child, e))
            }
        });
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined.map_err(Error::from).and_then(|removed| removed) {
            first_error.get_or_insert(err);
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    tokio::fs::remove_dir(&root)
        .await
        .map_err(|e| Error::io(&root, e))
}

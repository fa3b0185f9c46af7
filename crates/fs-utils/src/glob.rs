//! Glob expansion over the filesystem
//!
//! Matching is delegated to `globset`; this module walks the base
//! directory, applies the patterns left to right (plain patterns add
//! matches, `!`-prefixed patterns remove them) and filters by entry type.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::{Error, FsContext, NormalizedPath, Result};

/// Options for glob expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Directory the patterns are relative to; itself resolved against the
    /// context's working directory. Defaults to the working directory.
    pub cwd: Option<PathBuf>,
    /// Let wildcards match names that start with a dot.
    pub dot: bool,
    pub case_sensitive: bool,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            dot: false,
            case_sensitive: true,
        }
    }
}

impl ExpandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_dot(mut self, dot: bool) -> Self {
        self.dot = dot;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Absolute directory the patterns are matched against.
    pub fn base(&self, ctx: &FsContext) -> NormalizedPath {
        match &self.cwd {
            Some(cwd) => ctx.resolve(cwd),
            None => ctx.cwd().clone(),
        }
    }
}

struct Pattern {
    matcher: GlobMatcher,
    negated: bool,
    absolute: bool,
    dot: bool,
}

impl Pattern {
    fn compile(raw: &str, options: &ExpandOptions) -> Result<Self> {
        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let body = body.strip_prefix("./").unwrap_or(body);

        let glob = GlobBuilder::new(body)
            .literal_separator(true)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: raw.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            matcher: glob.compile_matcher(),
            negated,
            absolute: NormalizedPath::new(body).is_absolute(),
            dot: options.dot || names_dotfile(body),
        })
    }

    fn is_match(&self, entry: &Entry) -> bool {
        let candidate = if self.absolute {
            entry.absolute.as_str()
        } else {
            entry.relative.as_str()
        };
        self.matcher.is_match(candidate)
    }
}

/// True if some segment of the pattern explicitly starts with a dot.
fn names_dotfile(pattern: &str) -> bool {
    pattern
        .split('/')
        .any(|seg| seg.starts_with('.') && seg != "." && seg != "..")
}

fn is_hidden(relative: &str) -> bool {
    relative.split('/').any(|seg| seg.starts_with('.'))
}

#[derive(Clone)]
struct Entry {
    relative: String,
    absolute: NormalizedPath,
    is_file: bool,
}

/// Every entry below `base`, depth-first. Unreadable entries are skipped.
fn walk(base: &NormalizedPath) -> Vec<Entry> {
    let root = base.to_native();
    let mut entries = Vec::new();

    for entry in WalkDir::new(&root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };

        let Ok(relative) = entry.path().strip_prefix(&root) else {
            continue;
        };
        let relative = NormalizedPath::new(relative);
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());

        entries.push(Entry {
            absolute: base.join(relative.as_str()),
            relative: relative.as_str().to_string(),
            is_file,
        });
    }

    entries
}

fn expand_entries<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    options: &ExpandOptions,
) -> Result<BTreeMap<String, Entry>> {
    let compiled = patterns
        .iter()
        .map(|p| Pattern::compile(p.as_ref(), options))
        .collect::<Result<Vec<_>>>()?;

    let mut matched = BTreeMap::new();
    if compiled.is_empty() {
        return Ok(matched);
    }

    let base = options.base(ctx);
    let entries = walk(&base);
    tracing::debug!(base = %base, entries = entries.len(), patterns = compiled.len(), "Expanding globs");

    for pattern in &compiled {
        if pattern.negated {
            matched.retain(|_, entry| !pattern.is_match(entry));
            continue;
        }

        for entry in &entries {
            if !pattern.dot && is_hidden(&entry.relative) {
                continue;
            }
            if pattern.is_match(entry) {
                matched.insert(entry.relative.clone(), entry.clone());
            }
        }
    }

    Ok(matched)
}

/// Resolve patterns to the matching paths, relative to the base directory.
///
/// The result is de-duplicated and sorted. A missing base directory
/// matches nothing.
///
/// # Errors
///
/// [`Error::InvalidPattern`] if a pattern does not compile.
pub fn expand<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    options: &ExpandOptions,
) -> Result<Vec<NormalizedPath>> {
    let matched = expand_entries(ctx, patterns, options)?;
    Ok(matched.into_keys().map(NormalizedPath::new).collect())
}

/// [`expand`] restricted to regular files.
pub fn expand_files<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    options: &ExpandOptions,
) -> Result<Vec<NormalizedPath>> {
    let matched = expand_entries(ctx, patterns, options)?;
    Ok(matched
        .into_iter()
        .filter(|(_, entry)| entry.is_file)
        .map(|(relative, _)| NormalizedPath::new(relative))
        .collect())
}

/// First match of `pattern` in sorted order.
pub fn find_first(
    ctx: &FsContext,
    pattern: &str,
    options: &ExpandOptions,
) -> Result<Option<NormalizedPath>> {
    Ok(expand(ctx, &[pattern], options)?.into_iter().next())
}

/// [`expand`] on the blocking thread pool.
pub async fn expand_async<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    options: &ExpandOptions,
) -> Result<Vec<NormalizedPath>> {
    let ctx = ctx.clone();
    let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
    let options = options.clone();
    tokio::task::spawn_blocking(move || expand(&ctx, &patterns, &options)).await?
}

/// Names of the files directly inside `dir` that end in one of
/// `extensions`, sorted.
pub fn files_with_ext(
    ctx: &FsContext,
    dir: impl AsRef<Path>,
    extensions: &[&str],
) -> Result<Vec<String>> {
    let native = ctx.resolve(dir).to_native();
    let entries = fs::read_dir(&native).map_err(|e| Error::io(&native, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(&native, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if NormalizedPath::new(&name).contains_ext(extensions) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Every regular file below `path` as absolute paths, sorted. A file
/// path yields itself.
pub fn list_files(ctx: &FsContext, path: impl AsRef<Path>) -> Result<Vec<NormalizedPath>> {
    let path = ctx.resolve(path);
    let root = path.to_native();
    if root.is_file() {
        return Ok(vec![path]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::walk(&root, e))?;
        if entry.file_type().is_file() {
            files.push(NormalizedPath::new(entry.path()));
        }
    }
    Ok(files)
}

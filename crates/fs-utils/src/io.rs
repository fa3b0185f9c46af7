//! Text I/O and directory-ensuring writes
//!
//! Every write creates missing parent directories before the file is
//! touched. The async functions await each directory creation before
//! attempting the next step and stop at the first failure. Relative paths
//! are resolved against the [`FsContext`] working directory.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::{Error, FsContext, NormalizedPath, Result};

const BOM: char = '\u{FEFF}';

/// How the directory-ensuring writer lays bytes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobustnessConfig {
    /// Write to a sibling temp file and rename it into place.
    pub atomic: bool,
    /// Flush file contents to disk before returning.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            atomic: true,
            enable_fsync: true,
        }
    }
}

/// Text encoding for reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: one byte per code point up to U+00FF.
    Latin1,
}

impl Encoding {
    /// Decode raw bytes read from `path`.
    pub fn decode(self, path: &Path, bytes: Vec<u8>) -> Result<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes).map_err(|e| Error::Encoding {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Self::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }

    /// Encode text destined for `path`.
    pub fn encode(self, path: &Path, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| Error::Encoding {
                        path: path.to_path_buf(),
                        message: format!("character {c:?} is outside Latin-1"),
                    })
                })
                .collect(),
        }
    }
}

/// Drop a leading byte-order mark and convert CRLF / CR line endings to LF.
pub fn normalize_text(text: &str) -> String {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Create `path` and any missing ancestors.
///
/// Does nothing if the path already exists. A directory that appears
/// between the existence check and the creation is accepted.
pub fn ensure_dir(ctx: &FsContext, path: impl AsRef<Path>) -> Result<()> {
    ensure_dir_at(&ctx.resolve(path))
}

fn ensure_dir_at(path: &NormalizedPath) -> Result<()> {
    let native = path.to_native();
    if native.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        ensure_dir_at(&parent)?;
    }

    tracing::debug!(path = %path, "Creating directory");
    match fs::create_dir(&native) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && native.is_dir() => Ok(()),
        Err(e) => Err(Error::io(native, e)),
    }
}

/// Async [`ensure_dir`].
///
/// Missing ancestors are created outermost first, each only after its
/// parent's creation has completed.
pub async fn ensure_dir_async(ctx: &FsContext, path: impl AsRef<Path>) -> Result<()> {
    ensure_dir_at_async(ctx.resolve(path)).await
}

async fn ensure_dir_at_async(path: NormalizedPath) -> Result<()> {
    let mut missing = Vec::new();
    let mut current = Some(path);
    while let Some(dir) = current {
        if tokio::fs::metadata(dir.to_native()).await.is_ok() {
            break;
        }
        current = dir.parent();
        missing.push(dir);
    }

    for dir in missing.into_iter().rev() {
        let native = dir.to_native();
        tracing::debug!(path = %dir, "Creating directory");
        match tokio::fs::create_dir(&native).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists && is_dir_async(&native).await => {}
            Err(e) => return Err(Error::io(native, e)),
        }
    }
    Ok(())
}

async fn is_dir_async(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

/// Sibling temp file in the same directory (same filesystem for rename).
fn temp_path_for(native_path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        uuid::Uuid::new_v4().simple()
    );
    native_path.with_file_name(temp_name)
}

/// Write bytes to `path`, creating parent directories first.
///
/// With `config.atomic` the content goes to a temp file that is renamed
/// over the destination, so readers never observe a partial file.
pub fn write_atomic(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    write_atomic_at(&ctx.resolve(path), content, config)
}

fn write_atomic_at(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = path.parent() {
        ensure_dir_at(&parent)?;
    }

    if !config.atomic {
        return write_direct(&native_path, content, config.enable_fsync);
    }

    let temp_path = temp_path_for(&native_path);
    if let Err(err) = write_direct(&temp_path, content, config.enable_fsync) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(e) = fs::rename(&temp_path, &native_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&native_path, e));
    }

    Ok(())
}

fn write_direct(path: &Path, content: &[u8], fsync: bool) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;

    file.write_all(content).map_err(|e| Error::io(path, e))?;

    if fsync {
        file.sync_all().map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Async [`write_atomic`].
pub async fn write_atomic_async(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    write_atomic_at_async(&ctx.resolve(path), content, config).await
}

async fn write_atomic_at_async(
    path: &NormalizedPath,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = path.parent() {
        ensure_dir_at_async(parent).await?;
    }

    if !config.atomic {
        return write_direct_async(&native_path, content, config.enable_fsync).await;
    }

    let temp_path = temp_path_for(&native_path);
    if let Err(err) = write_direct_async(&temp_path, content, config.enable_fsync).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, &native_path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(Error::io(&native_path, e));
    }

    Ok(())
}

async fn write_direct_async(path: &Path, content: &[u8], fsync: bool) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| Error::io(path, e))?;

    if fsync {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        file.sync_all().await.map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

/// Read a text file, stripping a byte-order mark and normalizing line
/// endings to `\n`.
pub fn read_text(ctx: &FsContext, path: impl AsRef<Path>, encoding: Encoding) -> Result<String> {
    let native_path = ctx.resolve(path).to_native();
    let bytes = fs::read(&native_path).map_err(|e| Error::io(&native_path, e))?;
    let text = encoding.decode(&native_path, bytes)?;
    Ok(normalize_text(&text))
}

/// Async [`read_text`].
pub async fn read_text_async(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    encoding: Encoding,
) -> Result<String> {
    let native_path = ctx.resolve(path).to_native();
    let bytes = tokio::fs::read(&native_path)
        .await
        .map_err(|e| Error::io(&native_path, e))?;
    let text = encoding.decode(&native_path, bytes)?;
    Ok(normalize_text(&text))
}

/// Write text, creating parent directories. No byte-order mark is added.
pub fn write_text(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    content: &str,
    encoding: Encoding,
    config: RobustnessConfig,
) -> Result<()> {
    let path = ctx.resolve(path);
    let bytes = encoding.encode(&path.to_native(), content)?;
    write_atomic_at(&path, &bytes, config)
}

/// Async [`write_text`].
pub async fn write_text_async(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    content: &str,
    encoding: Encoding,
    config: RobustnessConfig,
) -> Result<()> {
    let path = ctx.resolve(path);
    let bytes = encoding.encode(&path.to_native(), content)?;
    write_atomic_at_async(&path, &bytes, config).await
}

/// Copy a file byte for byte, creating the destination's parents.
pub fn copy_file(
    ctx: &FsContext,
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    config: RobustnessConfig,
) -> Result<()> {
    let native_src = ctx.resolve(src).to_native();
    let bytes = fs::read(&native_src).map_err(|e| Error::io(&native_src, e))?;
    write_atomic(ctx, dest, &bytes, config)
}

/// Async [`copy_file`].
pub async fn copy_file_async(
    ctx: &FsContext,
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    config: RobustnessConfig,
) -> Result<()> {
    let native_src = ctx.resolve(src).to_native();
    let bytes = tokio::fs::read(&native_src)
        .await
        .map_err(|e| Error::io(&native_src, e))?;
    write_atomic_async(ctx, dest, &bytes, config).await
}

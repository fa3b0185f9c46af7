//! Extension-driven JSON / YAML reading and writing
//!
//! The codec comes from the explicit `format` option, else from the file
//! extension. Anything unrecognized is treated as JSON. Relative paths are
//! resolved against the [`FsContext`] working directory.

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::glob::{self, ExpandOptions};
use crate::io::{self, Encoding, RobustnessConfig};
use crate::{Error, FsContext, NormalizedPath, Result};

const YAML_INDENT: usize = 2;

/// A supported data format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Map an extension (with or without the dot) to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Pick the codec for `path`: the override, else the extension,
    /// else JSON.
    pub fn detect(path: &NormalizedPath, override_format: Option<Format>) -> Self {
        override_format
            .or_else(|| path.extension().and_then(Self::from_extension))
            .unwrap_or(Self::Json)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }

    fn parse<T: DeserializeOwned>(self, path: &NormalizedPath, content: &str) -> Result<T> {
        let parsed = match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| Error::Parse {
            path: path.to_native(),
            format: self.name().into(),
            message,
        })
    }

    fn serialize<T: Serialize + ?Sized>(
        self,
        path: &NormalizedPath,
        value: &T,
        indent: usize,
    ) -> Result<String> {
        let serialized = match self {
            Self::Json => to_json_string(value, indent),
            Self::Yaml => to_yaml_string(value, indent),
        };
        serialized.map_err(|message| Error::Serialize {
            path: path.to_native(),
            format: self.name().into(),
            message,
        })
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn to_json_string<T: Serialize + ?Sized>(value: &T, indent: usize) -> std::result::Result<String, String> {
    if indent == 0 {
        return serde_json::to_string(value).map_err(|e| e.to_string());
    }

    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).map_err(|e| e.to_string())?;
    String::from_utf8(buf).map_err(|e| e.to_string())
}

fn to_yaml_string<T: Serialize + ?Sized>(value: &T, indent: usize) -> std::result::Result<String, String> {
    if indent != 0 && indent != YAML_INDENT {
        return Err(format!("YAML output uses a fixed indent of {YAML_INDENT}, got {indent}"));
    }
    serde_yaml::to_string(value).map_err(|e| e.to_string())
}

/// Options for reading data files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Overrides extension-based codec selection.
    pub format: Option<Format>,
    pub encoding: Encoding,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Options for writing data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Overrides extension-based codec selection.
    pub format: Option<Format>,
    pub encoding: Encoding,
    /// JSON indentation width; `0` writes compact JSON.
    ///
    /// YAML output always uses two spaces, and [`write_data`] rejects any
    /// other non-zero width for YAML with [`Error::Serialize`].
    pub indent: usize,
    pub robustness: RobustnessConfig,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: None,
            encoding: Encoding::Utf8,
            indent: 2,
            robustness: RobustnessConfig::default(),
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }
}

/// How [`read_data_files`] combines several files into one mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Namespace {
    /// Merge top-level keys; later files win.
    #[default]
    Flat,
    /// Store each file's content under its extension-less name.
    Nested,
    /// Keep only the key named after the file.
    Only,
}

/// Read and parse a data file.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be read, [`Error::Parse`] if the
/// content is malformed for the chosen codec.
pub fn read_data<T: DeserializeOwned>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<T> {
    let path = ctx.resolve(path);
    let format = Format::detect(&path, options.format);
    tracing::debug!(path = %path, %format, "Reading data file");
    let content = io::read_text(ctx, &path, options.encoding)?;
    format.parse(&path, &content)
}

/// Async [`read_data`].
pub async fn read_data_async<T: DeserializeOwned>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    options: &ReadOptions,
) -> Result<T> {
    let path = ctx.resolve(path);
    let format = Format::detect(&path, options.format);
    tracing::debug!(path = %path, %format, "Reading data file");
    let content = io::read_text_async(ctx, &path, options.encoding).await?;
    format.parse(&path, &content)
}

/// Read a data file, returning an empty mapping on any failure.
pub fn read_optional_data(ctx: &FsContext, path: impl AsRef<Path>, options: &ReadOptions) -> Value {
    let path = ctx.resolve(path);
    match read_data(ctx, &path, options) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(path = %path, error = %err, "Optional data file unavailable");
            Value::Object(Map::new())
        }
    }
}

/// Serialize `value` and write it, creating parent directories.
///
/// # Errors
///
/// [`Error::Serialize`] if the value cannot be encoded, including a YAML
/// write asking for an indent other than two spaces. Nothing is written
/// in that case.
pub fn write_data<T: Serialize + ?Sized>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    value: &T,
    options: &WriteOptions,
) -> Result<()> {
    let path = ctx.resolve(path);
    let format = Format::detect(&path, options.format);
    tracing::debug!(path = %path, %format, "Writing data file");
    let content = format.serialize(&path, value, options.indent)?;
    io::write_text(ctx, &path, &content, options.encoding, options.robustness)
}

/// Async [`write_data`].
pub async fn write_data_async<T: Serialize + ?Sized>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    value: &T,
    options: &WriteOptions,
) -> Result<()> {
    let path = ctx.resolve(path);
    let format = Format::detect(&path, options.format);
    tracing::debug!(path = %path, %format, "Writing data file");
    let content = format.serialize(&path, value, options.indent)?;
    io::write_text_async(ctx, &path, &content, options.encoding, options.robustness).await
}

pub fn read_json<T: DeserializeOwned>(ctx: &FsContext, path: impl AsRef<Path>) -> Result<T> {
    read_data(ctx, path, &ReadOptions::new().with_format(Format::Json))
}

pub fn read_yaml<T: DeserializeOwned>(ctx: &FsContext, path: impl AsRef<Path>) -> Result<T> {
    read_data(ctx, path, &ReadOptions::new().with_format(Format::Yaml))
}

pub async fn read_json_async<T: DeserializeOwned>(ctx: &FsContext, path: impl AsRef<Path>) -> Result<T> {
    read_data_async(ctx, path, &ReadOptions::new().with_format(Format::Json)).await
}

pub async fn read_yaml_async<T: DeserializeOwned>(ctx: &FsContext, path: impl AsRef<Path>) -> Result<T> {
    read_data_async(ctx, path, &ReadOptions::new().with_format(Format::Yaml)).await
}

pub fn write_json<T: Serialize + ?Sized>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    value: &T,
) -> Result<()> {
    write_data(ctx, path, value, &WriteOptions::new().with_format(Format::Json))
}

pub fn write_yaml<T: Serialize + ?Sized>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    value: &T,
) -> Result<()> {
    write_data(ctx, path, value, &WriteOptions::new().with_format(Format::Yaml))
}

pub async fn write_json_async<T: Serialize + ?Sized>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    value: &T,
) -> Result<()> {
    write_data_async(ctx, path, value, &WriteOptions::new().with_format(Format::Json)).await
}

pub async fn write_yaml_async<T: Serialize + ?Sized>(
    ctx: &FsContext,
    path: impl AsRef<Path>,
    value: &T,
) -> Result<()> {
    write_data_async(ctx, path, value, &WriteOptions::new().with_format(Format::Yaml)).await
}

/// Read every file matched by `patterns` and combine them into one
/// mapping according to `namespace`.
///
/// Files are visited in sorted path order. With [`Namespace::Flat`] a file
/// whose content is not a mapping is stored under its name instead.
pub fn read_data_files<S: AsRef<str>>(
    ctx: &FsContext,
    patterns: &[S],
    expand: &ExpandOptions,
    options: &ReadOptions,
    namespace: Namespace,
) -> Result<Value> {
    let base = expand.base(ctx);
    let mut merged = Map::new();

    for relative in glob::expand_files(ctx, patterns, expand)? {
        let path = base.join(relative.as_str());
        let content: Value = read_data(ctx, &path, options)?;
        let name = path.name_without_extension().to_string();
        merge_into(&mut merged, name, content, namespace);
    }

    Ok(Value::Object(merged))
}

fn merge_into(merged: &mut Map<String, Value>, name: String, content: Value, namespace: Namespace) {
    match (namespace, content) {
        (Namespace::Flat, Value::Object(map)) => merged.extend(map),
        (Namespace::Flat | Namespace::Nested, other) => {
            merged.insert(name, other);
        }
        (Namespace::Only, Value::Object(mut map)) => match map.remove(&name) {
            Some(value) => {
                merged.insert(name, value);
            }
            None => tracing::debug!(key = %name, "Data file has no key named after it"),
        },
        (Namespace::Only, _) => tracing::debug!(key = %name, "Data file is not a mapping"),
    }
}

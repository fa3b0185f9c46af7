//! Normalized path handling and pure path arithmetic
//!
//! Nothing in this module touches the filesystem; filesystem checks go
//! through [`crate::probe`] with an [`crate::FsContext`].
//!
//! Extensions are always reported without the leading dot.

use std::path::{Path, PathBuf};

/// Replace every backslash with a forward slash.
pub fn normalize_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// A path normalized to use forward slashes internally.
///
/// Provides consistent path handling across platforms by normalizing
/// all paths to forward slashes internally and converting to
/// platform-native format only at I/O boundaries.
///
/// Construction also cleans the path lexically: repeated separators
/// collapse, `.` segments disappear and `..` cancels the preceding
/// segment. A leading `..` on a relative path is kept, a trailing
/// separator is kept, and a leading `//` (network share) is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&normalize_slash(&path_str)),
        }
    }

    /// Join several fragments into a single logical path.
    ///
    /// `from_segments(["a", "b/c", "d.txt"])` is `a/b/c/d.txt`.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut iter = segments.into_iter();
        let Some(first) = iter.next() else {
            return Self::new("");
        };
        iter.fold(Self::new(first.as_ref()), |acc, segment| {
            acc.join(segment.as_ref())
        })
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    ///
    /// The segment is appended even when it looks absolute.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = normalize_slash(segment);
        if segment_normalized.is_empty() {
            return self.clone();
        }
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) if trimmed.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component, ignoring a trailing separator.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Non-empty segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|s| !s.is_empty())
    }

    /// First non-empty segment, or `""`.
    pub fn first_segment(&self) -> &str {
        self.segments().next().unwrap_or("")
    }

    /// Last non-empty segment, or `""`.
    ///
    /// `apple/orange/grape/` gives `grape`. Use [`Self::filename`] when a
    /// trailing separator should yield an empty name.
    pub fn last_segment(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// Every segment but the last, always ending in a separator.
    ///
    /// A path with a trailing separator keeps all of its segments:
    /// `a/b/` gives `a/b/`, `a/b` gives `a/`, `b` gives `./`.
    pub fn dirname(&self) -> Self {
        let dir = match self.inner.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => self.inner[..idx].to_string(),
            None => "./".to_string(),
        };
        let mut dir = Self::new(dir);
        if !dir.inner.ends_with('/') {
            dir.inner.push('/');
        }
        dir
    }

    /// The path itself when it looks like a directory, otherwise the
    /// path with its file name removed.
    pub fn dir(&self) -> Self {
        if !self.inner.ends_with('/') && self.has_extension() {
            self.remove_filename()
        } else {
            self.clone()
        }
    }

    /// Last directory segment, ignoring a trailing file name.
    pub fn last_dir(&self) -> &str {
        if self.has_extension() && !self.inner.ends_with('/') {
            let cut = self.inner.rfind('/').unwrap_or(0);
            self.inner[..cut].rsplit('/').find(|s| !s.is_empty()).unwrap_or("")
        } else {
            self.last_segment()
        }
    }

    /// Final path component with its extension, ignoring a trailing
    /// separator.
    pub fn basename(&self) -> &str {
        self.last_segment()
    }

    /// Text after the final separator; empty when the path ends in one.
    pub fn filename(&self) -> &str {
        match self.inner.rfind('/') {
            Some(idx) => &self.inner[idx + 1..],
            None => &self.inner,
        }
    }

    /// Strip the last segment when it looks like a file.
    pub fn remove_filename(&self) -> Self {
        if !self.has_extension() || self.inner.ends_with('/') {
            return self.clone();
        }
        match self.inner.rfind('/') {
            Some(idx) => Self {
                inner: self.inner[..=idx].to_string(),
            },
            None => Self::new("./"),
        }
    }

    /// Get the extension (without the dot) if the last segment has one.
    ///
    /// Dotfiles count: `.gitignore` has the extension `gitignore`.
    pub fn extension(&self) -> Option<&str> {
        let name = self.last_segment();
        name.rfind('.').map(|idx| &name[idx + 1..])
    }

    /// True if the last segment contains a dot.
    pub fn has_extension(&self) -> bool {
        self.last_segment().contains('.')
    }

    /// File name with its last extension removed.
    ///
    /// A name whose only dot is the leading one is returned unchanged.
    pub fn name_without_extension(&self) -> &str {
        let name = self.last_segment();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// File name up to its first dot: `file.tmpl.md` gives `file`.
    pub fn base_name(&self) -> &str {
        let name = self.last_segment();
        name.split('.').next().unwrap_or("")
    }

    /// True if the path ends in one of the given extensions.
    pub fn contains_ext(&self, extensions: &[&str]) -> bool {
        if self.inner.ends_with('/') {
            return false;
        }
        self.extension().is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.') == ext)
        })
    }

    /// Append a separator unless one is present or the path looks like
    /// a file.
    pub fn add_trailing_slash(&self) -> Self {
        if self.inner.ends_with('/') || self.has_extension() {
            return self.clone();
        }
        Self {
            inner: format!("{}/", self.inner),
        }
    }

    /// Remove any trailing separators. The root `/` is kept.
    pub fn remove_trailing_slash(&self) -> Self {
        let trimmed = self.inner.trim_end_matches('/');
        if trimmed.is_empty() {
            return self.clone();
        }
        Self {
            inner: trimmed.to_string(),
        }
    }

    /// Suffix test after slash normalization of the suffix.
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.inner.ends_with(&normalize_slash(suffix))
    }

    /// Last character of the path.
    pub fn last_char(&self) -> Option<char> {
        self.inner.chars().last()
    }

    /// True for rooted paths, including Windows drive paths.
    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/') || Path::new(&self.inner).is_absolute() || has_drive(&self.inner)
    }

    /// Check if this appears to be a network path.
    ///
    /// Detects UNC paths (//server/share or \\server\share).
    pub fn is_network_path(&self) -> bool {
        self.inner.starts_with("//")
            || self.inner.starts_with("smb://")
            || self.inner.starts_with("nfs://")
    }
}

/// `C:/...` style prefix.
fn has_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// Lexically clean a forward-slash path.
fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let network = path.starts_with("//") && !path.starts_with("///");
    let absolute = path.starts_with('/');
    let trailing = path.len() > 1 && path.ends_with('/');

    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." => {
                    stack.pop();
                }
                _ if absolute => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }

    let prefix = if network {
        "//"
    } else if absolute {
        "/"
    } else {
        ""
    };

    if stack.is_empty() {
        return match (absolute, trailing) {
            (true, _) => prefix.to_string(),
            (false, true) => "./".to_string(),
            (false, false) => ".".to_string(),
        };
    }

    let mut out = format!("{}{}", prefix, stack.join("/"));
    if trailing {
        out.push('/');
    }
    out
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

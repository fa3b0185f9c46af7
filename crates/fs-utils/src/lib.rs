//! Filesystem utilities with an explicit working directory
//!
//! Paths are held in [`NormalizedPath`] (forward slashes, cleaned of `.` and
//! `..` segments) and resolved against an [`FsContext`] instead of the
//! process working directory. Blocking and async versions of each I/O
//! operation are provided side by side; the async ones end in `_async`.
//!
//! - [`path`]: string-level path algebra, no filesystem access
//! - [`context`]: the working directory and containment checks
//! - [`probe`]: existence predicates and stat
//! - [`io`]: text I/O, `ensure_dir` and atomic writes
//! - [`data`]: JSON / YAML files picked by extension
//! - [`glob`]: pattern expansion with negation
//! - [`delete`]: guarded recursive deletion

pub mod context;
pub mod data;
pub mod delete;
pub mod error;
pub mod glob;
pub mod io;
pub mod logging;
pub mod path;
pub mod probe;

pub use context::FsContext;
pub use data::{Format, Namespace, ReadOptions, WriteOptions};
pub use delete::{DeleteOptions, DeleteReport};
pub use error::{Error, Result};
pub use glob::ExpandOptions;
pub use io::{Encoding, RobustnessConfig};
pub use path::{NormalizedPath, normalize_slash};
pub use probe::{EntryKind, StatResult};

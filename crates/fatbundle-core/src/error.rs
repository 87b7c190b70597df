//! Error types for fatbundle

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the bundler crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for bundler operations
#[derive(Debug, Error)]
pub enum Error {
    /// Open/read/write failure, carrying the path that failed.
    #[error("'{}': {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{0}': invalid file type specified")]
    InvalidFileType(String),

    #[error("invalid configuration: {0}")]
    InvalidArgument(String),

    /// Targets that were requested during unbundling but never matched a
    /// bundle entry. Rendered as the sorted list the driver reports.
    #[error("can't find bundles for{}", format_target_list(.0))]
    MissingBundles(Vec<String>),

    #[error("can't find bundle for the host target")]
    MissingHostBundle,

    #[error("duplicate bundle entry for '{0}'")]
    DuplicateBundle(String),

    #[error("'{0}' tool failed")]
    ExternalTool(String),

    #[error("no compatible code object found for the target '{target}' in heterogeneous archive library: {archive}")]
    NoCompatibleCodeObject { target: String, archive: String },

    #[error("failed to read archive '{}': {message}", .path.display())]
    BadArchive { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Attach a path to a bare IO error.
    pub fn file_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }
}

/// `" a, b and c"` with the targets sorted, matching the driver's
/// missing-bundle diagnostic.
fn format_target_list(targets: &[String]) -> String {
    let mut sorted: Vec<&str> = targets.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = String::new();
    let last = sorted.len().saturating_sub(1);
    for (i, t) in sorted.iter().enumerate() {
        if i != 0 && last > 1 {
            out.push(',');
        }
        out.push(' ');
        if i == last && i != 0 {
            out.push_str("and ");
        }
        out.push_str(t);
    }
    out
}

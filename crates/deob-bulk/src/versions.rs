//! Versions list: which builds to process and where their files live
//!
//! The list is tab-separated with a header row. Each row names a version and
//! the artifact file of that version:
//!
//! ```text
//! version    filename
//! 20240101   osu!.dll
//! ```
//!
//! Paths resolve against the list's directory: the artifact is
//! `<root>/<version>/<filename>` and the dependency directories are whichever
//! of `<root>/<version>/{game-assemblies,libs,plugins}` exist.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Dependency directories merged into every working area, in merge order
pub const DEPENDENCY_DIRS: [&str; 3] = ["game-assemblies", "libs", "plugins"];

#[derive(Error, Debug)]
pub enum VersionsError {
    #[error("VERSIONS/missing: {}", .0.display())]
    Missing(PathBuf),

    #[error("VERSIONS/line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("IO/{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub version: String,
    pub filename: String,
    /// Absolute artifact path, `None` when the file does not exist
    pub filepath: Option<PathBuf>,
    pub dependencies: Vec<PathBuf>,
}

impl VersionEntry {
    pub fn resolve(root: &Path, version: &str, filename: &str) -> Self {
        let dir = root.join(version);
        let candidate = dir.join(filename);

        Self {
            version: version.to_string(),
            filename: filename.to_string(),
            filepath: candidate.is_file().then_some(candidate),
            dependencies: DEPENDENCY_DIRS
                .iter()
                .map(|name| dir.join(name))
                .filter(|path| path.is_dir())
                .collect(),
        }
    }
}

pub fn parse_versions(root: &Path, contents: &str) -> Result<Vec<VersionEntry>, VersionsError> {
    let mut entries = Vec::new();

    // Line 1 is the header
    for (index, line) in contents.split('\n').enumerate().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut columns = line.split('\t').map(str::trim);
        let (Some(version), Some(filename)) = (columns.next(), columns.next()) else {
            return Err(VersionsError::Malformed {
                line: index + 1,
                reason: "expected `version<TAB>filename`".to_string(),
            });
        };
        if version.is_empty() || filename.is_empty() {
            return Err(VersionsError::Malformed {
                line: index + 1,
                reason: "empty version or filename".to_string(),
            });
        }

        entries.push(VersionEntry::resolve(root, version, filename));
    }

    Ok(entries)
}

/// Reads and resolves the list at `path`. Resolution touches the disk once per
/// row, so it runs on the blocking pool.
pub async fn load_versions(path: &Path) -> Result<Vec<VersionEntry>, VersionsError> {
    let path = std::path::absolute(path).map_err(|source| VersionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(VersionsError::Missing(path));
    }

    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| VersionsError::Io {
            path: path.clone(),
            source,
        })?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    tokio::task::spawn_blocking(move || parse_versions(&root, &contents))
        .await
        .map_err(|err| VersionsError::Io {
            path,
            source: std::io::Error::other(err),
        })?
}

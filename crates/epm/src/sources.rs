//! Source expansion
//!
//! Turns the `sources` entries of a manifest (files or directories, relative to
//! the manifest's base directory) into a flat list of concrete files, and maps
//! each file back to the `./relative/path` key it is recorded under.

use futures::future::try_join_all;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Errors that can occur while expanding sources
#[derive(Debug, Error)]
pub enum SourceError {
    /// Path is neither a file nor a directory (missing, broken link, special file)
    #[error("Cannot resolve source path {path}: not a file or directory")]
    Unresolvable { path: PathBuf },

    /// File lies outside the base directory
    #[error("Source {path} is outside the base directory {base}")]
    OutsideBase { path: PathBuf, base: PathBuf },

    /// Filesystem failure while walking
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Expand `paths` relative to `base` into a sorted, deduplicated list of files
///
/// Top-level entries are expanded concurrently; the first failure aborts the rest.
pub async fn expand<S: AsRef<str>>(paths: &[S], base: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let expansions = paths
        .iter()
        .map(|entry| expand_entry(normalize(&base.join(entry.as_ref()))));

    let mut files: Vec<PathBuf> = try_join_all(expansions).await?.into_iter().flatten().collect();
    files.sort();
    files.dedup();

    debug!(entries = paths.len(), files = files.len(), base = %base.display(), "expanded sources");
    Ok(files)
}

async fn expand_entry(path: PathBuf) -> Result<Vec<PathBuf>, SourceError> {
    let metadata = match fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SourceError::Unresolvable { path });
        }
        Err(source) => return Err(SourceError::Io { path, source }),
    };

    if metadata.is_file() {
        Ok(vec![path])
    } else if metadata.is_dir() {
        walk(path).await
    } else {
        Err(SourceError::Unresolvable { path })
    }
}

/// Every file below `root`, following symlinks but visiting each directory once
async fn walk(root: PathBuf) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();
    let mut pending = vec![root];

    while let Some(dir) = pending.pop() {
        let canonical = fs::canonicalize(&dir).await.map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })?;
        if !visited.insert(canonical) {
            continue;
        }

        let mut entries = fs::read_dir(&dir).await.map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })?;

        while let Some(entry) = entries.next_entry().await.map_err(|source| SourceError::Io {
            path: dir.clone(),
            source,
        })? {
            let path = entry.path();
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(SourceError::Unresolvable { path });
                }
                Err(source) => return Err(SourceError::Io { path, source }),
            };

            if metadata.is_dir() {
                pending.push(path);
            } else if metadata.is_file() {
                files.push(path);
            } else {
                return Err(SourceError::Unresolvable { path });
            }
        }
    }

    Ok(files)
}

/// Lockfile key of `path` relative to `base`, e.g. `./contracts/Owned.sol`
pub fn relative_key(base: &Path, path: &Path) -> Result<String, SourceError> {
    let base = normalize(base);
    let path = normalize(path);

    let outside = || SourceError::OutsideBase {
        path: path.clone(),
        base: base.clone(),
    };

    let relative = path.strip_prefix(&base).map_err(|_| outside())?;

    let mut key = String::from(".");
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| SourceError::Unresolvable {
                    path: path.clone(),
                })?;
                key.push('/');
                key.push_str(part);
            }
            _ => return Err(outside()),
        }
    }

    if key == "." {
        return Err(outside());
    }
    Ok(key)
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent
///
/// Leading `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize(Path::new("./foo/../bar/./baz")), PathBuf::from("bar/baz"));
        assert_eq!(normalize(Path::new("../up/x")), PathBuf::from("../up/x"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_relative_key() {
        let base = Path::new("/project");
        assert_eq!(
            relative_key(base, Path::new("/project/contracts/Owned.sol")).unwrap(),
            "./contracts/Owned.sol"
        );
        assert_eq!(
            relative_key(base, Path::new("/project/./a/../Owned.sol")).unwrap(),
            "./Owned.sol"
        );
    }

    #[test]
    fn test_relative_key_outside_base() {
        let base = Path::new("/project");
        assert!(matches!(
            relative_key(base, Path::new("/project/../shared/Lib.sol")),
            Err(SourceError::OutsideBase { .. })
        ));
        assert!(matches!(
            relative_key(base, Path::new("/elsewhere/Lib.sol")),
            Err(SourceError::OutsideBase { .. })
        ));
        assert!(relative_key(base, base).is_err());
    }

    #[tokio::test]
    async fn test_expand_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        std::fs::create_dir_all(base.join("contracts/lib")).unwrap();
        std::fs::write(base.join("contracts/A.sol"), "a").unwrap();
        std::fs::write(base.join("contracts/lib/B.sol"), "b").unwrap();
        std::fs::write(base.join("Owned.sol"), "owned").unwrap();

        let files = expand(&["contracts", "Owned.sol", "contracts/A.sol"], base).await.unwrap();

        let keys: Vec<String> = files.iter().map(|f| relative_key(base, f).unwrap()).collect();
        assert_eq!(keys, vec!["./Owned.sol", "./contracts/A.sol", "./contracts/lib/B.sol"]);
    }

    #[tokio::test]
    async fn test_expand_missing_path() {
        let dir = tempfile::tempdir().unwrap();

        let err = expand(&["missing.sol"], dir.path()).await.unwrap_err();
        match err {
            SourceError::Unresolvable { path } => assert!(path.ends_with("missing.sol")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_expand_empty() {
        let dir = tempfile::tempdir().unwrap();
        let none: [&str; 0] = [];
        assert!(expand(&none, dir.path()).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_broken_symlink_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("link.sol")).unwrap();

        assert!(matches!(
            expand(&["link.sol"], dir.path()).await,
            Err(SourceError::Unresolvable { .. })
        ));
    }
}

// Token store: the local cache of bearer tokens issued by the logserver.
//
// The whole mapping lives in memory and is written back as one JSON
// snapshot. An empty mapping has no snapshot file at all.
// Concurrent invocations are not coordinated: the last writer wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot read token store {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("token store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write token store {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// On-disk layout of the snapshot file.
#[derive(Serialize, Deserialize, Debug, Default)]
struct Snapshot {
    tokens: BTreeMap<String, String>,
}

/// Username -> token mapping backed by a single snapshot file.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    tokens: BTreeMap<String, String>,
}

impl TokenStore {
    /// Load the snapshot at `path`. A missing file yields an empty store;
    /// a file that exists but cannot be read or parsed is an error.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> StoreResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no snapshot found, starting empty");
                return Ok(Self::empty(path));
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let snapshot: Snapshot =
            serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(entries = snapshot.tokens.len(), "loaded snapshot");

        Ok(Self {
            path: path.to_path_buf(),
            tokens: snapshot.tokens,
        })
    }

    /// An empty store that will persist to `path`.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            tokens: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, user: &str) -> Option<&str> {
        self.tokens.get(user).map(String::as_str)
    }

    pub fn contains(&self, user: &str) -> bool {
        self.tokens.contains_key(user)
    }

    /// Insert or overwrite. Overwrite policy is the caller's business.
    pub fn put(&mut self, user: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(user.into(), token.into());
    }

    pub fn remove(&mut self, user: &str) -> bool {
        self.tokens.remove(user).is_some()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Write the mapping back, or delete the snapshot once it is empty.
    ///
    /// The new snapshot is written to a temp file next to the target and
    /// renamed over it, so readers never observe a partial file.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display(), entries = self.tokens.len()))]
    pub fn persist(&self) -> StoreResult<()> {
        if self.tokens.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => {
                    debug!("removed empty snapshot");
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(self.write_error(source)),
            };
        }

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.write_error(e))?;

        let snapshot = Snapshot {
            tokens: self.tokens.clone(),
        };
        let mut json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| self.write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        json.push('\n');

        // NamedTempFile is created with owner-only permissions on Unix.
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.write_error(e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;

        debug!("snapshot written");
        Ok(())
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

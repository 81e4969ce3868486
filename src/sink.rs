//! Artifact sinks: where emitted files end up.
//!
//! The emitter never touches the filesystem directly. It hands each rendered
//! artifact to an [`ArtifactSink`] together with a path relative to the
//! project root:
//!
//! - [`FsSink`] writes under a root directory, creating parent directories
//!   for slugs that contain `/`. Every path written during the run is
//!   remembered so a second write to the same path can be reported according
//!   to the [`CollisionPolicy`].
//! - [`MemorySink`] keeps artifacts in a sorted map. The `check` command and
//!   the tests use it to run the whole pipeline without writing anything.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Output path {} was already written in this run", path.display())]
    Collision { path: PathBuf },
}

/// What to do when two artifacts resolve to the same output path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Later artifact replaces the earlier one silently.
    Overwrite,
    /// Log a warning, then overwrite.
    #[default]
    Warn,
    /// Abort the run.
    Error,
}

/// Destination for rendered artifacts.
pub trait ArtifactSink {
    /// Store `content` at `rel`, a path relative to the sink's root.
    fn write(&mut self, rel: &Path, content: &str) -> Result<(), SinkError>;
}

/// Writes artifacts below a root directory.
#[derive(Debug)]
pub struct FsSink {
    root: PathBuf,
    policy: CollisionPolicy,
    written: HashSet<PathBuf>,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>, policy: CollisionPolicy) -> Self {
        Self {
            root: root.into(),
            policy,
            written: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of distinct paths written so far.
    pub fn written(&self) -> usize {
        self.written.len()
    }
}

impl ArtifactSink for FsSink {
    fn write(&mut self, rel: &Path, content: &str) -> Result<(), SinkError> {
        if !self.written.insert(rel.to_path_buf()) {
            match self.policy {
                CollisionPolicy::Overwrite => {}
                CollisionPolicy::Warn => {
                    tracing::warn!(path = %rel.display(), "output path collision, overwriting");
                }
                CollisionPolicy::Error => {
                    return Err(SinkError::Collision {
                        path: rel.to_path_buf(),
                    });
                }
            }
        }

        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote artifact");
        Ok(())
    }
}

/// Collects artifacts in memory, keyed by relative path.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: BTreeMap<PathBuf, String>,
    collisions: Vec<PathBuf>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, rel: impl AsRef<Path>) -> Option<&str> {
        self.files.get(rel.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths that were written more than once, in the order the repeat
    /// writes happened.
    pub fn collisions(&self) -> &[PathBuf] {
        &self.collisions
    }
}

impl ArtifactSink for MemorySink {
    fn write(&mut self, rel: &Path, content: &str) -> Result<(), SinkError> {
        if self
            .files
            .insert(rel.to_path_buf(), content.to_string())
            .is_some()
        {
            self.collisions.push(rel.to_path_buf());
        }
        Ok(())
    }
}

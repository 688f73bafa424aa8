//! Checkpoint Store
//!
//! Persists execution snapshots as one JSON file per execution id under a
//! configured directory. Encoding and writing are separate steps so callers
//! can serialize under a lock and hit the disk outside it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::GateExecutionSnapshot;
use crate::error::GateError;

const CHECKPOINT_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for an execution id. Ids must be a single plain path component.
    pub fn path_for(&self, execution_id: &str) -> Result<PathBuf, GateError> {
        let unusable = execution_id.is_empty()
            || execution_id == "."
            || execution_id == ".."
            || execution_id.contains(['/', '\\', '\0']);
        if unusable {
            return Err(GateError::InvalidExecutionId(execution_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", execution_id, CHECKPOINT_EXTENSION)))
    }

    pub fn encode(snapshot: &GateExecutionSnapshot) -> Result<Vec<u8>, GateError> {
        Ok(serde_json::to_vec_pretty(snapshot)?)
    }

    /// Write pre-encoded snapshot bytes. Each call stages into its own temp
    /// file (mode 0600 on unix) in the checkpoint directory, then renames it
    /// over the target.
    pub fn write(&self, execution_id: &str, bytes: &[u8]) -> Result<PathBuf, GateError> {
        let path = self.path_for(execution_id)?;
        let io_err = |source| GateError::Checkpoint {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(io_err)?;

        let mut staged = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        staged.write_all(bytes).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(&path).map_err(|e| io_err(e.error))?;

        debug!("Checkpoint written: {}", path.display());
        Ok(path)
    }

    pub fn persist(&self, snapshot: &GateExecutionSnapshot) -> Result<PathBuf, GateError> {
        let bytes = Self::encode(snapshot)?;
        self.write(&snapshot.execution_id, &bytes)
    }

    /// Read a snapshot back. `Ok(None)` when nothing was stored under that id.
    pub fn load(&self, execution_id: &str) -> Result<Option<GateExecutionSnapshot>, GateError> {
        let path = self.path_for(execution_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|source| GateError::Checkpoint {
            path: path.clone(),
            source,
        })?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Execution ids with a stored checkpoint, sorted.
    pub fn list(&self) -> Result<Vec<String>, GateError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|source| GateError::Checkpoint {
            path: self.dir.clone(),
            source,
        })?;

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(CHECKPOINT_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::{GateId, GateResult, ScopeAlignmentGate};
    use chrono::Utc;
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn snapshot(id: &str) -> GateExecutionSnapshot {
        let result: GateResult = ScopeAlignmentGate
            .validate("phase_4", "PA03", "MESO_SCORE")
            .into();
        GateExecutionSnapshot {
            execution_id: id.to_string(),
            signal_id: "sig-1".to_string(),
            gate_sequence: GateId::PRE_DISPATCH.to_vec(),
            passed_gates: BTreeSet::new(),
            failed_at: Some(GateId::ScopeAlignment),
            results: vec![result],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_persist_and_load() {
        let tmp = tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path().join("checkpoints"));
        let original = snapshot("exec-1");

        let path = store.persist(&original).unwrap();
        assert!(path.ends_with("exec-1.json"));

        let loaded = store.load("exec-1").unwrap().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(store.list().unwrap(), vec!["exec-1".to_string()]);
    }

    #[test]
    fn test_missing_checkpoint_is_none() {
        let tmp = tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_writers_of_one_id() {
        let tmp = tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..10 {
                        store.persist(&snapshot("shared")).unwrap();
                    }
                });
            }
        });

        assert_eq!(store.load("shared").unwrap().unwrap().execution_id, "shared");
        let files: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(store.list().unwrap(), vec!["shared".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_checkpoint_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        let path = store.persist(&snapshot("exec-mode")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let store = CheckpointStore::new("/tmp/unused");
        for bad in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(store.path_for(bad), Err(GateError::InvalidExecutionId(_))));
        }
    }
}

//! Persistence and in-memory table of per-user voice fingerprints.
//!
//! Each known user has a 256-d embedding persisted as `<uid>.npy` under the
//! configured embeddings directory (see [`crate::voiceprint::EMBEDDING_DIMS`]).
//! The table is read by every `/voice/process` call and replaced wholesale by
//! `/voice/reload-embeddings`; readers must never observe a partially
//! replaced table, so the replacement is a single atomic pointer swap behind
//! a `RwLock` rather than a field-by-field mutation.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::voiceprint::EMBEDDING_DIMS;

/// Outcome of a (re)load pass: which users' fingerprints were found on disk
/// and loaded, and which known users are missing an artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub missing: Vec<String>,
}

/// The live fingerprint table. Cheap to clone (`Arc`-wrapped internally via
/// the caller holding an `Arc<FingerprintStore>`), hot-reloadable.
pub struct FingerprintStore {
    dir: PathBuf,
    known_users: Vec<String>,
    table: RwLock<HashMap<String, Vec<f32>>>,
}

impl FingerprintStore {
    /// Loads every known user's fingerprint from `dir` at construction time.
    /// Missing or malformed files are reported, not fatal: a sidecar can
    /// start degraded and be reconciled later via reload.
    pub fn load(dir: impl Into<PathBuf>, known_users: &[String]) -> (Self, LoadReport) {
        let dir = dir.into();
        let store = Self {
            dir,
            known_users: known_users.to_vec(),
            table: RwLock::new(HashMap::new()),
        };
        let report = store.reload();
        (store, report)
    }

    /// Clears the in-memory table and reloads every known user from disk.
    /// The new table is built off to the side and swapped in with a single
    /// write-lock acquisition, so concurrent readers see either the fully
    /// old or fully new table, never a mix.
    pub fn reload(&self) -> LoadReport {
        let mut fresh = HashMap::new();
        let mut report = LoadReport::default();
        for uid in &self.known_users {
            match load_one(&self.dir, uid) {
                Ok(embedding) => {
                    fresh.insert(uid.clone(), embedding);
                    report.loaded.push(uid.clone());
                }
                Err(e) => {
                    tracing::warn!(user = %uid, error = %e, "voice fingerprint missing or invalid");
                    report.missing.push(uid.clone());
                }
            }
        }
        *self.table.write() = fresh;
        report
    }

    /// Snapshot of all currently loaded `(user_id, embedding)` pairs.
    pub fn snapshot(&self) -> Vec<(String, Vec<f32>)> {
        self.table
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn loaded_users(&self) -> Vec<String> {
        self.table.read().keys().cloned().collect()
    }
}

fn load_one(dir: &Path, uid: &str) -> anyhow::Result<Vec<f32>> {
    let path = dir.join(format!("{uid}.npy"));
    let mut bytes = Vec::new();
    std::fs::File::open(&path)?.read_to_end(&mut bytes)?;
    let npy = npyz::NpyFile::new(&bytes[..])?;
    let shape = npy.shape().to_vec();
    let total: u64 = shape.iter().product();
    if total != EMBEDDING_DIMS as u64 {
        anyhow::bail!(
            "{}: expected {} elements, found shape {:?}",
            path.display(),
            EMBEDDING_DIMS,
            shape
        );
    }
    let data = npy
        .into_vec::<f32>()
        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
    Ok(data)
}

/// Writes a fingerprint artifact for `uid` in the same shape
/// (`[EMBEDDING_DIMS]`, `f32`) that [`load_one`] expects, used by the
/// offline enrollment tool and by tests seeding a scratch directory.
pub fn write_fingerprint(dir: &Path, uid: &str, embedding: &[f32]) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{uid}.npy"));
    let file = std::fs::File::create(&path)?;
    npyz::WriteOptions::new()
        .default_dtype()
        .shape(&[embedding.len() as u64])
        .writer(file)
        .begin_nd()?
        .extend(embedding.iter().copied())?
        .finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vec(dims: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dims];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let emb = unit_vec(EMBEDDING_DIMS, 3);
        write_fingerprint(dir.path(), "dad", &emb).unwrap();

        let users = vec!["dad".to_string(), "mom".to_string()];
        let (store, report) = FingerprintStore::load(dir.path(), &users);
        assert_eq!(report.loaded, vec!["dad".to_string()]);
        assert_eq!(report.missing, vec!["mom".to_string()]);

        let snap = store.snapshot();
        let (_, loaded_emb) = snap.iter().find(|(u, _)| u == "dad").unwrap();
        assert_eq!(loaded_emb, &emb);
    }

    #[test]
    fn wrong_dimension_is_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        write_fingerprint(dir.path(), "dad", &unit_vec(10, 0)).unwrap();

        let users = vec!["dad".to_string()];
        let (_store, report) = FingerprintStore::load(dir.path(), &users);
        assert!(report.loaded.is_empty());
        assert_eq!(report.missing, vec!["dad".to_string()]);
    }

    #[test]
    fn reload_replaces_table_atomically() {
        let dir = tempfile::tempdir().unwrap();
        write_fingerprint(dir.path(), "dad", &unit_vec(EMBEDDING_DIMS, 0)).unwrap();
        let users = vec!["dad".to_string()];
        let (store, _) = FingerprintStore::load(dir.path(), &users);
        assert_eq!(store.loaded_users(), vec!["dad".to_string()]);

        write_fingerprint(dir.path(), "mom", &unit_vec(EMBEDDING_DIMS, 1)).unwrap();
        let users2 = vec!["dad".to_string(), "mom".to_string()];
        let store2_report = {
            let (store2, report) = FingerprintStore::load(dir.path(), &users2);
            let mut loaded = store2.loaded_users();
            loaded.sort();
            (loaded, report)
        };
        assert_eq!(store2_report.0, vec!["dad".to_string(), "mom".to_string()]);
        assert_eq!(store2_report.1.missing.len(), 0);
    }
}

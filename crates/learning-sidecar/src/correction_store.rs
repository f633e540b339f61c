//! Durable, per-state correction storage: four sibling directories keyed by
//! `final_status`, one JSON document per correction.

use std::path::{Path, PathBuf};

use jarvis_domain::error::{Error, Result};
use uuid::Uuid;

use crate::model::Correction;

const SUBDIRS: [&str; 4] = ["pending", "approved", "rejected", "applied"];

pub struct CorrectionStore {
    base_path: PathBuf,
}

impl CorrectionStore {
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        for subdir in SUBDIRS {
            std::fs::create_dir_all(base_path.join(subdir))?;
        }
        Ok(Self { base_path })
    }

    fn path_for(&self, id: Uuid, directory: &str) -> PathBuf {
        self.base_path.join(directory).join(format!("{id}.json"))
    }

    fn find(&self, id: Uuid) -> Option<PathBuf> {
        SUBDIRS
            .iter()
            .map(|d| self.path_for(id, d))
            .find(|p| p.exists())
    }

    /// Writes `correction` to the directory matching its current
    /// `final_status`, removing any stale copy left in a different
    /// directory from a prior save.
    pub fn save(&self, correction: &Correction) -> Result<()> {
        let target = self.path_for(correction.id, correction.final_status.directory());
        let old = self.find(correction.id);

        let text = serde_json::to_string_pretty(correction)?;
        std::fs::write(&target, text)?;

        if let Some(old_path) = old {
            if old_path != target {
                std::fs::remove_file(&old_path)?;
            }
        }
        Ok(())
    }

    pub fn load(&self, id: Uuid) -> Result<Correction> {
        let path = self
            .find(id)
            .ok_or_else(|| Error::NotFound(format!("correction {id} not found")))?;
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// All corrections currently in the `pending` directory, ascending by
    /// `submitted_at`.
    pub fn list_pending(&self) -> Result<Vec<Correction>> {
        let dir = self.base_path.join("pending");
        let mut corrections = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(entry.path())?;
            corrections.push(serde_json::from_str::<Correction>(&text)?);
        }
        corrections.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(corrections)
    }

    pub fn pending_count(&self) -> usize {
        self.list_pending().map(|v| v.len()).unwrap_or(0)
    }

    pub fn health_check(&self) -> bool {
        SUBDIRS
            .iter()
            .all(|d| std::fs::create_dir_all(self.base_path.join(d)).is_ok())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FinalStatus;

    fn store() -> (tempfile::TempDir, CorrectionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CorrectionStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn save_and_load_roundtrips() {
        let (_dir, store) = store();
        let correction = Correction::new("dad".into(), "le ciel est bleu".into(), "user_correction".into());
        store.save(&correction).unwrap();
        let loaded = store.load(correction.id).unwrap();
        assert_eq!(loaded.id, correction.id);
        assert_eq!(loaded.final_status, FinalStatus::Processing);
    }

    #[test]
    fn moving_status_removes_stale_copy() {
        let (_dir, store) = store();
        let mut correction = Correction::new("mom".into(), "test".into(), "user_correction".into());
        store.save(&correction).unwrap();
        assert!(store.base_path().join("pending").join(format!("{}.json", correction.id)).exists());

        correction.final_status = FinalStatus::RejectedGate1;
        store.save(&correction).unwrap();

        assert!(!store.base_path().join("pending").join(format!("{}.json", correction.id)).exists());
        assert!(store.base_path().join("rejected").join(format!("{}.json", correction.id)).exists());
    }

    #[test]
    fn list_pending_sorted_by_submitted_at() {
        let (_dir, store) = store();
        let mut first = Correction::new("dad".into(), "first".into(), "user_correction".into());
        first.submitted_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        let second = Correction::new("dad".into(), "second".into(), "user_correction".into());
        store.save(&second).unwrap();
        store.save(&first).unwrap();

        let pending = store.list_pending().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);
    }

    #[test]
    fn load_missing_id_is_not_found() {
        let (_dir, store) = store();
        let err = store.load(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

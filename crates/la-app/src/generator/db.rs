use std::fs;
use std::path::PathBuf;
use anyhow::Context;
use crate::job::JobRecord;

/// Job history persisted as a JSON array next to the generated images.
pub struct JobDatabase {
    path: PathBuf,
}

impl JobDatabase {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// All stored jobs, newest first. A missing file is an empty history.
    pub fn get_all_jobs(&self) -> anyhow::Result<Vec<JobRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let mut jobs: Vec<JobRecord> = serde_json::from_str(&data)
            .with_context(|| format!("parsing {}", self.path.display()))?;

        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    /// Move an unreadable history aside as `<file>.bak` so a fresh one can start.
    pub fn quarantine(&self) -> anyhow::Result<PathBuf> {
        let backup = self.path.with_extension("json.bak");
        fs::rename(&self.path, &backup)
            .with_context(|| format!("moving {} aside", self.path.display()))?;
        Ok(backup)
    }

    pub fn save_all(&self, jobs: &[JobRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(jobs)?)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use la_core::LineartMode;
    use uuid::Uuid;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = JobDatabase::new(dir.path().join("jobs.json"));
        assert!(db.get_all_jobs().unwrap().is_empty());
    }

    #[test]
    fn test_jobs_come_back_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let db = JobDatabase::new(dir.path().join("jobs.json"));

        let mut older = JobRecord::new(Uuid::new_v4(), LineartMode::Canny, "old".into());
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = JobRecord::new(Uuid::new_v4(), LineartMode::Cutout, "new".into());

        db.save_all(&[older.clone(), newer.clone()]).unwrap();

        let jobs = db.get_all_jobs().unwrap();
        assert_eq!(jobs, vec![newer, older]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "{not json").unwrap();
        assert!(JobDatabase::new(path).get_all_jobs().is_err());
    }

    #[test]
    fn test_quarantine_moves_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "{not json").unwrap();

        let db = JobDatabase::new(path.clone());
        let backup = db.quarantine().unwrap();

        assert_eq!(backup, dir.path().join("jobs.json.bak"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "{not json");
        assert!(!path.exists());
        assert!(db.get_all_jobs().unwrap().is_empty());
    }
}

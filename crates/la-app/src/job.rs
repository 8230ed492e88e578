use std::path::PathBuf;
use chrono::{DateTime, Utc};
use la_core::LineartMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Generating,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Generating)
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Queued => "⏳",
            Self::Generating => "⚡",
            Self::Complete => "✅",
            Self::Failed => "❌",
        }
    }

    pub fn color(&self) -> egui::Color32 {
        match self {
            Self::Queued => egui::Color32::GRAY,
            Self::Generating => egui::Color32::YELLOW,
            Self::Complete => egui::Color32::GREEN,
            Self::Failed => egui::Color32::RED,
        }
    }
}

/// A status change reported by the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub message: Option<String>,
    pub error: Option<String>,
    pub output_path: Option<PathBuf>,
}

impl JobUpdate {
    pub fn generating(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Generating,
            message: Some(message.into()),
            error: None,
            output_path: None,
        }
    }

    pub fn complete(output_path: PathBuf) -> Self {
        Self {
            status: JobStatus::Complete,
            message: Some("Done".into()),
            error: None,
            output_path: Some(output_path),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            message: None,
            error: Some(error.into()),
            output_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: Uuid,
    pub mode: String,
    pub prompt: String,
    pub status: JobStatus,
    pub message: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output_path: Option<PathBuf>,
}

impl JobRecord {
    pub fn new(id: Uuid, mode: LineartMode, prompt: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            mode: mode.id().to_string(),
            prompt,
            status: JobStatus::Queued,
            message: Some("Waiting for backend".into()),
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            output_path: None,
        }
    }

    pub fn apply(&mut self, update: JobUpdate) {
        let now = Utc::now();
        self.status = update.status;
        self.updated_at = now;
        if update.message.is_some() {
            self.message = update.message;
        }
        if update.error.is_some() {
            self.error = update.error;
        }
        if update.output_path.is_some() {
            self.output_path = update.output_path;
        }
        if update.status.is_complete() {
            self.completed_at = Some(now);
        }
    }

    pub fn mode_name(&self) -> &str {
        LineartMode::from_id(&self.mode)
            .map(|m| m.name())
            .unwrap_or(self.mode.as_str())
    }

    /// Seconds from creation to completion, or to `now` while still running.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        let end = self.completed_at.unwrap_or(now);
        (end - self.created_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_queued() {
        let job = JobRecord::new(Uuid::new_v4(), LineartMode::Cutout, "lineart".into());
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.status.is_active());
        assert_eq!(job.mode, "cutout");
        assert_eq!(job.mode_name(), "Line art (cutout)");
    }

    #[test]
    fn test_apply_complete_sets_output_and_timestamp() {
        let mut job = JobRecord::new(Uuid::new_v4(), LineartMode::Canny, "p".into());
        job.apply(JobUpdate::generating("Waiting"));
        assert_eq!(job.status, JobStatus::Generating);
        assert!(job.completed_at.is_none());

        job.apply(JobUpdate::complete(PathBuf::from("outputs/a.png")));
        assert_eq!(job.status, JobStatus::Complete);
        assert!(job.completed_at.is_some());
        assert_eq!(job.output_path, Some(PathBuf::from("outputs/a.png")));
        assert!(job.elapsed_secs(Utc::now()) >= 0);
    }

    #[test]
    fn test_apply_failed_keeps_message() {
        let mut job = JobRecord::new(Uuid::new_v4(), LineartMode::Canny, "p".into());
        job.apply(JobUpdate::failed("HTTP 500"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("HTTP 500"));
        assert_eq!(job.message.as_deref(), Some("Waiting for backend"));
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&JobStatus::Generating).unwrap(), "\"GENERATING\"");
    }
}

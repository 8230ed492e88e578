pub mod backend;
pub mod db;

use image::DynamicImage;
use la_core::LineartJob;
use tracing::{info, warn};
use uuid::Uuid;
use crate::config::AppConfig;
use crate::events::GenEvent;
use crate::generator::backend::GenBackend;
use crate::generator::db::JobDatabase;
use crate::job::{JobRecord, JobUpdate};
use crate::worker::{GenWorker, WorkerCommand};

const JOBS_FILE: &str = "jobs.json";

pub struct Generator {
    worker: GenWorker,
    db: JobDatabase,
    jobs: Vec<JobRecord>,
    config: AppConfig,
}

impl Generator {
    pub fn new<B, F>(config: AppConfig, backend: B, emit: F) -> anyhow::Result<Self>
    where
        B: GenBackend + 'static,
        F: Fn(GenEvent) + Send + 'static,
    {
        let db = JobDatabase::new(config.output_dir.join(JOBS_FILE));
        let worker = GenWorker::new(backend, emit);

        let mut generator = Self {
            worker,
            db,
            jobs: Vec::new(),
            config,
        };
        generator.load_and_cleanup_jobs()?;

        Ok(generator)
    }

    /// Load the job history and fail any job left running by a previous session.
    fn load_and_cleanup_jobs(&mut self) -> anyhow::Result<()> {
        let mut jobs = match self.db.get_all_jobs() {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Job history is unreadable, starting fresh: {:#}", e);
                let backup = self.db.quarantine()?;
                warn!("Previous history kept at {}", backup.display());
                Vec::new()
            }
        };
        info!("Loaded {} jobs from history", jobs.len());

        let mut dirty = false;
        for job in jobs.iter_mut().filter(|j| j.status.is_active()) {
            warn!("Cleaning up stale job {} (was {:?})", job.id, job.status);
            job.apply(JobUpdate::failed("Job interrupted by application shutdown"));
            dirty = true;
        }

        self.jobs = jobs;
        if dirty {
            self.db.save_all(&self.jobs)?;
        }

        Ok(())
    }

    pub fn submit_job(&mut self, job: LineartJob) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        let destination = self.config.make_output_path();
        let record = JobRecord::new(id, job.mode, job.prompt.clone());

        self.jobs.insert(0, record);
        if let Err(e) = self.db.save_all(&self.jobs) {
            self.jobs.retain(|j| j.id != id);
            return Err(e.context("Failed to record job, not submitted"));
        }

        let sent = self.worker.send(WorkerCommand::Generate {
            id,
            job: Box::new(job),
            destination,
        });
        if let Err(e) = sent {
            self.jobs.retain(|j| j.id != id);
            if let Err(save_err) = self.db.save_all(&self.jobs) {
                warn!("Failed to drop unsent job {} from history: {:#}", id, save_err);
            }
            return Err(e.into());
        }

        info!("Queued job {}", id);
        Ok(id)
    }

    pub fn analyze_prompt(&self, image: DynamicImage) -> anyhow::Result<()> {
        self.worker.send(WorkerCommand::AnalyzePrompt {
            image,
            post_filter: self.config.post_filter,
        })?;
        Ok(())
    }

    pub fn load_loras(&self) -> anyhow::Result<()> {
        self.worker.send(WorkerCommand::LoadLoras)?;
        Ok(())
    }

    /// Apply a worker update. Only terminal states are written to disk.
    pub fn update_job_status(&mut self, id: Uuid, update: JobUpdate) -> anyhow::Result<Option<&JobRecord>> {
        let Some(index) = self.jobs.iter().position(|j| j.id == id) else {
            warn!("Status update for unknown job {}", id);
            return Ok(None);
        };

        let terminal = update.status.is_complete();
        self.jobs[index].apply(update);
        if terminal {
            self.db.save_all(&self.jobs)?;
        }

        Ok(self.jobs.get(index))
    }

    pub fn remove_job(&mut self, id: Uuid) -> anyhow::Result<()> {
        self.jobs.retain(|j| j.id != id || j.status.is_active());
        self.db.save_all(&self.jobs)
    }

    pub fn clear_completed(&mut self) -> anyhow::Result<()> {
        self.jobs.retain(|j| !j.status.is_complete());
        self.db.save_all(&self.jobs)
    }

    pub fn get_job(&self, id: Uuid) -> Option<&JobRecord> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn has_active_jobs(&self) -> bool {
        self.jobs.iter().any(|j| j.status.is_active())
    }
}

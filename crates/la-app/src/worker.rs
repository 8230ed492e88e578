use std::path::PathBuf;
use std::sync::mpsc::{channel, Sender};
use std::thread::{self, JoinHandle};
use image::DynamicImage;
use la_core::{prompt, LineartJob};
use tracing::{error, info};
use uuid::Uuid;
use crate::error::AppError;
use crate::events::GenEvent;
use crate::generator::backend::{save_output, GenBackend};
use crate::job::JobUpdate;

pub enum WorkerCommand {
    Generate {
        id: Uuid,
        job: Box<LineartJob>,
        destination: PathBuf,
    },
    AnalyzePrompt {
        image: DynamicImage,
        post_filter: bool,
    },
    LoadLoras,
    Shutdown,
}

/// Runs backend calls one at a time on a background thread and reports
/// results through `emit`.
pub struct GenWorker {
    command_tx: Sender<WorkerCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl GenWorker {
    pub fn new<B, F>(backend: B, emit: F) -> Self
    where
        B: GenBackend + 'static,
        F: Fn(GenEvent) + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = channel::<WorkerCommand>();

        let thread_handle = thread::spawn(move || {
            loop {
                match cmd_rx.recv() {
                    Ok(WorkerCommand::Generate { id, job, destination }) => {
                        emit(GenEvent::JobStatus {
                            id,
                            update: JobUpdate::generating(format!("Generating {}", job.mode.name())),
                        });

                        let update = match run_generate(&backend, &job, &destination) {
                            Ok(()) => {
                                info!("Job {} complete: {}", id, destination.display());
                                JobUpdate::complete(destination)
                            }
                            Err(e) => {
                                error!("Job {} failed: {:#}", id, e);
                                JobUpdate::failed(format!("{:#}", e))
                            }
                        };

                        emit(GenEvent::JobStatus { id, update });
                    }

                    Ok(WorkerCommand::AnalyzePrompt { image, post_filter }) => {
                        let result = backend
                            .interrogate(&image)
                            .map(|tags| if post_filter { prompt::remove_color(&tags) } else { tags })
                            .map_err(|e| format!("Prompt analysis failed: {:#}", e));
                        emit(GenEvent::PromptAnalyzed(result));
                    }

                    Ok(WorkerCommand::LoadLoras) => {
                        let result = backend
                            .list_loras()
                            .map_err(|e| format!("Failed to load LoRA models: {:#}", e));
                        emit(GenEvent::LorasLoaded(result));
                    }

                    Ok(WorkerCommand::Shutdown) => {
                        break;
                    }

                    Err(_) => {
                        break;
                    }
                }
            }
        });

        Self {
            command_tx: cmd_tx,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn send(&self, command: WorkerCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .map_err(|e| AppError::WorkerError(format!("Failed to send command to worker: {}", e)))
    }

    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for GenWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_generate<B: GenBackend>(backend: &B, job: &LineartJob, destination: &std::path::Path) -> anyhow::Result<()> {
    let image = backend.generate(job)?;
    save_output(&image, destination)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;
    use image::{Rgb, RgbImage};
    use la_core::{LineartMode, PromptInputs};
    use crate::generator::backend::schemas::LoraInfo;
    use crate::job::JobStatus;

    /// Backend double that answers instantly from canned data.
    pub struct FakeBackend {
        pub fail: bool,
    }

    impl GenBackend for FakeBackend {
        fn generate(&self, job: &LineartJob) -> anyhow::Result<DynamicImage> {
            if self.fail {
                anyhow::bail!("backend offline");
            }
            let (w, h) = job.output_size;
            Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([0, 0, 0]))))
        }

        fn list_loras(&self) -> anyhow::Result<Vec<LoraInfo>> {
            Ok(vec![LoraInfo { name: "ink".into(), alias: "ink".into() }])
        }

        fn interrogate(&self, _image: &DynamicImage) -> anyhow::Result<String> {
            Ok("1girl, blue eyes, smile".into())
        }
    }

    pub fn cutout_job() -> LineartJob {
        let input = DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 24, Rgb([90, 90, 90])));
        LineartJob::prepare(LineartMode::Cutout, &input, None, &PromptInputs::default()).unwrap()
    }

    fn worker(fail: bool) -> (GenWorker, Receiver<GenEvent>) {
        let (tx, rx) = mpsc::channel();
        let worker = GenWorker::new(FakeBackend { fail }, move |e| {
            let _ = tx.send(e);
        });
        (worker, rx)
    }

    fn next(rx: &Receiver<GenEvent>) -> GenEvent {
        rx.recv_timeout(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_generate_reports_progress_then_completion() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.png");
        let (worker, rx) = worker(false);
        let id = Uuid::new_v4();

        worker.send(WorkerCommand::Generate {
            id,
            job: Box::new(cutout_job()),
            destination: destination.clone(),
        }).unwrap();

        match next(&rx) {
            GenEvent::JobStatus { id: got, update } => {
                assert_eq!(got, id);
                assert_eq!(update.status, JobStatus::Generating);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match next(&rx) {
            GenEvent::JobStatus { update, .. } => {
                assert_eq!(update.status, JobStatus::Complete);
                assert_eq!(update.output_path.as_deref(), Some(destination.as_path()));
            }
            other => panic!("unexpected event {:?}", other),
        }

        let saved = image::open(&destination).unwrap();
        assert_eq!((saved.width(), saved.height()), (24, 24));
    }

    #[test]
    fn test_generate_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (worker, rx) = worker(true);

        worker.send(WorkerCommand::Generate {
            id: Uuid::new_v4(),
            job: Box::new(cutout_job()),
            destination: dir.path().join("out.png"),
        }).unwrap();

        let _ = next(&rx);
        match next(&rx) {
            GenEvent::JobStatus { update, .. } => {
                assert_eq!(update.status, JobStatus::Failed);
                assert!(update.error.unwrap().contains("backend offline"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_analyze_prompt_applies_post_filter() {
        let (worker, rx) = worker(false);
        let image = DynamicImage::ImageRgb8(RgbImage::new(2, 2));

        worker.send(WorkerCommand::AnalyzePrompt { image: image.clone(), post_filter: true }).unwrap();
        assert!(matches!(next(&rx), GenEvent::PromptAnalyzed(Ok(tags)) if tags == "1girl, smile"));

        worker.send(WorkerCommand::AnalyzePrompt { image, post_filter: false }).unwrap();
        assert!(matches!(next(&rx), GenEvent::PromptAnalyzed(Ok(tags)) if tags == "1girl, blue eyes, smile"));
    }

    #[test]
    fn test_load_loras() {
        let (worker, rx) = worker(false);
        worker.send(WorkerCommand::LoadLoras).unwrap();
        assert!(matches!(next(&rx), GenEvent::LorasLoaded(Ok(loras)) if loras.len() == 1));
    }

    #[test]
    fn test_send_after_shutdown_fails() {
        let (mut worker, _rx) = worker(false);
        worker.shutdown();
        assert!(matches!(worker.send(WorkerCommand::LoadLoras), Err(AppError::WorkerError(_))));
    }
}

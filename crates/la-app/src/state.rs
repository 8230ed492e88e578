use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Context;
use image::{DynamicImage, GrayImage};
use la_core::{imaging, LineartJob, LineartMode, PromptInputs};
use tracing::{info, warn};
use uuid::Uuid;
use wgpu::StoreOp;
use winit::event::WindowEvent;
use winit::event_loop::EventLoopProxy;
use winit::window::Window;
use crate::config::AppConfig;
use crate::events::{AppEvent, GenEvent, LaEvent, Notice, NoticeLevel};
use crate::generator::backend::SdBackend;
use crate::generator::Generator;
use crate::gfx::GfxState;
use crate::job::{JobRecord, JobStatus};
use crate::ui;
use crate::ui::{UiContext, UiEvent, UiState};

/// The image the user picked.
struct SourceImage {
    path: PathBuf,
    image: DynamicImage,
}

pub struct AppState {
    pub(crate) window: Arc<Window>,
    event_loop_proxy: Arc<EventLoopProxy<LaEvent>>,

    pub gfx: GfxState,
    pub ui: UiState,

    config: AppConfig,
    generator: Generator,

    source: Option<SourceImage>,
    lineart: Option<GrayImage>,
}

impl AppState {
    pub async fn new(
        window: Arc<Window>,
        event_loop_proxy: Arc<EventLoopProxy<LaEvent>>,
        config: AppConfig,
    ) -> anyhow::Result<Self> {
        let backend = SdBackend::new(&config)?;
        let proxy = event_loop_proxy.clone();
        let generator = Generator::new(config.clone(), backend, move |e| {
            if let Err(err) = proxy.send_event(LaEvent::Gen(e)) {
                warn!("Dropped worker event, event loop is closed: {}", err);
            }
        })?;

        let gfx = GfxState::new(window.clone()).await?;
        let ui_ctx = UiContext::new(
            event_loop_proxy.clone(),
            config.api_url.clone(),
            config.device.can_open_folders(),
        );
        let mut ui_state = UiState::new(&gfx, window.clone(), ui_ctx);

        ui_state.add_component(Box::new(ui::TopPanel::default()));
        ui_state.add_component(Box::new(ui::SidePanel::default()));
        ui_state.add_component(Box::new(ui::QueuePanel::default()));
        ui_state.add_component(Box::new(ui::CentralPanel::default()));
        ui_state.set_jobs(generator.get_jobs().to_vec());

        Ok(Self {
            window,
            event_loop_proxy,
            gfx,
            ui: ui_state,
            config,
            generator,
            source: None,
            lineart: None,
        })
    }

    pub fn push_event(&self, event: AppEvent) {
        if let Err(e) = self.event_loop_proxy.send_event(LaEvent::App(event)) {
            warn!("Dropped app event, event loop is closed: {}", e);
        }
    }

    fn notify(&self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            NoticeLevel::Info => info!("{}", text),
            NoticeLevel::Warning => warn!("{}", text),
        }
        self.push_event(AppEvent::Notice(Notice { level, text }));
    }

    fn refresh_jobs(&mut self) {
        self.ui.set_jobs(self.generator.get_jobs().to_vec());
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.gfx.resize(new_size);
    }

    /// Let egui see the window event. Returns `(consumed, repaint)`.
    pub fn input(&mut self, event: &WindowEvent) -> (bool, bool) {
        let response = self.ui.egui_state.on_window_event(&self.window, event);
        (response.consumed, response.repaint)
    }

    /// Draw one frame. Returns whether egui wants another one right away.
    pub fn render(&mut self) -> anyhow::Result<bool> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Ok(false);
        }

        let output = match self.gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.gfx.reconfigure();
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gfx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder")
        });

        let full_output = self.ui.draw(&self.window);

        let platform_output = full_output.platform_output.clone();
        self.ui.egui_state.handle_platform_output(&self.window, platform_output);

        let wants_repaint = full_output
            .viewport_output
            .get(&egui::ViewportId::ROOT)
            .is_some_and(|v| v.repaint_delay.is_zero());

        let paint_jobs = self.ui.egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_desc = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.ui.egui_renderer.update_texture(&self.gfx.device, &self.gfx.queue, *id, delta);
        }

        let mut commands = self.ui.egui_renderer.update_buffers(
            &self.gfx.device,
            &self.gfx.queue,
            &mut encoder,
            &paint_jobs,
            &screen_desc,
        );

        {
            let rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            self.ui.egui_renderer.render(&mut rpass.forget_lifetime(), &paint_jobs, &screen_desc);
        }

        for id in &full_output.textures_delta.free {
            self.ui.egui_renderer.free_texture(id);
        }

        commands.push(encoder.finish());
        self.gfx.queue.submit(commands);
        output.present();

        Ok(wants_repaint)
    }

    pub fn on_ui_event(&mut self, event: UiEvent) {
        let result = match event {
            UiEvent::PickImage => self.pick_image(),
            UiEvent::ExtractLineart { low, high } => self.extract_lineart(low, high),
            UiEvent::AnalyzePrompt => self.analyze_prompt(),
            UiEvent::RefreshLoras => self.generator.load_loras(),
            UiEvent::Generate { mode, inputs } => self.generate(mode, inputs),
            UiEvent::CopyOutputPath => {
                self.copy_output_path();
                Ok(())
            }
            UiEvent::OpenOutputFolder => self.open_output_folder(),
            UiEvent::ShowOutput(id) => self.show_job_output(id),
            UiEvent::RemoveJob(id) => {
                let removed = self.generator.remove_job(id);
                if self.ui.ui_ctx.current_job_id == Some(id) {
                    self.ui.ui_ctx.current_job_id = None;
                }
                self.refresh_jobs();
                removed
            }
            UiEvent::ClearCompletedJobs => {
                let cleared = self.generator.clear_completed();
                self.refresh_jobs();
                cleared
            }
        };

        if let Err(e) = result {
            self.notify(NoticeLevel::Warning, format!("{:#}", e));
        }
    }

    fn pick_image(&mut self) -> anyhow::Result<()> {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
            .pick_file();

        match picked {
            Some(path) => self.set_source_image(path),
            None => Ok(()),
        }
    }

    fn set_source_image(&mut self, path: PathBuf) -> anyhow::Result<()> {
        let image = imaging::load_image(&path)?;
        let preview = self.ui.make_preview("input", &image);

        self.ui.ui_ctx.input = Some(preview);
        self.ui.ui_ctx.input_path = Some(path.clone());
        self.ui.ui_ctx.lineart = None;
        self.lineart = None;
        self.source = Some(SourceImage { path, image });
        Ok(())
    }

    fn require_source(&self) -> Option<&SourceImage> {
        if self.source.is_none() {
            self.notify(NoticeLevel::Warning, "Please select an image");
        }
        self.source.as_ref()
    }

    fn extract_lineart(&mut self, low: f32, high: f32) -> anyhow::Result<()> {
        let Some(source) = self.require_source() else {
            return Ok(());
        };

        info!("Extracting line art from {}", source.path.display());
        let lineart = imaging::canny_lineart(&source.image, low, high);
        let preview = self.ui.make_preview("lineart", &DynamicImage::ImageLuma8(lineart.clone()));

        self.ui.ui_ctx.lineart = Some(preview);
        self.lineart = Some(lineart);
        Ok(())
    }

    fn analyze_prompt(&mut self) -> anyhow::Result<()> {
        let Some(source) = self.require_source() else {
            self.push_event(AppEvent::PromptAnalysisFailed);
            return Ok(());
        };

        let image = source.image.clone();
        if let Err(e) = self.generator.analyze_prompt(image) {
            self.push_event(AppEvent::PromptAnalysisFailed);
            return Err(e);
        }
        Ok(())
    }

    fn generate(&mut self, mode: LineartMode, inputs: PromptInputs) -> anyhow::Result<()> {
        let Some(source) = self.require_source() else {
            return Ok(());
        };
        if self.generator.has_active_jobs() {
            self.notify(NoticeLevel::Warning, "A generation is already running");
            return Ok(());
        }
        if mode.requires_lineart() && self.lineart.is_none() {
            self.notify(NoticeLevel::Warning, "Line art required: extract it first");
            return Ok(());
        }

        let job = LineartJob::prepare(mode, &source.image, self.lineart.as_ref(), &inputs)?;
        self.generator.submit_job(job)?;

        self.refresh_jobs();
        self.push_event(AppEvent::JobQueued);
        Ok(())
    }

    fn copy_output_path(&mut self) {
        match &self.ui.ui_ctx.output_path {
            Some(path) => {
                self.ui.egui_ctx.copy_text(path.display().to_string());
                self.notify(NoticeLevel::Info, "Output path copied to clipboard");
            }
            None => self.notify(NoticeLevel::Warning, "Please select an image"),
        }
    }

    fn open_output_folder(&self) -> anyhow::Result<()> {
        self.config.device.open_folder(&self.config.output_dir)?;
        Ok(())
    }

    fn show_job_output(&mut self, id: Uuid) -> anyhow::Result<()> {
        let Some(path) = self.generator.get_job(id).and_then(|j| j.output_path.clone()) else {
            self.notify(NoticeLevel::Warning, "Job has no output yet");
            return Ok(());
        };

        self.show_output(&path)?;
        self.ui.ui_ctx.current_job_id = Some(id);
        Ok(())
    }

    fn show_output(&mut self, path: &Path) -> anyhow::Result<()> {
        let image = imaging::load_image(path)
            .with_context(|| format!("Output image not found at {}", path.display()))?;
        self.ui.ui_ctx.output = Some(self.ui.make_preview("output", &image));
        self.ui.ui_ctx.output_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Handle results coming back from the worker thread.
    pub fn on_gen_event(&mut self, event: GenEvent) -> anyhow::Result<()> {
        match event {
            GenEvent::JobStatus { id, update } => {
                info!("Job status update: {} - {:?}", id, update.status);

                let Some(record) = self.generator.update_job_status(id, update)?.cloned() else {
                    return Ok(());
                };
                self.refresh_jobs();
                self.announce(&record)?;
            }
            GenEvent::PromptAnalyzed(Ok(tags)) => {
                self.push_event(AppEvent::PromptAnalyzed(tags));
            }
            GenEvent::PromptAnalyzed(Err(e)) => {
                self.push_event(AppEvent::PromptAnalysisFailed);
                self.notify(NoticeLevel::Warning, e);
            }
            GenEvent::LorasLoaded(Ok(loras)) => {
                self.ui.ui_ctx.loras = loras.iter().map(|l| l.label()).collect();
                self.notify(NoticeLevel::Info, format!("Loaded {} LoRA models", loras.len()));
            }
            GenEvent::LorasLoaded(Err(e)) => {
                self.notify(NoticeLevel::Warning, e);
            }
        }

        Ok(())
    }

    fn announce(&mut self, record: &JobRecord) -> anyhow::Result<()> {
        match record.status {
            JobStatus::Complete => {
                if let Some(path) = &record.output_path {
                    self.show_output(path)?;
                    self.ui.ui_ctx.current_job_id = Some(record.id);
                }
                self.push_event(AppEvent::JobComplete);
                self.notify(NoticeLevel::Info, "Generation complete");
            }
            JobStatus::Failed => {
                let error = record.error.as_deref().unwrap_or("Unknown error");
                self.notify(NoticeLevel::Warning, format!("Generation failed: {}", error));
            }
            JobStatus::Queued | JobStatus::Generating => {
                if let Some(message) = &record.message {
                    self.notify(NoticeLevel::Info, message.clone());
                }
            }
        }

        Ok(())
    }
}

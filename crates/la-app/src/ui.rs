mod top_panel;
mod side_panel;
mod central_panel;
mod queue_panel;

pub use top_panel::TopPanel;
pub use side_panel::SidePanel;
pub use central_panel::CentralPanel;
pub use queue_panel::QueuePanel;

use std::path::PathBuf;
use std::sync::Arc;
use egui::{Context, TextureHandle};
use image::DynamicImage;
use la_core::{LineartMode, PromptInputs};
use tracing::warn;
use uuid::Uuid;
use winit::event_loop::EventLoopProxy;
use winit::window::Window;
use crate::events::{AppEvent, LaEvent, Notice};
use crate::gfx::GfxState;
use crate::job::JobRecord;

#[derive(Debug, Clone)]
pub enum UiEvent {
    PickImage,
    ExtractLineart {
        low: f32,
        high: f32,
    },
    AnalyzePrompt,
    RefreshLoras,
    Generate {
        mode: LineartMode,
        inputs: PromptInputs,
    },
    CopyOutputPath,
    OpenOutputFolder,

    // Jobs
    ShowOutput(Uuid),
    RemoveJob(Uuid),
    ClearCompletedJobs,
}

/// A decoded image together with its GPU texture.
pub struct Preview {
    pub texture: TextureHandle,
    pub size: [u32; 2],
}

/// App-side state the components read while drawing.
pub struct UiContext {
    pub jobs: Vec<JobRecord>,
    pub current_job_id: Option<Uuid>,
    pub input_path: Option<PathBuf>,
    pub input: Option<Preview>,
    pub lineart: Option<Preview>,
    pub output: Option<Preview>,
    pub output_path: Option<PathBuf>,
    pub loras: Vec<String>,
    pub notice: Option<Notice>,
    pub api_url: String,
    pub can_open_folders: bool,
    pub event_loop_proxy: Arc<EventLoopProxy<LaEvent>>,
}

impl UiContext {
    pub fn new(event_loop_proxy: Arc<EventLoopProxy<LaEvent>>, api_url: String, can_open_folders: bool) -> Self {
        Self {
            jobs: Vec::new(),
            current_job_id: None,
            input_path: None,
            input: None,
            lineart: None,
            output: None,
            output_path: None,
            loras: Vec::new(),
            notice: None,
            api_url,
            can_open_folders,
            event_loop_proxy,
        }
    }

    pub fn send_event(&self, event: UiEvent) {
        if let Err(e) = self.event_loop_proxy.send_event(LaEvent::Ui(event)) {
            warn!("Dropped UI event, event loop is closed: {}", e);
        }
    }

    pub fn is_busy(&self) -> bool {
        self.jobs.iter().any(|j| j.status.is_active())
    }

    /// Whether `mode` has everything it needs to submit.
    pub fn is_ready(&self, mode: LineartMode) -> bool {
        self.input.is_some() && (!mode.requires_lineart() || self.lineart.is_some())
    }
}

pub struct UiState {
    pub(crate) egui_state: egui_winit::State,
    pub(crate) egui_ctx: egui::Context,
    pub(crate) egui_renderer: egui_wgpu::Renderer,

    components: Vec<Box<dyn UiComponent>>,
    pub(crate) ui_ctx: UiContext,
}

impl UiState {
    pub fn new(gfx: &GfxState, window: Arc<Window>, ui_ctx: UiContext) -> Self {
        let egui_ctx = egui::Context::default();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &gfx.device, gfx.config.format, egui_wgpu::RendererOptions::default());

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
            components: Vec::new(),
            ui_ctx,
        }
    }

    pub fn draw(&mut self, window: &Window) -> egui::FullOutput {
        let raw_input = self.egui_state.take_egui_input(window);

        self.egui_ctx.run(raw_input, |ctx| {
            for component in self.components.iter_mut() {
                component.show(ctx, &self.ui_ctx);
            }
        })
    }

    pub fn add_component(&mut self, component: Box<dyn UiComponent>) {
        self.components.push(component);
    }

    pub fn set_jobs(&mut self, jobs: Vec<JobRecord>) {
        self.ui_ctx.jobs = jobs;
    }

    pub fn on_app_event(&mut self, e: &AppEvent) {
        if let AppEvent::Notice(notice) = e {
            self.ui_ctx.notice = Some(notice.clone());
        }
        for component in self.components.iter_mut() {
            component.on_app_event(e);
        }
    }

    pub fn make_preview(&self, name: &str, image: &DynamicImage) -> Preview {
        let rgba = image.to_rgba8();
        let size = [rgba.width(), rgba.height()];
        let color = egui::ColorImage::from_rgba_unmultiplied(
            [size[0] as usize, size[1] as usize],
            rgba.as_raw(),
        );

        Preview {
            texture: self.egui_ctx.load_texture(name, color, egui::TextureOptions::LINEAR),
            size,
        }
    }
}

pub trait UiComponent {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext);

    fn on_app_event(&mut self, _e: &AppEvent) {}
}

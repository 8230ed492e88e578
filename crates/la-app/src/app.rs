use std::sync::Arc;
use winit::{
    event::*,
    event_loop::ActiveEventLoop,
};
use winit::application::ApplicationHandler;
use winit::event_loop::{EventLoop, EventLoopProxy};
use winit::window::{WindowAttributes, WindowId};
use tracing::error;
use crate::config::AppConfig;
use crate::events::LaEvent;
use crate::state::AppState;

pub struct App {
    event_loop_proxy: Arc<EventLoopProxy<LaEvent>>,
    config: AppConfig,
    state: Option<AppState>,
    needs_redraw: bool,
}

impl App {
    pub fn new(event_loop: &EventLoop<LaEvent>, config: AppConfig) -> Self {
        let event_loop_proxy = Arc::new(event_loop.create_proxy());

        Self {
            event_loop_proxy,
            config,
            state: None,
            needs_redraw: false,
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attributes = WindowAttributes::default()
            .with_title("Line Art Assistant")
            .with_inner_size(winit::dpi::LogicalSize::new(1600.0, 900.0));

        let window = Arc::new(event_loop.create_window(window_attributes)?);

        pollster::block_on(AppState::new(
            window,
            self.event_loop_proxy.clone(),
            self.config.clone(),
        ))
    }
}

impl ApplicationHandler<LaEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                self.needs_redraw = true;
            }
            Err(e) => {
                error!("Failed to start: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: LaEvent) {
        let Some(state) = &mut self.state else {
            return;
        };

        match event {
            LaEvent::Ui(e) => state.on_ui_event(e),
            LaEvent::App(e) => state.ui.on_app_event(&e),
            LaEvent::Gen(e) => {
                if let Err(e) = state.on_gen_event(e) {
                    error!("Error handling gen event: {:#}", e);
                }
            }
        }

        self.needs_redraw = true;
        state.window.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        if state.window.id() != window_id {
            return;
        }

        // Let egui handle the event first
        let (consumed, repaint) = state.input(&event);

        if repaint {
            self.needs_redraw = true;
            state.window.request_redraw();
        }

        if consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                state.resize(physical_size);
                self.needs_redraw = true;
            }
            WindowEvent::RedrawRequested => {
                match state.render() {
                    Ok(again) => self.needs_redraw = again,
                    Err(e) => {
                        error!("Render failed: {:#}", e);
                        self.needs_redraw = false;
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.needs_redraw {
            if let Some(state) = &self.state {
                state.window.request_redraw();
            }
        }
    }
}

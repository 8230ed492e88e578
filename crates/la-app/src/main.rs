mod app;
mod config;
mod error;
mod events;
mod generator;
mod gfx;
mod job;
mod state;
mod ui;
mod worker;

use std::error::Error;
use winit::event_loop::{ControlFlow, EventLoop};
use crate::config::AppConfig;
use crate::events::LaEvent;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let config = AppConfig::load()?;
    tracing::info!("Using backend at {}", config.api_url);

    let event_loop: EventLoop<LaEvent> = EventLoop::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = app::App::new(&event_loop, config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

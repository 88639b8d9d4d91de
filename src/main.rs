// src/main.rs

mod app;
mod ui;

use std::sync::Arc;

use winit::{
    dpi::LogicalSize,
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::WindowBuilder,
};

use app::{AppConfig, DemoApp};

pub async fn run() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::default();
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.logical_size.0, config.logical_size.1))
            .build(&event_loop)?,
    );

    let mut app_state = DemoApp::new(window.clone(), &config).await?;

    event_loop.run(move |event, target: &EventLoopWindowTarget<()>| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => {
                if !app_state.handle_window_event(event) {
                    match event {
                        WindowEvent::CloseRequested => {
                            app_state.shutdown();
                            target.exit();
                        }
                        WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                            app_state.resize();
                        }
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                if let Err(err) = app_state.frame() {
                    log::error!("{}", err);
                    target.exit();
                }

                if !target.exiting() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    })?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

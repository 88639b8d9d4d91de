// src/app.rs

use std::sync::Arc;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::event::WindowEvent;
use winit::window::Window;

use crate::ui::{build_ui, UiOutput};
use procedural_scenes::engine_lib::context::DemoContext;
use procedural_scenes::engine_lib::render_loop::{Clock, RenderLoop};
use procedural_scenes::rendering_lib::renderer::WgpuBackend;
use procedural_scenes::{DemoKind, SceneError};

pub struct AppConfig {
    pub title: String,
    pub logical_size: (f64, f64),
    pub present_mode: wgpu::PresentMode,
    pub initial_demo: DemoKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Procedural Scenes".to_string(),
            logical_size: (1024.0, 768.0),
            present_mode: wgpu::PresentMode::Fifo,
            initial_demo: DemoKind::Fireflies,
        }
    }
}

pub struct DemoApp {
    window: Arc<Window>,
    backend: WgpuBackend,
    demo: DemoContext,
    render_loop: RenderLoop,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl DemoApp {
    pub async fn new(window: Arc<Window>, config: &AppConfig) -> anyhow::Result<Self> {
        let mut backend = WgpuBackend::new(window.clone(), config.present_mode).await?;
        let demo = DemoContext::new(
            config.initial_demo.definition(),
            &mut backend,
            window.as_ref(),
            StdRng::from_entropy(),
        )
        .with_context(|| format!("failed to start demo '{}'", config.initial_demo.name()))?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(backend.device(), backend.surface_format(), None, 1);

        Ok(Self {
            window,
            backend,
            demo,
            render_loop: RenderLoop::new(Clock::new()),
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn resize(&mut self) {
        self.demo.resize(&mut self.backend, self.window.as_ref());
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        if self.egui_state.on_window_event(&self.window, event).consumed {
            return true;
        }
        self.demo.handle_window_event(event, self.window.scale_factor())
    }

    /// Disposes the running demo and starts `kind` with a fresh clock.
    pub fn switch_demo(&mut self, kind: DemoKind) -> Result<(), SceneError> {
        log::info!("switching from '{}' to '{}'", self.demo.kind().name(), kind.name());
        self.demo.dispose(&mut self.backend)?;
        self.demo = DemoContext::new(
            kind.definition(),
            &mut self.backend,
            self.window.as_ref(),
            StdRng::from_entropy(),
        )?;
        self.render_loop = RenderLoop::new(Clock::new());
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.render_loop.stop();
        if let Err(err) = self.demo.dispose(&mut self.backend) {
            log::warn!("{}", err);
        }
    }

    pub fn frame(&mut self) -> Result<(), SceneError> {
        let Some(time) = self.render_loop.tick() else {
            return Ok(());
        };
        self.demo.frame(&mut self.backend, time)?;

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let current = self.demo.kind();
        let params = self.demo.params();
        let mut ui_output = UiOutput::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_output = build_ui(ctx, current, params);
        });
        self.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);
        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(self.backend.device(), self.backend.queue(), *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: self.backend.surface_size(),
            pixels_per_point: self.backend.pixel_ratio(),
        };
        let egui_renderer = &mut self.egui_renderer;
        self.backend.present_with(|device, queue, encoder, view| {
            egui_renderer.update_buffers(device, queue, encoder, &tris, &screen_descriptor);
            let mut gui_render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            egui_renderer.render(&mut gui_render_pass, &tris, &screen_descriptor);
        });
        for tex_id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(tex_id);
        }

        for (name, value) in ui_output.edits {
            if let Err(err) = self.demo.set_parameter(&name, value) {
                log::warn!("rejected edit of '{}': {}", name, err);
            }
        }
        if let Some(kind) = ui_output.selected_demo {
            self.switch_demo(kind)?;
        }
        Ok(())
    }
}

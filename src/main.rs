use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use glam::Vec2;

mod config;
mod logger;
mod math;
mod renderer;
mod sketch;
mod ui;

use config::{CliArgs, Color, SketchConfig};
use renderer::{Camera, GpuState};
use sketch::{DeformOutcome, FalloffKernel, Sketcher, StrokeOutcome};
use ui::{SceneStats, UiActions, UiState, apply_theme, draw_help_overlay, draw_side_panel};

#[derive(Default)]
struct InputState {
    forward: f32,
    right: f32,
    mouse_captured: bool,
    mouse_delta: Vec2,
    cursor: Option<Vec2>,
}

struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: Camera,
    sketcher: Sketcher,
    ui_state: UiState,
    input: InputState,

    last_frame: Instant,
    frame_count: u32,
    fps_timer: Instant,
    fps: f32,

    last_vsync_state: bool,
}

impl App {
    fn new(config: SketchConfig) -> Self {
        let ui_state = UiState::from_config(&config);
        let sketcher = Sketcher::new(config);

        let mut camera = Camera::standing_at(0.0, sketcher.config().camera_height, 3.5);
        if let Some(y) = sketcher.walk_height(camera.position.x, camera.position.z) {
            camera.set_eye_height(y);
        }

        Self {
            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera,
            sketcher,
            last_vsync_state: ui_state.vsync_enabled,
            ui_state,
            input: InputState::default(),

            last_frame: Instant::now(),
            frame_count: 0,
            fps_timer: Instant::now(),
            fps: 0.0,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let mut gpu = pollster::block_on(GpuState::new(window.clone()))?;
        gpu.upload_sky(self.sketcher.sky());

        let size = window.inner_size();
        self.camera
            .set_aspect(size.width as f32, size.height as f32);

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
        Ok(())
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_count += 1;
        if self.fps_timer.elapsed().as_secs_f32() >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer.elapsed().as_secs_f32();
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }

        let look = std::mem::take(&mut self.input.mouse_delta);
        if self.sketcher.is_drawing() {
            return;
        }

        if self.input.mouse_captured {
            self.camera.process_mouse_movement(look);
        }

        let walked = self
            .camera
            .process_keyboard(self.input.forward, self.input.right, dt);
        if walked {
            let position = self.camera.position;
            if let Some(y) = self.sketcher.walk_height(position.x, position.z) {
                self.camera.set_eye_height(y);
            }
            self.sketcher.refresh_orientation(self.camera.position);
        }
    }

    fn cursor_ndc(&self) -> Option<Vec2> {
        let cursor = self.input.cursor?;
        let gpu = self.gpu.as_ref()?;
        Some(Camera::cursor_to_ndc(
            cursor,
            gpu.config.width as f32,
            gpu.config.height as f32,
        ))
    }

    fn handle_left_button(&mut self, pressed: bool) {
        if self.input.mouse_captured {
            return;
        }
        let Some(ndc) = self.cursor_ndc() else {
            return;
        };

        if pressed {
            self.sketcher.begin_stroke(ndc, &self.camera);
            return;
        }

        match self.sketcher.end_stroke(ndc, &self.camera) {
            StrokeOutcome::NoStroke => {}
            StrokeOutcome::Placed { index, report } => {
                log::debug!("billboard {index}: {} projected, {} missed", report.projected, report.missed);
            }
            StrokeOutcome::Terrain(DeformOutcome::Applied { .. }) => {
                // Standing on a hill that just grew.
                let position = self.camera.position;
                if let Some(y) = self.sketcher.walk_height(position.x, position.z) {
                    self.camera.set_eye_height(y);
                    self.sketcher.refresh_orientation(self.camera.position);
                }
            }
            StrokeOutcome::Terrain(DeformOutcome::Skipped(_)) => {}
        }
    }

    fn handle_cursor_moved(&mut self, position: Vec2) {
        self.input.cursor = Some(position);
        if !self.sketcher.is_drawing() {
            return;
        }
        if let Some(ndc) = self.cursor_ndc() {
            self.sketcher.extend_stroke(ndc, &self.camera);
        }
    }

    fn render(&mut self) {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let raw_input = egui_state.take_egui_input(window);

        let stats = SceneStats {
            fps: self.fps,
            billboards: self.sketcher.billboards().len(),
            draw_state: self.sketcher.state(),
            stroke_points: self
                .sketcher
                .active_stroke()
                .map_or(0, |b| b.ribbon().point_count()),
            last_diagnostic: self.sketcher.last_diagnostic(),
        };
        let camera_pos = self.camera.position.to_array();
        let camera_speed = self.camera.move_speed;

        let mut ui_actions = UiActions::default();

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            ui_actions = draw_side_panel(ctx, &mut self.ui_state, &stats);

            if self.ui_state.show_help {
                draw_help_overlay(ctx, camera_pos, camera_speed);
            }
        });

        self.handle_ui_actions(ui_actions);

        let Some(gpu) = &mut self.gpu else { return };
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else {
            return;
        };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        egui_state.handle_platform_output(window, full_output.platform_output);

        if self.ui_state.vsync_enabled != self.last_vsync_state {
            gpu.set_vsync(self.ui_state.vsync_enabled);
            self.last_vsync_state = self.ui_state.vsync_enabled;
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(e) => {
                log::error!("failed to acquire frame: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.update_camera(&self.camera);
        gpu.sync_scene(&mut self.sketcher);

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_scene(&view, &mut encoder, clear_color(self.sketcher.config().sky_color));

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }

    fn handle_ui_actions(&mut self, actions: UiActions) {
        if let Some(color) = actions.crayon_color {
            self.sketcher.set_crayon_color(color);
        }
        if let Some(color) = actions.sky_color {
            self.sketcher.set_sky_color(color);
        }
        if let Some(color) = actions.ground_color {
            self.sketcher.set_ground_color(color);
        }
        if let Some(width) = actions.stroke_width {
            self.sketcher.set_stroke_width(width);
        }
        if actions.falloff_changed {
            self.sketcher.set_falloff(FalloffKernel::new(
                self.ui_state.falloff_shape,
                self.ui_state.falloff_radius,
            ));
        }
    }

    fn set_mouse_capture(&mut self, captured: bool) {
        self.input.mouse_captured = captured;
        let Some(window) = &self.window else { return };

        let mode = if captured {
            CursorGrabMode::Confined
        } else {
            CursorGrabMode::None
        };
        if let Err(e) = window.set_cursor_grab(mode) {
            log::debug!("cursor grab {mode:?} unavailable: {e}");
        }
        window.set_cursor_visible(!captured);
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        let value = if pressed { 1.0 } else { 0.0 };

        match key {
            KeyCode::KeyW | KeyCode::KeyZ => self.input.forward = value,
            KeyCode::KeyS => self.input.forward = -value,
            KeyCode::KeyA | KeyCode::KeyQ => self.input.right = -value,
            KeyCode::KeyD => self.input.right = value,
            KeyCode::Escape if pressed => {
                if self.sketcher.cancel_stroke() {
                    log::debug!("stroke cancelled");
                }
                self.set_mouse_capture(false);
            }
            _ => {}
        }
    }
}

fn clear_color(color: Color) -> wgpu::Color {
    let [r, g, b, a] = color.to_linear_rgba();
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: a as f64,
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title("Crayon 3D")
            .with_inner_size(PhysicalSize::new(1600, 900));

        let result = event_loop
            .create_window(window_attrs)
            .context("failed to create window")
            .and_then(|window| self.init_gpu(Arc::new(window)));

        if let Err(e) = result {
            log::error!("{e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // A release over the panel must still finish the stroke.
        let finishes_stroke = matches!(
            event,
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: ElementState::Released,
                ..
            }
        ) && self.sketcher.is_drawing();

        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            let response = egui_state.on_window_event(window, &event);
            if response.consumed && !finishes_stroke {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                    self.camera
                        .set_aspect(size.width as f32, size.height as f32);
                }
                if let Some(stroke) = self.sketcher.active_stroke_mut() {
                    stroke.attach_to_near_plane(&self.camera);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.handle_key(key, event.state == ElementState::Pressed);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => {
                self.handle_left_button(state == ElementState::Pressed);
            }

            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                if !self.sketcher.is_drawing() {
                    self.set_mouse_capture(state == ElementState::Pressed);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 50.0,
                };
                self.camera.process_scroll(scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update();
                self.render();
            }

            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: winit::event::DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.input.mouse_captured {
                self.input.mouse_delta.x += delta.0 as f32;
                self.input.mouse_delta.y += delta.1 as f32;
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logger::init_logger(args.debug);
    let config = args.into_config().context("invalid settings")?;
    log::info!(
        "ground {}x{} segments, falloff {:?} r={}",
        config.ground_segments,
        config.ground_segments,
        config.falloff.shape,
        config.falloff.radius
    );

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

use std::f32::consts::{FRAC_PI_2, PI};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use clap::Parser;
use egui::Context as EguiContext;
use futures::FutureExt;
use glam::{Vec2, Vec3};
use hatchlight_render_wgpu::{WgpuRenderer, WgpuShaderBackend};
use hatchlight_stage::{
    FpsCounter, FrameDriver, InitFuture, InitializationError, LifecycleController, LifecycleState,
    RecordingProgress, StageConfig,
};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Trackpads report pixels; the controls expect wheel lines.
const PIXELS_PER_LINE: f32 = 40.0;

#[derive(Parser)]
#[command(name = "hatchlight-desktop", about = "Hatchlight desktop application")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stage config (YAML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Stage state on top of the GPU context.
struct AppState {
    controller: LifecycleController<WgpuShaderBackend>,
    /// In-flight setup; polled once per redraw.
    init: Option<InitFuture>,
    init_error: Option<InitializationError>,
    progress: RecordingProgress,
    overlay_until: Option<Instant>,
    driver: FrameDriver,
    dragging: bool,
    cursor: Option<Vec2>,
    viewport_height: f32,
    show_panel: bool,
    light_azimuth: f32,
    light_elevation: f32,
}

impl AppState {
    fn new(device: Arc<wgpu::Device>, config: StageConfig, size: PhysicalSize<u32>) -> Self {
        let progress = RecordingProgress::new();
        let driver = FrameDriver::new(config.driver);
        let controller = LifecycleController::new(WgpuShaderBackend::new(device), config)
            .with_progress(progress.clone())
            .with_diagnostics(FpsCounter::default());
        controller.resize(size.width, size.height);
        let init = controller.initialize();

        Self {
            controller,
            init: Some(init),
            init_error: None,
            progress,
            overlay_until: None,
            driver,
            dragging: false,
            cursor: None,
            viewport_height: size.height as f32,
            show_panel: true,
            light_azimuth: 0.0,
            light_elevation: 0.0,
        }
    }

    fn poll_setup(&mut self) {
        let Some(init) = &self.init else {
            return;
        };
        match init.clone().now_or_never() {
            None => {}
            Some(Ok(())) => {
                self.init = None;
                self.sync_light_sliders();
                tracing::info!(nodes = self.controller.scene().node_count(), "stage ready");
            }
            Some(Err(err)) => {
                tracing::error!(%err, "stage setup failed");
                self.init = None;
                self.init_error = Some(err);
            }
        }
    }

    fn update(&mut self) {
        self.poll_setup();
        if self.driver.is_suspended() {
            return;
        }
        if matches!(
            self.controller.state(),
            LifecycleState::Ready | LifecycleState::Running
        ) {
            if let Err(err) = self.driver.tick(&self.controller) {
                tracing::warn!(%err, "frame skipped");
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport_height = height as f32;
        self.controller.resize(width, height);
    }

    fn cursor_moved(&mut self, position: Vec2) {
        if let (true, Some(last)) = (self.dragging, self.cursor) {
            if let Some(mut controls) = self.controller.controls() {
                controls.pointer_drag(position - last, self.viewport_height);
            }
        }
        self.cursor = Some(position);
    }

    fn wheel(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
        };
        if let Some(mut controls) = self.controller.controls() {
            controls.wheel(lines);
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if !pressed {
            return;
        }
        if key == KeyCode::F1 {
            self.show_panel = !self.show_panel;
        }
    }

    fn sync_light_sliders(&mut self) {
        if let Some(light) = self.controller.light() {
            let d = light.get().direction.normalize_or(Vec3::Z);
            self.light_azimuth = d.x.atan2(d.z);
            self.light_elevation = d.y.clamp(-1.0, 1.0).asin();
        }
    }

    /// Loading overlay stays up through setup and for the delay of the final report.
    fn overlay_visible(&mut self, now: Instant) -> bool {
        if !self.progress.is_complete() {
            return self.init.is_some();
        }
        let until = *self.overlay_until.get_or_insert_with(|| {
            let delay = self
                .progress
                .reports()
                .last()
                .and_then(|r| r.delay)
                .unwrap_or_default();
            now + delay
        });
        now < until
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if self.overlay_visible(Instant::now()) {
            let fraction = self.progress.latest();
            egui::Window::new("Loading")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.add(egui::ProgressBar::new(fraction).show_percentage());
                });
        }

        if let Some(err) = &self.init_error {
            egui::Window::new("Setup failed")
                .collapsible(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(err.to_string());
                });
        }

        if !self.show_panel {
            return;
        }

        egui::SidePanel::left("stage")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Hatchlight");
                ui.separator();
                ui.label(format!("State: {}", self.controller.state()));
                match self.controller.fps() {
                    Some(fps) => ui.label(format!("FPS: {fps:.1}")),
                    None => ui.label("FPS: --"),
                };
                ui.label(format!(
                    "Frame: {}  Elapsed: {:.2}s",
                    self.driver.frame(),
                    self.driver.elapsed()
                ));
                let camera = self.controller.camera();
                ui.label(format!(
                    "Camera: ({:.0}, {:.0}, {:.0})",
                    camera.position.x, camera.position.y, camera.position.z
                ));

                if let Some(light) = self.controller.light() {
                    ui.separator();
                    ui.heading("Light");
                    let azimuth = ui
                        .add(egui::Slider::new(&mut self.light_azimuth, -PI..=PI).text("azimuth"))
                        .changed();
                    let elevation = ui
                        .add(
                            egui::Slider::new(&mut self.light_elevation, -FRAC_PI_2..=FRAC_PI_2)
                                .text("elevation"),
                        )
                        .changed();
                    if azimuth || elevation {
                        let (sa, ca) = self.light_azimuth.sin_cos();
                        let (se, ce) = self.light_elevation.sin_cos();
                        light.set_direction(Vec3::new(ce * sa, se, ce * ca));
                    }
                }

                ui.separator();
                ui.heading("Nodes");
                for (id, node) in self.controller.scene().nodes() {
                    let r = node.rotation();
                    ui.label(format!(
                        "[{}] {} rot=({:.2}, {:.2}, {:.2})",
                        id.0,
                        node.name(),
                        r.x,
                        r.y,
                        r.z
                    ));
                }

                ui.separator();
                ui.small("F1: Toggle Panel | LMB drag: Orbit | Wheel: Zoom");
            });
    }
}

/// Window, surface and renderers. Built on the first `resumed`.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, egui_ctx: &EguiContext) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Hatchlight")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("hatchlight_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;
        let device = Arc::new(device);

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, surface_format, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer
            .resize(&self.device, self.config.width, self.config.height);
    }

    fn draw_egui(
        &mut self,
        egui_ctx: &EguiContext,
        view: &wgpu::TextureView,
        state: &mut AppState,
    ) {
        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let full_output = egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx);
        });
        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

struct App {
    /// Consumed when the stage is created on the first `resumed`.
    stage_config: Option<StageConfig>,
    gpu: Option<Gpu>,
    state: Option<AppState>,
    egui_ctx: EguiContext,
}

impl App {
    fn new(stage_config: StageConfig) -> Self {
        Self {
            stage_config: Some(stage_config),
            gpu: None,
            state: None,
            egui_ctx: EguiContext::default(),
        }
    }

    fn redraw(&mut self) {
        let (Some(gpu), Some(state)) = (&mut self.gpu, &mut self.state) else {
            return;
        };
        state.update();

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        {
            let camera = state.controller.camera();
            let mut scene = state.controller.scene_mut();
            gpu.renderer
                .render(&gpu.device, &gpu.queue, &view, &mut scene, &camera);
        }
        gpu.draw_egui(&self.egui_ctx, &view, state);

        output.present();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        let mut gpu = match Gpu::new(event_loop, &self.egui_ctx) {
            Ok(gpu) => gpu,
            Err(err) => {
                tracing::error!("failed to initialize GPU: {err:#}");
                event_loop.exit();
                return;
            }
        };

        if let Some(config) = self.stage_config.take() {
            let base = config.base_color.to_color();
            gpu.renderer.set_clear_color(wgpu::Color {
                r: f64::from(base.r),
                g: f64::from(base.g),
                b: f64::from(base.b),
                a: 1.0,
            });
            let size = gpu.window.inner_size();
            self.state = Some(AppState::new(gpu.device.clone(), config, size));
        }
        self.gpu = Some(gpu);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Some(state) = &self.state {
                    state.controller.dispose();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size);
                }
                if let Some(state) = &mut self.state {
                    state.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::Occluded(occluded) => {
                if let Some(state) = &mut self.state {
                    if occluded {
                        state.driver.suspend();
                    } else {
                        state.driver.resume();
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if let Some(state) = &mut self.state {
                    state.handle_key(key, key_state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                if let Some(state) = &mut self.state {
                    state.dragging = btn_state == ElementState::Pressed;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(state) = &mut self.state {
                    state.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(state) = &mut self.state {
                    state.wheel(delta);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("hatchlight-desktop starting");

    let config = match &cli.config {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    config.validate()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

// Pirate Escape host: window, fixed-step game loop and instanced cube renderer
// The simulation in game/ owns every rule; this file only feeds it input and draws what it exposes

mod engine;
mod game;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bevy_ecs::world::World;
use glam::{Mat4, Vec3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use winit::{
    event::{ElementState, Event as WinitEvent, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use engine::hud::{HudAction, HudOverlay, HudScreen, HudStats};
use engine::input::InputState;
use engine::mesh::{self, GpuVertex};
use engine::scene::{self, InstanceData};
use engine::systems;
use game::assets::{AssetLoader, LoadStatus, ProceduralAssets};
use game::session::SessionPhase;
use game::{GameConfig, Simulation};

const MAX_INSTANCES: usize = 10_000;
/// Draw every Nth sea vertex on each axis.
const SEA_SAMPLE_EVERY: usize = 2;
/// Longest wall-clock gap fed to the accumulator after a stall.
const MAX_FRAME_SECONDS: f32 = 0.25;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// UNIFORM DATA (camera + light)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

impl Uniforms {
    fn new(view_proj: Mat4) -> Self {
        let light = Vec3::new(0.4, 1.0, 0.3).normalize();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            light_dir: [light.x, light.y, light.z, 0.0],
        }
    }
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

enum Loading {
    InProgress(AssetLoader),
    Failed(String),
    Done,
}

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    num_indices: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    hud: HudOverlay,

    // Game
    game_config: GameConfig,
    loading: Loading,
    sim: Option<Simulation>,
    input: InputState,
    pending_action: Option<HudAction>,
    accumulator: f32,
    last_update: Instant,

    // ECS World (splash particles)
    particles: World,
    rng: StdRng,

    fps: u32,
}

impl State {
    async fn new(window: Arc<Window>, game_config: GameConfig) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .unwrap();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_instanced.wgsl").into()),
        });

        use wgpu::util::DeviceExt;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new(Mat4::IDENTITY)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],  // Vertex + Instance buffers
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let cube = mesh::unit_cube();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: cube.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: cube.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (MAX_INSTANCES * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let hud = HudOverlay::new(&window, &device, surface_format);

        // Asset loading runs on a worker; rendering carries on while it works
        let timeout = Duration::from_secs_f32(game_config.asset_timeout_secs.max(0.0));
        let loading = match AssetLoader::spawn(ProceduralAssets::new(game_config.clone()), timeout) {
            Ok(loader) => Loading::InProgress(loader),
            Err(err) => {
                log::error!("Could not start asset loading: {}", err);
                Loading::Failed(err.to_string())
            }
        };

        let rng = StdRng::seed_from_u64(game_config.world.seed ^ 0xB0B);

        Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            instance_buffer,
            num_indices: cube.index_count() as u32,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            hud,
            game_config,
            loading,
            sim: None,
            input: InputState::new(),
            pending_action: None,
            accumulator: 0.0,
            last_update: Instant::now(),
            particles: World::new(),
            rng,
            fps: 0,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn poll_assets(&mut self) {
        let Loading::InProgress(loader) = &mut self.loading else { return };
        match loader.poll() {
            LoadStatus::Pending => {}
            LoadStatus::Ready(assets) => {
                self.sim = Some(Simulation::new(self.game_config.clone(), assets));
                self.loading = Loading::Done;
            }
            LoadStatus::Failed(err) => {
                self.loading = Loading::Failed(err.to_string());
            }
        }
    }

    fn apply_action(&mut self, action: HudAction) {
        let Some(sim) = self.sim.as_mut() else { return };
        match action {
            HudAction::Start => sim.start(),
            HudAction::Restart => {
                sim.restart();
                systems::clear_particles(&mut self.particles);
            }
        }
        // Drop anything typed on the menu so it does not leak into the first tick
        let _ = self.input.take_tick_input();
        self.accumulator = 0.0;
    }

    fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32().min(MAX_FRAME_SECONDS);
        self.last_update = now;

        self.poll_assets();

        let confirm = self.input.take_confirm();
        let action = self.pending_action.take().or_else(|| {
            let phase = self.sim.as_ref()?.phase();
            match (confirm, phase) {
                (true, SessionPhase::Menu) => Some(HudAction::Start),
                (true, SessionPhase::GameOver | SessionPhase::Won) => Some(HudAction::Restart),
                _ => None,
            }
        });
        if let Some(action) = action {
            self.apply_action(action);
        }

        let Some(sim) = self.sim.as_mut() else { return };
        let step = sim.config().tick_seconds;
        let max_ticks = sim.config().max_ticks_per_frame.max(1);

        // Fixed-step simulation
        self.accumulator += dt;
        let mut ticks = 0;
        while self.accumulator >= step && ticks < max_ticks {
            let tick_input = self.input.take_tick_input();
            sim.tick(&tick_input);
            for burst in sim.drain_splashes() {
                systems::spawn_splash(&mut self.particles, &burst, &mut self.rng);
            }
            systems::movement_system(&mut self.particles, step);
            systems::lifetime_system(&mut self.particles, step);

            self.accumulator -= step;
            ticks += 1;
        }
        if ticks == max_ticks && self.accumulator >= step {
            log::debug!("Dropping {:.3}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }
    }

    fn hud_screen(&self) -> HudScreen {
        match (&self.loading, &self.sim) {
            (Loading::Failed(reason), _) => HudScreen::LoadFailed(reason.clone()),
            (_, Some(sim)) => HudScreen::from_phase(sim.phase()),
            (_, None) => HudScreen::Loading,
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Collect instance data BEFORE creating render pass
        let aspect = self.size.width as f32 / self.size.height.max(1) as f32;
        let (instance_data, view_proj) = match &self.sim {
            Some(sim) => (
                scene::build_scene(sim, &mut self.particles, SEA_SAMPLE_EVERY, MAX_INSTANCES),
                sim.camera().view_projection(aspect),
            ),
            None => {
                let projection = Mat4::perspective_rh(45.0_f32.to_radians(), aspect, 0.1, 500.0);
                let view_matrix = Mat4::look_at_rh(Vec3::new(0.0, 20.0, -30.0), Vec3::ZERO, Vec3::Y);
                (Vec::new(), projection * view_matrix)
            }
        };

        let instance_count = instance_data.len().min(MAX_INSTANCES);
        if instance_count > 0 {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&instance_data[..instance_count]),
            );
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[Uniforms::new(view_proj)]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.53,
                            g: 0.75,
                            b: 0.92,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            // One draw call for every box in the scene
            render_pass.draw_indexed(0..self.num_indices, 0, 0..instance_count as u32);
        }

        // HUD on top
        let screen = self.hud_screen();
        let stats = match &self.sim {
            Some(sim) => HudStats::from_simulation(sim, self.fps),
            None => HudStats {
                fps: self.fps,
                lives: self.game_config.session.lives,
                max_lives: self.game_config.session.lives,
                drowning: None,
                ship_dwell: None,
                player_position: Vec3::ZERO,
                manual_camera: false,
                intro_active: false,
            },
        };
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        let action = self.hud.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &screen,
            &stats,
        );
        if action.is_some() {
            self.pending_action = action;
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

// ============================================================================
// MAIN
// ============================================================================

fn main() {
    env_logger::init();

    let game_config = match GameConfig::load_or_default() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let event_loop = EventLoop::new().unwrap();

    let window_attributes = Window::default_attributes()
        .with_title("Pirate Escape")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

    let mut state = pollster::block_on(State::new(window.clone(), game_config));
    let mut frame_count = 0;
    let mut last_fps_update = Instant::now();

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let consumed = state.hud.handle_window_event(&window, event).consumed;
                // Releases always reach the game so nothing stays stuck down under a HUD click
                let always_forward = matches!(
                    event,
                    WindowEvent::KeyboardInput { .. }
                        | WindowEvent::MouseInput { state: ElementState::Released, .. }
                        | WindowEvent::Focused(_)
                );
                if !consumed || always_forward {
                    state.input.process_event(event);
                }

                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::Escape),
                                ..
                            },
                        ..
                    } => control_flow.exit(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                state: ElementState::Pressed,
                                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                                repeat: false,
                                ..
                            },
                        ..
                    } => state.hud.toggle_coordinates(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        state.update();
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => control_flow.exit(),
                            Err(e) => log::warn!("Surface error: {:?}", e),
                        }

                        frame_count += 1;
                        let now = Instant::now();
                        if (now - last_fps_update).as_secs_f32() >= 1.0 {
                            state.fps = frame_count;
                            log::debug!("FPS: {}", frame_count);
                            frame_count = 0;
                            last_fps_update = now;
                        }
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    }).unwrap();
}

use std::sync::Arc;

use anyhow::anyhow;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    window::{CursorGrabMode, Window},
};

use crate::{
    camera::{self, CameraResources, CameraUniform, Projection, Ray},
    data_structures::{shape, texture},
    fps::{DEFAULT_TARGET_FPS, FpsCounter},
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
};

/// Pointer state shared by the event loop and the flows.
#[derive(Debug, Clone, Copy, Default)]
pub struct MouseState {
    /// Last cursor position in physical pixels.
    pub coords: PhysicalPosition<f64>,
    /// Whether the cursor is captured for mouse look.
    pub grabbed: bool,
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub mouse: MouseState,
    pub clear_colour: wgpu::Color,
    /// Frames per second the loop paces itself to. `0` disables pacing.
    pub target_fps: u32,
    pub show_fps: bool,
    pub fps: FpsCounter,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colour and rely on an sRGB surface to encode it.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("The surface supports no texture format"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        // Flows move the camera in on_init; this is only a sane start.
        let camera = camera::Camera::looking_at((0.0, 2.0, 4.0), (0.0, 2.0, 0.0));
        let projection =
            camera::Projection::new(config.width, config.height, cgmath::Deg(60.0), 0.1, 500.0);
        let camera_controller = camera::CameraController::new(5.0, 0.003);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
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
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        // A sun high above the forest.
        let light = LightResources::new(
            LightUniform::new([20.0, 60.0, 30.0], [1.0, 1.0, 1.0]),
            &device,
        );

        let pipelines = Pipelines::new(
            &device,
            &config,
            &camera_bind_group_layout,
            &light.bind_group_layout,
        );

        let camera = CameraResources {
            camera,
            controller: camera_controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            window,
            depth_texture,
            mouse: MouseState::default(),
            clear_colour: shape::to_wgpu_color(shape::palette::ray_white()),
            target_fps: DEFAULT_TARGET_FPS,
            show_fps: true,
            fps: FpsCounter::new(),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Surface size as `[width, height]` in physical pixels.
    pub fn screen_size(&self) -> [f32; 2] {
        [self.config.width as f32, self.config.height as f32]
    }

    /// The picking ray for the current pointer.
    ///
    /// With a grabbed cursor the player aims with the crosshair, so the ray
    /// goes through the screen centre. A free cursor picks where it points.
    pub fn mouse_ray(&self) -> Ray {
        let coords = if self.mouse.grabbed {
            PhysicalPosition::new(
                self.config.width as f64 / 2.0,
                self.config.height as f64 / 2.0,
            )
        } else {
            self.mouse.coords
        };
        self.camera.camera.cast_ray_from_mouse(
            coords,
            self.config.width as f32,
            self.config.height as f32,
            &self.projection,
        )
    }

    /// Capture or release the cursor for mouse look.
    ///
    /// Not every platform supports every grab mode, so `Locked` falls back to
    /// `Confined`. If neither works the cursor stays free and a warning is
    /// logged.
    pub fn set_cursor_grab(&mut self, grab: bool) {
        if grab {
            let result = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            match result {
                Ok(()) => {
                    self.window.set_cursor_visible(false);
                    self.mouse.grabbed = true;
                }
                Err(e) => {
                    log::warn!("Cursor could not be grabbed: {}", e);
                    self.mouse.grabbed = false;
                }
            }
        } else {
            if let Err(e) = self.window.set_cursor_grab(CursorGrabMode::None) {
                log::warn!("Cursor could not be released: {}", e);
            }
            self.window.set_cursor_visible(true);
            self.mouse.grabbed = false;
        }
        if !self.mouse.grabbed {
            self.camera.controller.stop();
        }
    }
}

/// The part of [`Context`] a flow constructor may use to create GPU resources.
///
/// Cloning is cheap: `wgpu::Device` and `wgpu::Queue` are reference counted.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            config: ctx.config.clone(),
        }
    }
}

//! Flow control and application event loop.
//!
//! A "flow" is a scene that handles user input, updates its state and
//! describes what to draw each frame. The [`App`] owns the GPU [`Context`],
//! forwards winit events to every flow and renders their [`Render`] output
//! batched per pipeline.
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Collect window/device events and pass them to `on_<device/window>_events`
//! 2. On a left click, build the picking ray and call `on_click`
//! 3. Update the camera and call `on_update`
//! 4. Call the flows' `on_render()` to collect renderable objects
//! 5. Render the batches and the FPS overlay, then present the frame
//!
//! On native targets the loop sleeps until the next frame is due
//! ([`Context::target_fps`]); in the browser the page's animation frame paces it.

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    camera::Ray,
    config::WindowConfig,
    context::{Context, InitContext},
    data_structures::{
        model::DrawModel,
        shape::{self, ShapeBuffer},
        texture::Texture,
    },
    fps::frame_budget,
    render::{Batches, Render, Shape},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// What a flow asks the engine to do after one of its hooks ran.
///
/// `Out::Configure` can be used to modify the Context during runtime, for
/// instance to change the frame rate or the clear colour.
///
/// `Out::Exit` ends the event loop after the current event.
///
/// `Empty` is the default output.
pub enum Out {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Exit,
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

impl Debug for Out {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Out::Configure(_) => f.write_str("Configure(|&mut Context| {...})"),
            Out::Exit => f.write_str("Exit"),
            Out::Empty => f.write_str("Empty"),
        }
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created; configure context (camera, clear color, etc.)
/// 2. `on_window_events()` and `on_device_events()` are called for each winit input event
/// 3. `on_click()` is called on every left click with the picking ray
/// 4. `on_update()` is called every frame
/// 5. `on_render()` is called each frame and specifies how to render `self`
pub trait GraphicsFlow {
    /// Initialize the flow and configure the context.
    ///
    /// This is the only place with mutable access to the Context, e.g. to set
    /// the background colour or the camera start position.
    fn on_init(&mut self, ctx: &mut Context) -> Out;

    /// Handle a left click. `ray` starts at the camera and goes through the
    /// pointer (or the screen centre while the cursor is grabbed).
    fn on_click(&mut self, ctx: &Context, ray: &Ray) -> Out;

    /// Update state every frame with the elapsed time `dt`.
    fn on_update(&mut self, ctx: &Context, dt: Duration) -> Out;

    /// Handle raw device events (mouse motion etc.).
    fn on_device_events(&mut self, ctx: &Context, event: &DeviceEvent) -> Out;

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent) -> Out;

    /// Return renderable objects for this flow.
    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. Construction failures end the application and are
/// returned from [`run`].
pub type FlowConstructor = Box<
    dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>>>>,
>;

/// The frame rate readout and crosshair, rebuilt only when they change.
#[derive(Debug, Default)]
struct Overlay {
    buffer: Option<ShapeBuffer>,
    // fps, width, height, grabbed
    drawn_for: Option<(u32, u32, u32, bool)>,
}

impl Overlay {
    fn draw(&self) -> Render<'_> {
        match &self.buffer {
            Some(overlay) => Render::Overlay(Shape {
                vertex: &overlay.buffer,
                amount: overlay.amount,
            }),
            None => Render::None,
        }
    }
}

/// GPU context plus surface status.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    is_surface_configured: bool,
    overlay: Overlay,
}

impl AppState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            is_surface_configured: false,
            overlay: Overlay::default(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn refresh_overlay(&mut self) {
        let ctx = &self.ctx;
        let key = (
            ctx.fps.fps(),
            ctx.config.width,
            ctx.config.height,
            ctx.mouse.grabbed,
        );
        if self.overlay.drawn_for == Some(key) {
            return;
        }

        let screen = ctx.screen_size();
        let mut vertices = Vec::new();
        if ctx.show_fps {
            vertices.extend(shape::seven_segment(
                ctx.fps.fps(),
                [10.0, 10.0],
                [10.0, 18.0],
                screen,
                shape::palette::lime(),
            ));
        }
        if ctx.mouse.grabbed {
            vertices.extend(shape::crosshair(screen, 6.0, shape::palette::red()));
        }
        self.overlay.buffer = (!vertices.is_empty())
            .then(|| ShapeBuffer::new(&ctx.device, "Overlay Buffer", &vertices));
        self.overlay.drawn_for = Some(key);
    }

    fn update(&mut self, graphics_flows: &mut [Box<dyn GraphicsFlow>], event_loop: &ActiveEventLoop, dt: Duration) {
        let ctx = &mut self.ctx;
        ctx.fps.tick(dt);

        ctx.camera
            .controller
            .update(&mut ctx.camera.camera, dt);
        ctx.camera
            .uniform
            .update_view_proj(&ctx.camera.camera, &ctx.projection);
        ctx.queue.write_buffer(
            &ctx.camera.buffer,
            0,
            bytemuck::cast_slice(&[ctx.camera.uniform]),
        );

        for flow in graphics_flows.iter_mut() {
            let out = flow.on_update(&self.ctx, dt);
            handle_flow_output(&mut self.ctx, event_loop, out);
        }
    }

    fn render(&mut self, graphics_flows: &[Box<dyn GraphicsFlow>]) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }
        self.refresh_overlay();

        let ctx = &self.ctx;
        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            ctx.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            let mut batches = Batches::default();
            for flow in graphics_flows {
                flow.on_render().set_pipelines(&mut batches);
            }
            self.overlay.draw().set_pipelines(&mut batches);

            render_pass.set_pipeline(&ctx.pipelines.solid);
            render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
            draw_shapes(&mut render_pass, &batches.solids);

            render_pass.set_pipeline(&ctx.pipelines.model);
            for instanced in batches.models {
                if instanced.amount == 0 {
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                );
            }

            render_pass.set_pipeline(&ctx.pipelines.wire);
            render_pass.set_bind_group(0, &ctx.camera.bind_group, &[]);
            draw_shapes(&mut render_pass, &batches.wires);

            render_pass.set_pipeline(&ctx.pipelines.overlay);
            draw_shapes(&mut render_pass, &batches.overlays);
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn draw_shapes(render_pass: &mut wgpu::RenderPass<'_>, shapes: &[Shape<'_>]) {
    for shape in shapes {
        if shape.amount == 0 {
            continue;
        }
        render_pass.set_vertex_buffer(0, shape.vertex.slice(..));
        render_pass.draw(0..shape.amount as u32, 0..1);
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    window_config: WindowConfig,
    state: Option<AppState>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor>>,
    last_time: Instant,
    next_frame: Instant,
    // The first fatal error; returned from `run`.
    error: Option<anyhow::Error>,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        window_config: WindowConfig,
        constructors: Vec<FlowConstructor>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            window_config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            next_frame: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        if self.error.is_none() {
            self.error = Some(error);
        }
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop, mut app_state: AppState, flows: Vec<Box<dyn GraphicsFlow>>) {
        self.graphics_flows = flows;
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_init(&mut app_state.ctx);
            handle_flow_output(&mut app_state.ctx, event_loop, out);
        }
        log::info!("{} flow(s) initialized", self.graphics_flows.len());
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.next_frame = self.last_time;
        self.state = Some(app_state);
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized {
        state: AppState,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(self.window_config.title.clone())
            .with_inner_size(LogicalSize::new(
                self.window_config.width,
                self.window_config.height,
            ));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let init_future = async move {
            let app_state = AppState::new(window).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // The clone in into() leverages the internal Arcs of Device and Queue and thus only clones the ref
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows = futures::future::try_join_all(flow_futures).await?;
            Ok::<_, anyhow::Error>((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => self.start(event_loop, app_state, flows),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("The event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized { state, flows } => self.start(event_loop, state, flows),
            FlowEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn device_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.ctx.mouse.grabbed {
                state.ctx.camera.controller.handle_mouse(dx, dy);
            }
        }
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_device_events(&state.ctx, &event);
            handle_flow_output(&mut state.ctx, event_loop, out);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        // general stuff
        state.ctx.camera.controller.handle_window_events(&event);

        if let WindowEvent::CursorMoved { position, .. } = event {
            state.ctx.mouse.coords = position;
        };

        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_window_events(&state.ctx, &event);
            handle_flow_output(&mut state.ctx, event_loop, out);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Tab => {
                    let grab = !state.ctx.mouse.grabbed;
                    state.ctx.set_cursor_grab(grab);
                }
                _ => (),
            },
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                if button_state.is_pressed() {
                    let ray = state.ctx.mouse_ray();
                    log::debug!("Click ray from {:?} towards {:?}", ray.origin, ray.direction);
                    for flow in self.graphics_flows.iter_mut() {
                        let out = flow.on_click(&state.ctx, &ray);
                        handle_flow_output(&mut state.ctx, event_loop, out);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.update(&mut self.graphics_flows, event_loop, dt);
                match state.render(&self.graphics_flows) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
                #[cfg(target_arch = "wasm32")]
                state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &self.state else {
            return;
        };
        let budget = frame_budget(state.ctx.target_fps);
        if budget.is_zero() {
            state.ctx.window.request_redraw();
            event_loop.set_control_flow(ControlFlow::Poll);
            return;
        }
        let now = Instant::now();
        if now >= self.next_frame {
            state.ctx.window.request_redraw();
            // Skip frames we are already late for instead of bursting.
            self.next_frame = (self.next_frame + budget).max(now);
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

fn handle_flow_output(ctx: &mut Context, event_loop: &ActiveEventLoop, out: Out) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Exit => event_loop.exit(),
        Out::Empty => (),
    }
}

/// Open the window described by `window` and run `constructors` until the
/// window closes or a flow exits.
///
/// Errors while creating the window, the GPU context or any flow end the loop
/// and are returned here.
pub fn run(window: WindowConfig, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, window, constructors)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

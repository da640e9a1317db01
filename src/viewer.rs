//! Standalone visualization window backed by winit.
//!
//! ```no_run
//! # use simview::{sim::ModelFileLoader, Viewer};
//! Viewer::builder()
//!     .with_loader(ModelFileLoader::new("models/walker.json"))
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::control::PolicyRunner;
use crate::engine::SimEngine;
use crate::error::SimviewError;
use crate::gpu::mesh_renderer::MeshRenderer;
use crate::gpu::render_context::RenderContext;
use crate::input::{InputEvent, MouseButton};
use crate::options::Options;
use crate::sim::SimulationLoader;

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    loader: Option<Box<dyn SimulationLoader>>,
    options: Option<Options>,
    policy: Option<PolicyRunner>,
    title: String,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            loader: None,
            options: None,
            policy: None,
            title: "simview".into(),
        }
    }

    /// Set where simulations come from (on load and every reload).
    #[must_use]
    pub fn with_loader(mut self, loader: impl SimulationLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Install a locomotion policy for the control loop.
    #[must_use]
    pub fn with_policy(mut self, policy: PolicyRunner) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            loader: self.loader,
            options: self.options.unwrap_or_default(),
            policy: self.policy,
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A standalone window that runs and displays one simulation.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    loader: Option<Box<dyn SimulationLoader>>,
    options: Options,
    policy: Option<PolicyRunner>,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Load the simulation, open the window and run the event loop. Blocks
    /// until the window is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if no loader was set, the first load fails, or the
    /// event loop cannot be created.
    pub fn run(self) -> Result<(), SimviewError> {
        let loader = self
            .loader
            .ok_or_else(|| SimviewError::Viewer("no simulation loader set".into()))?;
        let mut engine = SimEngine::new(loader, self.options);
        if let Some(policy) = self.policy {
            engine.control_mut().set_policy(policy);
        }
        engine.load()?;

        let event_loop = EventLoop::new().map_err(|e| SimviewError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            title: self.title,
            engine,
            gpu: None,
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| SimviewError::Viewer(e.to_string()))
    }
}

// ── Winit app ────────────────────────────────────────────────────────────

/// Window-bound GPU state, created on the first `resumed`.
struct Gpu {
    window: Arc<Window>,
    context: RenderContext,
    renderer: MeshRenderer,
    /// Scene generation whose meshes are uploaded.
    generation: Option<u64>,
}

/// Internal winit application handler.
struct ViewerApp {
    title: String,
    engine: SimEngine,
    gpu: Option<Gpu>,
}

/// Surface size, never zero.
fn viewport_size(inner: winit::dpi::PhysicalSize<u32>) -> (u32, u32) {
    (inner.width.max(1), inner.height.max(1))
}

impl ViewerApp {
    fn create_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu, SimviewError> {
        let attrs = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| SimviewError::Viewer(e.to_string()))?,
        );
        let (width, height) = viewport_size(window.inner_size());
        let context = pollster::block_on(RenderContext::new(window.clone(), (width, height)))?;
        let renderer = MeshRenderer::new(&context);
        self.engine.resize(width, height);
        Ok(Gpu {
            window,
            context,
            renderer,
            generation: None,
        })
    }

    fn redraw(&mut self) {
        let _ = self.engine.update();
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let Some(graph) = self.engine.graph() else {
            gpu.window.request_redraw();
            return;
        };

        let generation = self.engine.scene_generation();
        if gpu.generation != Some(generation) {
            gpu.renderer.set_scene(&gpu.context, graph);
            gpu.generation = Some(generation);
        }

        if self.engine.should_render() {
            gpu.renderer
                .prepare(&gpu.context, graph, self.engine.camera().camera());
            match gpu.context.get_next_frame() {
                Ok(frame) => {
                    let view = frame
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default());
                    gpu.renderer.render(&gpu.context, &view);
                    frame.present();
                }
                Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                    let (width, height) = viewport_size(gpu.window.inner_size());
                    gpu.context.resize(width, height);
                }
                Err(e) => log::error!("render error: {e:?}"),
            }
        }
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.create_gpu(event_loop) {
            Ok(gpu) => {
                gpu.window.request_redraw();
                self.gpu = Some(gpu);
            }
            Err(e) => {
                log::error!("failed to initialize viewer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if matches!(event, WindowEvent::CloseRequested) {
            self.engine.teardown();
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::Resized(size) => {
                let (width, height) = viewport_size(size);
                self.engine.resize(width, height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.context.resize(width, height);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(),

            WindowEvent::MouseInput { button, state, .. } => {
                self.engine.handle_input(InputEvent::MouseButton {
                    button: MouseButton::from(button),
                    pressed: state == ElementState::Pressed,
                });
            }

            WindowEvent::CursorMoved { position, .. } => {
                #[allow(clippy::cast_possible_truncation)]
                self.engine.handle_input(InputEvent::CursorMoved {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }

            WindowEvent::CursorLeft { .. } => self.engine.handle_input(InputEvent::CursorLeft),

            WindowEvent::MouseWheel { delta, .. } => {
                #[allow(clippy::cast_possible_truncation)]
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                self.engine.handle_input(InputEvent::Scroll { delta });
            }

            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.engine.handle_input(InputEvent::ModifiersChanged {
                    shift: state.shift_key(),
                    ctrl: state.control_key() || state.super_key(),
                });
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                self.engine.handle_key_press(&format!("{code:?}"));
            }

            _ => (),
        }
    }
}

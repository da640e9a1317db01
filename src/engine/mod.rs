//! The simulation engine: owns the loaded simulation and its scene graph and
//! drives them frame by frame.

mod command;
mod input;
mod options;

pub use command::EngineCommand;

use glam::Vec2;
use web_time::Instant;

use crate::camera::OrbitCamera;
use crate::control::ControlLoop;
use crate::error::SimviewError;
use crate::input::InputProcessor;
use crate::interaction::DragInteraction;
use crate::options::Options;
use crate::scene::sync::{self, SyncReport};
use crate::scene::{Diagnostic, SceneGraph};
use crate::sim::{Simulation, SimulationHandle, SimulationLoader};
use crate::stepping::{FrameReport, RunState, SteppingLoop};
use crate::util::frame_timing::FrameTiming;

/// Default surface size until the first [`SimEngine::resize`].
const DEFAULT_VIEWPORT: Vec2 = Vec2::new(1280.0, 720.0);

/// Everything created from one load. Dropped as a unit on reload.
struct SceneContext {
    graph: SceneGraph,
    sim: SimulationHandle,
}

/// Bridge between a physics simulation and its interactive scene graph.
///
/// # Frame loop
///
/// Each frame, call [`update`](Self::update) (wall-clock) or
/// [`frame`](Self::frame) (explicit elapsed time). A frame
///
/// 1. applies queued pointer events to the drag interaction,
/// 2. runs the fixed-timestep physics steps that are due, writing control
///    and drag forces before each one (or nudges the dragged body while
///    paused),
/// 3. copies the new poses into the scene graph,
/// 4. moves a tracking camera.
///
/// # Input
///
/// Raw window events go through [`handle_input`](Self::handle_input) and
/// [`handle_key_press`](Self::handle_key_press); both are translated into
/// [`EngineCommand`]s and applied with [`execute`](Self::execute).
pub struct SimEngine {
    options: Options,
    loader: Box<dyn SimulationLoader>,
    context: Option<SceneContext>,
    /// Incremented by every successful load.
    generation: u64,
    /// Problems reported while building the current scene.
    diagnostics: Vec<Diagnostic>,
    pub(crate) stepping: SteppingLoop,
    pub(crate) drag: DragInteraction,
    pub(crate) control: ControlLoop,
    pub(crate) camera: OrbitCamera,
    pub(crate) input: InputProcessor,
    viewport: Vec2,
    /// Body the camera follows, if any.
    tracking: Option<usize>,
    /// Keyframe loaded by the next `NextKeyframe`.
    next_keyframe: usize,
    frame_timing: FrameTiming,
    last_frame: FrameReport,
    last_update: Option<Instant>,
}

// =============================================================================
// Construction and loading
// =============================================================================

impl SimEngine {
    /// Engine with nothing loaded. Call [`load`](Self::load) next.
    #[must_use]
    pub fn new(loader: Box<dyn SimulationLoader>, options: Options) -> Self {
        let aspect = DEFAULT_VIEWPORT.x / DEFAULT_VIEWPORT.y;
        Self {
            stepping: SteppingLoop::new(&options.stepping),
            drag: DragInteraction::new(&options.drag),
            control: ControlLoop::new(&options.control),
            camera: OrbitCamera::new(&options.camera, aspect),
            input: InputProcessor::with_key_bindings(options.keybindings.clone()),
            frame_timing: FrameTiming::new(options.debug.target_fps),
            options,
            loader,
            context: None,
            generation: 0,
            diagnostics: Vec::new(),
            viewport: DEFAULT_VIEWPORT,
            tracking: None,
            next_keyframe: 0,
            last_frame: FrameReport::default(),
            last_update: None,
        }
    }

    /// Load a fresh simulation through the loader and build its scene.
    ///
    /// Anything previously loaded is torn down first.
    ///
    /// # Errors
    ///
    /// Returns the loader's error. The engine is left with nothing loaded.
    pub fn load(&mut self) -> Result<(), SimviewError> {
        self.teardown();
        log::info!("loading {}", self.loader.describe());
        let sim = self.loader.load()?;

        let mut diagnostics = Vec::new();
        let graph = crate::scene::build(sim.as_ref(), &self.options.scene, &mut |d| {
            log::warn!("{d}");
            diagnostics.push(d);
        });
        self.diagnostics = diagnostics;

        self.control.attach(sim.model());
        self.drag.validate(sim.model().nbody);
        self.stepping.start();
        self.context = Some(SceneContext { graph, sim });
        self.generation = self.generation.wrapping_add(1);
        self.last_update = None;
        Ok(())
    }

    /// Tear everything down and load again.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub fn reload(&mut self) -> Result<(), SimviewError> {
        log::info!("reloading");
        self.load()
    }

    /// Release the drag, the scene graph and the simulation, in that order.
    pub fn teardown(&mut self) {
        self.drag.cancel();
        self.control.detach();
        self.stepping.stop();
        self.tracking = None;
        self.camera.stop_following();
        self.next_keyframe = 0;
        if let Some(SceneContext { graph, sim }) = self.context.take() {
            drop(graph);
            drop(sim);
            log::debug!("scene torn down");
        }
    }
}

// =============================================================================
// Frame loop
// =============================================================================

impl SimEngine {
    /// Run one frame using the wall-clock time since the previous call.
    pub fn update(&mut self) -> FrameReport {
        let now = Instant::now();
        let elapsed = self
            .last_update
            .map_or(0.0, |last| now.duration_since(last).as_secs_f64());
        self.last_update = Some(now);

        let report = self.frame(elapsed);
        if let Some(summary) = self.frame_timing.end_frame(report.steps, report.stalled) {
            if self.options.debug.log_frame_timing {
                log::info!(
                    "{:.0} fps, {:.1} steps/frame, {} stalls",
                    summary.fps,
                    summary.steps_per_frame,
                    summary.stalls
                );
            }
        }
        report
    }

    /// Run one frame covering `elapsed` seconds of wall-clock time.
    pub fn frame(&mut self, elapsed: f64) -> FrameReport {
        let Some(ctx) = self.context.as_mut() else {
            return FrameReport::default();
        };

        self.drag.process(&ctx.graph);

        let report = if self.stepping.is_paused() {
            let _ = self.drag.nudge_paused(ctx.sim.as_mut());
            FrameReport::default()
        } else {
            let (control, drag) = (&mut self.control, &self.drag);
            self.stepping.advance(ctx.sim.as_mut(), elapsed, |sim| {
                sim.clear_applied_forces();
                control.before_step(sim);
                drag.apply(sim);
            })
        };

        let synced = sync::sync(&mut ctx.graph, ctx.sim.as_ref());
        log_sync(synced);

        if let Some(point) = self
            .tracking
            .and_then(|body| ctx.graph.node(body))
            .map(|node| node.world.translation)
        {
            self.camera.follow(point);
        }

        self.last_frame = report.clone();
        report
    }

    /// Whether the viewer should draw now under the configured frame cap.
    #[must_use]
    pub fn should_render(&self) -> bool {
        self.frame_timing.should_render()
    }

    /// Smoothed frame rate.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.frame_timing.fps()
    }
}

fn log_sync(report: SyncReport) {
    if report.skipped_bodies > 0 || report.skipped_decorations > 0 {
        log::warn!(
            "sync kept stale transforms for {} bodies and {} lights/cameras",
            report.skipped_bodies,
            report.skipped_decorations
        );
    }
}

// =============================================================================
// Accessors
// =============================================================================

impl SimEngine {
    /// Current options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The loaded simulation.
    #[must_use]
    pub fn sim(&self) -> Option<&dyn Simulation> {
        self.context.as_ref().map(|ctx| ctx.sim.as_ref())
    }

    /// The loaded simulation, mutably. Changes to `qpos` show up in the
    /// scene after the next frame.
    pub fn sim_mut(&mut self) -> Option<&mut dyn Simulation> {
        match self.context.as_mut() {
            Some(ctx) => Some(ctx.sim.as_mut()),
            None => None,
        }
    }

    /// The scene graph of the current load.
    #[must_use]
    pub fn graph(&self) -> Option<&SceneGraph> {
        self.context.as_ref().map(|ctx| &ctx.graph)
    }

    /// Changes whenever a new scene graph replaces the old one, so renderers
    /// know to rebuild their GPU resources.
    #[must_use]
    pub fn scene_generation(&self) -> u64 {
        self.generation
    }

    /// Problems reported while building the current scene.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Stepping state.
    #[must_use]
    pub fn run_state(&self) -> RunState {
        self.stepping.state()
    }

    /// The stepping loop.
    #[must_use]
    pub fn stepping(&self) -> &SteppingLoop {
        &self.stepping
    }

    /// The drag interaction.
    #[must_use]
    pub fn drag(&self) -> &DragInteraction {
        &self.drag
    }

    /// The control loop.
    #[must_use]
    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    /// The control loop, mutably (for installing a policy).
    pub fn control_mut(&mut self) -> &mut ControlLoop {
        &mut self.control
    }

    /// The orbit camera.
    #[must_use]
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Body under or attached to the pointer.
    #[must_use]
    pub fn hovered_body(&self) -> Option<usize> {
        self.drag.hovered_body()
    }

    /// Body the camera is following.
    #[must_use]
    pub fn tracking(&self) -> Option<usize> {
        self.tracking
    }

    /// Report of the most recent frame.
    #[must_use]
    pub fn last_frame(&self) -> &FrameReport {
        &self.last_frame
    }

    /// Surface size in pixels.
    #[must_use]
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Handle a surface resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = Vec2::new(width as f32, height as f32);
        self.camera.resize(width, height);
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::coords::physics_vector;
    use crate::interaction::DragPhase;
    use crate::sim::{fixtures, FnLoader, Model, RapierSimulation};

    fn engine_for(make: fn() -> Model) -> SimEngine {
        let loader = FnLoader::new("fixture", move || {
            let sim: SimulationHandle = Box::new(RapierSimulation::new(make())?);
            Ok(sim)
        });
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        engine.load().unwrap();
        engine
    }

    fn floating_sphere() -> Model {
        fixtures::floating_sphere(2.0)
    }

    #[test]
    fn nothing_loaded_is_inert() {
        let loader = FnLoader::new("never", || Err(SimviewError::Load("missing".into())));
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        assert!(engine.load().is_err());
        assert!(engine.sim().is_none());
        assert_eq!(engine.frame(0.01).steps, 0);
        assert_eq!(engine.run_state(), RunState::Idle);
    }

    #[test]
    fn static_bodies_hold_still_for_a_hundred_steps() {
        let mut engine = engine_for(fixtures::two_bodies);
        let before: Vec<Vec3> = engine.graph().unwrap().body_positions();
        let mut steps = 0;
        for _ in 0..100 {
            steps += engine.frame(0.002).steps;
        }
        assert_eq!(steps, 100);
        let sim = engine.sim().unwrap();
        assert!((sim.data().time - 0.2).abs() < 1e-9);
        let after = engine.graph().unwrap().body_positions();
        assert_eq!(before.len(), 2);
        for (a, b) in before.iter().zip(&after) {
            assert!((*a - *b).length() < 1e-6);
        }
        assert!((before[0] - Vec3::new(-0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn drag_force_changes_velocity_by_impulse() {
        let mut engine = engine_for(floating_sphere);
        let center = engine.graph().unwrap().node(1).unwrap().world.translation;
        let screen = engine
            .camera()
            .camera()
            .world_to_screen(center, engine.viewport())
            .unwrap();

        engine.execute(EngineCommand::PointerDown { position: screen });
        engine.execute(EngineCommand::PointerMove {
            position: screen + Vec2::new(30.0, 0.0),
        });
        assert_eq!(engine.frame(0.0).steps, 0);
        assert!(engine.drag().is_dragging());

        let force = engine.drag().force(engine.sim().unwrap()).unwrap();
        assert_eq!(force.body, 1);
        assert!(force.force.length() > 0.0);

        assert_eq!(engine.frame(0.002).steps, 1);
        let expected = physics_vector(force.force / 2.0 * 0.002);
        let qvel = &engine.sim().unwrap().data().qvel;
        for k in 0..3 {
            assert!(
                (qvel[k] - expected[k]).abs() < 1e-3 * expected[k].abs().max(1.0),
                "axis {k}: {} vs {}",
                qvel[k],
                expected[k]
            );
        }

        engine.execute(EngineCommand::PointerUp);
        let _ = engine.frame(0.0);
        assert!(!engine.drag().is_dragging());
    }

    #[test]
    fn pause_freezes_time_but_still_syncs() {
        let mut engine = engine_for(floating_sphere);
        engine.execute(EngineCommand::TogglePause);
        assert_eq!(engine.run_state(), RunState::Paused);

        engine.sim_mut().unwrap().data_mut().qpos[0] = 0.5;
        engine.sim_mut().unwrap().forward();
        assert_eq!(engine.frame(0.01).steps, 0);
        assert_eq!(engine.sim().unwrap().data().time, 0.0);
        let x = engine.graph().unwrap().node(1).unwrap().world.translation.x;
        assert!((x - 0.5).abs() < 1e-6);

        engine.execute(EngineCommand::TogglePause);
        assert_eq!(engine.frame(0.004).steps, 2);
    }

    #[test]
    fn reload_rebuilds_everything() {
        let mut engine = engine_for(floating_sphere);
        engine.execute(EngineCommand::ToggleSelection { body: 1 });
        let _ = engine.frame(0.01);
        assert!(engine.sim().unwrap().data().time > 0.0);
        let generation = engine.scene_generation();

        engine.execute(EngineCommand::Reload);
        assert_ne!(engine.scene_generation(), generation);
        assert_eq!(engine.sim().unwrap().data().time, 0.0);
        assert_eq!(engine.graph().unwrap().selected_bodies().count(), 0);
        assert_eq!(engine.run_state(), RunState::Running);
        assert!(!engine.drag().is_dragging());
    }

    #[test]
    fn reload_mid_drag_releases_the_body() {
        let mut engine = engine_for(floating_sphere);
        let center = engine.graph().unwrap().node(1).unwrap().world.translation;
        let screen = engine
            .camera()
            .camera()
            .world_to_screen(center, engine.viewport())
            .unwrap();
        engine.execute(EngineCommand::PointerDown { position: screen });
        engine.execute(EngineCommand::PointerMove {
            position: screen + Vec2::new(30.0, 0.0),
        });
        let _ = engine.frame(0.0);
        assert!(engine.drag().is_dragging());

        engine.execute(EngineCommand::Reload);
        assert_eq!(engine.drag().phase(), DragPhase::Idle);
        assert!(engine.drag().state().is_none());

        assert_eq!(engine.frame(0.01).steps, 5);
        assert_eq!(engine.drag().phase(), DragPhase::Idle);
        let sim = engine.sim().unwrap();
        assert!(sim.data().xfrc_applied.iter().all(|&f| f == 0.0));
        assert!(sim.data().qvel.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn teardown_releases_scene() {
        let mut engine = engine_for(floating_sphere);
        engine.teardown();
        assert!(engine.sim().is_none());
        assert!(engine.graph().is_none());
        assert_eq!(engine.run_state(), RunState::Idle);
        assert!(engine.control().joints().is_empty());
    }

    #[test]
    fn tracking_follows_body() {
        let mut engine = engine_for(floating_sphere);
        engine.execute(EngineCommand::ToggleSelection { body: 1 });
        engine.execute(EngineCommand::ToggleTracking);
        assert_eq!(engine.tracking(), Some(1));
        engine.execute(EngineCommand::TogglePause);
        let _ = engine.frame(0.0);
        let before = engine.camera().focus_point();

        engine.sim_mut().unwrap().data_mut().qpos[0] = 1.0;
        engine.sim_mut().unwrap().forward();
        let _ = engine.frame(0.0);
        let moved = engine.camera().focus_point() - before;
        assert!((moved.x - 1.0).abs() < 1e-4, "moved {moved:?}");

        engine.execute(EngineCommand::ToggleTracking);
        assert_eq!(engine.tracking(), None);
    }
}

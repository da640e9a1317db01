//! Input and command dispatch for SimEngine

use glam::Vec2;

use super::{EngineCommand, SimEngine};
use crate::input::InputEvent;
use crate::interaction::{toggle_single, PointerEvent};
use crate::scene::Ray;

// ── Raw input ──

impl SimEngine {
    /// Process a platform-agnostic input event.
    ///
    /// Camera gestures, pointer drags and double-click selection are
    /// derived here and applied immediately; drag events take effect on the
    /// next frame.
    pub fn handle_input(&mut self, event: InputEvent) {
        let hovered = self.drag.hovered_body();
        for command in self.input.handle_event(event, hovered) {
            self.execute(command);
        }
    }

    /// Process a key press. `code` is the physical key in
    /// `winit::keyboard::KeyCode` debug format (`"Space"`, `"KeyL"`).
    pub fn handle_key_press(&mut self, code: &str) {
        for command in self.input.handle_key_press(code) {
            self.execute(command);
        }
    }

    fn pointer_ray(&self, position: Vec2) -> Option<Ray> {
        self.camera.camera().screen_to_ray(position, self.viewport)
    }
}

// ── Command execution ──

impl SimEngine {
    /// Apply one command.
    pub fn execute(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::RotateCamera { delta } => self.camera.rotate(delta),
            EngineCommand::PanCamera { delta } => self.camera.pan(delta),
            EngineCommand::Zoom { delta } => self.camera.zoom(delta),
            EngineCommand::ResetCamera => {
                self.stop_tracking();
                self.camera.reset();
            }
            EngineCommand::FitCamera => {
                if let Some(graph) = self.graph() {
                    let positions = graph.body_positions();
                    self.camera.fit_to_positions(&positions);
                }
            }
            EngineCommand::ToggleTracking => self.toggle_tracking(),

            EngineCommand::PointerDown { position } => {
                if let Some(ray) = self.pointer_ray(position) {
                    self.drag.push(PointerEvent::Down { ray });
                }
            }
            EngineCommand::PointerMove { position } => {
                if let Some(ray) = self.pointer_ray(position) {
                    self.drag.push(PointerEvent::Move { ray });
                }
            }
            EngineCommand::PointerUp => self.drag.push(PointerEvent::Up),
            EngineCommand::PointerCancel => self.drag.push(PointerEvent::Cancel),

            EngineCommand::ToggleSelection { body } => {
                if let Some(ctx) = self.context.as_mut() {
                    let selected = toggle_single(&mut ctx.graph, body);
                    log::debug!("body {body} selected: {selected}");
                }
            }
            EngineCommand::ClearSelection => {
                if let Some(ctx) = self.context.as_mut() {
                    ctx.graph.clear_selection();
                }
            }

            EngineCommand::TogglePause => {
                let _ = self.stepping.toggle_pause();
            }
            EngineCommand::Reset => self.reset(),
            EngineCommand::ResetToKeyframe { index } => self.reset_to_keyframe(index),
            EngineCommand::NextKeyframe => self.next_keyframe(),
            EngineCommand::Reload => {
                if let Err(e) = self.reload() {
                    log::error!("reload failed: {e}");
                }
            }

            EngineCommand::ToggleControlMode => {
                let _ = self.control.toggle_mode();
            }
            EngineCommand::SetControlMode { mode } => self.control.set_mode(mode),
            EngineCommand::NudgeActuator { prefix, delta } => {
                if let Some(ctx) = self.context.as_ref() {
                    let _ = self.control.nudge(ctx.sim.model(), &prefix, delta);
                }
            }
            EngineCommand::SetVelocityCommand { command } => self.control.set_command(command),
        }
    }

    /// Restore the default configuration.
    fn reset(&mut self) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        self.stepping.reset(ctx.sim.as_mut());
        self.control.reset();
        let _ = crate::scene::sync::sync(&mut ctx.graph, ctx.sim.as_ref());
        log::info!("simulation reset");
    }

    fn reset_to_keyframe(&mut self, index: usize) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if !self.stepping.reset_to_keyframe(ctx.sim.as_mut(), index) {
            log::warn!("keyframe {index} does not exist");
            return;
        }
        self.control.reset();
        let _ = crate::scene::sync::sync(&mut ctx.graph, ctx.sim.as_ref());
        log::info!("loaded keyframe {index}");
    }

    fn next_keyframe(&mut self) {
        let Some(nkey) = self.sim().map(|sim| sim.model().nkey) else {
            return;
        };
        if nkey == 0 {
            log::info!("model has no keyframes");
            return;
        }
        let index = self.next_keyframe % nkey;
        self.next_keyframe = (index + 1) % nkey;
        self.reset_to_keyframe(index);
    }

    /// Follow the selected body (or the control base body); toggles off when
    /// already tracking.
    fn toggle_tracking(&mut self) {
        if self.tracking.is_some() {
            self.stop_tracking();
            return;
        }
        let selected = self.graph().and_then(|g| g.selected_bodies().next());
        self.tracking = selected.or_else(|| self.control.base_body());
        self.camera.stop_following();
        log::info!("tracking body {:?}", self.tracking);
    }

    fn stop_tracking(&mut self) {
        self.tracking = None;
        self.camera.stop_following();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ControlMode, Options};
    use crate::sim::{
        fixtures, BodySpec, FnLoader, JointSpec, JointType, ModelBuilder, RapierSimulation,
        SimulationHandle,
    };

    fn walker_engine() -> SimEngine {
        let loader = FnLoader::new("walker", || {
            let sim: SimulationHandle = Box::new(RapierSimulation::new(fixtures::walker())?);
            Ok(sim)
        });
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        engine.load().unwrap();
        engine
    }

    #[test]
    fn key_bindings_drive_commands() {
        let mut engine = walker_engine();
        engine.handle_key_press("Space");
        assert!(engine.stepping().is_paused());
        engine.handle_key_press("Space");
        assert!(engine.stepping().is_running());

        engine.handle_input(InputEvent::ModifiersChanged {
            shift: false,
            ctrl: true,
        });
        engine.handle_key_press("KeyM");
        assert_eq!(engine.control().mode(), ControlMode::Direct);
    }

    #[test]
    fn nudge_keys_move_setpoints() {
        let mut engine = walker_engine();
        engine.handle_key_press("KeyE");
        assert!((engine.control().setpoints()[0] - 0.1).abs() < 1e-12);
        assert!((engine.control().setpoints()[1] - 0.1).abs() < 1e-12);
        engine.handle_key_press("KeyD");
        assert!(engine.control().setpoints()[0].abs() < 1e-12);
    }

    #[test]
    fn reset_rewinds_time() {
        let mut engine = walker_engine();
        let _ = engine.frame(0.01);
        assert!(engine.sim().unwrap().data().time > 0.0);
        engine.handle_key_press("Backspace");
        assert_eq!(engine.sim().unwrap().data().time, 0.0);
    }

    #[test]
    fn next_keyframe_cycles() {
        let loader = FnLoader::new("keyed", || {
            let mut builder = ModelBuilder::new();
            let body = builder.add_body(BodySpec::default());
            let _ = builder.add_joint(JointSpec {
                body,
                kind: JointType::Slide,
                axis: [1.0, 0.0, 0.0],
                ..JointSpec::default()
            });
            builder.add_keyframe(vec![0.25]);
            builder.add_keyframe(vec![0.75]);
            let sim: SimulationHandle = Box::new(RapierSimulation::new(builder.build()?)?);
            Ok(sim)
        });
        let mut engine = SimEngine::new(Box::new(loader), Options::default());
        engine.load().unwrap();

        engine.execute(EngineCommand::NextKeyframe);
        assert_eq!(engine.sim().unwrap().data().qpos[0], 0.25);
        engine.execute(EngineCommand::NextKeyframe);
        assert_eq!(engine.sim().unwrap().data().qpos[0], 0.75);
        engine.execute(EngineCommand::NextKeyframe);
        assert_eq!(engine.sim().unwrap().data().qpos[0], 0.25);

        engine.execute(EngineCommand::ResetToKeyframe { index: 9 });
        assert_eq!(engine.sim().unwrap().data().qpos[0], 0.25);
    }

    #[test]
    fn selection_and_clear() {
        let mut engine = walker_engine();
        engine.execute(EngineCommand::ToggleSelection { body: 2 });
        engine.execute(EngineCommand::ToggleSelection { body: 3 });
        let selected: Vec<_> = engine.graph().unwrap().selected_bodies().collect();
        assert_eq!(selected, vec![3]);
        engine.execute(EngineCommand::ClearSelection);
        assert_eq!(engine.graph().unwrap().selected_bodies().count(), 0);
    }

    #[test]
    fn tracking_defaults_to_base_body() {
        let mut engine = walker_engine();
        engine.execute(EngineCommand::ToggleTracking);
        assert_eq!(engine.tracking(), Some(1));
        engine.execute(EngineCommand::ResetCamera);
        assert_eq!(engine.tracking(), None);
    }
}

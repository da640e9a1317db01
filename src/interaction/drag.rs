//! Pointer drag: grab a body with a ray, pull it with a spring force.
//!
//! Pointer events are queued with [`DragInteraction::push`] and consumed in
//! order by [`DragInteraction::process`] at the start of each frame, so
//! every state transition happens at one well-defined point.

use std::collections::VecDeque;

use glam::Vec3;

use crate::coords::{physics_vector, to_render_orientation, to_render_position};
use crate::options::{DragOptions, DragProjection};
use crate::scene::raycast::raycast;
use crate::scene::{Ray, SceneGraph, Transform};
use crate::sim::{JointType, Simulation};

/// Below this `|cos|` between ray and view-plane normal the plane
/// intersection is ill-conditioned and the grab depth is used instead.
const MIN_PLANE_COS: f32 = 1e-3;

/// Interaction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    /// Nothing under the pointer.
    #[default]
    Idle,
    /// Pointer over a draggable body.
    Hovering {
        /// Body under the pointer.
        body: usize,
    },
    /// A body is attached to the pointer.
    Dragging {
        /// Grabbed body.
        body: usize,
    },
}

/// Pointer input, already turned into world-space rays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Primary button pressed.
    Down {
        /// Ray through the pointer.
        ray: Ray,
    },
    /// Pointer moved.
    Move {
        /// Ray through the pointer.
        ray: Ray,
    },
    /// Primary button released.
    Up,
    /// Gesture interrupted.
    Cancel,
}

/// The active grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    /// Grabbed body.
    pub target_body: usize,
    /// Grab point in the body's render-space local frame. Fixed for the
    /// whole drag.
    pub body_local_anchor: Vec3,
    /// Where the pointer currently wants the anchor to be.
    pub current_world_point: Vec3,
    /// Ray distance to the grab point.
    pub grab_depth: f32,
    /// Grab point in world space at grab time.
    pub grab_point: Vec3,
    /// Normal of the view plane through the grab point.
    pub plane_normal: Vec3,
}

/// Force a drag wants to apply this step, in render axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragForce {
    /// Target body.
    pub body: usize,
    /// Force vector.
    pub force: Vec3,
    /// Application point (the anchor in world space).
    pub point: Vec3,
}

/// Idle → Hovering → Dragging → Idle state machine plus the force law.
#[derive(Debug, Clone, Default)]
pub struct DragInteraction {
    options: DragOptions,
    phase: DragPhase,
    drag: Option<DragState>,
    events: VecDeque<PointerEvent>,
}

impl DragInteraction {
    /// Idle interaction.
    #[must_use]
    pub fn new(options: &DragOptions) -> Self {
        Self {
            options: options.clone(),
            ..Self::default()
        }
    }

    /// Replace strength, projection, and limits.
    pub fn apply_options(&mut self, options: &DragOptions) {
        self.options = options.clone();
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    /// The active grab, if any.
    #[must_use]
    pub fn state(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Body under or attached to the pointer.
    #[must_use]
    pub fn hovered_body(&self) -> Option<usize> {
        match self.phase {
            DragPhase::Idle => None,
            DragPhase::Hovering { body } | DragPhase::Dragging { body } => Some(body),
        }
    }

    /// Whether a body is grabbed.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Queue a pointer event.
    pub fn push(&mut self, event: PointerEvent) {
        self.events.push_back(event);
    }

    /// Consume queued events against the current scene.
    pub fn process(&mut self, graph: &SceneGraph) {
        while let Some(event) = self.events.pop_front() {
            match event {
                PointerEvent::Down { ray } => self.grab(graph, &ray),
                PointerEvent::Move { ray } => self.pointer_moved(graph, &ray),
                PointerEvent::Up | PointerEvent::Cancel => self.release(),
            }
        }
    }

    /// Drop the grab, hover, and queued events. Used on reload so nothing
    /// points at a body index from the old scene.
    pub fn cancel(&mut self) {
        if let Some(drag) = self.drag.take() {
            log::debug!("drag on body {} cancelled", drag.target_body);
        }
        self.events.clear();
        self.phase = DragPhase::Idle;
    }

    /// Cancel when the target no longer exists in a model with `nbody`
    /// bodies.
    pub fn validate(&mut self, nbody: usize) {
        if self.hovered_body().is_some_and(|b| b >= nbody) {
            self.cancel();
        }
    }

    fn grab(&mut self, graph: &SceneGraph, ray: &Ray) {
        self.drag = None;
        let Some(hit) = raycast(graph, ray, |v| v.body > 0) else {
            self.phase = DragPhase::Idle;
            return;
        };
        let Some(node) = graph.node(hit.body) else {
            self.phase = DragPhase::Idle;
            return;
        };
        let drag = DragState {
            target_body: hit.body,
            body_local_anchor: node.world.inverse_transform_point(hit.point),
            current_world_point: hit.point,
            grab_depth: hit.distance,
            grab_point: hit.point,
            plane_normal: ray.direction,
        };
        log::debug!("grabbed body {} at {:?}", hit.body, hit.point);
        self.drag = Some(drag);
        self.phase = DragPhase::Dragging { body: hit.body };
    }

    fn pointer_moved(&mut self, graph: &SceneGraph, ray: &Ray) {
        if let Some(drag) = self.drag.as_mut() {
            drag.current_world_point = match self.options.projection {
                DragProjection::Depth => ray.at(drag.grab_depth),
                DragProjection::ViewPlane => {
                    plane_point(ray, drag.grab_point, drag.plane_normal)
                        .unwrap_or_else(|| ray.at(drag.grab_depth))
                }
            };
            return;
        }
        self.phase = raycast(graph, ray, |v| v.body > 0)
            .map_or(DragPhase::Idle, |hit| DragPhase::Hovering { body: hit.body });
    }

    fn release(&mut self) {
        if let Some(drag) = self.drag.take() {
            log::debug!("released body {}", drag.target_body);
        }
        self.phase = DragPhase::Idle;
    }

    /// Anchor in world space using the body's current pose in `sim`.
    #[must_use]
    pub fn anchor_world(&self, sim: &dyn Simulation) -> Option<Vec3> {
        let drag = self.drag.as_ref()?;
        let data = sim.data();
        if drag.target_body >= sim.model().nbody {
            return None;
        }
        let body = Transform {
            translation: to_render_position(&data.xpos, drag.target_body),
            rotation: to_render_orientation(&data.xquat, drag.target_body).normalize(),
        };
        let anchor = body.transform_point(drag.body_local_anchor);
        anchor.is_finite().then_some(anchor)
    }

    /// Spring force toward the pointer: `(current − anchor) · strength ·
    /// mass`, optionally capped at `max_force`.
    #[must_use]
    pub fn force(&self, sim: &dyn Simulation) -> Option<DragForce> {
        let drag = self.drag.as_ref()?;
        let anchor = self.anchor_world(sim)?;
        let mass = sim.model().body_mass.get(drag.target_body).copied()?;
        let mut force =
            (drag.current_world_point - anchor) * (self.options.strength * mass) as f32;
        if self.options.max_force > 0.0 {
            force = force.clamp_length_max(self.options.max_force as f32);
        }
        Some(DragForce {
            body: drag.target_body,
            force,
            point: anchor,
        })
    }

    /// Accumulate this step's drag force into the simulation at the anchor.
    pub fn apply(&self, sim: &mut dyn Simulation) {
        if let Some(f) = self.force(sim) {
            sim.apply_force(
                physics_vector(f.force),
                [0.0; 3],
                physics_vector(f.point),
                f.body,
            );
        }
    }

    /// While paused, move the grabbed body's root kinematically a fraction
    /// of the way towards the pointer and recompute poses. Returns whether
    /// anything moved.
    pub fn nudge_paused(&self, sim: &mut dyn Simulation) -> bool {
        let (Some(drag), Some(anchor)) = (self.drag.as_ref(), self.anchor_world(sim)) else {
            return false;
        };
        let offset = physics_vector(
            (drag.current_world_point - anchor) * self.options.paused_nudge_gain as f32,
        );

        let model = sim.model();
        let b = drag.target_body;
        let target = if let Some(mocap) = model.body_mocapid[b] {
            NudgeTarget::Mocap(mocap * 3)
        } else {
            let root = model.body_rootid[b];
            match model.body_jntadr[root] {
                Some(j) if model.jnt_type[j] == JointType::Free => {
                    NudgeTarget::Qpos(model.jnt_qposadr[j])
                }
                _ => return false,
            }
        };

        let data = sim.data_mut();
        let buffer = match target {
            NudgeTarget::Mocap(adr) => &mut data.mocap_pos[adr..adr + 3],
            NudgeTarget::Qpos(adr) => &mut data.qpos[adr..adr + 3],
        };
        for (value, delta) in buffer.iter_mut().zip(offset) {
            *value += delta;
        }
        sim.forward();
        true
    }
}

enum NudgeTarget {
    Mocap(usize),
    Qpos(usize),
}

/// Intersection of `ray` with the plane through `origin` with `normal`.
fn plane_point(ray: &Ray, origin: Vec3, normal: Vec3) -> Option<Vec3> {
    let denom = ray.direction.dot(normal);
    if denom.abs() < MIN_PLANE_COS {
        return None;
    }
    let t = (origin - ray.origin).dot(normal) / denom;
    (t > 0.0).then(|| ray.at(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SceneOptions;
    use crate::scene::build;
    use crate::sim::fixtures::floating_sphere;
    use crate::sim::RapierSimulation;

    /// Free sphere of mass 2 at render (0, 1, 0), radius 0.1.
    fn setup() -> (RapierSimulation, SceneGraph) {
        let sim = RapierSimulation::new(floating_sphere(2.0)).unwrap();
        let graph = build(&sim, &SceneOptions::default(), &mut |_| {});
        (sim, graph)
    }

    fn ray_from(origin: Vec3) -> Ray {
        Ray::new(origin, Vec3::NEG_Z).unwrap()
    }

    fn grabbed(graph: &SceneGraph) -> DragInteraction {
        let mut drag = DragInteraction::new(&DragOptions::default());
        drag.push(PointerEvent::Down {
            ray: ray_from(Vec3::new(0.0, 1.0, 5.0)),
        });
        drag.process(graph);
        drag
    }

    #[test]
    fn grab_records_anchor() {
        let (sim, graph) = setup();
        let drag = grabbed(&graph);
        assert_eq!(drag.phase(), DragPhase::Dragging { body: 1 });
        let state = drag.state().unwrap();
        assert!((state.grab_point - Vec3::new(0.0, 1.0, 0.1)).length() < 1e-4);
        assert!((state.grab_depth - 4.9).abs() < 1e-4);
        assert!((state.body_local_anchor - Vec3::new(0.0, 0.0, 0.1)).length() < 1e-4);
        let anchor = drag.anchor_world(&sim).unwrap();
        assert!((anchor - state.grab_point).length() < 1e-4);
    }

    #[test]
    fn anchor_is_rigid() {
        let (mut sim, graph) = setup();
        let drag = grabbed(&graph);
        let before = drag.anchor_world(&sim).unwrap();
        for _ in 0..20 {
            sim.step().unwrap();
        }
        let after = drag.anchor_world(&sim).unwrap();
        assert!((after - before).length() < 1e-5);
    }

    #[test]
    fn null_drag_has_zero_force() {
        let (sim, graph) = setup();
        let mut drag = grabbed(&graph);
        drag.push(PointerEvent::Move {
            ray: ray_from(Vec3::new(0.0, 1.0, 5.0)),
        });
        drag.process(&graph);
        let f = drag.force(&sim).unwrap();
        assert!(f.force.length() < 1e-3);
        drag.push(PointerEvent::Up);
        drag.process(&graph);
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(drag.force(&sim).is_none());
    }

    #[test]
    fn force_scales_with_offset_strength_and_mass() {
        let (sim, graph) = setup();
        let mut drag = grabbed(&graph);
        drag.push(PointerEvent::Move {
            ray: ray_from(Vec3::new(0.5, 1.0, 5.0)),
        });
        drag.process(&graph);
        let f = drag.force(&sim).unwrap();
        // 0.5 m * 250 * 2 kg along render +X.
        assert!((f.force - Vec3::new(250.0, 0.0, 0.0)).length() < 1e-2);
        assert!((f.point - Vec3::new(0.0, 1.0, 0.1)).length() < 1e-4);

        drag.apply_options(&DragOptions {
            max_force: 100.0,
            ..DragOptions::default()
        });
        assert!((drag.force(&sim).unwrap().force.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn apply_writes_physics_wrench() {
        let (mut sim, graph) = setup();
        let mut drag = grabbed(&graph);
        // Pull up in render space = +Z in physics.
        drag.push(PointerEvent::Move {
            ray: ray_from(Vec3::new(0.0, 1.2, 5.0)),
        });
        drag.process(&graph);
        drag.apply(&mut sim);
        let frc = &sim.data().xfrc_applied[6..12];
        assert!((frc[2] - 100.0).abs() < 1e-2);
        assert!(frc[0].abs() < 1e-6 && frc[1].abs() < 1e-6);
        // Applied off-centre: some torque.
        assert!(frc[3..].iter().any(|t| t.abs() > 1e-3));
    }

    #[test]
    fn view_plane_projection() {
        let (sim, graph) = setup();
        let mut drag = DragInteraction::new(&DragOptions {
            projection: DragProjection::ViewPlane,
            ..DragOptions::default()
        });
        drag.push(PointerEvent::Down {
            ray: ray_from(Vec3::new(0.0, 1.0, 5.0)),
        });
        // Oblique ray crossing the z = 0.1 plane at x = 0.3.
        let dir = Vec3::new(0.3, 0.0, -4.9);
        drag.push(PointerEvent::Move {
            ray: Ray::new(Vec3::new(0.0, 1.0, 5.0), dir).unwrap(),
        });
        drag.process(&graph);
        let current = drag.state().unwrap().current_world_point;
        assert!((current - Vec3::new(0.3, 1.0, 0.1)).length() < 1e-4);
        assert!(drag.force(&sim).is_some());
    }

    #[test]
    fn hover_and_miss() {
        let (_, graph) = setup();
        let mut drag = DragInteraction::new(&DragOptions::default());
        drag.push(PointerEvent::Move {
            ray: ray_from(Vec3::new(0.05, 1.0, 5.0)),
        });
        drag.process(&graph);
        assert_eq!(drag.phase(), DragPhase::Hovering { body: 1 });
        assert_eq!(drag.hovered_body(), Some(1));

        // Straight down onto the ground plane (body 0) is not draggable.
        drag.push(PointerEvent::Down {
            ray: Ray::new(Vec3::new(2.0, 3.0, 2.0), Vec3::NEG_Y).unwrap(),
        });
        drag.process(&graph);
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn stale_target_is_cancelled() {
        let (_, graph) = setup();
        let mut drag = grabbed(&graph);
        drag.validate(2);
        assert!(drag.is_dragging());
        drag.validate(1);
        assert!(!drag.is_dragging());
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn paused_nudge_moves_root() {
        let (mut sim, graph) = setup();
        let mut drag = grabbed(&graph);
        drag.push(PointerEvent::Move {
            ray: ray_from(Vec3::new(1.0, 1.0, 5.0)),
        });
        drag.process(&graph);
        assert!(drag.nudge_paused(&mut sim));
        // 0.3 of a 1 m render +X offset, which is physics +X.
        assert!((sim.data().qpos[0] - 0.3).abs() < 1e-4);
        assert!((sim.data().xpos[3] - 0.3).abs() < 1e-4);
    }
}

//! Pooled instances for tendon paths.
//!
//! Every tendon is drawn as spheres ("beads") at its wrap points and unit
//! cylinders ("links") stretched between consecutive beads. Both pools are
//! allocated once for the worst case the model declares and only their
//! active counts change per frame.

use glam::{Quat, Vec3};

use crate::coords::to_render_position;
use crate::sim::{Data, Model};

/// Wrap points this close to the origin are unresolved and not drawn.
const MIN_VALID_DISTANCE: f32 = 0.01;

/// One instance of a pooled primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instance {
    /// Center.
    pub translation: Vec3,
    /// Orientation (unit Y maps onto the link direction).
    pub rotation: Quat,
    /// Non-uniform scale.
    pub scale: Vec3,
    /// Color.
    pub color: [f32; 4],
}

/// Fixed-capacity instance batch with a per-frame active count.
#[derive(Debug, Clone, Default)]
pub struct InstancePool {
    instances: Vec<Instance>,
    capacity: usize,
}

impl InstancePool {
    /// Empty pool able to hold `capacity` instances.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of instances.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Active instance count this frame.
    #[must_use]
    pub fn count(&self) -> usize {
        self.instances.len()
    }

    /// Active instances.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    fn clear(&mut self) {
        self.instances.clear();
    }

    fn push(&mut self, instance: Instance) {
        if self.instances.len() < self.capacity {
            self.instances.push(instance);
        }
    }
}

/// Bead and link pools for all tendons of a model.
#[derive(Debug, Clone, Default)]
pub struct TendonPools {
    /// Spheres at wrap points.
    pub beads: InstancePool,
    /// Cylinders between consecutive wrap points.
    pub links: InstancePool,
}

impl TendonPools {
    /// Pools sized for `model`: at most one bead per wrap point and one link
    /// per consecutive pair, never below `min_capacity`.
    #[must_use]
    pub fn for_model(model: &Model, min_capacity: usize) -> Self {
        let links = model.nwrap.saturating_sub(model.ntendon);
        Self {
            beads: InstancePool::with_capacity(model.nwrap.max(min_capacity)),
            links: InstancePool::with_capacity(links.max(min_capacity)),
        }
    }

    /// Recompute instances from the current wrap point positions.
    pub fn update(&mut self, model: &Model, data: &Data) {
        self.beads.clear();
        self.links.clear();

        for t in 0..model.ntendon {
            let (Some(&adr), Some(&num)) = (data.ten_wrapadr.get(t), data.ten_wrapnum.get(t))
            else {
                continue;
            };
            let width = model.tendon_width[t] as f32;
            let color = [
                model.tendon_rgba[t * 4],
                model.tendon_rgba[t * 4 + 1],
                model.tendon_rgba[t * 4 + 2],
                model.tendon_rgba[t * 4 + 3],
            ];
            let end = (adr + num).min(data.wrap_xpos.len() / 3);

            let mut prev: Option<Vec3> = None;
            for w in adr..end {
                let p = to_render_position(&data.wrap_xpos, w);
                if !p.is_finite() || p.length() <= MIN_VALID_DISTANCE {
                    prev = None;
                    continue;
                }
                self.beads.push(Instance {
                    translation: p,
                    rotation: Quat::IDENTITY,
                    scale: Vec3::splat(width),
                    color,
                });
                if let Some(start) = prev {
                    self.links.push(link(start, p, width, color));
                }
                prev = Some(p);
            }
        }
    }
}

fn link(start: Vec3, end: Vec3, width: f32, color: [f32; 4]) -> Instance {
    let delta = end - start;
    let length = delta.length();
    let rotation = if length > f32::EPSILON {
        Quat::from_rotation_arc(Vec3::Y, delta / length)
    } else {
        Quat::IDENTITY
    };
    Instance {
        translation: (start + end) * 0.5,
        rotation,
        scale: Vec3::new(width, length, width),
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BodySpec, ModelBuilder, SiteSpec, TendonSpec};

    fn model_with_tendon() -> (Model, Data) {
        let mut b = ModelBuilder::new();
        let body = b.add_body(BodySpec::default());
        let sites: Vec<usize> = [[1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [2.0, 0.0, 1.0]]
            .into_iter()
            .map(|pos| {
                b.add_site(SiteSpec {
                    body,
                    pos,
                    ..SiteSpec::default()
                })
            })
            .collect();
        b.add_tendon(TendonSpec {
            sites,
            width: 0.01,
            ..TendonSpec::default()
        });
        let model = b.build().unwrap();
        let mut data = Data::new(&model);
        crate::sim::kinematics::forward_kinematics(&model, &mut data);
        crate::sim::kinematics::update_derived(&model, &mut data);
        (model, data)
    }

    #[test]
    fn beads_and_links_follow_wrap_points() {
        let (model, data) = model_with_tendon();
        let mut pools = TendonPools::for_model(&model, 0);
        assert_eq!(pools.beads.capacity(), 3);
        assert_eq!(pools.links.capacity(), 2);

        pools.update(&model, &data);
        assert_eq!(pools.beads.count(), 3);
        assert_eq!(pools.links.count(), 2);

        // Physics (1,0,0)->(1,0,1) is a vertical link in render space.
        let first = pools.links.instances()[0];
        assert!((first.translation - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-6);
        assert!((first.scale.y - 1.0).abs() < 1e-6);
        assert!((first.rotation * Vec3::Y - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn unresolved_points_break_the_path() {
        let (model, mut data) = model_with_tendon();
        data.wrap_xpos[3..6].fill(0.0);
        let mut pools = TendonPools::for_model(&model, 0);
        pools.update(&model, &data);
        assert_eq!(pools.beads.count(), 2);
        assert_eq!(pools.links.count(), 0);
    }

    #[test]
    fn update_is_repeatable() {
        let (model, data) = model_with_tendon();
        let mut pools = TendonPools::for_model(&model, 4);
        pools.update(&model, &data);
        let first: Vec<Instance> = pools.links.instances().to_vec();
        pools.update(&model, &data);
        assert_eq!(first, pools.links.instances());
    }
}

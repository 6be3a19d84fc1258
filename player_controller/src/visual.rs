//! Mirrors the simulated transform onto the display representations.

use rapier3d::math::Vector;
use rapier3d::prelude::Real;

/// Skinned meshes hang below the capsule center by this much.
const MESH_Y_OFFSET: Real = -0.9;

#[derive(Clone, Copy, Debug)]
pub struct Pose {
    pub position: Vector<Real>,
    pub yaw: Real,
    pub scale: Real,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vector::zeros(),
            yaw: 0.0,
            scale: 1.0,
        }
    }
}

/// The renderer reads these poses; the simulation writes them once per tick.
#[derive(Clone, Copy, Debug)]
pub struct VisualSync {
    pub capsule: Pose,
    pub mesh: Pose,
    mesh_scale: Real,
}

impl Default for VisualSync {
    fn default() -> Self {
        Self::new()
    }
}

impl VisualSync {
    pub fn new() -> Self {
        Self {
            capsule: Pose::default(),
            mesh: Pose::default(),
            mesh_scale: 1.0,
        }
    }

    pub fn set_mesh_scale(&mut self, scale: Real) {
        self.mesh_scale = scale;
    }

    pub fn sync(&mut self, position: Vector<Real>, yaw: Real) {
        self.capsule = Pose {
            position,
            yaw,
            scale: 1.0,
        };
        self.mesh = Pose {
            position: position + Vector::y() * MESH_Y_OFFSET,
            yaw,
            scale: self.mesh_scale,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_pose_tracks_the_capsule_with_its_offset_and_scale() {
        let mut visual = VisualSync::new();
        visual.set_mesh_scale(0.7);
        visual.sync(Vector::new(1.0, 2.0, 3.0), 0.5);

        assert_eq!(visual.capsule.position, Vector::new(1.0, 2.0, 3.0));
        assert_eq!(visual.capsule.yaw, 0.5);
        assert_eq!(visual.capsule.scale, 1.0);

        assert_eq!(visual.mesh.position, Vector::new(1.0, 1.1, 3.0));
        assert_eq!(visual.mesh.yaw, 0.5);
        assert_eq!(visual.mesh.scale, 0.7);
    }
}

//! Local transforms of scene nodes.
//!
//! Rotation is kept as Euler angles so per-frame animation can bump a single
//! axis (`rotation.y += step`) the way the views do.

use cgmath::{Euler, Matrix4, Quaternion, Rad, SquareMatrix, Vector3};

use crate::config::Placement;

/// Position, Euler rotation (radians, XYZ order) and scale of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    /// The identity transform.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn quaternion(&self) -> Quaternion<f32> {
        Quaternion::from(Euler {
            x: Rad(self.rotation.x),
            y: Rad(self.rotation.y),
            z: Rad(self.rotation.z),
        })
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.quaternion())
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Builds a transform from a glTF node's decomposed matrix.
    pub fn from_decomposed(
        translation: [f32; 3],
        rotation: [f32; 4],
        scale: [f32; 3],
    ) -> Self {
        // glTF quaternions are [x, y, z, w]
        let quaternion = Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]);
        let euler = Euler::from(quaternion);
        Self {
            position: translation.into(),
            rotation: Vector3::new(euler.x.0, euler.y.0, euler.z.0),
            scale: scale.into(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&Placement> for Transform {
    fn from(placement: &Placement) -> Self {
        Self {
            position: placement.position,
            rotation: placement.rotation,
            scale: placement.scale,
        }
    }
}

/// Model and normal matrix as laid out in the node uniform.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

impl TransformRaw {
    pub fn from_world(world: &Matrix4<f32>) -> Self {
        // normals use the inverse transpose; a degenerate scale leaves them untransformed
        let normal = world
            .invert()
            .map(|inverse| {
                use cgmath::Matrix;
                inverse.transpose()
            })
            .unwrap_or_else(Matrix4::identity);
        Self {
            model: (*world).into(),
            normal: normal.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Point3, Transform as _};

    #[test]
    fn translation_is_applied_after_rotation_and_scale() {
        let transform = Transform {
            position: Vector3::new(0.0, 0.0, -2.0),
            rotation: Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let p = transform.to_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        // x axis rotated a quarter turn around y points to -z
        assert!((p - Point3::new(0.0, 0.0, -4.0)).magnitude() < 1e-5);
    }

    #[test]
    fn gltf_identity_rotation_decomposes_to_zero_angles() {
        let transform = Transform::from_decomposed([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0], [1.0; 3]);
        assert_eq!(transform.position, Vector3::new(1.0, 2.0, 3.0));
        assert!(transform.rotation.magnitude() < 1e-6);
    }

    #[test]
    fn degenerate_scale_keeps_an_identity_normal_matrix() {
        let world = Matrix4::from_nonuniform_scale(0.0, 1.0, 1.0);
        let raw = TransformRaw::from_world(&world);
        let identity: [[f32; 4]; 4] = Matrix4::identity().into();
        assert_eq!(raw.normal, identity);
    }
}

//! Built-in components. [`Engine::new`](crate::Engine::new) registers all of
//! them.

use crate::assets::{AssetHandle, Mesh, Shader, Texture};
use crate::math::{Mat4, Vec2, Vec3};

/// Position, rotation (radians about +Z) and scale in the XY plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    /// World position
    pub position: Vec2,
    /// Counter-clockwise rotation in radians
    pub rotation: f32,
    /// Per-axis scale
    pub scale: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Transform2D {
    /// Unrotated, unit-scale transform at `position`.
    #[must_use]
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Model matrix: translate · rotate-z · scale.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(self.position.x, self.position.y, 0.0))
            * Mat4::from_rotation_z(self.rotation)
            * Mat4::from_scale(Vec3::new(self.scale.x, self.scale.y, 1.0))
    }
}

/// Linear and angular velocity, integrated by
/// [`MotionSystem`](crate::systems::MotionSystem).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity2D {
    /// Units per second
    pub linear: Vec2,
    /// Radians per second
    pub angular: f32,
}

/// Something [`RenderSystem`](crate::systems::RenderSystem) draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sprite {
    /// Geometry.
    pub mesh: AssetHandle<Mesh>,
    /// Program.
    pub shader: AssetHandle<Shader>,
    /// Optional texture.
    pub texture: Option<AssetHandle<Texture>>,
}

impl Sprite {
    /// Untextured sprite.
    #[must_use]
    pub const fn new(mesh: AssetHandle<Mesh>, shader: AssetHandle<Shader>) -> Self {
        Self {
            mesh,
            shader,
            texture: None,
        }
    }
}

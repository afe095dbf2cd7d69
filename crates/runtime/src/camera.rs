//! Look-at camera producing the per-frame transforms handed to the renderer.

use glam::{Mat4, Vec3};

/// Transforms consumed by the render collaborator for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransforms {
    pub world_view_projection: Mat4,
    pub inverse_view: Mat4,
}

/// Movement requests from an input collaborator, sampled once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Width over height of the render target.
    pub aspect: f32,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Units per second for input-driven movement.
    pub speed: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 1500.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: 1280.0 / 720.0,
            fovy: 0.8,
            znear: 1.0,
            zfar: 5000.0,
            speed: 250.0,
        }
    }
}

impl Camera {
    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }

    #[must_use]
    pub fn transforms(&self) -> CameraTransforms {
        let view = self.view();
        CameraTransforms {
            world_view_projection: self.projection() * view,
            inverse_view: view.inverse(),
        }
    }

    /// Moves eye and target together according to `input`.
    pub fn update(&mut self, input: &CameraInput, dt: f32) {
        let forward = (self.target - self.eye).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();

        let mut velocity = Vec3::ZERO;
        if input.forward {
            velocity += forward;
        }
        if input.backward {
            velocity -= forward;
        }
        if input.right {
            velocity += right;
        }
        if input.left {
            velocity -= right;
        }
        if input.up {
            velocity += self.up;
        }
        if input.down {
            velocity -= self.up;
        }

        if velocity.length_squared() > 0.0 {
            let step = velocity.normalize() * self.speed * dt;
            self.eye += step;
            self.target += step;
        }
    }
}

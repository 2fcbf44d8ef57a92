//! First-person camera, projection, input controller and the picking ray.
//!
//! The camera is described by a position and two Euler angles (yaw around the
//! world up axis, pitch towards it). Movement stays on the ground plane, like a
//! walking player, while the mouse only turns the view.

use std::f32::consts::FRAC_PI_2;

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};
use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

// Looking straight up or down flips the view basis.
const SAFE_FRAC_PI_2: f32 = FRAC_PI_2 - 0.0001;

/// A half-line in world space, used for mouse picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Always unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Builds a ray; `direction` is normalized here.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    /// Camera at `position` turned towards `target`.
    pub fn looking_at<V: Into<Point3<f32>>>(position: V, target: V) -> Self {
        let position = position.into();
        let dir = target.into() - position;
        let yaw = Rad(dir.z.atan2(dir.x));
        let horizontal = (dir.x * dir.x + dir.z * dir.z).sqrt();
        let pitch = Rad(dir.y.atan2(horizontal).clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
        Self {
            position,
            yaw,
            pitch,
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    /// Ray from the eye through the pixel at `coords` of a `width` x `height` surface.
    pub fn cast_ray_from_mouse(
        &self,
        coords: PhysicalPosition<f64>,
        width: f32,
        height: f32,
        projection: &Projection,
    ) -> Ray {
        let ndc_x = 2.0 * coords.x as f32 / width.max(1.0) - 1.0;
        let ndc_y = 1.0 - 2.0 * coords.y as f32 / height.max(1.0);

        let forward = self.forward();
        let right = forward.cross(Vector3::unit_y()).normalize();
        let up = right.cross(forward);
        let half_height = (projection.fovy.0 / 2.0).tan();
        let half_width = half_height * projection.aspect;

        let direction = forward + right * (ndc_x * half_width) + up * (ndc_y * half_height);
        Ray::new(self.position, direction)
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Keyboard walking and mouse look.
///
/// Keys are tracked as held amounts and applied in [`update`](Self::update)
/// scaled by the frame time. Mouse deltas are accumulated between frames and
/// applied per pixel, so looking around does not depend on the frame rate.
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    /// `speed` in world units per second, `sensitivity` in radians per mouse count.
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            speed,
            sensitivity,
        }
    }

    /// Returns true if the key is one the controller reacts to.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        let amount = if state == ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            KeyCode::KeyW | KeyCode::ArrowUp => {
                self.amount_forward = amount;
                true
            }
            KeyCode::KeyS | KeyCode::ArrowDown => {
                self.amount_backward = amount;
                true
            }
            KeyCode::KeyA | KeyCode::ArrowLeft => {
                self.amount_left = amount;
                true
            }
            KeyCode::KeyD | KeyCode::ArrowRight => {
                self.amount_right = amount;
                true
            }
            _ => false,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_keyboard(*key, *state),
            // Releasing keys while unfocused never reaches us.
            WindowEvent::Focused(false) => {
                self.stop();
                false
            }
            _ => false,
        }
    }

    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        self.rotate_horizontal += dx as f32;
        self.rotate_vertical += dy as f32;
    }

    pub fn stop(&mut self) {
        self.amount_left = 0.0;
        self.amount_right = 0.0;
        self.amount_forward = 0.0;
        self.amount_backward = 0.0;
    }

    pub fn update(&mut self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        let (yaw_sin, yaw_cos) = camera.yaw.0.sin_cos();
        let forward = Vector3::new(yaw_cos, 0.0, yaw_sin);
        let right = Vector3::new(-yaw_sin, 0.0, yaw_cos);
        camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
        camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;

        camera.yaw += Rad(self.rotate_horizontal * self.sensitivity);
        camera.pitch += Rad(-self.rotate_vertical * self.sensitivity);
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        camera.pitch = Rad(camera.pitch.0.clamp(-SAFE_FRAC_PI_2, SAFE_FRAC_PI_2));
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// The camera together with everything needed to feed it to the shaders.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::Deg;

    fn projection() -> Projection {
        Projection::new(800, 450, Deg(60.0), 0.1, 500.0)
    }

    #[test]
    fn looking_down_negative_z_is_minus_ninety_degrees_yaw() {
        let camera = Camera::looking_at((0.0, 2.0, 4.0), (0.0, 2.0, 0.0));
        assert_relative_eq!(camera.yaw.0, -FRAC_PI_2, epsilon = 1e-6);
        assert_relative_eq!(camera.pitch.0, 0.0, epsilon = 1e-6);
        let forward = camera.forward();
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn centre_ray_follows_forward() {
        let camera = Camera::looking_at((0.0, 2.0, 4.0), (0.0, 2.0, 0.0));
        let ray = camera.cast_ray_from_mouse((400.0, 225.0).into(), 800.0, 450.0, &projection());
        assert_eq!(ray.origin, camera.position);
        assert_relative_eq!(ray.direction.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ray.direction.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ray.direction.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn top_edge_ray_tilts_by_half_the_field_of_view() {
        let camera = Camera::looking_at((0.0, 0.0, 0.0), (0.0, 0.0, -1.0));
        let ray = camera.cast_ray_from_mouse((400.0, 0.0).into(), 800.0, 450.0, &projection());
        let angle = ray.direction.y.atan2(-ray.direction.z);
        assert_relative_eq!(angle, 30f32.to_radians(), epsilon = 1e-5);
    }

    #[test]
    fn right_half_of_screen_looks_right() {
        let camera = Camera::looking_at((0.0, 0.0, 0.0), (0.0, 0.0, -1.0));
        let ray = camera.cast_ray_from_mouse((700.0, 225.0).into(), 800.0, 450.0, &projection());
        assert!(ray.direction.x > 0.0);
    }

    #[test]
    fn walking_forward_stays_on_the_ground_plane() {
        let mut camera = Camera::looking_at((0.0, 2.0, 4.0), (0.0, 3.0, 0.0));
        let mut controller = CameraController::new(5.0, 0.003);
        controller.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        controller.update(&mut camera, Duration::from_secs(1));
        assert_relative_eq!(camera.position.y, 2.0, epsilon = 1e-6);
        assert_relative_eq!(camera.position.z, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let mut controller = CameraController::new(5.0, 0.01);
        controller.handle_mouse(0.0, -100_000.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert!(camera.pitch.0 < FRAC_PI_2);
    }
}

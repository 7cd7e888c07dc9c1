use glam::Vec3;

/// Orbit camera state. The core only needs its view direction: movement input
/// is interpreted relative to where the camera looks.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Heading in degrees. -90 looks down -Z, 90 looks down +Z.
    pub yaw: f32,
    pub pitch: f32,
    /// Degrees per pixel of pointer motion.
    pub sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: 90.0,
            pitch: -15.0,
            sensitivity: 0.1,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera looking along `direction` (only the horizontal part is used for yaw).
    pub fn looking_along(direction: Vec3) -> Self {
        let mut camera = Self::default();
        if let Some(flat) = Vec3::new(direction.x, 0.0, direction.z).try_normalize() {
            camera.yaw = flat.z.atan2(flat.x).to_degrees();
        }
        camera
    }

    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-89.0, 89.0);
    }

    /// Unit view direction.
    pub fn front(&self) -> Vec3 {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();
        Vec3::new(
            yaw_rad.cos() * pitch_rad.cos(),
            pitch_rad.sin(),
            yaw_rad.sin() * pitch_rad.cos(),
        )
        .normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_positive_z() {
        let front = Camera::new().front();
        assert!(front.z > 0.9);
        assert!(front.x.abs() < 1e-5);
    }

    #[test]
    fn looking_along_matches_direction() {
        let dir = Vec3::new(1.0, -0.3, 1.0);
        let front = Camera::looking_along(dir).front();
        let flat = Vec3::new(front.x, 0.0, front.z).normalize();
        assert!((flat - Vec3::new(1.0, 0.0, 1.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::new();
        camera.look(0.0, -10_000.0);
        assert_eq!(camera.pitch, 89.0);
    }
}

//! Free-look camera control for viewing scenes without an actor.

use glam::{Quat, Vec3};

use crate::graph::SceneManager;
use crate::input::{KeyCode, KeyEvent, MouseButton, MouseEvent, NamedKey};

pub const CAMERA_MAN_TOP_SPEED: f32 = 150.0;
const FAST_FACTOR: f32 = 20.0;
const ACCEL: f32 = 10.0;
/// Degrees turned per pixel of mouse movement.
const LOOK_SENSITIVITY: f32 = 0.15;

#[derive(Debug, Clone, Copy, Default)]
struct Moves {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    fast: bool,
}

/// Flies a named camera around: WASD or arrows to move, Page Up and Page
/// Down to rise and sink, Shift to go faster, the mouse to look.
#[derive(Debug)]
pub struct CameraMan {
    manager: SceneManager,
    camera: String,
    top_speed: f32,
    velocity: Vec3,
    moves: Moves,
}

impl CameraMan {
    pub fn new(manager: &SceneManager, camera: &str) -> Self {
        Self {
            manager: manager.clone(),
            camera: camera.to_string(),
            top_speed: CAMERA_MAN_TOP_SPEED,
            velocity: Vec3::ZERO,
            moves: Moves::default(),
        }
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn top_speed(&self) -> f32 {
        self.top_speed
    }

    pub fn set_top_speed(&mut self, speed: f32) {
        self.top_speed = speed;
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Halts all movement.
    pub fn stop(&mut self) {
        self.moves = Moves::default();
        self.velocity = Vec3::ZERO;
    }

    fn set_move(&mut self, key: KeyCode, held: bool) {
        let moves = &mut self.moves;
        match key {
            KeyCode::Named(NamedKey::Up) => moves.forward = held,
            KeyCode::Named(NamedKey::Down) => moves.back = held,
            KeyCode::Named(NamedKey::Left) => moves.left = held,
            KeyCode::Named(NamedKey::Right) => moves.right = held,
            KeyCode::Named(NamedKey::PageUp) => moves.up = held,
            KeyCode::Named(NamedKey::PageDown) => moves.down = held,
            KeyCode::Named(NamedKey::LeftShift) => moves.fast = held,
            key if key.is_char('w') => moves.forward = held,
            key if key.is_char('s') => moves.back = held,
            key if key.is_char('a') => moves.left = held,
            key if key.is_char('d') => moves.right = held,
            _ => {}
        }
    }

    pub fn inject_key_down(&mut self, event: &KeyEvent) {
        self.set_move(event.key, true);
    }

    pub fn inject_key_up(&mut self, event: &KeyEvent) {
        self.set_move(event.key, false);
    }

    /// Yaws about the world's up axis and pitches about the camera's own.
    pub fn inject_mouse_move(&mut self, event: &MouseEvent) {
        let yaw = (-(event.x.rel as f32) * LOOK_SENSITIVITY).to_radians();
        let pitch = (-(event.y.rel as f32) * LOOK_SENSITIVITY).to_radians();
        let _ = self.manager.update_camera(&self.camera, |camera| {
            camera.orientation = (Quat::from_rotation_y(yaw)
                * camera.orientation
                * Quat::from_rotation_x(pitch))
            .normalize();
        });
    }

    pub fn inject_mouse_down(&mut self, _event: &MouseEvent, _button: MouseButton) {}

    pub fn inject_mouse_up(&mut self, _event: &MouseEvent, _button: MouseButton) {}

    /// Moves the camera for a frame lasting `elapsed` seconds.
    pub fn frame(&mut self, elapsed: f32) {
        let Some(camera) = self.manager.camera(&self.camera) else {
            return;
        };
        let direction = camera.orientation * Vec3::NEG_Z;
        let right = camera.orientation * Vec3::X;
        let up = camera.orientation * Vec3::Y;
        let moves = self.moves;

        let mut accel = Vec3::ZERO;
        if moves.forward {
            accel += direction;
        }
        if moves.back {
            accel -= direction;
        }
        if moves.right {
            accel += right;
        }
        if moves.left {
            accel -= right;
        }
        if moves.up {
            accel += up;
        }
        if moves.down {
            accel -= up;
        }

        let top_speed = if moves.fast {
            self.top_speed * FAST_FACTOR
        } else {
            self.top_speed
        };
        if accel.length_squared() != 0.0 {
            self.velocity += accel.normalize() * top_speed * elapsed * ACCEL;
        } else {
            self.velocity -= self.velocity * elapsed * ACCEL;
        }
        let squared = self.velocity.length_squared();
        if squared > top_speed * top_speed {
            self.velocity = self.velocity.normalize() * top_speed;
        } else if squared < f32::EPSILON * f32::EPSILON {
            self.velocity = Vec3::ZERO;
        }

        if self.velocity != Vec3::ZERO {
            let offset = self.velocity * elapsed;
            let _ = self
                .manager
                .update_camera(&self.camera, |camera| camera.position += offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn setup() -> (SceneManager, CameraMan) {
        let scene = SceneManager::new("test");
        scene.create_camera("eye").unwrap();
        let man = CameraMan::new(&scene, "eye");
        (scene, man)
    }

    fn key(name: &str) -> KeyEvent {
        KeyEvent::new(KeyCode::from_name(name).unwrap())
    }

    #[test]
    fn holding_forward_flies_along_the_view() {
        let (scene, mut man) = setup();
        man.inject_key_down(&key("W"));
        for _ in 0..10 {
            man.frame(0.1);
        }
        assert!((man.velocity() - Vec3::new(0.0, 0.0, -150.0)).length() < 1e-3);
        assert!(scene.camera("eye").unwrap().position.z < -100.0);

        man.inject_key_up(&key("W"));
        man.frame(0.05);
        assert!((man.velocity().length() - 75.0).abs() < 1e-2);
    }

    #[test]
    fn shift_raises_the_top_speed() {
        let (_scene, mut man) = setup();
        man.inject_key_down(&key("LShift"));
        man.inject_key_down(&key("PageUp"));
        for _ in 0..40 {
            man.frame(0.1);
        }
        assert!((man.velocity() - Vec3::new(0.0, 3000.0, 0.0)).length() < 1e-1);
        man.stop();
        assert_eq!(man.velocity(), Vec3::ZERO);
    }

    #[test]
    fn mouse_turns_the_camera() {
        let (scene, mut man) = setup();
        // 600 pixels at 0.15 degrees each is a quarter turn
        man.inject_mouse_move(&MouseEvent::moved(-600, 0));
        let orientation = scene.camera("eye").unwrap().orientation;
        let expected = Quat::from_rotation_y(FRAC_PI_2);
        assert!(orientation.angle_between(expected) < 1e-4);
    }
}

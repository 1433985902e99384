//! Maps keyboard and mouse input to commands for the bound actors.
//!
//! | Input           | Player one                  |
//! |-----------------|-----------------------------|
//! | Up / Down       | forward / backward          |
//! | Left / Right    | turn left / right           |
//! | Z / A           | look up / down              |
//! | Comma / Period  | strafe left / right         |
//! | X               | reset camera                |
//! | Shift           | run                         |
//! | Space (release) | jump                        |
//! | Mouse           | turn and look               |

use crate::actor::ActorCommand;
use crate::input::{KeyCode, KeyEvent, MouseButton, MouseEvent, NamedKey};

pub const DEFAULT_MOUSE_DROP_THRESHOLD: i32 = 50;

/// Commands for one actor. When `consumed` is false the input should still
/// be reported as unhandled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub actor: String,
    pub commands: Vec<ActorCommand>,
    pub consumed: bool,
}

#[derive(Debug, Clone)]
pub struct Controller {
    actors: Vec<String>,
    mouse_drop_threshold: i32,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(DEFAULT_MOUSE_DROP_THRESHOLD)
    }
}

impl Controller {
    pub fn new(mouse_drop_threshold: i32) -> Self {
        Self {
            actors: Vec::new(),
            mouse_drop_threshold,
        }
    }

    /// Binds an actor by id. The first bound actor is player one.
    pub fn bind(&mut self, actor: &str) {
        self.actors.push(actor.to_string());
    }

    pub fn unbind_all(&mut self) {
        self.actors.clear();
    }

    pub fn bound(&self) -> &[String] {
        &self.actors
    }

    pub fn player_one(&self) -> Option<&str> {
        self.actors.first().map(String::as_str)
    }

    fn route(&self, commands: Vec<ActorCommand>, consumed: bool) -> Option<Routed> {
        Some(Routed {
            actor: self.player_one()?.to_string(),
            commands,
            consumed,
        })
    }

    pub fn key_pressed(&self, event: &KeyEvent) -> Option<Routed> {
        use ActorCommand::*;
        let command = match event.key {
            KeyCode::Named(NamedKey::Up) => BeginForward,
            KeyCode::Named(NamedKey::Down) => BeginBackward,
            KeyCode::Named(NamedKey::Left) => BeginTurnLeft,
            KeyCode::Named(NamedKey::Right) => BeginTurnRight,
            KeyCode::Named(NamedKey::Comma) => BeginStrafeLeft,
            KeyCode::Named(NamedKey::Period) => BeginStrafeRight,
            key if key.is_char('z') => BeginLookUp,
            key if key.is_char('a') => BeginLookDown,
            key if key.is_char('x') => ResetCamera,
            key if key.is_shift() => return self.route(vec![BeginRun], false),
            _ => return None,
        };
        self.route(vec![command], true)
    }

    pub fn key_released(&self, event: &KeyEvent) -> Option<Routed> {
        use ActorCommand::*;
        let command = match event.key {
            KeyCode::Named(NamedKey::Up) => EndForward,
            KeyCode::Named(NamedKey::Down) => EndBackward,
            KeyCode::Named(NamedKey::Left) => EndTurnLeft,
            KeyCode::Named(NamedKey::Right) => EndTurnRight,
            KeyCode::Named(NamedKey::Comma) => EndStrafeLeft,
            KeyCode::Named(NamedKey::Period) => EndStrafeRight,
            KeyCode::Named(NamedKey::Space) => return self.route(vec![Jump], false),
            key if key.is_char('z') => EndLookUp,
            key if key.is_char('a') => EndLookDown,
            key if key.is_shift() => return self.route(vec![EndRun], false),
            _ => return None,
        };
        self.route(vec![command], true)
    }

    /// Turns and pitches player one, dropping wild movements.
    pub fn mouse_moved(&self, event: &MouseEvent) -> Option<Routed> {
        let limit = self.mouse_drop_threshold;
        if event.x.rel.abs() > limit || event.y.rel.abs() > limit {
            return None;
        }
        self.route(
            vec![
                ActorCommand::TurnLeftRight(event.x.rel),
                ActorCommand::LookUpDown(event.y.rel),
            ],
            true,
        )
    }

    pub fn mouse_pressed(&self, _event: &MouseEvent, _button: MouseButton) -> Option<Routed> {
        None
    }

    pub fn mouse_released(&self, _event: &MouseEvent, _button: MouseButton) -> Option<Routed> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> KeyEvent {
        KeyEvent::new(KeyCode::from_name(name).unwrap())
    }

    fn bound() -> Controller {
        let mut controller = Controller::default();
        controller.bind("hero");
        controller.bind("sidekick");
        controller
    }

    #[test]
    fn nothing_is_routed_without_actors() {
        let controller = Controller::default();
        assert_eq!(controller.key_pressed(&key("Up")), None);
        assert_eq!(controller.mouse_moved(&MouseEvent::moved(3, 4)), None);
    }

    #[test]
    fn keys_drive_player_one() {
        let controller = bound();
        assert_eq!(controller.player_one(), Some("hero"));
        let routed = controller.key_pressed(&key("Up")).unwrap();
        assert_eq!(routed.actor, "hero");
        assert_eq!(routed.commands, [ActorCommand::BeginForward]);
        assert!(routed.consumed);

        let routed = controller.key_released(&key("z")).unwrap();
        assert_eq!(routed.commands, [ActorCommand::EndLookUp]);
        let routed = controller.key_pressed(&key("Comma")).unwrap();
        assert_eq!(routed.commands, [ActorCommand::BeginStrafeLeft]);
        assert_eq!(
            controller.key_pressed(&key("X")).unwrap().commands,
            [ActorCommand::ResetCamera]
        );
        assert_eq!(controller.key_released(&key("X")), None);
        assert_eq!(controller.key_pressed(&key("Q")), None);
    }

    #[test]
    fn run_and_jump_are_not_consumed() {
        let controller = bound();
        let run = controller.key_pressed(&key("LShift")).unwrap();
        assert_eq!(run.commands, [ActorCommand::BeginRun]);
        assert!(!run.consumed);
        let walk = controller.key_released(&key("RShift")).unwrap();
        assert_eq!(walk.commands, [ActorCommand::EndRun]);
        let jump = controller.key_released(&key("Space")).unwrap();
        assert_eq!(jump.commands, [ActorCommand::Jump]);
        assert!(!jump.consumed);
        assert_eq!(controller.key_pressed(&key("Space")), None);
    }

    #[test]
    fn wild_mouse_movement_is_dropped() {
        let controller = bound();
        assert_eq!(controller.mouse_moved(&MouseEvent::moved(51, 0)), None);
        assert_eq!(controller.mouse_moved(&MouseEvent::moved(0, -51)), None);
        let routed = controller.mouse_moved(&MouseEvent::moved(50, -7)).unwrap();
        assert_eq!(
            routed.commands,
            [
                ActorCommand::TurnLeftRight(50),
                ActorCommand::LookUpDown(-7)
            ]
        );
        assert_eq!(
            controller.mouse_pressed(&MouseEvent::default(), MouseButton::LEFT),
            None
        );
    }

    #[test]
    fn unbinding_clears_every_actor() {
        let mut controller = bound();
        controller.unbind_all();
        assert!(controller.bound().is_empty());
        assert_eq!(controller.player_one(), None);
    }
}

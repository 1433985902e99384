//! Actors: props with autonomous movement and cameras of their own.
//!
//! Movement comes in two flavours. Discrete moves (`forward`, `turn_left`,
//! ...) shift the actor immediately by a fixed step. Smoothed moves are
//! started with `begin_*` and stopped with `end_*`; while active,
//! [`Actor::update`] accelerates the actor towards its top speed and lets it
//! decelerate once input stops.

use glam::{Quat, Vec3};
use log::warn;

use crate::camera::{Camera, CameraRig, CameraType};
use crate::dynamics::{BodyHandle, Dynamics};
use crate::error::AttachError;
use crate::graph::{NodeId, SceneManager};
use crate::loadable::{AssetContext, AssetKind};
use crate::node::{NodeBinding, Placeable};
use crate::prop::Prop;

pub const ACTOR_WALK_SPEED: f32 = 150.0;
pub const ACTOR_WALK_ACCEL: f32 = 10.0;
pub const ACTOR_WALK_DECEL: f32 = 10.0;
pub const ACTOR_WALK_DIST: f32 = 5.0;
pub const ACTOR_RUN_FACTOR: f32 = 10.0;
pub const ACTOR_CREEP_FACTOR: f32 = 0.5;

pub const ACTOR_TURN_SPEED: f32 = 4.0;
pub const ACTOR_TURN_STEP: f32 = 0.25;
pub const ACTOR_TURN_ACCEL: f32 = 10.0;
pub const ACTOR_TURN_DECEL: f32 = 10.0;
pub const ACTOR_TURN_ANGLE: f32 = 0.15;
pub const ACTOR_TURN_FACTOR: f32 = 0.005;

pub const ACTOR_CAM_PITCH_SPEED: f32 = 4.0;
pub const ACTOR_CAM_PITCH_STEP: f32 = 0.25;
pub const ACTOR_CAM_PITCH_ACCEL: f32 = 10.0;
pub const ACTOR_CAM_PITCH_DECEL: f32 = 10.0;
pub const ACTOR_CAM_PITCH_ANGLE: f32 = 0.15;
pub const ACTOR_CAM_PITCH_FACTOR: f32 = 0.005;

/// Offset of a newly created camera from the actor's node.
const CAMERA_OFFSET: Vec3 = Vec3::new(0.0, 75.0, 150.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveSpeed {
    /// Keep whatever speed is set.
    #[default]
    Current,
    Creep,
    Walk,
    Run,
}

/// Something an input device asked an actor to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorCommand {
    BeginForward,
    EndForward,
    BeginBackward,
    EndBackward,
    BeginTurnLeft,
    EndTurnLeft,
    BeginTurnRight,
    EndTurnRight,
    BeginStrafeLeft,
    EndStrafeLeft,
    BeginStrafeRight,
    EndStrafeRight,
    BeginLookUp,
    EndLookUp,
    BeginLookDown,
    EndLookDown,
    BeginRun,
    EndRun,
    ResetCamera,
    Jump,
    TurnLeftRight(i32),
    LookUpDown(i32),
}

/// The character an actor is playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterLink {
    pub title: String,
    pub level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTuning {
    pub top_speed: f32,
    pub accel: f32,
    pub decel: f32,
    pub step: f32,
    pub run_factor: f32,
    pub creep_factor: f32,
}

impl Default for LinearTuning {
    fn default() -> Self {
        Self {
            top_speed: ACTOR_WALK_SPEED,
            accel: ACTOR_WALK_ACCEL,
            decel: ACTOR_WALK_DECEL,
            step: ACTOR_WALK_DIST,
            run_factor: ACTOR_RUN_FACTOR,
            creep_factor: ACTOR_CREEP_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularTuning {
    pub speed: f32,
    pub step: f32,
    pub accel: f32,
    pub decel: f32,
    /// Angle of one discrete move.
    pub angle: f32,
    /// Radians per pixel of mouse movement.
    pub factor: f32,
}

impl AngularTuning {
    pub const TURN: Self = Self {
        speed: ACTOR_TURN_SPEED,
        step: ACTOR_TURN_STEP,
        accel: ACTOR_TURN_ACCEL,
        decel: ACTOR_TURN_DECEL,
        angle: ACTOR_TURN_ANGLE,
        factor: ACTOR_TURN_FACTOR,
    };

    pub const CAMERA_PITCH: Self = Self {
        speed: ACTOR_CAM_PITCH_SPEED,
        step: ACTOR_CAM_PITCH_STEP,
        accel: ACTOR_CAM_PITCH_ACCEL,
        decel: ACTOR_CAM_PITCH_DECEL,
        angle: ACTOR_CAM_PITCH_ANGLE,
        factor: ACTOR_CAM_PITCH_FACTOR,
    };
}

#[derive(Debug, Clone, Copy, Default)]
struct Inputs {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    clockwise: bool,
    counter_clockwise: bool,
    look_up: bool,
    look_down: bool,
}

#[derive(Debug)]
pub struct Actor {
    prop: Prop,
    character: Option<CharacterLink>,
    health: f64,
    level: u32,
    cameras: [Option<CameraRig>; CameraType::COUNT],
    inputs: Inputs,
    speed: MoveSpeed,
    velocity: Vec3,
    turn_velocity: f32,
    pitch_velocity: f32,
    walk: LinearTuning,
    turn: AngularTuning,
    camera_pitch: AngularTuning,
}

impl Actor {
    pub fn new(name: &str, cx: &AssetContext) -> Self {
        Self {
            prop: Prop::with_kind(name, AssetKind::Actor, cx),
            character: None,
            health: 100.0,
            level: 1,
            cameras: Default::default(),
            inputs: Inputs::default(),
            speed: MoveSpeed::Walk,
            velocity: Vec3::ZERO,
            turn_velocity: 0.0,
            pitch_velocity: 0.0,
            walk: LinearTuning::default(),
            turn: AngularTuning::TURN,
            camera_pitch: AngularTuning::CAMERA_PITCH,
        }
    }

    /// Creates and loads an actor, returning `None` if it cannot be loaded.
    pub fn create(name: &str, cx: &AssetContext) -> Option<Self> {
        let mut actor = Self::new(name, cx);
        actor.prop.loadable_mut().load().ok()?;
        Some(actor)
    }

    pub fn prop(&self) -> &Prop {
        &self.prop
    }

    pub fn prop_mut(&mut self) -> &mut Prop {
        &mut self.prop
    }

    pub fn name(&self) -> &str {
        self.prop.name()
    }

    /// Name of the actor's node, or its resource group while detached.
    pub fn id(&self) -> String {
        self.node_name()
            .unwrap_or_else(|| self.group().to_string())
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn character(&self) -> Option<&CharacterLink> {
        self.character.as_ref()
    }

    pub fn set_character(&mut self, character: Option<CharacterLink>) {
        if let Some(link) = &character {
            self.level = link.level;
        }
        self.character = character;
    }

    pub fn speed(&self) -> MoveSpeed {
        self.speed
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn tuning(&self) -> LinearTuning {
        self.walk
    }

    pub fn set_tuning(&mut self, tuning: LinearTuning) {
        self.walk = tuning;
    }

    fn live(&self) -> Option<(SceneManager, NodeId)> {
        let binding = self.prop.binding();
        Some((binding.manager()?.clone(), binding.node()?))
    }

    /// Adds the actor's rigid body. Actors playing a character are moved
    /// by their controls rather than by the simulation.
    pub fn attach_physics(&mut self, dynamics: &Dynamics) -> Result<BodyHandle, AttachError> {
        let handle = self.prop.attach_physics(dynamics)?;
        if self.character.is_some() {
            dynamics.with_body(handle, |body| {
                body.set_kinematic(true);
                body.set_mass_props(0.0, Vec3::ZERO);
            });
        }
        Ok(handle)
    }

    /// Creates a camera on the actor's node and makes it the active camera
    /// of its type. The caller owns the camera.
    pub fn create_camera(&mut self, camera_type: CameraType) -> Option<Camera> {
        let (manager, node) = self.live()?;
        let name = format!("{}::camera[{}]", self.id(), camera_type.index());
        let mut camera = Camera::new(&name, &manager)
            .map_err(|err| warn!("cannot create camera {name}: {err}"))
            .ok()?;
        camera.set_camera_type(camera_type);
        camera.set_actor(Some(self.id()));
        camera
            .attach(node)
            .map_err(|err| warn!("cannot attach camera {name}: {err}"))
            .ok()?;
        camera.set_limit_pitch(true);
        camera.translate(CAMERA_OFFSET);
        self.set_active_camera(&camera);
        Some(camera)
    }

    pub fn reset_active_cameras(&mut self) {
        self.cameras = Default::default();
    }

    pub fn set_active_camera(&mut self, camera: &Camera) {
        if let Some(rig) = camera.rig() {
            self.cameras[camera.camera_type().index()] = Some(rig);
        }
    }

    pub fn active_camera(&self, camera_type: CameraType) -> Option<&CameraRig> {
        self.cameras[camera_type.index()].as_ref()
    }

    fn first_person(&self) -> Option<&CameraRig> {
        self.active_camera(CameraType::FirstPerson)
    }

    /// Advances smoothed movement by `elapsed` seconds. Returns false when
    /// the actor is not in a scene.
    pub fn update(&mut self, elapsed: f32) -> bool {
        let Some((manager, node)) = self.live() else {
            return false;
        };
        let orientation = manager.orientation(node).unwrap_or(Quat::IDENTITY);
        let top_speed = match self.speed {
            MoveSpeed::Run => self.walk.top_speed * self.walk.run_factor,
            MoveSpeed::Creep => self.walk.top_speed * self.walk.creep_factor,
            _ => self.walk.top_speed,
        };

        let mut direction = Vec3::ZERO;
        if self.inputs.forward {
            direction -= orientation * Vec3::Z;
        }
        if self.inputs.backward {
            direction += orientation * Vec3::Z;
        }
        if self.inputs.left {
            direction -= orientation * Vec3::X;
        }
        if self.inputs.right {
            direction += orientation * Vec3::X;
        }
        self.velocity = accelerate_linear(
            self.velocity,
            direction,
            top_speed,
            self.walk.accel,
            self.walk.decel,
            elapsed,
        );
        if self.velocity != Vec3::ZERO {
            manager.translate(node, self.velocity * elapsed);
        }

        self.turn_velocity = accelerate_angular(
            self.turn_velocity,
            self.inputs.counter_clockwise,
            self.inputs.clockwise,
            &self.turn,
            elapsed,
        );
        if self.turn_velocity != 0.0 {
            manager.yaw(node, self.turn_velocity * elapsed);
        }

        self.pitch_velocity = accelerate_angular(
            self.pitch_velocity,
            self.inputs.look_up,
            self.inputs.look_down,
            &self.camera_pitch,
            elapsed,
        );
        if self.pitch_velocity != 0.0 {
            if let Some(camera) = self.first_person() {
                camera.pitch(self.pitch_velocity * elapsed);
            }
        }
        true
    }

    /// Runs a command from an input device.
    pub fn apply(&mut self, command: ActorCommand) {
        use ActorCommand::*;
        let speed = MoveSpeed::Current;
        match command {
            BeginForward => self.begin_forward(speed),
            EndForward => self.end_forward(),
            BeginBackward => self.begin_backward(speed),
            EndBackward => self.end_backward(),
            BeginTurnLeft => self.begin_turn_left(),
            EndTurnLeft => self.end_turn_left(),
            BeginTurnRight => self.begin_turn_right(),
            EndTurnRight => self.end_turn_right(),
            BeginStrafeLeft => self.begin_strafe_left(speed),
            EndStrafeLeft => self.end_strafe_left(),
            BeginStrafeRight => self.begin_strafe_right(speed),
            EndStrafeRight => self.end_strafe_right(),
            BeginLookUp => self.begin_look_up(),
            EndLookUp => self.end_look_up(),
            BeginLookDown => self.begin_look_down(),
            EndLookDown => self.end_look_down(),
            BeginRun => self.begin_run(),
            EndRun => self.end_run(),
            ResetCamera => self.reset_camera(),
            Jump => self.jump(),
            TurnLeftRight(distance) => self.turn_left_right(distance),
            LookUpDown(distance) => self.look_up_down(distance),
        }
    }

    pub fn set_speed(&mut self, speed: MoveSpeed) {
        if speed != MoveSpeed::Current {
            self.speed = speed;
        }
    }

    pub fn begin_run(&mut self) {
        if self.speed == MoveSpeed::Walk {
            self.set_speed(MoveSpeed::Run);
        }
    }

    pub fn end_run(&mut self) {
        if self.speed == MoveSpeed::Run {
            self.set_speed(MoveSpeed::Walk);
        }
    }

    pub fn forward(&mut self, speed: MoveSpeed) {
        if let Some((manager, node)) = self.live() {
            self.set_speed(speed);
            manager.translate_local(node, Vec3::new(0.0, 0.0, -self.walk.step));
        }
    }

    pub fn backward(&mut self, _speed: MoveSpeed) {
        if let Some((manager, node)) = self.live() {
            manager.translate_local(node, Vec3::new(0.0, 0.0, self.walk.step));
        }
    }

    pub fn turn_left(&mut self, speed: MoveSpeed) {
        if let Some((manager, node)) = self.live() {
            manager.yaw(node, self.turn.angle);
            self.set_speed(speed);
        }
    }

    pub fn turn_right(&mut self, speed: MoveSpeed) {
        if let Some((manager, node)) = self.live() {
            self.set_speed(speed);
            manager.yaw(node, -self.turn.angle);
        }
    }

    /// Turns by a mouse movement of `distance` pixels.
    pub fn turn_left_right(&mut self, distance: i32) {
        if let Some((manager, node)) = self.live() {
            manager.yaw(node, -(distance as f32) * self.turn.factor);
        }
    }

    pub fn strafe_left(&mut self, speed: MoveSpeed) {
        if let Some((manager, node)) = self.live() {
            self.set_speed(speed);
            manager.translate(node, Vec3::new(-self.walk.step, 0.0, 0.0));
        }
    }

    pub fn strafe_right(&mut self, speed: MoveSpeed) {
        if let Some((manager, node)) = self.live() {
            self.set_speed(speed);
            manager.translate(node, Vec3::new(self.walk.step, 0.0, 0.0));
        }
    }

    pub fn look_up(&mut self) {
        if self.live().is_some() {
            if let Some(camera) = self.first_person() {
                camera.pitch(-self.camera_pitch.angle);
            }
        }
    }

    pub fn look_down(&mut self) {
        if self.live().is_some() {
            if let Some(camera) = self.first_person() {
                camera.pitch(self.camera_pitch.angle);
            }
        }
    }

    /// Pitches the first-person camera by a mouse movement of `distance`
    /// pixels.
    pub fn look_up_down(&mut self, distance: i32) {
        if self.live().is_some() {
            if let Some(camera) = self.first_person() {
                camera.pitch(distance as f32 * self.camera_pitch.factor);
            }
        }
    }

    /// Levels the first-person camera.
    pub fn reset_camera(&mut self) {
        if let Some((manager, _)) = self.live() {
            if let Some(camera) = self.first_person() {
                manager.reset_orientation(camera.pitch_node());
            }
        }
    }

    fn set_input(&mut self, speed: Option<MoveSpeed>, set: impl FnOnce(&mut Inputs)) {
        if self.live().is_none() {
            return;
        }
        set(&mut self.inputs);
        if let Some(speed) = speed {
            self.set_speed(speed);
        }
    }

    pub fn begin_forward(&mut self, speed: MoveSpeed) {
        self.set_input(Some(speed), |i| i.forward = true);
    }

    pub fn end_forward(&mut self) {
        self.set_input(None, |i| i.forward = false);
    }

    pub fn begin_backward(&mut self, speed: MoveSpeed) {
        self.set_input(Some(speed), |i| i.backward = true);
    }

    pub fn end_backward(&mut self) {
        self.set_input(None, |i| i.backward = false);
    }

    pub fn begin_turn_left(&mut self) {
        self.set_input(None, |i| i.counter_clockwise = true);
    }

    pub fn end_turn_left(&mut self) {
        self.set_input(None, |i| i.counter_clockwise = false);
    }

    pub fn begin_turn_right(&mut self) {
        self.set_input(None, |i| i.clockwise = true);
    }

    pub fn end_turn_right(&mut self) {
        self.set_input(None, |i| i.clockwise = false);
    }

    pub fn begin_strafe_left(&mut self, speed: MoveSpeed) {
        self.set_input(Some(speed), |i| i.left = true);
    }

    pub fn end_strafe_left(&mut self) {
        self.set_input(None, |i| i.left = false);
    }

    pub fn begin_strafe_right(&mut self, speed: MoveSpeed) {
        self.set_input(Some(speed), |i| i.right = true);
    }

    pub fn end_strafe_right(&mut self) {
        self.set_input(None, |i| i.right = false);
    }

    pub fn begin_look_up(&mut self) {
        self.set_input(None, |i| i.look_up = true);
    }

    pub fn end_look_up(&mut self) {
        self.set_input(None, |i| i.look_up = false);
    }

    pub fn begin_look_down(&mut self) {
        self.set_input(None, |i| i.look_down = true);
    }

    pub fn end_look_down(&mut self) {
        self.set_input(None, |i| i.look_down = false);
    }

    // Hooks for behaviour the engine does not model yet.
    pub fn crouch(&mut self) {}
    pub fn jump(&mut self) {}
    pub fn zoom(&mut self) {}
    pub fn primary_fire(&mut self) {}
    pub fn secondary_fire(&mut self) {}
    pub fn special(&mut self) {}
    pub fn switch_weapon(&mut self, _index: usize) {}
    pub fn prev_weapon(&mut self) {}
    pub fn next_weapon(&mut self) {}
}

/// Speeds `velocity` up along `direction`, or slows it down when there is
/// no direction, never exceeding `top_speed`.
fn accelerate_linear(
    velocity: Vec3,
    direction: Vec3,
    top_speed: f32,
    accel: f32,
    decel: f32,
    elapsed: f32,
) -> Vec3 {
    let mut velocity = if direction.length_squared() != 0.0 {
        velocity + direction.normalize() * top_speed * elapsed * accel
    } else {
        velocity - velocity * elapsed * decel
    };
    let squared = velocity.length_squared();
    if squared > top_speed * top_speed {
        velocity = velocity.normalize() * top_speed;
    } else if squared < f32::EPSILON * f32::EPSILON {
        velocity = Vec3::ZERO;
    }
    velocity
}

/// Angular counterpart of [`accelerate_linear`]: `back` pushes the velocity
/// up by one step, `forward` pulls it down.
fn accelerate_angular(
    velocity: f32,
    back: bool,
    forward: bool,
    tuning: &AngularTuning,
    elapsed: f32,
) -> f32 {
    let mut accel = 0.0;
    if back {
        accel += tuning.step;
    }
    if forward {
        accel -= tuning.step;
    }
    let velocity = if accel != 0.0 {
        velocity + accel * tuning.speed * elapsed * tuning.accel
    } else {
        velocity - velocity * elapsed * tuning.decel
    };
    if velocity.abs() > tuning.speed {
        tuning.speed.copysign(velocity)
    } else if velocity.abs() < f32::EPSILON {
        0.0
    } else {
        velocity
    }
}

impl Placeable for Actor {
    fn binding(&self) -> &NodeBinding {
        self.prop.binding()
    }

    fn binding_mut(&mut self) -> &mut NodeBinding {
        self.prop.binding_mut()
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Actor
    }

    fn group(&self) -> &str {
        self.prop.group()
    }

    fn prepare(&mut self) -> Result<(), AttachError> {
        self.prop.prepare()
    }

    fn populate(&mut self, manager: &SceneManager, node: NodeId, id: &str) -> Result<(), AttachError> {
        self.prop.populate(manager, node, id)
    }

    fn release(&mut self) {
        self.reset_active_cameras();
        self.prop.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::AssetTree;
    use std::f32::consts::FRAC_PI_2;

    fn placed(assets: &AssetTree, scene: &SceneManager) -> Actor {
        let mut actor = Actor::new("player", assets.context());
        actor.attach_to_scene(scene, "").unwrap();
        actor
    }

    fn position(actor: &Actor) -> Vec3 {
        actor.transform().position
    }

    #[test]
    fn detached_actors_ignore_movement() {
        let assets = AssetTree::stock();
        let mut actor = Actor::new("player", assets.context());
        actor.begin_forward(MoveSpeed::Run);
        actor.forward(MoveSpeed::Current);
        assert!(!actor.update(0.1));
        assert_eq!(actor.speed(), MoveSpeed::Walk);
        assert_eq!(position(&actor), Vec3::ZERO);
        assert!(actor.create_camera(CameraType::FirstPerson).is_none());
    }

    #[test]
    fn discrete_moves_use_fixed_steps() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut actor = placed(&assets, &scene);

        actor.forward(MoveSpeed::Current);
        assert!((position(&actor) - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
        actor.strafe_right(MoveSpeed::Creep);
        assert_eq!(actor.speed(), MoveSpeed::Creep);
        assert!((position(&actor) - Vec3::new(5.0, 0.0, -5.0)).length() < 1e-5);

        actor.turn_left(MoveSpeed::Current);
        let (axis, angle) = actor.transform().orientation.to_axis_angle();
        assert!((angle - ACTOR_TURN_ANGLE).abs() < 1e-5);
        assert!((axis - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn smoothed_forward_accelerates_to_top_speed_and_decelerates() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut actor = placed(&assets, &scene);

        actor.apply(ActorCommand::BeginForward);
        assert!(actor.update(0.05));
        assert!((actor.velocity() - Vec3::new(0.0, 0.0, -75.0)).length() < 1e-3);
        actor.update(0.05);
        actor.update(0.05);
        assert!((actor.velocity().length() - ACTOR_WALK_SPEED).abs() < 1e-3);
        assert!(position(&actor).z < 0.0);

        actor.apply(ActorCommand::EndForward);
        actor.update(0.05);
        assert!((actor.velocity().length() - ACTOR_WALK_SPEED * 0.5).abs() < 1e-2);
    }

    #[test]
    fn running_raises_top_speed() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut actor = placed(&assets, &scene);
        actor.begin_run();
        assert_eq!(actor.speed(), MoveSpeed::Run);
        actor.begin_forward(MoveSpeed::Current);
        for _ in 0..20 {
            actor.update(0.1);
        }
        assert!((actor.velocity().length() - ACTOR_WALK_SPEED * ACTOR_RUN_FACTOR).abs() < 1e-2);
        actor.end_run();
        assert_eq!(actor.speed(), MoveSpeed::Walk);
        actor.end_run();
        assert_eq!(actor.speed(), MoveSpeed::Walk);
    }

    #[test]
    fn forward_follows_the_actor_heading() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut actor = placed(&assets, &scene);
        actor.yaw(FRAC_PI_2);
        actor.begin_forward(MoveSpeed::Current);
        actor.update(0.05);
        let velocity = actor.velocity();
        assert!(velocity.x < -74.0 && velocity.z.abs() < 1e-3);
    }

    #[test]
    fn turning_is_capped() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut actor = placed(&assets, &scene);
        actor.apply(ActorCommand::BeginTurnLeft);
        for _ in 0..50 {
            actor.update(0.1);
        }
        assert_eq!(actor.turn_velocity, ACTOR_TURN_SPEED);
        actor.apply(ActorCommand::EndTurnLeft);
        actor.apply(ActorCommand::BeginTurnRight);
        for _ in 0..100 {
            actor.update(0.1);
        }
        assert_eq!(actor.turn_velocity, -ACTOR_TURN_SPEED);
    }

    #[test]
    fn cameras_hang_off_the_actor() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut actor = placed(&assets, &scene);
        let camera = actor.create_camera(CameraType::FirstPerson).unwrap();

        assert_eq!(camera.name(), "actor::player::camera[1]");
        assert_eq!(camera.actor(), Some("actor::player"));
        assert!(camera.limit_pitch());
        assert_eq!(scene.parent(camera.node().unwrap()), actor.node());
        assert_eq!(scene.position(camera.node().unwrap()), Some(CAMERA_OFFSET));
        assert!(actor.active_camera(CameraType::FirstPerson).is_some());

        actor.look_down();
        let pitch = camera.pitch_node().unwrap();
        assert_ne!(scene.orientation(pitch), Some(Quat::IDENTITY));
        actor.apply(ActorCommand::ResetCamera);
        assert_eq!(scene.orientation(pitch), Some(Quat::IDENTITY));

        actor.reset_active_cameras();
        actor.look_down();
        assert_eq!(scene.orientation(pitch), Some(Quat::IDENTITY));
    }

    #[test]
    fn characters_set_level_and_make_bodies_kinematic() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let dynamics = Dynamics::new(Vec3::ZERO);
        let mut actor = placed(&assets, &scene);
        actor.set_character(Some(CharacterLink {
            title: "Hero".into(),
            level: 7,
        }));
        assert_eq!(actor.level(), 7);
        assert_eq!(actor.health(), 100.0);

        let handle = actor.attach_physics(&dynamics).unwrap();
        assert_eq!(dynamics.with_body(handle, |b| b.is_kinematic()), Some(true));
        assert_eq!(dynamics.with_body(handle, |b| b.mass()), Some(0.0));
    }
}

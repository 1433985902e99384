use std::fmt;
use std::sync::Arc;

use glam::{Quat, Vec3};
use log::trace;
use parking_lot::Mutex;

use crate::graph::{NodeId, SceneManager};

/// Upper bound on fixed sub-steps taken per frame.
pub const DYNAMICS_MAX_SUBSTEPS: u32 = 4;

/// Length of one internal simulation step in seconds.
pub const FIXED_TIME_STEP: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl CollisionShape {
    /// The shape with a local scaling applied.
    pub fn scaled(self, scale: Vec3) -> Self {
        match self {
            Self::Box { half_extents } => Self::Box {
                half_extents: half_extents * scale,
            },
            Self::Sphere { radius } => Self::Sphere {
                radius: radius * scale.x,
            },
        }
    }

    /// Diagonal of the inertia tensor for a solid body of `mass`.
    pub fn local_inertia(self, mass: f32) -> Vec3 {
        match self {
            Self::Box { half_extents } => {
                let size = half_extents * 2.0;
                let sq = size * size;
                Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0)
            }
            Self::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
        }
    }
}

/// Keeps a body and the object it moves in step.
pub trait MotionState: Send + fmt::Debug {
    /// World transform the body should start from (and follow when it is
    /// kinematic).
    fn world_transform(&self) -> Option<(Vec3, Quat)>;

    /// Receives the simulated world transform.
    fn set_world_transform(&mut self, position: Vec3, orientation: Quat);
}

/// Motion state bound to a scene graph node.
#[derive(Debug, Clone)]
pub struct NodeMotionState {
    manager: SceneManager,
    node: NodeId,
}

impl NodeMotionState {
    pub fn new(manager: SceneManager, node: NodeId) -> Self {
        Self { manager, node }
    }
}

impl MotionState for NodeMotionState {
    fn world_transform(&self) -> Option<(Vec3, Quat)> {
        Some((
            self.manager.derived_position(self.node)?,
            self.manager.derived_orientation(self.node)?,
        ))
    }

    fn set_world_transform(&mut self, position: Vec3, orientation: Quat) {
        self.manager
            .set_world_transform(self.node, position, orientation);
    }
}

#[derive(Debug)]
pub struct RigidBody {
    shape: CollisionShape,
    local_scaling: Vec3,
    mass: f32,
    local_inertia: Vec3,
    static_object: bool,
    kinematic: bool,
    linear_velocity: Vec3,
    total_force: Vec3,
    position: Vec3,
    orientation: Quat,
    motion_state: Option<Box<dyn MotionState>>,
}

impl RigidBody {
    /// A body with no mass is static.
    pub fn new(mass: f32, shape: CollisionShape) -> Self {
        Self {
            shape,
            local_scaling: Vec3::ONE,
            mass,
            local_inertia: shape.local_inertia(mass),
            static_object: mass == 0.0,
            kinematic: false,
            linear_velocity: Vec3::ZERO,
            total_force: Vec3::ZERO,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            motion_state: None,
        }
    }

    /// Binds a motion state and starts from its transform.
    pub fn with_motion_state(mut self, motion_state: impl MotionState + 'static) -> Self {
        if let Some((position, orientation)) = motion_state.world_transform() {
            self.position = position;
            self.orientation = orientation;
        }
        self.motion_state = Some(Box::new(motion_state));
        self
    }

    pub fn with_local_scaling(mut self, scale: Vec3) -> Self {
        self.local_scaling = scale;
        self.local_inertia = self.shape().local_inertia(self.mass);
        self
    }

    /// The collision shape with local scaling applied.
    pub fn shape(&self) -> CollisionShape {
        self.shape.scaled(self.local_scaling)
    }

    pub fn local_scaling(&self) -> Vec3 {
        self.local_scaling
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn local_inertia(&self) -> Vec3 {
        self.local_inertia
    }

    pub fn set_mass_props(&mut self, mass: f32, inertia: Vec3) {
        self.mass = mass;
        self.local_inertia = inertia;
        self.static_object = mass == 0.0;
    }

    pub fn set_static(&mut self, value: bool) {
        self.static_object = value;
    }

    pub fn set_kinematic(&mut self, value: bool) {
        self.kinematic = value;
    }

    pub fn is_static(&self) -> bool {
        self.static_object
    }

    pub fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    /// Only dynamic bodies are integrated.
    pub fn is_dynamic(&self) -> bool {
        !self.static_object && !self.kinematic && self.mass > 0.0
    }

    pub fn apply_central_force(&mut self, force: Vec3) {
        self.total_force += force;
    }

    pub fn clear_forces(&mut self) {
        self.total_force = Vec3::ZERO;
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_world_transform(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation;
    }

    fn pull_motion_state(&mut self) {
        if let Some((position, orientation)) = self
            .motion_state
            .as_ref()
            .and_then(|state| state.world_transform())
        {
            self.position = position;
            self.orientation = orientation;
        }
    }

    fn push_motion_state(&mut self) {
        let (position, orientation) = (self.position, self.orientation);
        if let Some(state) = self.motion_state.as_mut() {
            state.set_world_transform(position, orientation);
        }
    }

    /// Semi-implicit Euler: velocity first, then position.
    fn integrate(&mut self, gravity: Vec3, step: f32) {
        let acceleration = gravity + self.total_force / self.mass;
        self.linear_velocity += acceleration * step;
        self.position += self.linear_velocity * step;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(usize);

#[derive(Debug, Default)]
pub struct DynamicsWorld {
    gravity: Vec3,
    bodies: Vec<Option<RigidBody>>,
    accumulator: f32,
}

impl DynamicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..Self::default()
        }
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn add_rigid_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len());
        self.bodies.push(Some(body));
        handle
    }

    pub fn remove_rigid_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        self.bodies.get_mut(handle.0)?.take()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.0)?.as_ref()
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.0)?.as_mut()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    /// Advances the simulation by `elapsed` seconds in fixed steps.
    ///
    /// Time that does not fill a whole step carries over to the next call.
    /// At most `max_substeps` steps run; a limit of zero takes a single
    /// step of exactly `elapsed`. Returns the number of steps taken.
    pub fn step_simulation(&mut self, elapsed: f32, max_substeps: u32) -> u32 {
        let (steps, step) = if max_substeps == 0 {
            (1, elapsed)
        } else {
            self.accumulator += elapsed;
            let whole = (self.accumulator / FIXED_TIME_STEP + 1e-4).floor() as u32;
            self.accumulator = (self.accumulator - whole as f32 * FIXED_TIME_STEP).max(0.0);
            (whole.min(max_substeps), FIXED_TIME_STEP)
        };
        if steps == 0 {
            return 0;
        }

        let gravity = self.gravity;
        for body in self.bodies.iter_mut().flatten() {
            if body.is_dynamic() {
                for _ in 0..steps {
                    body.integrate(gravity, step);
                }
                body.push_motion_state();
            } else {
                body.pull_motion_state();
            }
        }
        trace!("dynamics: {steps} step(s) of {step}s");
        steps
    }
}

/// Shared handle to the dynamics world of a scene.
#[derive(Debug, Clone, Default)]
pub struct Dynamics {
    world: Arc<Mutex<DynamicsWorld>>,
}

impl Dynamics {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            world: Arc::new(Mutex::new(DynamicsWorld::new(gravity))),
        }
    }

    pub fn same_as(&self, other: &Dynamics) -> bool {
        Arc::ptr_eq(&self.world, &other.world)
    }

    pub fn gravity(&self) -> Vec3 {
        self.world.lock().gravity()
    }

    pub fn set_gravity(&self, gravity: Vec3) {
        self.world.lock().set_gravity(gravity);
    }

    pub fn add_rigid_body(&self, body: RigidBody) -> BodyHandle {
        self.world.lock().add_rigid_body(body)
    }

    pub fn remove_rigid_body(&self, handle: BodyHandle) -> Option<RigidBody> {
        self.world.lock().remove_rigid_body(handle)
    }

    /// Applies a mutation to the requested body.
    pub fn with_body<F, R>(&self, handle: BodyHandle, f: F) -> Option<R>
    where
        F: FnOnce(&mut RigidBody) -> R,
    {
        self.world.lock().body_mut(handle).map(f)
    }

    pub fn body_count(&self) -> usize {
        self.world.lock().body_count()
    }

    pub fn step_simulation(&self, elapsed: f32, max_substeps: u32) -> u32 {
        self.world.lock().step_simulation(elapsed, max_substeps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> CollisionShape {
        CollisionShape::Box {
            half_extents: Vec3::splat(50.0),
        }
    }

    #[test]
    fn zero_mass_bodies_are_static() {
        let body = RigidBody::new(0.0, cube());
        assert!(body.is_static());
        assert!(!body.is_dynamic());
        assert!(RigidBody::new(2.0, cube()).is_dynamic());
    }

    #[test]
    fn shapes_follow_local_scaling() {
        let body = RigidBody::new(1.0, cube()).with_local_scaling(Vec3::new(2.0, 1.0, 0.5));
        assert_eq!(
            body.shape(),
            CollisionShape::Box {
                half_extents: Vec3::new(100.0, 50.0, 25.0)
            }
        );
        let sphere = CollisionShape::Sphere { radius: 50.0 }.scaled(Vec3::splat(2.0));
        assert_eq!(sphere, CollisionShape::Sphere { radius: 100.0 });
    }

    #[test]
    fn dynamic_bodies_fall_under_gravity() {
        let mut world = DynamicsWorld::new(Vec3::new(0.0, -10.0, 0.0));
        let falling = world.add_rigid_body(RigidBody::new(1.0, cube()));
        let floor = world.add_rigid_body(RigidBody::new(0.0, cube()));

        assert_eq!(world.step_simulation(0.5, 60), 30);
        let velocity = world.body(falling).unwrap().linear_velocity();
        assert!((velocity.y + 5.0).abs() < 1e-3);
        assert!(world.body(falling).unwrap().position().y < 0.0);
        assert_eq!(world.body(floor).unwrap().position(), Vec3::ZERO);
    }

    #[test]
    fn substeps_are_capped() {
        let mut world = DynamicsWorld::new(Vec3::new(0.0, -6.0, 0.0));
        let body = world.add_rigid_body(RigidBody::new(1.0, cube()));
        assert_eq!(world.step_simulation(1.0, DYNAMICS_MAX_SUBSTEPS), 4);
        let velocity = world.body(body).unwrap().linear_velocity();
        assert!((velocity.y + 0.4).abs() < 1e-4);
    }

    #[test]
    fn short_frames_accumulate() {
        let mut world = DynamicsWorld::new(Vec3::ZERO);
        assert_eq!(world.step_simulation(FIXED_TIME_STEP * 0.5, 4), 0);
        assert_eq!(world.step_simulation(FIXED_TIME_STEP * 0.5, 4), 1);
    }

    #[test]
    fn kinematic_bodies_are_not_integrated() {
        let mut world = DynamicsWorld::new(Vec3::new(0.0, -10.0, 0.0));
        let mut body = RigidBody::new(1.0, cube());
        body.set_kinematic(true);
        let handle = world.add_rigid_body(body);
        world.step_simulation(0.1, 10);
        assert_eq!(world.body(handle).unwrap().linear_velocity(), Vec3::ZERO);
        assert!(world.remove_rigid_body(handle).is_some());
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn motion_state_moves_the_node() {
        let scene = SceneManager::new("physics");
        let node = scene.create_child_node(scene.root(), Some("ball")).unwrap();
        scene.set_position(node, Vec3::new(0.0, 100.0, 0.0));

        let dynamics = Dynamics::new(Vec3::new(0.0, -10.0, 0.0));
        let body = RigidBody::new(1.0, CollisionShape::Sphere { radius: 50.0 })
            .with_motion_state(NodeMotionState::new(scene.clone(), node));
        let handle = dynamics.add_rigid_body(body);
        assert_eq!(
            dynamics.with_body(handle, |b| b.position()),
            Some(Vec3::new(0.0, 100.0, 0.0))
        );

        dynamics.step_simulation(0.25, 60);
        let y = scene.position(node).unwrap().y;
        assert!(y < 100.0);
        assert_eq!(dynamics.with_body(handle, |b| b.position().y), Some(y));
    }
}

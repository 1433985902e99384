//! Application states: menus, gameplay and viewers, kept on a stack by
//! [`Core`](crate::core::Core).
//!
//! A state owns a scene manager, the scenes it shows and the player actors
//! and cameras living in them. States never touch the stack directly; they
//! queue requests on the [`CoreContext`] which the core applies once the
//! current event has been handled.

use std::fmt;

use glam::{Vec3, Vec4};
use log::{info, warn};

use crate::actor::{Actor, ActorCommand};
use crate::camera::{Camera, CameraType};
use crate::camera_man::CameraMan;
use crate::core::CoreContext;
use crate::dynamics::Dynamics;
use crate::graph::SceneManager;
use crate::input::{KeyCode, KeyEvent, MouseButton, MouseEvent};
use crate::light::Light;
use crate::loadable::{AssetContext, AssetKind};
use crate::node::Placeable;
use crate::prop::Prop;
use crate::scene::Scene;

/// Where freshly created players stand until scenes provide spawn points.
const PLAYER_SPAWN: Vec3 = Vec3::new(0.0, 0.0, 200.0);

/// A loaded asset instance.
#[derive(Debug)]
pub enum Asset {
    Scene(Scene),
    Prop(Prop),
    Actor(Actor),
    Light(Light),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::Scene(_) => AssetKind::Scene,
            Self::Prop(_) => AssetKind::Prop,
            Self::Actor(_) => AssetKind::Actor,
            Self::Light(_) => AssetKind::Light,
        }
    }
}

/// Creates loaded asset instances by kind and name.
pub trait AssetFactory: fmt::Debug {
    /// Returns `None` when the asset cannot be loaded.
    fn create(&self, kind: AssetKind, name: &str) -> Option<Asset>;
}

/// Loads every asset afresh from the assets root.
#[derive(Debug, Clone)]
pub struct StockFactory {
    cx: AssetContext,
}

impl StockFactory {
    pub fn new(cx: AssetContext) -> Self {
        Self { cx }
    }

    pub fn context(&self) -> &AssetContext {
        &self.cx
    }
}

impl AssetFactory for StockFactory {
    fn create(&self, kind: AssetKind, name: &str) -> Option<Asset> {
        let cx = &self.cx;
        let loaded = match kind {
            AssetKind::Scene => {
                let mut scene = Scene::new(name, cx);
                scene.load().map(|()| Asset::Scene(scene))
            }
            AssetKind::Prop => {
                let mut prop = Prop::new(name, cx);
                prop.loadable_mut().load().map(|()| Asset::Prop(prop))
            }
            AssetKind::Actor => {
                let mut actor = Actor::new(name, cx);
                actor
                    .prop_mut()
                    .loadable_mut()
                    .load()
                    .map(|()| Asset::Actor(actor))
            }
            AssetKind::Light => {
                let mut light = Light::new(name, cx);
                light.loadable_mut().load().map(|()| Asset::Light(light))
            }
        };
        match loaded {
            Ok(asset) => Some(asset),
            Err(err) => {
                warn!("failed to create {kind} instance `{name}`: {err}");
                None
            }
        }
    }
}

/// A change to the state stack requested by a state.
#[derive(Debug)]
pub enum StateCommand {
    Push(Box<dyn State>),
    Pop,
    Set(Box<dyn State>),
}

/// What every state has: its scene manager, players and cameras.
#[derive(Debug)]
pub struct StateBase {
    name: String,
    scene_manager: Option<SceneManager>,
    cameras: Vec<Camera>,
    actors: Vec<Actor>,
    player_camera: CameraType,
    overlay: bool,
    loaded: bool,
    scene: Option<String>,
    dynamics: Option<Dynamics>,
}

impl StateBase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scene_manager: None,
            cameras: Vec::new(),
            actors: Vec::new(),
            player_camera: CameraType::FirstPerson,
            overlay: false,
            loaded: false,
            scene: None,
            dynamics: None,
        }
    }

    /// Marks the state as drawn on top of the one below it.
    pub fn with_overlay(mut self) -> Self {
        self.overlay = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_overlay(&self) -> bool {
        self.overlay
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn scene_manager(&self) -> Option<&SceneManager> {
        self.scene_manager.as_ref()
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id() == id)
    }

    pub fn actor_mut(&mut self, id: &str) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|actor| actor.id() == id)
    }

    pub fn player_camera(&self) -> CameraType {
        self.player_camera
    }

    pub fn set_player_camera(&mut self, camera_type: CameraType) {
        self.player_camera = camera_type;
    }

    /// Name of the scene currently attached.
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn dynamics(&self) -> Option<&Dynamics> {
        self.dynamics.as_ref()
    }

    /// Creates an actor and a camera for every registered player.
    pub fn create_players(&mut self, cx: &mut CoreContext) {
        let Some(manager) = self.scene_manager.clone() else {
            return;
        };
        let count = cx.players.len();
        info!("there are {count} players registered");
        for index in 0..count {
            let factory = cx.factory.as_ref();
            let character = &mut cx.players[index];
            let id = format!("actor::{}[{index}]", character.actor_name());
            let Some(mut actor) = character.create_actor(factory, Some(&manager), &id) else {
                warn!(
                    "failed to create actor for character '{}'",
                    character.title()
                );
                continue;
            };
            actor.set_position(PLAYER_SPAWN);
            if let Some(dynamics) = &self.dynamics {
                if let Err(err) = actor.attach_physics(dynamics) {
                    warn!("no physics for player `{id}`: {err}");
                }
            }
            let camera = actor.create_camera(self.player_camera);
            self.actors.push(actor);
            match camera {
                Some(camera) => self.cameras.push(camera),
                None => warn!(
                    "failed to create player camera for character '{}'",
                    cx.players[index].title()
                ),
            }
        }
    }

    pub fn delete_players(&mut self) {
        self.cameras.clear();
        self.actors.clear();
    }

    /// Shows camera 0 across the whole window and gives player one to the
    /// controller.
    pub fn add_viewports(&mut self, cx: &mut CoreContext) {
        if let Some(camera) = self.cameras.first_mut() {
            camera.create_viewport(&cx.window, 0);
            camera.set_background(Vec4::new(0.0, 0.0, 0.0, 1.0));
            camera.match_aspect_ratio();
            if let Some(owner) = camera.actor() {
                if let Some(actor) = self.actors.iter_mut().find(|a| a.id() == owner) {
                    actor.set_active_camera(camera);
                }
            }
        }
        if let Some(actor) = self.actors.first() {
            cx.controller.bind(&actor.id());
        }
    }

    pub fn remove_viewports(&mut self, cx: &mut CoreContext) {
        cx.controller.unbind_all();
        for actor in &mut self.actors {
            actor.reset_active_cameras();
        }
        for camera in &mut self.cameras {
            camera.delete_viewport();
        }
    }

    /// Steps physics, then moves the players.
    pub fn frame(&mut self, cx: &mut CoreContext, elapsed: f32) -> bool {
        if let Some(dynamics) = &self.dynamics {
            dynamics.step_simulation(elapsed, cx.config.max_substeps);
        }
        for actor in &mut self.actors {
            actor.update(elapsed);
        }
        true
    }

    /// Escape leaves the state.
    pub fn key_pressed(&mut self, cx: &mut CoreContext, event: &KeyEvent) -> bool {
        if event.key == KeyCode::ESCAPE {
            cx.pop_state();
            return true;
        }
        false
    }

    pub fn command_actor(&mut self, id: &str, command: ActorCommand) -> bool {
        match self.actor_mut(id) {
            Some(actor) => {
                actor.apply(command);
                true
            }
            None => false,
        }
    }
}

pub trait State: fmt::Debug {
    fn base(&self) -> &StateBase;
    fn base_mut(&mut self) -> &mut StateBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    fn is_overlay(&self) -> bool {
        self.base().is_overlay()
    }

    fn scene_manager(&self) -> Option<&SceneManager> {
        self.base().scene_manager()
    }

    /// Loads the state's resources once, without activating it.
    fn preload(&mut self, cx: &mut CoreContext) {
        if !self.base().is_loaded() {
            self.load(cx);
        }
    }

    fn load(&mut self, cx: &mut CoreContext) {
        self.base_mut().loaded = true;
        self.create_scenes(cx);
        self.create_scene_manager(cx);
        self.attach_scenes(cx);
    }

    fn create_scenes(&mut self, _cx: &mut CoreContext) {}

    fn create_scene_manager(&mut self, _cx: &mut CoreContext) {
        let base = self.base_mut();
        base.scene_manager = Some(SceneManager::new(&base.name));
    }

    fn attach_scenes(&mut self, _cx: &mut CoreContext) {}

    fn create_players(&mut self, cx: &mut CoreContext) {
        self.base_mut().create_players(cx);
    }

    fn delete_players(&mut self) {
        self.base_mut().delete_players();
    }

    fn scene_attached(&mut self, cx: &mut CoreContext, scene: &str, dynamics: Option<Dynamics>) {
        let base = self.base_mut();
        base.scene = Some(scene.to_string());
        base.dynamics = dynamics;
        self.create_players(cx);
    }

    fn scene_detached(&mut self) {
        self.delete_players();
        let base = self.base_mut();
        base.dynamics = None;
        base.scene = None;
    }

    fn players_changed(&mut self, cx: &mut CoreContext) {
        if self.base().scene().is_some() {
            info!("players have changed; re-creating");
            self.delete_players();
            self.create_players(cx);
        }
    }

    fn activated(&mut self, cx: &mut CoreContext) {
        activate(self, cx);
    }

    fn deactivated(&mut self, cx: &mut CoreContext) {
        self.remove_viewports(cx);
    }

    /// An overlay was pushed in front of this state.
    fn paused(&mut self, _cx: &mut CoreContext) {}

    fn resumed(&mut self, cx: &mut CoreContext) {
        self.preload(cx);
    }

    fn add_viewports(&mut self, cx: &mut CoreContext) {
        self.base_mut().add_viewports(cx);
    }

    fn remove_viewports(&mut self, cx: &mut CoreContext) {
        self.base_mut().remove_viewports(cx);
    }

    fn frame(&mut self, cx: &mut CoreContext, elapsed: f32) -> bool {
        self.base_mut().frame(cx, elapsed)
    }

    fn key_pressed(&mut self, cx: &mut CoreContext, event: &KeyEvent) -> bool {
        self.base_mut().key_pressed(cx, event)
    }

    fn key_released(&mut self, _cx: &mut CoreContext, _event: &KeyEvent) -> bool {
        false
    }

    fn mouse_moved(&mut self, _cx: &mut CoreContext, _event: &MouseEvent) -> bool {
        false
    }

    fn mouse_pressed(
        &mut self,
        _cx: &mut CoreContext,
        _event: &MouseEvent,
        _button: MouseButton,
    ) -> bool {
        false
    }

    fn mouse_released(
        &mut self,
        _cx: &mut CoreContext,
        _event: &MouseEvent,
        _button: MouseButton,
    ) -> bool {
        false
    }

    /// Runs a controller command on one of the state's actors.
    fn command_actor(&mut self, actor: &str, command: ActorCommand) -> bool {
        self.base_mut().command_actor(actor, command)
    }
}

/// Default activation: load if needed, then show the cameras.
pub fn activate<S: State + ?Sized>(state: &mut S, cx: &mut CoreContext) {
    state.preload(cx);
    state.add_viewports(cx);
}

/// Creates the scene `name` through the context's factory.
pub fn create_scene(cx: &CoreContext, name: &str) -> Option<Scene> {
    match cx.factory().create(AssetKind::Scene, name)? {
        Asset::Scene(scene) => Some(scene),
        other => {
            warn!(
                "factory-returned scene ({name}) instance was a {}",
                other.kind()
            );
            None
        }
    }
}

/// Attaches `scene` to the state's scene manager. Returns what the state
/// records in `scene_attached`.
fn attach_scene(
    scene: &mut Scene,
    base: &StateBase,
    cx: &CoreContext,
) -> Option<(String, Option<Dynamics>)> {
    let Some(manager) = base.scene_manager() else {
        warn!("cannot attach a scene because no scene manager is available");
        return None;
    };
    if let Err(err) = scene.attach(manager, cx.factory()) {
        warn!("cannot attach scene `{}`: {err}", scene.name());
        return None;
    }
    Some((scene.name().to_string(), scene.dynamics().cloned()))
}

/// Walks a named scene with the registered players.
#[derive(Debug)]
pub struct SceneWalkState {
    base: StateBase,
    scene_name: String,
    scene: Option<Scene>,
}

impl SceneWalkState {
    pub fn new(scene: &str) -> Self {
        Self {
            base: StateBase::new(&format!("walk:{scene}")),
            scene_name: scene.to_string(),
            scene: None,
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }
}

impl State for SceneWalkState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn create_scenes(&mut self, cx: &mut CoreContext) {
        self.scene = create_scene(cx, &self.scene_name);
    }

    fn attach_scenes(&mut self, cx: &mut CoreContext) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let Some((name, dynamics)) = attach_scene(scene, &self.base, cx) {
            self.scene_attached(cx, &name, dynamics);
        }
    }
}

pub const VIEWER_CAMERA: &str = "PlayerCam";

/// Views a named scene through a free camera.
#[derive(Debug)]
pub struct SceneViewState {
    base: StateBase,
    scene_name: String,
    scene: Option<Scene>,
    camera_man: Option<CameraMan>,
}

impl SceneViewState {
    pub fn new(scene: &str) -> Self {
        Self {
            base: StateBase::new(&format!("view:{scene}")),
            scene_name: scene.to_string(),
            scene: None,
            camera_man: None,
        }
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn camera_man(&self) -> Option<&CameraMan> {
        self.camera_man.as_ref()
    }
}

impl State for SceneViewState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn create_scenes(&mut self, cx: &mut CoreContext) {
        self.scene = create_scene(cx, &self.scene_name);
    }

    fn attach_scenes(&mut self, cx: &mut CoreContext) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let Some((name, dynamics)) = attach_scene(scene, &self.base, cx) {
            self.scene_attached(cx, &name, dynamics);
        }
    }

    fn create_players(&mut self, _cx: &mut CoreContext) {
        let Some(manager) = self.base.scene_manager.clone() else {
            return;
        };
        let camera = match Camera::new(VIEWER_CAMERA, &manager) {
            Ok(camera) => camera,
            Err(err) => {
                warn!("cannot create the viewer camera: {err}");
                return;
            }
        };
        camera.set_position(Vec3::new(0.0, 0.0, 80.0));
        camera.look_at(Vec3::new(0.0, 0.0, -300.0));
        camera.set_near_clip_distance(5.0);
        self.base.cameras.push(camera);
        self.camera_man = Some(CameraMan::new(&manager, VIEWER_CAMERA));
    }

    fn delete_players(&mut self) {
        self.camera_man = None;
        self.base.delete_players();
    }

    fn frame(&mut self, cx: &mut CoreContext, elapsed: f32) -> bool {
        if let Some(camera_man) = &mut self.camera_man {
            camera_man.frame(elapsed);
        }
        self.base.frame(cx, elapsed)
    }

    fn key_pressed(&mut self, cx: &mut CoreContext, event: &KeyEvent) -> bool {
        if !self.base.key_pressed(cx, event) {
            if let Some(camera_man) = &mut self.camera_man {
                camera_man.inject_key_down(event);
            }
        }
        true
    }

    fn key_released(&mut self, _cx: &mut CoreContext, event: &KeyEvent) -> bool {
        if let Some(camera_man) = &mut self.camera_man {
            camera_man.inject_key_up(event);
        }
        true
    }

    fn mouse_moved(&mut self, _cx: &mut CoreContext, event: &MouseEvent) -> bool {
        if let Some(camera_man) = &mut self.camera_man {
            camera_man.inject_mouse_move(event);
        }
        true
    }

    fn mouse_pressed(
        &mut self,
        _cx: &mut CoreContext,
        event: &MouseEvent,
        button: MouseButton,
    ) -> bool {
        if let Some(camera_man) = &mut self.camera_man {
            camera_man.inject_mouse_down(event, button);
        }
        true
    }

    fn mouse_released(
        &mut self,
        _cx: &mut CoreContext,
        event: &MouseEvent,
        button: MouseButton,
    ) -> bool {
        if let Some(camera_man) = &mut self.camera_man {
            camera_man.inject_mouse_up(event, button);
        }
        true
    }
}

/// Picks the players from the roster. With a single character there is
/// nothing to choose, so it is added as player one straight away.
#[derive(Debug)]
pub struct CharacterSelectionState {
    base: StateBase,
}

impl Default for CharacterSelectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterSelectionState {
    pub fn new() -> Self {
        Self {
            base: StateBase::new("character-selection"),
        }
    }
}

impl State for CharacterSelectionState {
    fn base(&self) -> &StateBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StateBase {
        &mut self.base
    }

    fn create_players(&mut self, _cx: &mut CoreContext) {}

    fn activated(&mut self, cx: &mut CoreContext) {
        activate(self, cx);
        cx.reset_players();
        match cx.roster.count() {
            0 => {
                info!("no characters are available to select");
                cx.pop_state();
            }
            1 => {
                info!("only one character is available to select");
                match cx.roster.character(0) {
                    Some(character) => {
                        info!("adding '{}' as first player", character.title());
                        cx.add_player(character);
                    }
                    None => warn!("roster returned nothing for character #0"),
                }
                cx.pop_state();
            }
            _ => info!("will perform character selection"),
        }
    }
}

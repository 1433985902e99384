//! The engine core: window model, state stack, players and input routing.

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use log::{debug, info};

use crate::camera::Camera;
use crate::character::Character;
use crate::config::EngineConfig;
use crate::controller::{Controller, Routed};
use crate::graph::SceneManager;
use crate::input::{InputState, KeyEvent, MouseButton, MouseEvent};
use crate::loadable::AssetContext;
use crate::resources::ResourceGroups;
use crate::roster::Roster;
use crate::state::{AssetFactory, State, StateCommand, StockFactory};
use crate::window::RenderWindow;

/// Hooks through which an application customises the core.
pub trait Application {
    fn create_resource_groups(&mut self, _resources: &ResourceGroups) {}

    fn create_roster(&mut self) -> Roster {
        Roster::new()
    }

    fn create_controller(&mut self, config: &EngineConfig) -> Controller {
        Controller::new(config.mouse_drop_threshold)
    }

    /// Pushes the first state(s). Activation is held back until this returns.
    fn create_initial_state(&mut self, core: &mut Core);
}

/// What states may see and change while handling an event.
pub struct CoreContext {
    pub config: EngineConfig,
    pub window: Arc<RenderWindow>,
    pub input: Arc<InputState>,
    pub controller: Controller,
    pub roster: Roster,
    pub(crate) assets: AssetContext,
    pub(crate) factory: Box<dyn AssetFactory>,
    pub(crate) players: Vec<Character>,
    pub(crate) players_changed: bool,
    commands: Vec<StateCommand>,
    shutdown: bool,
}

impl fmt::Debug for CoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreContext")
            .field("config", &self.config)
            .field("window", &self.window.title())
            .field("players", &self.players.len())
            .field("pending_commands", &self.commands.len())
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl CoreContext {
    pub fn new(config: EngineConfig, assets: AssetContext) -> Self {
        let window = Arc::new(RenderWindow::new(
            &config.caption,
            config.window_width,
            config.window_height,
        ));
        let input = Arc::new(InputState::new());
        input.set_extents(config.window_width, config.window_height);
        Self {
            controller: Controller::new(config.mouse_drop_threshold),
            factory: Box::new(StockFactory::new(assets.clone())),
            config,
            window,
            input,
            roster: Roster::new(),
            assets,
            players: Vec::new(),
            players_changed: false,
            commands: Vec::new(),
            shutdown: true,
        }
    }

    pub fn assets(&self) -> &AssetContext {
        &self.assets
    }

    pub fn factory(&self) -> &dyn AssetFactory {
        self.factory.as_ref()
    }

    pub fn set_factory(&mut self, factory: Box<dyn AssetFactory>) {
        self.factory = factory;
    }

    pub fn players(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, index: usize) -> Option<&Character> {
        self.players.get(index)
    }

    pub fn add_player(&mut self, character: Character) {
        self.players.push(character);
        self.players_changed = true;
    }

    pub fn reset_players(&mut self) {
        self.players.clear();
        self.players_changed = true;
    }

    pub fn have_players_changed(&self) -> bool {
        self.players_changed
    }

    pub fn push_state(&mut self, state: Box<dyn State>) {
        self.commands.push(StateCommand::Push(state));
    }

    pub fn pop_state(&mut self) {
        self.commands.push(StateCommand::Pop);
    }

    pub fn set_state(&mut self, state: Box<dyn State>) {
        self.commands.push(StateCommand::Set(state));
    }

    pub fn shutdown(&mut self) {
        self.shutdown = true;
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub(crate) fn take_commands(&mut self) -> Vec<StateCommand> {
        std::mem::take(&mut self.commands)
    }
}

/// Identifies a state on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u64);

#[derive(Debug)]
struct StackEntry {
    id: StateId,
    state: Box<dyn State>,
}

/// Runs the state stack. The last entry is the active state.
#[derive(Debug)]
pub struct Core {
    cx: CoreContext,
    stack: Vec<StackEntry>,
    next_id: u64,
    inhibit: u32,
    pre_inhibit: Option<StateId>,
}

impl Core {
    pub fn new(config: EngineConfig) -> Self {
        let assets = AssetContext::new(&config.assets_root, ResourceGroups::new());
        Self::with_assets(config, assets)
    }

    pub fn with_assets(config: EngineConfig, assets: AssetContext) -> Self {
        Self {
            cx: CoreContext::new(config, assets),
            stack: Vec::new(),
            next_id: 0,
            inhibit: 0,
            pre_inhibit: None,
        }
    }

    pub fn context(&self) -> &CoreContext {
        &self.cx
    }

    pub fn context_mut(&mut self) -> &mut CoreContext {
        &mut self.cx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cx.config
    }

    pub fn window(&self) -> &Arc<RenderWindow> {
        &self.cx.window
    }

    pub fn input(&self) -> &Arc<InputState> {
        &self.cx.input
    }

    pub fn controller(&self) -> &Controller {
        &self.cx.controller
    }

    pub fn roster_mut(&mut self) -> &mut Roster {
        &mut self.cx.roster
    }

    pub fn init(&mut self, app: &mut dyn Application) -> Result<()> {
        info!("Jyuzau {}", env!("CARGO_PKG_VERSION"));
        app.create_resource_groups(self.cx.assets.resources());
        self.cx.controller = app.create_controller(&self.cx.config);
        self.cx.roster = app.create_roster();

        self.disable_state_activation();
        app.create_initial_state(self);
        if self.stack.is_empty() {
            bail!("Core has no initial state; aborting");
        }
        let (width, height) = self.cx.window.size();
        self.window_resized(width, height);
        self.cx.shutdown = false;
        self.enable_state_activation();
        Ok(())
    }

    /// Initialises and renders until shutdown, or until `frames` frames have
    /// been rendered. Returns the number of frames rendered.
    pub fn go(&mut self, app: &mut dyn Application, frames: Option<u64>) -> Result<u64> {
        self.init(app)?;
        let interval = self.cx.config.frame_interval;
        let mut rendered = 0;
        while frames.map_or(true, |limit| rendered < limit) && self.render(interval) {
            rendered += 1;
        }
        self.cleanup();
        Ok(rendered)
    }

    /// Renders one frame lasting `interval` seconds. Returns false once the
    /// core has shut down.
    pub fn render(&mut self, interval: f32) -> bool {
        if self.cx.window.is_closed() {
            self.cx.shutdown = true;
        }
        if self.cx.shutdown {
            return false;
        }
        if let Some(top) = self.stack.last_mut() {
            top.state.frame(&mut self.cx, interval);
        }
        self.apply_commands();
        !self.cx.shutdown
    }

    /// Deactivates the active state and drops the whole stack.
    pub fn cleanup(&mut self) {
        if let Some(mut top) = self.stack.pop() {
            top.state.deactivated(&mut self.cx);
        }
        self.stack.clear();
        self.cx.commands.clear();
        self.cx.shutdown = true;
    }

    pub fn is_shutdown(&self) -> bool {
        self.cx.shutdown
    }

    pub fn shutdown(&mut self) {
        self.cx.shutdown = true;
    }

    pub fn state(&self) -> Option<&dyn State> {
        self.stack.last().map(|entry| entry.state.as_ref())
    }

    pub fn state_id(&self) -> Option<StateId> {
        self.stack.last().map(|entry| entry.id)
    }

    pub fn state_count(&self) -> usize {
        self.stack.len()
    }

    pub fn scene_manager(&self) -> Option<&SceneManager> {
        self.state()?.scene_manager()
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.state()?.base().camera(index)
    }

    pub fn push_state(&mut self, state: Box<dyn State>) -> StateId {
        let id = self.push(state);
        self.apply_commands();
        id
    }

    pub fn pop_state(&mut self) -> Option<Box<dyn State>> {
        let popped = self.pop();
        self.apply_commands();
        popped
    }

    pub fn set_state(&mut self, state: Box<dyn State>) -> StateId {
        let id = self.set(state);
        self.apply_commands();
        id
    }

    /// Takes a state off the stack without deactivating it. When it was the
    /// active state the next one is activated.
    pub fn remove_state(&mut self, id: StateId) -> Option<Box<dyn State>> {
        let index = self.stack.iter().position(|entry| entry.id == id)?;
        let was_top = index + 1 == self.stack.len();
        let entry = self.stack.remove(index);
        if self.stack.is_empty() {
            info!("no states remain in stack; shutting down");
            self.cx.shutdown = true;
        } else if was_top {
            self.activate_top();
        }
        self.apply_commands();
        Some(entry.state)
    }

    /// Holds back activation until a matching
    /// [`Core::enable_state_activation`]. Returns the nesting depth.
    pub fn disable_state_activation(&mut self) -> u32 {
        if self.inhibit == 0 {
            self.pre_inhibit = self.state_id();
        }
        self.inhibit += 1;
        self.inhibit
    }

    pub fn enable_state_activation(&mut self) -> u32 {
        if self.inhibit > 0 {
            self.inhibit -= 1;
            if self.inhibit == 0 && self.pre_inhibit != self.state_id() {
                self.activate_top();
                self.apply_commands();
            }
        }
        self.inhibit
    }

    pub fn players(&self) -> usize {
        self.cx.players()
    }

    pub fn player(&self, index: usize) -> Option<&Character> {
        self.cx.player(index)
    }

    pub fn add_player(&mut self, character: Character) {
        self.cx.add_player(character);
    }

    pub fn reset_players(&mut self) {
        self.cx.reset_players();
    }

    pub fn key_pressed(&mut self, event: &KeyEvent) -> bool {
        self.cx.input.set_key_down(event.key);
        let handled = match self.stack.last_mut() {
            Some(top) => top.state.key_pressed(&mut self.cx, event),
            None => false,
        };
        let handled = handled || {
            let routed = self.cx.controller.key_pressed(event);
            self.route(routed)
        };
        self.apply_commands();
        handled
    }

    pub fn key_released(&mut self, event: &KeyEvent) -> bool {
        self.cx.input.set_key_up(event.key);
        let handled = match self.stack.last_mut() {
            Some(top) => top.state.key_released(&mut self.cx, event),
            None => false,
        };
        let handled = handled || {
            let routed = self.cx.controller.key_released(event);
            self.route(routed)
        };
        self.apply_commands();
        handled
    }

    pub fn mouse_moved(&mut self, event: &MouseEvent) -> bool {
        self.cx.input.track_mouse(event);
        let handled = match self.stack.last_mut() {
            Some(top) => top.state.mouse_moved(&mut self.cx, event),
            None => false,
        };
        let handled = handled || {
            let routed = self.cx.controller.mouse_moved(event);
            self.route(routed)
        };
        self.apply_commands();
        handled
    }

    pub fn mouse_pressed(&mut self, event: &MouseEvent, button: MouseButton) -> bool {
        self.cx.input.set_mouse_button_down(button);
        let handled = match self.stack.last_mut() {
            Some(top) => top.state.mouse_pressed(&mut self.cx, event, button),
            None => false,
        };
        let handled = handled || {
            let routed = self.cx.controller.mouse_pressed(event, button);
            self.route(routed)
        };
        self.apply_commands();
        handled
    }

    pub fn mouse_released(&mut self, event: &MouseEvent, button: MouseButton) -> bool {
        self.cx.input.set_mouse_button_up(button);
        let handled = match self.stack.last_mut() {
            Some(top) => top.state.mouse_released(&mut self.cx, event, button),
            None => false,
        };
        let handled = handled || {
            let routed = self.cx.controller.mouse_released(event, button);
            self.route(routed)
        };
        self.apply_commands();
        handled
    }

    /// Updates the mouse extents and the active camera's aspect ratio.
    pub fn window_resized(&mut self, width: u32, height: u32) {
        self.cx.window.resize(width, height);
        self.cx.input.set_extents(width, height);
        if let Some(camera) = self.camera(0) {
            camera.match_aspect_ratio();
        }
    }

    pub fn window_closed(&mut self) {
        self.cx.window.close();
        self.cx.shutdown = true;
    }

    fn route(&mut self, routed: Option<Routed>) -> bool {
        let Some(routed) = routed else {
            return false;
        };
        if let Some(top) = self.stack.last_mut() {
            for command in &routed.commands {
                top.state.command_actor(&routed.actor, *command);
            }
        }
        routed.consumed
    }

    fn next_id(&mut self) -> StateId {
        self.next_id += 1;
        StateId(self.next_id)
    }

    fn push(&mut self, state: Box<dyn State>) -> StateId {
        let overlay = state.is_overlay();
        if let Some(previous) = self.stack.last_mut() {
            if overlay {
                previous.state.paused(&mut self.cx);
            } else {
                previous.state.deactivated(&mut self.cx);
            }
        }
        let id = self.next_id();
        debug!("pushing state `{}`", state.name());
        self.stack.push(StackEntry { id, state });
        self.activate_top();
        id
    }

    fn pop(&mut self) -> Option<Box<dyn State>> {
        let mut entry = self.stack.pop()?;
        debug!("popping state `{}`", entry.state.name());
        entry.state.deactivated(&mut self.cx);
        match self.stack.last_mut() {
            Some(next) if entry.state.is_overlay() => next.state.resumed(&mut self.cx),
            Some(_) => self.activate_top(),
            None => {
                info!("no states remain in stack; shutting down");
                self.cx.shutdown = true;
            }
        }
        Some(entry.state)
    }

    fn set(&mut self, state: Box<dyn State>) -> StateId {
        if let Some(mut old) = self.stack.pop() {
            old.state.deactivated(&mut self.cx);
        }
        let id = self.next_id();
        self.stack.push(StackEntry { id, state });
        self.activate_top();
        id
    }

    fn activate_top(&mut self) {
        if self.stack.is_empty() {
            return;
        }
        if self.cx.players_changed {
            for entry in self.stack.iter_mut().rev() {
                entry.state.players_changed(&mut self.cx);
            }
            self.cx.players_changed = false;
        }
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        if self.inhibit > 0 {
            top.state.preload(&mut self.cx);
        } else {
            top.state.activated(&mut self.cx);
        }
    }

    /// Applies stack changes queued by states, including any queued while
    /// applying them.
    fn apply_commands(&mut self) {
        loop {
            let commands = self.cx.take_commands();
            if commands.is_empty() {
                break;
            }
            for command in commands {
                match command {
                    StateCommand::Push(state) => {
                        self.push(state);
                    }
                    StateCommand::Pop => {
                        self.pop();
                    }
                    StateCommand::Set(state) => {
                        self.set(state);
                    }
                }
            }
        }
    }
}

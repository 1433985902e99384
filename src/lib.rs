//! Jyuzau: a game engine scaffold.
//!
//! Assets (props, actors, lights and scenes) are described by XML documents
//! under an assets root and loaded on demand. Scenes place asset instances
//! into a scene graph with a simple physics world, and a stack of
//! application states drives which scene is shown and how input reaches
//! the player actors. Rendering is modelled rather than performed so the
//! whole engine runs headless.

pub mod actor;
pub mod camera;
pub mod camera_man;
pub mod character;
pub mod config;
pub mod controller;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod graph;
pub mod input;
pub mod light;
pub mod loadable;
pub mod mesh;
pub mod node;
pub mod prop;
pub mod resources;
pub mod roster;
pub mod scene;
pub mod state;
pub mod window;

#[cfg(test)]
mod testing;

pub use crate::actor::{Actor, ActorCommand};
pub use crate::camera::{Camera, CameraType};
pub use crate::character::Character;
pub use crate::config::EngineConfig;
pub use crate::controller::Controller;
pub use crate::core::{Application, Core, CoreContext};
pub use crate::error::{AttachError, ConfigError, GraphError, LoadError, ResourceError};
pub use crate::graph::SceneManager;
pub use crate::input::{InputState, KeyCode, KeyEvent, MouseButton, MouseEvent, NamedKey};
pub use crate::loadable::{AssetContext, AssetKind};
pub use crate::roster::Roster;
pub use crate::scene::Scene;
pub use crate::state::{
    Asset, AssetFactory, CharacterSelectionState, SceneViewState, SceneWalkState, State,
    StateBase, StockFactory,
};

//! Player identity and persistent progress, independent of whichever actor
//! currently plays it.

use log::warn;

use crate::actor::{Actor, CharacterLink};
use crate::graph::SceneManager;
use crate::loadable::AssetKind;
use crate::node::Placeable;
use crate::state::{Asset, AssetFactory};

pub const CURRENCY_SLOTS: usize = 5;
pub const AMMO_SLOTS: usize = 10;

#[derive(Debug, PartialEq, Eq)]
pub struct Character {
    title: String,
    actor_name: String,
    level: u32,
    currency: [u32; CURRENCY_SLOTS],
    ammo: [u32; AMMO_SLOTS],
    actor: Option<String>,
}

impl Default for Character {
    fn default() -> Self {
        Self::new("Player", "player")
    }
}

/// Copies carry the character's progress but not its actor.
impl Clone for Character {
    fn clone(&self) -> Self {
        Self {
            title: self.title.clone(),
            actor_name: self.actor_name.clone(),
            level: self.level,
            currency: self.currency,
            ammo: self.ammo,
            actor: None,
        }
    }
}

impl Character {
    pub fn new(title: &str, actor_name: &str) -> Self {
        Self {
            title: title.to_string(),
            actor_name: actor_name.to_string(),
            level: 1,
            currency: [0; CURRENCY_SLOTS],
            ammo: [0; AMMO_SLOTS],
            actor: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Name of the actor asset playing this character.
    pub fn actor_name(&self) -> &str {
        &self.actor_name
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    pub fn currency(&self, slot: usize) -> u32 {
        self.currency.get(slot).copied().unwrap_or(0)
    }

    pub fn set_currency(&mut self, slot: usize, amount: u32) -> bool {
        match self.currency.get_mut(slot) {
            Some(value) => {
                *value = amount;
                true
            }
            None => false,
        }
    }

    pub fn ammo(&self, slot: usize) -> u32 {
        self.ammo.get(slot).copied().unwrap_or(0)
    }

    pub fn set_ammo(&mut self, slot: usize, amount: u32) -> bool {
        match self.ammo.get_mut(slot) {
            Some(value) => {
                *value = amount;
                true
            }
            None => false,
        }
    }

    /// Id of the actor bound by [`Character::create_actor`].
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    fn link(&self) -> CharacterLink {
        CharacterLink {
            title: self.title.clone(),
            level: self.level,
        }
    }

    /// Creates an actor for the character, attaches it as `id` when a scene
    /// manager is given and binds it to the character.
    pub fn create_actor(
        &mut self,
        factory: &dyn AssetFactory,
        manager: Option<&SceneManager>,
        id: &str,
    ) -> Option<Actor> {
        let mut actor = self.create_dummy(factory, manager, id)?;
        actor.set_character(Some(self.link()));
        self.actor = Some(actor.id());
        Some(actor)
    }

    /// Like [`Character::create_actor`], without binding the actor.
    pub fn create_dummy(
        &self,
        factory: &dyn AssetFactory,
        manager: Option<&SceneManager>,
        id: &str,
    ) -> Option<Actor> {
        let mut actor = match factory.create(AssetKind::Actor, &self.actor_name)? {
            Asset::Actor(actor) => actor,
            other => {
                warn!(
                    "factory-returned actor ({}) instance was a {}",
                    self.actor_name,
                    other.kind()
                );
                return None;
            }
        };
        if let Some(manager) = manager {
            if let Err(err) = actor.attach_to_scene(manager, id) {
                warn!("cannot place actor for `{}`: {err}", self.title);
                return None;
            }
        }
        Some(actor)
    }

    /// Forgets the bound actor.
    pub fn release_actor(&mut self) {
        self.actor = None;
    }
}

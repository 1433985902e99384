//! Scenes: documents at `scenes/<name>.xml` placing props, actors and
//! lights into a scene graph.
//!
//! ```xml
//! <scene>
//!   <ambientlight r="0.2" g="0.2" b="0.2"/>
//!   <gravity y="-9.8"/>
//!   <prop id="box1" class="crate" x="100" fixed="yes">
//!     <scale x="2" y="2" z="2"/>
//!     <yaw deg="45"/>
//!     <light id="lamp" y="60"/>
//!   </prop>
//! </scene>
//! ```

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use log::{debug, info, warn};

use crate::actor::Actor;
use crate::dynamics::{BodyHandle, Dynamics, RigidBody};
use crate::error::{AttachError, LoadError};
use crate::graph::{NodeId, SceneManager};
use crate::light::Light;
use crate::loadable::{
    atof, AssetContext, AssetKind, Attributes, BuildContext, Definition, Element, Loadable,
    ObjectId,
};
use crate::node::Placeable;
use crate::prop::Prop;
use crate::state::{Asset, AssetFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneObjectKind {
    Prop,
    Actor,
    Light,
}

impl SceneObjectKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "prop" => Some(Self::Prop),
            "actor" => Some(Self::Actor),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn asset_kind(self) -> AssetKind {
        match self {
            Self::Prop => AssetKind::Prop,
            Self::Actor => AssetKind::Actor,
            Self::Light => AssetKind::Light,
        }
    }
}

/// A `<prop>`, `<actor>` or `<light>` with the transforms folded into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub kind: SceneObjectKind,
    pub id: String,
    pub class: String,
    pub fixed: bool,
    pub translate: Vec3,
    pub scale: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl SceneObject {
    fn from_attributes(kind: SceneObjectKind, attributes: &Attributes) -> Self {
        let class = match kind {
            SceneObjectKind::Light => String::new(),
            _ => attributes.get("class").unwrap_or_default().to_string(),
        };
        let id = attributes
            .get("id")
            .filter(|id| !id.is_empty())
            .map_or_else(|| class.clone(), str::to_string);
        Self {
            kind,
            id,
            class,
            fixed: kind != SceneObjectKind::Light && attributes.get("fixed") == Some("yes"),
            translate: attributes.parse_xyz(Vec3::ZERO),
            scale: Vec3::ONE,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Name of the asset the factory is asked for.
    pub fn asset_name(&self) -> &str {
        match self.kind {
            SceneObjectKind::Light => &self.id,
            _ => &self.class,
        }
    }

    fn apply(&mut self, op: TransformOp) {
        match op {
            TransformOp::Scale(v) => self.scale = v,
            TransformOp::Translate(v) => self.translate = v,
            TransformOp::Yaw(a) => self.yaw = a,
            TransformOp::Pitch(a) => self.pitch = a,
            TransformOp::Roll(a) => self.roll = a,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    Scale(Vec3),
    Translate(Vec3),
    Yaw(f32),
    Pitch(f32),
    Roll(f32),
}

impl TransformOp {
    fn parse(name: &str, attributes: &Attributes) -> Option<Self> {
        match name {
            "scale" => Some(Self::Scale(attributes.parse_xyz(Vec3::ONE))),
            "translate" => Some(Self::Translate(attributes.parse_xyz(Vec3::ZERO))),
            "yaw" => Some(Self::Yaw(parse_angle(attributes))),
            "pitch" => Some(Self::Pitch(parse_angle(attributes))),
            "roll" => Some(Self::Roll(parse_angle(attributes))),
            _ => None,
        }
    }
}

/// Reads `rad` or `deg`; whichever comes last wins.
fn parse_angle(attributes: &Attributes) -> f32 {
    attributes.iter().fold(0.0, |angle, (name, value)| match name {
        "rad" => atof(value),
        "deg" => atof(value).to_radians(),
        _ => angle,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneElement {
    Root,
    Object(SceneObject),
    Transform(TransformOp),
    /// `<ambientlight>` or `<gravity>`, already folded into the definition.
    Property,
}

impl Element for SceneElement {
    fn discardable(&self) -> bool {
        matches!(self, Self::Transform(_) | Self::Property)
    }

    fn complete(&self) -> bool {
        let Self::Object(object) = self else {
            return true;
        };
        if object.kind != SceneObjectKind::Light && object.class.is_empty() {
            warn!("scene {:?} is missing a class", object.kind);
            return false;
        }
        if object.id.is_empty() {
            warn!("scene object {:?} is missing an ID", object.kind);
            return false;
        }
        true
    }

    fn accept_child(&mut self, child: &Self) -> bool {
        if let (Self::Object(object), Self::Transform(op)) = (self, child) {
            object.apply(*op);
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDefinition {
    pub gravity: Vec3,
    /// Set only when the document has an `<ambientlight>`.
    pub ambient: Option<Vec4>,
}

impl Definition for SceneDefinition {
    type Element = SceneElement;

    fn kind(&self) -> AssetKind {
        AssetKind::Scene
    }

    fn factory(
        &mut self,
        cx: &BuildContext<'_, SceneElement>,
        name: &str,
        attributes: &Attributes,
    ) -> Option<SceneElement> {
        if !cx.has_root() {
            if name == "scene" {
                return Some(SceneElement::Root);
            }
            warn!("unexpected root element <{name}>");
            return None;
        }
        if cx.current_is_root() {
            match name {
                "ambientlight" => {
                    self.ambient = Some(attributes.parse_colour());
                    return Some(SceneElement::Property);
                }
                "gravity" => {
                    self.gravity = attributes.parse_xyz(Vec3::ZERO);
                    return Some(SceneElement::Property);
                }
                _ => {}
            }
        }
        let in_object = matches!(cx.current_element(), Some(SceneElement::Object(_)));
        if in_object {
            if let Some(op) = TransformOp::parse(name, attributes) {
                return Some(SceneElement::Transform(op));
            }
        }
        if cx.current_is_root() || in_object {
            return match SceneObjectKind::from_name(name) {
                Some(kind) => Some(SceneElement::Object(SceneObject::from_attributes(
                    kind, attributes,
                ))),
                None => {
                    warn!("unexpected child element <{name}>");
                    None
                }
            };
        }
        warn!("unexpected element <{name}>");
        None
    }
}

/// An object instantiated by a scene and owned by it.
#[derive(Debug)]
pub enum SceneMember {
    Prop(Prop),
    Actor(Actor),
    Light(Light),
}

impl SceneMember {
    pub fn placeable(&self) -> &dyn Placeable {
        match self {
            Self::Prop(prop) => prop,
            Self::Actor(actor) => actor,
            Self::Light(light) => light,
        }
    }

    pub fn placeable_mut(&mut self) -> &mut dyn Placeable {
        match self {
            Self::Prop(prop) => prop,
            Self::Actor(actor) => actor,
            Self::Light(light) => light,
        }
    }

    pub fn as_prop(&self) -> Option<&Prop> {
        match self {
            Self::Prop(prop) => Some(prop),
            Self::Actor(actor) => Some(actor.prop()),
            Self::Light(_) => None,
        }
    }

    fn set_fixed(&mut self) {
        match self {
            Self::Prop(prop) => prop.set_fixed(),
            Self::Actor(actor) => actor.prop_mut().set_fixed(),
            Self::Light(_) => {}
        }
    }

    fn attach_physics(&mut self, dynamics: &Dynamics) -> Result<(), AttachError> {
        match self {
            Self::Prop(prop) => prop.attach_physics(dynamics).map(drop),
            Self::Actor(actor) => actor.attach_physics(dynamics).map(drop),
            Self::Light(_) => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct Scene {
    loadable: Loadable<SceneDefinition>,
    manager: Option<SceneManager>,
    members: Vec<SceneMember>,
    dynamics: Option<Dynamics>,
}

impl Scene {
    pub fn new(name: &str, cx: &AssetContext) -> Self {
        Self {
            loadable: Loadable::new(name, SceneDefinition::default(), cx),
            manager: None,
            members: Vec::new(),
            dynamics: None,
        }
    }

    pub fn name(&self) -> &str {
        self.loadable.name()
    }

    pub fn loadable(&self) -> &Loadable<SceneDefinition> {
        &self.loadable
    }

    pub fn definition(&self) -> &SceneDefinition {
        self.loadable.definition()
    }

    /// Loads the document and creates the scene's physics world.
    pub fn load(&mut self) -> Result<(), LoadError> {
        self.loadable.load()?;
        if self.dynamics.is_none() {
            self.dynamics = Some(Dynamics::new(self.definition().gravity));
        }
        Ok(())
    }

    pub fn manager(&self) -> Option<&SceneManager> {
        self.manager.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.manager.is_some()
    }

    pub fn root_node(&self) -> Option<NodeId> {
        self.manager.as_ref().map(SceneManager::root)
    }

    pub fn members(&self) -> &[SceneMember] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [SceneMember] {
        &mut self.members
    }

    /// The member whose node is named `id`.
    pub fn member(&self, id: &str) -> Option<&SceneMember> {
        self.members
            .iter()
            .find(|member| member.placeable().node_name().as_deref() == Some(id))
    }

    /// Instantiates the scene's objects through `factory` and attaches them
    /// to `manager`, replacing any earlier attachment.
    ///
    /// Objects that cannot be created or attached are logged and skipped
    /// together with everything nested inside them.
    pub fn attach(
        &mut self,
        manager: &SceneManager,
        factory: &dyn AssetFactory,
    ) -> Result<(), AttachError> {
        if !self.loadable.is_loaded() {
            self.load()?;
        }
        if !self.loadable.status() {
            warn!("cannot attach a scene which has not been properly loaded");
            return Err(AttachError::NotLoaded {
                kind: AssetKind::Scene,
                name: self.name().to_string(),
            });
        }
        if self.manager.is_some() {
            self.detach();
        }
        self.manager = Some(manager.clone());
        if let Some(colour) = self.definition().ambient {
            manager.set_ambient_light(colour);
        }

        let mut nodes: HashMap<ObjectId, NodeId> = HashMap::new();
        for (id, parent, object) in self.placements() {
            let parent_node = match parent {
                Some(parent) => match nodes.get(&parent) {
                    Some(node) => *node,
                    None => continue,
                },
                None => manager.root(),
            };
            match self.instantiate(manager, parent_node, &object, factory) {
                Some(node) => {
                    nodes.insert(id, node);
                }
                None => warn!(
                    "failed to place {:?} `{}` in scene `{}`",
                    object.kind,
                    object.id,
                    self.name()
                ),
            }
        }
        info!(
            "attached scene `{}` with {} objects",
            self.name(),
            self.members.len()
        );
        Ok(())
    }

    /// Scene objects in depth-first order with their parent objects.
    fn placements(&self) -> Vec<(ObjectId, Option<ObjectId>, SceneObject)> {
        let tree = self.loadable.tree();
        let Some(root) = tree.root() else {
            return Vec::new();
        };
        tree.descendants(root)
            .into_iter()
            .filter_map(|id| match tree.element(id)? {
                SceneElement::Object(object) => {
                    let parent = tree.parent(id).filter(|&parent| parent != root);
                    Some((id, parent, object.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn instantiate(
        &mut self,
        manager: &SceneManager,
        parent: NodeId,
        object: &SceneObject,
        factory: &dyn AssetFactory,
    ) -> Option<NodeId> {
        let kind = object.kind.asset_kind();
        let mut member = match (object.kind, factory.create(kind, object.asset_name())?) {
            (SceneObjectKind::Prop, Asset::Prop(prop)) => SceneMember::Prop(prop),
            (SceneObjectKind::Actor, Asset::Actor(actor)) => SceneMember::Actor(actor),
            (SceneObjectKind::Light, Asset::Light(light)) => SceneMember::Light(light),
            (_, other) => {
                warn!(
                    "factory-returned {kind} ({}) instance was a {}",
                    object.asset_name(),
                    other.kind()
                );
                return None;
            }
        };

        let placeable = member.placeable_mut();
        placeable.translate(object.translate);
        placeable.scale(object.scale);
        placeable.yaw(object.yaw);
        placeable.pitch(object.pitch);
        placeable.roll(object.roll);
        if object.fixed {
            member.set_fixed();
        }

        let node = member
            .placeable_mut()
            .attach_under(manager, parent, &object.id)
            .map_err(|err| warn!("{err}"))
            .ok()?;
        if let Some(dynamics) = &self.dynamics {
            if let Err(err) = member.attach_physics(dynamics) {
                warn!("no physics for `{}`: {err}", object.id);
            }
        }
        debug!("placed {kind} `{}` as `{}`", object.asset_name(), object.id);
        self.members.push(member);
        Some(node)
    }

    /// Drops every object the scene placed.
    pub fn detach(&mut self) {
        self.members.clear();
        self.manager = None;
    }

    pub fn gravity(&self) -> Vec3 {
        self.definition().gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.loadable.definition_mut().gravity = gravity;
        if let Some(dynamics) = &self.dynamics {
            dynamics.set_gravity(gravity);
        }
    }

    pub fn dynamics(&self) -> Option<&Dynamics> {
        self.dynamics.as_ref()
    }

    /// Adds a body to the scene's physics world, if it has one yet.
    pub fn add_rigid_body(&self, body: RigidBody) -> Option<BodyHandle> {
        self.dynamics.as_ref().map(|d| d.add_rigid_body(body))
    }

    pub fn remove_rigid_body(&self, handle: BodyHandle) -> bool {
        self.dynamics
            .as_ref()
            .and_then(|d| d.remove_rigid_body(handle))
            .is_some()
    }
}

//! Props: static or physically simulated objects described by
//! `props/<name>/prop.xml`.
//!
//! ```xml
//! <prop mass="2">
//!   <cube/>
//!   <material src="crate.material" class="Crate/Wood"/>
//! </prop>
//! ```
//!
//! A prop has either a `<mesh src="..."/>` or one of the prefabricated
//! shapes `<cube/>`, `<sphere/>` and `<plane/>`. Prefabricated props also
//! need a material class.

use glam::Vec3;
use log::warn;

use crate::dynamics::{BodyHandle, CollisionShape, Dynamics, NodeMotionState, RigidBody};
use crate::error::{AttachError, ResourceError};
use crate::graph::{Attachment, Entity, EntityShape, NodeId, SceneManager};
use crate::loadable::{
    AssetContext, AssetKind, Attributes, BuildContext, Definition, Element, Loadable, ObjectTree,
};
use crate::mesh::{Aabb, PrefabType};
use crate::node::{NodeBinding, Placeable};
use crate::resources::{ResourceGroups, ResourceType};

#[derive(Debug, Clone, PartialEq)]
pub enum PropElement {
    Root {
        has_mesh: bool,
        has_prefab: bool,
        has_material: bool,
    },
    Mesh {
        source: String,
    },
    Material {
        source: Option<String>,
        class: String,
    },
    Prefab(PrefabType),
}

impl Element for PropElement {
    fn discardable(&self) -> bool {
        true
    }

    fn complete(&self) -> bool {
        match self {
            Self::Root {
                has_mesh,
                has_prefab,
                has_material,
            } => {
                if !has_mesh && !has_prefab {
                    warn!("prop is missing a mesh or pre-fabricated shape");
                    return false;
                }
                if *has_prefab && !has_material {
                    warn!("prefabricated prop is missing a material");
                    return false;
                }
                true
            }
            Self::Mesh { source } if source.is_empty() => {
                warn!("prop mesh is missing a source");
                false
            }
            Self::Material { class, .. } if class.is_empty() => {
                warn!("prop material is missing a class");
                false
            }
            _ => true,
        }
    }

    fn accept_child(&mut self, child: &Self) -> bool {
        if let Self::Root {
            has_mesh,
            has_prefab,
            has_material,
        } = self
        {
            match child {
                Self::Mesh { .. } => *has_mesh = true,
                Self::Prefab(_) => *has_prefab = true,
                Self::Material { .. } => *has_material = true,
                Self::Root { .. } => {}
            }
        }
        true
    }
}

/// What a prop document boils down to once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PropDefinition {
    kind: AssetKind,
    pub mass: f32,
    pub mesh: Option<String>,
    pub material: Option<String>,
    pub prefab: PrefabType,
}

impl PropDefinition {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            mass: 0.0,
            mesh: None,
            material: None,
            prefab: PrefabType::Cube,
        }
    }
}

impl Definition for PropDefinition {
    type Element = PropElement;

    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn factory(
        &mut self,
        cx: &BuildContext<'_, PropElement>,
        name: &str,
        attributes: &Attributes,
    ) -> Option<PropElement> {
        if !cx.has_root() {
            if name == self.kind.as_str() {
                self.mass = attributes.parse_float("mass", 0.0);
                return Some(PropElement::Root {
                    has_mesh: false,
                    has_prefab: false,
                    has_material: false,
                });
            }
            warn!("unexpected root element <{name}>");
            return None;
        }
        if !cx.current_is_root() {
            warn!("unexpected child element <{name}>");
            return None;
        }
        if let Some(prefab) = PrefabType::from_name(name) {
            return Some(PropElement::Prefab(prefab));
        }
        match name {
            "mesh" => Some(PropElement::Mesh {
                source: attributes.get("src").unwrap_or_default().to_string(),
            }),
            "material" => Some(PropElement::Material {
                source: attributes.get("src").map(str::to_string),
                class: attributes.get("class").unwrap_or_default().to_string(),
            }),
            _ => {
                warn!("unexpected element <{name}>");
                None
            }
        }
    }

    fn add_resources(
        &mut self,
        tree: &ObjectTree<PropElement>,
        group: &str,
        resources: &ResourceGroups,
    ) -> Result<(), ResourceError> {
        for (_, object) in tree.iter() {
            match object.element() {
                PropElement::Mesh { source } => {
                    resources.declare(group, source, ResourceType::Mesh)?;
                    self.mesh = Some(source.clone());
                }
                PropElement::Material { source, class } => {
                    if let Some(source) = source {
                        resources.declare(group, source, ResourceType::Material)?;
                    }
                    self.material = Some(class.clone());
                }
                PropElement::Prefab(prefab) => self.prefab = *prefab,
                PropElement::Root { .. } => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Prop {
    loadable: Loadable<PropDefinition>,
    binding: NodeBinding,
    entity: Option<String>,
    body: Option<(Dynamics, BodyHandle)>,
    fixed: bool,
}

impl Prop {
    pub fn new(name: &str, cx: &AssetContext) -> Self {
        Self::with_kind(name, AssetKind::Prop, cx)
    }

    pub(crate) fn with_kind(name: &str, kind: AssetKind, cx: &AssetContext) -> Self {
        Self {
            loadable: Loadable::new(name, PropDefinition::new(kind), cx),
            binding: NodeBinding::new(),
            entity: None,
            body: None,
            fixed: false,
        }
    }

    /// Creates and loads a prop, returning `None` if it cannot be loaded.
    pub fn create(name: &str, cx: &AssetContext) -> Option<Self> {
        let mut prop = Self::new(name, cx);
        prop.loadable.load().ok()?;
        Some(prop)
    }

    pub fn loadable(&self) -> &Loadable<PropDefinition> {
        &self.loadable
    }

    pub fn loadable_mut(&mut self) -> &mut Loadable<PropDefinition> {
        &mut self.loadable
    }

    pub fn name(&self) -> &str {
        self.loadable.name()
    }

    pub fn definition(&self) -> &PropDefinition {
        self.loadable.definition()
    }

    pub fn mass(&self) -> f32 {
        self.definition().mass
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn rigid_body(&self) -> Option<BodyHandle> {
        self.body.as_ref().map(|(_, handle)| *handle)
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Bounds of the unscaled geometry.
    pub fn bounds(&self) -> Aabb {
        let definition = self.definition();
        definition
            .mesh
            .as_deref()
            .and_then(|mesh| self.loadable.resources().mesh_bounds(self.group(), mesh))
            .unwrap_or_else(|| definition.prefab.bounds())
    }

    fn collision_shape(&self) -> CollisionShape {
        let definition = self.definition();
        if definition.mesh.is_some() {
            return CollisionShape::Box {
                half_extents: self.bounds().half_extents(),
            };
        }
        match definition.prefab {
            PrefabType::Cube => CollisionShape::Box {
                half_extents: Vec3::splat(50.0),
            },
            PrefabType::Sphere => CollisionShape::Sphere { radius: 50.0 },
            PrefabType::Plane => CollisionShape::Box {
                half_extents: Vec3::new(100.0, 100.0, 0.0),
            },
        }
    }

    /// Adds a rigid body for the prop to `dynamics`, sized from its shape
    /// and the node's scale.
    pub fn attach_physics(&mut self, dynamics: &Dynamics) -> Result<BodyHandle, AttachError> {
        let (Some(manager), Some(node)) = (self.binding.manager(), self.binding.node()) else {
            return Err(AttachError::NotAttached(self.group().to_string()));
        };
        let scale = manager.scale_of(node).unwrap_or(Vec3::ONE);
        let motion_state = NodeMotionState::new(manager.clone(), node);
        self.detach_physics();

        let mut body = RigidBody::new(self.mass(), self.collision_shape())
            .with_local_scaling(scale)
            .with_motion_state(motion_state);
        if self.fixed {
            make_fixed(&mut body);
        }
        let handle = dynamics.add_rigid_body(body);
        self.body = Some((dynamics.clone(), handle));
        Ok(handle)
    }

    pub fn detach_physics(&mut self) {
        if let Some((dynamics, handle)) = self.body.take() {
            dynamics.remove_rigid_body(handle);
        }
    }

    /// Pins the prop in place: its body becomes static with no mass.
    pub fn set_fixed(&mut self) {
        self.fixed = true;
        if let Some((dynamics, handle)) = &self.body {
            dynamics.with_body(*handle, make_fixed);
        }
    }
}

fn make_fixed(body: &mut RigidBody) {
    body.set_static(true);
    body.set_mass_props(0.0, Vec3::ZERO);
    body.clear_forces();
}

impl Placeable for Prop {
    fn binding(&self) -> &NodeBinding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut NodeBinding {
        &mut self.binding
    }

    fn kind(&self) -> AssetKind {
        self.loadable.kind()
    }

    fn group(&self) -> &str {
        self.loadable.group()
    }

    fn prepare(&mut self) -> Result<(), AttachError> {
        if !self.loadable.is_loaded() {
            self.loadable.load()?;
        }
        if !self.loadable.status() {
            warn!(
                "cannot attach a {} ({}) which has not been properly loaded",
                self.kind(),
                self.name()
            );
            return Err(AttachError::NotLoaded {
                kind: self.kind(),
                name: self.name().to_string(),
            });
        }
        Ok(())
    }

    fn populate(&mut self, manager: &SceneManager, node: NodeId, id: &str) -> Result<(), AttachError> {
        let definition = self.definition();
        let shape = match &definition.mesh {
            Some(source) => EntityShape::Mesh {
                source: source.clone(),
                group: self.group().to_string(),
            },
            None => EntityShape::Prefab(definition.prefab),
        };
        let entity = Entity {
            name: id.to_string(),
            shape,
            material: definition.material.clone(),
            bounds: self.bounds(),
        };
        manager.attach_object(node, Attachment::Entity(entity));
        self.entity = Some(id.to_string());
        Ok(())
    }

    fn release(&mut self) {
        self.detach_physics();
        self.entity = None;
    }
}

impl Drop for Prop {
    fn drop(&mut self) {
        self.detach_physics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::testing::AssetTree;

    #[test]
    fn prefab_props_record_shape_material_and_mass() {
        let assets = AssetTree::stock();
        let prop = Prop::create("ball", assets.context()).unwrap();
        let definition = prop.definition();
        assert_eq!(definition.prefab, PrefabType::Sphere);
        assert_eq!(definition.material.as_deref(), Some("Ball"));
        assert_eq!(definition.mesh, None);
        assert_eq!(prop.mass(), 1.0);
        // every prop element is discardable
        assert!(prop.loadable().tree().is_empty());

        let declared = assets.context().resources().declarations("prop::ball");
        assert_eq!(declared.len(), 1);
        assert_eq!(declared[0].resource_type, ResourceType::Material);
    }

    #[test]
    fn mesh_props_use_mesh_bounds() {
        let assets = AssetTree::stock();
        let prop = Prop::create("rock", assets.context()).unwrap();
        assert_eq!(prop.definition().mesh.as_deref(), Some("rock.obj"));
        assert_eq!(prop.bounds().size(), Vec3::new(20.0, 30.0, 40.0));
        assert_eq!(
            prop.collision_shape(),
            CollisionShape::Box {
                half_extents: Vec3::new(10.0, 15.0, 20.0)
            }
        );
    }

    #[test]
    fn incomplete_props_fail() {
        let assets = AssetTree::empty();
        assets.write("props/bare/prop.xml", "<prop><cube/></prop>");
        assets.write("props/classless/prop.xml", r#"<prop><cube/><material src="a"/></prop>"#);
        assets.write("props/empty/prop.xml", r#"<prop><material class="x"/></prop>"#);
        assets.write("props/nosrc/prop.xml", "<prop><mesh/></prop>");
        for name in ["bare", "classless", "empty", "nosrc"] {
            let mut prop = Prop::new(name, assets.context());
            assert!(
                matches!(prop.loadable_mut().load(), Err(LoadError::Incomplete { .. })),
                "{name} should be incomplete"
            );
        }
    }

    #[test]
    fn unexpected_elements_are_skipped() {
        let assets = AssetTree::empty();
        assets.write(
            "props/odd/prop.xml",
            r#"<prop><cube><mesh/></cube><teapot/><material class="m"/></prop>"#,
        );
        assets.write("props/wrong/prop.xml", r#"<actor><cube/></actor>"#);
        assert!(Prop::create("odd", assets.context()).is_some());
        let mut wrong = Prop::new("wrong", assets.context());
        assert!(matches!(
            wrong.loadable_mut().load(),
            Err(LoadError::NoRoot { .. })
        ));
    }

    #[test]
    fn missing_mesh_files_fail_to_load() {
        let assets = AssetTree::empty();
        assets.write("props/ghost/prop.xml", r#"<prop><mesh src="ghost.obj"/></prop>"#);
        let mut prop = Prop::new("ghost", assets.context());
        assert!(matches!(
            prop.loadable_mut().load(),
            Err(LoadError::Resources { .. })
        ));
        let scene = SceneManager::new("test");
        assert!(matches!(
            prop.attach_to_scene(&scene, ""),
            Err(AttachError::NotLoaded { .. })
        ));
    }

    #[test]
    fn attaching_creates_an_entity_named_after_the_node() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let mut prop = Prop::new("crate", assets.context());
        let node = prop.attach_to_scene(&scene, "").unwrap();

        assert_eq!(scene.node_name(node).as_deref(), Some("prop::crate"));
        assert_eq!(prop.entity_name(), Some("prop::crate"));
        match &scene.attachments(node)[..] {
            [Attachment::Entity(entity)] => {
                assert_eq!(entity.shape, EntityShape::Prefab(PrefabType::Cube));
                assert_eq!(entity.material.as_deref(), Some("Crate/Wood"));
            }
            other => panic!("unexpected attachments {other:?}"),
        }
    }

    #[test]
    fn physics_follows_node_scale_and_fixing() {
        let assets = AssetTree::stock();
        let scene = SceneManager::new("test");
        let dynamics = Dynamics::new(Vec3::new(0.0, -10.0, 0.0));
        let mut prop = Prop::new("crate", assets.context());

        assert!(matches!(
            prop.attach_physics(&dynamics),
            Err(AttachError::NotAttached(_))
        ));
        prop.scale(Vec3::new(2.0, 1.0, 1.0));
        prop.attach_to_scene(&scene, "box").unwrap();
        let handle = prop.attach_physics(&dynamics).unwrap();
        assert_eq!(
            dynamics.with_body(handle, |b| b.shape()),
            Some(CollisionShape::Box {
                half_extents: Vec3::new(100.0, 50.0, 50.0)
            })
        );
        assert_eq!(dynamics.with_body(handle, |b| b.is_dynamic()), Some(true));

        prop.set_fixed();
        assert_eq!(dynamics.with_body(handle, |b| b.is_static()), Some(true));
        assert_eq!(dynamics.with_body(handle, |b| b.mass()), Some(0.0));

        drop(prop);
        assert_eq!(dynamics.body_count(), 0);
        assert!(scene.node_by_name("box").is_none());
    }

    #[test]
    fn plane_collision_shape_is_flat() {
        let assets = AssetTree::stock();
        let prop = Prop::create("floor", assets.context()).unwrap();
        assert_eq!(
            prop.collision_shape(),
            CollisionShape::Box {
                half_extents: Vec3::new(100.0, 100.0, 0.0)
            }
        );
        assert_eq!(prop.mass(), 0.0);
    }
}

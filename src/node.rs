use glam::{Quat, Vec3};

use crate::error::{AttachError, GraphError};
use crate::graph::{NodeId, SceneManager};
use crate::loadable::AssetKind;

/// Position, scale and orientation relative to a parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
    pub orientation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Link between an asset instance and its scene graph node.
///
/// While detached, transform operations accumulate in a pending transform
/// which is applied to the node when it is created.
#[derive(Debug, Default)]
pub struct NodeBinding {
    manager: Option<SceneManager>,
    node: Option<NodeId>,
    pending: Transform,
}

impl NodeBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn manager(&self) -> Option<&SceneManager> {
        self.manager.as_ref()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn is_attached(&self) -> bool {
        self.node.is_some()
    }

    fn live(&self) -> Option<(&SceneManager, NodeId)> {
        Some((self.manager.as_ref()?, self.node?))
    }

    /// Creates a child of `parent` named `name` carrying the pending
    /// transform. Any previous node is removed first.
    pub fn bind(
        &mut self,
        manager: &SceneManager,
        parent: NodeId,
        name: &str,
    ) -> Result<NodeId, GraphError> {
        self.detach();
        let node = manager.create_child_node(parent, Some(name))?;
        manager.update(node, |n| {
            n.position = self.pending.position;
            n.scale = self.pending.scale;
            n.orientation = self.pending.orientation;
        });
        self.manager = Some(manager.clone());
        self.node = Some(node);
        Ok(node)
    }

    /// Removes the node. Later transforms accumulate in the pending
    /// transform again.
    pub fn detach(&mut self) {
        if let Some((manager, node)) = self.live() {
            manager.remove_node(node);
        }
        self.manager = None;
        self.node = None;
    }

    pub fn transform(&self) -> Transform {
        match self.live().and_then(|(m, n)| m.node(n)) {
            Some(node) => Transform {
                position: node.position,
                scale: node.scale,
                orientation: node.orientation,
            },
            None => self.pending,
        }
    }

    pub fn translate(&mut self, offset: Vec3) {
        match self.live() {
            Some((manager, node)) => {
                manager.translate(node, offset);
            }
            None => self.pending.position += self.pending.orientation * offset,
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        match self.live() {
            Some((manager, node)) => {
                manager.set_position(node, position);
            }
            None => self.pending.position = position,
        }
    }

    pub fn scale(&mut self, factor: Vec3) {
        match self.live() {
            Some((manager, node)) => {
                manager.scale(node, factor);
            }
            None => self.pending.scale *= factor,
        }
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        match self.live() {
            Some((manager, node)) => {
                manager.set_orientation(node, orientation);
            }
            None => self.pending.orientation = orientation.normalize(),
        }
    }

    pub fn rotate(&mut self, axis: Vec3, angle: f32) {
        match self.live() {
            Some((manager, node)) => {
                manager.rotate(node, axis, angle);
            }
            None => {
                self.pending.orientation =
                    (self.pending.orientation * Quat::from_axis_angle(axis, angle)).normalize()
            }
        }
    }
}

impl Drop for NodeBinding {
    fn drop(&mut self) {
        self.detach();
    }
}

/// An asset instance that can be placed in a scene graph.
pub trait Placeable {
    fn binding(&self) -> &NodeBinding;
    fn binding_mut(&mut self) -> &mut NodeBinding;

    fn kind(&self) -> AssetKind;

    /// Resource group, used as the default node name.
    fn group(&self) -> &str;

    /// Loads the definition if needed, failing unless it loaded cleanly.
    fn prepare(&mut self) -> Result<(), AttachError>;

    /// Creates the engine objects living on a freshly created node.
    fn populate(&mut self, _manager: &SceneManager, _node: NodeId, _id: &str) -> Result<(), AttachError> {
        Ok(())
    }

    /// Releases engine objects before the node goes away.
    fn release(&mut self) {}

    fn attach_to_scene(&mut self, manager: &SceneManager, id: &str) -> Result<NodeId, AttachError> {
        self.attach_under(manager, manager.root(), id)
    }

    fn attach_to_node(&mut self, parent: &dyn Placeable, id: &str) -> Result<NodeId, AttachError> {
        let binding = parent.binding();
        let (Some(manager), Some(node)) = (binding.manager(), binding.node()) else {
            return Err(AttachError::ParentDetached);
        };
        let manager = manager.clone();
        self.attach_under(&manager, node, id)
    }

    /// Attaches below `parent`, naming the node `id` or, when empty, after
    /// the resource group.
    fn attach_under(
        &mut self,
        manager: &SceneManager,
        parent: NodeId,
        id: &str,
    ) -> Result<NodeId, AttachError> {
        self.prepare()?;
        let name = if id.is_empty() {
            self.group().to_string()
        } else {
            id.to_string()
        };
        self.release();
        let node = self.binding_mut().bind(manager, parent, &name)?;
        if let Err(err) = self.populate(manager, node, &name) {
            self.detach();
            return Err(err);
        }
        Ok(node)
    }

    fn detach(&mut self) {
        self.release();
        self.binding_mut().detach();
    }

    fn node(&self) -> Option<NodeId> {
        self.binding().node()
    }

    /// Name of the attached node.
    fn node_name(&self) -> Option<String> {
        let binding = self.binding();
        binding.manager()?.node_name(binding.node()?)
    }

    fn transform(&self) -> Transform {
        self.binding().transform()
    }

    fn translate(&mut self, offset: Vec3) {
        self.binding_mut().translate(offset);
    }

    fn set_position(&mut self, position: Vec3) {
        self.binding_mut().set_position(position);
    }

    fn scale(&mut self, factor: Vec3) {
        self.binding_mut().scale(factor);
    }

    fn set_orientation(&mut self, orientation: Quat) {
        self.binding_mut().set_orientation(orientation);
    }

    fn yaw(&mut self, angle: f32) {
        self.binding_mut().rotate(Vec3::Y, angle);
    }

    fn pitch(&mut self, angle: f32) {
        self.binding_mut().rotate(Vec3::X, angle);
    }

    fn roll(&mut self, angle: f32) {
        self.binding_mut().rotate(Vec3::Z, angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[derive(Debug, Default)]
    struct Marker {
        binding: NodeBinding,
        fail_prepare: bool,
    }

    impl Placeable for Marker {
        fn binding(&self) -> &NodeBinding {
            &self.binding
        }

        fn binding_mut(&mut self) -> &mut NodeBinding {
            &mut self.binding
        }

        fn kind(&self) -> AssetKind {
            AssetKind::Light
        }

        fn group(&self) -> &str {
            "light::marker"
        }

        fn prepare(&mut self) -> Result<(), AttachError> {
            if self.fail_prepare {
                Err(AttachError::NotLoaded {
                    kind: AssetKind::Light,
                    name: "marker".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn pending_transform_is_applied_on_attach() {
        let scene = SceneManager::new("test");
        let mut marker = Marker::default();
        marker.yaw(FRAC_PI_2);
        marker.translate(Vec3::new(0.0, 0.0, -10.0));
        marker.scale(Vec3::splat(2.0));

        let node = marker.attach_to_scene(&scene, "").unwrap();
        assert_eq!(scene.node_name(node).as_deref(), Some("light::marker"));
        let position = scene.position(node).unwrap();
        assert!((position - Vec3::new(-10.0, 0.0, 0.0)).length() < 1e-4);
        assert_eq!(scene.scale_of(node), Some(Vec3::splat(2.0)));

        // attached: translation happens in parent space
        marker.translate(Vec3::new(0.0, 0.0, -10.0));
        let position = scene.position(node).unwrap();
        assert!((position - Vec3::new(-10.0, 0.0, -10.0)).length() < 1e-4);
    }

    #[test]
    fn reattaching_replaces_the_node() {
        let scene = SceneManager::new("test");
        let mut marker = Marker::default();
        let first = marker.attach_to_scene(&scene, "one").unwrap();
        let second = marker.attach_to_scene(&scene, "two").unwrap();
        assert!(!scene.contains(first));
        assert!(scene.contains(second));
        assert_eq!(marker.node_name().as_deref(), Some("two"));
    }

    #[test]
    fn children_attach_below_their_parent() {
        let scene = SceneManager::new("test");
        let mut parent = Marker::default();
        let mut child = Marker::default();
        assert!(matches!(
            child.attach_to_node(&parent, "child"),
            Err(AttachError::ParentDetached)
        ));
        let parent_node = parent.attach_to_scene(&scene, "parent").unwrap();
        let child_node = child.attach_to_node(&parent, "child").unwrap();
        assert_eq!(scene.parent(child_node), Some(parent_node));

        drop(parent);
        assert!(!scene.contains(child_node));
        assert_eq!(scene.node_count(), 1);
    }

    #[test]
    fn failed_preparation_leaves_nothing_behind() {
        let scene = SceneManager::new("test");
        let mut marker = Marker {
            fail_prepare: true,
            ..Marker::default()
        };
        assert!(marker.attach_to_scene(&scene, "x").is_err());
        assert!(!marker.binding().is_attached());
        assert_eq!(scene.node_count(), 1);
    }
}

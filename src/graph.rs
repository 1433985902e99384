use std::collections::HashMap;
use std::sync::Arc;

use glam::{Quat, Vec3, Vec4};
use parking_lot::RwLock;

use crate::error::GraphError;
use crate::mesh::{Aabb, PrefabType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Geometry an entity is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityShape {
    Mesh { source: String, group: String },
    Prefab(PrefabType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub shape: EntityShape,
    pub material: Option<String>,
    pub bounds: Aabb,
}

/// Objects that can hang off a scene node.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    Entity(Entity),
    Light { name: String },
    Camera { name: String },
}

impl Attachment {
    pub fn name(&self) -> &str {
        match self {
            Self::Entity(entity) => &entity.name,
            Self::Light { name } | Self::Camera { name } => name,
        }
    }
}

/// Projection and placement of a camera relative to the node it hangs off.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub position: Vec3,
    pub orientation: Quat,
    pub aspect_ratio: f32,
    pub near_clip: f32,
    pub fov_y: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            aspect_ratio: 4.0 / 3.0,
            near_clip: 100.0,
            fov_y: 45f32.to_radians(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub position: Vec3,
    pub scale: Vec3,
    pub orientation: Quat,
    pub attachments: Vec<Attachment>,
}

impl SceneNode {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            orientation: Quat::IDENTITY,
            attachments: Vec::new(),
        }
    }
}

/// Flattened view of one node for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub name: String,
    pub depth: usize,
    pub world_position: Vec3,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug)]
struct Graph {
    nodes: Vec<Option<SceneNode>>,
    names: HashMap<String, NodeId>,
    cameras: HashMap<String, CameraSettings>,
    ambient: Vec4,
    anonymous: usize,
}

impl Graph {
    fn new() -> Self {
        let mut names = HashMap::new();
        names.insert(ROOT_NAME.to_string(), NodeId(0));
        Self {
            nodes: vec![Some(SceneNode::new(ROOT_NAME.to_string(), None))],
            names,
            cameras: HashMap::new(),
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            anonymous: 0,
        }
    }

    fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)?.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    fn subtree(&self, id: NodeId) -> Vec<(NodeId, usize)> {
        let mut order = Vec::new();
        let mut stack = vec![(id, 0)];
        while let Some((next, depth)) = stack.pop() {
            if let Some(node) = self.node(next) {
                order.push((next, depth));
                stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
            }
        }
        order
    }

    fn world_transform(&self, id: NodeId) -> Option<(Vec3, Quat, Vec3)> {
        let node = self.node(id)?;
        let Some(parent) = node.parent else {
            return Some((node.position, node.orientation, node.scale));
        };
        let (position, orientation, scale) = self.world_transform(parent)?;
        Some((
            position + orientation * (scale * node.position),
            orientation * node.orientation,
            scale * node.scale,
        ))
    }
}

const ROOT_NAME: &str = "SceneRoot";

/// Shared handle to the transform hierarchy of one state.
///
/// Cloning the handle shares the graph, mirroring how every object of a
/// state talks to the same scene manager.
#[derive(Debug, Clone)]
pub struct SceneManager {
    name: Arc<str>,
    graph: Arc<RwLock<Graph>>,
}

impl SceneManager {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            graph: Arc::new(RwLock::new(Graph::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if both handles refer to the same graph.
    pub fn same_as(&self, other: &SceneManager) -> bool {
        Arc::ptr_eq(&self.graph, &other.graph)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Creates a node under `parent`. Unnamed nodes get a generated name.
    pub fn create_child_node(
        &self,
        parent: NodeId,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let mut graph = self.graph.write();
        if graph.node(parent).is_none() {
            return Err(GraphError::UnknownNode(parent));
        }
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                graph.anonymous += 1;
                format!("Unnamed_{}", graph.anonymous)
            }
        };
        if graph.names.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        let id = NodeId(graph.nodes.len());
        graph.nodes.push(Some(SceneNode::new(name.clone(), Some(parent))));
        graph.names.insert(name, id);
        if let Some(parent) = graph.node_mut(parent) {
            parent.children.push(id);
        }
        Ok(id)
    }

    /// Removes a node and everything below it. The root cannot be removed.
    pub fn remove_node(&self, id: NodeId) -> bool {
        if id == self.root() {
            return false;
        }
        let mut graph = self.graph.write();
        let Some(parent) = graph.node(id).map(|node| node.parent) else {
            return false;
        };
        for (node, _) in graph.subtree(id) {
            if let Some(removed) = graph.nodes[node.0].take() {
                graph.names.remove(&removed.name);
            }
        }
        if let Some(parent) = parent.and_then(|p| graph.node_mut(p)) {
            parent.children.retain(|&child| child != id);
        }
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.graph.read().node(id).is_some()
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.graph.read().names.get(name).copied()
    }

    pub fn node_name(&self, id: NodeId) -> Option<String> {
        self.graph.read().node(id).map(|node| node.name.clone())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.graph.read().node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.graph
            .read()
            .node(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.graph.read().names.len()
    }

    /// Snapshot of a node.
    pub fn node(&self, id: NodeId) -> Option<SceneNode> {
        self.graph.read().node(id).cloned()
    }

    /// Applies a mutation to the requested node.
    pub fn update<F, R>(&self, id: NodeId, updater: F) -> Option<R>
    where
        F: FnOnce(&mut SceneNode) -> R,
    {
        let mut graph = self.graph.write();
        graph.node_mut(id).map(updater)
    }

    pub fn position(&self, id: NodeId) -> Option<Vec3> {
        self.graph.read().node(id).map(|node| node.position)
    }

    pub fn scale_of(&self, id: NodeId) -> Option<Vec3> {
        self.graph.read().node(id).map(|node| node.scale)
    }

    pub fn orientation(&self, id: NodeId) -> Option<Quat> {
        self.graph.read().node(id).map(|node| node.orientation)
    }

    pub fn set_position(&self, id: NodeId, position: Vec3) -> bool {
        self.update(id, |node| node.position = position).is_some()
    }

    pub fn set_scale(&self, id: NodeId, scale: Vec3) -> bool {
        self.update(id, |node| node.scale = scale).is_some()
    }

    pub fn set_orientation(&self, id: NodeId, orientation: Quat) -> bool {
        self.update(id, |node| node.orientation = orientation.normalize())
            .is_some()
    }

    pub fn reset_orientation(&self, id: NodeId) -> bool {
        self.set_orientation(id, Quat::IDENTITY)
    }

    /// Moves a node in its parent's space.
    pub fn translate(&self, id: NodeId, offset: Vec3) -> bool {
        self.update(id, |node| node.position += offset).is_some()
    }

    /// Moves a node along its own axes.
    pub fn translate_local(&self, id: NodeId, offset: Vec3) -> bool {
        self.update(id, |node| node.position += node.orientation * offset)
            .is_some()
    }

    pub fn scale(&self, id: NodeId, factor: Vec3) -> bool {
        self.update(id, |node| node.scale *= factor).is_some()
    }

    /// Rotates a node about one of its own axes.
    pub fn rotate(&self, id: NodeId, axis: Vec3, angle: f32) -> bool {
        self.update(id, |node| {
            node.orientation = (node.orientation * Quat::from_axis_angle(axis, angle)).normalize()
        })
        .is_some()
    }

    pub fn yaw(&self, id: NodeId, angle: f32) -> bool {
        self.rotate(id, Vec3::Y, angle)
    }

    pub fn pitch(&self, id: NodeId, angle: f32) -> bool {
        self.rotate(id, Vec3::X, angle)
    }

    pub fn roll(&self, id: NodeId, angle: f32) -> bool {
        self.rotate(id, Vec3::Z, angle)
    }

    pub fn derived_position(&self, id: NodeId) -> Option<Vec3> {
        self.graph.read().world_transform(id).map(|(p, _, _)| p)
    }

    pub fn derived_orientation(&self, id: NodeId) -> Option<Quat> {
        self.graph.read().world_transform(id).map(|(_, q, _)| q)
    }

    pub fn derived_scale(&self, id: NodeId) -> Option<Vec3> {
        self.graph.read().world_transform(id).map(|(_, _, s)| s)
    }

    /// Sets a node's parent-space transform so that it lands on the given
    /// world position and orientation.
    pub fn set_world_transform(&self, id: NodeId, position: Vec3, orientation: Quat) -> bool {
        let mut graph = self.graph.write();
        let parent = match graph.node(id) {
            Some(node) => node.parent,
            None => return false,
        };
        let (local_position, local_orientation) = match parent.and_then(|p| graph.world_transform(p)) {
            Some((p, q, s)) => {
                let inverse = q.inverse();
                ((inverse * (position - p)) / s, inverse * orientation)
            }
            None => (position, orientation),
        };
        if let Some(node) = graph.node_mut(id) {
            node.position = local_position;
            node.orientation = local_orientation.normalize();
        }
        true
    }

    pub fn attach_object(&self, id: NodeId, attachment: Attachment) -> bool {
        self.update(id, |node| node.attachments.push(attachment))
            .is_some()
    }

    pub fn detach_object(&self, id: NodeId, name: &str) -> Option<Attachment> {
        self.update(id, |node| {
            let index = node.attachments.iter().position(|a| a.name() == name)?;
            Some(node.attachments.remove(index))
        })
        .flatten()
    }

    pub fn attachments(&self, id: NodeId) -> Vec<Attachment> {
        self.graph
            .read()
            .node(id)
            .map(|node| node.attachments.clone())
            .unwrap_or_default()
    }

    pub fn set_ambient_light(&self, colour: Vec4) {
        self.graph.write().ambient = colour;
    }

    pub fn ambient_light(&self) -> Vec4 {
        self.graph.read().ambient
    }

    pub fn create_camera(&self, name: &str) -> Result<(), GraphError> {
        let mut graph = self.graph.write();
        if graph.cameras.contains_key(name) {
            return Err(GraphError::DuplicateCamera(name.to_string()));
        }
        graph
            .cameras
            .insert(name.to_string(), CameraSettings::default());
        Ok(())
    }

    pub fn destroy_camera(&self, name: &str) -> bool {
        self.graph.write().cameras.remove(name).is_some()
    }

    pub fn has_camera(&self, name: &str) -> bool {
        self.graph.read().cameras.contains_key(name)
    }

    pub fn camera(&self, name: &str) -> Option<CameraSettings> {
        self.graph.read().cameras.get(name).cloned()
    }

    pub fn update_camera<F, R>(&self, name: &str, updater: F) -> Result<R, GraphError>
    where
        F: FnOnce(&mut CameraSettings) -> R,
    {
        let mut graph = self.graph.write();
        graph
            .cameras
            .get_mut(name)
            .map(updater)
            .ok_or_else(|| GraphError::UnknownCamera(name.to_string()))
    }

    /// Every node below the root in depth-first order.
    pub fn describe(&self) -> Vec<NodeSummary> {
        let graph = self.graph.read();
        graph
            .subtree(NodeId(0))
            .into_iter()
            .skip(1)
            .filter_map(|(id, depth)| {
                let node = graph.node(id)?;
                let (world_position, _, _) = graph.world_transform(id)?;
                Some(NodeSummary {
                    name: node.name.clone(),
                    depth: depth - 1,
                    world_position,
                    attachments: node.attachments.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn names_are_unique() {
        let scene = SceneManager::new("test");
        let root = scene.root();
        scene.create_child_node(root, Some("crate")).unwrap();
        assert_eq!(
            scene.create_child_node(root, Some("crate")),
            Err(GraphError::DuplicateNode("crate".into()))
        );
        let a = scene.create_child_node(root, None).unwrap();
        let b = scene.create_child_node(root, None).unwrap();
        assert_ne!(scene.node_name(a), scene.node_name(b));
        assert_eq!(scene.node_count(), 4);
    }

    #[test]
    fn removing_a_node_removes_its_subtree() {
        let scene = SceneManager::new("test");
        let parent = scene.create_child_node(scene.root(), Some("table")).unwrap();
        let child = scene.create_child_node(parent, Some("cup")).unwrap();
        assert!(scene.remove_node(parent));
        assert!(!scene.contains(child));
        assert!(scene.node_by_name("cup").is_none());
        assert!(scene.children(scene.root()).is_empty());
        assert!(!scene.remove_node(scene.root()));
        // the name can be reused afterwards
        scene.create_child_node(scene.root(), Some("table")).unwrap();
    }

    #[test]
    fn local_translation_follows_orientation() {
        let scene = SceneManager::new("test");
        let node = scene.create_child_node(scene.root(), Some("walker")).unwrap();
        scene.yaw(node, FRAC_PI_2);
        scene.translate_local(node, Vec3::new(0.0, 0.0, -10.0));
        assert!(approx(scene.position(node).unwrap(), Vec3::new(-10.0, 0.0, 0.0)));
        scene.translate(node, Vec3::new(0.0, 0.0, -10.0));
        assert!(approx(scene.position(node).unwrap(), Vec3::new(-10.0, 0.0, -10.0)));
    }

    #[test]
    fn derived_transform_combines_parents() {
        let scene = SceneManager::new("test");
        let parent = scene.create_child_node(scene.root(), Some("arm")).unwrap();
        let child = scene.create_child_node(parent, Some("hand")).unwrap();
        scene.set_position(parent, Vec3::new(10.0, 0.0, 0.0));
        scene.scale(parent, Vec3::splat(2.0));
        scene.yaw(parent, FRAC_PI_2);
        scene.set_position(child, Vec3::new(0.0, 0.0, 5.0));

        assert!(approx(
            scene.derived_position(child).unwrap(),
            Vec3::new(20.0, 0.0, 0.0)
        ));
        assert!(approx(scene.derived_scale(child).unwrap(), Vec3::splat(2.0)));

        scene.set_world_transform(child, Vec3::new(10.0, 0.0, -4.0), Quat::IDENTITY);
        assert!(approx(scene.position(child).unwrap(), Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn attachments_can_be_detached_by_name() {
        let scene = SceneManager::new("test");
        let node = scene.create_child_node(scene.root(), Some("lamp")).unwrap();
        scene.attach_object(node, Attachment::Light { name: "lamp".into() });
        assert_eq!(scene.attachments(node).len(), 1);
        assert!(scene.detach_object(node, "nothing").is_none());
        assert!(scene.detach_object(node, "lamp").is_some());
        assert!(scene.attachments(node).is_empty());
    }

    #[test]
    fn cameras_are_registered_once() {
        let scene = SceneManager::new("test");
        scene.create_camera("eye").unwrap();
        assert!(scene.create_camera("eye").is_err());
        scene.update_camera("eye", |c| c.near_clip = 5.0).unwrap();
        assert_eq!(scene.camera("eye").unwrap().near_clip, 5.0);
        assert!(scene.destroy_camera("eye"));
        assert!(scene.update_camera("eye", |_| ()).is_err());
    }

    #[test]
    fn describe_lists_nodes_depth_first() {
        let scene = SceneManager::new("test");
        let a = scene.create_child_node(scene.root(), Some("a")).unwrap();
        scene.create_child_node(a, Some("a1")).unwrap();
        scene.create_child_node(scene.root(), Some("b")).unwrap();
        let names: Vec<_> = scene
            .describe()
            .into_iter()
            .map(|n| (n.name, n.depth))
            .collect();
        assert_eq!(
            names,
            vec![("a".into(), 0), ("a1".into(), 1), ("b".into(), 0)]
        );
    }
}

use std::sync::Arc;

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::graph::{Attachment, NodeId, SceneManager};
use crate::window::RenderWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraType {
    #[default]
    Unspec,
    FirstPerson,
    Following,
}

impl CameraType {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CameraNodes {
    node: NodeId,
    yaw: NodeId,
    pitch: NodeId,
    roll: NodeId,
}

/// Pitches a camera's pitch node. Held by the actor a camera belongs to.
#[derive(Debug, Clone)]
pub struct CameraRig {
    manager: SceneManager,
    name: String,
    pitch_node: NodeId,
    limit_pitch: bool,
}

impl CameraRig {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pitch_node(&self) -> NodeId {
        self.pitch_node
    }

    pub fn pitch(&self, angle: f32) {
        pitch_node(&self.manager, self.pitch_node, angle, self.limit_pitch);
    }
}

/// With limiting on, the pitch node never turns beyond straight up or
/// straight down.
fn pitch_node(manager: &SceneManager, node: NodeId, angle: f32, limit: bool) {
    manager.pitch(node, angle);
    if !limit {
        return;
    }
    let Some(orientation) = manager.orientation(node) else {
        return;
    };
    let pitch_degrees = 2.0 * orientation.w.clamp(-1.0, 1.0).acos().to_degrees();
    if pitch_degrees > 90.0 && orientation.x != 0.0 {
        let half = 0.5f32.sqrt();
        manager.set_orientation(
            node,
            Quat::from_xyzw(half.copysign(orientation.x), 0.0, 0.0, half),
        );
    }
}

/// A camera hanging off a chain of nodes `node → yaw → pitch → roll`,
/// optionally shown in a viewport of the render window.
#[derive(Debug)]
pub struct Camera {
    name: String,
    manager: SceneManager,
    nodes: Option<CameraNodes>,
    viewport: Option<(Arc<RenderWindow>, i32)>,
    camera_type: CameraType,
    actor: Option<String>,
    limit_pitch: bool,
}

impl Camera {
    pub fn new(name: &str, manager: &SceneManager) -> Result<Self, GraphError> {
        manager.create_camera(name)?;
        Ok(Self {
            name: name.to_string(),
            manager: manager.clone(),
            nodes: None,
            viewport: None,
            camera_type: CameraType::Unspec,
            actor: None,
            limit_pitch: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn camera_type(&self) -> CameraType {
        self.camera_type
    }

    pub fn set_camera_type(&mut self, camera_type: CameraType) {
        self.camera_type = camera_type;
    }

    /// Id of the actor the camera follows.
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn set_actor(&mut self, actor: Option<String>) {
        self.actor = actor;
    }

    pub fn limit_pitch(&self) -> bool {
        self.limit_pitch
    }

    pub fn set_limit_pitch(&mut self, limit: bool) {
        self.limit_pitch = limit;
    }

    pub fn node(&self) -> Option<NodeId> {
        self.nodes.map(|nodes| nodes.node)
    }

    pub fn pitch_node(&self) -> Option<NodeId> {
        self.nodes.map(|nodes| nodes.pitch)
    }

    pub fn rig(&self) -> Option<CameraRig> {
        Some(CameraRig {
            manager: self.manager.clone(),
            name: self.name.clone(),
            pitch_node: self.nodes?.pitch,
            limit_pitch: self.limit_pitch,
        })
    }

    pub fn attach(&mut self, parent: NodeId) -> Result<(), GraphError> {
        self.detach();
        let manager = &self.manager;
        let node = manager.create_child_node(parent, None)?;
        let chain = (|| {
            let yaw = manager.create_child_node(node, None)?;
            let pitch = manager.create_child_node(yaw, None)?;
            let roll = manager.create_child_node(pitch, None)?;
            Ok::<_, GraphError>(CameraNodes {
                node,
                yaw,
                pitch,
                roll,
            })
        })();
        match chain {
            Ok(nodes) => {
                manager.attach_object(
                    nodes.roll,
                    Attachment::Camera {
                        name: self.name.clone(),
                    },
                );
                self.nodes = Some(nodes);
                Ok(())
            }
            Err(err) => {
                manager.remove_node(node);
                Err(err)
            }
        }
    }

    pub fn detach(&mut self) {
        if let Some(nodes) = self.nodes.take() {
            self.manager.remove_node(nodes.node);
        }
    }

    /// Moves the camera's outer node in its parent's space.
    pub fn translate(&self, offset: Vec3) {
        if let Some(node) = self.node() {
            self.manager.translate(node, offset);
        }
    }

    pub fn yaw(&self, angle: f32) {
        if let Some(nodes) = self.nodes {
            self.manager.yaw(nodes.yaw, angle);
        }
    }

    pub fn pitch(&self, angle: f32) {
        if let Some(nodes) = self.nodes {
            pitch_node(&self.manager, nodes.pitch, angle, self.limit_pitch);
        }
    }

    pub fn roll(&self, angle: f32) {
        if let Some(nodes) = self.nodes {
            self.manager.roll(nodes.roll, angle);
        }
    }

    /// Shows the camera at `zorder`, replacing a viewport it already had.
    pub fn create_viewport(&mut self, window: &Arc<RenderWindow>, zorder: i32) {
        self.delete_viewport();
        window.add_viewport(&self.name, zorder);
        self.viewport = Some((Arc::clone(window), zorder));
    }

    pub fn delete_viewport(&mut self) {
        if let Some((window, zorder)) = self.viewport.take() {
            window.remove_viewport(zorder);
        }
    }

    pub fn viewport_zorder(&self) -> Option<i32> {
        self.viewport.as_ref().map(|(_, zorder)| *zorder)
    }

    pub fn set_background(&self, colour: glam::Vec4) {
        if let Some((window, zorder)) = &self.viewport {
            window.set_background(*zorder, colour);
        }
    }

    pub fn match_aspect_ratio(&self) {
        let Some((window, zorder)) = &self.viewport else {
            return;
        };
        if let Some(aspect) = window.aspect_ratio(*zorder) {
            let _ = self
                .manager
                .update_camera(&self.name, |c| c.aspect_ratio = aspect);
        }
    }

    pub fn set_position(&self, position: Vec3) {
        let _ = self
            .manager
            .update_camera(&self.name, |c| c.position = position);
    }

    /// Turns the camera so that it faces `target`, keeping +Y up.
    pub fn look_at(&self, target: Vec3) {
        let _ = self.manager.update_camera(&self.name, |c| {
            let forward = target - c.position;
            if forward.length_squared() <= f32::EPSILON {
                return;
            }
            let back = -forward.normalize();
            let right = Vec3::Y.cross(back).try_normalize().unwrap_or(Vec3::X);
            let up = back.cross(right);
            c.orientation = Quat::from_mat3(&Mat3::from_cols(right, up, back)).normalize();
        });
    }

    pub fn set_near_clip_distance(&self, distance: f32) {
        let _ = self
            .manager
            .update_camera(&self.name, |c| c.near_clip = distance);
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.delete_viewport();
        self.detach();
        self.manager.destroy_camera(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn attach_builds_a_four_node_chain() {
        let scene = SceneManager::new("test");
        let mut camera = Camera::new("eye", &scene).unwrap();
        camera.attach(scene.root()).unwrap();
        assert_eq!(scene.node_count(), 5);

        let pitch = camera.pitch_node().unwrap();
        let roll = scene.children(pitch)[0];
        assert_eq!(
            scene.attachments(roll),
            vec![Attachment::Camera { name: "eye".into() }]
        );

        camera.attach(scene.root()).unwrap();
        assert_eq!(scene.node_count(), 5);
        drop(camera);
        assert_eq!(scene.node_count(), 1);
        assert!(!scene.has_camera("eye"));
    }

    #[test]
    fn camera_names_are_unique() {
        let scene = SceneManager::new("test");
        let _first = Camera::new("eye", &scene).unwrap();
        assert!(Camera::new("eye", &scene).is_err());
    }

    #[test]
    fn limited_pitch_stops_at_vertical() {
        let scene = SceneManager::new("test");
        let mut camera = Camera::new("eye", &scene).unwrap();
        camera.attach(scene.root()).unwrap();
        camera.set_limit_pitch(true);
        for _ in 0..4 {
            camera.pitch(FRAC_PI_4);
        }
        let orientation = scene.orientation(camera.pitch_node().unwrap()).unwrap();
        let half = 0.5f32.sqrt();
        assert!((orientation.x - half).abs() < 1e-5);
        assert!((orientation.w - half).abs() < 1e-5);

        for _ in 0..8 {
            camera.rig().unwrap().pitch(-FRAC_PI_4);
        }
        let orientation = scene.orientation(camera.pitch_node().unwrap()).unwrap();
        assert!((orientation.x + half).abs() < 1e-5);
    }

    #[test]
    fn unlimited_pitch_can_turn_over() {
        let scene = SceneManager::new("test");
        let mut camera = Camera::new("eye", &scene).unwrap();
        camera.attach(scene.root()).unwrap();
        for _ in 0..4 {
            camera.pitch(FRAC_PI_4);
        }
        let orientation = scene.orientation(camera.pitch_node().unwrap()).unwrap();
        assert!(orientation.w.abs() < 1e-5);
    }

    #[test]
    fn viewport_and_projection_settings() {
        let scene = SceneManager::new("test");
        let window = Arc::new(RenderWindow::new("test", 1000, 500));
        let mut camera = Camera::new("eye", &scene).unwrap();
        camera.create_viewport(&window, 0);
        camera.match_aspect_ratio();
        camera.set_near_clip_distance(5.0);
        camera.set_position(Vec3::new(0.0, 0.0, 80.0));
        camera.look_at(Vec3::new(0.0, 0.0, -300.0));

        let settings = scene.camera("eye").unwrap();
        assert_eq!(settings.aspect_ratio, 2.0);
        assert_eq!(settings.near_clip, 5.0);
        let forward = settings.orientation * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_Z).length() < 1e-5);

        camera.look_at(Vec3::new(100.0, 0.0, 80.0));
        let forward = scene.camera("eye").unwrap().orientation * Vec3::NEG_Z;
        assert!((forward - Vec3::X).length() < 1e-5);

        camera.create_viewport(&window, 1);
        assert!(window.viewport(0).is_none());
        drop(camera);
        assert!(window.viewports().is_empty());
    }
}

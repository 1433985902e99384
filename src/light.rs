use std::convert::Infallible;

use crate::error::AttachError;
use crate::graph::{Attachment, NodeId, SceneManager};
use crate::loadable::{AssetContext, AssetKind, Attributes, BuildContext, Definition, Loadable};
use crate::node::{NodeBinding, Placeable};

/// Lights are described entirely by the scene that places them, so there
/// is no document to read and nothing that can be incomplete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightDefinition;

impl Definition for LightDefinition {
    type Element = Infallible;

    fn kind(&self) -> AssetKind {
        AssetKind::Light
    }

    fn factory(
        &mut self,
        _cx: &BuildContext<'_, Infallible>,
        _name: &str,
        _attributes: &Attributes,
    ) -> Option<Infallible> {
        None
    }
}

#[derive(Debug)]
pub struct Light {
    loadable: Loadable<LightDefinition>,
    binding: NodeBinding,
    light: Option<String>,
}

impl Light {
    pub fn new(name: &str, cx: &AssetContext) -> Self {
        Self {
            loadable: Loadable::new(name, LightDefinition, cx),
            binding: NodeBinding::new(),
            light: None,
        }
    }

    pub fn name(&self) -> &str {
        self.loadable.name()
    }

    pub fn loadable_mut(&mut self) -> &mut Loadable<LightDefinition> {
        &mut self.loadable
    }

    /// Name of the light object, once attached.
    pub fn light(&self) -> Option<&str> {
        self.light.as_deref()
    }
}

impl Placeable for Light {
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
        self.loadable.group()
    }

    fn prepare(&mut self) -> Result<(), AttachError> {
        Ok(self.loadable.load()?)
    }

    fn populate(&mut self, manager: &SceneManager, node: NodeId, id: &str) -> Result<(), AttachError> {
        manager.attach_object(node, Attachment::Light { name: id.to_string() });
        self.light = Some(id.to_string());
        Ok(())
    }

    fn release(&mut self) {
        if let (Some(light), Some(manager), Some(node)) =
            (self.light.take(), self.binding.manager(), self.binding.node())
        {
            manager.detach_object(node, &light);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::AssetTree;
    use glam::Vec3;

    #[test]
    fn lights_load_without_a_document() {
        let assets = AssetTree::empty();
        let mut light = Light::new("sun", assets.context());
        light.loadable_mut().load().unwrap();
        assert!(light.loadable_mut().status());
        assert!(!assets.context().resources().has_group("light::sun"));
    }

    #[test]
    fn attaching_places_a_light_object() {
        let assets = AssetTree::empty();
        let scene = SceneManager::new("test");
        let mut light = Light::new("sun", assets.context());
        light.translate(Vec3::new(0.0, 500.0, 0.0));
        let node = light.attach_to_scene(&scene, "sun").unwrap();

        assert_eq!(light.light(), Some("sun"));
        assert_eq!(
            scene.attachments(node),
            vec![Attachment::Light { name: "sun".into() }]
        );
        assert_eq!(scene.position(node), Some(Vec3::new(0.0, 500.0, 0.0)));

        light.detach();
        assert_eq!(light.light(), None);
        assert_eq!(scene.node_count(), 1);
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::error::ResourceError;
use crate::mesh::{load_obj_from_str, Aabb, Mesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Mesh,
    Material,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDeclaration {
    pub name: String,
    pub resource_type: ResourceType,
}

#[derive(Debug, Default)]
struct ResourceGroup {
    locations: Vec<PathBuf>,
    declarations: Vec<ResourceDeclaration>,
    meshes: HashMap<String, Mesh>,
    initialised: bool,
}

/// Named resource groups shared by every asset of an application.
///
/// Each group lists the directories searched for its files and the
/// resources declared into it. Initialising a group reads its meshes.
#[derive(Debug, Clone, Default)]
pub struct ResourceGroups {
    groups: Arc<RwLock<HashMap<String, ResourceGroup>>>,
}

impl ResourceGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_group(&self, group: &str) {
        self.groups.write().entry(group.to_string()).or_default();
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.read().contains_key(group)
    }

    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Adds a search directory to a group, creating the group if needed.
    pub fn add_location(&self, group: &str, location: impl AsRef<Path>) {
        let location = location.as_ref().to_path_buf();
        let mut groups = self.groups.write();
        let entry = groups.entry(group.to_string()).or_default();
        if !entry.locations.contains(&location) {
            debug!("adding {} to resource group {group}", location.display());
            entry.locations.push(location);
        }
    }

    pub fn locations(&self, group: &str) -> Vec<PathBuf> {
        self.groups
            .read()
            .get(group)
            .map(|g| g.locations.clone())
            .unwrap_or_default()
    }

    pub fn declare(
        &self,
        group: &str,
        name: &str,
        resource_type: ResourceType,
    ) -> Result<(), ResourceError> {
        let mut groups = self.groups.write();
        let entry = groups
            .get_mut(group)
            .ok_or_else(|| ResourceError::UnknownGroup(group.to_string()))?;
        let declaration = ResourceDeclaration {
            name: name.to_string(),
            resource_type,
        };
        if !entry.declarations.contains(&declaration) {
            entry.declarations.push(declaration);
        }
        Ok(())
    }

    pub fn declarations(&self, group: &str) -> Vec<ResourceDeclaration> {
        self.groups
            .read()
            .get(group)
            .map(|g| g.declarations.clone())
            .unwrap_or_default()
    }

    /// Reads every declared mesh of the group from its locations.
    ///
    /// Materials are recorded only. Meshes already read are kept, so
    /// initialising a group twice is harmless.
    pub fn initialise_group(&self, group: &str) -> Result<(), ResourceError> {
        let mut groups = self.groups.write();
        let entry = groups
            .get_mut(group)
            .ok_or_else(|| ResourceError::UnknownGroup(group.to_string()))?;

        let pending: Vec<String> = entry
            .declarations
            .iter()
            .filter(|d| d.resource_type == ResourceType::Mesh)
            .filter(|d| !entry.meshes.contains_key(&d.name))
            .map(|d| d.name.clone())
            .collect();

        for name in pending {
            let path = entry
                .locations
                .iter()
                .map(|location| location.join(&name))
                .find(|path| path.is_file())
                .ok_or_else(|| ResourceError::MeshNotFound {
                    group: group.to_string(),
                    name: name.clone(),
                })?;
            let text = fs::read_to_string(&path).map_err(|source| ResourceError::MeshIo {
                name: name.clone(),
                source,
            })?;
            let mesh = load_obj_from_str(&text).map_err(|err| ResourceError::MeshParse {
                name: name.clone(),
                message: format!("{err:#}"),
            })?;
            debug!(
                "mesh {name} in {group}: {} vertices, {} triangles",
                mesh.vertex_count(),
                mesh.triangle_count()
            );
            entry.meshes.insert(name, mesh);
        }

        entry.initialised = true;
        Ok(())
    }

    pub fn is_initialised(&self, group: &str) -> bool {
        self.groups
            .read()
            .get(group)
            .map_or(false, |g| g.initialised)
    }

    pub fn mesh(&self, group: &str, name: &str) -> Option<Mesh> {
        self.groups.read().get(group)?.meshes.get(name).cloned()
    }

    pub fn mesh_bounds(&self, group: &str, name: &str) -> Option<Aabb> {
        self.groups
            .read()
            .get(group)?
            .meshes
            .get(name)
            .map(|mesh| mesh.bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const TRIANGLE: &str = "v 0 0 0\nv 2 0 0\nv 0 4 0\nf 1 2 3\n";

    #[test]
    fn declaring_into_a_missing_group_fails() {
        let resources = ResourceGroups::new();
        let err = resources
            .declare("prop::crate", "crate.obj", ResourceType::Mesh)
            .unwrap_err();
        assert!(matches!(err, ResourceError::UnknownGroup(_)));
    }

    #[test]
    fn locations_are_not_duplicated() {
        let resources = ResourceGroups::new();
        resources.add_location("prop::crate", "/tmp/a");
        resources.add_location("prop::crate", "/tmp/a");
        assert_eq!(resources.locations("prop::crate").len(), 1);
        assert!(resources.has_group("prop::crate"));
    }

    #[test]
    fn initialise_reads_declared_meshes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tri.obj"), TRIANGLE).unwrap();

        let resources = ResourceGroups::new();
        resources.add_location("prop::tri", dir.path());
        resources
            .declare("prop::tri", "tri.obj", ResourceType::Mesh)
            .unwrap();
        resources
            .declare("prop::tri", "tri.material", ResourceType::Material)
            .unwrap();
        resources.initialise_group("prop::tri").unwrap();

        assert!(resources.is_initialised("prop::tri"));
        let bounds = resources.mesh_bounds("prop::tri", "tri.obj").unwrap();
        assert_eq!(bounds.size(), Vec3::new(2.0, 4.0, 0.0));
        assert!(resources.mesh("prop::tri", "tri.material").is_none());
        assert_eq!(resources.declarations("prop::tri").len(), 2);
    }

    #[test]
    fn missing_mesh_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let resources = ResourceGroups::new();
        resources.add_location("prop::ghost", dir.path());
        resources
            .declare("prop::ghost", "ghost.obj", ResourceType::Mesh)
            .unwrap();
        let err = resources.initialise_group("prop::ghost").unwrap_err();
        assert!(matches!(err, ResourceError::MeshNotFound { .. }));
        assert!(!resources.is_initialised("prop::ghost"));
    }

    #[test]
    fn malformed_mesh_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.obj"), "v 1 2\n").unwrap();
        let resources = ResourceGroups::new();
        resources.add_location("prop::bad", dir.path());
        resources
            .declare("prop::bad", "bad.obj", ResourceType::Mesh)
            .unwrap();
        let err = resources.initialise_group("prop::bad").unwrap_err();
        assert!(matches!(err, ResourceError::MeshParse { .. }));
    }
}

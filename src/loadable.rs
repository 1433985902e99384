//! XML-described assets.
//!
//! Every asset kind reads a small XML document through a kind-specific
//! factory which turns elements into a tree of [`LoadableObject`]s. Once the
//! document has been read the tree is checked for completeness, resources
//! are declared into the asset's resource group and nodes that are only
//! needed while loading are discarded.

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};
use log::{debug, error};
use roxmltree::Document;

use crate::error::{LoadError, ResourceError};
use crate::resources::ResourceGroups;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Scene,
    Prop,
    Actor,
    Light,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scene => "scene",
            Self::Prop => "prop",
            Self::Actor => "actor",
            Self::Light => "light",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "scene" => Some(Self::Scene),
            "prop" => Some(Self::Prop),
            "actor" => Some(Self::Actor),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Props and actors keep their document and resources in a directory
    /// of their own.
    pub fn uses_subdirectory(self) -> bool {
        matches!(self, Self::Prop | Self::Actor)
    }

    /// Lights are described inline by scenes and have no document.
    pub fn has_document(self) -> bool {
        !matches!(self, Self::Light)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an asset's document and resources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocation {
    pub container: PathBuf,
    pub path: PathBuf,
    pub group: String,
}

impl AssetLocation {
    /// Resolves `name` of `kind` below `root`.
    ///
    /// A name beginning with `/` is used as an absolute location.
    pub fn resolve(root: &Path, kind: AssetKind, name: &str) -> Self {
        let base = if name.starts_with('/') {
            PathBuf::from(name)
        } else {
            root.join(format!("{kind}s")).join(name)
        };
        let (container, path) = if kind.uses_subdirectory() {
            let path = base.join(format!("{kind}.xml"));
            (base, path)
        } else {
            let container = base.parent().map(Path::to_path_buf).unwrap_or_default();
            let mut path = OsString::from(base);
            path.push(".xml");
            (container, PathBuf::from(path))
        };
        Self {
            container,
            path,
            group: format!("{kind}::{name}"),
        }
    }
}

/// Assets root and resource groups shared by everything an application loads.
#[derive(Debug, Clone)]
pub struct AssetContext {
    root: PathBuf,
    resources: ResourceGroups,
}

impl AssetContext {
    pub fn new(root: impl Into<PathBuf>, resources: ResourceGroups) -> Self {
        Self {
            root: root.into(),
            resources,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resources(&self) -> &ResourceGroups {
        &self.resources
    }

    pub fn locate(&self, kind: AssetKind, name: &str) -> AssetLocation {
        AssetLocation::resolve(&self.root, kind, name)
    }
}

/// Attributes of an element in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_node(node: &roxmltree::Node<'_, '_>) -> Self {
        node.attributes()
            .map(|attr| {
                let name = match attr.namespace() {
                    Some(ns) => format!("{ns}{}", attr.name()),
                    None => attr.name().to_string(),
                };
                (name, attr.value().to_string())
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    /// Reads a number, keeping `default` when the attribute is absent.
    pub fn parse_float(&self, name: &str, default: f32) -> f32 {
        self.get(name).map_or(default, atof)
    }

    pub fn parse_xyz(&self, defaults: Vec3) -> Vec3 {
        Vec3::new(
            self.parse_float("x", defaults.x),
            self.parse_float("y", defaults.y),
            self.parse_float("z", defaults.z),
        )
    }

    /// Reads `r`, `g`, `b`, `a`; missing channels default to opaque black.
    pub fn parse_colour(&self) -> Vec4 {
        Vec4::new(
            self.parse_float("r", 0.0),
            self.parse_float("g", 0.0),
            self.parse_float("b", 0.0),
            self.parse_float("a", 1.0),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Lenient number parsing: the longest numeric prefix is used and text
/// without one reads as zero.
pub fn atof(text: &str) -> f32 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let whole = digits(end);
    end += whole;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits(end + 1);
        end += 1 + fraction;
    }
    if whole + fraction == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = digits(end + 1 + sign);
        if exponent > 0 {
            end += 1 + sign + exponent;
        }
    }
    text[..end].parse().unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// One element of an asset document.
#[derive(Debug, Clone)]
pub struct LoadableObject<E> {
    name: String,
    attributes: Attributes,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    loaded: bool,
    element: E,
}

impl<E> LoadableObject<E> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }
}

/// Behaviour of an element payload while its tree is built and checked.
pub trait Element {
    /// Discardable elements are dropped once loading has finished.
    fn discardable(&self) -> bool {
        false
    }

    /// The element's own completeness, ignoring its children.
    fn complete(&self) -> bool {
        true
    }

    /// Offered each child before it is linked; refusing drops the child.
    fn accept_child(&mut self, _child: &Self) -> bool {
        true
    }
}

impl Element for std::convert::Infallible {}

/// Arena holding the element tree of one asset.
#[derive(Debug, Clone)]
pub struct ObjectTree<E> {
    nodes: Vec<Option<LoadableObject<E>>>,
    root: Option<ObjectId>,
}

impl<E> Default for ObjectTree<E> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<E> ObjectTree<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<ObjectId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn get(&self, id: ObjectId) -> Option<&LoadableObject<E>> {
        self.nodes.get(id.0)?.as_ref()
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut LoadableObject<E>> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    pub fn element(&self, id: ObjectId) -> Option<&E> {
        self.get(id).map(LoadableObject::element)
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.get(id)?.parent
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.get(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Node ids below and including `id`, parents before children and
    /// siblings in document order.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.get(next) {
                order.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        order
    }

    /// Every node in document order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &LoadableObject<E>)> {
        self.root
            .map(|root| self.descendants(root))
            .unwrap_or_default()
            .into_iter()
            .filter_map(move |id| self.get(id).map(|node| (id, node)))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Starts a new tree with `element` at its root.
    pub fn insert_root(&mut self, name: &str, attributes: Attributes, element: E) -> ObjectId {
        self.clear();
        let id = self.push(name, attributes, None, element);
        self.root = Some(id);
        id
    }

    fn push(
        &mut self,
        name: &str,
        attributes: Attributes,
        parent: Option<ObjectId>,
        element: E,
    ) -> ObjectId {
        let id = ObjectId(self.nodes.len());
        self.nodes.push(Some(LoadableObject {
            name: name.to_string(),
            attributes,
            parent,
            children: Vec::new(),
            loaded: false,
            element,
        }));
        id
    }

    /// Marks a node and any unfinished descendants as loaded.
    pub fn finish_loading(&mut self, id: ObjectId) {
        for node in self.descendants(id) {
            if let Some(node) = self.get_mut(node) {
                node.loaded = true;
            }
        }
    }

    fn remove_subtree(&mut self, id: ObjectId) {
        for node in self.descendants(id) {
            self.nodes[node.0] = None;
        }
    }
}

impl<E: Element> ObjectTree<E> {
    /// Links a child under `parent` if the parent accepts it.
    pub fn add_child(
        &mut self,
        parent: ObjectId,
        name: &str,
        attributes: Attributes,
        element: E,
    ) -> Option<ObjectId> {
        if !self.get_mut(parent)?.element.accept_child(&element) {
            return None;
        }
        let id = self.push(name, attributes, Some(parent), element);
        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    /// True when the node and all of its descendants are loaded and pass
    /// their own checks.
    pub fn complete(&self, id: ObjectId) -> bool {
        self.get(id).map_or(false, |node| {
            node.loaded
                && node.element.complete()
                && node.children.iter().all(|&child| self.complete(child))
        })
    }

    /// Drops discardable nodes and the attributes of the survivors.
    pub fn discard(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        if self.get(root).map_or(true, |node| node.element.discardable()) {
            self.clear();
            return;
        }
        self.discard_below(root);
    }

    fn discard_below(&mut self, id: ObjectId) {
        let children = self.children(id).to_vec();
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if self.element(child).map_or(true, Element::discardable) {
                self.remove_subtree(child);
            } else {
                self.discard_below(child);
                kept.push(child);
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.children = kept;
            node.attributes.clear();
        }
    }
}

/// What a factory may inspect about the tree built so far.
pub struct BuildContext<'a, E> {
    tree: &'a ObjectTree<E>,
    current: Option<ObjectId>,
}

impl<'a, E> BuildContext<'a, E> {
    pub fn new(tree: &'a ObjectTree<E>, current: Option<ObjectId>) -> Self {
        Self { tree, current }
    }

    pub fn has_root(&self) -> bool {
        self.tree.root().is_some()
    }

    /// The node new elements would be added under.
    pub fn current(&self) -> Option<&'a LoadableObject<E>> {
        self.tree.get(self.current?)
    }

    pub fn current_element(&self) -> Option<&'a E> {
        self.current().map(LoadableObject::element)
    }

    pub fn current_is_root(&self) -> bool {
        self.current.is_some() && self.current == self.tree.root()
    }
}

/// Kind-specific loading behaviour.
pub trait Definition: Clone + fmt::Debug {
    type Element: Element + Clone + fmt::Debug;

    fn kind(&self) -> AssetKind;

    /// Creates the payload for an element, or `None` to skip the element
    /// and everything inside it.
    fn factory(
        &mut self,
        cx: &BuildContext<'_, Self::Element>,
        name: &str,
        attributes: &Attributes,
    ) -> Option<Self::Element>;

    /// Declares resources found in the loaded tree into `group`.
    fn add_resources(
        &mut self,
        _tree: &ObjectTree<Self::Element>,
        _group: &str,
        _resources: &ResourceGroups,
    ) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Text of the asset document, or `None` for kinds without one.
    fn read_document(&self, location: &AssetLocation) -> std::io::Result<Option<String>> {
        if self.kind().has_document() {
            fs::read_to_string(&location.path).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// An asset definition and its load state.
#[derive(Debug, Clone)]
pub struct Loadable<D: Definition> {
    name: String,
    location: AssetLocation,
    loaded: bool,
    status: bool,
    tree: ObjectTree<D::Element>,
    definition: D,
    resources: ResourceGroups,
}

impl<D: Definition> Loadable<D> {
    pub fn new(name: &str, definition: D, cx: &AssetContext) -> Self {
        Self {
            name: name.to_string(),
            location: cx.locate(definition.kind(), name),
            loaded: false,
            status: false,
            tree: ObjectTree::new(),
            definition,
            resources: cx.resources().clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AssetKind {
        self.definition.kind()
    }

    pub fn location(&self) -> &AssetLocation {
        &self.location
    }

    /// Resource group, `kind::name`.
    pub fn group(&self) -> &str {
        &self.location.group
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn tree(&self) -> &ObjectTree<D::Element> {
        &self.tree
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    pub fn definition_mut(&mut self) -> &mut D {
        &mut self.definition
    }

    pub fn resources(&self) -> &ResourceGroups {
        &self.resources
    }

    /// Loads the definition once. Later calls report the first outcome.
    pub fn load(&mut self) -> Result<(), LoadError> {
        if self.loaded {
            return if self.status {
                Ok(())
            } else {
                Err(LoadError::PreviouslyFailed {
                    kind: self.kind(),
                    name: self.name.clone(),
                })
            };
        }
        self.loaded = true;
        let outcome = self.read_definition();
        self.status = outcome.is_ok();
        if let Err(err) = &outcome {
            error!("{err}");
        }
        outcome
    }

    /// A copy of a successfully loaded definition.
    pub fn try_clone(&self) -> Option<Self> {
        (self.loaded && self.status).then(|| self.clone())
    }

    fn read_definition(&mut self) -> Result<(), LoadError> {
        let kind = self.kind();
        let document = self
            .definition
            .read_document(&self.location)
            .map_err(|source| LoadError::Io {
                kind,
                name: self.name.clone(),
                path: self.location.path.clone(),
                source,
            })?;
        let Some(text) = document else {
            return Ok(());
        };

        self.parse(&text)?;
        let root = self.tree.root().ok_or_else(|| LoadError::NoRoot {
            path: self.location.path.clone(),
        })?;
        if !self.tree.complete(root) {
            self.tree.discard();
            return Err(LoadError::Incomplete {
                kind,
                name: self.name.clone(),
                path: self.location.path.clone(),
            });
        }

        let group = self.location.group.clone();
        self.resources.add_location(&group, &self.location.container);
        self.definition
            .add_resources(&self.tree, &group, &self.resources)
            .and_then(|()| self.resources.initialise_group(&group))
            .map_err(|source| LoadError::Resources {
                group: group.clone(),
                source,
            })?;
        self.tree.discard();
        debug!(
            "loaded {kind} `{}` from {}",
            self.name,
            self.location.path.display()
        );
        Ok(())
    }

    fn parse(&mut self, text: &str) -> Result<(), LoadError> {
        let document = Document::parse(text).map_err(|source| LoadError::Xml {
            path: self.location.path.clone(),
            source,
        })?;
        self.tree.clear();
        self.visit(document.root_element(), None);
        Ok(())
    }

    fn visit(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<ObjectId>) {
        let tag = node.tag_name();
        let name = match tag.namespace() {
            Some(ns) => format!("{ns}{}", tag.name()),
            None => tag.name().to_string(),
        };
        let attributes = Attributes::from_node(&node);

        let cx = BuildContext::new(&self.tree, parent);
        let Some(element) = self.definition.factory(&cx, &name, &attributes) else {
            debug!("skipping <{name}> in {}", self.location.path.display());
            return;
        };
        let id = match parent {
            None => self.tree.insert_root(&name, attributes, element),
            Some(parent) => match self.tree.add_child(parent, &name, attributes, element) {
                Some(id) => id,
                None => {
                    debug!("<{name}> was refused by its parent");
                    return;
                }
            },
        };

        for child in node.children().filter(roxmltree::Node::is_element) {
            self.visit(child, Some(id));
        }
        self.tree.finish_loading(id);
    }
}

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;
use crate::loadable::AssetKind;

/// Failure while turning an asset description into a usable definition.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {kind} `{name}` from {}: {source}", path.display())]
    Io {
        kind: AssetKind,
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid XML in {}: {source}", path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("no suitable root found in {}", path.display())]
    NoRoot { path: PathBuf },
    #[error("{kind} `{name}` from {} has an incomplete definition", path.display())]
    Incomplete {
        kind: AssetKind,
        name: String,
        path: PathBuf,
    },
    #[error("failed to add resources from {group}: {source}")]
    Resources {
        group: String,
        #[source]
        source: ResourceError,
    },
    #[error("{kind} `{name}` previously failed to load")]
    PreviouslyFailed { kind: AssetKind, name: String },
}

/// Failure reported by the resource group manager.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource group `{0}` does not exist")]
    UnknownGroup(String),
    #[error("mesh `{name}` was not found in any location of group `{group}`")]
    MeshNotFound { group: String, name: String },
    #[error("unable to read mesh `{name}`: {source}")]
    MeshIo {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("mesh `{name}` is malformed: {message}")]
    MeshParse { name: String, message: String },
}

/// Failure reported by a scene manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("a scene node named `{0}` already exists")]
    DuplicateNode(String),
    #[error("scene node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("a camera named `{0}` already exists")]
    DuplicateCamera(String),
    #[error("camera `{0}` does not exist")]
    UnknownCamera(String),
}

/// Failure while placing an asset into a scene.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("cannot attach {kind} `{name}` which has not been properly loaded")]
    NotLoaded { kind: AssetKind, name: String },
    #[error("cannot attach a scene because no scene manager is available")]
    NoSceneManager,
    #[error("cannot attach to a parent which is not part of a scene")]
    ParentDetached,
    #[error("{0} is not attached to a scene")]
    NotAttached(String),
    #[error("failed to create {kind} `{name}` instance")]
    Factory { kind: AssetKind, name: String },
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failure while reading the engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

//! Scene graph.
//!
//! A [`Scene`] is the root of a tree of [`SceneNode`]s. Nodes are groups, meshes
//! or lights and each carries a local [`Transform`]; world transforms are derived
//! during traversal.

use std::{
    collections::HashSet,
    sync::atomic::{AtomicU64, Ordering},
};

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    config::{LightConfig, rgb},
    data_structures::{
        geometry::{Geometry, GeometryId, Material, MaterialId},
        transform::Transform,
    },
};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    /// Light arriving from `direction` (pointing towards the light).
    Directional {
        color: [f32; 3],
        intensity: f32,
        direction: Vector3<f32>,
    },
}

impl From<&LightConfig> for Light {
    fn from(config: &LightConfig) -> Self {
        match config.direction {
            None => Light::Ambient {
                color: rgb(config.color),
                intensity: config.intensity,
            },
            Some(direction) => Light::Directional {
                color: rgb(config.color),
                intensity: config.intensity,
                direction: direction.into(),
            },
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    /// A drawable node. Most meshes have a single material; multi-material
    /// meshes list one per geometry group.
    Mesh {
        geometry: Geometry,
        materials: Vec<Material>,
    },
    Light(Light),
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            kind,
            transform: Transform::default(),
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self::new(
            name,
            NodeKind::Mesh {
                geometry,
                materials: vec![material],
            },
        )
    }

    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn is_drawable(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. })
    }

    /// Visits this node and its descendants depth-first with their world matrices.
    pub fn traverse<'a, F>(&'a self, parent: &Matrix4<f32>, f: &mut F)
    where
        F: FnMut(&'a SceneNode, &Matrix4<f32>),
    {
        let world = parent * self.transform.to_matrix();
        f(self, &world);
        for child in &self.children {
            child.traverse(&world, f);
        }
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::count).sum::<usize>()
    }
}

/// A GPU resource owned by a drawable node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualResource {
    Geometry(GeometryId),
    Material(MaterialId),
}

#[derive(Debug, Default)]
pub struct Scene {
    children: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top level node and returns its id.
    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = node.id();
        self.children.push(node);
        id
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    pub fn traverse<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(&'a SceneNode, &Matrix4<f32>),
    {
        let root = Matrix4::identity();
        for child in &self.children {
            child.traverse(&root, &mut f);
        }
    }

    /// Every geometry and material attached to a drawable node, each listed once
    /// even when several meshes share it.
    pub fn visual_resources(&self) -> Vec<VisualResource> {
        let mut seen = HashSet::new();
        let mut resources = Vec::new();
        self.traverse(|node, _| {
            if let NodeKind::Mesh {
                geometry,
                materials,
            } = &node.kind
            {
                let node_resources = std::iter::once(VisualResource::Geometry(geometry.id()))
                    .chain(
                        materials
                            .iter()
                            .map(|material| VisualResource::Material(material.id())),
                    );
                for resource in node_resources {
                    if seen.insert(resource) {
                        resources.push(resource);
                    }
                }
            }
        });
        resources
    }

    pub fn lights(&self) -> Vec<Light> {
        let mut lights = Vec::new();
        self.traverse(|node, _| {
            if let NodeKind::Light(light) = &node.kind {
                lights.push(light.clone());
            }
        });
        lights
    }

    /// Total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.children.iter().map(SceneNode::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Drops every node. Returns how many nodes were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.len();
        self.children.clear();
        removed
    }
}

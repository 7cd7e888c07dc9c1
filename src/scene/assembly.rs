use std::collections::BTreeSet;

use glam::Vec3;
use tracing::{debug, info};

/// Node of a loaded character model, as handed over by the asset loader.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh { material: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>, children: Vec<SceneNode>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Group,
            cast_shadow: false,
            receive_shadow: false,
            children,
        }
    }

    pub fn mesh(name: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Mesh {
                material: material.into(),
            },
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        }
    }

    /// Depth-first walk over this node and all descendants.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

/// A fully loaded character model ready to be spawned.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterAssembly {
    pub root: SceneNode,
    /// Built from merged trait parts rather than a single model file.
    pub composite: bool,
    /// Capsule height suggested by the model's proportions.
    pub capsule_height_hint: Option<f32>,
}

impl CharacterAssembly {
    /// Turn on shadows for every mesh and return the distinct materials used.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut materials = BTreeSet::new();
        let mut meshes = 0usize;
        self.root.visit_mut(&mut |node| {
            if let NodeKind::Mesh { material } = &node.kind {
                node.cast_shadow = true;
                node.receive_shadow = true;
                materials.insert(material.clone());
                meshes += 1;
            }
        });

        if self.composite {
            info!(root = %self.root.name, meshes, materials = materials.len(), "normalized composite character");
        } else {
            debug!(root = %self.root.name, meshes, "normalized character");
        }
        materials.into_iter().collect()
    }
}

/// Where and how to place a new character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    /// Capsule center.
    pub position: Vec3,
    pub forward: Vec3,
    /// Make the spawned character the input receiver.
    pub take_control: bool,
}

impl SpawnPoint {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward,
            take_control: false,
        }
    }

    pub fn controlled(mut self) -> Self {
        self.take_control = true;
        self
    }
}

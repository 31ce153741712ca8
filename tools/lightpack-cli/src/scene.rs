//! Scene description and hierarchy traversal
//!
//! A scene is a forest of named nodes. Users select nodes by slash-separated
//! paths of names from a root (`"World/Static/Wall"`); among siblings with
//! the same name the first one wins. Sibling names need not be unique, so
//! collected renderers are identified by their [`NodeId`] instead.

use anyhow::{Context, Result};
use glam::Vec2;
use hashbrown::HashSet;
use lightpack_core::{ScaleOffset, SurfaceOutcome, SurfaceSource, UvChannels};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Child indices from the scene roots down to a node
pub type NodeId = Vec<usize>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub roots: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Inactive nodes hide their whole subtree
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<Renderer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderer {
    /// Lightmap this renderer samples, -1 for none
    #[serde(default = "default_lightmap_index")]
    pub lightmap_index: i32,
    /// `[scale_x, scale_y, offset_x, offset_y]`
    #[serde(default = "default_scale_offset")]
    pub lightmap_scale_offset: [f32; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<Vec<[f32; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv2: Option<Vec<[f32; 2]>>,
}

fn default_active() -> bool {
    true
}

fn default_lightmap_index() -> i32 {
    -1
}

fn default_scale_offset() -> [f32; 4] {
    ScaleOffset::IDENTITY.to_array()
}

impl Renderer {
    pub fn is_lightmapped(&self) -> bool {
        self.lightmap_index >= 0
    }

    /// Point the renderer at its repacked lightmap
    ///
    /// Returns `true` if anything changed.
    pub fn apply(&mut self, outcome: &SurfaceOutcome) -> bool {
        match outcome {
            SurfaceOutcome::Mapped { page, scale_offset } => {
                self.lightmap_index = *page as i32;
                self.lightmap_scale_offset = scale_offset.to_array();
                true
            }
            SurfaceOutcome::Unmapped => {
                self.lightmap_index = -1;
                self.lightmap_scale_offset = ScaleOffset::IDENTITY.to_array();
                true
            }
            SurfaceOutcome::Unpacked | SurfaceOutcome::Skipped => false,
        }
    }
}

/// A lightmapped renderer found by [`Scene::collect_lightmapped`]
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRenderer {
    /// Position of the owning node in the scene
    pub node: NodeId,
    /// Hierarchy path of the owning node, for messages
    pub path: String,
    pub renderer: Renderer,
}

impl CollectedRenderer {
    pub fn to_surface_source(&self) -> SurfaceSource {
        let to_points =
            |uvs: &Vec<[f32; 2]>| -> Vec<Vec2> { uvs.iter().copied().map(Vec2::from).collect() };
        SurfaceSource {
            name: self.path.clone(),
            lightmap_index: self.renderer.lightmap_index,
            lightmap_scale_offset: ScaleOffset::from_array(self.renderer.lightmap_scale_offset),
            uvs: UvChannels {
                uv: self.renderer.uv.as_ref().map(to_points),
                uv2: self.renderer.uv2.as_ref().map(to_points),
            },
        }
    }
}

impl Scene {
    /// Load scene from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid scene: {}", path.display()))
    }

    /// Parse scene from a JSON string
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse scene JSON")
    }

    /// Write scene as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize scene")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write scene: {}", path.display()))
    }

    /// Resolve a slash-separated hierarchy path
    pub fn find_node(&self, path: &str) -> Option<&Node> {
        self.node(&self.resolve(path)?)
    }

    pub fn find_node_mut(&mut self, path: &str) -> Option<&mut Node> {
        let id = self.resolve(path)?;
        self.node_mut(&id)
    }

    /// Id of the node at a slash-separated path (first match among siblings)
    pub fn resolve(&self, path: &str) -> Option<NodeId> {
        let mut id = Vec::new();
        let mut siblings = &self.roots;
        for name in path.split('/') {
            let index = siblings.iter().position(|n| n.name == name)?;
            id.push(index);
            siblings = &siblings[index].children;
        }
        Some(id)
    }

    pub fn node(&self, id: &[usize]) -> Option<&Node> {
        let (first, rest) = id.split_first()?;
        let mut node = self.roots.get(*first)?;
        for &index in rest {
            node = node.children.get(index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, id: &[usize]) -> Option<&mut Node> {
        let (first, rest) = id.split_first()?;
        let mut node = self.roots.get_mut(*first)?;
        for &index in rest {
            node = node.children.get_mut(index)?;
        }
        Some(node)
    }

    /// Collect lightmapped renderers under `roots` (all scene roots if empty)
    ///
    /// Depth-first, parents before children, siblings in order. Inactive
    /// nodes prune their subtree. A renderer reachable from several selected
    /// roots is collected once. Unknown root paths are an error.
    pub fn collect_lightmapped(&self, roots: &[String]) -> Result<Vec<CollectedRenderer>> {
        let mut stack: Vec<(NodeId, String, &Node)> = Vec::new();
        if roots.is_empty() {
            for (index, node) in self.roots.iter().enumerate().rev() {
                stack.push((vec![index], node.name.clone(), node));
            }
        } else {
            for path in roots.iter().rev() {
                let id = self
                    .resolve(path)
                    .with_context(|| format!("Root not found in scene: {:?}", path))?;
                let node = self
                    .node(&id)
                    .with_context(|| format!("Root not found in scene: {:?}", path))?;
                stack.push((id, path.clone(), node));
            }
        }

        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut collected = Vec::new();

        while let Some((id, path, node)) = stack.pop() {
            if !node.active {
                tracing::debug!("Skipping inactive subtree {}", path);
                continue;
            }
            if let Some(renderer) = node.renderer.as_ref().filter(|r| r.is_lightmapped()) {
                if seen.insert(id.clone()) {
                    collected.push(CollectedRenderer {
                        node: id.clone(),
                        path: path.clone(),
                        renderer: renderer.clone(),
                    });
                }
            }
            for (index, child) in node.children.iter().enumerate().rev() {
                let mut child_id = id.clone();
                child_id.push(index);
                stack.push((child_id, format!("{}/{}", path, child.name), child));
            }
        }

        Ok(collected)
    }

    /// Apply a repack outcome to the renderer of node `id`
    ///
    /// Returns `false` if the node has no renderer or nothing changed.
    pub fn apply_outcome(&mut self, id: &[usize], outcome: &SurfaceOutcome) -> bool {
        match self.node_mut(id).and_then(|n| n.renderer.as_mut()) {
            Some(renderer) => renderer.apply(outcome),
            None => {
                tracing::warn!("No renderer at node {:?} to update", id);
                false
            }
        }
    }
}

use crate::core::*;
use crate::error::{Result, TreeError};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A bubble in a [`Snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub position: Point,
}

/// A parent-to-child edge in a [`Snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub source: String,
    pub target: String,
}

/// JSON-friendly picture of the tree reachable from a root
///
/// Dual links belong to an editing session and are not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: String,
    pub nodes: IndexMap<String, SnapshotNode>,
    #[serde(default)]
    pub edges: Vec<SnapshotEdge>,
}

impl Snapshot {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

fn snapshot_id(n: NodeIdx) -> String {
    format!("n{}", n.index())
}

impl From<&Tree> for Snapshot {
    fn from(tree: &Tree) -> Self {
        let mut nodes = IndexMap::new();
        let mut edges = vec![];

        for n in tree.bfs(tree.root()) {
            let node = tree.at(n);
            nodes.insert(
                snapshot_id(n),
                SnapshotNode {
                    color: node.color(),
                    label: node.label().map(|x| x.to_owned()),
                    position: node.position(),
                },
            );
            edges.extend(node.children().iter().map(|&c| SnapshotEdge {
                source: snapshot_id(n),
                target: snapshot_id(c),
            }));
        }

        Snapshot {
            root: snapshot_id(tree.root()),
            nodes,
            edges,
        }
    }
}

impl TryFrom<Snapshot> for Tree {
    type Error = TreeError;

    fn try_from(value: Snapshot) -> Result<Self> {
        let root_node = value
            .nodes
            .get(&value.root)
            .ok_or_else(|| TreeError::MissingRoot(value.root.clone()))?;
        if root_node.color != Color::Root || root_node.label.is_some() {
            return Err(TreeError::InvalidColor(value.root.clone()));
        }

        let mut tree = Tree::new(root_node.position);
        let mut translation = IndexMap::new();
        translation.insert(value.root.clone(), tree.root());

        for (id, node) in &value.nodes {
            if *id == value.root {
                continue;
            }
            // only the root carries the sentinel
            if node.color == Color::Root {
                return Err(TreeError::InvalidColor(id.to_owned()));
            }
            let n =
                tree.new_node(node.position, node.label.clone(), node.color);
            translation.insert(id.to_owned(), n);
        }

        let mut adopted = IndexSet::new();
        for edge in value.edges {
            let source = *translation
                .get(&edge.source)
                .ok_or(TreeError::UnknownNode(edge.source.clone()))?;
            let target = *translation
                .get(&edge.target)
                .ok_or(TreeError::UnknownNode(edge.target.clone()))?;

            if target == tree.root() {
                return Err(TreeError::CycleRejected {
                    parent: source,
                    child: target,
                });
            }
            if !adopted.insert(target) {
                return Err(TreeError::MultipleParents(edge.target));
            }
            tree.insert(source, target)?;
        }

        let root = tree.root();
        tree.normalize_heights(root);
        Ok(tree)
    }
}

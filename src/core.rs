use petgraph::graph as pg;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::Index;
use tracing::trace;

use crate::error::{Result, TreeError};

////////////////////////////////////////////////////////////////////////////////
// Colors

/// The color of a bubble, which determines the connective it stands for
///
/// The two multiplicative colors are conjunction (white) and disjunction
/// (black) regions; the two exponential colors are the `!` and `?`
/// singletons. The root of every tree carries the sentinel [`Color::Root`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
pub enum Color {
    PositiveMult,
    NegativeMult,
    PositiveExp,
    NegativeExp,
    Root,
}

impl Color {
    /// Returns the structural opposite of a color (stays within the
    /// multiplicative or exponential pair; the root maps to black)
    pub fn opposite(self) -> Self {
        match self {
            Self::NegativeMult => Self::PositiveMult,
            Self::PositiveMult | Self::Root => Self::NegativeMult,
            Self::PositiveExp => Self::NegativeExp,
            Self::NegativeExp => Self::PositiveExp,
        }
    }

    /// Returns the multiplicative color a fresh region inside a bubble of
    /// this color should have (ignores exponential wrapping)
    pub fn opposite_polarity(self) -> Self {
        match self {
            Self::NegativeMult | Self::PositiveExp => Self::PositiveMult,
            Self::PositiveMult | Self::NegativeExp | Self::Root => {
                Self::NegativeMult
            }
        }
    }

    /// Returns true iff the color is one of the two multiplicative colors
    pub fn is_multiplicative(self) -> bool {
        matches!(self, Self::PositiveMult | Self::NegativeMult)
    }

    /// Returns true iff the color is one of the two exponential colors
    pub fn is_exponential(self) -> bool {
        matches!(self, Self::PositiveExp | Self::NegativeExp)
    }

    /// Returns true iff the color is white or `!`
    pub fn is_positive(self) -> bool {
        matches!(self, Self::PositiveMult | Self::PositiveExp)
    }

    /// Returns true iff the color is black or `?`
    pub fn is_negative(self) -> bool {
        matches!(self, Self::NegativeMult | Self::NegativeExp)
    }

    /// Polarity flip used by the dual rendering; the root is its own flip
    pub fn flipped(self) -> Self {
        match self {
            Self::Root => Self::Root,
            c => c.opposite(),
        }
    }

    /// Short human-readable name of the color
    pub fn name(self) -> &'static str {
        match self {
            Self::PositiveMult => "White",
            Self::NegativeMult => "Black",
            Self::PositiveExp => "Blue",
            Self::NegativeExp => "Red",
            Self::Root => "Root",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Nodes

/// Screen-space position (or velocity) of a bubble
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An index to a bubble in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(usize);

impl NodeIdx {
    /// Returns the arena slot of the bubble
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bubble in a bubble tree
#[derive(Debug, Clone)]
pub struct Node {
    color: Color,
    label: Option<String>,
    children: Vec<NodeIdx>,
    parent: Option<NodeIdx>,
    depth: usize,
    height: usize,
    dual: Option<NodeIdx>,
    position: Point,
    velocity: Point,
}

impl Node {
    fn new(at: Point, label: Option<String>, color: Color) -> Self {
        Self {
            color,
            label: label.filter(|l| !l.is_empty()),
            children: vec![],
            parent: None,
            depth: 0,
            height: 0,
            dual: None,
            position: at,
            velocity: Point::default(),
        }
    }

    /// Returns the bubble's color
    pub fn color(&self) -> Color {
        self.color
    }

    /// Returns the bubble's atomic label, if it exists
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the bubble's children (order carries no meaning)
    pub fn children(&self) -> &[NodeIdx] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeIdx> {
        self.parent
    }

    /// Returns the distance from the root of the tree holding the bubble
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the cached height (only exact after height normalization)
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the bubble's partner while assumption mode is active
    pub fn dual(&self) -> Option<NodeIdx> {
        self.dual
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Edges

#[derive(Debug, Clone)]
struct Edge;

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "")
    }
}

#[derive(Debug, Clone)]
struct DotNode {
    text: String,
    color: Color,
    idx: NodeIdx,
}

impl fmt::Display for DotNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trees

/// A bubble tree (main data structure for this crate)
///
/// Bubbles live in an arena and are referenced by [`NodeIdx`] indexes. Every
/// bubble owns an ordered list of child indexes and keeps a plain index back
/// to its parent. Detached bubbles stay in the arena without a parent and can
/// be reinserted later.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeIdx,
}

/// # Creating a bubble tree
impl Tree {
    /// Creates a tree holding only a root bubble at `origin`
    pub fn new(origin: Point) -> Self {
        Self {
            nodes: vec![Node::new(origin, None, Color::Root)],
            root: NodeIdx(0),
        }
    }

    /// Creates a new detached bubble (an empty label means no label)
    pub fn new_node(
        &mut self,
        at: Point,
        label: Option<String>,
        color: Color,
    ) -> NodeIdx {
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(Node::new(at, label, color));
        trace!(node = %idx, %color, "created bubble");
        idx
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(Point::default())
    }
}

impl Index<NodeIdx> for Tree {
    type Output = Node;

    fn index(&self, n: NodeIdx) -> &Node {
        &self.nodes[n.0]
    }
}

/// # Basic operations
impl Tree {
    /// Returns an index to the root bubble
    pub fn root(&self) -> NodeIdx {
        self.root
    }

    /// Returns a [`Node`] given an index to it
    pub fn at(&self, n: NodeIdx) -> &Node {
        &self.nodes[n.0]
    }

    /// Returns the number of bubbles in the arena (detached ones included)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns indexes to every bubble in the arena
    pub fn indexes(&self) -> impl Iterator<Item = NodeIdx> {
        (0..self.nodes.len()).map(NodeIdx)
    }

    /// Returns true iff `a` is `b` or a strict ancestor of `b`
    pub fn is_above(&self, a: NodeIdx, b: NodeIdx) -> bool {
        let mut ancestor = Some(b);
        while let Some(n) = ancestor {
            if n == a {
                return true;
            }
            ancestor = self.nodes[n.0].parent;
        }
        false
    }

    /// Returns true iff `n` is reachable from the root
    pub fn is_attached(&self, n: NodeIdx) -> bool {
        self.is_above(self.root, n)
    }

    /// Returns every other child of the bubble's parent
    pub fn siblings(&self, n: NodeIdx) -> Vec<NodeIdx> {
        match self.nodes[n.0].parent {
            // you're not your own sibling
            Some(p) => self.nodes[p.0]
                .children
                .iter()
                .copied()
                .filter(|&c| c != n)
                .collect(),
            None => vec![],
        }
    }
}

/// # Traversals
impl Tree {
    /// Returns the subtree rooted at `n` in post-order (children before
    /// their parent)
    pub fn iterate(&self, n: NodeIdx) -> impl Iterator<Item = NodeIdx> {
        let mut order = Vec::new();
        self.post_order(n, &mut order);
        order.into_iter()
    }

    fn post_order(&self, n: NodeIdx, order: &mut Vec<NodeIdx>) {
        for &child in &self.nodes[n.0].children {
            self.post_order(child, order);
        }
        order.push(n);
    }

    /// Returns the subtree rooted at `n` in breadth-first order
    pub fn bfs(&self, n: NodeIdx) -> impl Iterator<Item = NodeIdx> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([n]);
        while let Some(next) = queue.pop_front() {
            order.push(next);
            queue.extend(self.nodes[next.0].children.iter().copied());
        }
        order.into_iter()
    }

    /// Returns the lowest common ancestor of the given bubbles, or `None` if
    /// no bubbles are given or they live in disjoint trees
    pub fn lowest_common_ancestor(
        &self,
        nodes: &[NodeIdx],
    ) -> Option<NodeIdx> {
        match nodes {
            [] => None,
            [a] => Some(*a),
            [a, b] => self.lca_pair(*a, *b),
            _ => {
                let (left, right) = nodes.split_at(nodes.len() / 2);
                let left = self.lowest_common_ancestor(left)?;
                let right = self.lowest_common_ancestor(right)?;
                self.lca_pair(left, right)
            }
        }
    }

    fn lca_pair(&self, mut a: NodeIdx, mut b: NodeIdx) -> Option<NodeIdx> {
        loop {
            if self.is_above(a, b) {
                return Some(a);
            }
            if self.is_above(b, a) {
                return Some(b);
            }
            if self.nodes[a.0].depth >= self.nodes[b.0].depth {
                a = self.nodes[a.0].parent?;
            } else {
                b = self.nodes[b.0].parent?;
            }
        }
    }
}

/// # Modification operations
impl Tree {
    /// Inserts `child` under `parent`
    ///
    /// Fails without touching the tree if `child` is `parent` or one of its
    /// ancestors. Inserting an existing direct child is a no-op. A child
    /// still attached elsewhere is unlinked from its old parent first. Depths
    /// of the moved subtree are re-derived; heights are not, so callers must
    /// normalize heights afterwards.
    pub fn insert(
        &mut self,
        parent: NodeIdx,
        child: NodeIdx,
    ) -> Result<NodeIdx> {
        if self.is_above(child, parent) {
            return Err(TreeError::CycleRejected { parent, child });
        }
        if self.nodes[parent.0].children.contains(&child) {
            return Ok(child);
        }
        if let Some(old) = self.nodes[child.0].parent {
            self.unlink(old, child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.rederive_depths(child);
        trace!(%parent, %child, "inserted");
        Ok(child)
    }

    /// Detaches `target` from whichever bubble holds it inside the subtree
    /// rooted at `ancestor`
    pub fn detach(
        &mut self,
        ancestor: Option<NodeIdx>,
        target: NodeIdx,
    ) -> Result<()> {
        let Some(ancestor) = ancestor else {
            return Err(TreeError::DetachNotFound { target });
        };
        for n in self.iterate(ancestor) {
            if self.unlink(n, target) {
                trace!(parent = %n, child = %target, "detached");
                return Ok(());
            }
        }
        Err(TreeError::DetachNotFound { target })
    }

    fn unlink(&mut self, parent: NodeIdx, child: NodeIdx) -> bool {
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&c| c == child) {
            Some(i) => {
                // order is insignificant, so delete fast
                children.swap_remove(i);
                self.nodes[child.0].parent = None;
                true
            }
            None => false,
        }
    }

    fn rederive_depths(&mut self, n: NodeIdx) {
        for m in self.bfs(n) {
            self.nodes[m.0].depth = match self.nodes[m.0].parent {
                Some(p) => self.nodes[p.0].depth + 1,
                None => 0,
            };
        }
    }

    /// Recomputes the height of every bubble in the subtree rooted at `n`
    pub fn normalize_heights(&mut self, n: NodeIdx) {
        for m in self.iterate(n) {
            let height = self.nodes[m.0]
                .children
                .iter()
                .map(|c| self.nodes[c.0].height + 1)
                .max()
                .unwrap_or(0);
            self.nodes[m.0].height = height;
        }
    }

    /// Replaces the bubble's label (an empty label removes it)
    pub fn set_label(&mut self, n: NodeIdx, label: Option<String>) {
        self.nodes[n.0].label = label.filter(|l| !l.is_empty());
    }

    /// Appends text to the bubble's label
    pub fn append_label(&mut self, n: NodeIdx, text: &str) {
        let label = self.nodes[n.0].label.get_or_insert_with(String::new);
        label.push_str(text);
    }

    pub(crate) fn link_duals(&mut self, a: NodeIdx, b: NodeIdx) {
        self.nodes[a.0].dual = Some(b);
        self.nodes[b.0].dual = Some(a);
    }

    pub(crate) fn clear_duals(&mut self) {
        for node in &mut self.nodes {
            node.dual = None;
        }
    }

    /// Deep structural copy of the subtree rooted at `n` (duals are not
    /// copied); the copy is detached
    pub fn copy(&mut self, n: NodeIdx) -> NodeIdx {
        self.graft_copy(n, None, false)
    }

    /// Deep copy of the subtree rooted at `n` with every polarity flipped
    pub fn negate(&mut self, n: NodeIdx) -> NodeIdx {
        self.graft_copy(n, None, true)
    }

    fn graft_copy(
        &mut self,
        n: NodeIdx,
        parent: Option<NodeIdx>,
        flip: bool,
    ) -> NodeIdx {
        let source = &self.nodes[n.0];
        let color = if flip {
            source.color.flipped()
        } else {
            source.color
        };
        let mut copy = Node::new(source.position, source.label.clone(), color);
        let children = source.children.clone();
        copy.parent = parent;
        copy.depth = parent.map_or(0, |p| self.nodes[p.0].depth + 1);

        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(copy);
        for child in children {
            let c = self.graft_copy(child, Some(idx), flip);
            self.nodes[idx.0].children.push(c);
        }
        idx
    }
}

/// # Geometry
impl Tree {
    /// Returns the mean position of every bubble in the subtree at `n`
    pub fn center_of_mass(&self, n: NodeIdx) -> Point {
        mean(self.iterate(n).map(|m| self.nodes[m.0].position))
            .unwrap_or(self.nodes[n.0].position)
    }

    /// Moves the bubble to the mean position of its strict descendants
    pub fn center_around_children(&mut self, n: NodeIdx) {
        let center = mean(
            self.iterate(n)
                .filter(|&m| m != n)
                .map(|m| self.nodes[m.0].position),
        );
        if let Some(center) = center {
            self.nodes[n.0].position = center;
        }
    }

    pub fn set_position(&mut self, n: NodeIdx, at: Point) {
        self.nodes[n.0].position = at;
    }

    /// Drags the subtree at `n`, recording the delta as its velocity and
    /// recentering every ancestor below the root
    pub fn move_by(&mut self, n: NodeIdx, dx: i32, dy: i32) {
        for m in self.iterate(n) {
            let p = &mut self.nodes[m.0].position;
            p.x = p.x.saturating_add(dx);
            p.y = p.y.saturating_add(dy);
        }
        self.nodes[n.0].velocity = Point::new(dx, dy);

        let mut ancestor = self.nodes[n.0].parent;
        while let Some(a) = ancestor {
            if self.nodes[a.0].depth == 0 {
                break;
            }
            self.nodes[a.0].position = self.center_of_mass(a);
            ancestor = self.nodes[a.0].parent;
        }
    }
}

fn mean(points: impl Iterator<Item = Point>) -> Option<Point> {
    let (mut x, mut y, mut n) = (0i64, 0i64, 0i64);
    for p in points {
        x += i64::from(p.x);
        y += i64::from(p.y);
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(Point::new((x / n) as i32, (y / n) as i32))
}

/// Text formatting
impl Tree {
    /// Returns an indented listing of the subtree at `n`, one bubble per line
    pub fn outline(&self, n: NodeIdx) -> String {
        let mut s = String::new();
        self.outline_into(n, &mut s);
        s
    }

    fn outline_into(&self, n: NodeIdx, s: &mut String) {
        let node = &self.nodes[n.0];
        s.push_str(&".".repeat(node.depth));
        match node.label() {
            Some(l) => s.push_str(l),
            None => s.push_str(node.color.name()),
        }
        s.push_str(&format!("({})\n", node.height));
        for &child in &node.children {
            self.outline_into(child, s);
        }
    }
}

/// DOT formatting
impl Tree {
    fn node_format(
        highlights: &HashMap<NodeIdx, String>,
        node: &DotNode,
    ) -> String {
        let base = match node.color {
            Color::PositiveMult => "style=filled,fillcolor=white",
            Color::NegativeMult => {
                "style=filled,fillcolor=black,fontcolor=white"
            }
            Color::PositiveExp => "style=filled,fillcolor=cyan3",
            Color::NegativeExp => "style=filled,fillcolor=firebrick2",
            Color::Root => "shape=rectangle,color=gray35,fontcolor=gray35",
        }
        .to_string();
        base + &match highlights.get(&node.idx) {
            Some(c) => format!(",style=filled,fillcolor={}", c),
            None => "".to_string(),
        }
    }

    /// Returns a representation of the tree reachable from the root in the
    /// [DOT](https://graphviz.org/doc/info/lang.html)
    /// markup language (bubbles are highlighted using the provided colors)
    pub fn dot(&self, highlights: &HashMap<NodeIdx, String>) -> String {
        let mut g = pg::DiGraph::new();
        let mut translation = HashMap::new();

        for n in self.bfs(self.root) {
            let node = &self.nodes[n.0];
            let pid = g.add_node(DotNode {
                text: node.label().unwrap_or(node.color.name()).to_owned(),
                color: node.color,
                idx: n,
            });
            translation.insert(n, pid);
            if let Some(parent_pid) =
                node.parent.and_then(|p| translation.get(&p))
            {
                let _ = g.add_edge(*parent_pid, pid, Edge);
            }
        }

        let get_edge_attrs =
            |g: &pg::DiGraph<DotNode, Edge>, e: pg::EdgeReference<'_, Edge>| {
                if g[e.target()].color.is_exponential() {
                    "style=dashed".to_string()
                } else {
                    "".to_string()
                }
            };
        let get_node_attrs =
            |_: &pg::DiGraph<DotNode, Edge>,
             (_, node): (pg::NodeIndex, &DotNode)| {
                Self::node_format(highlights, node)
            };

        let d = petgraph::dot::Dot::with_attr_getters(
            &g,
            &[petgraph::dot::Config::EdgeNoLabel],
            &get_edge_attrs,
            &get_node_attrs,
        );
        format!("{}", d)
    }
}

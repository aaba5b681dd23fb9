//! The proof-editing engine
//!
//! A [`ProofState`] owns a bubble tree together with the interaction state
//! around it (the grabbed bubble, the highlighted bubbles and an optional
//! open cut). Every user-visible edit goes through [`ProofState::execute`],
//! which mirrors new bubbles onto the other side of an open cut and
//! normalizes heights before control returns to the caller.

use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::algo::{canonical, dual_form, multiplicative_path};
use crate::config::{EngineConfig, Mode};
use crate::core::*;
use crate::error::{Result, TreeError};

/// The two anchors of an open cut, edited as synchronized duals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssumptionPair {
    pub positive: NodeIdx,
    pub negative: NodeIdx,
}

/// Coarse interaction state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Grabbed,
    AssumptionPending,
    AssumptionActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Positive(NodeIdx, Point),
    Negative(NodeIdx, Point),
}

/// A proof-editing session over a single bubble tree
#[derive(Debug, Clone)]
pub struct ProofState {
    tree: Tree,
    grabbed: Option<NodeIdx>,
    grabbed_parent: Option<NodeIdx>,
    highlighted: IndexSet<NodeIdx>,
    assumption: Option<AssumptionPair>,
    pending: Option<Pending>,
    mode: Mode,
    config: EngineConfig,
    created: Vec<NodeIdx>,
}

impl Default for ProofState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// # Creating a session
impl ProofState {
    /// Creates a session holding only the root bubble
    pub fn new(config: EngineConfig) -> Self {
        Self {
            tree: Tree::new(config.root_position),
            grabbed: None,
            grabbed_parent: None,
            highlighted: IndexSet::new(),
            assumption: None,
            pending: None,
            mode: config.mode,
            config,
            created: vec![],
        }
    }

    /// Creates a detached bubble; bubbles created during an edit are
    /// mirrored across an open cut when the edit completes
    pub fn new_node(
        &mut self,
        at: Point,
        label: Option<String>,
        color: Color,
    ) -> NodeIdx {
        let n = self.tree.new_node(at, label, color);
        self.created.push(n);
        n
    }
}

/// # Queries
impl ProofState {
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> NodeIdx {
        self.tree.root()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grabbed(&self) -> Option<NodeIdx> {
        self.grabbed
    }

    /// Returns the parent the grabbed bubble had when it was grabbed
    pub fn grabbed_parent(&self) -> Option<NodeIdx> {
        self.grabbed_parent
    }

    pub fn highlighted(&self) -> &IndexSet<NodeIdx> {
        &self.highlighted
    }

    pub fn is_highlighted(&self, n: NodeIdx) -> bool {
        self.highlighted.contains(&n)
    }

    /// Returns the anchors of the open cut, if there is one
    pub fn assumption(&self) -> Option<AssumptionPair> {
        self.assumption
    }

    pub fn in_assumption_mode(&self) -> bool {
        self.assumption.is_some()
    }

    /// Returns true iff `n` lies inside either side of the open cut
    pub fn in_assumption(&self, n: NodeIdx) -> bool {
        self.assumption.is_some_and(|pair| {
            self.tree.is_above(pair.positive, n)
                || self.tree.is_above(pair.negative, n)
        })
    }

    fn is_anchor(&self, n: NodeIdx) -> bool {
        self.assumption
            .is_some_and(|pair| pair.positive == n || pair.negative == n)
    }

    pub fn phase(&self) -> Phase {
        if self.grabbed.is_some() {
            Phase::Grabbed
        } else if self.assumption.is_some() {
            Phase::AssumptionActive
        } else if self.pending.is_some() {
            Phase::AssumptionPending
        } else {
            Phase::Idle
        }
    }

    /// Returns the formula of the whole tree along with the current mode
    pub fn title(&self) -> String {
        format!(
            "{} | Mode: {}",
            canonical(&self.tree, self.tree.root()),
            self.mode
        )
    }
}

/// # Selection and geometry
impl ProofState {
    /// Switches modes (leaving Proof mode closes any open cut)
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == Mode::Create {
            self.exit_assumption();
        }
        debug!(from = %self.mode, to = %mode, "mode switch");
        self.mode = mode;
    }

    /// Lifts a bubble for dragging (the tree itself is untouched)
    pub fn grab(&mut self, n: NodeIdx) {
        self.grabbed = Some(n);
        self.grabbed_parent = self.tree[n].parent();
        self.highlighted = IndexSet::from([n]);
        debug!(node = %n, "grabbed");
    }

    /// Highlights exactly one bubble
    pub fn select(&mut self, n: NodeIdx) {
        self.highlighted = IndexSet::from([n]);
    }

    pub fn add_highlight(&mut self, n: NodeIdx) {
        self.highlighted.insert(n);
    }

    pub fn clear_highlight(&mut self) {
        self.highlighted.clear();
    }

    /// Drags the grabbed bubble along with its subtree
    pub fn move_grabbed(&mut self, dx: i32, dy: i32) {
        if let Some(g) = self.grabbed {
            self.tree.move_by(g, dx, dy);
        }
    }

    /// Moves a single bubble (used by layout, never changes structure)
    pub fn set_position(&mut self, n: NodeIdx, at: Point) {
        self.tree.set_position(n, at);
    }
}

/// # Transactions
impl ProofState {
    /// Runs a structural edit
    ///
    /// While a cut is open, edits whose subject (the first highlighted
    /// bubble, or the grabbed bubble's parent) lies outside the cut are
    /// suppressed and `None` is returned. Otherwise the action runs, bubbles
    /// created during it are mirrored across the cut and every height is
    /// recomputed.
    pub fn execute<R>(
        &mut self,
        action: impl FnOnce(&mut Self) -> R,
    ) -> Option<R> {
        if self.assumption.is_some() && !self.highlighted.is_empty() {
            let subject_inside = self
                .highlighted
                .first()
                .is_some_and(|&h| self.in_assumption(h));
            let origin_inside = self
                .grabbed
                .and_then(|g| self.tree[g].parent())
                .is_some_and(|p| self.in_assumption(p));
            if !subject_inside && !origin_inside {
                debug!("edit outside the open cut suppressed");
                self.created.clear();
                return None;
            }
        }
        let result = action(self);
        self.mirror_created();
        self.normalize_heights();
        Some(result)
    }

    /// Recomputes the height of every bubble in the tree
    pub fn normalize_heights(&mut self) {
        let root = self.tree.root();
        self.tree.normalize_heights(root);
    }

    fn mirror_created(&mut self) {
        let created = std::mem::take(&mut self.created);
        let Some(pair) = self.assumption else {
            return;
        };
        let mut fresh: Vec<NodeIdx> = created
            .into_iter()
            .filter(|&n| {
                !self.is_anchor(n)
                    && self.tree[n].dual().is_none()
                    && self.in_assumption(n)
            })
            .collect();
        // parents before children, so every parent already has its dual
        fresh.sort_by_key(|&n| self.tree[n].depth());
        for n in fresh {
            self.mirror(n, pair);
        }
    }

    fn mirror(&mut self, n: NodeIdx, pair: AssumptionPair) {
        let node = &self.tree[n];
        let Some(parent_dual) =
            node.parent().and_then(|p| self.tree[p].dual())
        else {
            trace!(node = %n, "parent has no dual; not mirrored");
            return;
        };
        let at = if self.tree.is_above(pair.positive, n) {
            self.tree[pair.negative].position()
        } else {
            self.tree[pair.positive].position()
        };
        let label = node.label().map(str::to_owned);
        let color = node.color().opposite();
        let children = node.children().to_vec();

        let m = self.tree.new_node(at, label, color);
        if let Err(e) = self.tree.insert(parent_dual, m) {
            warn!(%e, "could not place mirror");
            return;
        }
        self.tree.link_duals(n, m);
        for child in children {
            if let Some(child_dual) = self.tree[child].dual() {
                if let Err(e) = self.tree.insert(m, child_dual) {
                    warn!(%e, "could not move mirrored child");
                }
            }
        }
        trace!(node = %n, mirror = %m, "mirrored");
    }
}

/// # Structural edits
impl ProofState {
    fn unlink(&mut self, n: NodeIdx) {
        let parent = self.tree[n].parent();
        if let Err(e) = self.tree.detach(parent, n) {
            trace!(%e, "nothing to detach");
        }
    }

    /// Removes a bubble (and its dual) from the tree
    pub fn delete(&mut self, n: NodeIdx) {
        if n == self.tree.root() {
            return;
        }
        let dual = self.tree[n].dual();
        self.unlink(n);
        if let Some(d) = dual {
            self.unlink(d);
        }
        self.highlighted.shift_remove(&n);
    }

    /// Inserts `child` under `parent`, moving the child's dual under the
    /// parent's dual as well
    pub fn place(
        &mut self,
        parent: NodeIdx,
        child: NodeIdx,
    ) -> Result<NodeIdx> {
        self.tree.insert(parent, child)?;
        let parent_dual = self.tree[parent].dual();
        let child_dual = self.tree[child].dual();
        if let (Some(pd), Some(cd)) = (parent_dual, child_dual) {
            if let Err(e) = self.tree.insert(pd, cd) {
                warn!(%e, "dual placement rejected");
            }
        }
        Ok(child)
    }

    /// Decides whether the grabbed bubble may be dropped at `target`
    ///
    /// Every placement is legal in Create mode. In Proof mode a bubble in a
    /// positive region may only sink into positive regions below it without
    /// crossing an exponential boundary, or annihilate with the exact dual
    /// of itself sitting in a negative region below it (in which case both
    /// bubbles are removed here and the grab ends). A bubble in a negative
    /// region may only rise into black regions above it.
    pub fn can_place_at(&mut self, target: NodeIdx) -> bool {
        if self.mode == Mode::Create {
            return true;
        }
        let Some(grabbed) = self.grabbed else {
            return false;
        };
        if self.tree[grabbed].parent() == Some(target) {
            return true;
        }
        if self.tree.is_above(grabbed, target) {
            return false;
        }
        let Some(origin) = self.grabbed_parent else {
            return false;
        };

        let target_color = self.tree[target].color();
        match self.tree[origin].color() {
            Color::PositiveMult | Color::PositiveExp => {
                if !self.tree.is_above(origin, target)
                    || !multiplicative_path(&self.tree, target, origin)
                {
                    return false;
                }
                match target_color {
                    Color::PositiveMult => true,
                    Color::NegativeMult | Color::NegativeExp => {
                        let cancels = canonical(&self.tree, grabbed)
                            == dual_form(&self.tree, target);
                        if cancels {
                            self.cancel(grabbed, target);
                        }
                        cancels
                    }
                    _ => false,
                }
            }
            Color::NegativeMult | Color::NegativeExp => {
                target_color == Color::NegativeMult
                    && self.tree.is_above(target, origin)
                    && multiplicative_path(&self.tree, origin, target)
            }
            Color::Root => false,
        }
    }

    fn cancel(&mut self, grabbed: NodeIdx, target: NodeIdx) {
        debug!(%grabbed, %target, "cut eliminated");
        self.delete(target);
        self.delete(grabbed);
        self.grabbed = None;
        self.grabbed_parent = None;
        self.highlighted.clear();
    }

    /// Commits the grabbed bubble under `target`
    ///
    /// A labeled leaf never receives children: dropping onto one retargets
    /// to its parent when they share a color, and otherwise wraps the leaf
    /// in a fresh region of its color first.
    pub fn release_into(&mut self, target: NodeIdx) {
        if let Some(grabbed) = self.grabbed {
            let origin = self.grabbed_parent;
            let target = self.effective_target(target);
            if Some(target) != origin || origin != self.tree[grabbed].parent()
            {
                if let Err(e) = self.tree.detach(origin, grabbed) {
                    trace!(%e, "grabbed bubble had already left its parent");
                }
                if let Err(e) = self.place(target, grabbed) {
                    warn!(%e, "release rejected; restoring");
                    if let Some(o) = origin {
                        if let Err(e) = self.place(o, grabbed) {
                            warn!(%e, node = %grabbed, "could not restore");
                        }
                    }
                }
            }
            self.highlighted = IndexSet::from([grabbed]);
            debug!(node = %grabbed, %target, "released");
        }
        self.grabbed = None;
        self.grabbed_parent = None;
        self.normalize_heights();
    }

    fn effective_target(&mut self, target: NodeIdx) -> NodeIdx {
        let node = &self.tree[target];
        if node.label().is_none() {
            return target;
        }
        let Some(parent) = node.parent() else {
            return target;
        };
        let (color, position) = (node.color(), node.position());
        if self.tree[parent].color() == color {
            return parent;
        }
        let wrapper = self.new_node(position, None, color);
        match self.wrap(parent, wrapper, target) {
            Ok(()) => wrapper,
            Err(e) => {
                warn!(%e, "could not wrap labeled leaf");
                target
            }
        }
    }

    fn wrap(
        &mut self,
        parent: NodeIdx,
        wrapper: NodeIdx,
        leaf: NodeIdx,
    ) -> Result<()> {
        self.tree.insert(parent, wrapper)?;
        self.tree.detach(Some(parent), leaf)?;
        self.tree.insert(wrapper, leaf)?;
        Ok(())
    }

    /// Releases the grabbed bubble at `target` if that is legal, otherwise
    /// returns it to its original parent and reports the illegal placement
    pub fn drop_at(&mut self, target: NodeIdx) -> Result<()> {
        let origin = self.grabbed_parent;
        if self.can_place_at(target) {
            self.execute(|s| s.release_into(target));
            self.grabbed = None;
            return Ok(());
        }
        debug!(%target, "not allowed");
        match origin {
            Some(o) => {
                self.execute(|s| s.release_into(o));
            }
            None => self.grabbed = None,
        }
        self.grabbed = None;
        Err(TreeError::IllegalPlacement { target })
    }

    /// Wraps sibling bubbles in a new region of `color`
    ///
    /// A single bubble is wrapped directly. Several bubbles are first
    /// gathered into an inner region of their parent's color, which is then
    /// wrapped.
    pub fn loop_wrap(
        &mut self,
        color: Color,
        nodes: &[NodeIdx],
    ) -> Result<NodeIdx> {
        let nodes: IndexSet<NodeIdx> = nodes.iter().copied().collect();
        let parent = nodes
            .first()
            .and_then(|&n| self.tree[n].parent())
            .ok_or(TreeError::MalformedLoopRequest)?;
        if nodes.iter().any(|&n| self.tree[n].parent() != Some(parent)) {
            return Err(TreeError::MalformedLoopRequest);
        }

        let at = self.tree[parent].position();
        let outer = self.new_node(at, None, color);
        self.tree.insert(parent, outer)?;
        let holder = if nodes.len() > 1 {
            let inner_color = match self.tree[parent].color() {
                Color::Root => Color::PositiveMult,
                c => c,
            };
            let inner = self.new_node(at, None, inner_color);
            self.tree.insert(outer, inner)?;
            inner
        } else {
            outer
        };
        for &n in &nodes {
            self.tree.insert(holder, n)?;
        }
        if holder != outer {
            self.tree.center_around_children(holder);
        }
        self.tree.center_around_children(outer);
        self.highlighted = IndexSet::from([outer]);
        trace!(%outer, count = nodes.len(), "looped");
        Ok(outer)
    }

    /// Wraps the highlighted bubbles in a loop of the opposite color
    pub fn loop_highlighted(&mut self) -> Result<NodeIdx> {
        let nodes: Vec<NodeIdx> = self.highlighted.iter().copied().collect();
        let first = *nodes.first().ok_or(TreeError::MalformedLoopRequest)?;
        if self.grabbed.is_some()
            || (self.mode == Mode::Proof && self.is_anchor(first))
        {
            return Err(TreeError::MalformedLoopRequest);
        }
        if self.mode == Mode::Proof && !self.in_assumption(first) {
            debug!(node = %first, "loop outside an open cut");
            return Err(TreeError::OutsideAssumption);
        }
        let color = if nodes.len() == 1 {
            self.tree[first].color().opposite()
        } else {
            self.tree[first]
                .parent()
                .map(|p| self.tree[p].color().opposite())
                .ok_or(TreeError::MalformedLoopRequest)?
        };
        self.execute(|s| s.loop_wrap(color, &nodes))
            .unwrap_or(Err(TreeError::OutsideAssumption))
    }

    /// Creates a fresh region inside `owner`, colored so that it reads as a
    /// new subformula of the owner
    pub fn insert_region(
        &mut self,
        owner: NodeIdx,
        at: Point,
    ) -> Option<NodeIdx> {
        if self.tree[owner].label().is_some()
            || (self.mode == Mode::Proof && !self.in_assumption(owner))
        {
            return None;
        }
        let color = self.tree[owner].color().opposite_polarity();
        self.select(owner);
        self.execute(|s| {
            let region = s.new_node(at, None, color);
            s.grab(region);
            s.release_into(owner);
            region
        })
    }

    /// Adds an empty unit of the same color under the highlighted bubble
    pub fn insert_unit(&mut self) -> Option<NodeIdx> {
        let subject = self.single_highlighted()?;
        if self.tree[subject].label().is_some() {
            return None;
        }
        let node = &self.tree[subject];
        let (color, position) = (node.color(), node.position());
        self.execute(|s| {
            let unit = s.new_node(position, None, color);
            s.place(subject, unit).ok()
        })
        .flatten()
    }

    fn single_highlighted(&self) -> Option<NodeIdx> {
        if self.highlighted.len() != 1 {
            return None;
        }
        self.highlighted
            .first()
            .copied()
            .filter(|&n| n != self.tree.root())
    }

    /// Feeds typed text to the single highlighted bubble
    ///
    /// An unlabeled bubble gets a new labeled child of its own color; a
    /// labeled one (and, inside a cut, its dual) gets the text appended. In
    /// Proof mode typing only works inside an open cut.
    pub fn type_into_highlighted(&mut self, text: &str, at: Point) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(subject) = self.single_highlighted() else {
            return false;
        };
        if self.mode == Mode::Proof && !self.in_assumption_mode() {
            return false;
        }

        let node = &self.tree[subject];
        let color = node.color();
        let position = node.position();
        let labeled = node.label().is_some();
        let mode = self.mode;
        self.execute(|s| {
            if labeled {
                s.tree.append_label(subject, text);
                if let Some(d) = s.tree[subject].dual() {
                    s.tree.append_label(d, text);
                }
                return;
            }
            match mode {
                Mode::Create => {
                    let n = s.new_node(at, Some(text.to_owned()), color);
                    if let Err(e) = s.tree.insert(subject, n) {
                        warn!(%e, "typed label rejected");
                    }
                }
                Mode::Proof => {
                    let n = s.new_node(position, Some(text.to_owned()), color);
                    s.grab(n);
                    s.release_into(subject);
                }
            }
        })
        .is_some()
    }

    /// Deletes the highlighted bubbles
    ///
    /// Create mode removes them outright. Proof mode only removes an
    /// unlabeled wrapper with a single child (the child moves up) or an
    /// empty unit sitting in a region of its own color; the anchors of an
    /// open cut are never deleted. Returns how many bubbles were removed.
    pub fn delete_highlighted(&mut self) -> usize {
        if self.grabbed.is_some() {
            return 0;
        }
        let nodes: Vec<NodeIdx> = self.highlighted.iter().copied().collect();
        let mode = self.mode;
        let removed = self.execute(|s| {
            let mut removed = 0;
            for n in nodes {
                if n == s.tree.root() {
                    continue;
                }
                if mode == Mode::Create {
                    s.delete(n);
                    removed += 1;
                    continue;
                }
                if s.is_anchor(n) {
                    break;
                }
                let node = &s.tree[n];
                if node.label().is_some() {
                    continue;
                }
                let parent = node.parent();
                match (node.children(), parent) {
                    ([child], Some(p)) => {
                        let child = *child;
                        s.delete(n);
                        if let Err(e) = s.place(p, child) {
                            warn!(%e, "could not lift child");
                        }
                        removed += 1;
                    }
                    ([], Some(p)) if s.tree[p].color() == node.color() => {
                        s.delete(n);
                        removed += 1;
                    }
                    _ => {}
                }
            }
            removed
        });
        if removed.is_some() {
            self.highlighted.clear();
        }
        removed.unwrap_or(0)
    }

    /// Pulls the grabbed bubble out of its parent when it is dragged fast
    /// enough
    pub fn yank_grabbed(&mut self) -> bool {
        let Some(grabbed) = self.grabbed else {
            return false;
        };
        let node = &self.tree[grabbed];
        match node.parent() {
            Some(p) if p != self.tree.root() => {}
            _ => return false,
        }
        if self.in_assumption_mode() && node.dual().is_none() {
            return false;
        }
        let v = node.velocity();
        let speed =
            i64::from(v.x).pow(2) + i64::from(v.y).pow(2);
        if speed <= i64::from(self.config.yank_speed_squared) {
            return false;
        }
        self.execute(|s| s.delete(grabbed)).is_some()
    }
}

/// # Assumptions
impl ProofState {
    /// Marks the first side of a cut (an unlabeled black or white bubble)
    pub fn mark_assumption(&mut self, n: NodeIdx, at: Point) -> bool {
        if self.assumption.is_some() || self.pending.is_some() {
            return false;
        }
        let node = &self.tree[n];
        if node.label().is_some() {
            return false;
        }
        self.pending = match node.color() {
            Color::PositiveMult => Some(Pending::Positive(n, at)),
            Color::NegativeMult => Some(Pending::Negative(n, at)),
            _ => return false,
        };
        debug!(node = %n, "assumption pending");
        true
    }

    /// Completes a cut with its second side
    ///
    /// The two sides must be an unlabeled white and an unlabeled black
    /// bubble, one above the other. A fresh empty anchor is opened inside
    /// each side and the anchors are linked as duals.
    pub fn complete_assumption(
        &mut self,
        n: NodeIdx,
        at: Point,
    ) -> Option<AssumptionPair> {
        let pending = self.pending.take()?;
        if self.assumption.is_some() || self.tree[n].label().is_some() {
            return None;
        }
        let ((positive, positive_at), (negative, negative_at)) =
            match (pending, self.tree[n].color()) {
                (Pending::Positive(p, p_at), Color::NegativeMult) => {
                    ((p, p_at), (n, at))
                }
                (Pending::Negative(m, m_at), Color::PositiveMult) => {
                    ((n, at), (m, m_at))
                }
                _ => {
                    debug!(node = %n, "assumption sides do not match");
                    return None;
                }
            };
        if !self.tree.is_above(positive, negative)
            && !self.tree.is_above(negative, positive)
        {
            debug!("assumption sides are unrelated");
            return None;
        }

        let pair = AssumptionPair {
            positive: self.tree.new_node(positive_at, None, Color::PositiveMult),
            negative: self.tree.new_node(negative_at, None, Color::NegativeMult),
        };
        self.tree.insert(positive, pair.positive).ok()?;
        self.tree.insert(negative, pair.negative).ok()?;
        self.tree.link_duals(pair.positive, pair.negative);
        self.assumption = Some(pair);
        self.grabbed = None;
        self.highlighted.clear();
        self.normalize_heights();
        debug!(
            positive = %pair.positive,
            negative = %pair.negative,
            "assumption opened"
        );
        Some(pair)
    }

    /// Closes the cut and forgets every dual link
    pub fn exit_assumption(&mut self) {
        if self.assumption.is_none() && self.pending.is_none() {
            return;
        }
        self.assumption = None;
        self.pending = None;
        self.tree.clear_duals();
        debug!("assumption closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proof_state() -> ProofState {
        ProofState::new(EngineConfig {
            mode: Mode::Proof,
            ..EngineConfig::default()
        })
    }

    fn add(
        state: &mut ProofState,
        parent: NodeIdx,
        label: Option<&str>,
        color: Color,
    ) -> NodeIdx {
        let n = state.new_node(Point::default(), label.map(String::from), color);
        state.place(parent, n).unwrap();
        state.normalize_heights();
        n
    }

    #[test]
    fn grab_highlights_without_mutation() {
        let mut state = ProofState::default();
        let root = state.root();
        let a = add(&mut state, root, Some("A"), Color::PositiveMult);
        state.grab(a);
        assert_eq!(state.grabbed(), Some(a));
        assert_eq!(state.grabbed_parent(), Some(root));
        assert!(state.is_highlighted(a));
        assert_eq!(state.tree()[a].parent(), Some(root));
        assert_eq!(state.phase(), Phase::Grabbed);
    }

    #[test]
    fn release_into_labeled_leaf_of_same_color_uses_parent() {
        let mut state = ProofState::default();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let a = add(&mut state, white, Some("A"), Color::PositiveMult);
        let b = add(&mut state, root, Some("B"), Color::PositiveMult);

        state.grab(b);
        state.release_into(a);
        assert_eq!(state.tree()[b].parent(), Some(white));
        assert!(state.tree()[a].is_leaf());
        assert_eq!(state.grabbed(), None);
        assert_eq!(state.tree()[root].height(), 2);
    }

    #[test]
    fn release_into_labeled_leaf_of_other_color_wraps_it() {
        let mut state = ProofState::default();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let a = add(&mut state, white, Some("A"), Color::NegativeMult);
        let b = add(&mut state, root, Some("B"), Color::PositiveMult);

        state.grab(b);
        state.release_into(a);
        let wrapper = state.tree()[a].parent().unwrap();
        assert_ne!(wrapper, white);
        assert_eq!(state.tree()[wrapper].color(), Color::NegativeMult);
        assert_eq!(state.tree()[wrapper].parent(), Some(white));
        assert_eq!(state.tree()[b].parent(), Some(wrapper));
        assert_eq!(state.tree()[white].children(), &[wrapper]);
    }

    #[test]
    fn create_mode_allows_every_placement() {
        let mut state = ProofState::default();
        let root = state.root();
        let black = add(&mut state, root, None, Color::NegativeMult);
        let a = add(&mut state, black, Some("A"), Color::PositiveMult);
        state.grab(a);
        assert!(state.can_place_at(root));
    }

    #[test]
    fn positive_bubbles_sink_but_do_not_rise() {
        let mut state = proof_state();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let a = add(&mut state, white, Some("A"), Color::PositiveMult);
        let inner = add(&mut state, white, None, Color::PositiveMult);
        let bang = add(&mut state, white, None, Color::PositiveExp);
        let boxed = add(&mut state, bang, None, Color::PositiveMult);

        state.grab(a);
        assert!(state.can_place_at(inner));
        assert!(!state.can_place_at(root));
        assert!(!state.can_place_at(boxed));
        assert!(!state.can_place_at(bang));
    }

    #[test]
    fn negative_bubbles_rise_into_black_regions() {
        let mut state = proof_state();
        let root = state.root();
        let outer = add(&mut state, root, None, Color::NegativeMult);
        let inner = add(&mut state, outer, None, Color::NegativeMult);
        let a = add(&mut state, inner, Some("A"), Color::PositiveMult);
        let below = add(&mut state, inner, None, Color::NegativeMult);

        state.grab(a);
        assert!(state.can_place_at(inner));
        assert!(state.can_place_at(outer));
        assert!(!state.can_place_at(below));
        assert!(!state.can_place_at(root));
    }

    #[test]
    fn drop_at_returns_illegal_moves() {
        let mut state = proof_state();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let a = add(&mut state, white, Some("A"), Color::PositiveMult);

        state.grab(a);
        assert!(matches!(
            state.drop_at(root),
            Err(TreeError::IllegalPlacement { .. })
        ));
        assert_eq!(state.tree()[a].parent(), Some(white));
        assert_eq!(state.grabbed(), None);
    }

    #[test]
    fn loop_wrap_single_and_many() {
        let mut state = ProofState::default();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let a = add(&mut state, white, Some("A"), Color::PositiveMult);
        let b = add(&mut state, white, Some("B"), Color::PositiveMult);
        let c = add(&mut state, white, Some("C"), Color::PositiveMult);

        let outer = state
            .execute(|s| s.loop_wrap(Color::NegativeMult, &[a, b]))
            .unwrap()
            .unwrap();
        let inner = state.tree()[a].parent().unwrap();
        assert_eq!(state.tree()[inner].parent(), Some(outer));
        assert_eq!(state.tree()[inner].color(), Color::PositiveMult);
        assert_eq!(state.tree()[outer].parent(), Some(white));
        assert_eq!(canonical(state.tree(), outer), "(~A + ~B)");
        assert_eq!(
            state.highlighted().iter().copied().collect::<Vec<_>>(),
            vec![outer]
        );

        let single = state.loop_highlighted().unwrap();
        assert_eq!(state.tree()[single].color(), Color::PositiveMult);
        assert_eq!(state.tree()[outer].parent(), Some(single));

        assert!(matches!(
            state.loop_wrap(Color::NegativeMult, &[a, c]),
            Err(TreeError::MalformedLoopRequest)
        ));
        assert!(state.loop_wrap(Color::NegativeMult, &[]).is_err());
    }

    #[test]
    fn typing_in_create_mode() {
        let mut state = ProofState::default();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        state.select(white);
        assert!(state.type_into_highlighted("A", Point::default()));
        let a = state.tree()[white].children()[0];
        assert_eq!(state.tree()[a].label(), Some("A"));

        state.select(a);
        assert!(state.type_into_highlighted("B", Point::default()));
        assert_eq!(state.tree()[a].label(), Some("AB"));
        assert!(!state.type_into_highlighted("  ", Point::default()));
    }

    #[test]
    fn proof_mode_deletes_units_and_unwraps() {
        let mut state = proof_state();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let unit = add(&mut state, white, None, Color::PositiveMult);
        let black = add(&mut state, white, None, Color::NegativeMult);
        let a = add(&mut state, black, Some("A"), Color::PositiveMult);
        let label = add(&mut state, white, Some("B"), Color::PositiveMult);

        state.select(unit);
        state.add_highlight(label);
        assert_eq!(state.delete_highlighted(), 1);
        assert_eq!(state.tree()[unit].parent(), None);
        assert_eq!(state.tree()[label].parent(), Some(white));

        state.select(black);
        assert_eq!(state.delete_highlighted(), 1);
        assert_eq!(state.tree()[a].parent(), Some(white));
    }

    #[test]
    fn yank_needs_speed() {
        let mut state = ProofState::default();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let a = add(&mut state, white, Some("A"), Color::PositiveMult);

        state.grab(a);
        state.move_grabbed(3, 4);
        assert!(!state.yank_grabbed());
        state.move_grabbed(30, 0);
        assert!(state.yank_grabbed());
        assert_eq!(state.tree()[a].parent(), None);
    }

    #[test]
    fn assumption_requires_related_sides() {
        let mut state = proof_state();
        let root = state.root();
        let black = add(&mut state, root, None, Color::NegativeMult);
        let white = add(&mut state, root, None, Color::PositiveMult);

        assert!(state.mark_assumption(black, Point::default()));
        assert_eq!(state.phase(), Phase::AssumptionPending);
        assert!(state.complete_assumption(white, Point::default()).is_none());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn edits_outside_the_cut_are_suppressed() {
        let mut state = proof_state();
        let root = state.root();
        let black = add(&mut state, root, None, Color::NegativeMult);
        let white = add(&mut state, black, None, Color::PositiveMult);
        let other = add(&mut state, root, None, Color::PositiveMult);

        assert!(state.mark_assumption(white, Point::default()));
        let pair = state.complete_assumption(black, Point::default()).unwrap();
        assert_eq!(state.tree()[pair.positive].parent(), Some(white));
        assert_eq!(state.tree()[pair.negative].parent(), Some(black));
        assert_eq!(state.tree()[pair.positive].dual(), Some(pair.negative));

        state.select(other);
        assert!(state.insert_unit().is_none());
        assert!(state.tree()[other].is_leaf());

        state.exit_assumption();
        assert!(!state.in_assumption_mode());
        assert_eq!(state.tree()[pair.positive].dual(), None);
        assert_eq!(state.tree()[pair.negative].dual(), None);
    }

    #[test]
    fn proof_mode_loops_only_inside_a_cut() {
        let mut state = proof_state();
        let root = state.root();
        let a = add(&mut state, root, Some("A"), Color::PositiveMult);

        state.select(a);
        assert!(matches!(
            state.loop_highlighted(),
            Err(TreeError::OutsideAssumption)
        ));
        assert_eq!(state.tree()[a].parent(), Some(root));
        assert_eq!(state.title(), "A | Mode: Proof");
    }

    #[test]
    fn loop_inside_a_cut_mirrors_both_wrappers() {
        let mut state = proof_state();
        let root = state.root();
        let black = add(&mut state, root, None, Color::NegativeMult);
        let white = add(&mut state, black, None, Color::PositiveMult);
        assert!(state.mark_assumption(white, Point::default()));
        let pair = state.complete_assumption(black, Point::default()).unwrap();

        let mut atoms = vec![];
        for label in ["A", "B"] {
            state.select(pair.positive);
            assert!(state.type_into_highlighted(label, Point::default()));
            atoms.push(*state.tree()[pair.positive].children().last().unwrap());
        }
        let duals: Vec<NodeIdx> = atoms
            .iter()
            .map(|&a| state.tree()[a].dual().unwrap())
            .collect();

        state.select(atoms[0]);
        state.add_highlight(atoms[1]);
        let outer = state.loop_highlighted().unwrap();
        let inner = state.tree()[atoms[0]].parent().unwrap();

        let tree = state.tree();
        let outer_dual = tree[outer].dual().unwrap();
        let inner_dual = tree[inner].dual().unwrap();
        assert_eq!(tree[outer_dual].dual(), Some(outer));
        assert_eq!(tree[inner_dual].dual(), Some(inner));
        assert_eq!(tree[outer].color(), Color::NegativeMult);
        assert_eq!(tree[outer_dual].color(), Color::PositiveMult);
        assert_eq!(tree[inner].color(), Color::PositiveMult);
        assert_eq!(tree[inner_dual].color(), Color::NegativeMult);
        assert_eq!(tree[pair.negative].children(), &[outer_dual]);
        assert_eq!(tree[outer_dual].children(), &[inner_dual]);
        for (&a, &d) in atoms.iter().zip(&duals) {
            assert_eq!(tree[a].parent(), Some(inner));
            assert_eq!(tree[d].parent(), Some(inner_dual));
            assert_eq!(tree[d].dual(), Some(a));
        }
    }

    #[test]
    fn release_into_own_subtree_restores_origin() {
        let mut state = ProofState::default();
        let root = state.root();
        let white = add(&mut state, root, None, Color::PositiveMult);
        let inner = add(&mut state, white, None, Color::NegativeMult);

        state.grab(white);
        state.release_into(inner);
        assert_eq!(state.tree()[white].parent(), Some(root));
        assert_eq!(state.tree()[inner].parent(), Some(white));
        assert_eq!(state.grabbed(), None);
    }

    #[test]
    fn title_shows_formula_and_mode() {
        let mut state = ProofState::default();
        let root = state.root();
        add(&mut state, root, Some("A"), Color::PositiveMult);
        assert_eq!(state.title(), "A | Mode: Create");
    }
}

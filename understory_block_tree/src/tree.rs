// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The block registry: arena storage, the block factory, and read queries.

use alloc::vec::Vec;
use core::cmp::Ordering;
use kurbo::Point;

use crate::error::{InvalidOperation, InvariantViolation};
use crate::kind::BlockKind;
use crate::payload::Payload;
use crate::types::{BlockFlags, BlockId, Placement, Relation, Slots};

/// Bounds applied to every traversal of the tree.
///
/// Walks are bounded so a malformed tree produces a partial result and a
/// diagnostic instead of a hang.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkLimits {
    /// Maximum number of steps a single walk may take.
    ///
    /// `None` uses the number of live blocks plus one, which no walk over a
    /// well-formed tree can exceed.
    pub max_steps: Option<usize>,
}

/// Registry of every block on a canvas.
///
/// A canvas holds any number of disjoint trees; each tree hangs off a block
/// whose relation is [`Relation::Root`]. Blocks are addressed by [`BlockId`]
/// and link to each other by id, so parents and children never own one
/// another.
///
/// Structure changes go through the mutation methods
/// ([`attach`](Self::attach), [`detach`](Self::detach),
/// [`delete_scope`](Self::delete_scope), …). Each one either applies in full
/// or returns an [`InvalidOperation`] without touching the tree. Depths are
/// not updated by mutations; call [`compute_depths`](Self::compute_depths)
/// (or [`compute_all_depths`](Self::compute_all_depths)) once a batch of
/// edits is done.
///
/// ## Example
///
/// ```rust
/// use understory_block_tree::{BlockKind, BlockTree, Relation};
///
/// let mut tree = BlockTree::new();
/// let cond = tree.insert(BlockKind::If);
/// let line = tree.insert(BlockKind::Code);
///
/// tree.attach(cond, line, Relation::Nested).unwrap();
/// let order = tree.compute_depths(cond);
///
/// // `if`, the new line, the default `pass`, and the if's body anchor.
/// let depths: Vec<u32> = order.iter().map(|e| e.depth).collect();
/// assert_eq!(depths, [0, 1, 1, 0]);
/// ```
pub struct BlockTree {
    /// slots
    nodes: Vec<Option<Block>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    live: usize,
    pub(crate) limits: WalkLimits,
}

impl core::fmt::Debug for BlockTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockTree")
            .field("blocks_total", &self.nodes.len())
            .field("blocks_alive", &self.live)
            .field("free_list", &self.free_list.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Default for BlockTree {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Block {
    generation: u32,
    pub(crate) kind: BlockKind,
    pub(crate) relation: Relation,
    pub(crate) parent: Option<BlockId>,
    pub(crate) children: Slots,
    /// Body anchor, for containers.
    pub(crate) anchor: Option<BlockId>,
    /// The container an anchor belongs to.
    pub(crate) owner: Option<BlockId>,
    pub(crate) default_body: Option<BlockId>,
    pub(crate) depth: u32,
    pub(crate) payload: Payload,
    pub(crate) flags: BlockFlags,
    /// Canvas position; meaningful for roots only.
    pub(crate) position: Option<Point>,
}

impl Block {
    fn new(generation: u32, kind: BlockKind, payload: Payload) -> Self {
        Self {
            generation,
            kind,
            relation: Relation::Root,
            parent: None,
            children: Slots::default(),
            anchor: None,
            owner: None,
            default_body: None,
            depth: 0,
            payload,
            flags: BlockFlags::empty(),
            position: None,
        }
    }
}

impl BlockTree {
    /// Create an empty tree with default [`WalkLimits`].
    pub fn new() -> Self {
        Self::with_limits(WalkLimits::default())
    }

    /// Create an empty tree with custom traversal limits.
    pub fn with_limits(limits: WalkLimits) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            live: 0,
            limits,
        }
    }

    /// Create a new root block of `kind` with its default payload.
    ///
    /// Container kinds come wired with a body anchor in their `Below` slot and
    /// a default body in their `Nested` slot; see
    /// [`BlockKind::default_body`]. A class's default body is a
    /// `def __init__(self)` block, which is itself wired the same way.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`BlockKind::Holder`]; body anchors only exist as
    /// part of their container. Use [`insert_with`](Self::insert_with) to get
    /// an error instead.
    pub fn insert(&mut self, kind: BlockKind) -> BlockId {
        assert_ne!(
            kind,
            BlockKind::Holder,
            "body anchors are created with their container"
        );
        self.create(kind, Payload::default_for(kind))
    }

    /// Create a new root block of `kind` with an explicit payload.
    ///
    /// # Errors
    ///
    /// - [`InvalidOperation::NotInsertable`] for [`BlockKind::Holder`].
    /// - [`InvalidOperation::PayloadMismatch`] if `payload` does not fit `kind`.
    pub fn insert_with(
        &mut self,
        kind: BlockKind,
        payload: Payload,
    ) -> Result<BlockId, InvalidOperation> {
        if kind == BlockKind::Holder {
            return Err(InvalidOperation::NotInsertable(kind));
        }
        if !payload.fits(kind) {
            return Err(InvalidOperation::PayloadMismatch { id: None, kind });
        }
        Ok(self.create(kind, payload))
    }

    /// Create a new root block of `kind` placed at `position` on the canvas.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is [`BlockKind::Holder`], like [`insert`](Self::insert).
    pub fn insert_at(&mut self, kind: BlockKind, position: Point) -> BlockId {
        let id = self.insert(kind);
        self.node_mut(id).position = Some(position);
        id
    }

    fn create(&mut self, kind: BlockKind, payload: Payload) -> BlockId {
        let id = self.alloc(kind, payload);
        if let Some(body_kind) = kind.default_body() {
            let anchor = self.alloc(BlockKind::Holder, Payload::None);
            self.node_mut(anchor).owner = Some(id);
            self.link(id, anchor, Relation::Below);
            self.node_mut(id).anchor = Some(anchor);

            let body_payload = if kind == BlockKind::Class {
                Payload::class_init()
            } else {
                Payload::default_for(body_kind)
            };
            let body = self.create(body_kind, body_payload);
            self.link(id, body, Relation::Nested);
            self.node_mut(id).default_body = Some(body);
        }
        id
    }

    fn alloc(&mut self, kind: BlockKind, payload: Payload) -> BlockId {
        self.live += 1;
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Block::new(generation, kind, payload));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "BlockId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Block::new(generation, kind, payload)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "BlockId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        BlockId::new(idx, generation)
    }

    /// Release a block's slot. Links must already be cleared by the caller.
    pub(crate) fn free(&mut self, id: BlockId) {
        if self.is_alive(id) {
            self.nodes[id.idx()] = None;
            self.free_list.push(id.idx());
            self.live -= 1;
        }
    }

    /// Returns true if `id` refers to a live block.
    pub fn is_alive(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live blocks, anchors included.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if the tree holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate the ids of all live blocks in slot order.
    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "BlockId uses 32-bit indices by design."
            )]
            n.as_ref().map(|n| BlockId::new(i as u32, n.generation))
        })
    }

    pub(crate) fn get(&self, id: BlockId) -> Option<&Block> {
        self.nodes
            .get(id.idx())
            .and_then(|slot| slot.as_ref())
            .filter(|n| n.generation == id.1)
    }

    fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|slot| slot.as_mut())
            .filter(|n| n.generation == id.1)
    }

    /// Access a block; panics if `id` is stale.
    pub(crate) fn node(&self, id: BlockId) -> &Block {
        self.get(id).expect("dangling BlockId")
    }

    /// Access a block mutably; panics if `id` is stale.
    pub(crate) fn node_mut(&mut self, id: BlockId) -> &mut Block {
        self.get_mut(id).expect("dangling BlockId")
    }

    pub(crate) fn ensure_alive(&self, id: BlockId) -> Result<&Block, InvalidOperation> {
        self.get(id).ok_or(InvalidOperation::StaleBlock(id))
    }

    // --- queries ---

    /// Returns the kind of a live block.
    pub fn kind(&self, id: BlockId) -> Option<BlockKind> {
        self.get(id).map(|n| n.kind)
    }

    /// Returns how a live block hangs off its parent.
    pub fn relation(&self, id: BlockId) -> Option<Relation> {
        self.get(id).map(|n| n.relation)
    }

    /// Returns the parent of a block, or `None` for roots and stale ids.
    pub fn parent_of(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Returns the parent and slot a block occupies, or `None` for roots.
    pub fn placement(&self, id: BlockId) -> Option<Placement> {
        let n = self.get(id)?;
        n.parent.map(|parent| Placement {
            parent,
            relation: n.relation,
        })
    }

    /// Returns both child slots of a block; empty for stale ids.
    pub fn children_of(&self, id: BlockId) -> Slots {
        self.get(id).map(|n| n.children).unwrap_or_default()
    }

    /// Returns the occupant of one child slot.
    pub fn slot(&self, id: BlockId, relation: Relation) -> Option<BlockId> {
        self.get(id).and_then(|n| n.children.get(relation))
    }

    /// Returns the body anchor of a container.
    pub fn body_anchor(&self, id: BlockId) -> Option<BlockId> {
        self.get(id).and_then(|n| n.anchor)
    }

    /// Returns the container a body anchor belongs to.
    pub fn owner_of(&self, anchor: BlockId) -> Option<BlockId> {
        self.get(anchor).and_then(|n| n.owner)
    }

    /// Returns the block created as a container's default body, while it lives.
    ///
    /// The default body is an ordinary statement once created; it may since
    /// have been moved elsewhere or deleted.
    pub fn default_body(&self, id: BlockId) -> Option<BlockId> {
        self.get(id)
            .and_then(|n| n.default_body)
            .filter(|&body| self.is_alive(body))
    }

    /// Returns the indentation depth stored by the last depth walk.
    pub fn depth(&self, id: BlockId) -> Option<u32> {
        self.get(id).map(|n| n.depth)
    }

    /// Returns the interaction flags of a block.
    pub fn flags(&self, id: BlockId) -> Option<BlockFlags> {
        self.get(id).map(|n| n.flags)
    }

    /// Replace the interaction flags of a block.
    pub fn set_flags(&mut self, id: BlockId, flags: BlockFlags) {
        if let Some(n) = self.get_mut(id) {
            n.flags = flags;
        }
    }

    /// Clear `flags` on every live block.
    pub fn clear_flags(&mut self, flags: BlockFlags) {
        for n in self.nodes.iter_mut().flatten() {
            n.flags.remove(flags);
        }
    }

    /// Returns the option state of a block.
    pub fn payload(&self, id: BlockId) -> Option<&Payload> {
        self.get(id).map(|n| &n.payload)
    }

    /// Replace the option state of a block.
    ///
    /// The payload variant must belong to the block's kind.
    pub fn set_payload(&mut self, id: BlockId, payload: Payload) -> Result<(), InvalidOperation> {
        let kind = self.ensure_alive(id)?.kind;
        if !payload.fits(kind) {
            return Err(InvalidOperation::PayloadMismatch { id: Some(id), kind });
        }
        self.node_mut(id).payload = payload;
        Ok(())
    }

    /// Returns the canvas position of a root block.
    pub fn position(&self, id: BlockId) -> Option<Point> {
        self.get(id).and_then(|n| n.position)
    }

    /// Set the canvas position of a root block; ignored for parented blocks.
    pub fn set_position(&mut self, id: BlockId, position: Point) {
        if let Some(n) = self.get_mut(id)
            && n.parent.is_none()
        {
            n.position = Some(position);
        }
    }

    /// Maximum number of steps any single walk may take.
    pub(crate) fn step_cap(&self) -> usize {
        self.limits.max_steps.unwrap_or(self.live + 1)
    }

    /// Step bound for walks that mutations depend on.
    ///
    /// Never below the live block count plus one, so a caller-set
    /// [`WalkLimits`] cannot stop an edit halfway through a well-formed tree.
    pub(crate) fn structural_cap(&self) -> usize {
        self.step_cap().max(self.live + 1)
    }

    /// Returns the root of the tree containing `id`.
    ///
    /// If the parent chain does not end within the step limit, a warning is
    /// logged and the last block reached is returned.
    pub fn root_of(&self, id: BlockId) -> Option<BlockId> {
        let mut current = id;
        let mut node = self.get(id)?;
        let cap = self.step_cap();
        let mut steps = 0;
        while let Some(parent) = node.parent {
            steps += 1;
            if steps > cap {
                tracing::warn!(?id, cap, "root lookup exceeded the step limit");
                break;
            }
            let Some(next) = self.get(parent) else {
                tracing::warn!(?current, ?parent, "root lookup hit a dangling parent");
                break;
            };
            current = parent;
            node = next;
        }
        Some(current)
    }

    /// Returns true if `id` lies in the subtree of `ancestor` (inclusive).
    pub fn is_within(&self, ancestor: BlockId, id: BlockId) -> bool {
        if !self.is_alive(ancestor) {
            return false;
        }
        let cap = self.step_cap();
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            steps += 1;
            if steps > cap {
                tracing::warn!(?ancestor, ?id, "ancestor walk exceeded the step limit");
                return false;
            }
            current = self.parent_of(c);
        }
        false
    }

    /// Returns every root block in slot order.
    pub fn roots(&self) -> Vec<BlockId> {
        self.ids()
            .filter(|&id| self.node(id).parent.is_none())
            .collect()
    }

    /// Returns every root block ordered top-to-bottom, then left-to-right, by
    /// canvas position. Roots without a position come last, in slot order.
    pub fn roots_by_position(&self) -> Vec<BlockId> {
        let mut roots = self.roots();
        roots.sort_by(|&a, &b| match (self.position(a), self.position(b)) {
            (Some(pa), Some(pb)) => pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        roots
    }

    /// Returns every block of the subtree rooted at `id`, in render order.
    pub fn subtree(&self, id: BlockId) -> Vec<BlockId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        self.walk(id, 0).entries.into_iter().map(|e| e.id).collect()
    }

    /// Returns the blocks of a container's body, in render order.
    ///
    /// Empty for leaves and for containers whose body is empty.
    pub fn scope(&self, id: BlockId) -> Vec<BlockId> {
        match self.slot(id, Relation::Nested) {
            Some(first) => self.subtree(first),
            None => Vec::new(),
        }
    }

    // --- links ---

    /// Put `child` into `parent`'s `relation` slot. The slot must be empty and
    /// `child` must be unparented.
    pub(crate) fn link(&mut self, parent: BlockId, child: BlockId, relation: Relation) {
        debug_assert!(
            self.slot(parent, relation).is_none(),
            "slot {relation:?} of {parent:?} is occupied"
        );
        debug_assert!(self.parent_of(child).is_none(), "{child:?} is still linked");
        if let Some(slot) = self.node_mut(parent).children.get_mut(relation) {
            *slot = Some(child);
        }
        let c = self.node_mut(child);
        c.parent = Some(parent);
        c.relation = relation;
        c.position = None;
    }

    /// Remove `child` from its parent's slot, making it a root.
    pub(crate) fn unlink(&mut self, child: BlockId) -> Option<Placement> {
        let placement = self.placement(child)?;
        if let Some(slot) = self
            .node_mut(placement.parent)
            .children
            .get_mut(placement.relation)
        {
            *slot = None;
        }
        let c = self.node_mut(child);
        c.parent = None;
        c.relation = Relation::Root;
        Some(placement)
    }

    /// Detach the occupant of `parent`'s `relation` slot, if any.
    pub(crate) fn take_slot(&mut self, parent: BlockId, relation: Relation) -> Option<BlockId> {
        let child = self.slot(parent, relation)?;
        self.unlink(child);
        Some(child)
    }

    // --- validation ---

    /// Verify the link structure of every live block: relations, back-links,
    /// anchors, and that every parent chain ends at a root.
    pub fn check_structure(&self) -> Result<(), InvariantViolation> {
        let cap = self.live + 1;
        for id in self.ids() {
            let n = self.node(id);

            match n.parent {
                None if n.relation != Relation::Root => {
                    return Err(InvariantViolation::RelationMismatch(id));
                }
                Some(_) if n.relation == Relation::Root => {
                    return Err(InvariantViolation::RelationMismatch(id));
                }
                Some(parent) => {
                    let Some(p) = self.get(parent) else {
                        return Err(InvariantViolation::DanglingLink(id));
                    };
                    if p.children.get(n.relation) != Some(id) {
                        return Err(InvariantViolation::BrokenBackLink(id));
                    }
                }
                None => {}
            }

            for (relation, child) in n.children.iter() {
                let Some(c) = self.get(child) else {
                    return Err(InvariantViolation::DanglingLink(id));
                };
                if c.parent != Some(id) || c.relation != relation {
                    return Err(InvariantViolation::BrokenBackLink(child));
                }
            }

            if n.children.nested.is_some() && !n.kind.is_container() {
                return Err(InvariantViolation::NestedInLeaf(id));
            }

            if n.kind == BlockKind::Holder {
                let owned = n.owner.is_some_and(|o| {
                    self.get(o)
                        .is_some_and(|c| c.anchor == Some(id) && c.children.below == Some(id))
                });
                if !owned {
                    return Err(InvariantViolation::OrphanAnchor(id));
                }
            }

            if n.kind.is_container() {
                let anchored = n.anchor.is_some_and(|a| {
                    n.children.below == Some(a) && self.get(a).is_some_and(|h| h.owner == Some(id))
                });
                if !anchored {
                    return Err(InvariantViolation::MissingAnchor(id));
                }
            }

            let mut steps = 0;
            let mut current = n.parent;
            while let Some(c) = current {
                steps += 1;
                if steps > cap || c == id {
                    return Err(InvariantViolation::Cycle(id));
                }
                current = self.parent_of(c);
            }
        }
        Ok(())
    }

    /// Verify the link structure and that every stored depth agrees with the
    /// parent chain. Depths are only current after a depth walk.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.check_structure()?;
        for id in self.ids() {
            let n = self.node(id);
            let expected = match n.parent {
                None => 0,
                Some(p) => self.node(p).depth + n.relation.depth_step(),
            };
            if n.depth != expected {
                return Err(InvariantViolation::DepthMismatch {
                    id,
                    stored: n.depth,
                    expected,
                });
            }
        }
        Ok(())
    }
}

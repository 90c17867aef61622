// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural edits: attach, detach, and the delete family.
//!
//! Every operation validates its inputs before the first link changes, so a
//! rejected call leaves the tree untouched. None of them recompute depths.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::error::InvalidOperation;
use crate::tree::BlockTree;
use crate::types::{BlockId, Placement, Relation};

impl BlockTree {
    /// The block whose `Below` slot continues the chain after `id`: the body
    /// anchor for containers, the block itself otherwise.
    fn tail_owner(&self, id: BlockId) -> BlockId {
        self.node(id).anchor.unwrap_or(id)
    }

    /// The last block of the chain starting at `id`, following `Below` links
    /// and stepping over container bodies through their anchors.
    fn chain_end(&self, id: BlockId) -> BlockId {
        let cap = self.structural_cap();
        let mut current = self.tail_owner(id);
        for _ in 0..cap {
            match self.node(current).children.below {
                Some(next) => current = self.tail_owner(next),
                None => return current,
            }
        }
        tracing::warn!(?id, cap, "chain walk exceeded the step limit");
        current
    }

    fn ensure_movable(&self, id: BlockId) -> Result<(), InvalidOperation> {
        let node = self.ensure_alive(id)?;
        if node.owner.is_some() {
            return Err(InvalidOperation::AnchorNotMovable(id));
        }
        Ok(())
    }

    /// Returns true if `target` moves together with `node` when `node` is
    /// attached elsewhere.
    ///
    /// A parented block moves with its body (and its anchor) but leaves the
    /// chain that follows it behind. A root moves with its whole tree.
    fn moves_with(&self, node: BlockId, target: BlockId) -> bool {
        let carries_chain = self.node(node).parent.is_none();
        let tail = self.tail_owner(node);
        let cap = self.structural_cap();
        let mut current = target;
        let mut steps = 0;
        loop {
            if current == node {
                return true;
            }
            let Some(placement) = self.placement(current) else {
                return false;
            };
            if !carries_chain && placement.parent == tail && placement.relation == Relation::Below
            {
                // `current` starts the chain that stays behind.
                return false;
            }
            current = placement.parent;
            steps += 1;
            if steps > cap {
                tracing::warn!(?node, ?target, "ancestor walk exceeded the step limit");
                return true;
            }
        }
    }

    /// Put `first` (and the chain behind it) where a removed block used to
    /// be: into `placement` if it had a parent, or as a new root at `position`.
    fn reseat(
        &mut self,
        first: BlockId,
        placement: Option<Placement>,
        position: Option<kurbo::Point>,
    ) {
        match placement {
            Some(Placement { parent, relation }) => self.link(parent, first, relation),
            None => {
                if let Some(position) = position {
                    self.node_mut(first).position = Some(position);
                }
            }
        }
    }

    /// Attach `node` into `target`'s `relation` slot.
    ///
    /// - If `node` is parented, it is first lifted out with its body; the
    ///   chain that followed it is stitched into its old slot so that chain
    ///   stays connected. If `node` is a root, its whole tree comes along.
    /// - If the slot is occupied, the occupant is displaced: it becomes the
    ///   `Below` child at the end of the moved chain (behind the anchor when
    ///   `node` is a container). This is how a block is inserted into the
    ///   middle of a chain.
    /// - `Below` a container means after its body: the block is attached to
    ///   the container's anchor.
    ///
    /// Depths are not recomputed.
    ///
    /// # Errors
    ///
    /// - [`InvalidOperation::StaleBlock`] if either id is stale.
    /// - [`InvalidOperation::InvalidRelation`] for [`Relation::Root`].
    /// - [`InvalidOperation::AnchorNotMovable`] if `node` is a body anchor.
    /// - [`InvalidOperation::NotAContainer`] for a `Nested` attach to a leaf.
    /// - [`InvalidOperation::WouldCycle`] if `target` would move with `node`.
    pub fn attach(
        &mut self,
        target: BlockId,
        node: BlockId,
        relation: Relation,
    ) -> Result<(), InvalidOperation> {
        let target_kind = self.ensure_alive(target)?.kind;
        self.ensure_movable(node)?;
        let target = match relation {
            Relation::Root => return Err(InvalidOperation::InvalidRelation(relation)),
            Relation::Nested if !target_kind.is_container() => {
                return Err(InvalidOperation::NotAContainer {
                    id: target,
                    kind: target_kind,
                });
            }
            Relation::Below => self.tail_owner(target),
            Relation::Nested => target,
        };
        if self.moves_with(node, target) {
            tracing::warn!(?node, ?target, "refused attach into the moved piece");
            return Err(InvalidOperation::WouldCycle { node, target });
        }

        if self.node(node).parent.is_some() {
            self.lift(node);
        }
        let displaced = self.take_slot(target, relation);
        self.link(target, node, relation);
        if let Some(displaced) = displaced {
            let end = self.chain_end(node);
            self.link(end, displaced, Relation::Below);
        }
        tracing::debug!(?target, ?node, ?relation, ?displaced, "attached");
        Ok(())
    }

    /// Take `node` and its body out of their chain and stitch the following
    /// chain into `node`'s former slot.
    fn lift(&mut self, node: BlockId) -> Option<Placement> {
        let tail = self.tail_owner(node);
        let follow = self.take_slot(tail, Relation::Below);
        let position = self.node(node).position;
        let placement = self.unlink(node);
        if let Some(follow) = follow {
            self.reseat(follow, placement, position);
        }
        placement
    }

    /// Remove `node` from its parent's slot, making it a root.
    ///
    /// The subtree under `node`, including the chain that follows it, stays
    /// attached to it. Returns where `node` used to sit, or `None` if it was
    /// already a root.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StaleBlock`] or [`InvalidOperation::AnchorNotMovable`].
    pub fn detach(&mut self, node: BlockId) -> Result<Option<Placement>, InvalidOperation> {
        self.ensure_movable(node)?;
        let placement = self.unlink(node);
        if placement.is_some() {
            tracing::debug!(?node, ?placement, "detached");
        }
        Ok(placement)
    }

    /// Remove `node` and its body from their chain, making `node` a root.
    ///
    /// Unlike [`detach`](Self::detach), the chain that followed `node` is
    /// stitched into `node`'s former slot instead of coming along.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StaleBlock`] or [`InvalidOperation::AnchorNotMovable`].
    pub fn extract(&mut self, node: BlockId) -> Result<Option<Placement>, InvalidOperation> {
        self.ensure_movable(node)?;
        let placement = self.lift(node);
        tracing::debug!(?node, ?placement, "extracted");
        Ok(placement)
    }

    /// Free every block of the (already unlinked) subtree at `root`.
    fn destroy(&mut self, root: BlockId) -> usize {
        let cap = self.structural_cap();
        let mut doomed: Vec<BlockId> = Vec::new();
        let mut stack: SmallVec<[BlockId; 16]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            if doomed.len() >= cap {
                tracing::warn!(?root, cap, "delete walk exceeded the step limit");
                break;
            }
            let Some(node) = self.get(id) else {
                continue;
            };
            stack.extend(node.children.iter().map(|(_, c)| c));
            doomed.push(id);
        }
        for &id in &doomed {
            self.free(id);
        }
        doomed.len()
    }

    /// Remove `node` and everything under it, including the chain that
    /// follows it. Returns the number of blocks removed.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StaleBlock`] or [`InvalidOperation::AnchorNotMovable`].
    pub fn delete_subtree(&mut self, node: BlockId) -> Result<usize, InvalidOperation> {
        self.ensure_movable(node)?;
        self.unlink(node);
        let removed = self.destroy(node);
        tracing::debug!(?node, removed, "deleted subtree");
        Ok(removed)
    }

    /// Remove only `node`, promoting its children into its former slot.
    ///
    /// For a leaf, the chain that followed it takes its place with its
    /// relation, so a `Nested` leaf is replaced by its successor as the first
    /// statement of the body. For a container, the body moves up one level
    /// into the container's slot and the chain that followed the container is
    /// appended after it; the anchor is removed with its container. If `node`
    /// was a root, the first promoted block becomes a root at its position.
    ///
    /// Returns the number of blocks removed.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StaleBlock`] or [`InvalidOperation::AnchorNotMovable`].
    pub fn delete_single(&mut self, node: BlockId) -> Result<usize, InvalidOperation> {
        self.ensure_movable(node)?;
        let position = self.node(node).position;
        let placement = self.unlink(node);

        let body = self.take_slot(node, Relation::Nested);
        let tail = self.tail_owner(node);
        let follow = self.take_slot(tail, Relation::Below);
        let mut removed = 1;
        if tail != node {
            self.take_slot(node, Relation::Below);
            self.free(tail);
            removed += 1;
        }
        self.free(node);

        let mut promoted = body.into_iter().chain(follow);
        if let Some(first) = promoted.next() {
            self.reseat(first, placement, position);
            for next in promoted {
                let end = self.chain_end(first);
                self.link(end, next, Relation::Below);
            }
        }
        tracing::debug!(?node, ?body, ?follow, "deleted single block");
        Ok(removed)
    }

    /// The editor's delete action for `node`.
    ///
    /// - Leaves behave like [`delete_single`](Self::delete_single): the
    ///   following chain closes the gap with the deleted block's relation.
    /// - A container whose anchor has nothing below it is removed with its
    ///   body and anchor.
    /// - A container whose anchor is followed by a chain (an `elif`, `else`,
    ///   `except`, or any other statement) is removed with its body, and that
    ///   chain is reattached to whatever preceded the container. A root
    ///   container leaves the chain behind as a new root at its position.
    ///
    /// Returns the number of blocks removed.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::StaleBlock`] or [`InvalidOperation::AnchorNotMovable`].
    pub fn delete_scope(&mut self, node: BlockId) -> Result<usize, InvalidOperation> {
        self.ensure_movable(node)?;
        let Some(anchor) = self.node(node).anchor else {
            return self.delete_single(node);
        };

        let Some(follow) = self.take_slot(anchor, Relation::Below) else {
            return self.delete_subtree(node);
        };
        let position = self.node(node).position;
        let placement = self.unlink(node);
        let removed = self.destroy(node);
        self.reseat(follow, placement, position);
        tracing::debug!(?node, removed, ?follow, "deleted scope, kept continuation");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::BlockKind;

    fn chain(tree: &mut BlockTree, kinds: &[BlockKind]) -> Vec<BlockId> {
        let ids: Vec<BlockId> = kinds.iter().map(|&k| tree.insert(k)).collect();
        for pair in ids.windows(2) {
            let end = tree.chain_end(pair[0]);
            tree.attach(end, pair[1], Relation::Below).unwrap();
        }
        ids
    }

    #[test]
    fn below_attach_displaces_into_chain() {
        let mut tree = BlockTree::new();
        let ids = chain(&mut tree, &[BlockKind::Code, BlockKind::Code]);
        let (a, b) = (ids[0], ids[1]);
        let c = tree.insert(BlockKind::Code);

        tree.attach(a, c, Relation::Below).unwrap();
        assert_eq!(tree.slot(a, Relation::Below), Some(c));
        assert_eq!(tree.slot(c, Relation::Below), Some(b));
        assert_eq!(tree.parent_of(b), Some(c));
        tree.check_structure().unwrap();
    }

    #[test]
    fn displaced_block_goes_behind_container_anchor() {
        let mut tree = BlockTree::new();
        let a = tree.insert(BlockKind::Code);
        let b = tree.insert(BlockKind::Code);
        tree.attach(a, b, Relation::Below).unwrap();
        let w = tree.insert(BlockKind::While);

        tree.attach(a, w, Relation::Below).unwrap();
        let anchor = tree.body_anchor(w).unwrap();
        assert_eq!(tree.slot(a, Relation::Below), Some(w));
        assert_eq!(tree.slot(anchor, Relation::Below), Some(b));
        tree.check_structure().unwrap();
    }

    #[test]
    fn moving_a_parented_block_leaves_its_chain() {
        let mut tree = BlockTree::new();
        let ids = chain(
            &mut tree,
            &[BlockKind::Code, BlockKind::Break, BlockKind::Continue],
        );
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        // Move `b` after `c`.
        tree.attach(c, b, Relation::Below).unwrap();
        assert_eq!(tree.slot(a, Relation::Below), Some(c));
        assert_eq!(tree.slot(c, Relation::Below), Some(b));
        assert_eq!(tree.slot(b, Relation::Below), None);
        tree.check_structure().unwrap();
    }

    #[test]
    fn root_attach_carries_its_chain_and_appends_displaced() {
        let mut tree = BlockTree::new();
        let host = chain(&mut tree, &[BlockKind::Code, BlockKind::Return]);
        let piece = chain(&mut tree, &[BlockKind::Break, BlockKind::Continue]);

        tree.attach(host[0], piece[0], Relation::Below).unwrap();
        let order: Vec<BlockId> = tree.subtree(host[0]);
        assert_eq!(order, [host[0], piece[0], piece[1], host[1]]);
        tree.check_structure().unwrap();
    }

    #[test]
    fn attach_to_same_slot_is_a_no_op() {
        let mut tree = BlockTree::new();
        let ids = chain(
            &mut tree,
            &[BlockKind::Code, BlockKind::Break, BlockKind::Pass],
        );
        tree.attach(ids[0], ids[1], Relation::Below).unwrap();
        assert_eq!(tree.subtree(ids[0]), ids);
    }

    #[test]
    fn nested_attach_into_leaf_is_rejected() {
        let mut tree = BlockTree::new();
        let a = tree.insert(BlockKind::Code);
        let b = tree.insert(BlockKind::Code);
        assert!(matches!(
            tree.attach(a, b, Relation::Nested),
            Err(InvalidOperation::NotAContainer { .. })
        ));
        assert!(matches!(
            tree.attach(a, b, Relation::Root),
            Err(InvalidOperation::InvalidRelation(Relation::Root))
        ));
    }

    #[test]
    fn attach_under_own_body_is_rejected() {
        let mut tree = BlockTree::new();
        let outer = tree.insert(BlockKind::For);
        let body = tree.default_body(outer).unwrap();
        let anchor = tree.body_anchor(outer).unwrap();
        assert!(matches!(
            tree.attach(body, outer, Relation::Below),
            Err(InvalidOperation::WouldCycle { .. })
        ));
        assert!(matches!(
            tree.attach(anchor, outer, Relation::Below),
            Err(InvalidOperation::WouldCycle { .. })
        ));
        assert!(matches!(
            tree.attach(outer, outer, Relation::Nested),
            Err(InvalidOperation::WouldCycle { .. })
        ));
        tree.check_structure().unwrap();
    }

    #[test]
    fn anchors_are_not_movable() {
        let mut tree = BlockTree::new();
        let t = tree.insert(BlockKind::Try);
        let anchor = tree.body_anchor(t).unwrap();
        let other = tree.insert(BlockKind::Code);
        assert_eq!(
            tree.attach(other, anchor, Relation::Below),
            Err(InvalidOperation::AnchorNotMovable(anchor))
        );
        assert_eq!(
            tree.detach(anchor),
            Err(InvalidOperation::AnchorNotMovable(anchor))
        );
        assert_eq!(
            tree.delete_single(anchor),
            Err(InvalidOperation::AnchorNotMovable(anchor))
        );
    }

    #[test]
    fn extract_stitches_the_gap() {
        let mut tree = BlockTree::new();
        let ids = chain(
            &mut tree,
            &[BlockKind::Code, BlockKind::If, BlockKind::Pass],
        );
        let placement = tree.extract(ids[1]).unwrap();
        assert_eq!(
            placement,
            Some(Placement {
                parent: ids[0],
                relation: Relation::Below
            })
        );
        assert_eq!(tree.slot(ids[0], Relation::Below), Some(ids[2]));
        assert_eq!(tree.relation(ids[1]), Some(Relation::Root));
        // The if keeps its own body and anchor.
        assert_eq!(tree.subtree(ids[1]).len(), 3);
        tree.check_structure().unwrap();
    }

    #[test]
    fn delete_single_leaf_promotes_successor() {
        let mut tree = BlockTree::new();
        let cond = tree.insert(BlockKind::If);
        let pass = tree.default_body(cond).unwrap();
        let first = tree.insert(BlockKind::Code);
        tree.attach(cond, first, Relation::Nested).unwrap();

        assert_eq!(tree.delete_single(first), Ok(1));
        assert_eq!(tree.slot(cond, Relation::Nested), Some(pass));
        assert_eq!(tree.relation(pass), Some(Relation::Nested));
        tree.check_structure().unwrap();
    }

    #[test]
    fn delete_single_container_unwraps_body() {
        let mut tree = BlockTree::new();
        let ids = chain(
            &mut tree,
            &[BlockKind::Code, BlockKind::While, BlockKind::Break],
        );
        let body = tree.default_body(ids[1]).unwrap();

        assert_eq!(tree.delete_single(ids[1]), Ok(2));
        assert_eq!(tree.subtree(ids[0]), [ids[0], body, ids[2]]);
        tree.compute_depths(ids[0]);
        assert_eq!(tree.depth(body), Some(0));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn delete_single_root_promotes_new_root() {
        let mut tree = BlockTree::new();
        let a = tree.insert_at(BlockKind::Code, kurbo::Point::new(3.0, 4.0));
        let b = tree.insert(BlockKind::Code);
        tree.attach(a, b, Relation::Below).unwrap();
        tree.delete_single(a).unwrap();
        assert_eq!(tree.roots(), [b]);
        assert_eq!(tree.position(b), Some(kurbo::Point::new(3.0, 4.0)));
    }

    #[test]
    fn delete_scope_without_continuation_removes_everything() {
        let mut tree = BlockTree::new();
        let head = tree.insert(BlockKind::Code);
        let f = tree.insert(BlockKind::For);
        tree.attach(head, f, Relation::Below).unwrap();

        assert_eq!(tree.delete_scope(f), Ok(3));
        assert_eq!(tree.len(), 1);
        assert!(tree.children_of(head).is_empty());
    }

    #[test]
    fn delete_scope_keeps_else_chain() {
        let mut tree = BlockTree::new();
        let head = tree.insert(BlockKind::Code);
        let cond = tree.insert(BlockKind::If);
        let other = tree.insert(BlockKind::Else);
        tree.attach(head, cond, Relation::Below).unwrap();
        tree.attach(cond, other, Relation::Below).unwrap();

        assert_eq!(tree.delete_scope(cond), Ok(3));
        assert_eq!(tree.slot(head, Relation::Below), Some(other));
        assert!(tree.is_alive(tree.default_body(other).unwrap()));
        tree.check_structure().unwrap();
    }

    #[test]
    fn delete_scope_of_root_container_keeps_chain_as_root() {
        let mut tree = BlockTree::new();
        let t = tree.insert_at(BlockKind::Try, kurbo::Point::new(0.0, 40.0));
        let ex = tree.insert(BlockKind::Except);
        tree.attach(t, ex, Relation::Below).unwrap();

        tree.delete_scope(t).unwrap();
        assert_eq!(tree.roots(), [ex]);
        assert_eq!(tree.position(ex), Some(kurbo::Point::new(0.0, 40.0)));
        tree.check_structure().unwrap();
    }

    #[test]
    fn small_walk_limits_do_not_cut_edits_short() {
        let mut tree = BlockTree::with_limits(crate::WalkLimits { max_steps: Some(2) });
        let ids = chain(
            &mut tree,
            &[
                BlockKind::Code,
                BlockKind::Break,
                BlockKind::Continue,
                BlockKind::Pass,
            ],
        );
        let (a, last) = (ids[0], ids[3]);

        // Displacement appends behind the real end of the moved chain.
        let host = tree.insert(BlockKind::Pass);
        let tail = tree.insert(BlockKind::Return);
        tree.attach(host, tail, Relation::Below).unwrap();
        tree.attach(host, a, Relation::Below).unwrap();
        assert_eq!(tree.slot(last, Relation::Below), Some(tail));
        tree.check_structure().unwrap();

        // The whole chain goes, including the displaced `return` behind it.
        assert_eq!(tree.delete_subtree(a), Ok(5));
        assert!(!tree.is_alive(tail));
        assert_eq!(tree.roots(), [host]);
        assert!(tree.children_of(host).is_empty());
        tree.check_structure().unwrap();
    }

    #[test]
    fn delete_scope_nested_leaf_keeps_body_relation() {
        let mut tree = BlockTree::new();
        let f = tree.insert(BlockKind::Def);
        let ret = tree.default_body(f).unwrap();
        let line = tree.insert(BlockKind::Code);
        tree.attach(f, line, Relation::Nested).unwrap();

        tree.delete_scope(line).unwrap();
        assert_eq!(tree.slot(f, Relation::Nested), Some(ret));
        assert_eq!(tree.relation(ret), Some(Relation::Nested));
    }
}

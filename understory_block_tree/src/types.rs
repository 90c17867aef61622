// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the block tree: identifiers, relations, slots, and flags.

/// Identifier for a block in the tree (generational).
///
/// A `BlockId` stays valid until the block it names is deleted. Slots are
/// reused afterwards, but the generation is bumped so a stale id never aliases
/// a newer block; see [`BlockTree::is_alive`](crate::BlockTree::is_alive).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32, pub(crate) u32);

impl BlockId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Returns true if `self` was allocated after `other`.
    pub(crate) fn is_newer_than(self, other: Self) -> bool {
        (self.1 > other.1) || (self.1 == other.1 && self.0 > other.0)
    }
}

/// How a block hangs off its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Relation {
    /// Top of a tree; the block has no parent.
    #[default]
    Root,
    /// Next statement in sequence, at the parent's indentation.
    Below,
    /// First statement inside the parent's body, one level deeper.
    Nested,
}

impl Relation {
    /// Indentation contributed by this edge.
    pub const fn depth_step(self) -> u32 {
        match self {
            Self::Nested => 1,
            Self::Root | Self::Below => 0,
        }
    }
}

/// The two child slots of a block.
///
/// This is a two-entry map keyed by [`Relation`], not a list: a block has at
/// most one `Below` child and at most one `Nested` child.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Slots {
    /// The next statement after this one.
    pub below: Option<BlockId>,
    /// The first statement of this block's body.
    pub nested: Option<BlockId>,
}

impl Slots {
    /// Returns the occupant of the slot for `relation`.
    ///
    /// [`Relation::Root`] has no slot and always yields `None`.
    pub fn get(&self, relation: Relation) -> Option<BlockId> {
        match relation {
            Relation::Below => self.below,
            Relation::Nested => self.nested,
            Relation::Root => None,
        }
    }

    pub(crate) fn get_mut(&mut self, relation: Relation) -> Option<&mut Option<BlockId>> {
        match relation {
            Relation::Below => Some(&mut self.below),
            Relation::Nested => Some(&mut self.nested),
            Relation::Root => None,
        }
    }

    /// Iterate occupied slots, `Below` first.
    pub fn iter(&self) -> impl Iterator<Item = (Relation, BlockId)> + '_ {
        self.below
            .map(|id| (Relation::Below, id))
            .into_iter()
            .chain(self.nested.map(|id| (Relation::Nested, id)))
    }

    /// Returns true if neither slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.below.is_none() && self.nested.is_none()
    }
}

/// Where a block sat before it was unlinked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// The former parent.
    pub parent: BlockId,
    /// The slot it occupied at that parent.
    pub relation: Relation,
}

bitflags::bitflags! {
    /// Transient per-block interaction state.
    ///
    /// These flags never affect structure; they exist so a renderer can style
    /// blocks during a gesture without keeping a side table.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BlockFlags: u8 {
        /// The block is the active drop target of a drag.
        const COLLISION = 0b0000_0001;
        /// The block belongs to the subtree being dragged.
        const DRAGGING  = 0b0000_0010;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn root_has_no_slot() {
        let mut slots = Slots {
            below: Some(BlockId::new(1, 1)),
            nested: Some(BlockId::new(2, 1)),
        };
        assert_eq!(slots.get(Relation::Root), None);
        assert!(slots.get_mut(Relation::Root).is_none());
        assert_eq!(slots.get(Relation::Nested), Some(BlockId::new(2, 1)));
    }

    #[test]
    fn iter_yields_below_first() {
        let slots = Slots {
            below: Some(BlockId::new(1, 1)),
            nested: Some(BlockId::new(2, 1)),
        };
        let order: Vec<Relation> = slots.iter().map(|(r, _)| r).collect();
        assert_eq!(order, [Relation::Below, Relation::Nested]);
        assert!(Slots::default().is_empty());
    }

    #[test]
    fn newer_compares_generation_first() {
        let old = BlockId::new(5, 1);
        let reused = BlockId::new(0, 2);
        assert!(reused.is_newer_than(old));
        assert!(!old.is_newer_than(reused));
        assert!(BlockId::new(6, 1).is_newer_than(old));
    }
}

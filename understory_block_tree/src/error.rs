// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use crate::kind::BlockKind;
use crate::types::{BlockId, Relation};

/// A structural operation was refused before it touched the tree.
///
/// These are programmer errors: the tree is left exactly as it was.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidOperation {
    /// The id does not name a live block.
    #[error("block {0:?} is not alive")]
    StaleBlock(BlockId),
    /// Body anchors move and die only together with their container.
    #[error("block {0:?} is a body anchor and cannot be moved on its own")]
    AnchorNotMovable(BlockId),
    /// Body anchors are created with their container, never on their own.
    #[error("kind {0:?} cannot be inserted on its own")]
    NotInsertable(BlockKind),
    /// Only container kinds accept a nested child.
    #[error("block {id:?} of kind {kind:?} cannot hold a nested body")]
    NotAContainer {
        /// The refused target.
        id: BlockId,
        /// Its kind.
        kind: BlockKind,
    },
    /// The target lies inside the piece being moved.
    #[error("attaching {node:?} under {target:?} would form a cycle")]
    WouldCycle {
        /// The block being moved.
        node: BlockId,
        /// The refused target.
        target: BlockId,
    },
    /// `Root` is not a slot and cannot be attached to.
    #[error("relation {0:?} has no slot")]
    InvalidRelation(Relation),
    /// The payload variant does not belong to the block's kind.
    #[error("payload does not fit kind {kind:?} (block {id:?})")]
    PayloadMismatch {
        /// The block whose payload was being replaced, if it exists yet.
        id: Option<BlockId>,
        /// Its kind.
        kind: BlockKind,
    },
    /// A drag session method was called in the wrong state.
    #[error("drag session is {0}")]
    SessionState(&'static str),
}

/// A structural invariant that does not hold; see [`BlockTree::check_invariants`].
///
/// [`BlockTree::check_invariants`]: crate::BlockTree::check_invariants
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// Walking parents from the block did not reach a root within the block count.
    #[error("block {0:?} does not reach a root")]
    Cycle(BlockId),
    /// A link points at a block that is not alive.
    #[error("block {0:?} links to a dead block")]
    DanglingLink(BlockId),
    /// `parent.children[relation]` does not point back at the block.
    #[error("block {0:?} is not in its parent's slot")]
    BrokenBackLink(BlockId),
    /// A root-relation block has a parent, or a parented block claims `Root`.
    #[error("block {0:?} has an inconsistent relation")]
    RelationMismatch(BlockId),
    /// A container has no anchor, or its anchor is not its `Below` child.
    #[error("container {0:?} has no anchor in its below slot")]
    MissingAnchor(BlockId),
    /// A body anchor is not the anchor of a live container.
    #[error("body anchor {0:?} has no owning container")]
    OrphanAnchor(BlockId),
    /// A nested child hangs off a block that is not a container.
    #[error("block {0:?} has a nested child but is not a container")]
    NestedInLeaf(BlockId),
    /// The stored depth disagrees with the parent chain.
    #[error("block {id:?} has depth {stored}, expected {expected}")]
    DepthMismatch {
        /// Offending block.
        id: BlockId,
        /// Depth stored on the block.
        stored: u32,
        /// Depth implied by its parent chain.
        expected: u32,
    },
}

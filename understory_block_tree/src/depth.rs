// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render order and indentation depth.
//!
//! A tree is linearized into the order its lines appear in source: a block,
//! then its body (one level deeper), then the body anchor, then whatever
//! follows the block. This is a pre-order walk that descends into the `Nested`
//! slot before the `Below` slot. The anchor is what makes "after the body" an
//! explicit position in that order.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::kind::BlockKind;
use crate::tree::BlockTree;
use crate::types::BlockId;

/// One line of the render order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderEntry {
    /// The block on this line.
    pub id: BlockId,
    /// Its kind; [`BlockKind::Holder`] entries close a body and emit no text.
    pub kind: BlockKind,
    /// Number of `Nested` edges between the block and its root.
    pub depth: u32,
}

pub(crate) struct Walk {
    pub(crate) entries: Vec<RenderEntry>,
    /// False if the walk stopped at the step limit.
    pub(crate) complete: bool,
}

impl BlockTree {
    /// Linearize the subtree at `start` without writing anything.
    pub(crate) fn walk(&self, start: BlockId, base_depth: u32) -> Walk {
        let cap = self.step_cap();
        let mut entries = Vec::new();
        let mut stack: SmallVec<[(BlockId, u32); 16]> = SmallVec::new();
        stack.push((start, base_depth));

        while let Some((id, depth)) = stack.pop() {
            if entries.len() >= cap {
                tracing::warn!(
                    ?start,
                    cap,
                    "depth walk exceeded the step limit; returning partial order"
                );
                return Walk {
                    entries,
                    complete: false,
                };
            }
            let Some(node) = self.get(id) else {
                tracing::warn!(?id, "depth walk reached a dangling block");
                continue;
            };
            entries.push(RenderEntry {
                id,
                kind: node.kind,
                depth,
            });
            // Scheduled first, so it is visited after the whole nested body.
            if let Some(below) = node.children.below {
                stack.push((below, depth));
            }
            if let Some(nested) = node.children.nested {
                stack.push((nested, depth + 1));
            }
        }

        Walk {
            entries,
            complete: true,
        }
    }

    /// Recompute depths for the tree containing `root` and return its render
    /// order.
    ///
    /// `root` may be any block of the tree; the walk always starts at the
    /// tree's root so depths stay relative to it. Returns an empty order for a
    /// stale id. If the walk exceeds the step limit, the blocks reached so far
    /// are updated and returned.
    pub fn compute_depths(&mut self, root: BlockId) -> Vec<RenderEntry> {
        let Some(root) = self.root_of(root) else {
            return Vec::new();
        };
        let walk = self.walk(root, 0);
        for entry in &walk.entries {
            self.node_mut(entry.id).depth = entry.depth;
        }
        if walk.complete {
            tracing::trace!(?root, lines = walk.entries.len(), "depths recomputed");
        }
        walk.entries
    }

    /// Recompute depths for every tree on the canvas.
    pub fn compute_all_depths(&mut self) {
        for root in self.roots() {
            self.compute_depths(root);
        }
    }

    /// Recompute depths for every tree and return the whole canvas in program
    /// order: trees top-to-bottom by canvas position, each in render order.
    pub fn program(&mut self) -> Vec<RenderEntry> {
        let mut out = Vec::new();
        for root in self.roots_by_position() {
            out.extend(self.compute_depths(root));
        }
        out
    }
}

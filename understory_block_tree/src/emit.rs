// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Code emitter seam.

use crate::depth::RenderEntry;
use crate::kind::BlockKind;
use crate::payload::Payload;
use crate::tree::BlockTree;
use crate::types::BlockId;

/// Receives one call per emitted line, in program order.
///
/// The tree supplies structure and indentation depth; turning a block's kind
/// and payload into text is up to the implementor. Body anchors are never
/// passed in.
pub trait LineEmitter {
    /// Emit the line for one block at `depth` levels of indentation.
    fn line(&mut self, kind: BlockKind, payload: &Payload, depth: u32);
}

impl<F> LineEmitter for F
where
    F: FnMut(BlockKind, &Payload, u32),
{
    fn line(&mut self, kind: BlockKind, payload: &Payload, depth: u32) {
        self(kind, payload, depth);
    }
}

impl BlockTree {
    /// Recompute depths and feed every tree on the canvas to `emitter`, in
    /// program order (see [`program`](Self::program)).
    pub fn emit<E: LineEmitter + ?Sized>(&mut self, emitter: &mut E) {
        let order = self.program();
        self.feed(&order, emitter);
    }

    /// Recompute depths and feed only the tree containing `root` to `emitter`.
    pub fn emit_tree<E: LineEmitter + ?Sized>(&mut self, root: BlockId, emitter: &mut E) {
        let order = self.compute_depths(root);
        self.feed(&order, emitter);
    }

    fn feed<E: LineEmitter + ?Sized>(&self, order: &[RenderEntry], emitter: &mut E) {
        for entry in order {
            if entry.kind == BlockKind::Holder {
                continue;
            }
            if let Some(payload) = self.payload(entry.id) {
                emitter.line(entry.kind, payload, entry.depth);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Relation;
    use alloc::vec::Vec;

    #[test]
    fn anchors_are_skipped() {
        let mut tree = BlockTree::new();
        let w = tree.insert(BlockKind::While);
        let after = tree.insert(BlockKind::Break);
        tree.attach(w, after, Relation::Below).unwrap();

        let mut lines: Vec<(BlockKind, u32)> = Vec::new();
        tree.emit(&mut |kind: BlockKind, _: &Payload, depth: u32| lines.push((kind, depth)));
        assert_eq!(
            lines,
            [
                (BlockKind::While, 0),
                (BlockKind::Pass, 1),
                (BlockKind::Break, 0)
            ]
        );
    }

    #[test]
    fn emit_tree_covers_one_tree() {
        let mut tree = BlockTree::new();
        let f = tree.insert(BlockKind::Def);
        tree.insert(BlockKind::Import);

        let mut count = 0;
        tree.emit_tree(f, &mut |_: BlockKind, _: &Payload, _: u32| count += 1);
        // def and its return
        assert_eq!(count, 2);
    }
}

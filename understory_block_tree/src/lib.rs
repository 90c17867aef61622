// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_block_tree --heading-base-level=0

//! Understory Block Tree: the structural core of a block-based code editor.
//!
//! Users assemble a program by dragging blocks (conditionals, loops, function and class
//! definitions, plain statements) onto a canvas. This crate keeps those blocks in a tree whose
//! shape mirrors the indentation of the generated source, and keeps the two in sync under
//! continuous drag, drop, and delete edits.
//!
//! - Each block has at most two children: the statement after it (`Below`) and the first statement
//!   of its body (`Nested`). Indentation depth is the number of `Nested` edges up to the root.
//! - Container blocks own a body anchor, an invisible block in their `Below` slot that marks the
//!   end of the body. Whatever follows the container hangs off the anchor.
//! - A canvas holds any number of disjoint trees.
//!
//! ## Not a renderer
//!
//! This crate does not draw blocks, render option panels, or produce source text. Hosts report
//! block rectangles through [`GeometryProvider`] and turn blocks into text through
//! [`LineEmitter`]. [`RectGeometry`] offers a plain row layout for hosts and tests that have none.
//!
//! ## API overview
//!
//! - [`BlockTree`]: the block registry; creation, queries, and structural edits.
//! - [`BlockId`]: generational handle of a block.
//! - [`BlockKind`]: the closed set of block kinds, and which of them are containers.
//! - [`Payload`]: per-kind option state, opaque to the tree.
//! - [`Relation`], [`Slots`], [`Placement`]: how blocks hang off each other.
//! - [`DragSession`]: hit testing and drop placement for one pointer gesture.
//!
//! Key operations:
//! - [`BlockTree::insert`] → [`BlockId`], wired with an anchor and default body for containers.
//! - [`BlockTree::attach`] / [`BlockTree::detach`] / [`BlockTree::extract`] move blocks.
//! - [`BlockTree::delete_subtree`] / [`BlockTree::delete_single`] / [`BlockTree::delete_scope`]
//!   remove them.
//! - [`BlockTree::compute_depths`] recomputes indentation and returns the render order;
//!   [`BlockTree::program`] does so for the whole canvas.
//! - [`BlockTree::check_invariants`] verifies the structure, for tests and debug builds.
//!
//! Mutations never recompute depths, so a batch of edits pays for one depth walk.
//!
//! ## Example
//!
//! ```rust
//! use understory_block_tree::{BlockKind, BlockTree, Relation};
//!
//! let mut tree = BlockTree::new();
//! let def = tree.insert(BlockKind::Def);
//! let cond = tree.insert(BlockKind::If);
//! tree.attach(def, cond, Relation::Nested).unwrap();
//!
//! let kinds: Vec<(BlockKind, u32)> = tree
//!     .compute_depths(def)
//!     .iter()
//!     .map(|e| (e.kind, e.depth))
//!     .collect();
//! assert_eq!(
//!     kinds,
//!     [
//!         (BlockKind::Def, 0),
//!         (BlockKind::If, 1),
//!         (BlockKind::Pass, 2),
//!         (BlockKind::Holder, 1),
//!         (BlockKind::Return, 1),
//!         (BlockKind::Holder, 0),
//!     ]
//! );
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod depth;
mod drag;
mod emit;
mod error;
mod geometry;
mod kind;
mod mutate;
mod payload;
mod tree;
mod types;

pub use depth::RenderEntry;
pub use drag::{DragConfig, DragOutcome, DragSession, DropTarget, OutOfBounds, Placeholder};
pub use emit::LineEmitter;
pub use error::{InvalidOperation, InvariantViolation};
pub use geometry::{GeometryProvider, HitSlop, RectGeometry};
pub use kind::BlockKind;
pub use payload::{ImportEntry, Payload};
pub use tree::{BlockTree, WalkLimits};
pub use types::{BlockFlags, BlockId, Placement, Relation, Slots};

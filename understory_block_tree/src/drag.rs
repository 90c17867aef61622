// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drag-and-drop placement.
//!
//! A [`DragSession`] follows one pointer gesture:
//!
//! - [`start`](DragSession::start) lifts the dragged block out of its tree.
//!   It becomes a provisional root that carries everything below it.
//! - [`update`](DragSession::update) hit-tests the pointer against every other
//!   block and proposes a [`DropTarget`].
//! - [`end`](DragSession::end) commits the proposal, or deletes the piece when
//!   it is dropped off the canvas, or leaves it as a new tree.
//! - [`cancel`](DragSession::cancel) puts everything back.
//!
//! Only one gesture is tracked at a time and calls must arrive in order.

use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::HashSet;
use kurbo::{Point, Rect};

use crate::error::InvalidOperation;
use crate::geometry::{GeometryProvider, HitSlop};
use crate::tree::BlockTree;
use crate::types::{BlockFlags, BlockId, Placement, Relation};

/// What happens to a piece dropped outside the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutOfBounds {
    /// Delete the dragged block and everything it carries.
    #[default]
    Delete,
    /// Put the piece back where the gesture started.
    SnapBack,
}

/// Parameters of a drag session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragConfig {
    /// Drop area; releasing outside it applies [`out_of_bounds`](Self::out_of_bounds).
    /// Unbounded by default.
    pub canvas: Rect,
    /// Enlarged hit region of candidate blocks.
    pub hit: HitSlop,
    /// Policy for drops outside `canvas`.
    pub out_of_bounds: OutOfBounds,
    /// Height of one line, used to size placeholders.
    pub line_height: f64,
    /// Horizontal offset of one depth level, used to indent placeholders.
    pub indent: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            canvas: Rect::new(
                f64::NEG_INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::INFINITY,
            ),
            hit: HitSlop::default(),
            out_of_bounds: OutOfBounds::Delete,
            line_height: 20.0,
            indent: 20.0,
        }
    }
}

/// Where the dragged block would land if released now.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DropTarget {
    /// The block under the pointer.
    pub target: BlockId,
    /// `Nested` for containers, `Below` otherwise.
    pub relation: Relation,
    /// Depth the dragged block would get.
    pub depth: u32,
}

/// Preview of the landing spot in one tree of the canvas.
///
/// Every tree other than the dragged one gets a placeholder when the gesture
/// starts; only the one holding the current target is visible.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placeholder {
    /// Root of the tree this placeholder belongs to.
    pub root: BlockId,
    /// Whether the preview is shown.
    pub visible: bool,
    /// The proposed drop, while visible.
    pub drop: Option<DropTarget>,
    /// Number of lines the dragged piece occupies.
    pub lines: usize,
    /// Where the preview is drawn, while visible and the target is rendered.
    pub rect: Option<Rect>,
}

impl Placeholder {
    fn hidden(root: BlockId, lines: usize) -> Self {
        Self {
            root,
            visible: false,
            drop: None,
            lines,
            rect: None,
        }
    }
}

/// Result of releasing a drag.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DragOutcome {
    /// The piece was attached at the target.
    Attached(DropTarget),
    /// The piece was dropped off the canvas and deleted.
    Deleted {
        /// Number of blocks removed.
        removed: usize,
    },
    /// The piece became a tree of its own at the drop point.
    Rooted {
        /// Canvas position of the new tree.
        position: Point,
    },
    /// The piece went back to where it started.
    Reverted,
}

#[derive(Clone, Debug)]
struct Gesture {
    dragged: BlockId,
    original: Option<Placement>,
    original_position: Option<Point>,
    candidate: Option<DropTarget>,
    excluded: HashSet<BlockId>,
    placeholders: Vec<Placeholder>,
    lines: usize,
}

/// Controller for one drag gesture at a time.
#[derive(Clone, Debug, Default)]
pub struct DragSession {
    config: DragConfig,
    gesture: Option<Gesture>,
}

impl DragSession {
    /// Create an idle session.
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            gesture: None,
        }
    }

    /// The session parameters.
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Returns true while a gesture is in progress.
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// The block being dragged.
    pub fn dragged(&self) -> Option<BlockId> {
        self.gesture.as_ref().map(|g| g.dragged)
    }

    /// The current drop proposal.
    pub fn candidate(&self) -> Option<DropTarget> {
        self.gesture.as_ref().and_then(|g| g.candidate)
    }

    /// Where the dragged block sat before the gesture, or `None` if it was a root.
    pub fn original_placement(&self) -> Option<Placement> {
        self.gesture.as_ref().and_then(|g| g.original)
    }

    /// Placeholders of the other trees on the canvas.
    pub fn placeholders(&self) -> &[Placeholder] {
        self.gesture
            .as_ref()
            .map_or(&[][..], |g| g.placeholders.as_slice())
    }

    /// Begin dragging `node` from `pointer`.
    ///
    /// `node` is detached and becomes a provisional root positioned at
    /// `pointer`, carrying its body and everything that followed it. The piece
    /// is flagged [`BlockFlags::DRAGGING`] and can never be its own target.
    ///
    /// # Errors
    ///
    /// - [`InvalidOperation::SessionState`] if a gesture is already running.
    /// - Whatever [`BlockTree::detach`] refuses (stale ids, anchors).
    pub fn start(
        &mut self,
        tree: &mut BlockTree,
        node: BlockId,
        pointer: Point,
    ) -> Result<(), InvalidOperation> {
        if self.gesture.is_some() {
            return Err(InvalidOperation::SessionState("already dragging"));
        }
        let original_position = tree.position(node);
        let old_root = tree.root_of(node);
        let original = tree.detach(node)?;
        tree.set_position(node, pointer);

        tree.compute_depths(node);
        if original.is_some()
            && let Some(old_root) = old_root
        {
            tree.compute_depths(old_root);
        }

        let piece = tree.subtree(node);
        for &id in &piece {
            let flags = tree.flags(id).unwrap_or_default();
            tree.set_flags(id, flags | BlockFlags::DRAGGING);
        }
        let lines = piece.len();
        let excluded: HashSet<BlockId> = piece.into_iter().collect();
        let placeholders = tree
            .roots()
            .into_iter()
            .filter(|&root| root != node)
            .map(|root| Placeholder::hidden(root, lines))
            .collect();

        tracing::debug!(?node, ?original, lines, "drag started");
        self.gesture = Some(Gesture {
            dragged: node,
            original,
            original_position,
            candidate: None,
            excluded,
            placeholders,
            lines,
        });
        Ok(())
    }

    /// Move the pointer and return the current drop proposal.
    ///
    /// The winner among blocks whose hit region contains `pointer` becomes
    /// the target and the only block flagged [`BlockFlags::COLLISION`].
    /// Without a hit, the previous target is kept while the pointer stays
    /// inside the bounds of the target's tree.
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::SessionState`] if no gesture is running.
    pub fn update<G: GeometryProvider + ?Sized>(
        &mut self,
        tree: &mut BlockTree,
        geometry: &G,
        pointer: Point,
    ) -> Result<Option<DropTarget>, InvalidOperation> {
        let hit = self.config.hit;
        let Some(gesture) = self.gesture.as_mut() else {
            return Err(InvalidOperation::SessionState("idle"));
        };
        tree.set_position(gesture.dragged, pointer);

        if let Some(target) = hit_test(tree, geometry, &hit, pointer, &gesture.excluded) {
            let relation = match tree.kind(target) {
                Some(kind) if kind.is_container() => Relation::Nested,
                _ => Relation::Below,
            };
            let depth = tree.depth(target).unwrap_or(0) + relation.depth_step();
            if gesture.candidate.map(|c| c.target) != Some(target) {
                tree.clear_flags(BlockFlags::COLLISION);
                let flags = tree.flags(target).unwrap_or_default();
                tree.set_flags(target, flags | BlockFlags::COLLISION);
                tracing::trace!(?target, ?relation, depth, "new drop target");
            }
            gesture.candidate = Some(DropTarget {
                target,
                relation,
                depth,
            });
        } else if let Some(previous) = gesture.candidate {
            let still_inside = tree
                .root_of(previous.target)
                .and_then(|root| geometry.bounds_of(&tree.subtree(root)))
                .is_some_and(|bounds| bounds.contains(pointer));
            if !still_inside {
                tracing::trace!(block = ?previous.target, "left the target tree");
                tree.clear_flags(BlockFlags::COLLISION);
                gesture.candidate = None;
            }
        }

        let drop = gesture.candidate;
        let lines = gesture.lines;
        let target_root = drop.and_then(|d| tree.root_of(d.target));
        for placeholder in &mut gesture.placeholders {
            if target_root == Some(placeholder.root) {
                placeholder.visible = true;
                placeholder.drop = drop;
                placeholder.rect = drop.and_then(|d| preview_rect(geometry, &self.config, d, lines));
            } else {
                *placeholder = Placeholder::hidden(placeholder.root, lines);
            }
        }
        Ok(gesture.candidate)
    }

    /// Release the pointer at `pointer` and apply the drop.
    ///
    /// - With a target, the piece is attached there.
    /// - Outside the canvas, the piece is deleted or snapped back, per
    ///   [`DragConfig::out_of_bounds`].
    /// - Otherwise it stays a tree of its own at `pointer`.
    ///
    /// Depths of every affected tree are recomputed and all drag flags and
    /// placeholders are cleared. The session is idle afterwards, also when an
    /// error is returned.
    ///
    /// # Errors
    ///
    /// - [`InvalidOperation::SessionState`] if no gesture is running.
    /// - Whatever [`BlockTree::attach`] refuses; the piece is put back first.
    pub fn end(
        &mut self,
        tree: &mut BlockTree,
        pointer: Point,
    ) -> Result<DragOutcome, InvalidOperation> {
        let Some(gesture) = self.gesture.take() else {
            return Err(InvalidOperation::SessionState("idle"));
        };
        tree.clear_flags(BlockFlags::DRAGGING | BlockFlags::COLLISION);
        let dragged = gesture.dragged;

        let outcome = if let Some(drop) = gesture.candidate.filter(|d| tree.is_alive(d.target)) {
            if let Err(err) = tree.attach(drop.target, dragged, drop.relation) {
                tracing::warn!(?dragged, ?drop, %err, "drop refused, restoring");
                restore(tree, &gesture);
                refresh(tree, &gesture);
                return Err(err);
            }
            DragOutcome::Attached(drop)
        } else if !self.config.canvas.contains(pointer) {
            match self.config.out_of_bounds {
                OutOfBounds::Delete => DragOutcome::Deleted {
                    removed: tree.delete_subtree(dragged)?,
                },
                OutOfBounds::SnapBack => {
                    restore(tree, &gesture);
                    DragOutcome::Reverted
                }
            }
        } else {
            tree.set_position(dragged, pointer);
            DragOutcome::Rooted { position: pointer }
        };

        refresh(tree, &gesture);
        tracing::debug!(?dragged, ?outcome, "drag ended");
        Ok(outcome)
    }

    /// Abort the gesture and restore the tree to its shape before
    /// [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// [`InvalidOperation::SessionState`] if no gesture is running.
    pub fn cancel(&mut self, tree: &mut BlockTree) -> Result<(), InvalidOperation> {
        let Some(gesture) = self.gesture.take() else {
            return Err(InvalidOperation::SessionState("idle"));
        };
        tree.clear_flags(BlockFlags::DRAGGING | BlockFlags::COLLISION);
        restore(tree, &gesture);
        refresh(tree, &gesture);
        tracing::debug!(dragged = ?gesture.dragged, "drag cancelled");
        Ok(())
    }
}

/// Pick the block the pointer is over.
///
/// Among blocks whose hit region contains the point, the one whose top edge
/// is lowest wins; ties go to the deeper block, then to the newer id.
fn hit_test<G: GeometryProvider + ?Sized>(
    tree: &BlockTree,
    geometry: &G,
    slop: &HitSlop,
    point: Point,
    excluded: &HashSet<BlockId>,
) -> Option<BlockId> {
    let mut best: Option<(BlockId, f64, u32)> = None;
    for id in tree.ids() {
        if excluded.contains(&id) {
            continue;
        }
        let Some(rect) = geometry.rect(id) else {
            continue;
        };
        if !slop.contains(rect, geometry.body_height(id), point) {
            continue;
        }
        let depth = tree.depth(id).unwrap_or(0);
        let wins = match best {
            None => true,
            Some((best_id, top, best_depth)) => match rect.y0.total_cmp(&top) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => {
                    depth > best_depth || (depth == best_depth && id.is_newer_than(best_id))
                }
            },
        };
        if wins {
            best = Some((id, rect.y0, depth));
        }
    }
    best.map(|(id, ..)| id)
}

/// Row the dragged piece would occupy: right under the target, indented one
/// level for a nested drop.
fn preview_rect<G: GeometryProvider + ?Sized>(
    geometry: &G,
    config: &DragConfig,
    drop: DropTarget,
    lines: usize,
) -> Option<Rect> {
    let target = geometry.rect(drop.target)?;
    let x = target.x0 + f64::from(drop.relation.depth_step()) * config.indent;
    #[allow(
        clippy::cast_precision_loss,
        reason = "Line counts stay far below 2^52."
    )]
    let height = lines as f64 * config.line_height;
    Some(Rect::new(
        x,
        target.y1,
        x + target.width(),
        target.y1 + height,
    ))
}

fn restore(tree: &mut BlockTree, gesture: &Gesture) {
    let dragged = gesture.dragged;
    match gesture.original {
        Some(Placement { parent, relation }) => {
            if let Err(err) = tree.attach(parent, dragged, relation) {
                tracing::warn!(?dragged, ?parent, %err, "could not restore dragged block");
            }
        }
        None => {
            if let Some(position) = gesture.original_position {
                tree.set_position(dragged, position);
            }
        }
    }
}

/// Recompute depths of every tree the gesture touched.
fn refresh(tree: &mut BlockTree, gesture: &Gesture) {
    let mut roots: Vec<BlockId> = Vec::new();
    let touched = [
        Some(gesture.dragged),
        gesture.original.map(|p| p.parent),
        gesture.candidate.map(|c| c.target),
    ];
    for id in touched.into_iter().flatten() {
        if let Some(root) = tree.root_of(id)
            && !roots.contains(&root)
        {
            roots.push(root);
        }
    }
    for root in roots {
        tree.compute_depths(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RectGeometry;
    use crate::kind::BlockKind;

    fn lay_out(tree: &BlockTree) -> RectGeometry {
        let mut geo = RectGeometry::new();
        for root in tree.roots() {
            if tree.flags(root).is_some_and(|f| f.contains(BlockFlags::DRAGGING)) {
                continue;
            }
            let origin = tree.position(root).unwrap_or_default();
            geo.layout_stacked(tree, root, origin, 20.0, 20.0, 100.0);
        }
        geo
    }

    #[test]
    fn calls_out_of_order_are_rejected() {
        let mut tree = BlockTree::new();
        let a = tree.insert(BlockKind::Pass);
        let geo = RectGeometry::new();
        let mut session = DragSession::default();
        assert!(matches!(
            session.update(&mut tree, &geo, Point::ZERO),
            Err(InvalidOperation::SessionState(_))
        ));
        assert!(session.end(&mut tree, Point::ZERO).is_err());
        assert!(session.cancel(&mut tree).is_err());

        session.start(&mut tree, a, Point::ZERO).unwrap();
        assert!(matches!(
            session.start(&mut tree, a, Point::ZERO),
            Err(InvalidOperation::SessionState(_))
        ));
    }

    #[test]
    fn container_target_proposes_nested() {
        let mut tree = BlockTree::new();
        let w = tree.insert_at(BlockKind::While, Point::new(0.0, 0.0));
        let line = tree.insert_at(BlockKind::Code, Point::new(300.0, 300.0));
        tree.compute_all_depths();
        let geo = lay_out(&tree);

        let mut session = DragSession::default();
        session.start(&mut tree, line, Point::new(300.0, 300.0)).unwrap();
        let drop = session
            .update(&mut tree, &geo, Point::new(10.0, 5.0))
            .unwrap()
            .unwrap();
        assert_eq!(drop.target, w);
        assert_eq!(drop.relation, Relation::Nested);
        assert_eq!(drop.depth, 1);
        assert!(tree.flags(w).unwrap().contains(BlockFlags::COLLISION));

        let visible: Vec<&Placeholder> =
            session.placeholders().iter().filter(|p| p.visible).collect();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].root, w);
        assert_eq!(visible[0].rect, Some(Rect::new(20.0, 20.0, 120.0, 40.0)));
    }

    #[test]
    fn lowest_region_wins_and_flags_move() {
        let mut tree = BlockTree::new();
        let a = tree.insert_at(BlockKind::Code, Point::ZERO);
        let b = tree.insert(BlockKind::Code);
        tree.attach(a, b, Relation::Below).unwrap();
        let dragged = tree.insert_at(BlockKind::Pass, Point::new(500.0, 500.0));
        tree.compute_all_depths();
        let geo = lay_out(&tree);

        let mut session = DragSession::default();
        session.start(&mut tree, dragged, Point::new(500.0, 500.0)).unwrap();
        // Inside both regions (a: y 0..40, b: y 20..60); b's top is lower.
        let drop = session.update(&mut tree, &geo, Point::new(5.0, 30.0)).unwrap();
        assert_eq!(drop.map(|d| d.target), Some(b));
        // Only inside a's region.
        let drop = session.update(&mut tree, &geo, Point::new(5.0, 10.0)).unwrap();
        assert_eq!(drop.map(|d| d.target), Some(a));
        assert!(!tree.flags(b).unwrap().contains(BlockFlags::COLLISION));
        assert!(tree.flags(a).unwrap().contains(BlockFlags::COLLISION));
    }

    #[test]
    fn target_sticks_inside_its_tree_then_clears() {
        let mut tree = BlockTree::new();
        let a = tree.insert_at(BlockKind::Code, Point::ZERO);
        let b = tree.insert(BlockKind::Break);
        tree.attach(a, b, Relation::Below).unwrap();
        let dragged = tree.insert_at(BlockKind::Pass, Point::new(500.0, 500.0));
        tree.compute_all_depths();
        let geo = lay_out(&tree);

        let mut session = DragSession::new(DragConfig {
            hit: HitSlop {
                width_factor: 1.0,
                height_factor: 1.0,
                include_body: false,
            },
            ..DragConfig::default()
        });
        session.start(&mut tree, dragged, Point::new(500.0, 500.0)).unwrap();
        let hit = session.update(&mut tree, &geo, Point::new(50.0, 10.0)).unwrap();
        assert_eq!(hit.map(|d| d.target), Some(a));

        // On the edge between the two rows: no region contains it strictly,
        // but the tree's bounds do.
        let kept = session.update(&mut tree, &geo, Point::new(50.0, 20.0)).unwrap();
        assert_eq!(kept.map(|d| d.target), Some(a));
        assert!(session.placeholders().iter().any(|p| p.visible));

        let gone = session.update(&mut tree, &geo, Point::new(450.0, 450.0)).unwrap();
        assert_eq!(gone, None);
        assert!(session.placeholders().iter().all(|p| !p.visible));
        assert!(!tree.flags(a).unwrap().contains(BlockFlags::COLLISION));
    }

    #[test]
    fn dragged_piece_is_never_a_target() {
        let mut tree = BlockTree::new();
        let f = tree.insert_at(BlockKind::For, Point::ZERO);
        tree.compute_all_depths();
        let geo = lay_out(&tree);

        let mut session = DragSession::default();
        session.start(&mut tree, f, Point::new(5.0, 5.0)).unwrap();
        let drop = session.update(&mut tree, &geo, Point::new(5.0, 5.0)).unwrap();
        assert_eq!(drop, None);
        assert!(session.placeholders().is_empty());
    }

    #[test]
    fn drop_off_canvas_deletes_or_snaps_back() {
        let canvas = Rect::new(0.0, 0.0, 400.0, 400.0);
        for policy in [OutOfBounds::Delete, OutOfBounds::SnapBack] {
            let mut tree = BlockTree::new();
            let head = tree.insert_at(BlockKind::Code, Point::new(10.0, 10.0));
            let cond = tree.insert(BlockKind::If);
            tree.attach(head, cond, Relation::Below).unwrap();
            tree.compute_all_depths();
            let before = tree.subtree(head);

            let mut session = DragSession::new(DragConfig {
                canvas,
                out_of_bounds: policy,
                ..DragConfig::default()
            });
            session.start(&mut tree, cond, Point::new(20.0, 30.0)).unwrap();
            let outcome = session.end(&mut tree, Point::new(-50.0, 30.0)).unwrap();
            match policy {
                OutOfBounds::Delete => {
                    assert_eq!(outcome, DragOutcome::Deleted { removed: 3 });
                    assert_eq!(tree.len(), 1);
                }
                OutOfBounds::SnapBack => {
                    assert_eq!(outcome, DragOutcome::Reverted);
                    assert_eq!(tree.subtree(head), before);
                }
            }
            assert!(!session.is_dragging());
            tree.check_invariants().unwrap();
        }
    }

    #[test]
    fn release_on_empty_canvas_makes_a_new_tree() {
        let mut tree = BlockTree::new();
        let head = tree.insert_at(BlockKind::Code, Point::ZERO);
        let f = tree.insert(BlockKind::Def);
        tree.attach(head, f, Relation::Below).unwrap();
        tree.compute_all_depths();

        let mut session = DragSession::default();
        session.start(&mut tree, f, Point::new(5.0, 25.0)).unwrap();
        let at = Point::new(250.0, 300.0);
        assert_eq!(
            session.end(&mut tree, at).unwrap(),
            DragOutcome::Rooted { position: at }
        );
        assert_eq!(tree.position(f), Some(at));
        assert_eq!(tree.roots_by_position(), [head, f]);
        assert!(tree.ids().all(|id| tree.flags(id) == Some(BlockFlags::empty())));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn cancel_restores_original_shape() {
        let mut tree = BlockTree::new();
        let f = tree.insert_at(BlockKind::Def, Point::new(4.0, 4.0));
        let line = tree.insert(BlockKind::Code);
        let after = tree.insert(BlockKind::Break);
        tree.attach(f, line, Relation::Nested).unwrap();
        tree.attach(line, after, Relation::Below).unwrap();
        tree.compute_all_depths();
        let before = tree.subtree(f);

        let mut session = DragSession::default();
        session.start(&mut tree, line, Point::new(30.0, 30.0)).unwrap();
        assert_eq!(
            session.original_placement(),
            Some(Placement {
                parent: f,
                relation: Relation::Nested
            })
        );
        session.cancel(&mut tree).unwrap();
        assert_eq!(tree.subtree(f), before);
        assert_eq!(tree.position(f), Some(Point::new(4.0, 4.0)));
        tree.check_invariants().unwrap();
    }
}

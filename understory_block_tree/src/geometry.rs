// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block geometry as seen by hit testing.
//!
//! The tree does not lay anything out. Hosts report where each block is drawn
//! through [`GeometryProvider`]; [`RectGeometry`] is a plain map
//! implementation with a simple row layout for hosts that have none.

use hashbrown::HashMap;
use kurbo::{Point, Rect};

use crate::tree::BlockTree;
use crate::types::BlockId;

/// Read access to the on-screen rectangles of blocks.
pub trait GeometryProvider {
    /// World-space rectangle of a block's own row, or `None` if the block is
    /// not rendered. Blocks without a rectangle are never hit.
    fn rect(&self, id: BlockId) -> Option<Rect>;

    /// Height of a container's rendered body; `0.0` for leaves.
    fn body_height(&self, id: BlockId) -> f64;

    /// Union of the rectangles of `ids`, skipping blocks that are not rendered.
    fn bounds_of(&self, ids: &[BlockId]) -> Option<Rect> {
        let mut it = ids.iter().filter_map(|&id| self.rect(id));
        let first = it.next()?;
        Some(it.fold(first, |acc, r| acc.union(r)))
    }
}

/// Shape of the enlarged region a block answers hits in.
///
/// The region starts at the block's top-left corner and extends right and
/// down, so a drop slightly past a block's bottom edge still targets it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitSlop {
    /// Region width as a multiple of the block width.
    pub width_factor: f64,
    /// Region height as a multiple of the block height, before the body.
    pub height_factor: f64,
    /// Whether a container's body height is added to its region.
    pub include_body: bool,
}

impl Default for HitSlop {
    fn default() -> Self {
        Self {
            width_factor: 2.0,
            height_factor: 2.0,
            include_body: true,
        }
    }
}

impl HitSlop {
    /// The hit region of a block drawn at `rect` with a body of `body_height`.
    pub fn region(&self, rect: Rect, body_height: f64) -> Rect {
        let body = if self.include_body {
            body_height.max(0.0)
        } else {
            0.0
        };
        Rect::new(
            rect.x0,
            rect.y0,
            rect.x0 + rect.width() * self.width_factor,
            rect.y0 + rect.height() * self.height_factor + body,
        )
    }

    /// Returns true if `point` lies strictly inside the hit region.
    pub fn contains(&self, rect: Rect, body_height: f64, point: Point) -> bool {
        let r = self.region(rect, body_height);
        point.x > r.x0 && point.x < r.x1 && point.y > r.y0 && point.y < r.y1
    }
}

/// A [`GeometryProvider`] backed by a map of rectangles.
#[derive(Clone, Debug, Default)]
pub struct RectGeometry {
    rects: HashMap<BlockId, Rect>,
    bodies: HashMap<BlockId, f64>,
}

impl RectGeometry {
    /// Create an empty geometry map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row rectangle of a block.
    pub fn set(&mut self, id: BlockId, rect: Rect) {
        self.rects.insert(id, rect);
    }

    /// Set the rendered body height of a container.
    pub fn set_body_height(&mut self, id: BlockId, height: f64) {
        self.bodies.insert(id, height);
    }

    /// Forget a block; it will no longer be hit.
    pub fn remove(&mut self, id: BlockId) {
        self.rects.remove(&id);
        self.bodies.remove(&id);
    }

    /// Forget every block.
    pub fn clear(&mut self) {
        self.rects.clear();
        self.bodies.clear();
    }

    /// Number of blocks with a rectangle.
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    /// Returns true if no block has a rectangle.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Lay out the tree containing `root` as stacked rows.
    ///
    /// Each line of the render order gets a `width` × `line_height` row
    /// starting at `origin`, shifted right by `indent` per depth level. Body
    /// anchors get a row of their own, closing their container's body. A
    /// container's body height is the total height of the rows between it
    /// and its anchor. Returns the bounds of the laid-out tree.
    pub fn layout_stacked(
        &mut self,
        tree: &BlockTree,
        root: BlockId,
        origin: Point,
        line_height: f64,
        indent: f64,
        width: f64,
    ) -> Option<Rect> {
        let root = tree.root_of(root)?;
        let entries = tree.walk(root, 0).entries;
        let rows: HashMap<BlockId, usize> =
            entries.iter().enumerate().map(|(i, e)| (e.id, i)).collect();

        let mut bounds: Option<Rect> = None;
        for (row, entry) in entries.iter().enumerate() {
            let x = origin.x + f64::from(entry.depth) * indent;
            #[allow(
                clippy::cast_precision_loss,
                reason = "Row counts stay far below 2^52."
            )]
            let y = origin.y + row as f64 * line_height;
            let rect = Rect::new(x, y, x + width, y + line_height);
            self.set(entry.id, rect);
            bounds = Some(bounds.map_or(rect, |b| b.union(rect)));

            let body_rows = tree
                .body_anchor(entry.id)
                .and_then(|anchor| rows.get(&anchor))
                .map_or(0, |&anchor_row| anchor_row.saturating_sub(row + 1));
            #[allow(
                clippy::cast_precision_loss,
                reason = "Row counts stay far below 2^52."
            )]
            self.set_body_height(entry.id, body_rows as f64 * line_height);
        }
        bounds
    }
}

impl GeometryProvider for RectGeometry {
    fn rect(&self, id: BlockId) -> Option<Rect> {
        self.rects.get(&id).copied()
    }

    fn body_height(&self, id: BlockId) -> f64 {
        self.bodies.get(&id).copied().unwrap_or(0.0)
    }
}

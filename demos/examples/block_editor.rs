// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted editing session: build a program, drag blocks around, emit Python.
//!
//! This example shows:
//! - building trees with containers and their default bodies,
//! - laying them out with `RectGeometry` and dragging through `DragSession`,
//! - dropping a block off the canvas to delete it,
//! - emitting the result with a `LineEmitter`.
//!
//! Run:
//! - `RUST_LOG=understory_block_tree=debug cargo run -p understory_demos --example block_editor`

use kurbo::{Point, Rect};
use tracing_subscriber::EnvFilter;
use understory_block_tree::{
    BlockFlags, BlockKind, BlockTree, DragConfig, DragSession, GeometryProvider, Payload,
    RectGeometry, Relation,
};
use understory_demos::PythonEmitter;

const LINE: f64 = 24.0;
const INDENT: f64 = 24.0;

fn lay_out(tree: &BlockTree) -> RectGeometry {
    let mut geo = RectGeometry::new();
    for root in tree.roots() {
        if tree
            .flags(root)
            .is_some_and(|f| f.contains(BlockFlags::DRAGGING))
        {
            continue;
        }
        let origin = tree.position(root).unwrap_or_default();
        geo.layout_stacked(tree, root, origin, LINE, INDENT, 240.0);
    }
    geo
}

fn print_program(title: &str, tree: &mut BlockTree) {
    let mut emitter = PythonEmitter::new();
    tree.emit(&mut emitter);
    println!("--- {title} ---");
    print!("{}", emitter.source());
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut tree = BlockTree::new();

    // A function with a loop in it.
    let def = tree.insert_at(BlockKind::Def, Point::new(20.0, 20.0));
    tree.set_payload(
        def,
        Payload::Def {
            name: "total".into(),
            params: vec!["items".into()],
        },
    )
    .expect("def payload");
    let acc = tree.insert(BlockKind::Code);
    tree.set_payload(acc, Payload::Line("acc = 0".into()))
        .expect("line payload");
    let loop_ = tree.insert(BlockKind::For);
    tree.set_payload(loop_, Payload::ForLine("item in items".into()))
        .expect("for payload");
    tree.attach(def, acc, Relation::Nested).expect("nest acc");
    tree.attach(acc, loop_, Relation::Below).expect("chain loop");

    // Loose blocks lying around on the canvas.
    let add = tree.insert_at(BlockKind::Code, Point::new(400.0, 20.0));
    tree.set_payload(add, Payload::Line("acc += item".into()))
        .expect("line payload");
    let stray = tree.insert_at(BlockKind::Break, Point::new(400.0, 200.0));

    tree.compute_all_depths();
    print_program("before", &mut tree);

    let mut session = DragSession::new(DragConfig {
        canvas: Rect::new(0.0, 0.0, 800.0, 600.0),
        line_height: LINE,
        indent: INDENT,
        ..DragConfig::default()
    });

    // Drag `acc += item` onto the loop header: it nests into the loop body.
    let geo = lay_out(&tree);
    let loop_row = geo.rect(loop_).expect("loop is laid out");
    let over_loop = Point::new(loop_row.x0 + 10.0, loop_row.y0 + 5.0);
    session
        .start(&mut tree, add, Point::new(410.0, 30.0))
        .expect("start drag");
    let proposal = session
        .update(&mut tree, &geo, over_loop)
        .expect("update drag");
    tracing::info!(?proposal, "hovering over the loop");
    for placeholder in session.placeholders().iter().filter(|p| p.visible) {
        tracing::info!(?placeholder, "preview");
    }
    let outcome = session.end(&mut tree, over_loop).expect("end drag");
    tracing::info!(?outcome, "dropped on the loop");

    // Throw the stray `break` off the canvas.
    session
        .start(&mut tree, stray, Point::new(410.0, 210.0))
        .expect("start drag");
    let outcome = session
        .end(&mut tree, Point::new(900.0, 210.0))
        .expect("end drag");
    tracing::info!(?outcome, "dropped off the canvas");

    // Clean up the loop's placeholder `pass`.
    if let Some(pass) = tree.default_body(loop_) {
        tree.delete_single(pass).expect("delete pass");
    }
    // And have the function return the total.
    if let Some(ret) = tree.default_body(def) {
        tree.set_payload(ret, Payload::Return(vec!["acc".into()]))
            .expect("return payload");
    }

    tree.compute_all_depths();
    tree.check_invariants().expect("tree is consistent");
    print_program("after", &mut tree);
}

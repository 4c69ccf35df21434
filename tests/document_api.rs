//! Tests for the document API: applying operations, anchors, listeners,
//! revisions and merging.

use std::cell::RefCell;
use std::rc::Rc;

use strand::{
    Anchor, ChangeEvent, ChangeKind, Config, Crdt, Document, Error, Gravity, NodeId, Op, OpRecord,
    Range, SiteId,
};

// =============================================================================
// Helper functions
// =============================================================================

fn id(site: u128, counter: u64) -> NodeId {
    return NodeId::new(SiteId(site), counter);
}

fn a() -> NodeId {
    return id(1, 1);
}

fn b() -> NodeId {
    return id(1, 2);
}

fn c() -> NodeId {
    return id(1, 3);
}

/// Insert(root, A), Insert(A, B), Insert(B, C)
fn chain_ops() -> Vec<Op> {
    return vec![
        Op::insert(NodeId::ROOT, a(), 'A'),
        Op::insert(a(), b(), 'B'),
        Op::insert(b(), c(), 'C'),
    ];
}

fn chain() -> Document {
    return Document::from_log(chain_ops()).unwrap();
}

fn permutations(ops: &[Op]) -> Vec<Vec<Op>> {
    if ops.len() <= 1 {
        return vec![ops.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..ops.len() {
        let mut rest = ops.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    return out;
}

// =============================================================================
// Applying operations
// =============================================================================

#[test]
fn chain_renders_in_every_arrival_order() {
    for ops in permutations(&chain_ops()) {
        let doc = Document::from_log(ops.clone()).unwrap();
        assert_eq!(doc.render(), "ABC", "order {:?}", ops);
        assert_eq!(doc.pending_len(), 0);
        doc.validate().unwrap();
    }
}

#[test]
fn delete_before_insert_leaves_a_tombstone() {
    let doc = Document::from_log([Op::delete(a()), Op::insert(NodeId::ROOT, a(), 'X')]).unwrap();
    assert_eq!(doc.render(), "");
    assert_eq!(doc.is_deleted(&a()), Some(true));
    assert_eq!(doc.linear_order(), vec![a()]);
    assert_eq!(doc.visible_len(), 0);
}

#[test]
fn repeated_delete_changes_nothing() {
    let mut doc = chain();
    doc.apply(Op::delete(b())).unwrap();
    doc.apply(Op::delete(b())).unwrap();
    assert_eq!(doc.render(), "AC");
    assert_eq!(doc.visible_len(), 2);
    assert_eq!(doc.len(), 3);
}

#[test]
fn concurrent_siblings_order_by_id_descending() {
    // Two sites type right after A at the same time.
    let ops = vec![
        Op::insert(NodeId::ROOT, a(), 'A'),
        Op::insert(a(), id(2, 5), 'x'),
        Op::insert(a(), id(3, 5), 'y'),
        Op::insert(a(), id(1, 4), 'z'),
    ];
    for order in permutations(&ops) {
        let doc = Document::from_log(order).unwrap();
        assert_eq!(doc.render(), "Ayxz");
    }
}

#[test]
fn subtree_sizes_ignore_tombstones() {
    let mut doc = chain();
    doc.apply(Op::insert(a(), id(2, 9), 'X')).unwrap();
    doc.apply(Op::delete(b())).unwrap();
    assert_eq!(doc.subtree_size(&NodeId::ROOT), Some(5));
    assert_eq!(doc.subtree_size(&a()), Some(4));
    assert_eq!(doc.subtree_size(&b()), Some(2));
    assert_eq!(doc.subtree_size(&id(9, 9)), None);
    assert_eq!(doc.traverse(), doc.linear_order());
}

#[test]
fn orders_and_positions_agree() {
    let mut doc = chain();
    doc.apply(Op::delete(b())).unwrap();
    assert_eq!(doc.linear_order(), vec![a(), b(), c()]);
    assert_eq!(doc.visible_order(), vec![a(), c()]);
    assert_eq!(doc.node_at_position(2), Some(b()));
    assert_eq!(doc.visible_node(1), Some(c()));
    assert_eq!(doc.index_of_visible(&c()), Some(1));
    assert_eq!(doc.index_of_visible(&b()), None);
}

#[test]
fn unknown_record_kind_is_rejected() {
    let mut doc = chain();
    let record = OpRecord {
        kind: "bold".to_string(),
        parent: None,
        node: a(),
        ch: None,
    };
    assert_eq!(doc.apply_record(&record), Err(Error::UnsupportedOperation("bold".to_string())));
    assert_eq!(doc.revision(), 3);

    doc.apply_record(&Op::delete(a()).to_record()).unwrap();
    assert_eq!(doc.render(), "BC");
}

#[test]
fn small_degrees_are_rejected() {
    let err = Document::with_config(Config::new().degree(1)).unwrap_err();
    assert_eq!(err, Error::InvalidDegree(1));
}

#[test]
fn configured_site_is_used() {
    let doc = Document::with_config(Config::new().site(SiteId(77))).unwrap();
    assert_eq!(doc.site_id(), SiteId(77));
    assert_ne!(Document::new().site_id(), Document::new().site_id());
}

// =============================================================================
// Revision and listeners
// =============================================================================

#[test]
fn revision_counts_every_apply() {
    let mut doc = Document::new();
    assert_eq!(doc.revision(), 0);
    doc.apply(Op::insert(a(), b(), 'B')).unwrap(); // buffered
    doc.apply(Op::insert(NodeId::ROOT, a(), 'A')).unwrap();
    doc.apply(Op::insert(NodeId::ROOT, a(), 'A')).unwrap(); // duplicate
    assert_eq!(doc.revision(), 3);
    assert_eq!(doc.operations().len(), 2);
}

#[test]
fn listener_fires_per_materialized_change() {
    let events: Rc<RefCell<Vec<ChangeEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let mut doc = Document::new();
    doc.register_change_listener(move |event| sink.borrow_mut().push(*event));

    doc.apply(Op::insert(b(), c(), 'C')).unwrap();
    doc.apply(Op::insert(a(), b(), 'B')).unwrap();
    assert!(events.borrow().is_empty());

    doc.apply(Op::insert(NodeId::ROOT, a(), 'A')).unwrap();
    let kinds: Vec<ChangeKind> = events.borrow().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![ChangeKind::Insert; 3]);

    doc.apply(Op::delete(c())).unwrap();
    assert_eq!(
        events.borrow().last(),
        Some(&ChangeEvent {
            kind: ChangeKind::Delete,
            node: c(),
        })
    );
}

#[test]
fn every_listener_is_called() {
    let count = Rc::new(RefCell::new(0));
    let mut doc = Document::new();
    for _ in 0..3 {
        let count = Rc::clone(&count);
        doc.register_change_listener(move |_| *count.borrow_mut() += 1);
    }
    doc.apply(Op::insert(NodeId::ROOT, a(), 'A')).unwrap();
    assert_eq!(*count.borrow(), 3);
}

// =============================================================================
// Anchors
// =============================================================================

#[test]
fn anchor_survives_insert_before_it() {
    let mut doc = chain();
    let anchor = doc.create_anchor(1, Gravity::Right);
    assert_eq!(anchor, Anchor::new(b(), Gravity::Right));
    assert_eq!(doc.resolve_anchor(&anchor), 1);

    // Larger than B, so it goes between A and B.
    doc.apply(Op::insert(a(), id(2, 10), 'X')).unwrap();
    assert_eq!(doc.render(), "AXBC");
    assert_eq!(doc.resolve_anchor(&anchor), 2);
}

#[test]
fn anchor_ignores_insert_after_its_node() {
    let mut doc = chain();
    let anchor = doc.create_anchor(1, Gravity::Right);

    // Smaller than B, so it goes after B's subtree.
    doc.apply(Op::insert(a(), id(0, 2), 'X')).unwrap();
    assert_eq!(doc.render(), "ABCX");
    assert_eq!(doc.resolve_anchor(&anchor), 1);
}

#[test]
fn anchor_on_deleted_node_resolves_to_its_gap() {
    let mut doc = chain();
    doc.apply(Op::delete(b())).unwrap();
    assert_eq!(doc.render(), "AC");
    assert_eq!(doc.resolve_anchor(&Anchor::new(b(), Gravity::Right)), 1);
    assert_eq!(doc.resolve_anchor(&Anchor::new(b(), Gravity::Left)), 1);
}

#[test]
fn anchor_with_no_visible_neighbor_falls_to_the_ends() {
    let mut doc = chain();
    doc.apply(Op::delete(a())).unwrap();
    doc.apply(Op::delete(b())).unwrap();
    assert_eq!(doc.resolve_anchor(&Anchor::new(a(), Gravity::Left)), 0);

    doc.apply(Op::delete(c())).unwrap();
    assert_eq!(doc.resolve_anchor(&Anchor::new(c(), Gravity::Right)), 0);
    assert_eq!(doc.create_anchor(3, Gravity::Right), Anchor::START);
}

#[test]
fn anchors_round_trip_on_every_caret() {
    let doc = chain();
    for caret in 0..=3 {
        for gravity in [Gravity::Left, Gravity::Right] {
            let anchor = doc.create_anchor(caret, gravity);
            assert_eq!(doc.resolve_anchor(&anchor), caret, "caret {} {:?}", caret, gravity);
        }
    }
}

#[test]
fn boundary_anchors_use_left_gravity() {
    let doc = chain();
    assert_eq!(doc.create_anchor(0, Gravity::Right), Anchor::START);
    assert_eq!(doc.create_anchor(3, Gravity::Right), Anchor::new(c(), Gravity::Left));
    assert_eq!(doc.create_anchor(99, Gravity::Right), Anchor::new(c(), Gravity::Left));
    assert_eq!(Document::new().create_anchor(5, Gravity::Left), Anchor::START);
}

#[test]
fn unknown_and_root_anchors_resolve_to_zero() {
    let doc = chain();
    assert_eq!(doc.resolve_anchor(&Anchor::new(id(5, 5), Gravity::Left)), 0);
    assert_eq!(doc.resolve_anchor(&Anchor::new(id(5, 5), Gravity::Right)), 0);
    assert_eq!(doc.resolve_anchor(&Anchor::new(NodeId::ROOT, Gravity::Right)), 0);
}

#[test]
fn ranges_are_not_normalized() {
    let doc = chain();
    let end = doc.create_anchor(1, Gravity::Left);
    let start = doc.create_anchor(3, Gravity::Left);
    let range = doc.resolve_range(&start, &end);
    assert_eq!(range, Range::new(3, 1));
    assert!(range.is_reversed());
}

// =============================================================================
// Merging
// =============================================================================

#[test]
fn merge_converges_both_ways() {
    let mut left = Document::with_config(Config::new().site(SiteId(1))).unwrap();
    let mut right = Document::with_config(Config::new().site(SiteId(2))).unwrap();
    left.insert_text(0, "left").unwrap();
    right.insert_text(0, "right").unwrap();

    let mut ab = Document::new();
    ab.merge(&left).unwrap();
    ab.merge(&right).unwrap();
    let mut ba = Document::new();
    ba.merge(&right).unwrap();
    ba.merge(&left).unwrap();

    assert_eq!(ab.render(), ba.render());
    assert_eq!(ab.visible_len(), 9);
}

#[test]
fn merge_is_idempotent() {
    let mut left = Document::with_config(Config::new().site(SiteId(1))).unwrap();
    let mut right = Document::with_config(Config::new().site(SiteId(2))).unwrap();
    left.insert_text(0, "abc").unwrap();
    right.merge(&left).unwrap();
    right.delete_range(0, 1).unwrap();
    left.merge(&right).unwrap();

    let revision = left.revision();
    left.merge(&right).unwrap();
    assert_eq!(left.revision(), revision);
    assert_eq!(left.render(), "bc");
    assert_eq!(right.render(), "bc");
}

#[test]
fn rebuilt_order_matches_incremental_order() {
    let mut doc = Document::with_config(Config::new().degree(2)).unwrap();
    doc.insert_text(0, "the quick brown fox").unwrap();
    doc.delete_range(4, 10).unwrap();
    doc.insert_text(4, "slow ").unwrap();
    let text = doc.render();
    let order = doc.linear_order();

    doc.rebuild_linear_order().unwrap();
    assert_eq!(doc.render(), text);
    assert_eq!(doc.linear_order(), order);
    doc.validate().unwrap();
}

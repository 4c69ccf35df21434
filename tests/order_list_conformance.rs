//! Conformance tests: OrderList against a plain Vec reference.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strand::{Error, OrderList};

// =============================================================================
// Reference model
// =============================================================================

/// A Vec of (element, visible) pairs.
#[derive(Default)]
struct Reference {
    items: Vec<(u32, bool)>,
}

impl Reference {
    fn insert(&mut self, index: usize, value: u32) {
        self.items.insert(index, (value, true));
    }

    fn set_visible(&mut self, value: u32, visible: bool) -> bool {
        let Some(entry) = self.items.iter_mut().find(|(v, _)| *v == value) else {
            return false;
        };
        let changed = entry.1 != visible;
        entry.1 = visible;
        return changed;
    }

    fn all(&self) -> Vec<u32> {
        return self.items.iter().map(|(v, _)| *v).collect();
    }

    fn visible(&self) -> Vec<u32> {
        return self.items.iter().filter(|(_, vis)| *vis).map(|(v, _)| *v).collect();
    }
}

fn assert_matches(list: &OrderList<u32>, reference: &Reference) {
    assert_eq!(list.to_list(), reference.all());
    let visible = reference.visible();
    assert_eq!(list.to_visible_list(), visible);
    assert_eq!(list.len(), reference.items.len());
    assert_eq!(list.visible_len(), visible.len());
}

// =============================================================================
// Random inserts
// =============================================================================

#[test]
fn random_inserts_match_vec_200k() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut list = OrderList::new();
    let mut reference: Vec<u32> = Vec::new();

    for value in 0..200_000u32 {
        let index = rng.gen_range(0..=reference.len());
        list.insert(index, value).unwrap();
        reference.insert(index, value);
        if value % 20_000 == 0 {
            list.validate().unwrap();
        }
    }

    list.validate().unwrap();
    assert_eq!(list.len(), 200_000);
    assert_eq!(list.to_list(), reference);
    for _ in 0..1000 {
        let index = rng.gen_range(0..reference.len());
        assert_eq!(list.get(index), Ok(reference[index]));
        assert_eq!(list.index_of(&reference[index]), Some(index));
    }
}

#[test]
fn random_inserts_match_vec_every_degree() {
    for degree in [2, 3, 4, 8, 32] {
        let mut rng = StdRng::seed_from_u64(degree as u64);
        let mut list = OrderList::with_degree(degree).unwrap();
        let mut reference: Vec<u32> = Vec::new();
        for value in 0..3000u32 {
            let index = rng.gen_range(0..=reference.len());
            list.insert(index, value).unwrap();
            reference.insert(index, value);
        }
        list.validate().unwrap();
        assert_eq!(list.to_list(), reference, "degree {}", degree);
        for (i, value) in reference.iter().enumerate() {
            assert_eq!(list.index_of(value), Some(i));
        }
    }
}

#[test]
fn sequential_and_front_inserts() {
    let mut back = OrderList::with_degree(3).unwrap();
    let mut front = OrderList::with_degree(3).unwrap();
    for value in 0..5000u32 {
        back.push(value).unwrap();
        front.insert(0, value).unwrap();
    }
    back.validate().unwrap();
    front.validate().unwrap();
    assert_eq!(back.to_list(), (0..5000).collect::<Vec<_>>());
    assert_eq!(front.to_list(), (0..5000).rev().collect::<Vec<_>>());
}

// =============================================================================
// Visibility
// =============================================================================

#[test]
fn visibility_toggles_match_reference() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut list = OrderList::with_degree(4).unwrap();
    let mut reference = Reference::default();
    let mut next = 0u32;

    for step in 0..20_000 {
        if next == 0 || rng.gen_bool(0.6) {
            let index = rng.gen_range(0..=reference.items.len());
            list.insert(index, next).unwrap();
            reference.insert(index, next);
            next += 1;
        } else {
            let value = rng.gen_range(0..next);
            let visible = rng.gen_bool(0.3);
            assert_eq!(list.set_visible(&value, visible), reference.set_visible(value, visible));
        }
        if step % 2000 == 0 {
            list.validate().unwrap();
            assert_matches(&list, &reference);
        }
    }

    list.validate().unwrap();
    assert_matches(&list, &reference);

    let visible = reference.visible();
    for (i, value) in visible.iter().enumerate() {
        assert_eq!(list.get_visible(i), Ok(*value));
        assert_eq!(list.index_of_visible(value), Some(i));
    }
    let mut seen = 0;
    for (value, vis) in &reference.items {
        assert_eq!(list.is_visible(value), *vis);
        assert_eq!(list.visible_before(value), Some(seen));
        if !*vis {
            assert_eq!(list.index_of_visible(value), None);
        } else {
            seen += 1;
        }
    }
}

#[test]
fn out_of_range_access_fails() {
    let mut list = OrderList::with_degree(2).unwrap();
    list.extend(0..10u32).unwrap();
    list.set_visible(&3, false);

    assert_eq!(list.get(10), Err(Error::IndexOutOfBounds { index: 10, len: 10 }));
    assert_eq!(list.get_visible(9), Err(Error::IndexOutOfBounds { index: 9, len: 9 }));
    assert_eq!(list.insert(11, 99), Err(Error::IndexOutOfBounds { index: 11, len: 10 }));
    assert_eq!(list.set(10, 99), Err(Error::IndexOutOfBounds { index: 10, len: 10 }));
    assert_eq!(list.index_of(&99), None);
    assert_eq!(list.visible_before(&99), None);
    assert!(!list.contains(&99));
}

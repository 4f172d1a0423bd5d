//! End-to-end scenarios S2, S4, S6 exercised purely through the public
//! `Registry`/`Query`/`serialize` API.

use std::cell::RefCell;
use std::rc::Rc;

use sparsecs::{ComponentHooks, Entity, Registry};

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct A(i32);

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct B(i64);

#[test]
fn s2_add_remove_with_swap_and_query_filters() {
    let mut r = Registry::new();
    let e0 = r.create().unwrap();
    let e1 = r.create().unwrap();

    r.insert(e0, A(4)).unwrap();
    r.insert(e0, B(8)).unwrap();
    r.insert(e1, B(8)).unwrap();

    let both: Vec<Entity> = r.query().with::<A>().with::<B>().iter().unwrap().collect();
    assert_eq!(both, vec![e0]);
    assert_eq!(*r.get::<A>(e0).unwrap(), A(4));
    assert_eq!(*r.get::<B>(e0).unwrap(), B(8));

    let mut with_b: Vec<Entity> = r.query().with::<B>().iter().unwrap().collect();
    with_b.sort_by_key(|e| e.id());
    let mut expected = vec![e0, e1];
    expected.sort_by_key(|e| e.id());
    assert_eq!(with_b, expected);

    let without_a: Vec<Entity> = r.query().without::<A>().with::<B>().iter().unwrap().collect();
    assert_eq!(without_a, vec![e1]);

    let mut q = r.query().optional::<A>().with::<B>().iter().unwrap();
    let mut seen = Vec::new();
    while let Some(e) = q.next() {
        seen.push((e, q.has::<A>(e)));
    }
    seen.sort_by_key(|(e, _)| e.id());
    assert_eq!(seen, vec![(e0, true), (e1, false)]);
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Nested {
    d: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Quad {
    a: u32,
    b: u32,
    c: u32,
    nested: Nested,
}

#[test]
fn s4_serialization_round_trip_of_a_trivial_type() {
    let mut src = Registry::new();
    src.register_trivial::<Quad>().unwrap();

    let e0 = src.create().unwrap();
    let e1 = src.create().unwrap();
    src.insert(
        e0,
        Quad {
            a: 1,
            b: 2,
            c: 3,
            nested: Nested { d: 4 },
        },
    )
    .unwrap();
    src.insert(
        e1,
        Quad {
            a: 5,
            b: 6,
            c: 7,
            nested: Nested { d: 8 },
        },
    )
    .unwrap();

    let bytes = sparsecs::serialize::save(&src, true).unwrap();

    let mut dst = Registry::new();
    dst.register_trivial::<Quad>().unwrap();
    sparsecs::serialize::load(&mut dst, &bytes, true, false).unwrap();

    assert_eq!(dst.alive_count(), 2);
    assert_eq!(e0.generation(), 0);
    assert_eq!(e1.generation(), 0);
    assert!(dst.is_alive(e0));
    assert!(dst.is_alive(e1));
    assert!(dst.has::<Quad>(e0));
    assert!(dst.has::<Quad>(e1));
    assert_eq!(
        *dst.get::<Quad>(e0).unwrap(),
        Quad {
            a: 1,
            b: 2,
            c: 3,
            nested: Nested { d: 4 }
        }
    );
    assert_eq!(
        *dst.get::<Quad>(e1).unwrap(),
        Quad {
            a: 5,
            b: 6,
            c: 7,
            nested: Nested { d: 8 }
        }
    );
}

#[test]
fn s6_query_base_selection_is_order_independent() {
    let mut r = Registry::new();
    let entities = r.create_many(10_005).unwrap();

    for e in &entities[0..10] {
        r.insert(*e, A(1)).unwrap();
    }
    for e in &entities[5..10_005] {
        r.insert(*e, B(1)).unwrap();
    }

    let mut expected: Vec<Entity> = entities[5..10].to_vec();
    expected.sort_by_key(|e| e.id());

    let mut a_then_b: Vec<Entity> = r.query().with::<A>().with::<B>().iter().unwrap().collect();
    a_then_b.sort_by_key(|e| e.id());
    assert_eq!(a_then_b, expected);

    let mut b_then_a: Vec<Entity> = r.query().with::<B>().with::<A>().iter().unwrap().collect();
    b_then_a.sort_by_key(|e| e.id());
    assert_eq!(b_then_a, expected);
}

#[test]
fn query_without_any_with_constraint_is_rejected() {
    let r = Registry::new();
    let err = r.query().without::<A>().iter().unwrap_err();
    assert!(matches!(err, sparsecs::EcsError::InvalidQuery));
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Hooked(u32);

#[test]
fn s3_lifetime_hooks_through_the_public_registry_api() {
    let remove_count = Rc::new(RefCell::new(0));
    let remove_count_for_hook = remove_count.clone();

    let mut r = Registry::new();
    r.set_hooks(
        ComponentHooks::new()
            .with_construct(|| Hooked(99))
            .with_on_remove(move |_e, value| {
                value.0 = 11;
                *remove_count_for_hook.borrow_mut() += 1;
            }),
    )
    .unwrap();

    let e0 = r.create().unwrap();
    let e1 = r.create().unwrap();
    r.insert_default::<Hooked>(e0).unwrap();
    r.insert_default::<Hooked>(e1).unwrap();
    assert_eq!(*r.get::<Hooked>(e0).unwrap(), Hooked(99));
    assert_eq!(*r.get::<Hooked>(e1).unwrap(), Hooked(99));

    r.get_mut::<Hooked>(e1).unwrap().0 = 88;

    let removed0 = r.remove::<Hooked>(e0).unwrap();
    assert_eq!(removed0, Hooked(11));
    assert_eq!(*remove_count.borrow(), 1);

    // e1 (moved into e0's old dense slot) keeps its own 88 — the removal
    // hook ran on e0's extracted value, not on the slot.
    assert_eq!(*r.get::<Hooked>(e1).unwrap(), Hooked(88));

    let removed1 = r.remove::<Hooked>(e1).unwrap();
    assert_eq!(removed1, Hooked(11));
    assert_eq!(*remove_count.borrow(), 2);
}

#[test]
fn destroying_an_entity_removes_it_from_every_store_and_recycles_its_id() {
    let mut r = Registry::new();
    let e0 = r.create().unwrap();
    r.insert(e0, A(1)).unwrap();
    r.insert(e0, B(2)).unwrap();

    r.destroy(e0).unwrap();
    assert!(!r.is_alive(e0));
    assert!(!r.has::<A>(e0));
    assert!(!r.has::<B>(e0));

    let e0b = r.create().unwrap();
    assert_eq!(e0b.id(), e0.id());
    assert_ne!(e0b.generation(), e0.generation());
    assert!(!r.has::<A>(e0b));
}

//! One type in two hierarchies.
//!
//! ```text
//! forest A:  A ─┬─ B              forest D:  D ─┬─ E ── G ── H
//!               └─ C ── G ── H                  └─ F
//! ```
//!
//! `G` embeds a `C` (its base in A) and an `E` (its base in D), so every
//! `G` and `H` carries two tag stores.

use std::ptr;

use tagcast::{hierarchy, Instance, Node, Object, Registry, TagStore};

#[derive(Object)]
struct A {
    #[object(tag)]
    tag: TagStore<u8>,
}

#[derive(Object)]
struct B {
    #[object(base)]
    a: A,
}

#[derive(Object)]
struct C {
    #[object(base)]
    a: A,
}

#[derive(Object)]
struct D {
    #[object(tag)]
    tag: TagStore<u8>,
    label: &'static str,
}

#[derive(Object)]
struct E {
    #[object(base)]
    d: D,
}

#[derive(Object)]
struct F {
    #[object(base)]
    d: D,
}

#[derive(Object)]
struct G {
    #[object(base)]
    c: C,
    #[object(base)]
    e: E,
}

#[derive(Object)]
struct H {
    #[object(base)]
    g: G,
    extra: u32,
}

hierarchy! {
    mod a_tags for A {
        B;
        C { G { H; } }
    }
}

hierarchy! {
    mod d_tags for D {
        E { G { H; } }
        F;
    }
}

fn g_of<T: Node<A> + Node<D>>() -> G {
    G {
        c: C {
            a: A {
                // SAFETY: the `A` of a `T`.
                tag: unsafe { TagStore::of::<A, T>() },
            },
        },
        e: E {
            d: D {
                // SAFETY: the `D` of a `T`.
                tag: unsafe { TagStore::of::<D, T>() },
                label: "d",
            },
        },
    }
}

fn h() -> H {
    H {
        g: g_of::<H>(),
        extra: 42,
    }
}

#[test]
fn one_tag_per_forest() {
    assert_eq!(<G as Node<A>>::TAG, 0b1111);
    assert_eq!(<H as Node<A>>::TAG, 0b11111);
    assert_eq!(<G as Node<D>>::TAG, 0b1101);
    assert_eq!(<H as Node<D>>::TAG, 0b11101);
    assert_eq!(<E as Node<D>>::TAG, 0b101);
    assert_eq!(<F as Node<D>>::TAG, 0b111);

    let h = h();
    assert_eq!(<H as Instance<A>>::tag(&h), 0b11111);
    assert_eq!(<H as Instance<D>>::tag(&h), 0b11101);
}

#[test]
fn each_root_answers_with_its_own_tag() {
    let h = h();

    let a: &A = &h.g.c.a;
    assert!(a.is::<C>());
    assert!(a.is::<G>());
    assert!(a.is::<H>());
    assert!(!a.is::<B>());

    let d: &D = &h.g.e.d;
    assert!(d.is::<E>());
    assert!(d.is::<G>());
    assert!(d.is::<H>());
    assert!(!d.is::<F>());
}

#[test]
fn casts_from_either_root_reach_the_same_object() {
    let h = h();

    let via_a = h.g.c.a.cast::<H>().unwrap();
    let via_d = h.g.e.d.cast::<H>().unwrap();
    assert!(ptr::eq(via_a, &h));
    assert!(ptr::eq(via_d, &h));
    assert_eq!(via_d.extra, 42);

    let g_via_d = h.g.e.d.cast::<G>().unwrap();
    assert!(ptr::eq(g_via_d, &h.g));
    assert_eq!(<G as Instance<D>>::root(g_via_d).label, "d");
}

#[test]
fn queries_name_the_forest() {
    let h = h();
    let g: &G = &h.g;

    assert!(<G as Instance<A>>::is::<C>(g));
    assert!(<G as Instance<D>>::is::<E>(g));
    assert!(!<G as Instance<A>>::is::<B>(g));
    assert!(!<G as Instance<D>>::is::<F>(g));
    assert!(<G as Instance<A>>::same::<H>(g));
    assert!(<G as Instance<D>>::same::<H>(g));

    let back = <G as Instance<D>>::cast::<H>(g).unwrap();
    assert!(ptr::eq(back, &h));
}

#[test]
fn plain_g_is_not_an_h_in_either_forest() {
    let g = g_of::<G>();
    assert!(<G as Instance<A>>::same::<G>(&g));
    assert!(<G as Instance<D>>::same::<G>(&g));
    assert!(g.c.a.cast::<H>().is_none());
    assert!(g.e.d.cast::<H>().is_none());

    let err = <G as Instance<D>>::try_cast::<H>(&g).map(|_| ()).unwrap_err();
    assert_eq!(err.actual, 0b1101);
    assert_eq!(err.target, 0b11101);
}

#[test]
fn members_of_one_forest_are_unrelated_in_the_other() {
    let e = E {
        d: D {
            // SAFETY: the `D` of an `E`.
            tag: unsafe { TagStore::of::<D, E>() },
            label: "e",
        },
    };
    // `E` has no place in forest A; from D's view it is not a `G`.
    assert!(!e.d.is::<G>());
    assert!(e.d.same::<E>());
}

#[test]
fn registry_lists_memberships() {
    let mut registry = Registry::new();
    registry.build(a_tags::DEFINITIONS, a_tags::WIDTH).unwrap();
    registry.build(d_tags::DEFINITIONS, d_tags::WIDTH).unwrap();

    assert_eq!(
        registry.memberships("G"),
        vec![("A", <G as Node<A>>::TAG), ("D", <G as Node<D>>::TAG)]
    );
    assert_eq!(registry.memberships("B"), vec![("A", 0b101u64)]);
    assert_eq!(registry.is_descendant_of("D", "H", "E"), Some(true));
    assert_eq!(registry.is_descendant_of("A", "H", "E"), None);
}

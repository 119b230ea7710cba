//! Ancestry tests and casts.
//!
//! Everything here is a pure function of two integers: the tag stored in the
//! object and the constant tag of the target type. `V` is an ancestor-or-self
//! of the object's type exactly when `V`'s tag is reproduced in the low bits
//! of the stored tag:
//!
//! ```text
//! actual = 0b1001101   (E)
//! target = 0b0001101   (D)
//! x      = 0b1000000   actual ^ target
//! lsb    = 0b1000000   x & (!x + 1), lowest differing bit
//! target < lsb         every bit of D lies below the first difference → E is a D
//! ```
//!
//! The test is sound because every position field carries a non-zero top bit,
//! so the bit length of a tag is exactly the sum of its fields and no tag can
//! end in the middle of another node's field.

use core::ptr::NonNull;

use crate::error::BadCast;
use crate::repr::TagRepr;
use crate::traits::{Node, Root};

/// Exact type test on raw tags.
#[inline]
pub const fn is_same_tag(actual: u64, target: u64) -> bool {
    actual == target
}

/// Is the node tagged `target` an ancestor-or-self of the node tagged `actual`?
///
/// Both tags must come from the same hierarchy.
#[inline]
pub const fn is_ancestor_tag(actual: u64, target: u64) -> bool {
    let x = actual ^ target;
    let lsb = x & (!x).wrapping_add(1);
    x == 0 || target < lsb
}

/// Queries and casts on any value of a hierarchy rooted at `R`.
///
/// Implemented for every [`Node<R>`]. When a type belongs to more than one
/// hierarchy, name the one to query: `Instance::<Shape>::is::<Circle>(&x)`.
pub trait Instance<R: Root>: Node<R> {
    /// The `R` subobject, which holds this hierarchy's tag store.
    #[inline]
    fn root(&self) -> &R {
        let this = (self as *const Self).cast::<u8>();
        // SAFETY: `Node::ROOT_OFFSET` is the offset of the `R` subobject in `Self`.
        unsafe { &*this.add(<Self as Node<R>>::ROOT_OFFSET).cast::<R>() }
    }

    /// Tag of the most-derived type of this object.
    #[inline]
    fn tag(&self) -> R::Repr {
        self.root().tag_store().get()
    }

    /// Is the most-derived type exactly `V`?
    #[inline]
    fn same<V: Node<R>>(&self) -> bool {
        // A `V` that does not descend from the static type can never match.
        if const { !is_ancestor_tag(<V as Node<R>>::TAG, <Self as Node<R>>::TAG) } {
            return false;
        }
        is_same_tag(self.tag().to_u64(), <V as Node<R>>::TAG)
    }

    /// Is this object a `V` (its type, or any of its ancestors)?
    #[inline]
    fn is<V: Node<R>>(&self) -> bool {
        // Static shortcuts: upcasts always hold, and a `V` off the static
        // type's line (neither ancestor nor descendant) never does.
        if const { is_ancestor_tag(<Self as Node<R>>::TAG, <V as Node<R>>::TAG) } {
            return true;
        }
        if const { !is_ancestor_tag(<V as Node<R>>::TAG, <Self as Node<R>>::TAG) } {
            return false;
        }
        is_ancestor_tag(self.tag().to_u64(), <V as Node<R>>::TAG)
    }

    /// View this object as a `V`, or `None` if it is not one.
    ///
    /// # Aliasing
    ///
    /// A downcast turns `&self`, a borrow of a base, into a reference to the
    /// enclosing object, which covers bytes outside that borrow. Tree Borrows
    /// accepts this; Stacked Borrows (Miri's default) reports it. When the
    /// caller holds a pointer derived from the whole object, [`cast_ptr`]
    /// keeps that pointer's provenance and is accepted by both.
    #[inline]
    fn cast<V: Node<R>>(&self) -> Option<&V> {
        if self.is::<V>() {
            // SAFETY: the object is a `V` (ancestry test above).
            Some(unsafe { self.cast_unchecked::<V>() })
        } else {
            None
        }
    }

    /// View this object as a `V`, or fail with [`BadCast`].
    ///
    /// Same aliasing caveat as [`cast`](Instance::cast).
    #[inline]
    fn try_cast<V: Node<R>>(&self) -> Result<&V, BadCast> {
        self.cast::<V>().ok_or_else(|| BadCast {
            from: <Self as Node<R>>::NAME,
            to: <V as Node<R>>::NAME,
            actual: self.tag().to_u64(),
            target: <V as Node<R>>::TAG,
        })
    }

    /// View this object as a `V` without checking.
    ///
    /// Same aliasing caveat as [`cast`](Instance::cast): prefer [`cast_ptr`]
    /// under Stacked Borrows.
    ///
    /// # Safety
    ///
    /// The object's most-derived type must be `V` or a descendant of `V`.
    #[inline]
    unsafe fn cast_unchecked<V: Node<R>>(&self) -> &V {
        debug_assert!(self.is::<V>(), "cast_unchecked to a type the object is not");
        let root = (self.root() as *const R).cast::<u8>();
        // SAFETY: the object is a `V`, so its `R` subobject sits
        // `V::ROOT_OFFSET` bytes into the `V`.
        unsafe { &*root.sub(<V as Node<R>>::ROOT_OFFSET).cast::<V>() }
    }
}

impl<R: Root, T: Node<R>> Instance<R> for T {}

/// Pointer form of [`Instance::cast`]: the same object viewed as a `V`, or
/// `None`.
///
/// The returned pointer keeps the provenance of `ptr`, so it may reach the
/// whole object when `ptr` does.
///
/// # Safety
///
/// `ptr` must point to a live `W`.
pub unsafe fn cast_ptr<R, W, V>(ptr: NonNull<W>) -> Option<NonNull<V>>
where
    R: Root,
    W: Node<R>,
    V: Node<R>,
{
    // SAFETY: caller guarantees `ptr` is live.
    let object = unsafe { ptr.as_ref() };
    if !<W as Instance<R>>::is::<V>(object) {
        return None;
    }
    // SAFETY: the object is a `V`; both offsets stay inside it.
    let cast = unsafe {
        ptr.cast::<u8>()
            .add(<W as Node<R>>::ROOT_OFFSET)
            .sub(<V as Node<R>>::ROOT_OFFSET)
    };
    Some(cast.cast::<V>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{child_tag, Step, ROOT_TAG};
    use crate::store::TagStore;
    use crate::traits::Extends;

    // Animal { Dog { Puppy } Cat }, wired by hand.

    #[derive(Debug)]
    struct Animal {
        tag: TagStore<u8>,
        legs: u8,
    }

    #[repr(C)]
    struct Dog {
        base: Animal,
        good: bool,
    }

    #[repr(C)]
    struct Puppy {
        base: Dog,
        age_weeks: u32,
    }

    #[derive(Debug)]
    #[repr(C)]
    struct Cat {
        base: Animal,
        lives: u8,
    }

    unsafe impl Root for Animal {
        type Repr = u8;
        fn tag_store(&self) -> &TagStore<u8> {
            &self.tag
        }
    }

    unsafe impl Extends<Animal> for Dog {
        const OFFSET: usize = core::mem::offset_of!(Dog, base);
    }

    unsafe impl Extends<Dog> for Puppy {
        const OFFSET: usize = core::mem::offset_of!(Puppy, base);
    }

    unsafe impl Extends<Animal> for Cat {
        const OFFSET: usize = core::mem::offset_of!(Cat, base);
    }

    const fn unwrap(tag: Option<u64>) -> u64 {
        match tag {
            Some(tag) => tag,
            None => panic!("overflow"),
        }
    }

    unsafe impl Node<Animal> for Animal {
        const NAME: &'static str = "Animal";
        const DEPTH: u8 = 0;
        const TAG: u64 = ROOT_TAG;
        const ROOT_OFFSET: usize = 0;
    }

    unsafe impl Node<Animal> for Dog {
        const NAME: &'static str = "Dog";
        const DEPTH: u8 = 1;
        const TAG: u64 = unwrap(child_tag(ROOT_TAG, Step::new(1, 2)));
        const ROOT_OFFSET: usize = <Dog as Extends<Animal>>::OFFSET;
    }

    unsafe impl Node<Animal> for Puppy {
        const NAME: &'static str = "Puppy";
        const DEPTH: u8 = 2;
        const TAG: u64 = unwrap(child_tag(<Dog as Node<Animal>>::TAG, Step::new(1, 1)));
        const ROOT_OFFSET: usize =
            <Puppy as Extends<Dog>>::OFFSET + <Dog as Node<Animal>>::ROOT_OFFSET;
    }

    unsafe impl Node<Animal> for Cat {
        const NAME: &'static str = "Cat";
        const DEPTH: u8 = 1;
        const TAG: u64 = unwrap(child_tag(ROOT_TAG, Step::new(2, 2)));
        const ROOT_OFFSET: usize = <Cat as Extends<Animal>>::OFFSET;
    }

    impl Animal {
        unsafe fn tagged<N: Node<Animal>>(legs: u8) -> Self {
            Self {
                // SAFETY: forwarded to the caller.
                tag: unsafe { TagStore::of::<Animal, N>() },
                legs,
            }
        }

        fn new(legs: u8) -> Self {
            // SAFETY: a standalone `Animal`.
            unsafe { Self::tagged::<Animal>(legs) }
        }
    }

    fn dog() -> Dog {
        Dog {
            // SAFETY: becomes the `Animal` of a `Dog`.
            base: unsafe { Animal::tagged::<Dog>(4) },
            good: true,
        }
    }

    fn puppy() -> Puppy {
        Puppy {
            base: Dog {
                // SAFETY: becomes the `Animal` of a `Puppy`.
                base: unsafe { Animal::tagged::<Puppy>(4) },
                good: true,
            },
            age_weeks: 9,
        }
    }

    fn cat() -> Cat {
        Cat {
            // SAFETY: becomes the `Animal` of a `Cat`.
            base: unsafe { Animal::tagged::<Cat>(4) },
            lives: 9,
        }
    }

    #[test]
    fn tags_follow_declaration() {
        assert_eq!(<Animal as Node<Animal>>::TAG, 0b1);
        assert_eq!(<Dog as Node<Animal>>::TAG, 0b101);
        assert_eq!(<Cat as Node<Animal>>::TAG, 0b111);
        assert_eq!(<Puppy as Node<Animal>>::TAG, 0b1101);
    }

    #[test]
    fn tag_reads_through_root() {
        let p = puppy();
        assert_eq!(p.tag(), 0b1101);
        assert_eq!(p.base.base.tag(), 0b1101);
        assert_eq!(p.root().legs, 4);
    }

    #[test]
    fn same_is_exact() {
        let p = puppy();
        let as_animal: &Animal = &p.base.base;
        assert!(as_animal.same::<Puppy>());
        assert!(!as_animal.same::<Dog>());
        assert!(!as_animal.same::<Animal>());
        assert!(!as_animal.same::<Cat>());

        let a = Animal::new(2);
        assert!(a.same::<Animal>());
        assert!(!a.same::<Dog>());
    }

    #[test]
    fn is_follows_ancestry() {
        let p = puppy();
        let as_animal: &Animal = &p.base.base;
        assert!(as_animal.is::<Animal>());
        assert!(as_animal.is::<Dog>());
        assert!(as_animal.is::<Puppy>());
        assert!(!as_animal.is::<Cat>());

        let c = cat();
        let as_animal: &Animal = &c.base;
        assert!(as_animal.is::<Cat>());
        assert!(!as_animal.is::<Dog>());
        assert!(!as_animal.is::<Puppy>());
    }

    #[test]
    fn static_shortcuts_agree_with_dynamic_answer() {
        let p = puppy();
        // Upcast: answered statically.
        assert!(p.is::<Dog>());
        assert!(p.is::<Animal>());
        // Off-line type: answered statically.
        assert!(!p.is::<Cat>());
        assert!(!p.base.is::<Cat>());
    }

    #[test]
    fn cast_returns_the_enclosing_object() {
        let p = puppy();
        let as_animal: &Animal = &p.base.base;

        let back = as_animal.cast::<Puppy>().unwrap();
        assert_eq!(back.age_weeks, 9);
        assert!(core::ptr::eq(back, &p));

        let as_dog = as_animal.cast::<Dog>().unwrap();
        assert!(as_dog.good);
        assert!(as_animal.cast::<Cat>().is_none());
    }

    #[test]
    fn try_cast_reports_bad_cast() {
        let d = dog();
        let as_animal: &Animal = &d.base;
        assert!(as_animal.try_cast::<Dog>().is_ok());

        let err = as_animal.try_cast::<Cat>().unwrap_err();
        assert_eq!(err.from, "Animal");
        assert_eq!(err.to, "Cat");
        assert_eq!(err.actual, 0b101);
        assert_eq!(err.target, 0b111);

        assert!(as_animal.try_cast::<Puppy>().is_err());
    }

    #[test]
    fn unchecked_cast_matches_checked() {
        let c = cat();
        let as_animal: &Animal = &c.base;
        // SAFETY: `c` is a `Cat`.
        let back = unsafe { as_animal.cast_unchecked::<Cat>() };
        assert_eq!(back.lives, 9);
    }

    #[test]
    fn pointer_cast() {
        let p = puppy();
        let ptr = NonNull::from(&p.base.base);
        // SAFETY: `ptr` points into the live `p`.
        let as_dog = unsafe { cast_ptr::<Animal, Animal, Dog>(ptr) };
        assert_eq!(as_dog.map(|d| d.as_ptr() as usize), Some(&p.base as *const Dog as usize));
        // SAFETY: as above.
        let as_cat = unsafe { cast_ptr::<Animal, Animal, Cat>(ptr) };
        assert!(as_cat.is_none());
    }

    #[test]
    fn bit_trick_matches_suffix_definition() {
        fn is_suffix(actual: u64, target: u64) -> bool {
            let len = 64 - target.leading_zeros();
            let mask = if len == 64 { u64::MAX } else { (1u64 << len) - 1 };
            actual & mask == target
        }

        // Every tag of a tree with fan-outs 3, 2, 5 under a root.
        let mut tags = vec![ROOT_TAG];
        let mut frontier = vec![ROOT_TAG];
        for fanout in [3u32, 2, 5] {
            let mut next = Vec::new();
            for parent in &frontier {
                for position in 1..=fanout {
                    next.push(child_tag(*parent, Step::new(position, fanout)).unwrap());
                }
            }
            tags.extend(&next);
            frontier = next;
        }

        for &actual in &tags {
            for &target in &tags {
                assert_eq!(
                    is_ancestor_tag(actual, target),
                    is_suffix(actual, target),
                    "actual {:#b} target {:#b}",
                    actual,
                    target
                );
            }
        }
    }
}

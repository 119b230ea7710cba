//! # Constant-time downcasts over declared type hierarchies (tagcast)
//!
//! Every type of a declared hierarchy gets a constant integer tag. Every
//! object stores the tag of its most-derived type once, in its root. "Is this
//! object a `V`?" is then a few integer operations on two numbers, no matter
//! how deep or wide the hierarchy is.
//!
//! ## Design
//!
//! A tag is built from the root down. The root is `1`; each child stacks a
//! position field (with a stop-marker top bit) above its parent's tag:
//!
//! ```text
//!            A = 0b1
//!           ┌┴──────────────┐
//!   B = 0b10·1         C = 0b11·1
//!           │
//!   D = 0b1·10·1
//!    ┌──────┼─────────┐
//! E=100·…  F=101·…  G=110·…
//! ```
//!
//! An ancestor's tag is always a low-order suffix of its descendants' tags, so
//! the ancestry test needs no table:
//!
//! ```ignore
//! use tagcast::Instance;
//!
//! let shape: &Shape = circle.as_ref();
//! if let Some(circle) = shape.cast::<Circle>() {
//!     // ...
//! }
//! ```
//!
//! ## Declaring a hierarchy
//!
//! ```ignore
//! use tagcast::{hierarchy, Object, TagStore};
//!
//! #[derive(Object)]
//! struct Shape {
//!     #[object(tag)]
//!     tag: TagStore<u16>,
//! }
//!
//! #[derive(Object)]
//! struct Circle {
//!     #[object(base)]
//!     shape: Shape,
//!     radius: f32,
//! }
//!
//! hierarchy! {
//!     pub mod shape_tags for Shape {
//!         Circle;
//!     }
//! }
//! ```
//!
//! ## Keeping tags with their objects
//!
//! The tag lives in the root subobject. A base separated from its object would
//! still carry the derived type's tag, so `#[derive(Object)]` makes separation
//! impossible from safe code outside the defining module.
//!
//! A struct with bases implements `Drop`, so a base can not be moved out:
//!
//! ```compile_fail,E0509
//! use tagcast::{Object, TagStore};
//!
//! #[derive(Object)]
//! struct Shape {
//!     #[object(tag)]
//!     tag: TagStore<u8>,
//! }
//!
//! #[derive(Object)]
//! struct Circle {
//!     #[object(base)]
//!     shape: Shape,
//!     radius: f32,
//! }
//!
//! fn slice(circle: Circle) -> Shape {
//!     let Circle { shape, .. } = circle;
//!     shape
//! }
//!
//! fn main() {}
//! ```
//!
//! Base fields are private, so other modules can not swap them:
//!
//! ```compile_fail,E0616
//! mod shapes {
//!     use tagcast::{Object, TagStore};
//!
//!     #[derive(Object)]
//!     pub struct Shape {
//!         #[object(tag)]
//!         tag: TagStore<u8>,
//!     }
//!
//!     #[derive(Object)]
//!     pub struct Circle {
//!         #[object(base)]
//!         shape: Shape,
//!     }
//! }
//!
//! fn swap_bases(a: &mut shapes::Circle, b: &mut shapes::Circle) {
//!     std::mem::swap(&mut a.shape, &mut b.shape);
//! }
//!
//! fn main() {}
//! ```
//!
//! and `Deref` gives no mutable access:
//!
//! ```compile_fail
//! mod shapes {
//!     use tagcast::{Object, TagStore};
//!
//!     #[derive(Object)]
//!     pub struct Shape {
//!         #[object(tag)]
//!         tag: TagStore<u8>,
//!     }
//!
//!     #[derive(Object)]
//!     pub struct Circle {
//!         #[object(base)]
//!         shape: Shape,
//!     }
//! }
//!
//! fn swap_bases(a: &mut shapes::Circle, b: &mut shapes::Circle) {
//!     std::mem::swap(&mut **a, &mut **b);
//! }
//!
//! fn main() {}
//! ```
//!
//! A visible base field is rejected by the derive:
//!
//! ```compile_fail
//! use tagcast::{Object, TagStore};
//!
//! #[derive(Object)]
//! pub struct Shape {
//!     #[object(tag)]
//!     tag: TagStore<u8>,
//! }
//!
//! #[derive(Object)]
//! pub struct Circle {
//!     #[object(base)]
//!     pub shape: Shape,
//! }
//!
//! fn main() {}
//! ```
//!
//! Inside the defining module the fields are still reachable; the safety
//! contracts of [`TagStore::of`] and [`Node`] forbid moving or replacing them
//! there.
//!
//! ## Tag width
//!
//! Each level costs at least one bit. A chain of eight types fills a `u8`:
//!
//! ```
//! use tagcast::{hierarchy, Node, Object, TagStore};
//!
//! #[derive(Object)]
//! struct L0 {
//!     #[object(tag)]
//!     tag: TagStore<u8>,
//! }
//! #[derive(Object)]
//! struct L1(#[object(base)] L0);
//! #[derive(Object)]
//! struct L2(#[object(base)] L1);
//! #[derive(Object)]
//! struct L3(#[object(base)] L2);
//! #[derive(Object)]
//! struct L4(#[object(base)] L3);
//! #[derive(Object)]
//! struct L5(#[object(base)] L4);
//! #[derive(Object)]
//! struct L6(#[object(base)] L5);
//! #[derive(Object)]
//! struct L7(#[object(base)] L6);
//!
//! hierarchy! {
//!     mod chain for L0 { L1 { L2 { L3 { L4 { L5 { L6 { L7; } } } } } } }
//! }
//!
//! fn main() {
//!     assert_eq!(<L7 as Node<L0>>::TAG, 0b1111_1111);
//!     assert_eq!(chain::TREE_DEPTH, 8);
//! }
//! ```
//!
//! and a ninth level does not compile:
//!
//! ```compile_fail,E0080
//! use tagcast::{hierarchy, Object, TagStore};
//!
//! #[derive(Object)]
//! struct L0 {
//!     #[object(tag)]
//!     tag: TagStore<u8>,
//! }
//! #[derive(Object)]
//! struct L1(#[object(base)] L0);
//! #[derive(Object)]
//! struct L2(#[object(base)] L1);
//! #[derive(Object)]
//! struct L3(#[object(base)] L2);
//! #[derive(Object)]
//! struct L4(#[object(base)] L3);
//! #[derive(Object)]
//! struct L5(#[object(base)] L4);
//! #[derive(Object)]
//! struct L6(#[object(base)] L5);
//! #[derive(Object)]
//! struct L7(#[object(base)] L6);
//! #[derive(Object)]
//! struct L8(#[object(base)] L7);
//!
//! hierarchy! {
//!     mod chain for L0 { L1 { L2 { L3 { L4 { L5 { L6 { L7 { L8; } } } } } } } }
//! }
//!
//! fn main() {}
//! ```

pub mod cast;
pub mod encode;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod registry;
pub mod repr;
pub mod store;
pub mod traits;

pub use cast::{cast_ptr, is_ancestor_tag, is_same_tag, Instance};
pub use encode::{child_tag, path_tag, Step, ROOT_TAG};
pub use error::{BadCast, HierarchyError, Malformed};
pub use hierarchy::{Hierarchy, HierarchyBuilder, TypeDef, TypeEntry};
pub use layout::{bits_needed, corrected_position, field_width};
pub use registry::Registry;
pub use repr::TagRepr;
pub use store::{peek_tag, write_tag, TagStore};
pub use traits::{Extends, Node, Root};

#[cfg(feature = "derive")]
pub use tagcast_macro::{hierarchy, Object};

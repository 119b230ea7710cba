//! Dispatch on the dynamic type of a shape without a visitor or a vtable.
//!
//! This example shows how to:
//! - Declare structs with `#[derive(Object)]` and a hierarchy with `hierarchy!`
//! - Keep heterogeneous objects behind `&Shape`
//! - Recover the concrete type with `cast` (most specific first)

use tagcast::{hierarchy, Instance, Node, Object, TagStore};

#[derive(Object)]
struct Shape {
    #[object(tag)]
    tag: TagStore<u16>,
    name: &'static str,
}

#[derive(Object)]
struct Circle {
    #[object(base)]
    shape: Shape,
    radius: f64,
}

#[derive(Object)]
struct Polygon {
    #[object(base)]
    shape: Shape,
    sides: u32,
}

#[derive(Object)]
struct Square {
    #[object(base)]
    polygon: Polygon,
    side: f64,
}

#[derive(Object)]
struct Triangle {
    #[object(base)]
    polygon: Polygon,
    base: f64,
    height: f64,
}

hierarchy! {
    pub mod shape_tags for Shape {
        Circle;
        Polygon {
            Square;
            Triangle;
        }
    }
}

/// The `Shape` of a value whose most-derived type is `T`.
fn shape<T: Node<Shape>>(name: &'static str) -> Shape {
    Shape {
        // SAFETY: every caller embeds the result in a `T`.
        tag: unsafe { TagStore::of::<Shape, T>() },
        name,
    }
}

fn polygon<T: Node<Shape>>(name: &'static str, sides: u32) -> Polygon {
    Polygon {
        shape: shape::<T>(name),
        sides,
    }
}

fn area(s: &Shape) -> Option<f64> {
    if let Some(c) = s.cast::<Circle>() {
        return Some(std::f64::consts::PI * c.radius * c.radius);
    }
    if let Some(sq) = s.cast::<Square>() {
        return Some(sq.side * sq.side);
    }
    if let Some(t) = s.cast::<Triangle>() {
        return Some(0.5 * t.base * t.height);
    }
    None
}

fn main() {
    let circle = Circle {
        shape: shape::<Circle>("unit circle"),
        radius: 1.0,
    };
    let square = Square {
        polygon: polygon::<Square>("square", 4),
        side: 2.0,
    };
    let triangle = Triangle {
        polygon: polygon::<Triangle>("triangle", 3),
        base: 3.0,
        height: 4.0,
    };
    let hexagon = polygon::<Polygon>("hexagon", 6);

    // 1. Tags
    println!("Tags ({}-bit):", shape_tags::WIDTH);
    println!("  Shape    = {:#b}", <Shape as Node<Shape>>::TAG);
    println!("  Circle   = {:#b}", <Circle as Node<Shape>>::TAG);
    println!("  Polygon  = {:#b}", <Polygon as Node<Shape>>::TAG);
    println!("  Square   = {:#b}", <Square as Node<Shape>>::TAG);
    println!("  Triangle = {:#b}", <Triangle as Node<Shape>>::TAG);
    println!();

    // 2. Heterogeneous list of base references
    let shapes: [&Shape; 4] = [&circle, &square, &triangle, &hexagon];

    for s in shapes {
        let kind = if s.is::<Polygon>() { "polygon" } else { "curve" };
        match area(s) {
            Some(a) => println!("  {:<12} {:<8} area {:.3}", s.name, kind, a),
            None => println!("  {:<12} {:<8} area unknown", s.name, kind),
        }
        if let Some(p) = s.cast::<Polygon>() {
            println!("  {:<12} {} sides", "", p.sides);
        }
    }
    println!();

    // 3. Failing casts carry both tags
    if let Err(e) = hexagon.shape.try_cast::<Square>() {
        println!("  {}", e);
    }
}

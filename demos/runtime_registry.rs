//! Build hierarchies at run time and query them by name.
//!
//! This example shows how to:
//! - Describe hierarchies with `TypeDef` tables
//! - Allocate them once into a process-wide `Registry`
//! - See allocation logs (`RUST_LOG=tagcast=debug`)
//! - Handle overflow when a width is too small

use std::sync::OnceLock;

use tagcast::{Hierarchy, Registry, TypeDef};
use tracing_subscriber::EnvFilter;

const VEHICLES: &[TypeDef<'static>] = &[
    TypeDef::new("Vehicle", None, &["Car", "Boat", "Plane"]),
    TypeDef::new("Car", Some("Vehicle"), &["Sedan", "Truck"]),
    TypeDef::new("Boat", Some("Vehicle"), &["Amphibian"]),
    TypeDef::new("Plane", Some("Vehicle"), &[]),
    TypeDef::new("Sedan", Some("Car"), &[]),
    TypeDef::new("Truck", Some("Car"), &[]),
    TypeDef::new("Amphibian", Some("Boat"), &[]),
];

const ROAD_USERS: &[TypeDef<'static>] = &[
    TypeDef::new("RoadUser", None, &["Amphibian", "Cyclist"]),
    TypeDef::new("Amphibian", Some("RoadUser"), &[]),
    TypeDef::new("Cyclist", Some("RoadUser"), &[]),
];

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = Registry::new();
        registry.build(VEHICLES, 16).expect("vehicle hierarchy is valid");
        registry.build(ROAD_USERS, 8).expect("road-user hierarchy is valid");
        registry
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = registry();

    // 1. Every forest
    for (root, hierarchy) in registry.iter() {
        println!("{} ({} types, {}-bit):", root, hierarchy.len(), hierarchy.width());
        for entry in hierarchy.entries() {
            println!(
                "  {:indent$}{:<10} {:#b}",
                "",
                entry.name,
                entry.tag,
                indent = entry.depth as usize * 2
            );
        }
    }
    println!();

    // 2. A type in two forests
    println!("Amphibian:");
    for (root, tag) in registry.memberships("Amphibian") {
        println!("  in {:<9} tag {:#b}", root, tag);
    }
    println!(
        "  is a Boat:    {:?}",
        registry.is_descendant_of("Vehicle", "Amphibian", "Boat")
    );
    println!(
        "  is a Cyclist: {:?}",
        registry.is_descendant_of("RoadUser", "Amphibian", "Cyclist")
    );
    println!();

    // 3. Too narrow
    match Hierarchy::builder().width(4).build(VEHICLES) {
        Ok(_) => println!("4 bits fit"),
        Err(e) => println!("4 bits: {}", e),
    }
}

//! Statement dependency resolution
//!
//! This crate provides:
//! - The `DependencyMap` artifact consumed by the calculation engine and UI
//! - A memoized resolver computing the transitive closure of definition
//!   references across every library of a load

pub mod resolver;

pub use resolver::{DependencyMap, DependencyResolver, StatementDependencies, StatementReference};

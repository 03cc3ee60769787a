//! JSON ELM (Expression Logical Model) library model
//!
//! This crate provides:
//! - Data structures for translator-emitted JSON ELM libraries
//! - Statement lookup over the compiled working set
//! - Wire-level cleanup applied before decoding

pub mod model;

pub use model::*;

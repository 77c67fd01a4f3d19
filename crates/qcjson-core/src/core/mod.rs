//! # Core Module
//!
//! The foundation of qcjson: the document container, the schema registry that
//! validates and normalizes it, and the immutable models handed to the engine.
//!
//! ## Architecture
//!
//! - **Documents** ([`document`]) - The caller-owned JSON object that travels through the pipeline
//! - **Schema Handling** ([`schema`]) - Versioned validation and default-filling strategies
//! - **Domain Models** ([`models`]) - Molecules, job descriptors, and computation results
//!
//! Nothing in this layer talks to a backend; every operation here is a pure
//! function of its inputs.

pub mod document;
pub mod models;
pub mod schema;

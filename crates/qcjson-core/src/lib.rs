//! # qcjson Core Library
//!
//! A versioned, schema-validated protocol for describing quantum-chemistry jobs as
//! JSON documents, dispatching them to a pluggable compute backend, and embedding the
//! outcome back into the very same document.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that validation, dispatch
//! and orchestration can be tested and extended independently.
//!
//! - **[`core`]: The Foundation.** Stateless data models: the raw [`core::document::Document`],
//!   the versioned [`core::schema`] registry that normalizes it, and the validated
//!   [`core::models`] (`Molecule`, `JobDescriptor`, computation results).
//!
//! - **[`engine`]: The Logic Core.** The [`engine::backend::ComputeBackend`] seam, the
//!   `Dispatcher` that invokes it exactly once and captures every failure, the
//!   `ResultEnvelope` it produces, and the embedder that merges that envelope into the
//!   document without touching caller-owned fields.
//!
//! - **[`backends`]: Collaborators.** Ready-made backends: an external program speaking
//!   JSON over stdin/stdout, and a replay backend serving recorded results.
//!
//! - **[`workflows`]: The Public API.** Ties everything together: a document goes in, a
//!   fully-formed document always comes out, with `success` as the single branch signal.

pub mod backends;
pub mod core;
pub mod engine;
pub mod workflows;

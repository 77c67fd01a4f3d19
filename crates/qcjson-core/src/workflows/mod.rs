//! # Workflows Module
//!
//! Top-level entry points: a document goes in, the same document comes back with
//! its output keys filled in.
//!
//! ## Architecture
//!
//! - **Run Workflow** ([`run`]) - Validation, molecule and job construction, a single
//!   dispatch, and embedding, for one document, a JSON string, or a parallel batch.
//!
//! ## Guarantees
//!
//! - Every call returns a document; `success` is the only branch signal a caller needs.
//! - Invalid documents never reach the backend.
//! - The backend is invoked at most once per document.
//! - Caller-owned keys come back unchanged and in their original order.

pub mod run;

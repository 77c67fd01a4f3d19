//! # Engine Module
//!
//! The part of qcjson that talks to a numerical backend: it hands a validated
//! molecule and job over, captures whatever comes back, and writes the outcome
//! into the caller's document.
//!
//! ## Architecture
//!
//! - **Backend Seam** ([`backend`]) - The `ComputeBackend` trait and the errors a backend may report
//! - **Dispatch** ([`dispatch`]) - One backend call per request, with panics and failures captured
//! - **Envelopes** ([`envelope`]) - The success/failure record produced by a dispatch
//! - **Embedding** ([`embed`]) - Merging an envelope into a document, output keys only
//! - **Cancellation** ([`cancel`]) - A shared flag plus optional deadline, forwarded to backends
//! - **Configuration** ([`config`]) - Post-processing switches for dispatched results
//! - **Progress Monitoring** ([`progress`]) - Phase and batch events for front ends
//! - **Error Handling** ([`error`]) - Validation failures that stop a document before dispatch
//!
//! ## Failure Model
//!
//! Nothing in this layer returns an error to the caller once a request has been
//! validated. Backend errors, cancellations, malformed results and panics all
//! become failure envelopes, and every envelope carries provenance.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod embed;
pub mod envelope;
pub mod error;
pub mod progress;

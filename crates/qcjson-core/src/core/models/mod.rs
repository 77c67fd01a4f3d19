//! # Core Models Module
//!
//! Validated, immutable representations of what a document asks for and what a
//! backend returns.
//!
//! ## Key Components
//!
//! - [`elements`] - Periodic table lookup for element symbols
//! - [`molecule`] - Sites (real or ghost), positions in Bohr, and derived charge bookkeeping
//! - [`job`] - Driver, model (method and basis) and the opaque keyword bag
//! - [`result`] - Return values, property maps and provenance produced by backends
//!
//! ## Usage
//!
//! Models are built from a [`crate::core::schema::normalized::NormalizedRequest`]
//! and never mutated afterwards.
//!
//! ```ignore
//! let request = SchemaRegistry::default().validate_and_normalize(&document)?;
//! let molecule = Molecule::build(&request.molecule)?;
//! let job = JobDescriptor::build(&request.driver, &request.model, request.keywords)?;
//! ```

pub mod elements;
pub mod job;
pub mod molecule;
pub mod result;

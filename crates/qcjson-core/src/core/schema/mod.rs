//! # Schema Module
//!
//! Versioned validation of incoming documents.
//!
//! A [`registry::SchemaRegistry`] checks the protocol name and version of a
//! [`crate::core::document::Document`], then hands it to the
//! [`version::NormalizationStrategy`] registered for that version. Each strategy
//! owns its version's default-filling rules (for instance, version 0 marks every
//! site real when `molecule.real` is absent) and produces a detached
//! [`normalized::NormalizedRequest`].

pub mod error;
pub mod normalized;
pub mod registry;
pub mod version;

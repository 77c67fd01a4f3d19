use crate::core::models::job::{Keywords, ModelSpec};

/// The molecule section of a request after version-specific defaults have been applied.
///
/// Nothing here has been checked for chemical consistency yet; that is the job of
/// [`crate::core::models::molecule::Molecule::build`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedMolecule {
    pub geometry: Vec<f64>,
    pub symbols: Vec<String>,
    /// `None` when the document did not say; every site is then real.
    pub real: Option<Vec<bool>>,
    pub molecular_charge: Option<i32>,
    pub molecular_multiplicity: Option<u32>,
}

/// A request that passed schema validation, detached from the original document.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub schema_name: String,
    pub schema_version: u32,
    pub molecule: NormalizedMolecule,
    pub driver: String,
    pub model: ModelSpec,
    pub keywords: Keywords,
    pub return_output: bool,
}

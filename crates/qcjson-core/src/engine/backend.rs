use super::cancel::CancellationSignal;
use crate::core::models::job::JobDescriptor;
use crate::core::models::molecule::Molecule;
use crate::core::models::result::{ComputationResult, Provenance};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Backend failed: {message}")]
    Failed {
        message: String,
        diagnostics: Option<Value>,
    },

    #[error("Computation cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Backend does not support this request: {0}")]
    Unsupported(String),

    #[error("Backend panicked: {0}")]
    Panicked(String),

    #[error("Backend returned an invalid result: {0}")]
    InvalidResult(String),
}

impl ComputeError {
    pub fn failed(message: impl Into<String>) -> Self {
        ComputeError::Failed {
            message: message.into(),
            diagnostics: None,
        }
    }

    /// Backend-supplied payload to carry into the embedded error object.
    pub fn diagnostics(&self) -> Option<&Value> {
        match self {
            ComputeError::Failed { diagnostics, .. } => diagnostics.as_ref(),
            _ => None,
        }
    }
}

/// The narrow interface to a numerical solver.
///
/// The protocol core only relies on the call/return/fail contract: how the
/// backend runs (in-process, subprocess, remote) and what state it keeps between
/// calls is its own business. Backends that hold caches use interior mutability
/// behind `&self`.
pub trait ComputeBackend {
    /// Identity reported in the `provenance` of every result this backend produces,
    /// unless a [`ComputationResult`] carries its own.
    fn provenance(&self) -> Provenance;

    /// Runs one computation.
    ///
    /// `cancel` is passed through untouched from the caller; backends that support
    /// cancellation should return [`ComputeError::Cancelled`] once it fires.
    fn compute(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        cancel: &CancellationSignal,
    ) -> Result<ComputationResult, ComputeError>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for &B {
    fn provenance(&self) -> Provenance {
        (**self).provenance()
    }

    fn compute(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        cancel: &CancellationSignal,
    ) -> Result<ComputationResult, ComputeError> {
        (**self).compute(molecule, job, cancel)
    }
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn provenance(&self) -> Provenance {
        (**self).provenance()
    }

    fn compute(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        cancel: &CancellationSignal,
    ) -> Result<ComputationResult, ComputeError> {
        (**self).compute(molecule, job, cancel)
    }
}

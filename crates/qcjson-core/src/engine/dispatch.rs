use super::backend::{ComputeBackend, ComputeError};
use super::cancel::CancellationSignal;
use super::config::DispatchConfig;
use super::envelope::{ErrorObject, ResultEnvelope};
use crate::core::models::job::JobDescriptor;
use crate::core::models::molecule::Molecule;
use crate::core::models::result::{ComputationResult, Properties, Provenance};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, instrument, warn};

/// Routine recorded when a backend cannot describe itself.
const DISPATCH_ROUTINE: &str = "qcjson.dispatch";

/// Hands one validated request to a backend and turns whatever comes back into a
/// [`ResultEnvelope`].
///
/// The dispatcher never retries and never lets a backend failure escape: errors,
/// cancellations and panics all end up as failure envelopes.
pub struct Dispatcher<'a, B: ComputeBackend + ?Sized> {
    backend: &'a B,
    config: &'a DispatchConfig,
}

impl<'a, B: ComputeBackend + ?Sized> Dispatcher<'a, B> {
    pub fn new(backend: &'a B, config: &'a DispatchConfig) -> Self {
        Self { backend, config }
    }

    #[instrument(
        skip_all,
        name = "dispatch",
        fields(
            driver = %job.driver(),
            method = job.method(),
            basis = job.basis(),
            natom = molecule.natom()
        )
    )]
    pub fn dispatch(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        cancel: &CancellationSignal,
    ) -> ResultEnvelope {
        let cancel = match self.config.compute_timeout {
            Some(timeout) => cancel.child_with_timeout(timeout),
            None => cancel.clone(),
        };

        debug!("Calling backend.");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.backend.compute(molecule, job, &cancel)
        }))
        .unwrap_or_else(|payload| Err(ComputeError::Panicked(panic_message(payload.as_ref()))));

        let result = outcome.and_then(|result| self.finish(molecule, job, result));
        let fallback = self.backend_provenance();

        match result {
            Ok(result) => {
                info!(
                    properties = result.properties.len(),
                    "Backend finished successfully."
                );
                ResultEnvelope::success(
                    result.provenance.unwrap_or(fallback),
                    result.return_result,
                    result.properties,
                    result.raw_output,
                )
            }
            Err(error) => {
                warn!(error = %error, "Backend computation failed.");
                ResultEnvelope::failure(fallback, ErrorObject::from(&error))
            }
        }
    }

    fn backend_provenance(&self) -> Provenance {
        panic::catch_unwind(AssertUnwindSafe(|| self.backend.provenance())).unwrap_or_else(
            |payload| {
                warn!(
                    panic = %panic_message(payload.as_ref()),
                    "Backend provenance panicked; recording the dispatcher instead."
                );
                Provenance::core(DISPATCH_ROUTINE)
            },
        )
    }

    fn finish(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        mut result: ComputationResult,
    ) -> Result<ComputationResult, ComputeError> {
        result.properties = normalize_property_keys(result.properties);

        if self.config.validate_result_shape {
            validate_result(molecule, job, &result)?;
        }
        if self.config.fill_derived_properties {
            fill_derived_properties(molecule, &mut result.properties);
        }
        Ok(result)
    }
}

fn validate_result(
    molecule: &Molecule,
    job: &JobDescriptor,
    result: &ComputationResult,
) -> Result<(), ComputeError> {
    if !result
        .return_result
        .matches_driver(job.driver(), molecule.natom())
    {
        return Err(ComputeError::InvalidResult(format!(
            "{} driver on {} sites cannot return a {}",
            job.driver(),
            molecule.natom(),
            result.return_result.describe_shape()
        )));
    }
    if !result.return_result.is_finite() {
        return Err(ComputeError::InvalidResult(
            "return_result contains a non-finite number".to_string(),
        ));
    }
    if let Some((name, _)) = result.properties.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ComputeError::InvalidResult(format!(
            "property '{name}' is not a finite number"
        )));
    }
    Ok(())
}

/// Fills counts the core can derive itself. Values the backend reported win.
fn fill_derived_properties(molecule: &Molecule, properties: &mut Properties) {
    let derived = [
        ("calcinfo_natom", molecule.natom() as f64),
        ("calcinfo_nalpha", f64::from(molecule.alpha_electrons())),
        ("calcinfo_nbeta", f64::from(molecule.beta_electrons())),
        ("nuclear_repulsion_energy", molecule.nuclear_repulsion_energy()),
    ];
    for (name, value) in derived {
        if value.is_finite() {
            properties.entry(name.to_string()).or_insert(value);
        }
    }
}

/// Rewrites property names into lower snake case; the first spelling of a
/// colliding name is kept.
pub fn normalize_property_keys(properties: Properties) -> Properties {
    let mut normalized = Properties::new();
    for (name, value) in properties {
        let key = snake_case(&name);
        if normalized.contains_key(&key) {
            warn!(property = %name, normalized = %key, "Dropping duplicate property.");
            continue;
        }
        normalized.insert(key, value);
    }
    normalized
}

fn snake_case(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

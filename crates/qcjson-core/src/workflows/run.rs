use crate::core::document::{Document, DocumentError};
use crate::core::models::job::JobDescriptor;
use crate::core::models::molecule::Molecule;
use crate::core::models::result::Provenance;
use crate::core::schema::registry::SchemaRegistry;
use crate::engine::backend::ComputeBackend;
use crate::engine::cancel::CancellationSignal;
use crate::engine::config::DispatchConfig;
use crate::engine::dispatch::Dispatcher;
use crate::engine::embed::embed;
use crate::engine::envelope::ResultEnvelope;
use crate::engine::error::PipelineError;
use crate::engine::progress::{Phase, Progress, ProgressReporter};
use rayon::prelude::*;
use tracing::{info, instrument, warn};

/// Routine name recorded in the provenance of documents rejected before dispatch.
const VALIDATION_ROUTINE: &str = "qcjson.validate";

/// A document that passed every validation stage and is ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedJob {
    schema_version: u32,
    molecule: Molecule,
    job: JobDescriptor,
    return_output: bool,
}

impl PreparedJob {
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    pub fn job(&self) -> &JobDescriptor {
        &self.job
    }

    /// Whether the caller asked for the backend's log to be embedded.
    pub fn return_output(&self) -> bool {
        self.return_output
    }
}

/// Runs schema validation, molecule construction and job construction, in that order.
///
/// # Errors
///
/// Returns the first failing stage as a [`PipelineError`]. The document is only read.
pub fn prepare(
    document: &Document,
    registry: &SchemaRegistry,
) -> Result<PreparedJob, PipelineError> {
    let request = registry.validate_and_normalize(document)?;
    let molecule = Molecule::build(&request.molecule)?;
    let job = JobDescriptor::build(&request.driver, &request.model, request.keywords)?;
    Ok(PreparedJob {
        schema_version: request.schema_version,
        molecule,
        job,
        return_output: request.return_output,
    })
}

/// Processes one document against the default `QC_JSON` registry.
///
/// See [`run_with_registry`].
pub fn run<B: ComputeBackend + ?Sized>(
    document: Document,
    backend: &B,
    config: &DispatchConfig,
    cancel: &CancellationSignal,
    reporter: &ProgressReporter,
) -> Document {
    run_with_registry(
        document,
        &SchemaRegistry::default(),
        backend,
        config,
        cancel,
        reporter,
    )
}

/// Validates `document`, dispatches it at most once, and embeds the outcome.
///
/// Always returns the document. Validation failures are embedded as
/// `schema_error`, `molecule_error` or `job_error` without calling the backend;
/// backend failures are embedded by the dispatcher. Keys other than the output keys
/// come back exactly as they went in.
#[instrument(skip_all, name = "qcjson_run")]
pub fn run_with_registry<B: ComputeBackend + ?Sized>(
    document: Document,
    registry: &SchemaRegistry,
    backend: &B,
    config: &DispatchConfig,
    cancel: &CancellationSignal,
    reporter: &ProgressReporter,
) -> Document {
    let prepared = reporter.phase(Phase::Validating, || prepare(&document, registry));

    let envelope = match prepared {
        Ok(prepared) => {
            info!(
                schema_version = prepared.schema_version,
                driver = %prepared.job.driver(),
                natom = prepared.molecule.natom(),
                ghosts = prepared.molecule.ghost_count(),
                "Document validated."
            );
            let envelope = reporter.phase(Phase::Computing, || {
                Dispatcher::new(backend, config).dispatch(&prepared.molecule, &prepared.job, cancel)
            });
            if prepared.return_output {
                envelope
            } else {
                envelope.without_raw_output()
            }
        }
        Err(error) => {
            warn!(kind = %error.kind(), error = %error, "Document rejected before dispatch.");
            ResultEnvelope::failure(Provenance::core(VALIDATION_ROUTINE), error.to_error_object())
        }
    };

    reporter.phase(Phase::Embedding, || embed(document, envelope))
}

/// Text-in, text-out variant of [`run`].
///
/// # Errors
///
/// Fails only when `input` is not a JSON object; anything wrong inside the object
/// is embedded into the returned document instead.
pub fn run_json<B: ComputeBackend + ?Sized>(
    input: &str,
    backend: &B,
    config: &DispatchConfig,
    cancel: &CancellationSignal,
    reporter: &ProgressReporter,
) -> Result<String, DocumentError> {
    let document = Document::from_json_str(input)?;
    run(document, backend, config, cancel, reporter).to_json_string(false)
}

/// Processes many documents in parallel on the rayon pool.
///
/// Each worker owns its document outright; the backend is shared and therefore
/// must be `Sync`. Outputs come back in input order.
#[instrument(skip_all, name = "qcjson_batch", fields(documents = documents.len()))]
pub fn run_batch<B: ComputeBackend + Sync + ?Sized>(
    documents: Vec<Document>,
    registry: &SchemaRegistry,
    backend: &B,
    config: &DispatchConfig,
    cancel: &CancellationSignal,
    reporter: &ProgressReporter,
) -> Vec<Document> {
    reporter.report(Progress::BatchStart {
        documents: documents.len() as u64,
    });

    let silent = ProgressReporter::new();
    let results: Vec<Document> = documents
        .into_par_iter()
        .map(|document| {
            let output = run_with_registry(document, registry, backend, config, cancel, &silent);
            reporter.report(Progress::DocumentFinished {
                success: is_success(&output),
            });
            output
        })
        .collect();

    let failed = results.iter().filter(|doc| !is_success(doc)).count();
    info!(total = results.len(), failed, "Batch finished.");
    reporter.report(Progress::BatchFinish);
    results
}

/// Reads the `success` flag written by the embedder.
pub fn is_success(document: &Document) -> bool {
    document
        .get("success")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

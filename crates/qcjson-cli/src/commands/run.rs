use crate::cli::RunArgs;
use crate::config::{BackendSpec, PartialRunConfig};
use crate::error::{CliError, Result};
use crate::utils::io::{read_document, write_documents};
use crate::utils::progress::CliProgressHandler;
use qcjson::backends::command::CommandBackend;
use qcjson::backends::recorded::RecordedBackend;
use qcjson::core::schema::registry::SchemaRegistry;
use qcjson::engine::backend::ComputeBackend;
use qcjson::engine::cancel::CancellationSignal;
use qcjson::engine::progress::ProgressReporter;
use qcjson::workflows::run as workflow;
use std::path::PathBuf;
use tracing::{info, warn};

type SharedBackend = Box<dyn ComputeBackend + Send + Sync>;

pub async fn run(args: RunArgs, cancel: CancellationSignal) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialRunConfig::from_file(path)?,
        None => PartialRunConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let backend = build_backend(&config.backend)?;
    info!(creator = %backend.provenance().creator, "Backend ready.");

    let mut inputs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        info!("Loading job document from {:?}", path);
        inputs.push(read_document(path)?);
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let registry = SchemaRegistry::default();

    let outputs = tokio::task::block_in_place(|| {
        if inputs.len() == 1 {
            inputs
                .into_iter()
                .map(|document| {
                    workflow::run_with_registry(
                        document,
                        &registry,
                        backend.as_ref(),
                        &config.dispatch,
                        &cancel,
                        &reporter,
                    )
                })
                .collect::<Vec<_>>()
        } else {
            workflow::run_batch(
                inputs,
                &registry,
                backend.as_ref(),
                &config.dispatch,
                &cancel,
                &reporter,
            )
        }
    });

    let total = outputs.len();
    let failed = outputs.iter().filter(|doc| !workflow::is_success(doc)).count();
    let labelled: Vec<(PathBuf, _)> = args.inputs.iter().cloned().zip(outputs).collect();
    write_documents(&labelled, args.output.as_deref(), config.pretty)?;

    if failed > 0 {
        warn!(failed, total, "Some documents did not succeed.");
        return Err(CliError::DocumentsFailed { failed, total });
    }
    info!(total, "All documents succeeded.");
    Ok(())
}

fn build_backend(spec: &BackendSpec) -> Result<SharedBackend> {
    match spec {
        BackendSpec::Command {
            program,
            args,
            working_dir,
            provenance,
        } => {
            let mut backend = CommandBackend::new(program).args(args.iter().cloned());
            if let Some(dir) = working_dir {
                backend = backend.working_dir(dir);
            }
            if let Some(provenance) = provenance {
                backend = backend.with_provenance(provenance.clone());
            }
            Ok(Box::new(backend))
        }
        BackendSpec::Recorded { path } => {
            info!("Loading recorded results from {:?}", path);
            Ok(Box::new(RecordedBackend::load(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcjson::core::models::result::Provenance;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn recorded_backend_is_loaded_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.toml");
        fs::write(
            &path,
            "[provenance]\ncreator = \"Psi4\"\nversion = \"1.9.1\"\nroutine = \"energy\"\n",
        )
        .unwrap();

        let backend = build_backend(&BackendSpec::Recorded { path }).unwrap();
        assert_eq!(backend.provenance().creator, "Psi4");
    }

    #[test]
    fn missing_recorded_file_is_reported() {
        let result = build_backend(&BackendSpec::Recorded {
            path: PathBuf::from("/nonexistent/records.toml"),
        });
        assert!(matches!(result, Err(CliError::Records(_))));
    }

    #[test]
    fn command_backend_keeps_configured_provenance() {
        let backend = build_backend(&BackendSpec::Command {
            program: PathBuf::from("psi4-json"),
            args: vec![],
            working_dir: None,
            provenance: Some(Provenance::new("Psi4", "1.9.1", "command")),
        })
        .unwrap();
        assert_eq!(backend.provenance().version, "1.9.1");
    }
}

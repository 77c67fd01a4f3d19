use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};
use crate::utils::io::read_document;
use qcjson::core::schema::registry::SchemaRegistry;
use qcjson::workflows::run::{PreparedJob, prepare};
use tracing::{info, warn};

pub async fn run(args: ValidateArgs) -> Result<()> {
    let registry = SchemaRegistry::default();
    let total = args.inputs.len();
    let mut failed = 0;

    for path in &args.inputs {
        let document = match read_document(path) {
            Ok(document) => document,
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", path.display(), e);
                continue;
            }
        };

        match prepare(&document, &registry) {
            Ok(prepared) => {
                info!("{} is valid.", path.display());
                println!("✓ {}: {}", path.display(), summarize(&prepared));
            }
            Err(e) => {
                failed += 1;
                warn!(kind = %e.kind(), "{} is invalid.", path.display());
                println!("✗ {}: [{}] {}", path.display(), e.kind(), e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::DocumentsFailed { failed, total });
    }
    Ok(())
}

fn summarize(prepared: &PreparedJob) -> String {
    let molecule = prepared.molecule();
    let job = prepared.job();
    format!(
        "schema v{}, {} {}/{}, {} site(s) ({} ghost), charge {}, multiplicity {}",
        prepared.schema_version(),
        job.driver(),
        job.method(),
        job.basis(),
        molecule.natom(),
        molecule.ghost_count(),
        molecule.molecular_charge(),
        molecule.multiplicity()
    )
}

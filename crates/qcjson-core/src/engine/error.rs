use super::envelope::{ErrorKind, ErrorObject};
use crate::core::models::job::JobError;
use crate::core::models::molecule::MoleculeError;
use crate::core::schema::error::SchemaError;
use thiserror::Error;

/// Any failure that stops a document before it reaches a backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Schema validation failed: {source}")]
    Schema {
        #[from]
        source: SchemaError,
    },

    #[error("Invalid molecule: {source}")]
    Molecule {
        #[from]
        source: MoleculeError,
    },

    #[error("Invalid job: {source}")]
    Job {
        #[from]
        source: JobError,
    },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Schema { .. } => ErrorKind::SchemaError,
            PipelineError::Molecule { .. } => ErrorKind::MoleculeError,
            PipelineError::Job { .. } => ErrorKind::JobError,
        }
    }

    /// The embedded form: the kind names the stage, the message is the inner error.
    pub fn to_error_object(&self) -> ErrorObject {
        let message = match self {
            PipelineError::Schema { source } => source.to_string(),
            PipelineError::Molecule { source } => source.to_string(),
            PipelineError::Job { source } => source.to_string(),
        };
        ErrorObject::new(self.kind(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_stage_maps_to_its_own_kind() {
        let schema: PipelineError = SchemaError::MissingField("driver".to_string()).into();
        let molecule: PipelineError = MoleculeError::NoRealAtoms.into();
        let job: PipelineError = JobError::EmptyBasis.into();

        assert_eq!(schema.kind(), ErrorKind::SchemaError);
        assert_eq!(molecule.kind(), ErrorKind::MoleculeError);
        assert_eq!(job.kind(), ErrorKind::JobError);
    }

    #[test]
    fn error_object_carries_the_inner_message() {
        let error: PipelineError = JobError::UnknownDriver("optimize".to_string()).into();
        let object = error.to_error_object();
        assert_eq!(object.kind, ErrorKind::JobError);
        assert!(object.message.contains("optimize"));
        assert!(object.diagnostics.is_none());
    }
}

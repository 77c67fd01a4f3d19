use super::backend::ComputeError;
use crate::core::models::result::{Properties, Provenance, ReturnResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category of an embedded error, written as the `error.kind` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SchemaError,
    MoleculeError,
    JobError,
    ComputeError,
    CancellationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SchemaError => "schema_error",
            ErrorKind::MoleculeError => "molecule_error",
            ErrorKind::JobError => "job_error",
            ErrorKind::ComputeError => "compute_error",
            ErrorKind::CancellationError => "cancellation_error",
        }
    }

    /// `true` for kinds raised before any backend was invoked.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::SchemaError | ErrorKind::MoleculeError | ErrorKind::JobError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `error` object embedded into a failed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Value>,
}

impl ErrorObject {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            diagnostics: None,
        }
    }
}

impl From<&ComputeError> for ErrorObject {
    fn from(error: &ComputeError) -> Self {
        let kind = match error {
            ComputeError::Cancelled { .. } => ErrorKind::CancellationError,
            _ => ErrorKind::ComputeError,
        };
        Self {
            kind,
            message: error.to_string(),
            diagnostics: error.diagnostics().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        return_result: ReturnResult,
        properties: Properties,
        raw_output: Option<String>,
    },
    Failure(ErrorObject),
}

/// The outcome of one dispatch, waiting to be embedded into its document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEnvelope {
    provenance: Provenance,
    outcome: Outcome,
}

impl ResultEnvelope {
    pub fn success(
        provenance: Provenance,
        return_result: ReturnResult,
        properties: Properties,
        raw_output: Option<String>,
    ) -> Self {
        Self {
            provenance,
            outcome: Outcome::Success {
                return_result,
                properties,
                raw_output,
            },
        }
    }

    pub fn failure(provenance: Provenance, error: ErrorObject) -> Self {
        Self {
            provenance,
            outcome: Outcome::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Failure(error) => Some(error),
            Outcome::Success { .. } => None,
        }
    }

    pub fn return_result(&self) -> Option<&ReturnResult> {
        match &self.outcome {
            Outcome::Success { return_result, .. } => Some(return_result),
            Outcome::Failure(_) => None,
        }
    }

    pub fn properties(&self) -> Option<&Properties> {
        match &self.outcome {
            Outcome::Success { properties, .. } => Some(properties),
            Outcome::Failure(_) => None,
        }
    }

    /// Drops the backend log; used when the caller did not ask for `return_output`.
    pub fn without_raw_output(mut self) -> Self {
        if let Outcome::Success { raw_output, .. } = &mut self.outcome {
            *raw_output = None;
        }
        self
    }

    pub fn into_parts(self) -> (Provenance, Outcome) {
        (self.provenance, self.outcome)
    }
}

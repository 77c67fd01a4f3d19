use crate::core::models::job::{Driver, JobDescriptor, KeywordValue, Keywords};
use crate::core::models::molecule::Molecule;
use crate::core::models::result::{ComputationResult, Properties, Provenance, ReturnResult};
use crate::engine::backend::{ComputeBackend, ComputeError};
use crate::engine::cancel::CancellationSignal;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const DEFAULT_GEOMETRY_TOLERANCE: f64 = 1.0e-6;

#[derive(Debug, Error)]
pub enum RecordLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// One stored computation and the request it answers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    pub driver: Driver,
    pub method: String,
    pub basis: String,
    pub symbols: Vec<String>,
    /// Defaults to every site real.
    #[serde(default)]
    pub real: Option<Vec<bool>>,
    /// When present, the request geometry must agree within `tolerance`.
    #[serde(default)]
    pub geometry: Option<Vec<f64>>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Keywords the request must carry; extra request keywords are ignored.
    #[serde(default)]
    pub keywords: Keywords,
    #[serde(default)]
    pub return_result: Option<ReturnResult>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub raw_output: Option<String>,
    /// Replays a backend failure instead of a result.
    #[serde(default)]
    pub failure: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordFile {
    #[serde(default)]
    provenance: Option<Provenance>,
    #[serde(default)]
    records: Vec<Record>,
}

/// Serves results captured from earlier runs.
///
/// Used for regression fixtures and offline demos: a request is answered by the
/// first record whose driver, model, symbols and ghost flags match it.
#[derive(Debug, Clone)]
pub struct RecordedBackend {
    provenance: Provenance,
    records: Vec<Record>,
}

impl RecordedBackend {
    pub fn new(provenance: Provenance, records: Vec<Record>) -> Self {
        Self {
            provenance,
            records,
        }
    }

    pub fn load(path: &Path) -> Result<Self, RecordLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| RecordLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| RecordLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: RecordFile = toml::from_str(content)?;
        let provenance = file
            .provenance
            .unwrap_or_else(|| Provenance::core("recorded"));
        Ok(Self::new(provenance, file.records))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    fn find(&self, molecule: &Molecule, job: &JobDescriptor) -> Option<&Record> {
        self.records.iter().find(|r| r.matches(molecule, job))
    }
}

impl Record {
    fn matches(&self, molecule: &Molecule, job: &JobDescriptor) -> bool {
        if self.driver != job.driver()
            || !self.method.eq_ignore_ascii_case(job.method())
            || !self.basis.eq_ignore_ascii_case(job.basis())
        {
            return false;
        }

        let symbols = molecule.symbols();
        if self.symbols.len() != symbols.len()
            || !self
                .symbols
                .iter()
                .zip(&symbols)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
        {
            return false;
        }

        let real = molecule.real_flags();
        let real_matches = match &self.real {
            Some(flags) => *flags == real,
            None => real.iter().all(|r| *r),
        };
        if !real_matches {
            return false;
        }

        if let Some(geometry) = &self.geometry {
            let tolerance = self.tolerance.unwrap_or(DEFAULT_GEOMETRY_TOLERANCE);
            let actual = molecule.geometry();
            if geometry.len() != actual.len()
                || geometry
                    .iter()
                    .zip(&actual)
                    .any(|(a, b)| (a - b).abs() > tolerance)
            {
                return false;
            }
        }

        self.keywords.iter().all(|(name, expected)| {
            job.keywords()
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .is_some_and(|(_, actual)| keyword_matches(expected, actual))
        })
    }
}

fn keyword_matches(expected: &KeywordValue, actual: &KeywordValue) -> bool {
    match (expected, actual) {
        (KeywordValue::String(a), KeywordValue::String(b)) => a.eq_ignore_ascii_case(b),
        (KeywordValue::Integer(a), KeywordValue::Float(b))
        | (KeywordValue::Float(b), KeywordValue::Integer(a)) => *a as f64 == *b,
        (KeywordValue::List(a), KeywordValue::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| keyword_matches(x, y))
        }
        _ => expected == actual,
    }
}

impl ComputeBackend for RecordedBackend {
    fn provenance(&self) -> Provenance {
        self.provenance.clone()
    }

    fn compute(
        &self,
        molecule: &Molecule,
        job: &JobDescriptor,
        cancel: &CancellationSignal,
    ) -> Result<ComputationResult, ComputeError> {
        if let Some(reason) = cancel.reason() {
            return Err(ComputeError::Cancelled {
                reason: reason.to_string(),
            });
        }

        let record = self.find(molecule, job).ok_or_else(|| {
            ComputeError::Unsupported(format!(
                "no recorded {} result for {}/{} on [{}]",
                job.driver(),
                job.method(),
                job.basis(),
                molecule.symbols().join(", ")
            ))
        })?;
        debug!(method = %record.method, basis = %record.basis, "Replaying recorded result.");

        if let Some(message) = &record.failure {
            return Err(ComputeError::failed(message.clone()));
        }
        let return_result = record.return_result.clone().ok_or_else(|| {
            ComputeError::InvalidResult(
                "recorded entry has neither a result nor a failure".to_string(),
            )
        })?;

        Ok(ComputationResult {
            return_result,
            properties: record.properties.clone(),
            provenance: None,
            raw_output: record.raw_output.clone(),
        })
    }
}

use super::job::Driver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named scalar results, keyed in lower snake case (e.g. `scf_total_energy`).
pub type Properties = BTreeMap<String, f64>;

/// The primary result of a computation. Its shape depends on the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReturnResult {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
    Map(BTreeMap<String, f64>),
}

impl ReturnResult {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ReturnResult::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            ReturnResult::Scalar(v) => v.is_finite(),
            ReturnResult::Vector(values) => values.iter().all(|v| v.is_finite()),
            ReturnResult::Matrix(rows) => rows.iter().flatten().all(|v| v.is_finite()),
            ReturnResult::Map(values) => values.values().all(|v| v.is_finite()),
        }
    }

    /// Checks that this result has the shape `driver` promises for `natom` sites.
    ///
    /// Gradients and Hessians may come either flattened or as row-major matrices.
    pub fn matches_driver(&self, driver: Driver, natom: usize) -> bool {
        let n3 = 3 * natom;
        match (driver, self) {
            (Driver::Energy, ReturnResult::Scalar(_)) => true,
            (Driver::Gradient, ReturnResult::Vector(v)) => v.len() == n3,
            (Driver::Gradient, ReturnResult::Matrix(rows)) => {
                rows.len() == natom && rows.iter().all(|r| r.len() == 3)
            }
            (Driver::Hessian, ReturnResult::Vector(v)) => v.len() == n3 * n3,
            (Driver::Hessian, ReturnResult::Matrix(rows)) => {
                rows.len() == n3 && rows.iter().all(|r| r.len() == n3)
            }
            (Driver::Properties, ReturnResult::Map(_)) => true,
            _ => false,
        }
    }

    /// Human-readable shape, for error messages.
    pub fn describe_shape(&self) -> String {
        match self {
            ReturnResult::Scalar(_) => "scalar".to_string(),
            ReturnResult::Vector(v) => format!("vector of {}", v.len()),
            ReturnResult::Matrix(rows) => format!(
                "{}x{} matrix",
                rows.len(),
                rows.first().map_or(0, Vec::len)
            ),
            ReturnResult::Map(m) => format!("map of {} entries", m.len()),
        }
    }
}

/// What produced a result: program name, version and entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub creator: String,
    pub version: String,
    pub routine: String,
}

impl Provenance {
    pub fn new(creator: &str, version: &str, routine: &str) -> Self {
        Self {
            creator: creator.to_string(),
            version: version.to_string(),
            routine: routine.to_string(),
        }
    }

    /// Provenance of this library, used when a document never reached a backend.
    pub fn core(routine: &str) -> Self {
        Self::new("qcjson", env!("CARGO_PKG_VERSION"), routine)
    }
}

/// What a backend hands back on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationResult {
    pub return_result: ReturnResult,
    #[serde(default)]
    pub properties: Properties,
    /// Overrides the backend's static provenance when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    /// The backend's textual log, embedded only when the caller asked for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl ComputationResult {
    pub fn new(return_result: ReturnResult) -> Self {
        Self {
            return_result,
            properties: Properties::new(),
            provenance: None,
            raw_output: None,
        }
    }

    pub fn with_property(mut self, name: &str, value: f64) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }
}

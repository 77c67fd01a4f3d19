use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum JobError {
    #[error("Unknown driver '{0}'. Expected one of: energy, gradient, hessian, properties")]
    UnknownDriver(String),
    #[error("Model method must be a non-empty string")]
    EmptyMethod,
    #[error("Model basis must be a non-empty string")]
    EmptyBasis,
}

/// The category of computation requested. Determines the shape of `return_result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// A single total energy (scalar result).
    Energy,
    /// Nuclear gradient, 3N values.
    Gradient,
    /// Nuclear Hessian, (3N)² values.
    Hessian,
    /// A named set of molecular properties.
    Properties,
}

impl Driver {
    pub const ALL: [Driver; 4] = [
        Driver::Energy,
        Driver::Gradient,
        Driver::Hessian,
        Driver::Properties,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Energy => "energy",
            Driver::Gradient => "gradient",
            Driver::Hessian => "hessian",
            Driver::Properties => "properties",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Driver {
    type Err = JobError;

    /// Parses a driver name. Names are exact: `"Energy"` or `" energy"` is unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "energy" => Ok(Driver::Energy),
            "gradient" => Ok(Driver::Gradient),
            "hessian" => Ok(Driver::Hessian),
            "properties" => Ok(Driver::Properties),
            _ => Err(JobError::UnknownDriver(s.to_string())),
        }
    }
}

/// Method and basis set, both opaque to the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub method: String,
    pub basis: String,
}

impl ModelSpec {
    pub fn new(method: &str, basis: &str) -> Self {
        Self {
            method: method.to_string(),
            basis: basis.to_string(),
        }
    }
}

/// A single backend keyword value.
///
/// The core never interprets these; it only guarantees they are scalars (or flat
/// lists of scalars, as used for occupation vectors and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<KeywordValue>),
}

impl KeywordValue {
    /// Converts a JSON value, returning `None` for `null`, objects, and lists
    /// containing either.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(KeywordValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(KeywordValue::Integer(i)),
                None => n.as_f64().map(KeywordValue::Float),
            },
            Value::String(s) => Some(KeywordValue::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(KeywordValue::List),
            Value::Null | Value::Object(_) => None,
        }
    }
}

pub type Keywords = BTreeMap<String, KeywordValue>;

/// A validated request for one computation: what to compute and with which model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDescriptor {
    driver: Driver,
    model: ModelSpec,
    keywords: Keywords,
}

impl JobDescriptor {
    /// Builds a descriptor from normalized request parts.
    ///
    /// The driver is resolved to [`Driver`] here, so an unknown driver is a
    /// validation failure and can never surface as a backend error. Method and
    /// basis are passed through verbatim once they are known to be non-empty.
    ///
    /// # Errors
    ///
    /// * [`JobError::UnknownDriver`] for an unrecognized driver name.
    /// * [`JobError::EmptyMethod`] / [`JobError::EmptyBasis`] for blank model strings.
    pub fn build(driver: &str, model: &ModelSpec, keywords: Keywords) -> Result<Self, JobError> {
        let driver = Driver::from_str(driver)?;
        if model.method.trim().is_empty() {
            return Err(JobError::EmptyMethod);
        }
        if model.basis.trim().is_empty() {
            return Err(JobError::EmptyBasis);
        }
        Ok(Self {
            driver,
            model: model.clone(),
            keywords,
        })
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub fn method(&self) -> &str {
        &self.model.method
    }

    pub fn basis(&self) -> &str {
        &self.model.basis
    }

    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scf_model() -> ModelSpec {
        ModelSpec::new("SCF", "cc-pVDZ")
    }

    #[test]
    fn driver_from_str_parses_known_drivers() {
        for driver in Driver::ALL {
            assert_eq!(Driver::from_str(driver.as_str()), Ok(driver));
        }
    }

    #[test]
    fn driver_names_must_match_exactly() {
        for name in ["ENERGY", "Energy", " gradient", "hessian "] {
            assert_eq!(
                Driver::from_str(name),
                Err(JobError::UnknownDriver(name.to_string()))
            );
        }
    }

    #[test]
    fn driver_from_str_rejects_unknown_names() {
        assert_eq!(
            Driver::from_str("optimize"),
            Err(JobError::UnknownDriver("optimize".to_string()))
        );
        assert!(Driver::from_str("").is_err());
    }

    #[test]
    fn build_passes_model_and_keywords_through_verbatim() {
        let mut keywords = Keywords::new();
        keywords.insert("scf_type".to_string(), KeywordValue::String("df".into()));
        let job = JobDescriptor::build("energy", &scf_model(), keywords.clone()).unwrap();

        assert_eq!(job.driver(), Driver::Energy);
        assert_eq!(job.method(), "SCF");
        assert_eq!(job.basis(), "cc-pVDZ");
        assert_eq!(job.keywords(), &keywords);
    }

    #[test]
    fn build_fails_on_unknown_driver() {
        let err = JobDescriptor::build("frequency", &scf_model(), Keywords::new()).unwrap_err();
        assert_eq!(err, JobError::UnknownDriver("frequency".to_string()));
    }

    #[test]
    fn build_fails_on_blank_method_or_basis() {
        let blank_method = ModelSpec::new("  ", "cc-pVDZ");
        assert_eq!(
            JobDescriptor::build("energy", &blank_method, Keywords::new()),
            Err(JobError::EmptyMethod)
        );
        let blank_basis = ModelSpec::new("SCF", "");
        assert_eq!(
            JobDescriptor::build("energy", &blank_basis, Keywords::new()),
            Err(JobError::EmptyBasis)
        );
    }

    #[test]
    fn keyword_value_from_json_maps_scalars_and_lists() {
        assert_eq!(KeywordValue::from_json(&json!(true)), Some(KeywordValue::Bool(true)));
        assert_eq!(KeywordValue::from_json(&json!(50)), Some(KeywordValue::Integer(50)));
        assert_eq!(KeywordValue::from_json(&json!(1e-8)), Some(KeywordValue::Float(1e-8)));
        assert_eq!(
            KeywordValue::from_json(&json!("df")),
            Some(KeywordValue::String("df".into()))
        );
        assert_eq!(
            KeywordValue::from_json(&json!([3, 0, 1, 1])),
            Some(KeywordValue::List(vec![
                KeywordValue::Integer(3),
                KeywordValue::Integer(0),
                KeywordValue::Integer(1),
                KeywordValue::Integer(1),
            ]))
        );
    }

    #[test]
    fn keyword_value_from_json_rejects_null_and_objects() {
        assert_eq!(KeywordValue::from_json(&json!(null)), None);
        assert_eq!(KeywordValue::from_json(&json!({"a": 1})), None);
        assert_eq!(KeywordValue::from_json(&json!([1, null])), None);
    }

    #[test]
    fn job_serializes_with_lowercase_driver() {
        let job = JobDescriptor::build("Hessian", &scf_model(), Keywords::new()).unwrap();
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(
            value,
            json!({
                "driver": "hessian",
                "model": {"method": "SCF", "basis": "cc-pVDZ"},
                "keywords": {}
            })
        );
    }
}

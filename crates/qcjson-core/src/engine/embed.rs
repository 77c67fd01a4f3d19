use super::envelope::{ErrorObject, Outcome, ResultEnvelope};
use crate::core::document::Document;
use crate::core::models::result::{Properties, Provenance, ReturnResult};
use serde_json::{Map, Value, json};

/// Prefix of count-like properties that are written as JSON integers.
const INTEGRAL_PREFIX: &str = "calcinfo_";

/// Writes `envelope` into `document` and returns it.
///
/// Only the protocol's output keys are touched. On success a stale `error` is
/// removed; on failure stale `return_result`, `properties` and `raw_output` are.
pub fn embed(mut document: Document, envelope: ResultEnvelope) -> Document {
    embed_in_place(&mut document, envelope);
    document
}

pub fn embed_in_place(document: &mut Document, envelope: ResultEnvelope) {
    let (provenance, outcome) = envelope.into_parts();
    match outcome {
        Outcome::Success {
            return_result,
            properties,
            raw_output,
        } => {
            document.insert("success", Value::Bool(true));
            document.insert("return_result", return_result_value(&return_result));
            document.insert("properties", properties_value(&properties));
            document.insert("provenance", provenance_value(&provenance));
            match raw_output {
                Some(text) => {
                    document.insert("raw_output", Value::String(text));
                }
                None => {
                    document.remove("raw_output");
                }
            }
            document.remove("error");
        }
        Outcome::Failure(error) => {
            document.insert("success", Value::Bool(false));
            document.insert("error", error_value(error));
            document.insert("provenance", provenance_value(&provenance));
            for stale in ["return_result", "properties", "raw_output"] {
                document.remove(stale);
            }
        }
    }
}

fn return_result_value(result: &ReturnResult) -> Value {
    match result {
        ReturnResult::Scalar(v) => Value::from(*v),
        ReturnResult::Vector(values) => values.iter().copied().map(Value::from).collect(),
        ReturnResult::Matrix(rows) => rows
            .iter()
            .map(|row| row.iter().copied().map(Value::from).collect::<Value>())
            .collect(),
        ReturnResult::Map(values) => Value::Object(
            values
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(*v)))
                .collect(),
        ),
    }
}

fn properties_value(properties: &Properties) -> Value {
    let mut map = Map::new();
    for (name, &value) in properties {
        map.insert(name.clone(), property_value(name, value));
    }
    Value::Object(map)
}

fn property_value(name: &str, value: f64) -> Value {
    let integral = value.fract() == 0.0 && value.abs() < i64::MAX as f64;
    if name.starts_with(INTEGRAL_PREFIX) && integral {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn provenance_value(provenance: &Provenance) -> Value {
    json!({
        "creator": provenance.creator,
        "version": provenance.version,
        "routine": provenance.routine,
    })
}

fn error_value(error: ErrorObject) -> Value {
    let mut map = Map::new();
    map.insert("kind".to_string(), json!(error.kind.as_str()));
    map.insert("message".to_string(), Value::String(error.message));
    if let Some(diagnostics) = error.diagnostics {
        map.insert("diagnostics".to_string(), diagnostics);
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::envelope::ErrorKind;

    fn request() -> Document {
        Document::from_value(json!({
            "schema_name": "QC_JSON",
            "schema_version": 0,
            "driver": "energy",
            "comment": "kept verbatim",
            "nested": {"tag": [1, 2, 3]}
        }))
        .unwrap()
    }

    fn success() -> ResultEnvelope {
        let mut properties = Properties::new();
        properties.insert("calcinfo_nbasis".to_string(), 10.0);
        properties.insert("scf_total_energy".to_string(), -2.85518836280515);
        properties.insert("nuclear_repulsion_energy".to_string(), 0.0);
        ResultEnvelope::success(
            Provenance::new("psi4", "1.9", "scf"),
            ReturnResult::Scalar(-2.85518836280515),
            properties,
            Some("SCF converged".to_string()),
        )
    }

    #[test]
    fn success_writes_outputs_and_keeps_caller_keys() {
        let doc = embed(request(), success());

        assert_eq!(doc.get("success"), Some(&json!(true)));
        assert_eq!(doc.get("return_result"), Some(&json!(-2.85518836280515)));
        assert_eq!(doc.get("raw_output"), Some(&json!("SCF converged")));
        assert_eq!(doc.get("provenance").unwrap()["creator"], json!("psi4"));
        assert_eq!(doc.get("comment"), Some(&json!("kept verbatim")));
        assert_eq!(doc.get("nested"), Some(&json!({"tag": [1, 2, 3]})));
        assert!(!doc.contains_key("error"));
    }

    #[test]
    fn calcinfo_counts_are_integers_and_energies_are_floats() {
        let doc = embed(request(), success());
        let properties = doc.get("properties").unwrap();

        assert!(properties["calcinfo_nbasis"].is_u64());
        assert_eq!(properties["calcinfo_nbasis"], json!(10));
        assert!(properties["nuclear_repulsion_energy"].is_f64());
        assert!(properties["scf_total_energy"].is_f64());
    }

    #[test]
    fn failure_removes_stale_results() {
        let first = embed(request(), success());
        let error = ErrorObject::new(ErrorKind::ComputeError, "backend crashed");
        let doc = embed(
            first,
            ResultEnvelope::failure(Provenance::new("psi4", "1.9", "scf"), error),
        );

        assert_eq!(doc.get("success"), Some(&json!(false)));
        assert_eq!(
            doc.get("error"),
            Some(&json!({"kind": "compute_error", "message": "backend crashed"}))
        );
        for key in ["return_result", "properties", "raw_output"] {
            assert!(!doc.contains_key(key), "{key} should have been removed");
        }
        assert_eq!(doc.get("comment"), Some(&json!("kept verbatim")));
    }

    #[test]
    fn success_removes_stale_error() {
        let mut doc = request();
        doc.insert("error", json!({"kind": "schema_error", "message": "old"}));
        doc.insert("raw_output", json!("old log"));

        let envelope = ResultEnvelope::success(
            Provenance::core("run"),
            ReturnResult::Vector(vec![0.0, 0.0, 0.1]),
            Properties::new(),
            None,
        );
        embed_in_place(&mut doc, envelope);

        assert!(!doc.contains_key("error"));
        assert!(!doc.contains_key("raw_output"));
        assert_eq!(doc.get("return_result"), Some(&json!([0.0, 0.0, 0.1])));
    }

    #[test]
    fn only_output_keys_are_added() {
        let before: Vec<String> = request().keys().cloned().collect();
        let doc = embed(request(), success());

        for key in doc.keys() {
            assert!(
                before.contains(key) || crate::core::document::OUTPUT_KEYS.contains(&key.as_str()),
                "unexpected key {key}"
            );
        }
    }

    #[test]
    fn diagnostics_are_embedded_when_present() {
        let mut error = ErrorObject::new(ErrorKind::ComputeError, "failed");
        error.diagnostics = Some(json!({"status": 1, "stderr": "segfault"}));
        let doc = embed(
            request(),
            ResultEnvelope::failure(Provenance::core("run"), error),
        );
        assert_eq!(doc.get("error").unwrap()["diagnostics"]["status"], json!(1));
    }
}

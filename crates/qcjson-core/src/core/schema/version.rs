use super::error::SchemaError;
use super::normalized::{NormalizedMolecule, NormalizedRequest};
use crate::core::document::{Document, json_type_name};
use crate::core::models::job::{KeywordValue, Keywords, ModelSpec};
use serde_json::{Map, Value};

/// Default-filling and extraction rules for one schema version.
///
/// The registry has already checked `schema_name` and `schema_version` when a
/// strategy runs; the strategy only turns the remaining fields into a
/// [`NormalizedRequest`].
pub trait NormalizationStrategy: Send + Sync {
    fn normalize(
        &self,
        document: &Document,
        schema_name: &str,
        schema_version: u32,
    ) -> Result<NormalizedRequest, SchemaError>;
}

/// Version 0: documents written before ghost atoms existed.
///
/// `molecule.real` is filled with `true` for every site when absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyRules;

impl NormalizationStrategy for LegacyRules {
    fn normalize(
        &self,
        document: &Document,
        schema_name: &str,
        schema_version: u32,
    ) -> Result<NormalizedRequest, SchemaError> {
        let section = molecule_section(document)?;
        let mut molecule = read_sites(section)?;
        if molecule.real.is_none() {
            molecule.real = Some(vec![true; molecule.symbols.len()]);
        }
        finish(document, schema_name, schema_version, molecule)
    }
}

/// Version 1: documents that know about ghost atoms.
///
/// `molecule.real` is passed through as written; an absent list is left for the
/// molecule builder to default.
#[derive(Debug, Default, Clone, Copy)]
pub struct GhostAwareRules;

impl NormalizationStrategy for GhostAwareRules {
    fn normalize(
        &self,
        document: &Document,
        schema_name: &str,
        schema_version: u32,
    ) -> Result<NormalizedRequest, SchemaError> {
        let molecule = read_sites(molecule_section(document)?)?;
        finish(document, schema_name, schema_version, molecule)
    }
}

fn finish(
    document: &Document,
    schema_name: &str,
    schema_version: u32,
    molecule: NormalizedMolecule,
) -> Result<NormalizedRequest, SchemaError> {
    let driver = string(require_top(document, "driver")?, "driver")?;
    let model = read_model(require_top(document, "model")?)?;
    let keywords = match document.get("keywords") {
        Some(value) => read_keywords(value)?,
        None => Keywords::new(),
    };
    let return_output = match document.get("return_output") {
        Some(value) => boolean(value, "return_output")?,
        None => false,
    };

    Ok(NormalizedRequest {
        schema_name: schema_name.to_string(),
        schema_version,
        molecule,
        driver,
        model,
        keywords,
        return_output,
    })
}

fn molecule_section(document: &Document) -> Result<&Map<String, Value>, SchemaError> {
    object(require_top(document, "molecule")?, "molecule")
}

fn read_sites(section: &Map<String, Value>) -> Result<NormalizedMolecule, SchemaError> {
    let geometry = float_array(require(section, "geometry", "molecule")?, "molecule.geometry")?;
    let symbols = string_array(require(section, "symbols", "molecule")?, "molecule.symbols")?;
    let real = section
        .get("real")
        .map(|value| bool_array(value, "molecule.real"))
        .transpose()?;
    Ok(NormalizedMolecule {
        geometry,
        symbols,
        real,
        molecular_charge: optional_i32(section, "molecule.molecular_charge")?,
        molecular_multiplicity: optional_u32(section, "molecule.molecular_multiplicity")?,
    })
}

fn read_model(value: &Value) -> Result<ModelSpec, SchemaError> {
    let section = object(value, "model")?;
    Ok(ModelSpec {
        method: string(require(section, "method", "model")?, "model.method")?,
        basis: string(require(section, "basis", "model")?, "model.basis")?,
    })
}

fn read_keywords(value: &Value) -> Result<Keywords, SchemaError> {
    let section = object(value, "keywords")?;
    section
        .iter()
        .map(|(name, raw)| {
            KeywordValue::from_json(raw)
                .map(|kw| (name.clone(), kw))
                .ok_or_else(|| SchemaError::InvalidField {
                    field: format!("keywords.{name}"),
                    expected: "a scalar or a list of scalars",
                    found: json_type_name(raw),
                })
        })
        .collect()
}

pub(super) fn require_top<'a>(
    document: &'a Document,
    key: &str,
) -> Result<&'a Value, SchemaError> {
    document
        .get(key)
        .ok_or_else(|| SchemaError::MissingField(key.to_string()))
}

fn require<'a>(
    section: &'a Map<String, Value>,
    key: &str,
    parent: &str,
) -> Result<&'a Value, SchemaError> {
    section
        .get(key)
        .ok_or_else(|| SchemaError::MissingField(format!("{parent}.{key}")))
}

fn invalid(field: &str, expected: &'static str, found: &Value) -> SchemaError {
    SchemaError::InvalidField {
        field: field.to_string(),
        expected,
        found: json_type_name(found),
    }
}

fn object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| invalid(field, "an object", value))
}

pub(super) fn string(value: &Value, field: &str) -> Result<String, SchemaError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(field, "a string", value))
}

fn boolean(value: &Value, field: &str) -> Result<bool, SchemaError> {
    value.as_bool().ok_or_else(|| invalid(field, "a boolean", value))
}

fn array<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value.as_array().ok_or_else(|| invalid(field, "an array", value))
}

fn float_array(value: &Value, field: &str) -> Result<Vec<f64>, SchemaError> {
    array(value, field)?
        .iter()
        .map(|item| item.as_f64().ok_or_else(|| invalid(field, "an array of numbers", item)))
        .collect()
}

fn string_array(value: &Value, field: &str) -> Result<Vec<String>, SchemaError> {
    array(value, field)?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(field, "an array of strings", item))
        })
        .collect()
}

fn bool_array(value: &Value, field: &str) -> Result<Vec<bool>, SchemaError> {
    array(value, field)?
        .iter()
        .map(|item| item.as_bool().ok_or_else(|| invalid(field, "an array of booleans", item)))
        .collect()
}

fn optional_i32(section: &Map<String, Value>, field: &str) -> Result<Option<i32>, SchemaError> {
    let key = field.rsplit('.').next().unwrap_or(field);
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(field, "an integer", value)),
    }
}

fn optional_u32(section: &Map<String, Value>, field: &str) -> Result<Option<u32>, SchemaError> {
    let key = field.rsplit('.').next().unwrap_or(field);
    match section.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| invalid(field, "a non-negative integer", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn base(molecule: Value) -> Document {
        document(json!({
            "schema_name": "QC_JSON",
            "schema_version": 0,
            "molecule": molecule,
            "driver": "energy",
            "model": {"method": "SCF", "basis": "cc-pVDZ"},
        }))
    }

    #[test]
    fn legacy_rules_fill_missing_real_flags() {
        let doc = base(json!({"geometry": [0.0, 0.0, 0.0, 0.0, 0.0, 1.4], "symbols": ["H", "H"]}));
        let request = LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap();
        assert_eq!(request.molecule.real, Some(vec![true, true]));
        assert!(request.keywords.is_empty());
        assert!(!request.return_output);
    }

    #[test]
    fn legacy_rules_read_charge_and_multiplicity() {
        let doc = base(json!({
            "geometry": [0.0, 0.0, 0.0],
            "symbols": ["Li"],
            "molecular_charge": 1,
            "molecular_multiplicity": 1
        }));
        let request = LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap();
        assert_eq!(request.molecule.molecular_charge, Some(1));
        assert_eq!(request.molecule.molecular_multiplicity, Some(1));
    }

    #[test]
    fn legacy_rules_reject_fractional_charge() {
        let doc = base(json!({
            "geometry": [0.0, 0.0, 0.0],
            "symbols": ["Li"],
            "molecular_charge": 0.5
        }));
        assert!(matches!(
            LegacyRules.normalize(&doc, "QC_JSON", 0),
            Err(SchemaError::InvalidField { .. })
        ));
    }

    #[test]
    fn ghost_aware_rules_read_charge_and_multiplicity() {
        let doc = base(json!({
            "geometry": [0.0, 0.0, 0.0],
            "symbols": ["O"],
            "molecular_charge": -1,
            "molecular_multiplicity": 2
        }));
        let request = GhostAwareRules.normalize(&doc, "QC_JSON", 1).unwrap();
        assert_eq!(request.molecule.molecular_charge, Some(-1));
        assert_eq!(request.molecule.molecular_multiplicity, Some(2));
        assert_eq!(request.molecule.real, None);
        assert_eq!(request.schema_version, 1);
    }

    #[test]
    fn ghost_aware_rules_reject_fractional_multiplicity() {
        let doc = base(json!({
            "geometry": [0.0, 0.0, 0.0],
            "symbols": ["O"],
            "molecular_multiplicity": 2.5
        }));
        let err = GhostAwareRules.normalize(&doc, "QC_JSON", 1).unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidField {
                field: "molecule.molecular_multiplicity".to_string(),
                expected: "a non-negative integer",
                found: "number",
            }
        );
    }

    #[test]
    fn nested_missing_fields_use_dotted_paths() {
        let doc = base(json!({"symbols": ["He"]}));
        assert_eq!(
            LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap_err(),
            SchemaError::MissingField("molecule.geometry".to_string())
        );

        let mut doc = base(json!({"geometry": [0.0, 0.0, 0.0], "symbols": ["He"]}));
        doc.insert("model", json!({"method": "SCF"}));
        assert_eq!(
            LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap_err(),
            SchemaError::MissingField("model.basis".to_string())
        );
    }

    #[test]
    fn wrongly_typed_arrays_are_invalid_fields() {
        let doc = base(json!({"geometry": [0.0, "x", 0.0], "symbols": ["He"]}));
        let err = LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidField {
                field: "molecule.geometry".to_string(),
                expected: "an array of numbers",
                found: "string",
            }
        );

        let doc = base(json!({"geometry": [0.0, 0.0, 0.0], "symbols": ["He"], "real": [1]}));
        assert!(matches!(
            LegacyRules.normalize(&doc, "QC_JSON", 0),
            Err(SchemaError::InvalidField { .. })
        ));
    }

    #[test]
    fn keywords_are_mapped_without_interpretation() {
        let mut doc = base(json!({"geometry": [0.0, 0.0, 0.0], "symbols": ["He"]}));
        doc.insert(
            "keywords",
            json!({
                "scf_type": "df",
                "maxiter": 50,
                "e_convergence": 1e-8,
                "puream": true,
                "docc": [1, 0]
            }),
        );
        let request = LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap();
        assert_eq!(request.keywords.len(), 5);
        assert_eq!(
            request.keywords["scf_type"],
            KeywordValue::String("df".to_string())
        );
        assert_eq!(request.keywords["maxiter"], KeywordValue::Integer(50));
    }

    #[test]
    fn object_keyword_values_are_rejected() {
        let mut doc = base(json!({"geometry": [0.0, 0.0, 0.0], "symbols": ["He"]}));
        doc.insert("keywords", json!({"nested": {"a": 1}}));
        let err = LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidField {
                field: "keywords.nested".to_string(),
                expected: "a scalar or a list of scalars",
                found: "object",
            }
        );
    }

    #[test]
    fn return_output_flag_is_read() {
        let mut doc = base(json!({"geometry": [0.0, 0.0, 0.0], "symbols": ["He"]}));
        doc.insert("return_output", json!(true));
        assert!(LegacyRules.normalize(&doc, "QC_JSON", 0).unwrap().return_output);

        doc.insert("return_output", json!("yes"));
        assert!(LegacyRules.normalize(&doc, "QC_JSON", 0).is_err());
    }
}

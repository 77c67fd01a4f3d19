use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SchemaError {
    #[error("Unknown schema '{0}'")]
    UnknownSchema(String),

    #[error("Unsupported schema version {0}")]
    UnsupportedVersion(u64),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' must be {expected}, found {found}")]
    InvalidField {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

use super::error::SchemaError;
use super::normalized::NormalizedRequest;
use super::version::{self, GhostAwareRules, LegacyRules, NormalizationStrategy};
use crate::core::document::{Document, json_type_name};
use std::collections::BTreeMap;
use tracing::debug;

/// Protocol identifier every document must carry in `schema_name`.
pub const PROTOCOL_NAME: &str = "QC_JSON";

/// Top-level fields every supported version requires.
const REQUIRED_FIELDS: [&str; 3] = ["molecule", "driver", "model"];

/// Maps schema versions to the strategy that normalizes them.
///
/// Unknown names and unregistered versions are rejected outright; there is no
/// fallback to a "closest" version.
pub struct SchemaRegistry {
    protocol_name: String,
    strategies: BTreeMap<u32, Box<dyn NormalizationStrategy>>,
}

impl Default for SchemaRegistry {
    /// The `QC_JSON` protocol with versions 0 and 1 registered.
    fn default() -> Self {
        let mut registry = Self::empty(PROTOCOL_NAME);
        registry.register(0, LegacyRules);
        registry.register(1, GhostAwareRules);
        registry
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("protocol_name", &self.protocol_name)
            .field("versions", &self.supported_versions())
            .finish()
    }
}

impl SchemaRegistry {
    /// A registry for `protocol_name` with no versions registered.
    pub fn empty(protocol_name: &str) -> Self {
        Self {
            protocol_name: protocol_name.to_string(),
            strategies: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the strategy for `version`.
    pub fn register(&mut self, version: u32, strategy: impl NormalizationStrategy + 'static) {
        self.strategies.insert(version, Box::new(strategy));
    }

    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    pub fn supported_versions(&self) -> Vec<u32> {
        self.strategies.keys().copied().collect()
    }

    /// Validates `document` and produces a normalized request.
    ///
    /// The document itself is left untouched; the returned request is a separate
    /// value, so every caller field survives until the embedder writes its output
    /// keys.
    ///
    /// # Errors
    ///
    /// * [`SchemaError::UnknownSchema`] if `schema_name` is not this registry's protocol.
    /// * [`SchemaError::UnsupportedVersion`] if no strategy is registered for `schema_version`.
    /// * [`SchemaError::MissingField`] if `molecule`, `driver` or `model` (or a nested
    ///   required field) is absent.
    /// * [`SchemaError::InvalidField`] if a field has the wrong JSON type.
    pub fn validate_and_normalize(
        &self,
        document: &Document,
    ) -> Result<NormalizedRequest, SchemaError> {
        let schema_name =
            version::string(version::require_top(document, "schema_name")?, "schema_name")?;
        if schema_name != self.protocol_name {
            return Err(SchemaError::UnknownSchema(schema_name));
        }

        let raw_version = version::require_top(document, "schema_version")?;
        let requested = raw_version
            .as_u64()
            .ok_or_else(|| SchemaError::InvalidField {
                field: "schema_version".to_string(),
                expected: "a non-negative integer",
                found: json_type_name(raw_version),
            })?;
        let (schema_version, strategy) = u32::try_from(requested)
            .ok()
            .and_then(|v| self.strategies.get(&v).map(|s| (v, s)))
            .ok_or(SchemaError::UnsupportedVersion(requested))?;

        for field in REQUIRED_FIELDS {
            if !document.contains_key(field) {
                return Err(SchemaError::MissingField(field.to_string()));
            }
        }

        debug!(schema_version, "Normalizing document.");
        strategy.normalize(document, &schema_name, schema_version)
    }
}

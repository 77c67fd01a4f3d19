use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Fill `calcinfo_natom`, `calcinfo_nalpha`, `calcinfo_nbeta` and
    /// `nuclear_repulsion_energy` from the molecule when the backend omits them.
    pub fill_derived_properties: bool,
    /// Reject results whose shape does not match the driver, or that contain
    /// non-finite numbers.
    pub validate_result_shape: bool,
    /// Limit for a single backend call. The clock starts when the backend is
    /// called, so every document in a batch gets the full limit.
    pub compute_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            fill_derived_properties: true,
            validate_result_shape: true,
            compute_timeout: None,
        }
    }
}

#[derive(Default)]
pub struct DispatchConfigBuilder {
    fill_derived_properties: Option<bool>,
    validate_result_shape: Option<bool>,
    compute_timeout: Option<Duration>,
}

impl DispatchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_derived_properties(mut self, enabled: bool) -> Self {
        self.fill_derived_properties = Some(enabled);
        self
    }
    pub fn validate_result_shape(mut self, enabled: bool) -> Self {
        self.validate_result_shape = Some(enabled);
        self
    }
    pub fn compute_timeout(mut self, timeout: Duration) -> Self {
        self.compute_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> DispatchConfig {
        let defaults = DispatchConfig::default();
        DispatchConfig {
            fill_derived_properties: self
                .fill_derived_properties
                .unwrap_or(defaults.fill_derived_properties),
            validate_result_shape: self
                .validate_result_shape
                .unwrap_or(defaults.validate_result_shape),
            compute_timeout: self.compute_timeout.or(defaults.compute_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_without_overrides_matches_default() {
        assert_eq!(DispatchConfigBuilder::new().build(), DispatchConfig::default());
    }

    #[test]
    fn builder_overrides_individual_flags() {
        let config = DispatchConfigBuilder::new()
            .fill_derived_properties(false)
            .compute_timeout(Duration::from_secs(30))
            .build();
        assert!(!config.fill_derived_properties);
        assert!(config.validate_result_shape);
        assert_eq!(config.compute_timeout, Some(Duration::from_secs(30)));
    }
}

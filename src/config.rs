use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Numeric ceilings injected into the checks.
///
/// Values are validated whenever they are set, so a `Thresholds` handed to
/// the engine is always consistent.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    method_length_warning: u32,
    method_length_error: u32,
    max_fields: u32,
    max_methods: u32,
    cohesion_threshold: u32,
    lcom4_enabled: bool,
    max_method_branches: u32,
    max_class_branches: u32,
    secret_min_length: u32,
    extra_secret_patterns: Vec<String>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            method_length_warning: 50,
            method_length_error: 100,
            max_fields: 10,
            max_methods: 20,
            cohesion_threshold: 1,
            lcom4_enabled: true,
            max_method_branches: 10,
            max_class_branches: 30,
            secret_min_length: 20,
            extra_secret_patterns: Vec::new(),
        }
    }
}

impl Thresholds {
    /// Parse TOML text; missing keys keep their defaults.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let thresholds: Thresholds = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let thresholds = Self::from_toml_str(&text, path)?;
        debug!(path = %path.display(), ?thresholds, "loaded thresholds");
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("method_length_warning", self.method_length_warning)?;
        positive("method_length_error", self.method_length_error)?;
        positive("max_fields", self.max_fields)?;
        positive("max_methods", self.max_methods)?;
        positive("cohesion_threshold", self.cohesion_threshold)?;
        positive("max_method_branches", self.max_method_branches)?;
        positive("max_class_branches", self.max_class_branches)?;
        positive("secret_min_length", self.secret_min_length)?;
        if self.method_length_warning >= self.method_length_error {
            return Err(ConfigError::WarningNotBelowError {
                warning: self.method_length_warning,
                error: self.method_length_error,
            });
        }
        self.secret_patterns()?;
        Ok(())
    }

    pub fn method_length_warning(&self) -> u32 {
        self.method_length_warning
    }

    pub fn method_length_error(&self) -> u32 {
        self.method_length_error
    }

    pub fn max_fields(&self) -> u32 {
        self.max_fields
    }

    pub fn max_methods(&self) -> u32 {
        self.max_methods
    }

    pub fn cohesion_threshold(&self) -> u32 {
        self.cohesion_threshold
    }

    pub fn lcom4_enabled(&self) -> bool {
        self.lcom4_enabled
    }

    pub fn max_method_branches(&self) -> u32 {
        self.max_method_branches
    }

    pub fn max_class_branches(&self) -> u32 {
        self.max_class_branches
    }

    pub fn secret_min_length(&self) -> u32 {
        self.secret_min_length
    }

    /// Compiled user-supplied secret patterns.
    pub fn secret_patterns(&self) -> Result<Vec<Regex>, ConfigError> {
        self.extra_secret_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    pub fn set_method_length_thresholds(
        &mut self,
        warning: u32,
        error: u32,
    ) -> Result<(), ConfigError> {
        positive("method_length_warning", warning)?;
        positive("method_length_error", error)?;
        if warning >= error {
            return Err(ConfigError::WarningNotBelowError { warning, error });
        }
        self.method_length_warning = warning;
        self.method_length_error = error;
        Ok(())
    }

    pub fn set_god_class_limits(
        &mut self,
        max_fields: u32,
        max_methods: u32,
    ) -> Result<(), ConfigError> {
        positive("max_fields", max_fields)?;
        positive("max_methods", max_methods)?;
        self.max_fields = max_fields;
        self.max_methods = max_methods;
        Ok(())
    }

    pub fn set_cohesion_threshold(&mut self, threshold: u32) -> Result<(), ConfigError> {
        positive("cohesion_threshold", threshold)?;
        self.cohesion_threshold = threshold;
        Ok(())
    }

    pub fn set_lcom4_enabled(&mut self, enabled: bool) {
        self.lcom4_enabled = enabled;
    }

    pub fn set_branch_limits(
        &mut self,
        per_method: u32,
        per_class: u32,
    ) -> Result<(), ConfigError> {
        positive("max_method_branches", per_method)?;
        positive("max_class_branches", per_class)?;
        self.max_method_branches = per_method;
        self.max_class_branches = per_class;
        Ok(())
    }

    pub fn add_secret_pattern(&mut self, pattern: &str) -> Result<(), ConfigError> {
        Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.extra_secret_patterns.push(pattern.to_string());
        Ok(())
    }
}

fn positive(key: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositive { key, value });
    }
    Ok(())
}

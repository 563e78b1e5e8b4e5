//! Auth descriptor and credential types
//!
//! An [`AuthSpec`] is a static, variant-level descriptor. An [`AuthConfig`]
//! holds the secrets of one configured connector instance.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Format check applied to a single credential value
#[derive(Debug, Clone)]
pub enum FormatValidator {
    /// Value must be non-empty
    NonEmpty,
    /// Value must match the pattern in full
    Pattern(Regex),
}

impl FormatValidator {
    /// Build a full-match pattern validator.
    ///
    /// The pattern is anchored on both ends, so `xoxp-[a-z]+` and
    /// `^xoxp-[a-z]+$` behave the same.
    pub fn pattern(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|e| Error::InvalidConfigValue {
            field: "pattern".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::Pattern(regex))
    }

    /// Check a value against this validator
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::NonEmpty => !value.trim().is_empty(),
            Self::Pattern(regex) => regex.is_match(value),
        }
    }
}

/// A single required credential field
#[derive(Debug, Clone)]
pub struct AuthField {
    /// Operator-facing description of the expected value
    pub description: String,
    /// Format check for the value
    pub validator: FormatValidator,
}

/// Credential requirements of a connector variant
#[derive(Debug, Clone, Default)]
pub struct AuthSpec {
    fields: BTreeMap<String, AuthField>,
}

impl AuthSpec {
    /// Start building an auth spec
    pub fn builder() -> AuthSpecBuilder {
        AuthSpecBuilder::default()
    }

    /// Get a field definition
    pub fn get(&self, field: &str) -> Option<&AuthField> {
        self.fields.get(field)
    }

    /// Iterate fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &AuthField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of all required fields, sorted
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Number of required fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the spec requires no credentials at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builder for [`AuthSpec`]
#[derive(Debug, Default)]
pub struct AuthSpecBuilder {
    fields: BTreeMap<String, AuthField>,
}

impl AuthSpecBuilder {
    /// Add a required field
    #[must_use]
    pub fn field(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        validator: FormatValidator,
    ) -> Self {
        self.fields.insert(
            name.into(),
            AuthField {
                description: description.into(),
                validator,
            },
        );
        self
    }

    /// Build the spec
    pub fn build(self) -> AuthSpec {
        AuthSpec {
            fields: self.fields,
        }
    }
}

/// Secret values of one connector instance, keyed by field name
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthConfig {
    values: BTreeMap<String, String>,
}

impl AuthConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field value
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Set a field value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Get a field value or fail
    pub fn require(&self, field: &str) -> Result<&str> {
        self.get(field).ok_or_else(|| Error::MissingCredential {
            field: field.to_string(),
        })
    }

    /// Whether no fields are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Field names and values, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

/// How a validated [`AuthConfig`] is attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// No authentication
    None,
    /// `Authorization: Bearer <value of field>`
    Bearer {
        /// Credential field holding the token
        field: String,
    },
    /// Custom header carrying a key, with an optional prefix
    ApiKeyHeader {
        /// Header name
        header: String,
        /// Credential field holding the key
        field: String,
        /// Prefix to add before the value (e.g., "SSWS ")
        prefix: Option<String>,
    },
    /// HTTP Basic authentication
    Basic {
        /// Credential field holding the username
        username_field: String,
        /// Credential field holding the password
        password_field: String,
    },
}

impl AuthScheme {
    /// Bearer auth from the given credential field
    pub fn bearer(field: impl Into<String>) -> Self {
        Self::Bearer {
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_pattern_is_anchored() {
        let v = FormatValidator::pattern("xoxp-[a-z]+").unwrap();
        assert!(v.matches("xoxp-abc"));
        assert!(!v.matches("prefix xoxp-abc"));
        assert!(!v.matches("xoxp-abc trailing"));

        let v = FormatValidator::pattern("^xoxp-[a-z]+$").unwrap();
        assert!(v.matches("xoxp-abc"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FormatValidator::pattern("(unclosed").is_err());
    }

    #[test]
    fn test_non_empty() {
        assert!(FormatValidator::NonEmpty.matches("x"));
        assert!(!FormatValidator::NonEmpty.matches("   "));
    }

    #[test]
    fn test_auth_config_debug_redacts() {
        let config = AuthConfig::new().with("auth_token", "xoxp-secret");
        let printed = format!("{config:?}");
        assert!(printed.contains("auth_token"));
        assert!(!printed.contains("xoxp-secret"));
    }

    #[test]
    fn test_auth_config_deserialize() {
        let config: AuthConfig = serde_yaml::from_str("auth_token: xoxp-1234").unwrap();
        assert_eq!(config.get("auth_token"), Some("xoxp-1234"));
        assert!(config.require("missing").is_err());
    }
}

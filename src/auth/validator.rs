//! Credential validation
//!
//! Checks an [`AuthConfig`] against an [`AuthSpec`] and reports every
//! violation at once.

use super::types::{AuthConfig, AuthSpec};
use crate::error::{Error, Result};

/// Validate a credential config against a variant's auth spec.
///
/// Every field in `spec` must be present in `config` and its value must
/// satisfy the field's format validator. Fields present in `config` but
/// not named by `spec` are ignored. Both lists in the returned
/// [`Error::AuthValidation`] are sorted by field name.
pub fn validate(config: &AuthConfig, spec: &AuthSpec) -> Result<()> {
    let mut missing_fields = Vec::new();
    let mut invalid_fields = Vec::new();

    for (name, field) in spec.fields() {
        match config.get(name) {
            None => missing_fields.push(name.to_string()),
            Some(value) if !field.validator.matches(value) => {
                invalid_fields.push(name.to_string());
            }
            Some(_) => {}
        }
    }

    if missing_fields.is_empty() && invalid_fields.is_empty() {
        Ok(())
    } else {
        Err(Error::AuthValidation {
            missing_fields,
            invalid_fields,
        })
    }
}

//! Applying credentials to requests
//!
//! Turns an [`AuthScheme`] plus a validated [`AuthConfig`] into request
//! headers. Secrets only ever land in the outgoing request, never in logs.

use super::types::{AuthConfig, AuthScheme};
use crate::connector::RequestSpec;
use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Attach authentication to a request according to the scheme
pub fn apply_auth(request: &mut RequestSpec, scheme: &AuthScheme, config: &AuthConfig) -> Result<()> {
    match scheme {
        AuthScheme::None => {}

        AuthScheme::Bearer { field } => {
            let token = config.require(field)?;
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }

        AuthScheme::ApiKeyHeader {
            header,
            field,
            prefix,
        } => {
            let key = config.require(field)?;
            let value = format!("{}{}", prefix.as_deref().unwrap_or(""), key);
            request.headers.insert(header.clone(), value);
        }

        AuthScheme::Basic {
            username_field,
            password_field,
        } => {
            let username = config.require(username_field)?;
            let password = config.require(password_field)?;
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            request
                .headers
                .insert("Authorization".to_string(), format!("Basic {encoded}"));
        }
    }

    Ok(())
}

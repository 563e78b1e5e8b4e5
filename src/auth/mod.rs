//! Authentication module
//!
//! Declarative credential requirements ([`AuthSpec`]), per-instance secrets
//! ([`AuthConfig`]), pure validation of one against the other, and the
//! [`AuthScheme`]s that apply a validated config to an outgoing request.
//!
//! Validation is offline and side-effect free; the poll engine refuses to
//! touch the network with a config that has not passed [`validate`].

mod authenticator;
mod types;
mod validator;

pub use authenticator::apply_auth;
pub use types::{AuthConfig, AuthField, AuthScheme, AuthSpec, AuthSpecBuilder, FormatValidator};
pub use validator::validate;

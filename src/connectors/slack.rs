//! Slack audit log variants
//!
//! Both variants talk to the Slack Web API with a user token (`xoxp-...`),
//! POST form-encoded parameters and page through results with the
//! `paging.page` / `paging.pages` block Slack returns on every page.
//!
//! - `team.accessLogs`: logins per user, IP and user agent
//! - `team.integrationLogs`: app and service installs, removals and changes

use crate::auth::{AuthScheme, AuthSpec, FormatValidator};
use crate::connector::{
    join_url, ConnectorContract, FetchWindow, NormalizedEvent, ParsedPage, RawEvent, RawResponse,
    RequestSpec,
};
use crate::error::{Error, Result};
use crate::pagination::{PageCounts, PaginationMarker};
use crate::types::{epoch_seconds_value, from_epoch_seconds, JsonValue, Method, TimestampFormat};

/// Default Slack Web API base URL
pub const SLACK_API_BASE_URL: &str = "https://slack.com/api/";

/// Items requested per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

const AUTH_TOKEN_FIELD: &str = "auth_token";
const AUTH_TOKEN_PATTERN: &str = r"^xoxp-[a-zA-Z0-9-]+$";

fn slack_auth_spec() -> Result<AuthSpec> {
    Ok(AuthSpec::builder()
        .field(
            AUTH_TOKEN_FIELD,
            "The security token generated by installing an app. \
             This should be a string of characters beginning with xoxp-",
            FormatValidator::pattern(AUTH_TOKEN_PATTERN)?,
        )
        .build())
}

/// Behavior shared by every Slack log type
#[derive(Debug, Clone)]
struct SlackApi {
    base_url: String,
    page_size: u32,
    auth: AuthSpec,
}

impl SlackApi {
    fn new() -> Result<Self> {
        Ok(Self {
            base_url: SLACK_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            auth: slack_auth_spec()?,
        })
    }

    fn request(&self, endpoint: &str, marker: &PaginationMarker) -> RequestSpec {
        let page = marker.as_param().unwrap_or_else(|| "1".to_string());
        RequestSpec::new(Method::POST, join_url(&self.base_url, endpoint))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form("count", self.page_size.to_string())
            .form("page", page)
    }

    /// Parse the body and check Slack's `ok` indicator
    fn checked_body(response: &RawResponse) -> Result<JsonValue> {
        let body = response.json()?;
        match body.get("ok") {
            None => Err(Error::response_format("Slack response has no \"ok\" key")),
            Some(JsonValue::Bool(true)) => Ok(body),
            Some(_) => {
                let reason = body
                    .get("error")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("unknown_error");
                Err(Error::response_format(format!(
                    "Slack returned an error: {reason}"
                )))
            }
        }
    }

    fn page(body: &JsonValue, key: &str) -> Result<ParsedPage> {
        let events = body
            .get(key)
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                Error::response_format(format!("Slack response has no \"{key}\" array"))
            })?
            .iter()
            .map(|entry| {
                entry.as_object().cloned().ok_or_else(|| {
                    Error::response_format(format!("\"{key}\" entry is not an object"))
                })
            })
            .collect::<Result<Vec<RawEvent>>>()?;

        let next = match body.get("paging") {
            None | Some(JsonValue::Null) => PaginationMarker::done(),
            Some(paging) => serde_json::from_value::<PageCounts>(paging.clone())
                .map_err(|e| Error::response_format(format!("invalid \"paging\" block: {e}")))?
                .marker(),
        };

        Ok(ParsedPage::new(events, next))
    }
}

macro_rules! slack_variant {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            api: SlackApi,
        }

        impl $name {
            /// Create the variant against the public Slack API
            pub fn new() -> Result<Self> {
                Ok(Self {
                    api: SlackApi::new()?,
                })
            }

            /// Point the variant at another base URL
            #[must_use]
            pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
                self.api.base_url = base_url.into();
                self
            }

            /// Set how many items each page requests
            #[must_use]
            pub fn with_page_size(mut self, page_size: u32) -> Self {
                self.api.page_size = page_size.max(1);
                self
            }
        }
    };
}

slack_variant!(
    /// Slack login access logs (`team.accessLogs`)
    ///
    /// The endpoint only takes a `before` bound, so every cycle pages from
    /// page 1 back through history and re-delivers every login up to
    /// `max_pages * page_size` items. Size `max_pages` for the history you
    /// are willing to re-read each cycle; duplicates are dropped downstream.
    SlackAccessLogs
);
slack_variant!(
    /// Slack app and service integration logs (`team.integrationLogs`)
    ///
    /// The endpoint has no time filter at all: every cycle re-delivers the
    /// whole log up to `max_pages * page_size` entries, regardless of the
    /// committed cursor.
    SlackIntegrationLogs
);

impl ConnectorContract for SlackAccessLogs {
    fn service(&self) -> &'static str {
        "slack"
    }

    fn log_type(&self) -> &'static str {
        "access"
    }

    fn endpoint(&self) -> &str {
        "team.accessLogs"
    }

    fn base_url(&self) -> &str {
        &self.api.base_url
    }

    fn required_auth_info(&self) -> &AuthSpec {
        &self.api.auth
    }

    fn auth_scheme(&self) -> AuthScheme {
        AuthScheme::bearer(AUTH_TOKEN_FIELD)
    }

    // Upper bound only; the window start is not sent.
    fn build_request(
        &self,
        window: &FetchWindow,
        marker: &PaginationMarker,
    ) -> Result<RequestSpec> {
        Ok(self
            .api
            .request(self.endpoint(), marker)
            .form("before", TimestampFormat::EpochSeconds.format(window.end)))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<ParsedPage> {
        let body = SlackApi::checked_body(response)?;
        SlackApi::page(&body, "logins")
    }

    fn normalize(&self, event: RawEvent) -> NormalizedEvent {
        let observed_at = event
            .get("date_last")
            .and_then(epoch_seconds_value)
            .and_then(from_epoch_seconds);
        NormalizedEvent {
            service: self.service().to_string(),
            log_type: self.log_type().to_string(),
            source_event_id: None,
            observed_at,
            payload: JsonValue::Object(event),
        }
    }
}

impl ConnectorContract for SlackIntegrationLogs {
    fn service(&self) -> &'static str {
        "slack"
    }

    fn log_type(&self) -> &'static str {
        "integration"
    }

    fn endpoint(&self) -> &str {
        "team.integrationLogs"
    }

    fn base_url(&self) -> &str {
        &self.api.base_url
    }

    fn required_auth_info(&self) -> &AuthSpec {
        &self.api.auth
    }

    fn auth_scheme(&self) -> AuthScheme {
        AuthScheme::bearer(AUTH_TOKEN_FIELD)
    }

    // No time filter exists on this endpoint.
    fn build_request(
        &self,
        _window: &FetchWindow,
        marker: &PaginationMarker,
    ) -> Result<RequestSpec> {
        Ok(self.api.request(self.endpoint(), marker))
    }

    fn parse_response(&self, response: &RawResponse) -> Result<ParsedPage> {
        let body = SlackApi::checked_body(response)?;
        SlackApi::page(&body, "logs")
    }

    fn normalize(&self, event: RawEvent) -> NormalizedEvent {
        let source_event_id = event
            .get("service_id")
            .or_else(|| event.get("app_id"))
            .and_then(JsonValue::as_str)
            .map(String::from);
        let observed_at = event
            .get("date")
            .and_then(epoch_seconds_value)
            .and_then(from_epoch_seconds);
        NormalizedEvent {
            service: self.service().to_string(),
            log_type: self.log_type().to_string(),
            source_event_id,
            observed_at,
            payload: JsonValue::Object(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{validate, AuthConfig};
    use crate::connector::RequestBody;
    use crate::error::FailureKind;
    use crate::state::Cursor;
    use crate::testing::{slack_access_logs_payload, slack_integration_logs_payload, SLACK_TEST_TOKEN};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn window() -> FetchWindow {
        FetchWindow::new(
            Cursor::Timestamp(1_422_000_000),
            from_epoch_seconds(1_423_000_000).unwrap(),
        )
    }

    #[test]
    fn test_requests_ignore_committed_cursor() {
        let end = from_epoch_seconds(1_423_000_000).unwrap();
        let cold = FetchWindow::new(Cursor::Timestamp(0), end);
        let warm = FetchWindow::new(Cursor::Timestamp(1_422_999_999), end);

        let access = SlackAccessLogs::new().unwrap();
        assert_eq!(
            access.build_request(&cold, &PaginationMarker::first()).unwrap(),
            access.build_request(&warm, &PaginationMarker::first()).unwrap()
        );

        let integration = SlackIntegrationLogs::new().unwrap();
        let later = FetchWindow::new(Cursor::Timestamp(5), from_epoch_seconds(1_500_000_000).unwrap());
        assert_eq!(
            integration.build_request(&cold, &PaginationMarker::first()).unwrap(),
            integration.build_request(&later, &PaginationMarker::first()).unwrap()
        );
    }

    #[test]
    fn test_access_build_request_first_page() {
        let variant = SlackAccessLogs::new().unwrap();
        let request = variant
            .build_request(&window(), &PaginationMarker::first())
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://slack.com/api/team.accessLogs");
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.param("before"), Some("1423000000"));
        assert_eq!(request.param("count"), Some("100"));
        assert_eq!(request.param("page"), Some("1"));
        assert!(matches!(request.body, RequestBody::Form(_)));
    }

    #[test]
    fn test_access_build_request_follows_marker() {
        let variant = SlackAccessLogs::new()
            .unwrap()
            .with_base_url("http://127.0.0.1:9999")
            .with_page_size(2);
        let request = variant
            .build_request(&window(), &PaginationMarker::next(3))
            .unwrap();

        assert_eq!(request.url, "http://127.0.0.1:9999/team.accessLogs");
        assert_eq!(request.param("page"), Some("3"));
        assert_eq!(request.param("count"), Some("2"));
    }

    #[test]
    fn test_access_parse_sample_payload() {
        let variant = SlackAccessLogs::new().unwrap();
        let page = variant
            .parse_response(&RawResponse::ok_json(&slack_access_logs_payload()))
            .unwrap();

        assert_eq!(page.events.len(), 2);
        assert!(!page.next.has_more);

        let events: Vec<_> = page.events.into_iter().map(|e| variant.normalize(e)).collect();
        assert_eq!(events[0].payload["username"], "bob");
        assert_eq!(events[0].observed_at, from_epoch_seconds(1_422_922_864));
        assert_eq!(events[1].observed_at, from_epoch_seconds(1_422_922_493));
        assert!(events.iter().all(|e| e.service == "slack" && e.log_type == "access"));
    }

    #[test]
    fn test_access_pagination_continues() {
        let variant = SlackAccessLogs::new().unwrap();
        let mut payload = slack_access_logs_payload();
        payload["paging"] = json!({"count": 2, "total": 5, "page": 1, "pages": 3});

        let page = variant
            .parse_response(&RawResponse::ok_json(&payload))
            .unwrap();
        assert!(page.next.has_more);
        assert_eq!(page.next.as_param().as_deref(), Some("2"));
    }

    #[test]
    fn test_missing_ok_is_format_error() {
        let variant = SlackAccessLogs::new().unwrap();
        let mut payload = slack_access_logs_payload();
        payload.as_object_mut().unwrap().remove("ok");

        let err = variant
            .parse_response(&RawResponse::ok_json(&payload))
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Malformed);
    }

    #[test]
    fn test_ok_false_carries_slack_error() {
        let variant = SlackIntegrationLogs::new().unwrap();
        let payload = json!({"ok": false, "error": "paid_only"});

        let err = variant
            .parse_response(&RawResponse::ok_json(&payload))
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Malformed);
        assert!(err.to_string().contains("paid_only"));
    }

    #[test]
    fn test_missing_event_array_is_format_error() {
        let variant = SlackAccessLogs::new().unwrap();
        let err = variant
            .parse_response(&RawResponse::ok_json(&json!({"ok": true})))
            .unwrap_err();
        assert!(err.to_string().contains("logins"));
    }

    #[test]
    fn test_integration_parse_and_normalize() {
        let variant = SlackIntegrationLogs::new().unwrap();
        let request = variant
            .build_request(&window(), &PaginationMarker::first())
            .unwrap();
        assert_eq!(request.url, "https://slack.com/api/team.integrationLogs");
        assert_eq!(request.param("before"), None);

        let page = variant
            .parse_response(&RawResponse::ok_json(&slack_integration_logs_payload()))
            .unwrap();
        let events: Vec<_> = page.events.into_iter().map(|e| variant.normalize(e)).collect();

        let ids: Vec<_> = events
            .iter()
            .map(|e| e.source_event_id.as_deref())
            .collect();
        assert_eq!(
            ids,
            vec![Some("1234567890"), Some("2345678901"), Some("3456789012")]
        );
        assert_eq!(events[2].observed_at, from_epoch_seconds(1_392_163_202));
        assert_eq!(events[1].payload["change_type"], "added");
    }

    #[test]
    fn test_auth_token_format() {
        let variant = SlackAccessLogs::new().unwrap();
        let spec = variant.required_auth_info();
        assert_eq!(spec.field_names(), vec!["auth_token"]);

        let good = AuthConfig::new().with("auth_token", SLACK_TEST_TOKEN);
        assert!(validate(&good, spec).is_ok());

        let bad = AuthConfig::new().with("auth_token", "notvalid");
        let err = validate(&bad, spec).unwrap_err();
        assert!(matches!(
            err,
            Error::AuthValidation { ref invalid_fields, .. } if invalid_fields == &["auth_token"]
        ));
    }
}

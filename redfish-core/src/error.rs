//! The unified error taxonomy (§7) and its conversion to a Redfish error
//! response body.
//!
//! Grounded in `redfish-axum`'s `Error` enum (`lib.rs`) and its
//! `IntoResponse` impl, expanded from four variants to the full taxonomy
//! §7 describes, with bodies built from [`redfish_data`]'s message
//! registry rather than an empty one.

use axum::response::{IntoResponse, Response};
use http::{header, HeaderValue, StatusCode};
use redfish_data::{self as messages, AllowedMethods};
use thiserror::Error;

use crate::JsonResponse;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no route matches this request")]
    NotFound,
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("insufficient privilege for this operation")]
    Forbidden,
    #[error("method not allowed on this resource")]
    MethodNotAllowed(AllowedMethods),
    #[error("redirect to the trailing-slash form of this path")]
    RedirectSlash(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("resource has not changed")]
    NotModified,
    #[error("unsupported OData-Version")]
    BadODataVersion,
    #[error("unsupported query parameter: {0}")]
    QueryNotSupported(String),
    #[error("malformed query parameter {key}={value:?}")]
    QueryParameterValueFormatError { key: String, value: String },
    #[error("query parameter {key} out of range {range}: {value}")]
    QueryParameterOutOfRange {
        key: String,
        value: String,
        range: String,
    },
    #[error("query parameters {0} and {1} cannot be combined")]
    QueryCombinationInvalid(String, String),
    #[error("resource not found: {0}/{1}")]
    ResourceNotFound(String, String),
    #[error("resource in use")]
    ResourceInUse,
    #[error("resource in standby")]
    ResourceInStandby,
    #[error("service disabled: {0}")]
    ServiceDisabled(String),
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),
    #[error("missing action parameter {1} for action {0}")]
    ActionParameterMissing(String, String),
    #[error("internal error")]
    Internal,
}

impl Error {
    fn message_body(&self) -> serde_json::Value {
        match self {
            Error::NotFound => messages::resource_missing_at_uri("").to_error_body(),
            Error::Unauthorized | Error::Forbidden => messages::insufficient_privilege().to_error_body(),
            Error::MethodNotAllowed(_) => messages::resource_missing_at_uri("").to_error_body(),
            Error::RedirectSlash(_) => serde_json::json!({}),
            Error::PreconditionFailed(_) => messages::precondition_failed().to_error_body(),
            Error::NotModified => serde_json::json!({}),
            Error::BadODataVersion => messages::unrecognized_request_body().to_error_body(),
            Error::QueryNotSupported(_) => messages::query_not_supported().to_error_body(),
            Error::QueryParameterValueFormatError { key, value } => {
                messages::query_parameter_value_format_error(value, key).to_error_body()
            }
            Error::QueryParameterOutOfRange { key, value, range } => {
                messages::query_parameter_out_of_range(value, key, range).to_error_body()
            }
            Error::QueryCombinationInvalid(..) => messages::query_combination_invalid().to_error_body(),
            Error::ResourceNotFound(kind, id) => messages::resource_not_found(kind, id).to_error_body(),
            Error::ResourceInUse => messages::resource_in_use().to_error_body(),
            Error::ResourceInStandby => messages::resource_in_standby().to_error_body(),
            Error::ServiceDisabled(service) => messages::service_disabled(service).to_error_body(),
            Error::ResourceExhaustion(resource) => messages::resource_exhaustion(resource).to_error_body(),
            Error::ActionParameterMissing(action, parameter) => {
                messages::action_parameter_missing(action, parameter).to_error_body()
            }
            Error::Internal => messages::internal_error().to_error_body(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::NotFound | Error::ResourceNotFound(..) => StatusCode::NOT_FOUND,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::RedirectSlash(_) => StatusCode::MOVED_PERMANENTLY,
            Error::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            Error::NotModified => StatusCode::NOT_MODIFIED,
            Error::BadODataVersion => StatusCode::PRECONDITION_FAILED,
            Error::QueryNotSupported(_) => StatusCode::NOT_IMPLEMENTED,
            Error::QueryParameterValueFormatError { .. } => StatusCode::BAD_REQUEST,
            Error::QueryParameterOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Error::QueryCombinationInvalid(..) => StatusCode::BAD_REQUEST,
            Error::ResourceInUse | Error::ResourceInStandby => StatusCode::CONFLICT,
            Error::ServiceDisabled(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::ResourceExhaustion(_) => StatusCode::INSUFFICIENT_STORAGE,
            Error::ActionParameterMissing(..) => StatusCode::BAD_REQUEST,
            Error::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Severity used to pick the worst status across a composite
    /// `$expand`/`only` response (§7 propagation policy): 2xx/3xx lowest,
    /// then 4xx (401 ranked below other 4xx per the table), then 5xx
    /// highest; ties broken by the higher-numbered status.
    pub fn severity_rank(status: StatusCode) -> u16 {
        let code = status.as_u16();
        match code {
            100..=399 => 0,
            401 => 2,
            400..=408 => 1,
            400..=499 => 3,
            500..=599 => 4,
            _ => 5,
        }
    }
}

impl Error {
    /// Build the status/headers/body triple this error answers with,
    /// shared by [`IntoResponse`] and the dispatcher, which needs the raw
    /// `Value` body rather than an assembled axum [`Response`] when folding
    /// an inner `$expand`/`only` fetch's error into the outer document.
    pub fn into_parts(self) -> (StatusCode, http::HeaderMap, serde_json::Value) {
        let status = self.status();
        let mut headers = http::HeaderMap::new();
        headers.insert(
            http::HeaderName::from_static("odata-version"),
            HeaderValue::from_static("4.0"),
        );
        if let Error::MethodNotAllowed(allowed) = &self {
            if let Ok(value) = HeaderValue::from_str(&allowed.to_string()) {
                headers.insert(header::ALLOW, value);
            }
        }
        if let Error::RedirectSlash(location) = &self {
            if let Ok(value) = HeaderValue::from_str(location) {
                headers.insert(header::LOCATION, value);
            }
            return (status, headers, serde_json::Value::Null);
        }
        if matches!(self, Error::Unauthorized) {
            headers.insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"redfish\""),
            );
        }
        let body = self.message_body();
        (status, headers, body)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, headers, body) = self.into_parts();
        JsonResponse::new(status, headers, body).into_response()
    }
}

/// Convert a worst-of-composite status back into the `Error` variant
/// carrying that status, for building the final response when merging
/// `$expand` sub-responses. Only the status matters to callers of this
/// helper; the body is assembled separately by the executor.
pub fn worst_status(statuses: impl IntoIterator<Item = StatusCode>) -> StatusCode {
    statuses
        .into_iter()
        .max_by_key(|status| (Error::severity_rank(*status), status.as_u16()))
        .unwrap_or(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_status_prefers_5xx_over_4xx_over_2xx() {
        let worst = worst_status([StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR]);
        assert_eq!(worst, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn worst_status_breaks_ties_by_higher_numbered_status() {
        let worst = worst_status([StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND]);
        assert_eq!(worst, StatusCode::NOT_FOUND);
    }

    #[test]
    fn worst_status_ranks_401_below_other_4xx() {
        let worst = worst_status([StatusCode::UNAUTHORIZED, StatusCode::CONFLICT]);
        assert_eq!(worst, StatusCode::CONFLICT);
    }

    #[test]
    fn worst_status_ranks_401_below_4xx_inside_the_400_to_408_range() {
        let worst = worst_status([StatusCode::UNAUTHORIZED, StatusCode::METHOD_NOT_ALLOWED]);
        assert_eq!(worst, StatusCode::METHOD_NOT_ALLOWED);
    }
}

//! The subset of the DMTF `Base` message registry this server actually
//! emits. Grounded in `redfish-core/include/error_messages.hpp` of the
//! original source; message text is reproduced from that registry's
//! English strings, updated to the `Base.1.13.0` prefix §6 specifies.
//!
//! We do not generate the full registry JSON (schema validation and the
//! registry's own machine-readable form are out of scope, §1); we only
//! provide the constructors handlers and the query engine actually call.

use serde_json::{json, Value};

pub const MESSAGE_VERSION_PREFIX: &str = "Base.1.13.0.";
pub const MESSAGE_ANNOTATION: &str = "@Message.ExtendedInfo";

/// One formatted entry of `@Message.ExtendedInfo`.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: &'static str,
    pub message: String,
    pub message_args: Vec<String>,
    pub resolution: &'static str,
    pub severity: &'static str,
}

impl Message {
    pub fn to_json(&self) -> Value {
        json!({
            "@odata.type": "#Message.v1_1_1.Message",
            "MessageId": format!("{MESSAGE_VERSION_PREFIX}{}", self.id),
            "Message": self.message,
            "MessageArgs": self.message_args,
            "Resolution": self.resolution,
            "Severity": self.severity,
        })
    }

    /// Wrap this message as a full Redfish `error` response body.
    pub fn to_error_body(&self) -> Value {
        json!({
            "error": {
                "code": format!("{MESSAGE_VERSION_PREFIX}{}", self.id),
                "message": self.message,
                MESSAGE_ANNOTATION: [self.to_json()],
            }
        })
    }
}

fn no_args(id: &'static str, message: impl Into<String>, resolution: &'static str) -> Message {
    Message {
        id,
        message: message.into(),
        message_args: Vec::new(),
        resolution,
        severity: "Critical",
    }
}

fn args(
    id: &'static str,
    message: impl Into<String>,
    message_args: Vec<String>,
    resolution: &'static str,
) -> Message {
    Message {
        id,
        message: message.into(),
        message_args,
        resolution,
        severity: "Critical",
    }
}

pub fn resource_not_found(resource_type: &str, arg2: &str) -> Message {
    args(
        "ResourceNotFound",
        format!("The requested resource of type {resource_type} named {arg2} was not found."),
        vec![resource_type.to_string(), arg2.to_string()],
        "Provide a valid resource identifier and resubmit the request.",
    )
}

pub fn resource_missing_at_uri(uri: &str) -> Message {
    args(
        "ResourceMissingAtURI",
        format!("The resource at the URI {uri} was not found."),
        vec![uri.to_string()],
        "Place a valid resource at the URI or correct the URI and resubmit the request.",
    )
}

pub fn internal_error() -> Message {
    no_args(
        "InternalError",
        "The request failed due to an internal service error.  The service is still operational.",
        "Resubmit the request.  If the problem persists, consider resetting the service.",
    )
}

pub fn malformed_json() -> Message {
    no_args(
        "MalformedJSON",
        "The request body submitted was malformed JSON and could not be parsed by the receiving service.",
        "Ensure that the request body is valid JSON and resubmit the request.",
    )
}

pub fn unrecognized_request_body() -> Message {
    no_args(
        "UnrecognizedRequestBody",
        "The service detected a malformed request body that it was unable to interpret.",
        "Correct the request body and resubmit the request if it failed.",
    )
}

pub fn resource_in_use() -> Message {
    no_args(
        "ResourceInUse",
        "The change to the requested resource failed because the resource is in use or in transition.",
        "Remove the condition and resubmit the request if the operation failed.",
    )
}

pub fn resource_in_standby() -> Message {
    no_args(
        "ResourceInStandby",
        "The request could not be performed because the resource is in standby.",
        "Ensure that the resource is in the correct power state and resubmit the request.",
    )
}

pub fn service_disabled(service: &str) -> Message {
    args(
        "ServiceDisabled",
        format!("The operation failed because the {service} service is disabled and cannot accept new requests."),
        vec![service.to_string()],
        "Enable the service and resubmit the request if the operation failed.",
    )
}

pub fn resource_exhaustion(resource: &str) -> Message {
    args(
        "ResourceExhaustion",
        format!("The resource {resource} was unable to satisfy the request due to unavailability of resources."),
        vec![resource.to_string()],
        "Ensure that the resources are available and resubmit the request.",
    )
}

pub fn precondition_failed() -> Message {
    no_args(
        "PreconditionFailed",
        "The ETag supplied did not match the ETag required to change this resource.",
        "Try the operation again using the appropriate ETag.",
    )
}

pub fn insufficient_privilege() -> Message {
    no_args(
        "InsufficientPrivilege",
        "There are insufficient privileges for the account or credentials associated with the current session to perform the requested operation.",
        "Either abandon the operation or change the associated access rights and resubmit the request if the operation failed.",
    )
}

pub fn query_not_supported() -> Message {
    no_args(
        "QueryNotSupported",
        "Querying is not supported by the implementation.",
        "Remove the query parameters and resubmit the request if the operation failed.",
    )
}

pub fn query_combination_invalid() -> Message {
    no_args(
        "QueryCombinationInvalid",
        "Two or more query parameters in the request cannot be used together.",
        "Remove one or more of the query parameters and resubmit the request if the operation failed.",
    )
}

pub fn query_parameter_value_format_error(value: &str, key: &str) -> Message {
    args(
        "QueryParameterValueFormatError",
        format!("The value {value} for the parameter {key} is of a different format than the parameter can accept."),
        vec![value.to_string(), key.to_string()],
        "Correct the value for the query parameter in the request and resubmit the request if the operation failed.",
    )
}

pub fn query_parameter_out_of_range(value: &str, key: &str, range: &str) -> Message {
    args(
        "QueryParameterOutOfRange",
        format!("The value {value} for the query parameter {key} is out of range {range}."),
        vec![value.to_string(), key.to_string(), range.to_string()],
        "Reduce the value for the query parameter to a value that is within range, such as a lower page size, and resubmit the request if the operation failed.",
    )
}

pub fn action_parameter_missing(action: &str, parameter: &str) -> Message {
    args(
        "ActionParameterMissing",
        format!("The action {action} requires the parameter {parameter} to be present in the request body."),
        vec![action.to_string(), parameter.to_string()],
        "Correct the request body and resubmit the request if the operation failed.",
    )
}


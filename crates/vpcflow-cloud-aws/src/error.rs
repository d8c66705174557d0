//! EC2 error classification
//!
//! Uses the error code from `ProvideErrorMetadata` rather than string matching
//! on the Debug output.

use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use vpcflow_cloud::CloudError;

/// Codes meaning the supplied keys were rejected outright
const AUTH_CODES: &[&str] = &[
    "AuthFailure",
    "InvalidClientTokenId",
    "SignatureDoesNotMatch",
    "OptInRequired",
];

/// Advice for well-known error codes
const HINTS: &[(&str, &str)] = &[
    (
        "UnauthorizedOperation",
        "The credentials are valid but lack permission for this call; check the IAM policy",
    ),
    (
        "VpcLimitExceeded",
        "The region already has the maximum number of VPCs; delete unused ones or request a limit increase",
    ),
    (
        "AddressLimitExceeded",
        "The region has no Elastic IP quota left; release unused addresses or request a limit increase",
    ),
    (
        "InternetGatewayLimitExceeded",
        "The region already has the maximum number of internet gateways",
    ),
    (
        "InvalidKeyPair.NotFound",
        "The key pair does not exist in this region; create it or set instance.key_name",
    ),
    (
        "InvalidAMIID.NotFound",
        "The image does not exist in this region; images are regional, set instance.image_id",
    ),
    (
        "InvalidAMIID.Malformed",
        "instance.image_id is not a valid image ID",
    ),
    (
        "InvalidParameterValue",
        "A configured value was rejected; check zones, instance type and CIDR blocks",
    ),
    (
        "InvalidSubnet.Conflict",
        "The subnet CIDR overlaps an existing subnet in the network",
    ),
    (
        "InvalidGroup.Duplicate",
        "A security group with this name already exists in the network",
    ),
    (
        "InsufficientInstanceCapacity",
        "The zone has no capacity for this instance type right now; try another zone or type",
    ),
    (
        "Unsupported",
        "The instance type is not offered in this zone",
    ),
    (
        "RequestLimitExceeded",
        "The API is throttling requests; wait and rerun",
    ),
];

/// Advice for a known error code
pub fn hint_for_code(code: &str) -> Option<&'static str> {
    HINTS.iter().find(|(c, _)| *c == code).map(|(_, h)| *h)
}

/// Classify an EC2 error by its code
pub fn classify(operation: &'static str, code: Option<&str>, message: String) -> CloudError {
    match code {
        Some(c) if AUTH_CODES.contains(&c) => {
            CloudError::AuthenticationFailed(format!("{} ({}): {}", operation, c, message))
        }
        _ => CloudError::Api {
            operation,
            code: code.map(str::to_string),
            hint: code.and_then(hint_for_code),
            message,
        },
    }
}

/// Convert an SDK error for `operation` into a [`CloudError`]
pub fn api_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.code().map(str::to_string);
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    tracing::debug!(operation, code = ?code, "EC2 call failed");
    classify(operation, code.as_deref(), message)
}

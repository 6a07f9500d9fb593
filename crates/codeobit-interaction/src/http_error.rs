//! Maps HTTP failures from provider APIs onto `CodeobitError`.

use codeobit_core::CodeobitError;
use codeobit_core::provider::ProviderId;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;

/// Builds the error for a non-success response.
///
/// 429 becomes `RateLimited`; everything else is `ProviderUnavailable`.
pub(crate) fn map_http_error(
    provider: ProviderId,
    status: StatusCode,
    message: String,
    retry_after_secs: Option<u64>,
) -> CodeobitError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return CodeobitError::RateLimited {
            provider: provider.to_string(),
            message,
            retry_after_secs,
        };
    }

    CodeobitError::provider_unavailable(provider.to_string(), format!("HTTP {status}: {message}"))
}

/// Maps transport errors (DNS, connect, timeout, body decoding).
pub(crate) fn map_request_error(provider: ProviderId, err: reqwest::Error) -> CodeobitError {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    };
    CodeobitError::provider_unavailable(provider.to_string(), message)
}

pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<u64> {
    let value = header?.to_str().ok()?;
    // HTTP-date form is not supported
    value.trim().parse::<u64>().ok()
}

/// Error message for an empty response, so callers can tell it apart from
/// transport failures.
pub(crate) fn empty_response(provider: ProviderId, what: &str) -> CodeobitError {
    CodeobitError::provider_unavailable(
        provider.to_string(),
        format!("response contained no {what}"),
    )
}

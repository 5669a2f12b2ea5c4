use azblob_core::Error;
use bytes::Bytes;
use http::{Response, StatusCode};

use crate::constants::X_MS_ERROR_CODE;
use crate::model::parse_error_code;

/// Translate a non-2xx response into an [`Error`].
///
/// `target` names what was addressed, like `container mycontainer`.
pub(crate) fn parse_error(resp: &Response<Bytes>, target: &str) -> Error {
    let status = resp.status();
    let code = resp
        .headers()
        .get(X_MS_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| parse_error_code(resp.body()));

    let detail = code.as_deref().unwrap_or("no error code");
    let err = match status {
        StatusCode::NOT_FOUND => Error::not_found(format!("{target} not found ({detail})")),
        StatusCode::CONFLICT if is_already_exists(code.as_deref()) => {
            Error::already_exists(format!("{target} already exists ({detail})"))
        }
        _ => Error::service(format!(
            "{target} failed with status {status} ({detail})"
        )),
    };

    let err = err.with_status(status);
    match code {
        Some(code) => err.with_service_code(code),
        None => err,
    }
}

fn is_already_exists(code: Option<&str>) -> bool {
    matches!(
        code,
        Some("ContainerAlreadyExists") | Some("BlobAlreadyExists")
    )
}

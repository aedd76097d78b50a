use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl APIError {
    /// The HTTP status and machine readable error code reported to the client.
    fn status_and_code(&self) -> (StatusCode, String) {
        match self.0.downcast_ref::<Error>() {
            Some(Error::Forbidden) => (StatusCode::UNAUTHORIZED, "forbidden".into()),
            Some(Error::InvalidCidr(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_allowfrom_cidr".into())
            }
            Some(Error::MalformedJson(_)) => {
                (StatusCode::BAD_REQUEST, "malformed_json_payload".into())
            }
            Some(Error::InvalidSubdomain(_)) => (StatusCode::BAD_REQUEST, "bad_subdomain".into()),
            Some(Error::InvalidDNS01) => (StatusCode::BAD_REQUEST, "bad_txt".into()),
            Some(Error::UpdateFailed(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "db_error".into()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", self.0)),
        }
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        let body = Json(json!({
            "error": code,
        }));
        (status, body).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_codes() {
        for (err, status, code) in [
            (Error::Forbidden, StatusCode::UNAUTHORIZED, "forbidden"),
            (
                Error::InvalidCidr("nope".into()),
                StatusCode::BAD_REQUEST,
                "invalid_allowfrom_cidr",
            ),
            (
                Error::InvalidSubdomain("a.b".into()),
                StatusCode::BAD_REQUEST,
                "bad_subdomain",
            ),
            (Error::InvalidDNS01, StatusCode::BAD_REQUEST, "bad_txt"),
            (
                Error::UpdateFailed(Box::new(Error::NoDnsListener)),
                StatusCode::INTERNAL_SERVER_ERROR,
                "db_error",
            ),
        ] {
            assert_eq!(
                APIError::from(err).status_and_code(),
                (status, code.to_string())
            );
        }
    }

    #[test]
    fn other_errors_carry_detail() {
        let (status, code) =
            APIError::from(Error::UnknownUsername(uuid::Uuid::nil())).status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(code.starts_with("no credential registered"));
    }
}

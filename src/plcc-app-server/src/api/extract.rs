//! Request body parsing and field validation.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

const INVALID_JSON: &str = "Request body must be valid JSON.";

/// A request body that parsed as a JSON object.
///
/// Any other body is rejected with `400` before a handler runs.
#[derive(Debug, Clone)]
pub struct JsonObject(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge,
                _ => AppError::BadRequest(rejection.body_text()),
            })?;

        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            _ => Err(AppError::BadRequest(INVALID_JSON.to_string())),
        }
    }
}

impl JsonObject {
    /// Read a string field.
    ///
    /// The field must be present and a string. Unless `allow_empty` is set
    /// it must also contain something other than whitespace.
    pub fn text_field(&self, field: &str, allow_empty: bool) -> AppResult<String> {
        match self.0.get(field) {
            Some(Value::String(text)) if allow_empty || !text.trim().is_empty() => Ok(text.clone()),
            _ => Err(AppError::Validation(format!(
                "Missing or invalid '{field}' field in request body."
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => JsonObject(map),
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_text_field_accepts_text() {
        let body = object(json!({ "plc_xml": "<project/>" }));
        assert_eq!(body.text_field("plc_xml", false).unwrap(), "<project/>");
    }

    #[test]
    fn test_text_field_rejects_missing_blank_and_wrong_type() {
        for body in [
            json!({}),
            json!({ "program_st": "" }),
            json!({ "program_st": "  \n\t" }),
            json!({ "program_st": 42 }),
            json!({ "program_st": null }),
            json!({ "program_st": ["PROGRAM"] }),
        ] {
            let err = object(body).text_field("program_st", false).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
            assert!(err.to_string().contains("'program_st'"));
        }
    }

    #[test]
    fn test_text_field_allow_empty() {
        let body = object(json!({ "located_variables_h": "" }));
        assert_eq!(body.text_field("located_variables_h", true).unwrap(), "");

        let missing = object(json!({}));
        assert!(missing.text_field("located_variables_h", true).is_err());
    }
}

//! Response envelopes and the request body extractor.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

/// `{ success: true, message, data }`.
pub fn ok(message: &str, data: Value) -> Response {
    with_status(StatusCode::OK, message, data)
}

pub fn created(message: &str, data: Value) -> Response {
    with_status(StatusCode::CREATED, message, data)
}

fn with_status(status: StatusCode, message: &str, data: Value) -> Response {
    (
        status,
        Json(json!({ "success": true, "message": message, "data": data })),
    )
        .into_response()
}

/// `{ success: false, message }` with a non-2xx status.
pub fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

pub fn not_found(what: &str) -> Response {
    failure(StatusCode::NOT_FOUND, &format!("{what} not found"))
}

/// A write body: a JSON object, or the fields of a `multipart/form-data`
/// upload. File parts are stored as `/uploads/<file name>`.
pub struct Payload(pub Map<String, Value>);

impl<S: Send + Sync> FromRequest<S> for Payload {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if multipart {
            let mut form = Multipart::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            let mut fields = Map::new();
            while let Some(field) = form
                .next_field()
                .await
                .map_err(|e| failure(StatusCode::BAD_REQUEST, &e.to_string()))?
            {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                let value = match field.file_name().map(str::to_string) {
                    Some(file_name) => {
                        field
                            .bytes()
                            .await
                            .map_err(|e| failure(StatusCode::BAD_REQUEST, &e.to_string()))?;
                        Value::String(format!("/uploads/{file_name}"))
                    }
                    None => text_value(
                        &field
                            .text()
                            .await
                            .map_err(|e| failure(StatusCode::BAD_REQUEST, &e.to_string()))?,
                    ),
                };
                fields.insert(name, value);
            }
            return Ok(Payload(fields));
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        if bytes.is_empty() {
            return Ok(Payload(Map::new()));
        }
        match serde_json::from_slice(&bytes) {
            Ok(Value::Object(map)) => Ok(Payload(map)),
            _ => Err(failure(StatusCode::BAD_REQUEST, "expected a JSON object")),
        }
    }
}

/// Form fields arrive as text; booleans and numbers are restored.
pub fn text_value(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = text.parse::<i64>() {
                json!(n)
            } else if let Some(n) = text.parse::<f64>().ok().filter(|n| n.is_finite()) {
                json!(n)
            } else {
                Value::String(text.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_text_is_typed() {
        assert_eq!(text_value("true"), json!(true));
        assert_eq!(text_value("3"), json!(3));
        assert_eq!(text_value("2.5"), json!(2.5));
        assert_eq!(text_value("Welcome"), json!("Welcome"));
    }
}

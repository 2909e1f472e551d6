use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::schema::{FieldError, ObjectSchema};
use crate::error::ApiError;

/// Binds a request DTO to the schema that validates it.
pub trait DeclaredSchema: DeserializeOwned {
    fn schema() -> &'static ObjectSchema;
}

/// Extractor that validates and normalizes the JSON body before the handler
/// runs. Rejection short-circuits with a 422 carrying the ordered field
/// error list; the handler only ever sees an accepted, normalized payload.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeclaredSchema,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|_| {
            ApiError::Validation(vec![FieldError::new("", "unable to read request body")])
        })?;

        // An absent body validates like `null`: rejected field-by-field when
        // the schema requires anything.
        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|_| {
                ApiError::Validation(vec![FieldError::new("", "invalid JSON body")])
            })?
        };

        let normalized = T::schema().validate(&body).map_err(ApiError::Validation)?;

        // A normalized payload failing to deserialize means the schema and
        // DTO have drifted apart, which is a server bug, not client input.
        let dto = serde_json::from_value(normalized)
            .map_err(|e| ApiError::Other(anyhow::anyhow!("schema/DTO mismatch: {e}")))?;

        Ok(ValidatedJson(dto))
    }
}

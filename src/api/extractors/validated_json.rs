//! JSON body extractor that also runs `validator` rules.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::errors::AppError;

/// Deserialize a JSON body, then validate it.
///
/// Malformed JSON and failed rules both become `VALIDATION_ERROR` (400).
///
/// ```rust,ignore
/// async fn mark(ValidatedJson(payload): ValidatedJson<MarkRequest>) { /* valid here */ }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::validation(describe(&errors)))?;

        Ok(ValidatedJson(value))
    }
}

/// One message per failed rule, ordered by field name.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, failures)| {
            failures.iter().map(move |failure| match &failure.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Badge {
        #[validate(length(min = 1, message = "code must not be empty"))]
        code: String,
        #[validate(range(max = 10))]
        reader: u32,
    }

    fn request(body: &'static str) -> Request {
        Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidatedJson(badge) =
            ValidatedJson::<Badge>::from_request(request(r#"{"code":"E-1","reader":3}"#), &())
                .await
                .unwrap();
        assert_eq!(badge.code, "E-1");
    }

    #[tokio::test]
    async fn test_failed_rules_are_listed_by_field() {
        let err = ValidatedJson::<Badge>::from_request(request(r#"{"code":"","reader":11}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "code must not be empty, reader is invalid");
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let err = ValidatedJson::<Badge>::from_request(request("{"), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use accesstrack_core::{ActorIdentity, AppError};

use crate::error::ApiError;

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// Extractor for the authenticated actor forwarded by the gateway.
///
/// Authentication happens upstream; this service trusts the forwarded
/// subject header. A request without a parseable subject is rejected
/// before any handler runs.
#[derive(Debug, Clone)]
pub struct RequestActor(pub ActorIdentity);

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| {
                ApiError(AppError::Unauthorized(format!(
                    "missing or invalid '{ACTOR_ID_HEADER}' header"
                )))
            })?;

        let display_name = parts
            .headers
            .get(ACTOR_NAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Ok(Self(ActorIdentity::new(subject, display_name)))
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRequestParts;
    use axum::http::Request;
    use uuid::Uuid;

    use accesstrack_core::AppError;

    use super::RequestActor;
    use crate::error::ApiError;

    async fn extract(request: Request<()>) -> Result<RequestActor, ApiError> {
        let (mut parts, _) = request.into_parts();
        RequestActor::from_request_parts(&mut parts, &()).await
    }

    fn request_with_headers(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/grants");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap_or_default()
    }

    #[tokio::test]
    async fn forwarded_subject_and_name_are_extracted() {
        let subject = Uuid::new_v4();
        let request = request_with_headers(&[
            ("x-actor-id", &subject.to_string()),
            ("x-actor-name", "Ops Admin"),
        ]);

        let extracted = extract(request).await;
        assert!(extracted.is_ok());
        if let Ok(RequestActor(actor)) = extracted {
            assert_eq!(actor.subject(), subject);
            assert_eq!(actor.display_name(), Some("Ops Admin"));
        }
    }

    #[tokio::test]
    async fn missing_subject_header_is_unauthorized() {
        let outcome = extract(request_with_headers(&[])).await;
        assert!(matches!(outcome, Err(ApiError(AppError::Unauthorized(_)))));
    }

    #[tokio::test]
    async fn unparseable_subject_header_is_unauthorized() {
        let outcome = extract(request_with_headers(&[("x-actor-id", "not-a-uuid")])).await;
        assert!(matches!(outcome, Err(ApiError(AppError::Unauthorized(_)))));
    }
}

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

/// Authenticated user id extractor.
///
/// The identity layer in front of this service authenticates the caller and
/// propagates their id in the `X-User-ID` header. Handlers resolve the full
/// user row from it and pass the user explicitly into the pipeline; nothing
/// downstream consults request-scoped state.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Missing X-User-ID header")))?;

        let user_id = raw
            .parse::<Uuid>()
            .map_err(|_| AppError::AuthError(anyhow::anyhow!("Malformed X-User-ID header")))?;

        // Add to tracing span for observability
        tracing::Span::current().record("user_id", raw);

        Ok(UserId(user_id))
    }
}

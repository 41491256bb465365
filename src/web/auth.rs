use super::api::{ApiError, AppState};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

const BEARER_PREFIX: &str = "bearer ";

/// Extractor that rejects requests without the configured bearer token.
#[derive(Debug)]
pub struct RequireBearer;

#[async_trait]
impl FromRequestParts<AppState> for RequireBearer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        check_bearer(header, &state.config.auth.token)?;
        Ok(RequireBearer)
    }
}

/// Checks an `Authorization` header value against the expected token.
/// The scheme is matched case-insensitively; the token is trimmed.
pub fn check_bearer(header: Option<&str>, expected: &str) -> Result<(), ApiError> {
    let provided = header
        .and_then(|value| {
            let scheme = value.get(..BEARER_PREFIX.len())?;
            scheme
                .eq_ignore_ascii_case(BEARER_PREFIX)
                .then(|| &value[BEARER_PREFIX.len()..])
        })
        .ok_or_else(|| {
            ApiError::Unauthorized("Missing or invalid Authorization header.".to_string())
        })?
        .trim();

    if provided.is_empty() || provided != expected {
        tracing::debug!("Rejected request with invalid token");
        return Err(ApiError::Unauthorized("Invalid token.".to_string()));
    }

    Ok(())
}

use crate::{
    error::AppError,
    utils::{
        cookie::{extract_cookie, ACCESS_TOKEN_COOKIE},
        jwt::decode_jwt,
    },
};
use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

/// Identity extracted from a provider-issued JWT. There is no local user
/// table; the token's claims are the whole identity.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub role: String,
}

/// JWT verification middleware for the admin surface.
///
/// Accepts Authorization: Bearer, falling back to the HttpOnly session
/// cookie set by the identity provider's console.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers)
        .or_else(|| extract_cookie(&headers, ACCESS_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let claims = decode_jwt(&token).map_err(|_| AppError::Unauthorized)?;

    let auth_user = AuthUser {
        subject: claims.sub,
        role: claims.role,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verify the caller's token carries the admin role.
pub fn require_admin(auth_user: &AuthUser) -> crate::error::AppResult<()> {
    if auth_user.role != "admin" {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Extractor for AuthUser from request extensions
use axum::extract::FromRequestParts;

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional variant for public routes that behave differently for the
/// admin (private comments are unmasked, for example).
#[derive(Debug, Clone, Default)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().map(|u| u.role == "admin").unwrap_or(false)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .or_else(|| extract_cookie(&parts.headers, ACCESS_TOKEN_COOKIE));

        let user = token
            .and_then(|t| decode_jwt(&t).ok())
            .map(|claims| AuthUser {
                subject: claims.sub,
                role: claims.role,
            });

        Ok(MaybeAuthUser(user))
    }
}

//! Caller extraction.
//!
//! Requests carrying `Authorization: Bearer <token>` are keyed by the token;
//! requests without the header share the `anonymous` key. The key only feeds
//! the request limiters, tokens are not validated here.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

/// Key shared by requests without credentials.
pub const ANONYMOUS: &str = "anonymous";

/// The caller a request is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub key: String,
}

impl Caller {
    /// Resolve a caller from the raw `Authorization` header value.
    pub fn from_header(header: Option<&str>) -> Result<Self, &'static str> {
        match header {
            Some(header) => {
                let token = header
                    .strip_prefix("Bearer ")
                    .ok_or("Invalid authorization header format")?
                    .trim();
                if token.is_empty() {
                    return Err("Empty bearer token");
                }
                Ok(Caller {
                    key: token.to_string(),
                })
            }
            None => Ok(Caller {
                key: ANONYMOUS.to_string(),
            }),
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid authorization header"))?,
            ),
            None => None,
        };

        Caller::from_header(header).map_err(|msg| (StatusCode::UNAUTHORIZED, msg))
    }
}

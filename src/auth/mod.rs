//! Authentication module
//!
//! Bearer-token authentication that yields the requesting owner's id.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub mod jwt;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token subject is not a valid owner id: {0}")]
    InvalidSubject(String),
}

/// Authenticated requester
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub owner_id: Uuid,
    pub claims: HashMap<String, serde_json::Value>,
}

/// Authenticator trait
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request
    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError>;
}

/// Authentication request context
///
/// Header names are lowercase.
#[derive(Debug, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
}

impl AuthRequest {
    pub fn from_headers(headers: &hyper::HeaderMap) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        Self { headers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_headers_lowercases() {
        let mut headers = hyper::HeaderMap::new();
        headers.insert("Authorization", "Bearer abc".parse().unwrap());
        let request = AuthRequest::from_headers(&headers);
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer abc");
    }
}

//! Display-only decoding of the identity provider's signed token.
//!
//! Nothing here verifies the signature or expiry. Claims decoded by this module
//! must not be used for authorization decisions.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{FailureKind, ToolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity token has {0} segments, expected 3")]
    SegmentCount(usize),
    #[error("identity token payload is not base64url: {0}")]
    Encoding(String),
    #[error("identity token payload is not a json object: {0}")]
    Payload(String),
    #[error("identity token lacks the `{0}` claim")]
    MissingClaim(&'static str),
}

impl From<IdentityError> for ToolError {
    fn from(err: IdentityError) -> Self {
        ToolError::new(FailureKind::Configuration, err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

pub fn decode_identity_token(token: &str) -> Result<IdentityProfile, IdentityError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(IdentityError::SegmentCount(segments.len()));
    }
    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|err| IdentityError::Encoding(err.to_string()))?;
    let claims: Claims =
        serde_json::from_slice(&payload).map_err(|err| IdentityError::Payload(err.to_string()))?;

    let id = non_empty(claims.sub).ok_or(IdentityError::MissingClaim("sub"))?;
    let email = non_empty(claims.email).ok_or(IdentityError::MissingClaim("email"))?;
    let name = non_empty(claims.name).unwrap_or_else(|| email.clone());
    Ok(IdentityProfile {
        id,
        name,
        email,
        avatar: non_empty(claims.picture),
    })
}

/// Referral identifier handed out to a signed-in user.
pub fn affiliate_id(email: &str) -> String {
    STANDARD.encode(email.as_bytes())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//! Bearer-token gate for protected routes.
//!
//! Missing credentials answer 401, a token that fails verification answers
//! 403, and a valid token without a user id or role answers 401 again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{core::app_state::AppState, error_handler::AppError};

const USER_ID_CLAIMS: [&str; 5] = ["userId", "userID", "id", "id_profesor", "id_admin"];
const ROLE_CLAIMS: [&str; 3] = ["rol", "role", "rol_usuario"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized: no Authorization header")]
    MissingHeader,
    #[error("Unauthorized: no token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Unauthorized: token missing user id or role")]
    MissingClaims,
}

impl AuthError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AuthError::InvalidToken)
    }
}

/// Caller identity, attached to the request as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: String,
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// HS256 verifier over a shared secret. `exp` is honoured when present.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn hs256(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<HashMap<String, Value>>(token, &self.key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })?;
        user_from_claims(&data.claims)
    }
}

fn claim_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_claim(claims: &HashMap<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| claims.get(*n).and_then(claim_text))
}

/// Picks the user id and role out of the first alias that carries a value.
pub fn user_from_claims(claims: &HashMap<String, Value>) -> Result<AuthUser, AuthError> {
    match (
        first_claim(claims, &USER_ID_CLAIMS),
        first_claim(claims, &ROLE_CLAIMS),
    ) {
        (Some(user_id), Some(role)) => Ok(AuthUser { user_id, role }),
        _ => Err(AuthError::MissingClaims),
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MissingToken)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// `from_fn_with_state` middleware guarding the protected routes.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;
    let token = bearer_token(header)?;
    let user = state.verifier.verify(token)?;

    debug!(user_id = %user.user_id, role = %user.role, "authenticated");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn sign(claims: Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Ok("abc.def"));
        assert_eq!(bearer_token("bearer  abc"), Ok("abc"));
        assert_eq!(bearer_token("Bearer"), Err(AuthError::MissingToken));
        assert_eq!(bearer_token("Basic abc"), Err(AuthError::MissingToken));
    }

    #[test]
    fn accepts_any_claim_alias() {
        let v = JwtVerifier::hs256("s3cret");
        let user = v
            .verify(&sign(json!({"id_profesor": 12, "rol_usuario": "profesor"}), "s3cret"))
            .unwrap();
        assert_eq!(
            user,
            AuthUser {
                user_id: "12".into(),
                role: "profesor".into()
            }
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let v = JwtVerifier::hs256("s3cret");
        let t = sign(json!({"userId": 1, "rol": "admin"}), "other");
        assert_eq!(v.verify(&t), Err(AuthError::InvalidToken));
        assert_eq!(v.verify("not-a-jwt"), Err(AuthError::InvalidToken));
    }

    #[test]
    fn expired_token_is_invalid() {
        let v = JwtVerifier::hs256("s3cret");
        let past = chrono::Utc::now().timestamp() - 3600;
        let t = sign(json!({"userId": 1, "rol": "admin", "exp": past}), "s3cret");
        assert_eq!(v.verify(&t), Err(AuthError::InvalidToken));
    }

    #[test]
    fn valid_token_without_role_is_missing_claims() {
        let v = JwtVerifier::hs256("s3cret");
        let t = sign(json!({"userId": 1}), "s3cret");
        assert_eq!(v.verify(&t), Err(AuthError::MissingClaims));
    }
}

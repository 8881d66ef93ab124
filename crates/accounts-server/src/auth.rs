//! Optional single-sign-on identity.
//!
//! Account routes resolve the caller from a `Bearer` token through an
//! [`IdentityProvider`]. Resolution never fails the request: a missing
//! token or a failed introspection yields [`User::anonymous`].

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use uuid::{Uuid, uuid};

use crate::server::AppState;

const ANONYMOUS_USER_ID: Uuid = uuid!("1a00212b-0151-4aae-9ffd-daf367461d08");
const ANONYMOUS_COMPANY_ID: Uuid = uuid!("a422fb8c-046e-4786-a076-93039cc9aab5");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company_id: Uuid,
    pub company_name: String,
}

impl User {
    pub fn anonymous() -> Self {
        Self {
            id: ANONYMOUS_USER_ID,
            name: "anonymous".into(),
            email: "anonymous@company.com".into(),
            company_id: ANONYMOUS_COMPANY_ID,
            company_name: "anonymous".into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_USER_ID
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Turns a bearer token into a user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn introspect(&self, token: &str) -> Result<User, AuthError>;
}

pub type DynIdentityProvider = Arc<dyn IdentityProvider>;

/// Accepts any token and returns the same identity.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    user: User,
}

impl StaticIdentityProvider {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self::new(User {
            id: uuid!("523b8267-098d-4b16-b86f-95f923da9ebd"),
            name: "Unknown User".into(),
            email: "email@company.com".into(),
            company_id: uuid!("0fadca55-5645-49a4-9782-44b849930bb7"),
            company_name: "Unknown Company".into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn introspect(&self, token: &str) -> Result<User, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken("empty token".into()));
        }
        Ok(self.user.clone())
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

/// The resolved caller, anonymous when no usable token was sent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(User::anonymous()));
        };
        match state.identity.introspect(token).await {
            Ok(user) => Ok(Self(user)),
            Err(e) => {
                tracing::error!(error = %e, "token introspection failed, continuing anonymously");
                Ok(Self(User::anonymous()))
            }
        }
    }
}

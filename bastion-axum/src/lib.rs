//! # Bastion Axum Integration
//!
//! Axum routes for the bastion login endpoint.
//!
//! | Route | |
//! | ----- | - |
//! | `POST /login` | `{username, secret}` → `{token, type, expires_at}` |
//! | `GET /health` | liveness and crate version |
//!
//! Wrong secrets and unknown users both produce `401 Invalid credentials`.
//! A blocked username produces `429 Too many attempts` with a `Retry-After`
//! header.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! let auth_routes = bastion_axum::routes(guard, tokens)
//!     .with_secret_encoding(SecretEncoding::Base64)
//!     .build();
//!
//! let app = Router::new().nest("/v1", auth_routes);
//! axum::serve(listener, app).await?;
//! ```

mod error;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use routes::{AuthState, create_router};
pub use types::{HealthResponse, LoginRequest, SecretEncoding, TokenResponse};

use std::sync::Arc;

use axum::Router;
use bastion_core::{AttemptStore, SecretMatcher, ThrottleGuard, TokenIssuer, UserDirectory};

/// Create the login routes.
pub fn routes<S, D, M>(
    guard: Arc<ThrottleGuard<S, D, M>>,
    tokens: Arc<dyn TokenIssuer>,
) -> AuthRouterBuilder<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    AuthRouterBuilder {
        guard,
        tokens,
        secret_encoding: SecretEncoding::default(),
    }
}

/// Builder for configuring the login routes
pub struct AuthRouterBuilder<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    guard: Arc<ThrottleGuard<S, D, M>>,
    tokens: Arc<dyn TokenIssuer>,
    secret_encoding: SecretEncoding,
}

impl<S, D, M> AuthRouterBuilder<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    pub fn with_secret_encoding(mut self, secret_encoding: SecretEncoding) -> Self {
        self.secret_encoding = secret_encoding;
        self
    }

    pub fn build(self) -> Router {
        create_router(AuthState {
            guard: self.guard,
            tokens: self.tokens,
            secret_encoding: self.secret_encoding,
        })
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use bastion_core::{
    AttemptStore, Credential, SecretMatcher, ThrottleGuard, TokenIssuer, UserDirectory,
    validation::validate_secret,
};

use crate::{
    error::{ApiError, Result},
    types::*,
};

/// Shared state for the login routes.
pub struct AuthState<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    pub guard: Arc<ThrottleGuard<S, D, M>>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub secret_encoding: SecretEncoding,
}

impl<S, D, M> Clone for AuthState<S, D, M>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    fn clone(&self) -> Self {
        Self {
            guard: Arc::clone(&self.guard),
            tokens: Arc::clone(&self.tokens),
            secret_encoding: self.secret_encoding,
        }
    }
}

pub fn create_router<S, D, M>(state: AuthState<S, D, M>) -> Router
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    Router::new()
        .route("/health", get(health_handler))
        .route("/login", post(login_handler::<S, D, M>))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn login_handler<S, D, M>(
    State(state): State<AuthState<S, D, M>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse>
where
    S: AttemptStore,
    D: UserDirectory,
    M: SecretMatcher,
{
    let secret = state.secret_encoding.decode(&request.secret)?;
    validate_secret(&secret).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = state
        .guard
        .attempt(&Credential::new(&request.username, &secret))
        .await?;
    let principal = outcome.into_result()?;

    let issued = state.tokens.issue(&principal)?;
    tracing::info!(username = %principal.username(), "Issued login token");

    Ok(Json(TokenResponse {
        token: issued.token,
        token_type: issued.token_type.to_string(),
        expires_at: issued.expires_at,
    }))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use bastion_alert::{AlertConfig, AlertPublisher, LogTransport};
    use bastion_core::{
        CredentialVerifier, Error, JwtConfig, JwtTokenIssuer, Principal, StoredUser,
        ThrottleConfig,
        error::StorageError,
        storage::{InMemoryAttemptStore, InMemoryUserDirectory},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    const JWT_SECRET: &[u8] = b"test_secret_key_for_hs256_jwt_tokens_not_for_production_use";

    struct PlainMatcher;

    impl SecretMatcher for PlainMatcher {
        fn matches(&self, secret: &str, stored_hash: &str) -> bool {
            stored_hash.strip_prefix("plain:") == Some(secret)
        }
    }

    fn state_with<D: UserDirectory>(
        directory: D,
        secret_encoding: SecretEncoding,
    ) -> (AuthState<InMemoryAttemptStore, D, PlainMatcher>, Arc<InMemoryAttemptStore>) {
        let config = ThrottleConfig::default();
        let store = Arc::new(InMemoryAttemptStore::new(config.effective_record_ttl()));
        let alerts = Arc::new(AlertPublisher::spawn(
            Arc::new(LogTransport::new()),
            &AlertConfig::default(),
        ));
        let verifier = CredentialVerifier::with_matcher(Arc::new(directory), PlainMatcher);
        let guard = Arc::new(ThrottleGuard::new(store.clone(), verifier, alerts, config));

        let state = AuthState {
            guard,
            tokens: Arc::new(JwtTokenIssuer::new(JwtConfig::new_hs256(JWT_SECRET.to_vec()))),
            secret_encoding,
        };
        (state, store)
    }

    fn app(secret_encoding: SecretEncoding) -> (Router, Arc<InMemoryAttemptStore>) {
        let directory = InMemoryUserDirectory::new();
        directory.insert(Principal::new("alice", ["USER"]), "plain:wonderland");
        let (state, store) = state_with(directory, secret_encoding);
        (create_router(state), store)
    }

    async fn post_login(app: &Router, body: Value) -> (StatusCode, header::HeaderMap, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(SecretEncoding::Plain);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_login_success_returns_bearer_token() {
        let (app, _) = app(SecretEncoding::Plain);

        let (status, _, body) =
            post_login(&app, json!({"username": "alice", "secret": "wonderland"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "Bearer");
        assert!(body["expires_at"].is_string());

        let issuer = JwtTokenIssuer::new(JwtConfig::new_hs256(JWT_SECRET.to_vec()));
        let claims = issuer.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec!["ROLE_USER"]);
    }

    #[tokio::test]
    async fn test_login_accepts_password_field() {
        let (app, _) = app(SecretEncoding::Plain);

        let (status, _, _) =
            post_login(&app, json!({"username": "alice", "password": "wonderland"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_secret_and_unknown_user_look_the_same() {
        let (app, _) = app(SecretEncoding::Plain);

        let wrong = post_login(&app, json!({"username": "alice", "secret": "nope"})).await;
        let unknown = post_login(&app, json!({"username": "mallory", "secret": "nope"})).await;

        assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.2, json!({"error": "Invalid credentials", "code": 401}));
        assert_eq!(unknown.0, wrong.0);
        assert_eq!(unknown.2, wrong.2);
    }

    #[tokio::test]
    async fn test_lockout_returns_429_with_retry_after() {
        let (app, _) = app(SecretEncoding::Plain);

        for _ in 0..4 {
            let (status, _, _) =
                post_login(&app, json!({"username": "alice", "secret": "nope"})).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, headers, body) =
            post_login(&app, json!({"username": "alice", "secret": "nope"})).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, json!({"error": "Too many attempts", "code": 429}));
        assert_eq!(headers[header::RETRY_AFTER], "900");

        // Still blocked with the right secret
        let (status, headers, _) =
            post_login(&app, json!({"username": "alice", "secret": "wonderland"})).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
        assert!(retry_after > 0 && retry_after <= 900);
    }

    #[tokio::test]
    async fn test_base64_secret() {
        let (app, store) = app(SecretEncoding::Base64);

        let (status, _, _) =
            post_login(&app, json!({"username": "alice", "secret": "d29uZGVybGFuZA=="})).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) =
            post_login(&app, json!({"username": "alice", "secret": "%%%"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_secret_is_bad_request() {
        let (app, store) = app(SecretEncoding::Plain);

        let (status, _, _) = post_login(&app, json!({"username": "alice", "secret": ""})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    struct OfflineDirectory;

    #[async_trait]
    impl UserDirectory for OfflineDirectory {
        async fn find_by_username(&self, _: &str) -> std::result::Result<Option<StoredUser>, Error> {
            Err(StorageError::Connection("connection refused to 10.0.0.7".to_string()).into())
        }
    }

    #[tokio::test]
    async fn test_directory_failure_is_opaque_500() {
        let (state, _) = state_with(OfflineDirectory, SecretEncoding::Plain);
        let app = create_router(state);

        let (status, _, body) =
            post_login(&app, json!({"username": "alice", "secret": "wonderland"})).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"error": "Internal server error", "code": 500}));
    }
}

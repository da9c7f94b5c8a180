//! HTTP Handlers
//!
//! Each handler decodes and validates its payload through
//! [`ValidatedJson`], invokes exactly one external collaborator, and maps
//! the outcome to a response envelope. Handlers hold no state of their own.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use market_identity::{upsert_user, VerifiedSignIn};
use market_payments::{amount_from_dollars, verify_event, IntentRequest, WebhookHandler};

use crate::extract::{ApiError, ValidatedJson};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Marketplace order the intent pays for
    #[validate(custom(function = "order_id_is_uuid"))]
    pub order_id: String,

    /// Amount in dollars
    #[validate(
        range(exclusive_min = 0.0, message = "must be positive"),
        custom(function = "amount_within_limit")
    )]
    pub amount: f64,
}

/// Largest amount Stripe accepts (eight digits in cents)
const MAX_CHARGE_DOLLARS: f64 = 999_999.99;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub success: bool,
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInCallbackRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub success: bool,
    pub user_id: String,
    pub email: String,
    pub is_anonymous: bool,
    pub created: bool,
}

fn amount_within_limit(value: f64) -> Result<(), ValidationError> {
    if value <= MAX_CHARGE_DOLLARS {
        Ok(())
    } else {
        let mut err = ValidationError::new("max");
        err.message = Some("must not exceed 999999.99".into());
        Err(err)
    }
}

fn order_id_is_uuid(value: &str) -> Result<(), ValidationError> {
    if uuid::Uuid::parse_str(value).is_ok() {
        Ok(())
    } else {
        let mut err = ValidationError::new("uuid");
        err.message = Some("must be a well-formed UUID".into());
        Err(err)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.gateway.is_some(),
    })
}

/// Create a Stripe payment intent for an order
pub async fn create_payment_intent(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, ApiError> {
    let gateway = state
        .gateway
        .as_ref()
        .ok_or(ApiError::Unavailable("Payments not configured"))?;

    let request = IntentRequest {
        order_id: payload.order_id,
        amount_cents: amount_from_dollars(payload.amount),
    };

    let handle = gateway
        .create_payment_intent(request)
        .await
        .map_err(|e| ApiError::collaborator(e.to_string(), e.user_message()))?;

    Ok(Json(CreateIntentResponse {
        success: true,
        client_secret: handle.client_secret,
        payment_intent_id: handle.id,
    }))
}

/// Sign-in callback: idempotent user upsert after magic-link verification
pub async fn signin_callback(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignInCallbackRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let signin = VerifiedSignIn {
        email: payload.email,
        name: payload.name,
    };

    // A store failure blocks sign-in rather than reporting a phantom success.
    let outcome = upsert_user(state.user_store.as_ref(), &signin)
        .map_err(|e| ApiError::collaborator(e.to_string(), "Sign-in could not be completed."))?;

    Ok(Json(SignInResponse {
        success: true,
        user_id: outcome.user.id.to_string(),
        email: outcome.user.email,
        is_anonymous: outcome.user.is_anonymous,
        created: outcome.created,
    }))
}

/// Stripe webhook: verify the signature and apply payment events
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let secret = state
        .webhook_secret
        .as_ref()
        .ok_or(ApiError::Unavailable("Payments not configured"))?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::BadRequest("Missing Stripe signature"))?;

    let event = verify_event(&body, signature, secret).map_err(|e| {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        ApiError::BadRequest("Invalid signature")
    })?;

    // The signature already checked out, so anything failing past this
    // point is on our side of the boundary.
    let handler = WebhookHandler::new(state.payment_store.clone());
    handler
        .handle(&event)
        .map_err(|e| ApiError::Unexpected(e.to_string()))?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    use market_identity::{IdentityError, MemoryUserStore, NewUser, UserRecord, UserStore};
    use market_payments::{MemoryPaymentStore, MockGateway, PaymentGateway};

    use crate::router;

    const ORDER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

    /// User store whose every call fails, for exercising the 500 path
    struct FailingUserStore;

    impl UserStore for FailingUserStore {
        fn get_user_by_email(&self, _email: &str) -> market_identity::Result<Option<UserRecord>> {
            Err(IdentityError::Storage("user table offline".into()))
        }

        fn create_user(&self, _new: NewUser) -> market_identity::Result<UserRecord> {
            Err(IdentityError::Storage("user table offline".into()))
        }
    }

    fn state_with(gateway: Option<Arc<dyn PaymentGateway>>) -> AppState {
        AppState {
            gateway,
            webhook_secret: None,
            payment_store: Arc::new(MemoryPaymentStore::new()),
            user_store: Arc::new(MemoryUserStore::new()),
        }
    }

    async fn post_json(
        app: axum::Router,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        post_raw(app, uri, serde_json::to_vec(body).unwrap()).await
    }

    async fn post_raw(
        app: axum::Router,
        uri: &str,
        body: impl Into<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_intent_rejects_malformed_order_id() {
        let app = router(state_with(Some(Arc::new(MockGateway::new()))));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": "not-a-uuid", "amount": 10 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["path"], "orderId");
        assert_eq!(json["details"][0]["message"], "must be a well-formed UUID");
    }

    #[tokio::test]
    async fn test_intent_rejects_non_positive_amount() {
        let app = router(state_with(Some(Arc::new(MockGateway::new()))));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": ORDER_ID, "amount": -5 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["path"], "amount");
        assert_eq!(json["details"][0]["message"], "must be positive");
    }

    #[tokio::test]
    async fn test_intent_rejects_missing_amount() {
        let app = router(state_with(Some(Arc::new(MockGateway::new()))));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": ORDER_ID }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["path"], "amount");
    }

    #[tokio::test]
    async fn test_intent_rejects_amount_above_limit() {
        let app = router(state_with(Some(Arc::new(MockGateway::new()))));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": ORDER_ID, "amount": 1e307 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["path"], "amount");
        assert_eq!(json["details"][0]["message"], "must not exceed 999999.99");
    }

    #[tokio::test]
    async fn test_intent_success_envelope() {
        let app = router(state_with(Some(Arc::new(MockGateway::new()))));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": ORDER_ID, "amount": 25.00 }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "clientSecret": "secret_1",
                "paymentIntentId": "pi_1",
            })
        );
    }

    #[tokio::test]
    async fn test_intent_collaborator_failure_is_generic() {
        let app = router(state_with(Some(Arc::new(MockGateway::failing()))));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": ORDER_ID, "amount": 25.00 }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Payment processing failed. Please try again.");
        assert!(!json.to_string().contains("mock gateway"));
    }

    #[tokio::test]
    async fn test_intent_unavailable_without_stripe() {
        let app = router(state_with(None));

        let (status, json) = post_json(
            app,
            "/api/payments/intent",
            &serde_json::json!({ "orderId": ORDER_ID, "amount": 25.00 }),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "Payments not configured");
    }

    #[tokio::test]
    async fn test_intent_malformed_body_is_decode_failure() {
        let app = router(state_with(Some(Arc::new(MockGateway::new()))));

        let (status, json) = post_raw(app, "/api/payments/intent", "{not json").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Malformed request body");
    }

    #[tokio::test]
    async fn test_signin_upsert_is_idempotent() {
        let user_store = Arc::new(MemoryUserStore::new());
        let mut state = state_with(None);
        state.user_store = user_store.clone();
        let app = router(state);

        let body = serde_json::json!({ "email": "buyer@example.com", "name": "Buyer" });

        let (status, json) = post_json(app.clone(), "/api/auth/callback", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["isAnonymous"], false);
        assert_eq!(json["created"], true);
        assert_eq!(user_store.len(), 1);

        let (status, json) = post_json(app, "/api/auth/callback", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["created"], false);
        assert_eq!(user_store.len(), 1);
    }

    #[tokio::test]
    async fn test_signin_store_failure_blocks_sign_in() {
        let mut state = state_with(None);
        state.user_store = Arc::new(FailingUserStore);
        let app = router(state);

        let (status, json) = post_json(
            app,
            "/api/auth/callback",
            &serde_json::json!({ "email": "buyer@example.com" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Sign-in could not be completed.");
        assert!(!json.to_string().contains("user table offline"));
    }

    #[tokio::test]
    async fn test_signin_rejects_invalid_email() {
        let app = router(state_with(None));

        let (status, json) = post_json(
            app,
            "/api/auth/callback",
            &serde_json::json!({ "email": "not-an-email" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["path"], "email");
    }

    #[tokio::test]
    async fn test_webhook_unavailable_without_stripe() {
        let app = router(state_with(None));

        let (status, _) = post_raw(app, "/webhook/stripe", "{}").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_webhook_requires_signature() {
        let mut state = state_with(None);
        state.webhook_secret = Some("whsec_test".into());
        let app = router(state);

        let (status, json) = post_raw(app, "/webhook/stripe", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing Stripe signature");
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let mut state = state_with(None);
        state.webhook_secret = Some("whsec_test".into());
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook/stripe")
                    .header("content-type", "application/json")
                    .header("stripe-signature", "t=1,v1=bad")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Invalid signature");
    }

    #[tokio::test]
    async fn test_health_reports_stripe_state() {
        let app = router(state_with(None));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["stripe_configured"], false);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::{Asset, TokenBalance},
    error::ErrorBody,
    payments::{
        AccountView, AuditPage, DecodedTransfer, OnChainAccount, TransactionPage, TransactionView,
    },
    state::AppState,
    storage::{
        AuditEvent, AuditEventType, ContentPurchase, CreatorSupport, CreditReceipt,
        LedgerTransaction, Purpose, PurposeRecord, Subscription, SubscriptionStatus, TxStatus,
        WalletBalance,
    },
};

pub mod cors;
pub mod edge;
pub mod health;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let app_routes = Router::new()
        .route("/", post(edge::handle))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(app_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(from_fn(cors::cors))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        edge::handle,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            edge::EdgeRequest,
            ErrorBody,
            crate::payments::PaymentClaim,
            crate::payments::TransactionQuery,
            crate::payments::AccountQuery,
            crate::payments::PageQuery,
            CreditReceipt,
            LedgerTransaction,
            WalletBalance,
            Purpose,
            PurposeRecord,
            ContentPurchase,
            Subscription,
            SubscriptionStatus,
            CreatorSupport,
            TxStatus,
            Asset,
            TokenBalance,
            DecodedTransfer,
            TransactionView,
            OnChainAccount,
            AccountView,
            TransactionPage,
            AuditPage,
            AuditEvent,
            AuditEventType,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Edge", description = "Payment verification and ledger lookups"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractor::tests::token_for;
    use crate::blockchain::mock::MockChain;
    use crate::blockchain::trc20::tests::transfer_log;
    use crate::payments::verifier::tests::{payer, treasury, usdt, HASH};
    use crate::state::tests::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn edge_request(token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn claim_body() -> serde_json::Value {
        serde_json::json!({
            "operation": "verify_transaction",
            "data": {
                "txHash": HASH,
                "amount": 5,
                "purpose": "content_purchase",
                "contentId": "video-7",
            }
        })
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state(Arc::new(MockChain::new()));
        let _ = router(state).into_make_service();
    }

    #[tokio::test]
    async fn missing_token_short_circuits_before_chain() {
        let chain = Arc::new(MockChain::new());
        let (state, _dir) = test_state(chain.clone());
        let db = state.db.clone();

        let response = router(state).oneshot(edge_request(None, claim_body())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "missing_auth_header");
        assert_eq!(chain.calls(), 0);
        assert_eq!(db.transaction_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_token_short_circuits_before_chain() {
        let chain = Arc::new(MockChain::new());
        let (state, _dir) = test_state(chain.clone());

        let response = router(state)
            .oneshot(edge_request(Some("not-a-token"), claim_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error_code"], "malformed_token");
        assert_eq!(chain.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_operation_has_no_side_effects() {
        let chain = Arc::new(MockChain::new());
        let (state, _dir) = test_state(chain.clone());
        let db = state.db.clone();

        let response = router(state)
            .oneshot(edge_request(
                Some(&token_for("user-1")),
                serde_json::json!({ "operation": "refund_everything", "data": {} }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error_code"], "unknown_operation");
        assert_eq!(chain.calls(), 0);
        assert_eq!(db.transaction_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_request() {
        let (state, _dir) = test_state(Arc::new(MockChain::new()));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for("user-1")))
            .body(Body::from("{not json"))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error_code"], "invalid_request");
    }

    #[tokio::test]
    async fn verify_transaction_credits_caller() {
        let chain = Arc::new(MockChain::new());
        chain.add_trc20_call(
            HASH,
            &payer(),
            &usdt(),
            vec![transfer_log(&usdt(), &payer(), &treasury(), 5_000_000)],
            Some(50),
        );
        let (state, _dir) = test_state(chain);

        let response = router(state)
            .oneshot(edge_request(Some(&token_for("user-1")), claim_body()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["transaction"]["user_id"], "user-1");
        assert_eq!(body["data"]["wallet"]["balance_units"], 5_000_000);
        assert_eq!(body["data"]["record"]["kind"], "content_purchase");
    }

    #[tokio::test]
    async fn replayed_claim_is_rejected_over_http() {
        let chain = Arc::new(MockChain::new());
        chain.add_trc20_call(
            HASH,
            &payer(),
            &usdt(),
            vec![transfer_log(&usdt(), &payer(), &treasury(), 5_000_000)],
            Some(50),
        );
        let (state, _dir) = test_state(chain);
        let app = router(state);

        let first = app
            .clone()
            .oneshot(edge_request(Some(&token_for("user-1")), claim_body()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(edge_request(Some(&token_for("user-2")), claim_body()))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(second).await["error_code"], "already_credited");
    }

    #[tokio::test]
    async fn list_transactions_without_data() {
        let (state, _dir) = test_state(Arc::new(MockChain::new()));

        let response = router(state)
            .oneshot(edge_request(
                Some(&token_for("user-1")),
                serde_json::json!({ "operation": "list_transactions" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["transactions"], serde_json::json!([]));
        assert!(body["data"]["next_cursor"].is_null());
    }

    #[tokio::test]
    async fn preflight_returns_no_content() {
        let (state, _dir) = test_state(Arc::new(MockChain::new()));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "authorization, x-client-info, apikey, content-type"
        );
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let (state, _dir) = test_state(Arc::new(MockChain::new()));
        let request = Request::builder().uri("/health/live").body(Body::empty()).unwrap();

        let response = router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}

//! Transaction sync endpoint.
//!
//! `POST /transactions/sync` takes one `{ action, payload }` command and
//! answers `{ "success": true }` or `{ error, code, kind }` with the status
//! the ledger error maps to.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tally_core::ledger::{LedgerError, SyncCommand};
use tracing::{error, info, warn};

use crate::{AppState, middleware::AuthUser};

/// Creates the sync routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/transactions/sync", post(sync_transaction))
}

async fn sync_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Result<Json<SyncCommand>, JsonRejection>,
) -> Response {
    let command = match body {
        Ok(Json(command)) => command,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed sync command");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": rejection.body_text(),
                    "code": "INVALID_COMMAND",
                    "kind": "validation"
                })),
            )
                .into_response();
        }
    };

    let actor = auth.user_id();
    match state.dispatcher.dispatch(actor, command).await {
        Ok(outcome) => {
            info!(
                user_id = %actor,
                transaction_id = %outcome.transaction_id,
                effect = ?outcome.effect,
                "Sync command applied"
            );
            (StatusCode::OK, Json(json!({ "success": true }))).into_response()
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// Renders a ledger error. Server-side failures are logged and their detail
/// is withheld from the client.
fn ledger_error_response(err: &LedgerError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if status.is_server_error() {
        error!(error = %err, code = err.error_code(), "Sync command failed");
        "Internal server error".to_string()
    } else {
        warn!(error = %err, code = err.error_code(), "Sync command rejected");
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": message,
            "code": err.error_code(),
            "kind": err.kind().as_str()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, header::AUTHORIZATION};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::Value;
    use tally_core::ledger::SyncAction;
    use tally_core::sync::{CommandDispatcher, SyncEffect, SyncOutcome};
    use tally_shared::types::{TransactionId, UserId};
    use tally_shared::{Claims, JwtConfig, JwtService};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::create_router;

    const SECRET: &str = "sync-route-test-secret";

    /// Records every command and answers with a fixed result.
    struct StubDispatcher {
        result: fn(TransactionId) -> Result<SyncOutcome, LedgerError>,
        seen: Mutex<Vec<(UserId, SyncCommand)>>,
    }

    #[async_trait]
    impl CommandDispatcher for StubDispatcher {
        async fn dispatch(
            &self,
            actor: UserId,
            command: SyncCommand,
        ) -> Result<SyncOutcome, LedgerError> {
            let id = command
                .payload
                .id
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            self.seen.lock().unwrap().push((actor, command));
            (self.result)(id)
        }
    }

    fn created(id: TransactionId) -> Result<SyncOutcome, LedgerError> {
        Ok(SyncOutcome {
            transaction_id: id,
            effect: SyncEffect::Created,
            adjustments: Vec::new(),
        })
    }

    fn app(result: fn(TransactionId) -> Result<SyncOutcome, LedgerError>) -> (Router, Arc<StubDispatcher>) {
        let dispatcher = Arc::new(StubDispatcher {
            result,
            seen: Mutex::new(Vec::new()),
        });
        let state = AppState {
            dispatcher: dispatcher.clone(),
            jwt_service: Arc::new(JwtService::new(&JwtConfig {
                secret: SECRET.to_string(),
            })),
        };
        (create_router(state), dispatcher)
    }

    fn token(user: Uuid) -> String {
        encode(
            &Header::default(),
            &Claims::new(user, Utc::now() + Duration::hours(1)),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn sync_request(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/transactions/sync")
            .header("Content-Type", "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    const SAVE_BODY: &str = r#"{
        "action": "SAVE",
        "payload": {
            "id": "0192f3a4-5b6c-7d8e-9f01-23456789abcd",
            "amount": "12.50",
            "type": "EXPENSE",
            "status": "PAID",
            "date": "2026-05-10",
            "accountId": "0192f3a4-5b6c-7d8e-9f01-000000000001"
        }
    }"#;

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = app(created);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_sync_requires_token() {
        let (app, dispatcher) = app(created);
        let response = app.oneshot(sync_request(None, SAVE_BODY)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "MISSING_TOKEN");
        assert!(dispatcher.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_rejects_bad_token() {
        let (app, _) = app(created);
        let response = app
            .oneshot(sync_request(Some("not.a.token"), SAVE_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_sync_dispatches_as_token_subject() {
        let (app, dispatcher) = app(created);
        let user = Uuid::new_v4();
        let response = app
            .oneshot(sync_request(Some(&token(user)), SAVE_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "success": true }));

        let seen = dispatcher.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, UserId::from_uuid(user));
        assert_eq!(seen[0].1.action, SyncAction::Save);
        assert_eq!(seen[0].1.payload.amount, Some(json!("12.50")));
    }

    #[tokio::test]
    async fn test_unknown_action_is_bad_request() {
        let (app, dispatcher) = app(created);
        let response = app
            .oneshot(sync_request(
                Some(&token(Uuid::new_v4())),
                r#"{"action":"PURGE","payload":{}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_COMMAND");
        assert_eq!(body["kind"], "validation");
        assert!(dispatcher.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_errors_keep_their_status() {
        let (app, _) = app(|id| Err(LedgerError::TransactionDeleted(id.into_inner())));
        let response = app
            .oneshot(sync_request(Some(&token(Uuid::new_v4())), SAVE_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], LedgerError::TransactionDeleted(Uuid::nil()).error_code());
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn test_contention_is_conflict() {
        let (app, _) = app(|_| Err(LedgerError::ConcurrentModification));
        let response = app
            .oneshot(sync_request(Some(&token(Uuid::new_v4())), SAVE_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["kind"], "contention");
    }

    #[tokio::test]
    async fn test_server_errors_hide_detail() {
        let (app, _) = app(|_| Err(LedgerError::Database("password=hunter2".into())));
        let response = app
            .oneshot(sync_request(Some(&token(Uuid::new_v4())), SAVE_BODY))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["kind"], "internal");
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-endpoint operation dispatch.
//!
//! Clients `POST /` with `{operation, data}`. Authentication runs first;
//! the body is only parsed for authenticated callers.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use utoipa::ToSchema;

use crate::auth::Auth;
use crate::error::{ApiError, ApiSuccess, ErrorBody};
use crate::payments::{AccountQuery, PageQuery, PaymentClaim, TransactionQuery};
use crate::state::AppState;

pub const VERIFY_TRANSACTION: &str = "verify_transaction";
pub const GET_TRANSACTION: &str = "get_transaction";
pub const GET_ACCOUNT: &str = "get_account";
pub const LIST_TRANSACTIONS: &str = "list_transactions";
pub const LIST_AUDIT_EVENTS: &str = "list_audit_events";

/// Edge request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EdgeRequest {
    /// One of `verify_transaction`, `get_transaction`, `get_account`,
    /// `list_transactions`, `list_audit_events`
    pub operation: String,
    /// Operation input
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
}

/// Edge entrypoint.
#[utoipa::path(
    post,
    path = "/",
    tag = "Edge",
    request_body = EdgeRequest,
    responses(
        (status = 200, description = "Operation succeeded; body is `{success: true, data}`"),
        (status = 400, description = "Any failure", body = ErrorBody)
    )
)]
pub async fn handle(
    State(state): State<AppState>,
    Auth(user): Auth,
    payload: Result<Json<EdgeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let payments = &state.payments;
    let user_id = user.user_id.as_str();

    tracing::debug!(user_id = %user_id, operation = %request.operation, "Edge request");

    let response = match request.operation.as_str() {
        VERIFY_TRANSACTION => {
            let claim: PaymentClaim = operation_data(request.data)?;
            let receipt = payments.verify_transaction(user_id, &claim).await?;
            ApiSuccess::new(receipt).into_response()
        }
        GET_TRANSACTION => {
            let query: TransactionQuery = operation_data(request.data)?;
            ApiSuccess::new(payments.get_transaction(user_id, &query).await?).into_response()
        }
        GET_ACCOUNT => {
            let query: AccountQuery = operation_data(request.data)?;
            ApiSuccess::new(payments.get_account(user_id, &query).await?).into_response()
        }
        LIST_TRANSACTIONS => {
            let query: PageQuery = operation_data(request.data)?;
            ApiSuccess::new(payments.list_transactions(user_id, &query)?).into_response()
        }
        LIST_AUDIT_EVENTS => {
            let query: PageQuery = operation_data(request.data)?;
            ApiSuccess::new(payments.list_audit_events(user_id, &query)?).into_response()
        }
        other => {
            tracing::info!(user_id = %user_id, operation = %other, "Unknown edge operation");
            return Err(ApiError::unknown_operation(other));
        }
    };

    Ok(response)
}

/// Decode `data`, treating a missing payload as `{}`.
fn operation_data<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, ApiError> {
    let data = match data {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => other,
    };
    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_reads_as_empty_object() {
        let query: PageQuery = operation_data(serde_json::Value::Null).unwrap();
        assert!(query.cursor.is_none());
        assert!(query.limit.is_none());
    }

    #[test]
    fn wrong_shape_is_invalid_request() {
        let err = operation_data::<TransactionQuery>(serde_json::json!({ "hash": 1 })).unwrap_err();
        assert_eq!(err.code, "invalid_request");
    }

    #[test]
    fn request_without_data_parses() {
        let request: EdgeRequest =
            serde_json::from_value(serde_json::json!({ "operation": "get_account" })).unwrap();
        assert_eq!(request.operation, GET_ACCOUNT);
        assert!(request.data.is_null());
    }
}

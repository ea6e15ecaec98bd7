//! Payment gateway notification endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use checkout::CallbackReply;
use domain::PaymentMethod;
use serde::Deserialize;
use tracing::warn;

use crate::state::{AppState, Backend};

#[derive(Debug, Deserialize)]
pub struct PaymentNotice {
    pub order_no: String,
    pub payment_method: Option<String>,
}

/// POST /orders/notify/payment-success
///
/// The gateway expects a bare `SUCCESS` or `FAIL` body and redelivers on
/// anything but `SUCCESS`.
#[tracing::instrument(skip(state))]
pub async fn payment_success<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Query(notice): Query<PaymentNotice>,
) -> (StatusCode, &'static str) {
    let payment_method = match notice.payment_method.as_deref() {
        None => PaymentMethod::default(),
        Some(raw) => match raw.parse::<PaymentMethod>() {
            Ok(method) => method,
            Err(e) => {
                warn!(order_no = %notice.order_no, error = %e, "Unknown payment method");
                return reply(CallbackReply::Fail);
            }
        },
    };

    reply(state.payments.reply(&notice.order_no, payment_method).await)
}

fn reply(outcome: CallbackReply) -> (StatusCode, &'static str) {
    let status = match outcome {
        CallbackReply::Success => StatusCode::OK,
        CallbackReply::Fail => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, outcome.as_str())
}

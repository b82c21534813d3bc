use std::sync::Arc;

use escrow_payment_engine::{
    CaptureResult,
    GatewayError,
    GatewayHold,
    GatewayObjectStatus,
    HoldRequest,
    PaymentGateway,
    PayoutRequest,
    TransferRequest,
};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use crate::{
    config::GatewayConfig,
    data_objects::{ErrorBody, HoldResource, ObjectResource, PayoutResource, TransferResource},
    GatewayClientError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayClientError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| GatewayClientError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayClientError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}{path}", self.config.base_url, self.config.api_version)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        idempotency_key: Option<&str>,
        body: Option<B>,
    ) -> Result<T, GatewayClientError> {
        let url = self.url(path);
        trace!("Sending gateway request: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(GatewayClientError::from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            trace!("Gateway request successful. {status}");
            response.json::<T>().await.map_err(|e| GatewayClientError::JsonError(e.to_string()))
        } else {
            let body = response.text().await.map_err(|e| GatewayClientError::JsonError(e.to_string()))?;
            let detail = serde_json::from_str::<ErrorBody>(&body).map(|b| b.error).unwrap_or_default();
            debug!("Gateway request failed with {status}: {} {}", detail.code, detail.message);
            Err(GatewayClientError::QueryError {
                status: status.as_u16(),
                code: if detail.code.is_empty() { status.as_str().to_string() } else { detail.code },
                message: if detail.message.is_empty() { body } else { detail.message },
            })
        }
    }
}

impl PaymentGateway for GatewayApi {
    async fn authorize_hold(&self, request: HoldRequest) -> Result<GatewayHold, GatewayError> {
        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "capture_method": "manual",
            "routing": {
                "destination": request.destination_account,
                "platform_fee_amount": request.platform_fee,
            },
            "metadata": { "order_id": request.order_id },
        });
        let hold: HoldResource = self
            .rest_query(Method::POST, "/holds", Some(request.idempotency_key.as_str()), Some(body))
            .await?;
        debug!("Gateway hold [{}] authorized over {}", hold.id, hold.amount);
        Ok(GatewayHold { hold_id: hold.id, amount: hold.amount, status: hold.status })
    }

    async fn capture_hold(&self, hold_id: &str) -> Result<CaptureResult, GatewayError> {
        let path = format!("/holds/{hold_id}/capture");
        let hold: HoldResource = self.rest_query(Method::POST, &path, None, None::<()>).await?;
        debug!("Gateway hold [{}] captured", hold.id);
        Ok(CaptureResult {
            hold_id: hold.id,
            captured_amount: hold.amount_captured.unwrap_or(hold.amount),
            status: hold.status,
        })
    }

    async fn create_transfer(&self, request: TransferRequest) -> Result<String, GatewayError> {
        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "destination": request.destination_account,
            "metadata": request.metadata,
        });
        let transfer: TransferResource = self.rest_query(Method::POST, "/transfers", None, Some(body)).await?;
        debug!("Gateway transfer [{}] of {} created", transfer.id, transfer.amount);
        Ok(transfer.id)
    }

    async fn create_payout(&self, request: PayoutRequest) -> Result<String, GatewayError> {
        let body = json!({
            "amount": request.amount,
            "currency": request.currency,
            "destination": request.destination_account,
            "metadata": request.metadata,
        });
        let payout: PayoutResource = self
            .rest_query(Method::POST, "/payouts", Some(request.idempotency_key.as_str()), Some(body))
            .await?;
        debug!("Gateway payout [{}] of {} created", payout.id, payout.amount);
        Ok(payout.id)
    }

    async fn retrieve_object(&self, id: &str) -> Result<GatewayObjectStatus, GatewayError> {
        let path = format!("/objects/{id}");
        let object: ObjectResource = self.rest_query(Method::GET, &path, None, None::<()>).await?;
        Ok(object.status)
    }
}

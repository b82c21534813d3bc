//! A scriptable in-memory [`PaymentGateway`] for tests.
//!
//! The gateway honours idempotency keys the way a real gateway would (a repeated authorize or
//! payout with the same key returns the original object), records every call so tests can assert
//! on exactly which operations were made, and can be scripted to fail specific operations.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use epe_common::MinorUnits;

use crate::traits::{
    CaptureResult,
    GatewayError,
    GatewayHold,
    GatewayObjectStatus,
    HoldRequest,
    PaymentGateway,
    PayoutRequest,
    TransferRequest,
};

#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    counter: u64,
    holds_by_key: HashMap<String, GatewayHold>,
    payouts_by_key: HashMap<String, String>,
    hold_status: HashMap<String, (MinorUnits, GatewayObjectStatus)>,
    authorize_failures: VecDeque<GatewayError>,
    capture_failures: HashMap<String, GatewayError>,
    transfer_failures: VecDeque<GatewayError>,
    payout_failures: VecDeque<GatewayError>,
    transfers: Vec<TransferRequest>,
    payouts: Vec<PayoutRequest>,
    calls: Vec<String>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `authorize_hold` call to fail with the given error.
    pub fn fail_next_authorize(&self, error: GatewayError) {
        self.inner.lock().unwrap().authorize_failures.push_back(error);
    }

    /// Scripts every `capture_hold` call for the given hold to fail with the given error.
    pub fn fail_capture(&self, hold_id: &str, error: GatewayError) {
        self.inner.lock().unwrap().capture_failures.insert(hold_id.to_string(), error);
    }

    /// Scripts the next `create_transfer` call to fail with the given error.
    pub fn fail_next_transfer(&self, error: GatewayError) {
        self.inner.lock().unwrap().transfer_failures.push_back(error);
    }

    /// Scripts the next `create_payout` call to fail with the given error.
    pub fn fail_next_payout(&self, error: GatewayError) {
        self.inner.lock().unwrap().payout_failures.push_back(error);
    }

    /// Every gateway operation made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().calls.len()
    }

    /// The transfer requests received so far.
    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.inner.lock().unwrap().transfers.clone()
    }

    /// The payout requests received so far.
    pub fn payouts(&self) -> Vec<PayoutRequest> {
        self.inner.lock().unwrap().payouts.clone()
    }
}

impl PaymentGateway for MemoryGateway {
    async fn authorize_hold(&self, request: HoldRequest) -> Result<GatewayHold, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("authorize_hold:{}", request.idempotency_key));
        if let Some(e) = inner.authorize_failures.pop_front() {
            return Err(e);
        }
        if let Some(existing) = inner.holds_by_key.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }
        inner.counter += 1;
        let hold = GatewayHold {
            hold_id: format!("hold_{}", inner.counter),
            amount: request.amount,
            status: GatewayObjectStatus::RequiresCapture,
        };
        inner.hold_status.insert(hold.hold_id.clone(), (request.amount, GatewayObjectStatus::RequiresCapture));
        inner.holds_by_key.insert(request.idempotency_key, hold.clone());
        Ok(hold)
    }

    async fn capture_hold(&self, hold_id: &str) -> Result<CaptureResult, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("capture_hold:{hold_id}"));
        if let Some(e) = inner.capture_failures.get(hold_id) {
            return Err(e.clone());
        }
        match inner.hold_status.get_mut(hold_id) {
            Some((amount, status @ GatewayObjectStatus::RequiresCapture)) => {
                *status = GatewayObjectStatus::Succeeded;
                Ok(CaptureResult { hold_id: hold_id.to_string(), captured_amount: *amount, status: GatewayObjectStatus::Succeeded })
            },
            Some(_) => Err(GatewayError::declined("hold_not_capturable", "The hold has already been settled")),
            None => Err(GatewayError::declined("resource_missing", "No such hold")),
        }
    }

    async fn create_transfer(&self, request: TransferRequest) -> Result<String, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("create_transfer:{}", request.destination_account));
        if let Some(e) = inner.transfer_failures.pop_front() {
            return Err(e);
        }
        inner.counter += 1;
        let transfer_id = format!("tr_{}", inner.counter);
        inner.transfers.push(request);
        Ok(transfer_id)
    }

    async fn create_payout(&self, request: PayoutRequest) -> Result<String, GatewayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(format!("create_payout:{}", request.idempotency_key));
        if let Some(e) = inner.payout_failures.pop_front() {
            return Err(e);
        }
        if let Some(existing) = inner.payouts_by_key.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }
        inner.counter += 1;
        let payout_id = format!("po_{}", inner.counter);
        inner.payouts_by_key.insert(request.idempotency_key.clone(), payout_id.clone());
        inner.payouts.push(request);
        Ok(payout_id)
    }

    async fn retrieve_object(&self, id: &str) -> Result<GatewayObjectStatus, GatewayError> {
        let inner = self.inner.lock().unwrap();
        match inner.hold_status.get(id) {
            Some((_, status)) => Ok(*status),
            None if id.starts_with("tr_") || id.starts_with("po_") => Ok(GatewayObjectStatus::Succeeded),
            None => Err(GatewayError::declined("resource_missing", "No such object")),
        }
    }
}

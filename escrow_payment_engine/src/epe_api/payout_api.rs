use std::fmt::Debug;

use epe_common::MinorUnits;
use log::*;
use serde_json::json;

use crate::{
    db_types::{NewPayoutBatch, OrderId},
    epe_api::{
        errors::{EscrowApiError, PartialBatchError},
        objects::{AvailablePayout, PayoutOrderSummary, PayoutSummary},
    },
    events::{EventProducers, PayoutRequestedEvent},
    helpers::payout_idempotency_key,
    traits::{EscrowLedger, PaymentGateway, PayoutRequest},
};

/// `PayoutApi` consolidates a provider's completed, payable orders into a single gateway payout
/// and performs the corresponding ledger status transition.
pub struct PayoutApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for PayoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B, G> PayoutApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, G> PayoutApi<B, G>
where
    B: EscrowLedger,
    G: PaymentGateway,
{
    /// Lists the provider's payout-eligible orders and their summed net amounts. Pure read; safe
    /// to call arbitrarily often.
    pub async fn available_payout(&self, provider_id: &str) -> Result<AvailablePayout, EscrowApiError> {
        let orders = self.db.payout_eligible_orders(provider_id).await?;
        let orders: Vec<PayoutOrderSummary> = orders
            .iter()
            .map(|o| PayoutOrderSummary { order_id: o.order_id.clone(), net_amount: o.net_amount() })
            .collect();
        let total = orders.iter().map(|o| o.net_amount).sum();
        Ok(AvailablePayout { provider_id: provider_id.to_string(), total, orders })
    }

    /// Requests a single payout covering all of the provider's eligible orders.
    ///
    /// `requested_amount` is a soft cap: when it is below the available total the payout amount
    /// is clamped, but no order is excluded from the batch — the engine does not select order
    /// subsets by value. Prefer omitting it and paying out the full total.
    ///
    /// Double-payout safety comes from two independent mechanisms: the eligibility query is
    /// consumed by the first successful call (every covered order leaves `AvailableForPayout`),
    /// and the gateway request carries an idempotency key derived from the provider and the
    /// covered order-id set.
    ///
    /// Once the gateway payout has been requested it cannot be un-requested. A ledger failure
    /// after that point is reported as a partial-batch error carrying the payout id and covered
    /// order ids, and must be reconciled administratively.
    pub async fn request_payout(
        &self,
        provider_id: &str,
        requested_amount: Option<MinorUnits>,
    ) -> Result<PayoutSummary, EscrowApiError> {
        let orders = self.db.payout_eligible_orders(provider_id).await?;
        if orders.is_empty() {
            return Err(EscrowApiError::NoEligibleOrders(provider_id.to_string()));
        }
        let account = orders
            .iter()
            .find_map(|o| o.payout_account.clone())
            .ok_or_else(|| EscrowApiError::NoPayoutAccount(provider_id.to_string()))?;
        let total: MinorUnits = orders.iter().map(|o| o.net_amount()).sum();
        if !total.is_positive() {
            return Err(EscrowApiError::Validation(format!("payout amount must be positive, got {total}")));
        }
        let amount = match requested_amount {
            Some(requested) if requested < total => {
                warn!(
                    "💸️ Payout for provider [{provider_id}] capped at {requested} below the available total {total}. \
                     All {} eligible orders are still consumed by this payout.",
                    orders.len()
                );
                requested
            },
            _ => total,
        };
        if !amount.is_positive() {
            return Err(EscrowApiError::Validation(format!("payout amount must be positive, got {amount}")));
        }

        let order_ids: Vec<OrderId> = orders.iter().map(|o| o.order_id.clone()).collect();
        let currency = orders[0].currency.clone();
        let key = payout_idempotency_key(provider_id, &order_ids);
        let request = PayoutRequest {
            amount,
            currency,
            destination_account: account,
            metadata: json!({ "provider_id": provider_id, "order_ids": &order_ids }),
            idempotency_key: key,
        };
        let payout_id = self.gateway.create_payout(request).await?;
        info!(
            "💸️ Payout [{payout_id}] of {amount} requested for provider [{provider_id}] covering {} orders",
            order_ids.len()
        );

        // The money movement has been requested; from here on failures are reported loudly and
        // reconciled, never rolled back.
        if let Err(e) = self.db.mark_orders_payout_requested(&order_ids, &payout_id).await {
            error!(
                "💸️ Payout [{payout_id}] was requested at the gateway but the order status batch write failed: {e}. \
                 Manual reconciliation required for provider [{provider_id}]."
            );
            return Err(EscrowApiError::PartialBatch(PartialBatchError {
                payout_id: Some(payout_id),
                order_ids,
                detail: format!("order status batch write failed: {e}"),
            }));
        }
        let batch = NewPayoutBatch {
            payout_id: payout_id.clone(),
            provider_id: provider_id.to_string(),
            order_ids: order_ids.clone(),
            total_amount: amount,
        };
        if let Err(e) = self.db.insert_payout_batch(batch).await {
            error!(
                "💸️ Payout [{payout_id}] was requested and the orders were marked, but the payout log write failed: \
                 {e}. Manual reconciliation required for provider [{provider_id}]."
            );
            return Err(EscrowApiError::PartialBatch(PartialBatchError {
                payout_id: Some(payout_id),
                order_ids,
                detail: format!("payout log write failed: {e}"),
            }));
        }

        let summary = PayoutSummary {
            payout_id,
            provider_id: provider_id.to_string(),
            amount,
            order_count: order_ids.len(),
            order_ids,
        };
        self.call_payout_requested_hook(&summary).await;
        Ok(summary)
    }

    async fn call_payout_requested_hook(&self, summary: &PayoutSummary) {
        for emitter in &self.producers.payout_requested_producer {
            let event = PayoutRequestedEvent {
                provider_id: summary.provider_id.clone(),
                payout_id: summary.payout_id.clone(),
                amount: summary.amount,
                order_ids: summary.order_ids.clone(),
            };
            emitter.publish_event(event).await;
        }
    }
}

use std::fmt::Debug;

use log::*;
use serde_json::json;

use crate::{
    db_types::{CompletingParty, CompletionState, OrderId, OrderStatusType, PayoutStatus},
    epe_api::{errors::EscrowApiError, objects::CompletionResult},
    events::{EventProducers, OrderCompletedEvent},
    traits::{EscrowLedger, PaymentGateway, TransferRequest},
};

/// `CompletionApi` maintains the dual-confirmation state of orders and runs the direct-transfer
/// path for orders completed by customer sign-off.
pub struct CompletionApi<B, G> {
    db: B,
    gateway: G,
    producers: EventProducers,
}

impl<B, G> Debug for CompletionApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CompletionApi")
    }
}

impl<B, G> CompletionApi<B, G> {
    pub fn new(db: B, gateway: G, producers: EventProducers) -> Self {
        Self { db, gateway, producers }
    }
}

impl<B, G> CompletionApi<B, G>
where
    B: EscrowLedger,
    G: PaymentGateway,
{
    /// Records that `party` has marked the order complete. `both_parties_complete` becomes true
    /// exactly when both flags are set; that flag is the sole trigger condition for escrow
    /// release. Pure state merge; fails only when the order is unknown or storage is
    /// unavailable.
    pub async fn record_party_completion(
        &self,
        order_id: &OrderId,
        party: CompletingParty,
    ) -> Result<CompletionState, EscrowApiError> {
        let state = self.db.record_party_completion(order_id, party).await?;
        debug!("✅️ Order [{order_id}] marked complete by {party}. {state}");
        if state.both_parties_complete {
            info!("✅️ Order [{order_id}] has been confirmed by both parties. Escrow funds may now be released.");
        }
        Ok(state)
    }

    /// Completes an order on customer sign-off and requests an immediate transfer of the net
    /// amount to the provider.
    ///
    /// The order must be `Delivered`. The completion itself is a contractual fact and always
    /// goes through; the transfer is best-effort. When the transfer fails the order still
    /// completes, with `payout_status = Pending` so the transfer can be retried
    /// administratively.
    pub async fn complete_order(
        &self,
        order_id: &OrderId,
        completed_by: &str,
    ) -> Result<CompletionResult, EscrowApiError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| EscrowApiError::OrderNotFound(order_id.clone()))?;
        if order.status != OrderStatusType::Delivered {
            return Err(EscrowApiError::conflict(OrderStatusType::Delivered, order.status));
        }
        if order.customer_id != completed_by {
            return Err(EscrowApiError::Validation(format!(
                "order [{order_id}] can only be completed by its customer"
            )));
        }

        let net = order.net_amount();
        let (transfer_id, payout_status) = match (&order.payout_account, net.is_positive()) {
            (Some(account), true) => {
                let request = TransferRequest {
                    amount: net,
                    currency: order.currency.clone(),
                    destination_account: account.clone(),
                    metadata: json!({ "order_id": order_id, "completed_by": completed_by }),
                };
                match self.gateway.create_transfer(request).await {
                    Ok(transfer_id) => {
                        info!("✅️ Transfer [{transfer_id}] of {net} sent to provider for order [{order_id}]");
                        (Some(transfer_id), PayoutStatus::Transferred)
                    },
                    Err(e) => {
                        // completion is not aborted; the transfer is retried administratively
                        warn!("✅️ Transfer of {net} for order [{order_id}] failed and must be retried: {e}");
                        (None, PayoutStatus::Pending)
                    },
                }
            },
            (None, _) => {
                warn!("✅️ Order [{order_id}] has no payout account on file. Completing without a transfer.");
                (None, PayoutStatus::Pending)
            },
            (_, false) => {
                warn!("✅️ Order [{order_id}] has a non-positive net amount ({net}). Completing without a transfer.");
                (None, PayoutStatus::Pending)
            },
        };

        let order = self.db.mark_order_completed(order_id, payout_status, transfer_id.as_deref()).await?;
        self.call_order_completed_hook(OrderCompletedEvent::new(order)).await;
        Ok(CompletionResult { order_id: order_id.clone(), transfer_id, payout_status })
    }

    async fn call_order_completed_hook(&self, event: OrderCompletedEvent) {
        for emitter in &self.producers.order_completed_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}

use std::fmt::Debug;

use epe_common::MinorUnits;
use log::*;

use crate::{
    db_types::{EntryCategory, EntryId, EscrowHoldStatus, NewEscrowHold, OrderId, TimeEntryStatus},
    epe_api::{
        errors::EscrowApiError,
        objects::{AuthorizedHold, FailedHold, ReleaseResult, ReleasedHold},
    },
    events::{EscrowReleasedEvent, EventProducers},
    helpers::{hold_idempotency_key, FeeSchedule},
    traits::{EscrowLedger, GatewayError, HoldRequest, PaymentGateway},
};

/// `EscrowApi` owns the escrow half of the engine: authorizing holds for approved supplemental
/// work, and capturing them once both parties have signed off.
pub struct EscrowApi<B, G> {
    db: B,
    gateway: G,
    fees: FeeSchedule,
    producers: EventProducers,
}

impl<B, G> Debug for EscrowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EscrowApi")
    }
}

impl<B, G> EscrowApi<B, G> {
    pub fn new(db: B, gateway: G, fees: FeeSchedule, producers: EventProducers) -> Self {
        Self { db, gateway, fees, producers }
    }
}

impl<B, G> EscrowApi<B, G>
where
    B: EscrowLedger,
    G: PaymentGateway,
{
    /// Authorizes a funds hold covering the given customer-approved `Additional` time entries.
    ///
    /// The hold is authorization-only: the gateway reserves the gross amount, earmarking the
    /// provider's net for their connected account and the platform fee for the platform, but
    /// captures nothing. On success every covered entry moves to `EscrowAuthorized`, annotated
    /// with the hold id.
    ///
    /// Idempotency: the gateway call is keyed by `idempotency_key`, or by a deterministic key
    /// derived from the sorted entry-id set when the caller supplies none. A repeat call with
    /// the same key returns the previously created hold without touching the gateway again.
    ///
    /// A gateway failure mutates no entry state and is returned verbatim with its
    /// classification. The call is never retried automatically.
    pub async fn authorize_additional_hours(
        &self,
        order_id: &OrderId,
        entry_ids: &[EntryId],
        idempotency_key: Option<String>,
    ) -> Result<AuthorizedHold, EscrowApiError> {
        if entry_ids.is_empty() {
            return Err(EscrowApiError::Validation("at least one time entry is required".into()));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| EscrowApiError::OrderNotFound(order_id.clone()))?;
        let key = idempotency_key.unwrap_or_else(|| hold_idempotency_key(order_id, entry_ids));
        if let Some(existing) = self.db.hold_by_idempotency_key(&key).await? {
            debug!("🔒️ Hold [{}] already exists for key {key}. Returning it as-is.", existing.hold_id);
            return Ok(existing.into());
        }

        let entries = self.db.fetch_entries_by_ids(order_id, entry_ids).await?;
        for entry in &entries {
            if entry.category != EntryCategory::Additional {
                return Err(EscrowApiError::Validation(format!(
                    "entry {} is {}; only Additional entries are escrow-funded",
                    entry.entry_id, entry.category
                )));
            }
            match entry.status {
                TimeEntryStatus::CustomerApproved => {},
                TimeEntryStatus::EscrowAuthorized => {
                    // a second hold over the same entry would double-reserve funds
                    return Err(EscrowApiError::conflict(
                        format!("entry {} in status CustomerApproved", entry.entry_id),
                        TimeEntryStatus::EscrowAuthorized,
                    ));
                },
                other => {
                    return Err(EscrowApiError::Validation(format!(
                        "entry {} has not been approved by the customer (status: {other})",
                        entry.entry_id
                    )));
                },
            }
        }
        let gross: MinorUnits = entries.iter().map(|e| e.billable_amount).sum();
        if !gross.is_positive() {
            return Err(EscrowApiError::Validation(format!("billable total must be positive, got {gross}")));
        }
        let split = self.fees.split(gross);
        let account = order
            .payout_account
            .clone()
            .ok_or_else(|| EscrowApiError::NoPayoutAccount(order.provider_id.clone()))?;

        let request = HoldRequest {
            order_id: order_id.clone(),
            amount: split.gross,
            currency: order.currency.clone(),
            destination_account: account,
            platform_fee: split.platform_fee,
            idempotency_key: key.clone(),
        };
        let hold = self.gateway.authorize_hold(request).await?;
        debug!(
            "🔒️ Gateway authorized hold [{}] over {} for order [{order_id}] ({} net to provider, {} platform fee)",
            hold.hold_id, split.gross, split.provider_net, split.platform_fee
        );

        let record = self
            .db
            .create_hold(NewEscrowHold {
                hold_id: hold.hold_id.clone(),
                order_id: order_id.clone(),
                entry_ids: entry_ids.to_vec(),
                gross_amount: split.gross,
                platform_fee: split.platform_fee,
                provider_net: split.provider_net,
                idempotency_key: key,
            })
            .await
            .map_err(|e| {
                // the authorization exists at the gateway but has no ledger record; it will
                // lapse uncaptured and must be reconciled out of band
                error!(
                    "🔒️ Hold [{}] was authorized at the gateway but could not be recorded in the ledger: {e}. \
                     Reconciliation required for order [{order_id}].",
                    hold.hold_id
                );
                e
            })?;
        info!(
            "🔒️ Escrow hold [{}] recorded for order [{order_id}] covering {} entries",
            record.hold_id,
            record.entry_ids.len()
        );
        Ok(record.into())
    }

    /// Captures the given holds now that both parties have confirmed completion.
    ///
    /// Each hold is captured independently: escrow holds map 1:1 to gateway authorization
    /// objects that can individually expire or be voided, so one stale hold must not block the
    /// release of funds that are still validly held. Failures are collected and reported for
    /// out-of-band remediation, never retried here.
    ///
    /// Once the batch has been attempted the order is flagged `escrow_release_initiated` and its
    /// tracking status becomes `Completed`, regardless of partial failures. A second call for
    /// the same order is rejected before any gateway call is made.
    pub async fn release_escrow_funds(
        &self,
        order_id: &OrderId,
        hold_ids: &[String],
    ) -> Result<ReleaseResult, EscrowApiError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| EscrowApiError::OrderNotFound(order_id.clone()))?;
        let completion = order.completion();
        if completion.escrow_release_initiated {
            return Err(EscrowApiError::conflict(
                "escrow release not yet initiated",
                "escrow release already initiated for this order",
            ));
        }
        if !completion.both_parties_complete {
            return Err(EscrowApiError::conflict("both parties marked complete", completion));
        }
        if hold_ids.is_empty() {
            return Err(EscrowApiError::Validation("at least one hold id is required".into()));
        }
        let holds = self.db.holds_by_ids(order_id, hold_ids).await?;
        for hold in &holds {
            if hold.status != EscrowHoldStatus::Authorized {
                return Err(EscrowApiError::conflict(
                    format!("hold {} in status Authorized", hold.hold_id),
                    hold.status,
                ));
            }
        }

        let mut released = Vec::with_capacity(holds.len());
        let mut failed = Vec::new();
        for hold in holds {
            match self.gateway.capture_hold(&hold.hold_id).await {
                Ok(capture) => match self.db.mark_hold_released(order_id, &hold.hold_id).await {
                    Ok(record) => {
                        debug!("🔓️ Hold [{}] captured: {} released", record.hold_id, capture.captured_amount);
                        released.push(ReleasedHold {
                            hold_id: record.hold_id,
                            amount: capture.captured_amount,
                            entry_ids: record.entry_ids,
                        });
                    },
                    Err(e) => {
                        // the money moved but the ledger write failed; surface as ambiguous so
                        // reconciliation picks it up rather than a blind retry re-capturing
                        error!(
                            "🔓️ Hold [{}] was captured at the gateway but the ledger update failed: {e}. Manual \
                             reconciliation required for order [{order_id}].",
                            hold.hold_id
                        );
                        failed.push(FailedHold {
                            hold_id: hold.hold_id,
                            error: GatewayError::unknown("ledger_write_failed", e.to_string()),
                        });
                    },
                },
                Err(e) => {
                    warn!("🔓️ Hold [{}] could not be captured: {e}", hold.hold_id);
                    failed.push(FailedHold { hold_id: hold.hold_id, error: e });
                },
            }
        }

        let order = self.db.finalize_escrow_release(order_id).await?;
        let result = ReleaseResult { order_id: order.order_id.clone(), released, failed };
        info!(
            "🔓️ Escrow release for order [{order_id}] complete: {} released, {} failed",
            result.released.len(),
            result.failed.len()
        );
        self.call_escrow_released_hook(&result).await;
        Ok(result)
    }

    async fn call_escrow_released_hook(&self, result: &ReleaseResult) {
        for emitter in &self.producers.escrow_released_producer {
            let event = EscrowReleasedEvent {
                order_id: result.order_id.clone(),
                released_amount: result.released_amount(),
                released_holds: result.released.iter().map(|h| h.hold_id.clone()).collect(),
                failed_holds: result.failed.iter().map(|h| h.hold_id.clone()).collect(),
            };
            emitter.publish_event(event).await;
        }
    }
}

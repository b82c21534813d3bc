use std::fmt::Write as _;

use blake2::{Blake2b512, Digest};

use crate::db_types::{EntryId, OrderId};

/// Deterministic idempotency key for a hold authorization, derived from the order id and the
/// sorted, deduplicated entry-id set. Two calls covering the same entries produce the same key,
/// so the gateway will not double-reserve funds for a retried request.
pub fn hold_idempotency_key(order_id: &OrderId, entry_ids: &[EntryId]) -> String {
    let mut ids: Vec<&str> = entry_ids.iter().map(EntryId::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    let mut hasher = Blake2b512::new();
    hasher.update(b"escrow-hold");
    hasher.update(order_id.as_str().as_bytes());
    for id in ids {
        hasher.update([0u8]);
        hasher.update(id.as_bytes());
    }
    format!("hold-{}", to_hex(&hasher.finalize()[..16]))
}

/// Deterministic idempotency key for a payout request, derived from the provider id and the
/// sorted order-id set the payout covers.
pub fn payout_idempotency_key(provider_id: &str, order_ids: &[OrderId]) -> String {
    let mut ids: Vec<&str> = order_ids.iter().map(OrderId::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    let mut hasher = Blake2b512::new();
    hasher.update(b"payout");
    hasher.update(provider_id.as_bytes());
    for id in ids {
        hasher.update([0u8]);
        hasher.update(id.as_bytes());
    }
    format!("payout-{}", to_hex(&hasher.finalize()[..16]))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(2 * bytes.len()), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_is_independent_of_entry_order() {
        let oid = OrderId::from("ord-1");
        let a = hold_idempotency_key(&oid, &[EntryId::from("e1"), EntryId::from("e2")]);
        let b = hold_idempotency_key(&oid, &[EntryId::from("e2"), EntryId::from("e1")]);
        assert_eq!(a, b);
    }

    #[test]
    fn key_differs_per_entry_set_and_order() {
        let oid = OrderId::from("ord-1");
        let a = hold_idempotency_key(&oid, &[EntryId::from("e1")]);
        let b = hold_idempotency_key(&oid, &[EntryId::from("e2")]);
        let c = hold_idempotency_key(&OrderId::from("ord-2"), &[EntryId::from("e1")]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ambiguous_id_boundaries_do_not_collide() {
        let oid = OrderId::from("ord-1");
        let a = hold_idempotency_key(&oid, &[EntryId::from("ab"), EntryId::from("c")]);
        let b = hold_idempotency_key(&oid, &[EntryId::from("a"), EntryId::from("bc")]);
        assert_ne!(a, b);
    }

    #[test]
    fn payout_key_is_stable() {
        let ids = [OrderId::from("o1"), OrderId::from("o2")];
        let rev = [OrderId::from("o2"), OrderId::from("o1")];
        assert_eq!(payout_idempotency_key("prov-1", &ids), payout_idempotency_key("prov-1", &rev));
        assert_ne!(payout_idempotency_key("prov-1", &ids), payout_idempotency_key("prov-2", &ids));
    }
}
